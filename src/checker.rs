//! Stability and determinacy checks.
//!
//! The checks run in a fixed order and stop at the first failure, which is
//! described by an [`Instability`]. Models that pass every check are then searched
//! for redundant bars and supports: for each candidate a reduced snapshot is
//! derived, checked on its own and discarded. The input snapshot is never modified.

use std::collections::BTreeSet;

use log::{debug, info};
use nalgebra::Vector2;
use petgraph::graph::NodeIndex;
use petgraph::visit::Bfs;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::assembly::{self, AssemblyOptions, Properties};
use crate::config::AnalysisConfig;
use crate::progress::{Milestone, ProgressReporter};
use crate::report;
use crate::snapshot::TrussSnapshot;
use crate::solver::PermutedCholesky;

/// Reason a model was found unstable. Joint and bar numbers are 1-based.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum Instability {
    /// The snapshot is internally inconsistent.
    #[error("the model is inconsistent: {0}")]
    Inconsistent(String),
    /// Fewer than three joints.
    #[error("the truss has fewer than three joints")]
    TooFewJoints,
    /// Fewer than two bars.
    #[error("the truss has fewer than two bars")]
    TooFewBars,
    /// Fewer than two supports.
    #[error("the truss has fewer than two supports")]
    TooFewSupports,
    /// Some joints cannot be reached from the first one.
    #[error("the truss is not connected: only {reached} of {total} joints are reachable from joint 1")]
    Disconnected {
        /// Joints reached by the traversal.
        reached: usize,
        /// Joints in the model.
        total: usize,
    },
    /// An unsupported joint carries a single bar.
    #[error("joint {0} is not supported and is connected by a single bar")]
    DanglingBar(usize),
    /// Every joint carries a full-fixity support.
    #[error("every joint is fully fixed, leaving nothing to analyse")]
    AllJointsFixed,
    /// Fewer than three reaction components.
    #[error("the supports provide fewer than three reaction components")]
    TooFewReactions,
    /// Every reaction line is parallel.
    #[error("the supports are insufficient: all reactions are parallel")]
    ParallelReactions,
    /// Every reaction line passes through one point.
    #[error("the supports are insufficient: all reactions are concurrent")]
    ConcurrentReactions,
    /// Peeling supported single-bar joints exposed an unsupported single-bar joint.
    #[error("joint {0} is left hanging by a single bar once its supported neighbours are resolved")]
    ExposedDanglingBar(usize),
    /// Not enough bars and reaction components for the number of joints.
    #[error(
        "the truss has too few bars: {bars} bars and {components} reaction components \
         for {joints} joints (at least {required} unknowns are needed)"
    )]
    InsufficientBars {
        /// Bars counted.
        bars: usize,
        /// Reaction components counted.
        components: usize,
        /// Joints counted.
        joints: usize,
        /// Twice the joint count.
        required: usize,
    },
    /// A bar connects two fully fixed joints.
    #[error("bar {0} connects two fully fixed supports")]
    FixedBar(usize),
    /// The stiffness matrix is singular.
    #[error("the truss is geometrically unstable")]
    GeometricallyUnstable,
}

/// Outcome of a stability check.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StabilityReport {
    /// Human-readable explanation of the outcome.
    pub note: String,
    /// Whether the model passed every check.
    pub stable: bool,
    /// Snapshot indices of bars whose removal keeps the truss stable.
    pub redundant_bars: BTreeSet<usize>,
    /// Snapshot indices of supports whose removal keeps the truss stable.
    pub redundant_supports: BTreeSet<usize>,
    /// Degree of static indeterminacy of a stable model.
    pub indeterminacy: Option<usize>,
}

/// Check a snapshot and search it for redundant bars and supports.
///
/// # Examples
/// ```
/// use trussx::checker::check;
/// use trussx::{point, AnalysisConfig, Side, SupportKind, Truss};
///
/// let mut truss = Truss::new();
/// let a = truss.add_joint(point(0.0, 0.0));
/// let b = truss.add_joint(point(4.0, 0.0));
/// let c = truss.add_joint(point(2.0, 2.0));
/// truss.add_bar(a, b).expect("distinct joints");
/// truss.add_bar(b, c).expect("distinct joints");
/// truss.add_bar(a, c).expect("distinct joints");
/// truss.set_support(a, SupportKind::Fixed(Side::Bottom)).expect("joint exists");
/// truss.set_support(b, SupportKind::Roller(Side::Bottom)).expect("joint exists");
///
/// let report = check(&truss.snapshot(), &AnalysisConfig::default());
/// assert!(report.stable);
/// assert_eq!(report.indeterminacy, Some(0));
/// assert!(report.redundant_bars.is_empty());
/// ```
#[must_use]
pub fn check(snapshot: &TrussSnapshot, config: &AnalysisConfig) -> StabilityReport {
    check_with_progress(snapshot, config, &ProgressReporter::new())
}

/// [`check`] reporting milestones: checks done at 50 %, redundancy search done at 75 %.
#[must_use]
pub fn check_with_progress(
    snapshot: &TrussSnapshot,
    config: &AnalysisConfig,
    progress: &ProgressReporter,
) -> StabilityReport {
    progress.report(Milestone::Started);
    let outcome = full_check(snapshot, config);
    progress.report(Milestone::Prepared);
    let note = report::stability_note(&outcome);
    let Ok(indeterminacy) = outcome else {
        info!("stability check failed: {note}");
        progress.report(Milestone::Solved);
        progress.report(Milestone::Finished);
        return StabilityReport {
            note,
            ..StabilityReport::default()
        };
    };

    let redundant_bars: BTreeSet<usize> = (0..snapshot.bar_count())
        .filter(|&bar| core_checks(&snapshot.without_bar(bar), config).is_ok())
        .collect();
    let redundant_supports: BTreeSet<usize> = snapshot
        .supports
        .iter()
        .enumerate()
        .filter(|(_, support)| support.kind.is_redundancy_candidate())
        .map(|(index, _)| index)
        .filter(|&support| core_checks(&snapshot.without_support(support), config).is_ok())
        .collect();
    progress.report(Milestone::Solved);
    info!(
        "stability check passed: indeterminacy {indeterminacy}, {} redundant bars, {} redundant supports",
        redundant_bars.len(),
        redundant_supports.len()
    );

    let report = StabilityReport {
        note,
        stable: true,
        redundant_bars,
        redundant_supports,
        indeterminacy: Some(indeterminacy),
    };
    progress.report(Milestone::Finished);
    report
}

/// Run checks 1 to 8 and return the degree of indeterminacy.
fn full_check(snapshot: &TrussSnapshot, config: &AnalysisConfig) -> Result<usize, Instability> {
    snapshot
        .validate()
        .map_err(|error| Instability::Inconsistent(error.to_string()))?;
    topology(snapshot)?;
    dangling_bars(snapshot)?;
    all_joints_fixed(snapshot)?;
    reaction_lines(snapshot, config.tolerances.geometric)?;
    let indeterminacy = bar_count(snapshot)?;
    fixed_bars(snapshot)?;
    geometric_stability(snapshot, config)?;
    Ok(indeterminacy)
}

/// Checks repeated on every reduced snapshot of the redundancy search, and run
/// by the analysis before it solves.
pub(crate) fn core_checks(
    snapshot: &TrussSnapshot,
    config: &AnalysisConfig,
) -> Result<usize, Instability> {
    topology(snapshot)?;
    let indeterminacy = bar_count(snapshot)?;
    geometric_stability(snapshot, config)?;
    Ok(indeterminacy)
}

/// Minimum counts followed by connectivity.
fn topology(snapshot: &TrussSnapshot) -> Result<(), Instability> {
    if snapshot.joint_count() < 3 {
        return Err(Instability::TooFewJoints);
    }
    if snapshot.bar_count() < 2 {
        return Err(Instability::TooFewBars);
    }
    if snapshot.support_count() < 2 {
        return Err(Instability::TooFewSupports);
    }

    let graph = snapshot.adjacency();
    let mut bfs = Bfs::new(&graph, NodeIndex::new(0));
    let mut reached = 0;
    while bfs.next(&graph).is_some() {
        reached += 1;
    }
    debug!("connectivity: reached {reached} of {} joints", snapshot.joint_count());
    if reached < snapshot.joint_count() {
        return Err(Instability::Disconnected {
            reached,
            total: snapshot.joint_count(),
        });
    }
    Ok(())
}

/// An unsupported joint with a single bar can swing freely.
fn dangling_bars(snapshot: &TrussSnapshot) -> Result<(), Instability> {
    let supports = snapshot.support_by_joint();
    match snapshot
        .degrees()
        .iter()
        .enumerate()
        .find(|&(joint, &degree)| degree == 1 && supports[joint].is_none())
    {
        Some((joint, _)) => Err(Instability::DanglingBar(joint + 1)),
        None => Ok(()),
    }
}

/// Fails when every joint sits on a fully fixed support.
fn all_joints_fixed(snapshot: &TrussSnapshot) -> Result<(), Instability> {
    let supports = snapshot.support_by_joint();
    let all_fixed = supports
        .iter()
        .all(|support| support.is_some_and(|index| snapshot.supports[index].kind.is_fixed()));
    if all_fixed {
        Err(Instability::AllJointsFixed)
    } else {
        Ok(())
    }
}

/// Line of action of one reaction component.
#[derive(Clone, Copy, Debug)]
struct ReactionLine {
    /// Joint the reaction acts at.
    point: Vector2<f64>,
    /// Unit direction of the reaction.
    direction: Vector2<f64>,
}

/// Scalar 2D cross product.
fn cross(a: Vector2<f64>, b: Vector2<f64>) -> f64 {
    a.x * b.y - a.y * b.x
}

/// Reactions that are all parallel or all concurrent cannot hold the truss.
fn reaction_lines(snapshot: &TrussSnapshot, tolerance: f64) -> Result<(), Instability> {
    let lines: Vec<ReactionLine> = snapshot
        .supports
        .iter()
        .flat_map(|support| {
            let point = snapshot.joints[support.joint].to_vector();
            support
                .kind
                .reaction_directions()
                .into_iter()
                .map(move |direction| ReactionLine { point, direction })
        })
        .collect();
    if lines.len() < 3 {
        return Err(Instability::TooFewReactions);
    }

    let first = lines[0];
    let Some(second) = lines
        .iter()
        .skip(1)
        .find(|line| cross(first.direction, line.direction).abs() > tolerance)
    else {
        return Err(Instability::ParallelReactions);
    };

    // first.point + t * first.direction lies on the second line.
    let denominator = cross(first.direction, second.direction);
    let t = cross(second.point - first.point, second.direction) / denominator;
    let intersection = first.point + t * first.direction;
    let scale = intersection.norm().max(1.0);
    let concurrent = lines
        .iter()
        .all(|line| cross(line.direction, intersection - line.point).abs() <= tolerance * scale);
    if concurrent {
        Err(Instability::ConcurrentReactions)
    } else {
        Ok(())
    }
}

/// Peel supported single-bar joints, then compare unknowns with equations.
fn bar_count(snapshot: &TrussSnapshot) -> Result<usize, Instability> {
    let joints = snapshot.joint_count();
    let mut components = vec![0usize; joints];
    for support in &snapshot.supports {
        components[support.joint] += support.kind.components();
    }
    let mut degrees = snapshot.degrees();
    let mut alive_joint = vec![true; joints];
    let mut alive_bar = vec![true; snapshot.bar_count()];

    while let Some(joint) =
        (0..joints).find(|&j| alive_joint[j] && degrees[j] == 1 && components[j] > 0)
    {
        let Some(bar) = (0..snapshot.bar_count())
            .find(|&b| alive_bar[b] && snapshot.bars[b].touches(joint))
        else {
            break;
        };
        let neighbour = snapshot.bars[bar].other_end(joint);
        alive_joint[joint] = false;
        alive_bar[bar] = false;
        degrees[neighbour] -= 1;
        if components[joint] >= 2 {
            components[neighbour] += 1;
        }
        components[joint] = 0;
        if components[neighbour] == 0 && degrees[neighbour] <= 1 {
            return Err(Instability::ExposedDanglingBar(neighbour + 1));
        }
    }

    let bars = alive_bar.iter().filter(|&&alive| alive).count();
    let joints = alive_joint.iter().filter(|&&alive| alive).count();
    let components: usize = components.iter().sum();
    let required = 2 * joints;
    if bars + components < required {
        return Err(Instability::InsufficientBars {
            bars,
            components,
            joints,
            required,
        });
    }
    Ok(bars + components - required)
}

/// First bar whose two ends are both fully fixed.
fn fixed_bars(snapshot: &TrussSnapshot) -> Result<(), Instability> {
    let supports = snapshot.support_by_joint();
    let fixed = |joint: usize| {
        supports[joint].is_some_and(|index| snapshot.supports[index].kind.is_fixed())
    };
    match snapshot
        .bars
        .iter()
        .position(|bar| fixed(bar.start) && fixed(bar.end))
    {
        Some(bar) => Err(Instability::FixedBar(bar + 1)),
        None => Ok(()),
    }
}

/// Cholesky factor the unit-property free-free stiffness block.
fn geometric_stability(
    snapshot: &TrussSnapshot,
    config: &AnalysisConfig,
) -> Result<(), Instability> {
    let options = AssemblyOptions {
        properties: Properties::Unit,
        substitute_length: config.limits.min_bar_length,
        substitute_ratio: config.tolerances.check_substitute_ratio,
        contribution: config.tolerances.contribution,
    };
    let assembly = assembly::assemble(snapshot, &options)
        .map_err(|error| Instability::Inconsistent(error.to_string()))?;
    let k11 = &assembly.stiffness.k11;
    if k11.nrows() == 0 {
        return Ok(());
    }
    let factor =
        PermutedCholesky::factor(k11).map_err(|_| Instability::GeometricallyUnstable)?;
    let pivot = factor.min_pivot();
    debug!("geometric stability: smallest pivot {pivot:e}");
    if pivot < config.tolerances.pivot {
        return Err(Instability::GeometricallyUnstable);
    }
    Ok(())
}
