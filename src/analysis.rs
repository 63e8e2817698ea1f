//! Load case processing and result recovery.
//!
//! Each enabled load case is turned into its own right-hand side and solved
//! against the shared K11 block; the displacements are then superposed. Bar
//! forces follow from the element stiffness and any initial force caused by
//! thermal effects or fabrication errors, and reactions follow from the K21 and
//! K22 blocks. Results are only returned when every case converged.
//!
//! The solve happens in canonical SI units. Deflections are reported in the
//! configured length unit and forces in the configured load unit.

use log::{debug, info, warn};
use nalgebra::DVector;
use serde::{Deserialize, Serialize};

use crate::assembly::{self, Assembly, AssemblyOptions, Properties, Slot};
use crate::checker;
use crate::config::AnalysisConfig;
use crate::errors::AnalysisError;
use crate::geometry::{Displacement, Force};
use crate::influence::{self, InfluenceResult};
use crate::loads::LoadCases;
use crate::progress::{Milestone, ProgressReporter};
use crate::report;
use crate::snapshot::{RigidityMode, TrussSnapshot};
use crate::solver::{self, LinearSolver};
use crate::units::{snap_to_zero, zero_force_threshold, UnitFactors};

/// Equilibrium sums over applied loads and reactions.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StaticsCheck {
    /// Sum of horizontal forces, in the load unit.
    pub sum_x: f64,
    /// Sum of vertical forces, in the load unit.
    pub sum_y: f64,
    /// Sum of moments about the origin, in load unit × length unit.
    pub moment: f64,
    /// Whether every sum vanishes within the statics tolerance.
    pub balanced: bool,
}

/// Results of one analysis.
///
/// Every list is positionally aligned with the snapshot it was computed from.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResults {
    /// Deflection of each joint in the length unit.
    pub joint_deflections: Vec<Displacement>,
    /// Axial force of each bar in the load unit, tension positive.
    pub bar_forces: Vec<f64>,
    /// Reaction of each support in the load unit.
    pub support_reactions: Vec<Force>,
    /// Equilibrium self-check.
    pub statics: StaticsCheck,
    /// Human-readable summary of the statics check.
    pub note: String,
    /// Influence line results, when an influence load was requested.
    pub influence: Option<InfluenceResult>,
}

/// Loads of a single case, in canonical units over the global DOFs.
struct CaseLoads {
    /// Case label used in log lines.
    name: &'static str,
    /// External nodal loads.
    applied: DVector<f64>,
    /// Equivalent nodal loads of initial bar forces.
    equivalent: DVector<f64>,
    /// Prescribed displacements of the fixed DOFs.
    prescribed: DVector<f64>,
    /// Initial force of each real bar.
    initial: Vec<f64>,
}

impl CaseLoads {
    /// Empty case over the assembly's DOFs.
    fn new(name: &'static str, assembly: &Assembly, bars: usize) -> Self {
        Self {
            name,
            applied: DVector::zeros(assembly.partition.dof_count()),
            equivalent: DVector::zeros(assembly.partition.dof_count()),
            prescribed: DVector::zeros(assembly.partition.fixed.len()),
            initial: vec![0.0; bars],
        }
    }

    /// Record an initial bar force and its equivalent joint loads.
    fn add_initial_force(&mut self, assembly: &Assembly, bar: usize, force: f64) {
        let element = assembly.element(bar);
        let [sx, sy, ex, ey] = element.dofs;
        self.initial[bar] += force;
        self.equivalent[sx] -= force * element.axis.x;
        self.equivalent[sy] -= force * element.axis.y;
        self.equivalent[ex] += force * element.axis.x;
        self.equivalent[ey] += force * element.axis.y;
    }

    /// `f_f - K12 u_s`.
    fn free_rhs(&self, assembly: &Assembly) -> DVector<f64> {
        let total = &self.applied + &self.equivalent;
        let (free, _) = assembly.partition.split(&total);
        free - solver::multiply(&assembly.stiffness.k12, &self.prescribed)
    }
}

/// Analyse a snapshot under the enabled load cases.
///
/// # Errors
///
/// Returns [`AnalysisError::Unstable`] when the model fails the minimum-count,
/// connectivity, bar-count or geometric stability checks,
/// [`AnalysisError::FailedToConverge`] when any case cannot
/// be solved, and the input errors described on [`AnalysisError`].
pub fn analyze(
    snapshot: &TrussSnapshot,
    cases: &LoadCases,
    config: &AnalysisConfig,
) -> Result<AnalysisResults, AnalysisError> {
    analyze_with_progress(snapshot, cases, config, &ProgressReporter::new())
}

/// [`analyze`] reporting milestones: assembly done at 50 %, static cases solved at 75 %.
///
/// # Errors
///
/// Same as [`analyze`].
pub fn analyze_with_progress(
    snapshot: &TrussSnapshot,
    cases: &LoadCases,
    config: &AnalysisConfig,
    progress: &ProgressReporter,
) -> Result<AnalysisResults, AnalysisError> {
    progress.report(Milestone::Started);
    snapshot.validate()?;
    // Bars between two fixed supports are left to the solver.
    checker::core_checks(snapshot, config)
        .map_err(|reason| AnalysisError::Unstable(reason.to_string()))?;
    let influence_load = select_influence(snapshot, cases)?;
    if cases.settlements {
        for settlement in &snapshot.loads.settlements {
            if !snapshot.supports[settlement.support].kind.accepts_settlement() {
                return Err(AnalysisError::IneligibleSettlement(settlement.support));
            }
        }
    }

    let factors = UnitFactors::from_config(&config.units)?;
    let canonical = factors.normalize(snapshot);
    let options = AssemblyOptions {
        properties: Properties::Actual,
        substitute_length: config.limits.min_bar_length * factors.length,
        substitute_ratio: config.tolerances.substitute_stiffness_ratio,
        contribution: config.tolerances.contribution,
    };
    let assembly = assembly::assemble(&canonical, &options)?;
    let case_loads = build_cases(&canonical, &assembly, cases)?;
    progress.report(Milestone::Prepared);

    let mut solver = LinearSolver::new(
        &assembly.stiffness.k11,
        &config.solver,
        assembly.has_substitutes(),
    );
    let Superposed {
        u_free,
        u_fixed,
        applied,
        equivalent,
        initial,
    } = solve_cases(&mut solver, &assembly, &case_loads)?;

    progress.report(Milestone::Solved);
    let displacements = assembly.partition.join(&u_free, &u_fixed);
    let threshold = zero_force_threshold(config.units.system, &config.tolerances);

    let bar_forces: Vec<f64> = (0..canonical.bar_count())
        .map(|bar| assembly.element(bar).axial_force(&displacements) - initial[bar])
        .collect();

    let (_, applied_fixed) = assembly.partition.split(&applied);
    let (_, equivalent_fixed) = assembly.partition.split(&equivalent);
    let fixed_reactions = solver::multiply(&assembly.stiffness.k21, &u_free)
        + solver::multiply(&assembly.stiffness.k22, &u_fixed)
        - equivalent_fixed
        - applied_fixed;
    let reaction_at = |dof: usize| match assembly.partition.slot(dof) {
        Slot::Fixed(index) => fixed_reactions[index],
        Slot::Free(_) => 0.0,
    };
    let reactions: Vec<Force> = (0..canonical.support_count())
        .map(|support| {
            let joint = assembly.reaction_joint(&canonical, support);
            Force::new(reaction_at(2 * joint), reaction_at(2 * joint + 1))
        })
        .collect();

    let statics = statics_check(&canonical, &applied, &reactions, config, &factors);

    let influence = match influence_load {
        Some(index) => Some(influence::evaluate(
            &canonical,
            &assembly,
            &mut solver,
            &canonical.loads.influence[index],
            threshold,
            config.tolerances.ordinate,
            &factors,
        )?),
        None => None,
    };

    let joint_deflections = (0..canonical.joint_count())
        .map(|joint| {
            Displacement::new(
                displacements[2 * joint] / factors.length,
                displacements[2 * joint + 1] / factors.length,
            )
        })
        .collect();
    let bar_forces = bar_forces
        .into_iter()
        .map(|force| snap_to_zero(force, threshold) / factors.load)
        .collect();
    let support_reactions = reactions
        .iter()
        .map(|reaction| {
            Force::new(
                snap_to_zero(reaction.x, threshold) / factors.load,
                snap_to_zero(reaction.y, threshold) / factors.load,
            )
        })
        .collect();

    let note = report::statics_note(&statics, &config.units);
    info!("analysis complete: {note}");
    progress.report(Milestone::Finished);
    Ok(AnalysisResults {
        joint_deflections,
        bar_forces,
        support_reactions,
        statics,
        note,
        influence,
    })
}

/// Sum of every solved case.
struct Superposed {
    /// Displacements of the free DOFs.
    u_free: DVector<f64>,
    /// Prescribed displacements of the fixed DOFs.
    u_fixed: DVector<f64>,
    /// External nodal loads over all DOFs.
    applied: DVector<f64>,
    /// Equivalent nodal loads of initial bar forces over all DOFs.
    equivalent: DVector<f64>,
    /// Initial force of each real bar.
    initial: Vec<f64>,
}

/// Solve every case against K11 and superpose. Any failed case fails the whole run.
fn solve_cases(
    solver: &mut LinearSolver<'_>,
    assembly: &Assembly,
    case_loads: &[CaseLoads],
) -> Result<Superposed, AnalysisError> {
    let dof_count = assembly.partition.dof_count();
    let mut total = Superposed {
        u_free: DVector::zeros(assembly.partition.free.len()),
        u_fixed: DVector::zeros(assembly.partition.fixed.len()),
        applied: DVector::zeros(dof_count),
        equivalent: DVector::zeros(dof_count),
        initial: vec![0.0; assembly.elements.len() - assembly.substitute_count()],
    };
    for case in case_loads {
        let solution = solver.solve(&case.free_rhs(assembly)).map_err(|error| {
            warn!("load case '{}' failed: {error}", case.name);
            AnalysisError::FailedToConverge
        })?;
        debug!("load case '{}' solved", case.name);
        total.u_free += solution;
        total.u_fixed += &case.prescribed;
        total.applied += &case.applied;
        total.equivalent += &case.equivalent;
        for (sum, value) in total.initial.iter_mut().zip(&case.initial) {
            *sum += value;
        }
    }
    Ok(total)
}

/// Index of the requested influence load.
fn select_influence(
    snapshot: &TrussSnapshot,
    cases: &LoadCases,
) -> Result<Option<usize>, AnalysisError> {
    let Some(name) = &cases.influence else {
        return Ok(None);
    };
    let index = snapshot
        .loads
        .influence
        .iter()
        .position(|load| &load.name == name)
        .ok_or_else(|| AnalysisError::UnknownInfluenceLoad(name.clone()))?;
    if !snapshot.loads.influence[index].is_well_formed() {
        return Err(AnalysisError::MalformedInfluenceLoad(name.clone()));
    }
    Ok(Some(index))
}

/// Translate every enabled load case into nodal vectors.
fn build_cases(
    snapshot: &TrussSnapshot,
    assembly: &Assembly,
    cases: &LoadCases,
) -> Result<Vec<CaseLoads>, AnalysisError> {
    let bars = snapshot.bar_count();
    let loads = &snapshot.loads;
    let mut built = Vec::new();

    if cases.joint_loads {
        let mut case = CaseLoads::new("joint loads", assembly, bars);
        for load in &loads.joint_loads {
            case.applied[2 * load.joint] += load.force.x;
            case.applied[2 * load.joint + 1] += load.force.y;
        }
        built.push(case);
    }

    if cases.self_weight {
        let mut case = CaseLoads::new("self-weight", assembly, bars);
        for (index, bar) in snapshot.bars.iter().enumerate() {
            let area = match (snapshot.rigidity, bar.area) {
                (RigidityMode::Explicit, Some(area)) => area,
                _ => return Err(AnalysisError::SelfWeightRequiresArea(index)),
            };
            let half = 0.5 * area * snapshot.bar_length(index) * bar.unit_weight;
            case.applied[2 * bar.start + 1] -= half;
            case.applied[2 * bar.end + 1] -= half;
        }
        built.push(case);
    }

    if cases.settlements {
        let mut case = CaseLoads::new("settlements", assembly, bars);
        for settlement in &loads.settlements {
            let joint = snapshot.supports[settlement.support].joint;
            if let Slot::Fixed(index) = assembly.partition.slot(2 * joint + 1) {
                case.prescribed[index] -= settlement.settlement;
            }
        }
        built.push(case);
    }

    if cases.thermal {
        let mut case = CaseLoads::new("thermal effects", assembly, bars);
        for effect in &loads.thermal {
            let rigidity = assembly.element(effect.bar).rigidity;
            let force = rigidity * effect.expansion * effect.delta_t;
            case.add_initial_force(assembly, effect.bar, force);
        }
        built.push(case);
    }

    if cases.fabrication {
        let mut case = CaseLoads::new("fabrication errors", assembly, bars);
        for error in &loads.fabrication {
            let element = assembly.element(error.bar);
            let force = element.rigidity * error.length_error / element.length;
            case.add_initial_force(assembly, error.bar, force);
        }
        built.push(case);
    }

    Ok(built)
}

/// Compare applied loads with support reactions in the model's force unit.
fn statics_check(
    snapshot: &TrussSnapshot,
    applied: &DVector<f64>,
    reactions: &[Force],
    config: &AnalysisConfig,
    factors: &UnitFactors,
) -> StaticsCheck {
    let mut forces: Vec<(usize, f64, f64)> = (0..snapshot.joint_count())
        .map(|joint| (joint, applied[2 * joint], applied[2 * joint + 1]))
        .collect();
    forces.extend(
        snapshot
            .supports
            .iter()
            .zip(reactions)
            .map(|(support, reaction)| (support.joint, reaction.x, reaction.y)),
    );

    let (mut sum_x, mut sum_y, mut moment) = (0.0, 0.0, 0.0);
    let (mut force_scale, mut moment_scale) = (0.0_f64, 0.0_f64);
    for &(joint, fx, fy) in &forces {
        let position = snapshot.joints[joint];
        let arm = position.x * fy - position.y * fx;
        sum_x += fx;
        sum_y += fy;
        moment += arm;
        force_scale += fx.abs() + fy.abs();
        moment_scale += (position.x * fy).abs() + (position.y * fx).abs();
    }
    let tolerance = config.tolerances.statics;
    let balanced = sum_x.abs() <= tolerance * force_scale.max(1.0)
        && sum_y.abs() <= tolerance * force_scale.max(1.0)
        && moment.abs() <= tolerance * moment_scale.max(1.0);

    let threshold = zero_force_threshold(config.units.system, &config.tolerances);
    StaticsCheck {
        sum_x: snap_to_zero(sum_x, threshold) / factors.load,
        sum_y: snap_to_zero(sum_y, threshold) / factors.load,
        moment: snap_to_zero(moment, threshold) / (factors.load * factors.length),
        balanced,
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::geometry::{force, point};
    use crate::config::{SolverSettings, UnitConfig};
    use crate::loads::{
        Direction, FabricationError, InfluenceLoad, JointLoad, SupportSettlement, ThermalEffect,
    };
    use crate::snapshot::{BarData, SupportData};
    use crate::support::{Side, SupportKind};

    const AREA: f64 = 0.01;
    const MODULUS: f64 = 200.0e9;

    fn bar(start: usize, end: usize) -> BarData {
        let mut bar = BarData::new(start, end);
        bar.area = Some(AREA);
        bar.modulus = Some(MODULUS);
        bar
    }

    /// Triangle with a fixed support at the left and a roller at the right.
    fn triangle() -> TrussSnapshot {
        TrussSnapshot {
            joints: vec![point(0.0, 0.0), point(4.0, 0.0), point(2.0, 2.0)],
            bars: vec![bar(0, 1), bar(1, 2), bar(0, 2)],
            supports: vec![
                SupportData {
                    joint: 0,
                    kind: SupportKind::Fixed(Side::Bottom),
                },
                SupportData {
                    joint: 1,
                    kind: SupportKind::Roller(Side::Bottom),
                },
            ],
            ..TrussSnapshot::default()
        }
    }

    fn apex_load(snapshot: &mut TrussSnapshot, magnitude: f64) {
        snapshot.loads.joint_loads.push(JointLoad {
            joint: 2,
            force: force(0.0, -magnitude),
            position: "apex".to_string(),
        });
    }

    /// Two collinear bars between two pins: the middle joint has no vertical stiffness.
    fn collinear_mechanism() -> TrussSnapshot {
        let mut model = TrussSnapshot {
            joints: vec![point(0.0, 0.0), point(2.0, 0.0), point(4.0, 0.0)],
            bars: vec![bar(0, 1), bar(1, 2)],
            supports: vec![
                SupportData {
                    joint: 0,
                    kind: SupportKind::Fixed(Side::Bottom),
                },
                SupportData {
                    joint: 2,
                    kind: SupportKind::Fixed(Side::Bottom),
                },
            ],
            ..TrussSnapshot::default()
        };
        for bar in &mut model.bars {
            bar.unit_weight = 78_500.0;
        }
        // Horizontal, so this case alone has a solution.
        model.loads.joint_loads.push(JointLoad {
            joint: 1,
            force: force(500.0, 0.0),
            position: "middle".to_string(),
        });
        model
    }

    #[test]
    fn mechanisms_are_rejected_before_solving() {
        let outcome = analyze(
            &collinear_mechanism(),
            &LoadCases::default(),
            &AnalysisConfig::default(),
        );
        assert!(
            matches!(&outcome, Err(AnalysisError::Unstable(note)) if note.contains("geometrically unstable")),
            "{outcome:?}"
        );
    }

    #[test]
    fn a_failed_case_discards_the_cases_that_converged() {
        let model = collinear_mechanism();
        let options = AssemblyOptions {
            properties: Properties::Actual,
            substitute_length: 0.1,
            substitute_ratio: 1.0e6,
            contribution: 1.0e-12,
        };
        let assembly = assembly::assemble(&model, &options).expect("assembles");
        let cases = LoadCases::default().with_self_weight();
        let case_loads = build_cases(&model, &assembly, &cases).expect("cases build");
        assert_eq!(case_loads.len(), 2);

        let settings = SolverSettings::default();
        let mut solver = LinearSolver::new(&assembly.stiffness.k11, &settings, false);
        assert!(solver.solve(&case_loads[0].free_rhs(&assembly)).is_ok());
        assert!(matches!(
            solve_cases(&mut solver, &assembly, &case_loads),
            Err(AnalysisError::FailedToConverge)
        ));

        let load = InfluenceLoad {
            name: "cart".to_string(),
            direction: Direction::Forward,
            path: vec![0, 1, 2],
            magnitudes: vec![1.0],
            offsets: vec![0.0],
        };
        let factors = UnitFactors::from_config(&UnitConfig::default()).expect("known units");
        assert_eq!(
            influence::evaluate(&model, &assembly, &mut solver, &load, 1.0e-2, 1.0e-12, &factors),
            Err(AnalysisError::FailedToConverge)
        );
    }

    #[test]
    fn symmetric_triangle_splits_the_apex_load() {
        let mut model = triangle();
        apex_load(&mut model, 10_000.0);
        let results =
            analyze(&model, &LoadCases::default(), &AnalysisConfig::default()).expect("solves");

        assert_relative_eq!(results.support_reactions[0].y, 5_000.0, max_relative = 1.0e-6);
        assert_relative_eq!(results.support_reactions[1].y, 5_000.0, max_relative = 1.0e-6);
        assert_eq!(results.support_reactions[0].x, 0.0);
        // Both rafters carry P / (2 sin 45°) in compression, the tie the horizontal component.
        let rafter = -10_000.0 / (2.0 * std::f64::consts::FRAC_1_SQRT_2);
        assert_relative_eq!(results.bar_forces[1], rafter, max_relative = 1.0e-6);
        assert_relative_eq!(results.bar_forces[2], rafter, max_relative = 1.0e-6);
        assert_relative_eq!(results.bar_forces[0], 5_000.0, max_relative = 1.0e-6);
        assert!(results.statics.balanced);
    }

    #[test]
    fn load_on_a_restrained_dof_goes_straight_into_the_reaction() {
        let mut model = triangle();
        model.loads.joint_loads.push(JointLoad {
            joint: 0,
            force: force(0.0, -250.0),
            position: "support".to_string(),
        });
        let results =
            analyze(&model, &LoadCases::default(), &AnalysisConfig::default()).expect("solves");
        assert_relative_eq!(results.support_reactions[0].y, 250.0, max_relative = 1.0e-9);
        assert!(results.bar_forces.iter().all(|&force| force == 0.0));
    }

    #[test]
    fn thermal_effect_in_a_determinate_truss_causes_no_force() {
        let mut model = triangle();
        model.loads.thermal.push(ThermalEffect {
            bar: 0,
            delta_t: 40.0,
            expansion: 1.2e-5,
        });
        let cases = LoadCases::default().with_thermal();
        let results = analyze(&model, &cases, &AnalysisConfig::default()).expect("solves");
        assert!(results.bar_forces.iter().all(|&force| force == 0.0));
        // The tie lengthens by alpha * dT * L and the roller slides by that amount.
        assert_relative_eq!(
            results.joint_deflections[1].x,
            1.2e-5 * 40.0 * 4.0,
            max_relative = 1.0e-6
        );
    }

    #[test]
    fn fabrication_error_between_fixed_joints_is_locked_in() {
        let mut model = triangle();
        model.supports[1].kind = SupportKind::Fixed(Side::Bottom);
        model.loads.fabrication.push(FabricationError {
            bar: 0,
            length_error: 0.002,
        });
        let cases = LoadCases::default().with_fabrication();
        let results = analyze(&model, &cases, &AnalysisConfig::default()).expect("solves");
        let expected = -AREA * MODULUS * 0.002 / 4.0;
        assert_relative_eq!(results.bar_forces[0], expected, max_relative = 1.0e-9);
        // The compressed bar pushes the supports apart.
        assert_relative_eq!(results.support_reactions[0].x, -expected, max_relative = 1.0e-9);
        assert!(results.statics.balanced);
    }

    #[test]
    fn settlement_of_a_roller_moves_it_down() {
        let mut model = triangle();
        model.loads.settlements.push(SupportSettlement {
            support: 1,
            settlement: 0.01,
        });
        let cases = LoadCases::default().with_settlements();
        let results = analyze(&model, &cases, &AnalysisConfig::default()).expect("solves");
        assert_relative_eq!(results.joint_deflections[1].y, -0.01, max_relative = 1.0e-12);
        assert!(results.bar_forces.iter().all(|&force| force == 0.0));
    }

    #[test]
    fn settlement_on_a_side_support_is_rejected() {
        let mut model = triangle();
        model.supports[1].kind = SupportKind::Roller(Side::Left);
        model.loads.settlements.push(SupportSettlement {
            support: 1,
            settlement: 0.01,
        });
        let cases = LoadCases::default().with_settlements();
        assert_eq!(
            analyze(&model, &cases, &AnalysisConfig::default()),
            Err(AnalysisError::IneligibleSettlement(1))
        );
    }

    #[test]
    fn self_weight_needs_explicit_areas() {
        let mut model = triangle();
        model.rigidity = RigidityMode::Factor;
        for bar in &mut model.bars {
            bar.factor = Some(1.0);
        }
        let cases = LoadCases::default().with_self_weight();
        assert_eq!(
            analyze(&model, &cases, &AnalysisConfig::default()),
            Err(AnalysisError::SelfWeightRequiresArea(0))
        );
    }

    #[test]
    fn self_weight_is_carried_by_the_supports() {
        let mut model = triangle();
        for bar in &mut model.bars {
            bar.unit_weight = 78_500.0;
        }
        let cases = LoadCases::default().with_self_weight();
        let results = analyze(&model, &cases, &AnalysisConfig::default()).expect("solves");
        let total_length = 4.0 + 2.0 * 8.0_f64.sqrt();
        let weight = AREA * 78_500.0 * total_length;
        let lifted = results.support_reactions[0].y + results.support_reactions[1].y;
        assert_relative_eq!(lifted, weight, max_relative = 1.0e-6);
    }

    #[test]
    fn inclined_roller_reaction_follows_its_direction() {
        let mut model = triangle();
        model.supports[1].kind = SupportKind::Inclined { angle: 30.0 };
        apex_load(&mut model, 1_000.0);
        let results =
            analyze(&model, &LoadCases::default(), &AnalysisConfig::default()).expect("solves");
        let reaction = results.support_reactions[1];
        // Restraint direction is (sin a, cos a) for a surface tilted a degrees.
        assert_relative_eq!(
            reaction.x / reaction.y,
            30.0_f64.to_radians().tan(),
            max_relative = 1.0e-4
        );
        assert!(results.statics.balanced, "{}", results.note);
    }

    #[test]
    fn unknown_influence_load_is_an_error() {
        let model = triangle();
        let cases = LoadCases::default().with_influence("crane");
        assert_eq!(
            analyze(&model, &cases, &AnalysisConfig::default()),
            Err(AnalysisError::UnknownInfluenceLoad("crane".to_string()))
        );
    }

    #[test]
    fn millimetre_models_report_in_their_own_units() {
        let mut model = triangle();
        for joint in &mut model.joints {
            *joint = joint.scaled(1_000.0);
        }
        for bar in &mut model.bars {
            bar.area = Some(AREA * 1.0e6);
            bar.modulus = Some(MODULUS / 1.0e6);
        }
        apex_load(&mut model, 10.0);
        let mut config = AnalysisConfig::default();
        config.units.length = "mm".to_string();
        config.units.area = "mm^2".to_string();
        config.units.modulus = "MPa".to_string();
        config.units.load = "kN".to_string();

        let results = analyze(&model, &LoadCases::default(), &config).expect("solves");
        assert_relative_eq!(results.support_reactions[0].y, 5.0, max_relative = 1.0e-6);
        assert_relative_eq!(results.bar_forces[0], 5.0, max_relative = 1.0e-6);
        // Tie elongation N L / (A E) = 5 kN * 4 m / (0.01 m^2 * 200 GPa) = 0.01 mm.
        assert_relative_eq!(results.joint_deflections[1].x, 0.01, max_relative = 1.0e-6);
    }
}
