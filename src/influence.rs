//! Influence lines of bar forces under a moving train of point loads.
//!
//! A unit downward load is placed on every joint of the path in turn. The
//! resulting bar forces are the ordinates of a piecewise-linear influence line
//! per bar, measured against the cumulative distance along the path. The load
//! train is then aligned so that each of its loads sits on each path joint, and
//! the extreme totals per bar are kept as an envelope.

use log::debug;
use nalgebra::DVector;
use serde::{Deserialize, Serialize};

use crate::assembly::Assembly;
use crate::errors::AnalysisError;
use crate::loads::InfluenceLoad;
use crate::snapshot::TrussSnapshot;
use crate::solver::LinearSolver;
use crate::units::{snap_to_zero, UnitFactors};

/// Extreme bar force produced by the load train, with the alignment producing it.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct InfluenceEnvelope {
    /// Smallest total force, in the load unit.
    pub min: f64,
    /// Alignment producing [`min`](Self::min), e.g. `"load #1 at joint 3"`.
    pub min_position: String,
    /// Largest total force, in the load unit.
    pub max: f64,
    /// Alignment producing [`max`](Self::max).
    pub max_position: String,
}

/// Influence lines and envelopes of every bar.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct InfluenceResult {
    /// Name of the influence load.
    pub name: String,
    /// Cumulative distance of each path joint, in the length unit.
    pub positions: Vec<f64>,
    /// Force in each bar (outer index) for a unit load on each path joint (inner index).
    pub ordinates: Vec<Vec<f64>>,
    /// Envelope of each bar.
    pub envelopes: Vec<InfluenceEnvelope>,
}

/// Linear interpolation of an influence line, `None` outside its domain.
#[must_use]
pub fn interpolate(positions: &[f64], values: &[f64], at: f64) -> Option<f64> {
    let (&first, &last) = (positions.first()?, positions.last()?);
    let tolerance = 1.0e-9 * (last - first).abs().max(1.0);
    if at < first - tolerance || at > last + tolerance {
        return None;
    }
    for (i, window) in positions.windows(2).enumerate() {
        let (left, right) = (window[0], window[1]);
        if at <= right + tolerance {
            let span = right - left;
            if span <= 0.0 {
                return Some(values[i + 1]);
            }
            let t = ((at - left) / span).clamp(0.0, 1.0);
            return Some(values[i] + t * (values[i + 1] - values[i]));
        }
    }
    values.last().copied()
}

/// Evaluate an influence load on an assembled, canonical-unit model.
///
/// Envelope totals below `threshold` and ordinates below `ordinate_zero` are
/// reported as zero.
///
/// # Errors
///
/// Returns [`AnalysisError::FailedToConverge`] when a unit-load solve fails.
pub(crate) fn evaluate(
    snapshot: &TrussSnapshot,
    assembly: &Assembly,
    solver: &mut LinearSolver<'_>,
    load: &InfluenceLoad,
    threshold: f64,
    ordinate_zero: f64,
    factors: &UnitFactors,
) -> Result<InfluenceResult, AnalysisError> {
    let mut positions = Vec::with_capacity(load.path.len());
    let mut distance = 0.0;
    for (step, &joint) in load.path.iter().enumerate() {
        if step > 0 {
            distance += snapshot.joints[load.path[step - 1]].distance_to(snapshot.joints[joint]);
        }
        positions.push(distance);
    }

    let bars = snapshot.bar_count();
    let mut ordinates = vec![Vec::with_capacity(load.path.len()); bars];
    let fixed = DVector::zeros(assembly.partition.fixed.len());
    for &joint in &load.path {
        let mut unit = DVector::zeros(assembly.partition.dof_count());
        unit[2 * joint + 1] = -1.0;
        let (free, _) = assembly.partition.split(&unit);
        let solution = solver
            .solve(&free)
            .map_err(|_| AnalysisError::FailedToConverge)?;
        let displacements = assembly.partition.join(&solution, &fixed);
        for (bar, line) in ordinates.iter_mut().enumerate() {
            line.push(assembly.element(bar).axial_force(&displacements));
        }
    }
    debug!(
        "influence load '{}': {} unit-load solves",
        load.name,
        load.path.len()
    );

    let envelopes = ordinates
        .iter()
        .map(|line| envelope(load, &positions, line, threshold, factors.load))
        .collect();

    Ok(InfluenceResult {
        name: load.name.clone(),
        positions: positions.iter().map(|p| p / factors.length).collect(),
        ordinates: ordinates
            .into_iter()
            .map(|line| line.into_iter().map(|v| snap_to_zero(v, ordinate_zero)).collect())
            .collect(),
        envelopes,
    })
}

/// Extreme totals of the load train rolled over one bar's ordinates.
fn envelope(
    load: &InfluenceLoad,
    positions: &[f64],
    line: &[f64],
    threshold: f64,
    load_factor: f64,
) -> InfluenceEnvelope {
    let sign = load.direction.sign();
    let mut min: Option<(f64, String)> = None;
    let mut max: Option<(f64, String)> = None;
    for (reference, &reference_offset) in load.offsets.iter().enumerate() {
        for (stop, &start) in positions.iter().enumerate() {
            let total: f64 = load
                .magnitudes
                .iter()
                .zip(&load.offsets)
                .map(|(&magnitude, &offset)| {
                    let at = start + sign * (offset - reference_offset);
                    magnitude * interpolate(positions, line, at).unwrap_or(0.0)
                })
                .sum();
            let label = || format!("load #{} at joint {}", reference + 1, load.path[stop] + 1);
            if min.as_ref().map_or(true, |(value, _)| total < *value) {
                min = Some((total, label()));
            }
            if max.as_ref().map_or(true, |(value, _)| total > *value) {
                max = Some((total, label()));
            }
        }
    }
    let (min, min_position) = min.unwrap_or_default();
    let (max, max_position) = max.unwrap_or_default();
    InfluenceEnvelope {
        min: snap_to_zero(min, threshold) / load_factor,
        min_position,
        max: snap_to_zero(max, threshold) / load_factor,
        max_position,
    }
}
