//! Human-readable notes and text summaries.

use crate::analysis::{AnalysisResults, StaticsCheck};
use crate::checker::{Instability, StabilityReport};
use crate::config::UnitConfig;

/// Note describing the outcome of the stability checks.
#[must_use]
pub fn stability_note(outcome: &Result<usize, Instability>) -> String {
    match outcome {
        Ok(0) => "The truss is stable and statically determinate.".to_string(),
        Ok(degree) => format!(
            "The truss is stable and statically indeterminate to degree {degree}."
        ),
        Err(reason) => format!("The truss is unstable: {reason}."),
    }
}

/// Note listing the equilibrium sums of an analysis.
#[must_use]
pub fn statics_note(statics: &StaticsCheck, units: &UnitConfig) -> String {
    let precision = units.precision;
    let verdict = if statics.balanced {
        "equilibrium satisfied"
    } else {
        "equilibrium NOT satisfied"
    };
    format!(
        "Statics check: sum Fx = {:.precision$} {load}, sum Fy = {:.precision$} {load}, \
         sum M = {:.precision$} {load}*{length} ({verdict}).",
        statics.sum_x,
        statics.sum_y,
        statics.moment,
        load = units.load,
        length = units.length,
    )
}

/// Render a plain-text summary of a check and, when available, an analysis.
///
/// Joints, bars and supports are numbered from 1 in snapshot order.
#[must_use]
pub fn render_summary(
    stability: &StabilityReport,
    results: Option<&AnalysisResults>,
    units: &UnitConfig,
) -> String {
    let precision = units.precision;
    let mut output = String::new();
    output.push_str(&format!("{}\n", stability.note));
    if stability.stable {
        output.push_str(&format!(
            "Redundant bars: {}\n",
            numbered(stability.redundant_bars.iter())
        ));
        output.push_str(&format!(
            "Redundant supports: {}\n",
            numbered(stability.redundant_supports.iter())
        ));
    }

    let Some(results) = results else {
        return output;
    };

    output.push_str(&format!("Joint deflections ({}):\n", units.length));
    for (index, deflection) in results.joint_deflections.iter().enumerate() {
        output.push_str(&format!(
            "  joint {}: dx = {:+.3e}, dy = {:+.3e}\n",
            index + 1,
            deflection.x,
            deflection.y
        ));
    }
    // Tension is positive, compression negative.
    output.push_str(&format!("Bar forces ({}):\n", units.load));
    for (index, force) in results.bar_forces.iter().enumerate() {
        output.push_str(&format!("  bar {}: {force:+.precision$}\n", index + 1));
    }
    output.push_str(&format!("Support reactions ({}):\n", units.load));
    for (index, reaction) in results.support_reactions.iter().enumerate() {
        output.push_str(&format!(
            "  support {}: Rx = {:+.precision$}, Ry = {:+.precision$}\n",
            index + 1,
            reaction.x,
            reaction.y
        ));
    }
    if let Some(influence) = &results.influence {
        output.push_str(&format!("Influence load '{}':\n", influence.name));
        for (index, envelope) in influence.envelopes.iter().enumerate() {
            output.push_str(&format!(
                "  bar {}: min {:+.precision$} ({}), max {:+.precision$} ({})\n",
                index + 1,
                envelope.min,
                envelope.min_position,
                envelope.max,
                envelope.max_position
            ));
        }
    }
    output.push_str(&results.note);
    output.push('\n');
    output
}

/// Comma-separated 1-based labels.
fn numbered<'a>(indices: impl Iterator<Item = &'a usize>) -> String {
    let labels: Vec<String> = indices.map(|index| (index + 1).to_string()).collect();
    if labels.is_empty() {
        "none".to_string()
    } else {
        labels.join(", ")
    }
}
