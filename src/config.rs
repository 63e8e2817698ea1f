//! Configuration consumed by the checker and the solver.
//!
//! Every value has a default, so a configuration file only needs to name the
//! settings it changes.

use serde::{Deserialize, Serialize};

/// Family of units the model is expressed in.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum MeasurementSystem {
    /// SI based units.
    #[default]
    Metric,
    /// US customary units.
    Imperial,
}

/// Unit strings for each kind of physical quantity in the model.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UnitConfig {
    /// Cross-sectional area.
    pub area: String,
    /// Elastic modulus.
    pub modulus: String,
    /// Coordinates and bar lengths.
    pub length: String,
    /// Weight per unit volume.
    pub unit_weight: String,
    /// Joint loads, bar forces and reactions.
    pub load: String,
    /// Support settlements.
    pub settlement: String,
    /// Fabrication length errors.
    pub length_error: String,
    /// Metric or imperial, selects the zero-snap threshold.
    pub system: MeasurementSystem,
    /// Decimal places used when rendering notes.
    pub precision: usize,
}

impl Default for UnitConfig {
    fn default() -> Self {
        Self {
            area: "m^2".to_string(),
            modulus: "Pa".to_string(),
            length: "m".to_string(),
            unit_weight: "N/m^3".to_string(),
            load: "N".to_string(),
            settlement: "m".to_string(),
            length_error: "m".to_string(),
            system: MeasurementSystem::Metric,
            precision: 3,
        }
    }
}

impl UnitConfig {
    /// Typical US customary setup: inches, kips and ksi.
    #[must_use]
    pub fn imperial() -> Self {
        Self {
            area: "in^2".to_string(),
            modulus: "ksi".to_string(),
            length: "in".to_string(),
            unit_weight: "kip/in^3".to_string(),
            load: "kip".to_string(),
            settlement: "in".to_string(),
            length_error: "in".to_string(),
            system: MeasurementSystem::Imperial,
            precision: 3,
        }
    }
}

/// Geometric bounds, in the model's length unit.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Limits {
    /// Length of the substitute bar replacing an inclined roller.
    pub min_bar_length: f64,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            min_bar_length: 0.1,
        }
    }
}

/// Numerical thresholds. These are empirical and may be tuned per model.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tolerances {
    /// Geometric zero for parallelism and concurrency tests.
    pub geometric: f64,
    /// Smallest acceptable Cholesky pivot during the stability check.
    pub pivot: f64,
    /// Element stiffness entries below this magnitude are not stored.
    pub contribution: f64,
    /// Zero-snap threshold in newtons for metric models.
    pub zero_force_metric: f64,
    /// Zero-snap threshold in pounds-force for imperial models.
    pub zero_force_imperial: f64,
    /// Relative tolerance used when judging the statics self-check.
    pub statics: f64,
    /// Influence ordinates below this magnitude are reported as zero.
    pub ordinate: f64,
    /// Rigidity of a substitute bar relative to the stiffest real bar.
    pub substitute_stiffness_ratio: f64,
    /// Same ratio for the unit-property matrix of the stability check.
    pub check_substitute_ratio: f64,
}

impl Default for Tolerances {
    fn default() -> Self {
        Self {
            geometric: 1.0e-12,
            pivot: 1.0e-6,
            contribution: 1.0e-12,
            zero_force_metric: 1.0e-2,
            zero_force_imperial: 2.0e-3,
            statics: 1.0e-6,
            ordinate: 1.0e-12,
            substitute_stiffness_ratio: 1.0e6,
            check_substitute_ratio: 1.0e2,
        }
    }
}

/// Settings of the iterative solver.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverSettings {
    /// Relative residual at which GMRES stops.
    pub tolerance: f64,
    /// Upper bound on GMRES iterations across all restarts.
    pub max_iterations: usize,
    /// Krylov subspace size before a restart.
    pub restart: usize,
}

impl Default for SolverSettings {
    fn default() -> Self {
        Self {
            tolerance: 1.0e-14,
            max_iterations: 1000,
            restart: 50,
        }
    }
}

/// Complete configuration of a check or an analysis.
///
/// # Examples
/// ```
/// use trussx::AnalysisConfig;
///
/// let config = AnalysisConfig::from_json(r#"{ "units": { "length": "mm" } }"#)
///     .expect("valid configuration");
/// assert_eq!(config.units.length, "mm");
/// assert_eq!(config.units.load, "N");
/// assert_eq!(config.solver.max_iterations, 1000);
/// ```
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Units of the model.
    pub units: UnitConfig,
    /// Geometric bounds.
    pub limits: Limits,
    /// Numerical thresholds.
    pub tolerances: Tolerances,
    /// Iterative solver settings.
    pub solver: SolverSettings,
}

impl AnalysisConfig {
    /// Parse a configuration from JSON, filling unspecified settings with defaults.
    ///
    /// # Errors
    ///
    /// Returns the `serde_json` error when the text is not a valid configuration.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}
