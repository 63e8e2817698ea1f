//! Error types produced while editing or analysing trusses.

use petgraph::graph::{EdgeIndex, NodeIndex};
use thiserror::Error;

use crate::truss::SupportIndex;
use crate::units::QuantityKind;

/// Error returned when a truss analysis cannot produce results.
///
/// Validation failures found by the stability checker are not errors; they are
/// reported through [`StabilityReport`](crate::StabilityReport). The variants
/// below cover inputs that break the contract with the analysis core and
/// numerical failures of the solve itself.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum AnalysisError {
    /// Returned when the stability checker rejects the model before solving.
    #[error("the truss is not stable: {0}")]
    Unstable(String),
    /// Returned when any enabled load case fails to converge.
    #[error("the analysis failed to converge; no results are available")]
    FailedToConverge,
    /// Returned when a configured unit cannot be resolved.
    #[error(transparent)]
    Unit(#[from] UnitError),
    /// Returned when a bar lacks the rigidity required by the model's rigidity mode.
    #[error("bar {0} is missing axial rigidity properties")]
    MissingProperties(usize),
    /// Returned when a bar spans zero distance.
    #[error("bar {0} has zero length")]
    ZeroLengthBar(usize),
    /// Returned when self-weight is requested but a bar has no cross-sectional area.
    #[error("self-weight of bar {0} requires an explicit cross-sectional area")]
    SelfWeightRequiresArea(usize),
    /// Returned when a settlement references a support that cannot settle.
    #[error("support {0} does not accept a settlement")]
    IneligibleSettlement(usize),
    /// Returned when a thermal effect or fabrication error sits on a bar the
    /// current stability check does not find redundant.
    #[error("bar {0} is not redundant and cannot carry a strain load")]
    NonRedundantBar(usize),
    /// Returned when the requested influence load is not part of the model.
    #[error("influence load '{0}' does not exist")]
    UnknownInfluenceLoad(String),
    /// Returned when an influence load has an empty path or mismatched load lists.
    #[error("influence load '{0}' is malformed")]
    MalformedInfluenceLoad(String),
    /// Returned when the snapshot references an entity that does not exist.
    #[error("snapshot is inconsistent: {0}")]
    InvalidReference(String),
    /// Returned when a background task terminated without delivering a result.
    #[error("the background analysis task terminated unexpectedly")]
    TaskPanicked,
}

/// Error returned when a unit string is not recognised for a quantity kind.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum UnitError {
    /// The unit string is unknown for the given kind of quantity.
    #[error("unknown {kind} unit '{unit}'")]
    Unknown {
        /// Quantity the unit was configured for.
        kind: QuantityKind,
        /// Rejected unit string.
        unit: String,
    },
}

/// Error returned when updating the axial properties of a bar.
///
/// The variants describe the reason the supplied value is rejected so callers can
/// present actionable feedback to users.
#[derive(Clone, Copy, Debug, Error, PartialEq)]
pub enum BarPropertyError {
    /// Returned when the cross-sectional area is zero or negative.
    #[error("area must be positive (received {area})")]
    NonPositiveArea {
        /// Identifier of the affected bar.
        bar: EdgeIndex,
        /// Rejected cross-sectional area.
        area: f64,
    },
    /// Returned when the elastic modulus is zero or negative.
    #[error("elastic modulus must be positive (received {elastic_modulus})")]
    NonPositiveElasticModulus {
        /// Identifier of the affected bar.
        bar: EdgeIndex,
        /// Rejected elastic modulus.
        elastic_modulus: f64,
    },
    /// Returned when the dimensionless rigidity factor is zero or negative.
    #[error("rigidity factor must be positive (received {factor})")]
    NonPositiveFactor {
        /// Identifier of the affected bar.
        bar: EdgeIndex,
        /// Rejected factor.
        factor: f64,
    },
}

/// Error returned when editing a [`Truss`](crate::Truss) with invalid input.
///
/// Attempting to mutate the structure with a joint, bar or support that is not part
/// of the current model returns a descriptive variant so callers can decide how to
/// recover.
///
/// # Examples
///
/// ```
/// use petgraph::graph::EdgeIndex;
/// use trussx::{Truss, TrussEditError};
///
/// let mut truss = Truss::new();
/// let invalid_bar = EdgeIndex::new(42);
/// let error = truss
///     .set_bar_properties(invalid_bar, 0.01, 200.0e9)
///     .expect_err("unknown bar is rejected");
/// assert_eq!(error, TrussEditError::UnknownBar(invalid_bar));
/// ```
#[derive(Clone, Debug, Error, PartialEq)]
pub enum TrussEditError {
    /// Returned when a joint cannot be found in the truss.
    #[error("joint {0:?} does not exist in this truss")]
    UnknownJoint(NodeIndex),
    /// Returned when a bar cannot be found in the truss.
    #[error("bar {0:?} does not exist in this truss")]
    UnknownBar(EdgeIndex),
    /// Returned when a support cannot be found in the truss.
    #[error("support {0:?} does not exist in this truss")]
    UnknownSupport(SupportIndex),
    /// Returned when a joint still carries bars or a support and cannot be removed.
    #[error("joint {0:?} still has bars or a support attached")]
    JointInUse(NodeIndex),
    /// Returned when a bar would connect a joint to itself.
    #[error("a bar cannot connect joint {0:?} to itself")]
    IdenticalEndpoints(NodeIndex),
    /// Returned when two joints are already connected by a bar.
    #[error("joints {0:?} and {1:?} are already connected")]
    DuplicateBar(NodeIndex, NodeIndex),
    /// Returned when the supplied bar properties are invalid.
    #[error("{0}")]
    InvalidBarProperties(BarPropertyError),
    /// Returned when a settlement, thermal effect or fabrication error is added
    /// before a current stability check is available.
    #[error("run the stability check before adding this load")]
    CheckRequired,
    /// Returned when a support cannot receive a settlement.
    #[error("support {0:?} is not a redundant bottom support and cannot settle")]
    SettlementNotAllowed(SupportIndex),
    /// Returned when a bar is not redundant and cannot receive a strain load.
    #[error("bar {0:?} is not redundant")]
    BarNotRedundant(EdgeIndex),
    /// Returned when an influence load has no path or its load lists differ in length.
    #[error("influence load '{0}' is malformed")]
    MalformedInfluenceLoad(String),
}
