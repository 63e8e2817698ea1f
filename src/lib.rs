#![warn(clippy::all)]
#![warn(missing_docs)]
#![warn(rustdoc::missing_doc_code_examples)]
#![warn(clippy::missing_docs_in_private_items)]
#![doc = include_str!("../README.md")]

pub mod analysis;
pub mod assembly;
pub mod checker;
pub mod config;
mod errors;
pub mod geometry;
pub mod influence;
pub mod loads;
pub mod progress;
pub mod report;
pub mod snapshot;
pub mod solver;
pub mod support;
pub mod task;
mod truss;
pub mod units;

pub use analysis::{AnalysisResults, StaticsCheck};
pub use checker::{Instability, StabilityReport};
pub use config::{AnalysisConfig, Limits, MeasurementSystem, SolverSettings, Tolerances, UnitConfig};
pub use errors::{AnalysisError, BarPropertyError, TrussEditError, UnitError};
pub use geometry::{force, point, Displacement, Force, Point};
pub use influence::{InfluenceEnvelope, InfluenceResult};
pub use loads::{
    Direction, FabricationError, InfluenceLoad, JointLoad, LoadCases, SupportSettlement,
    ThermalEffect,
};
pub use snapshot::{RigidityMode, TrussSnapshot};
pub use support::{Side, SupportKind};
pub use truss::{SupportIndex, Truss};
