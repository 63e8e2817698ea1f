//! Load entities and the selection of load cases enabled for an analysis.
//!
//! Each entity is generic over the handle type it uses to reference joints, bars
//! or supports. The editing model stores graph handles; a
//! [`TrussSnapshot`](crate::TrussSnapshot) stores contiguous `usize` indices.

use serde::{Deserialize, Serialize};

use crate::geometry::Force;

/// External force applied at a joint.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct JointLoad<J = usize> {
    /// Loaded joint.
    pub joint: J,
    /// Horizontal and vertical components in the model's load unit.
    pub force: Force,
    /// Free-form tag describing where the load acts.
    pub position: String,
}

/// Prescribed downward movement of a support, in the settlement unit.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SupportSettlement<S = usize> {
    /// Settling support.
    pub support: S,
    /// Magnitude of the settlement, positive downward.
    pub settlement: f64,
}

/// Uniform temperature change of a bar.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ThermalEffect<B = usize> {
    /// Heated or cooled bar.
    pub bar: B,
    /// Temperature change.
    pub delta_t: f64,
    /// Coefficient of thermal expansion per degree.
    pub expansion: f64,
}

/// Lack of fit of a bar: positive when the bar was fabricated too long.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FabricationError<B = usize> {
    /// Affected bar.
    pub bar: B,
    /// Length error in the length-error unit.
    pub length_error: f64,
}

/// Direction in which a load train travels along an influence path.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    /// Loads trail the reference load towards the start of the path.
    #[default]
    Forward,
    /// Loads trail the reference load towards the end of the path.
    Backward,
}

impl Direction {
    /// Sign applied to load offsets along the path.
    #[must_use]
    pub fn sign(self) -> f64 {
        match self {
            Direction::Forward => -1.0,
            Direction::Backward => 1.0,
        }
    }
}

/// Moving train of point loads travelling along a path of joints.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InfluenceLoad<J = usize> {
    /// Name used to select the influence load for an analysis.
    pub name: String,
    /// Direction of travel.
    pub direction: Direction,
    /// Ordered joints the unit load visits.
    pub path: Vec<J>,
    /// Downward point-load magnitudes in the load unit.
    pub magnitudes: Vec<f64>,
    /// Offset of each point load from the first one, in the length unit.
    pub offsets: Vec<f64>,
}

impl<J> InfluenceLoad<J> {
    /// Return `true` when the path is usable and both load lists line up.
    #[must_use]
    pub fn is_well_formed(&self) -> bool {
        self.path.len() >= 2
            && !self.magnitudes.is_empty()
            && self.magnitudes.len() == self.offsets.len()
    }
}

/// All load entities of a snapshot.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LoadSet {
    /// Joint loads.
    pub joint_loads: Vec<JointLoad>,
    /// Support settlements.
    pub settlements: Vec<SupportSettlement>,
    /// Thermal effects.
    pub thermal: Vec<ThermalEffect>,
    /// Fabrication errors.
    pub fabrication: Vec<FabricationError>,
    /// Influence loads.
    pub influence: Vec<InfluenceLoad>,
}

/// Load cases enabled for one analysis run.
///
/// # Examples
/// ```
/// use trussx::LoadCases;
///
/// let cases = LoadCases::default().with_self_weight().with_influence("crane");
/// assert!(cases.joint_loads);
/// assert!(cases.self_weight);
/// assert_eq!(cases.influence.as_deref(), Some("crane"));
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadCases {
    /// Apply the joint loads.
    pub joint_loads: bool,
    /// Apply the self-weight of every bar.
    pub self_weight: bool,
    /// Apply support settlements.
    pub settlements: bool,
    /// Apply thermal effects.
    pub thermal: bool,
    /// Apply fabrication errors.
    pub fabrication: bool,
    /// Name of the influence load to evaluate, if any.
    pub influence: Option<String>,
}

impl Default for LoadCases {
    fn default() -> Self {
        Self {
            joint_loads: true,
            self_weight: false,
            settlements: false,
            thermal: false,
            fabrication: false,
            influence: None,
        }
    }
}

impl LoadCases {
    /// Enable every static case.
    #[must_use]
    pub fn all_static() -> Self {
        Self {
            joint_loads: true,
            self_weight: true,
            settlements: true,
            thermal: true,
            fabrication: true,
            influence: None,
        }
    }

    /// Enable self-weight.
    #[must_use]
    pub fn with_self_weight(mut self) -> Self {
        self.self_weight = true;
        self
    }

    /// Enable support settlements.
    #[must_use]
    pub fn with_settlements(mut self) -> Self {
        self.settlements = true;
        self
    }

    /// Enable thermal effects.
    #[must_use]
    pub fn with_thermal(mut self) -> Self {
        self.thermal = true;
        self
    }

    /// Enable fabrication errors.
    #[must_use]
    pub fn with_fabrication(mut self) -> Self {
        self.fabrication = true;
        self
    }

    /// Evaluate the named influence load.
    #[must_use]
    pub fn with_influence(mut self, name: &str) -> Self {
        self.influence = Some(name.to_string());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn influence_load_requires_matching_lists() {
        let mut load = InfluenceLoad {
            name: "train".to_string(),
            direction: Direction::Forward,
            path: vec![0, 1, 2],
            magnitudes: vec![10.0, 5.0],
            offsets: vec![0.0],
        };
        assert!(!load.is_well_formed());
        load.offsets.push(2.0);
        assert!(load.is_well_formed());
    }

    #[test]
    fn default_cases_only_apply_joint_loads() {
        let cases = LoadCases::default();
        assert!(cases.joint_loads);
        assert!(!cases.self_weight && !cases.settlements && !cases.thermal && !cases.fabrication);
        assert!(cases.influence.is_none());
    }
}
