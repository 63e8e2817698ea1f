//! Immutable value copy of a truss consumed by the checker and the solver.
//!
//! Joints, bars and supports are stored in contiguous vectors; every
//! cross-reference is an index into one of them. Result lists produced by the
//! analysis are positionally aligned with these vectors.

use petgraph::graph::{EdgeIndex, NodeIndex, UnGraph};
use serde::{Deserialize, Serialize};

use crate::errors::AnalysisError;
use crate::geometry::{self, Point};
use crate::loads::LoadSet;
use crate::support::SupportKind;
use crate::truss::SupportIndex;

/// How the axial rigidity of bars is specified. The mode applies to the whole model.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RigidityMode {
    /// Rigidity is area × elastic modulus.
    #[default]
    Explicit,
    /// Rigidity is a dimensionless factor.
    Factor,
}

/// Bar of a snapshot.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BarData {
    /// Index of the first joint.
    pub start: usize,
    /// Index of the second joint.
    pub end: usize,
    /// Cross-sectional area.
    pub area: Option<f64>,
    /// Elastic modulus.
    pub modulus: Option<f64>,
    /// Dimensionless rigidity factor.
    pub factor: Option<f64>,
    /// Weight per unit volume.
    pub unit_weight: f64,
}

impl BarData {
    /// Bar between two joints without properties.
    #[must_use]
    pub fn new(start: usize, end: usize) -> Self {
        Self {
            start,
            end,
            area: None,
            modulus: None,
            factor: None,
            unit_weight: 0.0,
        }
    }

    /// Axial rigidity under the given mode, when the required properties are present.
    #[must_use]
    pub fn rigidity(&self, mode: RigidityMode) -> Option<f64> {
        match mode {
            RigidityMode::Explicit => Some(self.area? * self.modulus?),
            RigidityMode::Factor => self.factor,
        }
    }

    /// Return `true` when the bar is attached to `joint`.
    #[must_use]
    pub fn touches(&self, joint: usize) -> bool {
        self.start == joint || self.end == joint
    }

    /// Joint at the opposite end from `joint`.
    #[must_use]
    pub fn other_end(&self, joint: usize) -> usize {
        if self.start == joint {
            self.end
        } else {
            self.start
        }
    }
}

/// Support of a snapshot.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SupportData {
    /// Index of the supported joint.
    pub joint: usize,
    /// Kind of support.
    pub kind: SupportKind,
}

/// Handles of the editing model that produced a snapshot, in snapshot order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Handles {
    /// Joint handles.
    pub joints: Vec<NodeIndex>,
    /// Bar handles.
    pub bars: Vec<EdgeIndex>,
    /// Support handles.
    pub supports: Vec<SupportIndex>,
}

/// Value copy of a truss model.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TrussSnapshot {
    /// Joint coordinates.
    pub joints: Vec<Point>,
    /// Bars.
    pub bars: Vec<BarData>,
    /// Supports, at most one per joint.
    pub supports: Vec<SupportData>,
    /// Rigidity mode shared by all bars.
    pub rigidity: RigidityMode,
    /// Load entities.
    pub loads: LoadSet,
    /// Handles of the originating editing model, empty for hand-built snapshots.
    #[serde(skip)]
    pub handles: Handles,
}

impl TrussSnapshot {
    /// Number of joints.
    #[must_use]
    pub fn joint_count(&self) -> usize {
        self.joints.len()
    }

    /// Number of bars.
    #[must_use]
    pub fn bar_count(&self) -> usize {
        self.bars.len()
    }

    /// Number of supports.
    #[must_use]
    pub fn support_count(&self) -> usize {
        self.supports.len()
    }

    /// Support index for every joint.
    #[must_use]
    pub fn support_by_joint(&self) -> Vec<Option<usize>> {
        let mut lookup = vec![None; self.joints.len()];
        for (index, support) in self.supports.iter().enumerate() {
            if let Some(slot) = lookup.get_mut(support.joint) {
                *slot = Some(index);
            }
        }
        lookup
    }

    /// Number of bars attached to each joint.
    #[must_use]
    pub fn degrees(&self) -> Vec<usize> {
        let mut degrees = vec![0; self.joints.len()];
        for bar in &self.bars {
            degrees[bar.start] += 1;
            degrees[bar.end] += 1;
        }
        degrees
    }

    /// Undirected adjacency graph whose node and edge indices equal joint and bar indices.
    #[must_use]
    pub fn adjacency(&self) -> UnGraph<(), usize> {
        let mut graph = UnGraph::with_capacity(self.joints.len(), self.bars.len());
        for _ in &self.joints {
            graph.add_node(());
        }
        for (index, bar) in self.bars.iter().enumerate() {
            graph.add_edge(NodeIndex::new(bar.start), NodeIndex::new(bar.end), index);
        }
        graph
    }

    /// Length of a bar.
    #[must_use]
    pub fn bar_length(&self, bar: usize) -> f64 {
        let data = &self.bars[bar];
        self.joints[data.start].distance_to(self.joints[data.end])
    }

    /// Check that every cross-reference points at an existing entity.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::InvalidReference`] describing the first broken
    /// reference, or [`AnalysisError::ZeroLengthBar`] for a bar whose joints coincide.
    pub fn validate(&self) -> Result<(), AnalysisError> {
        let joints = self.joints.len();
        let bars = self.bars.len();
        let supports = self.supports.len();
        for (index, bar) in self.bars.iter().enumerate() {
            if bar.start >= joints || bar.end >= joints {
                return Err(AnalysisError::InvalidReference(format!(
                    "bar {index} references a missing joint"
                )));
            }
            if geometry::direction(self.joints[bar.start], self.joints[bar.end]).is_none() {
                return Err(AnalysisError::ZeroLengthBar(index));
            }
        }
        let mut supported = vec![false; joints];
        for (index, support) in self.supports.iter().enumerate() {
            let Some(flag) = supported.get_mut(support.joint) else {
                return Err(AnalysisError::InvalidReference(format!(
                    "support {index} references a missing joint"
                )));
            };
            if *flag {
                return Err(AnalysisError::InvalidReference(format!(
                    "joint {} carries more than one support",
                    support.joint
                )));
            }
            *flag = true;
        }
        let loads = &self.loads;
        if loads.joint_loads.iter().any(|load| load.joint >= joints)
            || loads.influence.iter().any(|load| load.path.iter().any(|&j| j >= joints))
        {
            return Err(AnalysisError::InvalidReference(
                "a load references a missing joint".to_string(),
            ));
        }
        if loads.thermal.iter().any(|load| load.bar >= bars)
            || loads.fabrication.iter().any(|load| load.bar >= bars)
        {
            return Err(AnalysisError::InvalidReference(
                "a load references a missing bar".to_string(),
            ));
        }
        if loads.settlements.iter().any(|load| load.support >= supports) {
            return Err(AnalysisError::InvalidReference(
                "a settlement references a missing support".to_string(),
            ));
        }
        Ok(())
    }

    /// Derive a reduced snapshot holding only the flagged entities.
    ///
    /// Joints are renumbered in their original order. Bars or supports whose
    /// joints are dropped are dropped too. Loads are not carried over, since
    /// reduced snapshots only feed the stability checks.
    #[must_use]
    pub fn retain(&self, keep_joint: &[bool], keep_bar: &[bool], keep_support: &[bool]) -> Self {
        let mut renumber = vec![None; self.joints.len()];
        let mut joints = Vec::new();
        for (index, joint) in self.joints.iter().enumerate() {
            if keep_joint[index] {
                renumber[index] = Some(joints.len());
                joints.push(*joint);
            }
        }
        let bars = self
            .bars
            .iter()
            .enumerate()
            .filter(|(index, _)| keep_bar[*index])
            .filter_map(|(_, bar)| {
                Some(BarData {
                    start: renumber[bar.start]?,
                    end: renumber[bar.end]?,
                    ..bar.clone()
                })
            })
            .collect();
        let supports = self
            .supports
            .iter()
            .enumerate()
            .filter(|(index, _)| keep_support[*index])
            .filter_map(|(_, support)| {
                Some(SupportData {
                    joint: renumber[support.joint]?,
                    kind: support.kind,
                })
            })
            .collect();
        Self {
            joints,
            bars,
            supports,
            rigidity: self.rigidity,
            loads: LoadSet::default(),
            handles: Handles::default(),
        }
    }

    /// Reduced snapshot without `bar`.
    ///
    /// A supported joint left without any bar is dropped together with its support.
    #[must_use]
    pub fn without_bar(&self, bar: usize) -> Self {
        let mut keep_joint = vec![true; self.joints.len()];
        let mut keep_bar = vec![true; self.bars.len()];
        let mut keep_support = vec![true; self.supports.len()];
        keep_bar[bar] = false;
        let degrees = self.degrees();
        let supports = self.support_by_joint();
        for joint in [self.bars[bar].start, self.bars[bar].end] {
            if degrees[joint] == 1 {
                if let Some(support) = supports[joint] {
                    keep_joint[joint] = false;
                    keep_support[support] = false;
                }
            }
        }
        self.retain(&keep_joint, &keep_bar, &keep_support)
    }

    /// Reduced snapshot without `support`.
    ///
    /// When the supported joint carries a single bar, the joint and that bar are
    /// dropped as well.
    #[must_use]
    pub fn without_support(&self, support: usize) -> Self {
        let mut keep_joint = vec![true; self.joints.len()];
        let mut keep_bar = vec![true; self.bars.len()];
        let mut keep_support = vec![true; self.supports.len()];
        keep_support[support] = false;
        let joint = self.supports[support].joint;
        if self.degrees()[joint] == 1 {
            keep_joint[joint] = false;
            for (index, bar) in self.bars.iter().enumerate() {
                if bar.touches(joint) {
                    keep_bar[index] = false;
                }
            }
        }
        self.retain(&keep_joint, &keep_bar, &keep_support)
    }
}
