//! Editable truss model built on an index-stable graph arena.

use petgraph::graph::{EdgeIndex, NodeIndex};
use petgraph::stable_graph::StableUnGraph;
use petgraph::visit::NodeIndexable;
use serde::{Deserialize, Serialize};

use crate::analysis::{self, AnalysisResults};
use crate::checker::{self, StabilityReport};
use crate::config::AnalysisConfig;
use crate::errors::{AnalysisError, BarPropertyError, TrussEditError};
use crate::geometry::{Force, Point};
use crate::loads::{
    FabricationError, InfluenceLoad, JointLoad, LoadCases, LoadSet, SupportSettlement,
    ThermalEffect,
};
use crate::snapshot::{BarData, Handles, RigidityMode, SupportData, TrussSnapshot};
use crate::support::SupportKind;

/// Stable handle of a support.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SupportIndex(usize);

impl SupportIndex {
    /// Create a handle from a raw index.
    #[must_use]
    pub const fn new(index: usize) -> Self {
        Self(index)
    }

    /// Raw index of the handle.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

/// Internal representation of a truss bar.
#[derive(Clone, Debug, Default)]
struct Bar {
    /// Cross-sectional area.
    area: Option<f64>,
    /// Elastic modulus.
    modulus: Option<f64>,
    /// Dimensionless rigidity factor.
    factor: Option<f64>,
    /// Weight per unit volume.
    unit_weight: f64,
}

/// Container for a pin-jointed planar truss model.
///
/// Joints and bars live in a [`StableUnGraph`], so their handles stay valid when
/// other joints or bars are removed. Supports live in a slot vector with the same
/// property. Analysis never reads this structure directly: it works on a
/// [`TrussSnapshot`] produced by [`Truss::snapshot`].
#[derive(Clone, Debug, Default)]
pub struct Truss {
    /// Joints and bars.
    graph: StableUnGraph<Point, Bar>,
    /// Support slots; removed supports leave `None` behind.
    supports: Vec<Option<Support>>,
    /// Rigidity mode shared by every bar.
    rigidity: RigidityMode,
    /// Joint loads.
    joint_loads: Vec<JointLoad<NodeIndex>>,
    /// Support settlements.
    settlements: Vec<SupportSettlement<SupportIndex>>,
    /// Thermal effects.
    thermal: Vec<ThermalEffect<EdgeIndex>>,
    /// Fabrication errors.
    fabrication: Vec<FabricationError<EdgeIndex>>,
    /// Influence loads.
    influence: Vec<InfluenceLoad<NodeIndex>>,
    /// Outcome of the last stability check, cleared by structural edits.
    last_check: Option<StabilityReport>,
}

/// Support stored by the editing model.
#[derive(Clone, Copy, Debug, PartialEq)]
struct Support {
    /// Supported joint.
    joint: NodeIndex,
    /// Restraint kind.
    kind: SupportKind,
}

impl Truss {
    /// Create an empty truss.
    ///
    /// # Examples
    /// ```
    /// use trussx::Truss;
    ///
    /// let truss = Truss::new();
    /// assert_eq!(truss.joint_count(), 0);
    /// ```
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the number of joints in the truss.
    #[must_use]
    pub fn joint_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Return the number of bars in the truss.
    #[must_use]
    pub fn bar_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Return the number of supports in the truss.
    #[must_use]
    pub fn support_count(&self) -> usize {
        self.supports.iter().flatten().count()
    }

    /// Add a new joint to the truss.
    ///
    /// # Examples
    /// ```
    /// use trussx::{point, Truss};
    ///
    /// let mut truss = Truss::new();
    /// let joint = truss.add_joint(point(0.0, 0.0));
    /// assert_eq!(truss.joint_count(), 1);
    /// assert_eq!(joint.index(), 0);
    /// ```
    pub fn add_joint(&mut self, position: Point) -> NodeIndex {
        self.invalidate();
        self.graph.add_node(position)
    }

    /// Update the position of an existing joint.
    ///
    /// # Errors
    ///
    /// Returns [`TrussEditError::UnknownJoint`] when `joint` is not part of this truss.
    pub fn move_joint(&mut self, joint: NodeIndex, position: Point) -> Result<(), TrussEditError> {
        let node = self
            .graph
            .node_weight_mut(joint)
            .ok_or(TrussEditError::UnknownJoint(joint))?;
        *node = position;
        self.invalidate();
        Ok(())
    }

    /// Remove a joint that has no bars and no support.
    ///
    /// # Errors
    ///
    /// Returns [`TrussEditError::UnknownJoint`] when `joint` is not part of this truss and
    /// [`TrussEditError::JointInUse`] when bars or a support are still attached.
    pub fn remove_joint(&mut self, joint: NodeIndex) -> Result<(), TrussEditError> {
        self.require_joint(joint)?;
        if self.graph.edges(joint).next().is_some() || self.support_at(joint).is_some() {
            return Err(TrussEditError::JointInUse(joint));
        }
        self.invalidate();
        self.graph.remove_node(joint);
        self.joint_loads.retain(|load| load.joint != joint);
        self.influence.retain(|load| !load.path.contains(&joint));
        Ok(())
    }

    /// Return the position of a joint.
    #[must_use]
    pub fn joint_position(&self, joint: NodeIndex) -> Option<Point> {
        self.graph.node_weight(joint).copied()
    }

    /// Connect two joints with a new bar.
    ///
    /// # Errors
    ///
    /// Returns [`TrussEditError::UnknownJoint`] for a missing joint,
    /// [`TrussEditError::IdenticalEndpoints`] when both ends are the same joint and
    /// [`TrussEditError::DuplicateBar`] when the joints are already connected.
    pub fn add_bar(&mut self, start: NodeIndex, end: NodeIndex) -> Result<EdgeIndex, TrussEditError> {
        self.require_joint(start)?;
        self.require_joint(end)?;
        if start == end {
            return Err(TrussEditError::IdenticalEndpoints(start));
        }
        if self.graph.find_edge(start, end).is_some() {
            return Err(TrussEditError::DuplicateBar(start, end));
        }
        self.invalidate();
        Ok(self.graph.add_edge(start, end, Bar::default()))
    }

    /// Remove a bar together with the strain loads applied to it.
    ///
    /// # Errors
    ///
    /// Returns [`TrussEditError::UnknownBar`] when `bar` is not part of this truss.
    pub fn remove_bar(&mut self, bar: EdgeIndex) -> Result<(), TrussEditError> {
        self.require_bar(bar)?;
        self.invalidate();
        self.graph.remove_edge(bar);
        self.thermal.retain(|load| load.bar != bar);
        self.fabrication.retain(|load| load.bar != bar);
        Ok(())
    }

    /// Select how bar rigidity is specified for the whole model.
    pub fn set_rigidity_mode(&mut self, mode: RigidityMode) {
        self.invalidate();
        self.rigidity = mode;
    }

    /// Set the area and elastic modulus of a bar.
    ///
    /// # Errors
    ///
    /// Returns [`TrussEditError::UnknownBar`] when `bar` is not part of this truss and
    /// [`TrussEditError::InvalidBarProperties`] when either value is not strictly positive.
    ///
    /// # Examples
    /// ```
    /// use trussx::{point, Truss, TrussEditError};
    ///
    /// let mut truss = Truss::new();
    /// let a = truss.add_joint(point(0.0, 0.0));
    /// let b = truss.add_joint(point(1.0, 0.0));
    /// let bar = truss.add_bar(a, b).expect("distinct joints");
    ///
    /// let error = truss
    ///     .set_bar_properties(bar, 0.0, 200.0e9)
    ///     .expect_err("invalid area rejected");
    /// assert!(matches!(error, TrussEditError::InvalidBarProperties(_)));
    /// ```
    pub fn set_bar_properties(
        &mut self,
        bar: EdgeIndex,
        area: f64,
        elastic_modulus: f64,
    ) -> Result<(), TrussEditError> {
        self.require_bar(bar)?;
        if area <= 0.0 {
            return Err(TrussEditError::InvalidBarProperties(
                BarPropertyError::NonPositiveArea { bar, area },
            ));
        }
        if elastic_modulus <= 0.0 {
            return Err(TrussEditError::InvalidBarProperties(
                BarPropertyError::NonPositiveElasticModulus {
                    bar,
                    elastic_modulus,
                },
            ));
        }
        self.invalidate();
        if let Some(edge) = self.graph.edge_weight_mut(bar) {
            edge.area = Some(area);
            edge.modulus = Some(elastic_modulus);
        }
        Ok(())
    }

    /// Set the same area and elastic modulus on every bar.
    ///
    /// # Errors
    ///
    /// Returns [`TrussEditError::InvalidBarProperties`] when either value is not
    /// strictly positive.
    pub fn set_properties_for_all(
        &mut self,
        area: f64,
        elastic_modulus: f64,
    ) -> Result<(), TrussEditError> {
        let bars: Vec<EdgeIndex> = self.graph.edge_indices().collect();
        for bar in bars {
            self.set_bar_properties(bar, area, elastic_modulus)?;
        }
        Ok(())
    }

    /// Set the dimensionless rigidity factor of a bar.
    ///
    /// # Errors
    ///
    /// Returns [`TrussEditError::UnknownBar`] when `bar` is not part of this truss and
    /// [`TrussEditError::InvalidBarProperties`] when `factor` is not strictly positive.
    pub fn set_bar_factor(&mut self, bar: EdgeIndex, factor: f64) -> Result<(), TrussEditError> {
        self.require_bar(bar)?;
        if factor <= 0.0 {
            return Err(TrussEditError::InvalidBarProperties(
                BarPropertyError::NonPositiveFactor { bar, factor },
            ));
        }
        self.invalidate();
        if let Some(edge) = self.graph.edge_weight_mut(bar) {
            edge.factor = Some(factor);
        }
        Ok(())
    }

    /// Set the weight per unit volume used for self-weight.
    ///
    /// # Errors
    ///
    /// Returns [`TrussEditError::UnknownBar`] when `bar` is not part of this truss.
    pub fn set_bar_unit_weight(
        &mut self,
        bar: EdgeIndex,
        unit_weight: f64,
    ) -> Result<(), TrussEditError> {
        let edge = self
            .graph
            .edge_weight_mut(bar)
            .ok_or(TrussEditError::UnknownBar(bar))?;
        edge.unit_weight = unit_weight;
        Ok(())
    }

    /// Support a joint, replacing any support it already carries.
    ///
    /// # Errors
    ///
    /// Returns [`TrussEditError::UnknownJoint`] when `joint` is not part of this truss.
    pub fn set_support(
        &mut self,
        joint: NodeIndex,
        kind: SupportKind,
    ) -> Result<SupportIndex, TrussEditError> {
        self.require_joint(joint)?;
        self.invalidate();
        if let Some(existing) = self.support_at(joint) {
            self.supports[existing.index()] = Some(Support { joint, kind });
            if !kind.accepts_settlement() {
                self.settlements.retain(|load| load.support != existing);
            }
            return Ok(existing);
        }
        self.supports.push(Some(Support { joint, kind }));
        Ok(SupportIndex::new(self.supports.len() - 1))
    }

    /// Remove a support together with its settlements.
    ///
    /// # Errors
    ///
    /// Returns [`TrussEditError::UnknownSupport`] when `support` is not part of this truss.
    pub fn remove_support(&mut self, support: SupportIndex) -> Result<(), TrussEditError> {
        let slot = self
            .supports
            .get_mut(support.index())
            .filter(|slot| slot.is_some())
            .ok_or(TrussEditError::UnknownSupport(support))?;
        *slot = None;
        self.invalidate();
        self.settlements.retain(|load| load.support != support);
        Ok(())
    }

    /// Return the support carried by a joint.
    #[must_use]
    pub fn support_at(&self, joint: NodeIndex) -> Option<SupportIndex> {
        self.supports
            .iter()
            .position(|slot| slot.is_some_and(|support| support.joint == joint))
            .map(SupportIndex::new)
    }

    /// Apply a point load to a joint.
    ///
    /// # Errors
    ///
    /// Returns [`TrussEditError::UnknownJoint`] when `joint` is not part of this truss.
    pub fn add_joint_load(
        &mut self,
        joint: NodeIndex,
        force: Force,
        position: &str,
    ) -> Result<(), TrussEditError> {
        self.require_joint(joint)?;
        self.joint_loads.push(JointLoad {
            joint,
            force,
            position: position.to_string(),
        });
        Ok(())
    }

    /// Settle a redundant bottom support downward by `settlement`.
    ///
    /// # Errors
    ///
    /// Returns [`TrussEditError::CheckRequired`] when no current stability check is
    /// available and [`TrussEditError::SettlementNotAllowed`] when the support is not
    /// a redundant fixed or roller bottom support.
    pub fn add_settlement(
        &mut self,
        support: SupportIndex,
        settlement: f64,
    ) -> Result<(), TrussEditError> {
        let data = self
            .supports
            .get(support.index())
            .copied()
            .flatten()
            .ok_or(TrussEditError::UnknownSupport(support))?;
        let snapshot_index = self.snapshot_support_index(support);
        let report = self.last_check.as_ref().ok_or(TrussEditError::CheckRequired)?;
        if !data.kind.accepts_settlement() || !report.redundant_supports.contains(&snapshot_index) {
            return Err(TrussEditError::SettlementNotAllowed(support));
        }
        self.settlements.push(SupportSettlement {
            support,
            settlement,
        });
        Ok(())
    }

    /// Heat or cool a redundant bar.
    ///
    /// # Errors
    ///
    /// Returns [`TrussEditError::CheckRequired`] when no current stability check is
    /// available and [`TrussEditError::BarNotRedundant`] when the bar is not redundant.
    pub fn add_thermal_effect(
        &mut self,
        bar: EdgeIndex,
        delta_t: f64,
        expansion: f64,
    ) -> Result<(), TrussEditError> {
        self.require_redundant_bar(bar)?;
        self.thermal.push(ThermalEffect {
            bar,
            delta_t,
            expansion,
        });
        Ok(())
    }

    /// Record a fabrication length error on a redundant bar.
    ///
    /// # Errors
    ///
    /// Returns [`TrussEditError::CheckRequired`] when no current stability check is
    /// available and [`TrussEditError::BarNotRedundant`] when the bar is not redundant.
    pub fn add_fabrication_error(
        &mut self,
        bar: EdgeIndex,
        length_error: f64,
    ) -> Result<(), TrussEditError> {
        self.require_redundant_bar(bar)?;
        self.fabrication.push(FabricationError { bar, length_error });
        Ok(())
    }

    /// Add a moving load train travelling along a path of joints.
    ///
    /// # Errors
    ///
    /// Returns [`TrussEditError::UnknownJoint`] for a missing path joint and
    /// [`TrussEditError::MalformedInfluenceLoad`] when the path has fewer than two
    /// joints or the magnitude and offset lists differ in length.
    pub fn add_influence_load(
        &mut self,
        load: InfluenceLoad<NodeIndex>,
    ) -> Result<(), TrussEditError> {
        for &joint in &load.path {
            self.require_joint(joint)?;
        }
        if !load.is_well_formed() {
            return Err(TrussEditError::MalformedInfluenceLoad(load.name));
        }
        self.influence.retain(|existing| existing.name != load.name);
        self.influence.push(load);
        Ok(())
    }

    /// Stability report of the last check, if the structure has not changed since.
    #[must_use]
    pub fn last_check(&self) -> Option<&StabilityReport> {
        self.last_check.as_ref()
    }

    /// Produce an immutable value copy with contiguous indices.
    #[must_use]
    pub fn snapshot(&self) -> TrussSnapshot {
        let joint_handles: Vec<NodeIndex> = self.graph.node_indices().collect();
        let mut position = vec![usize::MAX; self.graph.node_bound()];
        for (index, handle) in joint_handles.iter().enumerate() {
            position[handle.index()] = index;
        }
        let joints = joint_handles.iter().map(|&joint| self.graph[joint]).collect();

        let bar_handles: Vec<EdgeIndex> = self.graph.edge_indices().collect();
        let bars = bar_handles
            .iter()
            .filter_map(|&bar| {
                let (start, end) = self.graph.edge_endpoints(bar)?;
                let weight = &self.graph[bar];
                Some(BarData {
                    start: position[start.index()],
                    end: position[end.index()],
                    area: weight.area,
                    modulus: weight.modulus,
                    factor: weight.factor,
                    unit_weight: weight.unit_weight,
                })
            })
            .collect();
        let bar_position = |bar: EdgeIndex| bar_handles.iter().position(|&handle| handle == bar);

        let mut support_handles = Vec::new();
        let mut supports = Vec::new();
        for (index, slot) in self.supports.iter().enumerate() {
            if let Some(support) = slot {
                support_handles.push(SupportIndex::new(index));
                supports.push(SupportData {
                    joint: position[support.joint.index()],
                    kind: support.kind,
                });
            }
        }
        let support_position =
            |support: SupportIndex| support_handles.iter().position(|&handle| handle == support);

        let loads = LoadSet {
            joint_loads: self
                .joint_loads
                .iter()
                .map(|load| JointLoad {
                    joint: position[load.joint.index()],
                    force: load.force,
                    position: load.position.clone(),
                })
                .collect(),
            settlements: self
                .settlements
                .iter()
                .filter_map(|load| {
                    Some(SupportSettlement {
                        support: support_position(load.support)?,
                        settlement: load.settlement,
                    })
                })
                .collect(),
            thermal: self
                .thermal
                .iter()
                .filter_map(|load| {
                    Some(ThermalEffect {
                        bar: bar_position(load.bar)?,
                        delta_t: load.delta_t,
                        expansion: load.expansion,
                    })
                })
                .collect(),
            fabrication: self
                .fabrication
                .iter()
                .filter_map(|load| {
                    Some(FabricationError {
                        bar: bar_position(load.bar)?,
                        length_error: load.length_error,
                    })
                })
                .collect(),
            influence: self
                .influence
                .iter()
                .map(|load| InfluenceLoad {
                    name: load.name.clone(),
                    direction: load.direction,
                    path: load.path.iter().map(|joint| position[joint.index()]).collect(),
                    magnitudes: load.magnitudes.clone(),
                    offsets: load.offsets.clone(),
                })
                .collect(),
        };

        TrussSnapshot {
            joints,
            bars,
            supports,
            rigidity: self.rigidity,
            loads,
            handles: Handles {
                joints: joint_handles,
                bars: bar_handles,
                supports: support_handles,
            },
        }
    }

    /// Run the stability check on a fresh snapshot and remember its outcome.
    pub fn check(&mut self, config: &AnalysisConfig) -> StabilityReport {
        let report = checker::check(&self.snapshot(), config);
        self.last_check = Some(report.clone());
        report
    }

    /// Analyse a fresh snapshot under the enabled load cases.
    ///
    /// Settlements, thermal effects and fabrication errors were accepted against an
    /// earlier check. When any of them is enabled the model is checked again, so
    /// a strain load left on a support or bar that is no longer redundant is
    /// rejected instead of solved.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError`] when the model is unstable, inconsistent or any load
    /// case fails to converge.
    pub fn analyze(
        &self,
        cases: &LoadCases,
        config: &AnalysisConfig,
    ) -> Result<AnalysisResults, AnalysisError> {
        let snapshot = self.snapshot();
        let loads = &snapshot.loads;
        let gated = (cases.settlements && !loads.settlements.is_empty())
            || (cases.thermal && !loads.thermal.is_empty())
            || (cases.fabrication && !loads.fabrication.is_empty());
        if gated {
            let report = checker::check(&snapshot, config);
            require_redundant_strain_loads(&snapshot, cases, &report)?;
        }
        analysis::analyze(&snapshot, cases, config)
    }

    /// Forget the last stability check after a structural change.
    fn invalidate(&mut self) {
        self.last_check = None;
    }

    /// Position the support will take in the next snapshot.
    fn snapshot_support_index(&self, support: SupportIndex) -> usize {
        self.supports[..support.index()].iter().flatten().count()
    }

    /// Ensure a joint exists.
    fn require_joint(&self, joint: NodeIndex) -> Result<(), TrussEditError> {
        self.graph
            .node_weight(joint)
            .map(|_| ())
            .ok_or(TrussEditError::UnknownJoint(joint))
    }

    /// Ensure a bar exists.
    fn require_bar(&self, bar: EdgeIndex) -> Result<(), TrussEditError> {
        self.graph
            .edge_weight(bar)
            .map(|_| ())
            .ok_or(TrussEditError::UnknownBar(bar))
    }

    /// Ensure a bar exists and was found redundant by the current check.
    fn require_redundant_bar(&self, bar: EdgeIndex) -> Result<(), TrussEditError> {
        self.require_bar(bar)?;
        let report = self.last_check.as_ref().ok_or(TrussEditError::CheckRequired)?;
        let snapshot_index = self
            .graph
            .edge_indices()
            .position(|handle| handle == bar)
            .ok_or(TrussEditError::UnknownBar(bar))?;
        if report.redundant_bars.contains(&snapshot_index) {
            Ok(())
        } else {
            Err(TrussEditError::BarNotRedundant(bar))
        }
    }
}

/// Every enabled strain load must sit on a support or bar the report finds redundant.
fn require_redundant_strain_loads(
    snapshot: &TrussSnapshot,
    cases: &LoadCases,
    report: &StabilityReport,
) -> Result<(), AnalysisError> {
    let loads = &snapshot.loads;
    if cases.settlements {
        if let Some(settlement) = loads
            .settlements
            .iter()
            .find(|settlement| !report.redundant_supports.contains(&settlement.support))
        {
            return Err(AnalysisError::IneligibleSettlement(settlement.support));
        }
    }
    let thermal = loads.thermal.iter().filter(|_| cases.thermal).map(|effect| effect.bar);
    let fabrication = loads
        .fabrication
        .iter()
        .filter(|_| cases.fabrication)
        .map(|error| error.bar);
    match thermal
        .chain(fabrication)
        .find(|bar| !report.redundant_bars.contains(bar))
    {
        Some(bar) => Err(AnalysisError::NonRedundantBar(bar)),
        None => Ok(()),
    }
}
