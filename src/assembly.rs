//! Partitioned sparse stiffness assembly.
//!
//! Every joint owns two degrees of freedom, `2 * joint` (x) and `2 * joint + 1`
//! (y). Inclined rollers are modelled with a substitute joint appended after the
//! real joints: the substitute joint is fully fixed and linked to the supported
//! joint by a very stiff bar along the restraint direction.
//!
//! Degrees of freedom are split into a free and a fixed set, and the global
//! matrix is stored as four CSR blocks:
//!
//! ```text
//! | K11 K12 | | u_f |   | f_f |
//! | K21 K22 | | u_s | = | f_s |
//! ```

use log::debug;
use nalgebra::{DVector, Vector2};
use nalgebra_sparse::{CooMatrix, CsrMatrix};

use crate::errors::AnalysisError;
use crate::geometry::{self, Point};
use crate::snapshot::TrussSnapshot;
use crate::support::Restraint;

/// Source of bar rigidities.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Properties {
    /// Every real bar has rigidity one. Used by the stability check.
    Unit,
    /// Rigidities come from the bar properties.
    Actual,
}

/// Settings of one assembly.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AssemblyOptions {
    /// Where rigidities come from.
    pub properties: Properties,
    /// Length of substitute bars.
    pub substitute_length: f64,
    /// Rigidity of a substitute bar relative to the stiffest real bar.
    pub substitute_ratio: f64,
    /// Stiffness entries below this magnitude are not stored.
    pub contribution: f64,
}

/// Assembled truss element.
#[derive(Clone, Debug, PartialEq)]
pub struct Element {
    /// Snapshot bar index, `None` for substitute bars.
    pub bar: Option<usize>,
    /// Global DOFs `[start x, start y, end x, end y]`.
    pub dofs: [usize; 4],
    /// Unit vector from the start joint to the end joint.
    pub axis: Vector2<f64>,
    /// Bar length.
    pub length: f64,
    /// Axial rigidity R.
    pub rigidity: f64,
}

impl Element {
    /// Axial stiffness R / L.
    #[must_use]
    pub fn stiffness(&self) -> f64 {
        self.rigidity / self.length
    }

    /// Return `true` for bars inserted to model an inclined roller.
    #[must_use]
    pub fn is_substitute(&self) -> bool {
        self.bar.is_none()
    }

    /// 4×4 element stiffness matrix in global coordinates.
    #[must_use]
    pub fn matrix(&self) -> [[f64; 4]; 4] {
        let (c, s) = (self.axis.x, self.axis.y);
        let k = self.stiffness();
        let (cc, cs, ss) = (k * c * c, k * c * s, k * s * s);
        [
            [cc, cs, -cc, -cs],
            [cs, ss, -cs, -ss],
            [-cc, -cs, cc, cs],
            [-cs, -ss, cs, ss],
        ]
    }

    /// Axial force from global displacements, tension positive, before initial forces.
    #[must_use]
    pub fn axial_force(&self, displacements: &DVector<f64>) -> f64 {
        let [sx, sy, ex, ey] = self.dofs;
        let relative = Vector2::new(
            displacements[ex] - displacements[sx],
            displacements[ey] - displacements[sy],
        );
        self.stiffness() * self.axis.dot(&relative)
    }
}

/// Position of a global DOF inside the free or the fixed set.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Slot {
    /// Index into the free set.
    Free(usize),
    /// Index into the fixed set.
    Fixed(usize),
}

/// Split of the global DOFs into free and fixed sets, both in ascending order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Partition {
    /// Global DOFs that may move.
    pub free: Vec<usize>,
    /// Global DOFs that are restrained.
    pub fixed: Vec<usize>,
    /// Position of each global DOF within its set.
    slots: Vec<Slot>,
}

impl Partition {
    /// Build the partition from a restraint flag per global DOF.
    #[must_use]
    pub fn from_restraints(restrained: &[bool]) -> Self {
        let mut partition = Self::default();
        for (dof, &fixed) in restrained.iter().enumerate() {
            if fixed {
                partition.slots.push(Slot::Fixed(partition.fixed.len()));
                partition.fixed.push(dof);
            } else {
                partition.slots.push(Slot::Free(partition.free.len()));
                partition.free.push(dof);
            }
        }
        partition
    }

    /// Slot of a global DOF.
    #[must_use]
    pub fn slot(&self, dof: usize) -> Slot {
        self.slots[dof]
    }

    /// Number of global DOFs.
    #[must_use]
    pub fn dof_count(&self) -> usize {
        self.slots.len()
    }

    /// Scatter a global vector into its free and fixed parts.
    #[must_use]
    pub fn split(&self, global: &DVector<f64>) -> (DVector<f64>, DVector<f64>) {
        let free = DVector::from_iterator(self.free.len(), self.free.iter().map(|&d| global[d]));
        let fixed =
            DVector::from_iterator(self.fixed.len(), self.fixed.iter().map(|&d| global[d]));
        (free, fixed)
    }

    /// Gather free and fixed parts back into one global vector.
    #[must_use]
    pub fn join(&self, free: &DVector<f64>, fixed: &DVector<f64>) -> DVector<f64> {
        DVector::from_iterator(
            self.slots.len(),
            self.slots.iter().map(|slot| match *slot {
                Slot::Free(index) => free[index],
                Slot::Fixed(index) => fixed[index],
            }),
        )
    }
}

/// The four blocks of the partitioned global stiffness matrix.
#[derive(Clone, Debug, PartialEq)]
pub struct PartitionedStiffness {
    /// Free-free block.
    pub k11: CsrMatrix<f64>,
    /// Free-fixed block.
    pub k12: CsrMatrix<f64>,
    /// Fixed-free block.
    pub k21: CsrMatrix<f64>,
    /// Fixed-fixed block.
    pub k22: CsrMatrix<f64>,
}

/// COO accumulator routing each global entry to its block.
struct PartitionedBuilder<'a> {
    /// DOF split the entries are routed by.
    partition: &'a Partition,
    /// Entries below this magnitude are dropped.
    threshold: f64,
    /// Free-free triplets.
    k11: Vec<(usize, usize, f64)>,
    /// Free-fixed triplets.
    k12: Vec<(usize, usize, f64)>,
    /// Fixed-free triplets.
    k21: Vec<(usize, usize, f64)>,
    /// Fixed-fixed triplets.
    k22: Vec<(usize, usize, f64)>,
}

impl<'a> PartitionedBuilder<'a> {
    /// Empty builder over `partition`.
    fn new(partition: &'a Partition, threshold: f64) -> Self {
        Self {
            partition,
            threshold,
            k11: Vec::new(),
            k12: Vec::new(),
            k21: Vec::new(),
            k22: Vec::new(),
        }
    }

    /// Route one global entry.
    fn add(&mut self, row: usize, col: usize, value: f64) {
        if value.abs() < self.threshold {
            return;
        }
        match (self.partition.slot(row), self.partition.slot(col)) {
            (Slot::Free(r), Slot::Free(c)) => self.k11.push((r, c, value)),
            (Slot::Free(r), Slot::Fixed(c)) => self.k12.push((r, c, value)),
            (Slot::Fixed(r), Slot::Free(c)) => self.k21.push((r, c, value)),
            (Slot::Fixed(r), Slot::Fixed(c)) => self.k22.push((r, c, value)),
        }
    }

    /// Scatter the element matrix over its four DOFs.
    fn add_element(&mut self, element: &Element) {
        let matrix = element.matrix();
        for (i, &row) in element.dofs.iter().enumerate() {
            for (j, &col) in element.dofs.iter().enumerate() {
                self.add(row, col, matrix[i][j]);
            }
        }
    }

    /// Compress the four blocks.
    fn finish(self) -> PartitionedStiffness {
        let free = self.partition.free.len();
        let fixed = self.partition.fixed.len();
        PartitionedStiffness {
            k11: to_csr(free, free, &self.k11),
            k12: to_csr(free, fixed, &self.k12),
            k21: to_csr(fixed, free, &self.k21),
            k22: to_csr(fixed, fixed, &self.k22),
        }
    }
}

/// Duplicate triplets are summed.
fn to_csr(rows: usize, cols: usize, entries: &[(usize, usize, f64)]) -> CsrMatrix<f64> {
    let mut coo = CooMatrix::new(rows, cols);
    for &(row, col, value) in entries {
        coo.push(row, col, value);
    }
    CsrMatrix::from(&coo)
}

/// Stiffness model of a snapshot ready for solving.
#[derive(Clone, Debug, PartialEq)]
pub struct Assembly {
    /// Real joints followed by substitute joints.
    pub joints: Vec<Point>,
    /// Real bars in snapshot order followed by substitute bars.
    pub elements: Vec<Element>,
    /// Free and fixed DOFs.
    pub partition: Partition,
    /// Partitioned stiffness blocks.
    pub stiffness: PartitionedStiffness,
    /// Substitute joint of each snapshot support, if it has one.
    pub substitutes: Vec<Option<usize>>,
}

impl Assembly {
    /// Number of substitute bars.
    #[must_use]
    pub fn substitute_count(&self) -> usize {
        self.elements.iter().filter(|e| e.is_substitute()).count()
    }

    /// Return `true` when at least one inclined roller was substituted.
    #[must_use]
    pub fn has_substitutes(&self) -> bool {
        self.substitute_count() > 0
    }

    /// Element of a snapshot bar.
    #[must_use]
    pub fn element(&self, bar: usize) -> &Element {
        &self.elements[bar]
    }

    /// Joint whose restrained DOFs carry the reaction of a support.
    ///
    /// Inclined rollers report the DOFs of their substitute joint.
    #[must_use]
    pub fn reaction_joint(&self, snapshot: &TrussSnapshot, support: usize) -> usize {
        self.substitutes[support].unwrap_or(snapshot.supports[support].joint)
    }
}

/// Assemble the partitioned stiffness of a snapshot.
///
/// # Errors
///
/// Returns [`AnalysisError::MissingProperties`] when a bar lacks the properties
/// its rigidity mode needs and [`AnalysisError::ZeroLengthBar`] for degenerate bars.
pub fn assemble(
    snapshot: &TrussSnapshot,
    options: &AssemblyOptions,
) -> Result<Assembly, AnalysisError> {
    let substitute_count = snapshot
        .supports
        .iter()
        .filter(|support| support.kind.needs_substitute())
        .count();
    let mut joints = snapshot.joints.clone();
    joints.reserve(substitute_count);
    let mut elements = Vec::with_capacity(snapshot.bars.len() + substitute_count);

    for (index, bar) in snapshot.bars.iter().enumerate() {
        let (axis, length) = geometry::direction(joints[bar.start], joints[bar.end])
            .ok_or(AnalysisError::ZeroLengthBar(index))?;
        let rigidity = match options.properties {
            Properties::Unit => 1.0,
            Properties::Actual => bar
                .rigidity(snapshot.rigidity)
                .ok_or(AnalysisError::MissingProperties(index))?,
        };
        elements.push(Element {
            bar: Some(index),
            dofs: dofs(bar.start, bar.end),
            axis,
            length,
            rigidity,
        });
    }

    let stiffest = elements
        .iter()
        .map(|element| element.rigidity)
        .fold(None, |max: Option<f64>, rigidity| Some(max.map_or(rigidity, |m| m.max(rigidity))))
        .unwrap_or(1.0);
    let substitute_rigidity = options.substitute_ratio * stiffest;

    let mut restrained = vec![false; 2 * joints.len()];
    let mut substitutes = vec![None; snapshot.supports.len()];
    for (index, support) in snapshot.supports.iter().enumerate() {
        let joint = support.joint;
        match support.kind.restraint() {
            Restraint::Both => {
                restrained[2 * joint] = true;
                restrained[2 * joint + 1] = true;
            }
            Restraint::Horizontal => restrained[2 * joint] = true,
            Restraint::Vertical => restrained[2 * joint + 1] = true,
            Restraint::Substitute(direction) => {
                let origin = joints[joint];
                let substitute = joints.len();
                joints.push(Point::new(
                    origin.x - options.substitute_length * direction.x,
                    origin.y - options.substitute_length * direction.y,
                ));
                restrained.extend([true, true]);
                substitutes[index] = Some(substitute);
                elements.push(Element {
                    bar: None,
                    dofs: dofs(substitute, joint),
                    axis: direction,
                    length: options.substitute_length,
                    rigidity: substitute_rigidity,
                });
            }
        }
    }

    let partition = Partition::from_restraints(&restrained);
    let mut builder = PartitionedBuilder::new(&partition, options.contribution);
    for element in &elements {
        builder.add_element(element);
    }
    let stiffness = builder.finish();
    debug!(
        "assembled {} elements ({substitute_count} substitute) over {} free and {} fixed DOFs",
        elements.len(),
        partition.free.len(),
        partition.fixed.len()
    );

    Ok(Assembly {
        joints,
        elements,
        partition,
        stiffness,
        substitutes,
    })
}

/// Global DOFs of a bar: x and y of the start joint, then of the end joint.
fn dofs(start: usize, end: usize) -> [usize; 4] {
    [2 * start, 2 * start + 1, 2 * end, 2 * end + 1]
}
