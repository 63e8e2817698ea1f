//! Support variants and the restraint rules attached to each of them.

use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

/// Side of the joint on which an axis-aligned support is drawn.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    /// Support below the joint.
    Bottom,
    /// Support above the joint.
    Top,
    /// Support to the left of the joint.
    Left,
    /// Support to the right of the joint.
    Right,
}

/// Degrees of freedom restrained by a support at its own joint.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Restraint {
    /// Both translations are restrained.
    Both,
    /// Only the horizontal translation is restrained.
    Horizontal,
    /// Only the vertical translation is restrained.
    Vertical,
    /// The joint is tied to a fully fixed substitute joint by a stiff bar
    /// acting along the given unit direction.
    Substitute(Vector2<f64>),
}

/// Kind of support applied to a joint.
///
/// Full-fixity supports restrain both translations. Rollers on the bottom or
/// top of a joint restrain the vertical translation; rollers on the left or
/// right restrain the horizontal translation. An inclined roller restrains the
/// translation normal to a rolling surface tilted `angle` degrees from the
/// horizontal.
///
/// # Examples
/// ```
/// use trussx::{Side, SupportKind};
///
/// assert_eq!(SupportKind::Fixed(Side::Bottom).components(), 2);
/// assert_eq!(SupportKind::Roller(Side::Left).components(), 1);
/// assert!(SupportKind::Roller(Side::Bottom).accepts_settlement());
/// assert!(!SupportKind::Inclined { angle: 30.0 }.accepts_settlement());
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum SupportKind {
    /// Pinned support restraining both translations.
    Fixed(Side),
    /// Roller restraining the translation normal to the side it sits on.
    Roller(Side),
    /// Roller on a surface inclined by `angle` degrees.
    Inclined {
        /// Inclination of the rolling surface in degrees.
        angle: f64,
    },
}

impl SupportKind {
    /// Return `true` for full-fixity supports.
    #[must_use]
    pub fn is_fixed(&self) -> bool {
        matches!(self, SupportKind::Fixed(_))
    }

    /// Number of reaction components provided by the support.
    #[must_use]
    pub fn components(&self) -> usize {
        match self {
            SupportKind::Fixed(_) => 2,
            SupportKind::Roller(_) | SupportKind::Inclined { .. } => 1,
        }
    }

    /// Degrees of freedom restrained at the supported joint.
    #[must_use]
    pub fn restraint(&self) -> Restraint {
        match self {
            SupportKind::Fixed(_) => Restraint::Both,
            SupportKind::Roller(Side::Bottom | Side::Top) => Restraint::Vertical,
            SupportKind::Roller(Side::Left | Side::Right) => Restraint::Horizontal,
            SupportKind::Inclined { angle } => {
                Restraint::Substitute(inclined_reaction_direction(*angle))
            }
        }
    }

    /// Unit directions of the reaction lines through the supported joint.
    #[must_use]
    pub fn reaction_directions(&self) -> Vec<Vector2<f64>> {
        match self.restraint() {
            Restraint::Both => vec![Vector2::x(), Vector2::y()],
            Restraint::Horizontal => vec![Vector2::x()],
            Restraint::Vertical => vec![Vector2::y()],
            Restraint::Substitute(direction) => vec![direction],
        }
    }

    /// Return `true` when the support may receive a settlement.
    #[must_use]
    pub fn accepts_settlement(&self) -> bool {
        matches!(
            self,
            SupportKind::Fixed(Side::Bottom) | SupportKind::Roller(Side::Bottom)
        )
    }

    /// Return `true` when the support is tested during the redundancy search.
    #[must_use]
    pub fn is_redundancy_candidate(&self) -> bool {
        matches!(self, SupportKind::Fixed(_) | SupportKind::Roller(Side::Bottom))
    }

    /// Return `true` when the support is modelled with a substitute bar.
    #[must_use]
    pub fn needs_substitute(&self) -> bool {
        matches!(self, SupportKind::Inclined { .. })
    }
}

/// Direction of the reaction of an inclined roller: 90° − `angle` from the horizontal.
fn inclined_reaction_direction(angle: f64) -> Vector2<f64> {
    let radians = angle.to_radians();
    Vector2::new(radians.sin(), radians.cos())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn rollers_restrain_the_axis_normal_to_their_side() {
        assert_eq!(SupportKind::Roller(Side::Bottom).restraint(), Restraint::Vertical);
        assert_eq!(SupportKind::Roller(Side::Top).restraint(), Restraint::Vertical);
        assert_eq!(SupportKind::Roller(Side::Left).restraint(), Restraint::Horizontal);
        assert_eq!(SupportKind::Roller(Side::Right).restraint(), Restraint::Horizontal);
        assert_eq!(SupportKind::Fixed(Side::Top).restraint(), Restraint::Both);
    }

    #[test]
    fn level_inclined_roller_reacts_vertically() {
        let Restraint::Substitute(direction) = (SupportKind::Inclined { angle: 0.0 }).restraint()
        else {
            panic!("inclined roller uses a substitute bar");
        };
        assert_relative_eq!(direction.x, 0.0, epsilon = 1.0e-12);
        assert_relative_eq!(direction.y, 1.0, epsilon = 1.0e-12);
    }

    #[test]
    fn only_inclined_rollers_need_a_substitute_bar() {
        assert!(SupportKind::Inclined { angle: 30.0 }.needs_substitute());
        assert!(!SupportKind::Roller(Side::Bottom).needs_substitute());
        assert!(!SupportKind::Fixed(Side::Left).needs_substitute());
    }

    #[test]
    fn only_fixed_and_bottom_rollers_are_redundancy_candidates() {
        assert!(SupportKind::Fixed(Side::Left).is_redundancy_candidate());
        assert!(SupportKind::Roller(Side::Bottom).is_redundancy_candidate());
        assert!(!SupportKind::Roller(Side::Right).is_redundancy_candidate());
        assert!(!SupportKind::Inclined { angle: 45.0 }.is_redundancy_candidate());
    }
}
