//! Conversion of the model's configured units into one canonical SI system.
//!
//! Every quantity is multiplied by a factor into metres, square metres,
//! pascals, newtons or newtons per cubic metre before assembly. The factors are
//! derived from `uom` quantities so that no conversion constant is typed by hand.

use std::fmt;

use serde::{Deserialize, Serialize};
use uom::si::f64::{Area, Force, Length, Pressure, Volume};
use uom::si::{area, force, length, pressure, volume};

use crate::config::{MeasurementSystem, Tolerances, UnitConfig};
use crate::errors::UnitError;
use crate::snapshot::TrussSnapshot;

/// Kind of physical quantity a unit string applies to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum QuantityKind {
    /// Cross-sectional area.
    Area,
    /// Elastic modulus.
    Modulus,
    /// Coordinates and lengths.
    Length,
    /// Weight per unit volume.
    UnitWeight,
    /// Forces.
    Load,
    /// Support settlements.
    Settlement,
    /// Fabrication length errors.
    LengthError,
}

impl fmt::Display for QuantityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            QuantityKind::Area => "area",
            QuantityKind::Modulus => "modulus",
            QuantityKind::Length => "length",
            QuantityKind::UnitWeight => "unit weight",
            QuantityKind::Load => "load",
            QuantityKind::Settlement => "settlement",
            QuantityKind::LengthError => "length error",
        };
        f.write_str(name)
    }
}

/// Factor converting one `unit` of the given kind into canonical SI.
///
/// # Errors
///
/// Returns [`UnitError::Unknown`] when the string is not a supported unit for `kind`.
///
/// # Examples
/// ```
/// use trussx::units::{unit_factor, QuantityKind};
///
/// let factor = unit_factor(QuantityKind::Length, "mm").expect("known unit");
/// assert!((factor - 1.0e-3).abs() < 1.0e-15);
/// assert!(unit_factor(QuantityKind::Load, "furlong").is_err());
/// ```
pub fn unit_factor(kind: QuantityKind, unit: &str) -> Result<f64, UnitError> {
    let factor = match kind {
        QuantityKind::Length | QuantityKind::Settlement | QuantityKind::LengthError => {
            length_factor(unit)
        }
        QuantityKind::Area => area_factor(unit),
        QuantityKind::Modulus => pressure_factor(unit),
        QuantityKind::Load => force_factor(unit),
        QuantityKind::UnitWeight => unit_weight_factor(unit),
    };
    factor.ok_or_else(|| UnitError::Unknown {
        kind,
        unit: unit.to_string(),
    })
}

/// Metres per `unit`.
fn length_factor(unit: &str) -> Option<f64> {
    let quantity = match unit.trim() {
        "m" => Length::new::<length::meter>(1.0),
        "cm" => Length::new::<length::centimeter>(1.0),
        "mm" => Length::new::<length::millimeter>(1.0),
        "ft" => Length::new::<length::foot>(1.0),
        "in" => Length::new::<length::inch>(1.0),
        _ => return None,
    };
    Some(quantity.get::<length::meter>())
}

/// Square metres per `unit`.
fn area_factor(unit: &str) -> Option<f64> {
    let quantity = match unit.trim() {
        "m^2" => Area::new::<area::square_meter>(1.0),
        "cm^2" => Area::new::<area::square_centimeter>(1.0),
        "mm^2" => Area::new::<area::square_millimeter>(1.0),
        "ft^2" => Area::new::<area::square_foot>(1.0),
        "in^2" => Area::new::<area::square_inch>(1.0),
        _ => return None,
    };
    Some(quantity.get::<area::square_meter>())
}

/// Pascals per `unit`.
fn pressure_factor(unit: &str) -> Option<f64> {
    let quantity = match unit.trim() {
        "Pa" | "N/m^2" => Pressure::new::<pressure::pascal>(1.0),
        "kPa" => Pressure::new::<pressure::kilopascal>(1.0),
        "MPa" | "N/mm^2" => Pressure::new::<pressure::megapascal>(1.0),
        "GPa" => Pressure::new::<pressure::gigapascal>(1.0),
        "psi" => Pressure::new::<pressure::pound_force_per_square_inch>(1.0),
        "ksi" => Pressure::new::<pressure::kip_per_square_inch>(1.0),
        _ => return None,
    };
    Some(quantity.get::<pressure::pascal>())
}

/// Newtons per `unit`.
fn force_factor(unit: &str) -> Option<f64> {
    let quantity = match unit.trim() {
        "N" => Force::new::<force::newton>(1.0),
        "kN" => Force::new::<force::kilonewton>(1.0),
        "MN" => Force::new::<force::meganewton>(1.0),
        "lb" | "lbf" => Force::new::<force::pound_force>(1.0),
        "kip" => Force::new::<force::kip>(1.0),
        _ => return None,
    };
    Some(quantity.get::<force::newton>())
}

/// Cubic metres per `unit`.
fn volume_factor(unit: &str) -> Option<f64> {
    let quantity = match unit.trim() {
        "m^3" => Volume::new::<volume::cubic_meter>(1.0),
        "cm^3" => Volume::new::<volume::cubic_centimeter>(1.0),
        "mm^3" => Volume::new::<volume::cubic_millimeter>(1.0),
        "ft^3" => Volume::new::<volume::cubic_foot>(1.0),
        "in^3" => Volume::new::<volume::cubic_inch>(1.0),
        _ => return None,
    };
    Some(quantity.get::<volume::cubic_meter>())
}

/// Unit weights are written as `force/volume`, for example `kN/m^3`.
fn unit_weight_factor(unit: &str) -> Option<f64> {
    let (force, volume) = unit.split_once('/')?;
    Some(force_factor(force)? / volume_factor(volume)?)
}

/// Conversion factors for every quantity of a model, resolved once.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct UnitFactors {
    /// Area factor into square metres.
    pub area: f64,
    /// Modulus factor into pascals.
    pub modulus: f64,
    /// Length factor into metres.
    pub length: f64,
    /// Unit weight factor into newtons per cubic metre.
    pub unit_weight: f64,
    /// Load factor into newtons.
    pub load: f64,
    /// Settlement factor into metres.
    pub settlement: f64,
    /// Length error factor into metres.
    pub length_error: f64,
}

impl UnitFactors {
    /// Resolve every configured unit.
    ///
    /// # Errors
    ///
    /// Returns the first [`UnitError`] encountered.
    pub fn from_config(units: &UnitConfig) -> Result<Self, UnitError> {
        Ok(Self {
            area: unit_factor(QuantityKind::Area, &units.area)?,
            modulus: unit_factor(QuantityKind::Modulus, &units.modulus)?,
            length: unit_factor(QuantityKind::Length, &units.length)?,
            unit_weight: unit_factor(QuantityKind::UnitWeight, &units.unit_weight)?,
            load: unit_factor(QuantityKind::Load, &units.load)?,
            settlement: unit_factor(QuantityKind::Settlement, &units.settlement)?,
            length_error: unit_factor(QuantityKind::LengthError, &units.length_error)?,
        })
    }

    /// Copy of `snapshot` with every quantity expressed in canonical SI.
    #[must_use]
    pub fn normalize(&self, snapshot: &TrussSnapshot) -> TrussSnapshot {
        let mut canonical = snapshot.clone();
        for joint in &mut canonical.joints {
            *joint = joint.scaled(self.length);
        }
        for bar in &mut canonical.bars {
            bar.area = bar.area.map(|area| area * self.area);
            bar.modulus = bar.modulus.map(|modulus| modulus * self.modulus);
            bar.unit_weight *= self.unit_weight;
        }
        let loads = &mut canonical.loads;
        for load in &mut loads.joint_loads {
            load.force.x *= self.load;
            load.force.y *= self.load;
        }
        for settlement in &mut loads.settlements {
            settlement.settlement *= self.settlement;
        }
        for error in &mut loads.fabrication {
            error.length_error *= self.length_error;
        }
        for influence in &mut loads.influence {
            for magnitude in &mut influence.magnitudes {
                *magnitude *= self.load;
            }
            for offset in &mut influence.offsets {
                *offset *= self.length;
            }
        }
        canonical
    }
}

/// Zero-snap threshold in newtons for the configured measurement system.
#[must_use]
pub fn zero_force_threshold(system: MeasurementSystem, tolerances: &Tolerances) -> f64 {
    match system {
        MeasurementSystem::Metric => Force::new::<force::newton>(tolerances.zero_force_metric),
        MeasurementSystem::Imperial => {
            Force::new::<force::pound_force>(tolerances.zero_force_imperial)
        }
    }
    .get::<force::newton>()
}

/// Replace values whose magnitude falls below `threshold` with exactly zero.
///
/// # Examples
/// ```
/// use trussx::units::snap_to_zero;
///
/// assert_eq!(snap_to_zero(-1.0e-4, 1.0e-2), 0.0);
/// assert_eq!(snap_to_zero(0.5, 1.0e-2), 0.5);
/// ```
#[must_use]
pub fn snap_to_zero(value: f64, threshold: f64) -> f64 {
    if value.abs() < threshold {
        0.0
    } else {
        value
    }
}
