//! Physical dimensions and the named unit systems decks are written in.
//!
//! A [`Dim`] is the exponent triple (length, mass, time) of a quantity. A
//! [`UnitSystem`] gives the size of its length, mass and time units in SI.
//! The factor that converts a value of any dimension from one system to
//! another is composed from the three base ratios only:
//!
//! ```
//! # use kunit::units::{conversion_factor, Dim, UnitSystem};
//! let src = UnitSystem::lookup("mm-mg-us").unwrap();
//! let dst = UnitSystem::lookup("m-kg-s").unwrap();
//! // 1 mm is 0.001 m
//! assert_eq!(conversion_factor(Dim::LENGTH, src, dst), 1e-3);
//! ```
use std::fmt::Display;
use std::ops::{Div, Mul};

use itertools::Itertools;

use crate::kunit_error::{KError, KResult};

/// Exponents of length, mass and time for a physical quantity.
///
/// Pressure, for example, is mass · length⁻¹ · time⁻², i.e. `Dim::new(-1, 1, -2)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Dim {
    pub length: i32,
    pub mass: i32,
    pub time: i32,
}

impl Dim {
    pub const DIMENSIONLESS: Dim = Dim::new(0, 0, 0);
    pub const LENGTH: Dim = Dim::new(1, 0, 0);
    pub const MASS: Dim = Dim::new(0, 1, 0);
    pub const TIME: Dim = Dim::new(0, 0, 1);
    pub const VELOCITY: Dim = Dim::LENGTH.div_const(Dim::TIME);
    pub const RATE: Dim = Dim::TIME.inverse();
    pub const DENSITY: Dim = Dim::MASS.div_const(Dim::LENGTH.powi(3));
    pub const PRESSURE: Dim = Dim::new(-1, 1, -2);
    pub const ENERGY: Dim = Dim::new(2, 1, -2);
    /// Energy per unit mass, also the dimension of specific heat when temperature is left unscaled.
    pub const SPECIFIC_ENERGY: Dim = Dim::ENERGY.div_const(Dim::MASS);
    /// Dynamic viscosity, pressure · time.
    pub const VISCOSITY: Dim = Dim::new(-1, 1, -1);

    pub const fn new(length: i32, mass: i32, time: i32) -> Self {
        Self { length, mass, time }
    }

    /// Raise the quantity to an integer power.
    pub const fn powi(self, n: i32) -> Self {
        Self::new(self.length * n, self.mass * n, self.time * n)
    }

    pub const fn inverse(self) -> Self {
        self.powi(-1)
    }

    const fn mul_const(self, other: Dim) -> Self {
        Self::new(self.length + other.length, self.mass + other.mass, self.time + other.time)
    }

    const fn div_const(self, other: Dim) -> Self {
        self.mul_const(other.inverse())
    }

    pub fn is_dimensionless(&self) -> bool {
        *self == Self::DIMENSIONLESS
    }
}

impl Mul for Dim {
    type Output = Dim;

    fn mul(self, rhs: Dim) -> Self::Output {
        self.mul_const(rhs)
    }
}

impl Div for Dim {
    type Output = Dim;

    fn div(self, rhs: Dim) -> Self::Output {
        self.div_const(rhs)
    }
}

impl Display for Dim {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_dimensionless() {
            return write!(f, "1");
        }

        let parts = [("L", self.length), ("M", self.mass), ("T", self.time)]
            .into_iter()
            .filter(|(_, e)| *e != 0)
            .map(|(sym, e)| if e == 1 { sym.to_string() } else { format!("{sym}^{e}") })
            .join(" ");
        write!(f, "{parts}")
    }
}

/// One of the base dimensions a [`UnitSystem`] assigns a unit size to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BaseDimension {
    Length,
    Mass,
    Time,
}

/// A consistent set of units, given as the SI size of each base unit.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct UnitSystem {
    name: &'static str,
    /// Meters per length unit
    length_si: f64,
    /// Kilograms per mass unit
    mass_si: f64,
    /// Seconds per time unit
    time_si: f64,
}

/// Every unit system this crate knows about, sorted by name.
pub const BASE_SYSTEMS: [UnitSystem; 7] = [
    UnitSystem::new("cm-g-us", 1e-2, 1e-3, 1e-6),
    UnitSystem::new("m-kg-s", 1.0, 1.0, 1.0),
    UnitSystem::new("mm-g-ms", 1e-3, 1e-3, 1e-3),
    UnitSystem::new("mm-kg-ms", 1e-3, 1.0, 1e-3),
    UnitSystem::new("mm-mg-ms", 1e-3, 1e-6, 1e-3),
    UnitSystem::new("mm-mg-us", 1e-3, 1e-6, 1e-6),
    UnitSystem::new("mm-t-s", 1e-3, 1e3, 1.0),
];

impl UnitSystem {
    const fn new(name: &'static str, length_si: f64, mass_si: f64, time_si: f64) -> Self {
        Self { name, length_si, mass_si, time_si }
    }

    /// Find a built-in unit system by name. Surrounding whitespace and ASCII case are ignored.
    pub fn lookup(name: &str) -> KResult<&'static UnitSystem> {
        let key = name.trim();
        BASE_SYSTEMS.iter()
            .find(|s| s.name.eq_ignore_ascii_case(key))
            .ok_or_else(|| KError::UnknownUnitSystem(name.to_string()))
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// SI size of one unit of `base` in this system.
    pub fn base_scale(&self, base: BaseDimension) -> f64 {
        match base {
            BaseDimension::Length => self.length_si,
            BaseDimension::Mass => self.mass_si,
            BaseDimension::Time => self.time_si,
        }
    }
}

impl Display for UnitSystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// Names of all built-in unit systems, sorted.
pub fn unit_keys() -> Vec<&'static str> {
    BASE_SYSTEMS.iter().map(|s| s.name).sorted().collect()
}

/// Factor that turns a value of dimension `dim` written in `src` units into
/// the equivalent value in `dst` units.
///
/// Dimensionless quantities, and any quantity when `src == dst`, get exactly 1.0.
pub fn conversion_factor(dim: Dim, src: &UnitSystem, dst: &UnitSystem) -> f64 {
    [
        (BaseDimension::Length, dim.length),
        (BaseDimension::Mass, dim.mass),
        (BaseDimension::Time, dim.time),
    ]
    .into_iter()
    .filter(|(_, e)| *e != 0)
    .map(|(base, e)| (src.base_scale(base) / dst.base_scale(base)).powi(e))
    .product()
}

/// Same as [`conversion_factor`], raised to a real power.
///
/// Used for coefficients whose unit contains a quantity raised to an exponent
/// read from the deck, e.g. 1/pressure^EM.
pub fn conversion_factor_powf(dim: Dim, src: &UnitSystem, dst: &UnitSystem, exponent: f64) -> f64 {
    if exponent == 0.0 {
        1.0
    } else {
        conversion_factor(dim, src, dst).powf(exponent)
    }
}

/// [`conversion_factor`] with the unit systems given by name.
pub fn conversion_factor_by_name(dim: Dim, src: &str, dst: &str) -> KResult<f64> {
    let src = UnitSystem::lookup(src)?;
    let dst = UnitSystem::lookup(dst)?;
    Ok(conversion_factor(dim, src, dst))
}

/// A unit system together with a human-readable description.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct UnitDescriptor {
    pub key: &'static str,
    pub label: String,
    pub pressure_unit: &'static str,
}

/// Name of the pressure unit a system works in, picked from its size in pascals.
pub fn pressure_unit(system: &UnitSystem) -> &'static str {
    let si = UnitSystem::new("si", 1.0, 1.0, 1.0);
    // nudge up so a factor computed as 999999999.9999999 still counts as 1e9
    let pa = conversion_factor(Dim::PRESSURE, system, &si) * (1.0 + 1e-9);
    if pa >= 5e10 {
        "Mbar"
    } else if pa >= 1e9 {
        "GPa"
    } else if pa >= 1e6 {
        "MPa"
    } else if pa >= 1e3 {
        "kPa"
    } else {
        "Pa"
    }
}

/// Describe every built-in unit system, sorted by key.
pub fn describe_unit_systems() -> Vec<UnitDescriptor> {
    BASE_SYSTEMS.iter()
        .sorted_by_key(|s| s.name)
        .map(|s| {
            let pressure_unit = pressure_unit(s);
            UnitDescriptor { key: s.name, label: format!("{} ({pressure_unit})", s.name), pressure_unit }
        })
        .collect()
}
