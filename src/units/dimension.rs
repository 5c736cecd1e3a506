// Dimensional Algebra
//
// Dimensions are exponent vectors over the base dimensions laboratory
// medicine actually uses. A UCUM code reduces to one of these vectors;
// two codes are standards-convertible only when their vectors are equal.
//
// International Units get their own base dimension on purpose: activity
// is biologically standardized per assay and must never cancel against
// mass or amount in the algebra.

use std::collections::HashMap;
use std::fmt;
use std::ops::{Div, Mul};

/// Base dimensions for lab-medicine unit codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BaseDimension {
    /// Length (meter); volume is Length³
    Length,
    /// Mass (gram in UCUM, not kilogram)
    Mass,
    /// Time (second)
    Time,
    /// Amount of substance (mole); equivalents share this dimension
    Amount,
    /// International Units - biologically standardized, NOT convertible
    /// to mass or amount
    InternationalUnit,
}

impl BaseDimension {
    pub fn symbol(&self) -> &'static str {
        match self {
            BaseDimension::Length => "L",
            BaseDimension::Mass => "M",
            BaseDimension::Time => "T",
            BaseDimension::Amount => "N",
            BaseDimension::InternationalUnit => "IU",
        }
    }

    pub fn all() -> &'static [BaseDimension] {
        &[
            BaseDimension::Length,
            BaseDimension::Mass,
            BaseDimension::Time,
            BaseDimension::Amount,
            BaseDimension::InternationalUnit,
        ]
    }
}

/// A dimension is a product of base dimensions raised to integer powers,
/// stored sparsely (only non-zero exponents).
///
/// Examples:
/// - Dimensionless: {} (percent, ratios)
/// - Mass concentration: {M: 1, L: -3} (mg/dL)
/// - Molar concentration: {N: 1, L: -3} (mmol/L)
/// - Activity concentration: {IU: 1, L: -3} ([IU]/L)
#[derive(Clone, PartialEq, Eq, Default)]
pub struct Dimension {
    exponents: HashMap<BaseDimension, i8>,
}

impl Dimension {
    pub fn dimensionless() -> Self {
        Dimension {
            exponents: HashMap::new(),
        }
    }

    pub fn from_base(base: BaseDimension) -> Self {
        Self::from_base_power(base, 1)
    }

    pub fn from_base_power(base: BaseDimension, power: i8) -> Self {
        if power == 0 {
            return Self::dimensionless();
        }
        let mut exponents = HashMap::new();
        exponents.insert(base, power);
        Dimension { exponents }
    }

    pub fn get_exponent(&self, base: BaseDimension) -> i8 {
        *self.exponents.get(&base).unwrap_or(&0)
    }

    pub fn is_dimensionless(&self) -> bool {
        self.exponents.is_empty()
    }

    /// Raise to an integer power.
    pub fn pow(&self, n: i8) -> Self {
        if n == 0 {
            return Self::dimensionless();
        }
        let mut result = HashMap::new();
        for (&base, &exp) in &self.exponents {
            let new_exp = exp.saturating_mul(n);
            if new_exp != 0 {
                result.insert(base, new_exp);
            }
        }
        Dimension { exponents: result }
    }

    /// True if the International Unit dimension participates; such
    /// dimensions are calibration-defined and resist generic conversion.
    pub fn contains_iu(&self) -> bool {
        self.get_exponent(BaseDimension::InternationalUnit) != 0
    }
}

impl fmt::Debug for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_dimensionless() {
            return write!(f, "Dimensionless");
        }
        let mut parts: Vec<String> = Vec::new();
        for base in BaseDimension::all() {
            let exp = self.get_exponent(*base);
            if exp != 0 {
                if exp == 1 {
                    parts.push(base.symbol().to_string());
                } else {
                    parts.push(format!("{}^{}", base.symbol(), exp));
                }
            }
        }
        write!(f, "{}", parts.join("·"))
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Multiplication of dimensions adds exponents
impl Mul for Dimension {
    type Output = Dimension;

    fn mul(self, rhs: Self) -> Self::Output {
        let mut result = self.exponents.clone();
        for (&base, &exp) in &rhs.exponents {
            let current = *result.get(&base).unwrap_or(&0);
            let new_exp = current.saturating_add(exp);
            if new_exp == 0 {
                result.remove(&base);
            } else {
                result.insert(base, new_exp);
            }
        }
        Dimension { exponents: result }
    }
}

/// Division of dimensions subtracts exponents
impl Div for Dimension {
    type Output = Dimension;

    fn div(self, rhs: Self) -> Self::Output {
        let mut result = self.exponents.clone();
        for (&base, &exp) in &rhs.exponents {
            let current = *result.get(&base).unwrap_or(&0);
            let new_exp = current.saturating_sub(exp);
            if new_exp == 0 {
                result.remove(&base);
            } else {
                result.insert(base, new_exp);
            }
        }
        Dimension { exponents: result }
    }
}

// =============================================================================
// Standard Dimensions
// =============================================================================

/// Dimensions that recur across the lab-unit registry.
pub mod standard {
    use super::*;

    pub fn dimensionless() -> Dimension {
        Dimension::dimensionless()
    }

    pub fn length() -> Dimension {
        Dimension::from_base(BaseDimension::Length)
    }

    pub fn mass() -> Dimension {
        Dimension::from_base(BaseDimension::Mass)
    }

    pub fn time() -> Dimension {
        Dimension::from_base(BaseDimension::Time)
    }

    pub fn amount() -> Dimension {
        Dimension::from_base(BaseDimension::Amount)
    }

    pub fn international_unit() -> Dimension {
        Dimension::from_base(BaseDimension::InternationalUnit)
    }

    /// Volume (L³)
    pub fn volume() -> Dimension {
        Dimension::from_base_power(BaseDimension::Length, 3)
    }

    /// Molar concentration (N·L⁻³), e.g. mmol/L
    pub fn concentration() -> Dimension {
        amount() / volume()
    }

    /// Mass concentration (M·L⁻³), e.g. mg/dL
    pub fn mass_concentration() -> Dimension {
        mass() / volume()
    }

    /// Activity concentration (IU·L⁻³), e.g. [IU]/L
    pub fn iu_per_volume() -> Dimension {
        international_unit() / volume()
    }
}

// =============================================================================
// Tests
// =============================================================================
