//! Scaled points, the engine's fixed-point length unit.
//!
//! One PostScript point (`1pt`) is 65536 scaled points. All lengths in the
//! node list are stored as scaled points so arithmetic stays exact.

use std::fmt;
use std::str::FromStr;

use crate::error::{EngineError, Result};

/// Scaled points per point
pub const SP_PER_PT: i64 = 65_536;

/// A length in scaled points
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct ScaledPoint(pub i64);

impl ScaledPoint {
    pub const ZERO: ScaledPoint = ScaledPoint(0);

    /// Length from a value in points
    pub fn from_pt(pt: f64) -> Self {
        ScaledPoint((pt * SP_PER_PT as f64).round() as i64)
    }

    /// Parse a dimension such as `12pt`, `3mm` or `1in`
    pub fn parse(input: &str) -> Result<Self> {
        let trimmed = input.trim();
        let split = trimmed
            .find(|c: char| c.is_ascii_alphabetic())
            .ok_or_else(|| EngineError::Unit(format!("missing unit in {:?}", input)))?;
        let (number, unit) = trimmed.split_at(split);
        let value: f64 = number
            .trim()
            .parse()
            .map_err(|_| EngineError::Unit(format!("invalid number in {:?}", input)))?;
        let pt = match unit {
            "pt" => value,
            "bp" => value * 72.27 / 72.0,
            "in" => value * 72.27,
            "mm" => value * 72.27 / 25.4,
            "cm" => value * 72.27 / 2.54,
            "pc" => value * 12.0,
            "px" => value * 72.27 / 96.0,
            "sp" => return Ok(ScaledPoint(value.round() as i64)),
            other => return Err(EngineError::Unit(format!("unknown unit {:?}", other))),
        };
        Ok(Self::from_pt(pt))
    }

    /// Value in points
    pub fn to_pt(self) -> f64 {
        self.0 as f64 / SP_PER_PT as f64
    }

    /// Value in PostScript big points, as used in PDF coordinates
    pub fn to_bp(self) -> f64 {
        self.to_pt() * 72.0 / 72.27
    }

    pub fn multiply(self, factor: i64) -> Self {
        ScaledPoint(self.0.saturating_mul(factor))
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }
}

impl FromStr for ScaledPoint {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for ScaledPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}pt", format_number(self.to_pt()))
    }
}

impl std::ops::Add for ScaledPoint {
    type Output = ScaledPoint;

    fn add(self, rhs: ScaledPoint) -> ScaledPoint {
        ScaledPoint(self.0.saturating_add(rhs.0))
    }
}

impl std::ops::Sub for ScaledPoint {
    type Output = ScaledPoint;

    fn sub(self, rhs: ScaledPoint) -> ScaledPoint {
        ScaledPoint(self.0.saturating_sub(rhs.0))
    }
}

impl std::ops::AddAssign for ScaledPoint {
    fn add_assign(&mut self, rhs: ScaledPoint) {
        self.0 = self.0.saturating_add(rhs.0);
    }
}

/// Format a float with at most four decimals and no trailing zeros
pub fn format_number(value: f64) -> String {
    let text = format!("{:.4}", value);
    let text = text.trim_end_matches('0').trim_end_matches('.');
    if text == "-0" {
        "0".to_string()
    } else {
        text.to_string()
    }
}
