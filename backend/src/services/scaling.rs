//! Scale normalization for integer-encoded attributes.
//!
//! The data cubes store vegetation indices as integers scaled by 10 000. The
//! per-attribute factors live in a [`ScalePolicy`] table so call sites never
//! test attribute names themselves.

use std::collections::HashMap;

use crate::config::ScalingSettings;

/// Factor turning integer-encoded NDVI/EVI into their natural range.
pub const VEGETATION_INDEX_SCALE: f64 = 0.0001;

/// Attribute name (case-insensitive) to multiplicative factor.
#[derive(Debug, Clone, PartialEq)]
pub struct ScalePolicy {
    factors: HashMap<String, f64>,
}

impl ScalePolicy {
    pub fn new<I, S>(factors: I) -> Self
    where
        I: IntoIterator<Item = (S, f64)>,
        S: AsRef<str>,
    {
        Self {
            factors: factors
                .into_iter()
                .map(|(name, factor)| (name.as_ref().to_ascii_uppercase(), factor))
                .collect(),
        }
    }

    /// Policy that leaves every attribute untouched.
    pub fn identity() -> Self {
        Self {
            factors: HashMap::new(),
        }
    }

    pub fn from_settings(settings: &ScalingSettings) -> Self {
        Self::new(settings.factors.iter().map(|(k, v)| (k.as_str(), *v)))
    }

    pub fn factor_for(&self, attribute: &str) -> Option<f64> {
        self.factors.get(&attribute.to_ascii_uppercase()).copied()
    }

    pub fn is_scaled(&self, attribute: &str) -> bool {
        self.factor_for(attribute).is_some()
    }

    /// Normalize one series.
    ///
    /// Absent and non-finite inputs come out absent; finite inputs are multiplied
    /// by the attribute's factor, or passed through when it has none.
    pub fn apply(&self, attribute: &str, values: &[Option<f64>]) -> Vec<Option<f64>> {
        let factor = self.factor_for(attribute);
        values
            .iter()
            .map(|value| {
                value
                    .filter(|v| v.is_finite())
                    .map(|v| factor.map_or(v, |f| v * f))
            })
            .collect()
    }
}

impl Default for ScalePolicy {
    fn default() -> Self {
        Self::new([("NDVI", VEGETATION_INDEX_SCALE), ("EVI", VEGETATION_INDEX_SCALE)])
    }
}
