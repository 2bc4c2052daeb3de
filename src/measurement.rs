//! Named scalar diagnostics

use serde::{Deserialize, Serialize};

use crate::AlError;

/// One named diagnostic value, pulled on demand by a reporting sink.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    pub name: String,
    pub value: f64,
}

impl Measurement {
    pub fn new(name: impl Into<String>, value: f64) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

/// Look a measurement up by name.
pub fn find(measurements: &[Measurement], name: &str) -> Option<f64> {
    measurements
        .iter()
        .find(|m| m.name == name)
        .map(|m| m.value)
}

/// Serialize measurements as a pretty JSON array.
pub fn measurements_to_json(measurements: &[Measurement]) -> Result<String, AlError> {
    Ok(serde_json::to_string_pretty(measurements)?)
}
