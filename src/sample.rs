use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const N_FEATURES: usize = 7;

/// Inclusive range accepted for one input field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldBounds {
    pub field: &'static str,
    pub min: f64,
    pub max: f64,
}

impl FieldBounds {
    pub fn contains(&self, value: f64) -> bool {
        // NaN fails both comparisons
        value >= self.min && value <= self.max
    }
}

/// Bounds in feature order: N, P, K, temperature, humidity, ph, rainfall.
pub const FIELD_BOUNDS: [FieldBounds; N_FEATURES] = [
    FieldBounds { field: "N", min: 0.0, max: 140.0 },
    FieldBounds { field: "P", min: 5.0, max: 145.0 },
    FieldBounds { field: "K", min: 5.0, max: 205.0 },
    FieldBounds { field: "temperature", min: 8.83, max: 43.68 },
    FieldBounds { field: "humidity", min: 14.26, max: 99.98 },
    FieldBounds { field: "ph", min: 3.5, max: 9.94 },
    FieldBounds { field: "rainfall", min: 20.21, max: 298.56 },
];

/// Unvalidated request body.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct SoilReading {
    #[serde(rename = "N")]
    pub nitrogen: f64,
    #[serde(rename = "P")]
    pub phosphorus: f64,
    #[serde(rename = "K")]
    pub potassium: f64,
    pub temperature: f64,
    pub humidity: f64,
    pub ph: f64,
    pub rainfall: f64,
}

impl SoilReading {
    fn values(&self) -> [f64; N_FEATURES] {
        [
            self.nitrogen,
            self.phosphorus,
            self.potassium,
            self.temperature,
            self.humidity,
            self.ph,
            self.rainfall,
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Violation {
    BelowMin,
    AboveMax,
    NotFinite,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldViolation {
    pub field: &'static str,
    pub value: f64,
    pub bounds: FieldBounds,
    pub kind: Violation,
}

impl std::fmt::Display for FieldViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.kind {
            Violation::BelowMin => write!(
                f,
                "{} must be greater than or equal to {} (got {})",
                self.field, self.bounds.min, self.value
            ),
            Violation::AboveMax => write!(
                f,
                "{} must be less than or equal to {} (got {})",
                self.field, self.bounds.max, self.value
            ),
            Violation::NotFinite => write!(f, "{} must be a finite number", self.field),
        }
    }
}

/// Every field that fell outside its bounds, in feature order.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{} field(s) out of range: {}", .violations.len(), summarize(.violations))]
pub struct ValidationError {
    pub violations: Vec<FieldViolation>,
}

fn summarize(violations: &[FieldViolation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// A reading whose fields are all within [`FIELD_BOUNDS`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SoilSample {
    reading: SoilReading,
}

impl SoilSample {
    pub fn new(reading: SoilReading) -> Result<Self, ValidationError> {
        let violations: Vec<FieldViolation> = reading
            .values()
            .into_iter()
            .zip(FIELD_BOUNDS)
            .filter(|(value, bounds)| !bounds.contains(*value))
            .map(|(value, bounds)| FieldViolation {
                field: bounds.field,
                value,
                bounds,
                kind: if !value.is_finite() {
                    Violation::NotFinite
                } else if value < bounds.min {
                    Violation::BelowMin
                } else {
                    Violation::AboveMax
                },
            })
            .collect();

        if violations.is_empty() {
            Ok(Self { reading })
        } else {
            Err(ValidationError { violations })
        }
    }

    /// Feature vector in training column order.
    pub fn features(&self) -> [f64; N_FEATURES] {
        self.reading.values()
    }
}
