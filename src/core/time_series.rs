//! TimeSeries container: an ordered sequence of finite values indexed by position.

use crate::detection::{detect_outliers, OutlierConfig};
use crate::error::{OddityError, Result};
use crate::utils::stats;
use serde_json::Value;

/// A univariate time series.
///
/// The position of a value is its time index; there are no explicit
/// timestamps. Every stored value is finite. The series only grows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TimeSeries {
    values: Vec<f64>,
}

impl TimeSeries {
    /// Create an empty series.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Create a series from owned values, rejecting NaN and infinities.
    pub fn new(values: Vec<f64>) -> Result<Self> {
        if let Some((index, &value)) = values.iter().enumerate().find(|(_, v)| !v.is_finite()) {
            return Err(OddityError::InvalidValue { index, value });
        }
        Ok(Self { values })
    }

    /// Create a series from a loosely typed JSON array.
    ///
    /// The whole input is shape-checked before anything is copied: it must be
    /// a flat array of numbers. Nested arrays (regular or ragged) and
    /// non-numeric elements are rejected with [`OddityError::InvalidShape`].
    pub fn from_json(input: &Value) -> Result<Self> {
        let items = input.as_array().ok_or_else(|| {
            OddityError::InvalidShape(format!("expected a flat array, got {}", kind(input)))
        })?;

        for (i, item) in items.iter().enumerate() {
            match item {
                Value::Number(_) => {}
                Value::Array(_) => {
                    return Err(OddityError::InvalidShape(format!(
                        "element {i} is an array; only rank-1 input is accepted"
                    )))
                }
                other => {
                    return Err(OddityError::InvalidShape(format!(
                        "element {i} is {}, not a number",
                        kind(other)
                    )))
                }
            }
        }

        let values = items
            .iter()
            .enumerate()
            .map(|(i, item)| {
                item.as_f64()
                    .ok_or_else(|| OddityError::InvalidShape(format!("element {i} is not an f64")))
            })
            .collect::<Result<Vec<f64>>>()?;

        Self::new(values)
    }

    /// Append one value. Amortized O(1).
    pub fn append(&mut self, value: f64) -> Result<()> {
        if !value.is_finite() {
            return Err(OddityError::InvalidValue {
                index: self.values.len(),
                value,
            });
        }
        self.values.push(value);
        Ok(())
    }

    /// Append values in order.
    ///
    /// Stops at the first invalid value; values appended before it remain in
    /// the series.
    pub fn extend<I>(&mut self, values: I) -> Result<()>
    where
        I: IntoIterator<Item = f64>,
    {
        for value in values {
            self.append(value)?;
        }
        Ok(())
    }

    /// Get the number of observations.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check if the series is empty.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Value at `index`.
    pub fn get(&self, index: usize) -> Result<f64> {
        self.values
            .get(index)
            .copied()
            .ok_or(OddityError::IndexOutOfRange {
                index,
                len: self.values.len(),
            })
    }

    /// Read-only view of the values.
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn iter(&self) -> std::slice::Iter<'_, f64> {
        self.values.iter()
    }

    /// Copy the values out as a plain vector.
    pub fn to_vec(&self) -> Vec<f64> {
        self.values.clone()
    }

    /// Arithmetic mean.
    pub fn mean(&self) -> Result<f64> {
        if self.is_empty() {
            return Err(OddityError::EmptySeries);
        }
        Ok(stats::mean(&self.values))
    }

    /// Population standard deviation (divisor `n`, no Bessel correction).
    pub fn std(&self) -> Result<f64> {
        if self.is_empty() {
            return Err(OddityError::EmptySeries);
        }
        Ok(stats::population_std(&self.values))
    }

    /// Points further than 2.5 population standard deviations from the mean,
    /// as `(index, value)` pairs in ascending index order.
    ///
    /// Empty and constant series have no outliers.
    pub fn outliers(&self) -> Vec<(usize, f64)> {
        detect_outliers(&self.values, &OutlierConfig::default()).points(&self.values)
    }

    /// Elementwise `self - other` as a new series.
    pub fn sub_values(&self, other: &[f64]) -> Result<TimeSeries> {
        self.zip_with(other, |a, b| a - b)
    }

    /// Elementwise `self + other` as a new series.
    pub fn add_values(&self, other: &[f64]) -> Result<TimeSeries> {
        self.zip_with(other, |a, b| a + b)
    }

    fn zip_with(&self, other: &[f64], op: impl Fn(f64, f64) -> f64) -> Result<TimeSeries> {
        if other.len() != self.len() {
            return Err(OddityError::DimensionMismatch {
                expected: self.len(),
                got: other.len(),
            });
        }
        let values = self
            .values
            .iter()
            .zip(other.iter())
            .map(|(&a, &b)| op(a, b))
            .collect();
        Self::new(values)
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

impl TryFrom<Vec<f64>> for TimeSeries {
    type Error = OddityError;

    fn try_from(values: Vec<f64>) -> Result<Self> {
        Self::new(values)
    }
}

impl TryFrom<&[f64]> for TimeSeries {
    type Error = OddityError;

    fn try_from(values: &[f64]) -> Result<Self> {
        Self::new(values.to_vec())
    }
}

impl<'a> IntoIterator for &'a TimeSeries {
    type Item = &'a f64;
    type IntoIter = std::slice::Iter<'a, f64>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.iter()
    }
}
