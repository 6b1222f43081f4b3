//! In-memory labeled dataset.
//!
//! A [`LabeledDataset`] pairs n-dimensional `f64` arrays with named
//! dimensions, one-dimensional coordinate arrays and global attributes.
//! Every insert is checked against the declared dimension lengths, so a
//! dataset that exists is always internally consistent.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use ndarray::{ArrayD, ArrayView1, ArrayView2, Ix2};

use crate::error::{DatasetError, DatasetResult};

/// A named data variable laid out over one or more dimensions.
#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    dims: Vec<String>,
    values: ArrayD<f64>,
}

impl Variable {
    /// Dimension names, outermost first.
    pub fn dims(&self) -> &[String] {
        &self.dims
    }

    pub fn values(&self) -> &ArrayD<f64> {
        &self.values
    }

    /// View as a 2-D array, if the variable has exactly two dimensions.
    pub fn as_2d(&self) -> Option<ArrayView2<'_, f64>> {
        self.values.view().into_dimensionality::<Ix2>().ok()
    }
}

/// Values held by a coordinate.
#[derive(Debug, Clone, PartialEq)]
pub enum CoordinateValues {
    Float(Vec<f64>),
    Time(Vec<DateTime<Utc>>),
}

impl CoordinateValues {
    pub fn len(&self) -> usize {
        match self {
            CoordinateValues::Float(v) => v.len(),
            CoordinateValues::Time(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_float(&self) -> Option<&[f64]> {
        match self {
            CoordinateValues::Float(v) => Some(v),
            CoordinateValues::Time(_) => None,
        }
    }

    pub fn as_time(&self) -> Option<&[DateTime<Utc>]> {
        match self {
            CoordinateValues::Time(v) => Some(v),
            CoordinateValues::Float(_) => None,
        }
    }
}

/// A one-dimensional coordinate indexed by a single dimension.
#[derive(Debug, Clone, PartialEq)]
pub struct Coordinate {
    dim: String,
    values: CoordinateValues,
}

impl Coordinate {
    pub fn dim(&self) -> &str {
        &self.dim
    }

    pub fn values(&self) -> &CoordinateValues {
        &self.values
    }
}

/// Global attribute value.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    Number(f64),
    Text(String),
}

impl AttributeValue {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            AttributeValue::Number(n) => Some(*n),
            AttributeValue::Text(_) => None,
        }
    }
}

impl From<f64> for AttributeValue {
    fn from(value: f64) -> Self {
        AttributeValue::Number(value)
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        AttributeValue::Text(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        AttributeValue::Text(value)
    }
}

/// Dimensions, data variables, coordinates and attributes.
///
/// Dimensions keep their declaration order; variables, coordinates and
/// attributes are kept sorted by name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LabeledDataset {
    dims: Vec<(String, usize)>,
    data_vars: BTreeMap<String, Variable>,
    coords: BTreeMap<String, Coordinate>,
    attrs: BTreeMap<String, AttributeValue>,
}

impl LabeledDataset {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a dimension and its length.
    pub fn add_dimension(&mut self, name: &str, len: usize) -> DatasetResult<()> {
        if self.dim_len(name).is_some() {
            return Err(DatasetError::DuplicateName(name.to_string()));
        }
        self.dims.push((name.to_string(), len));
        Ok(())
    }

    /// Add a data variable over previously declared dimensions.
    pub fn add_data_var(
        &mut self,
        name: &str,
        dims: &[&str],
        values: ArrayD<f64>,
    ) -> DatasetResult<()> {
        if self.data_vars.contains_key(name) || self.coords.contains_key(name) {
            return Err(DatasetError::DuplicateName(name.to_string()));
        }
        let expected = self.expected_shape(dims)?;
        if values.shape() != expected.as_slice() {
            return Err(DatasetError::ShapeMismatch {
                name: name.to_string(),
                expected,
                found: values.shape().to_vec(),
            });
        }

        self.data_vars.insert(
            name.to_string(),
            Variable {
                dims: dims.iter().map(|d| d.to_string()).collect(),
                values,
            },
        );
        Ok(())
    }

    /// Add a coordinate indexed by one declared dimension.
    pub fn add_coord(
        &mut self,
        name: &str,
        dim: &str,
        values: CoordinateValues,
    ) -> DatasetResult<()> {
        if self.data_vars.contains_key(name) || self.coords.contains_key(name) {
            return Err(DatasetError::DuplicateName(name.to_string()));
        }
        let expected = self.expected_shape(&[dim])?;
        if values.len() != expected[0] {
            return Err(DatasetError::ShapeMismatch {
                name: name.to_string(),
                expected,
                found: vec![values.len()],
            });
        }

        self.coords.insert(
            name.to_string(),
            Coordinate {
                dim: dim.to_string(),
                values,
            },
        );
        Ok(())
    }

    /// Set (or replace) a global attribute.
    pub fn set_attr(&mut self, name: &str, value: impl Into<AttributeValue>) {
        self.attrs.insert(name.to_string(), value.into());
    }

    pub fn dims(&self) -> &[(String, usize)] {
        &self.dims
    }

    pub fn dim_len(&self, name: &str) -> Option<usize> {
        self.dims
            .iter()
            .find(|(dim, _)| dim == name)
            .map(|(_, len)| *len)
    }

    pub fn data_var(&self, name: &str) -> Option<&Variable> {
        self.data_vars.get(name)
    }

    pub fn data_vars(&self) -> impl Iterator<Item = (&str, &Variable)> {
        self.data_vars.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn coord(&self, name: &str) -> Option<&Coordinate> {
        self.coords.get(name)
    }

    pub fn coords(&self) -> impl Iterator<Item = (&str, &Coordinate)> {
        self.coords.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn attr(&self, name: &str) -> Option<&AttributeValue> {
        self.attrs.get(name)
    }

    pub fn attrs(&self) -> impl Iterator<Item = (&str, &AttributeValue)> {
        self.attrs.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// 2-D view of a data variable.
    pub fn var_2d(&self, name: &str) -> Option<ArrayView2<'_, f64>> {
        self.data_var(name).and_then(Variable::as_2d)
    }

    /// Float coordinate as a 1-D view.
    pub fn float_coord(&self, name: &str) -> Option<ArrayView1<'_, f64>> {
        self.coord(name)
            .and_then(|c| c.values.as_float())
            .map(ArrayView1::from)
    }

    pub fn time_coord(&self, name: &str) -> Option<&[DateTime<Utc>]> {
        self.coord(name).and_then(|c| c.values.as_time())
    }

    fn expected_shape(&self, dims: &[&str]) -> DatasetResult<Vec<usize>> {
        dims.iter()
            .map(|d| {
                self.dim_len(d)
                    .ok_or_else(|| DatasetError::UnknownDimension(d.to_string()))
            })
            .collect()
    }
}
