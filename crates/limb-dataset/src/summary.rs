//! Compact, serializable description of a dataset's contents.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::dataset::LabeledDataset;

/// Counts and value range for one data variable.
///
/// Samples equal to the dataset's missing value are counted in `missing`
/// and excluded from `min`/`max`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VariableSummary {
    pub total: usize,
    pub missing: usize,
    pub valid: usize,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatasetSummary {
    pub dims: BTreeMap<String, usize>,
    pub time_start: Option<DateTime<Utc>>,
    pub time_end: Option<DateTime<Utc>>,
    pub missing_value: Option<f64>,
    pub variables: BTreeMap<String, VariableSummary>,
}

impl LabeledDataset {
    /// Summarize dimensions, time range and per-variable validity.
    ///
    /// The missing value is read from the `missing_value` attribute; NaN
    /// samples are treated as missing as well.
    pub fn summary(&self) -> DatasetSummary {
        let missing_value = self.attr("missing_value").and_then(|a| a.as_number());

        let dims = self
            .dims()
            .iter()
            .map(|(name, len)| (name.clone(), *len))
            .collect();

        let times: Vec<DateTime<Utc>> = self
            .coords()
            .filter_map(|(_, c)| c.values().as_time())
            .flatten()
            .copied()
            .collect();

        let variables = self
            .data_vars()
            .map(|(name, var)| {
                let mut summary = VariableSummary {
                    total: var.values().len(),
                    missing: 0,
                    valid: 0,
                    min: None,
                    max: None,
                };
                for &v in var.values().iter() {
                    if v.is_nan() || Some(v) == missing_value {
                        summary.missing += 1;
                        continue;
                    }
                    summary.valid += 1;
                    summary.min = Some(summary.min.map_or(v, |m| m.min(v)));
                    summary.max = Some(summary.max.map_or(v, |m| m.max(v)));
                }
                (name.to_string(), summary)
            })
            .collect();

        DatasetSummary {
            dims,
            time_start: times.iter().min().copied(),
            time_end: times.iter().max().copied(),
            missing_value,
            variables,
        }
    }
}
