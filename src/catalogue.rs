//! Material name to boundary filter catalogue.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use log::info;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::config::FitterConfig;
use crate::error::{Result, WaveguideError};
use crate::filters::FilterCoefficients;
use crate::material::Material;

/// Fitted boundary filters keyed by material name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterCatalogue {
    filters: BTreeMap<String, FilterCoefficients>,
}

impl FilterCatalogue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fit admittance filters for every material in parallel.
    ///
    /// The first material that cannot be fitted fails the whole catalogue.
    pub fn fit(
        materials: &[Material],
        sample_rate: f64,
        order: usize,
        config: &FitterConfig,
    ) -> Result<Self> {
        let fitted: Vec<(String, FilterCoefficients)> = materials
            .par_iter()
            .map(|m| {
                m.admittance_filter(sample_rate, order, config)
                    .map(|f| (m.name.clone(), f))
            })
            .collect::<Result<_>>()?;
        info!(
            "fitted {} boundary filters of order {} at {:.1} Hz",
            fitted.len(),
            order,
            sample_rate
        );
        Ok(Self {
            filters: fitted.into_iter().collect(),
        })
    }

    pub fn insert(&mut self, name: impl Into<String>, filter: FilterCoefficients) {
        self.filters.insert(name.into(), filter);
    }

    pub fn get(&self, name: &str) -> Option<&FilterCoefficients> {
        self.filters.get(name)
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.filters.keys().map(String::as_str)
    }

    /// Filters in the order of `names`, for indexing by material index.
    pub fn ordered(&self, names: &[&str]) -> Result<Vec<FilterCoefficients>> {
        names
            .iter()
            .map(|name| {
                self.filters.get(*name).cloned().ok_or_else(|| {
                    WaveguideError::config(format!("no filter for material '{}'", name))
                })
            })
            .collect()
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let catalogue: Self = serde_json::from_str(json)?;
        for (name, filter) in &catalogue.filters {
            if filter.b.is_empty() || filter.b.len() != filter.a.len() {
                return Err(WaveguideError::config(format!(
                    "filter '{}' has mismatched coefficient arrays",
                    name
                )));
            }
            filter.check_finite()?;
        }
        Ok(catalogue)
    }

    pub fn save_json(&self, path: &Path) -> Result<()> {
        fs::write(path, self.to_json_string()?)?;
        Ok(())
    }

    pub fn load_json(path: &Path) -> Result<Self> {
        Self::from_json_str(&fs::read_to_string(path)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ordered_lookup() {
        let mut catalogue = FilterCatalogue::new();
        catalogue.insert("a", FilterCoefficients::flat(1));
        catalogue.insert("b", FilterCoefficients::gain(0.5, 1));
        let ordered = catalogue.ordered(&["b", "a"]).unwrap();
        assert_eq!(ordered[0].b[0], 0.5);
        assert!(catalogue.ordered(&["c"]).is_err());
        assert_eq!(catalogue.names().collect::<Vec<_>>(), vec!["a", "b"]);
    }

    #[test]
    fn test_rejects_malformed_json() {
        let json = r#"{ "filters": { "x": { "b": [1.0], "a": [1.0, 0.0] } } }"#;
        assert!(FilterCatalogue::from_json_str(json)
            .unwrap_err()
            .is_configuration_error());
        assert!(FilterCatalogue::from_json_str("not json")
            .unwrap_err()
            .is_io_error());
    }
}
