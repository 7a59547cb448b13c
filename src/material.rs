//! Surface materials and their boundary filters.

use serde::{Deserialize, Serialize};

use crate::config::FitterConfig;
use crate::error::{Result, WaveguideError};
use crate::filters::{
    absorption_to_pressure_reflectance, fit_filter, FilterCoefficients, FrequencyEnvelope,
};

/// Standard octave band center frequencies for absorption coefficients (Hz)
pub const ABSORPTION_FREQUENCIES: [f64; 6] = [125.0, 250.0, 500.0, 1000.0, 2000.0, 4000.0];

/// Surface material with frequency-dependent absorption coefficients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Material {
    pub name: String,
    /// Absorption coefficients at 125, 250, 500, 1000, 2000, 4000 Hz
    pub absorption: [f64; 6],
}

impl Material {
    pub fn new(name: &str, absorption: [f64; 6]) -> Self {
        Self {
            name: name.to_string(),
            absorption,
        }
    }

    /// Look up a preset by name.
    pub fn preset(name: &str) -> Result<Self> {
        let material = match name.to_lowercase().as_str() {
            "concrete" => Self::concrete(),
            "brick" => Self::brick(),
            "drywall" | "gypsum" => Self::drywall(),
            "plaster" => Self::plaster(),
            "glass" => Self::glass(),
            "wood" | "wood_panel" => Self::wood(),
            "carpet" => Self::carpet(),
            "acoustic_tile" | "ceiling_tile" => Self::acoustic_tile(),
            "curtains" | "drapes" => Self::curtains(),
            "acoustic_foam" | "foam" => Self::acoustic_foam(),
            "rigid" => Self::rigid(),
            other => {
                return Err(WaveguideError::config(format!(
                    "unknown material preset '{}'",
                    other
                )))
            }
        };
        Ok(material)
    }

    /// Perfectly reflecting surface.
    pub fn rigid() -> Self {
        Self::new("Rigid", [0.0; 6])
    }

    /// Concrete or brick (painted)
    pub fn concrete() -> Self {
        Self::new("Concrete", [0.01, 0.01, 0.02, 0.02, 0.02, 0.03])
    }

    /// Unpainted brick
    pub fn brick() -> Self {
        Self::new("Brick", [0.03, 0.03, 0.03, 0.04, 0.05, 0.07])
    }

    /// Gypsum board on studs
    pub fn drywall() -> Self {
        Self::new("Drywall", [0.29, 0.10, 0.05, 0.04, 0.07, 0.09])
    }

    pub fn plaster() -> Self {
        Self::new("Plaster", [0.01, 0.02, 0.02, 0.03, 0.04, 0.05])
    }

    pub fn glass() -> Self {
        Self::new("Glass", [0.18, 0.06, 0.04, 0.03, 0.02, 0.02])
    }

    /// Thin wood paneling
    pub fn wood() -> Self {
        Self::new("Wood", [0.42, 0.21, 0.10, 0.08, 0.06, 0.06])
    }

    /// Heavy carpet on underlay
    pub fn carpet() -> Self {
        Self::new("Carpet", [0.08, 0.24, 0.57, 0.69, 0.71, 0.73])
    }

    pub fn acoustic_tile() -> Self {
        Self::new("Acoustic Tile", [0.50, 0.70, 0.60, 0.70, 0.70, 0.50])
    }

    pub fn curtains() -> Self {
        Self::new("Curtains", [0.07, 0.31, 0.49, 0.75, 0.70, 0.60])
    }

    pub fn acoustic_foam() -> Self {
        Self::new("Acoustic Foam", [0.08, 0.25, 0.60, 0.90, 0.95, 0.90])
    }

    /// Band reflectances as a design envelope for a mesh running at
    /// `sample_rate`.
    ///
    /// Bands at or above Nyquist are dropped. The envelope is pinned at 0
    /// and 1 to the first and last remaining band.
    pub fn reflectance_envelope(&self, sample_rate: f64) -> Result<FrequencyEnvelope> {
        let nyquist = sample_rate * 0.5;
        let bands: Vec<(f64, f64)> = ABSORPTION_FREQUENCIES
            .iter()
            .zip(self.absorption.iter())
            .filter(|(f, _)| **f < nyquist)
            .map(|(f, alpha)| (f / nyquist, absorption_to_pressure_reflectance(*alpha)))
            .collect();

        let (first, last) = match (bands.first(), bands.last()) {
            (Some(first), Some(last)) => (first.1, last.1),
            _ => {
                return Err(WaveguideError::config(format!(
                    "sample rate {} Hz is below every band of '{}'",
                    sample_rate, self.name
                )))
            }
        };
        let mut points = Vec::with_capacity(bands.len() + 2);
        points.push((0.0, first));
        points.extend(bands);
        points.push((1.0, last));
        FrequencyEnvelope::new(points)
    }

    /// Fitted pressure reflectance filter.
    pub fn reflectance_filter(
        &self,
        sample_rate: f64,
        order: usize,
        config: &FitterConfig,
    ) -> Result<FilterCoefficients> {
        let envelope = self.reflectance_envelope(sample_rate)?;
        fit_filter(&envelope, order, config).map_err(|e| match e {
            WaveguideError::UnstableFilter { attempts, .. } => WaveguideError::UnstableFilter {
                material: self.name.clone(),
                attempts,
            },
            other => other,
        })
    }

    /// Boundary filter in the admittance domain, as used by the waveguide.
    pub fn admittance_filter(
        &self,
        sample_rate: f64,
        order: usize,
        config: &FitterConfig,
    ) -> Result<FilterCoefficients> {
        let admittance = self
            .reflectance_filter(sample_rate, order, config)?
            .to_admittance();
        admittance.check_finite()?;
        if !admittance.is_stable() {
            return Err(WaveguideError::UnstableFilter {
                material: self.name.clone(),
                attempts: config.max_attempts,
            });
        }
        Ok(admittance)
    }
}
