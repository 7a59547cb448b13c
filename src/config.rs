//! Simulation configuration.
//!
//! Physical constants are plain runtime fields so one build can simulate
//! any medium. Every field has a serde default, so a partial JSON document
//! is a valid configuration.

use serde::{Deserialize, Serialize};

use crate::error::{Result, WaveguideError};

/// Courant number of both lattices.
pub const COURANT: f64 = 0.577_350_269_189_625_8; // 1 / sqrt(3)

/// Lattice topology of the mesh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Topology {
    /// Cartesian lattice, 6 ports per node.
    #[default]
    Rectangular,
    /// Diamond-like lattice of 8 nodes per cube, 4 ports per node.
    Tetrahedral,
}

impl Topology {
    /// Number of ports per node.
    pub fn num_ports(self) -> usize {
        match self {
            Topology::Rectangular => 6,
            Topology::Tetrahedral => 4,
        }
    }

    /// Divisor applied to the neighbor sum in the mesh recursion.
    pub fn port_divisor(self) -> f64 {
        match self {
            Topology::Rectangular => 3.0,
            Topology::Tetrahedral => 2.0,
        }
    }
}

/// How a single step is executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dispatch {
    /// One pass on the calling thread.
    Serial,
    /// Node updates spread over the rayon pool.
    #[default]
    Parallel,
}

/// Storage form of per-node boundary filter state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterForm {
    /// One direct-form filter of full order per node.
    #[default]
    Canonical,
    /// The same transfer function split into second-order sections.
    BiquadCascade,
}

/// Equation-error filter fitter settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FitterConfig {
    /// Number of points on the dense design grid over [0, 1].
    #[serde(default = "default_grid_points")]
    pub grid_points: usize,
    /// Reweighting iterations after the initial solve.
    #[serde(default = "default_iterations")]
    pub iterations: usize,
    /// Number of delay values tried before giving up.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: usize,
    /// Increment of the linear-phase delay (samples) between attempts.
    #[serde(default = "default_delay_step")]
    pub delay_step: f64,
    /// Delay used on the first attempt.
    #[serde(default)]
    pub initial_delay: f64,
    /// Relative singular value cut-off for the least-squares solve.
    #[serde(default = "default_rcond")]
    pub rcond: f64,
}

fn default_grid_points() -> usize {
    256
}
fn default_iterations() -> usize {
    8
}
fn default_max_attempts() -> usize {
    64
}
fn default_delay_step() -> f64 {
    1.0
}
fn default_rcond() -> f64 {
    1e-12
}

impl Default for FitterConfig {
    fn default() -> Self {
        Self {
            grid_points: default_grid_points(),
            iterations: default_iterations(),
            max_attempts: default_max_attempts(),
            delay_step: default_delay_step(),
            initial_delay: 0.0,
            rcond: default_rcond(),
        }
    }
}

/// Complete waveguide configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WaveguideConfig {
    /// Lattice topology
    #[serde(default)]
    pub topology: Topology,
    /// Speed of sound in m/s
    #[serde(default = "default_speed_of_sound")]
    pub speed_of_sound: f64,
    /// Ambient air density in kg/m³ (used for particle velocity)
    #[serde(default = "default_ambient_density")]
    pub ambient_density: f64,
    /// Order of fitted boundary filters
    #[serde(default = "default_filter_order")]
    pub filter_order: usize,
    /// Per-node boundary filter storage
    #[serde(default)]
    pub filter_form: FilterForm,
    /// Step execution strategy
    #[serde(default)]
    pub dispatch: Dispatch,
    /// Scan for NaN/Inf after every step
    #[serde(default = "default_check_numerics")]
    pub check_numerics: bool,
    /// Length of the free-field response used by transparent sources
    #[serde(default = "default_transparent_length")]
    pub transparent_length: usize,
    /// Width of the Gaussian initial field, in mesh spacings
    #[serde(default = "default_gaussian_sigma")]
    pub gaussian_sigma: f64,
    /// Minimum time between progress log lines, in milliseconds
    #[serde(default = "default_progress_interval_ms")]
    pub progress_interval_ms: u64,
    /// Boundary filter fitter
    #[serde(default)]
    pub fitter: FitterConfig,
}

fn default_speed_of_sound() -> f64 {
    343.0
}
fn default_ambient_density() -> f64 {
    1.225
}
fn default_filter_order() -> usize {
    6
}
fn default_check_numerics() -> bool {
    true
}
fn default_transparent_length() -> usize {
    64
}
fn default_gaussian_sigma() -> f64 {
    1.0
}
fn default_progress_interval_ms() -> u64 {
    5000
}

impl Default for WaveguideConfig {
    fn default() -> Self {
        Self {
            topology: Topology::default(),
            speed_of_sound: default_speed_of_sound(),
            ambient_density: default_ambient_density(),
            filter_order: default_filter_order(),
            filter_form: FilterForm::default(),
            dispatch: Dispatch::default(),
            check_numerics: default_check_numerics(),
            transparent_length: default_transparent_length(),
            gaussian_sigma: default_gaussian_sigma(),
            progress_interval_ms: default_progress_interval_ms(),
            fitter: FitterConfig::default(),
        }
    }
}

/// Time step of a mesh with the given spacing.
pub fn time_step(speed_of_sound: f64, spacing: f64) -> f64 {
    spacing * COURANT / speed_of_sound
}

/// Mesh spacing that yields the given time step.
pub fn grid_spacing(speed_of_sound: f64, time_step: f64) -> f64 {
    speed_of_sound * time_step / COURANT
}

/// Result of configuration validation
#[derive(Debug, Clone)]
pub struct ValidationResult {
    /// Whether the configuration is valid
    pub is_valid: bool,
    /// Critical errors that prevent a run
    pub errors: Vec<String>,
    /// Non-critical warnings
    pub warnings: Vec<String>,
}

impl ValidationResult {
    /// Create a valid result with no errors or warnings
    pub fn valid() -> Self {
        Self {
            is_valid: true,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// Add an error (marks result as invalid)
    pub fn add_error(&mut self, error: String) {
        self.errors.push(error);
        self.is_valid = false;
    }

    /// Add a warning (does not affect validity)
    pub fn add_warning(&mut self, warning: String) {
        self.warnings.push(warning);
    }

    /// Log warnings and errors
    pub fn log_results(&self) {
        for warning in &self.warnings {
            log::warn!("{}", warning);
        }
        for error in &self.errors {
            log::error!("{}", error);
        }
    }
}

impl Default for ValidationResult {
    fn default() -> Self {
        Self::valid()
    }
}

impl WaveguideConfig {
    /// Sample rate of a mesh with the given spacing.
    pub fn sample_rate(&self, spacing: f64) -> f64 {
        1.0 / time_step(self.speed_of_sound, spacing)
    }

    /// Collect every problem with this configuration.
    pub fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::valid();

        if !(self.speed_of_sound.is_finite() && self.speed_of_sound > 0.0) {
            result.add_error(format!(
                "speed_of_sound ({}) must be positive",
                self.speed_of_sound
            ));
        }
        if !(self.ambient_density.is_finite() && self.ambient_density > 0.0) {
            result.add_error(format!(
                "ambient_density ({}) must be positive",
                self.ambient_density
            ));
        }
        if self.filter_order == 0 {
            result.add_error("filter_order must be at least 1".to_string());
        }
        if self.filter_form == FilterForm::BiquadCascade && self.filter_order % 2 == 1 {
            result.add_warning(format!(
                "filter_order {} is odd, the last biquad section will be first order",
                self.filter_order
            ));
        }
        if !(self.gaussian_sigma.is_finite() && self.gaussian_sigma > 0.0) {
            result.add_error(format!(
                "gaussian_sigma ({}) must be positive",
                self.gaussian_sigma
            ));
        }
        if self.transparent_length == 0 {
            result.add_warning(
                "transparent_length is 0, transparent sources behave like soft sources"
                    .to_string(),
            );
        }

        let fitter = &self.fitter;
        if fitter.grid_points < 2 * self.filter_order + 1 {
            result.add_error(format!(
                "fitter.grid_points ({}) must be at least 2 * filter_order + 1",
                fitter.grid_points
            ));
        }
        if fitter.max_attempts == 0 {
            result.add_warning("fitter.max_attempts is 0, every fit will fail".to_string());
        }
        if !(fitter.delay_step.is_finite() && fitter.delay_step > 0.0) {
            result.add_error(format!(
                "fitter.delay_step ({}) must be positive",
                fitter.delay_step
            ));
        }

        result
    }

    /// Validate and turn the first error into a [`WaveguideError`].
    pub fn check(&self) -> Result<()> {
        let result = self.validate();
        result.log_results();
        match result.errors.into_iter().next() {
            Some(message) => Err(WaveguideError::config(message)),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = WaveguideConfig::default();
        let result = config.validate();
        assert!(result.is_valid, "{:?}", result.errors);
        assert!(config.check().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: WaveguideConfig =
            serde_json::from_str(r#"{ "topology": "tetrahedral", "speed_of_sound": 340.0 }"#)
                .unwrap();
        assert_eq!(config.topology, Topology::Tetrahedral);
        assert_eq!(config.speed_of_sound, 340.0);
        assert_eq!(config.filter_order, 6);
        assert_eq!(config.fitter.grid_points, 256);
    }

    #[test]
    fn test_invalid_values_are_reported() {
        let config = WaveguideConfig {
            speed_of_sound: -1.0,
            filter_order: 0,
            ..Default::default()
        };
        let result = config.validate();
        assert!(!result.is_valid);
        assert_eq!(result.errors.len(), 2);
        assert!(config.check().unwrap_err().is_configuration_error());
    }

    #[test]
    fn test_time_step_and_spacing_are_inverse() {
        let spacing = grid_spacing(343.0, 1.0 / 10_000.0);
        let t = time_step(343.0, spacing);
        assert!((t - 1.0 / 10_000.0).abs() < 1e-15);
    }

    #[test]
    fn test_topology_constants() {
        assert_eq!(Topology::Rectangular.num_ports(), 6);
        assert_eq!(Topology::Tetrahedral.num_ports(), 4);
        assert_eq!(Topology::Rectangular.port_divisor(), 3.0);
        assert_eq!(Topology::Tetrahedral.port_divisor(), 2.0);
    }
}
