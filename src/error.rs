//! Error types for the waveguide crate.
//!
//! A single error enum covers mesh construction, boundary filter design and
//! the simulation run. Cancelling a run is not an error: the run driver
//! returns `Ok(None)` instead.

use thiserror::Error;

/// Error type for waveguide operations.
#[derive(Debug, Error)]
pub enum WaveguideError {
    /// A configuration value is out of range or inconsistent.
    #[error("invalid configuration: {message}")]
    InvalidConfig {
        /// Description of the offending value.
        message: String,
    },

    /// The mesh has no inside nodes, so nothing can be placed in it.
    #[error("mesh contains no inside nodes")]
    EmptyMesh,

    /// The source node is not an inside node of the mesh.
    #[error("source node {index} is outside the mesh")]
    SourceOutsideMesh {
        /// Flat node index of the source.
        index: usize,
    },

    /// The receiver node is not an inside node of the mesh.
    #[error("receiver node {index} is outside the mesh")]
    ReceiverOutsideMesh {
        /// Flat node index of the receiver.
        index: usize,
    },

    /// A boundary node refers to a material with no filter.
    #[error("boundary node {node} uses material {material} but only {available} filters were supplied")]
    MaterialIndexOutOfRange {
        /// Flat node index.
        node: usize,
        /// Material index recorded on the node.
        material: usize,
        /// Number of filters available.
        available: usize,
    },

    /// The requested filter order cannot be realised.
    #[error("filter order {order} is not usable: {message}")]
    FilterOrder {
        /// Requested order.
        order: usize,
        /// Reason.
        message: String,
    },

    /// Filter design exhausted its delay retries without a stable result.
    #[error("unable to generate stable boundary filter for '{material}' after {attempts} attempts")]
    UnstableFilter {
        /// Material name (or a placeholder for anonymous envelopes).
        material: String,
        /// Number of attempts made.
        attempts: usize,
    },

    /// A canonical filter could not be split into biquad sections.
    #[error("biquad factorisation failed: {message}")]
    Factorisation {
        /// Reason.
        message: String,
    },

    /// NaN or infinity showed up in simulation state or coefficients.
    #[error("non-finite {quantity} at step {step}, index {index}")]
    NumericalAnomaly {
        /// What was being checked ("pressure", "intensity", "coefficient").
        quantity: String,
        /// Step at which it was detected (0 for setup checks).
        step: usize,
        /// Node or coefficient index.
        index: usize,
    },

    /// I/O error wrapper.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for waveguide operations.
pub type Result<T> = std::result::Result<T, WaveguideError>;

impl WaveguideError {
    /// Shorthand for [`WaveguideError::InvalidConfig`].
    pub fn config(message: impl Into<String>) -> Self {
        WaveguideError::InvalidConfig {
            message: message.into(),
        }
    }

    /// Returns true for errors raised before a run starts.
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            WaveguideError::InvalidConfig { .. }
                | WaveguideError::EmptyMesh
                | WaveguideError::SourceOutsideMesh { .. }
                | WaveguideError::ReceiverOutsideMesh { .. }
                | WaveguideError::MaterialIndexOutOfRange { .. }
                | WaveguideError::FilterOrder { .. }
        )
    }

    /// Returns true if boundary filter design failed.
    pub fn is_filter_error(&self) -> bool {
        matches!(
            self,
            WaveguideError::UnstableFilter { .. } | WaveguideError::Factorisation { .. }
        )
    }

    /// Returns true if the simulation produced NaN or infinity.
    pub fn is_numerical_error(&self) -> bool {
        matches!(self, WaveguideError::NumericalAnomaly { .. })
    }

    /// Returns true if this is a file/IO error.
    pub fn is_io_error(&self) -> bool {
        matches!(self, WaveguideError::Io(_) | WaveguideError::Json(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_categories() {
        assert!(WaveguideError::EmptyMesh.is_configuration_error());
        assert!(WaveguideError::SourceOutsideMesh { index: 3 }.is_configuration_error());
        assert!(!WaveguideError::EmptyMesh.is_filter_error());

        let unstable = WaveguideError::UnstableFilter {
            material: "carpet".to_string(),
            attempts: 10,
        };
        assert!(unstable.is_filter_error());
        assert!(!unstable.is_configuration_error());
        assert_eq!(
            unstable.to_string(),
            "unable to generate stable boundary filter for 'carpet' after 10 attempts"
        );

        let nan = WaveguideError::NumericalAnomaly {
            quantity: "pressure".to_string(),
            step: 12,
            index: 40,
        };
        assert!(nan.is_numerical_error());
    }
}
