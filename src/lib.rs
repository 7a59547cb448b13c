#![doc = include_str!("../README.md")]

/// Error types for waveguide operations.
pub mod error;
pub use error::{Result, WaveguideError};

/// Runtime configuration and validation
pub mod config;
/// Volume predicates and bounding boxes
pub mod geometry;
/// Lattice construction and node classification
pub mod mesh;
/// Boundary filter primitives, stability and design
pub mod filters;
/// Surface materials
pub mod material;
/// Persisted material filter sets
pub mod catalogue;
/// Time-stepped mesh simulation
pub mod waveguide;

pub use catalogue::FilterCatalogue;
pub use config::{Dispatch, FilterForm, FitterConfig, Topology, WaveguideConfig};
pub use filters::{FilterCoefficients, FrequencyEnvelope};
pub use geometry::{Aabb, Boundary, CuboidBoundary, LShapedBoundary, SphereBoundary, Vec3};
pub use material::Material;
pub use mesh::{Mesh, MeshDescriptor, NodeClass};
pub use waveguide::{
    CallbackAction, Receiver, Source, SourceSignal, StepOutput, StepProgress, Waveguide,
};
