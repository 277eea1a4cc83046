//! # mydas-query
//!
//! Plugin contract between the MyDas command layer and the data sources
//! that supply sequences, features, types and entry points.
//!
//! ## Architecture
//!
//! A data source implements [`DataSource`] and declares what it can do with
//! a closed set of [`Capability`] tags:
//!
//! - **Annotation**: serves features and types (every source)
//! - **Reference**: additionally serves sequences and entry points
//! - **RangeHandling**: restricts features/sequences to a requested range
//!
//! The command layer picks retrieval calls from these tags rather than from
//! the concrete type of the source.
//!
//! ## Backend Implementation
//!
//! To implement a new backend:
//!
//! 1. Create a struct that implements `DataSource`
//! 2. Override the optional methods matching its capabilities
//! 3. Create a `DataSourceFactory` implementation
//! 4. Register the factory with `DataSourceRegistry`
//!
//! Example backend crates:
//! - `mydas-memory` - in-memory fixture backed source

pub mod error;
pub mod registry;
pub mod traits;
pub mod types;

// Re-export commonly used items
pub use error::{DataError, Result};
pub use registry::{DataSourceFactory, DataSourceRegistry, LoadedSource};
pub use traits::DataSource;
pub use types::{
    AnnotatedSegment, Capability, EntryPoint, Feature, FeatureGroup, FeatureLink, FeatureTarget,
    FeatureType, LinkField, MoleculeType, Orientation, Sequence,
};
