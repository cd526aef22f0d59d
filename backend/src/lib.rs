//! In-memory search backend answering the remote search contract.

pub mod api;
pub mod config;
pub mod local_dataset;
pub mod local_backend;

pub use config::LocalBackendConfig;
pub use local_backend::LocalSearchBackend;
pub use local_dataset::{FacetBucket, FacetDefinition, LocalDataset};
