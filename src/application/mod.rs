// Application layer - Dataset loading, normalisation and dashboard use cases
pub mod dashboard_service;
pub mod dataset_service;
pub mod dataset_source;
pub mod normalizer;
pub mod pipeline;
pub mod streaming_service;
