// Domain layer - Dataset, readings and dashboard view models
pub mod dashboard;
pub mod raw_table;
pub mod reading;
pub mod selection;
