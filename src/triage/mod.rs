pub mod analyzer;
pub mod cache;
pub mod category;
pub mod orchestrator;
pub mod types;
