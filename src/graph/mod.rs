pub mod builder;
pub mod config;
pub mod edges;
pub mod scoring;

pub use builder::ContextGraphBuilder;
pub use config::GraphConfig;
