pub mod config;

pub use config::BuilderConfig;
