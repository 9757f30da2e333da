#![doc = include_str!("../README.md")]

pub mod bootstrap;
pub mod cache;
pub mod config;
pub mod engine;
pub mod error;
pub mod fairness;
pub mod guard;
pub mod logging;
pub mod membership;
pub mod pool;
pub mod scheduler;
pub mod segments;
pub mod stats;
pub mod store;
pub mod worker;

pub use engine::{CacheEngine, EngineBuilder};
pub use error::{EngineError, Result};
pub use worker::JsonString;

/// the current app version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
