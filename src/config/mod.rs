//! Configuration module for Pathman
//!
//! Provides CLI arguments, object-store connection settings and copy
//! options.

mod settings;

pub use settings::*;
