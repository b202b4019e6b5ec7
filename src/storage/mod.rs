//! Storage backends
//!
//! Provides the object-store capability trait, the local filesystem
//! adapter, an in-memory object store and the [`Storage`] facade that
//! routes path handles to them. The AWS SDK adapter is compiled with the
//! `native_s3` feature.

mod backend;
mod facade;
mod local;
mod memory;
#[cfg(feature = "native_s3")]
mod native_s3;

pub use backend::*;
pub use facade::*;
pub use local::*;
pub use memory::*;
#[cfg(feature = "native_s3")]
pub use native_s3::*;
