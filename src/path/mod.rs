//! Uniform path handles
//!
//! A [`PathHandle`] is an immutable path string tagged with the backend it
//! belongs to. Local paths and object-store URLs (`s3://bucket/key`) share
//! the same value type; all structural operations return new handles.

mod handle;
mod shape;

pub use handle::*;
pub use shape::*;
