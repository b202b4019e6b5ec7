//! Copy engine
//!
//! Chooses a transfer strategy per backend pair and, for recursive
//! downloads, walks the source listing page by page while a bounded pool
//! of workers moves the objects of each page.

mod dispatcher;
mod executor;
mod paginator;
mod planner;

pub use dispatcher::*;
pub use executor::*;
pub use paginator::*;
pub use planner::*;
