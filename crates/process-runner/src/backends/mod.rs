//! Runner implementations that execute real processes
//!
//! Test code does not need anything here: bind a [`Stub`](crate::Stub)
//! instead. Other execution contexts can be added by implementing
//! [`Runner`](crate::Runner).

pub mod local;
pub use local::LocalRunner;
