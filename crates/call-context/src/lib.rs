//! Immutable call context
//!
//! A [`Context`] is passed explicitly to every operation that may reach the
//! outside world. Deriving a child context never mutates the parent, which
//! keeps parallel tests with independent state isolated without any global.
//!
//! A context carries three things:
//! - environment overrides, merged over the inherited process environment
//!   (see [`env`]);
//! - typed values keyed by their Rust type, used by other crates to attach
//!   collaborators such as a process runner;
//! - cancellation signals and an optional deadline.

#![warn(missing_docs)]

pub mod cancel;
pub mod context;
pub mod env;

pub use cancel::{CancelHandle, Cancelled};
pub use context::Context;
