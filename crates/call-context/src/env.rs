//! Context-scoped environment store
//!
//! Variables set with [`Context::with_env`] shadow the inherited process
//! environment. Nothing here mutates the process environment.

use std::collections::{BTreeMap, HashMap};

use crate::Context;

/// Look up `name`, preferring the context store over the process environment
pub fn lookup(ctx: &Context, name: &str) -> Option<String> {
    ctx.env_overrides()
        .get(name)
        .cloned()
        .or_else(|| std::env::var(name).ok())
}

/// Like [`lookup`], returning an empty string for unset variables
pub fn get(ctx: &Context, name: &str) -> String {
    lookup(ctx, name).unwrap_or_default()
}

/// Only the variables set on the context
pub fn all(ctx: &Context) -> BTreeMap<String, String> {
    ctx.env_overrides().clone()
}

/// The inherited process environment merged with the context store
///
/// Context entries take precedence on key collision. Inherited variables that
/// are not valid unicode are skipped.
pub fn combined(ctx: &Context) -> HashMap<String, String> {
    let mut env: HashMap<String, String> = std::env::vars_os()
        .filter_map(|(key, value)| Some((key.into_string().ok()?, value.into_string().ok()?)))
        .collect();
    env.extend(
        ctx.env_overrides()
            .iter()
            .map(|(key, value)| (key.clone(), value.clone())),
    );
    env
}
