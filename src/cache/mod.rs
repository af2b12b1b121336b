//! Optimistic cache of the remote todo collection.
//!
//! This module keeps the single local copy of the todo list and mediates
//! every change through an apply / confirm-or-rollback protocol:
//! - Mutations are applied locally before their request is sent
//! - Each applied mutation records an inverse patch
//! - Failed requests apply the inverse; there is no retry

mod layer;
mod patch;
mod pending;

pub use layer::{is_provisional, TodoCache};
