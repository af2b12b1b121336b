//! The remote todo resource: wire types and the HTTP client.

pub mod client;
pub mod types;

pub use client::{TodoApi, TodoClient};
pub use types::{NewTodo, Todo, TodoPatch};

#[cfg(test)]
pub mod fake;
