//! Todo resource types, shared by the HTTP client and the cache.

use serde::{Deserialize, Deserializer, Serialize};

/// A todo item as served by the remote resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Todo {
  #[serde(deserialize_with = "deserialize_id")]
  pub id: String,
  #[serde(default)]
  pub todo: String,
  #[serde(default)]
  pub completed: bool,
}

impl Todo {
  /// Merge the present fields of `fields` into this todo.
  ///
  /// Returns a patch holding the previous values of exactly the fields that
  /// were overwritten, so that merging it back restores the entry.
  pub fn merge(&mut self, fields: &TodoPatch) -> TodoPatch {
    let mut previous = TodoPatch::default();
    if let Some(text) = &fields.todo {
      previous.todo = Some(std::mem::replace(&mut self.todo, text.clone()));
    }
    if let Some(completed) = fields.completed {
      previous.completed = Some(std::mem::replace(&mut self.completed, completed));
    }
    previous
  }
}

/// Body of a create request (a todo without an id)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewTodo {
  pub todo: String,
  pub completed: bool,
}

impl NewTodo {
  pub fn new(todo: impl Into<String>) -> Self {
    Self {
      todo: todo.into(),
      completed: false,
    }
  }

  /// Build the provisional entry shown until the server assigns a real id
  pub fn provisional(&self, id: String) -> Todo {
    Todo {
      id,
      todo: self.todo.clone(),
      completed: self.completed,
    }
  }
}

/// Partial update of a todo. Only the fields that are set are sent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TodoPatch {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub todo: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub completed: Option<bool>,
}

impl TodoPatch {
  pub fn text(todo: impl Into<String>) -> Self {
    Self {
      todo: Some(todo.into()),
      ..Self::default()
    }
  }

  pub fn completed(completed: bool) -> Self {
    Self {
      completed: Some(completed),
      ..Self::default()
    }
  }

  pub fn is_empty(&self) -> bool {
    self.todo.is_none() && self.completed.is_none()
  }
}

/// Ids are opaque strings, but some backends hand out numbers.
fn deserialize_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
  D: Deserializer<'de>,
{
  #[derive(Deserialize)]
  #[serde(untagged)]
  enum RawId {
    Text(String),
    Number(u64),
  }

  Ok(match RawId::deserialize(deserializer)? {
    RawId::Text(s) => s,
    RawId::Number(n) => n.to_string(),
  })
}
