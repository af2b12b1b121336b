//! Invertible edits of the todo collection.

use crate::todo::{Todo, TodoPatch};

/// A single edit of the cached collection.
///
/// Applying a patch yields its exact inverse, so every optimistic change can
/// be undone without keeping a copy of the whole collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Patch {
  /// Insert `todo` at `index` (clamped to the end of the collection)
  Insert { index: usize, todo: Todo },
  /// Remove the entry with this id
  Remove { id: String },
  /// Merge fields into the entry with this id
  Merge { id: String, fields: TodoPatch },
  /// Swap the entry with this id for `todo`
  Replace { id: String, todo: Todo },
}

impl Patch {
  /// Append `todo` to the end of the collection, whatever its length
  pub fn append(todo: Todo) -> Self {
    Patch::Insert {
      index: usize::MAX,
      todo,
    }
  }

  /// The id of the entry this patch targets before it is applied
  pub fn target(&self) -> &str {
    match self {
      Patch::Insert { todo, .. } => &todo.id,
      Patch::Remove { id } | Patch::Merge { id, .. } | Patch::Replace { id, .. } => id,
    }
  }

  /// Apply the patch and return its inverse.
  ///
  /// Returns `None` and leaves `todos` untouched when the target entry is not
  /// present.
  pub fn apply(&self, todos: &mut Vec<Todo>) -> Option<Patch> {
    match self {
      Patch::Insert { index, todo } => {
        let index = (*index).min(todos.len());
        todos.insert(index, todo.clone());
        Some(Patch::Remove {
          id: todo.id.clone(),
        })
      }
      Patch::Remove { id } => {
        let index = position(todos, id)?;
        let todo = todos.remove(index);
        Some(Patch::Insert { index, todo })
      }
      Patch::Merge { id, fields } => {
        let index = position(todos, id)?;
        let previous = todos[index].merge(fields);
        Some(Patch::Merge {
          id: id.clone(),
          fields: previous,
        })
      }
      Patch::Replace { id, todo } => {
        let index = position(todos, id)?;
        let previous = std::mem::replace(&mut todos[index], todo.clone());
        Some(Patch::Replace {
          id: todo.id.clone(),
          todo: previous,
        })
      }
    }
  }
}

fn position(todos: &[Todo], id: &str) -> Option<usize> {
  todos.iter().position(|t| t.id == id)
}
