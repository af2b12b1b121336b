//! In-memory todo resource for tests.

use super::client::TodoApi;
use super::types::{NewTodo, Todo, TodoPatch};
use color_eyre::{eyre::eyre, Result};
use futures::future::BoxFuture;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// In-memory todo resource with switchable failures and latency
#[derive(Default)]
pub struct FakeApi {
  pub server: Mutex<Vec<Todo>>,
  pub next_id: AtomicU64,
  pub fail_list: AtomicBool,
  pub fail_mutations: AtomicBool,
  /// Number of upcoming mutation calls that fail before calls succeed again
  pub fail_next: AtomicU64,
  pub list_delay_ms: AtomicU64,
  pub mutation_delay_ms: AtomicU64,
}

impl FakeApi {
  pub fn with(todos: Vec<Todo>) -> Arc<Self> {
    let api = Self {
      next_id: AtomicU64::new(100),
      ..Self::default()
    };
    *api.server.lock().unwrap() = todos;
    Arc::new(api)
  }

  pub fn server(&self) -> Vec<Todo> {
    self.server.lock().unwrap().clone()
  }

  pub fn fail_mutations(&self) {
    self.fail_mutations.store(true, Ordering::SeqCst);
  }

  /// Fail the next `count` mutation calls, in call order
  pub fn fail_next_mutations(&self, count: u64) {
    self.fail_next.store(count, Ordering::SeqCst);
  }

  async fn mutation_delay(&self) {
    let ms = self.mutation_delay_ms.load(Ordering::SeqCst);
    if ms > 0 {
      tokio::time::sleep(Duration::from_millis(ms)).await;
    }
  }

  fn check_mutation(&self) -> Result<()> {
    let scripted = self
      .fail_next
      .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
      .is_ok();
    if scripted || self.fail_mutations.load(Ordering::SeqCst) {
      Err(eyre!("500 Internal Server Error"))
    } else {
      Ok(())
    }
  }
}

impl TodoApi for FakeApi {
  fn list(&self) -> BoxFuture<'_, Result<Vec<Todo>>> {
    Box::pin(async move {
      // The response reflects the server as it was when the request arrived
      let snapshot = self.server();
      let ms = self.list_delay_ms.load(Ordering::SeqCst);
      if ms > 0 {
        tokio::time::sleep(Duration::from_millis(ms)).await;
      }
      if self.fail_list.load(Ordering::SeqCst) {
        return Err(eyre!("connection refused"));
      }
      Ok(snapshot)
    })
  }

  fn create(&self, todo: NewTodo) -> BoxFuture<'_, Result<Todo>> {
    Box::pin(async move {
      self.check_mutation()?;
      let created = Todo {
        id: self.next_id.fetch_add(1, Ordering::SeqCst).to_string(),
        todo: todo.todo,
        completed: todo.completed,
      };
      self.server.lock().unwrap().push(created.clone());
      self.mutation_delay().await;
      Ok(created)
    })
  }

  fn update(&self, id: String, fields: TodoPatch) -> BoxFuture<'_, Result<Todo>> {
    Box::pin(async move {
      self.mutation_delay().await;
      self.check_mutation()?;
      let mut server = self.server.lock().unwrap();
      let todo = server
        .iter_mut()
        .find(|t| t.id == id)
        .ok_or_else(|| eyre!("404 Not Found"))?;
      todo.merge(&fields);
      Ok(todo.clone())
    })
  }

  fn delete(&self, id: String) -> BoxFuture<'_, Result<()>> {
    Box::pin(async move {
      self.mutation_delay().await;
      self.check_mutation()?;
      let mut server = self.server.lock().unwrap();
      let index = server
        .iter()
        .position(|t| t.id == id)
        .ok_or_else(|| eyre!("404 Not Found"))?;
      server.remove(index);
      Ok(())
    })
  }
}
