//! Cache layer that applies todo mutations optimistically.
//!
//! Every mutation edits the cached collection before its request is sent.
//! The request runs on a spawned task and reports back over a channel; the
//! outcome is applied on the next `poll()`:
//! - success confirms the change (a created todo replaces its provisional entry)
//! - failure applies the recorded inverse patch and leaves a notice

use chrono::Utc;
use color_eyre::Result;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::patch::Patch;
use super::pending::{MutationKind, PendingLedger};
use crate::query::{Query, QueryState};
use crate::todo::{NewTodo, Todo, TodoApi, TodoPatch};

/// Prefix of ids handed to entries the server has not confirmed yet
pub const PROVISIONAL_PREFIX: &str = "temp-";

/// Whether `id` belongs to a provisional entry
pub fn is_provisional(id: &str) -> bool {
  id.starts_with(PROVISIONAL_PREFIX)
}

/// What the server answered for a mutation
#[derive(Debug)]
enum Confirmation {
  Created(Todo),
  Updated,
  Removed,
}

#[derive(Debug)]
struct Outcome {
  seq: u64,
  result: Result<Confirmation, String>,
}

/// Generates time-based provisional ids, unique within the session
#[derive(Debug, Default)]
struct ProvisionalIds {
  last: i64,
}

impl ProvisionalIds {
  fn next(&mut self) -> String {
    let stamp = Utc::now().timestamp_millis().max(self.last + 1);
    self.last = stamp;
    format!("{}{}", PROVISIONAL_PREFIX, stamp)
  }
}

/// The single cached todo collection and its pending mutations.
pub struct TodoCache {
  api: Arc<dyn TodoApi>,
  query: Query<Vec<Todo>>,
  pending: PendingLedger,
  outcome_tx: mpsc::UnboundedSender<Outcome>,
  outcome_rx: mpsc::UnboundedReceiver<Outcome>,
  provisional_ids: ProvisionalIds,
  notice: Option<String>,
}

impl TodoCache {
  pub fn new(api: Arc<dyn TodoApi>) -> Self {
    let api_for_query = Arc::clone(&api);
    let query = Query::new(move || {
      let api = Arc::clone(&api_for_query);
      async move { api.list().await.map_err(|e| e.to_string()) }
    });
    let (outcome_tx, outcome_rx) = mpsc::unbounded_channel();

    Self {
      api,
      query,
      pending: PendingLedger::new(),
      outcome_tx,
      outcome_rx,
      provisional_ids: ProvisionalIds::default(),
      notice: None,
    }
  }

  /// The current snapshot: confirmed state plus every pending mutation
  pub fn todos(&self) -> &[Todo] {
    self.query.data().map(|v| v.as_slice()).unwrap_or(&[])
  }

  /// State of the collection fetch
  pub fn state(&self) -> &QueryState<Vec<Todo>> {
    self.query.state()
  }

  pub fn query(&self) -> &Query<Vec<Todo>> {
    &self.query
  }

  /// Number of mutations still waiting on the server
  pub fn pending_count(&self) -> usize {
    self.pending.len()
  }

  /// Whether the entry `id` has a mutation waiting on the server
  pub fn is_pending(&self, id: &str) -> bool {
    self.pending.in_flight_for(id) > 0
  }

  /// The latest rollback notice, if one was produced since the last call
  pub fn take_notice(&mut self) -> Option<String> {
    self.notice.take()
  }

  /// Load the collection from the server. No-op while a fetch is running.
  pub fn fetch(&mut self) {
    self.query.fetch();
  }

  /// Reload the collection, discarding any fetch still in flight
  pub fn refetch(&mut self) {
    self.query.refetch();
  }

  /// Append a provisional todo and send the create request.
  ///
  /// Returns the provisional id.
  pub fn add(&mut self, todo: NewTodo) -> String {
    let id = self.provisional_ids.next();
    let seq = self.begin(MutationKind::Add, Patch::append(todo.provisional(id.clone())));
    debug!(seq, %id, "optimistic add");

    let api = Arc::clone(&self.api);
    self.dispatch(seq, async move { api.create(todo).await.map(Confirmation::Created) });
    id
  }

  /// Merge `fields` into the entry `id` and send only those fields.
  ///
  /// Provisional entries are skipped: the server does not know their id yet.
  pub fn update(&mut self, id: &str, fields: TodoPatch) {
    if is_provisional(id) {
      debug!(%id, "ignoring update of unconfirmed todo");
      return;
    }
    let seq = self.begin(
      MutationKind::Update,
      Patch::Merge {
        id: id.to_string(),
        fields: fields.clone(),
      },
    );
    debug!(seq, %id, ?fields, "optimistic update");

    let api = Arc::clone(&self.api);
    let id = id.to_string();
    self.dispatch(seq, async move {
      api.update(id, fields).await.map(|_| Confirmation::Updated)
    });
  }

  /// Remove the entry `id` and send the delete request.
  ///
  /// Provisional entries are skipped, like in `update`.
  pub fn remove(&mut self, id: &str) {
    if is_provisional(id) {
      debug!(%id, "ignoring delete of unconfirmed todo");
      return;
    }
    let seq = self.begin(
      MutationKind::Remove,
      Patch::Remove { id: id.to_string() },
    );
    debug!(seq, %id, "optimistic remove");

    let api = Arc::clone(&self.api);
    let id = id.to_string();
    self.dispatch(seq, async move {
      api.delete(id).await.map(|_| Confirmation::Removed)
    });
  }

  /// Apply finished fetches and mutation outcomes without blocking.
  ///
  /// Returns `true` if the snapshot or fetch state changed.
  pub fn poll(&mut self) -> bool {
    let mut changed = false;

    if self.query.poll() {
      self.on_fetch_complete();
      changed = true;
    }

    while let Ok(outcome) = self.outcome_rx.try_recv() {
      self.apply_outcome(outcome);
      changed = true;
    }

    changed
  }

  /// Wait until the running fetch and all pending mutations have resolved.
  pub async fn settle(&mut self) {
    loop {
      if self.query.is_fetching() {
        if self.query.settle().await {
          self.on_fetch_complete();
        }
      } else if !self.pending.is_empty() {
        match self.outcome_rx.recv().await {
          Some(outcome) => self.apply_outcome(outcome),
          None => break,
        }
      } else {
        break;
      }
    }
  }

  /// Apply a mutation locally and record it as pending
  fn begin(&mut self, kind: MutationKind, forward: Patch) -> u64 {
    let undo = self
      .query
      .update_data(|todos| forward.apply(todos))
      .flatten();
    self.pending.begin(kind, forward, undo)
  }

  /// Run the request for mutation `seq` and report its outcome
  fn dispatch<F>(&self, seq: u64, request: F)
  where
    F: Future<Output = Result<Confirmation>> + Send + 'static,
  {
    let tx = self.outcome_tx.clone();
    tokio::spawn(async move {
      let result = request.await.map_err(|e| e.to_string());
      // Ignore send errors - the cache may have been dropped
      let _ = tx.send(Outcome { seq, result });
    });
  }

  fn on_fetch_complete(&mut self) {
    match self.query.state() {
      QueryState::Success(todos) => {
        info!(count = todos.len(), pending = self.pending.len(), "todos loaded");
      }
      QueryState::Error(e) => {
        warn!(error = %e, "failed to load todos");
        return;
      }
      _ => return,
    }

    // Pending changes stay visible on top of the new baseline
    let pending = &mut self.pending;
    self.query.update_data(|todos| pending.replay(todos));
  }

  fn apply_outcome(&mut self, outcome: Outcome) {
    let Some(mutation) = self.pending.resolve(outcome.seq) else {
      return;
    };

    // A fetch still in flight may have been answered before this change
    // reached the server, and the change is no longer pending to replay
    if outcome.result.is_ok() && self.query.is_fetching() {
      debug!(seq = mutation.seq, "restarting fetch that predates a confirmation");
      self.query.refetch();
    }

    match outcome.result {
      Ok(Confirmation::Created(todo)) => {
        debug!(seq = mutation.seq, provisional = mutation.target(), id = %todo.id, "add confirmed");
        let provisional = mutation.target().to_string();
        self.query.update_data(|todos| {
          if todos.iter().any(|t| t.id == todo.id) {
            // Already delivered by a refetch
            Patch::Remove { id: provisional }.apply(todos)
          } else {
            Patch::Replace {
              id: provisional,
              todo,
            }
            .apply(todos)
          }
        });
      }
      Ok(Confirmation::Updated) | Ok(Confirmation::Removed) => {
        debug!(seq = mutation.seq, id = mutation.target(), "{} confirmed", mutation.kind.verb());
      }
      Err(error) => {
        warn!(
          seq = mutation.seq,
          id = mutation.target(),
          error = %error,
          "{} failed, rolling back",
          mutation.kind.verb()
        );
        if let Some(undo) = &mutation.undo {
          self.query.update_data(|todos| undo.apply(todos));
        }
        self.notice = Some(format!(
          "Could not {} todo, change reverted",
          mutation.kind.verb()
        ));
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::todo::fake::FakeApi;
  use std::sync::atomic::Ordering;
  use std::time::Duration;

  fn todo(id: &str, text: &str, completed: bool) -> Todo {
    Todo {
      id: id.to_string(),
      todo: text.to_string(),
      completed,
    }
  }

  async fn loaded(api: &Arc<FakeApi>) -> TodoCache {
    let mut cache = TodoCache::new(api.clone());
    cache.fetch();
    cache.settle().await;
    cache
  }

  #[tokio::test]
  async fn test_fetch_sets_baseline() {
    let api = FakeApi::with(vec![todo("1", "a", false)]);
    let mut cache = TodoCache::new(api.clone());

    cache.fetch();
    assert!(cache.state().is_loading());
    assert!(cache.todos().is_empty());

    cache.settle().await;
    assert!(cache.state().is_success());
    assert_eq!(cache.todos(), api.server().as_slice());
  }

  #[tokio::test]
  async fn test_fetch_failure_is_error_state() {
    let api = FakeApi::with(vec![todo("1", "a", false)]);
    api.fail_list.store(true, Ordering::SeqCst);

    let cache = loaded(&api).await;
    assert!(cache.state().is_error());
    assert!(cache.todos().is_empty());
  }

  #[tokio::test]
  async fn test_add_success_replaces_provisional() {
    let api = FakeApi::with(Vec::new());
    api.next_id.store(42, Ordering::SeqCst);
    let mut cache = loaded(&api).await;

    let provisional = cache.add(NewTodo::new("buy milk"));
    assert!(is_provisional(&provisional));
    assert_eq!(cache.todos(), &[todo(&provisional, "buy milk", false)]);
    assert!(cache.is_pending(&provisional));

    cache.settle().await;
    assert_eq!(cache.todos(), &[todo("42", "buy milk", false)]);
    assert_eq!(cache.pending_count(), 0);
    assert!(cache.take_notice().is_none());
  }

  #[tokio::test]
  async fn test_add_failure_restores_collection() {
    let api = FakeApi::with(vec![todo("1", "a", false)]);
    let mut cache = loaded(&api).await;
    let before = cache.todos().to_vec();
    api.fail_mutations();

    cache.add(NewTodo::new("doomed"));
    assert_eq!(cache.todos().len(), 2);

    cache.settle().await;
    assert_eq!(cache.todos(), before.as_slice());
    assert_eq!(
      cache.take_notice().as_deref(),
      Some("Could not add todo, change reverted")
    );
    assert!(cache.take_notice().is_none());
  }

  #[tokio::test]
  async fn test_update_failure_restores_completed() {
    let api = FakeApi::with(vec![todo("1", "a", false), todo("2", "b", false)]);
    let mut cache = loaded(&api).await;
    api.fail_mutations();

    cache.update("1", TodoPatch::completed(true));
    assert!(cache.todos()[0].completed);

    cache.settle().await;
    assert!(!cache.todos()[0].completed);
    assert_eq!(cache.todos()[0].todo, "a");
  }

  #[tokio::test]
  async fn test_update_success_keeps_optimistic_state() {
    let api = FakeApi::with(vec![todo("1", "a", false)]);
    let mut cache = loaded(&api).await;

    cache.update("1", TodoPatch::text("renamed"));
    cache.settle().await;

    assert_eq!(cache.todos(), &[todo("1", "renamed", false)]);
    assert_eq!(cache.todos(), api.server().as_slice());
  }

  #[tokio::test]
  async fn test_remove_failure_reinserts_at_original_index() {
    let api = FakeApi::with(vec![
      todo("1", "a", false),
      todo("2", "b", true),
      todo("3", "c", false),
    ]);
    let mut cache = loaded(&api).await;
    api.fail_mutations();

    cache.remove("2");
    assert_eq!(cache.todos().len(), 2);

    cache.settle().await;
    let ids: Vec<&str> = cache.todos().iter().map(|t| t.id.as_str()).collect();
    assert_eq!(ids, vec!["1", "2", "3"]);
  }

  #[tokio::test]
  async fn test_remove_failure_on_single_entry() {
    let api = FakeApi::with(vec![todo("1", "a", false)]);
    let mut cache = loaded(&api).await;
    api.fail_mutations();

    cache.remove("1");
    assert!(cache.todos().is_empty());

    cache.settle().await;
    assert_eq!(cache.todos(), &[todo("1", "a", false)]);
  }

  #[tokio::test]
  async fn test_successful_sequence_matches_fresh_fetch() {
    let api = FakeApi::with(vec![todo("1", "a", false), todo("2", "b", false)]);
    let mut cache = loaded(&api).await;

    cache.add(NewTodo::new("c"));
    cache.update("1", TodoPatch::completed(true));
    cache.remove("2");
    cache.settle().await;

    cache.add(NewTodo::new("d"));
    cache.update("1", TodoPatch::text("a!"));
    cache.settle().await;

    let fresh = loaded(&api).await;
    assert_eq!(cache.todos(), fresh.todos());
    assert_eq!(cache.todos().len(), 3);
  }

  #[tokio::test]
  async fn test_provisional_ids_are_unique() {
    let api = FakeApi::with(Vec::new());
    let mut cache = loaded(&api).await;

    let ids: Vec<String> = (0..50).map(|_| cache.add(NewTodo::new("x"))).collect();
    let mut unique = ids.clone();
    unique.sort();
    unique.dedup();
    assert_eq!(unique.len(), ids.len());

    cache.settle().await;
  }

  #[tokio::test]
  async fn test_refetch_keeps_pending_mutation_visible() {
    let api = FakeApi::with(vec![todo("1", "a", false)]);
    let mut cache = loaded(&api).await;
    api.mutation_delay_ms.store(200, Ordering::SeqCst);

    cache.update("1", TodoPatch::completed(true));
    cache.refetch();
    while cache.query().is_fetching() {
      tokio::time::sleep(Duration::from_millis(5)).await;
      cache.poll();
    }

    // The server has not applied the update yet, the cache still shows it
    assert!(!api.server()[0].completed);
    assert!(cache.todos()[0].completed);
    assert_eq!(cache.pending_count(), 1);

    cache.settle().await;
    assert_eq!(cache.todos(), api.server().as_slice());
  }

  #[tokio::test]
  async fn test_created_todo_delivered_by_refetch_is_not_duplicated() {
    let api = FakeApi::with(Vec::new());
    let mut cache = loaded(&api).await;
    api.mutation_delay_ms.store(200, Ordering::SeqCst);

    cache.add(NewTodo::new("buy milk"));
    // Let the fake server record the todo before the refetch runs
    tokio::time::sleep(Duration::from_millis(20)).await;
    cache.refetch();
    while cache.query().is_fetching() {
      tokio::time::sleep(Duration::from_millis(5)).await;
      cache.poll();
    }

    cache.settle().await;
    assert_eq!(cache.todos(), api.server().as_slice());
    assert_eq!(cache.todos().len(), 1);
  }

  #[tokio::test]
  async fn test_mutation_before_first_fetch() {
    let api = FakeApi::with(vec![todo("1", "a", false)]);
    api.list_delay_ms.store(50, Ordering::SeqCst);
    let mut cache = TodoCache::new(api.clone());

    cache.fetch();
    cache.add(NewTodo::new("early"));
    assert!(cache.todos().is_empty());

    cache.settle().await;
    assert_eq!(cache.todos(), api.server().as_slice());
    assert_eq!(cache.todos().len(), 2);
  }

  #[tokio::test]
  async fn test_mutations_on_provisional_entry_are_skipped() {
    let api = FakeApi::with(Vec::new());
    let mut cache = loaded(&api).await;

    let id = cache.add(NewTodo::new("buy milk"));
    cache.update(&id, TodoPatch::completed(true));
    cache.remove(&id);
    assert_eq!(cache.pending_count(), 1);
    assert_eq!(cache.todos().len(), 1);
    assert!(!cache.todos()[0].completed);

    cache.settle().await;
    assert_eq!(cache.todos(), api.server().as_slice());
    assert_eq!(cache.todos()[0].id, "100");
  }

  #[tokio::test]
  async fn test_only_the_failed_call_is_rolled_back() {
    let api = FakeApi::with(vec![todo("1", "a", false), todo("2", "b", false)]);
    let mut cache = loaded(&api).await;
    api.fail_next_mutations(1);

    cache.update("1", TodoPatch::completed(true));
    cache.update("2", TodoPatch::completed(true));
    cache.settle().await;

    assert!(!cache.todos()[0].completed);
    assert!(cache.todos()[1].completed);
    assert_eq!(cache.todos(), api.server().as_slice());
    assert_eq!(cache.take_notice().as_deref(), Some("Could not update todo, change reverted"));
  }

  #[tokio::test]
  async fn test_fetch_older_than_confirmation_is_restarted() {
    let api = FakeApi::with(vec![todo("1", "a", false)]);
    let mut cache = loaded(&api).await;
    api.list_delay_ms.store(100, Ordering::SeqCst);

    // The list request sees the todo, then the delete lands and is confirmed
    // while that response is still on its way
    cache.refetch();
    tokio::time::sleep(Duration::from_millis(10)).await;
    cache.remove("1");
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(cache.poll());
    assert_eq!(cache.pending_count(), 0);
    assert!(cache.query().is_fetching());

    cache.settle().await;
    assert!(cache.todos().is_empty());
    assert_eq!(cache.todos(), api.server().as_slice());
  }

  #[tokio::test]
  async fn test_poll_applies_outcomes() {
    let api = FakeApi::with(vec![todo("1", "a", false)]);
    let mut cache = loaded(&api).await;
    assert!(!cache.poll());

    cache.remove("1");
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(cache.poll());
    assert_eq!(cache.pending_count(), 0);
    assert!(cache.todos().is_empty());
  }
}
