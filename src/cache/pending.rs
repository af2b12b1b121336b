//! Ledger of optimistic mutations that are waiting on the server.

use super::patch::Patch;
use crate::todo::Todo;

/// What a pending mutation does
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationKind {
  Add,
  Update,
  Remove,
}

impl MutationKind {
  pub fn verb(self) -> &'static str {
    match self {
      MutationKind::Add => "add",
      MutationKind::Update => "update",
      MutationKind::Remove => "delete",
    }
  }
}

/// An optimistic change that has been applied locally but not yet confirmed
#[derive(Debug, Clone)]
pub struct PendingMutation {
  pub seq: u64,
  pub kind: MutationKind,
  /// The change as issued
  pub forward: Patch,
  /// What restores the collection if the server rejects the change.
  /// `None` when the forward patch found nothing to change.
  pub undo: Option<Patch>,
}

impl PendingMutation {
  /// Id of the entry the mutation targets
  pub fn target(&self) -> &str {
    self.forward.target()
  }
}

/// Pending mutations in the order they were issued.
///
/// Mutations against the same entry are not sequenced against each other;
/// `in_flight_for` is the hook for doing so.
#[derive(Debug, Default)]
pub struct PendingLedger {
  next_seq: u64,
  entries: Vec<PendingMutation>,
}

impl PendingLedger {
  pub fn new() -> Self {
    Self::default()
  }

  /// Record an applied mutation and return its sequence number
  pub fn begin(&mut self, kind: MutationKind, forward: Patch, undo: Option<Patch>) -> u64 {
    let seq = self.next_seq;
    self.next_seq += 1;
    self.entries.push(PendingMutation {
      seq,
      kind,
      forward,
      undo,
    });
    seq
  }

  /// Take a mutation out of the ledger once the server has answered
  pub fn resolve(&mut self, seq: u64) -> Option<PendingMutation> {
    let index = self.entries.iter().position(|m| m.seq == seq)?;
    Some(self.entries.remove(index))
  }

  /// Re-apply every pending mutation, oldest first, on top of a fresh baseline.
  ///
  /// The undo of each mutation is recomputed against the new baseline.
  pub fn replay(&mut self, todos: &mut Vec<Todo>) {
    for mutation in &mut self.entries {
      mutation.undo = mutation.forward.apply(todos);
    }
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  /// Number of pending mutations targeting the entry `id`
  pub fn in_flight_for(&self, id: &str) -> usize {
    self.entries.iter().filter(|m| m.target() == id).count()
  }
}
