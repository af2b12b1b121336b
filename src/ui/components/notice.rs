use std::time::{Duration, Instant};

/// A status-line message that disappears after a while
#[derive(Debug, Clone)]
pub struct Notice {
  message: String,
  expires_at: Instant,
}

impl Notice {
  pub fn new(message: impl Into<String>, ttl: Duration) -> Self {
    Self {
      message: message.into(),
      expires_at: Instant::now() + ttl,
    }
  }

  pub fn message(&self) -> &str {
    &self.message
  }

  pub fn is_expired(&self) -> bool {
    Instant::now() >= self.expires_at
  }
}
