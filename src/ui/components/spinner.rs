const FRAMES: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

/// Loading spinner, advanced once per tick
#[derive(Debug, Clone, Default)]
pub struct Spinner {
  frame: usize,
}

impl Spinner {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn tick(&mut self) {
    self.frame = (self.frame + 1) % FRAMES.len();
  }

  pub fn frame(&self) -> &'static str {
    FRAMES[self.frame]
  }
}
