/// What a component did with a key.
///
/// `Event` carries something for the owning view to act on, such as the text
/// submitted from the new-task input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyResult<T> {
  /// Consumed, nothing further to do
  Handled,
  /// Consumed, and the view should act on this
  Event(T),
  /// Not consumed; the view tries its next handler
  NotHandled,
}
