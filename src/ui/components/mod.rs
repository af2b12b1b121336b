mod input;
mod key_result;
mod notice;
mod spinner;
mod task_input;

pub use input::{InputResult, TextInput};
pub use key_result::KeyResult;
pub use notice::Notice;
pub use spinner::Spinner;
pub use task_input::TaskInput;
