mod tank;
mod task;

pub use tank::Tank;
pub use task::{DaySet, Frequency, Task, TaskRecord};
