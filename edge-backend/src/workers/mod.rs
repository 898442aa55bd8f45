pub mod task_completion;

pub use task_completion::{CycleReport, TaskCompletionWorker};
