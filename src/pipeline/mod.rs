pub mod import;
pub mod processor;
pub mod scheduler;

pub use processor::{DocumentProcessor, SimulatedProcessor};
pub use scheduler::{ManualScheduler, Task, TaskHandle, TaskScheduler, TokioScheduler};
