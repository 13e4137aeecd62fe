pub mod execute;
pub mod worker;

pub use worker::{Worker, WorkerConfig, WorkerExit};
