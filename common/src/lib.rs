pub mod app;
pub mod apps;
pub mod client;
pub mod endpoint;
pub mod partition;
pub mod rpc;
pub mod sequential;
pub mod store;
pub mod task;

pub use app::{KeyValue, MapFn, MapReduceApp, ReduceFn};
pub use client::CoordinatorClient;
pub use endpoint::Endpoint;
pub use rpc::{
    AssignTaskRequest, AssignTaskResponse, DoneResponse, JobSnapshot, PhaseProgress,
    ReportCompletionRequest, ReportCompletionResponse, WorkerId, WorkerMetrics,
};
pub use task::{Generation, Phase, TaskDescriptor, TaskId, TaskKind, TaskRef, TaskStatus};
