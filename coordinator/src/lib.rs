pub mod config;
pub mod failover;
pub mod handlers;
pub mod job;
pub mod registry;
pub mod server;
pub mod state;

pub use config::CoordinatorConfig;
pub use server::{run, RunningCoordinator};
