use common::Endpoint;
use std::{path::PathBuf, time::Duration};

pub const DEFAULT_N_REDUCE: u32 = 10;
/// Mismo timeout para map y reduce.
pub const DEFAULT_TASK_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(1);
pub const DEFAULT_DONE_POLL: Duration = Duration::from_secs(1);
/// Cuánto seguimos sirviendo después de Done para que los workers lo vean.
pub const DEFAULT_LINGER: Duration = Duration::from_secs(2);

#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    pub n_reduce: u32,
    pub work_dir: PathBuf,
    pub endpoint: Endpoint,
    pub task_timeout: Duration,
    pub sweep_interval: Duration,
    pub done_poll: Duration,
    pub linger: Duration,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            n_reduce: DEFAULT_N_REDUCE,
            work_dir: PathBuf::from("."),
            endpoint: Endpoint::default_for_user(),
            task_timeout: DEFAULT_TASK_TIMEOUT,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
            done_poll: DEFAULT_DONE_POLL,
            linger: DEFAULT_LINGER,
        }
    }
}
