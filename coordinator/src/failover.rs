use std::time::{Duration, Instant};

use tokio::time::sleep;
use tracing::{debug, warn};

use crate::state::AppState;

/// Loop del detector de fallos: cada `interval` devuelve a Idle las tareas
/// que llevan más del timeout en vuelo. AssignTask también reclama, esto sólo
/// hace que el estado visible (status, Done) no dependa de que alguien pida.
pub async fn run_failover_loop(state: AppState, interval: Duration) {
    loop {
        sleep(interval).await;

        match sweep_once(&state, Instant::now()) {
            Ok(true) => {
                debug!("job terminado, detengo el barrido");
                return;
            }
            Ok(false) => {}
            Err(e) => warn!("error en failover sweep: {:?}", e),
        }
    }
}

/// Una pasada. Devuelve si el job ya terminó.
pub fn sweep_once(state: &AppState, now: Instant) -> Result<bool, String> {
    let mut st = state.lock()?;
    if st.job.is_done() {
        return Ok(true);
    }
    st.job.reclaim_expired(now);
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::Job;
    use common::{AssignTaskResponse, TaskStatus};
    use std::path::PathBuf;

    #[test]
    fn sweep_devuelve_a_idle_lo_vencido() {
        let timeout = Duration::from_secs(10);
        let state = AppState::new(Job::new(vec![PathBuf::from("a")], 1, "/tmp", timeout));
        let t0 = Instant::now();

        let AssignTaskResponse::Task(d) = state.lock().unwrap().assign_task("w", t0) else {
            panic!("esperaba tarea");
        };

        assert_eq!(sweep_once(&state, t0 + timeout / 2), Ok(false));
        assert_eq!(
            state.lock().unwrap().job.registry().get(d.task).unwrap().status,
            TaskStatus::InProgress
        );

        assert_eq!(sweep_once(&state, t0 + timeout), Ok(false));
        let st = state.lock().unwrap();
        assert_eq!(
            st.job.registry().get(d.task).unwrap().status,
            TaskStatus::Idle
        );
        assert_eq!(st.snapshot().reclaimed, 1);
    }
}
