// coordinator/src/state.rs

use common::{
    AssignTaskResponse, JobSnapshot, ReportCompletionRequest, TaskRef, WorkerId, WorkerMetrics,
};
use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard},
    time::{Instant, SystemTime},
};
use tracing::info;

use crate::job::Job;

/// Estado compartido por los handlers y el barrido de fallos.
/// Un único Mutex: asignar y pasar a InProgress tiene que ser atómico.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<Mutex<CoordinatorState>>,
}

impl AppState {
    pub fn new(job: Job) -> Self {
        Self {
            inner: Arc::new(Mutex::new(CoordinatorState {
                job,
                workers: HashMap::new(),
            })),
        }
    }

    /// Lock del estado; falla sólo si otro hilo entró en pánico con el lock.
    pub fn lock(&self) -> Result<MutexGuard<'_, CoordinatorState>, &'static str> {
        self.inner.lock().map_err(|_| "lock del coordinator envenenado")
    }
}

#[derive(Debug)]
pub struct CoordinatorState {
    pub job: Job,
    pub workers: HashMap<WorkerId, WorkerMeta>,
}

#[derive(Debug, Clone)]
pub struct WorkerMeta {
    pub last_seen: SystemTime,

    // Métricas
    pub tasks_assigned: u64,
    pub tasks_completed: u64,
    pub stale_reports: u64,
}

impl WorkerMeta {
    fn new() -> Self {
        Self {
            last_seen: SystemTime::now(),
            tasks_assigned: 0,
            tasks_completed: 0,
            stale_reports: 0,
        }
    }
}

impl CoordinatorState {
    fn touch(&mut self, worker_id: &str) -> &mut WorkerMeta {
        let meta = self
            .workers
            .entry(worker_id.to_string())
            .or_insert_with(WorkerMeta::new);
        meta.last_seen = SystemTime::now();
        meta
    }

    pub fn assign_task(&mut self, worker_id: &str, now: Instant) -> AssignTaskResponse {
        let resp = self.job.assign(now);

        if let AssignTaskResponse::Task(ref d) = resp {
            info!(
                "asignando tarea {} (gen={}, entradas={}) al worker {}",
                d.task,
                d.generation,
                d.inputs.len(),
                worker_id
            );
            self.touch(worker_id).tasks_assigned += 1;
        } else {
            self.touch(worker_id);
        }

        resp
    }

    pub fn report_completion(&mut self, req: ReportCompletionRequest) -> bool {
        let task: TaskRef = req.task;
        let accepted = self.job.report(task, req.generation, req.outputs);

        let meta = self.touch(&req.worker_id);
        if accepted {
            meta.tasks_completed += 1;
        } else {
            meta.stale_reports += 1;
        }
        accepted
    }

    pub fn snapshot(&self) -> JobSnapshot {
        self.job.snapshot()
    }

    pub fn worker_metrics(&self) -> Vec<WorkerMetrics> {
        let now = SystemTime::now();
        let mut out: Vec<WorkerMetrics> = self
            .workers
            .iter()
            .map(|(id, meta)| WorkerMetrics {
                worker_id: id.clone(),
                last_seen_secs_ago: now
                    .duration_since(meta.last_seen)
                    .unwrap_or_default()
                    .as_secs(),
                tasks_assigned: meta.tasks_assigned,
                tasks_completed: meta.tasks_completed,
                stale_reports: meta.stale_reports,
            })
            .collect();
        out.sort_by(|a, b| a.worker_id.cmp(&b.worker_id));
        out
    }
}
