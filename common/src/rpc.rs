use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::task::{Generation, Phase, TaskDescriptor, TaskRef};

pub type WorkerId = String;

/* --------- AssignTask --------- */

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssignTaskRequest {
    pub worker_id: WorkerId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AssignTaskResponse {
    /// No queda trabajo: el worker debe salir.
    Done,
    /// Nada Idle por ahora pero la fase sigue en curso.
    Retry,
    Task(TaskDescriptor),
}

/* --------- ReportCompletion --------- */

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportCompletionRequest {
    pub worker_id: WorkerId,
    pub task: TaskRef,
    pub generation: Generation,
    /// Archivos publicados por la tarea.
    pub outputs: Vec<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportCompletionResponse {
    pub ok: bool,
    /// Informativo: false si el reporte era viejo o duplicado.
    pub accepted: bool,
}

/* --------- Done / status --------- */

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DoneResponse {
    pub done: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseProgress {
    pub idle: u32,
    pub in_progress: u32,
    pub completed: u32,
}

impl PhaseProgress {
    pub fn total(&self) -> u32 {
        self.idle + self.in_progress + self.completed
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobSnapshot {
    pub phase: Phase,
    pub n_map: u32,
    pub n_reduce: u32,
    pub map: PhaseProgress,
    pub reduce: PhaseProgress,

    /// -------- Métricas del job --------
    pub reclaimed: u64,
    pub stale_reports: u64,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct WorkerMetrics {
    pub worker_id: WorkerId,
    pub last_seen_secs_ago: u64,
    pub tasks_assigned: u64,
    pub tasks_completed: u64,
    pub stale_reports: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::TaskKind;
    use serde_json::json;

    #[test]
    fn assign_response_usa_tag_status() {
        assert_eq!(
            serde_json::to_value(AssignTaskResponse::Retry).unwrap(),
            json!({"status": "retry"})
        );

        let desc = TaskDescriptor {
            task: TaskRef::map(3),
            inputs: vec![PathBuf::from("pg-1.txt")],
            bucket_count: 2,
            generation: 1,
            work_dir: PathBuf::from("/tmp/mr"),
        };
        let v = serde_json::to_value(AssignTaskResponse::Task(desc.clone())).unwrap();
        assert_eq!(v["status"], json!("task"));
        assert_eq!(v["task"]["kind"], json!("MAP"));
        assert_eq!(v["bucket_count"], json!(2));

        let back: AssignTaskResponse = serde_json::from_value(v).unwrap();
        assert_eq!(back, AssignTaskResponse::Task(desc));
    }

    #[test]
    fn progress_total_suma_los_tres_estados() {
        let p = PhaseProgress {
            idle: 1,
            in_progress: 2,
            completed: 3,
        };
        assert_eq!(p.total(), 6);
        assert_eq!(TaskRef::reduce(1).kind, TaskKind::Reduce);
    }
}
