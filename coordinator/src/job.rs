use chrono::{DateTime, Utc};
use common::{
    store, AssignTaskResponse, Generation, JobSnapshot, Phase, TaskDescriptor, TaskKind, TaskRef,
};
use std::{
    path::PathBuf,
    time::{Duration, Instant},
};
use tracing::{info, warn};

use crate::registry::{NextTask, TaskRegistry};

/// Estado completo de un job map/reduce: registro de tareas + fase.
///
/// Todo es síncrono y recibe `now` desde afuera; el que llama pone el lock
/// y el reloj.
#[derive(Debug)]
pub struct Job {
    n_map: u32,
    n_reduce: u32,
    work_dir: PathBuf,
    task_timeout: Duration,
    phase: Phase,
    registry: TaskRegistry,

    // métricas
    reclaimed: u64,
    stale_reports: u64,
    started_at: DateTime<Utc>,
    finished_at: Option<DateTime<Utc>>,
}

impl Job {
    pub fn new(
        inputs: Vec<PathBuf>,
        n_reduce: u32,
        work_dir: impl Into<PathBuf>,
        task_timeout: Duration,
    ) -> Self {
        let work_dir = work_dir.into();
        let n_map = inputs.len() as u32;

        // cada reduce r lee mr-<m>-r para todo m; se fija acá y no cambia más
        let reduce_inputs = (0..n_reduce)
            .map(|r| {
                (0..n_map)
                    .map(|m| store::intermediate_path(&work_dir, m, r))
                    .collect()
            })
            .collect();

        info!(
            "job creado: {} tareas map, {} tareas reduce (work_dir={})",
            n_map,
            n_reduce,
            work_dir.display()
        );

        Self {
            n_map,
            n_reduce,
            registry: TaskRegistry::new(inputs, reduce_inputs),
            work_dir,
            task_timeout,
            phase: Phase::Mapping,
            reclaimed: 0,
            stale_reports: 0,
            started_at: Utc::now(),
            finished_at: None,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_done(&self) -> bool {
        self.phase == Phase::Done
    }

    pub fn registry(&self) -> &TaskRegistry {
        &self.registry
    }

    /// Devuelve a Idle las tareas vencidas.
    pub fn reclaim_expired(&mut self, now: Instant) -> Vec<TaskRef> {
        let reclaimed = self.registry.reclaim_expired(now, self.task_timeout);
        for task in &reclaimed {
            warn!(
                "tarea {} vencida tras {:?}, vuelve a Idle",
                task, self.task_timeout
            );
        }
        self.reclaimed += reclaimed.len() as u64;
        reclaimed
    }

    /// Avanza de fase mientras la fase actual esté completa.
    fn advance_while_complete(&mut self) {
        while let Some(kind) = self.phase.task_kind() {
            if !self.registry.phase_complete(kind) {
                break;
            }
            let next = self.phase.next();
            info!("fase {:?} completa, pasando a {:?}", self.phase, next);
            self.phase = next;
            if next == Phase::Done {
                self.finished_at = Some(Utc::now());
            }
        }
    }

    /// AssignTask: Done, Retry o la próxima tarea de la fase actual.
    pub fn assign(&mut self, now: Instant) -> AssignTaskResponse {
        self.reclaim_expired(now);

        loop {
            let Some(kind) = self.phase.task_kind() else {
                return AssignTaskResponse::Done;
            };

            match self.registry.next_idle(kind) {
                NextTask::Available(id) => {
                    let task = TaskRef { kind, id };
                    return match self.registry.begin_assignment(task, now) {
                        Some(generation) => AssignTaskResponse::Task(self.descriptor(task, generation)),
                        // next_idle y begin_assignment corren bajo el mismo lock
                        None => AssignTaskResponse::Retry,
                    };
                }
                NextTask::Pending => return AssignTaskResponse::Retry,
                NextTask::PhaseComplete => self.advance_while_complete(),
            }
        }
    }

    fn descriptor(&self, task: TaskRef, generation: Generation) -> TaskDescriptor {
        let inputs = self
            .registry
            .get(task)
            .map(|t| t.inputs.clone())
            .unwrap_or_default();
        let bucket_count = match task.kind {
            TaskKind::Map => self.n_reduce,
            TaskKind::Reduce => self.n_map,
        };

        TaskDescriptor {
            task,
            inputs,
            bucket_count,
            generation,
            work_dir: self.work_dir.clone(),
        }
    }

    /// ReportCompletion. Devuelve si el reporte se aceptó; uno viejo o
    /// duplicado es un no-op.
    pub fn report(&mut self, task: TaskRef, generation: Generation, outputs: Vec<PathBuf>) -> bool {
        let accepted = self.registry.complete_assignment(task, generation, outputs);
        if accepted {
            info!("tarea {} completada (gen={})", task, generation);
            self.advance_while_complete();
        } else {
            self.stale_reports += 1;
            let current = self.registry.get(task).map(|t| (t.status, t.generation));
            warn!(
                "reporte ignorado para {} (gen={}, estado actual={:?})",
                task, generation, current
            );
        }
        accepted
    }

    pub fn snapshot(&self) -> JobSnapshot {
        JobSnapshot {
            phase: self.phase,
            n_map: self.n_map,
            n_reduce: self.n_reduce,
            map: self.registry.progress(TaskKind::Map),
            reduce: self.registry.progress(TaskKind::Reduce),
            reclaimed: self.reclaimed,
            stale_reports: self.stale_reports,
            started_at: self.started_at,
            finished_at: self.finished_at,
        }
    }
}
