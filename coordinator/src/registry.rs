// coordinator/src/registry.rs

use common::{Generation, PhaseProgress, TaskId, TaskKind, TaskRef, TaskStatus};
use std::{
    path::PathBuf,
    time::{Duration, Instant},
};

#[derive(Debug, Clone)]
pub struct Task {
    pub id: TaskId,
    pub kind: TaskKind,
    pub inputs: Vec<PathBuf>,
    /// Sólo tiene sentido una vez Completed.
    pub output: Vec<PathBuf>,
    pub status: TaskStatus,
    pub generation: Generation,
    pub assigned_at: Option<Instant>,
}

impl Task {
    fn new(kind: TaskKind, id: TaskId, inputs: Vec<PathBuf>) -> Self {
        Self {
            id,
            kind,
            inputs,
            output: Vec::new(),
            status: TaskStatus::Idle,
            generation: 0,
            assigned_at: None,
        }
    }

    pub fn task_ref(&self) -> TaskRef {
        TaskRef {
            kind: self.kind,
            id: self.id,
        }
    }
}

/// Resultado de buscar trabajo en una fase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextTask {
    Available(TaskId),
    /// Nada Idle pero queda algo InProgress: que el worker reintente.
    Pending,
    /// Todas Completed: se puede avanzar de fase.
    PhaseComplete,
}

/// Tabla de todas las tareas map y reduce del job. Se crea entera al
/// arrancar y nunca se agregan ni quitan tareas.
///
/// No tiene lock propio: vive dentro del estado del coordinator, que la
/// protege con un único Mutex.
#[derive(Debug)]
pub struct TaskRegistry {
    map_tasks: Vec<Task>,
    reduce_tasks: Vec<Task>,
}

impl TaskRegistry {
    /// `map_inputs[i]` es la entrada del map `i`; `reduce_inputs[r]` son los
    /// intermedios del reduce `r`.
    pub fn new(map_inputs: Vec<PathBuf>, reduce_inputs: Vec<Vec<PathBuf>>) -> Self {
        let map_tasks = map_inputs
            .into_iter()
            .enumerate()
            .map(|(i, input)| Task::new(TaskKind::Map, i as TaskId, vec![input]))
            .collect();
        let reduce_tasks = reduce_inputs
            .into_iter()
            .enumerate()
            .map(|(r, inputs)| Task::new(TaskKind::Reduce, r as TaskId, inputs))
            .collect();

        Self {
            map_tasks,
            reduce_tasks,
        }
    }

    fn tasks(&self, kind: TaskKind) -> &[Task] {
        match kind {
            TaskKind::Map => &self.map_tasks,
            TaskKind::Reduce => &self.reduce_tasks,
        }
    }

    fn tasks_mut(&mut self, kind: TaskKind) -> &mut [Task] {
        match kind {
            TaskKind::Map => &mut self.map_tasks,
            TaskKind::Reduce => &mut self.reduce_tasks,
        }
    }

    pub fn len(&self, kind: TaskKind) -> usize {
        self.tasks(kind).len()
    }

    pub fn get(&self, task: TaskRef) -> Option<&Task> {
        self.tasks(task.kind).get(task.id as usize)
    }

    /// La tarea Idle de menor id, o por qué no hay ninguna.
    pub fn next_idle(&self, kind: TaskKind) -> NextTask {
        let tasks = self.tasks(kind);
        if let Some(t) = tasks.iter().find(|t| t.status == TaskStatus::Idle) {
            return NextTask::Available(t.id);
        }
        if tasks.iter().any(|t| t.status == TaskStatus::InProgress) {
            NextTask::Pending
        } else {
            NextTask::PhaseComplete
        }
    }

    /// Idle -> InProgress. Devuelve la nueva generación, o None si la tarea no
    /// existe o no estaba Idle.
    pub fn begin_assignment(&mut self, task: TaskRef, now: Instant) -> Option<Generation> {
        let t = self.tasks_mut(task.kind).get_mut(task.id as usize)?;
        if t.status != TaskStatus::Idle {
            return None;
        }
        t.status = TaskStatus::InProgress;
        t.generation += 1;
        t.assigned_at = Some(now);
        Some(t.generation)
    }

    /// InProgress -> Completed si la generación coincide. Cualquier otro caso
    /// (ya completada, reclamada, reporte viejo o duplicado) no cambia nada.
    pub fn complete_assignment(
        &mut self,
        task: TaskRef,
        generation: Generation,
        output: Vec<PathBuf>,
    ) -> bool {
        let Some(t) = self.tasks_mut(task.kind).get_mut(task.id as usize) else {
            return false;
        };
        if t.status != TaskStatus::InProgress || t.generation != generation {
            return false;
        }
        t.status = TaskStatus::Completed;
        t.output = output;
        t.assigned_at = None;
        true
    }

    /// Devuelve a Idle toda tarea InProgress que lleve `timeout` o más en vuelo.
    /// La generación no cambia acá, sube en el próximo `begin_assignment`.
    pub fn reclaim_expired(&mut self, now: Instant, timeout: Duration) -> Vec<TaskRef> {
        let mut reclaimed = Vec::new();
        for t in self.map_tasks.iter_mut().chain(self.reduce_tasks.iter_mut()) {
            if t.status != TaskStatus::InProgress {
                continue;
            }
            let expired = match t.assigned_at {
                Some(at) => now.saturating_duration_since(at) >= timeout,
                None => true,
            };
            if expired {
                t.status = TaskStatus::Idle;
                t.assigned_at = None;
                reclaimed.push(t.task_ref());
            }
        }
        reclaimed
    }

    pub fn phase_complete(&self, kind: TaskKind) -> bool {
        self.tasks(kind)
            .iter()
            .all(|t| t.status == TaskStatus::Completed)
    }

    pub fn progress(&self, kind: TaskKind) -> PhaseProgress {
        let mut p = PhaseProgress::default();
        for t in self.tasks(kind) {
            match t.status {
                TaskStatus::Idle => p.idle += 1,
                TaskStatus::InProgress => p.in_progress += 1,
                TaskStatus::Completed => p.completed += 1,
            }
        }
        p
    }
}
