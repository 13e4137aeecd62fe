use serde::{Deserialize, Serialize};
use std::{fmt, path::PathBuf};

/// Índice estable de una tarea dentro de su fase (0..n_map o 0..n_reduce).
pub type TaskId = u32;

/// Contador por tarea que distingue asignaciones sucesivas.
pub type Generation = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskKind {
    Map,
    Reduce,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    Idle,
    InProgress,
    Completed,
}

/// Fase global del job. Sólo avanza Mapping -> Reducing -> Done.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Phase {
    Mapping,
    Reducing,
    Done,
}

impl Phase {
    /// Tipo de tarea asignable en esta fase (Done no tiene ninguna).
    pub fn task_kind(self) -> Option<TaskKind> {
        match self {
            Phase::Mapping => Some(TaskKind::Map),
            Phase::Reducing => Some(TaskKind::Reduce),
            Phase::Done => None,
        }
    }

    pub fn next(self) -> Phase {
        match self {
            Phase::Mapping => Phase::Reducing,
            Phase::Reducing | Phase::Done => Phase::Done,
        }
    }
}

/// Identidad de una tarea a través del RPC: los ids de map y reduce se solapan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaskRef {
    pub kind: TaskKind,
    pub id: TaskId,
}

impl TaskRef {
    pub fn map(id: TaskId) -> Self {
        Self {
            kind: TaskKind::Map,
            id,
        }
    }

    pub fn reduce(id: TaskId) -> Self {
        Self {
            kind: TaskKind::Reduce,
            id,
        }
    }
}

impl fmt::Display for TaskRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            TaskKind::Map => write!(f, "map-{}", self.id),
            TaskKind::Reduce => write!(f, "reduce-{}", self.id),
        }
    }
}

/// Lo que recibe un worker cuando se le asigna una tarea.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskDescriptor {
    pub task: TaskRef,

    /// Map: un único archivo de entrada.
    /// Reduce: los n_map archivos intermedios de su bucket.
    pub inputs: Vec<PathBuf>,

    /// n_reduce para un map, n_map para un reduce.
    pub bucket_count: u32,

    pub generation: Generation,

    /// Directorio compartido donde se publican intermedios y salidas.
    pub work_dir: PathBuf,
}
