use serde::{Deserialize, Serialize};

/// Par clave/valor emitido por un map y guardado en los intermedios.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct KeyValue {
    pub key: String,
    pub value: String,
}

impl KeyValue {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// `map(nombre_de_fuente, contenido)`
pub type MapFn = fn(&str, &str) -> Vec<KeyValue>;

/// `reduce(clave, valores)`
pub type ReduceFn = fn(&str, &[String]) -> String;

/// Capacidad que inyecta el autor del job: un par de funciones puras.
/// El núcleo nunca mira dentro.
#[derive(Clone, Copy)]
pub struct MapReduceApp {
    pub name: &'static str,
    pub map: MapFn,
    pub reduce: ReduceFn,
}

impl MapReduceApp {
    pub fn new(name: &'static str, map: MapFn, reduce: ReduceFn) -> Self {
        Self { name, map, reduce }
    }
}

impl std::fmt::Debug for MapReduceApp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MapReduceApp")
            .field("name", &self.name)
            .finish()
    }
}
