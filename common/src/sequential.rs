use std::{
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
};

use crate::app::{KeyValue, MapReduceApp};
use crate::store::AtomicFile;

/// Agrupa un vector ya ordenado por clave en corridas de claves iguales y
/// aplica `reduce` a cada una. El orden de los valores dentro de la corrida
/// es el orden de entrada.
pub fn reduce_sorted(app: &MapReduceApp, sorted: Vec<KeyValue>) -> Vec<(String, String)> {
    let mut out = Vec::new();
    let mut iter = sorted.into_iter().peekable();

    while let Some(first) = iter.next() {
        let key = first.key;
        let mut values = vec![first.value];
        while let Some(next) = iter.next_if(|kv| kv.key == key) {
            values.push(next.value);
        }
        let output = (app.reduce)(&key, &values);
        out.push((key, output));
    }

    out
}

/// Ejecuta el job completo en un solo proceso, sin particiones:
/// map de cada entrada, orden por clave, reduce, y una única salida.
/// Sirve de referencia para comparar con la ejecución distribuida.
pub fn run_sequential(app: &MapReduceApp, inputs: &[PathBuf], output: &Path) -> io::Result<()> {
    let mut intermediate = Vec::new();
    for input in inputs {
        let contents = fs::read_to_string(input)?;
        let source = input.to_string_lossy();
        intermediate.extend((app.map)(&source, &contents));
    }

    // sort estable: mantiene el orden de los valores de cada clave
    intermediate.sort_by(|a, b| a.key.cmp(&b.key));

    let mut out = AtomicFile::create(output)?;
    for (key, value) in reduce_sorted(app, intermediate) {
        writeln!(out, "{} {}", key, value)?;
    }
    out.commit()?;
    Ok(())
}
