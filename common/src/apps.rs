//! Aplicaciones map/reduce que vienen incluidas con los binarios.

use std::collections::BTreeSet;

use crate::app::{KeyValue, MapReduceApp};

/// Parte el texto en palabras: secuencias maximales de letras.
fn words(contents: &str) -> impl Iterator<Item = &str> {
    contents
        .split(|c: char| !c.is_alphabetic())
        .filter(|w| !w.is_empty())
}

/* =========================
   WordCount
   ========================= */

fn wc_map(_source: &str, contents: &str) -> Vec<KeyValue> {
    words(contents).map(|w| KeyValue::new(w, "1")).collect()
}

fn wc_reduce(_key: &str, values: &[String]) -> String {
    values.len().to_string()
}

pub fn wordcount() -> MapReduceApp {
    MapReduceApp::new("wc", wc_map, wc_reduce)
}

/* =========================
   Índice invertido
   ========================= */

fn indexer_map(source: &str, contents: &str) -> Vec<KeyValue> {
    let distinct: BTreeSet<&str> = words(contents).collect();
    distinct
        .into_iter()
        .map(|w| KeyValue::new(w, source))
        .collect()
}

/// "<n> doc1,doc2,..." con los documentos ordenados y sin repetir.
fn indexer_reduce(_key: &str, values: &[String]) -> String {
    let docs: BTreeSet<&str> = values.iter().map(String::as_str).collect();
    let docs: Vec<&str> = docs.into_iter().collect();
    format!("{} {}", docs.len(), docs.join(","))
}

pub fn indexer() -> MapReduceApp {
    MapReduceApp::new("indexer", indexer_map, indexer_reduce)
}

/// Busca una app incluida por nombre (lo que recibe `--app`).
pub fn lookup(name: &str) -> Option<MapReduceApp> {
    match name {
        "wc" | "wordcount" => Some(wordcount()),
        "indexer" => Some(indexer()),
        _ => None,
    }
}
