//! Ejecución de una tarea ya asignada. Todo es bloqueante: el loop del
//! worker lo corre en `spawn_blocking`.

use anyhow::{ensure, Context, Result};
use common::{
    partition, sequential::reduce_sorted, store, KeyValue, MapReduceApp, TaskDescriptor, TaskKind,
};
use std::{fs, path::PathBuf};
use tracing::{debug, info};

/// Reparte los pares en `n_buckets` según la clave.
pub fn partition_records(records: Vec<KeyValue>, n_buckets: u32) -> Vec<Vec<KeyValue>> {
    let mut buckets: Vec<Vec<KeyValue>> = vec![Vec::new(); n_buckets as usize];
    for kv in records {
        let b = partition::bucket(&kv.key, n_buckets) as usize;
        buckets[b].push(kv);
    }
    buckets
}

/// Map: lee la entrada entera, aplica `map`, particiona y publica un
/// intermedio por bucket no vacío. Devuelve los archivos publicados.
pub fn run_map(task: &TaskDescriptor, app: &MapReduceApp) -> Result<Vec<PathBuf>> {
    ensure!(task.task.kind == TaskKind::Map, "{} no es un map", task.task);
    ensure!(task.bucket_count >= 1, "{} sin buckets de reduce", task.task);
    let input = task
        .inputs
        .first()
        .with_context(|| format!("{} sin archivo de entrada", task.task))?;

    let contents = fs::read_to_string(input)
        .with_context(|| format!("no se pudo leer {}", input.display()))?;
    let records = (app.map)(&input.to_string_lossy(), &contents);
    debug!("{}: {} pares emitidos", task.task, records.len());

    let mut published = Vec::new();
    for (reduce_id, bucket) in partition_records(records, task.bucket_count)
        .into_iter()
        .enumerate()
    {
        if bucket.is_empty() {
            continue;
        }
        let path = store::write_intermediate(&task.work_dir, task.task.id, reduce_id as u32, &bucket)
            .with_context(|| format!("no se pudo publicar el bucket {reduce_id} de {}", task.task))?;
        published.push(path);
    }

    info!(
        "{} terminado: {} intermedios publicados",
        task.task,
        published.len()
    );
    Ok(published)
}

/// Reduce: junta los intermedios de su bucket, ordena por clave, aplica
/// `reduce` por clave y publica `mr-out-<id>`.
pub fn run_reduce(task: &TaskDescriptor, app: &MapReduceApp) -> Result<PathBuf> {
    ensure!(task.task.kind == TaskKind::Reduce, "{} no es un reduce", task.task);

    let mut intermediate = Vec::new();
    for path in &task.inputs {
        let records = store::read_intermediate(path)
            .with_context(|| format!("no se pudo leer {}", path.display()))?;
        intermediate.extend(records);
    }

    // estable: los valores de una clave quedan en orden de map
    intermediate.sort_by(|a, b| a.key.cmp(&b.key));
    let entries = reduce_sorted(app, intermediate);
    let n_keys = entries.len();

    let out = store::write_output(&task.work_dir, task.task.id, entries)
        .with_context(|| format!("no se pudo publicar la salida de {}", task.task))?;

    info!("{} terminado: {} claves en {}", task.task, n_keys, out.display());
    Ok(out)
}

pub fn execute(task: &TaskDescriptor, app: &MapReduceApp) -> Result<Vec<PathBuf>> {
    match task.task.kind {
        TaskKind::Map => run_map(task, app),
        TaskKind::Reduce => run_reduce(task, app).map(|out| vec![out]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::{apps, TaskRef};
    use std::path::Path;

    fn map_task(dir: &Path, id: u32, input: PathBuf, n_reduce: u32) -> TaskDescriptor {
        TaskDescriptor {
            task: TaskRef::map(id),
            inputs: vec![input],
            bucket_count: n_reduce,
            generation: 1,
            work_dir: dir.to_path_buf(),
        }
    }

    fn reduce_task(dir: &Path, id: u32, n_map: u32) -> TaskDescriptor {
        TaskDescriptor {
            task: TaskRef::reduce(id),
            inputs: (0..n_map)
                .map(|m| store::intermediate_path(dir, m, id))
                .collect(),
            bucket_count: n_map,
            generation: 1,
            work_dir: dir.to_path_buf(),
        }
    }

    #[test]
    fn partition_records_respeta_el_bucket_de_cada_clave() {
        let records: Vec<KeyValue> = ["a", "b", "c", "a", "d"]
            .iter()
            .map(|k| KeyValue::new(*k, "1"))
            .collect();
        let buckets = partition_records(records, 3);

        assert_eq!(buckets.len(), 3);
        assert_eq!(buckets.iter().map(Vec::len).sum::<usize>(), 5);
        for (b, bucket) in buckets.iter().enumerate() {
            for kv in bucket {
                assert_eq!(partition::bucket(&kv.key, 3) as usize, b);
            }
        }
    }

    #[test]
    fn map_publica_solo_buckets_no_vacios() {
        let tmp = tempfile::tempdir().unwrap();
        let input = tmp.path().join("in.txt");
        fs::write(&input, "uno").unwrap();

        let outputs = run_map(&map_task(tmp.path(), 0, input, 5), &apps::wordcount()).unwrap();

        let b = partition::bucket("uno", 5);
        assert_eq!(outputs, vec![store::intermediate_path(tmp.path(), 0, b)]);
        for r in (0..5).filter(|r| *r != b) {
            assert!(!store::intermediate_path(tmp.path(), 0, r).exists());
        }
    }

    #[test]
    fn map_con_entrada_ilegible_es_fatal() {
        let tmp = tempfile::tempdir().unwrap();
        let task = map_task(tmp.path(), 0, tmp.path().join("no-existe.txt"), 2);
        assert!(run_map(&task, &apps::wordcount()).is_err());
    }

    #[test]
    fn map_y_reduce_producen_wordcount_ordenado() {
        let tmp = tempfile::tempdir().unwrap();
        let in0 = tmp.path().join("pg-0.txt");
        let in1 = tmp.path().join("pg-1.txt");
        fs::write(&in0, "the cat and the hat").unwrap();
        fs::write(&in1, "a cat a dog").unwrap();
        let app = apps::wordcount();

        run_map(&map_task(tmp.path(), 0, in0, 2), &app).unwrap();
        run_map(&map_task(tmp.path(), 1, in1, 2), &app).unwrap();

        let mut all = Vec::new();
        for r in 0..2 {
            let out = run_reduce(&reduce_task(tmp.path(), r, 2), &app).unwrap();
            assert_eq!(out, store::output_path(tmp.path(), r));
            let entries = store::read_output(&out).unwrap();

            let keys: Vec<&String> = entries.iter().map(|(k, _)| k).collect();
            let mut sorted = keys.clone();
            sorted.sort();
            sorted.dedup();
            assert_eq!(keys, sorted, "claves ascendentes y sin repetir");

            all.extend(entries);
        }

        all.sort();
        let expected: Vec<(String, String)> = [
            ("a", "2"),
            ("and", "1"),
            ("cat", "2"),
            ("dog", "1"),
            ("hat", "1"),
            ("the", "2"),
        ]
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        assert_eq!(all, expected);
    }

    #[test]
    fn reduce_sin_intermedios_publica_salida_vacia() {
        let tmp = tempfile::tempdir().unwrap();
        let out = run_reduce(&reduce_task(tmp.path(), 0, 3), &apps::wordcount()).unwrap();
        assert!(fs::read_to_string(out).unwrap().is_empty());
    }

    #[test]
    fn reduce_con_intermedio_corrupto_es_fatal() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(store::intermediate_path(tmp.path(), 0, 0), "basura\n").unwrap();
        assert!(run_reduce(&reduce_task(tmp.path(), 0, 1), &apps::wordcount()).is_err());
    }

    #[test]
    fn execute_despacha_por_tipo() {
        let tmp = tempfile::tempdir().unwrap();
        let input = tmp.path().join("in.txt");
        fs::write(&input, "x y").unwrap();
        let app = apps::wordcount();

        let map_out = execute(&map_task(tmp.path(), 0, input, 1), &app).unwrap();
        assert_eq!(map_out, vec![store::intermediate_path(tmp.path(), 0, 0)]);

        let red_out = execute(&reduce_task(tmp.path(), 0, 1), &app).unwrap();
        assert_eq!(red_out, vec![store::output_path(tmp.path(), 0)]);
        assert_eq!(fs::read_to_string(&red_out[0]).unwrap(), "x 1\ny 1\n");
    }
}
