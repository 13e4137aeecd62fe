//! Protocolo de archivos compartidos entre tareas map y reduce.
//!
//! - Intermedio `mr-<map>-<reduce>`: JSONL, un `{"key","value"}` por línea.
//! - Salida `mr-out-<reduce>`: líneas `"<clave> <valor>\n"`, claves ascendentes.
//!
//! Todo se escribe en un temporal dentro del mismo directorio y después se
//! renombra, así un lector ve el archivo viejo completo o el nuevo completo.

use std::{
    fs::{self, File},
    io::{self, BufRead, BufReader, BufWriter, Write},
    path::{Path, PathBuf},
};

use tempfile::NamedTempFile;
use tracing::debug;

use crate::app::KeyValue;
use crate::task::TaskId;

pub fn intermediate_name(map_id: TaskId, reduce_id: TaskId) -> String {
    format!("mr-{}-{}", map_id, reduce_id)
}

pub fn intermediate_path(dir: &Path, map_id: TaskId, reduce_id: TaskId) -> PathBuf {
    dir.join(intermediate_name(map_id, reduce_id))
}

pub fn output_name(reduce_id: TaskId) -> String {
    format!("mr-out-{}", reduce_id)
}

pub fn output_path(dir: &Path, reduce_id: TaskId) -> PathBuf {
    dir.join(output_name(reduce_id))
}

/// Archivo que sólo aparece con su nombre final al llamar a `commit`.
/// Si se descarta antes, el temporal se borra y el destino queda intacto.
pub struct AtomicFile {
    writer: BufWriter<NamedTempFile>,
    target: PathBuf,
}

impl AtomicFile {
    pub fn create(target: impl Into<PathBuf>) -> io::Result<Self> {
        let target = target.into();
        let dir = match target.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir)?;

        let tmp = tempfile::Builder::new()
            .prefix(".mr-tmp-")
            .tempfile_in(&dir)?;

        Ok(Self {
            writer: BufWriter::new(tmp),
            target,
        })
    }

    pub fn target(&self) -> &Path {
        &self.target
    }

    /// Flush + fsync + rename al destino final.
    pub fn commit(self) -> io::Result<PathBuf> {
        let tmp = self.writer.into_inner().map_err(|e| e.into_error())?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.target)?;
        debug!("publicado {}", self.target.display());
        Ok(self.target)
    }
}

impl Write for AtomicFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.writer.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}

/// Serializa un bucket como JSONL sin publicarlo todavía.
pub fn stage_intermediate(
    dir: &Path,
    map_id: TaskId,
    reduce_id: TaskId,
    records: &[KeyValue],
) -> io::Result<AtomicFile> {
    let mut out = AtomicFile::create(intermediate_path(dir, map_id, reduce_id))?;
    for kv in records {
        serde_json::to_writer(&mut out, kv)?;
        out.write_all(b"\n")?;
    }
    Ok(out)
}

/// Escribe y publica el bucket `reduce_id` del map `map_id`.
pub fn write_intermediate(
    dir: &Path,
    map_id: TaskId,
    reduce_id: TaskId,
    records: &[KeyValue],
) -> io::Result<PathBuf> {
    stage_intermediate(dir, map_id, reduce_id, records)?.commit()
}

/// Lee un intermedio completo. Si no existe es un bucket vacío: los map
/// sólo publican los buckets que tienen registros.
pub fn read_intermediate(path: &Path) -> io::Result<Vec<KeyValue>> {
    let file = match File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!("{} no existe, bucket vacío", path.display());
            return Ok(Vec::new());
        }
        Err(e) => return Err(e),
    };

    let mut out = Vec::new();
    for line in BufReader::new(file).lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let kv: KeyValue = serde_json::from_str(&line).map_err(|e| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("registro inválido en {}: {e}", path.display()),
            )
        })?;
        out.push(kv);
    }
    Ok(out)
}

/// Escribe y publica la salida final de un reduce.
/// `entries` ya tiene que venir ordenado por clave.
pub fn write_output<I>(dir: &Path, reduce_id: TaskId, entries: I) -> io::Result<PathBuf>
where
    I: IntoIterator<Item = (String, String)>,
{
    let mut out = AtomicFile::create(output_path(dir, reduce_id))?;
    for (key, value) in entries {
        writeln!(out, "{} {}", key, value)?;
    }
    out.commit()
}

/// Lee un archivo de salida como pares (clave, valor).
pub fn read_output(path: &Path) -> io::Result<Vec<(String, String)>> {
    let content = fs::read_to_string(path)?;
    Ok(content
        .lines()
        .filter(|l| !l.is_empty())
        .map(|l| match l.split_once(' ') {
            Some((k, v)) => (k.to_string(), v.to_string()),
            None => (l.to_string(), String::new()),
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kvs(pairs: &[(&str, &str)]) -> Vec<KeyValue> {
        pairs.iter().map(|(k, v)| KeyValue::new(*k, *v)).collect()
    }

    fn visible_files(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(dir)
            .unwrap()
            .flatten()
            .map(|e| e.file_name().to_string_lossy().to_string())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn nombres_siguen_la_convencion() {
        assert_eq!(intermediate_name(3, 7), "mr-3-7");
        assert_eq!(output_name(2), "mr-out-2");
        assert_eq!(
            intermediate_path(Path::new("/w"), 0, 1),
            PathBuf::from("/w/mr-0-1")
        );
    }

    #[test]
    fn intermedio_se_lee_tal_cual_se_escribio() {
        let tmp = tempfile::tempdir().unwrap();
        let records = kvs(&[("a", "1"), ("b c", "x\ny"), ("a", "1")]);

        let path = write_intermediate(tmp.path(), 0, 1, &records).unwrap();
        assert_eq!(path, tmp.path().join("mr-0-1"));
        assert_eq!(read_intermediate(&path).unwrap(), records);
        // no quedan temporales sueltos
        assert_eq!(visible_files(tmp.path()), vec!["mr-0-1"]);
    }

    #[test]
    fn intermedio_inexistente_es_bucket_vacio() {
        let tmp = tempfile::tempdir().unwrap();
        let recs = read_intermediate(&tmp.path().join("mr-9-9")).unwrap();
        assert!(recs.is_empty());
    }

    #[test]
    fn intermedio_corrupto_es_error_de_datos() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("mr-0-0");
        fs::write(&path, "{\"key\":\"a\",\"value\":\"1\"}\nno-json\n").unwrap();

        let err = read_intermediate(&path).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn sin_commit_no_aparece_el_archivo_final() {
        let tmp = tempfile::tempdir().unwrap();
        let staged = stage_intermediate(tmp.path(), 4, 0, &kvs(&[("k", "v")])).unwrap();
        assert_eq!(staged.target(), tmp.path().join("mr-4-0"));

        // el proceso "muere" antes del rename
        drop(staged);

        assert!(!tmp.path().join("mr-4-0").exists());
        assert!(visible_files(tmp.path()).is_empty());
    }

    #[test]
    fn republicar_reemplaza_el_archivo_completo() {
        let tmp = tempfile::tempdir().unwrap();
        write_intermediate(tmp.path(), 0, 0, &kvs(&[("a", "1"), ("b", "1")])).unwrap();
        let path = write_intermediate(tmp.path(), 0, 0, &kvs(&[("c", "1")])).unwrap();

        assert_eq!(read_intermediate(&path).unwrap(), kvs(&[("c", "1")]));
    }

    #[test]
    fn salida_usa_formato_clave_espacio_valor() {
        let tmp = tempfile::tempdir().unwrap();
        let entries = vec![
            ("a".to_string(), "2".to_string()),
            ("b".to_string(), "1 doc".to_string()),
        ];
        let path = write_output(tmp.path(), 1, entries.clone()).unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "a 2\nb 1 doc\n");
        assert_eq!(read_output(&path).unwrap(), entries);
    }

    #[test]
    fn salida_vacia_crea_archivo_vacio() {
        let tmp = tempfile::tempdir().unwrap();
        let nested = tmp.path().join("sub1").join("sub2");
        let path = write_output(&nested, 0, Vec::new()).unwrap();

        assert!(path.exists());
        assert!(fs::read_to_string(path).unwrap().is_empty());
    }
}
