use std::{fmt, net::SocketAddr, path::PathBuf, str::FromStr};

/// Dónde escucha el coordinator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    /// Socket UNIX local (lo normal: todos los procesos en el mismo host).
    Unix(PathBuf),
    /// TCP, para workers en otros hosts con el mismo sistema de archivos.
    Tcp(SocketAddr),
}

impl Endpoint {
    /// Socket por usuario, para que jobs de usuarios distintos en el mismo
    /// host no choquen.
    pub fn default_for_user() -> Self {
        Endpoint::Unix(default_socket_path())
    }

    /// URL base para reqwest. Con socket UNIX el host no importa.
    pub fn base_url(&self) -> String {
        match self {
            Endpoint::Unix(_) => "http://localhost".to_string(),
            Endpoint::Tcp(addr) => format!("http://{}", addr),
        }
    }
}

pub fn default_socket_path() -> PathBuf {
    PathBuf::from(format!("/var/tmp/mr-coordinator-{}.sock", whoami::username()))
}

impl Default for Endpoint {
    fn default() -> Self {
        Self::default_for_user()
    }
}

impl FromStr for Endpoint {
    type Err = String;

    /// `host:puerto` es TCP; cualquier otra cosa es la ruta de un socket.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err("endpoint vacío".to_string());
        }
        if let Some(rest) = s.strip_prefix("tcp://") {
            return rest
                .parse::<SocketAddr>()
                .map(Endpoint::Tcp)
                .map_err(|e| format!("dirección TCP inválida {rest}: {e}"));
        }
        if let Some(rest) = s.strip_prefix("unix://") {
            return Ok(Endpoint::Unix(PathBuf::from(rest)));
        }
        match s.parse::<SocketAddr>() {
            Ok(addr) => Ok(Endpoint::Tcp(addr)),
            Err(_) => Ok(Endpoint::Unix(PathBuf::from(s))),
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::Unix(path) => write!(f, "unix://{}", path.display()),
            Endpoint::Tcp(addr) => write!(f, "tcp://{}", addr),
        }
    }
}
