use crate::error::AppError;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_LISTEN: &str = "0.0.0.0";

/// Settings for one server run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub listen: String,
    /// `0` binds an OS-assigned port.
    pub port: u16,
    pub web_root: PathBuf,
    pub log_dir: PathBuf,
    /// Bound on reading the request head. `None` waits forever.
    pub read_timeout: Option<Duration>,
}

impl ServerConfig {
    pub fn new(port: u16, web_root: impl Into<PathBuf>, log_dir: impl Into<PathBuf>) -> Self {
        Self {
            listen: DEFAULT_LISTEN.to_string(),
            port,
            web_root: web_root.into(),
            log_dir: log_dir.into(),
            read_timeout: None,
        }
    }

    pub fn with_listen(mut self, listen: impl Into<String>) -> Self {
        self.listen = listen.into();
        self
    }

    pub fn with_read_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.read_timeout = timeout;
        self
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.listen, self.port)
    }

    /// A copy with both directories canonicalized, failing if either is missing.
    pub fn validated(&self) -> Result<Self, AppError> {
        Ok(Self {
            web_root: existing_directory(&self.web_root)?,
            log_dir: existing_directory(&self.log_dir)?,
            ..self.clone()
        })
    }
}

fn existing_directory(path: &Path) -> Result<PathBuf, AppError> {
    match path.canonicalize() {
        Ok(canonical) if canonical.is_dir() => Ok(canonical),
        _ => Err(AppError::DirectoryNotFound(
            path.to_string_lossy().into_owned(),
        )),
    }
}

/// Last-used values remembered between runs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoredConfig {
    pub port: Option<u16>,
    pub web_directory: Option<PathBuf>,
    pub log_directory: Option<PathBuf>,
}

/// A `key=value` properties file holding a [`StoredConfig`].
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the stored values. A missing file yields the empty config.
    pub fn load(&self) -> Result<StoredConfig, AppError> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(StoredConfig::default()),
            Err(e) => return Err(AppError::Io(e)),
        };
        parse_properties(&contents)
    }

    pub fn save(&self, config: &StoredConfig) -> Result<(), AppError> {
        let mut contents = String::new();
        if let Some(port) = config.port {
            contents.push_str(&format!("port={port}\n"));
        }
        if let Some(dir) = &config.web_directory {
            contents.push_str(&format!("webDirectory={}\n", dir.display()));
        }
        if let Some(dir) = &config.log_directory {
            contents.push_str(&format!("logDirectory={}\n", dir.display()));
        }
        fs::write(&self.path, contents)?;
        Ok(())
    }
}

fn parse_properties(contents: &str) -> Result<StoredConfig, AppError> {
    let mut config = StoredConfig::default();
    for line in contents.lines().map(str::trim) {
        if line.is_empty() || line.starts_with('#') || line.starts_with('!') {
            continue;
        }
        let Some((key, value)) = line.split_once('=') else {
            return Err(AppError::InvalidConfig(format!("expected key=value, got {line:?}")));
        };
        let value = value.trim();
        match key.trim() {
            "port" => {
                let port = value
                    .parse::<u16>()
                    .ok()
                    .filter(|port| *port != 0)
                    .ok_or_else(|| AppError::InvalidConfig(format!("invalid port {value:?}")))?;
                config.port = Some(port);
            }
            "webDirectory" if !value.is_empty() => config.web_directory = Some(value.into()),
            "logDirectory" if !value.is_empty() => config.log_directory = Some(value.into()),
            _ => {}
        }
    }
    Ok(config)
}
