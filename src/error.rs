use std::fmt;

#[derive(Debug)]
pub enum AppError {
    Io(std::io::Error),
    Bind {
        address: String,
        source: std::io::Error,
    },
    DirectoryNotFound(String),
    MalformedRequest(String),
    InvalidConfig(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Io(err) => write!(f, "IO error: {err}"),
            AppError::Bind { address, source } => write!(f, "Cannot bind {address}: {source}"),
            AppError::DirectoryNotFound(path) => write!(f, "Directory not found: {path}"),
            AppError::MalformedRequest(line) => write!(f, "Malformed request line: {line:?}"),
            AppError::InvalidConfig(msg) => write!(f, "Invalid configuration: {msg}"),
        }
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Io(err)
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Io(err) => Some(err),
            AppError::Bind { source, .. } => Some(source),
            _ => None,
        }
    }
}
