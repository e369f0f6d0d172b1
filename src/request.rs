use crate::error::AppError;

/// The resource a request line asks for, relative to the web root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestPath {
    /// `/` or an empty target.
    Root,
    Relative(String),
}

impl RequestPath {
    pub fn as_str(&self) -> &str {
        match self {
            RequestPath::Root => "",
            RequestPath::Relative(path) => path,
        }
    }
}

/// A parsed request line. Headers and bodies are never looked at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub method: String,
    pub raw_target: String,
    pub path: RequestPath,
}

impl Request {
    /// Parses a request line such as `GET /docs/index.html HTTP/1.1`.
    ///
    /// Tokens are split on single spaces and the second one is the target.
    /// Exactly one leading `/` is removed from it; an empty remainder (or a
    /// remainder of just `/`) is the [`RequestPath::Root`] sentinel. Any method
    /// is accepted.
    pub fn parse(request_line: &str) -> Result<Self, AppError> {
        let mut tokens = request_line.split(' ');
        let method = tokens.next().unwrap_or_default();
        let target = tokens
            .next()
            .ok_or_else(|| AppError::MalformedRequest(request_line.to_string()))?;

        let relative = target.strip_prefix('/').unwrap_or(target);
        let path = if relative.is_empty() || relative == "/" {
            RequestPath::Root
        } else {
            RequestPath::Relative(relative.to_string())
        };

        Ok(Request {
            method: method.to_string(),
            raw_target: target.to_string(),
            path,
        })
    }
}
