use crate::error::AppError;
use log::{debug, error};
use std::io::Write;

/// Body sent (with status 200) when the requested resource does not exist.
pub const NOT_FOUND_BODY: &str = "404 Not Found | The requested resource is not available.";

/// MIME type for a file name, chosen by the text after its last `.`.
///
/// Matching is case-sensitive; unknown or missing extensions are `text/plain`.
pub fn content_type(file_name: &str) -> &'static str {
    match file_name.rsplit_once('.').map(|(_, ext)| ext) {
        Some("html") | Some("htm") => "text/html",
        Some("css") => "text/css",
        Some("js") => "application/javascript",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("pdf") => "application/pdf",
        _ => "text/plain",
    }
}

/// A `200 OK` response with a content type and a fully buffered body.
pub struct HttpResponse {
    pub content_type: &'static str,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn new(body: Vec<u8>, content_type: &'static str) -> Self {
        Self { content_type, body }
    }

    pub fn html(body: String) -> Self {
        Self::new(body.into_bytes(), "text/html")
    }

    /// The not-found page for `requested`, typed as if the file existed.
    pub fn not_found(requested: &str) -> Self {
        Self::new(NOT_FOUND_BODY.as_bytes().to_vec(), content_type(requested))
    }

    /// Frames the response and writes it out, flushing before returning.
    pub fn send<W: Write>(&self, stream: &mut W, log_prefix: &str) -> Result<(), AppError> {
        debug!(
            "{} Sending response - Content-Type: {}, Body Length: {}",
            log_prefix,
            self.content_type,
            self.body.len()
        );

        let head = format!(
            "HTTP/1.1 200 OK\r\nContent-Type: {}\r\nContent-Length: {}\r\n\r\n",
            self.content_type,
            self.body.len()
        );

        stream.write_all(head.as_bytes()).map_err(|e| {
            error!("{log_prefix} Failed to write response headers: {e}");
            AppError::Io(e)
        })?;

        if !self.body.is_empty() {
            stream.write_all(&self.body).map_err(|e| {
                error!("{log_prefix} Failed to write response body: {e}");
                AppError::Io(e)
            })?;
        }

        stream.flush().map_err(|e| {
            error!("{log_prefix} Failed to flush response: {e}");
            AppError::Io(e)
        })?;

        Ok(())
    }
}
