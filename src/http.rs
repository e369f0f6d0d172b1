use crate::error::AppError;
use crate::fs::{generate_directory_listing, percent_decode, resolve, ResolvedTarget};
use crate::logger::Logger;
use crate::request::Request;
use crate::response::{content_type, HttpResponse};
use log::debug;
use std::io::{BufRead, BufReader, Read};
use std::net::{SocketAddr, TcpStream};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Upper bound on the request line plus headers read from a client.
const MAX_REQUEST_HEAD_BYTES: u64 = 16 * 1024;

/// How long to wait for leftover header bytes once the response is out.
const HEADER_DRAIN_TIMEOUT: Duration = Duration::from_millis(100);

/// Everything a connection handler needs from the running server.
pub struct HandlerContext {
    /// Canonical web root.
    pub web_root: PathBuf,
    pub logger: Arc<Logger>,
    pub read_timeout: Option<Duration>,
}

/// Serves one connection and closes it. Failures are recorded in the access
/// log and never propagate.
pub fn handle_connection(stream: TcpStream, peer: SocketAddr, ctx: &HandlerContext, log_prefix: &str) {
    debug!("{log_prefix} Handling client connection");
    match handle_client(stream, peer, ctx, log_prefix) {
        Ok(()) => debug!("{log_prefix} Client handled successfully"),
        Err(AppError::MalformedRequest(_)) => {
            ctx.logger.log(format!("Malformed request from {peer}, closing connection"));
        }
        Err(e) => {
            ctx.logger
                .log(format!("Error handling client request from {peer}: {e}"));
        }
    }
}

fn handle_client(
    stream: TcpStream,
    peer: SocketAddr,
    ctx: &HandlerContext,
    log_prefix: &str,
) -> Result<(), AppError> {
    // Sockets accepted from a non-blocking listener may inherit the mode.
    stream.set_nonblocking(false)?;
    stream.set_read_timeout(ctx.read_timeout)?;

    let mut reader = BufReader::new(Read::take(&stream, MAX_REQUEST_HEAD_BYTES));
    let request_line = match read_request_line(&mut reader)? {
        Some(line) => line,
        None => {
            ctx.logger
                .log(format!("Connection from {peer} closed before sending a request"));
            return Ok(());
        }
    };
    ctx.logger.log(format!("Request from {peer}: {request_line}"));

    let result = respond(&stream, &request_line, ctx, log_prefix);
    discard_headers(&stream, &mut reader);
    result
}

fn respond(
    mut stream: &TcpStream,
    request_line: &str,
    ctx: &HandlerContext,
    log_prefix: &str,
) -> Result<(), AppError> {
    let request = Request::parse(request_line)?;
    debug!("{log_prefix} Parsed {} {}", request.method, request.raw_target);

    let target = resolve(&ctx.web_root, &request.path);
    debug!("{log_prefix} Resolved to {target:?}");

    let response = match target {
        ResolvedTarget::Root(dir) | ResolvedTarget::Directory(dir) => {
            HttpResponse::html(generate_directory_listing(&dir, &ctx.web_root)?)
        }
        ResolvedTarget::File(path) => {
            let name = path.file_name().unwrap_or_default().to_string_lossy();
            HttpResponse::new(std::fs::read(&path)?, content_type(&name))
        }
        ResolvedTarget::NotFound => {
            HttpResponse::not_found(&percent_decode(request.path.as_str()))
        }
    };

    response.send(&mut stream, log_prefix)
}

/// Reads the request line. Returns `None` when the peer closes before
/// sending anything.
fn read_request_line<R: BufRead>(reader: &mut R) -> Result<Option<String>, AppError> {
    let mut line = Vec::new();
    if reader.read_until(b'\n', &mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(
        String::from_utf8_lossy(&line)
            .trim_end_matches(['\r', '\n'])
            .to_string(),
    ))
}

/// Consumes whatever header lines the client already sent so that closing
/// the socket does not reset it. Waits at most `HEADER_DRAIN_TIMEOUT` per read.
fn discard_headers<R: BufRead>(stream: &TcpStream, reader: &mut R) {
    if stream.set_read_timeout(Some(HEADER_DRAIN_TIMEOUT)).is_err() {
        return;
    }
    loop {
        let mut header = Vec::new();
        match reader.read_until(b'\n', &mut header) {
            Ok(0) | Err(_) => break,
            Ok(_) if header == b"\r\n" || header == b"\n" => break,
            Ok(_) => {}
        }
    }
}
