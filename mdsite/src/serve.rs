//! Development server: serves the output directory as static files.

use anyhow::{anyhow, Context, Result};
use log::{info, warn};
use std::{
    borrow::Cow,
    fs::read,
    io::Cursor,
    net::SocketAddr,
    path::{Component, Path, PathBuf},
    sync::Arc,
};
use tiny_http::{Header, Request, Response, Server, StatusCode};

/// Serves files from `root` at `addr` until Ctrl+C is pressed.
///
/// # Errors
/// This function returns an error if the server cannot bind to `addr`
/// or the Ctrl+C handler cannot be installed.
pub fn run(root: &Path, addr: SocketAddr) -> Result<()> {
    let server = Server::http(addr)
        .map_err(|e| anyhow!("failed to start HTTP server at {addr}: {e}"))?;
    let server = Arc::new(server);

    let server_for_signal = Arc::clone(&server);
    ctrlc::set_handler(move || {
        info!("shutting down");
        server_for_signal.unblock();
    })
    .context("failed to set Ctrl+C handler")?;

    info!("server running at http://{addr}");

    for request in server.incoming_requests() {
        if let Err(e) = handle_request(request, root) {
            warn!("failed to answer request: {e:#}");
        }
    }

    Ok(())
}

fn handle_request(request: Request, root: &Path) -> Result<()> {
    let Some(path) = resolve_request(root, request.url()) else {
        let response = Response::new(
            StatusCode(404),
            vec![content_type_header("text/plain; charset=utf-8")?],
            Cursor::new("404 Not Found"),
            Some(13),
            None,
        );
        return request.respond(response).context("failed to send response");
    };

    let content = read(&path).with_context(|| format!("failed to read {path:?}"))?;
    let response =
        Response::from_data(content).with_header(content_type_header(guess_content_type(&path))?);

    request.respond(response).context("failed to send response")
}

fn content_type_header(value: &str) -> Result<Header> {
    Header::from_bytes("Content-Type", value)
        .map_err(|()| anyhow!("invalid Content-Type header value: {value}"))
}

/// Maps a request URL to a file under `root`.
///
/// Directories resolve to their `index.html`.
/// URLs that do not name a file, or that try to leave `root`, resolve to nothing.
fn resolve_request(root: &Path, url: &str) -> Option<PathBuf> {
    let path = url.split(['?', '#']).next().unwrap_or_default();
    let path = urlencoding::decode(path).unwrap_or(Cow::Borrowed(path));
    let relative = Path::new(path.trim_start_matches('/'));

    if !relative
        .components()
        .all(|part| matches!(part, Component::Normal(_) | Component::CurDir))
    {
        return None;
    }

    let local_path = root.join(relative);

    if local_path.is_file() {
        Some(local_path)
    } else if local_path.is_dir() {
        Some(local_path.join("index.html")).filter(|index| index.is_file())
    } else {
        None
    }
}

/// Guesses a MIME content type from a file extension.
fn guess_content_type(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()) {
        Some("html" | "htm") => "text/html; charset=utf-8",
        Some("css") => "text/css; charset=utf-8",
        Some("js" | "mjs") => "application/javascript; charset=utf-8",
        Some("json") => "application/json; charset=utf-8",
        Some("svg") => "image/svg+xml",
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("avif") => "image/avif",
        Some("ico") => "image/x-icon",
        Some("woff2") => "font/woff2",
        Some("txt" | "md") => "text/plain; charset=utf-8",
        _ => "application/octet-stream",
    }
}
