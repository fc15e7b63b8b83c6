//! Loopback-only, read-only HTTP surface for polling watcher stats.
//!
//! Routes (GET only):
//! - `/health` → `{"status":"ok"}`
//! - `/stats`  → `{"total_alerts":n,"current_status":"Normal"|"Alert Active"}`
//! - `/status` → stats plus last label, probability, classifier mode and counters

mod status;

use anyhow::{anyhow, Result};
use serde::Serialize;
use std::io::{BufRead, BufReader, Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

pub use status::{StatusBoard, StatusSnapshot};

const MAX_REQUEST_BYTES: u64 = 8192;

#[derive(Clone, Debug)]
pub struct ApiConfig {
    pub addr: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            addr: "127.0.0.1:8797".to_string(),
        }
    }
}

#[derive(Debug)]
pub struct ApiHandle {
    pub addr: SocketAddr,
    shutdown: Arc<AtomicBool>,
    join: Option<JoinHandle<()>>,
}

impl ApiHandle {
    pub fn stop(mut self) -> Result<()> {
        self.shutdown.store(true, Ordering::SeqCst);
        if let Some(join) = self.join.take() {
            join.join()
                .map_err(|_| anyhow!("api server thread panicked"))?;
        }
        Ok(())
    }
}

pub struct ApiServer {
    cfg: ApiConfig,
    board: StatusBoard,
}

impl ApiServer {
    pub fn new(cfg: ApiConfig, board: StatusBoard) -> Self {
        Self { cfg, board }
    }

    pub fn spawn(self) -> Result<ApiHandle> {
        let configured_addr: SocketAddr = self.cfg.addr.parse()?;
        if !configured_addr.ip().is_loopback() {
            return Err(anyhow!(
                "stats api must bind a loopback address, got '{}'",
                configured_addr
            ));
        }
        let listener = TcpListener::bind(configured_addr)?;
        let addr = listener.local_addr()?;
        if !addr.ip().is_loopback() {
            return Err(anyhow!(
                "stats api configured for loopback address '{}', but bound to '{}'",
                configured_addr,
                addr
            ));
        }
        listener.set_nonblocking(true)?;

        let shutdown = Arc::new(AtomicBool::new(false));
        let shutdown_thread = shutdown.clone();
        let board = self.board;
        let join = std::thread::spawn(move || {
            if let Err(err) = run_api(listener, board, shutdown_thread) {
                log::error!("stats api stopped: {}", err);
            }
        });

        Ok(ApiHandle {
            addr,
            shutdown,
            join: Some(join),
        })
    }
}

fn run_api(listener: TcpListener, board: StatusBoard, shutdown: Arc<AtomicBool>) -> Result<()> {
    while !shutdown.load(Ordering::SeqCst) {
        match listener.accept() {
            Ok((stream, _)) => {
                if let Err(err) = serve(stream, &board) {
                    log::warn!("stats api request rejected: {}", err);
                }
            }
            Err(err) if err.kind() == std::io::ErrorKind::WouldBlock => {
                std::thread::sleep(Duration::from_millis(50));
            }
            Err(err) => return Err(err.into()),
        }
    }
    Ok(())
}

/// Status code and serialized JSON body for one request.
#[derive(Debug, PartialEq)]
struct Reply {
    status: u16,
    body: Vec<u8>,
}

impl Reply {
    fn ok<T: Serialize>(payload: &T) -> Result<Self> {
        Ok(Self {
            status: 200,
            body: serde_json::to_vec(payload)?,
        })
    }

    fn error(status: u16, code: &str) -> Self {
        Self {
            status,
            body: format!(r#"{{"error":"{}"}}"#, code).into_bytes(),
        }
    }

    fn reason(&self) -> &'static str {
        match self.status {
            200 => "OK",
            403 => "Forbidden",
            404 => "Not Found",
            405 => "Method Not Allowed",
            _ => "Internal Server Error",
        }
    }
}

#[derive(Serialize)]
struct Health {
    status: &'static str,
}

fn route(method: &str, path: &str, board: &StatusBoard) -> Result<Reply> {
    if method != "GET" {
        return Ok(Reply::error(405, "method_not_allowed"));
    }
    match path {
        "/health" => Reply::ok(&Health { status: "ok" }),
        "/stats" => Reply::ok(&board.snapshot().alert_stats()),
        "/status" => Reply::ok(&board.snapshot()),
        _ => Ok(Reply::error(404, "not_found")),
    }
}

fn serve(mut stream: TcpStream, board: &StatusBoard) -> Result<()> {
    // Accepted sockets may inherit non-blocking mode on some platforms.
    stream.set_nonblocking(false)?;
    let reply = if stream.peer_addr()?.ip().is_loopback() {
        stream.set_read_timeout(Some(Duration::from_secs(2)))?;
        let (method, path) = read_request_line(&stream)?;
        route(&method, &path, board)?
    } else {
        Reply::error(403, "forbidden")
    };
    send(&mut stream, &reply)
}

/// Method and path (query stripped) of the request; headers are drained.
fn read_request_line(stream: &TcpStream) -> Result<(String, String)> {
    let mut reader = BufReader::new(stream.take(MAX_REQUEST_BYTES));
    let mut line = String::new();
    reader.read_line(&mut line)?;
    let mut parts = line.split_whitespace();
    let method = parts.next().ok_or_else(|| anyhow!("empty request"))?.to_string();
    let target = parts.next().ok_or_else(|| anyhow!("missing path"))?;
    let path = target.split('?').next().unwrap_or(target).to_string();

    let mut header = String::new();
    loop {
        header.clear();
        if reader.read_line(&mut header)? == 0 || header.trim_end().is_empty() {
            break;
        }
    }
    Ok((method, path))
}

fn send(stream: &mut TcpStream, reply: &Reply) -> Result<()> {
    write!(
        stream,
        "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\n\
         Cache-Control: no-store\r\nConnection: close\r\n\r\n",
        reply.status,
        reply.reason(),
        reply.body.len()
    )?;
    stream.write_all(&reply.body)?;
    Ok(())
}
