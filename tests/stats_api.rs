use anyhow::Result;
use serde_json::Value;
use std::io::{Read, Write};
use std::net::{SocketAddr, TcpStream};

use passenger_watch::alert::{AlertStats, AlertStatus};
use passenger_watch::api::{ApiConfig, ApiHandle, ApiServer, StatusBoard, StatusSnapshot};
use passenger_watch::detect::{ClassificationResult, ClassifierMode};
use passenger_watch::pipeline::PipelineStatus;

fn read_response(stream: &mut TcpStream) -> Result<(String, String)> {
    let mut response = String::new();
    stream.read_to_string(&mut response)?;
    let mut parts = response.splitn(2, "\r\n\r\n");
    let headers = parts.next().unwrap_or("").to_string();
    let body = parts.next().unwrap_or("").to_string();
    Ok((headers, body))
}

fn request(addr: SocketAddr, method: &str, path: &str) -> Result<(String, String)> {
    let mut stream = TcpStream::connect(addr)?;
    let req = format!("{method} {path} HTTP/1.1\r\nHost: localhost\r\n\r\n");
    stream.write_all(req.as_bytes())?;
    read_response(&mut stream)
}

struct TestApi {
    board: StatusBoard,
    handle: Option<ApiHandle>,
}

impl TestApi {
    fn new() -> Result<Self> {
        let board = StatusBoard::new();
        let handle = ApiServer::new(
            ApiConfig {
                addr: "127.0.0.1:0".to_string(),
            },
            board.clone(),
        )
        .spawn()?;
        Ok(Self {
            board,
            handle: Some(handle),
        })
    }

    fn addr(&self) -> SocketAddr {
        self.handle.as_ref().map(|h| h.addr).expect("api running")
    }
}

impl Drop for TestApi {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            let _ = handle.stop();
        }
    }
}

#[test]
fn health_reports_ok() -> Result<()> {
    let api = TestApi::new()?;
    let (headers, body) = request(api.addr(), "GET", "/health")?;
    assert!(headers.starts_with("HTTP/1.1 200 OK"));
    assert_eq!(body, r#"{"status":"ok"}"#);
    Ok(())
}

#[test]
fn stats_start_normal_with_no_alerts() -> Result<()> {
    let api = TestApi::new()?;
    let (headers, body) = request(api.addr(), "GET", "/stats")?;
    assert!(headers.starts_with("HTTP/1.1 200 OK"));
    assert!(headers.contains("Content-Type: application/json"));
    let value: Value = serde_json::from_str(&body)?;
    assert_eq!(value["total_alerts"], 0);
    assert_eq!(value["current_status"], "Normal");
    assert_eq!(value.as_object().map(|o| o.len()), Some(2));
    Ok(())
}

#[test]
fn stats_and_status_follow_published_snapshot() -> Result<()> {
    let api = TestApi::new()?;
    api.board.publish(StatusSnapshot::new(
        AlertStats {
            total_alerts: 3,
            current_status: AlertStatus::Active,
        },
        PipelineStatus {
            frames_processed: 120,
            frames_buffered: 20,
            last: ClassificationResult::from_probability(0.93, 0.7),
            classifier: ClassifierMode::Primary,
        },
        2,
    ));

    let (_, body) = request(api.addr(), "GET", "/stats")?;
    let stats: Value = serde_json::from_str(&body)?;
    assert_eq!(stats["total_alerts"], 3);
    assert_eq!(stats["current_status"], "Alert Active");

    let (_, body) = request(api.addr(), "GET", "/status?verbose=1")?;
    let status: Value = serde_json::from_str(&body)?;
    assert_eq!(status["total_alerts"], 3);
    assert_eq!(status["label"], "event_detected");
    assert_eq!(status["classifier"], "primary");
    assert_eq!(status["frames_processed"], 120);
    assert_eq!(status["candidates"], 2);
    let probability = status["probability"].as_f64().unwrap_or_default();
    assert!((probability - 0.93).abs() < 1e-6);
    Ok(())
}

#[test]
fn unknown_paths_and_methods_are_rejected() -> Result<()> {
    let api = TestApi::new()?;
    let (headers, body) = request(api.addr(), "GET", "/alerts")?;
    assert!(headers.starts_with("HTTP/1.1 404 Not Found"));
    assert_eq!(body, r#"{"error":"not_found"}"#);

    let (headers, _) = request(api.addr(), "POST", "/stats")?;
    assert!(headers.starts_with("HTTP/1.1 405 Method Not Allowed"));
    Ok(())
}
