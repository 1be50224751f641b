//! In-process stand-in for a Gradio prediction service
//!
//! Answers the upload, call and result endpoints under `/gradio_api` and
//! records every request it sees so tests can inspect the payloads.

#![allow(dead_code)]

use std::io::{self, BufRead, BufReader, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread;

const EVENT_ID: &str = "evt-1";
const UPLOADED_PATH: &str = "/tmp/gradio/stub/upload.csv";

#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: String,
    pub path: String,
    pub body: String,
}

pub struct GradioStub {
    url: String,
    requests: Arc<Mutex<Vec<Recorded>>>,
}

impl GradioStub {
    /// Finish every prediction with `outputs`, a JSON array
    pub fn complete(outputs: &str) -> Self {
        Self::serve(format!(
            "event: generating\ndata: null\n\nevent: complete\ndata: {}\n\n",
            outputs
        ))
    }

    /// Fail every prediction with an `error` event
    pub fn error(message: &str) -> Self {
        Self::serve(format!("event: error\ndata: \"{}\"\n\n", message))
    }

    fn serve(stream: String) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind stub server");
        let url = format!("http://{}/", listener.local_addr().unwrap());
        let requests = Arc::new(Mutex::new(Vec::new()));

        let log = Arc::clone(&requests);
        thread::spawn(move || {
            for conn in listener.incoming().flatten() {
                let _ = handle(conn, &stream, &log);
            }
        });

        Self { url, requests }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().unwrap().clone()
    }

    /// Body of the `call/predict` request, parsed
    pub fn call_body(&self) -> serde_json::Value {
        let call = self
            .requests()
            .into_iter()
            .find(|r| r.method == "POST" && r.path == "/gradio_api/call/predict")
            .expect("no prediction call recorded");
        serde_json::from_str(&call.body).unwrap()
    }
}

/// A base URL nothing listens on
pub fn dead_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}/", addr)
}

fn handle(conn: TcpStream, stream: &str, log: &Mutex<Vec<Recorded>>) -> io::Result<()> {
    let mut reader = BufReader::new(conn.try_clone()?);

    let mut request_line = String::new();
    reader.read_line(&mut request_line)?;
    let mut parts = request_line.split_whitespace();
    let method = parts.next().unwrap_or_default().to_string();
    let path = parts.next().unwrap_or_default().to_string();

    let mut content_length = 0;
    let mut chunked = false;
    loop {
        let mut line = String::new();
        if reader.read_line(&mut line)? == 0 {
            break;
        }
        let line = line.trim_end();
        if line.is_empty() {
            break;
        }
        if let Some((name, value)) = line.split_once(':') {
            let name = name.trim().to_ascii_lowercase();
            let value = value.trim();
            if name == "content-length" {
                content_length = value.parse().unwrap_or(0);
            } else if name == "transfer-encoding" && value.eq_ignore_ascii_case("chunked") {
                chunked = true;
            }
        }
    }

    let body = if chunked {
        read_chunked(&mut reader)?
    } else {
        let mut buf = vec![0; content_length];
        reader.read_exact(&mut buf)?;
        buf
    };

    let (status, content_type, payload) = route(&method, &path, stream);
    log.lock().unwrap().push(Recorded {
        method,
        path,
        body: String::from_utf8_lossy(&body).into_owned(),
    });

    let mut conn = conn;
    write!(
        conn,
        "HTTP/1.1 {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        content_type,
        payload.len(),
        payload
    )?;
    conn.flush()
}

fn read_chunked(reader: &mut impl BufRead) -> io::Result<Vec<u8>> {
    let mut body = Vec::new();
    loop {
        let mut size_line = String::new();
        reader.read_line(&mut size_line)?;
        let size = size_line.trim().split(';').next().unwrap_or("0");
        let size = usize::from_str_radix(size, 16).unwrap_or(0);

        let mut crlf = String::new();
        if size == 0 {
            reader.read_line(&mut crlf)?;
            return Ok(body);
        }
        let mut chunk = vec![0; size];
        reader.read_exact(&mut chunk)?;
        body.extend_from_slice(&chunk);
        reader.read_line(&mut crlf)?;
    }
}

fn route(method: &str, path: &str, stream: &str) -> (&'static str, &'static str, String) {
    let path = path.split('?').next().unwrap_or_default();
    let result_path = format!("/gradio_api/call/predict/{}", EVENT_ID);

    match (method, path) {
        ("POST", "/gradio_api/upload") => (
            "200 OK",
            "application/json",
            format!("[\"{}\"]", UPLOADED_PATH),
        ),
        ("POST", "/gradio_api/call/predict") => (
            "200 OK",
            "application/json",
            format!("{{\"event_id\":\"{}\"}}", EVENT_ID),
        ),
        ("GET", p) if p == result_path => ("200 OK", "text/event-stream", stream.to_string()),
        ("GET", "/gradio_api/info") => ("200 OK", "application/json", "{}".to_string()),
        _ => ("404 Not Found", "text/plain", "not found".to_string()),
    }
}
