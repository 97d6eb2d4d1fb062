//! Minimal HTTP/1.1 server for integration tests.
//!
//! Serves a fixed table of routes. Each route answers GET with a status,
//! Content-Type and body; unknown paths get 404. Request heads are kept so
//! tests can check what the client sent.

use std::collections::HashMap;
use std::io::{Read, Write};
use std::net::TcpListener;
use std::sync::{Arc, Mutex};
use std::thread;

#[derive(Debug, Clone)]
pub struct Route {
    pub status: &'static str,
    pub content_type: &'static str,
    pub body: Vec<u8>,
}

impl Route {
    pub fn ok(content_type: &'static str, body: &[u8]) -> Self {
        Self {
            status: "200 OK",
            content_type,
            body: body.to_vec(),
        }
    }
}

/// Request heads received by a server, in arrival order.
#[derive(Debug, Clone, Default)]
pub struct RequestLog(Arc<Mutex<Vec<String>>>);

impl RequestLog {
    fn push(&self, head: String) {
        self.0.lock().unwrap().push(head);
    }

    pub fn len(&self) -> usize {
        self.0.lock().unwrap().len()
    }

    /// Values of header `name` (case-insensitive) across all requests.
    pub fn header_values(&self, name: &str) -> Vec<String> {
        self.0
            .lock()
            .unwrap()
            .iter()
            .flat_map(|head| head.lines().skip(1))
            .filter_map(|line| line.split_once(':'))
            .filter(|(key, _)| key.trim().eq_ignore_ascii_case(name))
            .map(|(_, value)| value.trim().to_string())
            .collect()
    }
}

/// Starts a server in a background thread. Returns the base URL without a
/// trailing slash (e.g. "http://127.0.0.1:12345"). Runs until the process exits.
pub fn start(routes: Vec<(&'static str, Route)>) -> String {
    start_recording(routes).0
}

/// Like `start`, also returning the log of received request heads.
pub fn start_recording(routes: Vec<(&'static str, Route)>) -> (String, RequestLog) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    let routes: Arc<HashMap<&'static str, Route>> = Arc::new(routes.into_iter().collect());
    let log = RequestLog::default();
    let server_log = log.clone();
    thread::spawn(move || {
        for stream in listener.incoming().flatten() {
            let routes = Arc::clone(&routes);
            let log = server_log.clone();
            thread::spawn(move || handle(stream, &routes, &log));
        }
    });
    (format!("http://127.0.0.1:{}", port), log)
}

fn handle(
    mut stream: std::net::TcpStream,
    routes: &HashMap<&'static str, Route>,
    log: &RequestLog,
) {
    let _ = stream.set_read_timeout(Some(std::time::Duration::from_secs(2)));
    let _ = stream.set_write_timeout(Some(std::time::Duration::from_secs(2)));
    let mut buf = [0u8; 8192];
    let n = match stream.read(&mut buf) {
        Ok(0) => return,
        Ok(n) => n,
        Err(_) => return,
    };
    let request = String::from_utf8_lossy(&buf[..n]);
    let head = request.split("\r\n\r\n").next().unwrap_or_default();
    log.push(head.to_string());
    let path = request
        .lines()
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .unwrap_or("/");

    let not_found = Route {
        status: "404 Not Found",
        content_type: "text/plain",
        body: b"not found".to_vec(),
    };
    let route = routes.get(path).unwrap_or(&not_found);

    let head = format!(
        "HTTP/1.1 {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        route.status,
        route.content_type,
        route.body.len()
    );
    let _ = stream.write_all(head.as_bytes());
    let _ = stream.write_all(&route.body);
    let _ = stream.flush();
}
