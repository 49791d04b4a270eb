//! Canned HTTP server and command builder for the binary tests.

#![allow(dead_code)]

use assert_cmd::Command;
use std::collections::{HashMap, VecDeque};
use std::io::{BufRead, BufReader, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::thread;

pub const PROJECT_ID: &str = "aaaaaaaa-aaaa-aaaa-aaaa-aaaaaaaaaaaa";
pub const INSTANCE_ID: &str = "bbbbbbbb-bbbb-bbbb-bbbb-bbbbbbbbbbbb";

#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: String,
    pub path: String,
    pub body: String,
}

type Routes = HashMap<(String, String), VecDeque<(u16, String)>>;

/// Answers from per-route queues. The last queued answer of a route repeats;
/// unknown routes get a 404.
pub struct CannedServer {
    base: String,
    routes: Arc<Mutex<Routes>>,
    requests: Arc<Mutex<Vec<Recorded>>>,
}

impl CannedServer {
    pub fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        let routes: Arc<Mutex<Routes>> = Arc::default();
        let requests: Arc<Mutex<Vec<Recorded>>> = Arc::default();

        let (r, q) = (Arc::clone(&routes), Arc::clone(&requests));
        thread::spawn(move || {
            for stream in listener.incoming().flatten() {
                serve(stream, &r, &q);
            }
        });
        Self {
            base,
            routes,
            requests,
        }
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn route(&self, method: &str, path: &str, status: u16, body: &str) -> &Self {
        self.routes
            .lock()
            .unwrap()
            .entry((method.to_string(), path.to_string()))
            .or_default()
            .push_back((status, body.to_string()));
        self
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().unwrap().clone()
    }

    pub fn count(&self, method: &str) -> usize {
        self.requests().iter().filter(|r| r.method == method).count()
    }
}

fn serve(stream: TcpStream, routes: &Mutex<Routes>, requests: &Mutex<Vec<Recorded>>) {
    let mut reader = BufReader::new(stream);
    let mut request_line = String::new();
    if reader.read_line(&mut request_line).is_err() {
        return;
    }
    let mut parts = request_line.split_whitespace();
    let method = parts.next().unwrap_or_default().to_string();
    let path = parts.next().unwrap_or_default().to_string();

    let mut content_length = 0;
    loop {
        let mut line = String::new();
        if reader.read_line(&mut line).unwrap_or(0) == 0 || line.trim().is_empty() {
            break;
        }
        if let Some((name, value)) = line.split_once(':') {
            if name.eq_ignore_ascii_case("content-length") {
                content_length = value.trim().parse().unwrap_or(0);
            }
        }
    }
    let mut body = vec![0; content_length];
    let _ = reader.read_exact(&mut body);

    requests.lock().unwrap().push(Recorded {
        method: method.clone(),
        path: path.clone(),
        body: String::from_utf8_lossy(&body).to_string(),
    });

    let (status, body) = {
        let mut routes = routes.lock().unwrap();
        match routes.get_mut(&(method, path)) {
            Some(queue) if queue.len() > 1 => queue.pop_front().unwrap(),
            Some(queue) => queue.front().cloned().unwrap(),
            None => (404, r#"{"message": "not found"}"#.to_string()),
        }
    };
    let response = format!(
        "HTTP/1.1 {status} Canned\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    );
    let mut stream = reader.into_inner();
    let _ = stream.write_all(response.as_bytes());
    let _ = stream.flush();
}

/// The binary with an isolated config dir, a static token and both API
/// endpoints pointed at `server`.
pub fn stackit(config_dir: &Path, server: &CannedServer) -> Command {
    let mut cmd = Command::cargo_bin("stackit").unwrap();
    cmd.env_clear()
        .env("STACKIT_CONFIG_DIR", config_dir)
        .env("STACKIT_ACCESS_TOKEN", "test-token")
        .env("STACKIT_OBSERVABILITY_CUSTOM_ENDPOINT", server.base())
        .env("STACKIT_RESOURCE_MANAGER_CUSTOM_ENDPOINT", server.base())
        .env("STACKIT_WAIT_INTERVAL_MS", "10");
    cmd
}

pub fn instance_path(rest: &str) -> String {
    format!("/v1/projects/{PROJECT_ID}/instances{rest}")
}
