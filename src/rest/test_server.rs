//! Minimal HTTP/1.1 server that answers like the Spanner REST API and records every request.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde_json::{Value as JsonValue, json};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use crate::client::DatabaseTarget;

pub(crate) const DATABASE_PATH: &str = "projects/p/instances/i/databases/d";
pub(crate) const TRANSACTION_ID: &str = "dHgtMQ==";
pub(crate) const COMMIT_TIMESTAMP: &str = "2024-05-01T10:20:30.5Z";

/// HTTP client that ignores proxy settings from the environment.
pub(crate) fn http_client() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().build().unwrap()
}

#[derive(Debug, Clone)]
pub(crate) struct Recorded {
    pub(crate) method: String,
    /// Path without the `/v1/` prefix.
    pub(crate) path: String,
    pub(crate) body: JsonValue,
}

#[derive(Debug, Clone)]
struct Failure {
    method: String,
    suffix: String,
    status: u16,
    message: String,
}

#[derive(Debug, Default)]
struct State {
    requests: Vec<Recorded>,
    failures: Vec<Failure>,
}

#[derive(Debug, Clone)]
pub(crate) struct TestServer {
    addr: SocketAddr,
    state: Arc<Mutex<State>>,
}

impl TestServer {
    pub(crate) async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let state = Arc::new(Mutex::new(State::default()));
        let sessions = Arc::new(AtomicUsize::new(0));

        let accept_state = Arc::clone(&state);
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let state = Arc::clone(&accept_state);
                let sessions = Arc::clone(&sessions);
                tokio::spawn(async move {
                    let _ = serve(stream, state, sessions).await;
                });
            }
        });
        Self { addr, state }
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// `host:port`, as configured for an emulator.
    pub(crate) fn host(&self) -> String {
        self.addr.to_string()
    }

    pub(crate) fn target(&self) -> DatabaseTarget {
        DatabaseTarget {
            project_id: "p".into(),
            instance_id: "i".into(),
            database_id: "d".into(),
            emulator_host: Some(self.host()),
            max_sessions: 4,
            access_token: None,
        }
    }

    /// Answer every `method` request whose path ends with `suffix` with a Google-style error.
    pub(crate) fn fail(&self, method: &str, suffix: &str, status: u16, message: &str) {
        self.state().failures.push(Failure {
            method: method.to_string(),
            suffix: suffix.to_string(),
            status,
            message: message.to_string(),
        });
    }

    pub(crate) fn requests(&self) -> Vec<Recorded> {
        self.state().requests.clone()
    }

    /// Requests whose path ends with `suffix`, e.g. `:commit`.
    pub(crate) fn requests_to(&self, suffix: &str) -> Vec<Recorded> {
        self.requests()
            .into_iter()
            .filter(|r| r.path.ends_with(suffix))
            .collect()
    }
}

async fn serve(
    mut stream: TcpStream,
    state: Arc<Mutex<State>>,
    sessions: Arc<AtomicUsize>,
) -> std::io::Result<()> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    let header_end = loop {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            return Ok(());
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
    let mut lines = head.lines();
    let mut request_line = lines.next().unwrap_or_default().split_whitespace();
    let method = request_line.next().unwrap_or_default().to_string();
    let path = request_line
        .next()
        .unwrap_or_default()
        .trim_start_matches("/v1/")
        .to_string();
    let content_length = lines
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse::<usize>().ok())
        .unwrap_or(0);

    while buf.len() < header_end + content_length {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }
    let body = serde_json::from_slice(&buf[header_end..]).unwrap_or(JsonValue::Null);

    let (status, reply) = {
        let mut state = state.lock().unwrap_or_else(PoisonError::into_inner);
        state.requests.push(Recorded {
            method: method.clone(),
            path: path.clone(),
            body: body.clone(),
        });
        let failure = state
            .failures
            .iter()
            .find(|f| f.method == method && path.ends_with(&f.suffix))
            .cloned();
        match failure {
            Some(f) => (
                f.status,
                json!({"error": {"code": f.status, "message": f.message}}),
            ),
            None => (200, respond(&method, &path, &body, &sessions)),
        }
    };

    let payload = reply.to_string();
    let response = format!(
        "HTTP/1.1 {status} X\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{payload}",
        payload.len()
    );
    stream.write_all(response.as_bytes()).await?;
    stream.shutdown().await
}

fn respond(method: &str, path: &str, body: &JsonValue, sessions: &AtomicUsize) -> JsonValue {
    if method == "DELETE" {
        return json!({});
    }
    if path.ends_with("/sessions") {
        let n = sessions.fetch_add(1, Ordering::SeqCst) + 1;
        return json!({"name": format!("{DATABASE_PATH}/sessions/s{n}")});
    }
    if path.ends_with(":beginTransaction") {
        return json!({"id": TRANSACTION_ID});
    }
    if path.ends_with(":commit") {
        return json!({"commitTimestamp": COMMIT_TIMESTAMP});
    }
    if path.ends_with(":rollback") {
        return json!({});
    }
    if path.ends_with(":executeSql") {
        if body.pointer("/transaction/id").is_some() {
            return json!({"stats": {"rowCountExact": "2"}});
        }
        return json!({
            "metadata": {"rowType": {"fields": [
                {"name": "one", "type": {"code": "INT64"}}
            ]}},
            "rows": [["1"]]
        });
    }
    json!({})
}
