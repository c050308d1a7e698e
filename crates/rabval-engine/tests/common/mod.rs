use async_trait::async_trait;
use rabval_core::config::RabvalConfig;
use rabval_core::errors::{ExError, ExErrorKind, Result};
use rabval_core::model::{AnyResource, Category, Definitions};
use rabval_engine::{ManagementApi, OperationKind};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};

/// One mutating call received by [`FakeBroker`]
#[allow(dead_code)]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub kind: OperationKind,
    pub category: Category,
    pub identity: String,
}

/// In-memory management API that records every mutating call
#[allow(dead_code)]
pub struct FakeBroker {
    live: Definitions,
    calls: Mutex<Vec<Call>>,
    failing: Vec<String>,
    unreachable: bool,
}

#[allow(dead_code)]
impl FakeBroker {
    pub fn new(live: Definitions) -> Self {
        Self {
            live,
            calls: Mutex::new(Vec::new()),
            failing: Vec::new(),
            unreachable: false,
        }
    }

    /// Reject every call touching `identity`
    pub fn failing_on(mut self, identity: &str) -> Self {
        self.failing.push(identity.to_string());
        self
    }

    /// Fail the initial definitions export
    pub fn unreachable(mut self) -> Self {
        self.unreachable = true;
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, kind: OperationKind, resource: &AnyResource) -> Result<()> {
        let identity = resource.identity();
        self.calls.lock().unwrap().push(Call {
            kind,
            category: resource.category(),
            identity: identity.clone(),
        });
        if self.failing.contains(&identity) {
            return Err(ExError::new(ExErrorKind::ExternalService)
                .with_message(format!("broker rejected {}", identity)));
        }
        Ok(())
    }
}

#[async_trait]
impl ManagementApi for FakeBroker {
    async fn fetch_definitions(&self) -> Result<Definitions> {
        if self.unreachable {
            return Err(ExError::new(ExErrorKind::ExternalService).with_message("connection refused"));
        }
        Ok(self.live.clone())
    }

    async fn create(&self, resource: &AnyResource) -> Result<()> {
        self.record(OperationKind::Create, resource)
    }

    async fn delete(&self, resource: &AnyResource) -> Result<()> {
        self.record(OperationKind::Delete, resource)
    }
}

#[allow(dead_code)]
pub fn defs(value: Value) -> Definitions {
    Definitions::from_value(value).unwrap()
}

#[allow(dead_code)]
pub fn no_delay() -> RabvalConfig {
    RabvalConfig {
        request_delay: Duration::ZERO,
        ..Default::default()
    }
}

/// One vhost with a user, a bound queue/exchange pair and a permission
#[allow(dead_code)]
pub fn topology_json() -> Value {
    json!({
        "vhosts": [{ "name": "/" }],
        "users": [{ "name": "app", "password_hash": "h1", "tags": [] }],
        "queues": [{ "name": "orders", "vhost": "/", "durable": true, "auto_delete": false, "arguments": {} }],
        "exchanges": [{ "name": "events", "vhost": "/", "type": "topic", "durable": true, "auto_delete": false }],
        "bindings": [{
            "vhost": "/", "source": "events", "destination": "orders",
            "destination_type": "queue", "routing_key": "orders.#", "arguments": {}
        }],
        "permissions": [{ "user": "app", "vhost": "/", "configure": ".*", "write": ".*", "read": ".*" }]
    })
}

#[allow(dead_code)]
pub fn topology() -> Definitions {
    defs(topology_json())
}

#[allow(dead_code)]
pub fn categories(calls: &[Call]) -> Vec<(OperationKind, Category)> {
    calls.iter().map(|c| (c.kind, c.category)).collect()
}

/// One HTTP request received by [`CannedBroker`]
#[allow(dead_code)]
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub method: String,
    pub path: String,
    pub authorization: Option<String>,
    pub body: Value,
}

#[allow(dead_code)]
type Responder = dyn Fn(&str, &str) -> (u16, Value) + Send + Sync;

/// Local HTTP server answering management API calls with canned responses
/// and recording every request
#[allow(dead_code)]
pub struct CannedBroker {
    addr: SocketAddr,
    requests: Arc<Mutex<Vec<Request>>>,
}

#[allow(dead_code)]
impl CannedBroker {
    /// Serve `respond(method, path)` as `(status, json body)`; a `Null` body
    /// is sent empty
    pub async fn start<F>(respond: F) -> Self
    where
        F: Fn(&str, &str) -> (u16, Value) + Send + Sync + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let requests = Arc::new(Mutex::new(Vec::new()));
        let respond: Arc<Responder> = Arc::new(respond);

        let recorded = Arc::clone(&requests);
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let recorded = Arc::clone(&recorded);
                let respond = Arc::clone(&respond);
                tokio::spawn(async move {
                    serve(stream, recorded, respond).await;
                });
            }
        });

        Self { addr, requests }
    }

    /// Management URL with `guest:guest` credentials
    pub fn url(&self) -> String {
        format!("http://guest:guest@{}/", self.addr)
    }

    pub fn requests(&self) -> Vec<Request> {
        self.requests.lock().unwrap().clone()
    }
}

#[allow(dead_code)]
async fn serve(stream: TcpStream, recorded: Arc<Mutex<Vec<Request>>>, respond: Arc<Responder>) {
    let mut reader = BufReader::new(stream);

    let mut request_line = String::new();
    reader.read_line(&mut request_line).await.unwrap();
    let mut parts = request_line.split_whitespace();
    let method = parts.next().unwrap_or_default().to_string();
    let path = parts.next().unwrap_or_default().to_string();

    let mut content_length = 0usize;
    let mut authorization = None;
    loop {
        let mut line = String::new();
        reader.read_line(&mut line).await.unwrap();
        let line = line.trim_end();
        if line.is_empty() {
            break;
        }
        if let Some((name, value)) = line.split_once(':') {
            match name.to_ascii_lowercase().as_str() {
                "content-length" => content_length = value.trim().parse().unwrap(),
                "authorization" => authorization = Some(value.trim().to_string()),
                _ => {}
            }
        }
    }
    let mut body = vec![0u8; content_length];
    reader.read_exact(&mut body).await.unwrap();

    let (status, reply) = respond(&method, &path);
    recorded.lock().unwrap().push(Request {
        method,
        path,
        authorization,
        body: serde_json::from_slice(&body).unwrap_or(Value::Null),
    });

    let text = if reply.is_null() { String::new() } else { reply.to_string() };
    let response = format!(
        "HTTP/1.1 {} Canned\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        text.len(),
        text
    );
    let stream = reader.get_mut();
    stream.write_all(response.as_bytes()).await.unwrap();
    stream.shutdown().await.ok();
}
