//! Gremlin Server WebSocket transport.
//!
//! One request in flight per connection: the connection sits behind a mutex
//! and a request owns it until its final status frame arrives. A connection
//! that fails at the transport level is dropped and reopened by the next
//! call; the failed call itself is not replayed.

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use uuid::Uuid;

use super::{graphson, Bindings, ExecutionError, GremlinExecutor};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

const STATUS_SUCCESS: u16 = 200;
const STATUS_NO_CONTENT: u16 = 204;
const STATUS_PARTIAL_CONTENT: u16 = 206;

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(rename = "requestId", default)]
    request_id: Option<String>,
    status: ResponseStatus,
    #[serde(default)]
    result: Option<ResponseResult>,
}

#[derive(Debug, Deserialize)]
struct ResponseStatus {
    code: u16,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct ResponseResult {
    #[serde(default)]
    data: Value,
}

pub struct GremlinWsClient {
    url: String,
    stream: Mutex<Option<WsStream>>,
}

impl GremlinWsClient {
    /// Client that connects on first use.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            stream: Mutex::new(None),
        }
    }

    /// Client with its connection already open.
    pub async fn connect(url: impl Into<String>) -> Result<Self, ExecutionError> {
        let client = Self::new(url);
        let stream = open(&client.url).await?;
        *client.stream.lock().await = Some(stream);
        Ok(client)
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

async fn open(url: &str) -> Result<WsStream, ExecutionError> {
    let (stream, _response) = connect_async(url)
        .await
        .map_err(|e| ExecutionError::Connect {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
    log::info!("Connected to Gremlin server {}", url);
    Ok(stream)
}

fn transport<E: std::fmt::Display>(e: E) -> ExecutionError {
    ExecutionError::Transport(e.to_string())
}

/// Build the `eval` request frame.
fn request_frame(request_id: &Uuid, query: &str, bindings: &Bindings) -> String {
    json!({
        "requestId": request_id.to_string(),
        "op": "eval",
        "processor": "",
        "args": {
            "gremlin": query,
            "bindings": bindings,
            "language": "gremlin-groovy",
        },
    })
    .to_string()
}

/// Outcome of one response frame.
enum Frame {
    /// More frames follow.
    Partial,
    /// Final frame; `true` when the server sent no content at all.
    Done { no_content: bool },
}

/// Fold one response frame into `data`.
fn absorb(payload: &[u8], request_id: &str, data: &mut Vec<Value>) -> Result<Option<Frame>, ExecutionError> {
    let response: ResponseMessage = serde_json::from_slice(payload)
        .map_err(|e| ExecutionError::MalformedResponse(e.to_string()))?;

    if let Some(id) = response.request_id.as_deref() {
        if id != request_id {
            log::warn!("Ignoring Gremlin response for unknown request {}", id);
            return Ok(None);
        }
    }

    let code = response.status.code;
    match code {
        STATUS_SUCCESS | STATUS_PARTIAL_CONTENT => {
            // GraphSON 2/3 wrap the batch itself in a `g:List` envelope
            match response.result.map(|r| graphson::untype(r.data)) {
                Some(Value::Array(items)) => data.extend(items),
                Some(Value::Null) | None => {}
                Some(other) => data.push(other),
            }
            if code == STATUS_PARTIAL_CONTENT {
                Ok(Some(Frame::Partial))
            } else {
                Ok(Some(Frame::Done { no_content: false }))
            }
        }
        STATUS_NO_CONTENT => Ok(Some(Frame::Done { no_content: true })),
        _ => Err(ExecutionError::Server {
            code,
            message: response.status.message,
        }),
    }
}

async fn round_trip(ws: &mut WsStream, query: &str, bindings: &Bindings) -> Result<Bytes, ExecutionError> {
    let request_id = Uuid::new_v4();
    let frame = request_frame(&request_id, query, bindings);
    ws.send(Message::Text(frame)).await.map_err(transport)?;

    let request_id = request_id.to_string();
    let mut data = Vec::new();
    loop {
        let payload = match ws.next().await {
            Some(Ok(Message::Text(text))) => text.into_bytes(),
            Some(Ok(Message::Binary(bytes))) => bytes,
            Some(Ok(Message::Close(_))) | None => return Err(ExecutionError::Closed),
            // Ping/Pong are answered by tungstenite
            Some(Ok(_)) => continue,
            Some(Err(e)) => return Err(transport(e)),
        };

        match absorb(&payload, &request_id, &mut data)? {
            Some(Frame::Done { no_content: true }) if data.is_empty() => return Ok(Bytes::new()),
            Some(Frame::Done { .. }) => {
                let body = serde_json::to_vec(&Value::Array(data))
                    .map_err(|e| ExecutionError::MalformedResponse(e.to_string()))?;
                return Ok(Bytes::from(body));
            }
            Some(Frame::Partial) | None => {}
        }
    }
}

#[async_trait]
impl GremlinExecutor for GremlinWsClient {
    async fn execute(&self, query: &str, bindings: &Bindings) -> Result<Bytes, ExecutionError> {
        let mut guard = self.stream.lock().await;
        if guard.is_none() {
            *guard = Some(open(&self.url).await?);
        }
        let Some(ws) = guard.as_mut() else {
            return Err(ExecutionError::Closed);
        };

        let result = round_trip(ws, query, bindings).await;
        if let Err(e) = &result {
            if e.is_connection_lost() {
                log::warn!("Dropping Gremlin connection to {}: {}", self.url, e);
                *guard = None;
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_frame_shape() {
        let id = Uuid::nil();
        let mut bindings = Bindings::new();
        bindings.insert("_b0".to_string(), Value::from("tenant"));

        let frame: Value = serde_json::from_str(&request_frame(&id, "g.V(_b0)", &bindings)).unwrap();
        assert_eq!(frame["op"], "eval");
        assert_eq!(frame["requestId"], id.to_string());
        assert_eq!(frame["args"]["gremlin"], "g.V(_b0)");
        assert_eq!(frame["args"]["bindings"]["_b0"], "tenant");
        assert_eq!(frame["args"]["language"], "gremlin-groovy");
    }

    #[test]
    fn test_absorb_partial_then_final() {
        let mut data = Vec::new();
        let partial = br#"{"requestId":"r","status":{"code":206},"result":{"data":[1,2]}}"#;
        let last = br#"{"requestId":"r","status":{"code":200},"result":{"data":[3]}}"#;

        assert!(matches!(absorb(partial, "r", &mut data), Ok(Some(Frame::Partial))));
        assert!(matches!(
            absorb(last, "r", &mut data),
            Ok(Some(Frame::Done { no_content: false }))
        ));
        assert_eq!(data, vec![Value::from(1), Value::from(2), Value::from(3)]);
    }

    #[test]
    fn test_absorb_typed_batch() {
        let mut data = Vec::new();
        let frame = br#"{"requestId":"r","status":{"code":200},"result":{"data":{"@type":"g:List","@value":[{"@type":"g:Int64","@value":1}]}}}"#;
        assert!(matches!(
            absorb(frame, "r", &mut data),
            Ok(Some(Frame::Done { no_content: false }))
        ));
        assert_eq!(data, vec![Value::from(1)]);
        assert_eq!(graphson::as_count(&data), Some(1));
    }

    #[test]
    fn test_absorb_no_content() {
        let mut data = Vec::new();
        let frame = br#"{"requestId":"r","status":{"code":204,"message":""},"result":{"data":null}}"#;
        assert!(matches!(
            absorb(frame, "r", &mut data),
            Ok(Some(Frame::Done { no_content: true }))
        ));
        assert!(data.is_empty());
    }

    #[test]
    fn test_absorb_foreign_request_is_skipped() {
        let mut data = Vec::new();
        let frame = br#"{"requestId":"other","status":{"code":200},"result":{"data":[1]}}"#;
        assert!(matches!(absorb(frame, "r", &mut data), Ok(None)));
        assert!(data.is_empty());
    }

    #[test]
    fn test_absorb_server_error() {
        let mut data = Vec::new();
        let frame = br#"{"requestId":"r","status":{"code":597,"message":"No such property: foo"}}"#;
        assert_eq!(
            absorb(frame, "r", &mut data).err(),
            Some(ExecutionError::Server {
                code: 597,
                message: "No such property: foo".to_string()
            })
        );
    }

    #[tokio::test]
    async fn test_connect_failure_is_reported() {
        let client = GremlinWsClient::new("ws://127.0.0.1:1/gremlin");
        let err = client.execute("g.V()", &Bindings::new()).await.unwrap_err();
        assert!(matches!(err, ExecutionError::Connect { .. }));
    }
}
