//! CDP WebSocket client.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use parking_lot::Mutex;
use serde_json::{json, Value};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, trace, warn};

use super::error::CdpError;
use super::protocol::{BrowserVersion, CdpEvent, CdpRequest, CdpResponse, PageInfo};
use super::session::PageSession;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
pub(crate) type WsSink = SplitSink<WsStream, Message>;
type WsSource = SplitStream<WsStream>;

/// Transport-level deadline for a single command round-trip.
const COMMAND_DEADLINE: std::time::Duration = std::time::Duration::from_secs(30);

/// Pending command waiting for its correlated reply.
pub(crate) struct PendingRequest {
    pub tx: oneshot::Sender<Result<Value, CdpError>>,
}

/// Shared command-dispatch state: socket sink, id counter, pending map.
///
/// Replies resolve the pending entry with the matching id; an entry removed
/// by the deadline path is simply absent when the late reply lands.
pub(crate) struct Dispatch {
    ws_tx: tokio::sync::Mutex<WsSink>,
    request_id: AtomicU64,
    pending: Mutex<HashMap<u64, PendingRequest>>,
}

impl Dispatch {
    pub(crate) async fn call(
        &self,
        method: &str,
        params: Option<Value>,
        session_id: Option<&str>,
    ) -> Result<Value, CdpError> {
        let id = self.request_id.fetch_add(1, Ordering::SeqCst);

        let request = CdpRequest {
            id,
            method: method.to_string(),
            params,
            session_id: session_id.map(|s| s.to_string()),
        };

        let frame = serde_json::to_string(&request)?;
        trace!("cdp send: {}", frame);

        let (tx, rx) = oneshot::channel();
        self.pending.lock().insert(id, PendingRequest { tx });

        {
            let mut ws = self.ws_tx.lock().await;
            ws.send(Message::Text(frame.into())).await?;
        }

        match tokio::time::timeout(COMMAND_DEADLINE, rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(CdpError::SessionClosed),
            Err(_) => {
                self.pending.lock().remove(&id);
                Err(CdpError::Timeout(format!("{} did not reply", method)))
            }
        }
    }
}

/// CDP client connected to a running browser.
///
/// Holds the browser-level WebSocket; pages are driven through
/// [`PageSession`]s attached via [`CdpClient::attach_page`].
pub struct CdpClient {
    http_endpoint: String,
    dispatch: Arc<Dispatch>,
    /// Event fan-out by session id.
    event_routes: Arc<Mutex<HashMap<String, mpsc::UnboundedSender<CdpEvent>>>>,
    _recv_task: tokio::task::JoinHandle<()>,
}

impl CdpClient {
    /// Connect to the browser behind a DevTools HTTP endpoint
    /// (e.g. `http://localhost:9222`).
    pub async fn connect(endpoint: &str) -> Result<Self, CdpError> {
        let http_endpoint = endpoint.trim_end_matches('/').to_string();

        let version_url = format!("{}/json/version", http_endpoint);
        debug!("discovering browser socket via {}", version_url);

        let version: BrowserVersion = reqwest::get(&version_url)
            .await
            .map_err(|e| CdpError::BrowserNotAvailable(format!("{}: {}", endpoint, e)))?
            .json()
            .await
            .map_err(|e| CdpError::BrowserNotAvailable(format!("{}: {}", endpoint, e)))?;

        debug!("browser: {}", version.browser);

        let (ws_stream, _) = tokio_tungstenite::connect_async(&version.web_socket_debugger_url)
            .await
            .map_err(|e| CdpError::ConnectionFailed(format!("websocket: {}", e)))?;

        let (ws_sink, ws_source) = ws_stream.split();
        let dispatch = Arc::new(Dispatch {
            ws_tx: tokio::sync::Mutex::new(ws_sink),
            request_id: AtomicU64::new(1),
            pending: Mutex::new(HashMap::new()),
        });
        let event_routes: Arc<Mutex<HashMap<String, mpsc::UnboundedSender<CdpEvent>>>> =
            Arc::new(Mutex::new(HashMap::new()));

        let recv_task = {
            let dispatch = dispatch.clone();
            let event_routes = event_routes.clone();
            tokio::spawn(async move {
                Self::receive_loop(ws_source, dispatch, event_routes).await;
            })
        };

        debug!("cdp client connected to {}", version.web_socket_debugger_url);

        Ok(Self {
            http_endpoint,
            dispatch,
            event_routes,
            _recv_task: recv_task,
        })
    }

    /// WebSocket receive loop: replies resolve pending commands, events
    /// route to the session that owns them.
    async fn receive_loop(
        mut ws_source: WsSource,
        dispatch: Arc<Dispatch>,
        event_routes: Arc<Mutex<HashMap<String, mpsc::UnboundedSender<CdpEvent>>>>,
    ) {
        while let Some(msg) = ws_source.next().await {
            match msg {
                Ok(Message::Text(text)) => {
                    trace!("cdp recv: {}", text);
                    match serde_json::from_str::<CdpResponse>(&text) {
                        Ok(resp) => {
                            if let Some(id) = resp.id {
                                let pending = dispatch.pending.lock().remove(&id);
                                if let Some(req) = pending {
                                    let result = match resp.error {
                                        Some(err) => Err(CdpError::Protocol {
                                            code: err.code,
                                            message: err.message,
                                        }),
                                        None => Ok(resp.result.unwrap_or(Value::Null)),
                                    };
                                    let _ = req.tx.send(result);
                                }
                            } else if let Some(method) = resp.method {
                                let session_id = resp.session_id.unwrap_or_default();
                                let routes = event_routes.lock();
                                if let Some(tx) = routes.get(&session_id) {
                                    let _ = tx.send(CdpEvent {
                                        method,
                                        params: resp.params,
                                    });
                                }
                            }
                        }
                        Err(e) => {
                            warn!("unparseable cdp frame: {}", e);
                        }
                    }
                }
                Ok(Message::Close(_)) => {
                    debug!("cdp socket closed");
                    break;
                }
                Err(e) => {
                    error!("cdp socket error: {}", e);
                    break;
                }
                _ => {}
            }
        }
    }

    /// Send a browser-level CDP command.
    pub async fn call(&self, method: &str, params: Option<Value>) -> Result<Value, CdpError> {
        self.dispatch.call(method, params, None).await
    }

    /// List open pages via the `/json/list` discovery endpoint.
    pub async fn list_pages(&self) -> Result<Vec<PageInfo>, CdpError> {
        let url = format!("{}/json/list", self.http_endpoint);
        let pages: Vec<PageInfo> = reqwest::get(&url).await?.json().await?;
        Ok(pages)
    }

    /// Attach to an existing page and enable the domains the driver uses.
    pub async fn attach_page(&self, target_id: &str) -> Result<PageSession, CdpError> {
        let result = self
            .call(
                "Target.attachToTarget",
                Some(json!({
                    "targetId": target_id,
                    "flatten": true
                })),
            )
            .await?;

        let session_id = result["sessionId"]
            .as_str()
            .ok_or_else(|| CdpError::InvalidResponse("missing sessionId".to_string()))?
            .to_string();

        let (event_tx, event_rx) = mpsc::unbounded_channel();
        self.event_routes.lock().insert(session_id.clone(), event_tx);

        let session = PageSession::new(
            target_id.to_string(),
            session_id,
            self.dispatch.clone(),
            event_rx,
        );
        session.enable_domains().await?;

        Ok(session)
    }
}

impl Drop for CdpClient {
    fn drop(&mut self) {
        self._recv_task.abort();
    }
}
