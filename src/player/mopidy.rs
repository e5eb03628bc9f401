// Mopidy adapter - JSON-RPC 2.0 over the daemon's websocket
// One reader task owns the stream; requests wait on oneshot channels keyed by id

use super::{PlayerClient, PlayerError, PlayerEvent, PlayerResult, TlTrack, Track};
use async_trait::async_trait;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

pub const DEFAULT_MOPIDY_URL: &str = "ws://localhost:6680/mopidy/ws";

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type Pending = Arc<Mutex<HashMap<u64, oneshot::Sender<PlayerResult<Value>>>>>;

/// JSON-RPC 2.0 client for Mopidy's websocket endpoint.
///
/// Requests are written through a shared sink; a background reader task
/// resolves responses by id and forwards broadcast events to the channel
/// returned from [`MopidyClient::connect`].
pub struct MopidyClient {
    sink: tokio::sync::Mutex<SplitSink<WsStream, Message>>,
    pending: Pending,
    closed: Arc<AtomicBool>,
    next_id: AtomicU64,
}

#[derive(Debug, Deserialize)]
struct RpcError {
    code: i64,
    message: String,
}

/// One frame from the daemon: either a response to one of our ids or an event
#[derive(Debug, Deserialize)]
struct Frame {
    id: Option<u64>,
    #[serde(default)]
    result: Option<Value>,
    error: Option<RpcError>,
    event: Option<String>,
}

impl MopidyClient {
    pub async fn connect(url: &str) -> PlayerResult<(Self, mpsc::UnboundedReceiver<PlayerEvent>)> {
        let (stream, _) = connect_async(url)
            .await
            .map_err(|e| PlayerError::Connect(format!("{}: {}", url, e)))?;
        info!("Connected to Mopidy at {}", url);

        let (sink, reader) = stream.split();
        let pending: Pending = Arc::new(Mutex::new(HashMap::new()));
        let closed = Arc::new(AtomicBool::new(false));
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        let _ = event_tx.send(PlayerEvent::Online);
        tokio::spawn(read_loop(reader, pending.clone(), closed.clone(), event_tx));

        let client = Self {
            sink: tokio::sync::Mutex::new(sink),
            pending,
            closed,
            next_id: AtomicU64::new(1),
        };
        Ok((client, event_rx))
    }

    async fn call(&self, method: &str) -> PlayerResult<Value> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();
        self.pending
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .insert(id, tx);

        // Reader already gone: nobody would ever answer
        if self.closed.load(Ordering::SeqCst) {
            self.pending
                .lock()
                .unwrap_or_else(|p| p.into_inner())
                .remove(&id);
            return Err(PlayerError::Disconnected);
        }

        let request = json!({ "jsonrpc": "2.0", "id": id, "method": method });
        debug!("-> mopidy {} (id {})", method, id);

        let sent = self
            .sink
            .lock()
            .await
            .send(Message::Text(request.to_string()))
            .await;
        if let Err(e) = sent {
            self.pending
                .lock()
                .unwrap_or_else(|p| p.into_inner())
                .remove(&id);
            warn!("Failed to send {} to Mopidy: {}", method, e);
            return Err(PlayerError::Disconnected);
        }

        rx.await.map_err(|_| PlayerError::Disconnected)?
    }
}

#[async_trait]
impl PlayerClient for MopidyClient {
    async fn current_track(&self) -> PlayerResult<Option<Track>> {
        let value = self.call("core.playback.get_current_track").await?;
        Ok(serde_json::from_value(value)?)
    }

    async fn tracks(&self) -> PlayerResult<Vec<Track>> {
        let value = self.call("core.tracklist.get_tracks").await?;
        // null means "no tracklist" - same thing as empty for us
        Ok(serde_json::from_value::<Option<Vec<Track>>>(value)?.unwrap_or_default())
    }

    async fn index(&self) -> PlayerResult<Option<usize>> {
        let value = self.call("core.tracklist.index").await?;
        Ok(serde_json::from_value(value)?)
    }

    async fn next(&self) -> PlayerResult<()> {
        self.call("core.playback.next").await?;
        Ok(())
    }
}

async fn read_loop(
    mut reader: SplitStream<WsStream>,
    pending: Pending,
    closed: Arc<AtomicBool>,
    events: mpsc::UnboundedSender<PlayerEvent>,
) {
    while let Some(message) = reader.next().await {
        let text = match message {
            Ok(Message::Text(text)) => text,
            Ok(Message::Close(frame)) => {
                debug!("Mopidy sent close: {:?}", frame);
                break;
            }
            Ok(_) => continue,
            Err(e) => {
                warn!("Mopidy connection error: {}", e);
                break;
            }
        };

        match serde_json::from_str::<Value>(&text) {
            Ok(value) => dispatch_frame(value, &pending, &events),
            Err(e) => warn!("Ignoring malformed frame from Mopidy: {}", e),
        }
    }

    // Fail everyone still waiting
    closed.store(true, Ordering::SeqCst);
    pending.lock().unwrap_or_else(|p| p.into_inner()).clear();
    let _ = events.send(PlayerEvent::Offline);
}

fn dispatch_frame(
    value: Value,
    pending: &Pending,
    events: &mpsc::UnboundedSender<PlayerEvent>,
) {
    let frame: Frame = match serde_json::from_value(value.clone()) {
        Ok(frame) => frame,
        Err(e) => {
            warn!("Unrecognised frame from Mopidy: {}", e);
            return;
        }
    };

    if let Some(name) = frame.event {
        let _ = events.send(parse_event(name, value));
        return;
    }

    let Some(id) = frame.id else {
        return;
    };
    let waiter = pending.lock().unwrap_or_else(|p| p.into_inner()).remove(&id);
    let Some(waiter) = waiter else {
        debug!("Response for unknown request id {}", id);
        return;
    };

    let outcome = match frame.error {
        Some(err) => Err(PlayerError::Rpc {
            code: err.code,
            message: err.message,
        }),
        None => Ok(frame.result.unwrap_or(Value::Null)),
    };
    let _ = waiter.send(outcome);
}

pub(crate) fn parse_event(name: String, payload: Value) -> PlayerEvent {
    if name == "track_playback_started" {
        if let Some(tl_track) = payload.get("tl_track") {
            match serde_json::from_value::<TlTrack>(tl_track.clone()) {
                Ok(tl_track) => return PlayerEvent::TrackPlaybackStarted(tl_track),
                Err(e) => warn!("Bad tl_track in track_playback_started: {}", e),
            }
        }
    }
    PlayerEvent::Other { name, payload }
}
