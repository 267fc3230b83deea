use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use reqwest::Url;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, info, warn};

use crate::errors::RealtimeError;
use crate::realtime::phoenix::{PhoenixMessage, RefCounter, PHX_CLOSE, PHX_ERROR};
use crate::realtime::{ChangeEvent, ChangeFeed, ChangeFilter, Subscription};

pub const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);
pub const JOIN_TIMEOUT: Duration = Duration::from_secs(10);
pub const RECONNECT_ATTEMPTS: u32 = 5;
pub const RECONNECT_BASE_DELAY: Duration = Duration::from_secs(1);
const RECONNECT_MAX_DELAY: Duration = Duration::from_secs(10);
const PROTOCOL_VERSION: &str = "1.0.0";

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;
type SocketSink = SplitSink<Socket, Message>;
type SocketStream = SplitStream<Socket>;

/// How a subscription recovers from a dropped connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    /// Consecutive failed attempts before the subscription gives up.
    pub max_attempts: u32,
    /// Delay before the first attempt; doubles per attempt up to 10 s.
    pub base_delay: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            max_attempts: RECONNECT_ATTEMPTS,
            base_delay: RECONNECT_BASE_DELAY,
        }
    }
}

/// Postgres change feed over the Supabase realtime websocket.
///
/// Each subscription opens its own socket, joins one channel, keeps it
/// alive with heartbeats, rejoins after a dropped connection and leaves the
/// channel on teardown.
#[derive(Debug, Clone)]
pub struct SupabaseRealtime {
    socket_url: String,
    api_key: String,
    heartbeat_interval: Duration,
    reconnect: ReconnectPolicy,
}

impl SupabaseRealtime {
    pub fn new(project_url: &str, api_key: impl Into<String>) -> Result<Self, RealtimeError> {
        let api_key = api_key.into();
        Ok(Self {
            socket_url: websocket_url(project_url, &api_key)?,
            api_key,
            heartbeat_interval: HEARTBEAT_INTERVAL,
            reconnect: ReconnectPolicy::default(),
        })
    }

    pub fn with_heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_interval = interval;
        self
    }

    pub fn with_reconnect(mut self, reconnect: ReconnectPolicy) -> Self {
        self.reconnect = reconnect;
        self
    }

    pub fn socket_url(&self) -> &str {
        &self.socket_url
    }
}

/// `https://x.supabase.co` becomes `wss://x.supabase.co/realtime/v1/websocket?apikey=…&vsn=1.0.0`.
pub fn websocket_url(project_url: &str, api_key: &str) -> Result<String, RealtimeError> {
    let invalid = || RealtimeError::InvalidUrl(project_url.to_string());

    let mut url = Url::parse(project_url.trim()).map_err(|_| invalid())?;
    let scheme = match url.scheme() {
        "https" | "wss" => "wss",
        "http" | "ws" => "ws",
        _ => return Err(invalid()),
    };
    url.set_scheme(scheme).map_err(|_| invalid())?;
    url.path_segments_mut()
        .map_err(|_| invalid())?
        .pop_if_empty()
        .extend(["realtime", "v1", "websocket"]);
    url.set_fragment(None);
    url.query_pairs_mut()
        .clear()
        .append_pair("apikey", api_key)
        .append_pair("vsn", PROTOCOL_VERSION);
    Ok(url.into())
}

#[async_trait]
impl ChangeFeed for SupabaseRealtime {
    async fn subscribe(&self, filter: ChangeFilter) -> Result<Subscription, RealtimeError> {
        let mut refs = RefCounter::default();
        let (sink, stream) =
            connect_and_join(&self.socket_url, &self.api_key, &filter, &mut refs).await?;

        let driver = Driver {
            sink,
            stream,
            topic: PhoenixMessage::topic_for(&filter.channel),
            refs,
            filter: filter.clone(),
            socket_url: self.socket_url.clone(),
            api_key: self.api_key.clone(),
            heartbeat_interval: self.heartbeat_interval,
            reconnect: self.reconnect,
        };
        Ok(Subscription::spawn(filter.channel, move |shutdown, events| {
            driver.run(shutdown, events)
        }))
    }
}

/// Opens a socket and joins the filter's channel, waiting for the server's ok.
async fn connect_and_join(
    socket_url: &str,
    api_key: &str,
    filter: &ChangeFilter,
    refs: &mut RefCounter,
) -> Result<(SocketSink, SocketStream), RealtimeError> {
    let (socket, _response) = connect_async(socket_url).await?;
    let (mut sink, mut stream) = socket.split();

    let join_ref = refs.next();
    send_frame(&mut sink, &PhoenixMessage::join(filter, api_key, join_ref.clone())).await?;

    tokio::time::timeout(JOIN_TIMEOUT, await_join_reply(&mut stream, &join_ref))
        .await
        .map_err(|_| RealtimeError::JoinRejected("no reply to join".to_string()))??;

    info!(
        topic = %PhoenixMessage::topic_for(&filter.channel),
        table = %filter.table,
        "Subscribed to realtime channel"
    );
    Ok((sink, stream))
}

async fn send_frame(sink: &mut SocketSink, frame: &PhoenixMessage) -> Result<(), RealtimeError> {
    sink.send(Message::Text(serde_json::to_string(frame)?)).await?;
    Ok(())
}

async fn await_join_reply(stream: &mut SocketStream, join_ref: &str) -> Result<(), RealtimeError> {
    while let Some(frame) = stream.next().await {
        match frame? {
            Message::Text(text) => {
                let Ok(message) = serde_json::from_str::<PhoenixMessage>(&text) else {
                    continue;
                };
                if !message.is_reply_to(join_ref) {
                    continue;
                }
                return match message.reply_status() {
                    Some("ok") => Ok(()),
                    _ => Err(RealtimeError::JoinRejected(
                        message
                            .payload
                            .get("response")
                            .map(|r| r.to_string())
                            .unwrap_or_default(),
                    )),
                };
            }
            Message::Close(_) => return Err(RealtimeError::Closed),
            _ => {}
        }
    }
    Err(RealtimeError::Closed)
}

/// Why one connection's pump loop returned.
enum Exit {
    Shutdown,
    ConsumerGone,
    Disconnected,
}

struct Driver {
    sink: SocketSink,
    stream: SocketStream,
    topic: String,
    refs: RefCounter,
    filter: ChangeFilter,
    socket_url: String,
    api_key: String,
    heartbeat_interval: Duration,
    reconnect: ReconnectPolicy,
}

impl Driver {
    async fn run(mut self, mut shutdown: oneshot::Receiver<()>, events: mpsc::Sender<ChangeEvent>) {
        loop {
            match self.pump(&mut shutdown, &events).await {
                Exit::Shutdown | Exit::ConsumerGone => return,
                Exit::Disconnected => {}
            }
            if !self.rejoin(&mut shutdown).await {
                return;
            }
        }
    }

    async fn pump(
        &mut self,
        shutdown: &mut oneshot::Receiver<()>,
        events: &mpsc::Sender<ChangeEvent>,
    ) -> Exit {
        let mut heartbeat = tokio::time::interval_at(
            Instant::now() + self.heartbeat_interval,
            self.heartbeat_interval,
        );

        loop {
            tokio::select! {
                _ = &mut *shutdown => {
                    self.leave().await;
                    return Exit::Shutdown;
                }
                _ = heartbeat.tick() => {
                    let frame = PhoenixMessage::heartbeat(self.refs.next());
                    if let Err(err) = send_frame(&mut self.sink, &frame).await {
                        warn!(topic = %self.topic, "Realtime heartbeat failed: {err}");
                        return Exit::Disconnected;
                    }
                }
                frame = self.stream.next() => match frame {
                    Some(Ok(Message::Text(text))) => {
                        if let Some(exit) = self.handle_text(&text, events).await {
                            return exit;
                        }
                    }
                    Some(Ok(Message::Close(close))) => {
                        warn!(topic = %self.topic, ?close, "Realtime server closed the connection");
                        return Exit::Disconnected;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(err)) => {
                        warn!(topic = %self.topic, "Realtime socket error: {err}");
                        return Exit::Disconnected;
                    }
                    None => {
                        warn!(topic = %self.topic, "Realtime connection ended");
                        return Exit::Disconnected;
                    }
                },
            }
        }
    }

    /// Returns `Some` when the current connection should stop.
    async fn handle_text(&mut self, text: &str, events: &mpsc::Sender<ChangeEvent>) -> Option<Exit> {
        let message = match serde_json::from_str::<PhoenixMessage>(text) {
            Ok(message) => message,
            Err(err) => {
                debug!("Ignoring unparseable realtime frame: {err}");
                return None;
            }
        };

        if message.topic == self.topic && (message.event == PHX_ERROR || message.event == PHX_CLOSE)
        {
            warn!(topic = %self.topic, event = %message.event, "Realtime channel closed by server");
            return Some(Exit::Disconnected);
        }

        match message.change_event() {
            Some(event) if self.filter.matches(&event) => {
                debug!(topic = %self.topic, table = %event.table, "Realtime change received");
                match events.send(event).await {
                    Ok(()) => None,
                    Err(_) => Some(Exit::ConsumerGone),
                }
            }
            _ => None,
        }
    }

    /// Reconnects and rejoins with exponential backoff. Returns `false` when
    /// the budget is spent or the subscription was shut down meanwhile.
    async fn rejoin(&mut self, shutdown: &mut oneshot::Receiver<()>) -> bool {
        let mut delay = self.reconnect.base_delay;
        for attempt in 1..=self.reconnect.max_attempts {
            tokio::select! {
                _ = &mut *shutdown => return false,
                _ = tokio::time::sleep(delay) => {}
            }

            let result = tokio::select! {
                _ = &mut *shutdown => return false,
                result = connect_and_join(&self.socket_url, &self.api_key, &self.filter, &mut self.refs) => result,
            };
            match result {
                Ok((sink, stream)) => {
                    self.sink = sink;
                    self.stream = stream;
                    info!(topic = %self.topic, attempt, "Realtime channel rejoined");
                    return true;
                }
                Err(err) => {
                    warn!(
                        topic = %self.topic,
                        "Realtime reconnect failed ({attempt}/{}): {err}",
                        self.reconnect.max_attempts
                    );
                }
            }
            delay = (delay * 2).min(RECONNECT_MAX_DELAY);
        }
        error!(topic = %self.topic, "Giving up on realtime channel");
        false
    }

    async fn leave(&mut self) {
        let frame = PhoenixMessage::leave(&self.topic, self.refs.next());
        if let Err(err) = send_frame(&mut self.sink, &frame).await {
            debug!(topic = %self.topic, "Could not send leave: {err}");
        }
        if let Err(err) = self.sink.close().await {
            debug!(topic = %self.topic, "Could not close realtime socket: {err}");
        }
        info!(topic = %self.topic, "Left realtime channel");
    }
}
