// Slack adapter - Socket Mode for events in, Web API for messages out
// Envelopes are acked as soon as they arrive, before the relay sees them

use super::{ChatError, ChatEvent, ChatGateway, ChatResult, IncomingMessage, MessageContext};
use crate::config::SlackCredentials;
use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use regex::Regex;
use serde_json::{json, Value};
use std::sync::OnceLock;
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

pub const DEFAULT_API_BASE: &str = "https://slack.com/api";

/// Slack workspace connection: Socket Mode for inbound events, Web API for sending.
pub struct SlackClient {
    http: reqwest::Client,
    api_base: String,
    credentials: SlackCredentials,
    bot_user_id: String,
}

impl SlackClient {
    /// Checks the bot token and learns which user the bot is.
    pub async fn connect(api_base: &str, credentials: SlackCredentials) -> ChatResult<Self> {
        let mut client = Self {
            http: reqwest::Client::new(),
            api_base: api_base.trim_end_matches('/').to_string(),
            credentials,
            bot_user_id: String::new(),
        };

        let auth = client
            .api_call("auth.test", &client.credentials.bot_token, json!({}))
            .await?;
        client.bot_user_id = auth
            .get("user_id")
            .and_then(Value::as_str)
            .ok_or_else(|| ChatError::Api("auth.test returned no user_id".to_string()))?
            .to_string();

        info!("Authenticated with Slack as {}", client.bot_user_id);
        Ok(client)
    }

    /// Run the Socket Mode loop until the connection drops.
    ///
    /// There is no reconnect here: once Slack closes the socket this returns
    /// and the caller decides what to do.
    pub async fn run(&self, events: mpsc::UnboundedSender<ChatEvent>) -> ChatResult<()> {
        let opened = self
            .api_call("apps.connections.open", &self.credentials.app_token, json!({}))
            .await?;
        let url = opened
            .get("url")
            .and_then(Value::as_str)
            .ok_or_else(|| ChatError::Api("apps.connections.open returned no url".to_string()))?;

        let (stream, _) = connect_async(url)
            .await
            .map_err(|e| ChatError::Socket(e.to_string()))?;
        let (mut sink, mut reader) = stream.split();

        let mut reason = "socket closed".to_string();
        while let Some(message) = reader.next().await {
            let text = match message {
                Ok(Message::Text(text)) => text,
                Ok(Message::Close(frame)) => {
                    if let Some(frame) = frame {
                        reason = frame.reason.to_string();
                    }
                    break;
                }
                Ok(_) => continue,
                Err(e) => {
                    reason = e.to_string();
                    break;
                }
            };

            let envelope: Value = match serde_json::from_str(&text) {
                Ok(v) => v,
                Err(e) => {
                    warn!("Ignoring malformed envelope from Slack: {}", e);
                    continue;
                }
            };

            let translated = translate_envelope(&envelope, &self.bot_user_id);
            if let Some(envelope_id) = translated.ack {
                let ack = json!({ "envelope_id": envelope_id }).to_string();
                if let Err(e) = sink.send(Message::Text(ack)).await {
                    warn!("Failed to acknowledge envelope {}: {}", envelope_id, e);
                }
            }

            if let Some(event) = translated.event {
                let closing = matches!(event, ChatEvent::ConnectionClosed { .. });
                if events.send(event).is_err() || closing {
                    return Ok(());
                }
            }
        }

        let _ = events.send(ChatEvent::ConnectionClosed { reason });
        Ok(())
    }

    async fn api_call(&self, method: &str, token: &str, body: Value) -> ChatResult<Value> {
        let url = format!("{}/{}", self.api_base, method);
        debug!("-> slack {}", method);

        let response: Value = self
            .http
            .post(url)
            .bearer_auth(token)
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        check_ok(response)
    }
}

#[async_trait]
impl ChatGateway for SlackClient {
    async fn send(&self, channel: &str, text: &str) -> ChatResult<()> {
        self.api_call(
            "chat.postMessage",
            &self.credentials.bot_token,
            json!({ "channel": channel, "text": text }),
        )
        .await?;
        Ok(())
    }
}

fn check_ok(response: Value) -> ChatResult<Value> {
    if response.get("ok").and_then(Value::as_bool) == Some(true) {
        return Ok(response);
    }
    let error = response
        .get("error")
        .and_then(Value::as_str)
        .unwrap_or("unknown_error");
    Err(ChatError::Api(error.to_string()))
}

#[derive(Debug, Default, PartialEq)]
pub(crate) struct Translated {
    pub ack: Option<String>,
    pub event: Option<ChatEvent>,
}

/// Turn one Socket Mode envelope into the ack it needs and the event it carries.
pub(crate) fn translate_envelope(envelope: &Value, bot_user_id: &str) -> Translated {
    let kind = envelope.get("type").and_then(Value::as_str).unwrap_or("");
    let ack = envelope
        .get("envelope_id")
        .and_then(Value::as_str)
        .map(str::to_string);

    let event = match kind {
        "hello" => Some(ChatEvent::ConnectionOpened),
        "disconnect" => Some(ChatEvent::ConnectionClosed {
            reason: envelope
                .get("reason")
                .and_then(Value::as_str)
                .unwrap_or("disconnect")
                .to_string(),
        }),
        "events_api" => envelope
            .pointer("/payload/event")
            .and_then(|event| translate_event(event, bot_user_id)),
        other => {
            debug!("Unhandled envelope type {:?}", other);
            None
        }
    };

    Translated { ack, event }
}

fn translate_event(event: &Value, bot_user_id: &str) -> Option<ChatEvent> {
    let field = |name: &str| event.get(name).and_then(Value::as_str);

    match field("type")? {
        "member_joined_channel" => {
            if field("user")? != bot_user_id {
                return None;
            }
            Some(ChatEvent::ChannelJoined {
                channel: field("channel")?.to_string(),
            })
        }
        kind @ ("message" | "app_mention") => {
            // Edits, joins and the like carry a subtype; bots carry a bot_id
            if event.get("subtype").is_some() || event.get("bot_id").is_some() {
                return None;
            }
            let user = field("user").map(str::to_string);
            if user.as_deref() == Some(bot_user_id) {
                return None;
            }

            let context = if kind == "app_mention" {
                MessageContext::DirectMention
            } else if field("channel_type") == Some("im") {
                MessageContext::DirectMessage
            } else {
                MessageContext::Ambient
            };

            let raw = field("text").unwrap_or("");
            let text = match context {
                MessageContext::DirectMention => strip_mention(raw),
                _ => raw.trim().to_string(),
            };

            Some(ChatEvent::Message(IncomingMessage {
                channel: field("channel")?.to_string(),
                user,
                text,
                context,
            }))
        }
        _ => None,
    }
}

/// Drop the leading `<@U123>` (and an optional colon) from a mention
fn strip_mention(text: &str) -> String {
    static MENTION: OnceLock<Option<Regex>> = OnceLock::new();
    let mention = MENTION.get_or_init(|| Regex::new(r"^\s*<@[A-Z0-9]+(?:\|[^>]*)?>:?\s*").ok());
    match mention {
        Some(re) => re.replace(text, "").trim().to_string(),
        None => text.trim().to_string(),
    }
}
