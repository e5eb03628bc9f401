// The relay - glue between the player and the chat workspace
// Player notifications become announcements, chat commands become player queries.
// Every chat command ends in exactly one message back, success or apology.

pub mod format;
pub mod router;

pub use format::format_track;
pub use router::{Command, Router};

use crate::chat::{ChatEvent, ChatGateway, IncomingMessage};
use crate::player::{PlayerClient, PlayerEvent, Track};
use anyhow::Result;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

pub const CHANNEL_JOIN_GREETING: &str = "I'm here to save the day!";
pub const DM_GREETING: &str = "Hello!";
pub const SKIP_ACK: &str = "Skipping current song";
pub const QUEUE_EMPTY: &str = "Queue is empty";
pub const CURRENT_TRACK_FAILED: &str = "Could not get current track :(";
pub const QUEUE_FAILED: &str = "Could not get queue :(";

pub struct Relay {
    chat: Arc<dyn ChatGateway>,
    player: Arc<dyn PlayerClient>,
    announce_channel: String,
    router: Router,
}

impl Relay {
    pub fn new(
        chat: Arc<dyn ChatGateway>,
        player: Arc<dyn PlayerClient>,
        announce_channel: impl Into<String>,
    ) -> Result<Self> {
        Ok(Self {
            chat,
            player,
            announce_channel: announce_channel.into(),
            router: Router::new()?,
        })
    }

    pub fn announce_channel(&self) -> &str {
        &self.announce_channel
    }

    /// Event loop: each event gets its own task so a slow player reply
    /// never holds up the next message. Returns once both streams end and
    /// every handler already started has finished.
    pub async fn run(
        self: Arc<Self>,
        mut chat_events: mpsc::UnboundedReceiver<ChatEvent>,
        mut player_events: mpsc::UnboundedReceiver<PlayerEvent>,
    ) {
        let mut chat_open = true;
        let mut player_open = true;
        let mut handlers = JoinSet::new();

        while chat_open || player_open {
            tokio::select! {
                event = chat_events.recv(), if chat_open => match event {
                    Some(event) => {
                        let relay = self.clone();
                        handlers.spawn(async move { relay.handle_chat_event(event).await });
                    }
                    None => chat_open = false,
                },
                event = player_events.recv(), if player_open => match event {
                    Some(event) => {
                        let relay = self.clone();
                        handlers.spawn(async move { relay.handle_player_event(event).await });
                    }
                    None => player_open = false,
                },
                // reap finished handlers so the set doesn't grow forever
                Some(joined) = handlers.join_next(), if !handlers.is_empty() => {
                    if let Err(e) = joined {
                        warn!("Handler task failed: {}", e);
                    }
                }
            }
        }

        while let Some(joined) = handlers.join_next().await {
            if let Err(e) = joined {
                warn!("Handler task failed: {}", e);
            }
        }

        info!("Chat and player streams both ended, relay stopping");
    }

    pub async fn handle_player_event(&self, event: PlayerEvent) {
        debug!("Player event: {:?}", event);

        match event {
            PlayerEvent::Online => info!("Connected to Mopidy"),
            PlayerEvent::Offline => warn!("Lost connection to Mopidy"),
            PlayerEvent::TrackPlaybackStarted(tl_track) => self.announce(&tl_track.track).await,
            PlayerEvent::Other { .. } => {}
        }
    }

    pub async fn handle_chat_event(&self, event: ChatEvent) {
        match event {
            ChatEvent::ConnectionOpened => info!("** The Slack socket just connected!"),
            ChatEvent::ConnectionClosed { reason } => {
                // TODO: reconnect through apps.connections.open instead of going deaf
                warn!("** The Slack socket just closed ({}), not reconnecting", reason);
            }
            ChatEvent::ChannelJoined { channel } => self.say(&channel, CHANNEL_JOIN_GREETING).await,
            ChatEvent::Message(message) => self.handle_message(&message).await,
        }
    }

    pub async fn handle_message(&self, message: &IncomingMessage) {
        let Some(command) = self.router.route(message) else {
            return;
        };
        debug!("{:?} from {:?} in {}", command, message.user, message.channel);

        match command {
            Command::Greet => self.reply(message, DM_GREETING).await,
            Command::CurrentTrack => self.current_track(&message.channel).await,
            Command::ShowQueue => self.show_queue(&message.channel).await,
            Command::Skip => self.skip(message).await,
        }
    }

    pub async fn announce(&self, track: &Track) {
        let text = format::playing_message(track);
        info!("{}", text);
        self.say(&self.announce_channel, &text).await;
    }

    pub async fn current_track(&self, channel: &str) {
        let text = match self.player.current_track().await {
            Ok(track) => {
                let text = format::current_track_message(track.as_ref());
                info!("Current track: {}", text);
                text
            }
            Err(e) => {
                warn!("Could not get current track: {}", e);
                CURRENT_TRACK_FAILED.to_string()
            }
        };
        self.say(channel, &text).await;
    }

    /// Tracklist first; the index is only asked for when there is something queued
    pub async fn show_queue(&self, channel: &str) {
        let text = match self.fetch_queue().await {
            Ok(text) => text,
            Err(e) => {
                warn!("Could not get queue: {}", e);
                QUEUE_FAILED.to_string()
            }
        };
        self.say(channel, &text).await;
    }

    async fn fetch_queue(&self) -> Result<String> {
        let tracks = self.player.tracks().await?;
        if tracks.is_empty() {
            return Ok(QUEUE_EMPTY.to_string());
        }
        debug!("Tracklist has {} entries", tracks.len());

        let index = self.player.index().await?;
        debug!("Got index: {:?}", index);
        Ok(format::queue_message(&tracks, index))
    }

    /// Acknowledge first, then skip - the outcome of `next` is never reported
    pub async fn skip(&self, message: &IncomingMessage) {
        info!("Skipping song");
        self.reply(message, SKIP_ACK).await;

        if let Err(e) = self.player.next().await {
            warn!("Skip failed: {}", e);
        }
    }

    async fn say(&self, channel: &str, text: &str) {
        if let Err(e) = self.chat.send(channel, text).await {
            warn!("Failed to send to {}: {}", channel, e);
        }
    }

    async fn reply(&self, message: &IncomingMessage, text: &str) {
        if let Err(e) = self.chat.reply(message, text).await {
            warn!("Failed to reply in {}: {}", message.channel, e);
        }
    }
}
