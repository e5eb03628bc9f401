// End-to-end behaviour of the relay against in-memory chat and player fakes

use async_trait::async_trait;
use mopibot::chat::{ChatError, ChatEvent, ChatGateway, ChatResult, IncomingMessage, MessageContext};
use mopibot::player::{PlayerClient, PlayerError, PlayerEvent, PlayerResult, TlTrack, Track};
use mopibot::Relay;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

const ANNOUNCE: &str = "CANNOUNCE";

#[derive(Default)]
struct FakeChat {
    sent: Mutex<Vec<(String, String)>>,
    fail: bool,
    // simulated web api latency
    delay: Option<Duration>,
}

impl FakeChat {
    fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatGateway for FakeChat {
    async fn send(&self, channel: &str, text: &str) -> ChatResult<()> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.sent
            .lock()
            .unwrap()
            .push((channel.to_string(), text.to_string()));
        if self.fail {
            return Err(ChatError::Api("channel_not_found".into()));
        }
        Ok(())
    }
}

#[derive(Default)]
struct FakePlayer {
    current: Option<Track>,
    tracks: Vec<Track>,
    index: Option<usize>,
    fail_current: bool,
    fail_tracks: bool,
    fail_index: bool,
    fail_next: bool,
    index_calls: AtomicUsize,
    next_calls: AtomicUsize,
}

fn rpc_failure() -> PlayerError {
    PlayerError::Rpc {
        code: -32000,
        message: "boom".into(),
    }
}

#[async_trait]
impl PlayerClient for FakePlayer {
    async fn current_track(&self) -> PlayerResult<Option<Track>> {
        if self.fail_current {
            return Err(PlayerError::Disconnected);
        }
        Ok(self.current.clone())
    }

    async fn tracks(&self) -> PlayerResult<Vec<Track>> {
        if self.fail_tracks {
            return Err(rpc_failure());
        }
        Ok(self.tracks.clone())
    }

    async fn index(&self) -> PlayerResult<Option<usize>> {
        self.index_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_index {
            return Err(rpc_failure());
        }
        Ok(self.index)
    }

    async fn next(&self) -> PlayerResult<()> {
        self.next_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_next {
            return Err(rpc_failure());
        }
        Ok(())
    }
}

fn setup(player: FakePlayer) -> (Relay, Arc<FakeChat>, Arc<FakePlayer>) {
    let chat = Arc::new(FakeChat::default());
    let player = Arc::new(player);
    let relay = Relay::new(chat.clone(), player.clone(), ANNOUNCE).unwrap();
    (relay, chat, player)
}

fn message(text: &str, context: MessageContext) -> IncomingMessage {
    IncomingMessage {
        channel: "D42".into(),
        user: Some("U1".into()),
        text: text.into(),
        context,
    }
}

fn letters(names: &[&str]) -> Vec<Track> {
    names.iter().map(|n| Track::new(*n, &["Artist"])).collect()
}

fn numbered(tracks: &[Track]) -> String {
    tracks
        .iter()
        .enumerate()
        .map(|(i, t)| format!("{}. {} - {}", i + 1, t.artists[0].name, t.name))
        .collect::<Vec<_>>()
        .join("\n")
}

#[tokio::test]
async fn test_playback_started_announces_once() {
    let (relay, chat, _) = setup(FakePlayer::default());
    let tl_track = TlTrack {
        tlid: 3,
        track: Track::new("Gold", &["Spandau Ballet"]),
    };

    relay
        .handle_player_event(PlayerEvent::TrackPlaybackStarted(tl_track))
        .await;

    assert_eq!(
        chat.sent(),
        vec![(ANNOUNCE.to_string(), "Playing: Spandau Ballet - Gold".to_string())]
    );
}

#[tokio::test]
async fn test_failed_announcement_is_not_retried() {
    let chat = Arc::new(FakeChat {
        fail: true,
        ..Default::default()
    });
    let relay = Relay::new(chat.clone(), Arc::new(FakePlayer::default()), ANNOUNCE).unwrap();

    relay.announce(&Track::new("Nameless", &[])).await;

    assert_eq!(
        chat.sent(),
        vec![(ANNOUNCE.to_string(), "Playing: Unknown Artist - Nameless".to_string())]
    );
}

#[tokio::test]
async fn test_other_player_events_are_silent() {
    let (relay, chat, _) = setup(FakePlayer::default());
    relay.handle_player_event(PlayerEvent::Online).await;
    relay.handle_player_event(PlayerEvent::Offline).await;
    relay
        .handle_player_event(PlayerEvent::Other {
            name: "volume_changed".into(),
            payload: serde_json::json!({"volume": 10}),
        })
        .await;
    assert!(chat.sent().is_empty());
}

#[tokio::test]
async fn test_current_track_replies_in_origin_channel() {
    let (relay, chat, _) = setup(FakePlayer {
        current: Some(Track::new("Heavy Is the Crown", &["Linkin Park"])),
        ..Default::default()
    });

    relay
        .handle_message(&message("current song", MessageContext::DirectMention))
        .await;

    assert_eq!(
        chat.sent(),
        vec![(
            "D42".to_string(),
            "Currently playing: Linkin Park - Heavy Is the Crown".to_string()
        )]
    );
}

#[tokio::test]
async fn test_current_track_nothing_playing() {
    let (relay, chat, _) = setup(FakePlayer::default());
    relay
        .handle_message(&message("current", MessageContext::DirectMessage))
        .await;
    assert_eq!(chat.sent()[0].1, "Currently playing: Nothing");
}

#[tokio::test]
async fn test_current_track_failure_apologises() {
    let (relay, chat, _) = setup(FakePlayer {
        fail_current: true,
        ..Default::default()
    });
    relay
        .handle_message(&message("current", MessageContext::DirectMessage))
        .await;
    assert_eq!(
        chat.sent(),
        vec![("D42".to_string(), "Could not get current track :(".to_string())]
    );
}

#[tokio::test]
async fn test_queue_shows_next_five() {
    let tracks = letters(&["0", "1", "2", "3", "4", "5", "6", "7", "8", "9"]);
    let (relay, chat, _) = setup(FakePlayer {
        tracks: tracks.clone(),
        index: Some(2),
        ..Default::default()
    });

    relay
        .handle_message(&message("queue", MessageContext::DirectMessage))
        .await;

    let expected = format!("Here is the queue:\n{}", numbered(&tracks[3..8]));
    assert_eq!(chat.sent(), vec![("D42".to_string(), expected)]);
}

#[tokio::test]
async fn test_queue_near_the_end() {
    let tracks = letters(&["A", "B", "C", "D", "E", "F", "G"]);
    let (relay, chat, _) = setup(FakePlayer {
        tracks,
        index: Some(5),
        ..Default::default()
    });

    relay.show_queue("C1").await;

    assert_eq!(
        chat.sent(),
        vec![("C1".to_string(), "Here is the queue:\n1. Artist - G".to_string())]
    );
}

#[tokio::test]
async fn test_empty_queue_skips_index_request() {
    let (relay, chat, player) = setup(FakePlayer {
        fail_index: true,
        ..Default::default()
    });

    relay
        .handle_message(&message("show queue", MessageContext::DirectMention))
        .await;

    assert_eq!(chat.sent(), vec![("D42".to_string(), "Queue is empty".to_string())]);
    assert_eq!(player.index_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_queue_failures_share_one_apology() {
    let (relay, chat, _) = setup(FakePlayer {
        fail_tracks: true,
        ..Default::default()
    });
    relay.show_queue("C1").await;
    assert_eq!(chat.sent(), vec![("C1".to_string(), "Could not get queue :(".to_string())]);

    let (relay, chat, player) = setup(FakePlayer {
        tracks: letters(&["A", "B"]),
        fail_index: true,
        ..Default::default()
    });
    relay.show_queue("C1").await;
    assert_eq!(chat.sent(), vec![("C1".to_string(), "Could not get queue :(".to_string())]);
    assert_eq!(player.index_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_skip_acknowledges_even_when_next_fails() {
    for fail_next in [false, true] {
        let (relay, chat, player) = setup(FakePlayer {
            fail_next,
            ..Default::default()
        });

        relay
            .handle_message(&message("next", MessageContext::DirectMessage))
            .await;

        assert_eq!(
            chat.sent(),
            vec![("D42".to_string(), "Skipping current song".to_string())]
        );
        assert_eq!(player.next_calls.load(Ordering::SeqCst), 1);
    }
}

#[tokio::test]
async fn test_greetings() {
    let (relay, chat, _) = setup(FakePlayer::default());

    relay
        .handle_chat_event(ChatEvent::ChannelJoined {
            channel: "C9".into(),
        })
        .await;
    relay
        .handle_message(&message("hello", MessageContext::DirectMessage))
        .await;

    assert_eq!(
        chat.sent(),
        vec![
            ("C9".to_string(), "I'm here to save the day!".to_string()),
            ("D42".to_string(), "Hello!".to_string()),
        ]
    );
}

#[tokio::test]
async fn test_unrouted_messages_get_no_reply() {
    let (relay, chat, player) = setup(FakePlayer::default());

    relay
        .handle_message(&message("skip", MessageContext::Ambient))
        .await;
    relay
        .handle_message(&message("hello", MessageContext::DirectMention))
        .await;
    relay
        .handle_chat_event(ChatEvent::ConnectionClosed {
            reason: "refresh".into(),
        })
        .await;

    assert!(chat.sent().is_empty());
    assert_eq!(player.next_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_run_waits_for_slow_handlers() {
    let chat = Arc::new(FakeChat {
        delay: Some(Duration::from_millis(50)),
        ..Default::default()
    });
    let player = Arc::new(FakePlayer {
        current: Some(Track::new("Gold", &["Spandau Ballet"])),
        ..Default::default()
    });
    let relay = Arc::new(Relay::new(chat.clone(), player, ANNOUNCE).unwrap());

    let (chat_tx, chat_rx) = mpsc::unbounded_channel();
    let (player_tx, player_rx) = mpsc::unbounded_channel();

    chat_tx
        .send(ChatEvent::Message(message("current", MessageContext::DirectMessage)))
        .unwrap();
    player_tx
        .send(PlayerEvent::TrackPlaybackStarted(TlTrack {
            tlid: 1,
            track: Track::new("Gold", &["Spandau Ballet"]),
        }))
        .unwrap();
    drop(chat_tx);
    drop(player_tx);

    // streams are already closed; the sends are still sleeping when they end
    relay.run(chat_rx, player_rx).await;

    let mut sent = chat.sent();
    sent.sort();
    assert_eq!(
        sent,
        vec![
            (ANNOUNCE.to_string(), "Playing: Spandau Ballet - Gold".to_string()),
            ("D42".to_string(), "Currently playing: Spandau Ballet - Gold".to_string()),
        ]
    );
}
