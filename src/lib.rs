// mopibot library - Slack <-> Mopidy relay
// Collaborators sit behind traits so the relay can be driven by fakes in tests

pub mod chat;    // slack socket mode + web api
pub mod config;  // toml file + environment
pub mod player;  // mopidy json-rpc over websocket
pub mod relay;   // formatting, routing, handlers

// Export the stuff the binaries actually use
pub use chat::{ChatEvent, ChatGateway, IncomingMessage, MessageContext, SlackClient};
pub use config::Config;
pub use player::{MopidyClient, PlayerClient, PlayerEvent, Track};
pub use relay::{format_track, Relay};
