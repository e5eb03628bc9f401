use mopibot::config::Config;
use mopibot::player::{MopidyClient, PlayerClient};
use mopibot::relay::format;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    println!("🎵 Mopidy Connection Probe");
    println!("==========================");

    // URL from args, else whatever the bot would use
    let url = match std::env::args().nth(1) {
        Some(url) => url,
        None => Config::load(None)?.mopidy.url,
    };

    println!("🔌 Connecting to {}", url);
    let (client, _events) = match MopidyClient::connect(&url).await {
        Ok(connected) => connected,
        Err(e) => {
            println!("❌ {}", e);
            println!("Usage: cargo run --bin mopidy_probe [ws://host:6680/mopidy/ws]");
            return Ok(());
        }
    };

    let current = client.current_track().await?;
    println!("🎧 {}", format::current_track_message(current.as_ref()));

    let tracks = client.tracks().await?;
    if tracks.is_empty() {
        println!("📭 Queue is empty");
        return Ok(());
    }

    let index = client.index().await?;
    println!("📋 {} tracks queued, current index {:?}", tracks.len(), index);
    println!("{}", format::queue_message(&tracks, index));

    Ok(())
}
