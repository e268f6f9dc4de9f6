//! Connects to a name game server and logs every message it sends.
//!
//! ```text
//! namegame-watch [--display] [ws://host:port/path]
//! ```
//!
//! Without `--display` the player channel is watched; with it, the
//! submission display channel. Logging follows `RUST_LOG`.

use namegame::prelude::*;
use tracing::info;

const DEFAULT_PLAYER_URL: &str = "ws://localhost:8080/ws/player";
const DEFAULT_DISPLAY_URL: &str = "ws://localhost:8080/ws/display";

#[tokio::main]
async fn main() -> Result<(), NamegameError> {
    namegame::init_logging()?;

    let args: Vec<String> = std::env::args().skip(1).collect();
    let display = args.iter().any(|a| a == "--display");
    let url = args
        .iter()
        .find(|a| !a.starts_with("--"))
        .map(String::as_str)
        .unwrap_or(if display { DEFAULT_DISPLAY_URL } else { DEFAULT_PLAYER_URL });
    let endpoint = Endpoint::parse(url)?;

    let is_display = display;
    info!(%endpoint, display = is_display, "watching");

    if display {
        let conn = watch::<SubmissionMessage>(endpoint);
        wait_for_ctrl_c().await;
        conn.shutdown()?;
    } else {
        let conn = watch::<GameMessage>(endpoint);
        wait_for_ctrl_c().await;
        conn.shutdown()?;
    }
    Ok(())
}

fn watch<M: Message>(endpoint: Endpoint) -> ResilientConnection<M> {
    ResilientConnection::<M>::builder(endpoint)
        .on_open(|| info!("connected"))
        .on_close(|| info!("disconnected"))
        .on_message(|msg| info!(channel = M::CHANNEL, ?msg, "message"))
        .spawn()
}

async fn wait_for_ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "cannot listen for ctrl-c, exiting");
    }
}
