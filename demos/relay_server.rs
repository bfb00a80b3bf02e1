//! Room relay server example
//!
//! Run with: cargo run --example relay_server -- [OPTIONS]
//!
//! Examples:
//!   cargo run --example relay_server                          # binds to 0.0.0.0:8000
//!   cargo run --example relay_server -- --bind localhost:9000
//!   cargo run --example relay_server -- --capacity 5 --replay-history
//!
//! ## Chatting
//!
//! Two clients sharing a room code see each other's messages:
//!
//!   cargo run --example chat_client -- ws://localhost:8000/ws/abc
//!   cargo run --example chat_client -- ws://localhost:8000/ws/abc
//!
//! Any WebSocket client works, e.g. `websocat ws://localhost:8000/ws/abc`.

use std::net::SocketAddr;
use std::time::Duration;

use clap::Parser;

use room_relay::{RelayServer, RoomCode, RoomConfig, ServerConfig};

/// Room-scoped WebSocket relay
#[derive(Debug, Parser)]
#[command(name = "relay_server")]
struct Args {
    /// Address to bind to ("localhost" is accepted)
    #[arg(long, default_value = "0.0.0.0:8000", value_parser = parse_bind_addr)]
    bind: SocketAddr,

    /// Maximum members per room
    #[arg(long, default_value_t = 2)]
    capacity: usize,

    /// Per-peer send timeout in milliseconds
    #[arg(long, default_value_t = 5000)]
    send_timeout_ms: u64,

    /// Frames remembered per room (0 disables history)
    #[arg(long, default_value_t = 100)]
    history: usize,

    /// Replay room history to members as they join
    #[arg(long)]
    replay_history: bool,

    /// Maximum concurrent connections (0 = unlimited)
    #[arg(long, default_value_t = 0)]
    max_connections: usize,
}

/// Parse a bind address, accepting "localhost" and a bare IP.
fn parse_bind_addr(arg: &str) -> Result<SocketAddr, String> {
    const DEFAULT_PORT: u16 = 8000;

    let normalized = arg.replace("localhost", "127.0.0.1");

    if let Ok(addr) = normalized.parse::<SocketAddr>() {
        return Ok(addr);
    }

    if let Ok(ip) = normalized.parse::<std::net::IpAddr>() {
        return Ok(SocketAddr::new(ip, DEFAULT_PORT));
    }

    Err(format!(
        "Invalid bind address: '{}'. Expected format: IP:PORT or IP or 'localhost'",
        arg
    ))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("room_relay=debug".parse()?)
                .add_directive("relay_server=debug".parse()?),
        )
        .init();

    let room_config = RoomConfig::default()
        .capacity(args.capacity)
        .send_timeout(Duration::from_millis(args.send_timeout_ms))
        .history_limit(args.history)
        .replay_history(args.replay_history);

    let config = ServerConfig::default()
        .bind(args.bind)
        .max_connections(args.max_connections)
        .room_config(room_config);

    let server = RelayServer::new(config);

    println!("Starting room relay on {}", server.bind_addr());
    println!();
    println!("Join a room:  ws://{}/ws/<room_code>", server.bind_addr());
    println!("Fresh code:   {}", RoomCode::generate());
    println!();

    server
        .run_until(async {
            let _ = tokio::signal::ctrl_c().await;
            println!("\nShutting down...");
        })
        .await?;

    Ok(())
}
