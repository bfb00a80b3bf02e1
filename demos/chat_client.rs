//! Terminal chat client example
//!
//! Run with: cargo run --example chat_client -- ws://localhost:8000/ws/abc
//!
//! Lines typed on stdin are sent to the room; messages from other members
//! are printed as they arrive.

use clap::Parser;
use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

/// Join a relay room from the terminal
#[derive(Debug, Parser)]
#[command(name = "chat_client")]
struct Args {
    /// Room URL, e.g. ws://localhost:8000/ws/abc
    url: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let (ws, _) = connect_async(args.url.as_str()).await?;
    let (mut write, mut read) = ws.split();
    println!("Connected to {}", args.url);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            line = lines.next_line() => match line? {
                Some(line) if !line.is_empty() => write.send(Message::text(line)).await?,
                Some(_) => {}
                None => {
                    write.send(Message::Close(None)).await?;
                    break;
                }
            },
            msg = read.next() => match msg {
                Some(Ok(Message::Text(text))) => println!("> {}", text),
                Some(Ok(Message::Binary(data))) => println!("> <{} bytes>", data.len()),
                Some(Ok(Message::Close(frame))) => {
                    match frame {
                        Some(frame) => println!("Closed by server: {} ({})", frame.reason, frame.code),
                        None => println!("Closed by server"),
                    }
                    break;
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    tracing::debug!(error = %e, "Connection error");
                    break;
                }
                None => break,
            },
        }
    }

    Ok(())
}
