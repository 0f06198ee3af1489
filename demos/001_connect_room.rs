//! Room connection demonstration.
//!
//! Demonstrates:
//! - Building connection settings
//! - Resolving a room's push channel and connecting
//! - Consuming connection events until the stream ends
//!
//! Usage:
//!   cargo run --example 001_connect_room -- <room_id>
//!   cargo run --example 001_connect_room -- <room_id> --debug

mod common;

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use common::Args;
use webcast_live::{ConnectionEvent, ConnectionSettings, Result, WebcastClient};

// ============================================================================
// Constants
// ============================================================================

const DEFAULT_ROOM_ID: &str = "7301234567890123456";
const MAX_EVENTS: usize = 50;

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() {
    let args = Args::parse();
    common::init_logging(args.debug);

    if let Err(e) = run(args).await {
        eprintln!("\n[ERROR] {e}");
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<()> {
    println!("=== 001: Connect Room ===\n");

    let room_id = args.first_or(DEFAULT_ROOM_ID);

    let settings = ConnectionSettings::builder()
        .timeout(Duration::from_secs(20))
        .socket_buffer_size(200_000)
        .build()?;

    let client = WebcastClient::new(settings)?;
    println!("[1] Client #{} created", client.seq());

    let mut connection = client.connect_room(&room_id).await?;
    println!("[2] Connected to room {room_id}");

    let mut seen = 0;
    while let Some(event) = connection.next_event().await {
        match event {
            ConnectionEvent::Message(message) => {
                for item in &message.response.messages {
                    println!("    {} ({} bytes)", item.r#type, item.binary.len());
                }
                seen += 1;
            }
            ConnectionEvent::FrameError(e) => println!("    skipped frame: {e}"),
            ConnectionEvent::Closed => {
                println!("[3] Connection closed");
                break;
            }
            ConnectionEvent::Failed(e) => return Err(e),
        }

        if seen >= MAX_EVENTS {
            connection.disconnect().await?;
        }
    }

    println!("\n=== Done: {seen} batches ===");
    Ok(())
}
