//! URL signing demonstration.
//!
//! Demonstrates:
//! - Signing a push URL with the default client parameters
//! - The shared `User-Agent` switching to the signed identity
//!
//! Usage:
//!   cargo run --example 002_sign_url
//!   cargo run --example 002_sign_url -- --debug

mod common;

// ============================================================================
// Imports
// ============================================================================

use common::Args;
use webcast_live::{ConnectionSettings, Result, WebcastClient};

// ============================================================================
// Constants
// ============================================================================

const PUSH_URL: &str = "wss://webcast16-ws-useast1a.tiktok.com/webcast/im/push/";

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() {
    let args = Args::parse();
    common::init_logging(args.debug);

    if let Err(e) = run().await {
        eprintln!("\n[ERROR] {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    println!("=== 002: Sign URL ===\n");

    let client = WebcastClient::new(ConnectionSettings::default())?;
    println!("[1] User-Agent before: {}", client.headers().user_agent());

    let params = client.http().client_params().with("room_id", "7301234567890123456");
    let signed = client.http().signer().sign(PUSH_URL, Some(&params)).await?;

    println!("[2] Signed URL: {}", signed.signed_url);
    println!("[3] User-Agent after: {}", client.headers().user_agent());

    Ok(())
}
