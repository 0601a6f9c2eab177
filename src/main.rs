//! Matrix push gateway (UnifiedPush "Matrix" distributor endpoint).
//!
//! # Architecture Overview
//!
//! ```text
//!   Matrix homeserver
//!        │  POST /_matrix/push/v1/notify
//!        ▼
//!   ┌──────────┐   ┌──────────────┐   ┌────────────┐   ┌───────────┐
//!   │ visitor  │──▶│   matrix     │──▶│  forward   │──▶│  pushkey  │
//!   │  limit   │   │  translate   │   │ (reqwest)  │   │ endpoint  │
//!   └──────────┘   └──────┬───────┘   └────────────┘   └───────────┘
//!                         │ mismatch / invalid
//!                         ▼
//!                  ┌──────────────┐
//!                  │   response   │  {"rejected":[...]} or error body
//!                  └──────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;

#[derive(Parser)]
#[command(name = "matrix-gateway")]
#[command(about = "UnifiedPush Matrix push gateway", long_about = None)]
struct Args {
    /// Path to the TOML configuration file. Defaults are used when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    matrix_push_gateway::lifecycle::startup::run(args.config.as_deref()).await?;
    Ok(())
}
