use clap::{Parser, Subcommand};
use serde_json::{json, Value};

#[derive(Parser)]
#[command(name = "gateway-cli")]
#[command(about = "Query and exercise a Matrix push gateway", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8080")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ask the gateway which push gateway protocol it speaks
    Discover,
    /// Send a sample Matrix notification for a pushkey
    Notify {
        /// Delivery URL placed in the device's pushkey
        #[arg(short, long)]
        pushkey: String,

        /// Message body
        #[arg(short, long, default_value = "Hello from gateway-cli")]
        message: String,
    },
    /// Check gateway liveness
    Health,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let notify_url = format!("{}/_matrix/push/v1/notify", cli.url.trim_end_matches('/'));

    match cli.command {
        Commands::Discover => {
            let res = client.get(&notify_url).send().await?;
            print_response(res).await?;
        }
        Commands::Notify { pushkey, message } => {
            let res = client
                .post(&notify_url)
                .json(&sample_notification(&pushkey, &message))
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::Health => {
            let res = client
                .get(format!("{}/health", cli.url.trim_end_matches('/')))
                .send()
                .await?;
            print_response(res).await?;
        }
    }

    Ok(())
}

fn sample_notification(pushkey: &str, message: &str) -> Value {
    json!({
        "notification": {
            "content": { "body": message, "msgtype": "m.text" },
            "counts": { "unread": 1 },
            "devices": [{
                "app_id": "gateway-cli",
                "data": {},
                "pushkey": pushkey,
                "pushkey_ts": 0,
                "tweaks": {}
            }],
            "prio": "high",
            "type": "m.room.message"
        }
    })
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: gateway returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        return Ok(());
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
