use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde_json::{Map, Value};

#[derive(Parser)]
#[command(name = "breaker-cli")]
#[command(about = "Management CLI for the circuit breaker registry", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8080")]
    url: String,

    #[arg(short, long, env = "BREAKER_AUTH_KEY")]
    key: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the stored record of a device
    Status { device_id: u64 },
    /// Force a device's breaker back to closed
    Reset { device_id: u64 },
    /// Create or replace a device's breaker config
    Config {
        device_id: u64,
        /// 0 = closed, 1 = open, 2 = half-open
        #[arg(long)]
        state: Option<u8>,
        #[arg(long)]
        errors_threshold: Option<u32>,
        #[arg(long)]
        errors_cnt_reset_timeout_ms: Option<u64>,
        #[arg(long)]
        reset_timeout_ms: Option<u64>,
    },
    /// List breakers one page at a time
    List {
        #[arg(long)]
        page: Option<u32>,
        #[arg(long)]
        page_size: Option<u32>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    let mut headers = HeaderMap::new();
    headers.insert(
        AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {}", cli.key))?,
    );

    let res = match cli.command {
        Commands::Status { device_id } => {
            client
                .get(format!("{}/circuit-breaker/{}/status", cli.url, device_id))
                .headers(headers)
                .send()
                .await?
        }
        Commands::Reset { device_id } => {
            client
                .post(format!("{}/circuit-breaker/{}/reset", cli.url, device_id))
                .headers(headers)
                .send()
                .await?
        }
        Commands::Config {
            device_id,
            state,
            errors_threshold,
            errors_cnt_reset_timeout_ms,
            reset_timeout_ms,
        } => {
            let mut body = Map::new();
            if let Some(v) = state {
                body.insert("state".into(), v.into());
            }
            if let Some(v) = errors_threshold {
                body.insert("errorsThreshold".into(), v.into());
            }
            if let Some(v) = errors_cnt_reset_timeout_ms {
                body.insert("errorsCntResetTimeoutMs".into(), v.into());
            }
            if let Some(v) = reset_timeout_ms {
                body.insert("resetTimeoutMs".into(), v.into());
            }

            client
                .put(format!("{}/circuit-breaker/{}/config", cli.url, device_id))
                .headers(headers)
                .json(&Value::Object(body))
                .send()
                .await?
        }
        Commands::List { page, page_size } => {
            let mut query = Vec::new();
            if let Some(page) = page {
                query.push(("page", page));
            }
            if let Some(page_size) = page_size {
                query.push(("pageSize", page_size));
            }

            client
                .get(format!("{}/circuit-breakers/", cli.url))
                .headers(headers)
                .query(&query)
                .send()
                .await?
        }
    };

    print_response(res).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: API returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        return Ok(());
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
