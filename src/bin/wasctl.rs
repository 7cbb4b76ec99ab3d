use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue};
use serde_json::{json, Value};

#[derive(Parser)]
#[command(name = "wasctl")]
#[command(about = "Management CLI for the traced backend service", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8080", env = "WAS_URL")]
    url: String,

    /// Join an existing trace by sending this W3C traceparent.
    #[arg(short, long)]
    traceparent: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check service health
    Health,
    /// Show service and request info
    Info,
    /// Print the metrics exposition document
    Metrics,
    /// Read a cache key
    CacheGet { key: String },
    /// Write a cache key
    CachePut {
        key: String,
        value: String,
        /// TTL in seconds; the server default applies when omitted
        #[arg(long)]
        ttl: Option<u64>,
    },
    /// Delete a cache key
    CacheDelete { key: String },
    /// Publish a message
    Publish {
        message: String,
        #[arg(long)]
        topic: Option<String>,
        #[arg(long)]
        key: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let base = cli.url.trim_end_matches('/');

    let mut headers = HeaderMap::new();
    if let Some(traceparent) = &cli.traceparent {
        headers.insert("traceparent", HeaderValue::from_str(traceparent)?);
    }

    let request = match cli.command {
        Commands::Health => client.get(format!("{}/health", base)),
        Commands::Info => client.get(format!("{}/api/info", base)),
        Commands::Metrics => client.get(format!("{}/metrics", base)),
        Commands::CacheGet { key } => client.get(format!("{}/api/cache/{}", base, key)),
        Commands::CachePut { key, value, ttl } => {
            let mut body = json!({ "value": value });
            if let Some(ttl) = ttl {
                body["ttl"] = json!(ttl);
            }
            client.put(format!("{}/api/cache/{}", base, key)).json(&body)
        }
        Commands::CacheDelete { key } => client.delete(format!("{}/api/cache/{}", base, key)),
        Commands::Publish {
            message,
            topic,
            key,
        } => client
            .post(format!("{}/api/message", base))
            .json(&json!({ "message": message, "topic": topic, "key": key })),
    };

    let res = request.headers(headers).send().await?;
    print_response(res).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if let Some(trace_id) = res.headers().get("x-trace-id").and_then(|v| v.to_str().ok()) {
        eprintln!("trace: {}", trace_id);
    }

    let text = res.text().await?;
    if !status.is_success() {
        eprintln!("Error: service returned status {}", status);
    }

    match serde_json::from_str::<Value>(&text) {
        Ok(json) => println!("{}", serde_json::to_string_pretty(&json)?),
        Err(_) => print!("{}", text),
    }
    Ok(())
}
