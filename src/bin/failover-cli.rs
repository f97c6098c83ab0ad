use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde_json::{json, Value};

#[derive(Parser)]
#[command(name = "failover-cli")]
#[command(about = "Management CLI for the failover arbiter", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8081")]
    url: String,

    #[arg(short, long, env = "FAILOVER_API_KEY", default_value = "admin-secret-key")]
    key: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the current primary and failover statistics
    Status,
    /// List nodes, optionally filtered
    Nodes {
        #[arg(long)]
        role: Option<String>,
        #[arg(long)]
        status: Option<String>,
        #[arg(long)]
        min_health_score: Option<u8>,
    },
    /// Show recent health checks for a node
    History {
        node: String,
        #[arg(long, default_value_t = 24)]
        hours: u32,
    },
    /// Show recent failover events, newest first
    Events {
        #[arg(short, long, default_value_t = 20)]
        limit: usize,
    },
    /// Promote a node to primary
    Failover { target: String },
    /// Put a node into or out of maintenance
    Maintenance {
        node: String,
        #[arg(long)]
        off: bool,
    },
    /// List failover rules
    Rules,
    /// Enable a failover rule
    EnableRule { id: String },
    /// Disable a failover rule
    DisableRule { id: String },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut headers = HeaderMap::new();
    headers.insert(
        AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {}", cli.key))?,
    );
    let client = reqwest::Client::builder()
        .default_headers(headers)
        .build()?;
    let base = cli.url.trim_end_matches('/');

    let res = match cli.command {
        Commands::Status => client.get(format!("{}/admin/status", base)).send().await?,
        Commands::Nodes {
            role,
            status,
            min_health_score,
        } => {
            let mut query: Vec<(&str, String)> = Vec::new();
            if let Some(role) = role {
                query.push(("role", role));
            }
            if let Some(status) = status {
                query.push(("status", status));
            }
            if let Some(score) = min_health_score {
                query.push(("min_health_score", score.to_string()));
            }
            client
                .get(format!("{}/admin/nodes", base))
                .query(&query)
                .send()
                .await?
        }
        Commands::History { node, hours } => {
            client
                .get(format!("{}/admin/nodes/{}/history", base, node))
                .query(&[("hours", hours)])
                .send()
                .await?
        }
        Commands::Events { limit } => {
            client
                .get(format!("{}/admin/events", base))
                .query(&[("limit", limit)])
                .send()
                .await?
        }
        Commands::Failover { target } => {
            client
                .post(format!("{}/admin/failover", base))
                .json(&json!({ "target": target }))
                .send()
                .await?
        }
        Commands::Maintenance { node, off } => {
            client
                .put(format!("{}/admin/nodes/{}/maintenance", base, node))
                .json(&json!({ "enabled": !off }))
                .send()
                .await?
        }
        Commands::Rules => client.get(format!("{}/admin/rules", base)).send().await?,
        Commands::EnableRule { id } => set_rule_enabled(&client, base, &id, true).await?,
        Commands::DisableRule { id } => set_rule_enabled(&client, base, &id, false).await?,
    };

    print_response(res).await
}

async fn set_rule_enabled(
    client: &reqwest::Client,
    base: &str,
    id: &str,
    enabled: bool,
) -> Result<reqwest::Response, reqwest::Error> {
    client
        .put(format!("{}/admin/rules/{}/enabled", base, id))
        .json(&json!({ "enabled": enabled }))
        .send()
        .await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    let text = res.text().await?;

    if !status.is_success() {
        eprintln!("Error: Admin API returned status {}", status);
        if !text.is_empty() {
            eprintln!("Response: {}", text);
        }
        std::process::exit(1);
    }

    if text.is_empty() {
        println!("OK ({})", status);
        return Ok(());
    }
    let json: Value = serde_json::from_str(&text)?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
