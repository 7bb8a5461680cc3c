//! crmdesk CLI
//!
//! Command-line client for a running crmdesk server:
//! - Check server status
//! - List, add and remove customers
//! - Import/Export customers as CSV
//! - Inspect messaging instances and workflow logs

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "crmdesk-cli")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Command-line client for the crmdesk server")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Server URL
    #[arg(long, env = "CRMDESK_URL", default_value = "http://localhost:3000", global = true)]
    pub api_url: String,

    /// Output format (table, json)
    #[arg(short, long, default_value = "table", global = true)]
    pub format: String,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show server status
    Status,

    /// Manage customers
    #[command(subcommand)]
    Customers(CustomerCommands),

    /// List messaging instances
    Instances,

    /// Show workflow logs
    Logs {
        /// Only this level (info, success, warning, error)
        #[arg(short, long)]
        level: Option<String>,
        /// Only this workflow
        #[arg(short, long)]
        workflow: Option<String>,
        /// Maximum number of entries
        #[arg(short = 'n', long, default_value = "20")]
        limit: usize,
        /// Show counts per level instead of entries
        #[arg(long)]
        summary: bool,
    },

    /// Generate default config file
    Config {
        /// Output path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
pub enum CustomerCommands {
    /// List customers
    List {
        /// Filter by status (prospect, active, customer, inactive)
        #[arg(short, long)]
        status: Option<String>,
        /// Search name, email or phone
        #[arg(short = 'q', long)]
        search: Option<String>,
    },
    /// Add a customer
    Add {
        name: String,
        phone: String,
        #[arg(short, long)]
        email: Option<String>,
        #[arg(short, long)]
        status: Option<String>,
        /// Tags (repeatable)
        #[arg(short = 'T', long)]
        tags: Vec<String>,
    },
    /// Remove a customer by id
    Remove { id: String },
    /// Import customers from CSV
    Import {
        /// Path to CSV file
        path: PathBuf,
    },
    /// Export customers as CSV
    Export {
        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let api = format!("{}/api/v1", cli.api_url.trim_end_matches('/'));

    match cli.command {
        Commands::Status => {
            let response = client.get(format!("{}/status", api)).send().await;

            match response {
                Ok(resp) if resp.status().is_success() => {
                    let status: serde_json::Value = resp.json().await?;

                    if cli.format == "json" {
                        println!("{}", serde_json::to_string_pretty(&status)?);
                        return Ok(());
                    }

                    println!(
                        "crmdesk v{}",
                        status["version"].as_str().unwrap_or("unknown")
                    );
                    println!();
                    println!("Customers:      {}", status["customers"].as_u64().unwrap_or(0));
                    println!("Instances:      {}", status["instances"].as_u64().unwrap_or(0));
                    println!("Log entries:    {}", status["log_entries"].as_u64().unwrap_or(0));
                    println!("Documents:      {}", status["documents"].as_u64().unwrap_or(0));
                    println!(
                        "Live clients:   {}",
                        status["websocket_connections"].as_u64().unwrap_or(0)
                    );

                    if let Some(uptime) = status["uptime_seconds"].as_u64() {
                        println!();
                        println!("Uptime: {}", format_duration(uptime));
                    }
                }
                Ok(resp) => {
                    eprintln!("Server returned error: {}", resp.status());
                    std::process::exit(1);
                }
                Err(e) => {
                    eprintln!("Cannot connect to crmdesk at {}", cli.api_url);
                    eprintln!("Error: {}", e);
                    eprintln!();
                    eprintln!("Make sure the server is running:");
                    eprintln!("  cargo run --bin crmdesk");
                    std::process::exit(1);
                }
            }
        }

        Commands::Customers(CustomerCommands::List { status, search }) => {
            let mut query = Vec::new();
            if let Some(status) = status {
                query.push(("status", status));
            }
            if let Some(search) = search {
                query.push(("search", search));
            }

            let response = client
                .get(format!("{}/customers", api))
                .query(&query)
                .send()
                .await?;
            let data = expect_success(response, "List customers").await?;

            if cli.format == "json" {
                println!("{}", serde_json::to_string_pretty(&data)?);
                return Ok(());
            }

            let customers = data["customers"].as_array().cloned().unwrap_or_default();
            if customers.is_empty() {
                println!("No customers found.");
                return Ok(());
            }

            println!(
                "{:<36}  {:<24} {:<20} {:<10} {}",
                "ID", "Name", "Phone", "Status", "Tags"
            );
            println!("{}", "-".repeat(104));
            for c in &customers {
                let tags: Vec<&str> = c["tags"]
                    .as_array()
                    .map(|t| t.iter().filter_map(|v| v.as_str()).collect())
                    .unwrap_or_default();
                println!(
                    "{:<36}  {:<24} {:<20} {:<10} {}",
                    c["id"].as_str().unwrap_or("-"),
                    truncate(c["name"].as_str().unwrap_or("-"), 24),
                    c["phone"].as_str().unwrap_or("-"),
                    c["status"].as_str().unwrap_or("-"),
                    tags.join(", ")
                );
            }
            println!();
            println!("{} of {} customers", customers.len(), data["total"].as_u64().unwrap_or(0));
        }

        Commands::Customers(CustomerCommands::Add {
            name,
            phone,
            email,
            status,
            tags,
        }) => {
            let body = serde_json::json!({
                "name": name,
                "phone": phone,
                "email": email,
                "status": status.unwrap_or_else(|| "prospect".to_string()),
                "tags": tags,
            });

            let response = client
                .post(format!("{}/customers", api))
                .json(&body)
                .send()
                .await?;
            let created = expect_success(response, "Create customer").await?;
            println!(
                "Created {} ({})",
                created["name"].as_str().unwrap_or(&name),
                created["id"].as_str().unwrap_or("-")
            );
        }

        Commands::Customers(CustomerCommands::Remove { id }) => {
            let response = client
                .delete(format!("{}/customers/{}", api, urlencoding::encode(&id)))
                .send()
                .await?;

            if response.status().is_success() {
                println!("Removed {}", id);
            } else {
                eprintln!("Remove customer failed: {}", error_message(response).await);
                std::process::exit(1);
            }
        }

        Commands::Customers(CustomerCommands::Import { path }) => {
            if !path.exists() {
                eprintln!("File not found: {:?}", path);
                std::process::exit(1);
            }
            let body = std::fs::read_to_string(&path)?;

            let response = client
                .post(format!("{}/customers/import", api))
                .header(reqwest::header::CONTENT_TYPE, "text/csv")
                .body(body)
                .send()
                .await?;
            let result = expect_success(response, "Import").await?;

            println!("Import results:");
            println!("  Imported: {}", result["imported"].as_u64().unwrap_or(0));
            println!("  Rejected: {}", result["rejected"].as_u64().unwrap_or(0));

            if let Some(errors) = result["errors"].as_array() {
                if !errors.is_empty() {
                    println!();
                    println!("Errors (first 10):");
                    for error in errors.iter().take(10) {
                        println!("  {}", error.as_str().unwrap_or("-"));
                    }
                }
            }
        }

        Commands::Customers(CustomerCommands::Export { output }) => {
            let response = client
                .get(format!("{}/customers/export", api))
                .send()
                .await?;

            if !response.status().is_success() {
                eprintln!("Export failed: {}", error_message(response).await);
                std::process::exit(1);
            }

            let data = response.text().await?;

            match output {
                Some(path) => {
                    std::fs::write(&path, &data)?;
                    println!("Exported to {:?}", path);
                }
                None => {
                    print!("{}", data);
                }
            }
        }

        Commands::Instances => {
            let response = client.get(format!("{}/instances", api)).send().await?;
            let data = expect_success(response, "List instances").await?;

            if cli.format == "json" {
                println!("{}", serde_json::to_string_pretty(&data)?);
                return Ok(());
            }

            let instances = data["instances"].as_array().cloned().unwrap_or_default();
            if instances.is_empty() {
                println!("No instances registered.");
                return Ok(());
            }

            println!("{:<24} {:<24} {:<14} {}", "ID", "Name", "Status", "Phone");
            println!("{}", "-".repeat(80));
            for i in &instances {
                println!(
                    "{:<24} {:<24} {:<14} {}",
                    i["id"].as_str().unwrap_or("-"),
                    truncate(i["display_name"].as_str().unwrap_or("-"), 24),
                    i["status"].as_str().unwrap_or("-"),
                    i["phone_number"].as_str().unwrap_or("-")
                );
            }
        }

        Commands::Logs { summary: true, .. } => {
            let response = client
                .get(format!("{}/workflows/logs/summary", api))
                .send()
                .await?;
            let data = expect_success(response, "Log summary").await?;

            if cli.format == "json" {
                println!("{}", serde_json::to_string_pretty(&data)?);
                return Ok(());
            }

            println!("Total entries: {}", data["total"].as_u64().unwrap_or(0));
            if let Some(levels) = data["by_level"].as_object() {
                for (level, count) in levels {
                    println!("  {:<10} {}", level, count.as_u64().unwrap_or(0));
                }
            }
            if let Some(avg) = data["average_duration_ms"].as_u64() {
                println!("Average duration: {} ms", avg);
            }
        }

        Commands::Logs {
            level,
            workflow,
            limit,
            ..
        } => {
            let mut query = vec![("limit", limit.to_string())];
            if let Some(level) = level {
                query.push(("level", level));
            }
            if let Some(workflow) = workflow {
                query.push(("workflow", workflow));
            }

            let response = client
                .get(format!("{}/workflows/logs", api))
                .query(&query)
                .send()
                .await?;
            let data = expect_success(response, "List logs").await?;

            if cli.format == "json" {
                println!("{}", serde_json::to_string_pretty(&data)?);
                return Ok(());
            }

            let entries = data["entries"].as_array().cloned().unwrap_or_default();
            if entries.is_empty() {
                println!("No log entries.");
                return Ok(());
            }

            for e in &entries {
                let when = e["timestamp"]
                    .as_str()
                    .and_then(|s| chrono::DateTime::parse_from_rfc3339(s).ok())
                    .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
                    .unwrap_or_else(|| "-".to_string());
                let duration = e["duration_ms"]
                    .as_u64()
                    .map(|d| format!(" ({} ms)", d))
                    .unwrap_or_default();
                println!(
                    "{} {:<8} {:<20} {}{}",
                    when,
                    e["level"].as_str().unwrap_or("-").to_uppercase(),
                    e["workflow"].as_str().unwrap_or("-"),
                    e["message"].as_str().unwrap_or(""),
                    duration
                );
            }
        }

        Commands::Config { output } => {
            let config = crmdesk::config::generate_default_config();

            match output {
                Some(path) => {
                    // Create parent directory if needed
                    if let Some(parent) = path.parent() {
                        std::fs::create_dir_all(parent)?;
                    }
                    std::fs::write(&path, &config)?;
                    println!("Config written to {:?}", path);
                }
                None => {
                    print!("{}", config);
                }
            }
        }
    }

    Ok(())
}

/// Decode a JSON body, or print the server's error and exit
async fn expect_success(
    response: reqwest::Response,
    action: &str,
) -> Result<serde_json::Value, Box<dyn std::error::Error>> {
    if response.status().is_success() {
        Ok(response.json().await?)
    } else {
        eprintln!("{} failed: {}", action, error_message(response).await);
        std::process::exit(1);
    }
}

/// Status plus the `error.message` of an API error body, when present
async fn error_message(response: reqwest::Response) -> String {
    let status = response.status();
    let body: serde_json::Value = response.json().await.unwrap_or_default();
    match body["error"]["message"].as_str() {
        Some(message) => format!("{} ({})", message, status),
        None => status.to_string(),
    }
}

fn truncate(s: &str, width: usize) -> String {
    if s.chars().count() <= width {
        s.to_string()
    } else {
        let mut out: String = s.chars().take(width.saturating_sub(1)).collect();
        out.push('…');
        out
    }
}

fn format_duration(seconds: u64) -> String {
    if seconds < 60 {
        format!("{}s", seconds)
    } else if seconds < 3600 {
        format!("{}m {}s", seconds / 60, seconds % 60)
    } else if seconds < 86400 {
        format!("{}h {}m", seconds / 3600, (seconds % 3600) / 60)
    } else {
        format!("{}d {}h", seconds / 86400, (seconds % 86400) / 3600)
    }
}
