use clap::{Parser, Subcommand};
use serde_json::Value;

#[derive(Parser)]
#[command(name = "proxy-cli")]
#[command(about = "Inspection CLI for the HTTP proxy", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8080")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the metrics snapshot
    Metrics,
    /// Print the request journal
    Requests {
        /// Only the most recent N records
        #[arg(short, long)]
        limit: Option<usize>,
        /// Only records for this route label
        #[arg(short, long)]
        route: Option<String>,
        /// Only records that ended in an error
        #[arg(short, long)]
        errors: bool,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    match cli.command {
        Commands::Metrics => {
            let res = client.get(format!("{}/metrics", cli.url)).send().await?;
            if !check_status(&res) {
                return Ok(());
            }
            print!("{}", res.text().await?);
        }
        Commands::Requests {
            limit,
            route,
            errors,
        } => {
            let mut query: Vec<(&str, String)> = Vec::new();
            if let Some(limit) = limit {
                query.push(("limit", limit.to_string()));
            }
            if let Some(route) = route {
                query.push(("route", route));
            }
            if errors {
                query.push(("errors", "true".to_string()));
            }

            let res = client
                .get(format!("{}/requests", cli.url))
                .query(&query)
                .send()
                .await?;
            if !check_status(&res) {
                return Ok(());
            }
            let json: Value = res.json().await?;
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
    }

    Ok(())
}

fn check_status(res: &reqwest::Response) -> bool {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: proxy returned status {}", status);
        return false;
    }
    true
}
