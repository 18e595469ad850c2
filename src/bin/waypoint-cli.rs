use std::path::PathBuf;

use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde_json::{json, Value};

use waypoint::handlers::system::describe;
use waypoint::rpc::method_name;
use waypoint::RouteTable;

#[derive(Parser)]
#[command(name = "waypoint-cli")]
#[command(about = "Client for a waypoint JSON-RPC endpoint", long_about = None)]
struct Cli {
    /// Full URL of the RPC endpoint.
    #[arg(short, long, default_value = "http://localhost:8080/_mcp")]
    url: String,

    /// Endpoint token, sent as a bearer token.
    #[arg(short, long, env = "WAYPOINT_MCP_TOKEN")]
    token: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch the capability manifest
    Initialize,
    /// Call an RPC method
    Call {
        method: String,
        /// Params object as JSON
        #[arg(short, long, default_value = "{}")]
        params: String,
    },
    /// Parse a route file offline and list its routes and RPC methods
    Routes { file: PathBuf },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Initialize => {
            let res = rpc(&cli.url, cli.token.as_deref(), "initialize", json!({})).await?;
            print_response(res).await?;
        }
        Commands::Call { method, params } => {
            let params: Value = serde_json::from_str(&params)?;
            if !params.is_object() {
                return Err("--params must be a JSON object".into());
            }
            let res = rpc(&cli.url, cli.token.as_deref(), &method, params).await?;
            print_response(res).await?;
        }
        Commands::Routes { file } => {
            let table = RouteTable::from_file(&file)?;
            println!("{}", serde_json::to_string_pretty(&describe(&table))?);
            let methods: Vec<String> = table.rpc_routes().filter_map(|r| method_name(r)).collect();
            println!("rpc methods: {}", methods.join(", "));
        }
    }

    Ok(())
}

async fn rpc(
    url: &str,
    token: Option<&str>,
    method: &str,
    params: Value,
) -> Result<reqwest::Response, Box<dyn std::error::Error>> {
    let mut headers = HeaderMap::new();
    if let Some(token) = token {
        headers.insert(AUTHORIZATION, HeaderValue::from_str(&format!("Bearer {token}"))?);
    }
    let envelope = json!({
        "jsonrpc": "2.0",
        "id": uuid::Uuid::new_v4().to_string(),
        "method": method,
        "params": params,
    });
    let res = reqwest::Client::new()
        .post(url)
        .headers(headers)
        .json(&envelope)
        .send()
        .await?;
    Ok(res)
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    let text = res.text().await?;
    match serde_json::from_str::<Value>(&text) {
        Ok(json) => {
            if !status.is_success() {
                eprintln!("Error: endpoint returned status {status}");
            }
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
        Err(_) => {
            eprintln!("Error: endpoint returned status {status}");
            if !text.is_empty() {
                eprintln!("Response: {text}");
            }
        }
    }
    Ok(())
}
