use clap::{Parser, Subcommand};
use serde_json::{json, Value};

#[derive(Parser)]
#[command(name = "gateway-cli")]
#[command(about = "Command-line client for the Ethereum JSON-RPC gateway", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8080")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Invoke any operation with JSON parameters
    Invoke {
        method: String,
        #[arg(default_value = "{}")]
        params: String,
    },
    /// Show the balance of an address
    Balance {
        address: String,
        #[arg(short, long)]
        block: Option<String>,
    },
    /// Show the current block number
    BlockNumber,
    /// List wallets held by the gateway
    Wallets,
    /// List loaded contracts
    Contracts,
    /// Check gateway and node health
    Health,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let rpc_url = format!("{}/rpc", cli.url.trim_end_matches('/'));

    let (method, params) = match cli.command {
        Commands::Health => {
            let res = client
                .get(format!("{}/health", cli.url.trim_end_matches('/')))
                .send()
                .await?;
            return print_response(res).await;
        }
        Commands::Invoke { method, params } => {
            let params: Value = serde_json::from_str(&params)?;
            (method, params)
        }
        Commands::Balance { address, block } => {
            let mut params = json!({ "address": address });
            if let Some(block) = block {
                params["block"] = Value::String(block);
            }
            ("eth_getBalance".to_string(), params)
        }
        Commands::BlockNumber => ("eth_getBlockNumber".to_string(), json!({})),
        Commands::Wallets => ("eth_listWallets".to_string(), json!({})),
        Commands::Contracts => ("contract_list".to_string(), json!({})),
    };

    let res = client
        .post(rpc_url)
        .json(&json!({ "method": method, "params": params }))
        .send()
        .await?;
    print_response(res).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    let text = res.text().await?;

    match serde_json::from_str::<Value>(&text) {
        Ok(json) => {
            let rendered = serde_json::to_string_pretty(&json)?;
            if status.is_success() {
                println!("{}", rendered);
            } else {
                eprintln!("Error: gateway returned status {}", status);
                eprintln!("{}", rendered);
            }
        }
        Err(_) => {
            eprintln!("Error: gateway returned status {}", status);
            eprintln!("Response: {}", text);
        }
    }
    Ok(())
}
