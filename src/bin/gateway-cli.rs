use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use rust_decimal::Decimal;
use serde_json::{json, Value};
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "gateway-cli")]
#[command(about = "Client and management CLI for the payment gateway", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8080")]
    url: String,

    /// Admin API key (admin commands only)
    #[arg(short, long, env = "GATEWAY_ADMIN_KEY", default_value = "CHANGE_ME_IN_PRODUCTION")]
    key: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Submit a payment
    Pay {
        /// Provider key (e.g. MTN, AIRTEL)
        #[arg(short, long)]
        provider: String,
        #[arg(short, long)]
        amount: Decimal,
        #[arg(short, long, default_value = "UGX")]
        currency: String,
        /// Transaction id; a fresh one is generated when omitted
        #[arg(short = 't', long)]
        transaction_id: Option<String>,
    },
    /// Show the idempotency record of a transaction
    Status { transaction_id: String },
    /// Gateway liveness and breaker states
    Health,
    /// List circuit breaker snapshots
    Breakers,
    /// Force a provider's circuit breaker closed
    Reset { provider: String },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    let mut admin_headers = HeaderMap::new();
    admin_headers.insert(
        AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {}", cli.key))?,
    );

    let res = match cli.command {
        Commands::Pay {
            provider,
            amount,
            currency,
            transaction_id,
        } => {
            let transaction_id = transaction_id.unwrap_or_else(|| format!("TXN-{}", Uuid::new_v4().simple()));
            eprintln!("Submitting {}", transaction_id);
            client
                .post(format!("{}/v1/pay", cli.url))
                .json(&json!({
                    "transaction_id": transaction_id,
                    "amount": amount,
                    "currency": currency,
                    "provider": provider,
                }))
                .send()
                .await?
        }
        Commands::Status { transaction_id } => {
            client
                .get(format!("{}/v1/transactions/{}", cli.url, transaction_id))
                .send()
                .await?
        }
        Commands::Health => client.get(format!("{}/health", cli.url)).send().await?,
        Commands::Breakers => {
            client
                .get(format!("{}/admin/breakers", cli.url))
                .headers(admin_headers)
                .send()
                .await?
        }
        Commands::Reset { provider } => {
            client
                .post(format!("{}/admin/breakers/{}/reset", cli.url, provider))
                .headers(admin_headers)
                .send()
                .await?
        }
    };

    print_response(res).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: gateway returned status {}", status);
    }

    let text = res.text().await?;
    match serde_json::from_str::<Value>(&text) {
        Ok(json) => println!("{}", serde_json::to_string_pretty(&json)?),
        Err(_) => println!("{}", text),
    }
    Ok(())
}
