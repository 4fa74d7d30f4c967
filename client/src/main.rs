use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use client::{
    activation::ActivationFlow,
    api::{HttpSubscriptionApi, SubscriptionApi},
    config::ClientConfig,
    messages::{MessageKind, error_message},
    status_cache::StatusCache,
};
use tracing::error;

#[derive(Parser, Debug)]
#[command(author, version, about = "Subscription activation client")]
struct Cli {
    /// Base URL of the subscription backend.
    #[arg(long, env = "BACKEND_URL", default_value = "http://localhost:8080")]
    backend_url: String,

    /// Bearer token identifying the caller.
    #[arg(long, env = "ACCESS_TOKEN", hide_env_values = true)]
    access_token: Option<String>,

    /// Principal whose subscription status is shown.
    #[arg(long, env = "PRINCIPAL")]
    principal: Option<String>,

    #[arg(long, env = "CLIENT_TIMEOUT_SECS", default_value_t = 30)]
    timeout_secs: u64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Show whether the principal is subscribed, with its record.
    Status,

    /// Verify a ledger transfer by its block index and activate the subscription.
    Activate {
        /// Ledger block index of the payment.
        index: String,

        /// Acknowledge the terms of service.
        #[arg(long)]
        accept_terms: bool,
    },

    /// Print the treasury account, minimum fee and the memo to put on the transfer.
    Memo,

    /// Show the caller's profile.
    Profile,
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    if let Err(err) = crates::observability::init_observability("client") {
        eprintln!("failed to initialise logging: {err:#}");
    }

    match run(Cli::parse()).await {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            error!("Client exited with error: {:#}", err);
            std::process::exit(1);
        }
    }
}

async fn run(cli: Cli) -> Result<i32> {
    let config = ClientConfig::new(
        cli.backend_url,
        cli.access_token,
        cli.principal,
        cli.timeout_secs,
    )?;
    let api: Arc<dyn SubscriptionApi> = Arc::new(HttpSubscriptionApi::new(&config)?);
    let cache = Arc::new(StatusCache::new(Arc::clone(&api)));

    match cli.command {
        Command::Status => match cache.status(&config.principal).await {
            Ok(snapshot) => {
                println!("principal:  {}", config.principal);
                println!("subscribed: {}", snapshot.subscribed);
                match snapshot.record {
                    Some(record) => println!("{}", serde_json::to_string_pretty(&record)?),
                    None => println!("no subscription record"),
                }
                Ok(0)
            }
            Err(err) => {
                println!("{}", error_message(&err).text);
                Ok(2)
            }
        },
        Command::Activate {
            index,
            accept_terms,
        } => {
            let flow = ActivationFlow::new(api, cache);
            flow.set_terms_accepted(accept_terms);

            match flow.submit(&index).await {
                Ok(message) => {
                    println!("{}", message.text);
                    Ok(match message.kind {
                        MessageKind::Success => 0,
                        MessageKind::ActionableError => 1,
                        MessageKind::RetryableError => 2,
                    })
                }
                Err(err) => {
                    println!("{err}");
                    Ok(1)
                }
            }
        }
        Command::Memo => match api.payment_instructions().await {
            Ok(instructions) => {
                println!("treasury account: {}", instructions.treasury_account_id);
                println!("minimum fee:      {} e8s", instructions.min_fee_e8s);
                println!("transfer memo:    {}", instructions.memo);
                Ok(0)
            }
            Err(err) => {
                println!("{}", error_message(&err).text);
                Ok(2)
            }
        },
        Command::Profile => match api.caller_profile().await {
            Ok(Some(profile)) => {
                println!("{}", serde_json::to_string_pretty(&profile)?);
                Ok(0)
            }
            Ok(None) => {
                println!("no profile saved");
                Ok(0)
            }
            Err(err) => {
                println!("{}", error_message(&err).text);
                Ok(2)
            }
        },
    }
}
