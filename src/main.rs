use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use std::sync::Arc;
use transgate_connect::channel::{MessageBus, Platform};
use transgate_connect::codec::{AllocationFields, ChainType};
use transgate_connect::config::{self, ConnectorConfig};
use transgate_connect::schema::PublicField;
use transgate_connect::{commitment, verify};
use transgate_connect::{CancelFlag, HttpGateway, LogPresenter, TransgateConnect};

#[derive(Parser)]
#[command(name = "transgate")]
#[command(about = "Request, verify and inspect TransGate attestations")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a verification session and print the verified result as JSON.
    Launch {
        /// Application id registered with TransGate.
        #[arg(long, env = "TRANSGATE_APP_ID")]
        app_id: String,
        /// Schema id to prove.
        #[arg(long)]
        schema: String,
        /// Recipient account bound into the validator's signature.
        #[arg(long)]
        address: Option<String>,
        /// evm, solana or ton.
        #[arg(long, default_value = "evm")]
        chain: ChainType,
        /// desktop, ios or android. Mobile platforms get a deep link instead of a QR code.
        #[arg(long, default_value = "desktop")]
        platform: Platform,
        /// Use the development server.
        #[arg(long, default_value_t = false)]
        develop: bool,
    },

    /// Print the commitment of a JSON array of public fields.
    Commit {
        /// Path to the fields file.
        file: PathBuf,
    },

    /// Check an allocator signature against the trusted allocator for a chain.
    VerifyAllocation {
        #[arg(long, default_value = "evm")]
        chain: ChainType,
        #[arg(long)]
        task: String,
        #[arg(long)]
        schema: String,
        #[arg(long)]
        validator: String,
        /// Validator result key, hex. Signed by the allocator on ton.
        #[arg(long, default_value = "")]
        validator_pubkey: String,
        #[arg(long)]
        signature: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    match cli.command {
        Commands::Launch {
            app_id,
            schema,
            address,
            chain,
            platform,
            develop,
        } => {
            let mut connector_config = ConnectorConfig::from_env_with(develop || config::develop_mode());
            // No extension bridge in a terminal; always fall back to QR or deep link.
            connector_config.extension_probe_url = None;
            let gateway = Arc::new(HttpGateway::new(&connector_config)?);
            let (bus, _bridge) = MessageBus::new();
            let connect = TransgateConnect::new(app_id, connector_config, gateway, bus, Arc::new(LogPresenter))
                .with_platform(platform);

            let cancel = CancelFlag::new();
            let on_ctrl_c = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    println!("Cancel requested.");
                    on_ctrl_c.cancel();
                }
            });

            match connect
                .launch_with_cancel(&schema, address.as_deref(), chain, cancel)
                .await
            {
                Ok(verified) => {
                    eprintln!("{}", "Result verified.".green().bold());
                    println!("{}", serde_json::to_string_pretty(&verified)?);
                }
                Err(e) => {
                    eprintln!("{} {}", "Verification failed:".red().bold(), e);
                    std::process::exit(1);
                }
            }
        }

        Commands::Commit { file } => {
            let raw = std::fs::read_to_string(&file)
                .map_err(|e| format!("Could not read {}: {}", file.display(), e))?;
            let fields: Vec<PublicField> = serde_json::from_str(&raw)?;
            println!("{}", commitment::commit(&fields));
        }

        Commands::VerifyAllocation {
            chain,
            task,
            schema,
            validator,
            validator_pubkey,
            signature,
        } => {
            let allocators = config::allocators();
            let Some(trusted) = allocators.for_chain(chain) else {
                eprintln!("{} no trusted allocator configured for {}", "INVALID".red().bold(), chain);
                std::process::exit(1);
            };
            println!("Allocator ({}): {}", chain, trusted);
            let fields = AllocationFields {
                task_id: &task,
                schema_id: &schema,
                validator_address: &validator,
                validator_pubkey: &validator_pubkey,
            };
            if verify::verify_allocation(&allocators, chain, &fields, &signature) {
                println!("{}", "VALID".green().bold());
            } else {
                println!("{}", "INVALID".red().bold());
                std::process::exit(1);
            }
        }
    }

    Ok(())
}
