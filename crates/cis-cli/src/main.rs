use anyhow::Result;
use clap::{Args, Parser, Subcommand};

mod commands;

use commands::{power, reconcile, ConfigArgs};

#[derive(Parser)]
#[command(name = "cis")]
#[command(about = "CIS vending client CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute layered config hash + print canonical JSON
    ConfigHash {
        /// Paths in merge order (base -> env -> local)
        #[arg(required = true)]
        paths: Vec<String>,
    },

    /// Generate a fresh orderNO for this vending client
    OrderNo {
        #[command(flatten)]
        config: ConfigArgs,
    },

    /// Look a customer up by meter number (MN) or account number (CN)
    Confirm {
        #[command(flatten)]
        config: ConfigArgs,

        /// MN | CN
        #[arg(long = "type", value_parser = commands::parse_wire::<cis_client::ConfirmationType>)]
        confirmation_type: cis_client::ConfirmationType,

        /// Meter number (MN) or account number (CN)
        #[arg(long)]
        request_no: String,
    },

    /// Vend credit (PREPAY) or pay an account (POSTPAY)
    Purchase(PurchaseArgs),

    /// Reprint past receipts
    Reprint {
        #[command(flatten)]
        config: ConfigArgs,

        /// MN | CN
        #[arg(long = "type", value_parser = commands::parse_wire::<cis_client::ConfirmationType>)]
        confirmation_type: cis_client::ConfirmationType,

        #[arg(long)]
        request_no: String,

        /// Restrict to one order
        #[arg(long)]
        order_no: Option<String>,
    },

    /// Retrieve transaction details for a date range
    Retrieve {
        #[command(flatten)]
        config: ConfigArgs,

        /// yyyyMMdd
        #[arg(long)]
        begin_date: String,

        /// yyyyMMdd
        #[arg(long)]
        end_date: String,

        #[arg(long)]
        order_no: String,
    },

    /// Confirm or cancel a pending purchase
    Acknowledge {
        #[command(flatten)]
        config: ConfigArgs,

        #[arg(long)]
        order_no: String,

        #[arg(long)]
        receipt_no: String,

        #[arg(long)]
        amount: f64,

        /// SUCCESS | FAILED
        #[arg(long, value_parser = commands::parse_wire::<cis_client::PurchaseStatus>)]
        status: cis_client::PurchaseStatus,
    },

    /// Daily reconciliation file commands
    Reconcile {
        #[command(subcommand)]
        cmd: ReconcileCmd,
    },
}

#[derive(Args)]
struct PurchaseArgs {
    #[command(flatten)]
    config: ConfigArgs,

    /// Defaults to a freshly generated orderNO
    #[arg(long)]
    order_no: Option<String>,

    /// PREPAY | POSTPAY
    #[arg(long, value_parser = commands::parse_wire::<cis_client::CreditKind>)]
    kind: cis_client::CreditKind,

    /// Meter number (PREPAY) or account number (POSTPAY)
    #[arg(long)]
    request_no: String,

    /// MD | NMD
    #[arg(long, value_parser = commands::parse_wire::<cis_client::AccountType>)]
    account_type: cis_client::AccountType,

    /// Amount tendered in NGN
    #[arg(long)]
    amount: f64,

    /// bankteller | cash | cheque | POS
    #[arg(long, value_parser = commands::parse_wire::<cis_client::PaidType>)]
    paid_type: cis_client::PaidType,

    /// Send Acknowledge(SUCCESS) once the purchase succeeds
    #[arg(long, default_value_t = false)]
    acknowledge: bool,
}

#[derive(Subcommand)]
enum ReconcileCmd {
    /// Upload the reconciliation CSV, then notify CIS if enabled
    Upload {
        #[command(flatten)]
        config: ConfigArgs,

        /// JSON file: {"firstRow": {...}, "records": [...]}
        #[arg(long)]
        records: String,

        /// Force notify after upload (overrides profile default)
        #[arg(long, conflicts_with = "no_notify")]
        notify: bool,

        /// Skip notify after upload (overrides profile default)
        #[arg(long = "no-notify", conflicts_with = "notify")]
        no_notify: bool,

        /// Reference date yyyyMMdd (defaults to the profile's reference day)
        #[arg(long)]
        date: Option<String>,
    },

    /// Send NotifyAutoReconciliation for an already uploaded file
    Notify {
        #[command(flatten)]
        config: ConfigArgs,

        /// Reference date yyyyMMdd (defaults to the profile's reference day)
        #[arg(long)]
        date: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Silent if the file does not exist; production injects env vars directly.
    let _ = dotenvy::from_filename(".env.local");

    init_tracing();

    let cli = Cli::parse();

    match cli.cmd {
        Commands::ConfigHash { paths } => {
            let path_refs: Vec<&str> = paths.iter().map(|s| s.as_str()).collect();
            let loaded = cis_config::load_layered_yaml(&path_refs)?;
            println!("config_hash={}", loaded.config_hash);
            println!("{}", loaded.canonical_json);
        }

        Commands::OrderNo { config } => {
            let client = commands::load_client(&config)?;
            println!("order_no={}", client.misc().generate_order_no());
        }

        Commands::Confirm {
            config,
            confirmation_type,
            request_no,
        } => {
            power::confirm(&config, confirmation_type, request_no).await?;
        }

        Commands::Purchase(args) => {
            power::purchase(
                &args.config,
                power::PurchaseInput {
                    order_no: args.order_no,
                    kind: args.kind,
                    request_no: args.request_no,
                    account_type: args.account_type,
                    amount: args.amount,
                    paid_type: args.paid_type,
                    acknowledge: args.acknowledge,
                },
            )
            .await?;
        }

        Commands::Reprint {
            config,
            confirmation_type,
            request_no,
            order_no,
        } => {
            power::reprint(&config, confirmation_type, request_no, order_no).await?;
        }

        Commands::Retrieve {
            config,
            begin_date,
            end_date,
            order_no,
        } => {
            power::retrieve(&config, begin_date, end_date, order_no).await?;
        }

        Commands::Acknowledge {
            config,
            order_no,
            receipt_no,
            amount,
            status,
        } => {
            power::acknowledge(&config, order_no, receipt_no, amount, status).await?;
        }

        Commands::Reconcile { cmd } => match cmd {
            ReconcileCmd::Upload {
                config,
                records,
                notify,
                no_notify,
                date,
            } => {
                let notify_override = match (notify, no_notify) {
                    (true, _) => Some(true),
                    (_, true) => Some(false),
                    _ => None,
                };
                reconcile::upload(&config, &records, notify_override, date.as_deref()).await?;
            }
            ReconcileCmd::Notify { config, date } => {
                reconcile::notify(&config, date.as_deref()).await?;
            }
        },
    }

    Ok(())
}

/// Logs go to stderr so stdout stays machine-readable.
fn init_tracing() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();
}
