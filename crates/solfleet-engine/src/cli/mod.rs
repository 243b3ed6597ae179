pub mod commands;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
/// Solfleet Engine CLI
///
/// This CLI provides commands to run the fleet monitoring engine, register
/// plants, and rotate the credential master key.
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the monitoring engine
    Serve,

    /// Create new entities
    Create(CreateCommands),

    /// Rotate keys
    Rotate(RotateCommands),
}

#[derive(Args)]
pub struct CreateCommands {
    #[command(subcommand)]
    pub command: CreateSubcommands,
}

#[derive(Subcommand)]
pub enum CreateSubcommands {
    /// Register a new plant with its vendor credentials
    Plant {
        /// Operator-facing plant name
        #[arg(long)]
        name: String,
        /// Vendor brand (SOLIS, HUAWEI, GOODWE, DELE)
        #[arg(long)]
        brand: String,
        /// IANA timezone of the plant (e.g. America/Sao_Paulo)
        #[arg(long)]
        timezone: String,
        /// The plant's identifier on the vendor cloud
        #[arg(long)]
        vendor_plant_id: String,
        /// Vendor API key
        #[arg(long)]
        api_key: String,
        /// Vendor API secret
        #[arg(long)]
        api_secret: String,
        /// Optional nameplate capacity in watts
        #[arg(long)]
        installed_capacity_w: Option<f64>,
    },
}

#[derive(Args)]
pub struct RotateCommands {
    #[command(subcommand)]
    pub command: RotateSubcommands,
}

#[derive(Subcommand)]
pub enum RotateSubcommands {
    /// Re-encrypt every stored credential under the current master key
    Credentials,
}

pub fn parse_cli() -> Cli {
    Cli::parse()
}
