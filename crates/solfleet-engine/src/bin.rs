//! Solfleet Engine CLI application
//!
//! This module provides the command-line interface for the Solfleet
//! monitoring engine. It includes functionality for serving the engine and
//! rotating the credential master key.

use solfleet_engine::cli::{commands, parse_cli, Commands, CreateSubcommands, RotateSubcommands};
use solfleet_utils::config::Settings;

/// Main function to run the Solfleet engine
///
/// This function initializes the application, parses command-line arguments,
/// and executes the appropriate command based on user input.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = parse_cli();

    // Load configuration
    let config = Settings::new(None).expect("Failed to load configuration");

    // Initialize logger
    solfleet_utils::logging::init(&config.log_level).expect("Failed to initialize logger");

    // Execute the appropriate command
    match cli.command {
        Commands::Serve => commands::serve(&config).await?,
        Commands::Create(create_commands) => match create_commands.command {
            CreateSubcommands::Plant {
                name,
                brand,
                timezone,
                vendor_plant_id,
                api_key,
                api_secret,
                installed_capacity_w,
            } => commands::create_plant(
                &config,
                name,
                brand,
                timezone,
                vendor_plant_id,
                api_key,
                api_secret,
                installed_capacity_w,
            )?,
        },
        Commands::Rotate(rotate_commands) => match rotate_commands.command {
            RotateSubcommands::Credentials => commands::rotate_credentials(&config)?,
        },
    }
    Ok(())
}
