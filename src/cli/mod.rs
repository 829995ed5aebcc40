// CLI module - user-facing command-line interface

mod output;

use crate::error::{HatcheryError, Result};
use crate::ipc::client::IpcClient;
use crate::ipc::protocol::Command;
use crate::worker::TenantId;
use clap::{Parser, Subcommand};

/// Hatchery - per-tenant worker deployer
#[derive(Parser)]
#[command(name = "hatchery")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Deploy a worker for a tenant
    Deploy {
        /// Tenant identity to deploy for
        tenant: String,

        /// Session secret handed to the worker
        #[arg(short, long)]
        session: String,
    },

    /// Stop a tenant's worker, keeping its record
    Stop {
        /// Tenant whose worker to stop
        tenant: String,
    },

    /// Show the status of one tenant
    Status {
        /// Tenant to inspect
        tenant: String,
    },

    /// List all instances with aggregate stats
    List,

    /// Remove a tenant's record entirely
    Remove {
        /// Tenant to remove
        tenant: String,
    },

    /// Check whether the daemon is alive
    Ping,
}

impl Cli {
    /// Run the CLI application
    pub fn run() -> Result<()> {
        let cli = Cli::parse();
        cli.execute()
    }

    /// Execute the parsed command
    fn execute(&self) -> Result<()> {
        let command = self.build_command()?;

        // Deploys take a moment: template copy, env rendering, spawn
        let spinner = match &command {
            Command::Deploy { tenant, .. } => Some(output::create_progress_bar(&format!(
                "Deploying worker for {}...",
                tenant
            ))),
            _ => None,
        };

        let client = IpcClient::new();
        let response = client.send_command(command);

        if let Some(spinner) = spinner {
            spinner.finish_and_clear();
        }

        let response = match response {
            Ok(response) => response,
            Err(e) => {
                output::print_error(&e.to_string());
                return Err(e);
            }
        };

        match response.result {
            Ok(data) => {
                output::print_success(&data);
                Ok(())
            }
            Err(error_msg) => {
                output::print_error(&error_msg);
                Err(HatcheryError::Other(error_msg))
            }
        }
    }

    /// Build an IPC command from the CLI arguments
    fn build_command(&self) -> Result<Command> {
        match &self.command {
            Commands::Deploy { tenant, session } => Ok(Command::Deploy {
                tenant: validated_tenant(tenant)?,
                session: session.clone(),
            }),

            Commands::Stop { tenant } => Ok(Command::Stop {
                tenant: validated_tenant(tenant)?,
            }),

            Commands::Status { tenant } => Ok(Command::Status {
                tenant: validated_tenant(tenant)?,
            }),

            Commands::List => Ok(Command::List),

            Commands::Remove { tenant } => Ok(Command::Remove {
                tenant: validated_tenant(tenant)?,
            }),

            Commands::Ping => Ok(Command::Ping),
        }
    }
}

/// Validate a tenant id before it crosses the wire
///
/// The daemon validates again; checking here gives immediate feedback
/// without a round trip.
fn validated_tenant(raw: &str) -> Result<String> {
    Ok(TenantId::parse(raw)?.to_string())
}
