// Output formatting and display for CLI

use crate::ipc::protocol::ResponseData;
use crate::store::{DeploymentStats, InstanceStatus, InstanceView};
use chrono::{DateTime, Local, Utc};
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;
use tabled::{
    settings::{object::Rows, Alignment, Modify, Style},
    Table, Tabled,
};

/// Print a success response to stdout
pub fn print_success(data: &ResponseData) {
    match data {
        ResponseData::Deployed(deployment) => {
            println!("{}", "✓ Worker deployed successfully".green().bold());
            println!("  {}: {}", "Tenant".bold(), deployment.tenant.as_str().cyan());
            println!("  {}: {}", "Port".bold(), deployment.port);
            println!(
                "  {}: {}",
                "Status".bold(),
                format_status_colored(&deployment.status)
            );
        }

        ResponseData::Stopped { tenant, status } => {
            println!(
                "{}",
                format!("✓ Worker for {} stopped", tenant).green().bold()
            );
            println!("  {}: {}", "Status".bold(), format_status_colored(status));
        }

        ResponseData::Status(view) => {
            print_detailed_status(view);
        }

        ResponseData::Stats(stats) => {
            print_instance_table(stats);
        }

        ResponseData::Removed { tenant } => {
            println!(
                "{}",
                format!("✓ Instance {} removed successfully", tenant)
                    .green()
                    .bold()
            );
        }

        ResponseData::Pong { uptime } => {
            println!("{}", "✓ Daemon is running".green().bold());
            println!("  {}: {}", "Uptime".bold(), format_duration(uptime));
        }
    }
}

/// Print an error message to stderr
pub fn print_error(error: &str) {
    eprintln!("{} {}", "✗ Error:".red().bold(), error);
}

/// Print a formatted table of instances
fn print_instance_table(stats: &DeploymentStats) {
    if stats.instances.is_empty() {
        println!("{}", "No instances are currently deployed".yellow());
        return;
    }

    #[derive(Tabled)]
    struct InstanceRow {
        #[tabled(rename = "Tenant")]
        tenant: String,
        #[tabled(rename = "Port")]
        port: String,
        #[tabled(rename = "Status")]
        status: String,
        #[tabled(rename = "Uptime")]
        uptime: String,
        #[tabled(rename = "Deployed")]
        deployed: String,
    }

    let rows: Vec<InstanceRow> = stats
        .instances
        .iter()
        .map(|view| InstanceRow {
            tenant: truncate(view.tenant_id.as_str(), 24),
            port: view.port.to_string(),
            status: format_status_colored(&view.status),
            uptime: format_duration(&view.uptime),
            deployed: format_local_time(&view.created_at),
        })
        .collect();

    let mut table = Table::new(rows);
    table
        .with(Style::rounded())
        .with(Modify::new(Rows::first()).with(Alignment::center()));

    println!("\n{}\n", table);
    println!(
        "{}",
        format!(
            "Online: {}  Offline: {}  Current: {}  Total deployed: {}",
            stats.online, stats.offline, stats.current_instances, stats.total_deployed
        )
        .dimmed()
        .italic()
    );
}

/// Print detailed status view for a single instance
fn print_detailed_status(view: &InstanceView) {
    println!("\n{}", "Instance Details".bold().underline());
    println!();
    println!(
        "  {:<15} {}",
        "Tenant:".bold(),
        view.tenant_id.as_str().cyan()
    );
    println!("  {:<15} {}", "Port:".bold(), view.port);
    println!(
        "  {:<15} {}",
        "Status:".bold(),
        format_status_colored(&view.status)
    );
    println!(
        "  {:<15} {}",
        "Uptime:".bold(),
        format_duration(&view.uptime)
    );
    println!(
        "  {:<15} {}",
        "Deployed:".bold(),
        format_local_time(&view.created_at)
    );

    if let Some(updated) = view.last_status_update {
        println!(
            "  {:<15} {}",
            "Last Update:".bold(),
            format_local_time(&updated)
        );
    }

    println!();
}

/// Format an instance status with color coding
fn format_status_colored(status: &InstanceStatus) -> String {
    match status {
        InstanceStatus::Online => status.to_string().green().to_string(),
        InstanceStatus::Starting => status.to_string().yellow().to_string(),
        InstanceStatus::Offline => status.to_string().bright_black().to_string(),
        InstanceStatus::Stopped => status.to_string().bright_black().to_string(),
        InstanceStatus::Failed => status.to_string().red().bold().to_string(),
    }
}

/// Format a UTC timestamp in local time
fn format_local_time(time: &DateTime<Utc>) -> String {
    let local: DateTime<Local> = time.with_timezone(&Local);
    local.format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Format a duration in human-readable format
fn format_duration(duration: &Duration) -> String {
    let secs = duration.as_secs();

    if secs < 60 {
        format!("{}s", secs)
    } else if secs < 3600 {
        let mins = secs / 60;
        let secs = secs % 60;
        if secs > 0 {
            format!("{}m {}s", mins, secs)
        } else {
            format!("{}m", mins)
        }
    } else if secs < 86400 {
        let hours = secs / 3600;
        let mins = (secs % 3600) / 60;
        if mins > 0 {
            format!("{}h {}m", hours, mins)
        } else {
            format!("{}h", hours)
        }
    } else {
        let days = secs / 86400;
        let hours = (secs % 86400) / 3600;
        if hours > 0 {
            format!("{}d {}h", days, hours)
        } else {
            format!("{}d", days)
        }
    }
}

/// Truncate a string to a maximum length
fn truncate(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        s.to_string()
    } else {
        format!("{}...", &s[..max_len - 3])
    }
}

/// Create a progress bar for long operations
pub fn create_progress_bar(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap()
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}
