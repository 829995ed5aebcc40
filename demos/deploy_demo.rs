// Example demonstrating the deployment lifecycle end to end

use hatchery::config::DeployerConfig;
use hatchery::deploy::Deployer;
use hatchery::worker::TenantId;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::PathBuf;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    println!("=== Deployment Demo ===\n");

    let root = PathBuf::from("/tmp/hatchery-demo");
    let _ = fs::remove_dir_all(&root);

    let config = DeployerConfig {
        data_dir: root.join("data"),
        template_dir: root.join("template"),
        socket_path: root.join("hatchery.sock"),
        ..DeployerConfig::default()
    };

    // Seed a worker template: a shell entry point plus a manifest
    fs::create_dir_all(&config.template_dir)?;
    let entry = config.template_dir.join(&config.entry_point);
    fs::write(&entry, "#!/bin/sh\necho \"worker up on $PORT\"\nsleep 60\n")?;
    let mut perms = fs::metadata(&entry)?.permissions();
    perms.set_mode(0o755);
    fs::set_permissions(&entry, perms)?;
    fs::write(config.template_dir.join(&config.manifest), "{}")?;

    let deployer = Deployer::new(config)?;

    // Deploy two tenants
    println!("Deploying workers...");
    for name in ["acme", "globex"] {
        let tenant = TenantId::parse(name)?;
        let deployment = deployer.deploy(&tenant, "demo-session-secret").await?;
        println!(
            "  - {} on port {} ({})",
            name, deployment.port, deployment.status
        );
    }

    // A duplicate deploy is rejected
    println!("\nDeploying acme again...");
    match deployer.deploy(&TenantId::parse("acme")?, "other-secret").await {
        Ok(_) => println!("  unexpected success"),
        Err(e) => println!("  rejected: {}", e),
    }

    // Stop one worker and show the merged views
    println!("\nStopping globex...");
    let status = deployer.stop(&TenantId::parse("globex")?)?;
    println!("  persisted status: {}", status);

    println!("\n=== Current Instances ===");
    let stats = deployer.stats()?;
    for view in &stats.instances {
        println!(
            "  {} [{}]: port={}, uptime={:?}",
            view.tenant_id.as_str(),
            view.status,
            view.port,
            view.uptime
        );
    }
    println!(
        "\n  online={}, offline={}, current={}, total deployed={}",
        stats.online, stats.offline, stats.current_instances, stats.total_deployed
    );

    // Cleanup
    println!("\nCleaning up...");
    for view in stats.instances {
        deployer.supervisor().kill(&view.tenant_id);
    }

    println!("Demo complete!");
    Ok(())
}
