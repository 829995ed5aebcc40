// Daemon core module
mod daemon_core {
    use hatchery::config::DeployerConfig;
    use hatchery::deploy::Deployer;
    use hatchery::error::Result;
    use hatchery::guardian::StructureGuardian;
    use hatchery::ipc::protocol::{Command, Response, ResponseData};
    use hatchery::ipc::server::IpcServer;
    use hatchery::restart::{ConfigWatcher, RestartController, RestartPlan};
    use hatchery::worker::TenantId;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};
    use std::time::SystemTime;
    use tokio::signal;
    use tokio::sync::RwLock;
    use tokio::task::JoinHandle;

    /// Background tasks tied to one deployed tenant
    struct TenantTasks {
        watcher: JoinHandle<()>,
        controller: JoinHandle<()>,
    }

    impl TenantTasks {
        fn abort(&self) {
            self.watcher.abort();
            self.controller.abort();
        }
    }

    type ControllerMap = Arc<Mutex<HashMap<TenantId, TenantTasks>>>;

    /// Main daemon struct that coordinates all components
    pub struct Daemon {
        /// Deployment orchestrator (store, supervisor, allocator)
        deployer: Arc<RwLock<Deployer>>,
        /// Restart watcher/controller tasks per deployed tenant
        controllers: ControllerMap,
        /// IPC server for client communication
        ipc_server: IpcServer,
        /// Daemon configuration, kept for per-tenant path derivation
        config: DeployerConfig,
        /// Time when daemon was started
        start_time: SystemTime,
    }

    impl Daemon {
        pub fn new(config: DeployerConfig) -> Result<Self> {
            let deployer = Arc::new(RwLock::new(Deployer::new(config.clone())?));
            let ipc_server = IpcServer::new(&config.socket_path);

            Ok(Self {
                deployer,
                controllers: Arc::new(Mutex::new(HashMap::new())),
                ipc_server,
                config,
                start_time: SystemTime::now(),
            })
        }

        /// Create the directory skeleton and bind the IPC socket
        fn initialize(&mut self) -> Result<()> {
            let guardian = StructureGuardian::new(
                self.config.guarded_roots(),
                self.config.guardian_interval(),
            );
            guardian.ensure_structure()?;
            tokio::spawn(guardian.run());

            self.ipc_server.start()?;
            tracing::info!(
                "IPC server listening on: {}",
                self.ipc_server.socket_path().display()
            );

            Ok(())
        }

        /// Start the daemon and run until a shutdown signal arrives
        pub async fn start(mut self) -> Result<()> {
            tracing::info!("Starting hatchery daemon");

            self.initialize()?;

            let deployer = self.deployer;
            let controllers = self.controllers;
            let config = self.config;
            let ipc_server = self.ipc_server;
            let start_time = self.start_time;

            let shutdown_signal = Self::setup_signal_handlers();

            let handler_deployer = Arc::clone(&deployer);
            let handler_controllers = Arc::clone(&controllers);
            let server_handle = tokio::spawn(async move {
                let result = ipc_server
                    .run(move |cmd| {
                        let deployer = Arc::clone(&handler_deployer);
                        let controllers = Arc::clone(&handler_controllers);
                        let config = config.clone();
                        async move {
                            Self::handle_command(cmd, deployer, controllers, config, start_time)
                                .await
                        }
                    })
                    .await;

                if let Err(e) = result {
                    tracing::error!("IPC server error: {}", e);
                }
            });

            let _ = shutdown_signal.await;

            tracing::info!("Received shutdown signal, stopping daemon");

            server_handle.abort();
            for (_, tasks) in controllers
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner())
                .drain()
            {
                tasks.abort();
            }

            // Workers are their own process groups and keep running; their
            // records read offline until the next deployment
            tracing::info!("Daemon stopped");

            Ok(())
        }

        /// Handle a command from a client
        async fn handle_command(
            command: Command,
            deployer: Arc<RwLock<Deployer>>,
            controllers: ControllerMap,
            config: DeployerConfig,
            start_time: SystemTime,
        ) -> Result<Response> {
            match command {
                Command::Deploy { tenant, session } => {
                    let tenant = TenantId::parse(&tenant)?;

                    let deployer = deployer.write().await;
                    let deployment = deployer.deploy(&tenant, &session).await?;

                    // Watch the tenant's config source for debounced restarts
                    let plan = RestartPlan {
                        tenant: tenant.clone(),
                        source: config.config_source(&tenant),
                        workdir: config.workdir(&tenant),
                        port: deployment.port,
                        debounce: config.debounce(),
                        grace: config.grace(),
                    };
                    let watcher = ConfigWatcher::new(plan.source.clone(), config.watch_interval());
                    let (events, watcher_task) = watcher.spawn();
                    let controller =
                        RestartController::new(plan, deployer.supervisor().clone());
                    let controller_task = tokio::spawn(controller.run(events));

                    let previous = Self::lock_controllers(&controllers).insert(
                        tenant.clone(),
                        TenantTasks {
                            watcher: watcher_task,
                            controller: controller_task,
                        },
                    );
                    if let Some(previous) = previous {
                        previous.abort();
                    }

                    Ok(Response::success(0, ResponseData::Deployed(deployment)))
                }

                Command::Stop { tenant } => {
                    let tenant = TenantId::parse(&tenant)?;

                    // The controller goes first so a pending restart cannot
                    // resurrect the worker after the kill
                    Self::abort_tenant_tasks(&controllers, &tenant);

                    let deployer = deployer.write().await;
                    let status = deployer.stop(&tenant)?;

                    Ok(Response::success(
                        0,
                        ResponseData::Stopped {
                            tenant: tenant.to_string(),
                            status,
                        },
                    ))
                }

                Command::Status { tenant } => {
                    let tenant = TenantId::parse(&tenant)?;
                    let deployer = deployer.read().await;
                    let view = deployer.status(&tenant)?;

                    Ok(Response::success(0, ResponseData::Status(view)))
                }

                Command::List => {
                    let deployer = deployer.read().await;
                    let stats = deployer.stats()?;

                    Ok(Response::success(0, ResponseData::Stats(stats)))
                }

                Command::Remove { tenant } => {
                    let tenant = TenantId::parse(&tenant)?;

                    Self::abort_tenant_tasks(&controllers, &tenant);

                    let deployer = deployer.write().await;
                    deployer.remove(&tenant)?;

                    Ok(Response::success(
                        0,
                        ResponseData::Removed {
                            tenant: tenant.to_string(),
                        },
                    ))
                }

                Command::Ping => {
                    let uptime = SystemTime::now()
                        .duration_since(start_time)
                        .unwrap_or_default();

                    Ok(Response::success(0, ResponseData::Pong { uptime }))
                }
            }
        }

        fn abort_tenant_tasks(controllers: &ControllerMap, tenant: &TenantId) {
            if let Some(tasks) = Self::lock_controllers(controllers).remove(tenant) {
                tasks.abort();
            }
        }

        fn lock_controllers(
            controllers: &ControllerMap,
        ) -> std::sync::MutexGuard<'_, HashMap<TenantId, TenantTasks>> {
            controllers
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner())
        }

        /// Setup signal handlers for graceful shutdown
        fn setup_signal_handlers() -> tokio::sync::oneshot::Receiver<()> {
            let (tx, rx) = tokio::sync::oneshot::channel();

            tokio::spawn(async move {
                let mut sigterm = signal::unix::signal(signal::unix::SignalKind::terminate())
                    .expect("Failed to setup SIGTERM handler");
                let mut sigint = signal::unix::signal(signal::unix::SignalKind::interrupt())
                    .expect("Failed to setup SIGINT handler");

                tokio::select! {
                    _ = sigterm.recv() => {
                        tracing::info!("Received SIGTERM");
                    }
                    _ = sigint.recv() => {
                        tracing::info!("Received SIGINT");
                    }
                }

                let _ = tx.send(());
            });

            rx
        }
    }
}

use daemon_core::Daemon;
use hatchery::config::DeployerConfig;
use hatchery::error::{HatcheryError, Result};
use std::env;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let mut config = DeployerConfig::default();
    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => {
                let path = args.next().ok_or_else(|| {
                    HatcheryError::ConfigError("--config requires a path".to_string())
                })?;
                config = DeployerConfig::from_file(&PathBuf::from(path))?;
            }
            other => {
                return Err(HatcheryError::ConfigError(format!(
                    "Unknown argument: {}",
                    other
                )));
            }
        }
    }

    let daemon = Daemon::new(config)?;
    daemon.start().await
}
