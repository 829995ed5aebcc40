// Worker module - per-tenant worker process lifecycle

mod liveness;
mod output;
pub mod spawner;
mod supervisor;
mod types;

pub use liveness::LivenessProbe;
pub use spawner::{spawn_worker, SpawnedWorker};
pub use supervisor::WorkerSupervisor;
pub use types::{TenantId, WorkerHandle};
