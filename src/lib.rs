// Library exports for the hatchery worker deployer

pub mod cli;
pub mod config;
pub mod deploy;
pub mod error;
pub mod guardian;
pub mod ipc;
pub mod ports;
pub mod restart;
pub mod store;
pub mod worker;
pub mod workspace;
