// IPC module - Unix-socket communication between client and daemon

pub mod client;
pub mod protocol;
pub mod server;

pub use client::IpcClient;
pub use protocol::{Command, Request, Response, ResponseData};
pub use server::IpcServer;
