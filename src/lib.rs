pub mod config;
pub mod connection;
pub mod error;
pub mod logging;
pub mod resources;
pub mod tasks;

pub use config::ClientConfig;
pub use connection::{Connection, Credentials, HttpConnection};
pub use error::{OneViewError, Result};
pub use tasks::{Task, TaskMonitor, TaskOutcome, WaitTimeout};
