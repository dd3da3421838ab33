//! Capability traits between the reconcilers and the operating system

mod gateway;
mod runner;
mod supervisor;

pub use gateway::{Listings, SessionSpec, SystemGateway, TunnelSpec};
pub use runner::{CommandOutput, CommandRunner, TIMEOUT_EXIT_CODE};
pub use supervisor::ServiceSupervisor;
