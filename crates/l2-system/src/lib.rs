//! l2-system: operating-system bindings for l2tpctl
//!
//! Implements the capability traits of `l2-core` on a Linux host:
//! - [`ProcessRunner`]: external commands with a hard timeout
//! - [`StateInspector`]: parses `ip l2tp` and `ip addr` listings
//! - [`LinuxGateway`]: kernel tunnels, sessions and links through iproute2
//! - [`SystemdSupervisor`]: one socat relay unit per forwarded port

pub mod exec;
pub mod inspect;
pub mod linux;
pub mod prereq;
pub mod privilege;
pub mod systemd;

#[cfg(test)]
mod testing;

pub use exec::ProcessRunner;
pub use inspect::StateInspector;
pub use linux::LinuxGateway;
pub use prereq::install_prerequisites;
pub use privilege::is_privileged;
pub use systemd::SystemdSupervisor;
