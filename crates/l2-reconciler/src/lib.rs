//! l2-reconciler: Idempotent tunnel and port-forward reconciliation
//!
//! The reconcilers work against the capability traits of `l2-core`, never
//! against the OS directly. Each operation inspects live state first, then
//! issues the smallest change that moves it toward the tunnel record.

pub mod forward;
pub mod lifecycle;
pub mod tunnel;

#[cfg(test)]
mod fake;

pub use forward::{parse_port_list, ForwardReconciler};
pub use lifecycle::TunnelManager;
pub use tunnel::{TunnelReconciler, TunnelStatus};
