//! l2tpctl: Command-line interface for L2TPv3 tunnels and port forwards
//!
//! Provides the `l2tpctl` binary for provisioning tunnels, managing their
//! relayed ports and inspecting live kernel state.

pub mod commands;
pub mod output;
