//! Output formatting utilities for the CLI
//!
//! Tables for tunnels and forwards, the status view, report printing and
//! colored status messages.

use tabled::{settings::Style, Table, Tabled};

use l2_core::config::TunnelConfig;
use l2_core::report::{BatchReport, SequenceReport};
use l2_core::types::ForwardEntry;
use l2_reconciler::TunnelStatus;

/// Format stored tunnels, each paired with its live running state
pub fn format_tunnels(tunnels: &[(TunnelConfig, bool)]) -> String {
    if tunnels.is_empty() {
        return "No tunnels configured".to_string();
    }

    #[derive(Tabled)]
    struct TunnelRow {
        #[tabled(rename = "NAME")]
        name: String,
        #[tabled(rename = "INTERFACE")]
        interface: String,
        #[tabled(rename = "LOCAL")]
        local: String,
        #[tabled(rename = "REMOTE")]
        remote: String,
        #[tabled(rename = "TUNNEL ID")]
        tunnel_id: u32,
        #[tabled(rename = "FORWARDS")]
        forwards: usize,
        #[tabled(rename = "STATUS")]
        status: String,
    }

    let rows: Vec<TunnelRow> = tunnels
        .iter()
        .map(|(t, running)| TunnelRow {
            name: t.name.clone(),
            interface: t.interface_name(),
            local: or_dash(t.local_ip),
            remote: or_dash(t.remote_ip),
            tunnel_id: t.ids.tunnel_id,
            forwards: t.forwarded_ports.len(),
            status: if *running { "Running" } else { "Stopped" }.to_string(),
        })
        .collect();

    Table::new(rows).with(Style::rounded()).to_string()
}

/// Format port forwards as an ASCII table
pub fn format_forwards(forwards: &[ForwardEntry]) -> String {
    if forwards.is_empty() {
        return "No port forwards configured".to_string();
    }

    #[derive(Tabled)]
    struct ForwardRow {
        #[tabled(rename = "PORT")]
        port: u16,
        #[tabled(rename = "TARGET")]
        target: String,
        #[tabled(rename = "STATUS")]
        status: String,
        #[tabled(rename = "ENABLED")]
        enabled: String,
    }

    let rows: Vec<ForwardRow> = forwards
        .iter()
        .map(|f| ForwardRow {
            port: f.port,
            target: f.target.clone().unwrap_or_else(|| "-".to_string()),
            status: f.activity.to_string(),
            enabled: f.enablement.to_string(),
        })
        .collect();

    Table::new(rows).with(Style::rounded()).to_string()
}

/// Format a tunnel status as a human-readable block
pub fn format_status(status: &TunnelStatus) -> String {
    let mut output = String::new();

    output.push_str(&format!("Tunnel: {}\n", status.name));
    output.push_str(&format!(
        "Configured: {}\n",
        if status.configured { "yes" } else { "no" }
    ));
    output.push_str(&format!("Local IP: {}\n", or_dash(status.local_ip)));
    output.push_str(&format!("Remote IP: {}\n", or_dash(status.remote_ip)));
    output.push_str(&format!(
        "Tunnel ID: {} (peer {})\n",
        status.ids.tunnel_id, status.ids.peer_tunnel_id
    ));
    output.push_str(&format!(
        "Session ID: {} (peer {})\n",
        status.ids.session_id, status.ids.peer_session_id
    ));
    output.push_str(&format!("Tunnel: {}\n", status.tunnel));
    output.push_str(&format!("Session: {}\n", status.session));

    let link = &status.link;
    let state = match (link.exists, link.up) {
        (false, _) => "missing",
        (true, true) => "up",
        (true, false) => "down",
    };
    output.push_str(&format!("Interface: {} ({})\n", status.interface, state));
    output.push_str(&format!(
        "Address: {} (configured {})\n",
        or_dash(link.address),
        status.interface_address
    ));

    output.push_str("\n--- Tunnels ---\n");
    output.push_str(&raw_or_none(&status.tunnel_listing));
    output.push_str("\n--- Sessions ---\n");
    output.push_str(&raw_or_none(&status.session_listing));
    output.push_str("\n--- Interface ---\n");
    output.push_str(&raw_or_none(&status.interface_listing));
    output.push('\n');

    output
}

fn or_dash<T: ToString>(value: Option<T>) -> String {
    value
        .map(|v| v.to_string())
        .unwrap_or_else(|| "-".to_string())
}

fn raw_or_none(text: &str) -> String {
    if text.trim().is_empty() {
        "(none)".to_string()
    } else {
        text.to_string()
    }
}

/// Print a sequence report; a failed sequence ends with an error line
pub fn print_sequence(report: &SequenceReport) {
    println!("{}", report);
    if !report.success {
        print_error("Operation did not complete");
    }
}

/// Print a batch report, one line per item
pub fn print_batch(report: &BatchReport) {
    println!("{}", report);
    if !report.all_succeeded() {
        print_warning(&format!("{} of {} failed", report.failures(), report.len()));
    }
}

/// Print a success message in green with a checkmark prefix
pub fn print_success(msg: &str) {
    use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};

    let mut stdout = std::io::stdout();
    let _ = crossterm::execute!(
        stdout,
        SetForegroundColor(Color::Green),
        Print("✓ "),
        ResetColor,
        Print(msg),
        Print("\n")
    );
}

/// Print an error message in red with an X prefix, to stderr
pub fn print_error(msg: &str) {
    use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};

    let mut stderr = std::io::stderr();
    let _ = crossterm::execute!(
        stderr,
        SetForegroundColor(Color::Red),
        Print("✗ "),
        ResetColor,
        Print(msg),
        Print("\n")
    );
}

/// Print a warning message in yellow, to stderr
pub fn print_warning(msg: &str) {
    use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};

    let mut stderr = std::io::stderr();
    let _ = crossterm::execute!(
        stderr,
        SetForegroundColor(Color::Yellow),
        Print("⚠ "),
        ResetColor,
        Print(msg),
        Print("\n")
    );
}

/// Print an informational message in cyan
pub fn print_info(msg: &str) {
    use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};

    let mut stdout = std::io::stdout();
    let _ = crossterm::execute!(
        stdout,
        SetForegroundColor(Color::Cyan),
        Print("ℹ "),
        ResetColor,
        Print(msg),
        Print("\n")
    );
}
