//! l2tpctl CLI
//!
//! Provisions L2TPv3 ethernet pseudowires between two hosts and relays TCP
//! ports across them:
//! - Prerequisites (packages and kernel modules)
//! - Tunnel lifecycle (create, up, down, delete, status)
//! - Port forwards (one supervised relay per port)

use std::net::Ipv4Addr;
use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use l2tpctl::commands::{self, Context, TunnelFields};
use l2tpctl::output::print_error;

#[derive(Parser)]
#[command(name = "l2tpctl")]
#[command(author, version, about = "L2TPv3 pseudowire tunnel and port-forward manager")]
#[command(propagate_version = true)]
struct Cli {
    /// Path to settings file
    #[arg(short, long, global = true, env = "L2TPCTL_CONFIG")]
    config: Option<PathBuf>,

    /// Directory holding the tunnel records (overrides the settings file)
    #[arg(long, global = true, env = "L2TPCTL_TUNNELS_DIR")]
    tunnels_dir: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Install packages and load the L2TP kernel modules
    Prereq,

    /// Manage tunnels
    Tunnel {
        #[command(subcommand)]
        action: TunnelAction,
    },

    /// Manage port forwards of a tunnel
    #[command(alias = "fwd")]
    Forward {
        #[command(subcommand)]
        action: ForwardAction,
    },

    /// Show settings
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum TunnelAction {
    /// Create a tunnel, bring it up and store it
    Create {
        /// Tunnel name
        name: String,

        /// Public address of this host
        #[arg(long)]
        local_ip: Ipv4Addr,

        /// Public address of the opposite host
        #[arg(long)]
        remote_ip: Ipv4Addr,

        #[command(flatten)]
        fields: TunnelFields,
    },

    /// Bring a stored tunnel up (safe to repeat)
    Up {
        name: String,
    },

    /// Tear a stored tunnel down, keeping its record
    Down {
        name: String,
    },

    /// Remove forwards, tear down and delete a tunnel
    #[command(alias = "rm")]
    Delete {
        name: String,

        /// Delete the record even if teardown failed
        #[arg(short, long)]
        force: bool,
    },

    /// List stored tunnels with their live state
    #[command(alias = "ls")]
    List,

    /// Show configuration and live kernel state of a tunnel
    Status {
        name: String,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Change fields of a stored tunnel
    Set {
        name: String,

        /// Public address of this host
        #[arg(long)]
        local_ip: Option<Ipv4Addr>,

        /// Public address of the opposite host
        #[arg(long)]
        remote_ip: Option<Ipv4Addr>,

        #[command(flatten)]
        fields: TunnelFields,
    },
}

#[derive(Subcommand)]
enum ForwardAction {
    /// Forward ports, e.g. `80,443,8080`
    Add { name: String, ports: String },

    /// Stop forwarding ports
    #[command(alias = "rm")]
    Remove { name: String, ports: String },

    /// List forwarded ports and their service state
    #[command(alias = "ls")]
    List { name: String },

    /// Start every forward, recreating missing services
    Start { name: String },

    /// Stop every forward
    Stop { name: String },

    /// Rewrite and restart every forward
    Restart { name: String },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show settings file path
    Path,
    /// Show effective settings
    Show,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    let log_level = match (cli.quiet, cli.verbose) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "info",
        (false, 2) => "debug",
        (false, _) => "trace",
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| log_level.into()),
        ))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    let ctx = Context::load(cli.config, cli.tunnels_dir)?;

    let outcome = match cli.command {
        Commands::Prereq => commands::prereq_command(&ctx).await,

        Commands::Tunnel { action } => match action {
            TunnelAction::Create {
                name,
                local_ip,
                remote_ip,
                fields,
            } => commands::tunnel_create(&ctx, &name, local_ip, remote_ip, fields).await,
            TunnelAction::Up { name } => commands::tunnel_up(&ctx, &name).await,
            TunnelAction::Down { name } => commands::tunnel_down(&ctx, &name).await,
            TunnelAction::Delete { name, force } => {
                commands::tunnel_delete(&ctx, &name, force).await
            }
            TunnelAction::List => commands::tunnel_list(&ctx).await,
            TunnelAction::Status { name, json } => {
                commands::tunnel_status(&ctx, &name, json).await
            }
            TunnelAction::Set {
                name,
                local_ip,
                remote_ip,
                fields,
            } => commands::tunnel_set(&ctx, &name, local_ip, remote_ip, fields).await,
        },

        Commands::Forward { action } => match action {
            ForwardAction::Add { name, ports } => commands::forward_add(&ctx, &name, &ports).await,
            ForwardAction::Remove { name, ports } => {
                commands::forward_remove(&ctx, &name, &ports).await
            }
            ForwardAction::List { name } => commands::forward_list(&ctx, &name).await,
            ForwardAction::Start { name } => commands::forward_start(&ctx, &name).await,
            ForwardAction::Stop { name } => commands::forward_stop(&ctx, &name).await,
            ForwardAction::Restart { name } => commands::forward_restart(&ctx, &name).await,
        },

        Commands::Config { action } => match action {
            ConfigAction::Path => commands::config_path(&ctx),
            ConfigAction::Show => commands::config_show(&ctx),
        },
    };

    match outcome {
        Ok(true) => Ok(()),
        Ok(false) => std::process::exit(1),
        Err(e) => {
            print_error(&format!("{:#}", e));
            std::process::exit(1);
        }
    }
}
