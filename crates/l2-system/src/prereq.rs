//! Kernel module and package prerequisites

use l2_core::error::ReconcileError;
use l2_core::report::{SequenceReport, Step};
use l2_core::traits::CommandRunner;

/// Kernel modules the L2TPv3 ethernet pseudowire needs
pub const L2TP_MODULES: [&str; 3] = ["l2tp_core", "l2tp_netlink", "l2tp_eth"];

fn step(label: &str) -> Step {
    Step::Other(label.to_string())
}

/// Install packages, load the L2TP modules and verify them
///
/// Package installation failures are warnings: the modules may already ship
/// with the running kernel. A module that does not load aborts the sequence.
pub async fn install_prerequisites(runner: &dyn CommandRunner) -> SequenceReport {
    let mut report = SequenceReport::new("Installing prerequisites");

    let uname = runner.run("uname", &["-r"]).await;
    if !uname.success {
        report.record(
            step("Kernel release"),
            Err(ReconcileError::CommandFailed(format!(
                "Failed to get kernel version: {}",
                uname.detail()
            ))),
        );
        return report.abort();
    }
    let release = uname.stdout.trim().to_string();
    report.record(step("Kernel release"), Ok(release.clone()));

    let modules_pkg = format!("linux-modules-extra-{}", release);
    let out = runner
        .run("apt-get", &["install", "-y", modules_pkg.as_str()])
        .await;
    let msg = if out.success {
        format!("{} installed", modules_pkg)
    } else {
        tracing::warn!("Could not install {}: {}", modules_pkg, out.detail());
        format!("Warning: Could not install modules package: {}", out.detail())
    };
    report.record(step("Install modules package"), Ok(msg));

    let out = runner.run("apt-get", &["install", "-y", "iproute2"]).await;
    let msg = if out.success {
        "iproute2 installed".to_string()
    } else {
        tracing::warn!("Could not install iproute2: {}", out.detail());
        format!("Warning: Could not install iproute2: {}", out.detail())
    };
    report.record(step("Install iproute2"), Ok(msg));

    for module in L2TP_MODULES {
        let out = runner.run("modprobe", &[module]).await;
        let label = format!("Load {}", module);
        if out.success {
            report.record(step(&label), Ok(format!("Module {} loaded", module)));
        } else {
            report.record(
                step(&label),
                Err(ReconcileError::CommandFailed(format!(
                    "Failed to load module {}: {}",
                    module,
                    out.detail()
                ))),
            );
            return report.abort();
        }
    }

    let lsmod = runner.run("lsmod", &[]).await;
    if lsmod.success && lsmod.stdout.lines().any(|l| l.starts_with("l2tp")) {
        report.record(step("Verify modules"), Ok("L2TP modules loaded".into()));
        report.finish("All prerequisites installed successfully!")
    } else {
        report.record(
            step("Verify modules"),
            Err(ReconcileError::PrerequisiteMissing(
                "L2TP modules not found in lsmod".into(),
            )),
        );
        report.abort()
    }
}
