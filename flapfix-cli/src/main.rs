mod config;

use anyhow::Context;
use clap::{Parser, Subcommand};
use config::{CheckArgs, InstallArgs, OutputFormat, PatchArgs};
use flapfix_core::adapters::{SystemPorts, SystemPython};
use flapfix_core::pipeline::PACKAGE_DIR;
use flapfix_core::ports::PythonPort;
use flapfix_core::run_install;
use flapfix_patch::{FsTree, apply_patches, builtin_patches, preview_patches};
use flapfix_probe::Prober;
use flapfix_types::{CheckStatus, PatchStatus, ProbeReport};
use std::process::ExitCode;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "flapfix",
    version,
    about = "Patch-driven installer for the NextFLAP planner's native Python extension."
)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Verify prerequisites, patch the sources, build, install, and verify.
    Install(InstallArgs),
    /// Probe the environment and report every prerequisite.
    Check(CheckArgs),
    /// Apply (or preview) the source-compatibility patches.
    Patch(PatchArgs),
}

fn main() -> ExitCode {
    if let Err(e) = real_main() {
        error!("{:?}", e);
        return ExitCode::from(1);
    }
    ExitCode::from(0)
}

fn real_main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Install(args) => cmd_install(args),
        Command::Check(args) => cmd_check(args),
        Command::Patch(args) => cmd_patch(args),
    }
}

fn cmd_install(args: InstallArgs) -> anyhow::Result<()> {
    let settings = args.into_settings();
    let ports = SystemPorts::from_settings(&settings);

    let outcome = run_install(&settings, &ports.as_ports())?;

    for patch in &outcome.patches {
        let status = match patch.status {
            PatchStatus::Applied => "applied",
            PatchStatus::AlreadyApplied => "already applied",
        };
        info!(patch = %patch.id, status, "source patch");
    }
    if outcome.synthesized_prefix {
        info!("build used a synthesized Z3 prefix");
    }

    println!("Installed NextFLAP into {}", outcome.installed_to);
    Ok(())
}

fn cmd_check(args: CheckArgs) -> anyhow::Result<()> {
    let (settings, format) = args.into_settings();
    let prober = Prober::new(&settings.python)
        .with_cxx(&settings.cxx)
        .with_pkg_config(&settings.pkg_config);
    let report = prober.probe();

    match format {
        OutputFormat::Text => print_report(&report),
        OutputFormat::Json => println!(
            "{}",
            serde_json::to_string_pretty(&report).context("serialize report")?
        ),
    }

    if !report.is_pass() {
        anyhow::bail!("prerequisite checks failed");
    }
    Ok(())
}

fn print_report(report: &ProbeReport) {
    println!("Environment report for '{}':\n", report.interpreter);
    println!("  {:<22} {:<6} DETAIL", "CHECK", "STATUS");
    println!("  {:<22} {:<6} ------", "-----", "------");
    for check in &report.checks {
        let status = match check.status {
            CheckStatus::Pass => "pass",
            CheckStatus::Warn => "warn",
            CheckStatus::Fail => "FAIL",
        };
        println!(
            "  {:<22} {:<6} {}",
            check.id,
            status,
            check.detail.as_deref().unwrap_or("-")
        );
    }

    let failures: Vec<_> = report.failures().collect();
    if !failures.is_empty() {
        println!();
        for check in failures {
            if let Some(remediation) = &check.remediation {
                println!("  fix {}: {}", check.id, remediation);
            }
        }
    }
}

fn cmd_patch(args: PatchArgs) -> anyhow::Result<()> {
    let python = SystemPython::new(&args.python);

    let source = match &args.source {
        Some(source) => source.clone(),
        None => python
            .site_packages()
            .context("locate site-packages; pass --source to patch a local tree")?
            .join(PACKAGE_DIR),
    };
    if !source.exists() {
        anyhow::bail!("source tree not found at {source}");
    }

    // The known-good shim copy lives in the pip-installed package; when the
    // interpreter cannot tell us where that is, fall back to the tree
    // itself (the shim patch then only succeeds if the file is present).
    let sibling = match python.site_packages() {
        Ok(site) => site.join(PACKAGE_DIR).join("nextflap.py"),
        Err(e) => {
            debug!(error = %e, "no site-packages; using the tree as the shim source");
            source.join("nextflap.py")
        }
    };

    let patches = builtin_patches(sibling);
    let mut tree = FsTree::new(source.clone());

    if args.dry_run {
        let diff = preview_patches(&tree, &patches)?;
        if diff.is_empty() {
            println!("Nothing to patch; {source} is already in the patched state.");
        } else {
            print!("{diff}");
        }
        return Ok(());
    }

    let outcomes = apply_patches(&mut tree, &patches)?;
    for outcome in &outcomes {
        let marker = match outcome.status {
            PatchStatus::Applied => "~",
            PatchStatus::AlreadyApplied => " ",
        };
        println!("  {} {:<26} {}", marker, outcome.id, outcome.title);
    }
    Ok(())
}
