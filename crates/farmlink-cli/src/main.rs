//! FarmLink CLI
//!
//! The command-line interface for syncing Stardew Valley saves, mods and
//! configs with an attached Android device.

mod cli;
mod commands;
mod confirm;
mod context;
mod error;

use clap::Parser;
use colored::Colorize;
use farmlink_core::RunContext;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use cli::{Cli, Commands};
use confirm::PromptConfirmer;
use context::Session;
use error::Result;

fn main() {
    if let Err(e) = run() {
        eprintln!("{}: {}", "error".red().bold(), e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    // Usage errors exit 1 like every other failure; help and version print
    // to stdout and exit 0.
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            std::process::exit(if e.use_stderr() { 1 } else { 0 });
        }
    };

    // Setup tracing if verbose
    if cli.verbose {
        let subscriber = FmtSubscriber::builder()
            .with_max_level(Level::DEBUG)
            .with_target(true)
            .finish();
        tracing::subscriber::set_global_default(subscriber)
            .expect("Failed to set tracing subscriber");
        tracing::debug!("Verbose mode enabled");
    }

    let ctx = RunContext {
        dry_run: cli.dry_run,
        force: cli.force,
    };

    match cli.command {
        Some(cmd) => execute_command(cmd, ctx),
        None => {
            // No command provided - show help hint
            println!("{} Stardew Valley device sync", "farmlink".green().bold());
            println!();
            println!("Run {} for available commands.", "farmlink --help".cyan());
            Ok(())
        }
    }
}

fn execute_command(cmd: Commands, ctx: RunContext) -> Result<()> {
    let mut session = Session::open(ctx)?;
    let mut confirmer = PromptConfirmer;

    match cmd {
        Commands::Sync => commands::run_sync(&session, &mut confirmer),
        Commands::Status => commands::run_status(&session),
        Commands::Saves => commands::run_saves(&session, &mut confirmer),
        Commands::PullSaves => commands::run_pull_saves(&session, &mut confirmer),
        Commands::PushSaves => commands::run_push_saves(&session, &mut confirmer),
        Commands::Mods => commands::run_mods(&session),
        Commands::PullMods => commands::run_pull_mods(&session, &mut confirmer),
        Commands::PushMods => commands::run_push_mods(&session, &mut confirmer),
        Commands::Configs => commands::run_configs(&session),
        Commands::PullConfigs => commands::run_pull_configs(&session),
        Commands::PushConfigs => commands::run_push_configs(&session),
        Commands::CheckUpdates => commands::run_check_updates(&session),
        Commands::Update { name } => {
            commands::run_update(&session, name.as_deref(), &mut confirmer)
        }
        Commands::Deploy => commands::run_deploy(&session, &mut confirmer),
        Commands::Logs => commands::run_logs(&session),
        Commands::Launch { tap } => {
            let tap = tap.map(|t| (t[0], t[1]));
            commands::run_launch(&mut session, tap)
        }
        Commands::ApkStatus => commands::run_apk_status(&session),
        Commands::ApkPull { dest } => commands::run_apk_pull(&session, dest),
        Commands::ApkInstall { apk } => commands::run_apk_install(&session, &apk),
        Commands::SmapiInstall { apk } => commands::run_smapi_install(&session, &apk),
    }
}
