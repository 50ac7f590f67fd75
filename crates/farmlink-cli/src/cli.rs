//! CLI argument parsing using clap derive

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// FarmLink - sync Stardew Valley saves, mods and configs with an Android device
#[derive(Parser, Debug)]
#[command(name = "farmlink")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Preview actions without touching the device or local files
    #[arg(long, global = true)]
    pub dry_run: bool,

    /// Skip confirmation prompts; the newer side wins
    #[arg(short, long, global = true)]
    pub force: bool,

    /// The command to run
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available commands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Full sync: saves, configs, and missing mods
    Sync,

    /// Show device, profile and local-mirror status
    Status,

    /// Bidirectional save sync
    Saves,

    /// Pull every device save (backs up local copies first)
    PullSaves,

    /// Push every local save to the device
    PushSaves,

    /// Push local mods missing on the device
    Mods,

    /// Pull every device mod
    PullMods,

    /// Push every local mod to the device
    PushMods,

    /// Bidirectional config sync (newer side wins, no prompts)
    Configs,

    /// Pull every mod config from the device
    PullConfigs,

    /// Push every mod config to the device
    PushConfigs,

    /// Check the update catalog for newer mod versions
    CheckUpdates,

    /// Download and install mod updates
    ///
    /// Without a name, every mod with an available update is offered.
    Update {
        /// Only update the named mod
        name: Option<String>,
    },

    /// Push all mods and configs to the device
    Deploy,

    /// Pull the current SMAPI log from the device
    Logs,

    /// Force-stop and relaunch the game
    Launch {
        /// Screen tap sent after the splash delay (stored in the profile)
        #[arg(long, value_names = ["X", "Y"], num_args = 2)]
        tap: Option<Vec<u32>>,
    },

    /// Show whether the game package is installed, and its version
    ApkStatus,

    /// Pull the installed game APK from the device
    ApkPull {
        /// Destination directory (defaults to the downloads directory)
        #[arg(long)]
        dest: Option<PathBuf>,
    },

    /// Install an APK on the device
    ApkInstall {
        /// Path to the APK
        apk: PathBuf,
    },

    /// Install the SMAPI loader APK and wait for its data root to appear
    SmapiInstall {
        /// Path to the loader APK
        apk: PathBuf,
    },
}
