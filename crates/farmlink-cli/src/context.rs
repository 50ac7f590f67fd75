//! Per-invocation session state
//!
//! One [`Session`] per command: loaded configuration, the local mirror, the
//! detected transport (if any), and the device profile store. Detection runs
//! once; a successful detection refreshes the device's profile on disk.

use colored::Colorize;
use farmlink_core::{
    AppConfig, LocalLayout, ProfileStore, ReconciliationEngine, RunContext,
};
use farmlink_transport::{Transport, detect};
use tracing::debug;

use crate::error::{CliError, Result};

pub struct Session {
    pub config: AppConfig,
    pub layout: LocalLayout,
    pub ctx: RunContext,
    pub transport: Option<Transport>,
    pub profiles: ProfileStore,
}

impl Session {
    /// Load configuration, prepare the mirror, and detect the device.
    pub fn open(ctx: RunContext) -> Result<Self> {
        let config = AppConfig::load()?;
        let layout = config.layout();
        layout.ensure()?;

        let mut profiles = ProfileStore::load(ProfileStore::default_path(layout.root()))?;
        let transport = detect(ctx.dry_run);
        match &transport {
            Some(transport) => {
                debug!(kind = %transport.kind(), device = %transport.display_name(), "device detected");
                profiles.record_detection(transport);
                profiles.save()?;
            }
            None => debug!("no device detected"),
        }

        Ok(Self {
            config,
            layout,
            ctx,
            transport,
            profiles,
        })
    }

    /// The live transport, or a fatal error for device-requiring commands.
    pub fn require_transport(&self) -> Result<&Transport> {
        self.transport
            .as_ref()
            .ok_or(CliError::Transport(farmlink_transport::Error::TransportUnavailable))
    }

    /// A reconciliation engine over the live transport.
    pub fn engine(&self) -> Result<ReconciliationEngine<'_, Transport>> {
        let transport = self.require_transport()?;
        Ok(ReconciliationEngine::new(
            transport,
            self.layout.clone(),
            &self.config,
            self.ctx,
        ))
    }

    /// One-line device banner shown at the top of device commands.
    pub fn print_device_banner(&self) {
        match &self.transport {
            Some(t) => println!(
                "{} {} ({}, {})",
                "Device:".bold(),
                t.display_name().cyan(),
                t.model(),
                t.kind()
            ),
            None => println!("{}", "No device connected".yellow()),
        }
    }
}
