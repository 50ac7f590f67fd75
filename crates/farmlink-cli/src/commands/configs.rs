//! Config sync commands
//!
//! Config flows never prompt and never back up; the newer side wins.

use super::print_report;
use crate::context::Session;
use crate::error::Result;

/// Bidirectional config sync.
pub fn run_configs(session: &Session) -> Result<()> {
    session.print_device_banner();
    let report = session.engine()?.sync_configs()?;
    print_report("configs", &report);
    Ok(())
}

/// Pull every mod config from the device.
pub fn run_pull_configs(session: &Session) -> Result<()> {
    session.print_device_banner();
    let report = session.engine()?.pull_all_configs()?;
    print_report("pull-configs", &report);
    Ok(())
}

/// Push every mod config to the device.
pub fn run_push_configs(session: &Session) -> Result<()> {
    session.print_device_banner();
    let report = session.engine()?.push_all_configs()?;
    print_report("push-configs", &report);
    Ok(())
}
