//! Mod sync commands

use farmlink_core::Confirmer;

use super::print_report;
use crate::context::Session;
use crate::error::Result;

/// Push local mods missing on the device; device-only mods are reported.
pub fn run_mods(session: &Session) -> Result<()> {
    session.print_device_banner();
    let report = session.engine()?.push_missing_mods()?;
    print_report("mods", &report);
    Ok(())
}

/// Pull every device mod.
pub fn run_pull_mods(session: &Session, confirmer: &mut dyn Confirmer) -> Result<()> {
    session.print_device_banner();
    let report = session.engine()?.pull_all_mods(confirmer)?;
    print_report("pull-mods", &report);
    Ok(())
}

/// Push every local mod to the device.
pub fn run_push_mods(session: &Session, confirmer: &mut dyn Confirmer) -> Result<()> {
    session.print_device_banner();
    let report = session.engine()?.push_all_mods(confirmer)?;
    print_report("push-mods", &report);
    Ok(())
}
