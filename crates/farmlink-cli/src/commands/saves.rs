//! Save sync commands

use farmlink_core::Confirmer;

use super::print_report;
use crate::context::Session;
use crate::error::Result;

/// Bidirectional save sync.
pub fn run_saves(session: &Session, confirmer: &mut dyn Confirmer) -> Result<()> {
    session.print_device_banner();
    let report = session.engine()?.sync_saves(confirmer)?;
    print_report("saves", &report);
    Ok(())
}

/// Pull every device save, backing up local copies first.
pub fn run_pull_saves(session: &Session, confirmer: &mut dyn Confirmer) -> Result<()> {
    session.print_device_banner();
    let report = session.engine()?.pull_all_saves(confirmer)?;
    print_report("pull-saves", &report);
    Ok(())
}

/// Push every local save to the device.
pub fn run_push_saves(session: &Session, confirmer: &mut dyn Confirmer) -> Result<()> {
    session.print_device_banner();
    let report = session.engine()?.push_all_saves(confirmer)?;
    print_report("push-saves", &report);
    Ok(())
}
