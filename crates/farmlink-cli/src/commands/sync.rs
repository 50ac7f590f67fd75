//! Full sync command

use colored::Colorize;
use farmlink_core::Confirmer;

use super::print_report;
use crate::context::Session;
use crate::error::Result;

/// Run the full sync flow: saves, configs, then missing mods.
pub fn run_sync(session: &Session, confirmer: &mut dyn Confirmer) -> Result<()> {
    session.print_device_banner();
    let engine = session.engine()?;

    println!();
    println!("{}", "Saves".bold());
    let saves = engine.sync_saves(confirmer)?;
    print_report("saves", &saves);

    println!();
    println!("{}", "Configs".bold());
    let configs = engine.sync_configs()?;
    print_report("configs", &configs);

    println!();
    println!("{}", "Mods".bold());
    let mods = engine.push_missing_mods()?;
    print_report("mods", &mods);

    Ok(())
}
