//! Wallet removal command

use anyhow::{anyhow, Result};

use super::{print_success, print_warning, prompt_confirm, CliContext};

/// Run the remove command
pub fn run(ctx: &CliContext, identifier: &str, skip_confirm: bool) -> Result<()> {
    print_warning("Removing a wallet deletes its keys and history from this machine.");
    print_warning("Funds can only be recovered with the recovery phrase.");
    if !skip_confirm && !prompt_confirm(&format!("Remove wallet {identifier}?"))? {
        println!("Cancelled.");
        return Ok(());
    }

    let service = ctx.service()?;
    if !service.remove_wallet(identifier)? {
        return Err(anyhow!("No wallet named {identifier}"));
    }
    print_success(&format!("Wallet removed: {identifier}"));
    Ok(())
}
