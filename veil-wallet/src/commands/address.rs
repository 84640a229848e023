//! Show wallet receive addresses

use anyhow::Result;

use super::{print_success, CliContext};

/// Run the address command
pub fn run(ctx: &CliContext, new: bool) -> Result<()> {
    let service = ctx.service()?;
    let session = ctx.login(&service)?;

    if new {
        let key_set = service.add_key_set(&session)?;
        print_success(&format!("New address ({}):", key_set.key_path));
        println!("{}", key_set.stealth_address);
    } else {
        println!();
        for (i, address) in service.addresses(&session)?.iter().enumerate() {
            println!("  {i}: {address}");
        }
    }

    service.logout(&session);
    Ok(())
}
