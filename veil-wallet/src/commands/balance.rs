//! Balance check command

use anyhow::Result;

use super::{format_amount, print_success, CliContext};

/// Run the balance command
pub fn run(ctx: &CliContext) -> Result<()> {
    let service = ctx.service()?;
    let session = ctx.login(&service)?;

    let balance = service.available_balance(&session)?;
    println!();
    print_success(&format!("Balance: {}", format_amount(balance)));

    service.logout(&session);
    Ok(())
}
