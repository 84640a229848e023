//! Re-import outputs into a restored wallet

use anyhow::{anyhow, Result};

use super::{print_success, print_warning, prompt_confirm, CliContext};

/// Run the recover command
pub async fn run(ctx: &CliContext, payment_ids: &[String], reset: bool) -> Result<()> {
    if payment_ids.is_empty() {
        return Err(anyhow!("Give at least one payment id"));
    }
    if reset {
        print_warning("All stored transactions will be dropped before recovery.");
        if !prompt_confirm("Continue?")? {
            println!("Cancelled.");
            return Ok(());
        }
    }

    let service = ctx.service()?;
    let session = ctx.login(&service)?;

    println!("Fetching {} output(s)...", payment_ids.len());
    let result = service.recover_payments(&session, payment_ids, reset).await;
    service.logout(&session);

    let recovered = result?;
    if recovered == 0 {
        print_warning("No new outputs belong to this wallet.");
    } else {
        print_success(&format!("Recovered {recovered} output(s)."));
    }
    Ok(())
}
