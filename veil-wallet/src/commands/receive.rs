//! Receive a payment by its payment id

use anyhow::Result;

use super::{print_success, print_warning, CliContext};

/// Run the receive command
pub async fn run(ctx: &CliContext, payment_id: &str) -> Result<()> {
    let service = ctx.service()?;
    let session = ctx.login(&service)?;

    println!("Fetching output from {}...", ctx.config.nodes.join(", "));
    let result = service.receive_payment(&session, payment_id).await;
    service.logout(&session);

    if result? {
        print_success("Payment received.");
    } else {
        print_warning("This payment was already received.");
    }
    Ok(())
}
