//! Transaction history command

use anyhow::Result;

use super::{format_amount, CliContext};

/// Run the history command
pub fn run(ctx: &CliContext, limit: usize) -> Result<()> {
    let service = ctx.service()?;
    let session = ctx.login(&service)?;
    let history = service.history(&session)?;
    service.logout(&session);

    if history.is_empty() {
        println!("No transactions yet.");
        return Ok(());
    }

    let skip = history.len().saturating_sub(limit);
    println!();
    println!(
        "{:<20} {:>22} {:>22} {:>22}  {}",
        "Date", "In", "Out", "Balance", "Memo"
    );
    println!("{}", "-".repeat(100));
    for row in history.iter().skip(skip) {
        println!(
            "{:<20} {:>22} {:>22} {:>22}  {}",
            row.date_time.format("%Y-%m-%d %H:%M:%S"),
            format_amount(row.money_in),
            format_amount(row.money_out),
            format_amount(row.balance),
            row.memo
        );
    }
    Ok(())
}
