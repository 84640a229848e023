//! Send transaction command

use anyhow::{anyhow, Result};
use veil_transaction_core::SessionType;

use super::{format_amount, parse_amount, print_error, print_success, prompt_confirm, CliContext};

/// Run the send command
pub async fn run(
    ctx: &CliContext,
    address: &str,
    amount: &str,
    fee: Option<&str>,
    memo: &str,
    stake: bool,
    skip_confirm: bool,
) -> Result<()> {
    let amount = parse_amount(amount)?;
    if amount == 0 {
        return Err(anyhow!("Amount must be greater than 0"));
    }
    let fee = fee.map(parse_amount).transpose()?;
    let session_type = if stake {
        SessionType::Coinstake
    } else {
        SessionType::Coin
    };

    let service = ctx.service()?;
    let session = ctx.login(&service)?;
    let result = send(
        ctx,
        &service,
        &session,
        address,
        amount,
        fee,
        memo,
        session_type,
        skip_confirm,
    )
    .await;
    service.logout(&session);
    result
}

#[allow(clippy::too_many_arguments)]
async fn send(
    ctx: &CliContext,
    service: &super::CliService,
    session: &uuid::Uuid,
    address: &str,
    amount: u64,
    fee: Option<u64>,
    memo: &str,
    session_type: SessionType,
    skip_confirm: bool,
) -> Result<()> {
    service.prepare_send(session, address, amount, fee, memo, session_type)?;
    let plan = service.sort_change(session)?;

    // Show transaction details
    println!();
    println!("Transaction details:");
    println!("  Recipient: {}", address);
    println!("  Amount:    {}", format_amount(plan.payment));
    println!("  Fee:       {}", format_amount(plan.fee));
    println!("  Change:    {}", format_amount(plan.change));
    println!("  Ring size: {}", ctx.config.ring_size);
    if session_type == SessionType::Coinstake {
        println!("  Type:      stake");
    }
    if !memo.is_empty() {
        println!("  Memo:      {}", memo);
    }
    println!();

    if !skip_confirm && !prompt_confirm("Send this transaction?")? {
        println!("Cancelled.");
        return Ok(());
    }

    match service.transfer_payment(session).await {
        Ok(tx) => {
            print_success(&format!("Transaction sent: {}", tx.txn_id_hex()));
            Ok(())
        }
        Err(e) => {
            print_error(&e.to_string());
            if e.is_retryable() {
                println!("Nothing was spent; the transfer can be retried.");
            }
            Err(e.into())
        }
    }
}
