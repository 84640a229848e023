//! CLI Commands
//!
//! Implementation of all wallet CLI commands.

pub mod address;
pub mod balance;
pub mod create;
pub mod history;
pub mod receive;
pub mod recover;
pub mod remove;
pub mod send;

use anyhow::{anyhow, Context as _, Result};
use std::io::{self, Write};
use std::path::PathBuf;
use uuid::Uuid;
use veil_account_keys::SecretBuffer;

use crate::config::{wallets_dir, WalletConfig};
use crate::rpc::RpcClient;
use crate::service::WalletService;
use crate::storage::FileStoreProvider;
use crate::store::StoreProvider;

/// Base units per coin
pub const UNITS_PER_COIN: u64 = 1_000_000_000;

/// Digits after the decimal point
const COIN_DECIMALS: usize = 9;

/// The service as the CLI runs it.
pub type CliService = WalletService<FileStoreProvider, RpcClient>;

/// Settings shared by every command.
pub struct CliContext {
    pub config: WalletConfig,
    pub data_dir: PathBuf,
    /// Wallet identifier from `--wallet`
    pub wallet: Option<String>,
}

impl CliContext {
    pub fn provider(&self) -> FileStoreProvider {
        FileStoreProvider::new(wallets_dir(&self.data_dir), self.config.store)
    }

    pub fn service(&self) -> Result<CliService> {
        let network = RpcClient::new(&self.config)?;
        Ok(WalletService::new(self.config.clone(), self.provider(), network))
    }

    /// The wallet to operate on: `--wallet`, or the only wallet there is.
    pub fn identifier(&self) -> Result<String> {
        if let Some(identifier) = &self.wallet {
            return Ok(identifier.clone());
        }
        let mut wallets = self.provider().list()?;
        match wallets.len() {
            0 => Err(anyhow!("No wallet found. Run 'veil-wallet create' first.")),
            1 => Ok(wallets.remove(0)),
            _ => Err(anyhow!(
                "Several wallets found ({}); choose one with --wallet",
                wallets.join(", ")
            )),
        }
    }

    /// Prompt for the passphrase and log in.
    pub fn login(&self, service: &CliService) -> Result<Uuid> {
        let identifier = self.identifier()?;
        let passphrase = prompt_password(&format!("Passphrase for {identifier}: "))?;
        service
            .login(&identifier, passphrase)
            .with_context(|| format!("Failed to open wallet {identifier}"))
    }
}

/// Prompt for password input (hidden)
pub fn prompt_password(prompt: &str) -> Result<SecretBuffer> {
    print!("{}", prompt);
    io::stdout().flush()?;

    let password = zeroize::Zeroizing::new(rpassword::read_password()?);
    Ok(SecretBuffer::from_text(&password))
}

/// Prompt for confirmation
pub fn prompt_confirm(message: &str) -> Result<bool> {
    print!("{} [y/N]: ", message);
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;

    Ok(input.trim().eq_ignore_ascii_case("y") || input.trim().eq_ignore_ascii_case("yes"))
}

/// Print an error message
pub fn print_error(message: &str) {
    eprintln!("\x1b[31mError:\x1b[0m {}", message);
}

/// Print a success message
pub fn print_success(message: &str) {
    println!("\x1b[32m{}\x1b[0m", message);
}

/// Print a warning message
pub fn print_warning(message: &str) {
    println!("\x1b[33mWarning:\x1b[0m {}", message);
}

/// Format base units as a coin amount
pub fn format_amount(units: u64) -> String {
    format!(
        "{}.{:0width$} VEIL",
        units / UNITS_PER_COIN,
        units % UNITS_PER_COIN,
        width = COIN_DECIMALS
    )
}

/// Parse a coin amount such as `1.5` or `0.25 VEIL` into base units
pub fn parse_amount(text: &str) -> Result<u64> {
    let text = text.trim().trim_end_matches("VEIL").trim();
    let (whole, fraction) = text.split_once('.').unwrap_or((text, ""));
    if whole.is_empty() && fraction.is_empty() {
        return Err(anyhow!("Invalid amount format"));
    }
    if fraction.len() > COIN_DECIMALS {
        return Err(anyhow!("At most {COIN_DECIMALS} decimal places allowed"));
    }
    let digits = |s: &str| -> Result<u64> {
        if s.is_empty() {
            return Ok(0);
        }
        if !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(anyhow!("Invalid amount format"));
        }
        s.parse().map_err(|_| anyhow!("Amount too large"))
    };

    let whole = digits(whole)?;
    let fraction = digits(fraction)? * 10u64.pow((COIN_DECIMALS - fraction.len()) as u32);
    whole
        .checked_mul(UNITS_PER_COIN)
        .and_then(|w| w.checked_add(fraction))
        .ok_or_else(|| anyhow!("Amount too large"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_amount() {
        assert_eq!(format_amount(1_000_000_000), "1.000000000 VEIL");
        assert_eq!(format_amount(500_000_000), "0.500000000 VEIL");
        assert_eq!(format_amount(42), "0.000000042 VEIL");
    }

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount("1").unwrap(), 1_000_000_000);
        assert_eq!(parse_amount("0.5").unwrap(), 500_000_000);
        assert_eq!(parse_amount(".25 VEIL").unwrap(), 250_000_000);
        assert_eq!(parse_amount("0.000000001").unwrap(), 1);
        assert!(parse_amount("0.0000000001").is_err());
        assert!(parse_amount("-1").is_err());
        assert!(parse_amount("abc").is_err());
        assert!(parse_amount(".").is_err());
        assert!(parse_amount("99999999999999999999").is_err());
    }
}
