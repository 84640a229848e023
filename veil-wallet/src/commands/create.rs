//! Wallet creation command

use anyhow::{anyhow, Result};
use veil_account_keys::SecretBuffer;

use super::{print_success, print_warning, prompt_confirm, prompt_password, CliContext};
use crate::service::{generate_mnemonic, MNEMONIC_WORDS};

/// Run the create command
pub fn run(ctx: &CliContext, recover: bool) -> Result<()> {
    let mnemonic = if recover {
        println!("Enter your {MNEMONIC_WORDS}-word recovery phrase:");
        let phrase = prompt_password("> ")?;
        let words = phrase.expose_str()?.split_whitespace().count();
        if words != MNEMONIC_WORDS {
            return Err(anyhow!("Expected {MNEMONIC_WORDS} word mnemonic, got {words} words"));
        }
        phrase
    } else {
        let mnemonic = generate_mnemonic();
        println!();
        print_warning("Write down these words and keep them offline. They are the only backup.");
        println!();
        for (i, word) in mnemonic.expose_str()?.split_whitespace().enumerate() {
            println!("  {:2}. {}", i + 1, word);
        }
        println!();
        if !prompt_confirm("Have you written down the recovery phrase?")? {
            return Err(anyhow!("Wallet creation cancelled"));
        }
        mnemonic
    };

    let passphrase = prompt_password("New wallet passphrase: ")?;
    if passphrase.is_empty() {
        return Err(anyhow!("Passphrase cannot be empty"));
    }
    let confirm: SecretBuffer = prompt_password("Confirm passphrase: ")?;
    if passphrase != confirm {
        return Err(anyhow!("Passphrases do not match"));
    }

    let service = ctx.service()?;
    let identifier = service.create_wallet(&mnemonic, &passphrase)?;

    println!();
    print_success(&format!("Wallet created: {identifier}"));
    Ok(())
}
