//! `seal-store` — seal a PEM bundle into the key-store format read by
//! `message-api`.
//!
//! The output is checked by opening it again before it is written, so a
//! bundle that `message-api` would reject is never produced.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use zeroize::Zeroizing;

use message_api::keystore::sealed::{seal_with_rounds, DEFAULT_ROUNDS, MIN_ROUNDS};
use message_api::keystore::{KeyStore, Passphrase};

#[derive(Parser)]
#[command(name = "seal-store", about = "Seal a PEM bundle for message-api")]
struct Cli {
    /// PEM bundle to seal (certificates, plus a private key for identity stores)
    input: PathBuf,

    /// Where to write the sealed store
    output: PathBuf,

    /// Passphrase protecting the store
    #[arg(long, env = "SEAL_STORE_PASSPHRASE", hide_env_values = true)]
    passphrase: String,

    /// PBKDF2 iteration count
    #[arg(long, default_value_t = DEFAULT_ROUNDS, value_parser = clap::value_parser!(u32).range(i64::from(MIN_ROUNDS)..))]
    rounds: u32,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let passphrase = Passphrase::new(cli.passphrase);

    let pem = Zeroizing::new(
        std::fs::read(&cli.input)
            .with_context(|| format!("failed to read {}", cli.input.display()))?,
    );
    let parsed = KeyStore::from_pem(&pem).context("input is not a usable PEM bundle")?;

    let sealed = seal_with_rounds(&pem, passphrase.expose(), cli.rounds)
        .context("failed to seal bundle")?
        .to_string_repr();
    KeyStore::from_sealed(sealed.as_bytes(), &passphrase)
        .context("sealed store failed to reopen")?;

    std::fs::write(&cli.output, format!("{sealed}\n"))
        .with_context(|| format!("failed to write {}", cli.output.display()))?;

    println!(
        "sealed {} certificate(s){} into {}",
        parsed.certificates().len(),
        if parsed.private_key().is_some() { " and a private key" } else { "" },
        cli.output.display()
    );
    Ok(())
}
