//! `passvault` developer CLI.
//!
//! Wires the engine to a file-backed development keystore, a JSON card file
//! and a terminal challenge. Not a substitute for a hardware keystore.

mod cli;
mod prompter;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Parser;
use eyre::{eyre, WrapErr};
use passvault_core::{
    AuthOutcome, AuthPrompter, CardMetadata, CardNetwork, CardSecrets, CardVault,
    DecryptedField, FieldFailure, FileKeystore, JsonFileRepository, PassVaultError,
    PaymentCardRecord, ScriptedPrompter, SensitiveField, VaultConfig,
};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use crate::cli::{AddArgs, Cli, Command, SecretArgs};
use crate::prompter::TerminalPrompter;

#[tokio::main]
async fn main() -> eyre::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let data_dir = resolve_data_dir(cli.data_dir)?;
    let config = load_config(cli.config.as_deref())?;
    tracing::debug!(data_dir = %data_dir.display(), "opening vault");

    let prompter: Arc<dyn AuthPrompter> = if cli.yes {
        Arc::new(ScriptedPrompter::always(AuthOutcome::Succeeded))
    } else {
        Arc::new(TerminalPrompter)
    };
    let vault = CardVault::new(
        Arc::new(FileKeystore::new(data_dir.join("keys"))),
        prompter,
        Arc::new(JsonFileRepository::new(data_dir.join("cards.json"))),
        config,
    );

    run(&vault, &data_dir, cli.command).await
}

async fn run(vault: &CardVault, data_dir: &Path, command: Command) -> eyre::Result<()> {
    match command {
        Command::Status => {
            let cards = vault.list_cards().map_err(PassVaultError::from)?;
            println!("data dir:      {}", data_dir.display());
            println!("key available: {}", vault.is_key_available());
            println!("cards:         {}", cards.len());
        }
        Command::Add(args) => {
            let (metadata, secrets) = add_inputs(args);
            let record = vault
                .add_card(metadata, secrets)
                .await
                .map_err(PassVaultError::from)?;
            println!("{}", record.id);
        }
        Command::Show { id } => {
            let revealed = vault.reveal_card(&id).await.map_err(PassVaultError::from)?;
            print_summary(&revealed.record);
            for field in [
                SensitiveField::CardNumber,
                SensitiveField::Cvv,
                SensitiveField::BankAccountId,
            ] {
                println!("{:<14} {}", format!("{field}:"), describe(revealed.field(field)));
            }
        }
        Command::List { json } => {
            let cards = vault.list_cards().map_err(PassVaultError::from)?;
            if json {
                let entries: Vec<ListEntry<'_>> = cards.iter().map(ListEntry::from).collect();
                println!("{}", serde_json::to_string_pretty(&entries)?);
            } else {
                for card in &cards {
                    print_summary(card);
                }
            }
        }
        Command::Delete { id } => {
            vault.delete_card(&id).map_err(PassVaultError::from)?;
            println!("deleted {id}");
        }
        Command::Update { id, secrets } => {
            let record = vault
                .update_secrets(&id, card_secrets(secrets))
                .await
                .map_err(PassVaultError::from)?;
            println!("updated {}", record.id);
        }
    }
    Ok(())
}

fn resolve_data_dir(explicit: Option<PathBuf>) -> eyre::Result<PathBuf> {
    explicit
        .or_else(|| dirs::data_dir().map(|dir| dir.join("passvault")))
        .ok_or_else(|| eyre!("cannot determine a data directory; pass --data-dir"))
}

fn load_config(path: Option<&Path>) -> eyre::Result<VaultConfig> {
    let Some(path) = path else {
        return Ok(VaultConfig::default());
    };
    let json = std::fs::read_to_string(path)
        .wrap_err_with(|| format!("reading config {}", path.display()))?;
    VaultConfig::from_json(&json).wrap_err_with(|| format!("parsing config {}", path.display()))
}

fn add_inputs(args: AddArgs) -> (CardMetadata, CardSecrets) {
    let network = args.network.unwrap_or_else(|| {
        args.secrets
            .card_number
            .as_deref()
            .map_or(CardNetwork::Other, CardNetwork::detect)
    });
    let (expiry_month, expiry_year) = args.expiry;
    let metadata = CardMetadata {
        holder_name: args.holder,
        bank_name: args.bank,
        network,
        expiry_month,
        expiry_year,
        nickname: args.nickname,
        color: args.color,
    };
    (metadata, card_secrets(args.secrets))
}

fn card_secrets(args: SecretArgs) -> CardSecrets {
    CardSecrets {
        card_number: args.card_number.map(SecretString::from),
        cvv: args.cvv.map(SecretString::from),
        bank_account_id: args.bank_account.map(SecretString::from),
    }
}

fn describe(field: Option<&DecryptedField>) -> String {
    match field {
        Some(Ok(value)) => value.expose_secret().to_string(),
        None | Some(Err(FieldFailure::Absent)) => "-".to_string(),
        Some(Err(failure)) => format!("<unreadable: {failure}>"),
    }
}

fn print_summary(card: &PaymentCardRecord) {
    println!(
        "{}  {:<10} {:<20} {:02}/{}  {}{}",
        card.id,
        card.network,
        card.masked_number(),
        card.expiry_month,
        card.expiry_year,
        card.holder_name,
        card.nickname
            .as_deref()
            .map(|nickname| format!(" ({nickname})"))
            .unwrap_or_default(),
    );
}

/// Listing view of a card: metadata only, no encrypted blobs.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ListEntry<'a> {
    id: &'a str,
    holder_name: &'a str,
    network: CardNetwork,
    masked_number: String,
    expiry: String,
    has_enhanced_security: bool,
}

impl<'a> From<&'a PaymentCardRecord> for ListEntry<'a> {
    fn from(card: &'a PaymentCardRecord) -> Self {
        Self {
            id: &card.id,
            holder_name: &card.holder_name,
            network: card.network,
            masked_number: card.masked_number(),
            expiry: format!("{:02}/{}", card.expiry_month, card.expiry_year),
            has_enhanced_security: card.has_enhanced_security,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_data_dir_wins() {
        let dir = resolve_data_dir(Some(PathBuf::from("/tmp/pv"))).unwrap();
        assert_eq!(dir, PathBuf::from("/tmp/pv"));
    }

    #[test]
    fn test_config_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"keyAlias":"dev"}"#).unwrap();
        assert_eq!(load_config(Some(path.as_path())).unwrap().key_alias, "dev");
        assert_eq!(load_config(None).unwrap(), VaultConfig::default());
        let missing = dir.path().join("missing.json");
        assert!(load_config(Some(missing.as_path())).is_err());
    }

    #[test]
    fn test_network_guessed_from_number() {
        let cli = Cli::try_parse_from([
            "passvault",
            "add",
            "--holder",
            "Ada",
            "--expiry",
            "01/30",
            "--card-number",
            "378282246310005",
        ])
        .unwrap();
        let Command::Add(args) = cli.command else {
            panic!("expected add");
        };
        let (metadata, secrets) = add_inputs(args);
        assert_eq!(metadata.network, CardNetwork::Amex);
        assert_eq!(secrets.last_four().as_deref(), Some("0005"));
    }

    #[test]
    fn test_describe_markers() {
        assert_eq!(describe(None), "-");
        assert_eq!(describe(Some(&Err(FieldFailure::Absent))), "-");
        assert_eq!(
            describe(Some(&Err(FieldFailure::MalformedField))),
            "<unreadable: malformed_field>"
        );
        let value: DecryptedField = Ok(SecretString::from("123".to_string()));
        assert_eq!(describe(Some(&value)), "123");
    }

    #[test]
    fn test_list_entry_hides_blobs() {
        let card: PaymentCardRecord = serde_json::from_value(serde_json::json!({
            "id": "c1",
            "holderName": "Ada",
            "network": "visa",
            "expiryMonth": 4,
            "expiryYear": 2029,
            "lastFour": "9012",
            "createdAt": 1,
            "updatedAt": 1,
            "hasEnhancedSecurity": true,
            "encryptedCVV": "ENHANCED:AAECAwQFBgcICQoL:AQI=:1"
        }))
        .unwrap();
        let json = serde_json::to_value(ListEntry::from(&card)).unwrap();
        assert_eq!(json["maskedNumber"], "•••• 9012");
        assert_eq!(json["expiry"], "04/2029");
        assert!(json.get("encryptedCVV").is_none());
    }
}
