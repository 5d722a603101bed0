use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use passvault_core::CardNetwork;

/// Developer CLI for the PassVault card store.
#[derive(Debug, Parser)]
#[command(name = "passvault", version, about)]
pub struct Cli {
    /// Directory holding the development keystore and the card file.
    #[arg(long, global = true, env = "PASSVAULT_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// JSON configuration file.
    #[arg(long, global = true, env = "PASSVAULT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Approve every challenge without asking.
    #[arg(long, short = 'y', global = true)]
    pub yes: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Show key availability and the number of stored cards
    Status,
    /// Store a new card
    Add(AddArgs),
    /// Reveal a card's sensitive fields
    Show {
        /// Card id
        id: String,
    },
    /// List stored cards without revealing anything
    List {
        /// Print the records as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete a card
    Delete {
        /// Card id
        id: String,
    },
    /// Replace all sensitive fields of a card
    Update {
        /// Card id
        id: String,
        #[command(flatten)]
        secrets: SecretArgs,
    },
}

#[derive(Debug, Args)]
pub struct AddArgs {
    /// Name on the card
    #[arg(long)]
    pub holder: String,

    /// Expiry as MM/YY or MM/YYYY
    #[arg(long, value_parser = parse_expiry)]
    pub expiry: (u8, u16),

    /// Issuing bank
    #[arg(long)]
    pub bank: Option<String>,

    /// Payment network; guessed from the card number when omitted
    #[arg(long)]
    pub network: Option<CardNetwork>,

    /// Display label
    #[arg(long)]
    pub nickname: Option<String>,

    /// Display color, e.g. #1A73E8
    #[arg(long)]
    pub color: Option<String>,

    #[command(flatten)]
    pub secrets: SecretArgs,
}

/// Sensitive values. Prefer the environment variables over flags so they stay
/// out of shell history.
#[derive(Debug, Args)]
pub struct SecretArgs {
    /// Full card number
    #[arg(long, env = "PASSVAULT_CARD_NUMBER", hide_env_values = true)]
    pub card_number: Option<String>,

    /// Card verification value
    #[arg(long, env = "PASSVAULT_CVV", hide_env_values = true)]
    pub cvv: Option<String>,

    /// Linked bank account identifier
    #[arg(long, env = "PASSVAULT_BANK_ACCOUNT", hide_env_values = true)]
    pub bank_account: Option<String>,
}

fn parse_expiry(value: &str) -> Result<(u8, u16), String> {
    let (month, year) = value
        .split_once('/')
        .ok_or_else(|| format!("expected MM/YY, got {value}"))?;
    let month: u8 = month
        .trim()
        .parse()
        .map_err(|_| format!("invalid month {month}"))?;
    if !(1..=12).contains(&month) {
        return Err(format!("month must be 1-12, got {month}"));
    }
    let year: u16 = year
        .trim()
        .parse()
        .map_err(|_| format!("invalid year {year}"))?;
    let year = if year < 100 { 2000 + year } else { year };
    Ok((month, year))
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_add() {
        let cli = Cli::try_parse_from([
            "passvault",
            "--data-dir",
            "/tmp/vault",
            "add",
            "--holder",
            "Ada Lovelace",
            "--expiry",
            "04/29",
            "--network",
            "visa",
            "--card-number",
            "4532123456789012",
        ])
        .unwrap();

        assert_eq!(cli.data_dir, Some(PathBuf::from("/tmp/vault")));
        assert!(!cli.yes);
        let Command::Add(args) = cli.command else {
            panic!("expected add");
        };
        assert_eq!(args.holder, "Ada Lovelace");
        assert_eq!(args.expiry, (4, 2029));
        assert_eq!(args.network, Some(CardNetwork::Visa));
        assert_eq!(args.secrets.card_number.as_deref(), Some("4532123456789012"));
    }

    #[test]
    fn test_parse_show_with_yes_after_subcommand() {
        let cli = Cli::try_parse_from(["passvault", "show", "abc", "--yes"]).unwrap();
        assert!(cli.yes);
        assert!(matches!(cli.command, Command::Show { id } if id == "abc"));
    }

    #[test]
    fn test_parse_update() {
        let cli =
            Cli::try_parse_from(["passvault", "update", "abc", "--cvv", "321"]).unwrap();
        let Command::Update { id, secrets } = cli.command else {
            panic!("expected update");
        };
        assert_eq!(id, "abc");
        assert_eq!(secrets.cvv.as_deref(), Some("321"));
    }

    #[test]
    fn test_show_requires_id() {
        assert!(Cli::try_parse_from(["passvault", "show"]).is_err());
    }

    #[test]
    fn test_expiry_parsing() {
        assert_eq!(parse_expiry("12/2031"), Ok((12, 2031)));
        assert_eq!(parse_expiry("1/30"), Ok((1, 2030)));
        assert!(parse_expiry("13/30").is_err());
        assert!(parse_expiry("1230").is_err());
    }
}
