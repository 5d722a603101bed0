//! Common test utilities shared across integration tests.

#![allow(dead_code, missing_docs)]

use std::sync::{Arc, Mutex};

use passvault_core::{
    AuthOutcome, AuthPrompter, CardMetadata, CardNetwork, CardSecrets, CardVault,
    ChallengeRequest, MemoryKeystore, MemoryRepository, PromptAvailability, ScriptedPrompter,
    VaultConfig,
};
use secrecy::SecretString;
use tokio::sync::mpsc;

pub struct Harness {
    pub vault: CardVault,
    pub keystore: Arc<MemoryKeystore>,
    pub repository: Arc<MemoryRepository>,
}

pub fn harness(prompter: Arc<dyn AuthPrompter>) -> Harness {
    let keystore = Arc::new(MemoryKeystore::new());
    let repository = Arc::new(MemoryRepository::new());
    let vault = CardVault::new(
        keystore.clone(),
        prompter,
        repository.clone(),
        VaultConfig::default(),
    );
    Harness {
        vault,
        keystore,
        repository,
    }
}

pub fn approving() -> Arc<ScriptedPrompter> {
    Arc::new(ScriptedPrompter::always(AuthOutcome::Succeeded))
}

/// Prompter that hands every request to the test, which answers it later
/// from another task, the way a UI thread would.
pub struct ManualPrompter {
    requests: Mutex<Option<mpsc::UnboundedSender<ChallengeRequest>>>,
}

impl ManualPrompter {
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<ChallengeRequest>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let prompter = Arc::new(Self {
            requests: Mutex::new(Some(tx)),
        });
        (prompter, rx)
    }
}

impl AuthPrompter for ManualPrompter {
    fn availability(&self) -> PromptAvailability {
        PromptAvailability::Available
    }

    fn present(&self, request: ChallengeRequest) {
        if let Some(tx) = self.requests.lock().unwrap().as_ref() {
            let _ = tx.send(request);
        }
    }
}

pub fn secret(value: &str) -> Option<SecretString> {
    Some(SecretString::from(value.to_string()))
}

pub fn visa_metadata() -> CardMetadata {
    CardMetadata {
        holder_name: "Ada Lovelace".to_string(),
        bank_name: Some("Analytical Bank".to_string()),
        network: CardNetwork::Visa,
        expiry_month: 12,
        expiry_year: 2030,
        nickname: Some("Everyday".to_string()),
        color: Some("#1A73E8".to_string()),
    }
}

pub fn full_secrets() -> CardSecrets {
    CardSecrets {
        card_number: secret("4532123456789012"),
        cvv: secret("123"),
        bank_account_id: secret("DE89370400440532013000"),
    }
}
