//! Integration tests for the card vault.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{approving, full_secrets, harness, secret, visa_metadata, ManualPrompter};
use passvault_core::{
    AuthError, AuthOutcome, BatchError, CardSecrets, CardVault, CredentialRepository,
    FieldFailure, FileKeystore, GateState, JsonFileRepository, PassVaultError,
    PromptAvailability, ScriptedPrompter, SensitiveField, VaultConfig, VaultError,
};
use secrecy::ExposeSecret;

fn revealed_text(
    revealed: &passvault_core::RevealedCard,
    field: SensitiveField,
) -> Option<String> {
    revealed
        .field(field)
        .and_then(|result| result.as_ref().ok())
        .map(|value| value.expose_secret().to_string())
}

#[tokio::test]
async fn test_card_with_number_and_cvv_one_prompt_each_way() {
    let prompter = approving();
    let h = harness(prompter.clone());

    let record = h
        .vault
        .add_card(
            visa_metadata(),
            CardSecrets {
                card_number: secret("4532123456789012"),
                cvv: secret("123"),
                bank_account_id: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(prompter.reasons().len(), 1);
    assert!(record.has_enhanced_security);
    assert!(record.encrypted_bank_account_id.is_none());

    let revealed = h.vault.reveal_card(&record.id).await.unwrap();
    assert_eq!(prompter.reasons().len(), 2);
    assert_eq!(
        revealed_text(&revealed, SensitiveField::CardNumber).as_deref(),
        Some("4532123456789012")
    );
    assert_eq!(revealed_text(&revealed, SensitiveField::Cvv).as_deref(), Some("123"));
    assert!(matches!(
        revealed.field(SensitiveField::BankAccountId),
        Some(Err(FieldFailure::Absent))
    ));
    assert_eq!(h.keystore.seal_count(), 2);
    assert_eq!(h.keystore.open_count(), 2);
}

#[tokio::test]
async fn test_corrupted_cvv_only_loses_cvv() {
    let h = harness(approving());
    let mut record = h.vault.add_card(visa_metadata(), full_secrets()).await.unwrap();

    // Flip one character inside the CVV ciphertext.
    let stored = record.encrypted_cvv.take().unwrap();
    let mut parts: Vec<String> = stored.split(':').map(str::to_string).collect();
    let body = &mut parts[2];
    let first = body.remove(0);
    body.insert(0, if first == 'A' { 'B' } else { 'A' });
    record.encrypted_cvv = Some(parts.join(":"));
    h.repository.save_record(&record).unwrap();

    let revealed = h.vault.reveal_card(&record.id).await.unwrap();
    assert!(revealed_text(&revealed, SensitiveField::CardNumber).is_some());
    assert!(revealed_text(&revealed, SensitiveField::BankAccountId).is_some());
    assert!(matches!(
        revealed.field(SensitiveField::Cvv),
        Some(Err(FieldFailure::DecryptionFailed(_) | FieldFailure::MalformedField))
    ));
}

#[tokio::test]
async fn test_legacy_value_reported_as_malformed() {
    let h = harness(approving());
    let mut record = h.vault.add_card(visa_metadata(), full_secrets()).await.unwrap();
    record.encrypted_card_number = Some("4532123456789012".to_string());
    h.repository.save_record(&record).unwrap();

    let revealed = h.vault.reveal_card(&record.id).await.unwrap();
    assert!(matches!(
        revealed.field(SensitiveField::CardNumber),
        Some(Err(FieldFailure::MalformedField))
    ));
    assert!(revealed_text(&revealed, SensitiveField::Cvv).is_some());
}

#[tokio::test]
async fn test_cancel_touches_no_key() {
    let prompter = Arc::new(ScriptedPrompter::always(AuthOutcome::Canceled));
    let h = harness(prompter);

    let err = h.vault.add_card(visa_metadata(), full_secrets()).await.unwrap_err();
    assert!(matches!(
        err,
        VaultError::Batch(BatchError::Auth(AuthError::Canceled))
    ));
    assert_eq!(h.keystore.seal_count(), 0);
    assert!(!h.vault.is_key_available());
    assert!(h.vault.list_cards().unwrap().is_empty());
    assert_eq!(h.vault.batch().gate().state(), GateState::Canceled);
}

#[tokio::test]
async fn test_no_enrolled_credential_requires_device_security() {
    let prompter = Arc::new(ScriptedPrompter::unavailable(PromptAvailability::NoneEnrolled));
    let h = harness(prompter.clone());

    let err = h.vault.add_card(visa_metadata(), full_secrets()).await.unwrap_err();
    assert!(err.requires_device_security());
    assert!(!err.is_retryable());
    assert_eq!(
        PassVaultError::from(err),
        PassVaultError::DeviceSecurityRequired
    );
    assert!(prompter.reasons().is_empty());
}

#[tokio::test]
async fn test_retry_after_failed_challenge() {
    let prompter = Arc::new(ScriptedPrompter::sequence([
        AuthOutcome::Failed,
        AuthOutcome::Succeeded,
    ]));
    let h = harness(prompter);

    let err = h.vault.add_card(visa_metadata(), full_secrets()).await.unwrap_err();
    assert!(err.is_retryable());
    let record = h.vault.add_card(visa_metadata(), full_secrets()).await.unwrap();
    assert_eq!(h.vault.list_cards().unwrap(), vec![record]);
}

#[tokio::test]
async fn test_challenge_resolved_from_another_task() {
    let (prompter, mut requests) = ManualPrompter::new();
    let h = harness(prompter);
    let vault: CardVault = h.vault.clone();

    let add = tokio::spawn(async move { vault.add_card(visa_metadata(), full_secrets()).await });

    let request = requests.recv().await.unwrap();
    assert_eq!(request.reason(), VaultConfig::default().add_reason);
    assert_eq!(h.keystore.seal_count(), 0);
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(h.keystore.seal_count(), 0);
    assert_eq!(h.vault.batch().gate().state(), GateState::Presenting);

    request.resolve(AuthOutcome::Succeeded);
    let record = add.await.unwrap().unwrap();
    assert_eq!(h.keystore.seal_count(), 3);
    assert!(h.repository.load_record(&record.id).unwrap().is_some());
}

#[tokio::test]
async fn test_dropped_request_counts_as_cancel() {
    let (prompter, mut requests) = ManualPrompter::new();
    let h = harness(prompter);
    let vault = h.vault.clone();

    let add = tokio::spawn(async move { vault.add_card(visa_metadata(), full_secrets()).await });
    drop(requests.recv().await.unwrap());

    let err = add.await.unwrap().unwrap_err();
    assert!(matches!(
        err,
        VaultError::Batch(BatchError::Auth(AuthError::Canceled))
    ));
}

#[tokio::test]
async fn test_file_backed_vault_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let open = || {
        CardVault::new(
            Arc::new(FileKeystore::new(dir.path().join("keys"))),
            approving(),
            Arc::new(JsonFileRepository::new(dir.path().join("cards.json"))),
            VaultConfig::default(),
        )
    };

    let id = open()
        .add_card(visa_metadata(), full_secrets())
        .await
        .unwrap()
        .id;

    let reopened = open();
    assert!(reopened.is_key_available());
    let revealed = reopened.reveal_card(&id).await.unwrap();
    assert_eq!(
        revealed_text(&revealed, SensitiveField::BankAccountId).as_deref(),
        Some("DE89370400440532013000")
    );
}

#[tokio::test]
async fn test_lost_key_reports_every_field_unreadable() {
    let h = harness(approving());
    let record = h.vault.add_card(visa_metadata(), full_secrets()).await.unwrap();
    h.keystore.remove_key(&VaultConfig::default().key_alias);
    assert!(!h.vault.is_key_available());

    let revealed = h.vault.reveal_card(&record.id).await.unwrap();
    for field in [
        SensitiveField::CardNumber,
        SensitiveField::Cvv,
        SensitiveField::BankAccountId,
    ] {
        assert!(matches!(
            revealed.field(field),
            Some(Err(FieldFailure::DecryptionFailed(_)))
        ));
    }
}

#[tokio::test]
async fn test_concurrent_batches_are_independent() {
    let h = harness(approving());
    let first = h.vault.clone();
    let second = h.vault.clone();

    let (a, b) = tokio::join!(
        first.add_card(visa_metadata(), full_secrets()),
        second.add_card(visa_metadata(), full_secrets()),
    );
    let (a, b) = (a.unwrap(), b.unwrap());
    assert_ne!(a.id, b.id);
    assert_eq!(h.vault.list_cards().unwrap().len(), 2);
    assert_eq!(h.vault.batch().gate().challenge_count(), 2);
}
