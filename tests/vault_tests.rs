//! Integration tests for secret lifecycle and handle rules.

use std::sync::Arc;
use std::thread;

use keyvault::vault::{SecretAttributes, SecretPersistence, SecretType, Vault};
use keyvault::{VaultError, VaultRegistry};

/// Helper: a registry with one default (in-memory) vault.
fn default_vault() -> (VaultRegistry, Arc<Vault>) {
    let registry = VaultRegistry::new();
    let handle = registry.default_init().expect("default vault");
    let vault = registry.get(handle).expect("live vault");
    (registry, vault)
}

const EPHEMERAL: SecretPersistence = SecretPersistence::Ephemeral;

// ---------------------------------------------------------------------------
// End-to-end scenario
// ---------------------------------------------------------------------------

#[test]
fn generate_encrypt_decrypt_tamper() {
    let (_registry, vault) = default_vault();

    let key = vault
        .secret_generate(SecretAttributes::aes256(EPHEMERAL))
        .unwrap();
    assert_eq!(vault.secret_attributes_get(key).unwrap().length, 32);

    let plaintext = b"hello, vault!";
    assert_eq!(plaintext.len(), 13);

    let mut sealed = [0u8; 64];
    let sealed_len = vault
        .aead_aes_gcm_encrypt(key, 1, b"", plaintext, &mut sealed)
        .unwrap();
    assert_eq!(sealed_len, 29);

    let mut opened = [0u8; 64];
    let opened_len = vault
        .aead_aes_gcm_decrypt(key, 1, b"", &sealed[..sealed_len], &mut opened)
        .unwrap();
    assert_eq!(&opened[..opened_len], plaintext);

    sealed[0] ^= 0x01;
    assert!(matches!(
        vault.aead_aes_gcm_decrypt(key, 1, b"", &sealed[..sealed_len], &mut opened),
        Err(VaultError::AuthenticationFailed)
    ));
}

// ---------------------------------------------------------------------------
// Generate / import / export
// ---------------------------------------------------------------------------

#[test]
fn generated_keys_have_canonical_length() {
    let (_registry, vault) = default_vault();
    for attrs in [
        SecretAttributes::aes256(EPHEMERAL),
        SecretAttributes::curve25519(EPHEMERAL),
        SecretAttributes::p256(EPHEMERAL),
    ] {
        let h = vault.secret_generate(attrs).unwrap();
        let got = vault.secret_attributes_get(h).unwrap();
        assert_eq!(got, attrs);
        assert_eq!(got.length, 32);
    }

    let h = vault
        .secret_generate(SecretAttributes::buffer(80, EPHEMERAL))
        .unwrap();
    assert_eq!(vault.secret_attributes_get(h).unwrap().length, 80);
}

#[test]
fn generated_material_is_random() {
    let (_registry, vault) = default_vault();
    let mut a = [0u8; 32];
    let mut b = [0u8; 32];
    let ha = vault.secret_generate(SecretAttributes::aes256(EPHEMERAL)).unwrap();
    let hb = vault.secret_generate(SecretAttributes::aes256(EPHEMERAL)).unwrap();
    vault.secret_export(ha, &mut a).unwrap();
    vault.secret_export(hb, &mut b).unwrap();
    assert_ne!(a, b);
}

#[test]
fn import_export_roundtrip() {
    let (_registry, vault) = default_vault();

    let data = b"arbitrary buffer contents";
    let h = vault
        .secret_import(SecretAttributes::buffer(data.len(), EPHEMERAL), data)
        .unwrap();
    let mut out = vec![0u8; data.len()];
    assert_eq!(vault.secret_export(h, &mut out).unwrap(), data.len());
    assert_eq!(out, data);

    let key = [0x42u8; 32];
    let h = vault
        .secret_import(SecretAttributes::aes256(EPHEMERAL), &key)
        .unwrap();
    let mut out = [0u8; 48];
    let n = vault.secret_export(h, &mut out).unwrap();
    assert_eq!(&out[..n], &key);
}

#[test]
fn import_rejects_bad_shapes_without_side_effects() {
    let (_registry, vault) = default_vault();

    // AES keys are exactly 32 bytes.
    let short = SecretAttributes::new(SecretType::AesKey, EPHEMERAL, 16);
    assert!(matches!(
        vault.secret_import(short, &[0u8; 16]),
        Err(VaultError::InvalidArgument(_))
    ));

    // Declared length must match the material.
    assert!(matches!(
        vault.secret_import(SecretAttributes::buffer(4, EPHEMERAL), b"abc"),
        Err(VaultError::InvalidArgument(_))
    ));

    // The zero scalar is not a P-256 private key.
    assert!(matches!(
        vault.secret_import(SecretAttributes::p256(EPHEMERAL), &[0u8; 32]),
        Err(VaultError::InvalidKeyMaterial(_))
    ));

    // Unknown cannot be requested.
    let unknown = SecretAttributes::new(SecretType::Unknown, EPHEMERAL, 32);
    assert!(vault.secret_generate(unknown).is_err());

    assert_eq!(vault.secret_count(), 0);
}

#[test]
fn default_vault_refuses_persistent_secrets() {
    let (_registry, vault) = default_vault();
    assert!(matches!(
        vault.secret_generate(SecretAttributes::aes256(SecretPersistence::Persistent)),
        Err(VaultError::UnsupportedPersistence)
    ));
    assert_eq!(vault.secret_count(), 0);
}

#[test]
fn export_reports_buffer_too_small() {
    let (_registry, vault) = default_vault();
    let h = vault.secret_generate(SecretAttributes::aes256(EPHEMERAL)).unwrap();
    let mut small = [0u8; 31];
    assert!(matches!(
        vault.secret_export(h, &mut small),
        Err(VaultError::BufferTooSmall {
            required: 32,
            provided: 31
        })
    ));
}

// ---------------------------------------------------------------------------
// Destroy and handle validity
// ---------------------------------------------------------------------------

#[test]
fn destroyed_handles_are_invalid() {
    let (_registry, vault) = default_vault();
    let h = vault.secret_generate(SecretAttributes::aes256(EPHEMERAL)).unwrap();
    vault.secret_destroy(h).unwrap();

    let mut out = [0u8; 32];
    assert!(matches!(
        vault.secret_export(h, &mut out),
        Err(VaultError::InvalidHandle(_))
    ));
    assert!(matches!(
        vault.secret_attributes_get(h),
        Err(VaultError::InvalidHandle(_))
    ));
    assert!(matches!(
        vault.aead_aes_gcm_encrypt(h, 0, b"", b"x", &mut out),
        Err(VaultError::InvalidHandle(_))
    ));
    assert!(matches!(
        vault.secret_destroy(h),
        Err(VaultError::InvalidHandle(_))
    ));
}

#[test]
fn handles_are_never_reused() {
    let (_registry, vault) = default_vault();
    let first = vault.secret_generate(SecretAttributes::aes256(EPHEMERAL)).unwrap();
    vault.secret_destroy(first).unwrap();
    let second = vault.secret_generate(SecretAttributes::aes256(EPHEMERAL)).unwrap();
    assert_ne!(first, second);
    assert!(vault.secret_attributes_get(first).is_err());
}

#[test]
fn handles_from_another_vault_are_rejected() {
    let registry = VaultRegistry::new();
    let a = registry.get(registry.default_init().unwrap()).unwrap();
    let b = registry.get(registry.default_init().unwrap()).unwrap();

    let h = a.secret_generate(SecretAttributes::aes256(EPHEMERAL)).unwrap();
    assert!(matches!(
        b.secret_destroy(h),
        Err(VaultError::InvalidHandle(_))
    ));
    assert!(a.secret_attributes_get(h).is_ok());
}

#[test]
fn separate_registries_never_share_handles() {
    let (first, a) = default_vault();
    let (second, b) = default_vault();
    assert_ne!(a.handle(), b.handle());

    let ha = a.secret_generate(SecretAttributes::aes256(EPHEMERAL)).unwrap();
    let hb = b.secret_generate(SecretAttributes::aes256(EPHEMERAL)).unwrap();
    assert_ne!(ha, hb);
    assert!(b.secret_attributes_get(ha).is_err());

    // Retired vault handles are not handed out again by another registry.
    first.deinit(a.handle()).unwrap();
    let c = second.default_init().unwrap();
    assert_ne!(c, a.handle());
}

#[test]
fn deinit_invalidates_everything() {
    let registry = VaultRegistry::new();
    let handle = registry.default_init().unwrap();
    let vault = registry.get(handle).unwrap();
    let h = vault.secret_generate(SecretAttributes::aes256(EPHEMERAL)).unwrap();

    registry.deinit(handle).unwrap();
    assert!(vault.secret_attributes_get(h).is_err());
    assert!(registry.get(handle).is_err());
    assert!(registry.deinit(handle).is_err());
}

// ---------------------------------------------------------------------------
// Type enforcement
// ---------------------------------------------------------------------------

#[test]
fn operations_check_secret_types() {
    let (_registry, vault) = default_vault();
    let buffer = vault
        .secret_import(SecretAttributes::buffer(32, EPHEMERAL), &[1u8; 32])
        .unwrap();
    let key = vault.secret_generate(SecretAttributes::aes256(EPHEMERAL)).unwrap();
    let mut out = [0u8; 128];

    // A 32-byte buffer is still not an AES key.
    assert!(matches!(
        vault.aead_aes_gcm_encrypt(buffer, 0, b"", b"x", &mut out),
        Err(VaultError::WrongSecretType { .. })
    ));
    assert!(matches!(
        vault.secret_public_key_get(key, &mut out),
        Err(VaultError::WrongSecretType { .. })
    ));
    assert!(matches!(
        vault.ecdh(key, &[9u8; 32]),
        Err(VaultError::WrongSecretType { .. })
    ));
}

// ---------------------------------------------------------------------------
// Concurrency
// ---------------------------------------------------------------------------

#[test]
fn concurrent_operations_on_one_vault() {
    let (_registry, vault) = default_vault();
    let key = vault.secret_generate(SecretAttributes::aes256(EPHEMERAL)).unwrap();

    let workers: Vec<_> = (0..8u16)
        .map(|i| {
            let vault = Arc::clone(&vault);
            thread::spawn(move || {
                for j in 0..50u16 {
                    let nonce = i * 100 + j;
                    let mut sealed = [0u8; 32];
                    let n = vault
                        .aead_aes_gcm_encrypt(key, nonce, b"", b"data", &mut sealed)
                        .unwrap();
                    let mut opened = [0u8; 16];
                    let m = vault
                        .aead_aes_gcm_decrypt(key, nonce, b"", &sealed[..n], &mut opened)
                        .unwrap();
                    assert_eq!(&opened[..m], b"data");

                    let tmp = vault
                        .secret_generate(SecretAttributes::buffer(16, EPHEMERAL))
                        .unwrap();
                    vault.secret_destroy(tmp).unwrap();
                }
            })
        })
        .collect();

    for w in workers {
        w.join().unwrap();
    }
    assert_eq!(vault.secret_count(), 1);
}

#[test]
fn destroy_races_with_export() {
    for _ in 0..20 {
        let (_registry, vault) = default_vault();
        let h = vault
            .secret_import(SecretAttributes::buffer(64, EPHEMERAL), &[0xAB; 64])
            .unwrap();

        let reader = {
            let vault = Arc::clone(&vault);
            thread::spawn(move || {
                let mut out = [0u8; 64];
                for _ in 0..100 {
                    match vault.secret_export(h, &mut out) {
                        // A read that succeeds sees the full, unscrubbed material.
                        Ok(n) => assert_eq!(&out[..n], &[0xAB; 64]),
                        Err(e) => {
                            assert!(matches!(e, VaultError::InvalidHandle(_)));
                            break;
                        }
                    }
                }
            })
        };

        vault.secret_destroy(h).unwrap();
        reader.join().unwrap();
        assert!(vault.secret_destroy(h).is_err());
    }
}
