//! File-backed vaults: persistence ids, restarts, and record handling.
//!
//! A "restart" is simulated by deinitializing the vault (or dropping the
//! whole registry) and opening a new file vault on the same directory.

use std::fs;

use keyvault::vault::{PersistenceId, SecretAttributes, SecretPersistence, SecretType};
use keyvault::{VaultError, VaultRegistry};
use tempfile::TempDir;

const PERSISTENT: SecretPersistence = SecretPersistence::Persistent;
const EPHEMERAL: SecretPersistence = SecretPersistence::Ephemeral;

fn record_files(dir: &TempDir) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .filter(|n| n.ends_with(".secret"))
        .collect();
    names.sort();
    names
}

// ---------------------------------------------------------------------------
// Round trips across restarts
// ---------------------------------------------------------------------------

#[test]
fn persistent_secret_survives_restart() {
    let dir = TempDir::new().unwrap();

    let (id, original) = {
        let registry = VaultRegistry::new();
        let handle = registry.file_init(dir.path()).unwrap();
        let vault = registry.get(handle).unwrap();

        let secret = vault
            .secret_generate(SecretAttributes::aes256(PERSISTENT))
            .unwrap();
        let id = vault.get_persistence_id(secret).unwrap();
        let mut bytes = [0u8; 32];
        vault.secret_export(secret, &mut bytes).unwrap();

        registry.deinit(handle).unwrap();
        (id, bytes)
    };

    let registry = VaultRegistry::new();
    let vault = registry.get(registry.file_init(dir.path()).unwrap()).unwrap();
    let reloaded = vault.get_persistent_secret(&id).unwrap();

    assert_eq!(
        vault.secret_attributes_get(reloaded).unwrap(),
        SecretAttributes::aes256(PERSISTENT)
    );
    let mut bytes = [0u8; 32];
    vault.secret_export(reloaded, &mut bytes).unwrap();
    assert_eq!(bytes, original);
    assert_eq!(vault.get_persistence_id(reloaded).unwrap(), id);
}

#[test]
fn private_key_survives_restart() {
    let dir = TempDir::new().unwrap();
    let registry = VaultRegistry::new();

    let first = registry.file_init(dir.path()).unwrap();
    let vault = registry.get(first).unwrap();
    let key = vault.secret_generate(SecretAttributes::p256(PERSISTENT)).unwrap();
    let id = vault.get_persistence_id(key).unwrap();
    let mut public_before = [0u8; 65];
    vault.secret_public_key_get(key, &mut public_before).unwrap();
    registry.deinit(first).unwrap();

    let vault = registry.get(registry.file_init(dir.path()).unwrap()).unwrap();
    let key = vault.get_persistent_secret(&id).unwrap();
    let mut public_after = [0u8; 65];
    vault.secret_public_key_get(key, &mut public_after).unwrap();
    assert_eq!(public_before, public_after);
}

#[test]
fn imported_buffer_survives_restart() {
    let dir = TempDir::new().unwrap();
    let registry = VaultRegistry::new();
    let data = b"some persistent buffer";

    let first = registry.file_init(dir.path()).unwrap();
    let vault = registry.get(first).unwrap();
    let h = vault
        .secret_import(SecretAttributes::buffer(data.len(), PERSISTENT), data)
        .unwrap();
    let id = vault.get_persistence_id(h).unwrap();
    registry.deinit(first).unwrap();

    let vault = registry.get(registry.file_init(dir.path()).unwrap()).unwrap();
    let h = vault.get_persistent_secret(&id).unwrap();
    let mut out = vec![0u8; data.len()];
    vault.secret_export(h, &mut out).unwrap();
    assert_eq!(out, data);
}

#[test]
fn each_load_yields_a_fresh_handle() {
    let dir = TempDir::new().unwrap();
    let registry = VaultRegistry::new();
    let vault = registry.get(registry.file_init(dir.path()).unwrap()).unwrap();

    let h = vault.secret_generate(SecretAttributes::aes256(PERSISTENT)).unwrap();
    let id = vault.get_persistence_id(h).unwrap();

    let again = vault.get_persistent_secret(&id).unwrap();
    assert_ne!(h, again);
}

#[test]
fn record_outlives_all_but_the_last_loaded_handle() {
    let dir = TempDir::new().unwrap();
    let registry = VaultRegistry::new();
    let vault = registry.get(registry.file_init(dir.path()).unwrap()).unwrap();

    let first = vault.secret_generate(SecretAttributes::aes256(PERSISTENT)).unwrap();
    let id = vault.get_persistence_id(first).unwrap();
    let second = vault.get_persistent_secret(&id).unwrap();

    vault.secret_destroy(first).unwrap();
    assert_eq!(vault.get_persistence_id(second).unwrap(), id);
    assert_eq!(record_files(&dir), vec![format!("{id}.secret")]);
    let reloaded = vault.get_persistent_secret(&id).unwrap();

    vault.secret_destroy(second).unwrap();
    assert_eq!(record_files(&dir).len(), 1);
    vault.secret_destroy(reloaded).unwrap();
    assert!(record_files(&dir).is_empty());
    assert!(matches!(
        vault.get_persistent_secret(&id),
        Err(VaultError::NotFound(_))
    ));
}

// ---------------------------------------------------------------------------
// Ids and lookups
// ---------------------------------------------------------------------------

#[test]
fn ephemeral_secrets_have_no_persistence_id() {
    let dir = TempDir::new().unwrap();
    let registry = VaultRegistry::new();
    let vault = registry.get(registry.file_init(dir.path()).unwrap()).unwrap();

    let h = vault.secret_generate(SecretAttributes::aes256(EPHEMERAL)).unwrap();
    assert!(matches!(
        vault.get_persistence_id(h),
        Err(VaultError::NotPersistent(_))
    ));
    assert!(record_files(&dir).is_empty());
}

#[test]
fn distinct_secrets_get_distinct_ids() {
    let dir = TempDir::new().unwrap();
    let registry = VaultRegistry::new();
    let vault = registry.get(registry.file_init(dir.path()).unwrap()).unwrap();

    let same = [7u8; 32];
    let a = vault.secret_import(SecretAttributes::aes256(PERSISTENT), &same).unwrap();
    let b = vault.secret_import(SecretAttributes::aes256(PERSISTENT), &same).unwrap();
    assert_ne!(
        vault.get_persistence_id(a).unwrap(),
        vault.get_persistence_id(b).unwrap()
    );
    assert_eq!(record_files(&dir).len(), 2);
    assert_eq!(vault.persistent_ids().unwrap().len(), 2);
}

#[test]
fn unknown_id_is_not_found() {
    let dir = TempDir::new().unwrap();
    let registry = VaultRegistry::new();
    let vault = registry.get(registry.file_init(dir.path()).unwrap()).unwrap();

    let missing = PersistenceId::parse(&"ab".repeat(16)).unwrap();
    assert!(matches!(
        vault.get_persistent_secret(&missing),
        Err(VaultError::NotFound(_))
    ));
    assert_eq!(vault.secret_count(), 0);
}

#[test]
fn default_vault_has_nothing_persistent() {
    let registry = VaultRegistry::new();
    let vault = registry.get(registry.default_init().unwrap()).unwrap();
    let id = PersistenceId::generate();
    assert!(matches!(
        vault.get_persistent_secret(&id),
        Err(VaultError::NotFound(_))
    ));
    assert!(vault.persistent_ids().unwrap().is_empty());
}

// ---------------------------------------------------------------------------
// Destroy and corruption
// ---------------------------------------------------------------------------

#[test]
fn destroy_removes_the_record() {
    let dir = TempDir::new().unwrap();
    let registry = VaultRegistry::new();
    let vault = registry.get(registry.file_init(dir.path()).unwrap()).unwrap();

    let h = vault.secret_generate(SecretAttributes::aes256(PERSISTENT)).unwrap();
    let id = vault.get_persistence_id(h).unwrap();
    assert_eq!(record_files(&dir).len(), 1);

    vault.secret_destroy(h).unwrap();
    assert!(record_files(&dir).is_empty());
    assert!(matches!(
        vault.get_persistent_secret(&id),
        Err(VaultError::NotFound(_))
    ));
}

#[test]
fn destroy_tolerates_a_missing_record() {
    let dir = TempDir::new().unwrap();
    let registry = VaultRegistry::new();
    let vault = registry.get(registry.file_init(dir.path()).unwrap()).unwrap();

    let h = vault.secret_generate(SecretAttributes::aes256(PERSISTENT)).unwrap();
    for name in record_files(&dir) {
        fs::remove_file(dir.path().join(name)).unwrap();
    }
    vault.secret_destroy(h).unwrap();
    assert!(vault.secret_attributes_get(h).is_err());
}

#[test]
fn corrupted_record_is_rejected() {
    let dir = TempDir::new().unwrap();
    let registry = VaultRegistry::new();
    let vault = registry.get(registry.file_init(dir.path()).unwrap()).unwrap();

    let h = vault.secret_generate(SecretAttributes::aes256(PERSISTENT)).unwrap();
    let id = vault.get_persistence_id(h).unwrap();

    let path = dir.path().join(format!("{id}.secret"));
    let mut bytes = fs::read(&path).unwrap();
    let last = bytes.len() - 40;
    bytes[last] ^= 0xFF;
    fs::write(&path, bytes).unwrap();

    assert!(matches!(
        vault.get_persistent_secret(&id),
        Err(VaultError::InvalidRecordFormat(_))
    ));
}

#[test]
fn deinit_keeps_records_on_disk() {
    let dir = TempDir::new().unwrap();
    let registry = VaultRegistry::new();
    let handle = registry.file_init(dir.path()).unwrap();
    let vault = registry.get(handle).unwrap();
    vault.secret_generate(SecretAttributes::curve25519(PERSISTENT)).unwrap();
    registry.deinit(handle).unwrap();
    assert_eq!(record_files(&dir).len(), 1);
}

// ---------------------------------------------------------------------------
// HKDF outputs and options
// ---------------------------------------------------------------------------

#[test]
fn hkdf_can_produce_persistent_outputs() {
    let dir = TempDir::new().unwrap();
    let registry = VaultRegistry::new();
    let vault = registry.get(registry.file_init(dir.path()).unwrap()).unwrap();

    let salt = vault
        .secret_import(SecretAttributes::buffer(4, EPHEMERAL), b"salt")
        .unwrap();
    let out = vault
        .hkdf_sha256(
            salt,
            &[],
            &[
                SecretAttributes::aes256(PERSISTENT),
                SecretAttributes::buffer(8, EPHEMERAL),
            ],
        )
        .unwrap();

    let id = vault.get_persistence_id(out[0]).unwrap();
    assert!(vault.get_persistence_id(out[1]).is_err());
    assert_eq!(record_files(&dir), vec![format!("{id}.secret")]);

    let header = vault.persistent_record_header(&id).unwrap();
    assert_eq!(header.attributes.secret_type, SecretType::AesKey);
}

#[test]
fn record_is_flushed_before_generate_returns() {
    let dir = TempDir::new().unwrap();
    let registry = VaultRegistry::new();
    let vault = registry.get(registry.file_init(dir.path()).unwrap()).unwrap();

    let h = vault.secret_generate(SecretAttributes::aes256(PERSISTENT)).unwrap();
    let id = vault.get_persistence_id(h).unwrap();

    // No temp file is left behind and the record is complete on disk.
    let names: Vec<_> = fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec![format!("{id}.secret")]);

    let other = VaultRegistry::new();
    let reader = other.get(other.file_init(dir.path()).unwrap()).unwrap();
    assert!(reader.get_persistent_secret(&id).is_ok());
}

#[test]
fn file_init_creates_the_directory() {
    let dir = TempDir::new().unwrap();
    let nested = dir.path().join("a").join("b");
    let registry = VaultRegistry::new();
    registry.file_init(&nested).unwrap();
    assert!(nested.is_dir());
}
