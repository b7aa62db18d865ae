mod common;

use common::{installation_store, issue, license_path, test_validator};
use licguard_crypto::{generate_symmetric_key, EncryptedData, SymmetricKey};
use licguard_license::Tier;
use licguard_store::{
    LicenseEnvelope, LicenseStore, StoreConfig, StoreError, ENVELOPE_VERSION,
    INSTALL_KEY_FILE_NAME,
};
use pretty_assertions::assert_eq;
use std::fs;
use tempfile::tempdir;

fn flip_byte(bytes: &mut [u8], index: usize) {
    let i = index % bytes.len();
    bytes[i] ^= 0x01;
}

// ── Installation key ─────────────────────────────────────────────

#[test]
fn store_and_retrieve() {
    let dir = tempdir().unwrap();
    let store = installation_store(&dir);
    let license = issue(Tier::Trial);

    store.store(&license).unwrap();
    assert!(store.exists());
    assert_eq!(store.retrieve(), Some(license.clone()));

    let retrieved = store.retrieve().unwrap();
    assert!(test_validator().validate(Some(&retrieved), false).is_valid());
}

#[test]
fn retrieve_missing_file_is_none() {
    let dir = tempdir().unwrap();
    let store = installation_store(&dir);
    assert!(!store.exists());
    assert!(store.retrieve().is_none());
    assert!(store.try_retrieve().unwrap().is_none());
}

#[test]
fn installation_key_created_beside_license() {
    let dir = tempdir().unwrap();
    let store = installation_store(&dir);
    store.store(&issue(Tier::Trial)).unwrap();

    let key_path = store.installation_key_path();
    assert_eq!(key_path.file_name().unwrap(), INSTALL_KEY_FILE_NAME);
    assert_eq!(key_path.parent(), store.path().parent());
    assert!(key_path.is_file());
}

#[cfg(unix)]
#[test]
fn installation_key_is_owner_only() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempdir().unwrap();
    let store = installation_store(&dir);
    store.store(&issue(Tier::Trial)).unwrap();

    let mode = fs::metadata(store.installation_key_path())
        .unwrap()
        .permissions()
        .mode();
    assert_eq!(mode & 0o777, 0o600);
}

#[test]
fn installation_key_is_reused() {
    let dir = tempdir().unwrap();
    let store = installation_store(&dir);
    store.store(&issue(Tier::Trial)).unwrap();
    let first = fs::read_to_string(store.installation_key_path()).unwrap();

    store.store(&issue(Tier::Premium)).unwrap();
    let second = fs::read_to_string(store.installation_key_path()).unwrap();
    assert_eq!(first, second);
    assert_eq!(store.retrieve().unwrap().tier, Tier::Premium);
}

#[test]
fn empty_installation_key_is_replaced_on_store() {
    let dir = tempdir().unwrap();
    let store = installation_store(&dir);
    let key_path = store.installation_key_path();
    fs::create_dir_all(key_path.parent().unwrap()).unwrap();
    fs::write(&key_path, "").unwrap();

    store.store(&issue(Tier::Trial)).unwrap();
    store.store(&issue(Tier::Premium)).unwrap();

    let encoded = fs::read_to_string(&key_path).unwrap();
    assert!(SymmetricKey::from_base64(&encoded).is_ok());
    assert_eq!(store.retrieve().unwrap().tier, Tier::Premium);
}

#[test]
fn garbage_installation_key_is_replaced_on_store() {
    let dir = tempdir().unwrap();
    let store = installation_store(&dir);
    let key_path = store.installation_key_path();
    fs::create_dir_all(key_path.parent().unwrap()).unwrap();
    fs::write(&key_path, "not a key").unwrap();
    assert!(store.try_retrieve().unwrap().is_none());

    store.store(&issue(Tier::Trial)).unwrap();
    assert_eq!(store.retrieve().unwrap().tier, Tier::Trial);

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = fs::metadata(&key_path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}

#[test]
fn file_is_not_plaintext() {
    let dir = tempdir().unwrap();
    let store = installation_store(&dir);
    let license = issue(Tier::Trial);
    store.store(&license).unwrap();

    let contents = fs::read_to_string(store.path()).unwrap();
    assert!(!contents.contains(&license.key));
    assert!(!contents.contains("machine_id"));
    assert!(EncryptedData::from_base64(contents.trim()).is_ok());
}

#[test]
fn flipped_ciphertext_byte_is_rejected() {
    let dir = tempdir().unwrap();
    let store = installation_store(&dir);
    store.store(&issue(Tier::Premium)).unwrap();

    let contents = fs::read_to_string(store.path()).unwrap();
    let encrypted = EncryptedData::from_base64(contents.trim()).unwrap();
    for index in [0usize, 12, 40, usize::MAX] {
        let mut bytes = encrypted.to_bytes();
        flip_byte(&mut bytes, index);
        let tampered = EncryptedData::from_bytes(&bytes).unwrap();
        fs::write(store.path(), tampered.to_base64()).unwrap();

        assert!(store.retrieve().is_none(), "flip at {index} was accepted");
        assert!(matches!(store.try_retrieve(), Err(StoreError::Crypto(_))));
    }
}

#[test]
fn garbage_file_is_none() {
    let dir = tempdir().unwrap();
    let store = installation_store(&dir);
    store.store(&issue(Tier::Trial)).unwrap();
    fs::write(store.path(), "not base64 at all!").unwrap();
    assert!(store.retrieve().is_none());
}

#[test]
fn missing_installation_key_is_none() {
    let dir = tempdir().unwrap();
    let store = installation_store(&dir);
    store.store(&issue(Tier::Trial)).unwrap();
    fs::remove_file(store.installation_key_path()).unwrap();

    assert!(store.retrieve().is_none());
    assert!(matches!(
        store.try_retrieve(),
        Err(StoreError::MissingInstallationKey(_))
    ));
}

#[test]
fn copied_file_does_not_open_on_other_installation() {
    let a = tempdir().unwrap();
    let b = tempdir().unwrap();
    let store_a = installation_store(&a);
    let store_b = installation_store(&b);

    store_a.store(&issue(Tier::Trial)).unwrap();
    store_b.store(&issue(Tier::Trial)).unwrap();
    fs::copy(store_a.path(), store_b.path()).unwrap();

    assert!(store_b.retrieve().is_none());
}

#[test]
fn has_valid_license() {
    let dir = tempdir().unwrap();
    let store = installation_store(&dir);
    assert!(!store.has_valid_license());

    store.store(&issue(Tier::Trial)).unwrap();
    assert!(store.has_valid_license());
}

// ── Caller-supplied key ──────────────────────────────────────────

#[test]
fn custom_key_writes_envelope() {
    let dir = tempdir().unwrap();
    let key = generate_symmetric_key();
    let key_hash = key.key_hash();
    let store = LicenseStore::with_key(&StoreConfig::at(license_path(&dir)), key).unwrap();
    let license = issue(Tier::Premium);

    store.store(&license).unwrap();

    let envelope: LicenseEnvelope =
        serde_json::from_str(&fs::read_to_string(store.path()).unwrap()).unwrap();
    assert_eq!(envelope.version, ENVELOPE_VERSION);
    assert_eq!(envelope.key_hash, key_hash);
    assert_eq!(store.retrieve(), Some(license));
    assert!(!store.installation_key_path().exists());
}

#[test]
fn wrong_custom_key_is_mismatch() {
    let dir = tempdir().unwrap();
    let config = StoreConfig::at(license_path(&dir));
    let writer = LicenseStore::with_key(&config, generate_symmetric_key()).unwrap();
    writer.store(&issue(Tier::Trial)).unwrap();

    let reader = LicenseStore::with_key(&config, generate_symmetric_key()).unwrap();
    assert!(reader.retrieve().is_none());
    assert!(matches!(reader.try_retrieve(), Err(StoreError::KeyMismatch)));
}

#[test]
fn unknown_envelope_version_rejected() {
    let dir = tempdir().unwrap();
    let config = StoreConfig::at(license_path(&dir));
    let key = SymmetricKey::from_bytes([9u8; 32]);
    let store = LicenseStore::with_key(&config, key).unwrap();
    store.store(&issue(Tier::Trial)).unwrap();

    let mut envelope: LicenseEnvelope =
        serde_json::from_str(&fs::read_to_string(store.path()).unwrap()).unwrap();
    envelope.version = 99;
    fs::write(store.path(), serde_json::to_string(&envelope).unwrap()).unwrap();

    assert!(matches!(
        store.try_retrieve(),
        Err(StoreError::UnsupportedVersion(99))
    ));
}

#[test]
fn tampered_envelope_ciphertext_rejected() {
    let dir = tempdir().unwrap();
    let config = StoreConfig::at(license_path(&dir));
    let store = LicenseStore::with_key(&config, generate_symmetric_key()).unwrap();
    store.store(&issue(Tier::Trial)).unwrap();

    let mut envelope: LicenseEnvelope =
        serde_json::from_str(&fs::read_to_string(store.path()).unwrap()).unwrap();
    let mut bytes = EncryptedData::from_base64(&envelope.encrypted_license)
        .unwrap()
        .to_bytes();
    flip_byte(&mut bytes, 20);
    envelope.encrypted_license = EncryptedData::from_bytes(&bytes).unwrap().to_base64();
    fs::write(store.path(), serde_json::to_string(&envelope).unwrap()).unwrap();

    assert!(store.retrieve().is_none());
}

#[test]
fn installation_file_unreadable_with_custom_key() {
    let dir = tempdir().unwrap();
    let config = StoreConfig::at(license_path(&dir));
    LicenseStore::new(&config)
        .unwrap()
        .store(&issue(Tier::Trial))
        .unwrap();

    let custom = LicenseStore::with_key(&config, generate_symmetric_key()).unwrap();
    assert!(matches!(
        custom.try_retrieve(),
        Err(StoreError::Serialization(_))
    ));
}

// ── Delete ───────────────────────────────────────────────────────

#[test]
fn delete_removes_file() {
    let dir = tempdir().unwrap();
    let store = installation_store(&dir);
    store.store(&issue(Tier::Trial)).unwrap();

    store.delete().unwrap();
    assert!(!store.exists());
    assert!(store.retrieve().is_none());
}

#[test]
fn delete_without_file_is_ok() {
    let dir = tempdir().unwrap();
    let store = installation_store(&dir);
    store.delete().unwrap();
}

#[test]
fn store_after_delete() {
    let dir = tempdir().unwrap();
    let store = installation_store(&dir);
    store.store(&issue(Tier::Trial)).unwrap();
    store.delete().unwrap();

    let license = issue(Tier::Premium);
    store.store(&license).unwrap();
    assert_eq!(store.retrieve(), Some(license));
}

// ── Concurrency ──────────────────────────────────────────────────

#[test]
fn concurrent_writers_leave_a_readable_license() {
    let dir = tempdir().unwrap();
    let store = installation_store(&dir);
    let licenses: Vec<_> = (0..8)
        .map(|i| if i % 2 == 0 { issue(Tier::Trial) } else { issue(Tier::Premium) })
        .collect();

    std::thread::scope(|scope| {
        for license in &licenses {
            let store = &store;
            scope.spawn(move || store.store(license).unwrap());
        }
    });

    let stored = store.retrieve().unwrap();
    assert!(licenses.contains(&stored));
}

// ── Config ───────────────────────────────────────────────────────

#[test]
fn config_explicit_path() {
    let config = StoreConfig::at("/tmp/licguard-test/license.lic");
    assert_eq!(
        config.license_path().unwrap(),
        std::path::PathBuf::from("/tmp/licguard-test/license.lic")
    );
}

#[test]
fn config_serde_default() {
    let config: StoreConfig = serde_json::from_str("{}").unwrap();
    assert_eq!(config, StoreConfig::default());
}
