//! Gemeinsame Test-Hilfen fuer die E2EE-Dienste

mod identity_tests;
mod import_export_tests;
mod storage_tests;

use std::sync::{Arc, OnceLock};

use litechat_core::{CacheSchluessel, UserId};
use litechat_crypto::{IdentityKeyPair, KeyParameters, RustCryptoBackend};
use litechat_records::{collections, MemoryRecordStore, RecordBody, RecordStore};

use crate::context::E2eeContext;
use crate::storage::{LocalKeyStore, MemoryKeyStore};

/// Vier vorab erzeugte 2048-Bit Identitaeten, einmal pro Test-Binary
pub(crate) fn identitaet(n: usize) -> IdentityKeyPair {
    static IDENTITAETEN: OnceLock<Vec<IdentityKeyPair>> = OnceLock::new();
    IDENTITAETEN
        .get_or_init(|| {
            let backend = RustCryptoBackend::new();
            (0..4)
                .map(|_| {
                    IdentityKeyPair::generate(&backend, &KeyParameters::fuer_tests())
                        .expect("Test-Identitaet konnte nicht erzeugt werden")
                })
                .collect()
        })[n]
        .clone()
}

pub(crate) fn test_records() -> Arc<MemoryRecordStore> {
    Arc::new(MemoryRecordStore::new())
}

pub(crate) fn test_ctx(
    records: &Arc<MemoryRecordStore>,
    cache: &Arc<MemoryKeyStore>,
) -> E2eeContext<MemoryRecordStore> {
    let cache: Arc<dyn LocalKeyStore> = cache.clone();
    E2eeContext::neu(records.clone(), cache).mit_parametern(KeyParameters::fuer_tests())
}

/// Ein Testbenutzer mit eigenem lokalen Cache
pub(crate) struct Nutzer {
    pub id: UserId,
    pub cache: Arc<MemoryKeyStore>,
    pub ctx: E2eeContext<MemoryRecordStore>,
}

/// Legt ein Profil mit dem oeffentlichen Schluessel von Identitaet `n` an
/// und legt deren privaten Schluessel im Cache ab
pub(crate) async fn nutzer(records: &Arc<MemoryRecordStore>, name: &str, n: usize) -> Nutzer {
    nutzer_mit_schluessel(records, name, n, Some(n)).await
}

/// Wie [`nutzer`], der lokale private Schluessel ist frei waehlbar (oder fehlt)
pub(crate) async fn nutzer_mit_schluessel(
    records: &Arc<MemoryRecordStore>,
    name: &str,
    veroeffentlicht: usize,
    lokal: Option<usize>,
) -> Nutzer {
    let public_key = identitaet(veroeffentlicht)
        .public_jwk_text()
        .expect("Public-JWK fehlgeschlagen");
    let profil = records
        .create(
            collections::USERS,
            RecordBody::new().feld("name", name).feld("publicKey", public_key),
        )
        .await
        .expect("Profil anlegen fehlgeschlagen");

    let cache = Arc::new(MemoryKeyStore::new());
    if let Some(lokal) = lokal {
        let private_key = identitaet(lokal)
            .private_jwk_text()
            .expect("Private-JWK fehlgeschlagen");
        cache
            .speichern(&CacheSchluessel::PrivateKey, &private_key)
            .expect("Cache schreiben fehlgeschlagen");
    }

    Nutzer {
        id: UserId::new(profil.id),
        ctx: test_ctx(records, &cache),
        cache,
    }
}

/// Profil ohne veroeffentlichten Schluessel
pub(crate) async fn profil_ohne_schluessel(records: &Arc<MemoryRecordStore>, name: &str) -> UserId {
    let profil = records
        .create(collections::USERS, RecordBody::new().feld("name", name))
        .await
        .expect("Profil anlegen fehlgeschlagen");
    UserId::new(profil.id)
}
