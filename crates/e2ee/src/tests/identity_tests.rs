//! Unit-Tests fuer den IdentityService

use std::sync::Arc;

use litechat_core::CacheSchluessel;
use litechat_crypto::{parse_public_key, IdentityKeyPair};
use litechat_records::{collections, RecordStore};

use super::{identitaet, nutzer_mit_schluessel, profil_ohne_schluessel, test_ctx, test_records};
use crate::error::E2eeError;
use crate::identity_service::IdentityService;
use crate::storage::{LocalKeyStore, MemoryKeyStore};

#[tokio::test]
async fn test_schluessel_paar_erzeugen() {
    let records = test_records();
    let cache = Arc::new(MemoryKeyStore::new());
    let service = IdentityService::neu(test_ctx(&records, &cache));

    let texts = service
        .generate_identity_keypair()
        .await
        .expect("Erzeugen fehlgeschlagen");

    assert_eq!(
        cache.laden(&CacheSchluessel::PrivateKey).unwrap(),
        Some(texts.private_key_text.clone())
    );
    let geladen = service
        .load_identity_private_key()
        .unwrap()
        .expect("Schluessel nicht im Cache");
    assert_eq!(geladen.public_key(), parse_public_key(&texts.public_key_text).unwrap());
}

#[tokio::test]
async fn test_laden_ohne_schluessel() {
    let records = test_records();
    let cache = Arc::new(MemoryKeyStore::new());
    let service = IdentityService::neu(test_ctx(&records, &cache));
    assert!(service.load_identity_private_key().unwrap().is_none());
}

#[tokio::test]
async fn test_laden_mit_kaputtem_cache() {
    let records = test_records();
    let cache = Arc::new(MemoryKeyStore::new());
    cache
        .speichern(&CacheSchluessel::PrivateKey, "{\"kty\":\"RSA\"}")
        .unwrap();
    let service = IdentityService::neu(test_ctx(&records, &cache));
    assert!(matches!(
        service.load_identity_private_key(),
        Err(E2eeError::Crypto(_))
    ));
}

#[tokio::test]
async fn test_veroeffentlichen_nutzt_lokalen_schluessel() {
    let records = test_records();
    let user = profil_ohne_schluessel(&records, "carol").await;
    let cache = Arc::new(MemoryKeyStore::new());
    let lokal = identitaet(2);
    cache
        .speichern(&CacheSchluessel::PrivateKey, &lokal.private_jwk_text().unwrap())
        .unwrap();
    let service = IdentityService::neu(test_ctx(&records, &cache));

    assert!(service.ensure_published(&user).await.unwrap());
    let text = service.public_key_text(&user).await.unwrap();
    assert_eq!(parse_public_key(&text).unwrap(), lokal.public_key());

    // Zweiter Aufruf aendert nichts
    assert!(!service.ensure_published(&user).await.unwrap());
    assert_eq!(service.public_key_text(&user).await.unwrap(), text);
}

#[tokio::test]
async fn test_veroeffentlichen_ohne_lokalen_schluessel() {
    let records = test_records();
    let user = profil_ohne_schluessel(&records, "dave").await;
    let cache = Arc::new(MemoryKeyStore::new());
    let service = IdentityService::neu(test_ctx(&records, &cache));

    assert!(service.ensure_published(&user).await.unwrap());

    let private = cache
        .laden(&CacheSchluessel::PrivateKey)
        .unwrap()
        .expect("Neuer Schluessel nicht im Cache");
    let identity = IdentityKeyPair::from_private_jwk(&private).unwrap();
    let profil = records
        .get_one(collections::USERS, user.as_str())
        .await
        .unwrap();
    assert_eq!(
        parse_public_key(profil.text("publicKey")).unwrap(),
        identity.public_key()
    );
}

#[tokio::test]
async fn test_vorhandener_oeffentlicher_schluessel_bleibt() {
    let records = test_records();
    let nutzer = nutzer_mit_schluessel(&records, "erin", 1, None).await;
    let service = IdentityService::neu(nutzer.ctx.clone());

    assert!(!service.ensure_published(&nutzer.id).await.unwrap());
    assert!(nutzer.cache.is_empty(), "kein neuer Schluessel erzeugt");
}

#[tokio::test]
async fn test_kein_oeffentlicher_schluessel() {
    let records = test_records();
    let user = profil_ohne_schluessel(&records, "frank").await;
    let cache = Arc::new(MemoryKeyStore::new());
    let service = IdentityService::neu(test_ctx(&records, &cache));

    let err = service.public_key_text(&user).await.unwrap_err();
    assert!(matches!(err, E2eeError::KeinOeffentlicherSchluessel { .. }));
}
