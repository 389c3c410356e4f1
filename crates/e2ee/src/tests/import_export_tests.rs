//! Unit-Tests fuer Import und Export

use std::collections::BTreeMap;
use std::io::{Cursor, Read};
use std::sync::Arc;

use litechat_core::{CacheSchluessel, ChatId};
use litechat_crypto::pem::{
    chat_key_aus_pem, pem_label_lesen, private_key_aus_pem, LABEL_PUBLIC_KEY,
};
use litechat_crypto::{CryptoBackend, CryptoError, RustCryptoBackend};
use litechat_records::{collections, Filter, RecordBody, RecordStore};

use super::{identitaet, nutzer, test_ctx, test_records};
use crate::error::E2eeError;
use crate::export::{ExportArchiv, ExportDatei, ExportFormat, ExportOptionen, ExportService, DATA_DATEI};
use crate::import::{ImportService, ImportZustand};
use crate::key_service::ChatKeyService;
use crate::message_service::MessageService;
use crate::storage::{LocalKeyStore, MemoryKeyStore};

// ---------------------------------------------------------------------------
// Keystore
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_keystore_richtiges_passwort() {
    let records = test_records();
    let a = nutzer(&records, "alice", 0).await;
    let b = nutzer(&records, "bob", 1).await;
    ChatKeyService::neu(a.ctx.clone())
        .create_chat(&a.id, &[b.id.clone()], "")
        .await
        .unwrap();

    let anzahl = ImportService::neu(a.ctx.clone())
        .seal_keystore("korrekt pferd batterie", false)
        .await
        .expect("Versiegeln fehlgeschlagen");
    assert_eq!(anzahl, 2);
    assert_eq!(records.anzahl(collections::KEYSTORE), 3);

    // Neues Geraet: leerer Cache, gleiches Backend
    let cache = Arc::new(MemoryKeyStore::new());
    let import = ImportService::neu(test_ctx(&records, &cache));
    assert_eq!(import.zustand(), ImportZustand::Idle);

    let bericht = import
        .import_keystore("korrekt pferd batterie")
        .await
        .expect("Import fehlgeschlagen");

    assert_eq!(bericht.importiert, 2);
    assert!(bericht.private_key);
    assert_eq!(bericht.chats.len(), 1);
    assert_eq!(bericht.geloescht, 0);
    assert_eq!(import.zustand(), ImportZustand::Committed { anzahl: 2 });
    assert_eq!(cache.eintraege().unwrap(), a.cache.eintraege().unwrap());
    assert_eq!(records.anzahl(collections::KEYSTORE), 3);
}

#[tokio::test]
async fn test_keystore_falsches_passwort_schreibt_nichts() {
    let records = test_records();
    let a = nutzer(&records, "alice", 0).await;
    ImportService::neu(a.ctx.clone())
        .seal_keystore("richtig", true)
        .await
        .unwrap();

    let cache = Arc::new(MemoryKeyStore::new());
    let import = ImportService::neu(test_ctx(&records, &cache));
    let err = import.import_keystore("falsch").await.unwrap_err();

    assert!(err.ist_passwortfehler());
    assert!(!matches!(err, E2eeError::KeystoreLeer));
    assert!(cache.is_empty());
    assert_eq!(import.zustand(), ImportZustand::Aborted);
    // Einmal-Eintraege bleiben nach einem Fehlschlag erhalten
    assert_eq!(records.anzahl(collections::KEYSTORE), 2);
}

#[tokio::test]
async fn test_keystore_einmal_eintraege_werden_geloescht() {
    let records = test_records();
    let a = nutzer(&records, "alice", 0).await;
    ImportService::neu(a.ctx.clone())
        .seal_keystore("pw", true)
        .await
        .unwrap();

    let cache = Arc::new(MemoryKeyStore::new());
    let bericht = ImportService::neu(test_ctx(&records, &cache))
        .import_keystore("pw")
        .await
        .unwrap();

    assert_eq!(bericht.importiert, 1);
    assert_eq!(bericht.geloescht, 2);
    assert_eq!(records.anzahl(collections::KEYSTORE), 0);
    assert!(cache.laden(&CacheSchluessel::PrivateKey).unwrap().is_some());
}

#[tokio::test]
async fn test_keystore_leer_und_ohne_salz() {
    let records = test_records();
    let cache = Arc::new(MemoryKeyStore::new());
    let import = ImportService::neu(test_ctx(&records, &cache));

    let err = import.import_keystore("pw").await.unwrap_err();
    assert!(matches!(err, E2eeError::KeystoreLeer));
    assert!(!err.ist_passwortfehler());

    records
        .create(
            collections::KEYSTORE,
            RecordBody::new()
                .feld("type", "AES-GCM")
                .feld("key", "AAAA")
                .feld("iv", vec![0u8; 12])
                .feld("relatedChat", "c1"),
        )
        .await
        .unwrap();
    let err = import.import_keystore("pw").await.unwrap_err();
    assert!(matches!(err, E2eeError::KeystoreSaltFehlt));
    assert_eq!(import.zustand(), ImportZustand::Aborted);
}

#[tokio::test]
async fn test_versiegeln_ersetzt_alten_keystore() {
    let records = test_records();
    let a = nutzer(&records, "alice", 0).await;
    let import = ImportService::neu(a.ctx.clone());

    import.seal_keystore("eins", false).await.unwrap();
    import.seal_keystore("zwei", false).await.unwrap();
    assert_eq!(records.anzahl(collections::KEYSTORE), 2);

    let cache = Arc::new(MemoryKeyStore::new());
    let neu = ImportService::neu(test_ctx(&records, &cache));
    assert!(neu.import_keystore("eins").await.unwrap_err().ist_passwortfehler());
    assert!(neu.import_keystore("zwei").await.is_ok());
}

#[tokio::test]
async fn test_keystore_nur_salz_ist_leer() {
    let records = test_records();
    records
        .create(
            collections::KEYSTORE,
            RecordBody::new()
                .feld("type", "PBKDF2")
                .feld("key", "")
                .feld("iv", vec![7u8; 16])
                .feld("relatedChat", ""),
        )
        .await
        .unwrap();

    let cache = Arc::new(MemoryKeyStore::new());
    let import = ImportService::neu(test_ctx(&records, &cache));
    let err = import.import_keystore("pw").await.unwrap_err();
    assert!(matches!(err, E2eeError::KeystoreLeer));
    assert_eq!(import.zustand(), ImportZustand::Aborted);
    assert!(cache.is_empty());
}

#[tokio::test]
async fn test_keystore_chat_id_mit_pfad_wird_abgelehnt() {
    let records = test_records();
    let a = nutzer(&records, "alice", 0).await;
    let b = nutzer(&records, "bob", 1).await;
    ChatKeyService::neu(a.ctx.clone())
        .create_chat(&a.id, &[b.id.clone()], "")
        .await
        .unwrap();
    ImportService::neu(a.ctx.clone())
        .seal_keystore("pw", false)
        .await
        .unwrap();

    let chat_eintrag = records
        .get_list(collections::KEYSTORE, &Filter::new().gleich("type", "AES-GCM"))
        .await
        .unwrap()
        .remove(0);
    records
        .update(
            collections::KEYSTORE,
            &chat_eintrag.id,
            RecordBody::new().feld("relatedChat", "../../ausbruch"),
        )
        .await
        .unwrap();

    let cache = Arc::new(MemoryKeyStore::new());
    let import = ImportService::neu(test_ctx(&records, &cache));
    let err = import.import_keystore("pw").await.unwrap_err();
    assert!(matches!(&err, E2eeError::Crypto(e) if e.ist_formatfehler()));
    assert!(cache.is_empty());
}

#[tokio::test]
async fn test_versiegeln_mit_abbruch_behaelt_alten_keystore() {
    let records = test_records();
    let a = nutzer(&records, "alice", 0).await;
    let b = nutzer(&records, "bob", 1).await;
    ChatKeyService::neu(a.ctx.clone())
        .create_chat(&a.id, &[b.id.clone()], "")
        .await
        .unwrap();
    let import = ImportService::neu(a.ctx.clone());
    import.seal_keystore("alt", false).await.unwrap();
    assert_eq!(records.anzahl(collections::KEYSTORE), 3);

    // Salz und privater Schluessel gelingen, der Chat-Schluessel nicht
    records.anlegen_scheitert_nach(collections::KEYSTORE, Some(2));
    let err = import.seal_keystore("neu", false).await.unwrap_err();
    assert!(err.ist_transport());
    records.anlegen_scheitert_nach(collections::KEYSTORE, None);

    assert_eq!(records.anzahl(collections::KEYSTORE), 3);
    let cache = Arc::new(MemoryKeyStore::new());
    let bericht = ImportService::neu(test_ctx(&records, &cache))
        .import_keystore("alt")
        .await
        .expect("alter Keystore muss lesbar bleiben");
    assert_eq!(bericht.importiert, 2);
}

#[tokio::test]
async fn test_versiegeln_ohne_schluessel() {
    let records = test_records();
    let cache = Arc::new(MemoryKeyStore::new());
    let err = ImportService::neu(test_ctx(&records, &cache))
        .seal_keystore("pw", false)
        .await
        .unwrap_err();
    assert!(matches!(err, E2eeError::UngueltigeEingabe(_)));
    assert_eq!(records.anzahl(collections::KEYSTORE), 0);
}

// ---------------------------------------------------------------------------
// Text / Datei
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_import_aus_text() {
    let records = test_records();
    let cache = Arc::new(MemoryKeyStore::new());
    let import = ImportService::neu(test_ctx(&records, &cache));
    let text = identitaet(0).private_jwk_text().unwrap();

    let identity = import
        .import_text(&format!("  {text}\n"))
        .expect("Import aus Text fehlgeschlagen");
    assert_eq!(identity.public_key(), identitaet(0).public_key());
    assert_eq!(cache.laden(&CacheSchluessel::PrivateKey).unwrap(), Some(text));
}

#[tokio::test]
async fn test_import_ungueltiger_text_schreibt_nichts() {
    let records = test_records();
    let cache = Arc::new(MemoryKeyStore::new());
    let import = ImportService::neu(test_ctx(&records, &cache));

    assert!(matches!(
        import.import_text("").unwrap_err(),
        E2eeError::UngueltigeEingabe(_)
    ));
    // Oeffentlicher Schluessel ist kein privater Schluessel
    let public = identitaet(0).public_jwk_text().unwrap();
    assert!(matches!(import.import_text(&public).unwrap_err(), E2eeError::Crypto(_)));
    assert!(cache.is_empty());
}

#[tokio::test]
async fn test_import_aus_datei() {
    let dir = tempfile::tempdir().expect("Temp-Verzeichnis konnte nicht erstellt werden");
    let pfad = dir.path().join("privateKey.json");
    tokio::fs::write(&pfad, identitaet(1).private_jwk_text().unwrap())
        .await
        .unwrap();

    let records = test_records();
    let cache = Arc::new(MemoryKeyStore::new());
    let import = ImportService::neu(test_ctx(&records, &cache));
    import.import_file(&pfad).await.expect("Import aus Datei fehlgeschlagen");
    assert!(cache.laden(&CacheSchluessel::PrivateKey).unwrap().is_some());

    let err = import
        .import_file(&dir.path().join("fehlt.json"))
        .await
        .unwrap_err();
    assert!(matches!(err, E2eeError::Io(_)));
}

// ---------------------------------------------------------------------------
// Export
// ---------------------------------------------------------------------------

fn zip_lesen(bytes: Vec<u8>) -> BTreeMap<String, Vec<u8>> {
    let mut zip = zip::ZipArchive::new(Cursor::new(bytes)).expect("kein gueltiges ZIP");
    (0..zip.len())
        .map(|i| {
            let mut datei = zip.by_index(i).unwrap();
            let mut inhalt = Vec::new();
            datei.read_to_end(&mut inhalt).unwrap();
            (datei.name().to_string(), inhalt)
        })
        .collect()
}

#[tokio::test]
async fn test_export_jwk_mit_daten() {
    let records = test_records();
    let a = nutzer(&records, "alice", 0).await;
    let b = nutzer(&records, "bob", 1).await;
    let (chat, key) = ChatKeyService::neu(a.ctx.clone())
        .create_chat(&a.id, &[b.id.clone()], "Team")
        .await
        .unwrap();
    MessageService::neu(a.ctx.clone())
        .send(&a.id, &chat.chat_id(), "exportiert", vec![], &key)
        .await
        .unwrap();

    let optionen = ExportOptionen {
        format: ExportFormat::Jwk,
        related_people: true,
        entschluesselt: true,
        schluessel: true,
        ..Default::default()
    };
    let archiv = ExportService::neu(a.ctx.clone())
        .export(&a.id, &optionen)
        .await
        .expect("Export fehlgeschlagen");

    assert_eq!(archiv.dateien[0].name, DATA_DATEI);
    let daten = archiv.daten().unwrap();
    assert_eq!(daten["chats"].as_array().unwrap().len(), 1);
    assert_eq!(daten["relatedPeople"][0]["id"], b.id.as_str());
    assert_eq!(daten["messages"][0]["text"], "exportiert");
    assert_eq!(daten["format"], "jwk");

    let keys = daten["keys"].as_array().unwrap();
    assert_eq!(keys.len(), 3);
    let backend = RustCryptoBackend::new();
    for eintrag in keys {
        let datei = archiv
            .datei(eintrag["file"].as_str().unwrap())
            .expect("Schluessel-Datei fehlt");
        assert_eq!(eintrag["sha256"], hex::encode(backend.digest_sha256(&datei.inhalt)));
    }

    let private = archiv.datei("keys/privateKey.json").unwrap();
    assert_eq!(
        String::from_utf8(private.inhalt.clone()).unwrap(),
        a.cache.laden(&CacheSchluessel::PrivateKey).unwrap().unwrap()
    );
}

#[tokio::test]
async fn test_export_nachrichten_verschluesselt() {
    let records = test_records();
    let a = nutzer(&records, "alice", 0).await;
    let b = nutzer(&records, "bob", 1).await;
    let (chat, key) = ChatKeyService::neu(a.ctx.clone())
        .create_chat(&a.id, &[b.id.clone()], "")
        .await
        .unwrap();
    let gesendet = MessageService::neu(a.ctx.clone())
        .send(&a.id, &chat.chat_id(), "bleibt geheim", vec![], &key)
        .await
        .unwrap();

    let archiv = ExportService::neu(a.ctx.clone())
        .export(&a.id, &ExportOptionen::default())
        .await
        .unwrap();
    let daten = archiv.daten().unwrap();

    assert_eq!(archiv.dateien.len(), 1);
    assert!(daten.get("keys").is_none());
    assert!(daten.get("relatedPeople").is_none());
    assert_eq!(daten["messages"][0]["content"], gesendet.content.as_str());
    assert!(daten["messages"][0].get("text").is_none());
}

#[tokio::test]
async fn test_export_pem() {
    let records = test_records();
    let a = nutzer(&records, "alice", 0).await;
    let b = nutzer(&records, "bob", 1).await;
    let (chat, key) = ChatKeyService::neu(a.ctx.clone())
        .create_chat(&a.id, &[b.id.clone()], "")
        .await
        .unwrap();

    let optionen = ExportOptionen {
        format: ExportFormat::Pem,
        related_people: true,
        nachrichten: false,
        schluessel: true,
        ..Default::default()
    };
    let archiv = ExportService::neu(a.ctx.clone())
        .export(&a.id, &optionen)
        .await
        .unwrap();

    let text = |name: &str| {
        let datei = archiv.datei(name).unwrap_or_else(|| panic!("{name} fehlt"));
        String::from_utf8(datei.inhalt.clone()).unwrap()
    };

    let privat = private_key_aus_pem(&text("keys/privateKey.pem")).unwrap();
    assert_eq!(&privat, identitaet(0).private_key());

    let chat_key = chat_key_aus_pem(&text(&format!("keys/chat_{}.pem", chat.id))).unwrap();
    assert_eq!(chat_key, key);

    let (label, _) = pem_label_lesen(&text(&format!("keys/public_{}.pem", b.id))).unwrap();
    assert_eq!(label, LABEL_PUBLIC_KEY);
}

#[tokio::test]
async fn test_export_privater_schluessel() {
    let records = test_records();
    let a = nutzer(&records, "alice", 0).await;
    let text = ExportService::neu(a.ctx.clone()).export_private_key().unwrap();
    assert_eq!(text, identitaet(0).private_jwk_text().unwrap());

    let cache = Arc::new(MemoryKeyStore::new());
    let err = ExportService::neu(test_ctx(&records, &cache))
        .export_private_key()
        .unwrap_err();
    assert!(matches!(err, E2eeError::Crypto(CryptoError::KeinPrivaterSchluessel)));
}

#[tokio::test]
async fn test_archiv_schreiben() {
    let records = test_records();
    let a = nutzer(&records, "alice", 0).await;
    let optionen = ExportOptionen {
        schluessel: true,
        ..Default::default()
    };
    let archiv = ExportService::neu(a.ctx.clone())
        .export(&a.id, &optionen)
        .await
        .unwrap();

    let dir = tempfile::tempdir().unwrap();
    let ziel = dir.path().join("export").join("litechat.zip");
    archiv.schreiben(&ziel).await.expect("Schreiben fehlgeschlagen");

    let inhalt = zip_lesen(std::fs::read(&ziel).unwrap());
    assert_eq!(inhalt.len(), archiv.dateien.len());
    for datei in &archiv.dateien {
        assert_eq!(inhalt.get(&datei.name), Some(&datei.inhalt), "{}", datei.name);
    }
    assert!(inhalt.contains_key(DATA_DATEI));
    assert!(inhalt.contains_key("keys/privateKey.json"));
}

#[tokio::test]
async fn test_export_chat_id_mit_pfad_wird_nicht_geschrieben() {
    let records = test_records();
    let a = nutzer(&records, "alice", 0).await;
    let key = litechat_crypto::generate_chat_key(&RustCryptoBackend::new());
    a.cache
        .speichern(
            &CacheSchluessel::Chat(ChatId::new("/../../../ausbruch")),
            &key.to_jwk_text().unwrap(),
        )
        .unwrap();

    let optionen = ExportOptionen {
        schluessel: true,
        ..Default::default()
    };
    let archiv = ExportService::neu(a.ctx.clone())
        .export(&a.id, &optionen)
        .await
        .unwrap();
    assert!(archiv.dateien.iter().all(|d| !d.name.contains("..")));
    assert_eq!(archiv.daten().unwrap()["keys"].as_array().unwrap().len(), 1);

    let dir = tempfile::tempdir().unwrap();
    let ziel = dir.path().join("a").join("b").join("export.zip");
    archiv.schreiben(&ziel).await.unwrap();
    assert!(!dir.path().join("a").join("ausbruch.json").exists());
    assert!(!dir.path().join("ausbruch.json").exists());
    assert_eq!(std::fs::read_dir(dir.path().join("a").join("b")).unwrap().count(), 1);
}

#[test]
fn test_archiv_lehnt_pfade_ausserhalb_ab() {
    for name in ["../ausbruch.json", "/etc/ausbruch", "keys/../../x", "keys\\..\\x", ""] {
        let archiv = ExportArchiv {
            dateien: vec![ExportDatei {
                name: name.to_string(),
                inhalt: b"x".to_vec(),
            }],
        };
        let err = archiv.zip_bytes().unwrap_err();
        assert!(matches!(err, E2eeError::UngueltigeEingabe(_)), "{name}");
    }
}
