//! Unit-Tests fuer die lokalen Schluessel-Speicher

use litechat_core::{CacheSchluessel, ChatId};

use crate::error::E2eeError;
use crate::storage::{FileKeyStore, LocalKeyStore, MemoryKeyStore};

fn chat(id: &str) -> CacheSchluessel {
    CacheSchluessel::Chat(ChatId::new(id))
}

#[test]
fn test_memory_grundfunktionen() {
    let store = MemoryKeyStore::new();
    assert!(store.is_empty());
    assert_eq!(store.laden(&CacheSchluessel::PrivateKey).unwrap(), None);

    store.speichern(&chat("c1"), "eins").unwrap();
    store.speichern(&chat("c1"), "zwei").unwrap();
    assert_eq!(store.len(), 1);
    assert_eq!(store.laden(&chat("c1")).unwrap().as_deref(), Some("zwei"));

    store.entfernen(&chat("c1")).unwrap();
    store.entfernen(&chat("fehlt")).unwrap();
    assert!(store.is_empty());
}

#[test]
fn test_datei_ueberlebt_neustart() {
    let dir = tempfile::tempdir().unwrap();
    let pfad = dir.path().join("cache").join("keys.json");

    {
        let store = FileKeyStore::oeffnen(&pfad).expect("Oeffnen fehlgeschlagen");
        store.speichern(&CacheSchluessel::PrivateKey, "privat").unwrap();
        store.speichern(&chat("c1"), "chat").unwrap();
    }
    assert!(pfad.exists());

    let store = FileKeyStore::oeffnen(&pfad).unwrap();
    assert_eq!(store.pfad(), pfad.as_path());
    assert_eq!(
        store.laden(&CacheSchluessel::PrivateKey).unwrap().as_deref(),
        Some("privat")
    );
    assert_eq!(store.laden(&chat("c1")).unwrap().as_deref(), Some("chat"));
}

#[test]
fn test_datei_fehlt_ergibt_leeren_cache() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileKeyStore::oeffnen(dir.path().join("neu.json")).unwrap();
    assert!(store.eintraege().unwrap().is_empty());
    assert!(!dir.path().join("neu.json").exists(), "Lesen legt keine Datei an");
}

#[test]
fn test_datei_mit_ungueltigem_inhalt() {
    let dir = tempfile::tempdir().unwrap();
    let pfad = dir.path().join("kaputt.json");
    std::fs::write(&pfad, "kein json").unwrap();

    match FileKeyStore::oeffnen(&pfad) {
        Err(E2eeError::Speicher(msg)) => assert!(msg.contains("kaputt.json")),
        Err(e) => panic!("Unerwarteter Fehler: {e}"),
        Ok(_) => panic!("Ungueltiger Cache wurde akzeptiert"),
    }
}

#[test]
fn test_datei_entfernen() {
    let dir = tempfile::tempdir().unwrap();
    let pfad = dir.path().join("keys.json");
    let store = FileKeyStore::oeffnen(&pfad).unwrap();
    store.speichern(&chat("c1"), "chat").unwrap();
    store.entfernen(&chat("c1")).unwrap();

    let neu = FileKeyStore::oeffnen(&pfad).unwrap();
    assert_eq!(neu.laden(&chat("c1")).unwrap(), None);
}

#[test]
fn test_eintraege_sortiert_und_gefiltert() {
    let dir = tempfile::tempdir().unwrap();
    let pfad = dir.path().join("keys.json");
    std::fs::write(
        &pfad,
        r#"{"chat_b": "2", "fremd": "x", "privateKey": "p", "chat_a": "1"}"#,
    )
    .unwrap();

    let store = FileKeyStore::oeffnen(&pfad).unwrap();
    let schluessel: Vec<CacheSchluessel> = store
        .eintraege()
        .unwrap()
        .into_iter()
        .map(|(s, _)| s)
        .collect();
    assert_eq!(
        schluessel,
        vec![CacheSchluessel::PrivateKey, chat("a"), chat("b")]
    );
}

#[test]
fn test_alle_speichern() {
    let dir = tempfile::tempdir().unwrap();
    let pfad = dir.path().join("keys.json");
    let store = FileKeyStore::oeffnen(&pfad).unwrap();
    store.speichern(&chat("alt"), "bleibt").unwrap();

    store
        .alle_speichern(&[
            (CacheSchluessel::PrivateKey, "p".to_string()),
            (chat("c1"), "k".to_string()),
        ])
        .unwrap();

    let neu = FileKeyStore::oeffnen(&pfad).unwrap();
    assert_eq!(neu.eintraege().unwrap().len(), 3);

    let memory = MemoryKeyStore::new();
    memory.alle_speichern(&neu.eintraege().unwrap()).unwrap();
    assert_eq!(memory.eintraege().unwrap(), neu.eintraege().unwrap());
}

#[test]
fn test_datei_entfernen_ohne_schreiben_aendert_nichts() {
    let dir = tempfile::tempdir().unwrap();
    let pfad = dir.path().join("keys.json");
    let store = FileKeyStore::oeffnen(&pfad).unwrap();
    store.speichern(&chat("c1"), "chat").unwrap();

    // Verzeichnis an Stelle der Temp-Datei: Schreiben scheitert
    let tmp = pfad.with_extension("tmp");
    std::fs::create_dir(&tmp).unwrap();
    assert!(store.entfernen(&chat("c1")).is_err());
    assert_eq!(store.laden(&chat("c1")).unwrap().as_deref(), Some("chat"));

    std::fs::remove_dir(&tmp).unwrap();
    store.entfernen(&chat("c1")).unwrap();
    assert_eq!(store.laden(&chat("c1")).unwrap(), None);
}
