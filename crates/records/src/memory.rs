//! In-Memory Record-Speicher
//!
//! Vollstaendige Implementierung von `RecordStore` ohne Netzwerk. Fuer Tests
//! lassen sich Transportfehler pro Collection einschalten und Lesezugriffe
//! zaehlen.

use std::collections::{HashMap, HashSet};

use chrono::Utc;
use parking_lot::{Mutex, RwLock};
use serde_json::{Map, Value};
use tokio::sync::broadcast;

use crate::error::{RecordError, RecordResult};
use crate::models::{FileUpload, Filter, Record, RecordAction, RecordBody, RecordEvent};
use crate::repository::RecordStore;

const STANDARD_BASIS_URL: &str = "memory://litechat";
const EVENT_KAPAZITAET: usize = 256;
const RESERVIERTE_FELDER: [&str; 4] = ["id", "collection", "created", "updated"];

/// In-Memory Backend
pub struct MemoryRecordStore {
    basis_url: String,
    /// Collection -> Datensaetze in Einfuegereihenfolge
    records: RwLock<HashMap<String, Vec<Record>>>,
    /// Datei-URL -> Inhalt
    dateien: RwLock<HashMap<String, Vec<u8>>>,
    kanaele: Mutex<HashMap<String, broadcast::Sender<RecordEvent>>>,
    gestoert: RwLock<HashSet<String>>,
    /// Collection -> verbleibende erfolgreiche `create`-Aufrufe
    schreibbudget: Mutex<HashMap<String, usize>>,
    lesezugriffe: Mutex<HashMap<String, usize>>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::mit_basis_url(STANDARD_BASIS_URL)
    }

    pub fn mit_basis_url(basis_url: impl Into<String>) -> Self {
        Self {
            basis_url: basis_url.into().trim_end_matches('/').to_string(),
            records: RwLock::new(HashMap::new()),
            dateien: RwLock::new(HashMap::new()),
            kanaele: Mutex::new(HashMap::new()),
            gestoert: RwLock::new(HashSet::new()),
            schreibbudget: Mutex::new(HashMap::new()),
            lesezugriffe: Mutex::new(HashMap::new()),
        }
    }

    /// Schaltet simulierte Transportfehler fuer eine Collection ein oder aus
    pub fn stoerung_setzen(&self, collection: &str, aktiv: bool) {
        let mut gestoert = self.gestoert.write();
        if aktiv {
            gestoert.insert(collection.to_string());
        } else {
            gestoert.remove(collection);
        }
    }

    /// Laesst nach `erlaubt` erfolgreichen `create`-Aufrufen jedes weitere
    /// `create` auf die Collection mit einem Transportfehler scheitern
    ///
    /// `None` hebt die Begrenzung auf. Update und Delete bleiben unberuehrt.
    pub fn anlegen_scheitert_nach(&self, collection: &str, erlaubt: Option<usize>) {
        let mut budget = self.schreibbudget.lock();
        match erlaubt {
            Some(n) => budget.insert(collection.to_string(), n),
            None => budget.remove(collection),
        };
    }

    /// Anzahl der Lesezugriffe (get_one, get_first_list_item, get_list)
    pub fn lesezugriffe(&self, collection: &str) -> usize {
        self.lesezugriffe
            .lock()
            .get(collection)
            .copied()
            .unwrap_or(0)
    }

    /// Anzahl der Datensaetze einer Collection
    pub fn anzahl(&self, collection: &str) -> usize {
        self.records
            .read()
            .get(collection)
            .map(Vec::len)
            .unwrap_or(0)
    }

    fn pruefen(&self, collection: &str) -> RecordResult<()> {
        if self.gestoert.read().contains(collection) {
            return Err(RecordError::transport(format!(
                "Backend fuer '{collection}' nicht erreichbar"
            )));
        }
        Ok(())
    }

    fn anlegen(&self, collection: &str) -> RecordResult<()> {
        self.pruefen(collection)?;
        if let Some(rest) = self.schreibbudget.lock().get_mut(collection) {
            if *rest == 0 {
                return Err(RecordError::transport(format!(
                    "Anlegen in '{collection}' abgebrochen"
                )));
            }
            *rest -= 1;
        }
        Ok(())
    }

    fn lesen(&self, collection: &str) -> RecordResult<()> {
        *self
            .lesezugriffe
            .lock()
            .entry(collection.to_string())
            .or_insert(0) += 1;
        self.pruefen(collection)
    }

    fn senden(&self, collection: &str, action: RecordAction, record: &Record) {
        if let Some(sender) = self.kanaele.lock().get(collection) {
            // Kein Abonnent ist kein Fehler
            let _ = sender.send(RecordEvent {
                action,
                record: record.clone(),
            });
        }
    }

    fn datei_url(&self, collection: &str, id: &str, filename: &str) -> String {
        format!("{}/api/files/{collection}/{id}/{filename}", self.basis_url)
    }

    fn felder_uebernehmen(ziel: &mut Map<String, Value>, felder: Map<String, Value>) {
        for (name, wert) in felder {
            if !RESERVIERTE_FELDER.contains(&name.as_str()) {
                ziel.insert(name, wert);
            }
        }
    }

    fn dateien_uebernehmen(&self, record: &mut Record, body_files: Vec<FileUpload>) {
        let mut dateien = self.dateien.write();
        for upload in body_files {
            let mut namen = record.text_liste(&upload.field);
            if !namen.contains(&upload.name) {
                namen.push(upload.name.clone());
            }
            record.fields.insert(
                upload.field.clone(),
                Value::Array(namen.into_iter().map(Value::String).collect()),
            );
            let url = self.datei_url(&record.collection, &record.id, &upload.name);
            dateien.insert(url, upload.bytes);
        }
    }

    fn dateien_entfernen(&self, record: &Record) {
        let praefix = self.datei_url(&record.collection, &record.id, "");
        self.dateien.write().retain(|url, _| !url.starts_with(&praefix));
    }
}

impl Default for MemoryRecordStore {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordStore for MemoryRecordStore {
    async fn create(&self, collection: &str, body: RecordBody) -> RecordResult<Record> {
        self.anlegen(collection)?;

        let jetzt = Utc::now();
        let mut record = Record {
            id: uuid::Uuid::new_v4().simple().to_string(),
            collection: collection.to_string(),
            created: jetzt,
            updated: jetzt,
            fields: Map::new(),
        };
        Self::felder_uebernehmen(&mut record.fields, body.fields);
        self.dateien_uebernehmen(&mut record, body.files);

        self.records
            .write()
            .entry(collection.to_string())
            .or_default()
            .push(record.clone());

        tracing::debug!(collection, id = %record.id, "Datensatz angelegt");
        self.senden(collection, RecordAction::Create, &record);
        Ok(record)
    }

    async fn get_one(&self, collection: &str, id: &str) -> RecordResult<Record> {
        self.lesen(collection)?;
        self.records
            .read()
            .get(collection)
            .and_then(|liste| liste.iter().find(|r| r.id == id))
            .cloned()
            .ok_or_else(|| RecordError::nicht_gefunden(format!("{collection}/{id}")))
    }

    async fn get_first_list_item(
        &self,
        collection: &str,
        filter: &Filter,
    ) -> RecordResult<Record> {
        self.lesen(collection)?;
        self.records
            .read()
            .get(collection)
            .and_then(|liste| liste.iter().find(|r| filter.passt(r)))
            .cloned()
            .ok_or_else(|| RecordError::nicht_gefunden(format!("{collection} [{filter}]")))
    }

    async fn get_list(&self, collection: &str, filter: &Filter) -> RecordResult<Vec<Record>> {
        self.lesen(collection)?;
        Ok(self
            .records
            .read()
            .get(collection)
            .map(|liste| liste.iter().filter(|r| filter.passt(r)).cloned().collect())
            .unwrap_or_default())
    }

    async fn update(&self, collection: &str, id: &str, body: RecordBody) -> RecordResult<Record> {
        self.pruefen(collection)?;

        let mut records = self.records.write();
        let record = records
            .get_mut(collection)
            .and_then(|liste| liste.iter_mut().find(|r| r.id == id))
            .ok_or_else(|| RecordError::nicht_gefunden(format!("{collection}/{id}")))?;

        Self::felder_uebernehmen(&mut record.fields, body.fields);
        self.dateien_uebernehmen(record, body.files);
        record.updated = Utc::now();
        let record = record.clone();
        drop(records);

        tracing::debug!(collection, id, "Datensatz aktualisiert");
        self.senden(collection, RecordAction::Update, &record);
        Ok(record)
    }

    async fn delete(&self, collection: &str, id: &str) -> RecordResult<()> {
        self.batch_delete(collection, &[id.to_string()]).await
    }

    async fn batch_delete(&self, collection: &str, ids: &[String]) -> RecordResult<()> {
        self.pruefen(collection)?;

        let mut records = self.records.write();
        let liste = records.entry(collection.to_string()).or_default();

        if let Some(fehlt) = ids.iter().find(|id| !liste.iter().any(|r| &r.id == *id)) {
            return Err(RecordError::nicht_gefunden(format!("{collection}/{fehlt}")));
        }

        let (geloescht, behalten): (Vec<Record>, Vec<Record>) =
            liste.drain(..).partition(|r| ids.contains(&r.id));
        *liste = behalten;
        drop(records);

        tracing::debug!(collection, anzahl = geloescht.len(), "Datensaetze geloescht");
        for record in &geloescht {
            self.dateien_entfernen(record);
            self.senden(collection, RecordAction::Delete, record);
        }
        Ok(())
    }

    fn subscribe(&self, collection: &str) -> broadcast::Receiver<RecordEvent> {
        self.kanaele
            .lock()
            .entry(collection.to_string())
            .or_insert_with(|| broadcast::channel(EVENT_KAPAZITAET).0)
            .subscribe()
    }

    fn file_url(&self, record: &Record, filename: &str) -> String {
        self.datei_url(&record.collection, &record.id, filename)
    }

    async fn download(&self, url: &str) -> RecordResult<Vec<u8>> {
        let collection = url
            .strip_prefix(&self.basis_url)
            .and_then(|rest| rest.strip_prefix("/api/files/"))
            .and_then(|rest| rest.split('/').next())
            .ok_or_else(|| RecordError::nicht_gefunden(url.to_string()))?;
        self.pruefen(collection)?;

        self.dateien
            .read()
            .get(url)
            .cloned()
            .ok_or_else(|| RecordError::nicht_gefunden(url.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
