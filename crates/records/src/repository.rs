//! Record-Speicher Trait
//!
//! Entkoppelt die E2EE-Dienste vom konkreten Backend. Alle Operationen sind
//! asynchron; Fehler des Backends werden als `RecordError::Transport`
//! unveraendert gemeldet und nicht automatisch wiederholt.

use tokio::sync::broadcast;

use crate::error::RecordResult;
use crate::models::{Filter, Record, RecordBody, RecordEvent};

/// Zugriff auf Datensaetze, Realtime-Events und Dateien
#[allow(async_fn_in_trait)]
pub trait RecordStore: Send + Sync {
    /// Legt einen Datensatz an (inkl. hochgeladener Dateien)
    async fn create(&self, collection: &str, body: RecordBody) -> RecordResult<Record>;

    /// Laedt einen Datensatz anhand seiner ID
    async fn get_one(&self, collection: &str, id: &str) -> RecordResult<Record>;

    /// Erster Datensatz der zum Filter passt, sonst `NichtGefunden`
    async fn get_first_list_item(&self, collection: &str, filter: &Filter)
        -> RecordResult<Record>;

    /// Alle passenden Datensaetze, aelteste zuerst
    async fn get_list(&self, collection: &str, filter: &Filter) -> RecordResult<Vec<Record>>;

    /// Fuehrt die Felder zusammen, neue Dateien werden angehaengt
    async fn update(&self, collection: &str, id: &str, body: RecordBody) -> RecordResult<Record>;

    async fn delete(&self, collection: &str, id: &str) -> RecordResult<()>;

    /// Loescht mehrere Datensaetze in einem Aufruf (alle oder keiner)
    async fn batch_delete(&self, collection: &str, ids: &[String]) -> RecordResult<()>;

    /// Abonniert Realtime-Events einer Collection; Abmelden durch Drop
    fn subscribe(&self, collection: &str) -> broadcast::Receiver<RecordEvent>;

    /// URL einer Datei eines Datensatzes
    fn file_url(&self, record: &Record, filename: &str) -> String;

    /// Laedt eine Datei per HTTP GET
    async fn download(&self, url: &str) -> RecordResult<Vec<u8>>;
}
