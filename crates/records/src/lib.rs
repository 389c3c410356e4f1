//! litechat-records – Record-Speicher-Abstraktion
//!
//! Das Backend (Datensaetze, Realtime-Events, Dateien) wird hinter dem
//! `RecordStore`-Trait abstrahiert. `MemoryRecordStore` ist eine vollstaendige
//! In-Memory-Implementierung fuer Tests und Offline-Betrieb.

pub mod error;
pub mod memory;
pub mod models;
pub mod repository;

pub use error::{RecordError, RecordResult};
pub use memory::MemoryRecordStore;
pub use models::{
    collections, FileUpload, Filter, Record, RecordAction, RecordBody, RecordEvent,
};
pub use repository::RecordStore;
