//! Datenmodelle des Record-Speichers
//!
//! Ein Datensatz besteht aus festen Metadaten (`id`, `collection`, Zeitstempel)
//! und einem freien JSON-Objekt mit den Feldern der jeweiligen Collection.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{RecordError, RecordResult};

/// Collection-Namen des Backends
pub mod collections {
    pub const USERS: &str = "users";
    pub const CHATS: &str = "chats";
    pub const MESSAGES: &str = "messages";
    pub const KEY_EXCHANGES: &str = "keyexchanges";
    pub const KEYSTORE: &str = "keystore";
}

// ---------------------------------------------------------------------------
// Datensatz
// ---------------------------------------------------------------------------

/// Ein Datensatz einer Collection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: String,
    pub collection: String,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Record {
    /// Rohwert eines Feldes
    pub fn feld(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// String-Feld; fehlende Felder ergeben einen leeren String
    pub fn text(&self, name: &str) -> &str {
        self.fields.get(name).and_then(Value::as_str).unwrap_or("")
    }

    pub fn bool(&self, name: &str) -> bool {
        self.fields.get(name).and_then(Value::as_bool).unwrap_or(false)
    }

    /// Liste von Strings (z.B. Mitglieder oder Dateinamen)
    pub fn text_liste(&self, name: &str) -> Vec<String> {
        match self.fields.get(name) {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect(),
            Some(Value::String(s)) if !s.is_empty() => vec![s.clone()],
            _ => Vec::new(),
        }
    }

    /// Deserialisiert die Felder in einen typisierten Datensatz
    pub fn parse<T: serde::de::DeserializeOwned>(&self) -> RecordResult<T> {
        let value = serde_json::to_value(self)?;
        serde_json::from_value(value).map_err(|e| {
            RecordError::UngueltigeDaten(format!(
                "{}/{}: {e}",
                self.collection, self.id
            ))
        })
    }
}

// ---------------------------------------------------------------------------
// Schreibzugriffe
// ---------------------------------------------------------------------------

/// Hochzuladende Datei, wird im Feld `field` als Dateiname eingetragen
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileUpload {
    pub field: String,
    pub name: String,
    pub bytes: Vec<u8>,
}

/// Inhalt eines create/update Aufrufs
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordBody {
    pub fields: Map<String, Value>,
    pub files: Vec<FileUpload>,
}

impl RecordBody {
    pub fn new() -> Self {
        Self::default()
    }

    /// Uebernimmt die Felder eines serialisierbaren Werts (muss ein Objekt sein)
    pub fn aus<T: Serialize>(value: &T) -> RecordResult<Self> {
        match serde_json::to_value(value)? {
            Value::Object(fields) => Ok(Self {
                fields,
                files: Vec::new(),
            }),
            other => Err(RecordError::UngueltigeDaten(format!(
                "Record-Body muss ein Objekt sein, war: {other}"
            ))),
        }
    }

    pub fn feld(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    pub fn datei(
        mut self,
        field: impl Into<String>,
        name: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Self {
        self.files.push(FileUpload {
            field: field.into(),
            name: name.into(),
            bytes,
        });
        self
    }
}

// ---------------------------------------------------------------------------
// Filter
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
enum Bedingung {
    Gleich(String, Value),
    Enthaelt(String, String),
}

/// Konjunktion einfacher Feldbedingungen
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    bedingungen: Vec<Bedingung>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    /// `feld = wert`
    pub fn gleich(mut self, feld: impl Into<String>, wert: impl Into<Value>) -> Self {
        self.bedingungen
            .push(Bedingung::Gleich(feld.into(), wert.into()));
        self
    }

    /// Listen-Feld enthaelt `wert` (z.B. `members ?= user`)
    pub fn enthaelt(mut self, feld: impl Into<String>, wert: impl Into<String>) -> Self {
        self.bedingungen
            .push(Bedingung::Enthaelt(feld.into(), wert.into()));
        self
    }

    pub fn passt(&self, record: &Record) -> bool {
        self.bedingungen.iter().all(|b| match b {
            Bedingung::Gleich(feld, wert) if feld == "id" => wert.as_str() == Some(&record.id),
            Bedingung::Gleich(feld, wert) => record.fields.get(feld) == Some(wert),
            Bedingung::Enthaelt(feld, wert) => record.text_liste(feld).iter().any(|v| v == wert),
        })
    }
}

impl std::fmt::Display for Filter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let teile: Vec<String> = self
            .bedingungen
            .iter()
            .map(|b| match b {
                Bedingung::Gleich(feld, wert) => format!("{feld} = {wert}"),
                Bedingung::Enthaelt(feld, wert) => format!("{feld} ?= \"{wert}\""),
            })
            .collect();
        f.write_str(&teile.join(" && "))
    }
}

// ---------------------------------------------------------------------------
// Realtime
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordAction {
    Create,
    Update,
    Delete,
}

/// Realtime-Ereignis einer Collection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordEvent {
    pub action: RecordAction,
    pub record: Record,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
