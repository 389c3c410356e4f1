//! Lokaler Schluessel-Cache
//!
//! Zwei Namensraeume: `privateKey` (Identitaetsschluessel) und
//! `chat_<chatId>` (Chat-Schluessel), jeweils als JWK-Text. Der Cache ist
//! unverschluesselt und wird als prozessweite Instanz an alle Dienste
//! uebergeben.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use dashmap::DashMap;
use litechat_core::CacheSchluessel;
use parking_lot::Mutex;

use crate::error::{E2eeError, E2eeResult};

/// Abstrakter lokaler Schluessel-Speicher
///
/// Zugriffe sind synchron; Schreiben desselben Werts ist idempotent.
pub trait LocalKeyStore: Send + Sync {
    fn laden(&self, schluessel: &CacheSchluessel) -> E2eeResult<Option<String>>;

    fn speichern(&self, schluessel: &CacheSchluessel, wert: &str) -> E2eeResult<()>;

    fn entfernen(&self, schluessel: &CacheSchluessel) -> E2eeResult<()>;

    /// Alle bekannten Eintraege, sortiert nach Namensraum
    fn eintraege(&self) -> E2eeResult<Vec<(CacheSchluessel, String)>>;

    /// Schreibt mehrere Eintraege als eine Einheit
    fn alle_speichern(&self, eintraege: &[(CacheSchluessel, String)]) -> E2eeResult<()> {
        for (schluessel, wert) in eintraege {
            self.speichern(schluessel, wert)?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// In-Memory
// ---------------------------------------------------------------------------

/// Fluechtiger Cache (Tests, Sitzungen ohne Persistenz)
#[derive(Debug, Default)]
pub struct MemoryKeyStore {
    eintraege: DashMap<String, String>,
}

impl MemoryKeyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.eintraege.len()
    }

    pub fn is_empty(&self) -> bool {
        self.eintraege.is_empty()
    }
}

impl LocalKeyStore for MemoryKeyStore {
    fn laden(&self, schluessel: &CacheSchluessel) -> E2eeResult<Option<String>> {
        Ok(self
            .eintraege
            .get(&schluessel.eintrag())
            .map(|e| e.value().clone()))
    }

    fn speichern(&self, schluessel: &CacheSchluessel, wert: &str) -> E2eeResult<()> {
        self.eintraege.insert(schluessel.eintrag(), wert.to_string());
        Ok(())
    }

    fn entfernen(&self, schluessel: &CacheSchluessel) -> E2eeResult<()> {
        self.eintraege.remove(&schluessel.eintrag());
        Ok(())
    }

    fn eintraege(&self) -> E2eeResult<Vec<(CacheSchluessel, String)>> {
        let mut liste: Vec<(CacheSchluessel, String)> = self
            .eintraege
            .iter()
            .filter_map(|e| {
                CacheSchluessel::aus_eintrag(e.key()).map(|s| (s, e.value().clone()))
            })
            .collect();
        liste.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(liste)
    }
}

// ---------------------------------------------------------------------------
// Datei
// ---------------------------------------------------------------------------

/// Persistenter Cache: ein JSON-Objekt `{eintrag: jwk_text}` auf der Platte
///
/// Jede Aenderung schreibt die komplette Datei neu (temporaere Datei + rename).
pub struct FileKeyStore {
    pfad: PathBuf,
    eintraege: Mutex<BTreeMap<String, String>>,
}

impl FileKeyStore {
    /// Oeffnet den Cache, eine fehlende Datei ergibt einen leeren Cache
    pub fn oeffnen(pfad: impl Into<PathBuf>) -> E2eeResult<Self> {
        let pfad = pfad.into();
        let eintraege = match std::fs::read_to_string(&pfad) {
            Ok(inhalt) if inhalt.trim().is_empty() => BTreeMap::new(),
            Ok(inhalt) => serde_json::from_str(&inhalt).map_err(|e| {
                E2eeError::Speicher(format!("{} ist kein gueltiger Cache: {e}", pfad.display()))
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(pfad = %pfad.display(), "Kein Schluessel-Cache vorhanden, starte leer");
                BTreeMap::new()
            }
            Err(e) => return Err(e.into()),
        };

        Ok(Self {
            pfad,
            eintraege: Mutex::new(eintraege),
        })
    }

    pub fn pfad(&self) -> &Path {
        &self.pfad
    }

    fn schreiben(&self, eintraege: &BTreeMap<String, String>) -> E2eeResult<()> {
        if let Some(parent) = self.pfad.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let tmp = self.pfad.with_extension("tmp");
        std::fs::write(&tmp, serde_json::to_vec_pretty(eintraege)?)?;
        std::fs::rename(&tmp, &self.pfad)?;
        tracing::trace!(pfad = %self.pfad.display(), anzahl = eintraege.len(), "Schluessel-Cache geschrieben");
        Ok(())
    }
}

impl LocalKeyStore for FileKeyStore {
    fn laden(&self, schluessel: &CacheSchluessel) -> E2eeResult<Option<String>> {
        Ok(self.eintraege.lock().get(&schluessel.eintrag()).cloned())
    }

    fn speichern(&self, schluessel: &CacheSchluessel, wert: &str) -> E2eeResult<()> {
        self.alle_speichern(&[(schluessel.clone(), wert.to_string())])
    }

    fn entfernen(&self, schluessel: &CacheSchluessel) -> E2eeResult<()> {
        let mut eintraege = self.eintraege.lock();
        let mut kopie = eintraege.clone();
        if kopie.remove(&schluessel.eintrag()).is_some() {
            self.schreiben(&kopie)?;
            *eintraege = kopie;
        }
        Ok(())
    }

    fn eintraege(&self) -> E2eeResult<Vec<(CacheSchluessel, String)>> {
        let mut liste: Vec<(CacheSchluessel, String)> = self
            .eintraege
            .lock()
            .iter()
            .filter_map(|(k, v)| CacheSchluessel::aus_eintrag(k).map(|s| (s, v.clone())))
            .collect();
        liste.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(liste)
    }

    fn alle_speichern(&self, neue: &[(CacheSchluessel, String)]) -> E2eeResult<()> {
        let mut eintraege = self.eintraege.lock();
        let mut kopie = eintraege.clone();
        for (schluessel, wert) in neue {
            kopie.insert(schluessel.eintrag(), wert.clone());
        }
        self.schreiben(&kopie)?;
        *eintraege = kopie;
        Ok(())
    }
}
