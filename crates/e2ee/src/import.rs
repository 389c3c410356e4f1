//! ImportService – Schluessel aus Text, Datei oder dem Keystore wiederherstellen
//!
//! ## Keystore-Import
//! ```text
//! Idle -> Fetching -> Deriving -> Decrypting(n/m) -> Committed
//!                                        |
//!                                        +-------> Aborted
//! ```
//! Der lokale Cache wird erst beschrieben, wenn alle Eintraege entschluesselt
//! sind. Einmal-Eintraege werden danach in einem Aufruf geloescht.

use std::path::Path;
use std::sync::Arc;

use litechat_core::{id_gueltig, CacheSchluessel, ChatId};
use litechat_crypto::keystore::{derive_keystore_key, generate_salt, open_entry, seal_entry};
use litechat_crypto::{ChatKey, CryptoError, CryptoResult, IdentityKeyPair, KeystoreEntryKind};
use litechat_records::{collections, Filter, RecordBody, RecordStore};
use parking_lot::Mutex;

use crate::context::E2eeContext;
use crate::error::{E2eeError, E2eeResult};
use crate::types::KeystoreRecord;

/// Fortschritt des Keystore-Imports
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportZustand {
    Idle,
    Fetching,
    Deriving,
    Decrypting { fertig: usize, gesamt: usize },
    Committed { anzahl: usize },
    Aborted,
}

/// Ergebnis eines erfolgreichen Keystore-Imports
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportBericht {
    /// Anzahl der in den Cache geschriebenen Schluessel
    pub importiert: usize,
    pub private_key: bool,
    pub chats: Vec<ChatId>,
    /// Geloeschte Einmal-Eintraege
    pub geloescht: usize,
}

pub struct ImportService<R: RecordStore> {
    ctx: E2eeContext<R>,
    zustand: Mutex<ImportZustand>,
}

impl<R: RecordStore> ImportService<R> {
    pub fn neu(ctx: E2eeContext<R>) -> Arc<Self> {
        Arc::new(Self {
            ctx,
            zustand: Mutex::new(ImportZustand::Idle),
        })
    }

    /// Aktueller Zustand des letzten Keystore-Imports
    pub fn zustand(&self) -> ImportZustand {
        self.zustand.lock().clone()
    }

    fn zustand_setzen(&self, zustand: ImportZustand) {
        tracing::trace!(?zustand, "Import-Zustand");
        *self.zustand.lock() = zustand;
    }

    /// Importiert einen privaten Schluessel aus JWK-Text
    ///
    /// Der Text wird geprueft, als `privateKey` abgelegt und anschliessend
    /// erneut geladen.
    pub fn import_text(&self, text: &str) -> E2eeResult<IdentityKeyPair> {
        let text = text.trim();
        if text.is_empty() {
            return Err(E2eeError::UngueltigeEingabe(
                "Schluessel-Text ist leer".into(),
            ));
        }
        IdentityKeyPair::from_private_jwk(text)?;

        self.ctx.cache.speichern(&CacheSchluessel::PrivateKey, text)?;
        let identity = self
            .ctx
            .identitaet_laden()?
            .ok_or(CryptoError::KeinPrivaterSchluessel)?;

        tracing::info!("Privater Schluessel aus Text importiert");
        Ok(identity)
    }

    /// Importiert einen privaten Schluessel aus einer JWK-Datei
    pub async fn import_file(&self, pfad: &Path) -> E2eeResult<IdentityKeyPair> {
        let text = tokio::fs::read_to_string(pfad).await?;
        tracing::debug!(pfad = %pfad.display(), "Schluessel-Datei gelesen");
        self.import_text(&text)
    }

    /// Stellt alle Schluessel aus dem passwortgeschuetzten Keystore wieder her
    pub async fn import_keystore(&self, password: &str) -> E2eeResult<ImportBericht> {
        match self.keystore_importieren(password).await {
            Ok(bericht) => {
                self.zustand_setzen(ImportZustand::Committed {
                    anzahl: bericht.importiert,
                });
                Ok(bericht)
            }
            Err(e) => {
                self.zustand_setzen(ImportZustand::Aborted);
                if e.ist_passwortfehler() {
                    tracing::warn!("Keystore-Import abgebrochen: falsches Passwort");
                } else {
                    tracing::warn!(fehler = %e, "Keystore-Import abgebrochen");
                }
                Err(e)
            }
        }
    }

    async fn keystore_importieren(&self, password: &str) -> E2eeResult<ImportBericht> {
        self.zustand_setzen(ImportZustand::Fetching);
        let records = self
            .ctx
            .records
            .get_list(collections::KEYSTORE, &Filter::new())
            .await?
            .iter()
            .map(|r| r.parse::<KeystoreRecord>())
            .collect::<Result<Vec<_>, _>>()?;

        if records.is_empty() {
            return Err(E2eeError::KeystoreLeer);
        }
        let salt = records
            .iter()
            .find(|r| r.kind == KeystoreEntryKind::Salt.as_str())
            .map(|r| r.iv.clone())
            .ok_or(E2eeError::KeystoreSaltFehlt)?;
        let eintraege: Vec<&KeystoreRecord> = records
            .iter()
            .filter(|r| r.kind != KeystoreEntryKind::Salt.as_str())
            .collect();
        if eintraege.is_empty() {
            return Err(E2eeError::KeystoreLeer);
        }

        self.zustand_setzen(ImportZustand::Deriving);
        let password = password.to_string();
        let iterations = self.ctx.params.pbkdf2_iterations;
        let key = self
            .ctx
            .blockierend(move |backend| {
                Ok(derive_keystore_key(backend, &password, &salt, iterations))
            })
            .await?;

        let gesamt = eintraege.len();
        let mut neue = Vec::with_capacity(gesamt);
        let mut bericht = ImportBericht::default();

        for (fertig, record) in eintraege.into_iter().enumerate() {
            self.zustand_setzen(ImportZustand::Decrypting { fertig, gesamt });

            let kind = KeystoreEntryKind::parse(&record.kind).ok_or_else(|| {
                CryptoError::format(format!("Unbekannter Keystore-Typ '{}'", record.kind))
            })?;
            let schluessel = match kind {
                KeystoreEntryKind::PrivateKey => CacheSchluessel::PrivateKey,
                KeystoreEntryKind::ChatKey if id_gueltig(&record.related_chat) => {
                    CacheSchluessel::Chat(ChatId::new(record.related_chat.clone()))
                }
                _ => {
                    return Err(CryptoError::format(format!(
                        "Keystore-Eintrag {} ohne gueltigen Chat ('{}')",
                        record.id, record.related_chat
                    ))
                    .into())
                }
            };

            let entry_key = key.clone();
            let sealed = record.key.clone();
            let iv = record.iv.clone();
            let text = self
                .ctx
                .blockierend(move |backend| open_entry(backend, &entry_key, &sealed, &iv))
                .await?;

            match &schluessel {
                CacheSchluessel::PrivateKey => {
                    IdentityKeyPair::from_private_jwk(&text)?;
                    bericht.private_key = true;
                }
                CacheSchluessel::Chat(chat_id) => {
                    ChatKey::from_jwk_text(&text)?;
                    bericht.chats.push(chat_id.clone());
                }
            }
            neue.push((schluessel, text));
        }

        self.ctx.cache.alle_speichern(&neue)?;
        bericht.importiert = neue.len();
        tracing::info!(
            anzahl = bericht.importiert,
            private_key = bericht.private_key,
            "Keystore importiert"
        );

        let einmalig: Vec<String> = records
            .iter()
            .filter(|r| r.one_time)
            .map(|r| r.id.clone())
            .collect();
        if !einmalig.is_empty() {
            match self
                .ctx
                .records
                .batch_delete(collections::KEYSTORE, &einmalig)
                .await
            {
                Ok(()) => bericht.geloescht = einmalig.len(),
                Err(e) => tracing::warn!(
                    fehler = %e,
                    anzahl = einmalig.len(),
                    "Einmal-Eintraege konnten nicht geloescht werden"
                ),
            }
        }

        Ok(bericht)
    }

    /// Versiegelt alle Schluessel des lokalen Caches im Keystore
    ///
    /// Vorhandene Keystore-Eintraege werden ersetzt. Gibt die Anzahl der
    /// versiegelten Schluessel zurueck (ohne Salz-Eintrag).
    pub async fn seal_keystore(&self, password: &str, one_time: bool) -> E2eeResult<usize> {
        if password.is_empty() {
            return Err(E2eeError::UngueltigeEingabe(
                "Keystore-Passwort darf nicht leer sein".into(),
            ));
        }
        let eintraege = self.ctx.cache.eintraege()?;
        if eintraege.is_empty() {
            return Err(E2eeError::UngueltigeEingabe(
                "Keine Schluessel im lokalen Cache".into(),
            ));
        }

        let alte: Vec<String> = self
            .ctx
            .records
            .get_list(collections::KEYSTORE, &Filter::new())
            .await?
            .into_iter()
            .map(|r| r.id)
            .collect();

        let password = password.to_string();
        let iterations = self.ctx.params.pbkdf2_iterations;
        let (salt, versiegelt) = self
            .ctx
            .blockierend(move |backend| {
                let salt = generate_salt(backend);
                let key = derive_keystore_key(backend, &password, &salt, iterations);
                let versiegelt = eintraege
                    .into_iter()
                    .map(|(schluessel, text)| -> CryptoResult<_> {
                        Ok((schluessel, seal_entry(backend, &key, &text)?))
                    })
                    .collect::<CryptoResult<Vec<_>>>()?;
                Ok((salt, versiegelt))
            })
            .await?;

        let mut records = Vec::with_capacity(versiegelt.len() + 1);
        records.push(KeystoreRecord {
            id: String::new(),
            kind: KeystoreEntryKind::Salt.as_str().to_string(),
            iv: salt,
            key: String::new(),
            related_chat: String::new(),
            one_time,
        });
        let anzahl = versiegelt.len();
        for (schluessel, sealed) in versiegelt {
            let (kind, related_chat) = match schluessel {
                CacheSchluessel::PrivateKey => (KeystoreEntryKind::PrivateKey, String::new()),
                CacheSchluessel::Chat(chat_id) => (KeystoreEntryKind::ChatKey, chat_id.0),
            };
            records.push(KeystoreRecord {
                id: String::new(),
                kind: kind.as_str().to_string(),
                iv: sealed.nonce.bytes.to_vec(),
                key: sealed.key_b64,
                related_chat,
                one_time,
            });
        }

        // Erst vollstaendig anlegen, dann den alten Bestand entfernen
        let mut neue = Vec::with_capacity(records.len());
        for record in &records {
            let angelegt = match RecordBody::aus(record) {
                Ok(body) => self.ctx.records.create(collections::KEYSTORE, body).await,
                Err(e) => Err(e),
            };
            match angelegt {
                Ok(angelegt) => neue.push(angelegt.id),
                Err(e) => {
                    self.neue_verwerfen(&neue).await;
                    return Err(e.into());
                }
            }
        }

        if !alte.is_empty() {
            if let Err(e) = self
                .ctx
                .records
                .batch_delete(collections::KEYSTORE, &alte)
                .await
            {
                self.neue_verwerfen(&neue).await;
                return Err(e.into());
            }
            tracing::debug!(anzahl = alte.len(), "Alte Keystore-Eintraege entfernt");
        }

        tracing::info!(anzahl, one_time, "Keystore versiegelt");
        Ok(anzahl)
    }

    /// Entfernt teilweise angelegte Eintraege; der alte Bestand bleibt gueltig
    async fn neue_verwerfen(&self, ids: &[String]) {
        if ids.is_empty() {
            return;
        }
        if let Err(e) = self.ctx.records.batch_delete(collections::KEYSTORE, ids).await {
            tracing::warn!(
                fehler = %e,
                anzahl = ids.len(),
                "Teilweise versiegelte Eintraege konnten nicht entfernt werden"
            );
        }
    }
}
