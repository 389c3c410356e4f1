//! ExportService – Schluessel und Daten portabel exportieren
//!
//! ## Archiv-Aufbau (ZIP)
//! ```text
//! data.json                  Chats, Kontakte, Nachrichten, Schluessel-Index
//! keys/privateKey.{json|pem} PKCS#8 im PEM-Format
//! keys/chat_<id>.{json|pem}  Rohe 32 Bytes im PEM-Format
//! keys/public_<id>.{json|pem} SPKI im PEM-Format
//! ```

use std::collections::BTreeSet;
use std::io::{Cursor, Write};
use std::path::{Component, Path};
use std::sync::Arc;

use chrono::Utc;
use litechat_core::{id_gueltig, CacheSchluessel, ChatId, UserId};
use litechat_crypto::pem::{chat_key_pem, private_key_pem, public_key_pem};
use litechat_crypto::{
    decrypt_text, parse_public_key, ChatKey, CryptoError, IdentityKeyPair, NonceContainer,
};
use litechat_records::{collections, Filter, RecordStore};
use serde::Serialize;
use serde_json::{json, Value};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::context::E2eeContext;
use crate::error::{E2eeError, E2eeResult};
use crate::types::{ChatRecord, MessageRecord, UserProfile};

/// Name des Daten-Dokuments im Archiv
pub const DATA_DATEI: &str = "data.json";

const SCHLUESSEL_ORDNER: &str = "keys";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    /// JWK-Text unveraendert
    #[default]
    Jwk,
    /// PKCS#8, SPKI und rohe Bytes im PEM-Format
    Pem,
}

impl ExportFormat {
    fn endung(&self) -> &'static str {
        match self {
            Self::Jwk => "json",
            Self::Pem => "pem",
        }
    }
}

impl std::str::FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "jwk" | "json" => Ok(Self::Jwk),
            "pem" => Ok(Self::Pem),
            other => Err(format!("Unbekanntes Export-Format '{other}' (jwk|pem)")),
        }
    }
}

/// Was exportiert wird
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportOptionen {
    pub format: ExportFormat,
    pub chats: bool,
    /// Profile der Chat-Partner (inkl. oeffentlicher Schluessel)
    pub related_people: bool,
    pub nachrichten: bool,
    /// Nachrichten mit lokal vorhandenem Schluessel im Klartext exportieren
    pub entschluesselt: bool,
    pub schluessel: bool,
}

impl Default for ExportOptionen {
    fn default() -> Self {
        Self {
            format: ExportFormat::Jwk,
            chats: true,
            related_people: false,
            nachrichten: true,
            entschluesselt: false,
            schluessel: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportDatei {
    /// Relativer Pfad im Archiv
    pub name: String,
    pub inhalt: Vec<u8>,
}

/// Ergebnis eines Exports
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportArchiv {
    pub dateien: Vec<ExportDatei>,
}

impl ExportArchiv {
    pub fn datei(&self, name: &str) -> Option<&ExportDatei> {
        self.dateien.iter().find(|d| d.name == name)
    }

    /// Das Daten-Dokument als JSON
    pub fn daten(&self) -> E2eeResult<Value> {
        match self.datei(DATA_DATEI) {
            Some(datei) => Ok(serde_json::from_slice(&datei.inhalt)?),
            None => Ok(Value::Null),
        }
    }

    /// Packt alle Dateien in ein ZIP-Archiv
    ///
    /// Namen muessen relative Pfade ohne `..` sein.
    pub fn zip_bytes(&self) -> E2eeResult<Vec<u8>> {
        let optionen = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .unix_permissions(0o600);
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        for datei in &self.dateien {
            if !archiv_pfad_gueltig(&datei.name) {
                return Err(E2eeError::UngueltigeEingabe(format!(
                    "Ungueltiger Archiv-Pfad '{}'",
                    datei.name
                )));
            }
            zip.start_file(datei.name.as_str(), optionen)?;
            zip.write_all(&datei.inhalt)?;
        }
        Ok(zip.finish()?.into_inner())
    }

    /// Schreibt das Archiv als ZIP-Datei nach `ziel`
    pub async fn schreiben(&self, ziel: &Path) -> E2eeResult<()> {
        let bytes = self.zip_bytes()?;
        if let Some(parent) = ziel.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(ziel, &bytes).await?;
        tracing::info!(
            ziel = %ziel.display(),
            dateien = self.dateien.len(),
            bytes = bytes.len(),
            "Export geschrieben"
        );
        Ok(())
    }
}

fn archiv_pfad_gueltig(name: &str) -> bool {
    !name.is_empty()
        && !name.contains('\\')
        && Path::new(name)
            .components()
            .all(|c| matches!(c, Component::Normal(_)))
}

#[derive(Debug, Serialize)]
struct SchluesselIndex {
    kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    chat: Option<ChatId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    user: Option<UserId>,
    file: String,
    sha256: String,
}

pub struct ExportService<R: RecordStore> {
    ctx: E2eeContext<R>,
}

impl<R: RecordStore> ExportService<R> {
    pub fn neu(ctx: E2eeContext<R>) -> Arc<Self> {
        Arc::new(Self { ctx })
    }

    /// JWK-Text des eigenen privaten Schluessels
    pub fn export_private_key(&self) -> E2eeResult<String> {
        let text = self
            .ctx
            .cache
            .laden(&CacheSchluessel::PrivateKey)?
            .ok_or(CryptoError::KeinPrivaterSchluessel)?;
        tracing::info!("Privater Schluessel exportiert");
        Ok(text)
    }

    /// Erstellt das Export-Archiv fuer `user`
    pub async fn export(&self, user: &UserId, optionen: &ExportOptionen) -> E2eeResult<ExportArchiv> {
        let chats: Vec<ChatRecord> = self
            .ctx
            .records
            .get_list(
                collections::CHATS,
                &Filter::new().enthaelt("members", user.as_str()),
            )
            .await?
            .iter()
            .map(|r| r.parse::<ChatRecord>())
            .collect::<Result<_, _>>()?;

        let mut kontakte = Vec::new();
        if optionen.related_people {
            let ids: BTreeSet<&UserId> = chats
                .iter()
                .flat_map(|c| c.members.iter())
                .filter(|m| *m != user)
                .collect();
            for id in ids {
                let profil: UserProfile = self
                    .ctx
                    .records
                    .get_one(collections::USERS, id.as_str())
                    .await?
                    .parse()?;
                kontakte.push(profil);
            }
        }

        let mut nachrichten = Vec::new();
        if optionen.nachrichten {
            for chat in &chats {
                nachrichten.extend(self.nachrichten_exportieren(chat, optionen.entschluesselt).await?);
            }
        }

        let mut archiv = ExportArchiv::default();
        let mut index = Vec::new();
        if optionen.schluessel {
            self.schluessel_exportieren(optionen, &kontakte, &mut archiv, &mut index)?;
        }

        let mut daten = serde_json::Map::new();
        daten.insert("exported".into(), json!(Utc::now()));
        daten.insert("user".into(), json!(user));
        daten.insert("format".into(), json!(optionen.format));
        if optionen.chats {
            daten.insert("chats".into(), serde_json::to_value(&chats)?);
        }
        if optionen.related_people {
            daten.insert("relatedPeople".into(), serde_json::to_value(&kontakte)?);
        }
        if optionen.nachrichten {
            daten.insert("messages".into(), Value::Array(nachrichten));
        }
        if optionen.schluessel {
            daten.insert("keys".into(), serde_json::to_value(&index)?);
        }

        archiv.dateien.insert(
            0,
            ExportDatei {
                name: DATA_DATEI.to_string(),
                inhalt: serde_json::to_vec_pretty(&Value::Object(daten))?,
            },
        );

        tracing::info!(
            user_id = %user,
            chats = chats.len(),
            dateien = archiv.dateien.len(),
            "Export erstellt"
        );
        Ok(archiv)
    }

    async fn nachrichten_exportieren(
        &self,
        chat: &ChatRecord,
        entschluesselt: bool,
    ) -> E2eeResult<Vec<Value>> {
        let records = self
            .ctx
            .records
            .get_list(
                collections::MESSAGES,
                &Filter::new().gleich("chat", chat.id.as_str()),
            )
            .await?;

        let key = if entschluesselt {
            self.ctx.chat_key_laden(&chat.chat_id())?
        } else {
            None
        };

        let mut ausgabe = Vec::with_capacity(records.len());
        for record in &records {
            let nachricht: MessageRecord = record.parse()?;
            let klartext = key
                .as_ref()
                .and_then(|key| self.klartext(&nachricht, key));
            ausgabe.push(match klartext {
                Some(text) => json!({
                    "id": nachricht.id,
                    "chat": nachricht.chat,
                    "sender": nachricht.sender,
                    "text": text,
                    "attachments": nachricht.attachments,
                    "created": nachricht.created,
                    "updated": nachricht.updated,
                }),
                None => serde_json::to_value(&nachricht)?,
            });
        }
        Ok(ausgabe)
    }

    fn klartext(&self, nachricht: &MessageRecord, key: &ChatKey) -> Option<String> {
        let ergebnis = NonceContainer::parse(&nachricht.iv_text()).and_then(|container| {
            decrypt_text(
                self.ctx.backend.as_ref(),
                &nachricht.content,
                container.message_nonce(),
                key,
            )
        });
        match ergebnis {
            Ok(text) => Some(text),
            Err(e) => {
                tracing::warn!(message_id = %nachricht.id, fehler = %e, "Nachricht verschluesselt exportiert");
                None
            }
        }
    }

    fn schluessel_exportieren(
        &self,
        optionen: &ExportOptionen,
        kontakte: &[UserProfile],
        archiv: &mut ExportArchiv,
        index: &mut Vec<SchluesselIndex>,
    ) -> E2eeResult<()> {
        let endung = optionen.format.endung();

        for (schluessel, text) in self.ctx.cache.eintraege()? {
            let (kind, chat, inhalt) = match &schluessel {
                CacheSchluessel::PrivateKey => {
                    let inhalt = match optionen.format {
                        ExportFormat::Jwk => text,
                        ExportFormat::Pem => {
                            let identity = IdentityKeyPair::from_private_jwk(&text)?;
                            private_key_pem(identity.private_key())?
                        }
                    };
                    ("privateKey", None, inhalt)
                }
                CacheSchluessel::Chat(chat_id) => {
                    let inhalt = match optionen.format {
                        ExportFormat::Jwk => text,
                        ExportFormat::Pem => chat_key_pem(&ChatKey::from_jwk_text(&text)?)?,
                    };
                    ("chatKey", Some(chat_id.clone()), inhalt)
                }
            };
            let name = format!("{SCHLUESSEL_ORDNER}/{}.{endung}", schluessel.eintrag());
            self.datei_hinzufuegen(archiv, index, kind, chat, None, name, inhalt);
        }

        if optionen.related_people {
            for kontakt in kontakte.iter().filter(|k| !k.public_key.trim().is_empty()) {
                if !id_gueltig(&kontakt.id) {
                    tracing::warn!(user_id = %kontakt.id, "Kontakt-ID nicht als Dateiname verwendbar, uebersprungen");
                    continue;
                }
                let inhalt = match optionen.format {
                    ExportFormat::Jwk => kontakt.public_key.clone(),
                    ExportFormat::Pem => public_key_pem(&parse_public_key(&kontakt.public_key)?)?,
                };
                let name = format!("{SCHLUESSEL_ORDNER}/public_{}.{endung}", kontakt.id);
                self.datei_hinzufuegen(
                    archiv,
                    index,
                    "publicKey",
                    None,
                    Some(UserId::new(kontakt.id.clone())),
                    name,
                    inhalt,
                );
            }
        }
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn datei_hinzufuegen(
        &self,
        archiv: &mut ExportArchiv,
        index: &mut Vec<SchluesselIndex>,
        kind: &'static str,
        chat: Option<ChatId>,
        user: Option<UserId>,
        name: String,
        inhalt: String,
    ) {
        let sha256 = hex::encode(self.ctx.backend.digest_sha256(inhalt.as_bytes()));
        tracing::debug!(datei = %name, kind, "Schluessel exportiert");
        index.push(SchluesselIndex {
            kind,
            chat,
            user,
            file: name.clone(),
            sha256,
        });
        archiv.dateien.push(ExportDatei {
            name,
            inhalt: inhalt.into_bytes(),
        });
    }
}
