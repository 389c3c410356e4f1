//! MessageService – Nachrichten und Anhaenge ver- und entschluesseln
//!
//! ## Umschlag einer Nachricht
//! ```text
//! content:     Base64(AES-GCM(text))
//! iv:          "{\"message\":[..12..],\"foto.png\":[..12..]}"   (JSON-Text)
//! attachments: ["foto.png.encrypted"]
//! ```
//! Jede Einheit (Text, jeder Anhang) hat eine eigene Nonce. Anhang-Nonces
//! sind nach dem Original-Dateinamen abgelegt.

use std::collections::HashSet;
use std::sync::Arc;

use futures_util::future::try_join_all;
use litechat_core::{ChatId, UserId};
use litechat_crypto::codec::MESSAGE_FIELD;
use litechat_crypto::{
    decrypt_attachment, decrypt_text, encrypt_attachment, encrypt_text, encrypted_file_name,
    original_file_name, ChatKey, CryptoBackend, CryptoError, CryptoResult, NonceContainer,
};
use litechat_records::{collections, Filter, RecordAction, RecordBody, RecordEvent, RecordStore};
use tokio::sync::broadcast;

use crate::context::E2eeContext;
use crate::error::{E2eeError, E2eeResult};
use crate::types::{DecryptedAttachment, DecryptedMessage, MessageRecord, MessageUpdate, OutgoingAttachment};

/// Ergebnis von [`MessageService::load_history`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageHistory {
    /// Lesbare Nachrichten, aelteste zuerst
    pub nachrichten: Vec<DecryptedMessage>,
    /// IDs der Nachrichten, die nicht entschluesselt werden konnten
    pub unlesbar: Vec<String>,
}

/// MessageService verschluesselt ausgehende und entschluesselt eingehende Nachrichten
///
/// Jeder Aufruf bekommt den bereits aufgeloesten Chat-Schluessel; ohne
/// Schluessel wird nichts gesendet oder angezeigt.
pub struct MessageService<R: RecordStore> {
    ctx: E2eeContext<R>,
}

impl<R: RecordStore> MessageService<R> {
    pub fn neu(ctx: E2eeContext<R>) -> Arc<Self> {
        Arc::new(Self { ctx })
    }

    /// Verschluesselt Text und Anhaenge und legt die Nachricht an
    ///
    /// Anhaenge werden parallel verschluesselt; angelegt wird erst, wenn
    /// alle fertig sind.
    pub async fn send(
        &self,
        sender: &UserId,
        chat_id: &ChatId,
        text: &str,
        attachments: Vec<OutgoingAttachment>,
        key: &ChatKey,
    ) -> E2eeResult<MessageRecord> {
        if text.trim().is_empty() && attachments.is_empty() {
            return Err(E2eeError::UngueltigeEingabe(
                "Nachricht darf nicht leer sein".into(),
            ));
        }
        anhang_namen_pruefen(&attachments)?;

        let text_key = key.clone();
        let klartext = text.to_string();
        let verschluesselt_text = self
            .ctx
            .blockierend(move |backend| encrypt_text(backend, &klartext, &text_key));

        let anhaenge = try_join_all(attachments.into_iter().map(|anhang| {
            let key = key.clone();
            self.ctx.blockierend(move |backend| {
                let verschluesselt = encrypt_attachment(backend, &anhang.bytes, &key)?;
                Ok((anhang.name, verschluesselt))
            })
        }));

        let (verschluesselt_text, anhaenge) = tokio::try_join!(verschluesselt_text, anhaenge)?;

        let mut container = NonceContainer::new(verschluesselt_text.nonce);
        let mut body = RecordBody::new()
            .feld("chat", chat_id.as_str())
            .feld("sender", sender.as_str())
            .feld("content", verschluesselt_text.ciphertext_b64);
        for (name, anhang) in anhaenge {
            container = container.mit_anhang(name.clone(), anhang.nonce);
            body = body.datei("attachments", encrypted_file_name(&name), anhang.cipher_bytes);
        }
        let body = body.feld("iv", container.to_json());

        let record: MessageRecord = self
            .ctx
            .records
            .create(collections::MESSAGES, body)
            .await?
            .parse()?;

        tracing::debug!(
            chat_id = %chat_id,
            message_id = %record.id,
            anhaenge = record.attachments.len(),
            "Nachricht gesendet"
        );
        Ok(record)
    }

    /// Ersetzt den Text einer Nachricht; Anhaenge und deren Nonces bleiben
    ///
    /// Der neue Text bekommt eine frische Nonce. Ein Legacy-Container wird
    /// dabei ins aktuelle Format ueberfuehrt.
    pub async fn edit(
        &self,
        message_id: &str,
        new_text: &str,
        key: &ChatKey,
    ) -> E2eeResult<MessageRecord> {
        if new_text.trim().is_empty() {
            return Err(E2eeError::UngueltigeEingabe(
                "Nachricht darf nicht leer sein".into(),
            ));
        }

        let alt: MessageRecord = self
            .ctx
            .records
            .get_one(collections::MESSAGES, message_id)
            .await?
            .parse()?;
        let alter_container = NonceContainer::parse(&alt.iv_text())?;
        let war_legacy = alter_container.ist_legacy();

        let key = key.clone();
        let klartext = new_text.to_string();
        let verschluesselt = self
            .ctx
            .blockierend(move |backend| encrypt_text(backend, &klartext, &key))
            .await?;

        let mut container = NonceContainer::new(verschluesselt.nonce);
        for (name, nonce) in alter_container.into_parsed().attachment_nonces {
            container = container.mit_anhang(name, nonce);
        }

        let record: MessageRecord = self
            .ctx
            .records
            .update(
                collections::MESSAGES,
                message_id,
                RecordBody::new()
                    .feld("content", verschluesselt.ciphertext_b64)
                    .feld("iv", container.to_json()),
            )
            .await?
            .parse()?;

        tracing::debug!(message_id, migriert = war_legacy, "Nachricht bearbeitet");
        Ok(record)
    }

    /// Laedt und entschluesselt die letzten `limit` Nachrichten eines Chats
    ///
    /// Nicht entschluesselbare Nachrichten brechen das Laden nicht ab, sie
    /// werden in [`MessageHistory::unlesbar`] gemeldet.
    pub async fn load_history(
        &self,
        chat_id: &ChatId,
        key: &ChatKey,
        limit: Option<usize>,
    ) -> E2eeResult<MessageHistory> {
        let records = self
            .ctx
            .records
            .get_list(
                collections::MESSAGES,
                &Filter::new().gleich("chat", chat_id.as_str()),
            )
            .await?;

        let mut history = MessageHistory::default();
        let mut nachrichten = Vec::with_capacity(records.len());
        for record in &records {
            match record.parse::<MessageRecord>() {
                Ok(nachricht) => nachrichten.push(nachricht),
                Err(e) => {
                    tracing::warn!(chat_id = %chat_id, message_id = %record.id, fehler = %e, "Nachricht nicht lesbar");
                    history.unlesbar.push(record.id.clone());
                }
            }
        }
        nachrichten.sort_by_key(|m| m.created);
        if let Some(limit) = limit {
            let start = nachrichten.len().saturating_sub(limit);
            nachrichten.drain(..start);
        }

        let key = key.clone();
        let ergebnisse = self
            .ctx
            .blockierend(move |backend| {
                Ok(nachrichten
                    .into_iter()
                    .map(|record| {
                        let id = record.id.clone();
                        (id, nachricht_entschluesseln(backend, &record, &key))
                    })
                    .collect::<Vec<_>>())
            })
            .await?;

        for (id, ergebnis) in ergebnisse {
            match ergebnis {
                Ok(nachricht) => history.nachrichten.push(nachricht),
                Err(e) => {
                    tracing::warn!(chat_id = %chat_id, message_id = %id, fehler = %e, "Nachricht nicht lesbar");
                    history.unlesbar.push(id);
                }
            }
        }

        tracing::debug!(
            chat_id = %chat_id,
            anzahl = history.nachrichten.len(),
            unlesbar = history.unlesbar.len(),
            "History geladen"
        );
        Ok(history)
    }

    /// Entschluesselt den Text einer einzelnen Nachricht
    pub async fn decrypt_message(
        &self,
        record: &MessageRecord,
        key: &ChatKey,
    ) -> E2eeResult<DecryptedMessage> {
        let record = record.clone();
        let key = key.clone();
        self.ctx
            .blockierend(move |backend| nachricht_entschluesseln(backend, &record, &key))
            .await
    }

    /// Laedt einen Anhang ueber die Datei-URL und entschluesselt ihn
    ///
    /// `stored_name` ist der gespeicherte Name (`<name>.encrypted`).
    pub async fn download_attachment(
        &self,
        message_id: &str,
        stored_name: &str,
        key: &ChatKey,
    ) -> E2eeResult<DecryptedAttachment> {
        let record = self
            .ctx
            .records
            .get_one(collections::MESSAGES, message_id)
            .await?;
        if !record
            .text_liste("attachments")
            .iter()
            .any(|name| name == stored_name)
        {
            return Err(E2eeError::UngueltigeEingabe(format!(
                "Nachricht {message_id} hat keinen Anhang '{stored_name}'"
            )));
        }

        let nachricht: MessageRecord = record.parse()?;
        let container = NonceContainer::parse(&nachricht.iv_text())?;
        let original = original_file_name(stored_name).unwrap_or(stored_name);
        let nonce = *container
            .attachment_nonce(original)
            .or_else(|| container.attachment_nonce(stored_name))
            .ok_or_else(|| {
                CryptoError::format(format!("Keine Nonce fuer Anhang '{original}'"))
            })?;

        let url = self.ctx.records.file_url(&record, stored_name);
        let cipher_bytes = self.ctx.records.download(&url).await?;

        let key = key.clone();
        let bytes = self
            .ctx
            .blockierend(move |backend| decrypt_attachment(backend, &cipher_bytes, &nonce, &key))
            .await?;

        tracing::debug!(message_id, datei = %original, bytes = bytes.len(), "Anhang entschluesselt");
        Ok(DecryptedAttachment {
            name: original.to_string(),
            bytes,
        })
    }

    /// Abonniert Realtime-Events der Nachrichten-Collection
    pub fn subscribe(&self) -> broadcast::Receiver<RecordEvent> {
        self.ctx.records.subscribe(collections::MESSAGES)
    }

    /// Wandelt ein Realtime-Event in eine entschluesselte Aenderung um
    ///
    /// Events anderer Chats ergeben `None`.
    pub async fn decrypt_event(
        &self,
        chat_id: &ChatId,
        event: &RecordEvent,
        key: &ChatKey,
    ) -> E2eeResult<Option<MessageUpdate>> {
        if event.record.text("chat") != chat_id.as_str() {
            return Ok(None);
        }

        let update = match event.action {
            RecordAction::Delete => MessageUpdate::Geloescht {
                id: event.record.id.clone(),
            },
            RecordAction::Create => {
                MessageUpdate::Neu(self.decrypt_message(&event.record.parse::<MessageRecord>()?, key).await?)
            }
            RecordAction::Update => {
                MessageUpdate::Geaendert(self.decrypt_message(&event.record.parse::<MessageRecord>()?, key).await?)
            }
        };
        Ok(Some(update))
    }
}

fn anhang_namen_pruefen(attachments: &[OutgoingAttachment]) -> E2eeResult<()> {
    let mut gesehen = HashSet::new();
    for anhang in attachments {
        let name = anhang.name.as_str();
        if name.trim().is_empty() || name == MESSAGE_FIELD || name.contains('/') {
            return Err(E2eeError::UngueltigeEingabe(format!(
                "Ungueltiger Dateiname '{name}'"
            )));
        }
        if !gesehen.insert(name) {
            return Err(E2eeError::UngueltigeEingabe(format!(
                "Dateiname '{name}' ist doppelt"
            )));
        }
    }
    Ok(())
}

fn nachricht_entschluesseln(
    backend: &dyn CryptoBackend,
    record: &MessageRecord,
    key: &ChatKey,
) -> CryptoResult<DecryptedMessage> {
    let container = NonceContainer::parse(&record.iv_text())?;
    let text = decrypt_text(backend, &record.content, container.message_nonce(), key)?;

    Ok(DecryptedMessage {
        id: record.id.clone(),
        chat: record.chat.clone(),
        sender: record.sender.clone(),
        text,
        attachments: record
            .attachments
            .iter()
            .map(|name| original_file_name(name).unwrap_or(name).to_string())
            .collect(),
        created: record.created,
        updated: record.updated,
    })
}
