//! ChatKeyService – Chat-Schluessel erzeugen, verteilen und aufloesen
//!
//! ## Aufloesung (`resolve_chat_key`)
//! 1. Lokaler Cache (kein Netzwerk)
//! 2. Ohne privaten Schluessel: `NeedsPrivateKeyImport`
//! 3. Key-Exchange-Record `(chat, receiver)` laden und auspacken
//! 4. Bei Fehler: manuell gesicherten Schluessel abfragen
//!
//! Parallele Aufrufe fuer denselben Chat koennen doppelt lesen; das
//! Zurueckschreiben in den Cache ist idempotent.

use std::sync::Arc;

use litechat_core::{CacheSchluessel, ChatId, UserId};
use litechat_crypto::{generate_chat_key, unwrap_chat_key_text, wrap_chat_key_for_recipient, ChatKey, CryptoError};
use litechat_records::{collections, Filter, RecordBody, RecordStore};

use crate::context::E2eeContext;
use crate::error::{E2eeError, E2eeResult};
use crate::identity_service::oeffentlichen_schluessel_laden;
use crate::types::{ChatRecord, KeyExchangeRecord};

/// Quelle fuer einen manuell gesicherten Chat-Schluessel (JWK-Text)
#[allow(async_fn_in_trait)]
pub trait BackupKeyPrompt: Send + Sync {
    /// `None` oder leerer Text bedeutet: abgelehnt
    async fn backup_key_abfragen(&self, chat_id: &ChatId) -> Option<String>;
}

/// Fragt nie nach (nicht-interaktive Umgebungen)
#[derive(Debug, Clone, Copy, Default)]
pub struct KeinBackupKey;

impl BackupKeyPrompt for KeinBackupKey {
    async fn backup_key_abfragen(&self, _chat_id: &ChatId) -> Option<String> {
        None
    }
}

/// Liefert immer denselben, vorab bekannten Schluessel
#[derive(Debug, Clone)]
pub struct FesterBackupKey(pub String);

impl BackupKeyPrompt for FesterBackupKey {
    async fn backup_key_abfragen(&self, _chat_id: &ChatId) -> Option<String> {
        Some(self.0.clone())
    }
}

/// Ergebnis von [`ChatKeyService::resolve_chat_key`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyResolution {
    Resolved(ChatKey),
    /// Kein privater Schluessel vorhanden, Aufrufer leitet zum Import
    NeedsPrivateKeyImport,
    /// Kein Schluessel verfuegbar, Chat bleibt in dieser Sitzung unlesbar
    Unavailable,
}

impl KeyResolution {
    pub fn schluessel(self) -> Option<ChatKey> {
        match self {
            Self::Resolved(key) => Some(key),
            _ => None,
        }
    }
}

/// ChatKeyService verwaltet die symmetrischen Schluessel der Chats
pub struct ChatKeyService<R: RecordStore> {
    ctx: E2eeContext<R>,
}

impl<R: RecordStore> ChatKeyService<R> {
    pub fn neu(ctx: E2eeContext<R>) -> Arc<Self> {
        Arc::new(Self { ctx })
    }

    /// Loest den Chat-Schluessel fuer `user` auf
    pub async fn resolve_chat_key<P: BackupKeyPrompt>(
        &self,
        user: &UserId,
        chat_id: &ChatId,
        prompt: &P,
    ) -> E2eeResult<KeyResolution> {
        if let Some(key) = self.ctx.chat_key_laden(chat_id)? {
            tracing::trace!(chat_id = %chat_id, "Chat-Schluessel aus Cache");
            return Ok(KeyResolution::Resolved(key));
        }

        let Some(identity) = self.ctx.identitaet_laden()? else {
            tracing::warn!(chat_id = %chat_id, "Kein privater Schluessel, Import erforderlich");
            return Ok(KeyResolution::NeedsPrivateKeyImport);
        };

        let text = match self.aus_key_exchange(user, chat_id, identity).await {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(
                    chat_id = %chat_id,
                    fehler = %e,
                    "Key-Exchange nicht verwendbar, frage nach Backup-Schluessel"
                );
                match prompt.backup_key_abfragen(chat_id).await {
                    Some(text) if !text.trim().is_empty() => text.trim().to_string(),
                    _ => {
                        tracing::warn!(chat_id = %chat_id, "Kein Backup-Schluessel angegeben");
                        return Ok(KeyResolution::Unavailable);
                    }
                }
            }
        };

        // Nur importierbare Schluessel landen im Cache
        let key = ChatKey::from_jwk_text(&text)?;
        self.ctx
            .cache
            .speichern(&CacheSchluessel::Chat(chat_id.clone()), &text)?;
        tracing::info!(chat_id = %chat_id, "Chat-Schluessel aufgeloest");
        Ok(KeyResolution::Resolved(key))
    }

    async fn aus_key_exchange(
        &self,
        user: &UserId,
        chat_id: &ChatId,
        identity: litechat_crypto::IdentityKeyPair,
    ) -> E2eeResult<String> {
        let filter = Filter::new()
            .gleich("chat", chat_id.as_str())
            .gleich("receiver", user.as_str());
        let exchange: KeyExchangeRecord = self
            .ctx
            .records
            .get_first_list_item(collections::KEY_EXCHANGES, &filter)
            .await?
            .parse()?;

        self.ctx
            .blockierend(move |backend| {
                unwrap_chat_key_text(backend, &exchange.key, identity.private_key())
            })
            .await
    }

    /// Legt einen Chat an und verteilt einen neuen Schluessel an alle Mitglieder
    ///
    /// Der Ersteller erhaelt den Schluessel nur lokal, jedes andere Mitglied
    /// einen Key-Exchange-Record. Alle oeffentlichen Schluessel werden vorab
    /// geladen, damit kein halb verteilter Chat entsteht.
    pub async fn create_chat(
        &self,
        creator: &UserId,
        members: &[UserId],
        name: &str,
    ) -> E2eeResult<(ChatRecord, ChatKey)> {
        let mut alle = vec![creator.clone()];
        for member in members {
            if !alle.contains(member) {
                alle.push(member.clone());
            }
        }
        if alle.len() < 2 {
            return Err(E2eeError::UngueltigeEingabe(
                "Ein Chat braucht mindestens ein weiteres Mitglied".into(),
            ));
        }

        let mut empfaenger = Vec::with_capacity(alle.len() - 1);
        for member in alle.iter().skip(1) {
            let public_key = oeffentlichen_schluessel_laden(&self.ctx, member).await?;
            empfaenger.push((member.clone(), public_key));
        }

        let chat: ChatRecord = self
            .ctx
            .records
            .create(
                collections::CHATS,
                RecordBody::aus(&ChatRecord {
                    id: String::new(),
                    name: name.to_string(),
                    members: alle,
                })?,
            )
            .await?
            .parse()?;
        let chat_id = chat.chat_id();

        let chat_key = generate_chat_key(self.ctx.backend.as_ref());
        self.ctx.cache.speichern(
            &CacheSchluessel::Chat(chat_id.clone()),
            &chat_key.to_jwk_text()?,
        )?;

        for (member, public_key) in empfaenger {
            self.key_exchange_anlegen(&chat_id, creator, &member, &chat_key, public_key)
                .await?;
        }

        tracing::info!(chat_id = %chat_id, mitglieder = chat.members.len(), "Chat angelegt");
        Ok((chat, chat_key))
    }

    /// Fuegt ein Mitglied hinzu und legt genau einen neuen Key-Exchange-Record an
    ///
    /// Bestehende Mitglieder muessen nichts neu verschluesseln.
    pub async fn add_member(
        &self,
        actor: &UserId,
        chat_id: &ChatId,
        new_member: &UserId,
    ) -> E2eeResult<KeyExchangeRecord> {
        let mut chat: ChatRecord = self
            .ctx
            .records
            .get_one(collections::CHATS, chat_id.as_str())
            .await?
            .parse()?;

        if chat.members.contains(new_member) {
            return Err(E2eeError::UngueltigeEingabe(format!(
                "{new_member} ist bereits Mitglied von {chat_id}"
            )));
        }

        let chat_key = self
            .ctx
            .chat_key_laden(chat_id)?
            .ok_or_else(|| CryptoError::KeinSchluessel {
                chat_id: chat_id.to_string(),
            })?;
        let public_key = oeffentlichen_schluessel_laden(&self.ctx, new_member).await?;

        let exchange = self
            .key_exchange_anlegen(chat_id, actor, new_member, &chat_key, public_key)
            .await?;

        chat.members.push(new_member.clone());
        self.ctx
            .records
            .update(
                collections::CHATS,
                chat_id.as_str(),
                RecordBody::new().feld("members", serde_json::to_value(&chat.members)?),
            )
            .await?;

        tracing::info!(chat_id = %chat_id, user_id = %new_member, "Mitglied hinzugefuegt");
        Ok(exchange)
    }

    /// Entfernt ein Mitglied; der Chat-Schluessel wird nicht rotiert
    ///
    /// Das entfernte Mitglied kann die bisherige History weiterhin lesen.
    pub async fn remove_member(&self, chat_id: &ChatId, member: &UserId) -> E2eeResult<()> {
        let mut chat: ChatRecord = self
            .ctx
            .records
            .get_one(collections::CHATS, chat_id.as_str())
            .await?
            .parse()?;

        let vorher = chat.members.len();
        chat.members.retain(|m| m != member);
        if chat.members.len() == vorher {
            return Err(E2eeError::UngueltigeEingabe(format!(
                "{member} ist kein Mitglied von {chat_id}"
            )));
        }

        self.ctx
            .records
            .update(
                collections::CHATS,
                chat_id.as_str(),
                RecordBody::new().feld("members", serde_json::to_value(&chat.members)?),
            )
            .await?;
        tracing::info!(chat_id = %chat_id, user_id = %member, "Mitglied entfernt (ohne Rotation)");
        Ok(())
    }

    async fn key_exchange_anlegen(
        &self,
        chat_id: &ChatId,
        sender: &UserId,
        receiver: &UserId,
        chat_key: &ChatKey,
        public_key_text: String,
    ) -> E2eeResult<KeyExchangeRecord> {
        let key = chat_key.clone();
        let wrapped = self
            .ctx
            .blockierend(move |backend| wrap_chat_key_for_recipient(backend, &key, &public_key_text))
            .await?;

        let record = KeyExchangeRecord {
            id: String::new(),
            chat: chat_id.clone(),
            sender: sender.clone(),
            receiver: receiver.clone(),
            key: wrapped,
        };
        let angelegt: KeyExchangeRecord = self
            .ctx
            .records
            .create(collections::KEY_EXCHANGES, RecordBody::aus(&record)?)
            .await?
            .parse()?;

        tracing::debug!(chat_id = %chat_id, receiver = %receiver, "Key-Exchange angelegt");
        Ok(angelegt)
    }
}
