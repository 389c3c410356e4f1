//! litechat-e2ee – Ende-zu-Ende-Verschluesselung fuer LiteChat
//!
//! Dieses Crate implementiert:
//! - LocalKeyStore-Trait + MemoryKeyStore/FileKeyStore (lokaler Schluessel-Cache)
//! - IdentityService: Identitaetsschluessel erzeugen, laden, veroeffentlichen
//! - ChatKeyService: Chat-Schluessel verteilen und aufloesen
//! - MessageService: Nachrichten und Anhaenge ver- und entschluesseln
//! - ImportService / ExportService: Wiederherstellung und Datenexport
//!
//! # Beispiel
//!
//! ```no_run
//! use std::sync::Arc;
//! use litechat_core::{ChatId, UserId};
//! use litechat_e2ee::{ChatKeyService, E2eeContext, KeinBackupKey, MemoryKeyStore};
//! use litechat_records::MemoryRecordStore;
//!
//! #[tokio::main]
//! async fn main() {
//!     let records = Arc::new(MemoryRecordStore::new());
//!     let ctx = E2eeContext::neu(records, Arc::new(MemoryKeyStore::new()));
//!
//!     let keys = ChatKeyService::neu(ctx);
//!     let _ = keys
//!         .resolve_chat_key(&UserId::new("u1"), &ChatId::new("c1"), &KeinBackupKey)
//!         .await;
//! }
//! ```

pub mod context;
pub mod error;
pub mod export;
pub mod identity_service;
pub mod import;
pub mod key_service;
pub mod message_service;
pub mod storage;
pub mod types;

#[cfg(test)]
mod tests;

// Bequeme Re-Exporte
pub use context::E2eeContext;
pub use error::{E2eeError, E2eeResult};
pub use export::{ExportArchiv, ExportDatei, ExportFormat, ExportOptionen, ExportService, DATA_DATEI};
pub use identity_service::IdentityService;
pub use import::{ImportBericht, ImportService, ImportZustand};
pub use key_service::{BackupKeyPrompt, ChatKeyService, FesterBackupKey, KeinBackupKey, KeyResolution};
pub use message_service::{MessageHistory, MessageService};
pub use storage::{FileKeyStore, LocalKeyStore, MemoryKeyStore};
pub use types::{
    ChatRecord, DecryptedAttachment, DecryptedMessage, KeyExchangeRecord, KeystoreRecord,
    MessageRecord, MessageUpdate, OutgoingAttachment, UserProfile,
};
