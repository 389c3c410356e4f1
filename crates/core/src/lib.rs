//! litechat-core – Gemeinsame Typen
//!
//! Dieses Crate stellt die Bausteine bereit, die von allen anderen
//! LiteChat-Crates gemeinsam genutzt werden: Identifikatoren fuer Chats und
//! Benutzer sowie die Namen der lokalen Schluessel-Eintraege.

pub mod types;

// Re-Exporte fuer bequemen Zugriff
pub use types::{id_gueltig, ChatId, CacheSchluessel, UserId, PRIVATE_KEY_ENTRY};
