//! # litechat-crypto
//!
//! E2E Verschluesselung fuer LiteChat.
//!
//! ## Module
//! - `backend` - Capability-Interface fuer kryptografische Primitiven
//! - `codec` - Base64 und Nonce-Container
//! - `e2e` - Chat-Schluessel, Text- und Anhang-Verschluesselung
//! - `identity` - RSA-OAEP Langzeit-Identitaetsschluessel
//! - `jwk` - JSON Web Key Serialisierung
//! - `keystore` - Passwortgeschuetzte Schluessel-Eintraege (PBKDF2)
//! - `pem` - PKCS#8/SPKI/Raw PEM-Export
//! - `types` - Gemeinsame Typen (Nonce, SecretBytes, KeyParameters)
//! - `error` - Fehlertypen

pub mod backend;
pub mod codec;
pub mod e2e;
pub mod error;
pub mod identity;
pub mod jwk;
pub mod keystore;
pub mod pem;
pub mod types;

// Bequeme Re-Exports
pub use backend::{CryptoBackend, RustCryptoBackend};
pub use codec::{base64_decode, base64_encode, parse_nonce_container, NonceContainer, ParsedNonces};
pub use error::{CryptoError, CryptoResult};
pub use identity::{parse_public_key, IdentityKeyPair, IdentityKeyTexts};
pub use jwk::Jwk;
pub use keystore::{KeystoreEntryKind, KeystoreKey, SealedEntry};
pub use types::{KeyParameters, Nonce, SecretBytes};

pub use e2e::{
    decrypt_attachment, decrypt_text, encrypt_attachment, encrypt_text, encrypted_file_name,
    generate_chat_key, original_file_name, unwrap_chat_key, unwrap_chat_key_text,
    wrap_chat_key_for_recipient, ChatKey, EncryptedAttachment, EncryptedText,
    ENCRYPTED_FILE_SUFFIX,
};
