//! E2E Verschluesselung (End-to-End)
//!
//! Client <-> Client Verschluesselung. Der Server speichert nur Ciphertexte
//! und eingewickelte Schluessel.
//!
//! ## Ablauf
//! 1. Jeder Client hat ein `IdentityKeyPair` (RSA-OAEP Langzeit-Key)
//! 2. Beim Erstellen eines Chats: neuer AES-256-GCM Chat-Schluessel
//! 3. Chat-Schluessel wird pro Mitglied mit dessen oeffentlichem Schluessel eingewickelt
//! 4. Text und Anhaenge werden mit dem Chat-Schluessel verschluesselt
//! 5. Bei Join: Schluessel nur fuer das neue Mitglied einwickeln (keine Rotation)

pub mod chat_key;
pub mod decrypt;
pub mod encrypt;

pub use chat_key::{
    generate_chat_key, unwrap_chat_key, unwrap_chat_key_text, wrap_chat_key_for_recipient,
    ChatKey,
};
pub use decrypt::{decrypt_attachment, decrypt_text};
pub use encrypt::{
    encrypt_attachment, encrypt_text, encrypted_file_name, original_file_name,
    EncryptedAttachment, EncryptedText, ENCRYPTED_FILE_SUFFIX,
};
