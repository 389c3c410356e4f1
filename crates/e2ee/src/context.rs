//! Gemeinsame Abhaengigkeiten aller E2EE-Dienste
//!
//! Record-Backend, lokaler Schluessel-Cache und Krypto-Backend werden einmal
//! pro Prozess erzeugt und an jeden Dienst uebergeben.

use std::sync::Arc;

use litechat_core::{CacheSchluessel, ChatId};
use litechat_crypto::{
    ChatKey, CryptoBackend, CryptoResult, IdentityKeyPair, KeyParameters, RustCryptoBackend,
};
use litechat_records::RecordStore;

use crate::error::E2eeResult;
use crate::storage::LocalKeyStore;

pub struct E2eeContext<R: RecordStore> {
    pub records: Arc<R>,
    pub cache: Arc<dyn LocalKeyStore>,
    pub backend: Arc<dyn CryptoBackend>,
    pub params: KeyParameters,
}

impl<R: RecordStore> Clone for E2eeContext<R> {
    fn clone(&self) -> Self {
        Self {
            records: Arc::clone(&self.records),
            cache: Arc::clone(&self.cache),
            backend: Arc::clone(&self.backend),
            params: self.params,
        }
    }
}

impl<R: RecordStore> E2eeContext<R> {
    /// Kontext mit RustCrypto-Backend und Standard-Parametern
    pub fn neu(records: Arc<R>, cache: Arc<dyn LocalKeyStore>) -> Self {
        Self {
            records,
            cache,
            backend: Arc::new(RustCryptoBackend::new()),
            params: KeyParameters::default(),
        }
    }

    pub fn mit_backend(mut self, backend: Arc<dyn CryptoBackend>) -> Self {
        self.backend = backend;
        self
    }

    pub fn mit_parametern(mut self, params: KeyParameters) -> Self {
        self.params = params;
        self
    }

    /// Identitaetsschluessel aus dem Cache, `None` wenn keiner vorhanden ist
    pub fn identitaet_laden(&self) -> E2eeResult<Option<IdentityKeyPair>> {
        match self.cache.laden(&CacheSchluessel::PrivateKey)? {
            Some(text) => Ok(Some(IdentityKeyPair::from_private_jwk(&text)?)),
            None => Ok(None),
        }
    }

    /// Chat-Schluessel aus dem Cache, `None` wenn keiner vorhanden ist
    pub fn chat_key_laden(&self, chat_id: &ChatId) -> E2eeResult<Option<ChatKey>> {
        match self.cache.laden(&CacheSchluessel::Chat(chat_id.clone()))? {
            Some(text) => Ok(Some(ChatKey::from_jwk_text(&text)?)),
            None => Ok(None),
        }
    }

    /// Fuehrt eine rechenintensive Krypto-Operation auf dem Blocking-Pool aus
    pub(crate) async fn blockierend<T, F>(&self, f: F) -> E2eeResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&dyn CryptoBackend) -> CryptoResult<T> + Send + 'static,
    {
        let backend = Arc::clone(&self.backend);
        Ok(tokio::task::spawn_blocking(move || f(backend.as_ref())).await??)
    }
}
