//! litechat-keytool – Bibliotheks-Root
//!
//! Verwaltet den lokalen Schluessel-Cache ohne laufendes Backend: die
//! Dienste arbeiten gegen einen fluechtigen In-Memory Record-Store.

pub mod config;

use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Result};
use config::KeytoolConfig;
use litechat_core::UserId;
use litechat_e2ee::{
    E2eeContext, ExportFormat, ExportOptionen, ExportService, FileKeyStore, IdentityService,
    ImportService, LocalKeyStore,
};
use litechat_records::MemoryRecordStore;

/// Haelt Konfiguration und Dienst-Kontext zusammen
pub struct Keytool {
    pub config: KeytoolConfig,
    ctx: E2eeContext<MemoryRecordStore>,
}

impl Keytool {
    /// Oeffnet den in der Konfiguration angegebenen Schluessel-Cache
    pub fn neu(config: KeytoolConfig) -> Result<Self> {
        let cache: Arc<dyn LocalKeyStore> =
            Arc::new(FileKeyStore::oeffnen(&config.schluessel.cache_datei)?);
        let ctx = E2eeContext::neu(Arc::new(MemoryRecordStore::new()), cache)
            .mit_parametern(config.key_parameter());
        tracing::debug!(
            cache = %config.schluessel.cache_datei.display(),
            "Schluessel-Cache geoeffnet"
        );
        Ok(Self { config, ctx })
    }

    /// Erzeugt eine neue Identitaet, gibt den oeffentlichen Schluessel zurueck
    ///
    /// Ein vorhandener privater Schluessel wird nur mit `ersetzen` ueberschrieben.
    pub async fn generieren(&self, ersetzen: bool) -> Result<String> {
        let service = IdentityService::neu(self.ctx.clone());
        if !ersetzen && service.load_identity_private_key()?.is_some() {
            bail!("Es existiert bereits ein privater Schluessel (--ersetzen zum Ueberschreiben)");
        }
        Ok(service.generate_identity_keypair().await?.public_key_text)
    }

    /// Schreibt alle lokalen Schluessel samt `data.json` als ZIP-Archiv nach `ziel`
    ///
    /// Gibt die Anzahl der Dateien im Archiv zurueck.
    pub async fn exportieren(&self, user: &UserId, format: ExportFormat, ziel: &Path) -> Result<usize> {
        let optionen = ExportOptionen {
            format,
            chats: false,
            nachrichten: false,
            schluessel: true,
            ..Default::default()
        };
        let archiv = ExportService::neu(self.ctx.clone())
            .export(user, &optionen)
            .await?;
        archiv.schreiben(ziel).await?;
        Ok(archiv.dateien.len())
    }

    /// Importiert einen privaten Schluessel aus Text oder Datei
    pub async fn importieren(&self, text: Option<&str>, datei: Option<&Path>) -> Result<()> {
        let service = ImportService::neu(self.ctx.clone());
        match (text, datei) {
            (Some(text), None) => service.import_text(text)?,
            (None, Some(datei)) => service.import_file(datei).await?,
            _ => bail!("Genau eine Quelle angeben: --text oder --datei"),
        };
        Ok(())
    }

    /// JWK-Text des eigenen privaten Schluessels
    pub fn privaten_schluessel_zeigen(&self) -> Result<String> {
        Ok(ExportService::neu(self.ctx.clone()).export_private_key()?)
    }
}
