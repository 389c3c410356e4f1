//! LiteChat Keytool – Einstiegspunkt
//!
//! Laedt die Konfiguration, initialisiert das Logging und fuehrt den
//! gewaehlten Befehl aus. Nutzdaten gehen nach stdout, Logs nach stderr.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use litechat_core::UserId;
use litechat_e2ee::ExportFormat;
use litechat_keytool::config::{KeytoolConfig, ENV_CONFIG, STANDARD_CONFIG_DATEI};
use litechat_keytool::Keytool;
use litechat_observability::logging_initialisieren;

#[derive(Debug, Parser)]
#[command(name = "litechat-keytool", version, about = "LiteChat Schluessel-Werkzeug")]
struct Cli {
    /// Pfad der Konfigurationsdatei
    #[arg(long, env = ENV_CONFIG, default_value = STANDARD_CONFIG_DATEI)]
    config: String,

    /// Ueberschreibt die Cache-Datei aus der Konfiguration
    #[arg(long)]
    cache: Option<PathBuf>,

    #[command(subcommand)]
    befehl: Befehl,
}

#[derive(Debug, Subcommand)]
enum Befehl {
    /// Neues Identitaets-Schluessel-Paar erzeugen
    Generate {
        /// Vorhandenen privaten Schluessel ersetzen
        #[arg(long)]
        ersetzen: bool,
    },
    /// Lokale Schluessel in ein ZIP-Archiv exportieren
    Export {
        /// jwk oder pem
        #[arg(long, default_value = "jwk")]
        format: ExportFormat,
        /// Benutzer-ID fuer data.json
        #[arg(long, default_value = "lokal")]
        user: String,
        /// Zieldatei, z.B. litechat-export.zip
        ziel: PathBuf,
    },
    /// Privaten Schluessel importieren
    Import {
        /// JWK-Text
        #[arg(long, conflicts_with = "datei")]
        text: Option<String>,
        /// JWK-Datei
        #[arg(long)]
        datei: Option<PathBuf>,
    },
    /// Privaten Schluessel als JWK ausgeben
    ShowPrivateKey,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let geladen = KeytoolConfig::laden(&cli.config)?;
    let config_fehlt = geladen.is_none();
    let mut config = geladen.unwrap_or_default();
    if let Some(cache) = cli.cache {
        config.schluessel.cache_datei = cache;
    }

    logging_initialisieren(&config.logging.level, config.logging.format)?;
    if config_fehlt {
        tracing::warn!(
            pfad = %cli.config,
            "Konfigurationsdatei nicht gefunden, verwende Standardwerte"
        );
    }
    tracing::debug!(
        version = env!("CARGO_PKG_VERSION"),
        config = %cli.config,
        "LiteChat Keytool gestartet"
    );

    let tool = Keytool::neu(config)?;
    match cli.befehl {
        Befehl::Generate { ersetzen } => {
            println!("{}", tool.generieren(ersetzen).await?);
        }
        Befehl::Export { format, user, ziel } => {
            let anzahl = tool.exportieren(&UserId::new(user), format, &ziel).await?;
            tracing::info!(ziel = %ziel.display(), dateien = anzahl, "Export abgeschlossen");
        }
        Befehl::Import { text, datei } => {
            tool.importieren(text.as_deref(), datei.as_deref()).await?;
            tracing::info!("Privater Schluessel importiert");
        }
        Befehl::ShowPrivateKey => {
            println!("{}", tool.privaten_schluessel_zeigen()?);
        }
    }

    Ok(())
}
