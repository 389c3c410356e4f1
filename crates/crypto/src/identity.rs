//! Langzeit-Identitaetsschluessel (RSA-OAEP, SHA-256)
//!
//! Jeder Benutzer erhaelt beim Registrieren ein RSA-Schluessel-Paar.
//! Der oeffentliche Schluessel wird als JWK-Text im Benutzerprofil
//! veroeffentlicht, der private Schluessel verbleibt beim Client.
//! Das Paar dient ausschliesslich zum Ein- und Auspacken von Chat-Schluesseln.

use rsa::{RsaPrivateKey, RsaPublicKey};

use crate::backend::CryptoBackend;
use crate::error::CryptoResult;
use crate::jwk::Jwk;
use crate::types::KeyParameters;

/// Langzeit-Identitaet eines Benutzers
#[derive(Clone)]
pub struct IdentityKeyPair {
    private_key: RsaPrivateKey,
}

/// Beide Haelften eines Schluessel-Paars als JWK-Text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityKeyTexts {
    pub public_key_text: String,
    pub private_key_text: String,
}

impl IdentityKeyPair {
    /// Generiert ein neues Schluessel-Paar mit dem konfigurierten Modulus
    pub fn generate(backend: &dyn CryptoBackend, params: &KeyParameters) -> CryptoResult<Self> {
        let private_key = backend.generate_rsa_key(params.rsa_modulus_bits)?;
        tracing::debug!(bits = params.rsa_modulus_bits, "Identitaetsschluessel generiert");
        Ok(Self { private_key })
    }

    /// Stellt ein Schluessel-Paar aus dem privaten JWK-Text wieder her
    pub fn from_private_jwk(text: &str) -> CryptoResult<Self> {
        let private_key = Jwk::parse(text)?.rsa_private()?;
        Ok(Self { private_key })
    }

    pub fn from_private_key(private_key: RsaPrivateKey) -> Self {
        Self { private_key }
    }

    pub fn private_key(&self) -> &RsaPrivateKey {
        &self.private_key
    }

    pub fn public_key(&self) -> RsaPublicKey {
        self.private_key.to_public_key()
    }

    /// Privater Schluessel als JWK-Text (extrahierbar fuer Export/Backup)
    pub fn private_jwk_text(&self) -> CryptoResult<String> {
        Jwk::aus_rsa_private(&self.private_key)?.to_text()
    }

    /// Oeffentlicher Schluessel als JWK-Text (fuer das Benutzerprofil)
    pub fn public_jwk_text(&self) -> CryptoResult<String> {
        Jwk::aus_rsa_public(&self.public_key()).to_text()
    }

    pub fn to_texts(&self) -> CryptoResult<IdentityKeyTexts> {
        Ok(IdentityKeyTexts {
            public_key_text: self.public_jwk_text()?,
            private_key_text: self.private_jwk_text()?,
        })
    }
}

/// Parst einen veroeffentlichten oeffentlichen Schluessel (JWK-Text)
pub fn parse_public_key(text: &str) -> CryptoResult<RsaPublicKey> {
    Jwk::parse(text)?.rsa_public()
}

impl std::fmt::Debug for IdentityKeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "IdentityKeyPair {{ private_key: [REDACTED] }}")
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::OnceLock;

    use super::*;
    use crate::backend::RustCryptoBackend;
    use crate::error::CryptoError;

    /// Eine Identitaet pro Testlauf, RSA-Generierung ist teuer
    pub(crate) fn test_identity() -> &'static IdentityKeyPair {
        static IDENTITY: OnceLock<IdentityKeyPair> = OnceLock::new();
        IDENTITY.get_or_init(|| {
            IdentityKeyPair::generate(&RustCryptoBackend::new(), &KeyParameters::fuer_tests())
                .unwrap()
        })
    }

    #[test]
    fn identity_als_jwk_exportieren() {
        let texts = test_identity().to_texts().unwrap();

        assert!(texts.public_key_text.contains("\"alg\":\"RSA-OAEP-256\""));
        assert!(texts.public_key_text.contains("\"key_ops\":[\"encrypt\"]"));
        assert!(!texts.public_key_text.contains("\"d\""));

        assert!(texts.private_key_text.contains("\"key_ops\":[\"decrypt\"]"));
        assert!(texts.private_key_text.contains("\"qi\""));
    }

    #[test]
    fn identity_aus_jwk_wiederherstellen() {
        let original = test_identity();
        let text = original.private_jwk_text().unwrap();
        let wiederhergestellt = IdentityKeyPair::from_private_jwk(&text).unwrap();

        assert_eq!(wiederhergestellt.public_key(), original.public_key());
        assert_eq!(wiederhergestellt.private_jwk_text().unwrap(), text);
    }

    #[test]
    fn oeffentlichen_schluessel_parsen() {
        let text = test_identity().public_jwk_text().unwrap();
        assert_eq!(parse_public_key(&text).unwrap(), test_identity().public_key());
    }

    #[test]
    fn oeffentlicher_jwk_ist_kein_privater() {
        let text = test_identity().public_jwk_text().unwrap();
        let err = IdentityKeyPair::from_private_jwk(&text).unwrap_err();
        assert!(matches!(err, CryptoError::UngueltigesFormat(_)));
    }

    #[test]
    fn debug_zeigt_keinen_schluessel() {
        let debug = format!("{:?}", test_identity());
        assert!(debug.contains("REDACTED"));
    }
}
