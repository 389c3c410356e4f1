//! JSON Web Key (RFC 7517) Serialisierung
//!
//! Schluessel werden im selben Format abgelegt, das WebCrypto exportiert:
//! RSA-OAEP-256 fuer Identitaetsschluessel, A256GCM fuer Chat-Schluessel.
//! Felder sind alphabetisch sortiert, Zahlen Base64url ohne Padding.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use rsa::traits::{PrivateKeyParts, PublicKeyParts};
use rsa::{BigUint, RsaPrivateKey, RsaPublicKey};
use serde::{Deserialize, Serialize};

use crate::error::{CryptoError, CryptoResult};
use crate::types::{SecretBytes, AES_SCHLUESSEL_LAENGE};

pub const ALG_RSA_OAEP_256: &str = "RSA-OAEP-256";
pub const ALG_A256GCM: &str = "A256GCM";

const KTY_RSA: &str = "RSA";
const KTY_OCT: &str = "oct";

/// Ein JSON Web Key
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Jwk {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alg: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub d: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dq: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub e: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ext: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub k: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub key_ops: Vec<String>,
    pub kty: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub n: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub p: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub q: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qi: Option<String>,
}

impl Jwk {
    /// Parst JWK-Text
    pub fn parse(text: &str) -> CryptoResult<Self> {
        serde_json::from_str(text.trim())
            .map_err(|e| CryptoError::format(format!("Kein gueltiger JWK: {e}")))
    }

    pub fn to_text(&self) -> CryptoResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// JWK eines AES-256-GCM Schluessels
    pub fn aus_aes_schluessel(key: &SecretBytes) -> Self {
        Self {
            alg: Some(ALG_A256GCM.to_string()),
            ext: Some(true),
            k: Some(b64(key.as_bytes())),
            key_ops: vec!["encrypt".to_string(), "decrypt".to_string()],
            kty: KTY_OCT.to_string(),
            ..Default::default()
        }
    }

    /// Rohe Schluesselbytes eines AES-256-GCM JWK
    pub fn aes_schluessel(&self) -> CryptoResult<SecretBytes> {
        self.erwarte_kty(KTY_OCT)?;
        self.erwarte_alg(ALG_A256GCM)?;
        let bytes = SecretBytes::new(feld_bytes("k", &self.k)?);
        if bytes.len() != AES_SCHLUESSEL_LAENGE {
            return Err(CryptoError::UngueltigeSchluesselLaenge {
                erwartet: AES_SCHLUESSEL_LAENGE,
                erhalten: bytes.len(),
            });
        }
        Ok(bytes)
    }

    /// JWK eines RSA-OAEP oeffentlichen Schluessels
    pub fn aus_rsa_public(key: &RsaPublicKey) -> Self {
        Self {
            alg: Some(ALG_RSA_OAEP_256.to_string()),
            e: Some(uint(key.e())),
            ext: Some(true),
            key_ops: vec!["encrypt".to_string()],
            kty: KTY_RSA.to_string(),
            n: Some(uint(key.n())),
            ..Default::default()
        }
    }

    /// JWK eines RSA-OAEP privaten Schluessels (inkl. CRT-Parameter)
    pub fn aus_rsa_private(key: &RsaPrivateKey) -> CryptoResult<Self> {
        let [p, q] = key.primes() else {
            return Err(CryptoError::Export(
                "Nur RSA-Schluessel mit zwei Primfaktoren werden unterstuetzt".to_string(),
            ));
        };
        let dp = key
            .dp()
            .ok_or_else(|| CryptoError::Export("CRT-Parameter dp fehlt".to_string()))?;
        let dq = key
            .dq()
            .ok_or_else(|| CryptoError::Export("CRT-Parameter dq fehlt".to_string()))?;
        let qi = key
            .crt_coefficient()
            .ok_or_else(|| CryptoError::Export("CRT-Koeffizient fehlt".to_string()))?;

        Ok(Self {
            alg: Some(ALG_RSA_OAEP_256.to_string()),
            d: Some(uint(key.d())),
            dp: Some(uint(dp)),
            dq: Some(uint(dq)),
            e: Some(uint(key.e())),
            ext: Some(true),
            key_ops: vec!["decrypt".to_string()],
            kty: KTY_RSA.to_string(),
            n: Some(uint(key.n())),
            p: Some(uint(p)),
            q: Some(uint(q)),
            qi: Some(uint(&qi)),
            ..Default::default()
        })
    }

    pub fn rsa_public(&self) -> CryptoResult<RsaPublicKey> {
        self.erwarte_kty(KTY_RSA)?;
        self.erwarte_alg(ALG_RSA_OAEP_256)?;
        let n = feld_uint("n", &self.n)?;
        let e = feld_uint("e", &self.e)?;
        RsaPublicKey::new(n, e)
            .map_err(|e| CryptoError::format(format!("Ungueltiger RSA-Schluessel: {e}")))
    }

    pub fn rsa_private(&self) -> CryptoResult<RsaPrivateKey> {
        self.erwarte_kty(KTY_RSA)?;
        self.erwarte_alg(ALG_RSA_OAEP_256)?;
        let n = feld_uint("n", &self.n)?;
        let e = feld_uint("e", &self.e)?;
        let d = feld_uint("d", &self.d)?;
        let p = feld_uint("p", &self.p)?;
        let q = feld_uint("q", &self.q)?;

        let mut key = RsaPrivateKey::from_components(n, e, d, vec![p, q])
            .map_err(|e| CryptoError::format(format!("Ungueltiger RSA-Schluessel: {e}")))?;
        key.precompute()
            .map_err(|e| CryptoError::format(format!("CRT-Vorberechnung fehlgeschlagen: {e}")))?;
        key.validate()
            .map_err(|e| CryptoError::format(format!("RSA-Schluessel inkonsistent: {e}")))?;
        Ok(key)
    }

    fn erwarte_kty(&self, kty: &str) -> CryptoResult<()> {
        if self.kty != kty {
            return Err(CryptoError::format(format!(
                "Schluesseltyp '{}' statt '{kty}'",
                self.kty
            )));
        }
        Ok(())
    }

    fn erwarte_alg(&self, alg: &str) -> CryptoResult<()> {
        match &self.alg {
            Some(a) if a != alg => Err(CryptoError::format(format!(
                "Algorithmus '{a}' statt '{alg}'"
            ))),
            _ => Ok(()),
        }
    }
}

fn b64(bytes: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(bytes)
}

fn uint(value: &BigUint) -> String {
    b64(&value.to_bytes_be())
}

fn feld_bytes(name: &str, feld: &Option<String>) -> CryptoResult<Vec<u8>> {
    let text = feld
        .as_deref()
        .ok_or_else(|| CryptoError::format(format!("JWK-Feld '{name}' fehlt")))?;
    // WebCrypto exportiert ohne Padding, manche Tools haengen es trotzdem an
    Ok(URL_SAFE_NO_PAD.decode(text.trim_end_matches('='))?)
}

fn feld_uint(name: &str, feld: &Option<String>) -> CryptoResult<BigUint> {
    Ok(BigUint::from_bytes_be(&feld_bytes(name, feld)?))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
