//! Kryptografie-Backend (Capability-Interface)
//!
//! Alle Primitiven laufen ueber das `CryptoBackend`-Trait, damit andere
//! Implementierungen (Hardware-gestuetzt, Test-Fakes) eingesetzt werden
//! koennen. Format-Konvertierungen (JWK, PKCS8, SPKI) sind reine
//! Serialisierung und liegen in `jwk` bzw. `pem`.

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Key, Nonce as AesNonce,
};
use rand::rngs::OsRng;
use rand::RngCore;
use rsa::{Oaep, RsaPrivateKey, RsaPublicKey};
use sha2::{Digest, Sha256};

use crate::error::{CryptoError, CryptoResult};
use crate::types::{Nonce, SecretBytes, AES_SCHLUESSEL_LAENGE, NONCE_LAENGE};

/// Kryptografische Primitiven die von allen Komponenten genutzt werden
pub trait CryptoBackend: Send + Sync + std::fmt::Debug {
    /// Fuellt den Puffer mit kryptografisch sicheren Zufallsbytes
    fn fill_random(&self, buf: &mut [u8]);

    /// Erzeugt ein RSA-Schluessel-Paar (Exponent 65537)
    fn generate_rsa_key(&self, modulus_bits: usize) -> CryptoResult<RsaPrivateKey>;

    /// AES-256-GCM, Ciphertext inkl. angehaengtem 16-Byte Auth-Tag
    fn aes_gcm_encrypt(&self, key: &[u8], nonce: &Nonce, plaintext: &[u8])
        -> CryptoResult<Vec<u8>>;

    fn aes_gcm_decrypt(
        &self,
        key: &[u8],
        nonce: &Nonce,
        ciphertext: &[u8],
    ) -> CryptoResult<Vec<u8>>;

    /// RSA-OAEP mit SHA-256
    fn rsa_oaep_encrypt(&self, key: &RsaPublicKey, plaintext: &[u8]) -> CryptoResult<Vec<u8>>;

    fn rsa_oaep_decrypt(&self, key: &RsaPrivateKey, ciphertext: &[u8])
        -> CryptoResult<Vec<u8>>;

    /// PBKDF2-HMAC-SHA256, liefert einen 32-Byte AES-Schluessel
    fn derive_pbkdf2_key(&self, password: &[u8], salt: &[u8], iterations: u32) -> SecretBytes;

    fn digest_sha256(&self, data: &[u8]) -> [u8; 32];

    /// Frische zufaellige 12-Byte Nonce
    fn generate_nonce(&self) -> Nonce {
        let mut bytes = [0u8; NONCE_LAENGE];
        self.fill_random(&mut bytes);
        Nonce::new(bytes)
    }

    /// Frischer zufaelliger AES-256 Schluessel
    fn generate_aes_key(&self) -> SecretBytes {
        let mut bytes = vec![0u8; AES_SCHLUESSEL_LAENGE];
        self.fill_random(&mut bytes);
        SecretBytes::new(bytes)
    }
}

/// Standard-Backend auf Basis der RustCrypto-Crates
#[derive(Debug, Clone, Copy, Default)]
pub struct RustCryptoBackend;

impl RustCryptoBackend {
    pub fn new() -> Self {
        Self
    }
}

impl CryptoBackend for RustCryptoBackend {
    fn fill_random(&self, buf: &mut [u8]) {
        OsRng.fill_bytes(buf);
    }

    fn generate_rsa_key(&self, modulus_bits: usize) -> CryptoResult<RsaPrivateKey> {
        RsaPrivateKey::new(&mut OsRng, modulus_bits)
            .map_err(|e| CryptoError::SchluesselGenerierung(e.to_string()))
    }

    fn aes_gcm_encrypt(
        &self,
        key: &[u8],
        nonce: &Nonce,
        plaintext: &[u8],
    ) -> CryptoResult<Vec<u8>> {
        let cipher = aes_cipher(key)?;
        cipher
            .encrypt(AesNonce::from_slice(nonce.as_bytes()), plaintext)
            .map_err(|e| CryptoError::Verschluesselung(e.to_string()))
    }

    fn aes_gcm_decrypt(
        &self,
        key: &[u8],
        nonce: &Nonce,
        ciphertext: &[u8],
    ) -> CryptoResult<Vec<u8>> {
        let cipher = aes_cipher(key)?;
        cipher
            .decrypt(AesNonce::from_slice(nonce.as_bytes()), ciphertext)
            .map_err(|_| CryptoError::Entschluesselung("AES-GCM Auth-Tag ungueltig".to_string()))
    }

    fn rsa_oaep_encrypt(&self, key: &RsaPublicKey, plaintext: &[u8]) -> CryptoResult<Vec<u8>> {
        key.encrypt(&mut OsRng, Oaep::new::<Sha256>(), plaintext)
            .map_err(|e| CryptoError::Verschluesselung(e.to_string()))
    }

    fn rsa_oaep_decrypt(
        &self,
        key: &RsaPrivateKey,
        ciphertext: &[u8],
    ) -> CryptoResult<Vec<u8>> {
        key.decrypt(Oaep::new::<Sha256>(), ciphertext)
            .map_err(|e| CryptoError::Entschluesselung(e.to_string()))
    }

    fn derive_pbkdf2_key(&self, password: &[u8], salt: &[u8], iterations: u32) -> SecretBytes {
        let mut key = vec![0u8; AES_SCHLUESSEL_LAENGE];
        pbkdf2::pbkdf2_hmac::<Sha256>(password, salt, iterations, &mut key);
        SecretBytes::new(key)
    }

    fn digest_sha256(&self, data: &[u8]) -> [u8; 32] {
        Sha256::digest(data).into()
    }
}

fn aes_cipher(key_bytes: &[u8]) -> CryptoResult<Aes256Gcm> {
    if key_bytes.len() != AES_SCHLUESSEL_LAENGE {
        return Err(CryptoError::UngueltigeSchluesselLaenge {
            erwartet: AES_SCHLUESSEL_LAENGE,
            erhalten: key_bytes.len(),
        });
    }
    Ok(Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key_bytes)))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
