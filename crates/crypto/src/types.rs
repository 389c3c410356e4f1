//! Gemeinsame Typen fuer das Kryptografie-Subsystem

/// Laenge einer AES-GCM Nonce in Bytes
pub const NONCE_LAENGE: usize = 12;

/// Laenge eines AES-256 Schluessels in Bytes
pub const AES_SCHLUESSEL_LAENGE: usize = 32;

/// Standard-Modulus fuer Identitaetsschluessel
pub const RSA_MODULUS_BITS: usize = 4096;

/// Standard-Iterationen fuer die Keystore-Schluesselableitung
pub const PBKDF2_ITERATIONEN: u32 = 100_000;

/// Eine AES-GCM Nonce (Number used once), zufaellig pro verschluesselter Einheit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Nonce {
    pub bytes: [u8; NONCE_LAENGE],
}

impl Nonce {
    pub fn new(bytes: [u8; NONCE_LAENGE]) -> Self {
        Self { bytes }
    }

    /// Erstellt eine Nonce aus einem Slice, das genau 12 Bytes lang sein muss
    pub fn aus_slice(bytes: &[u8]) -> crate::CryptoResult<Self> {
        let bytes: [u8; NONCE_LAENGE] =
            bytes
                .try_into()
                .map_err(|_| crate::CryptoError::UngueltigeNonce {
                    erwartet: NONCE_LAENGE,
                    erhalten: bytes.len(),
                })?;
        Ok(Self { bytes })
    }

    pub fn as_bytes(&self) -> &[u8; NONCE_LAENGE] {
        &self.bytes
    }
}

/// Sicherer Schluessel-Container (wird beim Drop genullt)
#[derive(Clone, PartialEq, Eq)]
pub struct SecretBytes(pub Vec<u8>);

impl Drop for SecretBytes {
    fn drop(&mut self) {
        self.0.iter_mut().for_each(|b| *b = 0);
    }
}

impl std::fmt::Debug for SecretBytes {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SecretBytes([REDACTED] {} bytes)", self.0.len())
    }
}

impl SecretBytes {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Parameter fuer Schluesselerzeugung und -ableitung
///
/// Wird an alle Komponenten uebergeben statt aus globalem Zustand gelesen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyParameters {
    /// Modulus-Laenge der RSA-OAEP Identitaetsschluessel
    pub rsa_modulus_bits: usize,
    /// PBKDF2-SHA256 Iterationen fuer den Keystore
    pub pbkdf2_iterations: u32,
}

impl Default for KeyParameters {
    fn default() -> Self {
        Self {
            rsa_modulus_bits: RSA_MODULUS_BITS,
            pbkdf2_iterations: PBKDF2_ITERATIONEN,
        }
    }
}

impl KeyParameters {
    /// Reduzierte Parameter (2048 Bit, 1000 Iterationen), nur fuer Tests
    pub fn fuer_tests() -> Self {
        Self {
            rsa_modulus_bits: 2048,
            pbkdf2_iterations: 1000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nonce_aus_slice() {
        let nonce = Nonce::aus_slice(&[7u8; 12]).unwrap();
        assert_eq!(nonce.as_bytes(), &[7u8; 12]);
    }

    #[test]
    fn nonce_falsche_laenge() {
        let err = Nonce::aus_slice(&[1, 2, 3]).unwrap_err();
        assert!(matches!(
            err,
            crate::CryptoError::UngueltigeNonce {
                erwartet: 12,
                erhalten: 3
            }
        ));
    }

    #[test]
    fn secret_bytes_debug_ist_redacted() {
        let s = SecretBytes::new(vec![1, 2, 3]);
        assert_eq!(format!("{s:?}"), "SecretBytes([REDACTED] 3 bytes)");
    }

    #[test]
    fn standard_parameter() {
        let p = KeyParameters::default();
        assert_eq!(p.rsa_modulus_bits, 4096);
        assert_eq!(p.pbkdf2_iterations, 100_000);
    }
}
