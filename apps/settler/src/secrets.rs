//! Wallet secret decryption.
//!
//! Stored secrets are `hex(nonce || ciphertext)` sealed with XChaCha20-Poly1305
//! under `SHA-256(ENCRYPTION_KEY)`.

use chacha20poly1305::{
    Key, XChaCha20Poly1305, XNonce,
    aead::{Aead, AeadCore, KeyInit, OsRng},
};
use sha2::{Digest, Sha256};
use std::fmt;
use zeroize::Zeroizing;

const NONCE_LEN: usize = 24;

#[derive(Debug, thiserror::Error)]
pub enum SecretError {
    #[error("secret is not hex")]
    Hex(#[from] hex::FromHexError),
    #[error("secret is too short")]
    Truncated,
    #[error("secret failed authentication")]
    Authentication,
    #[error("decrypted secret is not utf-8")]
    Encoding,
    #[error("encrypt secret")]
    Encrypt,
}

/// A decrypted wallet mnemonic. Wiped on drop.
pub struct Mnemonic(Zeroizing<String>);

impl Mnemonic {
    pub fn new(phrase: String) -> Self {
        Self(Zeroizing::new(phrase))
    }

    pub fn phrase(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Mnemonic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Mnemonic(<redacted>)")
    }
}

#[derive(Clone)]
pub struct SecretBox {
    cipher: XChaCha20Poly1305,
}

impl SecretBox {
    pub fn new(encryption_key: &str) -> Self {
        let digest = Zeroizing::new(<[u8; 32]>::from(Sha256::digest(encryption_key.as_bytes())));
        Self {
            cipher: XChaCha20Poly1305::new(Key::from_slice(digest.as_slice())),
        }
    }

    pub fn encrypt(&self, plaintext: &str) -> Result<String, SecretError> {
        let nonce = XChaCha20Poly1305::generate_nonce(&mut OsRng);
        let ct = self
            .cipher
            .encrypt(&nonce, plaintext.as_bytes())
            .map_err(|_| SecretError::Encrypt)?;
        let mut out = nonce.to_vec();
        out.extend_from_slice(&ct);
        Ok(hex::encode(out))
    }

    pub fn decrypt(&self, sealed_hex: &str) -> Result<Mnemonic, SecretError> {
        let sealed = hex::decode(sealed_hex.trim())?;
        if sealed.len() <= NONCE_LEN {
            return Err(SecretError::Truncated);
        }
        let (nonce, ct) = sealed.split_at(NONCE_LEN);
        let plain = Zeroizing::new(
            self.cipher
                .decrypt(XNonce::from_slice(nonce), ct)
                .map_err(|_| SecretError::Authentication)?,
        );
        let phrase = std::str::from_utf8(&plain).map_err(|_| SecretError::Encoding)?;
        Ok(Mnemonic::new(phrase.to_string()))
    }
}

impl fmt::Debug for SecretBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretBox(<redacted>)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &str = "an-encryption-key-longer-than-20";

    #[test]
    fn decrypts_what_it_sealed() {
        let sb = SecretBox::new(KEY);
        let sealed = sb.encrypt("abandon ability able").unwrap();
        assert_eq!(sb.decrypt(&sealed).unwrap().phrase(), "abandon ability able");
    }

    #[test]
    fn wrong_key_fails_authentication() {
        let sealed = SecretBox::new(KEY).encrypt("abandon").unwrap();
        let other = SecretBox::new("a-different-key-of-enough-length");
        assert!(matches!(
            other.decrypt(&sealed),
            Err(SecretError::Authentication)
        ));
    }

    #[test]
    fn rejects_short_and_non_hex_input() {
        let sb = SecretBox::new(KEY);
        assert!(matches!(sb.decrypt("00ff"), Err(SecretError::Truncated)));
        assert!(matches!(sb.decrypt("xyz"), Err(SecretError::Hex(_))));
    }

    #[test]
    fn mnemonic_debug_is_redacted() {
        let m = Mnemonic::new("abandon abandon".to_string());
        assert_eq!(format!("{m:?}"), "Mnemonic(<redacted>)");
    }
}
