/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! Credential vault: encryption at rest for vendor credentials.
//!
//! This module provides AES-256-GCM encryption and decryption for the
//! credential blobs stored in the database.
//!
//! # Format
//!
//! Encrypted data format: `version (1 byte) || nonce (12 bytes) || ciphertext || tag (16 bytes)`
//!
//! Version bytes:
//! - 0x01: AES-256-GCM encryption
//!
//! # Rotation
//!
//! The vault holds the current master key and, during a rotation window, the
//! previous one. Decryption tries current first and falls back to previous;
//! encryption always uses current. `reseal` re-encrypts a blob that only the
//! previous key could open.

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use rand::RngCore;
use secrecy::{ExposeSecret, SecretString};
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Version byte for AES-256-GCM encrypted data
const VERSION_AES_GCM: u8 = 0x01;

/// Nonce size for AES-256-GCM (96 bits)
const AES_GCM_NONCE_SIZE: usize = 12;

/// Vault error types
#[derive(Debug, Error)]
pub enum VaultError {
    /// Encryption operation failed
    #[error("Encryption failed")]
    EncryptionFailed,
    /// Decryption operation failed (wrong key or corrupted data)
    #[error("Decryption failed")]
    DecryptionFailed,
    /// Invalid data format
    #[error("Invalid data: {0}")]
    InvalidData(String),
    /// Unsupported encryption version
    #[error("Unsupported encryption version: {0}")]
    UnsupportedVersion(u8),
    /// Malformed key material
    #[error("Invalid key: {0}")]
    InvalidKey(String),
}

/// Encryption key wrapper with AES-256-GCM cipher.
pub struct EncryptionKey {
    /// The raw 32-byte key.
    key: [u8; 32],
    /// Pre-initialized AES-256-GCM cipher
    cipher: Aes256Gcm,
}

impl std::fmt::Debug for EncryptionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncryptionKey")
            .field("fingerprint", &self.fingerprint())
            .finish()
    }
}

impl EncryptionKey {
    /// Creates a new encryption key from raw bytes.
    pub fn new(key: [u8; 32]) -> Self {
        let cipher = Aes256Gcm::new_from_slice(&key).expect("valid key size");
        Self { key, cipher }
    }

    /// Creates a key from a hex-encoded string.
    pub fn from_hex(hex_key: &str) -> Result<Self, VaultError> {
        let bytes = hex::decode(hex_key)
            .map_err(|e| VaultError::InvalidKey(format!("Invalid hex encoding: {}", e)))?;

        if bytes.len() != 32 {
            return Err(VaultError::InvalidKey(format!(
                "Key must be 32 bytes, got {} bytes",
                bytes.len()
            )));
        }

        let mut key = [0u8; 32];
        key.copy_from_slice(&bytes);
        Ok(Self::new(key))
    }

    /// Returns a short key fingerprint (for logging only, never the key).
    pub fn fingerprint(&self) -> String {
        let hash = Sha256::digest(self.key);
        hex::encode(&hash[..8])
    }

    fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, VaultError> {
        let mut nonce_bytes = [0u8; AES_GCM_NONCE_SIZE];
        rand::thread_rng().fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = self
            .cipher
            .encrypt(nonce, plaintext)
            .map_err(|_| VaultError::EncryptionFailed)?;

        // version || nonce || ciphertext (includes auth tag)
        let mut output = Vec::with_capacity(1 + AES_GCM_NONCE_SIZE + ciphertext.len());
        output.push(VERSION_AES_GCM);
        output.extend_from_slice(&nonce_bytes);
        output.extend(ciphertext);
        Ok(output)
    }

    fn decrypt(&self, data: &[u8]) -> Result<Vec<u8>, VaultError> {
        if data.is_empty() {
            return Err(VaultError::InvalidData("Empty data".to_string()));
        }

        match data[0] {
            VERSION_AES_GCM => {
                let body = &data[1..];
                if body.len() < AES_GCM_NONCE_SIZE {
                    return Err(VaultError::InvalidData(
                        "Ciphertext too short (missing nonce)".to_string(),
                    ));
                }
                let (nonce_bytes, ciphertext) = body.split_at(AES_GCM_NONCE_SIZE);
                let nonce = Nonce::from_slice(nonce_bytes);
                self.cipher
                    .decrypt(nonce, ciphertext)
                    .map_err(|_| VaultError::DecryptionFailed)
            }
            v => Err(VaultError::UnsupportedVersion(v)),
        }
    }
}

/// Opaque credential encrypt/decrypt facility for the poll pipeline.
pub struct CredentialVault {
    current: EncryptionKey,
    previous: Option<EncryptionKey>,
}

impl CredentialVault {
    pub fn new(current: EncryptionKey, previous: Option<EncryptionKey>) -> Self {
        Self { current, previous }
    }

    /// Builds a vault from hex-encoded key material.
    pub fn from_hex(current_hex: &str, previous_hex: Option<&str>) -> Result<Self, VaultError> {
        let current = EncryptionKey::from_hex(current_hex)?;
        let previous = match previous_hex {
            Some(hex_key) if !hex_key.is_empty() => Some(EncryptionKey::from_hex(hex_key)?),
            _ => None,
        };
        Ok(Self::new(current, previous))
    }

    /// Startup self-test: encrypt/decrypt round-trip with the current key.
    pub fn self_test(&self) -> Result<(), VaultError> {
        let probe = b"vault-self-test";
        let sealed = self.current.encrypt(probe)?;
        let opened = self.current.decrypt(&sealed)?;
        if opened != probe {
            return Err(VaultError::DecryptionFailed);
        }
        Ok(())
    }

    /// Fingerprint of the current key, safe to log.
    pub fn fingerprint(&self) -> String {
        self.current.fingerprint()
    }

    /// Seals plaintext with the current key.
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, VaultError> {
        self.current.encrypt(plaintext)
    }

    /// Opens a blob, trying the current key and then the previous one.
    pub fn decrypt(&self, blob: &[u8]) -> Result<Vec<u8>, VaultError> {
        match self.current.decrypt(blob) {
            Ok(plain) => Ok(plain),
            Err(VaultError::DecryptionFailed) => match &self.previous {
                Some(prev) => prev.decrypt(blob),
                None => Err(VaultError::DecryptionFailed),
            },
            Err(e) => Err(e),
        }
    }

    /// Opens a blob into a zeroizing string; the plaintext is wiped when the
    /// returned value drops.
    pub fn decrypt_string(&self, blob: &[u8]) -> Result<SecretString, VaultError> {
        let bytes = self.decrypt(blob)?;
        let text = String::from_utf8(bytes)
            .map_err(|_| VaultError::InvalidData("Plaintext is not valid UTF-8".to_string()))?;
        Ok(SecretString::from(text))
    }

    /// Re-encrypts a blob under the current key if only the previous key
    /// could open it. Returns `None` when the blob is already current.
    pub fn reseal(&self, blob: &[u8]) -> Result<Option<Vec<u8>>, VaultError> {
        match self.current.decrypt(blob) {
            Ok(_) => Ok(None),
            Err(VaultError::DecryptionFailed) => {
                let plain = self
                    .previous
                    .as_ref()
                    .ok_or(VaultError::DecryptionFailed)?
                    .decrypt(blob)?;
                let resealed = self.current.encrypt(&plain)?;
                Ok(Some(resealed))
            }
            Err(e) => Err(e),
        }
    }
}

/// Convenience: seal a credential JSON document for storage.
pub fn encrypt_credentials(vault: &CredentialVault, plaintext: &SecretString) -> Result<Vec<u8>, VaultError> {
    vault.encrypt(plaintext.expose_secret().as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    fn hex_key(byte: u8) -> String {
        hex::encode([byte; 32])
    }

    #[test]
    fn test_key_from_hex() {
        let key = EncryptionKey::from_hex(
            "0123456789abcdef0123456789abcdef0123456789abcdef0123456789abcdef",
        )
        .unwrap();
        assert_eq!(key.key[0], 0x01);
        assert_eq!(key.key[31], 0xef);
    }

    #[test]
    fn test_key_from_hex_invalid() {
        assert!(EncryptionKey::from_hex("0123456789abcdef").is_err());
        assert!(EncryptionKey::from_hex("xyz123").is_err());
    }

    #[test]
    fn test_encrypt_decrypt_roundtrip() {
        let vault = CredentialVault::from_hex(&hex_key(0x11), None).unwrap();
        let plaintext = br#"{"api_key":"k-123","api_secret":"s-456"}"#;

        let sealed = vault.encrypt(plaintext).unwrap();
        let opened = vault.decrypt(&sealed).unwrap();

        assert_eq!(opened, plaintext);
    }

    #[test]
    fn test_encrypt_produces_different_output() {
        let vault = CredentialVault::from_hex(&hex_key(0x11), None).unwrap();
        let plaintext = b"test data";

        // Random nonce per call
        let sealed1 = vault.encrypt(plaintext).unwrap();
        let sealed2 = vault.encrypt(plaintext).unwrap();
        assert_ne!(sealed1, sealed2);

        assert_eq!(vault.decrypt(&sealed1).unwrap(), plaintext);
        assert_eq!(vault.decrypt(&sealed2).unwrap(), plaintext);
    }

    #[test]
    fn test_decrypt_wrong_key() {
        let vault1 = CredentialVault::from_hex(&hex_key(0x11), None).unwrap();
        let vault2 = CredentialVault::from_hex(&hex_key(0x22), None).unwrap();

        let sealed = vault1.encrypt(b"secret message").unwrap();
        assert!(vault2.decrypt(&sealed).is_err());
    }

    #[test]
    fn test_decrypt_with_previous_key() {
        let old_vault = CredentialVault::from_hex(&hex_key(0x11), None).unwrap();
        let sealed = old_vault.encrypt(b"rotated secret").unwrap();

        // New current key, old one demoted to previous
        let rotated = CredentialVault::from_hex(&hex_key(0x22), Some(&hex_key(0x11))).unwrap();
        assert_eq!(rotated.decrypt(&sealed).unwrap(), b"rotated secret");
    }

    #[test]
    fn test_reseal_only_rewrites_stale_blobs() {
        let old_vault = CredentialVault::from_hex(&hex_key(0x11), None).unwrap();
        let stale = old_vault.encrypt(b"payload").unwrap();

        let rotated = CredentialVault::from_hex(&hex_key(0x22), Some(&hex_key(0x11))).unwrap();

        let resealed = rotated.reseal(&stale).unwrap();
        let resealed = resealed.expect("stale blob must be rewritten");
        assert_eq!(rotated.decrypt(&resealed).unwrap(), b"payload");

        // Already current: no rewrite
        assert!(rotated.reseal(&resealed).unwrap().is_none());
    }

    #[test]
    fn test_decrypt_tampered_data() {
        let vault = CredentialVault::from_hex(&hex_key(0x11), None).unwrap();
        let mut sealed = vault.encrypt(b"secret message").unwrap();

        if let Some(byte) = sealed.last_mut() {
            *byte ^= 0xFF;
        }

        assert!(vault.decrypt(&sealed).is_err());
    }

    #[test]
    fn test_decrypt_unsupported_version() {
        let vault = CredentialVault::from_hex(&hex_key(0x11), None).unwrap();
        let bogus = vec![0x7f_u8, 0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12];
        assert!(matches!(
            vault.decrypt(&bogus),
            Err(VaultError::UnsupportedVersion(0x7f))
        ));
    }

    #[test]
    fn test_decrypt_too_short() {
        let vault = CredentialVault::from_hex(&hex_key(0x11), None).unwrap();
        assert!(vault.decrypt(&[VERSION_AES_GCM, 0, 1, 2]).is_err());
        assert!(vault.decrypt(&[]).is_err());
    }

    #[test]
    fn test_self_test() {
        let vault = CredentialVault::from_hex(&hex_key(0x11), None).unwrap();
        assert!(vault.self_test().is_ok());
    }

    #[test]
    fn test_decrypt_string_round_trip() {
        let vault = CredentialVault::from_hex(&hex_key(0x11), None).unwrap();
        let secret = SecretString::from(r#"{"api_key":"k"}"#.to_string());
        let sealed = encrypt_credentials(&vault, &secret).unwrap();
        let opened = vault.decrypt_string(&sealed).unwrap();
        assert_eq!(opened.expose_secret(), secret.expose_secret());
    }

    #[test]
    fn test_fingerprint_shape() {
        let vault = CredentialVault::from_hex(&hex_key(0x11), None).unwrap();
        let fingerprint = vault.fingerprint();
        assert_eq!(fingerprint.len(), 16);
        assert!(fingerprint.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
