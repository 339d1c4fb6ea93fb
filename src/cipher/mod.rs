//! AES, Base64 and MD5 helpers.
//!
//! AES runs in ECB mode with PKCS7 padding and exchanges ciphertext as
//! standard base64, which matches what browser-side crypto libraries emit by
//! default.

use aes::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyInit};
use aes::{Aes128, Aes192, Aes256};
use base64::{engine::general_purpose::STANDARD, Engine};

use crate::core::{ProKitError, ProKitResult};

type Aes128EcbEnc = ecb::Encryptor<Aes128>;
type Aes192EcbEnc = ecb::Encryptor<Aes192>;
type Aes256EcbEnc = ecb::Encryptor<Aes256>;
type Aes128EcbDec = ecb::Decryptor<Aes128>;
type Aes192EcbDec = ecb::Decryptor<Aes192>;
type Aes256EcbDec = ecb::Decryptor<Aes256>;

/// AES-ECB cipher keyed by a UTF-8 string
#[derive(Clone)]
pub struct AesEncryption {
    key: Vec<u8>,
}

impl std::fmt::Debug for AesEncryption {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AesEncryption")
            .field("key_bits", &(self.key.len() * 8))
            .finish()
    }
}

impl AesEncryption {
    /// Creates a cipher. The key length picks AES-128, AES-192 or AES-256.
    pub fn new(key: &str) -> ProKitResult<Self> {
        match key.len() {
            16 | 24 | 32 => Ok(Self {
                key: key.as_bytes().to_vec(),
            }),
            len => Err(ProKitError::Cipher(format!(
                "AES key must be 16, 24 or 32 bytes, got {len}"
            ))),
        }
    }

    /// Encrypts text, returning base64 ciphertext.
    pub fn encrypt_by_aes(&self, plain_text: &str) -> ProKitResult<String> {
        let plain = plain_text.as_bytes();
        let cipher = match self.key.len() {
            16 => Aes128EcbEnc::new_from_slice(&self.key)
                .map(|c| c.encrypt_padded_vec_mut::<Pkcs7>(plain)),
            24 => Aes192EcbEnc::new_from_slice(&self.key)
                .map(|c| c.encrypt_padded_vec_mut::<Pkcs7>(plain)),
            _ => Aes256EcbEnc::new_from_slice(&self.key)
                .map(|c| c.encrypt_padded_vec_mut::<Pkcs7>(plain)),
        }
        .map_err(|e| ProKitError::Cipher(e.to_string()))?;

        Ok(STANDARD.encode(cipher))
    }

    /// Decrypts base64 ciphertext back to text.
    pub fn decrypt_by_aes(&self, cipher_text: &str) -> ProKitResult<String> {
        let cipher = STANDARD.decode(cipher_text.trim())?;
        let plain = match self.key.len() {
            16 => Aes128EcbDec::new_from_slice(&self.key)
                .map(|c| c.decrypt_padded_vec_mut::<Pkcs7>(&cipher)),
            24 => Aes192EcbDec::new_from_slice(&self.key)
                .map(|c| c.decrypt_padded_vec_mut::<Pkcs7>(&cipher)),
            _ => Aes256EcbDec::new_from_slice(&self.key)
                .map(|c| c.decrypt_padded_vec_mut::<Pkcs7>(&cipher)),
        }
        .map_err(|e| ProKitError::Cipher(e.to_string()))?
        .map_err(|_| ProKitError::Cipher("Invalid padding, wrong key or corrupt data".to_string()))?;

        Ok(String::from_utf8(plain)?)
    }
}

/// Encodes text as standard base64.
pub fn encrypt_by_base64(text: &str) -> String {
    STANDARD.encode(text.as_bytes())
}

/// Decodes standard base64 into UTF-8 text.
pub fn decrypt_by_base64(cipher_text: &str) -> ProKitResult<String> {
    let bytes = STANDARD.decode(cipher_text.trim())?;
    Ok(String::from_utf8(bytes)?)
}

/// Lowercase hex MD5 digest of `text`.
pub fn encrypt_by_md5(text: &str) -> String {
    format!("{:x}", md5::compute(text.as_bytes()))
}
