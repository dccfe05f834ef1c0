use chacha20poly1305::{
    aead::{Aead, AeadCore, KeyInit, OsRng},
    XChaCha20Poly1305, XNonce
};
use serde_derive::{Serialize, Deserialize};
use crate::base64;
use crate::errors::AppError;

const KEY_LENGTH: usize = 32;
const NONCE_LENGTH: usize = 24;

#[derive(Serialize, Deserialize, Debug)]
pub struct EncryptedData {
    pub nonce: String,
    pub data: String,
}

/// Seals access tokens before they are written to the token store.
#[derive(Clone)]
pub struct Encryption {
    cipher: XChaCha20Poly1305,
}

impl Encryption {
    pub fn new(key: &[u8]) -> Result<Encryption, AppError> {
        let cipher = XChaCha20Poly1305::new_from_slice(key)
            .map_err(|_| AppError::ConfigError(format!("encryption key must be {} bytes, got {}", KEY_LENGTH, key.len())))?;

        Ok(Encryption { cipher })
    }

    pub fn with(key_base64: &str) -> Result<Encryption, AppError> {
        let key = base64::decode_lenient(key_base64)
            .map_err(|err| AppError::ConfigError(format!("encryption key is not valid base64: {}", err)))?;

        Encryption::new(&key)
    }

    pub fn encrypt(&self, plaintext: &str) -> Result<EncryptedData, AppError> {
        let nonce = XChaCha20Poly1305::generate_nonce(&mut OsRng); // 192-bits; unique per message
        let ciphertext = self.cipher.encrypt(&nonce, plaintext.as_bytes())?;

        Ok(EncryptedData{
            nonce: base64::encode_no_pad(nonce.as_slice()),
            data: base64::encode_no_pad(&ciphertext),
        })
    }

    pub fn decrypt(&self, encrypted_data: &EncryptedData) -> Result<String, AppError> {
        let nonce_bytes = base64::decode_no_pad(encrypted_data.nonce.as_ref())?;
        if nonce_bytes.len() != NONCE_LENGTH {
            return Err(AppError::UnexpectedError(format!("invalid nonce length {}", nonce_bytes.len())));
        }
        let encrypted = base64::decode_no_pad(encrypted_data.data.as_ref())?;

        let nonce = XNonce::from_slice(nonce_bytes.as_slice());
        let plaintext = self.cipher.decrypt(nonce, encrypted.as_slice())?;

        String::from_utf8(plaintext)
            .map_err(|err| AppError::UnexpectedError(format!("decrypted token is not UTF-8: {}", err)))
    }

    pub fn seal(&self, plaintext: &str) -> Result<String, AppError> {
        Ok(serde_json::to_string(&self.encrypt(plaintext)?)?)
    }

    pub fn open(&self, sealed: &str) -> Result<String, AppError> {
        let encrypted: EncryptedData = serde_json::from_str(sealed)?;
        self.decrypt(&encrypted)
    }
}
