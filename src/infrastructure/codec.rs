//! Payment-detail token codec.
//!
//! A token is `ivHex.ciphertextBase64.keySegment`: the JSON-serialized details
//! encrypted with AES-256-CBC (PKCS#7) under a fresh random 16-byte IV and a
//! fresh random 32-byte data key.
//!
//! SECURITY: in embedded mode the key segment is the data key itself (64 hex
//! chars). The key travels with the ciphertext, so anyone who can read the
//! stored record can decrypt it; confidentiality rests entirely on who may
//! read the record.
//!
//! In envelope mode the key segment is the data key sealed with AES-256-GCM
//! under a master key that never leaves the process (`hex(nonce || sealed)`,
//! 120 hex chars), with the IV as associated data. Decryption accepts both
//! shapes so tokens written in embedded mode stay readable.

use crate::domain::payment::{PaymentDetails, SealedPayload};
use crate::domain::ports::PayloadCipher;
use crate::error::{DecryptError, LedgerError, Result};
use aes::Aes256;
use aes_gcm::aead::{Aead, KeyInit, Payload};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use cbc::cipher::block_padding::Pkcs7;
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use rand::RngCore;
use rand::rngs::OsRng;
use std::fmt;
use zeroize::Zeroizing;

type Aes256CbcEnc = cbc::Encryptor<Aes256>;
type Aes256CbcDec = cbc::Decryptor<Aes256>;

pub const IV_LEN: usize = 16;
pub const KEY_LEN: usize = 32;
const NONCE_LEN: usize = 12;
const TAG_LEN: usize = 16;
const SEALED_KEY_LEN: usize = NONCE_LEN + KEY_LEN + TAG_LEN;

/// Key used to seal per-token data keys in envelope mode.
#[derive(Clone)]
pub struct MasterKey(Zeroizing<[u8; KEY_LEN]>);

impl MasterKey {
    pub fn new(bytes: [u8; KEY_LEN]) -> Self {
        Self(Zeroizing::new(bytes))
    }

    /// Parses a 64-character hex string.
    pub fn from_hex(encoded: &str) -> Result<Self> {
        let raw = Zeroizing::new(hex::decode(encoded.trim()).map_err(|_| {
            LedgerError::ValidationError("Master key must be hex encoded".to_string())
        })?);
        let bytes: [u8; KEY_LEN] = raw.as_slice().try_into().map_err(|_| {
            LedgerError::ValidationError(format!("Master key must be {} bytes", KEY_LEN))
        })?;
        Ok(Self::new(bytes))
    }

    pub fn generate() -> Self {
        let mut bytes = [0u8; KEY_LEN];
        OsRng.fill_bytes(&mut bytes);
        Self::new(bytes)
    }

    fn cipher(&self) -> Aes256Gcm {
        Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&self.0[..]))
    }
}

impl fmt::Debug for MasterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("MasterKey(<redacted>)")
    }
}

/// AES-256-CBC token codec implementing [`PayloadCipher`].
#[derive(Debug, Clone, Default)]
pub struct TokenCodec {
    master_key: Option<MasterKey>,
}

impl TokenCodec {
    /// Legacy mode: the data key is stored in the token in clear.
    pub fn embedded() -> Self {
        Self { master_key: None }
    }

    /// Envelope mode: the data key is sealed under `master_key`.
    pub fn enveloped(master_key: MasterKey) -> Self {
        Self {
            master_key: Some(master_key),
        }
    }

    pub fn is_enveloped(&self) -> bool {
        self.master_key.is_some()
    }

    fn encode_key(&self, key: &[u8; KEY_LEN], iv: &[u8; IV_LEN]) -> Result<String> {
        let Some(master) = &self.master_key else {
            return Ok(hex::encode(key));
        };
        let mut nonce = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce);
        let sealed = master
            .cipher()
            .encrypt(
                Nonce::from_slice(&nonce),
                Payload {
                    msg: key.as_slice(),
                    aad: iv.as_slice(),
                },
            )
            .map_err(|_| {
                LedgerError::InternalError(Box::new(std::io::Error::other(
                    "Failed to seal data key",
                )))
            })?;
        let mut segment = Vec::with_capacity(SEALED_KEY_LEN);
        segment.extend_from_slice(&nonce);
        segment.extend_from_slice(&sealed);
        Ok(hex::encode(segment))
    }

    fn decode_key(
        &self,
        segment: &str,
        iv: &[u8],
    ) -> std::result::Result<Zeroizing<Vec<u8>>, DecryptError> {
        let raw = Zeroizing::new(hex::decode(segment).map_err(|_| DecryptError::DecodeFailure)?);
        match raw.len() {
            KEY_LEN => Ok(raw),
            SEALED_KEY_LEN => {
                let Some(master) = &self.master_key else {
                    tracing::debug!("Sealed data key found but no master key is configured");
                    return Err(DecryptError::DecodeFailure);
                };
                let (nonce, sealed) = raw.split_at(NONCE_LEN);
                master
                    .cipher()
                    .decrypt(Nonce::from_slice(nonce), Payload { msg: sealed, aad: iv })
                    .map(Zeroizing::new)
                    .map_err(|_| DecryptError::DecodeFailure)
            }
            _ => Err(DecryptError::DecodeFailure),
        }
    }
}

impl PayloadCipher for TokenCodec {
    fn seal(&self, details: &PaymentDetails) -> Result<SealedPayload> {
        let plaintext = Zeroizing::new(serde_json::to_vec(details)?);

        let mut iv = [0u8; IV_LEN];
        OsRng.fill_bytes(&mut iv);
        let mut key = Zeroizing::new([0u8; KEY_LEN]);
        OsRng.fill_bytes(&mut key[..]);

        let ciphertext = Aes256CbcEnc::new_from_slices(key.as_slice(), &iv)
            .map_err(|e| {
                LedgerError::InternalError(Box::new(std::io::Error::other(e.to_string())))
            })?
            .encrypt_padded_vec_mut::<Pkcs7>(&plaintext);

        let token = format!(
            "{}.{}.{}",
            hex::encode(iv),
            STANDARD.encode(ciphertext),
            self.encode_key(&key, &iv)?
        );
        Ok(SealedPayload::new(token))
    }

    fn open(&self, token: &SealedPayload) -> std::result::Result<PaymentDetails, DecryptError> {
        let parts: Vec<&str> = token.as_str().split('.').collect();
        let [iv_hex, ciphertext_b64, key_segment] = parts.as_slice() else {
            return Err(DecryptError::MalformedToken);
        };
        if iv_hex.is_empty() || ciphertext_b64.is_empty() || key_segment.is_empty() {
            return Err(DecryptError::MalformedToken);
        }

        let iv = hex::decode(iv_hex).map_err(|_| DecryptError::DecodeFailure)?;
        if iv.len() != IV_LEN {
            return Err(DecryptError::DecodeFailure);
        }
        let ciphertext = STANDARD
            .decode(ciphertext_b64)
            .map_err(|_| DecryptError::DecodeFailure)?;
        let key = self.decode_key(key_segment, &iv)?;

        let plaintext = Zeroizing::new(
            Aes256CbcDec::new_from_slices(key.as_slice(), &iv)
                .map_err(|_| DecryptError::DecodeFailure)?
                .decrypt_padded_vec_mut::<Pkcs7>(&ciphertext)
                .map_err(|_| DecryptError::DecodeFailure)?,
        );
        let text = std::str::from_utf8(&plaintext).map_err(|_| DecryptError::DecodeFailure)?;
        if text.is_empty() {
            return Err(DecryptError::DecodeFailure);
        }
        serde_json::from_str(text).map_err(|_| DecryptError::DecodeFailure)
    }
}
