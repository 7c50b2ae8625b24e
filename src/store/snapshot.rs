//! Persisted state layout for the in-process store (§6).
//!
//! A single binary file: 4-byte magic `DMP1`, a 12-byte AES-GCM nonce, then
//! the AES-256-GCM ciphertext of the bincode-encoded document set. Bytes,
//! tuples, and sets round-trip exactly because [`crate::value::Value`]
//! tags them as distinct enum variants rather than collapsing them into
//! JSON arrays.

use crate::error::{GatewayError, Result};
use crate::value::Value;
use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use hkdf::Hkdf;
use sha2::Sha256;
use std::collections::{BTreeMap, HashMap};

const MAGIC: &[u8; 4] = b"DMP1";
const MIN_PASSPHRASE_LEN: usize = 16;

fn derive_key(passphrase: &str) -> Result<[u8; 32]> {
    if passphrase.len() < MIN_PASSPHRASE_LEN {
        return Err(GatewayError::Configuration(format!(
            "encryption passphrase must be at least {MIN_PASSPHRASE_LEN} bytes"
        )));
    }
    let hk = Hkdf::<Sha256>::new(None, passphrase.as_bytes());
    let mut okm = [0u8; 32];
    hk.expand(b"gatewright-snapshot", &mut okm)
        .map_err(|e| GatewayError::Encryption(e.to_string()))?;
    Ok(okm)
}

pub fn dump(
    collections: &HashMap<String, Vec<BTreeMap<String, Value>>>,
    passphrase: &str,
) -> Result<Vec<u8>> {
    let key_bytes = derive_key(passphrase)?;
    let key = Key::<Aes256Gcm>::from_slice(&key_bytes);
    let cipher = Aes256Gcm::new(key);

    let plaintext = bincode::serde::encode_to_vec(collections, bincode::config::standard())?;

    let nonce_bytes: [u8; 12] = rand_nonce();
    let nonce = Nonce::from_slice(&nonce_bytes);
    let ciphertext = cipher
        .encrypt(nonce, plaintext.as_ref())
        .map_err(|e| GatewayError::Encryption(e.to_string()))?;

    let mut out = Vec::with_capacity(4 + 12 + ciphertext.len());
    out.extend_from_slice(MAGIC);
    out.extend_from_slice(&nonce_bytes);
    out.extend_from_slice(&ciphertext);
    Ok(out)
}

pub fn restore(
    bytes: &[u8],
    passphrase: &str,
) -> Result<HashMap<String, Vec<BTreeMap<String, Value>>>> {
    if bytes.len() < 4 + 12 || &bytes[0..4] != MAGIC {
        return Err(GatewayError::Validation("malformed snapshot: bad magic".into()));
    }
    let key_bytes = derive_key(passphrase)?;
    let key = Key::<Aes256Gcm>::from_slice(&key_bytes);
    let cipher = Aes256Gcm::new(key);

    let nonce = Nonce::from_slice(&bytes[4..16]);
    let ciphertext = &bytes[16..];
    let plaintext = cipher
        .decrypt(nonce, ciphertext)
        .map_err(|e| GatewayError::Encryption(e.to_string()))?;

    let (collections, _): (HashMap<String, Vec<BTreeMap<String, Value>>>, usize) =
        bincode::serde::decode_from_slice(&plaintext, bincode::config::standard())?;
    Ok(collections)
}

fn rand_nonce() -> [u8; 12] {
    use rand::RngCore;
    let mut buf = [0u8; 12];
    rand::rng().fill_bytes(&mut buf);
    buf
}
