// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Checksum & payload codec.
//!
//! Canonicalises a change set's changes before hashing so cosmetic edits
//! (key order, whitespace) don't trigger a spurious re-run, and
//! encrypts/decrypts the persisted change payload with a node-wide secret.

use crate::model::{Change, GraphChange, RegistryChange, SearchChange};
use aes::cipher::block_padding::Pkcs7;
use aes::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use base64::Engine;
use rand::RngCore;
use serde_json::Value;
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Current checksum version prefix. New checksums are always computed and
/// stored with this prefix.
pub const CHECKSUM_VERSION: &str = "2";
/// Legacy prefix written when an operator force-marks a row EXECUTED.
pub const CHECKSUM_VERSION_FORCED: &str = "0";

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("invalid secret key length: expected 16, 24, or 32 bytes, got {0}")]
    InvalidKeyLength(usize),
    #[error("invalid base64 secret: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("msgpack encode error: {0}")]
    MsgpackEncode(#[from] rmp_serde::encode::Error),
    #[error("msgpack decode error: {0}")]
    MsgpackDecode(#[from] rmp_serde::decode::Error),
    #[error("ciphertext is shorter than the IV")]
    Truncated,
    #[error("decryption failed: padding or key mismatch")]
    DecryptFailed,
}

/// Canonicalises a single change's content-bearing fields per §4.1, then
/// returns its JSON serialisation (object keys are emitted in sorted order
/// because `serde_json` backs its maps with a `BTreeMap` by default).
fn canonical_json(change: &Change) -> Value {
    match change {
        Change::Registry(c) => {
            let mut c = c.clone();
            canonicalize_registry_field(&mut c);
            serde_json::to_value(&c).unwrap_or(Value::Null)
        }
        Change::Search(c) => {
            let mut c = c.clone();
            if let Some(body) = &c.body {
                c.body = Some(strip_whitespace_and_semicolons(body));
            }
            serde_json::to_value(&c).unwrap_or(Value::Null)
        }
        Change::Graph(c) => {
            let mut c = c.clone();
            c.query = strip_whitespace_and_semicolons(&c.query);
            serde_json::to_value(&c).unwrap_or(Value::Null)
        }
    }
}

fn canonicalize_registry_field(change: &mut RegistryChange) {
    if let Some(format) = change.format {
        if !change.patch_content.is_empty() {
            if let Ok(parsed) = crate::content::parse(&change.patch_content, format) {
                if let Ok(v) = config_value_to_json(&parsed) {
                    change.patch_content = v.to_string();
                }
            }
        }
        if !change.delete_content.is_empty() {
            if let Ok(parsed) = crate::content::parse(&change.delete_content, format) {
                if let Ok(v) = config_value_to_json(&parsed) {
                    change.delete_content = v.to_string();
                }
            }
        }
    }
}

fn config_value_to_json(value: &crate::content::ConfigValue) -> Result<Value, ()> {
    match value {
        crate::content::ConfigValue::Yaml(v) | crate::content::ConfigValue::Json(v) => Ok(v.clone()),
        crate::content::ConfigValue::Properties(m) => {
            serde_json::to_value(m).map_err(|_| ())
        }
        crate::content::ConfigValue::Text(s) => Ok(Value::String(s.clone())),
    }
}

fn strip_whitespace_and_semicolons(s: &str) -> String {
    s.chars().filter(|c| !c.is_whitespace() && *c != ';').collect()
}

fn digest_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex_encode(&hasher.finalize())
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// Computes the versioned checksum of `changes` per §4.1: per-change
/// canonical-JSON SHA-256, concatenated in order, hashed again, prefixed
/// with [`CHECKSUM_VERSION`].
pub fn checksum(changes: &[Change]) -> String {
    let mut concatenated = String::new();
    for change in changes {
        let canonical = canonical_json(change);
        let serialized = serde_json::to_string(&canonical).unwrap_or_default();
        concatenated.push_str(&digest_hex(serialized.as_bytes()));
    }
    format!("{CHECKSUM_VERSION}:{}", digest_hex(concatenated.as_bytes()))
}

/// A stored checksum's version tag and digest, tolerating the legacy
/// bare-digest form with no prefix.
struct StoredChecksum<'a> {
    version: Option<&'a str>,
    digest: &'a str,
}

fn split_stored(stored: &str) -> StoredChecksum<'_> {
    match stored.split_once(':') {
        Some((version, digest)) if version.len() <= 2 && version.chars().all(|c| c.is_ascii_digit()) => {
            StoredChecksum { version: Some(version), digest }
        }
        _ => StoredChecksum { version: None, digest: stored },
    }
}

/// True when `stored` and `computed` represent the same content. Checksums
/// whose version tags differ are tolerated as equal (migration safety);
/// otherwise the digest portion must match exactly.
pub fn checksum_unchanged(stored: &str, computed: &str) -> bool {
    let a = split_stored(stored);
    let b = split_stored(computed);
    if a.version != b.version {
        return true;
    }
    a.digest == b.digest
}

/// Rewrites a checksum for a force-marked row so the next natural run
/// recomputes cleanly (see §4.1).
pub fn force_mark_checksum(digest_from: &str) -> String {
    let digest = split_stored(digest_from).digest.to_string();
    format!("{CHECKSUM_VERSION_FORCED}:{digest}")
}

fn decode_key(secret_b64: &str) -> Result<Vec<u8>, CodecError> {
    let key = base64::engine::general_purpose::STANDARD.decode(secret_b64)?;
    match key.len() {
        16 | 24 | 32 => Ok(key),
        other => Err(CodecError::InvalidKeyLength(other)),
    }
}

fn aes_cbc_encrypt(key: &[u8], iv: &[u8; 16], data: &[u8]) -> Vec<u8> {
    let iv = aes::cipher::generic_array::GenericArray::from_slice(iv);
    match key.len() {
        16 => cbc::Encryptor::<aes::Aes128>::new(aes::cipher::generic_array::GenericArray::from_slice(key), iv)
            .encrypt_padded_vec_mut::<Pkcs7>(data),
        24 => cbc::Encryptor::<aes::Aes192>::new(aes::cipher::generic_array::GenericArray::from_slice(key), iv)
            .encrypt_padded_vec_mut::<Pkcs7>(data),
        _ => cbc::Encryptor::<aes::Aes256>::new(aes::cipher::generic_array::GenericArray::from_slice(key), iv)
            .encrypt_padded_vec_mut::<Pkcs7>(data),
    }
}

fn aes_cbc_decrypt(key: &[u8], iv: &[u8; 16], data: &[u8]) -> Result<Vec<u8>, CodecError> {
    let iv = aes::cipher::generic_array::GenericArray::from_slice(iv);
    let result = match key.len() {
        16 => cbc::Decryptor::<aes::Aes128>::new(aes::cipher::generic_array::GenericArray::from_slice(key), iv)
            .decrypt_padded_vec_mut::<Pkcs7>(data),
        24 => cbc::Decryptor::<aes::Aes192>::new(aes::cipher::generic_array::GenericArray::from_slice(key), iv)
            .decrypt_padded_vec_mut::<Pkcs7>(data),
        _ => cbc::Decryptor::<aes::Aes256>::new(aes::cipher::generic_array::GenericArray::from_slice(key), iv)
            .decrypt_padded_vec_mut::<Pkcs7>(data),
    };
    result.map_err(|_| CodecError::DecryptFailed)
}

/// Packs `changes` for ledger storage: msgpack, then AES-CBC+PKCS7 with a
/// fresh random IV prepended when `secret_b64` is set; bare msgpack
/// otherwise.
pub fn pack(changes: &[Change], secret_b64: Option<&str>) -> Result<Vec<u8>, CodecError> {
    let packed = rmp_serde::to_vec(changes)?;
    match secret_b64 {
        None => Ok(packed),
        Some(secret) => {
            let key = decode_key(secret)?;
            let mut iv = [0u8; 16];
            rand::thread_rng().fill_bytes(&mut iv);
            let mut out = iv.to_vec();
            out.extend(aes_cbc_encrypt(&key, &iv, &packed));
            Ok(out)
        }
    }
}

/// Inverts [`pack`]. Without a secret, or when decryption fails (legacy
/// unencrypted payload written before a secret was configured), falls back
/// to interpreting the bytes as bare msgpack.
pub fn unpack(bytes: &[u8], secret_b64: Option<&str>) -> Result<Vec<Change>, CodecError> {
    if let Some(secret) = secret_b64 {
        if let Ok(key) = decode_key(secret) {
            if bytes.len() > 16 {
                let (iv_bytes, ciphertext) = bytes.split_at(16);
                let mut iv = [0u8; 16];
                iv.copy_from_slice(iv_bytes);
                if let Ok(plain) = aes_cbc_decrypt(&key, &iv, ciphertext) {
                    if let Ok(changes) = rmp_serde::from_slice(&plain) {
                        return Ok(changes);
                    }
                }
            }
        }
    }
    Ok(rmp_serde::from_slice(bytes)?)
}
