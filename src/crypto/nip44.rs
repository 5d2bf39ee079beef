//! NIP-44 v2 authenticated encryption: ECDH + HKDF conversation keys,
//! ChaCha20 + HMAC-SHA256 framed ciphertexts with length padding.
//!
//! This is a from-scratch construction (not delegated to a higher-level
//! Nostr crate) because interop depends on matching the exact byte layout:
//! `base64(0x02 || nonce[32] || ciphertext || mac[32])`, with the
//! plaintext padded to a power-of-two-derived bucket size before
//! encryption. Deviating from any of this breaks decryption on the peer.

use chacha20::cipher::{KeyIvInit, StreamCipher};
use hkdf::Hkdf;
use hmac::{Hmac, Mac};
use secp256k1::ecdh::shared_secret_point;
use secp256k1::SecretKey;
use sha2::Sha256;
use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

use super::error::{Error, Result};
use super::keys::full_pubkey;

type HmacSha256 = Hmac<Sha256>;
type ChaCha20 = chacha20::ChaCha20;

const MIN_PLAINTEXT_LEN: usize = 1;
const MAX_PLAINTEXT_LEN: usize = 65535;
const MIN_PAYLOAD_B64_LEN: usize = 132;
const MAX_PAYLOAD_B64_LEN: usize = 87472;
const MIN_DECODED_LEN: usize = 99;
const MAX_DECODED_LEN: usize = 65603;
const VERSION: u8 = 0x02;

/// Derives the 32-byte conversation key `K(sk, pk) = HKDF(ECDH(sk, pk))`.
///
/// Symmetric: `conversation_key(a_sk, b_pk) == conversation_key(b_sk, a_pk)`.
///
/// # Errors
///
/// Returns [`Error::InvalidSecretKey`]/[`Error::InvalidPublicKey`] if either
/// key is malformed.
pub fn conversation_key(sk_bytes: &[u8; 32], pk_bytes: &[u8; 32]) -> Result<Zeroizing<[u8; 32]>> {
    let secret_key = SecretKey::from_slice(sk_bytes).map_err(|e| Error::InvalidSecretKey(e.to_string()))?;
    let public_key = full_pubkey(pk_bytes)?;
    let point = shared_secret_point(&public_key, &secret_key);
    let shared_x = &point[0..32];
    let hk = Hkdf::<Sha256>::new(Some(b"nip44-v2"), shared_x);
    let mut key = Zeroizing::new([0u8; 32]);
    hk.expand(&[], key.as_mut())
        .map_err(|_| Error::EncryptionFailed("HKDF expand failed for conversation key".to_string()))?;
    Ok(key)
}

fn message_keys(conversation_key: &[u8; 32], nonce: &[u8; 32]) -> Result<([u8; 32], [u8; 12], [u8; 32])> {
    let hk = Hkdf::<Sha256>::new(Some(conversation_key), &[]);
    let mut keys = [0u8; 76];
    hk.expand(nonce, &mut keys)
        .map_err(|_| Error::EncryptionFailed("HKDF expand failed for message keys".to_string()))?;
    let mut chacha_key = [0u8; 32];
    chacha_key.copy_from_slice(&keys[0..32]);
    let mut chacha_nonce = [0u8; 12];
    chacha_nonce.copy_from_slice(&keys[32..44]);
    let mut hmac_key = [0u8; 32];
    hmac_key.copy_from_slice(&keys[44..76]);
    Ok((chacha_key, chacha_nonce, hmac_key))
}

fn calc_padded_len(unpadded_len: usize) -> Result<usize> {
    if unpadded_len < MIN_PLAINTEXT_LEN {
        return Err(Error::EncryptionFailed("plaintext must be at least 1 byte".to_string()));
    }
    if unpadded_len > MAX_PLAINTEXT_LEN {
        return Err(Error::EncryptionFailed("plaintext must be at most 65535 bytes".to_string()));
    }
    if unpadded_len <= 32 {
        return Ok(32);
    }
    let next_power = 1usize << (usize::BITS - (unpadded_len - 1).leading_zeros());
    let chunk = if next_power <= 256 { 32 } else { next_power / 8 };
    Ok(chunk * (((unpadded_len - 1) / chunk) + 1))
}

fn pad(plaintext: &[u8]) -> Result<Vec<u8>> {
    let padded_len = calc_padded_len(plaintext.len())?;
    let mut padded = Vec::with_capacity(2 + padded_len);
    padded.push((plaintext.len() >> 8) as u8);
    padded.push((plaintext.len() & 0xff) as u8);
    padded.extend_from_slice(plaintext);
    padded.resize(2 + padded_len, 0);
    Ok(padded)
}

fn unpad(padded: &[u8]) -> Result<Vec<u8>> {
    if padded.len() < 2 {
        return Err(Error::DecryptionFailed("padded data too short".to_string()));
    }
    let unpadded_len = (usize::from(padded[0]) << 8) | usize::from(padded[1]);
    if unpadded_len == 0 {
        return Err(Error::DecryptionFailed("invalid padding: zero length".to_string()));
    }
    if 2 + unpadded_len > padded.len() {
        return Err(Error::DecryptionFailed("invalid padding: length exceeds data".to_string()));
    }
    let expected = calc_padded_len(unpadded_len)?;
    if padded.len() != 2 + expected {
        return Err(Error::DecryptionFailed("invalid padding: unexpected padded size".to_string()));
    }
    Ok(padded[2..2 + unpadded_len].to_vec())
}

fn hmac_aad(hmac_key: &[u8; 32], message: &[u8], aad: &[u8; 32]) -> Result<[u8; 32]> {
    let mut mac =
        HmacSha256::new_from_slice(hmac_key).map_err(|_| Error::EncryptionFailed("HMAC key error".to_string()))?;
    mac.update(aad);
    mac.update(message);
    let result = mac.finalize().into_bytes();
    let mut out = [0u8; 32];
    out.copy_from_slice(&result);
    Ok(out)
}

/// Encrypts `plaintext` under `key`, returning
/// `base64(0x02 || nonce[32] || ciphertext || mac[32])`.
///
/// # Errors
///
/// Returns [`Error::EncryptionFailed`] if `plaintext` is empty or exceeds
/// 65535 bytes.
pub fn encrypt(plaintext: &[u8], key: &[u8; 32]) -> Result<String> {
    if plaintext.is_empty() || plaintext.len() > MAX_PLAINTEXT_LEN {
        return Err(Error::EncryptionFailed("plaintext length out of range (1..65535)".to_string()));
    }
    let nonce: [u8; 32] = rand::random();
    let (chacha_key, chacha_nonce, hmac_key) = message_keys(key, &nonce)?;
    let mut ciphertext = pad(plaintext)?;
    let mut cipher = ChaCha20::new((&chacha_key).into(), (&chacha_nonce).into());
    cipher.apply_keystream(&mut ciphertext);
    let mac = hmac_aad(&hmac_key, &ciphertext, &nonce)?;

    let mut payload = Vec::with_capacity(1 + 32 + ciphertext.len() + 32);
    payload.push(VERSION);
    payload.extend_from_slice(&nonce);
    payload.extend_from_slice(&ciphertext);
    payload.extend_from_slice(&mac);
    Ok(base64::Engine::encode(&base64::engine::general_purpose::STANDARD, &payload))
}

/// Decrypts a payload produced by [`encrypt`] under `key`.
///
/// # Errors
///
/// Returns [`Error::DecryptionFailed`] on wrong key, corruption, an
/// out-of-range length, or an unknown version byte. Fails closed: a
/// tampered MAC is rejected in constant time.
pub fn decrypt(payload: &str, key: &[u8; 32]) -> Result<Vec<u8>> {
    if payload.is_empty() {
        return Err(Error::DecryptionFailed("empty payload".to_string()));
    }
    if payload.starts_with('#') {
        return Err(Error::DecryptionFailed("unsupported encryption version marker".to_string()));
    }
    let plen = payload.len();
    if !(MIN_PAYLOAD_B64_LEN..=MAX_PAYLOAD_B64_LEN).contains(&plen) {
        return Err(Error::DecryptionFailed("invalid payload size".to_string()));
    }
    let data = base64::Engine::decode(&base64::engine::general_purpose::STANDARD, payload)
        .map_err(|e| Error::DecryptionFailed(format!("invalid base64: {e}")))?;
    let dlen = data.len();
    if !(MIN_DECODED_LEN..=MAX_DECODED_LEN).contains(&dlen) {
        return Err(Error::DecryptionFailed("invalid decoded data size".to_string()));
    }
    if data[0] != VERSION {
        return Err(Error::DecryptionFailed(format!("unknown encryption version: {}", data[0])));
    }
    let nonce: [u8; 32] = data[1..33]
        .try_into()
        .map_err(|_| Error::DecryptionFailed("invalid nonce".to_string()))?;
    let ciphertext = &data[33..dlen - 32];
    let mac: [u8; 32] = data[dlen - 32..dlen]
        .try_into()
        .map_err(|_| Error::DecryptionFailed("invalid mac".to_string()))?;

    let (chacha_key, chacha_nonce, hmac_key) = message_keys(key, &nonce)?;
    let expected_mac = hmac_aad(&hmac_key, ciphertext, &nonce)?;
    if expected_mac.ct_eq(&mac).unwrap_u8() != 1 {
        return Err(Error::DecryptionFailed("invalid mac".to_string()));
    }

    let mut padded = ciphertext.to_vec();
    let mut cipher = ChaCha20::new((&chacha_key).into(), (&chacha_nonce).into());
    cipher.apply_keystream(&mut padded);
    unpad(&padded)
}
