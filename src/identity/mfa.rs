//! TOTP-based MFA (§4.4): 30-second step, ±1 step drift tolerance,
//! standard HOTP/TOTP per RFC 6238, adapted from the gateway's MFA manager.

use hmac::{Hmac, Mac};
use rand::RngCore;
use sha1::Sha1;
use std::time::{SystemTime, UNIX_EPOCH};

type HmacSha1 = Hmac<Sha1>;

const STEP_SECONDS: u64 = 30;
const DRIFT_STEPS: i64 = 1;
const CODE_DIGITS: u32 = 6;

pub fn generate_secret() -> Vec<u8> {
    let mut buf = [0u8; 20];
    rand::rng().fill_bytes(&mut buf);
    buf.to_vec()
}

pub fn base32_encode(data: &[u8]) -> String {
    const ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ234567";
    let mut out = String::new();
    let mut bits = 0u32;
    let mut value = 0u32;
    for &byte in data {
        value = (value << 8) | byte as u32;
        bits += 8;
        while bits >= 5 {
            out.push(ALPHABET[((value >> (bits - 5)) & 0x1f) as usize] as char);
            bits -= 5;
        }
    }
    if bits > 0 {
        out.push(ALPHABET[((value << (5 - bits)) & 0x1f) as usize] as char);
    }
    out
}

pub fn otpauth_uri(issuer: &str, username: &str, secret: &[u8]) -> String {
    let encoded_secret = base32_encode(secret);
    format!(
        "otpauth://totp/{issuer}:{username}?secret={encoded_secret}&issuer={issuer}&digits={CODE_DIGITS}&period={STEP_SECONDS}"
    )
}

fn hotp(secret: &[u8], counter: u64) -> u32 {
    let mut mac = HmacSha1::new_from_slice(secret).expect("hmac accepts any key length");
    mac.update(&counter.to_be_bytes());
    let result = mac.finalize().into_bytes();
    let offset = (result[result.len() - 1] & 0x0f) as usize;
    let binary = ((result[offset] as u32 & 0x7f) << 24)
        | ((result[offset + 1] as u32) << 16)
        | ((result[offset + 2] as u32) << 8)
        | (result[offset + 3] as u32);
    binary % 10u32.pow(CODE_DIGITS)
}

fn current_step() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
        / STEP_SECONDS
}

/// Verify a TOTP code allowing `±1` step of clock drift.
pub fn verify_totp(secret: &[u8], code: &str) -> bool {
    let Ok(submitted) = code.parse::<u32>() else { return false };
    let step = current_step();
    for drift in -DRIFT_STEPS..=DRIFT_STEPS {
        let counter = (step as i64 + drift).max(0) as u64;
        if hotp(secret, counter) == submitted {
            return true;
        }
    }
    false
}

pub fn format_code(code: u32) -> String {
    format!("{:0width$}", code, width = CODE_DIGITS as usize)
}
