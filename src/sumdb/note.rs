//! Signed note verification.
//!
//! The checksum database signs its tree head as a "note": a text body, a
//! blank line, then signature lines of the form
//! `— <name> base64(key-hash ‖ ed25519-signature)`. Verifier keys are
//! distributed as `<name>+<key-hash-hex>+base64(algorithm ‖ public-key)`.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use ed25519_dalek::{Signature, Verifier, VerifyingKey};
use sha2::{Digest, Sha256};

use super::SumDbError;

/// Signature line marker, an em dash plus space.
const SIG_PREFIX: &str = "\u{2014} ";

/// Algorithm identifier for Ed25519 keys.
const ALG_ED25519: u8 = 1;

/// A parsed verifier key.
pub struct VerifierKey {
    pub name: String,
    hash: [u8; 4],
    key: VerifyingKey,
}

impl VerifierKey {
    /// Parse a `name+hhhhhhhh+base64` verifier key string.
    pub fn parse(s: &str) -> Result<Self, SumDbError> {
        let invalid = || SumDbError::InvalidVerifierKey(s.to_string());

        let mut parts = s.splitn(3, '+');
        let (name, hash_hex, key_b64) = match (parts.next(), parts.next(), parts.next()) {
            (Some(n), Some(h), Some(k)) if !n.is_empty() => (n, h, k),
            _ => return Err(invalid()),
        };

        let hash_bytes = hex::decode(hash_hex).map_err(|_| invalid())?;
        let hash: [u8; 4] = hash_bytes.as_slice().try_into().map_err(|_| invalid())?;

        let key_bytes = BASE64.decode(key_b64).map_err(|_| invalid())?;
        if key_bytes.len() != 33 || key_bytes[0] != ALG_ED25519 {
            return Err(invalid());
        }
        let key = VerifyingKey::from_bytes(key_bytes[1..].try_into().unwrap())
            .map_err(|_| invalid())?;

        // The advertised hash must match the key material it names.
        if key_hash(name, &key_bytes) != hash {
            return Err(invalid());
        }

        Ok(Self {
            name: name.to_string(),
            hash,
            key,
        })
    }
}

/// First four bytes of SHA-256 over `name`, a newline, and the key bytes.
fn key_hash(name: &str, key_bytes: &[u8]) -> [u8; 4] {
    let mut hasher = Sha256::new();
    hasher.update(name.as_bytes());
    hasher.update(b"\n");
    hasher.update(key_bytes);
    let digest = hasher.finalize();
    digest[..4].try_into().unwrap()
}

/// Verify a signed note and return its text body.
///
/// The note must carry at least one signature from `key` that checks out;
/// signatures from other signers are ignored.
pub fn open(msg: &[u8], key: &VerifierKey) -> Result<String, SumDbError> {
    let msg = std::str::from_utf8(msg).map_err(|_| SumDbError::MalformedNote)?;

    let split = msg.rfind("\n\n").ok_or(SumDbError::MalformedNote)?;
    let (text, sigs) = (&msg[..split + 1], &msg[split + 2..]);
    if !text.ends_with('\n') {
        return Err(SumDbError::MalformedNote);
    }

    for line in sigs.lines() {
        let Some(rest) = line.strip_prefix(SIG_PREFIX) else {
            return Err(SumDbError::MalformedNote);
        };
        let Some((name, sig_b64)) = rest.split_once(' ') else {
            return Err(SumDbError::MalformedNote);
        };

        if name != key.name {
            continue;
        }

        let raw = BASE64
            .decode(sig_b64)
            .map_err(|_| SumDbError::MalformedNote)?;
        if raw.len() != 4 + 64 || raw[..4] != key.hash {
            continue;
        }

        let signature = Signature::from_bytes(raw[4..].try_into().unwrap());
        if key.key.verify(text.as_bytes(), &signature).is_ok() {
            return Ok(text.to_string());
        }
    }

    Err(SumDbError::UnverifiedNote(key.name.clone()))
}

/// Render a signed note. The serving side of the format; the test suite
/// uses it to stand up fake logs.
pub fn sign(text: &str, name: &str, signing_key: &ed25519_dalek::SigningKey) -> String {
    use ed25519_dalek::Signer;

    let key_bytes: Vec<u8> = std::iter::once(ALG_ED25519)
        .chain(signing_key.verifying_key().to_bytes())
        .collect();
    let hash = key_hash(name, &key_bytes);

    let sig = signing_key.sign(text.as_bytes());
    let mut raw = hash.to_vec();
    raw.extend_from_slice(&sig.to_bytes());

    format!("{text}\n{SIG_PREFIX}{name} {}\n", BASE64.encode(raw))
}

/// Render the verifier key string for a signing key.
pub fn verifier_key_string(name: &str, signing_key: &ed25519_dalek::SigningKey) -> String {
    let key_bytes: Vec<u8> = std::iter::once(ALG_ED25519)
        .chain(signing_key.verifying_key().to_bytes())
        .collect();
    let hash = key_hash(name, &key_bytes);
    format!("{name}+{}+{}", hex::encode(hash), BASE64.encode(&key_bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ed25519_dalek::SigningKey;

    fn test_key() -> SigningKey {
        SigningKey::from_bytes(&[7u8; 32])
    }

    #[test]
    fn parses_the_public_log_key() {
        let key = VerifierKey::parse(super::super::DEFAULT_VERIFIER_KEY).unwrap();
        assert_eq!(key.name, "sum.golang.org");
        assert_eq!(key.hash, [0x03, 0x3d, 0xe0, 0xae]);
    }

    #[test]
    fn rejects_tampered_key_hash() {
        let bad = super::super::DEFAULT_VERIFIER_KEY.replacen("033de0ae", "033de0af", 1);
        assert!(VerifierKey::parse(&bad).is_err());
    }

    #[test]
    fn signs_and_opens_round_trip() {
        let sk = test_key();
        let vkey = VerifierKey::parse(&verifier_key_string("test.log", &sk)).unwrap();

        let text = "go.sum database tree\n42\nSOMEHASH\n";
        let note = sign(text, "test.log", &sk);
        assert_eq!(open(note.as_bytes(), &vkey).unwrap(), text);
    }

    #[test]
    fn rejects_modified_text() {
        let sk = test_key();
        let vkey = VerifierKey::parse(&verifier_key_string("test.log", &sk)).unwrap();

        let note = sign("go.sum database tree\n42\nSOMEHASH\n", "test.log", &sk);
        let tampered = note.replacen("42", "43", 1);
        assert!(matches!(
            open(tampered.as_bytes(), &vkey),
            Err(SumDbError::UnverifiedNote(_))
        ));
    }

    #[test]
    fn ignores_signatures_from_other_signers() {
        let sk = test_key();
        let other = SigningKey::from_bytes(&[9u8; 32]);
        let vkey = VerifierKey::parse(&verifier_key_string("test.log", &sk)).unwrap();

        let note = sign("tree head\n", "other.log", &other);
        assert!(matches!(
            open(note.as_bytes(), &vkey),
            Err(SumDbError::UnverifiedNote(_))
        ));
    }

    #[test]
    fn rejects_noteless_garbage() {
        let sk = test_key();
        let vkey = VerifierKey::parse(&verifier_key_string("test.log", &sk)).unwrap();
        assert!(open(b"no blank line here", &vkey).is_err());
    }
}
