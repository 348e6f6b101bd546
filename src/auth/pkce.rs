//! Usage: PKCE verifier/challenge generation for the Streamlabs authorization flow.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::RngCore;
use sha2::{Digest, Sha256};

const VERIFIER_RANDOM_BYTES: usize = 64;

#[derive(Debug, Clone)]
pub struct PkcePair {
    pub code_verifier: String,
    pub code_challenge: String,
}

/// One pair per acquisition attempt; the verifier never leaves the process
/// until the code exchange.
pub fn generate_pkce_pair() -> PkcePair {
    let mut random = [0u8; VERIFIER_RANDOM_BYTES];
    rand::thread_rng().fill_bytes(&mut random);
    // Hex keeps the verifier inside the RFC 7636 unreserved character set.
    let code_verifier = hex::encode(random);
    let code_challenge = code_challenge_s256(&code_verifier);
    PkcePair {
        code_verifier,
        code_challenge,
    }
}

/// S256: unpadded base64url of SHA-256 over the verifier string's bytes.
pub fn code_challenge_s256(code_verifier: &str) -> String {
    let digest = Sha256::digest(code_verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(digest)
}
