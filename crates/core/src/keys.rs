//! Key material of a node and the secret two handshaking nodes share.
//!
//! A node holds a random [SecretKey]. When it approves a connection it
//! derives a [SharedSecret] as `HMAC-SHA256(secret_key, peer || nonce)` and
//! ships it inside the approving edge, so both ends hold the same value.

use hmac::Hmac;
use hmac::Mac;
use rand::Rng;
use sha2::Sha256;

use crate::consts::SECRET_KEY_LEN;
use crate::consts::SHARED_SECRET_NONCE_LEN;
use crate::error::Error;
use crate::error::Result;
use crate::identity::Identity;

type HmacSha256 = Hmac<Sha256>;

/// Private key material of a node. Never leaves the node.
#[derive(Clone)]
pub struct SecretKey([u8; SECRET_KEY_LEN]);

impl std::fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "SecretKey(..)")
    }
}

impl SecretKey {
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let mut buf = [0u8; SECRET_KEY_LEN];
        rng.fill(&mut buf[..]);
        Self(buf)
    }

    /// Derive the secret shared with `peer`, salted with `nonce`.
    pub fn shared_secret(&self, peer: &Identity, nonce: &[u8]) -> Result<SharedSecret> {
        let mut mac = HmacSha256::new_from_slice(&self.0).map_err(|_| Error::SharedSecretInit)?;
        mac.update(&peer.to_bytes());
        mac.update(nonce);
        let mut output = [0u8; 32];
        output.copy_from_slice(&mac.finalize().into_bytes());
        Ok(SharedSecret(output))
    }

    /// Derive a shared secret with a fresh random nonce.
    pub fn fresh_secret<R: Rng + ?Sized>(
        &self,
        peer: &Identity,
        rng: &mut R,
    ) -> Result<SharedSecret> {
        let mut nonce = [0u8; SHARED_SECRET_NONCE_LEN];
        rng.fill(&mut nonce[..]);
        self.shared_secret(peer, &nonce)
    }
}

/// Opaque secret agreed on by the two ends of a connection.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct SharedSecret([u8; 32]);

impl SharedSecret {
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl std::fmt::Display for SharedSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl std::fmt::Debug for SharedSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "SharedSecret({}..)", hex::encode(&self.0[..4]))
    }
}
