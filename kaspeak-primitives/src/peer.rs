use std::fmt;

use kaspeak_crypto::curve::CurveError;
use kaspeak_crypto::identifier::ChainKey;
use kaspeak_crypto::key::{PublicKey, SecretKey, Signature};
use once_cell::sync::OnceCell;

/// Sender descriptor attached to every inbound message.
///
/// The expensive derivations, the ECDH shared secret and the chain key it
/// seeds, are computed at most once and cached for the peer's lifetime; a
/// peer lives exactly as long as its containing message header.
#[derive(Clone)]
pub struct Peer {
    address: String,
    public_key: PublicKey,
    signature: Signature,
    is_own: bool,
    local_secret: SecretKey,
    shared_secret: OnceCell<[u8; 32]>,
    chain_key: OnceCell<ChainKey>,
}

impl Peer {
    /// `local_secret` is the receiving session's key, needed to run ECDH
    /// against the sender; `is_own` marks messages the session itself
    /// published.
    pub fn new(
        address: String,
        public_key: PublicKey,
        signature: Signature,
        is_own: bool,
        local_secret: SecretKey,
    ) -> Self {
        Self {
            address,
            public_key,
            signature,
            is_own,
            local_secret,
            shared_secret: OnceCell::new(),
            chain_key: OnceCell::new(),
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn public_key(&self) -> &PublicKey {
        &self.public_key
    }

    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    pub fn is_own(&self) -> bool {
        self.is_own
    }

    /// The session's own secret, exposed only for peers the session itself
    /// authored.
    pub fn own_secret(&self) -> Option<&SecretKey> {
        self.is_own.then_some(&self.local_secret)
    }

    /// `SHA256(SHA256(ECDH(local, peer)))`, cached after the first call.
    pub fn shared_secret(&self) -> Result<&[u8; 32], CurveError> {
        self.shared_secret
            .get_or_try_init(|| self.local_secret.shared_secret(&self.public_key))
    }

    /// `int(SHA256(shared_secret))`, cached after the first call.
    pub fn chain_key(&self) -> Result<&ChainKey, CurveError> {
        self.chain_key.get_or_try_init(|| {
            let shared = self.shared_secret()?;
            Ok(ChainKey::from_shared_secret(shared))
        })
    }
}

impl fmt::Debug for Peer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Peer")
            .field("address", &self.address)
            .field("public_key", &self.public_key)
            .field("is_own", &self.is_own)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn peer_pair() -> (Peer, Peer) {
        let alice = SecretKey::from_u64(6).unwrap();
        let bob = SecretKey::from_u64(1337).unwrap();
        let sig = Signature::from([0u8; 64]);

        let seen_by_alice = Peer::new(
            "kaspa:bob".into(),
            bob.public_key(),
            sig,
            false,
            alice.clone(),
        );
        let seen_by_bob = Peer::new(
            "kaspa:alice".into(),
            alice.public_key(),
            sig,
            false,
            bob,
        );
        (seen_by_alice, seen_by_bob)
    }

    #[test]
    fn both_sides_derive_the_same_secrets() {
        let (a, b) = peer_pair();
        assert_eq!(a.shared_secret().unwrap(), b.shared_secret().unwrap());
        assert_eq!(a.chain_key().unwrap(), b.chain_key().unwrap());
    }

    #[test]
    fn derivations_are_cached() {
        let (a, _) = peer_pair();
        let first = *a.shared_secret().unwrap();
        let second = *a.shared_secret().unwrap();
        assert_eq!(first, second);
        assert!(std::ptr::eq(
            a.shared_secret().unwrap(),
            a.shared_secret().unwrap()
        ));
    }

    #[test]
    fn own_secret_is_gated() {
        let local = SecretKey::from_u64(6).unwrap();
        let own = Peer::new(
            "kaspa:me".into(),
            local.public_key(),
            Signature::from([0u8; 64]),
            true,
            local.clone(),
        );
        let foreign = Peer::new(
            "kaspa:them".into(),
            SecretKey::from_u64(7).unwrap().public_key(),
            Signature::from([0u8; 64]),
            false,
            local,
        );

        assert!(own.own_secret().is_some());
        assert!(foreign.own_secret().is_none());
    }
}
