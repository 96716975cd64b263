//! Symmetric encode/decode pipeline
//!
//! Outbound: plain object → CBOR → Zstd(16) → optional XChaCha20-Poly1305
//! with a fresh 24-byte nonce prepended. Inbound runs the same stages in
//! reverse, but only the first stage fails loudly: once the registry knows
//! the type, every later failure is folded into an [`UnknownMessage`] whose
//! code pins down the stage that broke.

use chacha20poly1305::aead::{Aead, KeyInit};
use chacha20poly1305::{Key, XChaCha20Poly1305, XNonce};
use kaspeak_codec::minicbor;
use kaspeak_codec::plain::PlainValue;
use kaspeak_primitives::MessageHeader;
use rand::rngs::OsRng;
use rand::RngCore;
use thiserror::Error;
use tracing::warn;

use crate::message::{KaspeakMessage, MessageError};
use crate::registry::{MessageRegistry, RegistryError};
use crate::unknown::{codes, UnknownMessage};

/// Nonce length of the XChaCha20-Poly1305 construction.
pub const NONCE_LEN: usize = 24;

/// Poly1305 authentication tag length.
pub const TAG_LEN: usize = 16;

/// Zstd compression level applied to every message.
pub const COMPRESSION_LEVEL: i32 = 16;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("message type requires encryption but no key was provided")]
    EncryptionKeyMissing,

    #[error(transparent)]
    UnknownType(#[from] RegistryError),

    #[error("failed to lower message to its plain object: {0}")]
    Plain(#[from] MessageError),

    #[error("cbor encoding failed: {0}")]
    Cbor(String),

    #[error("compression failed: {0}")]
    Compression(#[from] std::io::Error),

    #[error("encryption failed")]
    Encryption,
}

/// Encodes a typed message into its on-ledger data section.
///
/// A missing key for an encrypting type is an error; a surplus key for a
/// plaintext type is ignored with a warning.
pub fn encode(msg: &dyn KaspeakMessage, key: Option<&[u8; 32]>) -> Result<Vec<u8>, PipelineError> {
    let key = match (msg.requires_encryption(), key) {
        (true, None) => return Err(PipelineError::EncryptionKeyMissing),
        (true, Some(key)) => Some(key),
        (false, Some(_)) => {
            warn!(
                message_type = msg.message_type(),
                "encryption key supplied for a plaintext message type, ignoring"
            );
            None
        }
        (false, None) => None,
    };

    let plain = msg.to_plain()?;
    let cbor = minicbor::to_vec(&plain).map_err(|e| PipelineError::Cbor(e.to_string()))?;
    let compressed = zstd::encode_all(cbor.as_slice(), COMPRESSION_LEVEL)?;

    match key {
        None => Ok(compressed),
        Some(key) => {
            let mut nonce = [0u8; NONCE_LEN];
            OsRng.fill_bytes(&mut nonce);

            let cipher = XChaCha20Poly1305::new(Key::from_slice(key));
            let ciphertext = cipher
                .encrypt(XNonce::from_slice(&nonce), compressed.as_slice())
                .map_err(|_| PipelineError::Encryption)?;

            let mut out = Vec::with_capacity(NONCE_LEN + ciphertext.len());
            out.extend_from_slice(&nonce);
            out.extend_from_slice(&ciphertext);
            Ok(out)
        }
    }
}

/// Decodes an inbound data section into a typed message.
///
/// Fails loudly only when the type code is unregistered or an encrypting
/// type arrives without a key; every downstream failure returns an
/// [`UnknownMessage`] carrying the untouched bytes and a stage code.
pub fn decode(
    registry: &MessageRegistry,
    header: &MessageHeader,
    data: &[u8],
    key: Option<&[u8; 32]>,
) -> Result<Box<dyn KaspeakMessage>, PipelineError> {
    let mut instance = registry.create(header.message_type())?;
    instance.attach_header(header.clone());

    let decrypted = if instance.requires_encryption() {
        let key = key.ok_or(PipelineError::EncryptionKeyMissing)?;

        if data.len() < NONCE_LEN + TAG_LEN {
            return Ok(unknown(
                header,
                data,
                "Decryption failed: malformed ciphertext",
                codes::MALFORMED_CIPHERTEXT,
            ));
        }

        let cipher = XChaCha20Poly1305::new(Key::from_slice(key));
        match cipher.decrypt(XNonce::from_slice(&data[..NONCE_LEN]), &data[NONCE_LEN..]) {
            Err(_) => {
                return Ok(unknown(
                    header,
                    data,
                    "Decryption failed: invalid key",
                    codes::DECRYPT_REJECTED,
                ))
            }
            Ok(plaintext) if plaintext.is_empty() => {
                return Ok(unknown(
                    header,
                    data,
                    "Decryption failed: empty plaintext",
                    codes::DECRYPT_EMPTY,
                ))
            }
            Ok(plaintext) => plaintext,
        }
    } else {
        data.to_vec()
    };

    let decompressed = match zstd::decode_all(decrypted.as_slice()) {
        Ok(bytes) => bytes,
        Err(e) => {
            return Ok(unknown(
                header,
                data,
                format!("Decompression failed: {e}"),
                codes::DECOMPRESS_FAILED,
            ))
        }
    };

    let plain: PlainValue = match minicbor::decode(&decompressed) {
        Ok(value) => value,
        Err(e) => {
            return Ok(unknown(
                header,
                data,
                format!("CBOR decoding failed: {e}"),
                codes::CBOR_FAILED,
            ))
        }
    };

    if let Err(e) = instance.hydrate(plain) {
        return Ok(unknown(
            header,
            data,
            format!("Message hydration failed: {e}"),
            codes::HYDRATE_FAILED,
        ));
    }

    Ok(instance)
}

fn unknown(
    header: &MessageHeader,
    data: &[u8],
    desc: impl Into<String>,
    code: u8,
) -> Box<dyn KaspeakMessage> {
    let mut message = UnknownMessage::new(data.to_vec(), desc, code);
    message.attach_header(header.clone());
    Box::new(message)
}
