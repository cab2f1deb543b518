//! Participant session
//!
//! A [`PollClient`] bundles what a participant needs: the shared parameters and
//! either a secret key (poll owner: key generation, encryption and decryption)
//! or only a poll's public key (respondent: encryption).
//!
//! Secret keys have no serialized form, so the owner's key is derived from a
//! 32-byte seed and the seed is what gets persisted.

use std::sync::Arc;

use fhe::bfv::{
    BfvParameters, Ciphertext, Encoding, Plaintext, PublicKey, RelinearizationKey, SecretKey,
};
use fhe_traits::{FheDecoder, FheDecrypter, FheEncoder, FheEncrypter};
use rand::{thread_rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::codec::{decode_from_text, encode_to_text, DecodeError, NIL};
use crate::params::VECTOR_LEN;

/// Client-side failure
#[derive(Debug, Error)]
pub enum ClientError {
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error("encryption library error: {0}")]
    Crypto(#[from] fhe::Error),
    #[error("this session holds no secret key")]
    NoDecryptionKey,
    #[error("poll has no result")]
    NoResult,
}

/// Keys a poll owner submits when creating a poll
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyBundle {
    pub pk: String,
    pub rlk: String,
}

/// Key held by a session
pub enum KeyMaterial {
    Secret(SecretKey),
    Public(PublicKey),
}

pub struct PollClient {
    params: Arc<BfvParameters>,
    key: KeyMaterial,
}

impl PollClient {
    /// Session for a poll owner, with the secret key derived from `seed`.
    pub fn from_seed(params: Arc<BfvParameters>, seed: [u8; 32]) -> Self {
        let sk = SecretKey::random(&params, &mut ChaCha20Rng::from_seed(seed));
        Self {
            params,
            key: KeyMaterial::Secret(sk),
        }
    }

    /// Session for a respondent encrypting under a poll's base64 public key.
    pub fn from_public_key_text(params: Arc<BfvParameters>, text: &str) -> Result<Self, ClientError> {
        let pk: PublicKey = decode_from_text(text, &params)?;
        Ok(Self {
            params,
            key: KeyMaterial::Public(pk),
        })
    }

    pub fn can_decrypt(&self) -> bool {
        matches!(self.key, KeyMaterial::Secret(_))
    }

    /// Generate the public and relinearization keys for a new poll.
    pub fn generate_keys(&self) -> Result<KeyBundle, ClientError> {
        let sk = self.secret_key()?;
        let mut rng = thread_rng();
        let pk = PublicKey::new(sk, &mut rng);
        let rlk = RelinearizationKey::new(sk, &mut rng)?;

        Ok(KeyBundle {
            pk: encode_to_text(Some(&pk)),
            rlk: encode_to_text(Some(&rlk)),
        })
    }

    /// Encrypt an availability vector and return it as base64 text.
    pub fn encrypt_availabilities(&self, values: &[u64; VECTOR_LEN]) -> Result<String, ClientError> {
        let pt = Plaintext::try_encode(values.as_slice(), Encoding::simd(), &self.params)?;
        let mut rng = thread_rng();
        let ct: Ciphertext = match &self.key {
            KeyMaterial::Secret(sk) => sk.try_encrypt(&pt, &mut rng)?,
            KeyMaterial::Public(pk) => pk.try_encrypt(&pt, &mut rng)?,
        };
        Ok(encode_to_text(Some(&ct)))
    }

    /// Decrypt a poll result into its availability vector.
    pub fn decrypt_results(&self, text: &str) -> Result<[u64; VECTOR_LEN], ClientError> {
        let sk = self.secret_key()?;
        if text == NIL {
            return Err(ClientError::NoResult);
        }

        let ct: Ciphertext = decode_from_text(text, &self.params)?;
        let pt = sk.try_decrypt(&ct)?;
        let slots = Vec::<u64>::try_decode(&pt, Encoding::simd())?;

        let mut out = [0u64; VECTOR_LEN];
        out.copy_from_slice(&slots[..VECTOR_LEN]);
        Ok(out)
    }

    fn secret_key(&self) -> Result<&SecretKey, ClientError> {
        match &self.key {
            KeyMaterial::Secret(sk) => Ok(sk),
            KeyMaterial::Public(_) => Err(ClientError::NoDecryptionKey),
        }
    }
}
