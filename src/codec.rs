//! Text encoding for opaque cryptographic objects
//!
//! Keys and ciphertexts cross process boundaries as base64 of their binary
//! serialization. An absent object encodes to the [`NIL`] sentinel, which is
//! never valid base64 of a serialized object (its length is not a multiple of 4).

use std::sync::Arc;

use base64::engine::general_purpose::STANDARD as B64;
use base64::Engine;
use fhe::bfv::{BfvParameters, Ciphertext, PublicKey, RelinearizationKey};
use fhe_traits::{DeserializeParametrized, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Encoding of an absent object.
pub const NIL: &str = "nil";

/// Failure to decode an object from its text form.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// The text is not valid standard base64.
    #[error("malformed base64: {0}")]
    Base64(String),
    /// The bytes are not a valid serialization for the target type.
    #[error("malformed payload: {0}")]
    Format(String),
}

/// Binary serialization of an opaque object.
pub trait BinaryMarshal {
    fn marshal_binary(&self) -> Vec<u8>;
}

/// Binary deserialization of an opaque object against its parameter context.
pub trait BinaryUnmarshal: Sized {
    type Context;

    fn unmarshal_binary(bytes: &[u8], ctx: &Self::Context) -> Result<Self, DecodeError>;
}

macro_rules! impl_bfv_codec {
    ($($ty:ty),*) => {
        $(
            impl BinaryMarshal for $ty {
                fn marshal_binary(&self) -> Vec<u8> {
                    self.to_bytes()
                }
            }

            impl BinaryUnmarshal for $ty {
                type Context = Arc<BfvParameters>;

                fn unmarshal_binary(bytes: &[u8], par: &Arc<BfvParameters>) -> Result<Self, DecodeError> {
                    <$ty>::from_bytes(bytes, par).map_err(|e| DecodeError::Format(e.to_string()))
                }
            }
        )*
    };
}

impl_bfv_codec!(PublicKey, RelinearizationKey, Ciphertext);

/// Serialize `obj` and base64-encode it, or return [`NIL`] when absent.
pub fn encode_to_text<T: BinaryMarshal>(obj: Option<&T>) -> String {
    match obj {
        Some(obj) => B64.encode(obj.marshal_binary()),
        None => NIL.to_string(),
    }
}

/// Base64-decode `text` and deserialize it as a `T`.
pub fn decode_from_text<T: BinaryUnmarshal>(text: &str, ctx: &T::Context) -> Result<T, DecodeError> {
    let bytes = B64
        .decode(text)
        .map_err(|e| DecodeError::Base64(e.to_string()))?;
    T::unmarshal_binary(&bytes, ctx)
}

/// Lowercase hex SHA-256 of the object's binary serialization.
pub fn fingerprint<T: BinaryMarshal>(obj: &T) -> String {
    hex::encode(Sha256::digest(obj.marshal_binary()))
}
