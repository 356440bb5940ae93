//! Serialization gateway
//!
//! Everything that crosses a channel goes through a [`Grapple`]: single
//! items on load, and the whole cargo container on delivery. The rest of the
//! crate never touches a concrete codec.

use serde::Serialize;
use serde::de::DeserializeOwned;
use std::any::Any;

use crate::error::GrappleError;
use crate::key::TypeKey;
use crate::registry::TypeRegistry;

/// Pluggable binary codec boundary
pub trait Grapple: Send + Sync + 'static {
    /// Encode a value to bytes
    fn encode<T: Serialize + ?Sized>(&self, type_key: &TypeKey, value: &T) -> Result<Vec<u8>, GrappleError>;

    /// Decode bytes as `T`; `type_key` names the declared type for error reporting
    fn decode<T: DeserializeOwned>(&self, type_key: &TypeKey, bytes: &[u8]) -> Result<T, GrappleError>;

    /// Serialize a value together with its type identity
    fn grab<T: Serialize + 'static>(&self, value: &T) -> Result<(TypeKey, Vec<u8>), GrappleError> {
        let type_key = TypeKey::of::<T>();
        let bytes = self.encode(&type_key, value)?;
        Ok((type_key, bytes))
    }

    /// Deserialize bytes whose target type is known statically
    fn release<T: DeserializeOwned + 'static>(&self, bytes: &[u8]) -> Result<T, GrappleError> {
        self.decode(&TypeKey::of::<T>(), bytes)
    }

    /// Deserialize bytes whose type is only known at runtime
    ///
    /// The key is resolved through `registry`; a key with no registered
    /// decoder fails with [`GrappleError::UnresolvedType`].
    fn release_as(
        &self,
        bytes: &[u8],
        type_key: &TypeKey,
        registry: &TypeRegistry<Self>,
    ) -> Result<Box<dyn Any + Send>, GrappleError>
    where
        Self: Sized,
    {
        registry.release(self, type_key, bytes)
    }
}

/// Default gateway using bincode
#[derive(Debug, Default, Clone, Copy)]
pub struct BincodeGrapple;

impl Grapple for BincodeGrapple {
    fn encode<T: Serialize + ?Sized>(&self, type_key: &TypeKey, value: &T) -> Result<Vec<u8>, GrappleError> {
        bincode::serialize(value).map_err(|e| GrappleError::Encode {
            type_key: type_key.clone(),
            source: Box::new(e),
        })
    }

    fn decode<T: DeserializeOwned>(&self, type_key: &TypeKey, bytes: &[u8]) -> Result<T, GrappleError> {
        bincode::deserialize(bytes).map_err(|e| GrappleError::Decode {
            type_key: type_key.clone(),
            source: Box::new(e),
        })
    }
}
