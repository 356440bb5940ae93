//! Type hierarchy oracle and runtime type resolution
//!
//! Rust has no runtime reflection over "is A a subtype of B", so assignability
//! is declared up front: a [`TypeRegistry`] records which keys are assignable
//! to which, and which keys this process knows how to decode.

use serde::de::DeserializeOwned;
use std::any::Any;
use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;

use crate::error::GrappleError;
use crate::grapple::Grapple;
use crate::key::TypeKey;

/// Answers whether items stored under one key may be retrieved as another
pub trait TypeHierarchy: Send + Sync {
    /// True when `candidate` is assignable to `target`
    fn is_assignable(&self, target: &TypeKey, candidate: &TypeKey) -> bool;
}

/// Hierarchy where a type is only assignable to itself
#[derive(Debug, Default, Clone, Copy)]
pub struct ExactHierarchy;

impl TypeHierarchy for ExactHierarchy {
    fn is_assignable(&self, target: &TypeKey, candidate: &TypeKey) -> bool {
        target == candidate
    }
}

type ReleaseFn<G> = fn(&G, &[u8]) -> Result<Box<dyn Any + Send>, GrappleError>;

fn release_boxed<G: Grapple, T: DeserializeOwned + Send + 'static>(
    grapple: &G,
    bytes: &[u8],
) -> Result<Box<dyn Any + Send>, GrappleError> {
    let value: T = grapple.release(bytes)?;
    Ok(Box::new(value))
}

/// Registered decoders plus declared assignability edges
pub struct TypeRegistry<G> {
    decoders: HashMap<TypeKey, ReleaseFn<G>>,
    parents: HashMap<TypeKey, Vec<TypeKey>>,
}

impl<G: Grapple> TypeRegistry<G> {
    pub fn new() -> Self {
        Self {
            decoders: HashMap::new(),
            parents: HashMap::new(),
        }
    }

    /// Make `T` resolvable for dynamic release
    pub fn register<T: DeserializeOwned + Send + 'static>(mut self) -> Self {
        self.decoders.insert(TypeKey::of::<T>(), release_boxed::<G, T>);
        self
    }

    /// Declare `Derived` assignable to `Base`
    ///
    /// `Base` may be unsized, e.g. `dyn Shape`, to model an interface.
    pub fn assignable<Base: ?Sized + 'static, Derived: ?Sized + 'static>(self) -> Self {
        self.assignable_key(TypeKey::of::<Base>(), TypeKey::of::<Derived>())
    }

    /// Declare `derived` assignable to `base` by key
    pub fn assignable_key(mut self, base: TypeKey, derived: TypeKey) -> Self {
        let parents = self.parents.entry(derived).or_default();
        if !parents.contains(&base) {
            parents.push(base);
        }
        self
    }

    pub fn is_registered(&self, type_key: &TypeKey) -> bool {
        self.decoders.contains_key(type_key)
    }

    /// Decode `bytes` as the type registered under `type_key`
    pub fn release(&self, grapple: &G, type_key: &TypeKey, bytes: &[u8]) -> Result<Box<dyn Any + Send>, GrappleError> {
        let decode = self
            .decoders
            .get(type_key)
            .ok_or_else(|| GrappleError::UnresolvedType(type_key.clone()))?;
        decode(grapple, bytes)
    }
}

impl<G: Grapple> Default for TypeRegistry<G> {
    fn default() -> Self {
        Self::new()
    }
}

impl<G> TypeHierarchy for TypeRegistry<G> {
    /// Walks declared edges upward from `candidate`, so assignability is transitive
    fn is_assignable(&self, target: &TypeKey, candidate: &TypeKey) -> bool {
        if target == candidate {
            return true;
        }

        let mut seen = HashSet::new();
        let mut queue = VecDeque::from([candidate]);
        while let Some(current) = queue.pop_front() {
            if !seen.insert(current) {
                continue;
            }
            for parent in self.parents.get(current).into_iter().flatten() {
                if parent == target {
                    return true;
                }
                queue.push_back(parent);
            }
        }
        false
    }
}

impl<G> fmt::Debug for TypeRegistry<G> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut decoders: Vec<&TypeKey> = self.decoders.keys().collect();
        decoders.sort();
        f.debug_struct("TypeRegistry")
            .field("decoders", &decoders)
            .field("parents", &self.parents)
            .finish()
    }
}
