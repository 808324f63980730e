//! Payload Module
//!
//! Type-erased cached values and the per-category codecs that persist them.
//!
//! The engine never needs to know the concrete type behind a payload. It asks
//! a [`Cacheable`] for a size hint and a type tag, and hands persistence to a
//! [`PayloadCodec`] looked up in the [`CodecRegistry`].

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

use crate::error::{CacheError, Result};

// == Cacheable Trait ==
/// A value that can live in the cache.
pub trait Cacheable: Any + Send + Sync + fmt::Debug {
    /// Approximate size in bytes. Must return the same value for the same
    /// payload every time it is called.
    fn size_hint(&self) -> usize;

    /// Stable name of the concrete type, written to snapshots.
    fn type_tag(&self) -> &'static str;

    fn as_any(&self) -> &dyn Any;
}

impl dyn Cacheable {
    /// Borrows the payload as a concrete type.
    pub fn downcast_ref<T: Cacheable>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }

    /// Returns true if the payload is a `T`.
    pub fn is<T: Cacheable>(&self) -> bool {
        self.as_any().is::<T>()
    }
}

/// Shared, immutable handle to a cached value.
pub type Payload = Arc<dyn Cacheable>;

/// Length of the JSON encoding of a value, used as a size approximation.
pub fn serialized_len<T: Serialize + ?Sized>(value: &T) -> usize {
    serde_json::to_vec(value).map(|bytes| bytes.len()).unwrap_or(0)
}

// == Built-in Payloads ==
impl Cacheable for String {
    fn size_hint(&self) -> usize {
        self.len()
    }

    fn type_tag(&self) -> &'static str {
        "text"
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Cacheable for Vec<u8> {
    fn size_hint(&self) -> usize {
        self.len()
    }

    fn type_tag(&self) -> &'static str {
        "bytes"
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Cacheable for Value {
    fn size_hint(&self) -> usize {
        serialized_len(self)
    }

    fn type_tag(&self) -> &'static str {
        "json"
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

// == Payload Codec ==
/// Converts payloads of one category to and from snapshot documents.
pub trait PayloadCodec: Send + Sync {
    fn encode(&self, payload: &dyn Cacheable) -> Result<Value>;

    fn decode(&self, data: &Value) -> Result<Payload>;
}

/// Codec for any serde type, stored as plain JSON.
pub struct JsonCodec<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> JsonCodec<T> {
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T> Default for JsonCodec<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> PayloadCodec for JsonCodec<T>
where
    T: Cacheable + Serialize + DeserializeOwned,
{
    fn encode(&self, payload: &dyn Cacheable) -> Result<Value> {
        let value = payload.downcast_ref::<T>().ok_or_else(|| {
            CacheError::Codec(format!(
                "expected {}, found payload tagged '{}'",
                std::any::type_name::<T>(),
                payload.type_tag()
            ))
        })?;
        serde_json::to_value(value).map_err(|e| CacheError::Codec(e.to_string()))
    }

    fn decode(&self, data: &Value) -> Result<Payload> {
        let value: T =
            serde_json::from_value(data.clone()).map_err(|e| CacheError::Codec(e.to_string()))?;
        Ok(Arc::new(value))
    }
}

// == Codec Registry ==
/// Payload codecs keyed by category, with a fallback keyed by type tag.
#[derive(Clone, Default)]
pub struct CodecRegistry {
    by_category: HashMap<String, Arc<dyn PayloadCodec>>,
    by_type: HashMap<String, Arc<dyn PayloadCodec>>,
}

impl CodecRegistry {
    /// Creates an empty registry. Nothing can be persisted until codecs are
    /// registered.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with codecs for every built-in payload type.
    pub fn with_builtin_types() -> Self {
        let mut registry = Self::new();
        registry.register_type("text", JsonCodec::<String>::new());
        registry.register_type("bytes", JsonCodec::<Vec<u8>>::new());
        registry.register_type("json", JsonCodec::<Value>::new());
        registry
    }

    /// Registers the codec used for every entry of `category`.
    pub fn register<C>(&mut self, category: impl Into<String>, codec: C) -> &mut Self
    where
        C: PayloadCodec + 'static,
    {
        self.by_category.insert(category.into(), Arc::new(codec));
        self
    }

    /// Registers a codec for payloads carrying `type_tag`, used when the
    /// entry's category has no codec of its own.
    pub fn register_type<C>(&mut self, type_tag: impl Into<String>, codec: C) -> &mut Self
    where
        C: PayloadCodec + 'static,
    {
        self.by_type.insert(type_tag.into(), Arc::new(codec));
        self
    }

    /// Finds the codec for an entry.
    pub fn lookup(&self, category: &str, type_tag: &str) -> Option<&Arc<dyn PayloadCodec>> {
        self.by_category
            .get(category)
            .or_else(|| self.by_type.get(type_tag))
    }
}

impl fmt::Debug for CodecRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut categories: Vec<_> = self.by_category.keys().collect();
        categories.sort();
        let mut types: Vec<_> = self.by_type.keys().collect();
        types.sort();
        f.debug_struct("CodecRegistry")
            .field("categories", &categories)
            .field("types", &types)
            .finish()
    }
}
