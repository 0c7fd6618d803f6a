use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;

use crate::SessionId;
use crate::config::SessionOptions;
use errors::{ValueDeserializationError, ValueSerializationError};

#[derive(Clone, Debug)]
/// The session attached to the current request.
///
/// Sessions are built by a [`SessionManager`][crate::SessionManager],
/// either [from an incoming cookie][crate::SessionManager::new_session]
/// or from scratch. Changes are only persisted when the session is
/// [saved][crate::SessionManager::save].
pub struct Session {
    name: String,
    pub(crate) id: Option<SessionId>,
    pub(crate) values: HashMap<String, Value>,
    pub(crate) options: SessionOptions,
    pub(crate) is_new: bool,
}

impl Session {
    /// A brand-new session, with no identifier and no values.
    ///
    /// `options` should be an owned copy of the defaults: the session never
    /// looks at the template it was created from again.
    pub(crate) fn fresh(name: String, options: SessionOptions) -> Self {
        Self {
            name,
            id: None,
            values: HashMap::new(),
            options,
            is_new: true,
        }
    }

    /// The name of the session.
    ///
    /// It's also the name of the cookie used to carry the session identifier.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The session identifier.
    ///
    /// It's `None` if the session has never been saved.
    pub fn id(&self) -> Option<&SessionId> {
        self.id.as_ref()
    }

    /// `true` unless the session was successfully loaded from an existing
    /// store record.
    pub fn is_new(&self) -> bool {
        self.is_new
    }

    /// The options attached to this session.
    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    /// Change the options attached to this session.
    ///
    /// Set [`SessionOptions::max_age`] to zero (or less) to delete the session
    /// on the next save.
    pub fn options_mut(&mut self) -> &mut SessionOptions {
        &mut self.options
    }

    /// Get the value associated with `key`.
    ///
    /// If the value is not found, `None` is returned.
    /// If the value is found, but it cannot be deserialized into the expected type, an error is returned.
    pub fn get<T: DeserializeOwned>(
        &self,
        key: &str,
    ) -> Result<Option<T>, ValueDeserializationError> {
        self.get_raw(key)
            .map(|value| serde_json::from_value(value.clone()))
            .transpose()
            .map_err(|e| ValueDeserializationError {
                key: key.to_owned(),
                source: e,
            })
    }

    /// Get the raw JSON value associated with `key`.
    pub fn get_raw(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// Set a value for the given key.
    ///
    /// If the key already exists, the old raw value is returned.
    /// If the value cannot be serialized, an error is returned.
    pub fn insert<T: Serialize>(
        &mut self,
        key: impl Into<String>,
        value: T,
    ) -> Result<Option<Value>, ValueSerializationError> {
        let key = key.into();
        let value = serde_json::to_value(value).map_err(|e| ValueSerializationError {
            key: key.clone(),
            source: e,
        })?;
        Ok(self.insert_raw(key, value))
    }

    /// Set a raw JSON value for the given key.
    ///
    /// If the key already exists, the old value is returned.
    pub fn insert_raw(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.values.insert(key.into(), value)
    }

    /// Remove the value associated with `key`.
    ///
    /// If the key exists, the removed value is returned.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.values.remove(key)
    }

    /// Remove all key-value pairs from the session.
    ///
    /// This doesn't delete the session record from the store—set
    /// [`SessionOptions::max_age`] to zero if that's your goal.
    pub fn clear(&mut self) {
        self.values.clear();
    }

    /// `true` if there are no values attached to this session.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// The number of values attached to this session.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// All the values attached to this session.
    pub fn values(&self) -> &HashMap<String, Value> {
        &self.values
    }
}

/// Errors that can occur when reading or writing session values.
pub mod errors {
    #[derive(Debug, thiserror::Error)]
    #[non_exhaustive]
    #[error("Failed to deserialize the value associated with `{key}`")]
    /// The error returned by [`Session::get`][super::Session::get].
    pub struct ValueDeserializationError {
        /// The key of the value that we failed to deserialize.
        pub key: String,
        #[source]
        /// The underlying deserialization error.
        pub source: serde_json::Error,
    }

    #[derive(Debug, thiserror::Error)]
    #[non_exhaustive]
    #[error("Failed to serialize the value associated with `{key}`")]
    /// The error returned by [`Session::insert`][super::Session::insert].
    pub struct ValueSerializationError {
        /// The key of the value that we failed to serialize.
        pub key: String,
        #[source]
        /// The underlying serialization error.
        pub source: serde_json::Error,
    }
}
