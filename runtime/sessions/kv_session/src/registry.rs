use biscotti::{RequestCookies, ResponseCookie};
use std::collections::HashMap;
use std::collections::hash_map::Entry;

use crate::manager::errors::SaveError;
use crate::{Session, SessionManager};

/// A request-scoped cache of sessions, keyed by session name.
///
/// [`SessionManager::new_session`] decodes the session cookie and hits the
/// store every time it's called. Route every session lookup for a request
/// through the same registry to pay that price at most once per session name.
///
/// Create a new registry for every request: it must never outlive it.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: HashMap<String, Session>,
}

impl SessionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the session named `name`.
    ///
    /// The first call for a given name builds the session using
    /// [`SessionManager::from_request_cookies`]. Later calls return the
    /// cached instance, including any change you've made to it.
    pub async fn get(
        &mut self,
        manager: &SessionManager,
        name: &str,
        request_cookies: &RequestCookies<'_>,
    ) -> &mut Session {
        match self.sessions.entry(name.to_owned()) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                let session = manager.from_request_cookies(name, request_cookies).await;
                entry.insert(session)
            }
        }
    }

    /// Get the session named `name`, if it has already been registered.
    pub fn get_registered(&mut self, name: &str) -> Option<&mut Session> {
        self.sessions.get_mut(name)
    }

    /// The number of registered sessions.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// `true` if no session has been registered yet.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Save every registered session and return the cookies to attach to the response.
    ///
    /// It stops at the first failure. Sessions saved before the failure stay saved.
    pub async fn save_all(
        &mut self,
        manager: &SessionManager,
    ) -> Result<Vec<ResponseCookie<'static>>, SaveError> {
        let mut cookies = Vec::with_capacity(self.sessions.len());
        for session in self.sessions.values_mut() {
            cookies.push(manager.save(session).await?);
        }
        Ok(cookies)
    }
}
