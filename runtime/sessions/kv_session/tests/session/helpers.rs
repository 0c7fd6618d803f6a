use biscotti::ResponseCookie;
use kv_session::{SessionId, SessionManager, store::session_key};

/// Decode the session identifier carried by a cookie returned by [`SessionManager::save`].
pub fn cookie_id(manager: &SessionManager, cookie: &ResponseCookie<'static>) -> SessionId {
    let id: String = manager
        .codecs()
        .decode(cookie.name(), cookie.value())
        .expect("Failed to decode the session cookie");
    SessionId::from_existing(id).expect("The session cookie carries an empty identifier")
}

/// Retrieve the raw record stored for the session identified by `id`, if any.
pub async fn raw_record(manager: &SessionManager, id: &SessionId) -> Option<Vec<u8>> {
    manager.store().get(&session_key(id)).await.unwrap()
}

/// Replace `c` with a different URL-safe base64 character.
pub fn flip(c: char) -> char {
    if c == 'A' { 'B' } else { 'A' }
}
