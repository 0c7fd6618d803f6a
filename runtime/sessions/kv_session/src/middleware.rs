use biscotti::ResponseCookies;

use crate::manager::errors::SaveError;
use crate::{Session, SessionManager};

/// Save `session` and add the resulting cookie to the outgoing response cookies.
///
/// Nothing is added to `response_cookies` if saving fails.
pub async fn finalize_session(
    manager: &SessionManager,
    response_cookies: &mut ResponseCookies<'static>,
    session: &mut Session,
) -> Result<(), SaveError> {
    let cookie = manager.save(session).await?;
    response_cookies.insert(cookie);
    Ok(())
}
