use biscotti::ResponseCookie;
use googletest::matcher::{self, Matcher, MatcherBase};
use time::OffsetDateTime;

/// Check if the cookie tells the client to discard the session cookie.
pub fn is_removal_cookie() -> RemovalCookieMatcher {
    RemovalCookieMatcher
}

#[derive(Clone, Copy, matcher::MatcherBase)]
pub struct RemovalCookieMatcher;

impl Matcher<&ResponseCookie<'static>> for RemovalCookieMatcher {
    fn matches(&self, actual: &ResponseCookie<'static>) -> matcher::MatcherResult {
        if !actual.value().is_empty() {
            return matcher::MatcherResult::NoMatch;
        }
        if let Some(expires) = actual.expires() {
            if let Some(expires) = expires.datetime() {
                return (expires == OffsetDateTime::UNIX_EPOCH).into();
            }
        }
        matcher::MatcherResult::NoMatch
    }

    fn describe(
        &self,
        matcher_result: matcher::MatcherResult,
    ) -> googletest::description::Description {
        match matcher_result {
            matcher::MatcherResult::Match => "is a removal cookie",
            matcher::MatcherResult::NoMatch => "isn't a removal cookie",
        }
        .into()
    }
}
