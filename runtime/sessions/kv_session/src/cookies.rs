//! Move cookies in and out of HTTP headers.
use biscotti::{Processor, RequestCookies, ResponseCookies};
use http::header::{COOKIE, SET_COOKIE};
use http::{HeaderMap, HeaderValue};
use tracing_log_error::log_error;

use errors::InjectResponseCookiesError;

/// Parse cookies out of the `Cookie` headers of an incoming request.
///
/// Headers that can't be parsed are logged and skipped: a malformed `Cookie`
/// header shouldn't prevent the request from being served, it should only
/// cause the affected sessions to start afresh.
pub fn extract_request_cookies<'request>(
    headers: &'request HeaderMap,
    processor: &Processor,
) -> RequestCookies<'request> {
    let mut valid_headers = Vec::new();
    for header in headers.get_all(COOKIE) {
        let header = match header.to_str() {
            Ok(header) => header,
            Err(e) => {
                log_error!(
                    e,
                    level: tracing::Level::WARN,
                    "Some characters in the `Cookie` header aren't printable ASCII characters, skipping it."
                );
                continue;
            }
        };
        if let Err(e) = RequestCookies::parse_headers(std::iter::once(header), processor) {
            log_error!(
                e,
                level: tracing::Level::WARN,
                "Failed to parse request cookies out of the `Cookie` header, skipping it."
            );
            continue;
        }
        valid_headers.push(header);
    }
    match RequestCookies::parse_headers(valid_headers.into_iter(), processor) {
        Ok(cookies) => cookies,
        Err(e) => {
            log_error!(
                e,
                level: tracing::Level::WARN,
                "Failed to parse request cookies out of the `Cookie` headers, ignoring all of them."
            );
            RequestCookies::new()
        }
    }
}

/// Append a `Set-Cookie` header for each of the outgoing cookies.
///
/// It consumes [`ResponseCookies`] by value since no response cookies should be
/// added after this point.
pub fn inject_response_cookies(
    headers: &mut HeaderMap,
    response_cookies: ResponseCookies<'_>,
    processor: &Processor,
) -> Result<(), InjectResponseCookiesError> {
    for value in response_cookies.header_values(processor) {
        let value = HeaderValue::from_str(&value).map_err(|_| InjectResponseCookiesError {
            invalid_header_value: value,
        })?;
        headers.append(SET_COOKIE, value);
    }
    Ok(())
}

/// Errors that can occur when moving cookies in and out of HTTP headers.
pub mod errors {
    #[derive(Debug, thiserror::Error)]
    #[non_exhaustive]
    #[error("Some characters in the `Set-Cookie` header value are not printable ASCII characters.")]
    /// The error type returned by [`inject_response_cookies`](super::inject_response_cookies).
    pub struct InjectResponseCookiesError {
        /// The invalid header value.
        pub invalid_header_value: String,
    }
}
