use biscotti::{RequestCookie, RequestCookies};
use googletest::{
    assert_that,
    prelude::{eq, len, none, some},
};
use kv_session::SessionRegistry;

use crate::fixtures::{SESSION_NAME, spy_manager};

#[tokio::test]
async fn each_session_is_looked_up_at_most_once() {
    let (manager, call_tracker) = spy_manager();

    let mut session = manager.new_session(SESSION_NAME, None).await;
    session.insert("key", "value").unwrap();
    let cookie = manager.save(&mut session).await.unwrap();
    call_tracker.reset_operation_log().await;

    let mut request_cookies = RequestCookies::new();
    request_cookies.append(RequestCookie::new(SESSION_NAME, cookie.value().to_owned()));

    let mut registry = SessionRegistry::new();
    let session = registry.get(&manager, SESSION_NAME, &request_cookies).await;
    assert!(!session.is_new());
    session.insert("another-key", 1).unwrap();

    // The cached instance is returned, including the changes made to it.
    let session = registry.get(&manager, SESSION_NAME, &request_cookies).await;
    assert_that!(session.get::<u32>("another-key").unwrap(), some(eq(1)));

    assert_that!(call_tracker.operation_log().await, len(eq(1)));
}

#[tokio::test]
async fn sessions_are_cached_by_name() {
    let (manager, _) = spy_manager();
    let request_cookies = RequestCookies::new();

    let mut registry = SessionRegistry::new();
    assert!(registry.is_empty());
    registry.get(&manager, "first", &request_cookies).await;
    registry.get(&manager, "second", &request_cookies).await;
    registry.get(&manager, "first", &request_cookies).await;

    assert_eq!(registry.len(), 2);
    assert!(registry.get_registered("first").is_some());
    assert_that!(registry.get_registered("third"), none());
}

#[tokio::test]
async fn save_all_returns_a_cookie_per_session() {
    let (manager, call_tracker) = spy_manager();
    let request_cookies = RequestCookies::new();

    let mut registry = SessionRegistry::new();
    registry
        .get(&manager, "first", &request_cookies)
        .await
        .insert("key", "value")
        .unwrap();
    registry
        .get(&manager, "second", &request_cookies)
        .await
        .options_mut()
        .max_age = 0;

    let cookies = registry.save_all(&manager).await.unwrap();
    let mut names: Vec<_> = cookies.iter().map(|c| c.name().to_owned()).collect();
    names.sort();
    assert_eq!(names, vec!["first".to_owned(), "second".to_owned()]);

    // Only the first session was written, the second one was never persisted.
    let oplog = call_tracker.operation_log().await;
    assert_that!(oplog, len(eq(1)));
    assert!(oplog[0].starts_with("set session::"));
}
