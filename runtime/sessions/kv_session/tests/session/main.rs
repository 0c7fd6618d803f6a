use assertions::is_removal_cookie;
use fixtures::{SESSION_NAME, manager, plaintext_spy_manager, spy_manager};
use googletest::{
    assert_that,
    prelude::{eq, len, none, not, some},
};
use helpers::{cookie_id, flip, raw_record};
use kv_session::{Session, SessionManager};

mod assertions;
mod fixtures;
mod helpers;
mod registry;

static_assertions::assert_impl_all!(SessionManager: Send, Sync);
static_assertions::assert_impl_all!(Session: Send, Sync, Clone);

#[tokio::test]
async fn hello_session_lifecycle() {
    let (manager, call_tracker) = plaintext_spy_manager();

    let mut session = manager.new_session("hello", None).await;
    assert!(session.is_new());

    session.insert("k", "v").unwrap();
    session.options_mut().max_age = 86400;
    let cookie = manager.save(&mut session).await.unwrap();

    let id = session.id().unwrap().to_owned();
    assert!(!id.as_str().is_empty());
    assert_that!(cookie.name(), eq("hello"));
    assert_eq!(
        call_tracker.operation_log().await,
        vec![format!("set session::{id} 86400")]
    );
    let record = raw_record(&manager, &id).await.unwrap();
    assert_eq!(record, br#"{"k":"v"}"#.to_vec());

    let session = manager.new_session("hello", Some(cookie.value())).await;
    assert!(!session.is_new());
    assert_that!(session.get::<String>("k").unwrap(), some(eq("v")));
}

#[tokio::test]
async fn values_survive_a_save_and_a_new_lookup() {
    let manager = manager();

    let mut session = manager.new_session("sess", None).await;
    assert!(session.is_new());
    assert_that!(session.id(), none());

    session.insert("k", "v").unwrap();
    let cookie = manager.save(&mut session).await.unwrap();
    assert_that!(cookie.name(), eq("sess"));
    assert_that!(cookie.value(), not(eq("")));

    let id = session.id().unwrap().to_owned();
    assert_eq!(cookie_id(&manager, &cookie), id);
    assert!(raw_record(&manager, &id).await.is_some());

    let session = manager.new_session("sess", Some(cookie.value())).await;
    assert!(!session.is_new());
    assert_that!(session.id(), some(eq(&id)));
    assert_that!(session.get::<String>("k").unwrap(), some(eq("v")));
}

#[tokio::test]
async fn the_cookie_does_not_carry_the_session_values() {
    let manager = manager();

    let mut session = manager.new_session(SESSION_NAME, None).await;
    session.insert("secret", "a-very-recognisable-value").unwrap();
    let cookie = manager.save(&mut session).await.unwrap();

    let id: String = manager
        .codecs()
        .decode(SESSION_NAME, cookie.value())
        .unwrap();
    assert!(!id.contains("a-very-recognisable-value"));
}

#[tokio::test]
async fn a_fresh_session_without_a_cookie_does_not_touch_the_store() {
    let (manager, call_tracker) = spy_manager();

    let session = manager.new_session(SESSION_NAME, None).await;
    assert!(session.is_new());
    assert!(session.is_empty());

    call_tracker.assert_store_was_untouched().await;
}

#[tokio::test]
async fn an_undecodable_cookie_yields_a_new_session_without_touching_the_store() {
    let (manager, call_tracker) = spy_manager();

    let session = manager.new_session(SESSION_NAME, Some("gibberish")).await;
    assert!(session.is_new());
    assert_that!(session.id(), none());

    call_tracker.assert_store_was_untouched().await;
}

#[tokio::test]
async fn a_tampered_cookie_is_never_accepted() {
    let manager = manager();

    let mut session = manager.new_session(SESSION_NAME, None).await;
    session.insert("user_id", 42).unwrap();
    let cookie = manager.save(&mut session).await.unwrap();
    let value = cookie.value().to_owned();

    for (i, c) in value.char_indices() {
        let mut tampered = value.clone();
        tampered.replace_range(i..i + c.len_utf8(), &flip(c).to_string());

        let session = manager.new_session(SESSION_NAME, Some(&tampered)).await;
        assert!(
            session.is_new(),
            "A cookie tampered at position {i} was accepted"
        );
        assert!(session.is_empty());
    }
}

#[tokio::test]
async fn a_cookie_is_bound_to_its_session_name() {
    let manager = manager();

    let mut session = manager.new_session("first", None).await;
    session.insert("user_id", 42).unwrap();
    let cookie = manager.save(&mut session).await.unwrap();

    let other = manager.new_session("second", Some(cookie.value())).await;
    assert!(other.is_new());
    assert!(other.is_empty());
}

#[tokio::test]
async fn a_cookie_for_a_missing_record_yields_a_new_session() {
    let manager = manager();

    let mut session = manager.new_session(SESSION_NAME, None).await;
    session.insert("user_id", 42).unwrap();
    let cookie = manager.save(&mut session).await.unwrap();

    // The record goes away, e.g. because it expired.
    let id = session.id().unwrap().to_owned();
    manager
        .store()
        .delete(&kv_session::store::session_key(&id))
        .await
        .unwrap();

    let session = manager.new_session(SESSION_NAME, Some(cookie.value())).await;
    assert!(session.is_new());
    assert!(session.is_empty());
    assert_that!(session.id(), none());
}

#[tokio::test]
async fn identifiers_are_unique_and_stable_across_saves() {
    let manager = manager();

    let mut first = manager.new_session(SESSION_NAME, None).await;
    let mut second = manager.new_session(SESSION_NAME, None).await;
    manager.save(&mut first).await.unwrap();
    manager.save(&mut second).await.unwrap();

    let first_id = first.id().unwrap().to_owned();
    assert_ne!(&first_id, second.id().unwrap());

    // Saving again keeps the identifier.
    first.insert("key", "value").unwrap();
    manager.save(&mut first).await.unwrap();
    assert_that!(first.id(), some(eq(&first_id)));
}

#[tokio::test]
async fn every_lookup_hits_the_store() {
    let (manager, call_tracker) = spy_manager();

    let mut session = manager.new_session(SESSION_NAME, None).await;
    let cookie = manager.save(&mut session).await.unwrap();
    call_tracker.reset_operation_log().await;

    manager.new_session(SESSION_NAME, Some(cookie.value())).await;
    manager.new_session(SESSION_NAME, Some(cookie.value())).await;

    let oplog = call_tracker.operation_log().await;
    assert_that!(oplog, len(eq(2)));
    assert!(oplog.iter().all(|op| op.starts_with("get session::")));
}

#[tokio::test]
async fn deleting_a_session_removes_it_from_the_store_and_the_client() {
    let manager = manager();

    let mut session = manager.new_session(SESSION_NAME, None).await;
    session.insert("user_id", 42).unwrap();
    let cookie = manager.save(&mut session).await.unwrap();
    let id = session.id().unwrap().to_owned();

    session.options_mut().max_age = -1;
    let removal = manager.save(&mut session).await.unwrap();
    assert_that!(removal, is_removal_cookie());
    assert_that!(raw_record(&manager, &id).await, none());

    let session = manager.new_session(SESSION_NAME, Some(cookie.value())).await;
    assert!(session.is_new());
}
