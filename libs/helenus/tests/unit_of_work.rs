//! Reads and writes inside units of work
//!
//! Covers tombstones, promotion to the session cache on commit, nested
//! units, and the cache/database operation counters.

use helenus::prelude::*;
use test_utils::assertions::*;
use test_utils::fixtures::{Account, User, user_rows};
use test_utils::{RecordingExecutor, TestDataBuilder, int, text};

async fn read_age(session: &HelenusSession, uow: Option<&UnitOfWork>, id: i32) -> Option<i32> {
    let op = session.select(User::AGE).where_eq(User::ID, id).single();
    match uow {
        Some(uow) => op.sync_in(uow).await.unwrap(),
        None => op.sync().await.unwrap(),
    }
}

#[tokio::test]
async fn test_delete_tombstones_row_until_commit() {
    let executor = RecordingExecutor::new();
    let session = executor.session();
    session.update_cache(&User::new(100, "alex", 34)).unwrap();

    let uow = session.begin();
    session
        .delete::<User>()
        .where_eq(User::ID, 100)
        .sync_in(&uow)
        .await
        .unwrap();
    assert_eq!(
        executor.last_statement().unwrap().cql,
        "DELETE FROM simple_users WHERE id = ?"
    );

    assert_eq!(read_age(&session, Some(&uow), 100).await, None);
    assert_round_trips(&executor, 1, "tombstone answers the read");

    // Outside the unit the session still holds the row.
    assert_eq!(read_age(&session, None, 100).await, Some(34));
    assert_round_trips(&executor, 1, "session untouched before commit");

    let stats = uow.stats();
    assert_eq!(stats.database_operations, 1);
    assert_eq!(stats.cache_operations, 1);

    uow.commit().unwrap();
    assert_eq!(read_age(&session, None, 100).await, None);
    assert_round_trips(&executor, 2, "deleted row is read from the cluster");
}

#[tokio::test]
async fn test_fetched_rows_reach_session_only_on_commit() {
    let executor = RecordingExecutor::new();
    executor.push_result(user_rows(&[&User::new(100, "alex", 34)]));
    let session = executor.session();

    let uow = session.begin();
    let user = session
        .select_all::<User>()
        .where_eq(User::ID, 100)
        .single()
        .sync_in(&uow)
        .await
        .unwrap();
    assert_eq!(user, Some(User::new(100, "alex", 34)));

    assert_eq!(read_age(&session, Some(&uow), 100).await, Some(34));
    assert_round_trips(&executor, 1, "second read in the unit is cached");
    assert_eq!(session.session_cache().entry_count(), 0);

    // Miss in both caches (-1), one round trip, then a unit hit (+1).
    let stats = uow.stats();
    assert_eq!(stats.cache_operations, 0);
    assert_eq!(stats.database_operations, 1);

    uow.commit().unwrap();
    assert_eq!(read_age(&session, None, 100).await, Some(34));
    assert_round_trips(&executor, 1, "committed row is in the session cache");
}

#[tokio::test]
async fn test_session_hit_is_copied_into_unit() {
    let executor = RecordingExecutor::new();
    let session = executor.session();
    session.update_cache(&User::new(100, "alex", 34)).unwrap();

    let uow = session.begin();
    assert_eq!(read_age(&session, Some(&uow), 100).await, Some(34));
    assert_eq!(uow.stats().cache_operations, 1);

    // Answered by the unit this time.
    session.session_cache().clear();
    assert_eq!(read_age(&session, Some(&uow), 100).await, Some(34));

    let stats = uow.stats();
    assert_eq!(stats.cache_operations, 2);
    assert_eq!(stats.database_operations, 0);
    assert_round_trips(&executor, 0, "no statement sent");

    // Rows copied from the session are not published back.
    uow.commit().unwrap();
    assert_eq!(read_age(&session, None, 100).await, None);
    assert_round_trips(&executor, 1, "session read after clear");
}

#[tokio::test]
async fn test_update_in_unit_is_isolated_until_commit() {
    let executor = RecordingExecutor::new();
    let session = executor.session();
    session.update_cache(&User::new(100, "alex", 34)).unwrap();

    let uow = session.begin();
    session
        .update()
        .set(User::AGE, 35)
        .where_eq(User::ID, 100)
        .sync_in(&uow)
        .await
        .unwrap();

    assert_eq!(read_age(&session, Some(&uow), 100).await, Some(35));
    assert_eq!(read_age(&session, None, 100).await, Some(34));
    assert_round_trips(&executor, 1, "only the update was sent");

    uow.commit().unwrap();
    assert_eq!(read_age(&session, None, 100).await, Some(35));
    assert_round_trips(&executor, 1, "update published on commit");
}

#[tokio::test]
async fn test_update_without_keys_evicts_table() {
    let executor = RecordingExecutor::new();
    let session = executor.session();
    session.update_cache(&User::new(100, "alex", 34)).unwrap();

    let uow = session.begin();
    read_age(&session, Some(&uow), 100).await;

    session
        .update()
        .set(User::NAME, "anon".to_string())
        .where_(User::ID.is_in(vec![100, 101]))
        .sync_in(&uow)
        .await
        .unwrap();

    executor.push_rows(&["age"], vec![vec![int(34)]]);
    assert_eq!(read_age(&session, Some(&uow), 100).await, Some(34));
    assert_round_trips(&executor, 2, "evicted rows are fetched again");

    uow.commit().unwrap();
    session
        .update()
        .set(User::AGE, 40)
        .where_(User::AGE.gt(30))
        .sync()
        .await
        .unwrap();
    executor.push_rows(&["age"], vec![vec![int(40)]]);
    assert_eq!(read_age(&session, None, 100).await, Some(40));
    assert_round_trips(&executor, 4, "session rows evicted by a keyless update");
}

#[tokio::test]
async fn test_abort_discards_unit_rows() {
    let executor = RecordingExecutor::new();
    executor.push_result(user_rows(&[&User::new(100, "alex", 34)]));
    let session = executor.session();

    let uow = session.begin();
    read_age(&session, Some(&uow), 100).await;
    uow.abort().unwrap();

    assert!(uow.is_done());
    assert_eq!(session.session_cache().entry_count(), 0);

    executor.push_rows(&["age"], vec![vec![int(34)]]);
    assert_eq!(read_age(&session, None, 100).await, Some(34));
    assert_round_trips(&executor, 2, "aborted rows were not published");
}

#[tokio::test]
async fn test_nested_unit_folds_into_parent() {
    let executor = RecordingExecutor::new();
    executor.push_result(user_rows(&[&User::new(100, "alex", 34)]));
    let session = executor.session();

    let outer = session.begin();
    let inner = outer.begin_nested();
    read_age(&session, Some(&inner), 100).await;
    inner.commit().unwrap();

    assert_eq!(outer.stats().database_operations, 1);
    assert_eq!(session.session_cache().entry_count(), 0);
    assert_eq!(read_age(&session, Some(&outer), 100).await, Some(34));
    assert_round_trips(&executor, 1, "parent sees the nested row");

    outer.commit().unwrap();
    assert_eq!(read_age(&session, None, 100).await, Some(34));
    assert_round_trips(&executor, 1, "outer commit publishes");
}

#[tokio::test]
async fn test_insert_in_unit_then_read() {
    let executor = RecordingExecutor::new();
    let session = executor.session();

    let uow = session.begin();
    session
        .insert(&User::new(7, "kim", 29))
        .sync_in(&uow)
        .await
        .unwrap();

    let user = session
        .select((User::NAME, User::AGE))
        .where_eq(User::ID, 7)
        .single()
        .sync_in(&uow)
        .await
        .unwrap();
    assert_eq!(user, Some(("kim".to_string(), 29)));
    assert_round_trips(&executor, 1, "insert only");

    uow.commit().unwrap();
    assert_eq!(read_age(&session, None, 7).await, Some(29));
    assert_round_trips(&executor, 1, "inserted row published");
}

#[tokio::test]
async fn test_ignore_cache_in_unit_does_not_populate() {
    let executor = RecordingExecutor::new();
    executor
        .push_rows(&["age"], vec![vec![int(34)]])
        .push_rows(&["age"], vec![vec![int(34)]]);
    let session = executor.session();

    let uow = session.begin();
    let age = session
        .select(User::AGE)
        .where_eq(User::ID, 100)
        .single()
        .ignore_cache()
        .sync_in(&uow)
        .await
        .unwrap();
    assert_eq!(age, Some(34));

    assert_eq!(read_age(&session, Some(&uow), 100).await, Some(34));
    assert_round_trips(&executor, 2, "ignored read left nothing behind");
}

#[tokio::test]
async fn test_spawn_in_matches_sync_in() {
    let executor = RecordingExecutor::new();
    executor.push_rows(&["override_name"], vec![vec![text("alex")]]);
    let session = executor.session();

    let uow = session.begin();
    let name = session
        .select(User::NAME)
        .where_eq(User::ID, 100)
        .single()
        .spawn_in(&uow)
        .await
        .unwrap();
    assert_eq!(name, Some("alex".to_string()));

    let again = session
        .select(User::NAME)
        .where_eq(User::ID, 100)
        .single()
        .sync_in(&uow)
        .await
        .unwrap();
    assert_eq!(again, name);
    assert_round_trips(&executor, 1, "spawned read populated the unit");
}

#[tokio::test]
async fn test_commit_twice_fails() {
    let session = RecordingExecutor::new().session();
    let uow = session.begin();
    uow.commit().unwrap();

    let err = uow.commit().unwrap_err();
    assert!(err.to_string().contains("already committed"));
}

async fn balance_by_email(
    session: &HelenusSession,
    uow: Option<&UnitOfWork>,
    email: &str,
) -> Option<i32> {
    let op = session
        .select(Account::BALANCE)
        .where_eq(Account::EMAIL, email.to_string())
        .single();
    match uow {
        Some(uow) => op.sync_in(uow).await.unwrap(),
        None => op.sync().await.unwrap(),
    }
}

#[tokio::test]
async fn test_unique_column_change_masks_previous_key() {
    let builder = TestDataBuilder::from_test_name("uow_email_change");
    let account = builder.account(1);
    let new_email = "renamed@example.com";

    let executor = RecordingExecutor::new();
    let session = executor.session();
    session.update_cache(&account).unwrap();

    let uow = session.begin();
    let before = session
        .select(Account::BALANCE)
        .where_eq(Account::ID, account.id)
        .single()
        .sync_in(&uow)
        .await
        .unwrap();
    assert_eq!(before, Some(account.balance));
    assert_round_trips(&executor, 0, "row copied from the session");

    session
        .update()
        .set(Account::EMAIL, new_email.to_string())
        .where_eq(Account::ID, account.id)
        .sync_in(&uow)
        .await
        .unwrap();
    assert_round_trips(&executor, 1, "update only");

    assert_eq!(balance_by_email(&session, Some(&uow), &account.email).await, None);
    assert_eq!(
        balance_by_email(&session, Some(&uow), new_email).await,
        Some(account.balance)
    );
    assert_round_trips(&executor, 1, "both emails answered by the unit");

    uow.commit().unwrap();

    assert_eq!(balance_by_email(&session, None, new_email).await, Some(account.balance));
    assert_round_trips(&executor, 1, "new email published to the session");

    assert_eq!(balance_by_email(&session, None, &account.email).await, None);
    assert_round_trips(&executor, 2, "old email is no longer cached");
}
