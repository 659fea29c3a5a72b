//! Write-through and eviction of the session cache by mutations

use helenus::CacheConfig;
use helenus::prelude::*;
use test_utils::assertions::*;
use test_utils::fixtures::{Account, Post, User, account_rows, user_rows};
use test_utils::{RecordingExecutor, TestDataBuilder, int};

async fn cached_age(session: &HelenusSession, id: i32) -> Option<i32> {
    session
        .select(User::AGE)
        .where_eq(User::ID, id)
        .single()
        .sync()
        .await
        .unwrap()
}

#[tokio::test]
async fn test_update_writes_through_known_values() {
    let executor = RecordingExecutor::new();
    let session = executor.session();
    session.update_cache(&User::new(100, "alex", 34)).unwrap();

    session
        .update()
        .set(User::AGE, 35)
        .where_eq(User::ID, 100)
        .sync()
        .await
        .unwrap();
    assert_eq!(
        executor.last_statement().unwrap().cql,
        "UPDATE simple_users SET age = ? WHERE id = ?"
    );

    let user = session
        .select_all::<User>()
        .where_eq(User::ID, 100)
        .single()
        .sync()
        .await
        .unwrap();
    assert_eq!(user, Some(User::new(100, "alex", 35)));
    assert_round_trips(&executor, 1, "update only");
}

#[tokio::test]
async fn test_collection_update_drops_cached_column() {
    let builder = TestDataBuilder::from_test_name("collection_update");
    let account = builder.account(1);

    let executor = RecordingExecutor::new();
    let session = executor.session();
    session.update_cache(&account).unwrap();

    session
        .update()
        .append(Account::TAGS, "vip".to_string())
        .where_eq(Account::ID, account.id)
        .sync()
        .await
        .unwrap();
    assert_eq!(
        executor.last_statement().unwrap().cql,
        "UPDATE accounts SET tags = tags + ? WHERE id = ?"
    );

    // Other columns are still served from the cache.
    let email = session
        .select(Account::EMAIL)
        .where_eq(Account::ID, account.id)
        .single()
        .sync()
        .await
        .unwrap();
    assert_eq!(email, Some(account.email.clone()));
    assert_round_trips(&executor, 1, "email is still cached");

    let mut updated = account.clone();
    updated.tags.push("vip".to_string());
    executor.push_result(account_rows(&[&updated]));
    let fetched = session
        .select_all::<Account>()
        .where_eq(Account::ID, account.id)
        .single()
        .sync()
        .await
        .unwrap();
    assert_eq!(fetched, Some(updated));
    assert_round_trips(&executor, 2, "tags must come from the cluster");
}

#[tokio::test]
async fn test_rejected_conditional_update_leaves_cache() {
    let executor = RecordingExecutor::new();
    executor.push_applied(false);
    let session = executor.session();
    session.update_cache(&User::new(100, "alex", 34)).unwrap();

    let result = session
        .update()
        .set(User::AGE, 35)
        .where_eq(User::ID, 100)
        .only_if_eq(User::AGE, 30)
        .sync()
        .await
        .unwrap();
    assert!(!result.was_applied());
    assert_eq!(
        executor.last_statement().unwrap().cql,
        "UPDATE simple_users SET age = ? WHERE id = ? IF age = ?"
    );

    assert_eq!(cached_age(&session, 100).await, Some(34));
}

#[tokio::test]
async fn test_counter_update_renders_increment() {
    let executor = RecordingExecutor::new();
    let session = executor.session();

    let cql = session
        .update()
        .increment(Post::POSTED_AT, 1)
        .where_eq(Post::AUTHOR, 7)
        .ttl(60)
        .cql()
        .unwrap();
    assert_eq!(
        cql,
        "UPDATE posts USING TTL 60 SET posted_at = posted_at + ? WHERE author = ?"
    );
}

#[tokio::test]
async fn test_insert_writes_through() {
    let executor = RecordingExecutor::new();
    let session = executor.session();

    session
        .insert(&User::new(7, "kim", 29))
        .sync()
        .await
        .unwrap();
    assert_eq!(
        executor.last_statement().unwrap().cql,
        "INSERT INTO simple_users (id, override_name, age) VALUES (?, ?, ?)"
    );

    assert_eq!(cached_age(&session, 7).await, Some(29));
    assert_round_trips(&executor, 1, "insert only");
}

#[tokio::test]
async fn test_insert_if_not_exists_not_applied() {
    let executor = RecordingExecutor::new();
    executor.push_applied(false);
    let session = executor.session();

    let result = session
        .insert(&User::new(7, "kim", 29))
        .if_not_exists()
        .sync()
        .await
        .unwrap();
    assert!(!result.was_applied());
    assert!(executor.last_statement().unwrap().cql.ends_with("IF NOT EXISTS"));

    executor.push_result(user_rows(&[&User::new(7, "kim", 31)]));
    assert_eq!(cached_age(&session, 7).await, Some(31));
    assert_round_trips(&executor, 2, "rejected insert was not cached");
}

#[tokio::test]
async fn test_insert_then_lookup_by_unique_column() {
    let builder = TestDataBuilder::from_test_name("insert_unique");
    let account = builder.account(3);

    let executor = RecordingExecutor::new();
    let session = executor.session();
    session.insert(&account).sync().await.unwrap();

    let balance = session
        .select(Account::BALANCE)
        .where_eq(Account::EMAIL, account.email.clone())
        .single()
        .sync()
        .await
        .unwrap();
    assert_eq!(balance, Some(account.balance));
    assert_round_trips(&executor, 1, "unique facet written by insert");
}

#[tokio::test]
async fn test_raw_insert_uses_given_columns() {
    let executor = RecordingExecutor::new();
    let session = executor.session();

    session
        .insert_raw()
        .value(User::ID, 9)
        .value(User::AGE, 20)
        .value(User::AGE, 21)
        .ttl(30)
        .sync()
        .await
        .unwrap();
    assert_eq!(
        executor.last_statement().unwrap().cql,
        "INSERT INTO simple_users (id, age) VALUES (?, ?) USING TTL 30"
    );
    assert_eq!(cached_age(&session, 9).await, Some(21));
}

#[tokio::test]
async fn test_delete_evicts_every_facet() {
    let builder = TestDataBuilder::from_test_name("delete_evicts");
    let account = builder.account(2);

    let executor = RecordingExecutor::new();
    let session = executor.session();
    session.update_cache(&account).unwrap();

    session
        .delete::<Account>()
        .where_eq(Account::ID, account.id)
        .sync()
        .await
        .unwrap();

    let by_email = session
        .select_all::<Account>()
        .where_eq(Account::EMAIL, account.email.clone())
        .single()
        .sync()
        .await
        .unwrap();
    assert_eq!(by_email, None);
    assert_round_trips(&executor, 2, "unique facet evicted with the row");
}

#[tokio::test]
async fn test_truncate_evicts_table() {
    let executor = RecordingExecutor::new();
    let session = executor.session();
    session.update_cache(&User::new(1, "a", 20)).unwrap();
    session.update_cache(&User::new(2, "b", 30)).unwrap();

    let delete = session.delete::<User>();
    assert!(delete.is_truncate());
    delete.sync().await.unwrap();
    assert_eq!(
        executor.last_statement().unwrap().cql,
        "TRUNCATE simple_users"
    );

    assert_eq!(cached_age(&session, 1).await, None);
    assert_eq!(cached_age(&session, 2).await, None);
    assert_round_trips(&executor, 3, "both rows evicted");
}

#[tokio::test]
async fn test_uncacheable_update_is_not_written() {
    let executor = RecordingExecutor::new();
    let session = executor.session_with(
        SessionConfig::default().with_cache(CacheConfig::disabled()),
    );
    session
        .update()
        .set(User::AGE, 35)
        .where_eq(User::ID, 100)
        .sync()
        .await
        .unwrap();

    executor.push_rows(&["age"], vec![vec![int(35)]]);
    assert_eq!(cached_age(&session, 100).await, Some(35));
    assert_round_trips(&executor, 2, "disabled cache");
    assert_eq!(session.session_cache().entry_count(), 0);
}

#[tokio::test]
async fn test_unique_column_change_rekeys_session_row() {
    let builder = TestDataBuilder::from_test_name("email_change");
    let account = builder.account(1);
    let new_email = "renamed@example.com".to_string();

    let executor = RecordingExecutor::new();
    let session = executor.session();
    session.update_cache(&account).unwrap();

    session
        .update()
        .set(Account::EMAIL, new_email.clone())
        .where_eq(Account::ID, account.id)
        .sync()
        .await
        .unwrap();

    let by_new = session
        .select(Account::BALANCE)
        .where_eq(Account::EMAIL, new_email)
        .single()
        .sync()
        .await
        .unwrap();
    assert_eq!(by_new, Some(account.balance));
    assert_round_trips(&executor, 1, "new email is cached");

    let by_old = session
        .select(Account::BALANCE)
        .where_eq(Account::EMAIL, account.email.clone())
        .single()
        .sync()
        .await
        .unwrap();
    assert_eq!(by_old, None);
    assert_round_trips(&executor, 2, "old email goes to the cluster");
}
