//! Construction errors are reported by `build_statement` and never reach the cluster

use helenus::prelude::*;
use helenus::{HelenusError, Postulate, Row};
use strum::IntoEnumIterator;
use test_utils::RecordingExecutor;
use test_utils::assertions::*;
use test_utils::fixtures::{Account, User};

#[test]
fn test_postulate_validation() {
    let err = Postulate::of(Operator::In, 1).unwrap_err();
    assert!(matches!(err, HelenusError::InvalidArgument(_)));

    let err = Postulate::<i32>::of_many(Operator::In, Vec::new()).unwrap_err();
    assert_eq!(err.to_string(), "Invalid argument: values is empty");

    let err = Postulate::of_many(Operator::In, vec![Some(1), Some(2), None]).unwrap_err();
    assert!(err.to_string().contains("value[2] is empty"));

    let err = Postulate::of(Operator::Eq, None::<i32>).unwrap_err();
    assert!(err.to_string().contains("value is empty"));

    assert!(Postulate::of_many(Operator::Gt, vec![1]).is_err());
}

#[test]
fn test_operator_symbols() {
    let symbols: Vec<&str> = Operator::iter().map(Operator::symbol).collect();
    assert_eq!(symbols, vec!["==", "in", "<", "<=", ">", ">="]);

    for operator in Operator::iter() {
        assert_eq!(Operator::find_by_operator(operator.symbol()), Some(operator));
    }
    assert_eq!(Operator::find_by_operator("!="), None);
    assert!(Filter::parse(User::AGE, "!=", 3).is_err());
    assert!(Filter::parse(User::AGE, ">=", 3).is_ok());
}

#[tokio::test]
async fn test_raw_projection_with_limit() {
    let session = RecordingExecutor::new().session();
    let cql = session
        .select_raw()
        .column(User::ID)
        .column(User::AGE)
        .limit(10)
        .cql()
        .unwrap();
    assert_eq!(cql, "SELECT id, age FROM simple_users LIMIT 10");
}

#[tokio::test]
async fn test_unresolved_getter() {
    let session = RecordingExecutor::new().session();
    let missing: Property<User, i32> = Property::new("missing");

    let result = session.select(missing).cql();
    assert_construction_error(result, "unresolved getter missing on entity User");

    let result = session
        .update()
        .set(missing, 1)
        .where_eq(User::ID, 1)
        .cql();
    assert_construction_error(result, "unresolved getter missing");
}

#[tokio::test]
async fn test_only_if_is_ignored_by_select() {
    let executor = RecordingExecutor::new();
    let session = executor.session();

    let rows = session
        .select(User::NAME)
        .where_eq(User::ID, 1)
        .only_if_eq(User::AGE, 30)
        .sync()
        .await
        .unwrap();
    assert!(rows.is_empty());
    assert_eq!(
        executor.last_statement().unwrap().cql,
        "SELECT override_name FROM simple_users WHERE id = ?"
    );
}

#[tokio::test]
async fn test_write_construction_errors() {
    let session = RecordingExecutor::new().session();

    assert_construction_error(
        session
            .update()
            .set(User::AGE, 1)
            .set(Account::BALANCE, 1)
            .cql(),
        "you can update columns only in a single entity User or Account",
    );
    assert_construction_error(session.insert_raw().cql(), "no columns to insert");
    assert_construction_error(
        session
            .insert_raw()
            .value(User::ID, 1)
            .value(Account::BALANCE, 1)
            .cql(),
        "you can insert columns only into a single entity User or Account",
    );
}

#[tokio::test]
async fn test_map_to_entity() {
    let executor = RecordingExecutor::new();
    let session = executor.session();

    let cql = session
        .select_raw()
        .column(User::NAME)
        .where_eq(User::ID, 1)
        .map_to::<User>()
        .cql()
        .unwrap();
    assert_eq!(cql, "SELECT id, override_name, age FROM simple_users WHERE id = ?");

    // Raw rows come back unchanged.
    executor.push_rows(&["id"], vec![vec![test_utils::int(4)]]);
    let rows: Vec<Row> = session
        .select_raw()
        .column(User::ID)
        .sync()
        .await
        .unwrap();
    assert_eq!(rows[0].get(User::ID).unwrap(), 4);
}

#[tokio::test]
async fn test_conditions_and_if_exists_are_exclusive() {
    let executor = RecordingExecutor::new();
    let session = executor.session();

    let result = session
        .update()
        .set(User::AGE, 35)
        .where_eq(User::ID, 1)
        .only_if_eq(User::AGE, 34)
        .if_exists()
        .sync()
        .await;
    assert_construction_error(result, "only_if and if_exists cannot be combined");

    let result = session
        .delete::<User>()
        .where_eq(User::ID, 1)
        .if_exists()
        .only_if_eq(User::AGE, 34)
        .sync()
        .await;
    assert_construction_error(result, "only_if and if_exists cannot be combined");
    assert_round_trips(&executor, 0, "rejected before execution");

    let cql = session
        .delete::<User>()
        .where_eq(User::ID, 1)
        .only_if_eq(User::AGE, 34)
        .cql()
        .unwrap();
    assert_eq!(cql, "DELETE FROM simple_users WHERE id = ? IF age = ?");
}
