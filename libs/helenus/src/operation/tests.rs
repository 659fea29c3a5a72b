use std::sync::{Arc, LazyLock};
use std::time::Duration;

use scylla::statement::Consistency;
use scylla::value::CqlValue;

use super::*;
use crate::config::SessionConfig;
use crate::driver::MockStatementExecutor;
use crate::error::{HelenusError, HelenusResult};
use crate::mapping::{Entity, EntityDescriptor, OrderingDirection, Property, ResultSet, Row};
use crate::session::HelenusSession;

struct Player;

static PLAYERS: LazyLock<EntityDescriptor> = LazyLock::new(|| {
    EntityDescriptor::builder("Player", "players")
        .cacheable(true)
        .partition_key("team")
        .clustering_column("number", OrderingDirection::Asc)
        .column("name")
        .column("goals")
        .build()
});

impl Player {
    const TEAM: Property<Player, String> = Property::new("team");
    const NUMBER: Property<Player, i32> = Property::new("number");
    const NAME: Property<Player, String> = Property::new("name");
    const GOALS: Property<Player, i64> = Property::new("goals");
}

impl Entity for Player {
    fn descriptor() -> &'static EntityDescriptor {
        &PLAYERS
    }

    fn from_row(_row: &Row) -> HelenusResult<Self> {
        Ok(Player)
    }

    fn column_values(&self) -> Vec<(&'static str, Option<CqlValue>)> {
        Vec::new()
    }
}

struct Team;

static TEAMS: LazyLock<EntityDescriptor> = LazyLock::new(|| {
    EntityDescriptor::builder("Team", "teams")
        .partition_key("name")
        .build()
});

impl Team {
    const NAME: Property<Team, String> = Property::new("name");
}

impl Entity for Team {
    fn descriptor() -> &'static EntityDescriptor {
        &TEAMS
    }

    fn from_row(_row: &Row) -> HelenusResult<Self> {
        Ok(Team)
    }

    fn column_values(&self) -> Vec<(&'static str, Option<CqlValue>)> {
        Vec::new()
    }
}

fn session(executor: MockStatementExecutor) -> HelenusSession {
    HelenusSession::builder(Arc::new(executor)).build()
}

fn count_result(count: i64) -> ResultSet {
    ResultSet::new(
        vec!["count".to_string()],
        vec![vec![Some(CqlValue::BigInt(count))]],
    )
}

#[tokio::test]
async fn test_construction_error_skips_executor() {
    let mut executor = MockStatementExecutor::new();
    executor.expect_execute().times(0);
    let session = session(executor);

    let err = session
        .select((Player::NAME, Team::NAME))
        .sync()
        .await
        .unwrap_err();
    assert!(matches!(err, HelenusError::Mapping(_)));
    assert!(err
        .to_string()
        .contains("you can select columns only from a single entity Player or Team"));

    let err = session.select_raw().sync().await.unwrap_err();
    assert!(err.to_string().contains("no entity or table to select data"));
}

#[tokio::test]
async fn test_invalid_filter_surfaces_on_execute() {
    let mut executor = MockStatementExecutor::new();
    executor.expect_execute().times(0);
    let session = session(executor);

    let err = session
        .select(Player::NAME)
        .where_(Player::NUMBER.is_in(vec![]))
        .single()
        .sync()
        .await
        .unwrap_err();
    assert!(matches!(err, HelenusError::InvalidArgument(_)));
    assert!(err.to_string().contains("values is empty"));
}

#[tokio::test]
async fn test_execution_error_is_returned_unchanged() {
    let mut executor = MockStatementExecutor::new();
    executor
        .expect_execute()
        .times(1)
        .returning(|_, _| Err(HelenusError::Driver("connection reset".into())));
    let session = session(executor);

    let err = session
        .select(Player::NAME)
        .where_eq(Player::TEAM, "reds".to_string())
        .sync()
        .await
        .unwrap_err();
    assert!(matches!(err, HelenusError::Driver(ref message) if message == "connection reset"));
    assert_eq!(session.statistics().database_requests, 1);
}

#[tokio::test]
async fn test_execution_options() {
    let mut executor = MockStatementExecutor::new();
    executor
        .expect_execute()
        .withf(|statement, options| {
            statement.cql == "SELECT count(*) FROM players WHERE team = ?"
                && options.timeout == Some(Duration::from_millis(250))
                && options.consistency == Some(Consistency::Quorum)
                && options.idempotent
                && !options.tracing
        })
        .times(1)
        .returning(|_, _| Ok(count_result(11)));
    let session = HelenusSession::builder(Arc::new(executor))
        .config(SessionConfig::default().with_query_timeout(Duration::from_millis(250)))
        .build();

    let count = session
        .count::<Player>()
        .where_eq(Player::TEAM, "reds".to_string())
        .consistency_quorum()
        .sync()
        .await
        .unwrap();
    assert_eq!(count, 11);
}

#[tokio::test]
async fn test_operation_timeout_overrides_session_default() {
    let mut executor = MockStatementExecutor::new();
    executor
        .expect_execute()
        .withf(|_, options| options.timeout == Some(Duration::from_secs(2)) && !options.idempotent)
        .times(1)
        .returning(|_, _| Ok(ResultSet::empty()));
    let session = HelenusSession::builder(Arc::new(executor))
        .config(SessionConfig::default().with_query_timeout(Duration::from_millis(250)))
        .build();

    session
        .update()
        .increment(Player::GOALS, 1)
        .where_eq(Player::TEAM, "reds".to_string())
        .and_eq(Player::NUMBER, 9)
        .query_timeout(Duration::from_secs(2))
        .sync()
        .await
        .unwrap();
}

#[tokio::test]
async fn test_spawn_runs_the_same_path() {
    let mut executor = MockStatementExecutor::new();
    executor
        .expect_execute()
        .times(2)
        .returning(|_, _| Ok(count_result(3)));
    let session = session(executor);

    let op = session
        .count::<Player>()
        .where_eq(Player::TEAM, "reds".to_string());
    let spawned = op.clone().spawn().await.unwrap();
    let direct = op.sync().await.unwrap();
    assert_eq!(spawned, direct);

    let err = session
        .select((Player::NAME, Team::NAME))
        .spawn()
        .await
        .unwrap_err();
    assert!(err.is_construction_error());
}

#[test]
fn test_order_by_requires_clustering_column() {
    let session = session(MockStatementExecutor::new());

    let cql = session
        .select(Player::NAME)
        .where_eq(Player::TEAM, "reds".to_string())
        .order_by(Player::NUMBER, OrderingDirection::Desc)
        .limit(5)
        .cql()
        .unwrap();
    assert_eq!(
        cql,
        "SELECT name FROM players WHERE team = ? ORDER BY number DESC LIMIT 5"
    );

    let err = session
        .select(Player::NAME)
        .order_by(Player::GOALS, OrderingDirection::Asc)
        .cql()
        .unwrap_err();
    assert!(err
        .to_string()
        .contains("property must be a clustering column Player.goals"));
}

#[test]
fn test_map_to_rejects_foreign_projection() {
    let session = session(MockStatementExecutor::new());
    let err = session
        .select(Team::NAME)
        .map_to::<Player>()
        .cql()
        .unwrap_err();
    assert!(err.to_string().contains("cannot map Team.name to entity Player"));

    let cql = session.select_raw().column(Player::NAME).map_to::<Player>().cql().unwrap();
    assert_eq!(cql, "SELECT team, number, name, goals FROM players");
}

#[test]
fn test_filters_must_match_entity() {
    let session = session(MockStatementExecutor::new());
    let err = session
        .select(Player::NAME)
        .where_eq(Team::NAME, "reds".to_string())
        .cql()
        .unwrap_err();
    assert!(err
        .to_string()
        .contains("filter on Team.name does not belong to entity Player"));
}

#[test]
fn test_delete_without_filters_truncates() {
    let session = session(MockStatementExecutor::new());
    assert_eq!(session.delete::<Player>().cql().unwrap(), "TRUNCATE players");

    // Conditions cannot guard a truncate and are dropped
    let cql = session
        .delete::<Player>()
        .only_if_eq(Player::GOALS, 0)
        .cql()
        .unwrap();
    assert_eq!(cql, "TRUNCATE players");

    let cql = session
        .delete::<Player>()
        .where_eq(Player::TEAM, "reds".to_string())
        .and_eq(Player::NUMBER, 9)
        .if_exists()
        .cql()
        .unwrap();
    assert_eq!(cql, "DELETE FROM players WHERE team = ? AND number = ? IF EXISTS");
}

#[test]
fn test_update_requires_assignments() {
    let session = session(MockStatementExecutor::new());
    let err = session
        .update()
        .where_eq(Player::TEAM, "reds".to_string())
        .cql()
        .unwrap_err();
    assert!(err.to_string().contains("no columns to update in entity Player"));

    let err = session.update().cql().unwrap_err();
    assert!(err.to_string().contains("no entity or table to update data"));
}
