//! Demo commands, each run against one session

use eyre::{Result, WrapErr};
use helenus::driver::ExecutionOptions;
use helenus::prelude::*;
use helenus::query::BuiltStatement;
use helenus::uow::UnitOfWorkStats;
use helenus::{CacheStatistics, StatementExecutor};
use serde::Serialize;
use tracing::info;

use crate::model::{self, Customer};

/// Run raw DDL through the session executor
pub async fn create_schema(
    session: &HelenusSession,
    keyspace: &str,
    replication_factor: u32,
) -> Result<()> {
    for cql in model::schema(keyspace, replication_factor) {
        info!(%cql, "Applying schema");
        let statement = BuiltStatement {
            cql,
            values: Vec::new(),
            idempotent: true,
        };
        session
            .executor()
            .execute(statement, ExecutionOptions::default())
            .await
            .wrap_err("failed to apply schema")?;
    }
    Ok(())
}

/// Insert `count` sample customers inside one unit of work
pub async fn seed(session: &HelenusSession, count: u32) -> Result<UnitOfWorkStats> {
    let uow = session.begin();
    for n in 1..=count {
        session
            .insert(&Customer::sample(n))
            .sync_in(&uow)
            .await
            .wrap_err_with(|| format!("failed to insert customer {n}"))?;
    }
    let stats = uow.stats();
    uow.commit()?;
    info!(count, "Seeded customers");
    Ok(stats)
}

#[derive(Debug, Serialize)]
pub struct LookupReport {
    pub customer: Option<String>,
    pub lookups: u32,
    pub statistics: CacheStatistics,
}

/// Look a customer up repeatedly by primary key or by email
pub async fn lookup(
    session: &HelenusSession,
    n: u32,
    repeat: u32,
    by_email: bool,
) -> Result<LookupReport> {
    let sample = Customer::sample(n);
    let mut found = None;
    for _ in 0..repeat.max(1) {
        let op = session.select((Customer::NAME, Customer::TIER));
        let op = if by_email {
            op.where_eq(Customer::EMAIL, sample.email.clone())
        } else {
            op.where_eq(Customer::ID, sample.id)
        };
        found = op.single().sync().await?;
    }
    Ok(LookupReport {
        customer: found.map(|(name, tier)| format!("{name} (tier {tier})")),
        lookups: repeat.max(1),
        statistics: session.statistics(),
    })
}

/// Change a customer's tier in a unit of work and read it back before commit
pub async fn promote(session: &HelenusSession, n: u32, tier: i32) -> Result<UnitOfWorkStats> {
    let sample = Customer::sample(n);
    let uow = session.begin();

    session
        .update()
        .set(Customer::TIER, tier)
        .where_eq(Customer::ID, sample.id)
        .consistency_quorum()
        .sync_in(&uow)
        .await?;

    let seen = session
        .select(Customer::TIER)
        .where_eq(Customer::ID, sample.id)
        .single()
        .sync_in(&uow)
        .await?;
    info!(customer = n, ?seen, "Tier inside unit of work");

    let stats = uow.stats();
    uow.commit()?;
    Ok(stats)
}

/// Remove one customer, or every customer when `n` is `None`
pub async fn remove(session: &HelenusSession, n: Option<u32>) -> Result<()> {
    let delete = session.delete::<Customer>();
    match n {
        Some(n) => {
            delete
                .where_eq(Customer::ID, Customer::sample(n).id)
                .sync()
                .await?;
        }
        None => {
            delete.sync().await?;
        }
    }
    Ok(())
}

pub async fn count(session: &HelenusSession) -> Result<i64> {
    Ok(session.count::<Customer>().sync().await?)
}
