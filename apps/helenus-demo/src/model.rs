//! The `customers` table used by the demo

use std::sync::LazyLock;

use helenus::mapping::{ColumnValue, EntityDescriptor};
use helenus::{Entity, HelenusResult, Property, Row};
use scylla::value::CqlValue;
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq)]
pub struct Customer {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub tier: i32,
}

static CUSTOMERS: LazyLock<EntityDescriptor> = LazyLock::new(|| {
    EntityDescriptor::builder("Customer", "customers")
        .cacheable(true)
        .partition_key("id")
        .column("email")
        .unique()
        .indexed()
        .column("name")
        .column("tier")
        .build()
});

impl Customer {
    pub const ID: Property<Customer, Uuid> = Property::new("id");
    pub const EMAIL: Property<Customer, String> = Property::new("email");
    pub const NAME: Property<Customer, String> = Property::new("name");
    pub const TIER: Property<Customer, i32> = Property::new("tier");

    /// Deterministic sample customer
    pub fn sample(n: u32) -> Self {
        Self {
            id: Uuid::from_u128(0x00c0_ffee_0000_0000_0000_0000_0000_0000 | u128::from(n)),
            email: format!("customer{n}@example.com"),
            name: format!("Customer {n}"),
            tier: (n % 3) as i32,
        }
    }
}

impl Entity for Customer {
    fn descriptor() -> &'static EntityDescriptor {
        &CUSTOMERS
    }

    fn from_row(row: &Row) -> HelenusResult<Self> {
        Ok(Self {
            id: row.get(Customer::ID)?,
            email: row.get(Customer::EMAIL)?,
            name: row.get(Customer::NAME)?,
            tier: row.get(Customer::TIER)?,
        })
    }

    fn column_values(&self) -> Vec<(&'static str, Option<CqlValue>)> {
        vec![
            ("id", self.id.to_cql()),
            ("email", self.email.to_cql()),
            ("name", self.name.to_cql()),
            ("tier", self.tier.to_cql()),
        ]
    }
}

/// DDL for the demo keyspace and table
pub fn schema(keyspace: &str, replication_factor: u32) -> Vec<String> {
    vec![
        format!(
            "CREATE KEYSPACE IF NOT EXISTS {keyspace} WITH replication = \
             {{'class': 'SimpleStrategy', 'replication_factor': {replication_factor}}}"
        ),
        format!(
            "CREATE TABLE IF NOT EXISTS {keyspace}.customers \
             (id uuid PRIMARY KEY, email text, name text, tier int)"
        ),
        format!("CREATE INDEX IF NOT EXISTS ON {keyspace}.customers (email)"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_samples_are_stable_and_distinct() {
        assert_eq!(Customer::sample(1), Customer::sample(1));
        assert_ne!(Customer::sample(1).id, Customer::sample(2).id);
        assert_eq!(Customer::sample(4).email, "customer4@example.com");
    }

    #[test]
    fn test_row_round_trip() {
        let customer = Customer::sample(7);
        let row = Row::from_pairs([
            ("id", customer.id.to_cql()),
            ("email", customer.email.to_cql()),
            ("name", customer.name.to_cql()),
            ("tier", customer.tier.to_cql()),
        ]);
        assert_eq!(Customer::from_row(&row).unwrap(), customer);
    }

    #[test]
    fn test_schema_uses_keyspace() {
        let ddl = schema("shop", 3);
        assert!(ddl[0].contains("'replication_factor': 3"));
        assert!(ddl.iter().skip(1).all(|s| s.contains("shop.customers")));
    }
}
