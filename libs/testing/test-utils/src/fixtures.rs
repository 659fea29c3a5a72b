//! Entity fixtures shared by the integration tests and the demo.

use std::sync::LazyLock;

use helenus::mapping::{ColumnValue, EntityDescriptor, OrderingDirection};
use helenus::{Entity, HelenusResult, Property, ResultSet, Row};
use scylla::value::CqlValue;
use uuid::Uuid;

/// A cacheable user keyed by `id`; `name` is stored in `override_name`
#[derive(Clone, Debug, PartialEq)]
pub struct User {
    pub id: i32,
    pub name: String,
    pub age: i32,
}

static USERS: LazyLock<EntityDescriptor> = LazyLock::new(|| {
    EntityDescriptor::builder("User", "simple_users")
        .cacheable(true)
        .partition_key("id")
        .column("name")
        .with_column_name("override_name")
        .column("age")
        .build()
});

impl User {
    pub const ID: Property<User, i32> = Property::new("id");
    pub const NAME: Property<User, String> = Property::new("name");
    pub const AGE: Property<User, i32> = Property::new("age");

    pub fn new(id: i32, name: impl Into<String>, age: i32) -> Self {
        Self {
            id,
            name: name.into(),
            age,
        }
    }

    pub const COLUMNS: [&'static str; 3] = ["id", "override_name", "age"];

    /// Row values in [`User::COLUMNS`] order
    pub fn values(&self) -> Vec<Option<CqlValue>> {
        vec![self.id.to_cql(), self.name.to_cql(), self.age.to_cql()]
    }
}

impl Entity for User {
    fn descriptor() -> &'static EntityDescriptor {
        &USERS
    }

    fn from_row(row: &Row) -> HelenusResult<Self> {
        Ok(Self {
            id: row.get(User::ID)?,
            name: row.get(User::NAME)?,
            age: row.get(User::AGE)?,
        })
    }

    fn column_values(&self) -> Vec<(&'static str, Option<CqlValue>)> {
        vec![
            ("id", self.id.to_cql()),
            ("name", self.name.to_cql()),
            ("age", self.age.to_cql()),
        ]
    }
}

/// Full `simple_users` rows for queueing on a recording executor
pub fn user_rows(users: &[&User]) -> ResultSet {
    ResultSet::new(
        User::COLUMNS.iter().map(|c| c.to_string()).collect(),
        users.iter().map(|u| u.values()).collect(),
    )
}

/// A cacheable account reachable by `id` or by its unique `email`
#[derive(Clone, Debug, PartialEq)]
pub struct Account {
    pub id: Uuid,
    pub email: String,
    pub balance: i32,
    pub tags: Vec<String>,
}

static ACCOUNTS: LazyLock<EntityDescriptor> = LazyLock::new(|| {
    EntityDescriptor::builder("Account", "accounts")
        .cacheable(true)
        .partition_key("id")
        .column("email")
        .unique()
        .indexed()
        .column("balance")
        .column("tags")
        .build()
});

impl Account {
    pub const ID: Property<Account, Uuid> = Property::new("id");
    pub const EMAIL: Property<Account, String> = Property::new("email");
    pub const BALANCE: Property<Account, i32> = Property::new("balance");
    pub const TAGS: Property<Account, Vec<String>> = Property::new("tags");

    pub const COLUMNS: [&'static str; 4] = ["id", "email", "balance", "tags"];

    pub fn values(&self) -> Vec<Option<CqlValue>> {
        vec![
            self.id.to_cql(),
            self.email.to_cql(),
            self.balance.to_cql(),
            self.tags.to_cql(),
        ]
    }
}

impl Entity for Account {
    fn descriptor() -> &'static EntityDescriptor {
        &ACCOUNTS
    }

    fn from_row(row: &Row) -> HelenusResult<Self> {
        Ok(Self {
            id: row.get(Account::ID)?,
            email: row.get(Account::EMAIL)?,
            balance: row.get(Account::BALANCE)?,
            tags: row.get(Account::TAGS)?,
        })
    }

    fn column_values(&self) -> Vec<(&'static str, Option<CqlValue>)> {
        vec![
            ("id", self.id.to_cql()),
            ("email", self.email.to_cql()),
            ("balance", self.balance.to_cql()),
            ("tags", self.tags.to_cql()),
        ]
    }
}

pub fn account_rows(accounts: &[&Account]) -> ResultSet {
    ResultSet::new(
        Account::COLUMNS.iter().map(|c| c.to_string()).collect(),
        accounts.iter().map(|a| a.values()).collect(),
    )
}

/// Posts of one user ordered by time; not cacheable
#[derive(Clone, Debug, PartialEq)]
pub struct Post {
    pub author: i32,
    pub posted_at: i64,
    pub body: String,
}

static POSTS: LazyLock<EntityDescriptor> = LazyLock::new(|| {
    EntityDescriptor::builder("Post", "posts")
        .partition_key("author")
        .clustering_column("posted_at", OrderingDirection::Desc)
        .column("body")
        .case_sensitive_index()
        .build()
});

impl Post {
    pub const AUTHOR: Property<Post, i32> = Property::new("author");
    pub const POSTED_AT: Property<Post, i64> = Property::new("posted_at");
    pub const BODY: Property<Post, String> = Property::new("body");
}

impl Entity for Post {
    fn descriptor() -> &'static EntityDescriptor {
        &POSTS
    }

    fn from_row(row: &Row) -> HelenusResult<Self> {
        Ok(Self {
            author: row.get(Post::AUTHOR)?,
            posted_at: row.get(Post::POSTED_AT)?,
            body: row.get(Post::BODY)?,
        })
    }

    fn column_values(&self) -> Vec<(&'static str, Option<CqlValue>)> {
        vec![
            ("author", self.author.to_cql()),
            ("posted_at", self.posted_at.to_cql()),
            ("body", self.body.to_cql()),
        ]
    }
}
