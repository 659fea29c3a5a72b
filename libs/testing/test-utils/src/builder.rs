use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use uuid::Uuid;

use crate::fixtures::{Account, User};

/// Builder for test data with deterministic randomization
///
/// This ensures tests are reproducible by deriving every value from a seed.
pub struct TestDataBuilder {
    seed: u64,
}

impl TestDataBuilder {
    /// Create a new builder with a seed (for deterministic tests)
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }

    /// Create from test name (generates seed from test name hash)
    ///
    /// # Example
    ///
    /// ```
    /// use test_utils::TestDataBuilder;
    ///
    /// let builder = TestDataBuilder::from_test_name("test_point_lookup");
    /// ```
    pub fn from_test_name(name: &str) -> Self {
        let mut hasher = DefaultHasher::new();
        name.hash(&mut hasher);
        Self::new(hasher.finish())
    }

    /// Deterministic UUID for the `n`-th entity of a test
    pub fn uuid(&self, n: u64) -> Uuid {
        let mut bytes = [0u8; 16];
        bytes[..8].copy_from_slice(&self.seed.to_le_bytes());
        bytes[8..].copy_from_slice(&n.to_le_bytes());
        Uuid::from_bytes(bytes)
    }

    /// Generate a unique name for testing, e.g. `test-user-12345-main`
    pub fn name(&self, prefix: &str, suffix: &str) -> String {
        format!("test-{}-{}-{}", prefix, self.seed, suffix)
    }

    /// The `n`-th user of a test; ids stay positive and distinct per `n`
    pub fn user(&self, n: u32) -> User {
        let base = (self.seed % 1_000_000) as i32;
        User::new(
            base * 100 + n as i32,
            self.name("user", &n.to_string()),
            18 + ((self.seed + u64::from(n)) % 60) as i32,
        )
    }

    pub fn account(&self, n: u32) -> Account {
        Account {
            id: self.uuid(u64::from(n)),
            email: format!("{}@example.com", self.name("account", &n.to_string())),
            balance: (self.seed % 1000) as i32 + n as i32,
            tags: vec![format!("tier-{}", n % 3)],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_builder_deterministic() {
        let builder1 = TestDataBuilder::new(42);
        let builder2 = TestDataBuilder::new(42);

        assert_eq!(builder1.user(1), builder2.user(1));
        assert_eq!(builder1.account(2), builder2.account(2));
        assert_eq!(builder1.name("user", "main"), builder2.name("user", "main"));
    }

    #[test]
    fn test_data_builder_distinct_entities() {
        let builder = TestDataBuilder::from_test_name("distinct");

        assert_ne!(builder.user(1).id, builder.user(2).id);
        assert_ne!(builder.account(1).id, builder.account(2).id);
        assert_ne!(builder.account(1).email, builder.account(2).email);
    }

    #[test]
    fn test_data_builder_different_names() {
        let builder1 = TestDataBuilder::from_test_name("test1");
        let builder2 = TestDataBuilder::from_test_name("test2");

        // Different test names should generate different data
        assert_ne!(builder1.uuid(0), builder2.uuid(0));
    }
}
