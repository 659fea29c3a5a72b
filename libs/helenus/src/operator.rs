use std::str::FromStr;

use strum::{Display, EnumIter, EnumString, IntoStaticStr};

/// Comparison operators accepted in WHERE and IF clauses.
///
/// `Display` and `FromStr` use the DSL symbols, so
/// `"<=".parse::<Operator>()` yields [`Operator::Lte`].
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, Display, EnumString, EnumIter, IntoStaticStr,
)]
pub enum Operator {
    #[strum(to_string = "==")]
    Eq,
    #[strum(to_string = "in")]
    In,
    #[strum(to_string = "<")]
    Lt,
    #[strum(to_string = "<=")]
    Lte,
    #[strum(to_string = ">")]
    Gt,
    #[strum(to_string = ">=")]
    Gte,
}

impl Operator {
    /// DSL symbol, the same text `Display` writes
    pub fn symbol(self) -> &'static str {
        self.into()
    }

    pub fn find_by_operator(symbol: &str) -> Option<Operator> {
        Operator::from_str(symbol).ok()
    }

    pub(crate) fn cql(self) -> &'static str {
        match self {
            Operator::Eq => "=",
            Operator::In => "IN",
            Operator::Lt => "<",
            Operator::Lte => "<=",
            Operator::Gt => ">",
            Operator::Gte => ">=",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn test_symbol_round_trip() {
        for op in Operator::iter() {
            assert_eq!(op.to_string(), op.symbol());
            assert_eq!(Operator::find_by_operator(&op.to_string()), Some(op));
        }
    }

    #[test]
    fn test_unknown_symbol() {
        assert_eq!(Operator::find_by_operator("!="), None);
        assert_eq!(Operator::find_by_operator(""), None);
    }

    #[test]
    fn test_cql_symbols() {
        assert_eq!(Operator::Eq.cql(), "=");
        assert_eq!(Operator::In.cql(), "IN");
        assert_eq!(Operator::Gte.cql(), ">=");
    }
}
