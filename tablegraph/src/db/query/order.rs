// SPDX-License-Identifier: AGPL-3.0-or-later

/// Options to determine the direction of the ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Arrange items from smallest to largest value.
    Ascending,

    /// Arrange items from largest to smallest value.
    Descending,
}

impl Direction {
    /// Parses a direction argument.
    ///
    /// Only the case-insensitive token `desc` selects descending order, everything else
    /// (including an absent argument) stays ascending.
    pub fn parse(token: Option<&str>) -> Self {
        match token {
            Some(token) if token.eq_ignore_ascii_case("desc") => Direction::Descending,
            _ => Direction::Ascending,
        }
    }

    /// Returns the SQL keyword for this direction.
    pub fn as_sql(&self) -> &'static str {
        match self {
            Direction::Ascending => "ASC",
            Direction::Descending => "DESC",
        }
    }

    /// Returns the lowercase argument token for this direction.
    pub fn as_token(&self) -> &'static str {
        match self {
            Direction::Ascending => "asc",
            Direction::Descending => "desc",
        }
    }
}

/// Ordering settings which can be used further to construct a database query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    /// Field the results are ordered by, no ordering clause is emitted without one.
    pub field: Option<String>,

    /// Direction the results are arranged in.
    pub direction: Direction,
}

impl Order {
    /// Returns a new instance of ordering settings.
    pub fn new(field: &str, direction: Direction) -> Self {
        Self {
            field: Some(field.to_string()),
            direction,
        }
    }
}

impl Default for Order {
    fn default() -> Self {
        Self {
            field: None,
            direction: Direction::Ascending,
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::{Direction, Order};

    #[rstest]
    #[case(Some("desc"), Direction::Descending)]
    #[case(Some("DESC"), Direction::Descending)]
    #[case(Some("asc"), Direction::Ascending)]
    #[case(Some("descending"), Direction::Ascending)]
    #[case(None, Direction::Ascending)]
    fn parses_direction_token(#[case] token: Option<&str>, #[case] expected: Direction) {
        assert_eq!(Direction::parse(token), expected);
    }

    #[test]
    fn default_is_unordered_ascending() {
        assert_eq!(
            Order::default(),
            Order {
                field: None,
                direction: Direction::Ascending,
            }
        );
    }
}
