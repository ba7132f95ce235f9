//! Single-result policy for callers that need exactly one match
//!
//! The query core returns every match; hosts that bind a query to a single
//! value apply this check on top.

/// A query that had to match exactly one node matched some other number
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("found {found} nodes, expected 1")]
pub struct CardinalityError {
    pub found: usize,
}

/// The only element of `items`
pub fn expect_one<T>(items: Vec<T>) -> Result<T, CardinalityError> {
    let found = items.len();
    let mut items = items.into_iter();
    match (items.next(), items.next()) {
        (Some(item), None) => Ok(item),
        _ => Err(CardinalityError { found }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exactly_one() {
        assert_eq!(expect_one(vec!["a"]), Ok("a"));
    }

    #[test]
    fn zero_or_many_name_the_count() {
        let none = expect_one(Vec::<u8>::new()).unwrap_err();
        assert_eq!(none.to_string(), "found 0 nodes, expected 1");
        assert_eq!(expect_one(vec![1, 2, 3]), Err(CardinalityError { found: 3 }));
    }
}
