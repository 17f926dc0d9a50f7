//! Raw SQL fragments that can't be expressed in Diesel's type-safe DSL.
//!
//! # Safety
//!
//! All SQL in this module has been reviewed for SQL injection safety:
//! - User input is never interpolated
//! - Anything formatted into a statement is a typed integer
//!
//! When adding new SQL here, document why the Diesel DSL can't be used.

use diesel::query_builder::SqlQuery;
use diesel::sql_query;

/// Largest value PostgreSQL accepts for `statement_timeout`, in milliseconds.
pub const MAX_STATEMENT_TIMEOUT_MS: u128 = i32::MAX as u128;

/// Bound every statement in the current transaction to `millis`.
///
/// `SET` does not accept bind parameters, so the value is formatted in.
/// It is clamped to `1..=MAX_STATEMENT_TIMEOUT_MS`: `0` would disable the
/// limit and anything above the maximum is rejected by the server.
///
/// # Safety
/// The only interpolated value is a `u128`.
pub fn set_local_statement_timeout(millis: u128) -> SqlQuery {
    let millis = millis.clamp(1, MAX_STATEMENT_TIMEOUT_MS);
    sql_query(format!("SET LOCAL statement_timeout = {}", millis))
}

#[cfg(test)]
mod tests {
    use super::*;
    use diesel::debug_query;
    use diesel::pg::Pg;

    #[test]
    fn test_statement_timeout_is_never_zero() {
        let rendered = debug_query::<Pg, _>(&set_local_statement_timeout(0)).to_string();
        assert!(rendered.starts_with("SET LOCAL statement_timeout = 1"));

        let rendered = debug_query::<Pg, _>(&set_local_statement_timeout(2500)).to_string();
        assert!(rendered.starts_with("SET LOCAL statement_timeout = 2500"));
    }

    #[test]
    fn test_statement_timeout_is_capped_at_server_maximum() {
        // 3,000,000 seconds, well past what the server accepts.
        let rendered =
            debug_query::<Pg, _>(&set_local_statement_timeout(3_000_000_000)).to_string();
        assert!(rendered.starts_with("SET LOCAL statement_timeout = 2147483647"));

        let rendered = debug_query::<Pg, _>(&set_local_statement_timeout(u128::MAX)).to_string();
        assert!(rendered.starts_with("SET LOCAL statement_timeout = 2147483647"));

        let at_max = set_local_statement_timeout(MAX_STATEMENT_TIMEOUT_MS);
        assert!(debug_query::<Pg, _>(&at_max)
            .to_string()
            .starts_with("SET LOCAL statement_timeout = 2147483647"));
    }
}
