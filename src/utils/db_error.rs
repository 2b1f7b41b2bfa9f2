//! Classification of SQLx errors into [`BackendError`] variants.

use crate::error::BackendError;

/// Maps an SQLx error to a [`BackendError`].
///
/// I/O, TLS and protocol failures, pool shutdowns and server-side
/// connection exceptions (SQLSTATE class `08`, `57P01`-`57P03`) mean the
/// connection is gone. Everything else is a query failure.
pub fn map_sqlx_error(err: sqlx::Error) -> BackendError {
    let message = err.to_string();
    match &err {
        sqlx::Error::Io(_)
        | sqlx::Error::Tls(_)
        | sqlx::Error::Protocol(_)
        | sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed => BackendError::ConnectionLost(message),
        sqlx::Error::Database(db_err)
            if db_err.code().is_some_and(|code| is_connection_sqlstate(&code)) =>
        {
            BackendError::ConnectionLost(message)
        }
        _ => BackendError::Query(message),
    }
}

fn is_connection_sqlstate(code: &str) -> bool {
    code.starts_with("08") || matches!(code, "57P01" | "57P02" | "57P03")
}

/// Returns the name of the unique constraint `err` violated, if any.
pub fn violated_unique_constraint(err: &sqlx::Error) -> Option<&str> {
    let db_err = err.as_database_error()?;

    if !db_err.is_unique_violation() {
        return None;
    }

    db_err.constraint()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_failures_are_transient() {
        let io = sqlx::Error::Io(std::io::Error::new(
            std::io::ErrorKind::ConnectionReset,
            "reset by peer",
        ));
        assert!(map_sqlx_error(io).is_connectivity());
        assert!(map_sqlx_error(sqlx::Error::PoolClosed).is_connectivity());
        assert!(map_sqlx_error(sqlx::Error::Protocol("unexpected eof".into())).is_connectivity());
    }

    #[test]
    fn test_other_failures_are_query_errors() {
        assert!(matches!(
            map_sqlx_error(sqlx::Error::RowNotFound),
            BackendError::Query(_)
        ));
        assert!(matches!(
            map_sqlx_error(sqlx::Error::ColumnNotFound("url".into())),
            BackendError::Query(_)
        ));
    }

    #[test]
    fn test_connection_sqlstates() {
        assert!(is_connection_sqlstate("08006"));
        assert!(is_connection_sqlstate("57P01"));
        assert!(!is_connection_sqlstate("23505"));
        assert!(!is_connection_sqlstate("40001"));
    }

    #[test]
    fn test_non_database_error_has_no_constraint() {
        assert!(violated_unique_constraint(&sqlx::Error::RowNotFound).is_none());
    }
}
