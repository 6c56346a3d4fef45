use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReposyncError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("database error: {0}")]
    Database(String),

    /// The requested upstream collection does not exist for the given owner/name.
    #[error("not found: {0}")]
    NotFound(String),

    /// Transport or server-side failure talking to the upstream API.
    #[error("upstream error: {0}")]
    Upstream(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type ReposyncResult<T> = Result<T, ReposyncError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_category_prefix() {
        let err = ReposyncError::NotFound("repository acme/widgets".to_string());
        assert_eq!(err.to_string(), "not found: repository acme/widgets");

        let err = ReposyncError::Upstream("502 Bad Gateway".to_string());
        assert_eq!(err.to_string(), "upstream error: 502 Bad Gateway");
    }
}
