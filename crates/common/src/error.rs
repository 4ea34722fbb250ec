use thiserror::Error;

#[derive(Debug, Error)]
pub enum WellmapError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("database error: {0}")]
    Database(String),

    #[error("upstream error: {0}")]
    Upstream(String),

    #[error("empty result: {0}")]
    EmptyResult(String),

    #[error("not found: {0}")]
    NotFound(String),
}

pub type WellmapResult<T> = Result<T, WellmapError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_category_prefix() {
        let err = WellmapError::Upstream("HTTP 500".to_string());
        assert_eq!(err.to_string(), "upstream error: HTTP 500");

        let err = WellmapError::EmptyResult("no objectIds returned".to_string());
        assert_eq!(err.to_string(), "empty result: no objectIds returned");
    }
}
