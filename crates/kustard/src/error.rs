use camino::Utf8PathBuf;
use thiserror::Error;

/// Boxed error returned by the external capabilities (query transport, lookup
/// service, job generator, apply engine). The component consuming a
/// capability decides which [`Error`] variant the failure belongs to.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid cluster uri `{uri}`: {reason}")]
    InvalidCluster { uri: String, reason: &'static str },

    #[error("invalid target filter `{filter}`: {reason}")]
    InvalidFilter {
        filter: String,
        reason: String,
        #[source]
        source: Option<regex::Error>,
    },

    #[error("listing databases on {cluster} failed")]
    Query {
        cluster: String,
        #[source]
        source: BoxError,
    },

    #[error("target lookup for cluster {cluster} (label `{label}`) via {endpoint} failed")]
    Lookup {
        endpoint: String,
        cluster: String,
        label: String,
        #[source]
        source: BoxError,
    },

    #[error("storing schema failed: {reason}")]
    Storage {
        reason: String,
        #[source]
        source: Option<std::io::Error>,
    },

    #[error("generating execution configuration for {cluster} failed: {reason}")]
    Build {
        cluster: String,
        reason: String,
        #[source]
        source: Option<BoxError>,
    },

    #[error("applying job file {job_file} failed")]
    Execution {
        job_file: Utf8PathBuf,
        #[source]
        source: BoxError,
    },
}

/// The taxonomy an [`Error`] belongs to, for callers that branch on kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidCluster,
    InvalidFilter,
    Query,
    Lookup,
    Storage,
    Build,
    Execution,
}

impl ErrorKind {
    /// Whether re-running the whole operation may succeed.
    ///
    /// Only failures of remote services qualify; malformed input never does.
    pub fn is_retryable(self) -> bool {
        matches!(self, ErrorKind::Query | ErrorKind::Lookup)
    }
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidCluster { .. } => ErrorKind::InvalidCluster,
            Error::InvalidFilter { .. } => ErrorKind::InvalidFilter,
            Error::Query { .. } => ErrorKind::Query,
            Error::Lookup { .. } => ErrorKind::Lookup,
            Error::Storage { .. } => ErrorKind::Storage,
            Error::Build { .. } => ErrorKind::Build,
            Error::Execution { .. } => ErrorKind::Execution,
        }
    }

    pub(crate) fn invalid_pattern(pattern: &str, source: regex::Error) -> Self {
        Error::InvalidFilter {
            filter: pattern.to_string(),
            reason: "not a valid regular expression".to_string(),
            source: Some(source),
        }
    }

    pub(crate) fn storage(reason: impl Into<String>, source: std::io::Error) -> Self {
        Error::Storage {
            reason: reason.into(),
            source: Some(source),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_only_remote_failures_are_retryable() {
        assert!(ErrorKind::Query.is_retryable());
        assert!(ErrorKind::Lookup.is_retryable());
        assert!(!ErrorKind::InvalidFilter.is_retryable());
        assert!(!ErrorKind::Build.is_retryable());
        assert!(!ErrorKind::Execution.is_retryable());
    }

    #[test]
    fn test_invalid_pattern_keeps_regex_cause() {
        let cause = regex::Regex::new("(").unwrap_err();
        let err = Error::invalid_pattern("(", cause);
        assert_eq!(err.kind(), ErrorKind::InvalidFilter);
        assert!(err.source().is_some());
        assert!(err.to_string().contains("`(`"));
    }
}
