use std::fmt;

/// Classified pipeline failures.
///
/// Per-record variants (`MalformedRecord`, `UnrecognizedEvent`, `DecodeError`)
/// are swallowed at their origin: counted, logged, never fatal to a batch.
/// Whole-source variants (`SourceUnavailable`, `SourceRateLimited`,
/// `MalformedResponse`) abort that source's cycle only. `PersistenceFailure`
/// never fails the run that computed the result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipeError {
    SourceUnavailable(String),
    SourceRateLimited(String),
    MalformedResponse(String),
    MalformedRecord(String),
    UnrecognizedEvent,
    DecodeError(String),
    PersistenceFailure(String),
}

impl PipeError {
    pub const fn as_str(&self) -> &'static str {
        match self {
            PipeError::SourceUnavailable(_) => "SOURCE_UNAVAILABLE",
            PipeError::SourceRateLimited(_) => "SOURCE_RATE_LIMITED",
            PipeError::MalformedResponse(_) => "MALFORMED_RESPONSE",
            PipeError::MalformedRecord(_) => "MALFORMED_RECORD",
            PipeError::UnrecognizedEvent => "UNRECOGNIZED_EVENT",
            PipeError::DecodeError(_) => "DECODE_ERROR",
            PipeError::PersistenceFailure(_) => "PERSISTENCE_FAILURE",
        }
    }

    /// True for failures that abort a whole source cycle (as opposed to a
    /// single record or sub-query).
    pub const fn is_source_failure(&self) -> bool {
        matches!(
            self,
            PipeError::SourceUnavailable(_)
                | PipeError::SourceRateLimited(_)
                | PipeError::MalformedResponse(_)
        )
    }
}

impl fmt::Display for PipeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipeError::UnrecognizedEvent => f.write_str(self.as_str()),
            PipeError::SourceUnavailable(d)
            | PipeError::SourceRateLimited(d)
            | PipeError::MalformedResponse(d)
            | PipeError::MalformedRecord(d)
            | PipeError::DecodeError(d)
            | PipeError::PersistenceFailure(d) => write!(f, "{}: {d}", self.as_str()),
        }
    }
}

impl std::error::Error for PipeError {}

/// Classify a transport-level `reqwest` failure.
pub fn classify_http(err: &reqwest::Error, what: &str) -> PipeError {
    if err.status().map(|s| s.as_u16() == 429).unwrap_or(false) {
        PipeError::SourceRateLimited(format!("{what}: {err}"))
    } else {
        PipeError::SourceUnavailable(format!("{what}: {err}"))
    }
}

/// Classify a non-success HTTP status.
pub fn classify_status(status: reqwest::StatusCode, what: &str) -> PipeError {
    if status.as_u16() == 429 {
        PipeError::SourceRateLimited(format!("{what}: http 429"))
    } else {
        PipeError::SourceUnavailable(format!("{what}: http {}", status.as_u16()))
    }
}
