use thiserror::Error;

/// Classified harness errors.
///
/// `Config` is fatal: it propagates past the runner and terminates the process
/// before any agent call. Every other kind is contained at the runner boundary
/// and becomes a per-case `ERROR` result.
#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("config error: {0}")]
    Config(String),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("judge unavailable: {0}")]
    Judge(String),
    #[error("script execution error: {0}")]
    Script(String),
    #[error("timeout: {0}")]
    Timeout(String),
}

impl HarnessError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    pub fn judge(msg: impl Into<String>) -> Self {
        Self::Judge(msg.into())
    }

    pub fn script(msg: impl Into<String>) -> Self {
        Self::Script(msg.into())
    }

    pub fn timeout(msg: impl Into<String>) -> Self {
        Self::Timeout(msg.into())
    }

    /// True when the error must abort the whole run instead of producing a
    /// per-case ERROR result.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Config(_))
    }
}

#[cfg(test)]
mod tests {
    use super::HarnessError;

    #[test]
    fn only_config_errors_are_fatal() {
        assert!(HarnessError::config("bad yaml").is_fatal());
        assert!(!HarnessError::transport("connection refused").is_fatal());
        assert!(!HarnessError::judge("no verdict").is_fatal());
        assert!(!HarnessError::timeout("script hung").is_fatal());
    }

    #[test]
    fn display_includes_classification() {
        let e = HarnessError::transport("agent endpoint returned 503");
        assert_eq!(e.to_string(), "transport error: agent endpoint returned 503");
    }
}
