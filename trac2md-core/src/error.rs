use std::path::PathBuf;

#[non_exhaustive]
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid commit map entry on line {0}: {1:?}")]
    InvalidCommitMapLine(usize, String),

    #[error("invalid URL rewrite: {0}")]
    InvalidUrlRewrite(String),

    #[error("output path cannot be the same as input path: {0}")]
    OutputPathSameAsInput(PathBuf),
}

impl Error {
    /// Get advice for this error if available.
    /// Returns helpful information for resolving the error.
    #[must_use]
    pub fn advice(&self) -> Option<&'static str> {
        match self {
            Self::InvalidCommitMapLine(..) => Some(
                "Each commit map line must hold an svn revision, a git hash and a branch name separated by whitespace",
            ),
            Self::InvalidUrlRewrite(..) => {
                Some("URL rewrites need a non-empty `from` prefix that is not contained in `to`")
            }
            Self::OutputPathSameAsInput(..) => {
                Some("Use --output-dir or rename the input so it does not end in `.md`")
            }
            Self::Io(_) | Self::Json(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_advice_present_for_commit_map_errors() {
        let error = Error::InvalidCommitMapLine(3, "1234".to_string());
        assert!(error.advice().is_some());
        assert_eq!(
            error.to_string(),
            "invalid commit map entry on line 3: \"1234\""
        );
    }

    #[test]
    fn test_advice_absent_for_io_errors() {
        let error = Error::Io(std::io::Error::other("boom"));
        assert!(error.advice().is_none());
    }
}
