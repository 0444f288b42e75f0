use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum StoreErrorCode {
    /// No candidate base directory exists; callers keep receiving this until
    /// the retry cooldown elapses or the resolver is explicitly invalidated.
    RootUnresolved,
    DirRead,
    FileRead,
    Parse,
    Timeout,
}

impl StoreErrorCode {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::RootUnresolved => "root_unresolved",
            Self::DirRead => "dir_read",
            Self::FileRead => "file_read",
            Self::Parse => "parse",
            Self::Timeout => "timeout",
        }
    }
}

/// Errors are `Clone` so one failing operation can be fanned out to every
/// coalesced waiter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreError {
    pub code: StoreErrorCode,
    pub message: String,
}

impl StoreError {
    #[must_use]
    pub fn new(code: StoreErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code.as_str(), self.message)
    }
}

impl std::error::Error for StoreError {}
