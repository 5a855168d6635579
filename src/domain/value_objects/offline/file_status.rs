use serde::{Deserialize, Serialize};
use std::fmt;

/// Status of a queued offline file. Success is not a status: the entry is deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileStatus {
    Pending,
    Syncing,
    Failed,
}

impl FileStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileStatus::Pending => "pending",
            FileStatus::Syncing => "syncing",
            FileStatus::Failed => "failed",
        }
    }

    /// Entries a normal drain may pick up.
    pub fn is_drainable(&self) -> bool {
        matches!(self, FileStatus::Pending | FileStatus::Failed)
    }
}

impl fmt::Display for FileStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<&str> for FileStatus {
    type Error = String;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "pending" => Ok(FileStatus::Pending),
            "syncing" => Ok(FileStatus::Syncing),
            "failed" => Ok(FileStatus::Failed),
            other => Err(format!("Unknown file status: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn syncing_is_not_drainable() {
        assert!(FileStatus::Pending.is_drainable());
        assert!(FileStatus::Failed.is_drainable());
        assert!(!FileStatus::Syncing.is_drainable());
    }

    #[test]
    fn status_round_trips_through_str() {
        for status in [FileStatus::Pending, FileStatus::Syncing, FileStatus::Failed] {
            assert_eq!(FileStatus::try_from(status.as_str()), Ok(status));
        }
        assert!(FileStatus::try_from("done").is_err());
    }
}
