use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// One of the parallel upstream collections synced per repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntityType {
    Issue,
    #[serde(rename = "PR")]
    PullRequest,
    Discussion,
}

impl EntityType {
    pub const ALL: [EntityType; 3] = [
        EntityType::Issue,
        EntityType::PullRequest,
        EntityType::Discussion,
    ];

    /// Stable name used as the cursor-store key.
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::Issue => "ISSUE",
            EntityType::PullRequest => "PR",
            EntityType::Discussion => "DISCUSSION",
        }
    }

    /// Plural slug used in lock keys and log lines.
    pub fn slug(&self) -> &'static str {
        match self {
            EntityType::Issue => "issues",
            EntityType::PullRequest => "prs",
            EntityType::Discussion => "discussions",
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ISSUE" => Ok(EntityType::Issue),
            "PR" => Ok(EntityType::PullRequest),
            "DISCUSSION" => Ok(EntityType::Discussion),
            other => Err(format!("unknown entity type: {other}")),
        }
    }
}
