use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Persisted resume point for one `(repo_id, entity_type)` pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncCursor {
    pub repo_id: String,
    pub entity_type: String,
    /// Upstream pagination token; `None` means start from the beginning.
    pub cursor: Option<String>,
    /// Latest `updatedAt` already fully persisted for this entity type.
    pub watermark: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

/// Write issued after each processed page.
#[derive(Debug, Clone, PartialEq)]
pub struct CursorUpdate {
    pub repo_id: String,
    pub entity_type: String,
    pub cursor: Option<String>,
    pub watermark: Option<DateTime<Utc>>,
}

/// Combine a stored watermark with an incoming one.
///
/// `None` carries no information, so it never replaces a stored value.
pub fn merge_watermark(
    stored: Option<DateTime<Utc>>,
    incoming: Option<DateTime<Utc>>,
) -> Option<DateTime<Utc>> {
    match (stored, incoming) {
        (Some(s), Some(i)) => Some(s.max(i)),
        (s, None) => s,
        (None, i) => i,
    }
}
