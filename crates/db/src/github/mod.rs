pub mod models;
pub mod pg_repository;
pub mod repositories;

pub use models::WorkItemRecord;
pub use pg_repository::PgWorkItemRepository;
pub use repositories::WorkItemSink;

use crate::entity::EntityType;

/// Table holding work items of the given type.
pub fn work_item_table(entity_type: EntityType) -> &'static str {
    match entity_type {
        EntityType::Issue => "github_issues",
        EntityType::PullRequest => "github_pull_requests",
        EntityType::Discussion => "github_discussions",
    }
}
