pub mod memory;
pub mod models;
pub mod pg_repository;
pub mod repositories;

pub use memory::MemoryCursorStore;
pub use models::{merge_watermark, CursorUpdate, SyncCursor};
pub use pg_repository::PgCursorStore;
pub use repositories::CursorStore;
