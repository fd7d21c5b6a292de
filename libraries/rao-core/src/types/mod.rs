//! Domain types for the ingestion engine

mod folder;
mod image;
mod library;
mod sync_run;
mod tag;
mod upsert;

pub use folder::{Folder, FolderId, UpsertFolder};
pub use image::{Image, ImageData, ImageId};
pub use library::{CreateLibrary, Library, LibraryId, SourceType};
pub use sync_run::{RunCounts, SyncRun, SyncRunId, SyncRunStatus};
pub use tag::{Tag, TagGroup, TagGroupId, TagId, UpsertTagGroup};
pub use upsert::Upserted;
