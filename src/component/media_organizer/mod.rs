//! 媒體整理元件
//!
//! 掃描來源資料夾，依篩選條件與整理組合產生目標路徑，
//! 處理關聯檔案、路徑衝突與重複內容後複製到目的地

mod association;
mod conflict_resolver;
mod copy_executor;
mod duplicate_detector;
mod error;
mod file_record;
pub mod filter;
mod main;
mod metadata;
mod path_generator;
mod pipeline;

pub use association::{AssociationMap, AssociationResolver, group_key};
pub use conflict_resolver::{
    ConflictGroup, ConflictReport, ConflictResolver, DuplicateHandling, InteractiveResolver,
    OthersAction, REASON_DUPLICATE_PATH, REASON_OLDER_DUPLICATE, Resolution, suffixed_path,
};
pub use copy_executor::{CopyExecutor, REASON_PRIMARY_NOT_COPIED, copy_preserving_mtime};
pub use duplicate_detector::{DuplicateDetector, DuplicateGroup, group_by_hash};
pub use error::OrganizeError;
pub use file_record::{DeviceKind, FileRecord, FileStatus, MediaKind, Metadata, format_size};
pub use main::{DialoguerResolver, MediaOrganizer};
pub use metadata::{
    ExiftoolExtractor, MetadataExtractor, NoopExtractor, apply_metadata, apply_metadata_all,
};
pub use path_generator::{PathElement, PathGenerator, PathPattern, sanitize_component};
pub use pipeline::{OrganizePipeline, PipelineReport, REASON_PRIMARY_EXCLUDED};
