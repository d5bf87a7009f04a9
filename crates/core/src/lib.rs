mod apply;
mod config;
mod date_resolver;
mod exif_reader;
mod media;
mod planner;

pub use apply::{apply_plan, ApplyFailure, ApplyResult};
pub use config::{app_paths, load_config, save_config, AppConfig, AppPaths};
pub use date_resolver::{
    date_from_name, resolve_date, DateResolution, DateSource, SkipReason, UnparsableNameDate,
};
pub use exif_reader::{
    read_metadata, ExifTagTable, MetadataRecord, UnknownTagName, UnreadableImage,
    REQUIRED_EXIF_TAGS,
};
pub use media::{media_kind, MediaKind};
pub use planner::{
    generate_plan, PlanOptions, RenameCandidate, RenamePlan, RenameStats, SkippedFile,
    DEFAULT_MAX_SEQUENCE,
};
