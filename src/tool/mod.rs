//! Generic tool runner: a declarative catalog of API operations, their
//! option schemas, and the lifecycle that drives them

pub mod catalog;
pub mod runner;
pub mod schema;

pub use catalog::{
    find_conversion, find_tool, BodyFormat, ConversionSpec, EditorBinding, ToolSpec, CONVERSIONS,
    TOOLS,
};
pub use runner::{
    compare_files, convert_files, merge_files, upload_all, ToolRunner, ToolState, ToolStatus,
    UploadedBatch,
};
pub use schema::{parse_page_range, OptionField, OptionKind, OptionsSchema, MAX_PAGES};
