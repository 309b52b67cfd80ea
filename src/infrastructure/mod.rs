pub mod archive_tool;

pub use archive_tool::{CommandBackend, ExtractBackend, ToolRun};
