pub mod fs_walk;
pub mod logging;

pub use logging::truncate_text;
