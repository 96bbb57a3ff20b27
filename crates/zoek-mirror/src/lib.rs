pub mod probe;
pub mod scanner;

pub use probe::{clone_path, probe, staging_path, stale_staging};
pub use scanner::{scan_mirror, MirroredRepo};
