pub mod analyze;

// Re-exported for the CLI and tests
pub use analyze::{analyze, Block, Edge, EdgeKind, Report};
