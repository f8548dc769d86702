pub mod processor;
pub mod report;

// Re-export the main types for easy access
pub use processor::*;
pub use report::*;
