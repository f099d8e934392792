// All extraction logic is in cct-core
// This CLI acts as a thin wrapper around the core library

// CLI-specific modules
pub mod logging;
pub mod openai;
pub mod settings;

// Re-export core types for convenience
pub use cct_core::*;

// Re-export CLI utilities
pub use openai::OpenAiSummarizer;
pub use settings::UserSettings;
