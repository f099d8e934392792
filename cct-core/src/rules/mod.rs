// Extraction rules, one stage per module:
// - engine.rs: compiled correction tables and shared text helpers
// - normalizer.rs: OCR and spacing repairs
// - entities.rs: union name and validity period from the header
// - segmenter.rs: clause heading detection
// - records.rs: title, body and summary for each clause

pub mod engine;
pub mod entities;
pub mod normalizer;
pub mod records;
pub mod segmenter;

pub use engine::RuleSet;
pub use entities::EntityIdentifier;
pub use normalizer::TextNormalizer;
pub use records::RecordBuilder;
pub use segmenter::ClauseSegmenter;
