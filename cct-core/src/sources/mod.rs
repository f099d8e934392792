//! Text Sources
//!
//! A source turns a file on disk into a [`Document`](crate::types::Document):
//! the raw text of every page, in reading order.
//!
//! ## Architecture
//!
//! ```text
//! File (.txt page dump, ...)
//!     ↓
//! [Format-specific TextSource]
//!     ↓
//! Document (pages joined with '\n')
//!     ↓
//! [Normalize → Identify → Segment → Build records]
//! ```
//!
//! ## Available Sources
//!
//! - `PlainTextSource` - UTF-8 text dumps, pages separated by form feeds
//!   (the layout `pdftotext` and most OCR tools write)

pub mod plain_text;
pub mod source;

pub use plain_text::PlainTextSource;
pub use source::TextSource;
