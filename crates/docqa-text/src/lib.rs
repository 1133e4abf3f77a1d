//! docqa-text
//!
//! `.docx` text extraction and fixed-size character splitting. The loader
//! produces one `SourceDocument` per file; the splitter turns each into
//! overlapping `DocumentChunk` windows ready for embedding.

pub mod loader;
pub mod splitter;

pub use loader::DocxLoader;
pub use splitter::CharacterSplitter;
