mod extractor;

pub use extractor::{extract, ExtractedEntry, ExtractionOutcome, ExtractionRequest};
