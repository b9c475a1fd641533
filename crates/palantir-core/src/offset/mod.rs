mod searcher;
mod signature;

pub use searcher::{GlobalOffsets, OffsetSearcher};
pub use signature::{CodeSignature, SignatureSet, builtin_signatures, format_pattern, parse_pattern};
