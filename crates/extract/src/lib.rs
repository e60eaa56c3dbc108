//! Recovery of structured data from free-form generator output.
//!
//! Raw text is normalized, a single JSON candidate is located (balanced
//! braces, then regex patterns, then the whole text), and the candidate is
//! parsed strictly, after textual repair, or with a permissive literal parser.

pub mod balanced;
pub mod error;
pub mod lenient;
pub mod normalizer;
pub mod parser;
pub mod patterns;
pub mod repair;
pub mod schema;

pub use balanced::{OpenChar, extract_balanced};
pub use error::RecoveryError;
pub use normalizer::normalize;
pub use parser::{ExpectedShape, Parser, ParserOptions, parse_structured};
pub use patterns::{extract_by_pattern, fenced_body};
pub use repair::repair;
pub use schema::{
    CandidateSource, ExtractionCandidate, ParseResult, ParseStrategy, RawInput, RawResponse,
};
