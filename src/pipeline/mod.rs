pub mod extractor;
pub mod normalizer;
pub mod orchestrator;
pub mod scorer;
pub mod verifier;

pub use extractor::FieldExtractor;
pub use normalizer::{ContentNormalizer, EMPTY_CONTENT_SENTINEL};
pub use orchestrator::Orchestrator;
pub use scorer::DeliverabilityScorer;
pub use verifier::SocialProfileVerifier;
