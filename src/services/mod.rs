// External collaborators the pipeline delegates to. Each backend is a trait
// so tests (and credential-less deployments) can swap in a local impl.

pub mod deliverability;
pub mod extraction;
pub mod profile_lookup;

pub use deliverability::{
    DeliverabilityReport, HttpDeliverability, MailDeliverability, SandboxDeliverability,
};
pub use extraction::{HttpExtractionService, RegexExtractor, TextUnderstanding};
pub use profile_lookup::{Employment, HttpProfileLookup, LookupProfile, ProfileLookup};
