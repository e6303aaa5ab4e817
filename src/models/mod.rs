//! Core data models for references, resolution candidates and download outcomes.

mod reference;
mod report;

pub use reference::{
    CandidateSource, FullTextLink, Identifier, KnownIdentifiers, NormalizedReference,
    RawReference, ReferenceHints, ResolutionCandidate, ResolutionStatus, ResolveQuery,
    ResolvedReference,
};
pub use report::{
    DownloadAttempt, DownloadResult, DownloadStatus, ReferenceReport, Report, ReportSummary,
};
