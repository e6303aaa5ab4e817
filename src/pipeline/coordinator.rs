//! Resolution coordinator: runs the resolver cascade for one reference.
//!
//! ```text
//! Pending ─┬─ inline DOI / arXiv ID ───────────────► Resolved (Inline, 1.0)
//!          └─ Resolving: arXiv? → Crossref → OpenAlex → Semantic Scholar
//!                 ├─ best ≥ acceptance: stop early
//!                 ├─ best ≥ floor ─────────────────► Resolved
//!                 └─ otherwise ────────────────────► Unresolved
//! ```

use std::sync::Arc;
use tracing::{debug, warn};

use crate::config::ResolutionConfig;
use crate::models::{CandidateSource, NormalizedReference, ResolutionCandidate, ResolutionStatus};
use crate::sources::{Source, SourceRegistry};

/// Reason recorded for references no resolver could identify
pub const UNRESOLVED_REASON: &str = "no identifier found above threshold";

/// Resolvers skipped once an earlier source found an identifier at backfill confidence
const BACKFILL_RESOLVERS: [&str; 2] = ["openalex", "semantic"];

/// Outcome of resolving one reference
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub status: ResolutionStatus,
    pub reason: Option<String>,

    /// Winning candidate; always carries a DOI or arXiv ID when present
    pub best: Option<ResolutionCandidate>,
}

impl Resolution {
    pub fn resolved(best: ResolutionCandidate) -> Self {
        Self {
            status: ResolutionStatus::Resolved,
            reason: None,
            best: Some(best),
        }
    }

    pub fn unresolved() -> Self {
        Self {
            status: ResolutionStatus::Unresolved,
            reason: Some(UNRESOLVED_REASON.to_string()),
            best: None,
        }
    }
}

/// Runs resolvers in priority order and picks the best identifier
#[derive(Debug, Clone)]
pub struct ResolutionCoordinator {
    resolvers: Vec<Arc<dyn Source>>,
    thresholds: ResolutionConfig,
}

impl ResolutionCoordinator {
    /// `resolvers` are queried in the given order
    pub fn new(resolvers: Vec<Arc<dyn Source>>, thresholds: ResolutionConfig) -> Self {
        Self {
            resolvers,
            thresholds,
        }
    }

    pub fn from_registry(registry: &SourceRegistry, thresholds: ResolutionConfig) -> Self {
        Self::new(registry.resolvers(), thresholds)
    }

    pub async fn resolve(&self, reference: &NormalizedReference) -> Resolution {
        if let Some(candidate) = inline_candidate(reference) {
            debug!(ordinal = reference.ordinal(), "identifier found inline");
            return Resolution::resolved(candidate);
        }

        let query = reference.query();
        let mut candidates: Vec<ResolutionCandidate> = Vec::new();

        for resolver in &self.resolvers {
            let best = pick_best(&candidates);
            if resolver.id() == "arxiv" && query.known.arxiv_id.is_none() {
                continue;
            }
            if BACKFILL_RESOLVERS.contains(&resolver.id())
                && best.is_some_and(|c| c.confidence >= self.thresholds.backfill_threshold)
            {
                debug!(ordinal = reference.ordinal(), resolver = resolver.id(), "backfill not needed");
                continue;
            }

            match resolver.resolve(&query).await {
                Ok(found) => {
                    debug!(
                        ordinal = reference.ordinal(),
                        resolver = resolver.id(),
                        candidates = found.len(),
                        "resolver finished"
                    );
                    candidates.extend(found);
                }
                Err(e) => {
                    warn!(
                        ordinal = reference.ordinal(),
                        resolver = resolver.id(),
                        error = %e,
                        "resolver failed, continuing"
                    );
                }
            }

            if pick_best(&candidates)
                .is_some_and(|c| c.confidence >= self.thresholds.acceptance_threshold)
            {
                break;
            }
        }

        match pick_best(&candidates) {
            Some(best) if best.confidence >= self.thresholds.min_confidence => {
                Resolution::resolved(best.clone())
            }
            _ => Resolution::unresolved(),
        }
    }
}

/// A literal identifier in the reference text is trusted outright.
fn inline_candidate(reference: &NormalizedReference) -> Option<ResolutionCandidate> {
    if !reference.has_inline_identifier() {
        return None;
    }
    let mut candidate = ResolutionCandidate::new(CandidateSource::Inline, 1.0);
    candidate.doi = reference.doi.clone().or_else(|| reference.known.doi.clone());
    candidate.arxiv_id = reference
        .arxiv_id
        .clone()
        .or_else(|| reference.known.arxiv_id.clone());
    Some(candidate)
}

/// Highest confidence wins; ties go to the higher-priority source.
/// Candidates without an identifier are never picked.
pub fn pick_best(candidates: &[ResolutionCandidate]) -> Option<&ResolutionCandidate> {
    candidates
        .iter()
        .filter(|c| c.has_identifier())
        .reduce(|best, c| {
            let better = c.confidence > best.confidence
                || (c.confidence == best.confidence
                    && c.source.priority() < best.source.priority());
            if better {
                c
            } else {
                best
            }
        })
}
