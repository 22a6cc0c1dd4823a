use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::cache::AnnotationCache;
use crate::domain::{NameMode, OrganismId, ProteinAnnotation, ProteinId};
use crate::error::AnnotatorError;
use crate::lookup::LookupStrategy;
use crate::parser::{ParseOptions, parse_entry};
use crate::transport::SearchTransport;

pub const DEFAULT_NEGATIVE_TTL: Duration = Duration::from_secs(10 * 60);

/// Resolves one identifier: cache, then UniProt, then cache again.
///
/// Every failure is folded into the returned record's `error` field.
pub struct ProteinFetcher<T: SearchTransport> {
    cache: Arc<AnnotationCache>,
    strategy: LookupStrategy<T>,
    options: ParseOptions,
    negative_ttl: Duration,
}

impl<T: SearchTransport> ProteinFetcher<T> {
    pub fn new(cache: Arc<AnnotationCache>, strategy: LookupStrategy<T>) -> Self {
        Self {
            cache,
            strategy,
            options: ParseOptions::default(),
            negative_ttl: DEFAULT_NEGATIVE_TTL,
        }
    }

    pub fn with_parse_options(mut self, options: ParseOptions) -> Self {
        self.options = options;
        self
    }

    /// How long a `NotFound` answer is remembered; zero disables it.
    pub fn with_negative_ttl(mut self, ttl: Duration) -> Self {
        self.negative_ttl = ttl;
        self
    }

    pub fn cache(&self) -> &Arc<AnnotationCache> {
        &self.cache
    }

    pub fn fetch(&self, id: &ProteinId, mode: NameMode, organism: &OrganismId) -> ProteinAnnotation {
        if let Some(cached) = self.cache.get(id) {
            info!(protein = %id, "cache hit");
            return cached;
        }
        debug!(protein = %id, "cache miss");

        match self.strategy.lookup(id, mode, organism) {
            Ok(entry) => {
                let annotation = parse_entry(id, &entry, &self.options);
                info!(
                    protein = %id,
                    length = ?annotation.sequence_length,
                    features = annotation.features.as_ref().map_or(0, Vec::len),
                    go_terms = annotation.go_terms.as_ref().map_or(0, |terms| terms.len()),
                    "parsed UniProt entry"
                );
                self.cache.put(id.clone(), annotation.clone());
                annotation
            }
            Err(err) => {
                warn!(protein = %id, error = %err, "lookup failed");
                let annotation = ProteinAnnotation::failed(id.clone(), &err);
                self.remember_failure(id, &err, &annotation);
                annotation
            }
        }
    }

    fn remember_failure(&self, id: &ProteinId, err: &AnnotatorError, annotation: &ProteinAnnotation) {
        if err.is_transient() || self.negative_ttl.is_zero() {
            return;
        }
        self.cache
            .put_with_ttl(id.clone(), annotation.clone(), self.negative_ttl);
    }
}
