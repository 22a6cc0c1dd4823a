use std::sync::Arc;

use tracing::info;

use crate::batch::BatchFetcher;
use crate::cache::AnnotationCache;
use crate::config::ResolvedConfig;
use crate::domain::{BatchResult, NameMode, OrganismId, ProteinId};
use crate::error::AnnotatorError;
use crate::fetcher::ProteinFetcher;
use crate::lookup::LookupStrategy;
use crate::transport::{SearchTransport, UniprotHttpTransport};

#[derive(Debug, Clone, Default)]
pub struct AnnotateOptions {
    pub name_mode: Option<NameMode>,
    pub organism: Option<OrganismId>,
}

/// Request-level entry point: validates the identifier list the way the web
/// endpoint does, then runs the batch.
pub struct App<T: SearchTransport> {
    batch: BatchFetcher<T>,
    default_mode: NameMode,
    default_organism: OrganismId,
    max_batch_size: usize,
}

impl App<UniprotHttpTransport> {
    pub fn from_config(
        config: &ResolvedConfig,
        cache: Arc<AnnotationCache>,
    ) -> Result<Self, AnnotatorError> {
        let transport = UniprotHttpTransport::with_settings(&config.base_url, config.request_timeout)?;
        Ok(Self::with_transport(config, cache, transport))
    }
}

impl<T: SearchTransport> App<T> {
    pub fn with_transport(config: &ResolvedConfig, cache: Arc<AnnotationCache>, transport: T) -> Self {
        let strategy = LookupStrategy::new(transport, config.retry);
        let fetcher = ProteinFetcher::new(cache, strategy)
            .with_parse_options(config.parse_options.clone())
            .with_negative_ttl(config.negative_cache_ttl);
        let batch = BatchFetcher::new(fetcher)
            .with_max_concurrency(config.max_concurrency)
            .with_max_batch_size(config.max_batch_size);
        Self::new(batch, config.name_mode, config.organism.clone(), config.max_batch_size)
    }

    pub fn new(
        batch: BatchFetcher<T>,
        default_mode: NameMode,
        default_organism: OrganismId,
        max_batch_size: usize,
    ) -> Self {
        Self {
            batch,
            default_mode,
            default_organism,
            max_batch_size,
        }
    }

    pub fn batch(&self) -> &BatchFetcher<T> {
        &self.batch
    }

    /// Parses raw identifiers, rejects empty or oversized requests, and
    /// returns one annotation per identifier in request order.
    pub fn annotate<S: AsRef<str>>(
        &self,
        raw_ids: &[S],
        options: AnnotateOptions,
    ) -> Result<BatchResult, AnnotatorError> {
        let ids = parse_ids(raw_ids)?;
        if ids.is_empty() {
            return Err(AnnotatorError::InvalidBatch(
                "no protein identifiers given".to_string(),
            ));
        }
        if ids.len() > self.max_batch_size {
            return Err(AnnotatorError::InvalidBatch(format!(
                "{} identifiers requested; at most {} allowed",
                ids.len(),
                self.max_batch_size
            )));
        }

        let mode = options.name_mode.unwrap_or(self.default_mode);
        let organism = options
            .organism
            .unwrap_or_else(|| self.default_organism.clone());
        info!(proteins = ids.len(), mode = %mode, organism = %organism, "annotating");
        Ok(self.batch.fetch_all(&ids, mode, &organism))
    }
}

/// Splits on commas and whitespace, dropping empty tokens.
pub fn parse_ids<S: AsRef<str>>(raw_ids: &[S]) -> Result<Vec<ProteinId>, AnnotatorError> {
    raw_ids
        .iter()
        .flat_map(|raw| {
            raw.as_ref()
                .split(|ch: char| ch == ',' || ch.is_whitespace())
                .filter(|token| !token.is_empty())
                .map(str::parse::<ProteinId>)
                .collect::<Vec<_>>()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_ids_splits_lists() {
        let ids = parse_ids(&["YAL001C,YAL002W", " YAL003W  ", ""]).unwrap();
        let ids = ids.iter().map(ProteinId::as_str).collect::<Vec<_>>();
        assert_eq!(ids, vec!["YAL001C", "YAL002W", "YAL003W"]);
    }
}
