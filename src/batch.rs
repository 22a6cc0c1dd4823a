use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Instant;

use tracing::{error, info, warn};

use crate::domain::{BatchResult, NameMode, OrganismId, ProteinAnnotation, ProteinId};
use crate::error::AnnotatorError;
use crate::fetcher::ProteinFetcher;
use crate::transport::SearchTransport;

pub const DEFAULT_MAX_CONCURRENCY: usize = 50;
pub const DEFAULT_MAX_BATCH_SIZE: usize = 50;

/// Fans a list of identifiers out over worker threads and gathers the
/// annotations back in input order.
pub struct BatchFetcher<T: SearchTransport> {
    fetcher: ProteinFetcher<T>,
    max_concurrency: usize,
    max_batch_size: usize,
}

impl<T: SearchTransport> BatchFetcher<T> {
    pub fn new(fetcher: ProteinFetcher<T>) -> Self {
        Self {
            fetcher,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            max_batch_size: DEFAULT_MAX_BATCH_SIZE,
        }
    }

    pub fn with_max_concurrency(mut self, limit: usize) -> Self {
        self.max_concurrency = limit.max(1);
        self
    }

    pub fn with_max_batch_size(mut self, limit: usize) -> Self {
        self.max_batch_size = limit;
        self
    }

    pub fn fetcher(&self) -> &ProteinFetcher<T> {
        &self.fetcher
    }

    /// Always returns exactly one record per input identifier, in input order.
    /// Identifiers past the batch limit are answered with an error record
    /// instead of being fetched.
    pub fn fetch_all(&self, ids: &[ProteinId], mode: NameMode, organism: &OrganismId) -> BatchResult {
        let started = Instant::now();
        let accepted = ids.len().min(self.max_batch_size);
        if accepted < ids.len() {
            warn!(
                requested = ids.len(),
                limit = self.max_batch_size,
                "batch exceeds limit; extra identifiers are not fetched"
            );
        }

        let mut slots = self.fan_out(&ids[..accepted], mode, organism);
        slots.resize_with(ids.len(), || None);

        let proteins = ids
            .iter()
            .zip(slots)
            .enumerate()
            .map(|(index, (id, slot))| {
                slot.unwrap_or_else(|| {
                    let err = if index >= accepted {
                        AnnotatorError::InvalidBatch(format!(
                            "{id} exceeds the batch limit of {}",
                            self.max_batch_size
                        ))
                    } else {
                        AnnotatorError::Worker(id.to_string())
                    };
                    ProteinAnnotation::failed(id.clone(), &err)
                })
            })
            .collect::<Vec<_>>();

        let result = BatchResult { proteins };
        info!(
            proteins = result.len(),
            failures = result.failures(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "batch complete"
        );
        result
    }

    fn fan_out(
        &self,
        ids: &[ProteinId],
        mode: NameMode,
        organism: &OrganismId,
    ) -> Vec<Option<ProteinAnnotation>> {
        let mut slots = (0..ids.len()).map(|_| None).collect::<Vec<_>>();
        if ids.is_empty() {
            return slots;
        }

        let workers = self.max_concurrency.min(ids.len());
        info!(proteins = ids.len(), workers, mode = %mode, organism = %organism, "fetching batch");
        let next = AtomicUsize::new(0);

        thread::scope(|scope| {
            let mut handles = Vec::with_capacity(workers);
            for _ in 0..workers {
                handles.push(scope.spawn(|| {
                    let mut done = Vec::new();
                    loop {
                        let index = next.fetch_add(1, Ordering::Relaxed);
                        let Some(id) = ids.get(index) else {
                            break done;
                        };
                        done.push((index, self.fetch_guarded(id, mode, organism)));
                    }
                }));
            }

            for handle in handles {
                match handle.join() {
                    Ok(done) => {
                        for (index, annotation) in done {
                            slots[index] = Some(annotation);
                        }
                    }
                    Err(_) => error!("batch worker thread panicked"),
                }
            }
        });

        slots
    }

    fn fetch_guarded(&self, id: &ProteinId, mode: NameMode, organism: &OrganismId) -> ProteinAnnotation {
        panic::catch_unwind(AssertUnwindSafe(|| self.fetcher.fetch(id, mode, organism))).unwrap_or_else(
            |_| {
                error!(protein = %id, "fetch panicked");
                ProteinAnnotation::failed(id.clone(), &AnnotatorError::Worker(id.to_string()))
            },
        )
    }
}
