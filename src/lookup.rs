use std::fmt;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::domain::{NameMode, OrganismId, ProteinId};
use crate::error::AnnotatorError;
use crate::parser::first_result;
use crate::transport::{SearchRequest, SearchResponse, SearchTransport, TransportError};

pub const DEFAULT_MAX_RETRIES: u32 = 2;
pub const DEFAULT_BACKOFF_BASE: Duration = Duration::from_secs(1);

/// UniProt's accession, gene and free-text indexes are disjoint and unevenly
/// populated, so a lookup walks several query shapes in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryVariant {
    Gene,
    Accession,
    FreeText,
}

impl QueryVariant {
    pub fn plan(mode: NameMode) -> &'static [QueryVariant] {
        match mode {
            NameMode::Systematic => &[
                QueryVariant::Gene,
                QueryVariant::Accession,
                QueryVariant::FreeText,
            ],
            NameMode::Gene => &[
                QueryVariant::Gene,
                QueryVariant::FreeText,
                QueryVariant::Accession,
            ],
        }
    }

    pub fn query(self, id: &ProteinId, organism: &OrganismId) -> String {
        match self {
            QueryVariant::Gene => format!("gene:{id} AND organism_id:{organism}"),
            QueryVariant::Accession => format!("accession:{id}"),
            QueryVariant::FreeText => format!("{id} AND organism_id:{organism}"),
        }
    }
}

impl fmt::Display for QueryVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryVariant::Gene => write!(f, "gene"),
            QueryVariant::Accession => write!(f, "accession"),
            QueryVariant::FreeText => write!(f, "free-text"),
        }
    }
}

/// What a single request against one query variant produced.
#[derive(Debug, Clone, PartialEq)]
pub enum AttemptOutcome {
    Found(Value),
    Empty,
    RateLimited,
    Status { status: u16, message: String },
    Malformed(String),
    Timeout,
    Transport(String),
}

impl AttemptOutcome {
    pub fn classify(result: Result<SearchResponse, TransportError>) -> Self {
        let response = match result {
            Ok(response) => response,
            Err(TransportError::Timeout) => return AttemptOutcome::Timeout,
            Err(err) => return AttemptOutcome::Transport(err.to_string()),
        };
        if response.status == 429 {
            return AttemptOutcome::RateLimited;
        }
        if !response.is_success() {
            let message = response.body.chars().take(200).collect();
            return AttemptOutcome::Status {
                status: response.status,
                message,
            };
        }
        match serde_json::from_str::<Value>(&response.body) {
            Ok(payload) => match first_result(&payload) {
                Some(entry) if entry.is_object() => AttemptOutcome::Found(entry.clone()),
                Some(entry) => {
                    AttemptOutcome::Malformed(format!("search hit is not an entry object: {entry}"))
                }
                None => AttemptOutcome::Empty,
            },
            Err(err) => AttemptOutcome::Malformed(err.to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Accept,
    RetrySameVariant(Duration),
    NextVariant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub backoff_base: Duration,
}

impl RetryPolicy {
    /// `base * 2^attempt`, attempt counted from zero.
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.backoff_base
            .saturating_mul(2u32.saturating_pow(attempt))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            backoff_base: DEFAULT_BACKOFF_BASE,
        }
    }
}

/// Decides the next step after `attempt` (zero-based) on the current variant.
pub fn next_action(outcome: &AttemptOutcome, attempt: u32, policy: &RetryPolicy) -> Action {
    match outcome {
        AttemptOutcome::Found(_) => Action::Accept,
        AttemptOutcome::RateLimited if attempt < policy.max_retries => {
            Action::RetrySameVariant(policy.backoff(attempt))
        }
        _ => Action::NextVariant,
    }
}

pub trait Sleeper: Send + Sync {
    fn sleep(&self, duration: Duration);
}

impl<S: Sleeper + ?Sized> Sleeper for Arc<S> {
    fn sleep(&self, duration: Duration) {
        (**self).sleep(duration)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        thread::sleep(duration);
    }
}

pub struct LookupStrategy<T: SearchTransport> {
    transport: T,
    policy: RetryPolicy,
    sleeper: Box<dyn Sleeper>,
}

impl<T: SearchTransport> LookupStrategy<T> {
    pub fn new(transport: T, policy: RetryPolicy) -> Self {
        Self::with_sleeper(transport, policy, ThreadSleeper)
    }

    pub fn with_sleeper<S: Sleeper + 'static>(transport: T, policy: RetryPolicy, sleeper: S) -> Self {
        Self {
            transport,
            policy,
            sleeper: Box::new(sleeper),
        }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Walks the query plan for `mode` and returns the first UniProt entry
    /// any variant yields.
    ///
    /// Fails with `NotFound` when at least one variant came back with an empty
    /// result set; otherwise with the last failure seen, unparseable bodies
    /// included.
    pub fn lookup(
        &self,
        id: &ProteinId,
        mode: NameMode,
        organism: &OrganismId,
    ) -> Result<Value, AnnotatorError> {
        let mut answered = false;
        let mut last_failure = None;

        for (index, variant) in QueryVariant::plan(mode).iter().enumerate() {
            let request = SearchRequest::new(variant.query(id, organism));
            let mut attempt = 0u32;
            loop {
                info!(
                    protein = %id,
                    variant = %variant,
                    step = index + 1,
                    attempt,
                    query = %request.query,
                    "querying UniProt"
                );
                let outcome = AttemptOutcome::classify(self.transport.search(&request));
                let action = next_action(&outcome, attempt, &self.policy);
                match outcome {
                    AttemptOutcome::Found(entry) => {
                        debug!(protein = %id, variant = %variant, "UniProt match");
                        return Ok(entry);
                    }
                    AttemptOutcome::Empty => {
                        debug!(protein = %id, variant = %variant, "no UniProt results");
                        answered = true;
                    }
                    AttemptOutcome::Malformed(message) => {
                        warn!(protein = %id, variant = %variant, error = %message, "unparseable UniProt response");
                        last_failure = Some(AnnotatorError::Malformed(format!("{id}: {message}")));
                    }
                    AttemptOutcome::RateLimited => {
                        warn!(protein = %id, variant = %variant, attempt, "rate limited by UniProt");
                        last_failure = Some(AnnotatorError::RateLimited(id.to_string()));
                    }
                    AttemptOutcome::Status { status, message } => {
                        warn!(protein = %id, variant = %variant, status, "UniProt request failed");
                        last_failure = Some(AnnotatorError::UniprotStatus { status, message });
                    }
                    AttemptOutcome::Timeout => {
                        warn!(protein = %id, variant = %variant, "UniProt request timed out");
                        last_failure = Some(AnnotatorError::Timeout(id.to_string()));
                    }
                    AttemptOutcome::Transport(message) => {
                        warn!(protein = %id, variant = %variant, error = %message, "UniProt transport error");
                        last_failure = Some(AnnotatorError::Transport(format!("{id}: {message}")));
                    }
                }

                match action {
                    Action::RetrySameVariant(delay) => {
                        debug!(protein = %id, delay_ms = delay.as_millis() as u64, "backing off");
                        self.sleeper.sleep(delay);
                        attempt += 1;
                    }
                    Action::Accept | Action::NextVariant => break,
                }
            }
        }

        match last_failure {
            Some(failure) if !answered => Err(failure),
            _ => Err(AnnotatorError::NotFound(id.to_string())),
        }
    }
}
