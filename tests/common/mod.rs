#![allow(dead_code)]

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use serde_json::{Value, json};

use uniprot_annotator::cache::AnnotationCache;
use uniprot_annotator::fetcher::ProteinFetcher;
use uniprot_annotator::lookup::{LookupStrategy, RetryPolicy, Sleeper};
use uniprot_annotator::transport::{SearchRequest, SearchResponse, SearchTransport, TransportError};

pub type Reply = Result<SearchResponse, TransportError>;

/// Transport answering each request with a closure, recording every query.
pub struct MockTransport<F> {
    respond: F,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
    queries: Mutex<Vec<String>>,
    delay: Option<Duration>,
}

impl<F> MockTransport<F>
where
    F: Fn(&SearchRequest, usize) -> Reply + Send + Sync,
{
    pub fn new(respond: F) -> Self {
        Self {
            respond,
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            peak_in_flight: AtomicUsize::new(0),
            queries: Mutex::new(Vec::new()),
            delay: None,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }
}

impl<F> SearchTransport for MockTransport<F>
where
    F: Fn(&SearchRequest, usize) -> Reply + Send + Sync,
{
    fn search(&self, request: &SearchRequest) -> Reply {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(current, Ordering::SeqCst);
        self.queries.lock().unwrap().push(request.query.clone());
        if let Some(delay) = self.delay {
            thread::sleep(delay);
        }
        let reply = (self.respond)(request, call);
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        reply
    }
}

#[derive(Default)]
pub struct RecordingSleeper {
    waits: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    pub fn waits(&self) -> Vec<Duration> {
        self.waits.lock().unwrap().clone()
    }
}

impl Sleeper for RecordingSleeper {
    fn sleep(&self, duration: Duration) {
        self.waits.lock().unwrap().push(duration);
    }
}

pub fn ok(payload: Value) -> Reply {
    Ok(SearchResponse {
        status: 200,
        body: payload.to_string(),
    })
}

pub fn status(code: u16) -> Reply {
    Ok(SearchResponse {
        status: code,
        body: String::new(),
    })
}

pub fn empty() -> Reply {
    ok(json!({"results": []}))
}

/// Minimal search hit for `name` with one domain and one GO term.
pub fn hit(name: &str, length: u64) -> Reply {
    ok(json!({
        "results": [{
            "primaryAccession": format!("ACC_{name}"),
            "sequence": {"length": length},
            "features": [{
                "type": "Domain",
                "description": format!("{name} domain"),
                "location": {"start": {"value": 1}, "end": {"value": length}}
            }],
            "uniProtKBCrossReferences": [{
                "database": "GO",
                "id": "GO:0005737",
                "properties": [
                    {"key": "GoTerm", "value": "C:cytoplasm"},
                    {"key": "GoEvidenceType", "value": "IDA:SGD"}
                ]
            }]
        }]
    }))
}

/// Pulls the identifier back out of a rendered query variant.
pub fn queried_id(request: &SearchRequest) -> String {
    let query = request.query.as_str();
    let query = query
        .strip_prefix("gene:")
        .or_else(|| query.strip_prefix("accession:"))
        .unwrap_or(query);
    query.split_whitespace().next().unwrap_or_default().to_string()
}

pub fn test_policy() -> RetryPolicy {
    RetryPolicy {
        max_retries: 2,
        backoff_base: Duration::from_secs(1),
    }
}

pub fn fetcher<T: SearchTransport>(
    transport: T,
    cache: Arc<AnnotationCache>,
    sleeper: Arc<RecordingSleeper>,
) -> ProteinFetcher<T> {
    let strategy = LookupStrategy::with_sleeper(transport, test_policy(), sleeper);
    ProteinFetcher::new(cache, strategy)
}
