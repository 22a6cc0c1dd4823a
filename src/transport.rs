use std::sync::Arc;
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue, USER_AGENT};
use thiserror::Error;

use crate::error::AnnotatorError;

pub const DEFAULT_BASE_URL: &str = "https://rest.uniprot.org/uniprotkb";
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Every annotation field needed to build a `ProteinAnnotation` from a single
/// search hit, so one request per query variant is enough.
pub const ANNOTATION_FIELDS: &str = concat!(
    "length,",
    "ft_domain,ft_region,ft_motif,ft_repeat,ft_site,ft_act_site,",
    "ft_transmem,ft_intramem,ft_topo_dom,",
    "ft_signal,ft_transit,ft_propep,ft_chain,ft_peptide,",
    "ft_helix,ft_strand,ft_turn,",
    "ft_compbias,ft_disulfid,ft_crosslnk,",
    "ft_mod_res,ft_lipid,ft_carbohyd,",
    "ft_var_seq,ft_variant,ft_mutagen,ft_conflict,",
    "go,go_p,go_c,go_f"
);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    pub query: String,
    pub fields: &'static str,
    pub size: u32,
}

impl SearchRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            fields: ANNOTATION_FIELDS,
            size: 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchResponse {
    pub status: u16,
    pub body: String,
}

impl SearchResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("request timed out")]
    Timeout,
    #[error("connection failed: {0}")]
    Connect(String),
    #[error("{0}")]
    Other(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TransportError::Timeout
        } else if err.is_connect() {
            TransportError::Connect(err.to_string())
        } else {
            TransportError::Other(err.to_string())
        }
    }
}

/// One round-trip against the UniProtKB search endpoint.
pub trait SearchTransport: Send + Sync {
    fn search(&self, request: &SearchRequest) -> Result<SearchResponse, TransportError>;
}

impl<T: SearchTransport + ?Sized> SearchTransport for Arc<T> {
    fn search(&self, request: &SearchRequest) -> Result<SearchResponse, TransportError> {
        (**self).search(request)
    }
}

#[derive(Clone)]
pub struct UniprotHttpTransport {
    client: Client,
    search_url: String,
}

impl UniprotHttpTransport {
    pub fn new() -> Result<Self, AnnotatorError> {
        Self::with_settings(DEFAULT_BASE_URL, DEFAULT_REQUEST_TIMEOUT)
    }

    pub fn with_settings(base_url: &str, timeout: Duration) -> Result<Self, AnnotatorError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("uniprot-annotator/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| AnnotatorError::UniprotHttp(err.to_string()))?,
        );
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|err| AnnotatorError::UniprotHttp(err.to_string()))?;
        Ok(Self {
            client,
            search_url: format!("{}/search", base_url.trim_end_matches('/')),
        })
    }

    pub fn search_url(&self) -> &str {
        &self.search_url
    }
}

impl SearchTransport for UniprotHttpTransport {
    fn search(&self, request: &SearchRequest) -> Result<SearchResponse, TransportError> {
        let size = request.size.to_string();
        let response = self
            .client
            .get(&self.search_url)
            .query(&[
                ("query", request.query.as_str()),
                ("format", "json"),
                ("fields", request.fields),
                ("size", size.as_str()),
            ])
            .send()?;
        let status = response.status().as_u16();
        let body = response.text()?;
        Ok(SearchResponse { status, body })
    }
}
