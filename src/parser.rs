use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;
use tracing::{debug, warn};

use crate::domain::{
    FeatureRecord, GoDomain, GoTerm, GoTermsByDomain, ProteinAnnotation, ProteinId,
};
use crate::error::AnnotatorError;

static GO_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^GO:\d{7}$").expect("GO id pattern is valid")
});

/// Feature types shown by the network visualization.
pub const VISUALIZATION_FEATURE_TYPES: [&str; 5] =
    ["Domain", "Repeat", "Region", "Transit peptide", "Chain"];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParseOptions {
    /// Keep only these feature types; `None` keeps everything.
    pub feature_types: Option<BTreeSet<String>>,
}

impl ParseOptions {
    pub fn visualization() -> Self {
        Self {
            feature_types: Some(
                VISUALIZATION_FEATURE_TYPES
                    .iter()
                    .map(|kind| kind.to_string())
                    .collect(),
            ),
        }
    }

    fn keeps(&self, kind: &str) -> bool {
        self.feature_types
            .as_ref()
            .is_none_or(|allowed| allowed.contains(kind))
    }
}

/// First entry of a `/uniprotkb/search` response, if the search matched.
pub fn first_result(payload: &Value) -> Option<&Value> {
    payload
        .get("results")
        .and_then(|v| v.as_array())
        .and_then(|arr| arr.first())
}

pub fn parse_entry(protein: &ProteinId, entry: &Value, options: &ParseOptions) -> ProteinAnnotation {
    let sequence_length = entry
        .get("sequence")
        .and_then(|v| v.get("length"))
        .and_then(|v| v.as_u64());

    let mut features = Vec::new();
    if let Some(items) = entry.get("features").and_then(|v| v.as_array()) {
        for item in items {
            match parse_feature(item, sequence_length) {
                Ok(feature) if options.keeps(&feature.kind) => features.push(feature),
                Ok(feature) => {
                    debug!(protein = %protein, kind = %feature.kind, "feature type filtered out")
                }
                Err(err) => warn!(protein = %protein, error = %err, "skipping feature"),
            }
        }
    }

    let mut go_terms = GoTermsByDomain::default();
    if let Some(xrefs) = entry
        .get("uniProtKBCrossReferences")
        .and_then(|v| v.as_array())
    {
        for xref in xrefs {
            if xref.get("database").and_then(|v| v.as_str()) != Some("GO") {
                continue;
            }
            match parse_go_term(xref) {
                Ok((domain, term)) => go_terms.push(domain, term),
                Err(err) => warn!(protein = %protein, error = %err, "skipping GO term"),
            }
        }
    }

    ProteinAnnotation {
        protein: protein.clone(),
        sequence_length,
        features: Some(features),
        go_terms: (!go_terms.is_empty()).then_some(go_terms),
        error: None,
    }
}

fn parse_feature(item: &Value, sequence_length: Option<u64>) -> Result<FeatureRecord, AnnotatorError> {
    let kind = item
        .get("type")
        .and_then(|v| v.as_str())
        .ok_or_else(|| AnnotatorError::Malformed("feature without type".to_string()))?;
    let location = item.get("location");
    let start = location
        .and_then(|v| v.get("start"))
        .and_then(position)
        .ok_or_else(|| AnnotatorError::Malformed(format!("{kind} feature without start")))?;
    let end = location
        .and_then(|v| v.get("end"))
        .and_then(position)
        .ok_or_else(|| AnnotatorError::Malformed(format!("{kind} feature without end")))?;

    if start == 0 || end < start {
        return Err(AnnotatorError::Malformed(format!(
            "{kind} feature has invalid range {start}..{end}"
        )));
    }
    if let Some(length) = sequence_length {
        if end > length {
            return Err(AnnotatorError::Malformed(format!(
                "{kind} feature ends at {end}, past sequence length {length}"
            )));
        }
    }

    let description = item
        .get("description")
        .and_then(|v| v.as_str())
        .unwrap_or(kind)
        .to_string();

    Ok(FeatureRecord {
        kind: kind.to_string(),
        description,
        start,
        end,
    })
}

fn position(bound: &Value) -> Option<u64> {
    bound
        .get("value")
        .and_then(|v| v.as_u64())
        .or_else(|| bound.get("position").and_then(|v| v.as_u64()))
}

fn parse_go_term(xref: &Value) -> Result<(GoDomain, GoTerm), AnnotatorError> {
    let id = xref
        .get("id")
        .and_then(|v| v.as_str())
        .filter(|id| GO_ID.is_match(id))
        .ok_or_else(|| {
            AnnotatorError::Malformed(format!("GO cross-reference with bad id: {}", xref["id"]))
        })?;

    let (aspect, name) = property(xref, "GoTerm")
        .and_then(|value| value.split_once(':'))
        .ok_or_else(|| AnnotatorError::Malformed(format!("{id} has no GoTerm property")))?;
    let domain = GoDomain::from_aspect(aspect).ok_or_else(|| {
        AnnotatorError::Malformed(format!("{id} has unknown ontology aspect {aspect:?}"))
    })?;

    let evidence = property(xref, "GoEvidenceType")
        .and_then(|value| value.split(':').next())
        .map(str::trim)
        .filter(|code| !code.is_empty())
        .map(|code| code.to_string());

    Ok((
        domain,
        GoTerm {
            id: id.to_string(),
            name: name.trim().to_string(),
            evidence,
            parents: Vec::new(),
        },
    ))
}

fn property<'a>(xref: &'a Value, key: &str) -> Option<&'a str> {
    xref.get("properties")
        .and_then(|v| v.as_array())?
        .iter()
        .find(|prop| prop.get("key").and_then(|v| v.as_str()) == Some(key))
        .and_then(|prop| prop.get("value"))
        .and_then(|v| v.as_str())
}
