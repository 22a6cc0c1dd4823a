use std::fmt;
use std::str::FromStr;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::AnnotatorError;

pub const DEFAULT_ORGANISM_ID: &str = "559292";

/// How the caller's identifiers were produced: yeast ordered-locus names
/// (`YAL001C`) or standard gene names (`TFC3`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum NameMode {
    #[default]
    Systematic,
    Gene,
}

impl fmt::Display for NameMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NameMode::Systematic => write!(f, "systematic"),
            NameMode::Gene => write!(f, "gene"),
        }
    }
}

impl FromStr for NameMode {
    type Err = AnnotatorError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "systematic" => Ok(NameMode::Systematic),
            "gene" => Ok(NameMode::Gene),
            other => Err(AnnotatorError::InvalidNameMode(other.to_string())),
        }
    }
}

/// Caller-supplied protein identifier. Kept verbatim (case-sensitive) since it
/// doubles as the cache key; only surrounding whitespace is dropped.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProteinId(String);

impl ProteinId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProteinId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ProteinId {
    type Err = AnnotatorError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        if value.is_empty() {
            return Err(AnnotatorError::InvalidProteinId(value.to_string()));
        }
        Ok(Self(value.to_string()))
    }
}

/// NCBI taxonomy identifier used to scope UniProt searches.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct OrganismId(String);

impl OrganismId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for OrganismId {
    fn default() -> Self {
        Self(DEFAULT_ORGANISM_ID.to_string())
    }
}

impl fmt::Display for OrganismId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for OrganismId {
    type Err = AnnotatorError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        let is_valid = !trimmed.is_empty() && trimmed.chars().all(|ch| ch.is_ascii_digit());
        if !is_valid {
            return Err(AnnotatorError::InvalidOrganismId(value.to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }
}

impl TryFrom<String> for OrganismId {
    type Error = AnnotatorError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<OrganismId> for String {
    fn from(value: OrganismId) -> Self {
        value.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureRecord {
    #[serde(rename = "type")]
    pub kind: String,
    pub description: String,
    pub start: u64,
    pub end: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoDomain {
    BiologicalProcess,
    CellularComponent,
    MolecularFunction,
}

impl GoDomain {
    /// Maps the one-letter aspect used in UniProt's `GoTerm` property.
    pub fn from_aspect(code: &str) -> Option<Self> {
        match code {
            "P" => Some(GoDomain::BiologicalProcess),
            "C" => Some(GoDomain::CellularComponent),
            "F" => Some(GoDomain::MolecularFunction),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoTerm {
    pub id: String,
    pub name: String,
    pub evidence: Option<String>,
    /// Reserved for hierarchy resolution; never populated.
    pub parents: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GoTermsByDomain {
    pub biological_process: Vec<GoTerm>,
    pub cellular_component: Vec<GoTerm>,
    pub molecular_function: Vec<GoTerm>,
}

impl GoTermsByDomain {
    pub fn push(&mut self, domain: GoDomain, term: GoTerm) {
        match domain {
            GoDomain::BiologicalProcess => self.biological_process.push(term),
            GoDomain::CellularComponent => self.cellular_component.push(term),
            GoDomain::MolecularFunction => self.molecular_function.push(term),
        }
    }

    pub fn domain(&self, domain: GoDomain) -> &[GoTerm] {
        match domain {
            GoDomain::BiologicalProcess => &self.biological_process,
            GoDomain::CellularComponent => &self.cellular_component,
            GoDomain::MolecularFunction => &self.molecular_function,
        }
    }

    pub fn len(&self) -> usize {
        self.biological_process.len() + self.cellular_component.len() + self.molecular_function.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Annotation for one requested protein. Absent values serialize as `null`
/// so callers can tell "not fetched" apart from "fetched, empty".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProteinAnnotation {
    pub protein: ProteinId,
    pub sequence_length: Option<u64>,
    pub features: Option<Vec<FeatureRecord>>,
    pub go_terms: Option<GoTermsByDomain>,
    pub error: Option<String>,
}

impl ProteinAnnotation {
    pub fn failed(protein: ProteinId, error: &AnnotatorError) -> Self {
        Self {
            protein,
            sequence_length: None,
            features: None,
            go_terms: None,
            error: Some(error.to_string()),
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchResult {
    pub proteins: Vec<ProteinAnnotation>,
}

impl BatchResult {
    pub fn len(&self) -> usize {
        self.proteins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.proteins.is_empty()
    }

    pub fn failures(&self) -> usize {
        self.proteins.iter().filter(|item| item.is_error()).count()
    }
}
