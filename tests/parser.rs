use std::fs;

use serde_json::{Value, json};

use uniprot_annotator::domain::{GoDomain, ProteinId};
use uniprot_annotator::parser::{ParseOptions, first_result, parse_entry};

fn protein(id: &str) -> ProteinId {
    id.parse().unwrap()
}

fn fixture() -> Value {
    let raw = fs::read_to_string("tests/fixtures/uniprot_search_YAL001C.json").unwrap();
    serde_json::from_str(&raw).unwrap()
}

#[test]
fn parse_search_fixture() {
    let payload = fixture();
    let entry = first_result(&payload).unwrap();
    let result = parse_entry(&protein("YAL001C"), entry, &ParseOptions::default());

    assert_eq!(result.protein.as_str(), "YAL001C");
    assert_eq!(result.sequence_length, Some(1160));
    assert!(result.error.is_none());

    let features = result.features.unwrap();
    let kinds = features.iter().map(|f| f.kind.as_str()).collect::<Vec<_>>();
    assert_eq!(
        kinds,
        vec!["Chain", "Region", "Compositional bias", "Modified residue"]
    );
    assert_eq!(features[1].description, "Disordered");
    assert_eq!((features[3].start, features[3].end), (1052, 1052));

    let go = result.go_terms.unwrap();
    assert_eq!(go.cellular_component.len(), 2);
    assert_eq!(go.molecular_function.len(), 1);
    assert_eq!(go.biological_process.len(), 2);
    let complex = &go.cellular_component[0];
    assert_eq!(complex.id, "GO:0000127");
    assert_eq!(complex.name, "transcription factor TFIIIC complex");
    assert_eq!(complex.evidence.as_deref(), Some("IDA"));
    assert_eq!(go.molecular_function[0].evidence.as_deref(), Some("IEA"));
    assert_eq!(go.biological_process[1].evidence, None);
    assert!(go.domain(GoDomain::BiologicalProcess).iter().all(|t| t.parents.is_empty()));
}

#[test]
fn visualization_preset_on_fixture() {
    let payload = fixture();
    let entry = first_result(&payload).unwrap();
    let result = parse_entry(&protein("YAL001C"), entry, &ParseOptions::visualization());
    let kinds = result
        .features
        .unwrap()
        .into_iter()
        .map(|f| f.kind)
        .collect::<Vec<_>>();
    assert_eq!(kinds, vec!["Chain", "Region"]);
}

#[test]
fn feature_missing_start_is_skipped() {
    let entry = json!({
        "sequence": {"length": 300},
        "features": [
            {"type": "Domain", "description": "SH3",
             "location": {"start": {"value": 10}, "end": {"value": 70}}},
            {"type": "Region", "description": "Disordered",
             "location": {"end": {"value": 120}}},
            {"description": "no type",
             "location": {"start": {"value": 1}, "end": {"value": 5}}},
            {"type": "Repeat", "description": "WD 1",
             "location": {"start": {"value": 150}}},
            {"type": "Repeat", "description": "WD 2",
             "location": {"start": {"value": 200}, "end": {"value": 240}}}
        ]
    });
    let result = parse_entry(&protein("P1"), &entry, &ParseOptions::default());
    let features = result.features.unwrap();
    let descriptions = features
        .iter()
        .map(|f| f.description.as_str())
        .collect::<Vec<_>>();
    assert_eq!(descriptions, vec!["SH3", "WD 2"]);
    assert!(result.error.is_none());
}

#[test]
fn go_terms_split_by_domain() {
    let entry = json!({
        "sequence": {"length": 284},
        "features": [],
        "uniProtKBCrossReferences": [
            {"database": "GO", "id": "GO:0006936", "properties": [
                {"key": "GoTerm", "value": "P:muscle contraction"},
                {"key": "GoEvidenceType", "value": "IDA:SGD"}
            ]},
            {"database": "GO", "id": "GO:0005737", "properties": [
                {"key": "GoTerm", "value": "C:cytoplasm"},
                {"key": "GoEvidenceType", "value": "IDA:SGD"}
            ]},
            {"database": "GO", "id": "GO:0003779", "properties": [
                {"key": "GoTerm", "value": "X:unknown"}
            ]},
            {"database": "InterPro", "id": "IPR001715", "properties": []}
        ]
    });
    let result = parse_entry(&protein("TEST_PROTEIN"), &entry, &ParseOptions::default());
    let go = result.go_terms.unwrap();

    assert_eq!(go.biological_process.len(), 1);
    assert_eq!(go.cellular_component.len(), 1);
    assert!(go.molecular_function.is_empty());
    assert_eq!(go.len(), 2);

    let term = &go.biological_process[0];
    assert_eq!(term.id, "GO:0006936");
    assert_eq!(term.name, "muscle contraction");
    assert_eq!(term.evidence.as_deref(), Some("IDA"));
}

#[test]
fn empty_entry_has_no_error() {
    let entry = json!({
        "sequence": {"length": 100},
        "features": [],
        "uniProtKBCrossReferences": []
    });
    let result = parse_entry(&protein("NO_GO_PROTEIN"), &entry, &ParseOptions::default());
    assert!(result.error.is_none());
    assert_eq!(result.sequence_length, Some(100));
    assert_eq!(result.features, Some(Vec::new()));
    assert!(result.go_terms.is_none());
}

#[test]
fn malformed_shapes_never_fail() {
    for entry in [
        json!({}),
        json!({"sequence": "long", "features": {"not": "a list"}}),
        json!({"sequence": {"length": -3}, "uniProtKBCrossReferences": [{"database": "GO"}]}),
        Value::Null,
    ] {
        let result = parse_entry(&protein("ODD"), &entry, &ParseOptions::default());
        assert!(result.error.is_none());
        assert_eq!(result.sequence_length, None);
        assert_eq!(result.features, Some(Vec::new()));
        assert!(result.go_terms.is_none());
    }
}

#[test]
fn only_go_cross_references_only_go_terms() {
    let entry = json!({
        "uniProtKBCrossReferences": [
            {"database": "PDB", "id": "1ABC", "properties": [
                {"key": "GoTerm", "value": "P:not really"}
            ]}
        ]
    });
    let result = parse_entry(&protein("P2"), &entry, &ParseOptions::default());
    assert!(result.go_terms.is_none());
}
