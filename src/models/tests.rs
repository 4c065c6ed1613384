//! Unit tests for data models
//!
//! Validates identifier derivation, record deserialization at the inventory
//! boundary and summary serialization.

use super::*;

#[test]
fn test_identifier_is_case_insensitive() {
    let a = PermissionRecord::new("VM-Web01", "VirtualMachine", "DOMAIN\\WebAdmins", "Administrator");
    let b = PermissionRecord::new("vm-web01", "VirtualMachine", "domain\\webadmins", "ADMINISTRATOR");
    assert_eq!(a.entity_identifier(), b.entity_identifier());
}

#[test]
fn test_identifier_substitutes_whitespace_and_slashes() {
    let id = derive_entity_identifier("Prod  Folder/VMs", "DOMAIN\\ops team", "Read-only");
    assert_eq!(id, "prod_folder_vms_domain_ops_team_read-only");
}

#[test]
fn test_identifier_distinguishes_roles() {
    let a = derive_entity_identifier("Cluster-Prod", "DOMAIN\\ops", "Read-only");
    let b = derive_entity_identifier("Cluster-Prod", "DOMAIN\\ops", "Administrator");
    assert_ne!(a, b);
}

#[test]
fn test_record_deserialization_recomputes_identifier() {
    let json = r#"{
        "entity": "Datacenter1",
        "entityType": "Datacenter",
        "principal": "DOMAIN\\admin",
        "role": "Administrator",
        "inherited": false,
        "propagate": true,
        "source": "Object",
        "entityIdentifier": "bogus"
    }"#;

    let record: PermissionRecord = serde_json::from_str(json).unwrap();
    assert_eq!(record.entity_identifier(), "datacenter1_domain_admin_administrator");
    assert_eq!(record.source, PermissionSource::Object);
}

#[test]
fn test_record_rejects_unknown_fields() {
    let json = r#"{
        "entity": "Datacenter1",
        "entityType": "Datacenter",
        "principal": "DOMAIN\\admin",
        "role": "Administrator",
        "colour": "blue"
    }"#;

    assert!(serde_json::from_str::<PermissionRecord>(json).is_err());
}

#[test]
fn test_record_defaults_and_lenient_dates() {
    let json = r#"{
        "entity": "esx01",
        "entityType": "HostSystem",
        "principal": "root",
        "role": "Administrator",
        "createdDate": "2024-03-01T10:15:00Z",
        "modifiedDate": "N/A"
    }"#;

    let record: PermissionRecord = serde_json::from_str(json).unwrap();
    assert!(!record.inherited);
    assert!(record.propagate);
    assert_eq!(record.source, PermissionSource::Object);
    assert!(record.created_date.is_some());
    assert!(record.modified_date.is_none());
}

#[test]
fn test_parse_timestamp_formats() {
    assert!(parse_timestamp("2024-03-01T10:15:00+02:00").is_some());
    assert!(parse_timestamp("2024-03-01 10:15:00").is_some());
    assert!(parse_timestamp("yesterday").is_none());
    assert_eq!(format_timestamp(None), "N/A");

    let ts = parse_timestamp("2024-03-01 10:15:00").unwrap();
    assert_eq!(format_timestamp(Some(&ts)), "2024-03-01 10:15:00 UTC");
}

#[test]
fn test_group_order_is_report_order() {
    let mut groups = PermissionGroup::ALL.to_vec();
    groups.sort();
    assert_eq!(groups, PermissionGroup::ALL.to_vec());
    assert_eq!(groups.first(), Some(&PermissionGroup::Global));
    assert_eq!(groups.last(), Some(&PermissionGroup::Other));
}

#[test]
fn test_summary_serializes_camel_case() {
    let summary = EnrichmentSummary {
        input_file: "in.html".to_string(),
        output_file: "out.html".to_string(),
        tooltips_added: 3,
        entries_processed: 3,
        chunking: ChunkingSummary {
            chunk_size: 2,
            total_chunks: 2,
            processing_time_seconds: 0.5,
            processing_rate_per_second: 6.0,
        },
        enhancement_timestamp: "2024-03-01T10:15:00+00:00".to_string(),
        features: vec!["chunked-processing".to_string()],
    };

    let json = serde_json::to_string(&summary).unwrap();
    assert!(json.contains("\"tooltipsAdded\":3"));
    assert!(json.contains("\"totalChunks\":2"));
    assert!(json.contains("\"processingRatePerSecond\":6.0"));
    assert!(json.contains("\"enhancementTimestamp\""));
}
