use rayon::prelude::*;

use xmlkit::{CollectingHandler, ErrorPolicy, FailFast, Schema, Xml, XmlError};

mod common;
use common::{Fixtures, INVALID_ORDER, VALID_ORDER};

#[test]
fn test_schema_with_relative_include() {
    let fixtures = Fixtures::orders();
    let schema = Schema::from_file(fixtures.path("order.xsd")).unwrap();

    assert!(schema.validate_file(fixtures.path("valid.xml"), &mut FailFast).unwrap());

    let mut handler = CollectingHandler::new();
    let valid = schema
        .validate_file(fixtures.path("invalid.xml"), &mut handler)
        .unwrap();
    assert!(!valid);

    let errors: Vec<_> = handler.errors().collect();
    assert!(errors.len() >= 2, "expected missing id and bad quantity: {:?}", errors);
    assert!(errors.iter().any(|e| e.message.contains("id")));
    assert!(errors.iter().all(|e| e.line.is_some()));
}

#[test]
fn test_unresolvable_include_fails_to_parse() {
    let fixtures = Fixtures::new();
    let path = fixtures.write("order.xsd", common::ORDER_XSD);
    assert!(matches!(
        Schema::from_file(path),
        Err(XmlError::SchemaParse { .. })
    ));
}

#[test]
fn test_fail_fast_reports_single_issue() {
    let fixtures = Fixtures::orders();
    let schema = Schema::from_file(fixtures.path("order.xsd")).unwrap();

    match schema.validate_str(INVALID_ORDER, &mut FailFast) {
        Err(XmlError::Validation { issues }) => assert_eq!(issues.len(), 1),
        other => panic!("Expected Validation error, got {:?}", other),
    }
}

#[test]
fn test_validate_edited_document() {
    let fixtures = Fixtures::orders();
    let schema = Schema::from_file(fixtures.path("order.xsd")).unwrap();

    let xml = Xml::parse(INVALID_ORDER).unwrap();
    assert!(!schema.validate_with_policy(&xml, ErrorPolicy::Collect).unwrap());

    xml.set_attr("id", "B-1").unwrap();
    xml.query_one("item/quantity").unwrap().unwrap().set_text(Some("3")).unwrap();
    assert!(schema.validate_with_policy(&xml, ErrorPolicy::Fail).unwrap());
}

#[test]
fn test_shared_schema_across_threads() {
    let fixtures = Fixtures::orders();
    let schema = Schema::from_file(fixtures.path("order.xsd")).unwrap();

    let results: Vec<bool> = (0..64)
        .into_par_iter()
        .map(|i| {
            let input = if i % 2 == 0 { VALID_ORDER } else { INVALID_ORDER };
            let mut handler = CollectingHandler::new();
            schema.validate_str(input, &mut handler).unwrap()
        })
        .collect();

    assert_eq!(results.iter().filter(|valid| **valid).count(), 32);
    assert!(results.iter().enumerate().all(|(i, valid)| *valid == (i % 2 == 0)));
}
