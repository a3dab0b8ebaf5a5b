use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::json;

use xmlkit::{FormatOptions, ParseOptions, Xml, XmlError};

mod common;
use common::Fixtures;

const CATALOG: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<catalog xmlns:dc="http://purl.org/dc/elements/1.1/" version="2">
    <!-- books only -->
    <book id="b1" lang="en">
        <dc:title>Rust in Action</dc:title>
        <price currency="EUR">39.90</price>
        <tags>systems programming</tags>
    </book>
    <book id="b2">
        <dc:title>XML Schema</dc:title>
        <price currency="USD">25</price>
        <tags/>
        <blurb>   </blurb>
    </book>
</catalog>"#;

#[derive(Debug, Deserialize, Serialize, PartialEq)]
struct Price {
    #[serde(rename = "@currency")]
    currency: String,
    #[serde(rename = "#text")]
    amount: f64,
}

#[derive(Debug, Deserialize, PartialEq)]
struct Book {
    id: String,
    lang: Option<String>,
    price: Price,
    #[serde(default)]
    tags: Vec<String>,
}

#[test]
fn test_file_round_trip_after_edits() {
    let fixtures = Fixtures::new();
    let source = fixtures.write("catalog.xml", CATALOG);

    let xml = Xml::from_file(&source).unwrap();
    let second = xml.query_one("book[@id='b2']").unwrap().unwrap();
    second.set_attr("lang", "de").unwrap();
    second.child("blurb").unwrap().remove();

    let added = xml.add_child("book").unwrap();
    added.set_attr("id", "b3").unwrap();
    added.add_text_child("price", "12.5").unwrap();

    let target = fixtures.path("saved.xml");
    xml.save(&target, &FormatOptions::default()).unwrap();

    let reloaded = Xml::from_file(&target).unwrap();
    assert_eq!(reloaded.count("book").unwrap(), 3);
    assert_eq!(
        reloaded.query_text("book[@id='b2']/@lang").unwrap().as_deref(),
        Some("de")
    );
    assert!(!reloaded.exists("//blurb").unwrap());
    assert_eq!(reloaded.value::<f64>("book[@id='b3']/price").unwrap(), Some(12.5));

    let saved = std::fs::read_to_string(&target).unwrap();
    assert!(saved.starts_with("<?xml"));
    assert!(saved.contains("\n  <book id=\"b1\" lang=\"en\">\n"));
}

#[test]
fn test_text_convention_from_file() {
    let fixtures = Fixtures::new();
    let path = fixtures.write("catalog.xml", CATALOG);
    let xml = Xml::from_file(&path).unwrap();

    let b2 = xml.query_one("book[@id='b2']").unwrap().unwrap();
    assert_eq!(b2.child("tags").unwrap().text(), None);
    assert_eq!(b2.child("blurb").unwrap().text().as_deref(), Some(""));
    assert_eq!(b2.child("tags").unwrap().text_or_empty(), "");
}

#[test]
fn test_namespaced_queries() {
    let xml = Xml::parse(CATALOG)
        .unwrap()
        .with_namespace("dc", "http://purl.org/dc/elements/1.1/");

    assert_eq!(
        xml.list("book/dc:title").unwrap(),
        vec!["Rust in Action", "XML Schema"]
    );
    let title = xml.query_one("book/dc:title").unwrap().unwrap();
    assert_eq!(title.local_name(), "title");
    assert_eq!(
        title.namespace().as_deref(),
        Some("http://purl.org/dc/elements/1.1/")
    );
    assert!(matches!(
        Xml::parse(CATALOG).unwrap().query("book/undeclared:title"),
        Err(XmlError::XPath { .. })
    ));
}

#[test]
fn test_bind_catalog_entries() {
    let xml = Xml::parse(CATALOG).unwrap();
    let books: Vec<Book> = xml.query("book").unwrap().iter().map(|b| b.to_object().unwrap()).collect();

    assert_eq!(books.len(), 2);
    assert_eq!(books[0].id, "b1");
    assert_eq!(books[0].lang.as_deref(), Some("en"));
    assert_eq!(books[0].price.amount, 39.90);
    assert_eq!(books[0].tags, vec!["systems programming"]);
    assert_eq!(books[1].lang, None);
    assert_eq!(books[1].price.currency, "USD");
    assert_eq!(books[1].tags, vec![""]);
}

#[test]
fn test_object_to_xml_and_back() {
    let price = Price {
        currency: "GBP".to_string(),
        amount: 7.5,
    };
    let xml = Xml::from_object("price", &price).unwrap();
    assert_eq!(xml.attr("currency").as_deref(), Some("GBP"));
    assert_eq!(xml.text().as_deref(), Some("7.5"));

    let back: Price = xml.to_object().unwrap();
    assert_eq!(back, price);
}

#[test]
fn test_json_and_map_conversions() {
    let xml = Xml::parse(CATALOG).unwrap();
    let json = xml.to_json();
    assert_eq!(json["@version"], json!("2"));
    assert_eq!(json["book"][0]["price"]["#text"], json!("39.90"));
    assert_eq!(json["book"][1]["tags"], json!(null));

    let rebuilt = Xml::from_json("settings", &json!({"@env": "prod", "host": "db", "port": 5432, "replica": ["a", "b"]})).unwrap();
    assert_eq!(rebuilt.attr("env").as_deref(), Some("prod"));
    assert_eq!(rebuilt.list("replica").unwrap(), vec!["a", "b"]);
    assert_eq!(rebuilt.as_map().get("port").map(String::as_str), Some("5432"));

    let mut map = BTreeMap::new();
    map.insert("alpha", "1");
    map.insert("beta", "2");
    let from_map = Xml::from_map("values", &map).unwrap();
    assert_eq!(from_map.as_list(), vec!["1", "2"]);

    let from_list = Xml::from_list("names", "name", &["x", "y", "z"]).unwrap();
    assert_eq!(from_list.count("name").unwrap(), 3);
}

#[test]
fn test_parse_options_and_errors() {
    let fixtures = Fixtures::new();
    let broken = fixtures.write("broken.xml", "<a>\n<b>\n</a>");

    match Xml::from_file(&broken) {
        Err(XmlError::Parse { line, .. }) => assert!(line >= 2),
        other => panic!("Expected Parse error, got {:?}", other),
    }
    assert!(matches!(
        Xml::from_file(fixtures.path("missing.xml")),
        Err(XmlError::FileNotFound { .. })
    ));

    let compact = ParseOptions {
        keep_blanks: false,
        ..ParseOptions::default()
    };
    let xml = Xml::parse_with(CATALOG, &compact).unwrap();
    assert_eq!(xml.to_string().lines().count(), 1);
}

#[test]
fn test_pretty_output_wraps_long_tags() {
    let xml = Xml::new("config").unwrap();
    let endpoint = xml.add_child("endpoint").unwrap();
    endpoint
        .set_attr("name", "primary")
        .unwrap()
        .set_attr("url", "https://service.example.org/api/v2")
        .unwrap();

    let narrow = FormatOptions {
        max_line_width: 40,
        ..FormatOptions::default()
    };
    let output = xml.to_pretty_string_with(&narrow).unwrap();
    assert_eq!(
        output,
        "<config>\n  <endpoint name=\"primary\"\n            url=\"https://service.example.org/api/v2\"/>\n</config>\n"
    );
}
