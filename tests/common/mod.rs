#![allow(dead_code)]

use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

pub const ORDER_XSD: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
    <xs:include schemaLocation="types.xsd"/>
    <xs:element name="order">
        <xs:complexType>
            <xs:sequence>
                <xs:element name="item" type="itemType" maxOccurs="unbounded"/>
            </xs:sequence>
            <xs:attribute name="id" type="xs:string" use="required"/>
        </xs:complexType>
    </xs:element>
</xs:schema>"#;

pub const TYPES_XSD: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
    <xs:complexType name="itemType">
        <xs:sequence>
            <xs:element name="sku" type="xs:string"/>
            <xs:element name="quantity" type="xs:positiveInteger"/>
        </xs:sequence>
    </xs:complexType>
</xs:schema>"#;

pub const VALID_ORDER: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<order id="A-17">
    <item><sku>widget</sku><quantity>2</quantity></item>
    <item><sku>gadget</sku><quantity>1</quantity></item>
</order>"#;

pub const INVALID_ORDER: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<order>
    <item><sku>widget</sku><quantity>0</quantity></item>
</order>"#;

/// Temporary directory holding fixture files
pub struct Fixtures {
    pub dir: TempDir,
}

impl Fixtures {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
        }
    }

    pub fn write(&self, name: &str, content: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        fs::write(&path, content).unwrap();
        path
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    /// Order schema split over two files, plus a valid and an invalid order
    pub fn orders() -> Self {
        let fixtures = Self::new();
        fixtures.write("order.xsd", ORDER_XSD);
        fixtures.write("types.xsd", TYPES_XSD);
        fixtures.write("valid.xml", VALID_ORDER);
        fixtures.write("invalid.xml", INVALID_ORDER);
        fixtures
    }
}
