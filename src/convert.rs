//! List, map and JSON coercions for [`Xml`]
//!
//! JSON mapping rules:
//! - attributes become `"@name"` keys
//! - an element without attributes or children becomes its text, or `null`
//!   when it has none
//! - child elements become keys; repeated names collect into an array
//! - text next to attributes or children is kept under `"#text"`

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::error::{XmlError, XmlResult};
use crate::xml::Xml;

pub const ATTRIBUTE_PREFIX: char = '@';
pub const TEXT_KEY: &str = "#text";

impl Xml {
    /// Texts of the child elements; absent text reads as `""`
    pub fn as_list(&self) -> Vec<String> {
        self.children().iter().map(Xml::text_or_empty).collect()
    }

    /// Texts of every element an XPath expression selects
    pub fn list(&self, expr: &str) -> XmlResult<Vec<String>> {
        Ok(self.query(expr)?.iter().map(Xml::text_or_empty).collect())
    }

    /// Child element name to text; the first occurrence of a name wins
    pub fn as_map(&self) -> BTreeMap<String, String> {
        let mut map = BTreeMap::new();
        for child in self.children() {
            map.entry(child.name()).or_insert_with(|| child.text_or_empty());
        }
        map
    }

    /// Build `<root><key>value</key>...</root>`
    pub fn from_map<K, V>(root: &str, map: &BTreeMap<K, V>) -> XmlResult<Xml>
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let xml = Xml::new(root)?;
        for (key, value) in map {
            xml.add_text_child(key.as_ref(), value.as_ref())?;
        }
        Ok(xml)
    }

    /// Build `<root><item>value</item>...</root>`
    pub fn from_list<S: AsRef<str>>(root: &str, item: &str, values: &[S]) -> XmlResult<Xml> {
        let xml = Xml::new(root)?;
        for value in values {
            xml.add_text_child(item, value.as_ref())?;
        }
        Ok(xml)
    }

    /// JSON view of this element (see module docs for the mapping)
    pub fn to_json(&self) -> Value {
        let attributes = self.attributes();
        let children = self.children();

        if attributes.is_empty() && children.is_empty() {
            return self.text().map(Value::String).unwrap_or(Value::Null);
        }

        let mut object = Map::new();
        for (name, value) in attributes {
            object.insert(format!("{}{}", ATTRIBUTE_PREFIX, name), Value::String(value));
        }

        for child in children {
            let value = child.to_json();
            match object.get_mut(&child.name()) {
                Some(Value::Array(items)) => items.push(value),
                Some(existing) => {
                    let first = existing.take();
                    *existing = Value::Array(vec![first, value]);
                }
                None => {
                    object.insert(child.name(), value);
                }
            }
        }

        if let Some(text) = self.text().filter(|t| !t.is_empty()) {
            object.insert(TEXT_KEY.to_string(), Value::String(text));
        }

        Value::Object(object)
    }

    /// Build an element named `root` from a JSON value
    pub fn from_json(root: &str, value: &Value) -> XmlResult<Xml> {
        let xml = Xml::new(root)?;
        fill_from_json(&xml, value)?;
        Ok(xml)
    }
}

fn fill_from_json(xml: &Xml, value: &Value) -> XmlResult<()> {
    match value {
        Value::Null => {}
        Value::Object(object) => {
            for (key, value) in object {
                if let Some(attr) = key.strip_prefix(ATTRIBUTE_PREFIX) {
                    if let Some(text) = scalar_text(value) {
                        xml.set_attr(attr, &text)?;
                    }
                } else if key == TEXT_KEY {
                    if let Some(text) = scalar_text(value) {
                        xml.set_text(Some(&text))?;
                    }
                } else {
                    append_json(xml, key, value)?;
                }
            }
        }
        Value::Array(_) => {
            return Err(XmlError::Binding(format!(
                "cannot store an array directly in <{}>",
                xml.name()
            )));
        }
        scalar => {
            xml.set_text(scalar_text(scalar).as_deref())?;
        }
    }
    Ok(())
}

fn append_json(parent: &Xml, name: &str, value: &Value) -> XmlResult<()> {
    match value {
        Value::Null => Ok(()),
        Value::Array(items) => {
            for item in items {
                append_json(parent, name, item)?;
            }
            Ok(())
        }
        other => {
            let child = parent.add_child(name)?;
            fill_from_json(&child, other)
        }
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
