//! Object binding
//!
//! Plain types describe their XML shape through serde: [`Xml::to_object`]
//! drives a deserializer over the element tree and [`Xml::from_object`]
//! serializes through the JSON mapping in [`crate::convert`]. Types that need
//! full control implement [`XmlBean`] instead.
//!
//! Binding rules:
//! - attributes are visible as `@name` and, unless a child element has the
//!   same name, as plain `name`
//! - leaf text is parsed on demand into the requested primitive
//! - child elements feed sequences one item per element, so a single element
//!   feeds a one-element sequence; an attribute feeds a whitespace-split list
//! - enums read unit variants from text, other variants from a single child

use std::fmt::Display;
use std::str::FromStr;

use serde::de::value::{SeqDeserializer, StringDeserializer};
use serde::de::{
    self, DeserializeOwned, DeserializeSeed, Deserializer, EnumAccess, IntoDeserializer, MapAccess,
    SeqAccess, VariantAccess, Visitor,
};
use serde::{Serialize, forward_to_deserialize_any};

use crate::convert::{ATTRIBUTE_PREFIX, TEXT_KEY};
use crate::error::{XmlError, XmlResult};
use crate::xml::Xml;

impl de::Error for XmlError {
    fn custom<T: Display>(msg: T) -> Self {
        XmlError::Binding(msg.to_string())
    }
}

/// Types that read and write their own XML representation
pub trait XmlBean {
    /// Populate `self` from an element
    fn read_xml(&mut self, xml: &Xml) -> XmlResult<()>;

    /// Write `self` into an (empty) element
    fn write_xml(&self, xml: &Xml) -> XmlResult<()>;
}

/// Create a bean from its defaults, then populate it from `xml`
pub fn load_bean<T: XmlBean + Default>(xml: &Xml) -> XmlResult<T> {
    let mut bean = T::default();
    bean.read_xml(xml)?;
    Ok(bean)
}

/// Write a bean into a fresh element named `root`
pub fn store_bean<T: XmlBean>(root: &str, bean: &T) -> XmlResult<Xml> {
    let xml = Xml::new(root)?;
    bean.write_xml(&xml)?;
    Ok(xml)
}

impl Xml {
    /// Deserialize this element into `T`
    pub fn to_object<T: DeserializeOwned>(&self) -> XmlResult<T> {
        T::deserialize(ElementDeserializer { xml: self.clone() })
    }

    /// Deserialize every child element into `T`
    pub fn to_objects<T: DeserializeOwned>(&self) -> XmlResult<Vec<T>> {
        self.children().iter().map(Xml::to_object).collect()
    }

    /// Serialize `value` into a new element named `root`
    pub fn from_object<T: Serialize>(root: &str, value: &T) -> XmlResult<Xml> {
        let json = serde_json::to_value(value).map_err(|e| XmlError::Binding(e.to_string()))?;
        Xml::from_json(root, &json)
    }
}

/// Text of a leaf element or attribute
struct TextDeserializer {
    text: Option<String>,
    path: String,
}

impl TextDeserializer {
    fn raw(&self) -> &str {
        self.text.as_deref().unwrap_or("").trim()
    }

    fn parse<T>(&self) -> XmlResult<T>
    where
        T: FromStr,
        T::Err: Display,
    {
        let raw = self.raw();
        raw.parse().map_err(|e: T::Err| XmlError::InvalidValue {
            path: self.path.clone(),
            value: raw.to_string(),
            reason: e.to_string(),
        })
    }

    fn parse_bool(&self) -> XmlResult<bool> {
        match self.raw() {
            "true" | "1" => Ok(true),
            "false" | "0" => Ok(false),
            other => Err(XmlError::InvalidValue {
                path: self.path.clone(),
                value: other.to_string(),
                reason: "expected true, false, 1 or 0".to_string(),
            }),
        }
    }

    fn into_string(self) -> String {
        self.text.unwrap_or_default()
    }
}

impl<'de> IntoDeserializer<'de, XmlError> for TextDeserializer {
    type Deserializer = Self;

    fn into_deserializer(self) -> Self {
        self
    }
}

macro_rules! deserialize_parsed {
    ($($method:ident => $visit:ident,)*) => {
        $(
            fn $method<V: Visitor<'de>>(self, visitor: V) -> XmlResult<V::Value> {
                visitor.$visit(self.parse()?)
            }
        )*
    };
}

impl<'de> Deserializer<'de> for TextDeserializer {
    type Error = XmlError;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> XmlResult<V::Value> {
        match self.text {
            Some(text) => visitor.visit_string(text),
            None => visitor.visit_unit(),
        }
    }

    fn deserialize_bool<V: Visitor<'de>>(self, visitor: V) -> XmlResult<V::Value> {
        visitor.visit_bool(self.parse_bool()?)
    }

    deserialize_parsed! {
        deserialize_i8 => visit_i8,
        deserialize_i16 => visit_i16,
        deserialize_i32 => visit_i32,
        deserialize_i64 => visit_i64,
        deserialize_i128 => visit_i128,
        deserialize_u8 => visit_u8,
        deserialize_u16 => visit_u16,
        deserialize_u32 => visit_u32,
        deserialize_u64 => visit_u64,
        deserialize_u128 => visit_u128,
        deserialize_f32 => visit_f32,
        deserialize_f64 => visit_f64,
        deserialize_char => visit_char,
    }

    fn deserialize_str<V: Visitor<'de>>(self, visitor: V) -> XmlResult<V::Value> {
        visitor.visit_string(self.into_string())
    }

    fn deserialize_string<V: Visitor<'de>>(self, visitor: V) -> XmlResult<V::Value> {
        visitor.visit_string(self.into_string())
    }

    fn deserialize_identifier<V: Visitor<'de>>(self, visitor: V) -> XmlResult<V::Value> {
        visitor.visit_string(self.into_string())
    }

    fn deserialize_bytes<V: Visitor<'de>>(self, visitor: V) -> XmlResult<V::Value> {
        visitor.visit_byte_buf(self.into_string().into_bytes())
    }

    fn deserialize_byte_buf<V: Visitor<'de>>(self, visitor: V) -> XmlResult<V::Value> {
        visitor.visit_byte_buf(self.into_string().into_bytes())
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> XmlResult<V::Value> {
        match self.text {
            None => visitor.visit_none(),
            Some(_) => visitor.visit_some(self),
        }
    }

    fn deserialize_unit<V: Visitor<'de>>(self, visitor: V) -> XmlResult<V::Value> {
        visitor.visit_unit()
    }

    fn deserialize_unit_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> XmlResult<V::Value> {
        visitor.visit_unit()
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> XmlResult<V::Value> {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_seq<V: Visitor<'de>>(self, visitor: V) -> XmlResult<V::Value> {
        let path = self.path.clone();
        let items: Vec<TextDeserializer> = self
            .raw()
            .split_whitespace()
            .map(|item| TextDeserializer {
                text: Some(item.to_string()),
                path: path.clone(),
            })
            .collect();
        SeqDeserializer::<_, XmlError>::new(items.into_iter()).deserialize_any(visitor)
    }

    fn deserialize_tuple<V: Visitor<'de>>(self, _len: usize, visitor: V) -> XmlResult<V::Value> {
        self.deserialize_seq(visitor)
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _variants: &'static [&'static str],
        visitor: V,
    ) -> XmlResult<V::Value> {
        let variant: StringDeserializer<XmlError> = self.raw().to_string().into_deserializer();
        visitor.visit_enum(variant)
    }

    fn deserialize_ignored_any<V: Visitor<'de>>(self, visitor: V) -> XmlResult<V::Value> {
        visitor.visit_unit()
    }

    forward_to_deserialize_any! {
        tuple_struct map struct
    }
}

/// One element
struct ElementDeserializer {
    xml: Xml,
}

impl ElementDeserializer {
    fn is_leaf(&self) -> bool {
        !self.xml.has_children() && self.xml.attributes().is_empty()
    }

    fn text(&self) -> TextDeserializer {
        TextDeserializer {
            text: self.xml.text(),
            path: self.xml.path(),
        }
    }
}

macro_rules! forward_to_text {
    ($($method:ident)*) => {
        $(
            fn $method<V: Visitor<'de>>(self, visitor: V) -> XmlResult<V::Value> {
                self.text().$method(visitor)
            }
        )*
    };
}

impl<'de> Deserializer<'de> for ElementDeserializer {
    type Error = XmlError;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> XmlResult<V::Value> {
        if self.is_leaf() {
            self.text().deserialize_any(visitor)
        } else {
            self.deserialize_map(visitor)
        }
    }

    forward_to_text! {
        deserialize_bool deserialize_i8 deserialize_i16 deserialize_i32 deserialize_i64
        deserialize_i128 deserialize_u8 deserialize_u16 deserialize_u32 deserialize_u64
        deserialize_u128 deserialize_f32 deserialize_f64 deserialize_char deserialize_str
        deserialize_string deserialize_bytes deserialize_byte_buf deserialize_identifier
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> XmlResult<V::Value> {
        if self.is_leaf() && self.xml.text().is_none() {
            visitor.visit_none()
        } else {
            visitor.visit_some(self)
        }
    }

    fn deserialize_unit<V: Visitor<'de>>(self, visitor: V) -> XmlResult<V::Value> {
        visitor.visit_unit()
    }

    fn deserialize_unit_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> XmlResult<V::Value> {
        visitor.visit_unit()
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> XmlResult<V::Value> {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_seq<V: Visitor<'de>>(self, visitor: V) -> XmlResult<V::Value> {
        visitor.visit_seq(ElementSeq {
            elements: vec![self.xml].into_iter(),
        })
    }

    fn deserialize_tuple<V: Visitor<'de>>(self, _len: usize, visitor: V) -> XmlResult<V::Value> {
        self.deserialize_seq(visitor)
    }

    fn deserialize_tuple_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _len: usize,
        visitor: V,
    ) -> XmlResult<V::Value> {
        self.deserialize_seq(visitor)
    }

    fn deserialize_map<V: Visitor<'de>>(self, visitor: V) -> XmlResult<V::Value> {
        visitor.visit_map(ElementMap::new(&self.xml))
    }

    fn deserialize_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _fields: &'static [&'static str],
        visitor: V,
    ) -> XmlResult<V::Value> {
        self.deserialize_map(visitor)
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        name: &'static str,
        variants: &'static [&'static str],
        visitor: V,
    ) -> XmlResult<V::Value> {
        if self.is_leaf() {
            return self.text().deserialize_enum(name, variants, visitor);
        }
        match self.xml.children().as_slice() {
            [variant] => visitor.visit_enum(ElementEnum {
                xml: variant.clone(),
            }),
            _ => Err(XmlError::Binding(format!(
                "{}: expected exactly one child element naming a variant of {}",
                self.xml.path(),
                name
            ))),
        }
    }

    fn deserialize_ignored_any<V: Visitor<'de>>(self, visitor: V) -> XmlResult<V::Value> {
        visitor.visit_unit()
    }
}

/// Every child element sharing one name
struct ElementsDeserializer {
    elements: Vec<Xml>,
}

impl ElementsDeserializer {
    fn single(self) -> XmlResult<ElementDeserializer> {
        match <[Xml; 1]>::try_from(self.elements) {
            Ok([xml]) => Ok(ElementDeserializer { xml }),
            Err(elements) => Err(XmlError::Binding(format!(
                "expected a single <{}> element, found {}",
                elements.first().map(Xml::name).unwrap_or_default(),
                elements.len()
            ))),
        }
    }
}

macro_rules! forward_to_single {
    ($($method:ident)*) => {
        $(
            fn $method<V: Visitor<'de>>(self, visitor: V) -> XmlResult<V::Value> {
                self.single()?.$method(visitor)
            }
        )*
    };
}

impl<'de> Deserializer<'de> for ElementsDeserializer {
    type Error = XmlError;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> XmlResult<V::Value> {
        if self.elements.len() == 1 {
            self.single()?.deserialize_any(visitor)
        } else {
            self.deserialize_seq(visitor)
        }
    }

    forward_to_single! {
        deserialize_bool deserialize_i8 deserialize_i16 deserialize_i32 deserialize_i64
        deserialize_i128 deserialize_u8 deserialize_u16 deserialize_u32 deserialize_u64
        deserialize_u128 deserialize_f32 deserialize_f64 deserialize_char deserialize_str
        deserialize_string deserialize_bytes deserialize_byte_buf deserialize_identifier
        deserialize_unit deserialize_map deserialize_ignored_any
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> XmlResult<V::Value> {
        if self.elements.len() == 1 {
            self.single()?.deserialize_option(visitor)
        } else {
            visitor.visit_some(self)
        }
    }

    fn deserialize_unit_struct<V: Visitor<'de>>(
        self,
        name: &'static str,
        visitor: V,
    ) -> XmlResult<V::Value> {
        self.single()?.deserialize_unit_struct(name, visitor)
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        name: &'static str,
        visitor: V,
    ) -> XmlResult<V::Value> {
        if self.elements.len() == 1 {
            self.single()?.deserialize_newtype_struct(name, visitor)
        } else {
            visitor.visit_newtype_struct(self)
        }
    }

    fn deserialize_seq<V: Visitor<'de>>(self, visitor: V) -> XmlResult<V::Value> {
        if self.elements.len() == 1 {
            return self.single()?.deserialize_seq(visitor);
        }
        visitor.visit_seq(ElementSeq {
            elements: self.elements.into_iter(),
        })
    }

    fn deserialize_tuple<V: Visitor<'de>>(self, _len: usize, visitor: V) -> XmlResult<V::Value> {
        self.deserialize_seq(visitor)
    }

    fn deserialize_tuple_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _len: usize,
        visitor: V,
    ) -> XmlResult<V::Value> {
        self.deserialize_seq(visitor)
    }

    fn deserialize_struct<V: Visitor<'de>>(
        self,
        name: &'static str,
        fields: &'static [&'static str],
        visitor: V,
    ) -> XmlResult<V::Value> {
        self.single()?.deserialize_struct(name, fields, visitor)
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        name: &'static str,
        variants: &'static [&'static str],
        visitor: V,
    ) -> XmlResult<V::Value> {
        self.single()?.deserialize_enum(name, variants, visitor)
    }
}

struct ElementSeq {
    elements: std::vec::IntoIter<Xml>,
}

impl<'de> SeqAccess<'de> for ElementSeq {
    type Error = XmlError;

    fn next_element_seed<T: DeserializeSeed<'de>>(
        &mut self,
        seed: T,
    ) -> XmlResult<Option<T::Value>> {
        match self.elements.next() {
            Some(xml) => seed.deserialize(ElementDeserializer { xml }).map(Some),
            None => Ok(None),
        }
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.elements.len())
    }
}

enum Entry {
    Text(String),
    Elements(Vec<Xml>),
}

struct ElementMap {
    entries: std::vec::IntoIter<(String, Entry)>,
    value: Option<Entry>,
    path: String,
}

impl ElementMap {
    fn new(xml: &Xml) -> Self {
        let mut groups: Vec<(String, Vec<Xml>)> = Vec::new();
        for child in xml.children() {
            let name = child.name();
            match groups.iter_mut().find(|(n, _)| *n == name) {
                Some((_, elements)) => elements.push(child),
                None => groups.push((name, vec![child])),
            }
        }

        let mut entries: Vec<(String, Entry)> = Vec::new();
        for (name, value) in xml.attributes() {
            entries.push((
                format!("{}{}", ATTRIBUTE_PREFIX, name),
                Entry::Text(value.clone()),
            ));
            if !groups.iter().any(|(n, _)| *n == name) {
                entries.push((name, Entry::Text(value)));
            }
        }
        if let Some(text) = xml.text().filter(|t| !t.is_empty()) {
            entries.push((TEXT_KEY.to_string(), Entry::Text(text)));
        }
        entries.extend(
            groups
                .into_iter()
                .map(|(name, elements)| (name, Entry::Elements(elements))),
        );

        ElementMap {
            entries: entries.into_iter(),
            value: None,
            path: xml.path(),
        }
    }
}

impl<'de> MapAccess<'de> for ElementMap {
    type Error = XmlError;

    fn next_key_seed<K: DeserializeSeed<'de>>(&mut self, seed: K) -> XmlResult<Option<K::Value>> {
        match self.entries.next() {
            Some((key, value)) => {
                self.value = Some(value);
                let key: StringDeserializer<XmlError> = key.into_deserializer();
                seed.deserialize(key).map(Some)
            }
            None => Ok(None),
        }
    }

    fn next_value_seed<V: DeserializeSeed<'de>>(&mut self, seed: V) -> XmlResult<V::Value> {
        match self.value.take() {
            Some(Entry::Text(text)) => seed.deserialize(TextDeserializer {
                text: Some(text),
                path: self.path.clone(),
            }),
            Some(Entry::Elements(elements)) => seed.deserialize(ElementsDeserializer { elements }),
            None => Err(XmlError::Binding(
                "map value requested before its key".to_string(),
            )),
        }
    }
}

struct ElementEnum {
    xml: Xml,
}

impl<'de> EnumAccess<'de> for ElementEnum {
    type Error = XmlError;
    type Variant = ElementDeserializer;

    fn variant_seed<V: DeserializeSeed<'de>>(
        self,
        seed: V,
    ) -> XmlResult<(V::Value, Self::Variant)> {
        let name: StringDeserializer<XmlError> = self.xml.name().into_deserializer();
        let variant = seed.deserialize(name)?;
        Ok((variant, ElementDeserializer { xml: self.xml }))
    }
}

impl<'de> VariantAccess<'de> for ElementDeserializer {
    type Error = XmlError;

    fn unit_variant(self) -> XmlResult<()> {
        Ok(())
    }

    fn newtype_variant_seed<T: DeserializeSeed<'de>>(self, seed: T) -> XmlResult<T::Value> {
        seed.deserialize(self)
    }

    fn tuple_variant<V: Visitor<'de>>(self, _len: usize, visitor: V) -> XmlResult<V::Value> {
        visitor.visit_seq(ElementSeq {
            elements: self.xml.children().into_iter(),
        })
    }

    fn struct_variant<V: Visitor<'de>>(
        self,
        _fields: &'static [&'static str],
        visitor: V,
    ) -> XmlResult<V::Value> {
        self.deserialize_map(visitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, Serialize, PartialEq)]
    struct Server {
        #[serde(rename = "@name")]
        name: String,
        host: String,
        port: u16,
        secure: bool,
        #[serde(default)]
        aliases: Vec<String>,
        timeout: Option<f64>,
    }

    #[derive(Debug, Deserialize, PartialEq)]
    #[serde(rename_all = "lowercase")]
    enum Mode {
        Active,
        Passive,
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct Settings {
        mode: Mode,
        server: Vec<Server>,
        level: u8,
    }

    #[test]
    fn test_to_object() {
        let xml = Xml::parse(
            r#"<server name="main">
                <host>example.org</host>
                <port> 443 </port>
                <secure>true</secure>
                <aliases>www</aliases>
                <aliases>api</aliases>
            </server>"#,
        )
        .unwrap();

        let server: Server = xml.to_object().unwrap();
        assert_eq!(
            server,
            Server {
                name: "main".to_string(),
                host: "example.org".to_string(),
                port: 443,
                secure: true,
                aliases: vec!["www".to_string(), "api".to_string()],
                timeout: None,
            }
        );
    }

    #[test]
    fn test_single_element_feeds_sequence() {
        let xml = Xml::parse(
            r#"<settings level="3">
                <mode>passive</mode>
                <server name="only"><host>h</host><port>1</port><secure>0</secure></server>
            </settings>"#,
        )
        .unwrap();

        let settings: Settings = xml.to_object().unwrap();
        assert_eq!(settings.mode, Mode::Passive);
        assert_eq!(settings.level, 3);
        assert_eq!(settings.server.len(), 1);
        assert!(!settings.server[0].secure);
        assert!(settings.server[0].aliases.is_empty());
    }

    #[test]
    fn test_attribute_list() {
        #[derive(Debug, Deserialize)]
        struct Tagged {
            tags: Vec<u32>,
        }

        let xml = Xml::parse(r#"<t tags="1 2  3"/>"#).unwrap();
        let tagged: Tagged = xml.to_object().unwrap();
        assert_eq!(tagged.tags, vec![1, 2, 3]);
    }

    #[derive(Debug, Deserialize, Serialize, PartialEq)]
    struct City {
        names: Vec<String>,
    }

    #[test]
    fn test_single_leaf_is_one_sequence_item() {
        let xml = Xml::parse("<c><names>New York</names></c>").unwrap();
        let city: City = xml.to_object().unwrap();
        assert_eq!(city.names, vec!["New York"]);

        let xml = Xml::parse("<c><names>New York</names><names>Rome</names></c>").unwrap();
        let city: City = xml.to_object().unwrap();
        assert_eq!(city.names, vec!["New York", "Rome"]);
    }

    #[test]
    fn test_sequence_round_trip_keeps_items_whole() {
        for names in [vec!["New York"], vec![""], vec!["a b", "", "c"]] {
            let city = City {
                names: names.iter().map(|n| n.to_string()).collect(),
            };
            let xml = Xml::from_object("c", &city).unwrap();
            let back: City = xml.to_object().unwrap();
            assert_eq!(back, city);
        }
    }

    #[test]
    fn test_invalid_value_reports_path() {
        let xml = Xml::parse(
            "<server name=\"x\"><host>h</host><port>http</port><secure>true</secure></server>",
        )
        .unwrap();

        match xml.to_object::<Server>() {
            Err(XmlError::InvalidValue { path, value, .. }) => {
                assert_eq!(path, "/server/port");
                assert_eq!(value, "http");
            }
            other => panic!("Expected XmlError::InvalidValue, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_field() {
        let xml = Xml::parse("<server name=\"x\"><host>h</host></server>").unwrap();
        match xml.to_object::<Server>() {
            Err(XmlError::Binding(message)) => assert!(message.contains("port")),
            other => panic!("Expected XmlError::Binding, got {:?}", other),
        }
    }

    #[test]
    fn test_to_objects() {
        let xml = Xml::parse("<ports><p>1</p><p>2</p><p>3</p></ports>").unwrap();
        let ports: Vec<u16> = xml.to_objects().unwrap();
        assert_eq!(ports, vec![1, 2, 3]);
    }

    #[test]
    fn test_from_object_round_trip() {
        let server = Server {
            name: "edge".to_string(),
            host: "10.0.0.1".to_string(),
            port: 8443,
            secure: false,
            aliases: vec!["a".to_string(), "b".to_string()],
            timeout: Some(2.5),
        };

        let xml = Xml::from_object("server", &server).unwrap();
        assert_eq!(xml.attr("name").as_deref(), Some("edge"));
        assert_eq!(xml.list("aliases").unwrap(), vec!["a", "b"]);

        let back: Server = xml.to_object().unwrap();
        assert_eq!(back, server);
    }

    #[derive(Default)]
    struct Endpoint {
        url: String,
        retries: u32,
    }

    impl XmlBean for Endpoint {
        fn read_xml(&mut self, xml: &Xml) -> XmlResult<()> {
            self.url = xml.attr("url").unwrap_or_default();
            self.retries = xml.value_or("retries", self.retries)?;
            Ok(())
        }

        fn write_xml(&self, xml: &Xml) -> XmlResult<()> {
            xml.set_attr("url", &self.url)?;
            xml.add_text_child("retries", &self.retries.to_string())?;
            Ok(())
        }
    }

    #[test]
    fn test_xml_bean() {
        let xml = Xml::parse(r#"<endpoint url="http://x"><retries>4</retries></endpoint>"#)
            .unwrap();
        let endpoint: Endpoint = load_bean(&xml).unwrap();
        assert_eq!(endpoint.url, "http://x");
        assert_eq!(endpoint.retries, 4);

        let stored = store_bean("endpoint", &endpoint).unwrap();
        assert_eq!(
            stored.to_string(),
            r#"<endpoint url="http://x"><retries>4</retries></endpoint>"#
        );
    }
}
