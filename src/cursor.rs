//! Streaming reader
//!
//! [`XmlCursor`] walks a document through libxml2's text reader without
//! building the whole tree. Single elements can still be materialized as
//! [`Xml`] handles when the caller wants to query them.

use std::path::Path;

use libc::c_int;

use crate::config::ParseOptions;
use crate::error::{XmlError, XmlResult};
use crate::libxml2::{self, TextReaderPtr, XmlString};
use crate::xml::Xml;

// xmlReaderTypes
const READER_ELEMENT: c_int = 1;
const READER_TEXT: c_int = 3;
const READER_CDATA: c_int = 4;
const READER_COMMENT: c_int = 8;
const READER_WHITESPACE: c_int = 13;
const READER_SIGNIFICANT_WHITESPACE: c_int = 14;
const READER_END_ELEMENT: c_int = 15;

/// One step of a streamed document
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Start {
        name: String,
        attributes: Vec<(String, String)>,
        depth: usize,
    },
    End {
        name: String,
        depth: usize,
    },
    Text(String),
    CData(String),
    Comment(String),
}

impl Event {
    pub fn is_start(&self, element: &str) -> bool {
        matches!(self, Event::Start { name, .. } if name == element)
    }
}

/// Sequential reader over a document
pub struct XmlCursor {
    reader: TextReaderPtr,
    options: ParseOptions,
    /// The reader sits on a node that has not been reported yet
    positioned: bool,
    /// End event owed for an empty element
    pending_end: Option<Event>,
    finished: bool,
}

impl XmlCursor {
    pub fn from_str(input: &str) -> XmlResult<Self> {
        Self::from_str_with(input, ParseOptions::default())
    }

    pub fn from_str_with(input: &str, options: ParseOptions) -> XmlResult<Self> {
        let reader = TextReaderPtr::for_memory(input.as_bytes().to_vec(), &options)?;
        Ok(Self::new(reader, options))
    }

    pub fn from_file(path: impl AsRef<Path>) -> XmlResult<Self> {
        Self::from_file_with(path, ParseOptions::default())
    }

    pub fn from_file_with(path: impl AsRef<Path>, options: ParseOptions) -> XmlResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(XmlError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        let c_path = libxml2::to_cstring(&path.to_string_lossy())?;
        let reader = TextReaderPtr::for_file(&c_path, &options)?;
        tracing::debug!(path = %path.display(), "opened streaming reader");
        Ok(Self::new(reader, options))
    }

    fn new(reader: TextReaderPtr, options: ParseOptions) -> Self {
        XmlCursor {
            reader,
            options,
            positioned: false,
            pending_end: None,
            finished: false,
        }
    }

    /// Move the reader to the next node; `false` at end of input
    fn advance(&mut self) -> XmlResult<bool> {
        if self.positioned {
            self.positioned = false;
            return Ok(true);
        }
        if self.finished {
            return Ok(false);
        }
        unsafe { libxml2::xmlResetLastError() };
        match unsafe { libxml2::xmlTextReaderRead(self.reader.as_ptr()) } {
            1 => Ok(true),
            0 => {
                self.finished = true;
                Ok(false)
            }
            _ => {
                self.finished = true;
                Err(libxml2::last_parse_error())
            }
        }
    }

    fn node_type(&self) -> c_int {
        unsafe { libxml2::xmlTextReaderNodeType(self.reader.as_ptr()) }
    }

    /// Qualified name of the current node
    pub fn name(&self) -> String {
        unsafe { libxml2::borrowed_string(libxml2::xmlTextReaderConstName(self.reader.as_ptr())) }
            .unwrap_or_default()
    }

    pub fn depth(&self) -> usize {
        let depth = unsafe { libxml2::xmlTextReaderDepth(self.reader.as_ptr()) };
        usize::try_from(depth).unwrap_or(0)
    }

    /// Attribute of the current element
    pub fn attribute(&self, name: &str) -> Option<String> {
        let c_name = libxml2::to_cstring(name).ok()?;
        unsafe {
            XmlString::from_raw(libxml2::xmlTextReaderGetAttribute(
                self.reader.as_ptr(),
                c_name.as_ptr(),
            ))
        }
        .map(|s| s.to_string_lossy())
    }

    fn value(&self) -> String {
        unsafe { libxml2::borrowed_string(libxml2::xmlTextReaderConstValue(self.reader.as_ptr())) }
            .unwrap_or_default()
    }

    fn attributes(&self) -> Vec<(String, String)> {
        let reader = self.reader.as_ptr();
        let mut attributes = Vec::new();
        unsafe {
            while libxml2::xmlTextReaderMoveToNextAttribute(reader) == 1 {
                attributes.push((self.name(), self.value()));
            }
            libxml2::xmlTextReaderMoveToElement(reader);
        }
        attributes
    }

    /// Next event, or `None` at end of input
    pub fn next_event(&mut self) -> XmlResult<Option<Event>> {
        if let Some(end) = self.pending_end.take() {
            return Ok(Some(end));
        }

        while self.advance()? {
            let event = match self.node_type() {
                READER_ELEMENT => {
                    let name = self.name();
                    let depth = self.depth();
                    let empty =
                        unsafe { libxml2::xmlTextReaderIsEmptyElement(self.reader.as_ptr()) } == 1;
                    if empty {
                        self.pending_end = Some(Event::End {
                            name: name.clone(),
                            depth,
                        });
                    }
                    Event::Start {
                        attributes: self.attributes(),
                        name,
                        depth,
                    }
                }
                READER_END_ELEMENT => Event::End {
                    name: self.name(),
                    depth: self.depth(),
                },
                READER_TEXT => {
                    let text = self.value();
                    if text.trim().is_empty() && !self.options.keep_blanks {
                        continue;
                    }
                    Event::Text(text)
                }
                READER_WHITESPACE | READER_SIGNIFICANT_WHITESPACE => {
                    if !self.options.keep_blanks {
                        continue;
                    }
                    Event::Text(self.value())
                }
                READER_CDATA => Event::CData(self.value()),
                READER_COMMENT => Event::Comment(self.value()),
                _ => continue,
            };
            return Ok(Some(event));
        }

        Ok(None)
    }

    /// Advance to the next start tag named `name`; `false` when none is left
    ///
    /// The matching element is not consumed: `read_element` or `next_event`
    /// picks it up.
    pub fn next_element(&mut self, name: &str) -> XmlResult<bool> {
        self.pending_end = None;
        while self.advance()? {
            if self.node_type() == READER_ELEMENT && self.name() == name {
                self.positioned = true;
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Materialize the current element and move past its subtree
    ///
    /// The current element is the one `next_element` stopped on, or the
    /// last `Event::Start` returned by `next_event`.
    pub fn read_element(&mut self) -> XmlResult<Xml> {
        let xml = self.outer_element()?;

        // Skip the subtree; the reader then sits on the following node.
        self.pending_end = None;
        match unsafe { libxml2::xmlTextReaderNext(self.reader.as_ptr()) } {
            1 => self.positioned = true,
            0 => {
                self.positioned = false;
                self.finished = true;
            }
            _ => {
                self.positioned = false;
                self.finished = true;
                return Err(libxml2::last_parse_error());
            }
        }

        Ok(xml)
    }

    /// Materialize the current element without moving; reading continues
    /// inside its subtree
    fn outer_element(&mut self) -> XmlResult<Xml> {
        if self.finished || self.node_type() != READER_ELEMENT {
            return Err(XmlError::Binding(
                "cursor is not positioned on an element".to_string(),
            ));
        }

        let markup = unsafe {
            XmlString::from_raw(libxml2::xmlTextReaderReadOuterXml(self.reader.as_ptr()))
        }
        .map(|s| s.to_string_lossy())
        .ok_or_else(libxml2::last_parse_error)?;

        Xml::parse_with(&markup, &self.options)
    }

    /// Every element named `name`, at any depth, as it is streamed
    ///
    /// Elements nested inside a match are reported too, after the match.
    pub fn elements(self, name: &str) -> Elements {
        Elements {
            cursor: self,
            name: name.to_string(),
            failed: false,
        }
    }
}

impl Iterator for XmlCursor {
    type Item = XmlResult<Event>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_event().transpose()
    }
}

/// Iterator returned by [`XmlCursor::elements`]
pub struct Elements {
    cursor: XmlCursor,
    name: String,
    failed: bool,
}

impl Iterator for Elements {
    type Item = XmlResult<Xml>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        let result = match self.cursor.next_element(&self.name) {
            Ok(true) => {
                self.cursor.positioned = false;
                self.cursor.outer_element()
            }
            Ok(false) => return None,
            Err(e) => Err(e),
        };
        if result.is_err() {
            self.failed = true;
        }
        Some(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FEED: &str = r#"<?xml version="1.0"?>
<feed>
    <!-- items -->
    <item id="1"><title>First</title></item>
    <group>
        <item id="2"><title>Second</title></item>
    </group>
    <flag/>
    <raw><![CDATA[<b>]]></raw>
</feed>"#;

    #[test]
    fn test_event_sequence() {
        let options = ParseOptions {
            keep_blanks: false,
            ..ParseOptions::default()
        };
        let cursor = XmlCursor::from_str_with("<a x=\"1\"><b/>t</a>", options).unwrap();
        let events: Vec<Event> = cursor.collect::<XmlResult<_>>().unwrap();

        assert_eq!(
            events,
            vec![
                Event::Start {
                    name: "a".to_string(),
                    attributes: vec![("x".to_string(), "1".to_string())],
                    depth: 0,
                },
                Event::Start {
                    name: "b".to_string(),
                    attributes: vec![],
                    depth: 1,
                },
                Event::End {
                    name: "b".to_string(),
                    depth: 1,
                },
                Event::Text("t".to_string()),
                Event::End {
                    name: "a".to_string(),
                    depth: 0,
                },
            ]
        );
    }

    #[test]
    fn test_comments_and_cdata() {
        let events: Vec<Event> = XmlCursor::from_str(FEED)
            .unwrap()
            .collect::<XmlResult<_>>()
            .unwrap();
        assert!(events.contains(&Event::Comment(" items ".to_string())));
        assert!(events.contains(&Event::CData("<b>".to_string())));
    }

    #[test]
    fn test_blank_text_is_skipped() {
        let options = ParseOptions {
            keep_blanks: false,
            ..ParseOptions::default()
        };
        let events: Vec<Event> = XmlCursor::from_str_with(FEED, options)
            .unwrap()
            .collect::<XmlResult<_>>()
            .unwrap();
        assert!(
            events
                .iter()
                .all(|e| !matches!(e, Event::Text(t) if t.trim().is_empty()))
        );
    }

    #[test]
    fn test_elements_at_any_depth() {
        let items: Vec<Xml> = XmlCursor::from_str(FEED)
            .unwrap()
            .elements("item")
            .collect::<XmlResult<_>>()
            .unwrap();

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].attr("id").as_deref(), Some("1"));
        assert_eq!(items[1].query_text("title").unwrap().as_deref(), Some("Second"));
    }

    #[test]
    fn test_next_element_then_events() {
        let mut cursor = XmlCursor::from_str(FEED).unwrap();
        assert!(cursor.next_element("group").unwrap());
        assert_eq!(cursor.depth(), 1);

        let event = cursor.next_event().unwrap().unwrap();
        assert!(event.is_start("group"));

        assert!(cursor.next_element("item").unwrap());
        assert_eq!(cursor.attribute("id").as_deref(), Some("2"));
        let item = cursor.read_element().unwrap();
        assert_eq!(item.child("title").unwrap().text().as_deref(), Some("Second"));

        assert!(!cursor.next_element("item").unwrap());
    }

    #[test]
    fn test_blank_text_is_kept() {
        let events: Vec<Event> = XmlCursor::from_str("<a>\n  <b/>\n</a>")
            .unwrap()
            .collect::<XmlResult<_>>()
            .unwrap();

        assert_eq!(
            events,
            vec![
                Event::Start {
                    name: "a".to_string(),
                    attributes: vec![],
                    depth: 0,
                },
                Event::Text("\n  ".to_string()),
                Event::Start {
                    name: "b".to_string(),
                    attributes: vec![],
                    depth: 1,
                },
                Event::End {
                    name: "b".to_string(),
                    depth: 1,
                },
                Event::Text("\n".to_string()),
                Event::End {
                    name: "a".to_string(),
                    depth: 0,
                },
            ]
        );
    }

    #[test]
    fn test_nested_elements_with_same_name() {
        let input = r#"<r><item id="1"><item id="2"><item id="3"/></item></item><item id="4"/></r>"#;
        let items: Vec<Xml> = XmlCursor::from_str(input)
            .unwrap()
            .elements("item")
            .collect::<XmlResult<_>>()
            .unwrap();

        let ids: Vec<String> = items.iter().filter_map(|item| item.attr("id")).collect();
        assert_eq!(ids, vec!["1", "2", "3", "4"]);
        assert_eq!(items[0].count(".//item").unwrap(), 2);
    }

    #[test]
    fn test_read_element_after_start_event() {
        let mut cursor = XmlCursor::from_str(FEED).unwrap();
        let event = loop {
            match cursor.next_event().unwrap() {
                Some(event) if event.is_start("group") => break event,
                Some(_) => continue,
                None => panic!("group not found"),
            }
        };
        assert!(event.is_start("group"));

        let group = cursor.read_element().unwrap();
        assert_eq!(group.name(), "group");
        assert_eq!(group.query_text("item/title").unwrap().as_deref(), Some("Second"));

        let mut rest = Vec::new();
        while let Some(event) = cursor.next_event().unwrap() {
            if let Event::Start { name, .. } = event {
                rest.push(name);
            }
        }
        assert_eq!(rest, vec!["flag", "raw"]);
    }

    #[test]
    fn test_read_element_rejects_end_tag() {
        let mut cursor = XmlCursor::from_str("<a><b>x</b></a>").unwrap();
        while let Some(event) = cursor.next_event().unwrap() {
            if matches!(&event, Event::End { name, .. } if name == "b") {
                break;
            }
        }
        assert!(matches!(cursor.read_element(), Err(XmlError::Binding(_))));
    }

    #[test]
    fn test_read_element_requires_position() {
        let mut cursor = XmlCursor::from_str(FEED).unwrap();
        assert!(matches!(cursor.read_element(), Err(XmlError::Binding(_))));
    }

    #[test]
    fn test_malformed_input() {
        let results: Vec<XmlResult<Event>> = XmlCursor::from_str("<a><b></a>").unwrap().collect();
        assert!(results.iter().any(|r| matches!(r, Err(XmlError::Parse { .. }))));
    }
}
