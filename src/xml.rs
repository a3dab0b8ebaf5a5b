//! Document wrapper
//!
//! [`Xml`] is a handle to one element of a libxml2 document. Handles are cheap
//! to clone and share the document they came from; the document is freed when
//! the last handle goes away. An absent node is simply `None`.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::ptr::NonNull;
use std::rc::Rc;
use std::str::FromStr;

use crate::config::{FormatOptions, ParseOptions};
use crate::error::{XmlError, XmlResult};
use crate::format;
use crate::libxml2::{
    self, DocumentPtr, ELEMENT_NODE, TEXT_NODE, CDATA_SECTION_NODE, XPATH_BOOLEAN, XPATH_NODESET,
    XPATH_NUMBER, XPATH_STRING, XPathContextPtr, XPathObjectPtr, XmlNode, XmlString,
};

struct Document {
    ptr: DocumentPtr,
    namespaces: RefCell<BTreeMap<String, String>>,
}

/// Handle to one element of a shared document
#[derive(Clone)]
pub struct Xml {
    doc: Rc<Document>,
    node: NonNull<XmlNode>,
}

impl Xml {
    /// Parse a document and return its root element
    pub fn parse(input: &str) -> XmlResult<Xml> {
        Self::parse_with(input, &ParseOptions::default())
    }

    pub fn parse_with(input: &str, options: &ParseOptions) -> XmlResult<Xml> {
        let ptr = DocumentPtr::parse_memory(input.as_bytes(), options)?;
        tracing::debug!(bytes = input.len(), "parsed XML document");
        Self::from_document(ptr)
    }

    /// Load a document from disk and return its root element
    pub fn from_file(path: impl AsRef<Path>) -> XmlResult<Xml> {
        Self::from_file_with(path, &ParseOptions::default())
    }

    pub fn from_file_with(path: impl AsRef<Path>, options: &ParseOptions) -> XmlResult<Xml> {
        let path = path.as_ref();
        let ptr = DocumentPtr::parse_file(path, options)?;
        tracing::debug!(path = %path.display(), "loaded XML document");
        Self::from_document(ptr)
    }

    /// Start a new document with an empty root element
    pub fn new(root: &str) -> XmlResult<Xml> {
        let name = checked_name(root)?;
        let (ptr, node) = DocumentPtr::with_root(&name)?;
        Ok(Xml {
            doc: Rc::new(Document {
                ptr,
                namespaces: RefCell::new(BTreeMap::new()),
            }),
            node,
        })
    }

    fn from_document(ptr: DocumentPtr) -> XmlResult<Xml> {
        let node = ptr.root().ok_or_else(|| XmlError::Parse {
            message: "document has no root element".to_string(),
            line: 0,
        })?;
        Ok(Xml {
            doc: Rc::new(Document {
                ptr,
                namespaces: RefCell::new(BTreeMap::new()),
            }),
            node,
        })
    }

    fn wrap(&self, node: NonNull<XmlNode>) -> Xml {
        Xml {
            doc: Rc::clone(&self.doc),
            node,
        }
    }

    /// Run `f` with the raw owning document
    pub(crate) fn with_document_ptr<T>(&self, f: impl FnOnce(*mut libxml2::XmlDoc) -> T) -> T {
        f(self.doc.ptr.as_ptr())
    }

    fn raw(&self) -> &XmlNode {
        // Nodes stay allocated for as long as the document lives.
        unsafe { self.node.as_ref() }
    }

    /// Qualified element name (`prefix:local` when the element has a prefix)
    pub fn name(&self) -> String {
        let local = self.local_name();
        let ns = self.raw().ns;
        if ns.is_null() {
            return local;
        }
        match unsafe { libxml2::borrowed_string((*ns).prefix) } {
            Some(prefix) => format!("{}:{}", prefix, local),
            None => local,
        }
    }

    pub fn local_name(&self) -> String {
        unsafe { libxml2::borrowed_string(self.raw().name) }.unwrap_or_default()
    }

    /// Namespace URI of the element
    pub fn namespace(&self) -> Option<String> {
        let ns = self.raw().ns;
        if ns.is_null() {
            None
        } else {
            unsafe { libxml2::borrowed_string((*ns).href) }
        }
    }

    /// Source line of the element, when it was parsed
    pub fn line(&self) -> Option<u32> {
        Some(u32::from(self.raw().line)).filter(|line| *line > 0)
    }

    /// Absolute XPath of the element, e.g. `/config/server[2]`
    pub fn path(&self) -> String {
        unsafe { XmlString::from_raw(libxml2::xmlGetNodePath(self.node.as_ptr())) }
            .map(|s| s.to_string_lossy())
            .unwrap_or_default()
    }

    pub fn parent(&self) -> Option<Xml> {
        let parent = self.raw().parent;
        NonNull::new(parent)
            .filter(|p| unsafe { p.as_ref() }.node_type == ELEMENT_NODE)
            .map(|p| self.wrap(p))
    }

    /// Root element of the owning document
    pub fn root(&self) -> Xml {
        let node = self.doc.ptr.root().unwrap_or(self.node);
        self.wrap(node)
    }

    /// Whether both handles point at the same element
    pub fn same_node(&self, other: &Xml) -> bool {
        self.node == other.node
    }

    /// Child elements in document order
    pub fn children(&self) -> Vec<Xml> {
        let mut result = Vec::new();
        let mut child = self.raw().children;
        while let Some(node) = NonNull::new(child) {
            let raw = unsafe { node.as_ref() };
            if raw.node_type == ELEMENT_NODE {
                result.push(self.wrap(node));
            }
            child = raw.next;
        }
        result
    }

    /// First child element with the given name
    pub fn child(&self, name: &str) -> Option<Xml> {
        self.children().into_iter().find(|c| c.name() == name)
    }

    pub fn children_named(&self, name: &str) -> Vec<Xml> {
        self.children()
            .into_iter()
            .filter(|c| c.name() == name)
            .collect()
    }

    pub fn has_children(&self) -> bool {
        !self.children().is_empty()
    }

    pub fn attr(&self, name: &str) -> Option<String> {
        let name = libxml2::to_cstring(name).ok()?;
        unsafe { XmlString::from_raw(libxml2::xmlGetProp(self.node.as_ptr(), name.as_ptr())) }
            .map(|s| s.to_string_lossy())
    }

    pub fn has_attr(&self, name: &str) -> bool {
        match libxml2::to_cstring(name) {
            Ok(name) => !unsafe { libxml2::xmlHasProp(self.node.as_ptr(), name.as_ptr()) }
                .is_null(),
            Err(_) => false,
        }
    }

    /// All attributes, keyed by name
    pub fn attributes(&self) -> BTreeMap<String, String> {
        let mut result = BTreeMap::new();
        let mut attr = self.raw().properties;
        while !attr.is_null() {
            let raw = unsafe { &*attr };
            if let Some(name) = unsafe { libxml2::borrowed_string(raw.name) } {
                let value = self.attr(&name).unwrap_or_default();
                result.insert(name, value);
            }
            attr = raw.next;
        }
        result
    }

    /// Text of the element
    ///
    /// `None` when the element has no text at all, `Some("")` when the text
    /// is only whitespace, otherwise the direct text trimmed.
    pub fn text(&self) -> Option<String> {
        let mut found = false;
        let mut text = String::new();
        let mut child = self.raw().children;
        while let Some(node) = NonNull::new(child) {
            let raw = unsafe { node.as_ref() };
            if raw.node_type == TEXT_NODE || raw.node_type == CDATA_SECTION_NODE {
                found = true;
                if let Some(content) = unsafe { libxml2::borrowed_string(raw.content) } {
                    text.push_str(&content);
                }
            }
            child = raw.next;
        }

        if found {
            Some(text.trim().to_string())
        } else {
            None
        }
    }

    pub fn text_or_empty(&self) -> String {
        self.text().unwrap_or_default()
    }

    /// Concatenated text of the element and all its descendants
    pub fn deep_text(&self) -> String {
        unsafe { XmlString::from_raw(libxml2::xmlNodeGetContent(self.node.as_ptr())) }
            .map(|s| s.to_string_lossy())
            .unwrap_or_default()
    }

    /// Bind a namespace prefix for later queries on this document
    pub fn with_namespace(self, prefix: &str, uri: &str) -> Xml {
        self.doc
            .namespaces
            .borrow_mut()
            .insert(prefix.to_string(), uri.to_string());
        self
    }

    fn evaluate(&self, expr: &str) -> XmlResult<XPathObjectPtr> {
        let c_expr = libxml2::to_cstring(expr)?;
        let ctxt = XPathContextPtr::new(self.doc.ptr.as_ptr())?;
        for (prefix, uri) in self.doc.namespaces.borrow().iter() {
            ctxt.register_namespace(prefix, uri)?;
        }

        ctxt.eval(self.node, &c_expr).ok_or_else(|| XmlError::XPath {
            expression: expr.to_string(),
            reason: libxml2::last_error_message()
                .unwrap_or_else(|| "invalid expression".to_string()),
        })
    }

    /// Elements matched by an XPath expression, relative to this element
    pub fn query(&self, expr: &str) -> XmlResult<Vec<Xml>> {
        let result = self.evaluate(expr)?;
        let matches: Vec<Xml> = result
            .nodes()
            .into_iter()
            .filter(|n| unsafe { n.as_ref() }.node_type == ELEMENT_NODE)
            .map(|n| self.wrap(n))
            .collect();
        tracing::debug!(expression = expr, matches = matches.len(), "evaluated XPath");
        Ok(matches)
    }

    pub fn query_one(&self, expr: &str) -> XmlResult<Option<Xml>> {
        Ok(self.query(expr)?.into_iter().next())
    }

    /// String value of an XPath result, trimmed; `None` for an empty node-set
    ///
    /// Trimming applies to every result kind, so `string(' x ')` reads as
    /// `"x"` and a whitespace-only node reads as `Some("")`.
    pub fn query_text(&self, expr: &str) -> XmlResult<Option<String>> {
        let result = self.evaluate(expr)?;
        if result.kind() == XPATH_NODESET && result.nodes().is_empty() {
            return Ok(None);
        }
        Ok(Some(result.string_value().trim().to_string()))
    }

    /// Number of nodes an expression selects
    pub fn count(&self, expr: &str) -> XmlResult<usize> {
        Ok(self.evaluate(expr)?.nodes().len())
    }

    /// Truth of an expression: non-empty node-set, true, non-zero, non-empty string
    pub fn exists(&self, expr: &str) -> XmlResult<bool> {
        let result = self.evaluate(expr)?;
        Ok(match result.kind() {
            XPATH_NODESET => !result.nodes().is_empty(),
            XPATH_BOOLEAN => result.boolean(),
            XPATH_NUMBER => {
                let n = result.number();
                n != 0.0 && !n.is_nan()
            }
            XPATH_STRING => !result.string_value().is_empty(),
            _ => false,
        })
    }

    /// Parse the string value of an expression
    ///
    /// An empty or whitespace-only result is `None` for every `T`, including
    /// `String`; use [`Xml::text`] to tell blank text from missing text.
    pub fn value<T>(&self, expr: &str) -> XmlResult<Option<T>>
    where
        T: FromStr,
        T::Err: fmt::Display,
    {
        match self.query_text(expr)? {
            None => Ok(None),
            Some(text) if text.is_empty() => Ok(None),
            Some(text) => text.parse().map(Some).map_err(|e: T::Err| XmlError::InvalidValue {
                path: expr.to_string(),
                value: text.clone(),
                reason: e.to_string(),
            }),
        }
    }

    /// Like [`Xml::value`], falling back to `default` when absent
    pub fn value_or<T>(&self, expr: &str, default: T) -> XmlResult<T>
    where
        T: FromStr,
        T::Err: fmt::Display,
    {
        Ok(self.value(expr)?.unwrap_or(default))
    }

    /// Append an empty child element
    pub fn add_child(&self, name: &str) -> XmlResult<Xml> {
        let c_name = checked_name(name)?;
        let node = unsafe {
            libxml2::xmlNewChild(
                self.node.as_ptr(),
                std::ptr::null_mut(),
                c_name.as_ptr(),
                std::ptr::null(),
            )
        };
        let node = NonNull::new(node).ok_or(crate::error::LibXml2Error::MemoryAllocation)?;
        Ok(self.wrap(node))
    }

    /// Append a child element holding `text`
    pub fn add_text_child(&self, name: &str, text: &str) -> XmlResult<Xml> {
        let child = self.add_child(name)?;
        child.set_text(Some(text))?;
        Ok(child)
    }

    pub fn set_attr(&self, name: &str, value: &str) -> XmlResult<&Self> {
        let c_name = checked_name(name)?;
        let c_value = libxml2::to_cstring(value)?;
        let attr = unsafe {
            libxml2::xmlSetProp(self.node.as_ptr(), c_name.as_ptr(), c_value.as_ptr())
        };
        if attr.is_null() {
            return Err(crate::error::LibXml2Error::MemoryAllocation.into());
        }
        Ok(self)
    }

    /// Remove an attribute; returns whether it existed
    pub fn remove_attr(&self, name: &str) -> XmlResult<bool> {
        let c_name = libxml2::to_cstring(name)?;
        Ok(unsafe { libxml2::xmlUnsetProp(self.node.as_ptr(), c_name.as_ptr()) } == 0)
    }

    /// Replace the content of the element with text
    ///
    /// `None` and `Some("")` both leave the element empty. Child elements are
    /// removed from the tree; handles to them stay usable.
    pub fn set_text(&self, text: Option<&str>) -> XmlResult<&Self> {
        self.doc.ptr.clear_children(self.node);
        if let Some(text) = text.filter(|t| !t.is_empty()) {
            let c_text = libxml2::to_cstring(text)?;
            unsafe {
                let node = libxml2::xmlNewDocText(self.doc.ptr.as_ptr(), c_text.as_ptr());
                if node.is_null() {
                    return Err(crate::error::LibXml2Error::MemoryAllocation.into());
                }
                libxml2::xmlAddChild(self.node.as_ptr(), node);
            }
        }
        Ok(self)
    }

    /// Unlink the element from its parent
    pub fn remove(&self) {
        self.doc.ptr.detach(self.node);
    }

    /// Deep-copy `other` (possibly from another document) as a new last child
    pub fn append_copy(&self, other: &Xml) -> XmlResult<Xml> {
        let node = unsafe {
            let copy = libxml2::xmlDocCopyNode(other.node.as_ptr(), self.doc.ptr.as_ptr(), 1);
            if copy.is_null() {
                return Err(crate::error::LibXml2Error::MemoryAllocation.into());
            }
            libxml2::xmlAddChild(self.node.as_ptr(), copy)
        };
        let node = NonNull::new(node).ok_or(crate::error::LibXml2Error::MemoryAllocation)?;
        Ok(self.wrap(node))
    }

    /// Pretty-printed markup of this element
    pub fn to_pretty_string(&self) -> XmlResult<String> {
        self.to_pretty_string_with(&FormatOptions::default())
    }

    pub fn to_pretty_string_with(&self, options: &FormatOptions) -> XmlResult<String> {
        format::pretty(&self.to_string(), options)
    }

    /// Whole owning document, with the XML declaration
    pub fn to_document_string(&self) -> XmlResult<String> {
        Ok(self.doc.ptr.dump()?)
    }

    /// Write the owning document to disk, pretty-printed
    pub fn save(&self, path: impl AsRef<Path>, options: &FormatOptions) -> XmlResult<()> {
        let content = format::pretty(&self.to_document_string()?, options)?;
        std::fs::write(path.as_ref(), content)?;
        tracing::debug!(path = %path.as_ref().display(), "saved XML document");
        Ok(())
    }
}

/// Compact markup of this element, without declaration
impl fmt::Display for Xml {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let markup = libxml2::dump_node(self.doc.ptr.as_ptr(), self.node).map_err(|_| fmt::Error)?;
        f.write_str(&markup)
    }
}

impl fmt::Debug for Xml {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Xml")
            .field("name", &self.name())
            .field("path", &self.path())
            .finish()
    }
}

impl FromStr for Xml {
    type Err = XmlError;

    fn from_str(s: &str) -> XmlResult<Self> {
        Xml::parse(s)
    }
}

fn checked_name(name: &str) -> XmlResult<std::ffi::CString> {
    let c_name =
        libxml2::to_cstring(name).map_err(|_| XmlError::InvalidName(name.to_string()))?;
    let invalid = unsafe { libxml2::xmlValidateQName(c_name.as_ptr(), 0) } != 0;
    if name.is_empty() || invalid {
        return Err(XmlError::InvalidName(name.to_string()));
    }
    Ok(c_name)
}
