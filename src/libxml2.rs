//! LibXML2 FFI Wrapper Module
//!
//! Direct bindings to the parts of libxml2 this crate builds on: the tree API,
//! XPath, XML Schema validation and the streaming text reader. Every raw
//! pointer the engine hands out is owned by exactly one RAII type defined
//! here, so the rest of the crate never calls a `xmlFree*` function itself.
//!
//! ## Thread Safety
//!
//! - Parser initialization happens exactly once behind `std::sync::Once`.
//! - Documents are single-threaded: `DocumentPtr` is neither `Send` nor `Sync`.
//! - Parsed schemas are read-only after parsing and shared through `Arc`;
//!   every validation creates its own validation context.

use std::cell::RefCell;
use std::ffi::{CStr, CString};
use std::marker::PhantomData;
use std::ptr::{self, NonNull};
use std::sync::{Arc, Once};

use libc::{c_char, c_double, c_int, c_uint, c_ushort, c_void};

use crate::config::ParseOptions;
use crate::error::{IssueLevel, LibXml2Error, LibXml2Result, ValidationIssue, XmlError, XmlResult};

/// Global initialization flag for libxml2
static LIBXML2_INIT: Once = Once::new();

/// Initialize the libxml2 parser; cheap after the first call
pub fn init() {
    LIBXML2_INIT.call_once(|| unsafe {
        xmlInitParser();
    });
}

// Node types (xmlElementType)
pub const ELEMENT_NODE: c_int = 1;
pub const TEXT_NODE: c_int = 3;
pub const CDATA_SECTION_NODE: c_int = 4;

// XPath result types (xmlXPathObjectType)
pub const XPATH_NODESET: c_int = 1;
pub const XPATH_BOOLEAN: c_int = 2;
pub const XPATH_NUMBER: c_int = 3;
pub const XPATH_STRING: c_int = 4;

// Parser options (xmlParserOption)
const XML_PARSE_NOERROR: c_int = 1 << 5;
const XML_PARSE_NOWARNING: c_int = 1 << 6;
const XML_PARSE_NOBLANKS: c_int = 1 << 8;
const XML_PARSE_NONET: c_int = 1 << 11;
const XML_PARSE_NOCDATA: c_int = 1 << 14;
const XML_PARSE_HUGE: c_int = 1 << 19;

/// Translate parse options into libxml2 parser flags
pub fn parser_flags(options: &ParseOptions) -> c_int {
    let mut flags = XML_PARSE_NOERROR | XML_PARSE_NOWARNING;
    if !options.keep_blanks {
        flags |= XML_PARSE_NOBLANKS;
    }
    if options.no_network {
        flags |= XML_PARSE_NONET;
    }
    if options.merge_cdata {
        flags |= XML_PARSE_NOCDATA;
    }
    if options.huge {
        flags |= XML_PARSE_HUGE;
    }
    flags
}

/// ## Opaque libxml2 structures
#[repr(C)]
pub struct XmlDoc {
    _private: [u8; 0],
}

#[repr(C)]
pub struct XmlBuffer {
    _private: [u8; 0],
}

#[repr(C)]
pub struct XmlXPathContext {
    _private: [u8; 0],
}

#[repr(C)]
pub struct XmlTextReader {
    _private: [u8; 0],
}

#[repr(C)]
pub struct XmlSchema {
    _private: [u8; 0],
}

#[repr(C)]
pub struct XmlSchemaParserCtxt {
    _private: [u8; 0],
}

#[repr(C)]
pub struct XmlSchemaValidCtxt {
    _private: [u8; 0],
}

/// Public layout of `xmlNode`, stable across libxml2 2.x
#[repr(C)]
pub struct XmlNode {
    pub _private: *mut c_void,
    pub node_type: c_int,
    pub name: *const c_char,
    pub children: *mut XmlNode,
    pub last: *mut XmlNode,
    pub parent: *mut XmlNode,
    pub next: *mut XmlNode,
    pub prev: *mut XmlNode,
    pub doc: *mut XmlDoc,
    pub ns: *mut XmlNs,
    pub content: *mut c_char,
    pub properties: *mut XmlAttr,
    pub ns_def: *mut XmlNs,
    pub psvi: *mut c_void,
    pub line: c_ushort,
    pub extra: c_ushort,
}

/// Leading fields of `xmlAttr`; only ever read through a pointer
#[repr(C)]
pub struct XmlAttr {
    pub _private: *mut c_void,
    pub node_type: c_int,
    pub name: *const c_char,
    pub children: *mut XmlNode,
    pub last: *mut XmlNode,
    pub parent: *mut XmlNode,
    pub next: *mut XmlAttr,
    pub prev: *mut XmlAttr,
    pub doc: *mut XmlDoc,
    pub ns: *mut XmlNs,
}

#[repr(C)]
pub struct XmlNs {
    pub next: *mut XmlNs,
    pub ns_type: c_int,
    pub href: *const c_char,
    pub prefix: *const c_char,
    pub _private: *mut c_void,
    pub context: *mut XmlDoc,
}

#[repr(C)]
pub struct XmlNodeSet {
    pub node_nr: c_int,
    pub node_max: c_int,
    pub node_tab: *mut *mut XmlNode,
}

#[repr(C)]
pub struct XmlXPathObject {
    pub obj_type: c_int,
    pub nodesetval: *mut XmlNodeSet,
    pub boolval: c_int,
    pub floatval: c_double,
    pub stringval: *mut c_char,
    pub user: *mut c_void,
    pub index: c_int,
    pub user2: *mut c_void,
    pub index2: c_int,
}

#[repr(C)]
pub struct xmlError {
    pub domain: c_int,
    pub code: c_int,
    pub message: *const c_char,
    pub level: c_int,
    pub file: *const c_char,
    pub line: c_int,
    pub str1: *const c_char,
    pub str2: *const c_char,
    pub str3: *const c_char,
    pub int1: c_int,
    pub int2: c_int,
    pub ctxt: *mut c_void,
    pub node: *mut c_void,
}

pub type XmlStructuredErrorFunc =
    Option<unsafe extern "C" fn(user_data: *mut c_void, error: *const xmlError)>;

pub type XmlFreeFunc = Option<unsafe extern "C" fn(mem: *mut c_void)>;

// External libxml2 FFI declarations
#[cfg_attr(target_os = "windows", link(name = "libxml2"))]
#[cfg_attr(not(target_os = "windows"), link(name = "xml2"))]
unsafe extern "C" {
    pub static xmlFree: XmlFreeFunc;

    pub fn xmlInitParser();
    pub fn xmlGetLastError() -> *const xmlError;
    pub fn xmlResetLastError();
    pub fn xmlSetStructuredErrorFunc(ctx: *mut c_void, handler: XmlStructuredErrorFunc);

    // Parsing
    pub fn xmlReadMemory(
        buffer: *const c_char,
        size: c_int,
        url: *const c_char,
        encoding: *const c_char,
        options: c_int,
    ) -> *mut XmlDoc;
    pub fn xmlReadFile(filename: *const c_char, encoding: *const c_char, options: c_int)
    -> *mut XmlDoc;
    pub fn xmlFreeDoc(doc: *mut XmlDoc);

    // Tree
    pub fn xmlNewDoc(version: *const c_char) -> *mut XmlDoc;
    pub fn xmlNewDocNode(
        doc: *mut XmlDoc,
        ns: *mut XmlNs,
        name: *const c_char,
        content: *const c_char,
    ) -> *mut XmlNode;
    pub fn xmlDocSetRootElement(doc: *mut XmlDoc, root: *mut XmlNode) -> *mut XmlNode;
    pub fn xmlDocGetRootElement(doc: *const XmlDoc) -> *mut XmlNode;
    pub fn xmlNewChild(
        parent: *mut XmlNode,
        ns: *mut XmlNs,
        name: *const c_char,
        content: *const c_char,
    ) -> *mut XmlNode;
    pub fn xmlNewDocText(doc: *const XmlDoc, content: *const c_char) -> *mut XmlNode;
    pub fn xmlAddChild(parent: *mut XmlNode, cur: *mut XmlNode) -> *mut XmlNode;
    pub fn xmlUnlinkNode(cur: *mut XmlNode);
    pub fn xmlFreeNode(cur: *mut XmlNode);
    pub fn xmlDocCopyNode(node: *mut XmlNode, doc: *mut XmlDoc, extended: c_int) -> *mut XmlNode;
    pub fn xmlGetProp(node: *const XmlNode, name: *const c_char) -> *mut c_char;
    pub fn xmlHasProp(node: *const XmlNode, name: *const c_char) -> *mut XmlAttr;
    pub fn xmlSetProp(node: *mut XmlNode, name: *const c_char, value: *const c_char)
    -> *mut XmlAttr;
    pub fn xmlUnsetProp(node: *mut XmlNode, name: *const c_char) -> c_int;
    pub fn xmlNodeGetContent(node: *const XmlNode) -> *mut c_char;
    pub fn xmlGetNodePath(node: *const XmlNode) -> *mut c_char;
    pub fn xmlValidateQName(value: *const c_char, space: c_int) -> c_int;

    // Serialization
    pub fn xmlBufferCreate() -> *mut XmlBuffer;
    pub fn xmlBufferFree(buf: *mut XmlBuffer);
    pub fn xmlBufferContent(buf: *const XmlBuffer) -> *const c_char;
    pub fn xmlNodeDump(
        buf: *mut XmlBuffer,
        doc: *mut XmlDoc,
        cur: *mut XmlNode,
        level: c_int,
        format: c_int,
    ) -> c_int;
    pub fn xmlDocDumpFormatMemoryEnc(
        doc: *mut XmlDoc,
        mem: *mut *mut c_char,
        size: *mut c_int,
        encoding: *const c_char,
        format: c_int,
    );

    // XPath
    pub fn xmlXPathNewContext(doc: *mut XmlDoc) -> *mut XmlXPathContext;
    pub fn xmlXPathFreeContext(ctxt: *mut XmlXPathContext);
    pub fn xmlXPathRegisterNs(
        ctxt: *mut XmlXPathContext,
        prefix: *const c_char,
        ns_uri: *const c_char,
    ) -> c_int;
    pub fn xmlXPathNodeEval(
        node: *mut XmlNode,
        expr: *const c_char,
        ctxt: *mut XmlXPathContext,
    ) -> *mut XmlXPathObject;
    pub fn xmlXPathFreeObject(obj: *mut XmlXPathObject);
    pub fn xmlXPathCastToString(obj: *mut XmlXPathObject) -> *mut c_char;

    // Schema parsing functions
    pub fn xmlSchemaNewMemParserCtxt(
        buffer: *const c_char,
        size: c_int,
    ) -> *mut XmlSchemaParserCtxt;
    pub fn xmlSchemaNewParserCtxt(url: *const c_char) -> *mut XmlSchemaParserCtxt;
    pub fn xmlSchemaSetParserStructuredErrors(
        ctxt: *mut XmlSchemaParserCtxt,
        serror: XmlStructuredErrorFunc,
        ctx: *mut c_void,
    );
    pub fn xmlSchemaParse(ctxt: *const XmlSchemaParserCtxt) -> *mut XmlSchema;
    pub fn xmlSchemaFreeParserCtxt(ctxt: *mut XmlSchemaParserCtxt);
    pub fn xmlSchemaFree(schema: *mut XmlSchema);

    // Schema validation functions
    pub fn xmlSchemaNewValidCtxt(schema: *const XmlSchema) -> *mut XmlSchemaValidCtxt;
    pub fn xmlSchemaFreeValidCtxt(ctxt: *mut XmlSchemaValidCtxt);
    pub fn xmlSchemaValidateDoc(ctxt: *mut XmlSchemaValidCtxt, doc: *mut XmlDoc) -> c_int;
    pub fn xmlSchemaValidateFile(
        ctxt: *const XmlSchemaValidCtxt,
        file_name: *const c_char,
        options: c_uint,
    ) -> c_int;
    pub fn xmlSchemaSetValidStructuredErrors(
        ctxt: *mut XmlSchemaValidCtxt,
        serror: XmlStructuredErrorFunc,
        ctx: *mut c_void,
    );

    // Streaming reader
    pub fn xmlReaderForMemory(
        buffer: *const c_char,
        size: c_int,
        url: *const c_char,
        encoding: *const c_char,
        options: c_int,
    ) -> *mut XmlTextReader;
    pub fn xmlReaderForFile(
        filename: *const c_char,
        encoding: *const c_char,
        options: c_int,
    ) -> *mut XmlTextReader;
    pub fn xmlFreeTextReader(reader: *mut XmlTextReader);
    pub fn xmlTextReaderRead(reader: *mut XmlTextReader) -> c_int;
    pub fn xmlTextReaderNext(reader: *mut XmlTextReader) -> c_int;
    pub fn xmlTextReaderNodeType(reader: *mut XmlTextReader) -> c_int;
    pub fn xmlTextReaderDepth(reader: *mut XmlTextReader) -> c_int;
    pub fn xmlTextReaderIsEmptyElement(reader: *mut XmlTextReader) -> c_int;
    pub fn xmlTextReaderConstName(reader: *mut XmlTextReader) -> *const c_char;
    pub fn xmlTextReaderConstValue(reader: *mut XmlTextReader) -> *const c_char;
    pub fn xmlTextReaderMoveToNextAttribute(reader: *mut XmlTextReader) -> c_int;
    pub fn xmlTextReaderMoveToElement(reader: *mut XmlTextReader) -> c_int;
    pub fn xmlTextReaderGetAttribute(
        reader: *mut XmlTextReader,
        name: *const c_char,
    ) -> *mut c_char;
    pub fn xmlTextReaderReadOuterXml(reader: *mut XmlTextReader) -> *mut c_char;
}

/// Convert a Rust string for the engine
pub fn to_cstring(value: &str) -> LibXml2Result<CString> {
    CString::new(value).map_err(|_| LibXml2Error::InteriorNul)
}

/// Copy a borrowed engine string; `None` for null
///
/// # Safety
///
/// `ptr` must be null or point to a NUL-terminated string that stays alive
/// for the duration of the call.
pub unsafe fn borrowed_string(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        None
    } else {
        Some(unsafe { CStr::from_ptr(ptr) }.to_string_lossy().into_owned())
    }
}

pub fn buffer_len(len: usize) -> LibXml2Result<c_int> {
    c_int::try_from(len).map_err(|_| LibXml2Error::InputTooLarge { size: len })
}

/// Owner of a string allocated by libxml2, released with `xmlFree`
pub struct XmlString {
    ptr: NonNull<c_char>,
}

impl XmlString {
    /// Take ownership of an engine-allocated string; `None` for null
    ///
    /// # Safety
    ///
    /// `ptr` must come from a libxml2 call whose documentation hands
    /// ownership to the caller.
    pub unsafe fn from_raw(ptr: *mut c_char) -> Option<Self> {
        NonNull::new(ptr).map(|ptr| XmlString { ptr })
    }

    pub fn to_string_lossy(&self) -> String {
        unsafe { CStr::from_ptr(self.ptr.as_ptr()) }
            .to_string_lossy()
            .into_owned()
    }
}

impl Drop for XmlString {
    fn drop(&mut self) {
        unsafe {
            if let Some(free) = xmlFree {
                free(self.ptr.as_ptr() as *mut c_void);
            }
        }
    }
}

/// Owned `xmlDoc`
///
/// Nodes unlinked from the tree are parked in `detached` and freed together
/// with the document, so handles that still point at them stay valid.
pub struct DocumentPtr {
    ptr: NonNull<XmlDoc>,
    detached: RefCell<Vec<NonNull<XmlNode>>>,
    _not_send: PhantomData<*mut XmlDoc>,
}

impl DocumentPtr {
    fn from_raw(ptr: *mut XmlDoc) -> Option<Self> {
        NonNull::new(ptr).map(|ptr| DocumentPtr {
            ptr,
            detached: RefCell::new(Vec::new()),
            _not_send: PhantomData,
        })
    }

    /// Parse a document held in memory
    pub fn parse_memory(input: &[u8], options: &ParseOptions) -> XmlResult<Self> {
        init();
        let size = buffer_len(input.len())?;

        unsafe {
            xmlResetLastError();
            let doc = xmlReadMemory(
                input.as_ptr() as *const c_char,
                size,
                ptr::null(),
                ptr::null(),
                parser_flags(options),
            );
            Self::from_raw(doc).ok_or_else(last_parse_error)
        }
    }

    /// Parse a document from a file
    pub fn parse_file(path: &std::path::Path, options: &ParseOptions) -> XmlResult<Self> {
        init();
        if !path.exists() {
            return Err(XmlError::FileNotFound {
                path: path.to_path_buf(),
            });
        }

        let c_path = to_cstring(&path.to_string_lossy())?;
        unsafe {
            xmlResetLastError();
            let doc = xmlReadFile(c_path.as_ptr(), ptr::null(), parser_flags(options));
            Self::from_raw(doc).ok_or_else(last_parse_error)
        }
    }

    /// Create a document holding a single empty root element
    pub fn with_root(name: &CStr) -> LibXml2Result<(Self, NonNull<XmlNode>)> {
        init();
        let version = to_cstring("1.0")?;

        unsafe {
            let document = Self::from_raw(xmlNewDoc(version.as_ptr()))
                .ok_or(LibXml2Error::MemoryAllocation)?;
            let root = NonNull::new(xmlNewDocNode(
                document.as_ptr(),
                ptr::null_mut(),
                name.as_ptr(),
                ptr::null(),
            ))
            .ok_or(LibXml2Error::MemoryAllocation)?;
            xmlDocSetRootElement(document.as_ptr(), root.as_ptr());
            Ok((document, root))
        }
    }

    pub fn as_ptr(&self) -> *mut XmlDoc {
        self.ptr.as_ptr()
    }

    pub fn root(&self) -> Option<NonNull<XmlNode>> {
        NonNull::new(unsafe { xmlDocGetRootElement(self.ptr.as_ptr()) })
    }

    /// Unlink `node` from its parent and keep it alive until the document drops
    ///
    /// Nodes that are already detached are left alone.
    pub fn detach(&self, node: NonNull<XmlNode>) {
        unsafe {
            if (*node.as_ptr()).parent.is_null() {
                return;
            }
            xmlUnlinkNode(node.as_ptr());
        }
        self.detached.borrow_mut().push(node);
    }

    /// Remove every child of `node`; elements are detached, other nodes freed
    pub fn clear_children(&self, node: NonNull<XmlNode>) {
        unsafe {
            let mut child = (*node.as_ptr()).children;
            while !child.is_null() {
                let next = (*child).next;
                if (*child).node_type == ELEMENT_NODE {
                    self.detach(NonNull::new_unchecked(child));
                } else {
                    xmlUnlinkNode(child);
                    xmlFreeNode(child);
                }
                child = next;
            }
        }
    }

    /// Serialize the whole document, including the XML declaration
    pub fn dump(&self) -> LibXml2Result<String> {
        let encoding = to_cstring("UTF-8")?;
        let mut mem: *mut c_char = ptr::null_mut();
        let mut size: c_int = 0;

        unsafe {
            xmlDocDumpFormatMemoryEnc(self.as_ptr(), &mut mem, &mut size, encoding.as_ptr(), 0);
            XmlString::from_raw(mem)
                .map(|s| s.to_string_lossy())
                .ok_or(LibXml2Error::MemoryAllocation)
        }
    }
}

impl Drop for DocumentPtr {
    fn drop(&mut self) {
        unsafe {
            // Detached nodes may still reference the document dictionary.
            for node in self.detached.get_mut().drain(..) {
                xmlFreeNode(node.as_ptr());
            }
            xmlFreeDoc(self.ptr.as_ptr());
        }
    }
}

/// Serialize a single node without declaration or added whitespace
pub fn dump_node(doc: *mut XmlDoc, node: NonNull<XmlNode>) -> LibXml2Result<String> {
    unsafe {
        let buf = xmlBufferCreate();
        if buf.is_null() {
            return Err(LibXml2Error::MemoryAllocation);
        }
        let written = xmlNodeDump(buf, doc, node.as_ptr(), 0, 0);
        let result = if written < 0 {
            Err(LibXml2Error::MemoryAllocation)
        } else {
            Ok(borrowed_string(xmlBufferContent(buf)).unwrap_or_default())
        };
        xmlBufferFree(buf);
        result
    }
}

/// The engine's last recorded error as a parse failure
pub fn last_parse_error() -> XmlError {
    unsafe {
        let error = xmlGetLastError();
        if error.is_null() {
            return XmlError::Parse {
                message: "unknown parse error".to_string(),
                line: 0,
            };
        }
        XmlError::Parse {
            message: borrowed_string((*error).message)
                .map(|m| m.trim().to_string())
                .unwrap_or_else(|| "unknown parse error".to_string()),
            line: (*error).line,
        }
    }
}

/// The engine's last recorded error message, if any
pub fn last_error_message() -> Option<String> {
    unsafe {
        let error = xmlGetLastError();
        if error.is_null() {
            return None;
        }
        borrowed_string((*error).message).map(|m| m.trim().to_string())
    }
}

unsafe extern "C" fn silent_error_callback(_user_data: *mut c_void, _error: *const xmlError) {}

/// Callback for libxml2 to report schema and validation errors (structured)
unsafe extern "C" fn structured_error_callback(user_data: *mut c_void, error: *const xmlError) {
    if user_data.is_null() || error.is_null() {
        return;
    }
    let issues = unsafe { &mut *(user_data as *mut Vec<ValidationIssue>) };

    let (level, line, message) = unsafe { ((*error).level, (*error).line, (*error).message) };
    if let Some(message) = unsafe { borrowed_string(message) } {
        let line = u32::try_from(line).ok().filter(|l| *l > 0);
        issues.push(ValidationIssue::new(
            IssueLevel::from_code(level),
            message.trim(),
            line,
        ));
    }
}

/// Per-evaluation XPath context with namespace bindings
pub struct XPathContextPtr {
    ptr: NonNull<XmlXPathContext>,
}

impl XPathContextPtr {
    pub fn new(doc: *mut XmlDoc) -> LibXml2Result<Self> {
        NonNull::new(unsafe { xmlXPathNewContext(doc) })
            .map(|ptr| XPathContextPtr { ptr })
            .ok_or(LibXml2Error::XPathContextCreationFailed)
    }

    pub fn register_namespace(&self, prefix: &str, uri: &str) -> LibXml2Result<()> {
        let prefix = to_cstring(prefix)?;
        let uri = to_cstring(uri)?;
        unsafe {
            xmlXPathRegisterNs(self.ptr.as_ptr(), prefix.as_ptr(), uri.as_ptr());
        }
        Ok(())
    }

    /// Evaluate `expr` relative to `node`; `None` when the engine rejects it
    pub fn eval(&self, node: NonNull<XmlNode>, expr: &CStr) -> Option<XPathObjectPtr> {
        unsafe {
            xmlResetLastError();
            xmlSetStructuredErrorFunc(ptr::null_mut(), Some(silent_error_callback));
            let obj = xmlXPathNodeEval(node.as_ptr(), expr.as_ptr(), self.ptr.as_ptr());
            xmlSetStructuredErrorFunc(ptr::null_mut(), None);
            NonNull::new(obj).map(|ptr| XPathObjectPtr { ptr })
        }
    }
}

impl Drop for XPathContextPtr {
    fn drop(&mut self) {
        unsafe { xmlXPathFreeContext(self.ptr.as_ptr()) }
    }
}

/// Owned XPath result
pub struct XPathObjectPtr {
    ptr: NonNull<XmlXPathObject>,
}

impl XPathObjectPtr {
    pub fn kind(&self) -> c_int {
        unsafe { (*self.ptr.as_ptr()).obj_type }
    }

    /// Nodes of a node-set result, in document order
    pub fn nodes(&self) -> Vec<NonNull<XmlNode>> {
        unsafe {
            let obj = self.ptr.as_ptr();
            if (*obj).obj_type != XPATH_NODESET || (*obj).nodesetval.is_null() {
                return Vec::new();
            }
            let set = &*(*obj).nodesetval;
            if set.node_tab.is_null() || set.node_nr <= 0 {
                return Vec::new();
            }
            std::slice::from_raw_parts(set.node_tab, set.node_nr as usize)
                .iter()
                .filter_map(|node| NonNull::new(*node))
                .collect()
        }
    }

    pub fn boolean(&self) -> bool {
        unsafe { (*self.ptr.as_ptr()).boolval != 0 }
    }

    pub fn number(&self) -> f64 {
        unsafe { (*self.ptr.as_ptr()).floatval }
    }

    /// XPath `string()` of the result
    pub fn string_value(&self) -> String {
        unsafe { XmlString::from_raw(xmlXPathCastToString(self.ptr.as_ptr())) }
            .map(|s| s.to_string_lossy())
            .unwrap_or_default()
    }
}

impl Drop for XPathObjectPtr {
    fn drop(&mut self) {
        unsafe { xmlXPathFreeObject(self.ptr.as_ptr()) }
    }
}

/// Owned streaming reader
///
/// The reader borrows its input buffer, so memory-backed readers keep the
/// bytes alongside the pointer.
pub struct TextReaderPtr {
    ptr: NonNull<XmlTextReader>,
    _input: Option<Box<[u8]>>,
}

impl TextReaderPtr {
    pub fn for_memory(input: Vec<u8>, options: &ParseOptions) -> LibXml2Result<Self> {
        init();
        let input = input.into_boxed_slice();
        let size = buffer_len(input.len())?;

        let ptr = unsafe {
            xmlReaderForMemory(
                input.as_ptr() as *const c_char,
                size,
                ptr::null(),
                ptr::null(),
                parser_flags(options),
            )
        };
        NonNull::new(ptr)
            .map(|ptr| TextReaderPtr {
                ptr,
                _input: Some(input),
            })
            .ok_or(LibXml2Error::ReaderCreationFailed)
    }

    pub fn for_file(path: &CStr, options: &ParseOptions) -> LibXml2Result<Self> {
        init();
        let ptr = unsafe { xmlReaderForFile(path.as_ptr(), ptr::null(), parser_flags(options)) };
        NonNull::new(ptr)
            .map(|ptr| TextReaderPtr { ptr, _input: None })
            .ok_or(LibXml2Error::ReaderCreationFailed)
    }

    pub fn as_ptr(&self) -> *mut XmlTextReader {
        self.ptr.as_ptr()
    }
}

impl Drop for TextReaderPtr {
    fn drop(&mut self) {
        unsafe { xmlFreeTextReader(self.ptr.as_ptr()) }
    }
}

/// Thread-safe wrapper for libxml2 schema pointer with proper resource management
#[derive(Debug, Clone)]
pub struct XmlSchemaPtr {
    inner: Arc<XmlSchemaInner>,
}

#[derive(Debug)]
struct XmlSchemaInner {
    ptr: NonNull<XmlSchema>,
}

// Safety: libxml2 documentation states that xmlSchema structures are thread-safe for reading
// See: http://xmlsoft.org/threads.html
unsafe impl Send for XmlSchemaInner {}
unsafe impl Sync for XmlSchemaInner {}

impl XmlSchemaPtr {
    pub(crate) fn as_ptr(&self) -> *const XmlSchema {
        self.inner.ptr.as_ptr()
    }

    /// Whether two handles share one parsed schema
    pub fn same_schema(&self, other: &XmlSchemaPtr) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Drop for XmlSchemaInner {
    fn drop(&mut self) {
        unsafe { xmlSchemaFree(self.ptr.as_ptr()) }
    }
}

/// Where schema text comes from
pub enum SchemaSource<'a> {
    Memory(&'a [u8]),
    File(&'a CStr),
}

/// Parse an XML schema, collecting the engine's diagnostics
///
/// Schema parsing is not thread-safe in libxml2; callers parse once and share
/// the resulting `XmlSchemaPtr`.
pub fn parse_schema(source: SchemaSource<'_>) -> (LibXml2Result<XmlSchemaPtr>, Vec<ValidationIssue>) {
    init();
    let mut issues: Vec<ValidationIssue> = Vec::new();

    let parser_ctxt = match source {
        SchemaSource::Memory(data) => match buffer_len(data.len()) {
            Ok(size) => unsafe { xmlSchemaNewMemParserCtxt(data.as_ptr() as *const c_char, size) },
            Err(e) => return (Err(e), issues),
        },
        SchemaSource::File(path) => unsafe { xmlSchemaNewParserCtxt(path.as_ptr()) },
    };

    if parser_ctxt.is_null() {
        return (Err(LibXml2Error::MemoryAllocation), issues);
    }

    let schema = unsafe {
        xmlSchemaSetParserStructuredErrors(
            parser_ctxt,
            Some(structured_error_callback),
            &mut issues as *mut Vec<ValidationIssue> as *mut c_void,
        );
        let schema = xmlSchemaParse(parser_ctxt);
        xmlSchemaFreeParserCtxt(parser_ctxt);
        schema
    };

    let result = NonNull::new(schema)
        .map(|ptr| XmlSchemaPtr {
            inner: Arc::new(XmlSchemaInner { ptr }),
        })
        .ok_or(LibXml2Error::SchemaParseFailed);
    (result, issues)
}

/// Validation outcome reported by libxml2
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationOutcome {
    /// Validation succeeded (return code 0)
    Valid,
    /// Validation failed with errors (return code > 0)
    Invalid { issues: Vec<ValidationIssue> },
    /// Internal error occurred (return code < 0)
    InternalError { code: i32 },
}

impl ValidationOutcome {
    /// Create an outcome from libxml2 return code and captured issues
    pub fn from_code(code: c_int, issues: Vec<ValidationIssue>) -> Self {
        match code {
            0 => ValidationOutcome::Valid,
            n if n > 0 => ValidationOutcome::Invalid { issues },
            n => ValidationOutcome::InternalError { code: n },
        }
    }

    pub fn is_valid(&self) -> bool {
        matches!(self, ValidationOutcome::Valid)
    }
}

/// Validate a parsed document; thread-safe for distinct documents
pub fn validate_document(
    schema: &XmlSchemaPtr,
    doc: *mut XmlDoc,
) -> LibXml2Result<(ValidationOutcome, Vec<ValidationIssue>)> {
    unsafe {
        let valid_ctxt = xmlSchemaNewValidCtxt(schema.as_ptr());
        if valid_ctxt.is_null() {
            return Err(LibXml2Error::ValidationContextCreationFailed);
        }

        let mut issues: Vec<ValidationIssue> = Vec::new();
        xmlSchemaSetValidStructuredErrors(
            valid_ctxt,
            Some(structured_error_callback),
            &mut issues as *mut Vec<ValidationIssue> as *mut c_void,
        );

        let code = xmlSchemaValidateDoc(valid_ctxt, doc);
        xmlSchemaFreeValidCtxt(valid_ctxt);

        // Warnings can accompany a valid document; keep them for the handler.
        let outcome = ValidationOutcome::from_code(code, issues.clone());
        Ok((outcome, issues))
    }
}
