//! Conditional processing of XML nodes
//!
//! ```no_run
//! use xmlkit::{Flow, Xml, flow::is};
//!
//! let xml = Xml::parse("<job kind='batch'/>")?;
//! let ran = Flow::new(&xml)
//!     .when(is::attr_equals("kind", "interactive"), |_| println!("interactive"))
//!     .when(is::attr_equals("kind", "batch"), |_| println!("batch"))
//!     .otherwise(|job| println!("unknown job {}", job.name()))
//!     .run();
//! assert!(ran);
//! # Ok::<(), xmlkit::XmlError>(())
//! ```

use crate::error::XmlResult;
use crate::xml::Xml;

type Predicate<'a> = Box<dyn Fn(&Xml) -> bool + 'a>;
type Action<'a> = Box<dyn FnMut(&Xml) + 'a>;

/// Ordered list of `when` branches over one node; the first match wins
pub struct Flow<'a> {
    xml: &'a Xml,
    branches: Vec<(Predicate<'a>, Action<'a>)>,
    fallback: Option<Action<'a>>,
}

impl<'a> Flow<'a> {
    pub fn new(xml: &'a Xml) -> Self {
        Flow {
            xml,
            branches: Vec::new(),
            fallback: None,
        }
    }

    pub fn when<P, A>(mut self, predicate: P, action: A) -> Self
    where
        P: Fn(&Xml) -> bool + 'a,
        A: FnMut(&Xml) + 'a,
    {
        self.branches.push((Box::new(predicate), Box::new(action)));
        self
    }

    /// Runs when no branch matched
    pub fn otherwise<A>(mut self, action: A) -> Self
    where
        A: FnMut(&Xml) + 'a,
    {
        self.fallback = Some(Box::new(action));
        self
    }

    /// Run the first matching branch, else the fallback; `true` if anything ran
    pub fn run(self) -> bool {
        let Flow {
            xml,
            branches,
            fallback,
        } = self;

        for (predicate, mut action) in branches {
            if predicate(xml) {
                action(xml);
                return true;
            }
        }
        match fallback {
            Some(mut action) => {
                action(xml);
                true
            }
            None => false,
        }
    }

    /// Run `action` for every node `xpath` selects; returns the match count
    pub fn each<A>(xml: &Xml, xpath: &str, mut action: A) -> XmlResult<usize>
    where
        A: FnMut(&Xml),
    {
        let nodes = xml.query(xpath)?;
        for node in &nodes {
            action(node);
        }
        Ok(nodes.len())
    }
}

/// Node predicates for [`Flow::when`]
pub mod is {
    use crate::xml::Xml;

    /// Qualified name equals `name`
    pub fn named(name: impl Into<String>) -> impl Fn(&Xml) -> bool {
        let name = name.into();
        move |xml: &Xml| xml.name() == name
    }

    pub fn has_attr(name: impl Into<String>) -> impl Fn(&Xml) -> bool {
        let name = name.into();
        move |xml: &Xml| xml.has_attr(&name)
    }

    pub fn attr_equals(name: impl Into<String>, value: impl Into<String>) -> impl Fn(&Xml) -> bool {
        let name = name.into();
        let value = value.into();
        move |xml: &Xml| xml.attr(&name).as_deref() == Some(value.as_str())
    }

    /// Trimmed text equals `text`
    pub fn text_equals(text: impl Into<String>) -> impl Fn(&Xml) -> bool {
        let text = text.into();
        move |xml: &Xml| xml.text().as_deref() == Some(text.as_str())
    }

    /// `xpath`, evaluated against the node, selects something
    ///
    /// An expression that fails to evaluate counts as no match.
    pub fn matches(xpath: impl Into<String>) -> impl Fn(&Xml) -> bool {
        let xpath = xpath.into();
        move |xml: &Xml| match xml.exists(&xpath) {
            Ok(found) => found,
            Err(e) => {
                tracing::debug!(error = %e, "predicate expression failed");
                false
            }
        }
    }

    pub fn and<A, B>(a: A, b: B) -> impl Fn(&Xml) -> bool
    where
        A: Fn(&Xml) -> bool,
        B: Fn(&Xml) -> bool,
    {
        move |xml: &Xml| a(xml) && b(xml)
    }

    pub fn or<A, B>(a: A, b: B) -> impl Fn(&Xml) -> bool
    where
        A: Fn(&Xml) -> bool,
        B: Fn(&Xml) -> bool,
    {
        move |xml: &Xml| a(xml) || b(xml)
    }

    pub fn not<A>(a: A) -> impl Fn(&Xml) -> bool
    where
        A: Fn(&Xml) -> bool,
    {
        move |xml: &Xml| !a(xml)
    }
}
