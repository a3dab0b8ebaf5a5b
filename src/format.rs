//! XML pretty-printer
//!
//! Works on markup text rather than on a parsed tree, so entity references,
//! attribute quoting and CDATA sections come out exactly as they went in.
//!
//! Layout rules:
//! - one tag per line, `indent` spaces per nesting level
//! - an element holding only text stays on one line, text trimmed
//! - whitespace-only text between tags is dropped
//! - a start tag wider than `max_line_width` with more than one attribute
//!   keeps its first attribute on the tag line and puts each following
//!   attribute on its own line, aligned under the first

use std::sync::LazyLock;

use regex::Regex;

use crate::config::FormatOptions;
use crate::error::{XmlError, XmlResult};

static ATTRIBUTE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)([^\s=/>"']+)\s*=\s*("[^"]*"|'[^']*')"#).expect("valid attribute pattern")
});

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token<'a> {
    Declaration(&'a str),
    Comment(&'a str),
    CData(&'a str),
    Doctype(&'a str),
    Start {
        name: &'a str,
        attributes: Vec<(&'a str, &'a str)>,
        empty: bool,
    },
    End(&'a str),
    Text(&'a str),
}

struct Tokenizer<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Tokenizer<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn error(&self, reason: impl Into<String>) -> XmlError {
        XmlError::Format {
            position: self.pos,
            reason: reason.into(),
        }
    }

    fn until(&self, rest: &str, from: usize, terminator: &str) -> XmlResult<usize> {
        rest[from..]
            .find(terminator)
            .map(|i| from + i + terminator.len())
            .ok_or_else(|| self.error(format!("unterminated construct, expected '{}'", terminator)))
    }

    /// Length of a tag up to and including its closing `>`, honoring quotes
    fn tag_len(&self, rest: &str) -> XmlResult<usize> {
        let mut quote: Option<char> = None;
        for (i, c) in rest.char_indices().skip(1) {
            match (quote, c) {
                (Some(q), c) if c == q => quote = None,
                (Some(_), _) => {}
                (None, '"' | '\'') => quote = Some(c),
                (None, '>') => return Ok(i + 1),
                (None, '<') => return Err(self.error("'<' inside a tag")),
                _ => {}
            }
        }
        Err(self.error("unterminated tag"))
    }

    /// Length of a `<!DOCTYPE ...>` including any internal subset
    fn doctype_len(&self, rest: &str) -> XmlResult<usize> {
        let mut depth = 0usize;
        let mut quote: Option<char> = None;
        for (i, c) in rest.char_indices().skip(2) {
            match (quote, c) {
                (Some(q), c) if c == q => quote = None,
                (Some(_), _) => {}
                (None, '"' | '\'') => quote = Some(c),
                (None, '[') => depth += 1,
                (None, ']') => depth = depth.saturating_sub(1),
                (None, '>') if depth == 0 => return Ok(i + 1),
                _ => {}
            }
        }
        Err(self.error("unterminated declaration"))
    }

    /// Text between attributes must be whitespace; `offset` is relative to the tag
    fn expect_blank(&self, text: &str, offset: usize) -> XmlResult<()> {
        match text.find(|c: char| !c.is_whitespace()) {
            None => Ok(()),
            Some(i) => Err(XmlError::Format {
                position: self.pos + offset + i,
                reason: format!("malformed attribute near '{}'", text[i..].trim()),
            }),
        }
    }

    fn start_tag(&self, tag: &'a str) -> XmlResult<Token<'a>> {
        let inner = &tag[1..tag.len() - 1];
        let (inner, empty) = match inner.trim_end().strip_suffix('/') {
            Some(inner) => (inner, true),
            None => (inner, false),
        };

        let name_len = inner
            .find(|c: char| c.is_whitespace())
            .unwrap_or(inner.len());
        let name = &inner[..name_len];
        if name.is_empty() {
            return Err(self.error("missing tag name"));
        }

        let rest = &inner[name_len..];
        let mut attributes = Vec::new();
        let mut scanned = 0;
        for caps in ATTRIBUTE.captures_iter(rest) {
            let (Some(whole), Some(key), Some(value)) = (caps.get(0), caps.get(1), caps.get(2))
            else {
                continue;
            };
            let gap = &rest[scanned..whole.start()];
            if gap.is_empty() {
                return Err(XmlError::Format {
                    position: self.pos + 1 + name_len + scanned,
                    reason: "missing whitespace before attribute".to_string(),
                });
            }
            self.expect_blank(gap, 1 + name_len + scanned)?;
            attributes.push((key.as_str(), value.as_str()));
            scanned = whole.end();
        }
        self.expect_blank(&rest[scanned..], 1 + name_len + scanned)?;

        Ok(Token::Start {
            name,
            attributes,
            empty,
        })
    }

    fn next_token(&mut self) -> XmlResult<Option<(usize, Token<'a>)>> {
        let input = self.input;
        let rest = &input[self.pos..];
        if rest.is_empty() {
            return Ok(None);
        }
        let start = self.pos;

        if !rest.starts_with('<') {
            let len = rest.find('<').unwrap_or(rest.len());
            self.pos += len;
            return Ok(Some((start, Token::Text(&rest[..len]))));
        }

        let (len, token) = if rest.starts_with("<?") {
            let len = self.until(rest, 2, "?>")?;
            (len, Token::Declaration(&rest[..len]))
        } else if rest.starts_with("<!--") {
            let len = self.until(rest, 4, "-->")?;
            (len, Token::Comment(&rest[..len]))
        } else if rest.starts_with("<![CDATA[") {
            let len = self.until(rest, 9, "]]>")?;
            (len, Token::CData(&rest[..len]))
        } else if rest.starts_with("<!") {
            let len = self.doctype_len(rest)?;
            (len, Token::Doctype(&rest[..len]))
        } else if rest.starts_with("</") {
            let len = self.until(rest, 2, ">")?;
            let name = rest[2..len - 1].trim();
            if name.is_empty() {
                return Err(self.error("missing end tag name"));
            }
            (len, Token::End(name))
        } else {
            let len = self.tag_len(rest)?;
            (len, self.start_tag(&rest[..len])?)
        };

        self.pos += len;
        Ok(Some((start, token)))
    }
}

impl<'a> Iterator for Tokenizer<'a> {
    type Item = XmlResult<(usize, Token<'a>)>;

    fn next(&mut self) -> Option<Self::Item> {
        let item = self.next_token().transpose();
        if matches!(item, Some(Err(_))) {
            self.pos = self.input.len();
        }
        item
    }
}

struct Printer<'o> {
    options: &'o FormatOptions,
    lines: Vec<String>,
}

impl Printer<'_> {
    fn indent(&self, depth: usize) -> String {
        " ".repeat(depth * self.options.indent)
    }

    fn line(&mut self, depth: usize, content: &str) {
        let line = format!("{}{}", self.indent(depth), content);
        self.lines.push(line);
    }

    /// Render a start tag, wrapping attributes when the line gets too wide
    fn start_tag(&self, depth: usize, name: &str, attributes: &[(&str, &str)], close: &str) -> String {
        let mut one_line = format!("<{}", name);
        for (key, value) in attributes {
            one_line.push_str(&format!(" {}={}", key, value));
        }
        one_line.push_str(close);

        let width = depth * self.options.indent + one_line.chars().count();
        if width <= self.options.max_line_width || attributes.len() < 2 {
            return one_line;
        }

        let align = " ".repeat(depth * self.options.indent + name.chars().count() + 2);
        let mut wrapped = format!("<{}", name);
        for (i, (key, value)) in attributes.iter().enumerate() {
            if i == 0 {
                wrapped.push_str(&format!(" {}={}", key, value));
            } else {
                wrapped.push_str(&format!("\n{}{}={}", align, key, value));
            }
        }
        wrapped.push_str(close);
        wrapped
    }
}

/// Re-indent XML markup
pub fn pretty(input: &str, options: &FormatOptions) -> XmlResult<String> {
    let tokens: Vec<(usize, Token<'_>)> = Tokenizer::new(input).collect::<XmlResult<_>>()?;
    let mut printer = Printer {
        options,
        lines: Vec::new(),
    };
    let mut open: Vec<&str> = Vec::new();

    let mut i = 0;
    while i < tokens.len() {
        let (position, token) = &tokens[i];
        let depth = open.len();
        match token {
            Token::Declaration(raw) => {
                if options.keep_declaration || !raw.starts_with("<?xml") {
                    printer.line(depth, raw);
                }
            }
            Token::Comment(raw) => {
                if options.keep_comments {
                    printer.line(depth, raw);
                }
            }
            Token::CData(raw) | Token::Doctype(raw) => printer.line(depth, raw),
            Token::Text(raw) => {
                let text = raw.trim();
                if !text.is_empty() {
                    printer.line(depth, text);
                }
            }
            Token::Start {
                name,
                attributes,
                empty: true,
            } => {
                let tag = printer.start_tag(depth, name, attributes, "/>");
                printer.line(depth, &tag);
            }
            Token::Start {
                name,
                attributes,
                empty: false,
            } => {
                if let Some((content, consumed)) = inline_content(&tokens[i + 1..], name) {
                    let tag = printer.start_tag(depth, name, attributes, ">");
                    printer.line(depth, &format!("{}{}</{}>", tag, content, name));
                    i += consumed + 1;
                    continue;
                }
                let tag = printer.start_tag(depth, name, attributes, ">");
                printer.line(depth, &tag);
                open.push(name);
            }
            Token::End(name) => match open.pop() {
                Some(expected) if expected == *name => {
                    printer.line(open.len(), &format!("</{}>", name));
                }
                Some(expected) => {
                    return Err(XmlError::Format {
                        position: *position,
                        reason: format!("expected </{}>, found </{}>", expected, name),
                    });
                }
                None => {
                    return Err(XmlError::Format {
                        position: *position,
                        reason: format!("unexpected </{}>", name),
                    });
                }
            },
        }
        i += 1;
    }

    if let Some(unclosed) = open.last() {
        return Err(XmlError::Format {
            position: input.len(),
            reason: format!("unclosed element <{}>", unclosed),
        });
    }

    let mut output = printer.lines.join("\n");
    output.push('\n');
    Ok(output)
}

/// Text-only content up to the matching end tag, and how many tokens it spans
fn inline_content(tokens: &[(usize, Token<'_>)], name: &str) -> Option<(String, usize)> {
    let mut content = String::new();
    for (i, (_, token)) in tokens.iter().enumerate() {
        match token {
            Token::Text(raw) => content.push_str(raw),
            Token::CData(raw) => content.push_str(raw),
            Token::End(end) if *end == name => return Some((content.trim().to_string(), i + 1)),
            _ => return None,
        }
    }
    None
}
