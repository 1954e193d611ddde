//! CSS-like selector parsing and matching for the simulated DOM
//!
//! Supported: type, `*`, `#id`, `.class`, `[attr]`, `[attr="value"]`,
//! descendant and child (`>`) combinators, and selector lists (`a, b`).

use crate::common::{Error, Result};

use super::dom::{Document, NodeId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum AttrCondition {
    Exists { key: String },
    Eq { key: String, value: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Combinator {
    Descendant,
    Child,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct Compound {
    pub(crate) tag: Option<String>,
    pub(crate) id: Option<String>,
    pub(crate) classes: Vec<String>,
    pub(crate) attrs: Vec<AttrCondition>,
}

/// One compound plus the combinator linking it to the previous compound
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SelectorPart {
    pub(crate) combinator: Combinator,
    pub(crate) compound: Compound,
}

/// A parsed selector list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    alternatives: Vec<Vec<SelectorPart>>,
}

impl Selector {
    pub fn parse(source: &str) -> Result<Self> {
        Parser::new(source).parse_list()
    }

    /// Whether `node` matches any alternative
    pub fn matches(&self, doc: &Document, node: NodeId) -> bool {
        self.alternatives
            .iter()
            .any(|parts| !parts.is_empty() && matches_at(parts, parts.len() - 1, doc, node))
    }
}

fn matches_at(parts: &[SelectorPart], index: usize, doc: &Document, node: NodeId) -> bool {
    let part = &parts[index];
    if !compound_matches(&part.compound, doc, node) {
        return false;
    }
    if index == 0 {
        return true;
    }
    match part.combinator {
        Combinator::Child => doc
            .parent(node)
            .is_some_and(|parent| matches_at(parts, index - 1, doc, parent)),
        Combinator::Descendant => doc
            .ancestors(node)
            .any(|ancestor| matches_at(parts, index - 1, doc, ancestor)),
    }
}

fn compound_matches(compound: &Compound, doc: &Document, node: NodeId) -> bool {
    let Some(el) = doc.element(node) else {
        return false;
    };
    if let Some(tag) = &compound.tag {
        if !el.tag.eq_ignore_ascii_case(tag) {
            return false;
        }
    }
    if let Some(id) = &compound.id {
        if el.id.as_deref() != Some(id.as_str()) {
            return false;
        }
    }
    if !compound.classes.iter().all(|c| el.classes.contains(c)) {
        return false;
    }
    compound.attrs.iter().all(|cond| match cond {
        AttrCondition::Exists { key } => el.get_attr(key).is_some(),
        AttrCondition::Eq { key, value } => el.get_attr(key).as_deref() == Some(value.as_str()),
    })
}

struct Parser<'a> {
    source: &'a str,
    chars: Vec<char>,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            source,
            chars: source.chars().collect(),
            pos: 0,
        }
    }

    fn error(&self, reason: impl Into<String>) -> Error {
        Error::invalid_selector(self.source, &reason.into())
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    /// Skip whitespace, returning whether any was skipped
    fn skip_ws(&mut self) -> bool {
        let start = self.pos;
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
        self.pos > start
    }

    fn parse_list(mut self) -> Result<Selector> {
        let mut alternatives = Vec::new();
        loop {
            self.skip_ws();
            alternatives.push(self.parse_complex()?);
            self.skip_ws();
            match self.peek() {
                None => break,
                Some(',') => self.pos += 1,
                Some(c) => return Err(self.error(format!("unexpected '{}'", c))),
            }
        }
        Ok(Selector { alternatives })
    }

    fn parse_complex(&mut self) -> Result<Vec<SelectorPart>> {
        let mut parts = Vec::new();
        let mut combinator = Combinator::Descendant;
        loop {
            let compound = self.parse_compound()?;
            parts.push(SelectorPart {
                combinator,
                compound,
            });

            let had_ws = self.skip_ws();
            match self.peek() {
                None | Some(',') => break,
                Some('>') => {
                    self.pos += 1;
                    self.skip_ws();
                    combinator = Combinator::Child;
                }
                Some(_) if had_ws => combinator = Combinator::Descendant,
                Some(c) => return Err(self.error(format!("unexpected '{}'", c))),
            }
        }
        Ok(parts)
    }

    fn parse_compound(&mut self) -> Result<Compound> {
        let start = self.pos;
        let mut compound = Compound::default();

        match self.peek() {
            // `*` matches any tag, same as no tag at all
            Some('*') => self.pos += 1,
            Some(c) if is_ident_char(c) => {
                compound.tag = Some(self.ident()?.to_ascii_lowercase());
            }
            _ => {}
        }

        loop {
            match self.peek() {
                Some('#') => {
                    self.pos += 1;
                    compound.id = Some(self.ident()?);
                }
                Some('.') => {
                    self.pos += 1;
                    compound.classes.push(self.ident()?);
                }
                Some('[') => {
                    self.pos += 1;
                    compound.attrs.push(self.parse_attr()?);
                }
                _ => break,
            }
        }

        if self.pos == start {
            return Err(match self.peek() {
                Some(c) => self.error(format!("expected a selector, found '{}'", c)),
                None => self.error("expected a selector"),
            });
        }
        Ok(compound)
    }

    fn parse_attr(&mut self) -> Result<AttrCondition> {
        self.skip_ws();
        let key = self.ident()?.to_ascii_lowercase();
        self.skip_ws();
        let condition = match self.peek() {
            Some(']') => AttrCondition::Exists { key },
            Some('=') => {
                self.pos += 1;
                self.skip_ws();
                let value = match self.peek() {
                    Some(q @ ('"' | '\'')) => self.quoted(q)?,
                    _ => self.ident()?,
                };
                self.skip_ws();
                AttrCondition::Eq { key, value }
            }
            _ => return Err(self.error("only [attr] and [attr=value] are supported")),
        };
        if self.peek() != Some(']') {
            return Err(self.error("unterminated attribute selector"));
        }
        self.pos += 1;
        Ok(condition)
    }

    fn ident(&mut self) -> Result<String> {
        let start = self.pos;
        while self.peek().is_some_and(is_ident_char) {
            self.pos += 1;
        }
        if self.pos == start {
            return Err(self.error("expected an identifier"));
        }
        Ok(self.chars[start..self.pos].iter().collect())
    }

    fn quoted(&mut self, quote: char) -> Result<String> {
        self.pos += 1;
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c == quote {
                let value = self.chars[start..self.pos].iter().collect();
                self.pos += 1;
                return Ok(value);
            }
            self.pos += 1;
        }
        Err(self.error("unterminated string"))
    }
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '-' || c == '_'
}
