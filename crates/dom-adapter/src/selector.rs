//! CSS selector subset used to re-find elements.
//!
//! Supported: `tag`, `*`, `:scope`, `#id`, `.class`, `[attr]`, `[attr="v"]`,
//! `[attr*="v"]`, `[attr^="v"]`, `:nth-of-type(n)`, and the child (`>`) and
//! descendant (whitespace) combinators. Backslash escapes are honoured in
//! attribute names, class names and quoted values.

use crate::errors::DomError;
use crate::types::NodeId;

/// Read-only tree view a selector can be evaluated against.
pub trait SelectorTree {
    fn is_element(&self, node: NodeId) -> bool;
    fn tag(&self, node: NodeId) -> Option<String>;
    fn attr(&self, node: NodeId, name: &str) -> Option<String>;
    /// Parent inside the same tree; `None` at a document node or shadow root.
    fn tree_parent(&self, node: NodeId) -> Option<NodeId>;
    fn element_children(&self, node: NodeId) -> Vec<NodeId>;
}

#[derive(Clone, Debug, PartialEq)]
pub enum AttrOp {
    Exists,
    Equals(String),
    Contains(String),
    Prefix(String),
}

#[derive(Clone, Debug, PartialEq)]
pub struct AttrSelector {
    pub name: String,
    pub op: AttrOp,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Compound {
    pub scope: bool,
    pub tag: Option<String>,
    pub classes: Vec<String>,
    pub attrs: Vec<AttrSelector>,
    pub nth_of_type: Option<usize>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Combinator {
    Child,
    Descendant,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Selector {
    compounds: Vec<Compound>,
    combinators: Vec<Combinator>,
}

impl Selector {
    pub fn parse(input: &str) -> Result<Self, DomError> {
        Parser::new(input).parse()
    }

    pub fn compounds(&self) -> &[Compound] {
        &self.compounds
    }

    pub fn matches<T: SelectorTree + ?Sized>(&self, tree: &T, node: NodeId, scope: NodeId) -> bool {
        if self.compounds.is_empty() {
            return false;
        }
        self.matches_at(tree, node, self.compounds.len() - 1, scope)
    }

    fn matches_at<T: SelectorTree + ?Sized>(
        &self,
        tree: &T,
        node: NodeId,
        idx: usize,
        scope: NodeId,
    ) -> bool {
        if !compound_matches(tree, node, &self.compounds[idx], scope) {
            return false;
        }
        if idx == 0 {
            return true;
        }
        match self.combinators[idx - 1] {
            Combinator::Child => tree
                .tree_parent(node)
                .map_or(false, |parent| self.matches_at(tree, parent, idx - 1, scope)),
            Combinator::Descendant => {
                let mut current = tree.tree_parent(node);
                while let Some(ancestor) = current {
                    if self.matches_at(tree, ancestor, idx - 1, scope) {
                        return true;
                    }
                    current = tree.tree_parent(ancestor);
                }
                false
            }
        }
    }
}

/// First descendant of `scope` (document order) matching `selector`.
pub fn query_first<T: SelectorTree + ?Sized>(
    tree: &T,
    scope: NodeId,
    selector: &Selector,
) -> Option<NodeId> {
    let mut stack: Vec<NodeId> = tree.element_children(scope).into_iter().rev().collect();
    while let Some(node) = stack.pop() {
        if selector.matches(tree, node, scope) {
            return Some(node);
        }
        stack.extend(tree.element_children(node).into_iter().rev());
    }
    None
}

pub fn query_all<T: SelectorTree + ?Sized>(
    tree: &T,
    scope: NodeId,
    selector: &Selector,
) -> Vec<NodeId> {
    let mut found = Vec::new();
    let mut stack: Vec<NodeId> = tree.element_children(scope).into_iter().rev().collect();
    while let Some(node) = stack.pop() {
        if selector.matches(tree, node, scope) {
            found.push(node);
        }
        stack.extend(tree.element_children(node).into_iter().rev());
    }
    found
}

fn compound_matches<T: SelectorTree + ?Sized>(
    tree: &T,
    node: NodeId,
    compound: &Compound,
    scope: NodeId,
) -> bool {
    if compound.scope {
        return node == scope;
    }
    if !tree.is_element(node) {
        return false;
    }
    if let Some(tag) = &compound.tag {
        if tree.tag(node).as_deref() != Some(tag.as_str()) {
            return false;
        }
    }
    if !compound.classes.is_empty() {
        let class_attr = tree.attr(node, "class").unwrap_or_default();
        let tokens: Vec<&str> = class_attr.split_whitespace().collect();
        if !compound.classes.iter().all(|c| tokens.contains(&c.as_str())) {
            return false;
        }
    }
    for attr in &compound.attrs {
        let Some(actual) = tree.attr(node, &attr.name) else {
            return false;
        };
        let ok = match &attr.op {
            AttrOp::Exists => true,
            AttrOp::Equals(expected) => &actual == expected,
            AttrOp::Contains(expected) => !expected.is_empty() && actual.contains(expected.as_str()),
            AttrOp::Prefix(expected) => !expected.is_empty() && actual.starts_with(expected.as_str()),
        };
        if !ok {
            return false;
        }
    }
    if let Some(nth) = compound.nth_of_type {
        if nth_of_type(tree, node) != Some(nth) {
            return false;
        }
    }
    true
}

/// 1-based position among same-tag element siblings.
pub fn nth_of_type<T: SelectorTree + ?Sized>(tree: &T, node: NodeId) -> Option<usize> {
    let tag = tree.tag(node)?;
    let parent = tree.tree_parent(node)?;
    tree.element_children(parent)
        .into_iter()
        .filter(|sibling| tree.tag(*sibling).as_deref() == Some(tag.as_str()))
        .position(|sibling| sibling == node)
        .map(|pos| pos + 1)
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

    fn error(&self, reason: impl Into<String>) -> DomError {
        DomError::invalid_selector(self.source, reason)
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.peek();
        if ch.is_some() {
            self.pos += 1;
        }
        ch
    }

    fn skip_ws(&mut self) -> bool {
        let start = self.pos;
        while matches!(self.peek(), Some(c) if c.is_whitespace()) {
            self.pos += 1;
        }
        self.pos > start
    }

    fn parse(mut self) -> Result<Selector, DomError> {
        let mut compounds = Vec::new();
        let mut combinators = Vec::new();
        self.skip_ws();
        if self.peek().is_none() {
            return Err(self.error("empty selector"));
        }
        compounds.push(self.compound()?);
        loop {
            let had_ws = self.skip_ws();
            match self.peek() {
                None => break,
                Some('>') => {
                    self.bump();
                    self.skip_ws();
                    combinators.push(Combinator::Child);
                }
                Some(_) if had_ws => combinators.push(Combinator::Descendant),
                Some(other) => return Err(self.error(format!("unexpected '{other}'"))),
            }
            compounds.push(self.compound()?);
        }
        Ok(Selector {
            compounds,
            combinators,
        })
    }

    fn compound(&mut self) -> Result<Compound, DomError> {
        let mut compound = Compound::default();
        let start = self.pos;
        match self.peek() {
            Some('*') => {
                self.bump();
            }
            Some(c) if c.is_ascii_alphabetic() => {
                let tag = self.word(|c| c.is_ascii_alphanumeric() || c == '-');
                compound.tag = Some(tag.to_ascii_lowercase());
            }
            _ => {}
        }
        loop {
            match self.peek() {
                Some('.') => {
                    self.bump();
                    let class = self.escaped_ident(|c| c.is_alphanumeric() || c == '-' || c == '_')?;
                    if class.is_empty() {
                        return Err(self.error("empty class name"));
                    }
                    compound.classes.push(class);
                }
                Some('#') => {
                    self.bump();
                    let id = self.escaped_ident(|c| c.is_alphanumeric() || c == '-' || c == '_')?;
                    if id.is_empty() {
                        return Err(self.error("empty id"));
                    }
                    compound.attrs.push(AttrSelector {
                        name: "id".to_string(),
                        op: AttrOp::Equals(id),
                    });
                }
                Some('[') => {
                    self.bump();
                    compound.attrs.push(self.attribute()?);
                }
                Some(':') => {
                    self.bump();
                    let name = self.word(|c| c.is_ascii_alphanumeric() || c == '-');
                    match name.as_str() {
                        "scope" => compound.scope = true,
                        "nth-of-type" => compound.nth_of_type = Some(self.nth_argument()?),
                        other => return Err(self.error(format!("unsupported pseudo-class ':{other}'"))),
                    }
                }
                _ => break,
            }
        }
        if self.pos == start {
            return Err(self.error(format!("expected selector at offset {}", self.pos)));
        }
        Ok(compound)
    }

    fn word(&mut self, accept: impl Fn(char) -> bool) -> String {
        let mut out = String::new();
        while let Some(c) = self.peek() {
            if !accept(c) {
                break;
            }
            out.push(c);
            self.pos += 1;
        }
        out
    }

    fn escaped_ident(&mut self, accept: impl Fn(char) -> bool) -> Result<String, DomError> {
        let mut out = String::new();
        while let Some(c) = self.peek() {
            if c == '\\' {
                self.bump();
                let escaped = self.bump().ok_or_else(|| self.error("dangling escape"))?;
                out.push(escaped);
            } else if accept(c) {
                out.push(c);
                self.pos += 1;
            } else {
                break;
            }
        }
        Ok(out)
    }

    fn attribute(&mut self) -> Result<AttrSelector, DomError> {
        self.skip_ws();
        let name = self.escaped_ident(|c| !matches!(c, '=' | '*' | '^' | ']' | ' '))?;
        if name.is_empty() {
            return Err(self.error("empty attribute name"));
        }
        self.skip_ws();
        let op = match self.bump() {
            Some(']') => {
                return Ok(AttrSelector {
                    name,
                    op: AttrOp::Exists,
                })
            }
            Some('=') => AttrOp::Equals(self.attr_value()?),
            Some('*') => {
                self.expect('=')?;
                AttrOp::Contains(self.attr_value()?)
            }
            Some('^') => {
                self.expect('=')?;
                AttrOp::Prefix(self.attr_value()?)
            }
            _ => return Err(self.error("malformed attribute selector")),
        };
        self.skip_ws();
        self.expect(']')?;
        Ok(AttrSelector { name, op })
    }

    fn attr_value(&mut self) -> Result<String, DomError> {
        self.skip_ws();
        let quote = match self.peek() {
            Some(q @ ('"' | '\'')) => {
                self.bump();
                q
            }
            _ => return self.escaped_ident(|c| c.is_alphanumeric() || c == '-' || c == '_'),
        };
        let mut out = String::new();
        loop {
            match self.bump() {
                None => return Err(self.error("unterminated string")),
                Some('\\') => {
                    let escaped = self.bump().ok_or_else(|| self.error("dangling escape"))?;
                    out.push(escaped);
                }
                Some(c) if c == quote => break,
                Some(c) => out.push(c),
            }
        }
        Ok(out)
    }

    fn nth_argument(&mut self) -> Result<usize, DomError> {
        self.expect('(')?;
        self.skip_ws();
        let digits = self.word(|c| c.is_ascii_digit());
        self.skip_ws();
        self.expect(')')?;
        let n: usize = digits
            .parse()
            .map_err(|_| self.error("nth-of-type expects a positive integer"))?;
        if n == 0 {
            return Err(self.error("nth-of-type is 1-based"));
        }
        Ok(n)
    }

    fn expect(&mut self, expected: char) -> Result<(), DomError> {
        match self.bump() {
            Some(c) if c == expected => Ok(()),
            _ => Err(self.error(format!("expected '{expected}'"))),
        }
    }
}

/// Escape an attribute name for use inside `[...]`.
pub fn escape_attr_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.chars() {
        if matches!(c, ':' | '\\' | '[' | ']' | '=' | '*' | '^' | ' ') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Escape a value for use inside a double-quoted attribute selector.
pub fn escape_attr_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '"' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}
