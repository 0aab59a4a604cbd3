//! A logic-less, mustache-style template renderer.
//!
//! Supported tags:
//! - `{{name}}`, `{{a.b}}`, `{{.}}` -- variables (no HTML escaping; the
//!   output is a formula, not markup). `{{{name}}}` and `{{&name}}` are
//!   accepted as synonyms.
//! - `{{#name}}...{{/name}}` -- sections: arrays iterate, objects push
//!   context, other truthy values render once.
//! - `{{^name}}...{{/name}}` -- inverted sections, rendered when falsy.
//! - `{{! comment }}`.
//!
//! Section, inverted, close and comment tags that sit alone on a line remove
//! that whole line from the output. Partials and delimiter changes are
//! rejected.

use serde_json::Value;

use calcsetup_core::compare::{truthy, value_to_string};

use crate::types::TemplateError;

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Text(String),
    Var(String),
    Open { name: String, inverted: bool },
    Close(String),
    Comment,
}

impl Token {
    fn can_stand_alone(&self) -> bool {
        matches!(self, Self::Open { .. } | Self::Close(_) | Self::Comment)
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Node {
    Text(String),
    Var(String),
    Section {
        name: String,
        inverted: bool,
        children: Vec<Node>,
    },
}

/// A parsed template, reusable across renders.
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    nodes: Vec<Node>,
}

impl Template {
    pub fn parse(source: &str) -> Result<Self, TemplateError> {
        let mut tokens = tokenize(source)?;
        strip_standalone(&mut tokens);
        Ok(Self {
            nodes: build(tokens)?,
        })
    }

    pub fn render(&self, data: &Value) -> String {
        let mut out = String::new();
        let mut stack = vec![data];
        render_nodes(&self.nodes, &mut stack, &mut out);
        out
    }
}

/// Parses and renders in one step.
pub fn render(source: &str, data: &Value) -> Result<String, TemplateError> {
    Ok(Template::parse(source)?.render(data))
}

// ---------------------------------------------------------------------------
// Tokenizing
// ---------------------------------------------------------------------------

fn tokenize(src: &str) -> Result<Vec<Token>, TemplateError> {
    let mut tokens = Vec::new();
    let mut text_start = 0;
    let mut i = 0;

    while let Some(offset) = src[i..].find("{{") {
        let start = i + offset;
        if start > text_start {
            tokens.push(Token::Text(src[text_start..start].to_string()));
        }

        let end = if src[start..].starts_with("{{{") {
            let close = src[start + 3..]
                .find("}}}")
                .ok_or(TemplateError::UnclosedTag(start))?;
            let name = src[start + 3..start + 3 + close].trim();
            if name.is_empty() {
                return Err(TemplateError::EmptyTag(start));
            }
            tokens.push(Token::Var(name.to_string()));
            start + 3 + close + 3
        } else {
            let close = src[start + 2..]
                .find("}}")
                .ok_or(TemplateError::UnclosedTag(start))?;
            let inner = src[start + 2..start + 2 + close].trim();
            tokens.push(classify(inner, start)?);
            start + 2 + close + 2
        };

        i = end;
        text_start = end;
    }

    if text_start < src.len() {
        tokens.push(Token::Text(src[text_start..].to_string()));
    }
    Ok(tokens)
}

fn classify(inner: &str, position: usize) -> Result<Token, TemplateError> {
    let mut chars = inner.chars();
    let sigil = chars.next().ok_or(TemplateError::EmptyTag(position))?;
    let rest = chars.as_str().trim();
    let named = |name: &str| {
        if name.is_empty() {
            Err(TemplateError::EmptyTag(position))
        } else {
            Ok(name.to_string())
        }
    };

    match sigil {
        '#' => Ok(Token::Open {
            name: named(rest)?,
            inverted: false,
        }),
        '^' => Ok(Token::Open {
            name: named(rest)?,
            inverted: true,
        }),
        '/' => Ok(Token::Close(named(rest)?)),
        '!' => Ok(Token::Comment),
        '&' => Ok(Token::Var(named(rest)?)),
        '>' | '=' => Err(TemplateError::Unsupported(inner.to_string())),
        _ => Ok(Token::Var(inner.to_string())),
    }
}

// ---------------------------------------------------------------------------
// Standalone lines
// ---------------------------------------------------------------------------

fn is_blank(s: &str) -> bool {
    s.chars().all(|c| matches!(c, ' ' | '\t' | '\r'))
}

/// Nothing but indentation between the start of the line and token `k`.
fn left_clear(tokens: &[Token], k: usize) -> bool {
    if k == 0 {
        return true;
    }
    match &tokens[k - 1] {
        Token::Text(t) => match t.rfind('\n') {
            Some(p) => is_blank(&t[p + 1..]),
            None => k == 1 && is_blank(t),
        },
        _ => false,
    }
}

/// Nothing but whitespace between token `k` and the end of its line.
fn right_clear(tokens: &[Token], k: usize) -> bool {
    if k + 1 == tokens.len() {
        return true;
    }
    match &tokens[k + 1] {
        Token::Text(t) => match t.find('\n') {
            Some(p) => is_blank(&t[..p]),
            None => k + 2 == tokens.len() && is_blank(t),
        },
        _ => false,
    }
}

fn strip_standalone(tokens: &mut [Token]) {
    let standalone: Vec<bool> = (0..tokens.len())
        .map(|k| tokens[k].can_stand_alone() && left_clear(tokens, k) && right_clear(tokens, k))
        .collect();

    for (k, alone) in standalone.into_iter().enumerate() {
        if !alone {
            continue;
        }
        if k > 0 {
            if let Token::Text(t) = &mut tokens[k - 1] {
                let keep = t.trim_end_matches([' ', '\t']).len();
                t.truncate(keep);
            }
        }
        if k + 1 < tokens.len() {
            if let Token::Text(t) = &mut tokens[k + 1] {
                match t.find('\n') {
                    Some(p) => {
                        t.drain(..=p);
                    }
                    None => t.clear(),
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tree building
// ---------------------------------------------------------------------------

fn build(tokens: Vec<Token>) -> Result<Vec<Node>, TemplateError> {
    let mut stack: Vec<(String, bool, Vec<Node>)> = Vec::new();
    let mut current: Vec<Node> = Vec::new();

    for token in tokens {
        match token {
            Token::Text(t) => {
                if !t.is_empty() {
                    current.push(Node::Text(t));
                }
            }
            Token::Var(name) => current.push(Node::Var(name)),
            Token::Comment => {}
            Token::Open { name, inverted } => {
                stack.push((name, inverted, std::mem::take(&mut current)));
            }
            Token::Close(name) => {
                let Some((open, inverted, parent)) = stack.pop() else {
                    return Err(TemplateError::UnexpectedClose(name));
                };
                if open != name {
                    return Err(TemplateError::MismatchedClose {
                        expected: open,
                        found: name,
                    });
                }
                let children = std::mem::replace(&mut current, parent);
                current.push(Node::Section {
                    name,
                    inverted,
                    children,
                });
            }
        }
    }

    if let Some((name, _, _)) = stack.pop() {
        return Err(TemplateError::UnclosedSection(name));
    }
    Ok(current)
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

/// Resolves `name` against the context stack, innermost first. A dotted name
/// that is itself a key wins; otherwise its first segment resolves on the
/// stack and the rest by descent.
fn lookup<'a>(stack: &[&'a Value], name: &str) -> Option<&'a Value> {
    if name == "." {
        return stack.last().copied();
    }
    if name.contains('.') {
        let exact = stack
            .iter()
            .rev()
            .find_map(|ctx| ctx.as_object().and_then(|m| m.get(name)));
        if exact.is_some() {
            return exact;
        }
    }
    let mut parts = name.split('.');
    let first = parts.next()?;
    let mut value = stack
        .iter()
        .rev()
        .find_map(|ctx| ctx.as_object().and_then(|m| m.get(first)))?;
    for part in parts {
        value = value.as_object()?.get(part)?;
    }
    Some(value)
}

fn render_nodes<'a>(nodes: &[Node], stack: &mut Vec<&'a Value>, out: &mut String) {
    for node in nodes {
        match node {
            Node::Text(t) => out.push_str(t),
            Node::Var(name) => {
                if let Some(value) = lookup(stack, name) {
                    out.push_str(&value_to_string(value));
                }
            }
            Node::Section {
                name,
                inverted,
                children,
            } => {
                let value = lookup(stack, name);
                let is_truthy = value.is_some_and(|v| truthy(v));
                if *inverted {
                    if !is_truthy {
                        render_nodes(children, stack, out);
                    }
                    continue;
                }
                match value {
                    Some(Value::Array(items)) => {
                        for item in items {
                            stack.push(item);
                            render_nodes(children, stack, out);
                            stack.pop();
                        }
                    }
                    Some(v) if is_truthy => {
                        stack.push(v);
                        render_nodes(children, stack, out);
                        stack.pop();
                    }
                    _ => {}
                }
            }
        }
    }
}
