//! Checking of gradebook calculations.
//!
//! A calculation is `=` followed by an expression over numbers, `[[idnumber]]`
//! references and function calls. Checking is structural: references must
//! name known items and the expression must parse. Nothing is evaluated.

use std::collections::HashSet;

use crate::render::strip_whitespace;
use crate::types::FormulaError;

/// Collects every `[[idnumber]]` reference, in order of appearance.
pub fn extract_references(formula: &str) -> Vec<String> {
    let mut refs = Vec::new();
    let mut rest = formula;
    while let Some(open) = rest.find("[[") {
        let after = &rest[open + 2..];
        let Some(close) = after.find("]]") else {
            break;
        };
        refs.push(after[..close].to_string());
        rest = &after[close + 2..];
    }
    refs
}

/// Checks `formula` against the known idnumbers of the course.
///
/// `own_idnumber` is the idnumber of the item the calculation belongs to;
/// referring to it is a circular reference.
pub fn check_formula(
    formula: &str,
    idnumbers: &HashSet<String>,
    own_idnumber: Option<&str>,
) -> Result<(), FormulaError> {
    let formula = strip_whitespace(formula);
    let body = formula.strip_prefix('=').ok_or(FormulaError::MissingEquals)?;
    if body.is_empty() {
        return Err(FormulaError::Empty);
    }

    for reference in extract_references(body) {
        if own_idnumber.is_some_and(|own| !own.is_empty() && own == reference) {
            return Err(FormulaError::SelfReference(reference));
        }
        if !idnumbers.contains(&reference) {
            return Err(FormulaError::UnknownReference(reference));
        }
    }

    let tokens = lex(body, 1)?;
    Parser {
        tokens: &tokens,
        pos: 0,
        end: formula.len(),
    }
    .parse()
}

/// Convenience wrapper returning whether [`check_formula`] passes.
pub fn is_valid(formula: &str, idnumbers: &HashSet<String>, own_idnumber: Option<&str>) -> bool {
    check_formula(formula, idnumbers, own_idnumber).is_ok()
}

// ---------------------------------------------------------------------------
// Lexing
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
enum Tok {
    Number,
    Ref,
    Ident(String),
    Op(char),
    Cmp,
    LParen,
    RParen,
    Comma,
}

fn lex(body: &str, base: usize) -> Result<Vec<(usize, Tok)>, FormulaError> {
    let bytes = body.as_bytes();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        let pos = base + i;
        match bytes[i] {
            b'[' => {
                if !body[i..].starts_with("[[") {
                    return Err(FormulaError::syntax(pos, "expected '[['"));
                }
                let close = body[i + 2..]
                    .find("]]")
                    .ok_or_else(|| FormulaError::syntax(pos, "unterminated reference"))?;
                if close == 0 {
                    return Err(FormulaError::syntax(pos, "empty reference"));
                }
                tokens.push((pos, Tok::Ref));
                i += close + 4;
            }
            b'0'..=b'9' | b'.' => {
                let start = i;
                let mut seen_dot = false;
                while i < bytes.len() && (bytes[i].is_ascii_digit() || bytes[i] == b'.') {
                    if bytes[i] == b'.' {
                        if seen_dot {
                            return Err(FormulaError::syntax(base + i, "malformed number"));
                        }
                        seen_dot = true;
                    }
                    i += 1;
                }
                if &body[start..i] == "." {
                    return Err(FormulaError::syntax(pos, "malformed number"));
                }
                tokens.push((pos, Tok::Number));
            }
            b if b.is_ascii_alphabetic() || b == b'_' => {
                let start = i;
                while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_') {
                    i += 1;
                }
                tokens.push((pos, Tok::Ident(body[start..i].to_ascii_lowercase())));
            }
            b @ (b'+' | b'-' | b'*' | b'/' | b'^') => {
                tokens.push((pos, Tok::Op(b as char)));
                i += 1;
            }
            b'<' | b'>' => {
                i += if bytes.get(i + 1) == Some(&b'=') { 2 } else { 1 };
                tokens.push((pos, Tok::Cmp));
            }
            b @ (b'=' | b'!') => {
                if bytes.get(i + 1) != Some(&b'=') {
                    return Err(FormulaError::syntax(
                        pos,
                        format!("unexpected '{}'", b as char),
                    ));
                }
                i += 2;
                tokens.push((pos, Tok::Cmp));
            }
            b'(' => {
                tokens.push((pos, Tok::LParen));
                i += 1;
            }
            b')' => {
                tokens.push((pos, Tok::RParen));
                i += 1;
            }
            b',' => {
                tokens.push((pos, Tok::Comma));
                i += 1;
            }
            _ => {
                let ch = body[i..].chars().next().unwrap_or('?');
                return Err(FormulaError::syntax(
                    pos,
                    format!("unexpected character '{ch}'"),
                ));
            }
        }
    }

    Ok(tokens)
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// Argument count bounds for each known function.
fn arity(name: &str) -> Option<(usize, Option<usize>, &'static str)> {
    let bounds = match name {
        "average" | "max" | "min" | "sum" | "and" | "or" => (1, None, "at least 1"),
        "mod" | "power" => (2, Some(2), "2"),
        "round" => (1, Some(2), "1 or 2"),
        "floor" | "ceil" | "abs" | "sqrt" | "not" => (1, Some(1), "1"),
        "pi" => (0, Some(0), "0"),
        "if" => (3, Some(3), "3"),
        _ => return None,
    };
    Some(bounds)
}

struct Parser<'t> {
    tokens: &'t [(usize, Tok)],
    pos: usize,
    end: usize,
}

type ParseResult<T = ()> = Result<T, FormulaError>;

impl Parser<'_> {
    fn peek(&self) -> Option<&Tok> {
        self.tokens.get(self.pos).map(|(_, tok)| tok)
    }

    fn position(&self) -> usize {
        self.tokens.get(self.pos).map_or(self.end, |(p, _)| *p)
    }

    fn bump(&mut self) {
        self.pos += 1;
    }

    fn expect(&mut self, tok: &Tok, what: &str) -> ParseResult {
        if self.peek() == Some(tok) {
            self.bump();
            Ok(())
        } else {
            Err(FormulaError::syntax(self.position(), format!("expected {what}")))
        }
    }

    fn parse(mut self) -> ParseResult {
        self.comparison()?;
        if self.pos < self.tokens.len() {
            return Err(FormulaError::syntax(self.position(), "unexpected input"));
        }
        Ok(())
    }

    fn comparison(&mut self) -> ParseResult {
        self.additive()?;
        while self.peek() == Some(&Tok::Cmp) {
            self.bump();
            self.additive()?;
        }
        Ok(())
    }

    fn additive(&mut self) -> ParseResult {
        self.term()?;
        while matches!(self.peek(), Some(Tok::Op('+' | '-'))) {
            self.bump();
            self.term()?;
        }
        Ok(())
    }

    fn term(&mut self) -> ParseResult {
        self.power()?;
        while matches!(self.peek(), Some(Tok::Op('*' | '/'))) {
            self.bump();
            self.power()?;
        }
        Ok(())
    }

    // Right-associative.
    fn power(&mut self) -> ParseResult {
        self.unary()?;
        if self.peek() == Some(&Tok::Op('^')) {
            self.bump();
            self.power()?;
        }
        Ok(())
    }

    fn unary(&mut self) -> ParseResult {
        while matches!(self.peek(), Some(Tok::Op('+' | '-'))) {
            self.bump();
        }
        self.primary()
    }

    fn primary(&mut self) -> ParseResult {
        match self.peek().cloned() {
            Some(Tok::Number | Tok::Ref) => {
                self.bump();
                Ok(())
            }
            Some(Tok::LParen) => {
                self.bump();
                self.comparison()?;
                self.expect(&Tok::RParen, "')'")
            }
            Some(Tok::Ident(name)) => {
                let (min, max, expected) =
                    arity(&name).ok_or_else(|| FormulaError::UnknownFunction(name.clone()))?;
                self.bump();
                self.expect(&Tok::LParen, "'(' after function name")?;
                let found = self.arguments()?;
                if found < min || max.is_some_and(|max| found > max) {
                    return Err(FormulaError::Arity {
                        name,
                        expected,
                        found,
                    });
                }
                Ok(())
            }
            Some(_) => Err(FormulaError::syntax(self.position(), "unexpected token")),
            None => Err(FormulaError::syntax(self.end, "unexpected end of formula")),
        }
    }

    /// Parses a call's arguments after the opening parenthesis.
    fn arguments(&mut self) -> ParseResult<usize> {
        if self.peek() == Some(&Tok::RParen) {
            self.bump();
            return Ok(0);
        }
        let mut count = 0;
        loop {
            self.comparison()?;
            count += 1;
            match self.peek() {
                Some(Tok::Comma) => self.bump(),
                Some(Tok::RParen) => {
                    self.bump();
                    return Ok(count);
                }
                _ => {
                    return Err(FormulaError::syntax(
                        self.position(),
                        "expected ',' or ')'",
                    ));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn known() -> HashSet<String> {
        ["a1", "a2", "cat"].iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn references_in_order() {
        assert_eq!(
            extract_references("=SUM([[a1]],[[a2]])+[[a1]]"),
            vec!["a1", "a2", "a1"]
        );
        assert!(extract_references("=1+[[open").is_empty());
    }

    #[test]
    fn accepts_generated_formulas() {
        let ids = known();
        assert_eq!(check_formula("=MIN([[a1]],[[a2]])", &ids, Some("cat")), Ok(()));
        assert_eq!(
            check_formula(
                "=IF(OR([[a1]]<50,[[a2]]<5),0,100*SUM([[a1]]/100+[[a2]]/10)/2)",
                &ids,
                Some("cat")
            ),
            Ok(())
        );
        assert_eq!(check_formula(" = round( [[a1]] * 1.5 , 2 ) ", &ids, None), Ok(()));
        assert_eq!(check_formula("=-2^-[[a1]]>=pi()", &ids, None), Ok(()));
        assert!(is_valid("=Average([[a1]])", &ids, None));
    }

    #[test]
    fn requires_leading_equals() {
        assert_eq!(
            check_formula("MIN([[a1]])", &known(), None),
            Err(FormulaError::MissingEquals)
        );
        assert_eq!(check_formula(" = ", &known(), None), Err(FormulaError::Empty));
    }

    #[test]
    fn rejects_unknown_and_self_references() {
        assert_eq!(
            check_formula("=[[a1]]+[[zz]]", &known(), None),
            Err(FormulaError::UnknownReference("zz".into()))
        );
        assert_eq!(
            check_formula("=[[a1]]+[[cat]]", &known(), Some("cat")),
            Err(FormulaError::SelfReference("cat".into()))
        );
    }

    #[test]
    fn rejects_unbalanced_parentheses() {
        assert!(matches!(
            check_formula("=MIN([[a1]],[[a2]]", &known(), None),
            Err(FormulaError::Syntax { .. })
        ));
        assert!(matches!(
            check_formula("=([[a1]]))", &known(), None),
            Err(FormulaError::Syntax { .. })
        ));
    }

    #[test]
    fn checks_functions_and_arity() {
        assert_eq!(
            check_formula("=median([[a1]])", &known(), None),
            Err(FormulaError::UnknownFunction("median".into()))
        );
        assert_eq!(
            check_formula("=IF([[a1]],1)", &known(), None),
            Err(FormulaError::Arity {
                name: "if".into(),
                expected: "3",
                found: 2
            })
        );
        assert!(!is_valid("=MAX()", &known(), None));
    }

    #[test]
    fn rejects_stray_characters() {
        assert_eq!(
            check_formula("=[[a1]]=1", &known(), None),
            Err(FormulaError::syntax(7, "unexpected '='"))
        );
        assert!(!is_valid("=1..2", &known(), None));
        assert!(!is_valid("=[[a1]] [[a2]]", &known(), None));
        assert!(!is_valid("=1+", &known(), None));
    }
}
