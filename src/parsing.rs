use pest::Parser;

use crate::kunit_error::{KError, KResult};

#[derive(Parser)]
#[grammar = "deck.pest"]
pub(crate) struct DeckParser;

/// Parse a trimmed numeric literal such as `-1.5`, `.25`, `3.4E-6` or `1.0d+3`.
pub(crate) fn parse_real(s: &str) -> KResult<f64> {
    let field = DeckParser::parse(Rule::real_field, s)
        .map_err(|e| KError::from_pest(e, s))?
        .next()
        .ok_or_else(|| malformed(s))?;

    // Rebuild the literal in a form `str::parse` accepts (Fortran `d` exponents become `e`)
    let mut literal = String::with_capacity(s.len() + 1);
    let mut stack: Vec<_> = field.into_inner().rev().collect();
    while let Some(pair) = stack.pop() {
        match pair.as_rule() {
            Rule::real | Rule::exponent => {
                for inner in pair.into_inner().rev() {
                    stack.push(inner);
                }
            },
            Rule::sign | Rule::mantissa => literal.push_str(pair.as_str()),
            Rule::exp_value => {
                literal.push('e');
                literal.push_str(pair.as_str());
            },
            Rule::EOI => break,
            Rule::exp_marker => continue,
            Rule::real_field | Rule::keyword_line | Rule::keyword_name => return Err(malformed(s)),
        }
    }

    let v: f64 = literal.parse().map_err(|_| malformed(s))?;
    if v.is_finite() {
        Ok(v)
    } else {
        Err(malformed(s))
    }
}

/// Normalized name of a keyword line (`*` plus the upper-cased name), or `None`
/// if the line is not a well-formed keyword line.
pub(crate) fn keyword_name(line: &str) -> Option<String> {
    let line = line.trim();
    let kw = DeckParser::parse(Rule::keyword_line, line).ok()?.next()?;
    let name = kw.into_inner().find(|p| p.as_rule() == Rule::keyword_name)?;
    Some(format!("*{}", name.as_str().to_ascii_uppercase()))
}

fn malformed(s: &str) -> KError {
    KError::MalformedField { text: s.to_string(), location: None }
}
