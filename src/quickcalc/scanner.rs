//! Declaration scanner.
//!
//! Locates `define name(...) { ... }` blocks and top-level `name = value`
//! statements inside a bc-style script without parsing it. Every offset
//! returned here is a byte offset into the exact `&str` that was scanned; an
//! edit to that string invalidates them.
//!
//! # Example
//!
//! ```rust
//! use quickcalc::scanner::{find_function_spans, find_variable_bindings};
//!
//! let text = "define f(x) {\n  a = x\n  return a\n}\na = 2\nf(a)";
//! let functions = find_function_spans(text);
//! assert_eq!(functions.len(), 1);
//!
//! // The `a = x` inside the function body is not a top-level binding.
//! let bindings = find_variable_bindings(text);
//! assert_eq!(bindings.len(), 1);
//! assert_eq!(bindings[0].value, "2");
//! ```

use lazy_static::lazy_static;
use regex::Regex;
use std::ops::Range;

lazy_static! {
    static ref FUNCTION_HEADING: Regex =
        Regex::new(r"define[\t ]+[a-z][a-z0-9_]*.*?\{").unwrap();
    static ref VARIABLE_DECLARATION: Regex = Regex::new(
        r"(?:\A|;|\n)[\t ]*(?P<name>[a-z][a-z0-9_]*)[\t ]*(?:\+|-|/|\*)?=[\t ]*(?P<value>[^;\n]*)"
    )
    .unwrap();
}

/// Half-open byte range `[start, end)` into one snapshot of a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextRange {
    pub start: usize,
    pub end: usize,
}

impl TextRange {
    pub fn new(start: usize, end: usize) -> Self {
        TextRange { start, end }
    }

    pub fn contains(&self, offset: usize) -> bool {
        self.start <= offset && offset < self.end
    }

    pub fn as_range(&self) -> Range<usize> {
        self.start..self.end
    }
}

impl From<Range<usize>> for TextRange {
    fn from(range: Range<usize>) -> Self {
        TextRange::new(range.start, range.end)
    }
}

/// Anything that covers a [`TextRange`] of the scanned text.
pub trait Spanned {
    fn range(&self) -> TextRange;
}

impl Spanned for TextRange {
    fn range(&self) -> TextRange {
        *self
    }
}

/// A `define` block, from the `define` keyword through its balancing `}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FunctionSpan {
    pub range: TextRange,
}

impl Spanned for FunctionSpan {
    fn range(&self) -> TextRange {
        self.range
    }
}

/// One top-level `name = value` statement.
///
/// `declaration` starts at the statement separator (`;` or newline) that
/// introduced the statement, or at offset 0 for the first statement, and ends
/// just before the separator that terminates it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariableBinding {
    pub name: String,
    pub value: String,
    pub declaration: TextRange,
}

impl Spanned for VariableBinding {
    fn range(&self) -> TextRange {
        self.declaration
    }
}

/// Returns every `define` block in `text`, left to right.
///
/// Brace counting starts at the first `{` after the function name. A block
/// whose braces never balance yields no span.
pub fn find_function_spans(text: &str) -> Vec<FunctionSpan> {
    let mut spans = Vec::new();

    for heading in FUNCTION_HEADING.find_iter(text) {
        // The heading ends with the opening brace.
        let open_brace = heading.end() - 1;
        match closing_brace(text, open_brace) {
            Some(close) => spans.push(FunctionSpan {
                range: TextRange::new(heading.start(), close + 1),
            }),
            None => log::trace!(
                "unterminated function body starting at offset {}",
                heading.start()
            ),
        }
    }

    spans
}

/// Offset of the `}` that balances the `{` at `open`, if any.
fn closing_brace(text: &str, open: usize) -> Option<usize> {
    let mut depth: usize = 0;
    for (offset, byte) in text.as_bytes()[open..].iter().enumerate() {
        match byte {
            b'{' => depth += 1,
            b'}' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(open + offset);
                }
            }
            _ => {}
        }
    }
    None
}

/// Returns the top-level variable declarations of `text` in source order.
///
/// Declarations that start inside a `define` block are skipped. Rebinding a
/// name produces another entry; nothing is deduplicated.
pub fn find_variable_bindings(text: &str) -> Vec<VariableBinding> {
    let functions = find_function_spans(text);
    find_variable_bindings_outside(text, &functions)
}

/// Same as [`find_variable_bindings`], reusing spans already computed for `text`.
pub fn find_variable_bindings_outside(
    text: &str,
    functions: &[FunctionSpan],
) -> Vec<VariableBinding> {
    VARIABLE_DECLARATION
        .captures_iter(text)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            if contained_in(whole.start(), functions) {
                return None;
            }
            Some(VariableBinding {
                name: caps["name"].to_string(),
                value: caps["value"].to_string(),
                declaration: whole.range().into(),
            })
        })
        .collect()
}

/// True if any of `spans` covers `offset`.
pub fn contained_in<S: Spanned>(offset: usize, spans: &[S]) -> bool {
    spans.iter().any(|span| span.range().contains(offset))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_line_function_span() {
        let text = "define f(x) { return x * 2 }";
        let spans = find_function_spans(text);
        assert_eq!(spans, vec![FunctionSpan { range: TextRange::new(0, text.len()) }]);
    }

    #[test]
    fn test_nested_braces_are_balanced() {
        let text = "1\ndefine g(x) { if (x > 1) { return 1 }\n return 0 }\ng(3)";
        let spans = find_function_spans(text);
        assert_eq!(spans.len(), 1);
        let body = &text[spans[0].range.as_range()];
        assert!(body.starts_with("define g"));
        assert!(body.ends_with("return 0 }"));
    }

    #[test]
    fn test_unbalanced_function_yields_nothing() {
        assert!(find_function_spans("define f(x) { return x").is_empty());
    }

    #[test]
    fn test_uppercase_define_is_not_a_function() {
        assert!(find_function_spans("DEFINE f(x) { return x }").is_empty());
    }

    #[test]
    fn test_declaration_range_includes_leading_separator() {
        let bindings = find_variable_bindings("a=5;b = 6");
        assert_eq!(bindings.len(), 2);
        assert_eq!(bindings[0].declaration, TextRange::new(0, 3));
        assert_eq!(bindings[1].declaration, TextRange::new(3, 9));
        assert_eq!(bindings[1].value, "6");
    }

    #[test]
    fn test_compound_assignment_is_a_declaration() {
        let bindings = find_variable_bindings("a = 1\na += 2\na *= 3");
        let values: Vec<&str> = bindings.iter().map(|b| b.value.as_str()).collect();
        assert_eq!(values, vec!["1", "2", "3"]);
    }

    #[test]
    fn test_expression_statement_is_not_a_declaration() {
        assert!(find_variable_bindings("a*2;b+1").is_empty());
    }

    #[test]
    fn test_contained_in_is_half_open() {
        let spans = [TextRange::new(2, 4)];
        assert!(!contained_in(1, &spans));
        assert!(contained_in(2, &spans));
        assert!(contained_in(3, &spans));
        assert!(!contained_in(4, &spans));
    }
}
