//! # Query Rewriter
//!
//! Turns loosely typed calculator input into a program `bc -l` accepts.
//!
//! ## Pipeline
//!
//! [`rewrite`] applies the stages below strictly in this order. Every stage is
//! a total `&str -> String` function, so each one can be tested on its own:
//!
//! 1. [`balance_parentheses`] - `2+3)` becomes `(2+3)`, `(2+3` becomes `(2+3)`
//! 2. trim surrounding whitespace
//! 3. [`remove_trailing_operators`] - `5+` becomes `5`, `3x` becomes `3`
//! 4. prepend the user's custom definitions
//! 5. [`convert_thousands_suffixes`] - `5k` becomes `5*1000`
//! 6. [`replace_variables`] - `a=5;a*2` becomes `a=5;5*2`
//! 7. [`of_to_multiplication`] - `20% of 50` becomes `20%*50`
//! 8. [`x_to_multiplication`] - `3 x 4` becomes `3 * 4`
//! 9. [`remove_superfluous_characters`] - `$1,000` becomes `1000`
//! 10. [`convert_percents`] - `100+10%` becomes `100*1.1`
//! 11. [`normalize_symbols`] - `π` becomes `pi`, `**` becomes `^`
//! 12. prepend the default function library
//!
//! ```rust
//! use quickcalc::rewriter::rewrite;
//!
//! let program = rewrite("$5k + 10%", "", "");
//! assert_eq!(program, "\n\n5*1000 *1.1");
//! ```

use crate::quickcalc::scanner::{
    contained_in, find_function_spans, find_variable_bindings_outside, TextRange,
    VariableBinding,
};
use lazy_static::lazy_static;
use num_bigint::BigInt;
use num_traits::Signed;
use regex::{Captures, Regex};

lazy_static! {
    static ref THOUSANDS_SUFFIX: Regex = Regex::new(
        r"(?P<number>[+-]?(?:[0-9]*\.[0-9]+|[0-9]+))(?P<suffix>k|m|b| thousand| million| billion)"
    )
    .unwrap();
    static ref OF_OPERATOR: Regex = Regex::new(r"[\t ]+of[\t ]+").unwrap();
    static ref X_OPERATOR: Regex = Regex::new(
        r"(?P<left>(?:[0-9]*\.[0-9]+|[0-9]+)%?[\t ]*|[()][\t ]*)x(?P<right>[\t ]*[()]|[\t ]*(?:[0-9]*\.[0-9]+|[0-9]+)%?)"
    )
    .unwrap();
    static ref DIGIT_GAP: Regex = Regex::new(r"(?P<left>[0-9]+)[\t ]+(?P<right>[0-9]+)").unwrap();
    static ref DIGIT_UNDERSCORE: Regex = Regex::new(r"(?P<digit>[0-9])_").unwrap();
    static ref SIGNED_PERCENT: Regex =
        Regex::new(r"(?P<sign>[+-])[\t ]*(?P<number>[0-9]*\.[0-9]+|[0-9]+)%").unwrap();
    static ref BARE_PERCENT: Regex = Regex::new(r"(?P<number>[0-9]*\.[0-9]+|[0-9]+)%").unwrap();
    static ref NUMERIC_LITERAL: Regex =
        Regex::new(r"\A[+-]?(?:[0-9]*\.[0-9]+|[0-9]+)%?\z").unwrap();
    static ref IDENTIFIER: Regex = Regex::new(r"[a-z][a-z0-9_]*").unwrap();
}

/// Characters that leave an expression dangling when they end it.
const TRAILING_OPERATORS: [char; 6] = ['+', '-', '/', '*', '^', '('];

const CURRENCY_SIGNS: [char; 3] = ['$', '£', '€'];

/// Runs the full pipeline and returns the program to hand to the evaluator.
///
/// `custom_definitions` is placed ahead of the query before any shorthand
/// expansion, so the user's own variables and functions take part in
/// variable substitution. `default_functions` is prepended last, untouched.
pub fn rewrite(raw_query: &str, custom_definitions: &str, default_functions: &str) -> String {
    let mut query = traced("balance_parentheses", balance_parentheses(raw_query));
    query = traced("trim", query.trim().to_string());
    query = traced("remove_trailing_operators", remove_trailing_operators(&query));
    query = traced("custom_definitions", prepend(custom_definitions, &query));
    query = traced("thousands_suffixes", convert_thousands_suffixes(&query));
    query = traced("replace_variables", replace_variables(&query));
    query = traced("of_to_multiplication", of_to_multiplication(&query));
    query = traced("x_to_multiplication", x_to_multiplication(&query));
    query = traced("superfluous_characters", remove_superfluous_characters(&query));
    query = traced("convert_percents", convert_percents(&query));
    query = traced("normalize_symbols", normalize_symbols(&query));

    let program = prepend(default_functions, &query);
    log::debug!("rewrote {:?} into {:?}", raw_query, query);
    program
}

fn traced(stage: &str, query: String) -> String {
    log::trace!("{}: {:?}", stage, query);
    query
}

/// Joins two script fragments with a newline, `prefix` first.
pub fn prepend(prefix: &str, query: &str) -> String {
    let mut joined = String::with_capacity(prefix.len() + query.len() + 1);
    joined.push_str(prefix);
    joined.push('\n');
    joined.push_str(query);
    joined
}

/// Auto-closes parentheses so a half-typed expression still evaluates.
///
/// Every `)` without a matching `(` gets a `(` inserted at the start of the
/// last statement (just after the last `;`, so a declaration is never wrapped).
/// Unclosed `(` are closed at the end. Only insertions are made.
pub fn balance_parentheses(query: &str) -> String {
    let insertion_point = query.rfind(';').map_or(0, |semicolon| semicolon + 1);

    let mut open = 0usize;
    let mut closed = 0usize;
    let mut missing_open = 0usize;
    for ch in query.chars() {
        match ch {
            '(' => open += 1,
            ')' => {
                closed += 1;
                if closed > open {
                    missing_open += 1;
                    open += 1;
                }
            }
            _ => {}
        }
    }
    let missing_close = open - closed;

    let mut balanced = String::with_capacity(query.len() + missing_open + missing_close);
    balanced.push_str(&query[..insertion_point]);
    balanced.extend(std::iter::repeat('(').take(missing_open));
    balanced.push_str(&query[insertion_point..]);
    balanced.extend(std::iter::repeat(')').take(missing_close));
    balanced
}

/// Drops operators left dangling at the end of the query, one at a time.
///
/// A final `x` counts as multiplication only when the character before it is
/// not `[a-z_]`, so `3x` loses its `x` while `tax` keeps it.
pub fn remove_trailing_operators(query: &str) -> String {
    let mut end = query.len();

    loop {
        let mut tail = query[..end].chars().rev();
        let last = match tail.next() {
            Some(ch) => ch,
            None => break,
        };
        let dangling = TRAILING_OPERATORS.contains(&last)
            || (last == 'x'
                && tail
                    .next()
                    .map_or(false, |before| !(before.is_ascii_lowercase() || before == '_')));
        if !dangling {
            break;
        }
        end -= last.len_utf8();
    }

    query[..end].to_string()
}

/// Expands `k`/`m`/`b` and `thousand`/`million`/`billion` after a number.
pub fn convert_thousands_suffixes(query: &str) -> String {
    THOUSANDS_SUFFIX
        .replace_all(query, |caps: &Captures| {
            let multiplier = match &caps["suffix"] {
                "k" | " thousand" => "1000",
                "m" | " million" => "1000000",
                _ => "1000000000",
            };
            format!("{}*{}", &caps["number"], multiplier)
        })
        .into_owned()
}

/// Inlines variable values into the statements that follow each declaration.
///
/// An occurrence between a declaration and the next declaration (of any name)
/// resolves to the latest binding of that name declared so far. Occurrences
/// inside `define` blocks or inside declarations themselves are left alone.
/// Identifiers in an inlined value resolve against the bindings declared
/// before that value's own declaration, so `a=2; a=a+1; a` inlines `(2+1)`.
///
/// All offsets come from one scan of `query`; the result is assembled into a
/// fresh string so no range is read after an edit.
pub fn replace_variables(query: &str) -> String {
    let functions = find_function_spans(query);
    let bindings = find_variable_bindings_outside(query, &functions);
    if bindings.is_empty() {
        return query.to_string();
    }

    let mut replacements: Vec<String> = Vec::with_capacity(bindings.len());
    for (index, binding) in bindings.iter().enumerate() {
        let replacement = substitution_text(binding, &bindings[..index], &replacements);
        replacements.push(replacement);
    }

    let mut substitutions: Vec<(TextRange, &str)> = Vec::new();
    for (index, binding) in bindings.iter().enumerate() {
        let window_start = binding.declaration.end;
        let window_end = bindings
            .get(index + 1)
            .map_or(query.len(), |next| next.declaration.start);
        if window_start >= window_end {
            continue;
        }

        for occurrence in identifier_occurrences(query, window_start, window_end) {
            if contained_in(occurrence.start, &functions)
                || contained_in(occurrence.start, &bindings)
            {
                continue;
            }
            let name = &query[occurrence.as_range()];
            if let Some(latest) = latest_binding(name, &bindings[..=index]) {
                substitutions.push((occurrence, replacements[latest].as_str()));
            }
        }
    }

    log::trace!("substituting {} variable occurrence(s)", substitutions.len());
    splice(query, &substitutions)
}

/// Index of the last binding called `name`.
fn latest_binding(name: &str, bindings: &[VariableBinding]) -> Option<usize> {
    bindings.iter().rposition(|binding| binding.name == name)
}

/// Whole identifiers starting inside `[start, end)`.
///
/// A match must not follow `[a-z0-9_]` and must not be followed by a word
/// character (`[A-Za-z0-9_]`).
fn identifier_occurrences(text: &str, start: usize, end: usize) -> Vec<TextRange> {
    IDENTIFIER
        .find_iter(&text[start..end])
        .map(|found| TextRange::new(start + found.start(), start + found.end()))
        .filter(|range| {
            let joined_before = text[..range.start]
                .chars()
                .next_back()
                .map_or(false, |ch| ch.is_ascii_lowercase() || ch.is_ascii_digit() || ch == '_');
            let joined_after = text[range.end..]
                .chars()
                .next()
                .map_or(false, |ch| ch.is_ascii_alphanumeric() || ch == '_');
            !joined_before && !joined_after
        })
        .collect()
}

/// The text inlined for `binding`.
///
/// Numeric values go in bare; anything else is parenthesised to keep
/// precedence, with its identifiers resolved against `earlier` bindings whose
/// inlined texts are `earlier_replacements`.
fn substitution_text(
    binding: &VariableBinding,
    earlier: &[VariableBinding],
    earlier_replacements: &[String],
) -> String {
    let value = binding.value.trim();
    if NUMERIC_LITERAL.is_match(value) {
        return value.to_string();
    }

    let substitutions: Vec<(TextRange, &str)> = identifier_occurrences(value, 0, value.len())
        .into_iter()
        .filter_map(|occurrence| {
            latest_binding(&value[occurrence.as_range()], earlier)
                .map(|latest| (occurrence, earlier_replacements[latest].as_str()))
        })
        .collect();
    format!("({})", splice(value, &substitutions))
}

/// Builds a new string with each range replaced. Ranges must be sorted and disjoint.
fn splice(query: &str, substitutions: &[(TextRange, &str)]) -> String {
    let mut spliced = String::with_capacity(query.len());
    let mut cursor = 0;
    for (range, replacement) in substitutions {
        spliced.push_str(&query[cursor..range.start]);
        spliced.push_str(replacement);
        cursor = range.end;
    }
    spliced.push_str(&query[cursor..]);
    spliced
}

/// `20% of 50` reads as `20%*50`.
pub fn of_to_multiplication(query: &str) -> String {
    OF_OPERATOR.replace_all(query, "*").into_owned()
}

/// Treats `x` between two operands as multiplication, keeping the operands.
///
/// Operands are a number (optionally with `%`) or a parenthesis. Repeated
/// until no candidate remains, so chains such as `2x3x4` are fully converted.
pub fn x_to_multiplication(query: &str) -> String {
    replace_until_stable(query, &X_OPERATOR, "${left}*${right}")
}

/// Removes input conveniences bc would choke on.
///
/// - whitespace between two digit runs: `12 345` becomes `12345`
/// - commas not followed by a space: `1,000` becomes `1000`, `max(1, 2)` is kept
/// - currency signs `$`, `£`, `€`
/// - an underscore right after a digit: `1_000` becomes `1000`, `my_var` is kept
pub fn remove_superfluous_characters(query: &str) -> String {
    let joined = replace_until_stable(query, &DIGIT_GAP, "${left}${right}");

    let mut cleaned = String::with_capacity(joined.len());
    let mut chars = joined.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch == ',' && chars.peek() != Some(&' ') {
            continue;
        }
        if CURRENCY_SIGNS.contains(&ch) {
            continue;
        }
        cleaned.push(ch);
    }

    DIGIT_UNDERSCORE.replace_all(&cleaned, "${digit}").into_owned()
}

/// Converts percentages into plain multipliers and fractions.
///
/// `+N%` becomes `*(1 + N/100)` and `-N%` becomes `*(1 - N/100)`, both written
/// out as decimal literals. Any other `N%` becomes `N/100`. The arithmetic is
/// exact on the typed digits, so `100-7%` becomes `100*0.93`.
pub fn convert_percents(query: &str) -> String {
    let relative = SIGNED_PERCENT.replace_all(query, |caps: &Captures| {
        let (digits, scale) = percent_fraction(&caps["number"]);
        let one = num_traits::pow(BigInt::from(10), scale);
        let factor = if &caps["sign"] == "+" {
            one + digits
        } else {
            one - digits
        };
        format!("*{}", decimal_literal(&factor, scale))
    });

    BARE_PERCENT
        .replace_all(&relative, |caps: &Captures| {
            let (digits, scale) = percent_fraction(&caps["number"]);
            decimal_literal(&digits, scale)
        })
        .into_owned()
}

/// Splits a percent literal into `digits / 10^scale`, already divided by 100.
fn percent_fraction(number: &str) -> (BigInt, usize) {
    let (whole, fraction) = number.split_once('.').unwrap_or((number, ""));
    // The pattern guarantees at least one digit and nothing but digits.
    let digits = format!("{}{}", whole, fraction)
        .parse::<BigInt>()
        .unwrap_or_default();
    (digits, fraction.len() + 2)
}

/// Writes `value / 10^scale` in plain notation without trailing zeros.
fn decimal_literal(value: &BigInt, scale: usize) -> String {
    let digits = value.magnitude().to_string();
    let digits = format!("{:0>width$}", digits, width = scale + 1);
    let (whole, fraction) = digits.split_at(digits.len() - scale);
    let fraction = fraction.trim_end_matches('0');

    let mut literal = String::with_capacity(digits.len() + 2);
    if value.is_negative() {
        literal.push('-');
    }
    literal.push_str(whole);
    if !fraction.is_empty() {
        literal.push('.');
        literal.push_str(fraction);
    }
    literal
}

/// Spells out `π` and maps the `**` exponent to bc's `^`.
pub fn normalize_symbols(query: &str) -> String {
    query.replace('π', "pi").replace("**", "^")
}

fn replace_until_stable(query: &str, pattern: &Regex, replacement: &str) -> String {
    let mut current = query.to_string();
    while pattern.is_match(&current) {
        current = pattern.replace_all(&current, replacement).into_owned();
    }
    current
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_balance_inserts_after_last_semicolon() {
        assert_eq!(balance_parentheses("a=1;2+3)"), "a=1;(2+3)");
    }

    #[test]
    fn test_balance_leaves_balanced_input_alone() {
        assert_eq!(balance_parentheses("(1+2)*(3)"), "(1+2)*(3)");
        assert_eq!(balance_parentheses(""), "");
    }

    #[test]
    fn test_trailing_operator_chain_is_removed() {
        assert_eq!(remove_trailing_operators("5*(-"), "5");
        assert_eq!(remove_trailing_operators("+-*/^("), "");
    }

    #[test]
    fn test_trailing_x_after_operator_or_digit() {
        assert_eq!(remove_trailing_operators("4 x"), "4 ");
        assert_eq!(remove_trailing_operators("max"), "max");
        assert_eq!(remove_trailing_operators("my_x"), "my_x");
        assert_eq!(remove_trailing_operators("x"), "x");
    }

    fn binding(name: &str, value: &str) -> VariableBinding {
        VariableBinding {
            name: name.into(),
            value: value.into(),
            declaration: TextRange::new(0, 0),
        }
    }

    #[test]
    fn test_substitution_text_keeps_numbers_bare() {
        assert_eq!(substitution_text(&binding("a", "-2.5% "), &[], &[]), "-2.5%");
    }

    #[test]
    fn test_substitution_text_resolves_earlier_bindings() {
        let earlier = [binding("a", "2"), binding("b", "a*3")];
        let earlier_replacements = ["2".to_string(), "(2*3)".to_string()];
        let text = substitution_text(&binding("c", "a+b+d"), &earlier, &earlier_replacements);
        assert_eq!(text, "(2+(2*3)+d)");
    }

    #[test]
    fn test_identifier_occurrences_respect_word_edges() {
        let query = "a a1 ba _a aB (a)";
        let found: Vec<&str> = identifier_occurrences(query, 0, query.len())
            .into_iter()
            .map(|range| &query[range.as_range()])
            .collect();
        assert_eq!(found, vec!["a", "a1", "ba", "a"]);
    }

    #[test]
    fn test_splice_replaces_in_order() {
        let substitutions = vec![
            (TextRange::new(0, 1), "10"),
            (TextRange::new(2, 3), "(b)"),
        ];
        assert_eq!(splice("a+c", &substitutions), "10+(b)");
    }

    #[test]
    fn test_percent_fraction_accepts_leading_dot() {
        assert_eq!(percent_fraction(".5"), (BigInt::from(5), 3));
        assert_eq!(percent_fraction("33.3"), (BigInt::from(333), 3));
    }

    #[test]
    fn test_decimal_literal_trims_and_pads() {
        assert_eq!(decimal_literal(&BigInt::from(93), 2), "0.93");
        assert_eq!(decimal_literal(&BigInt::from(200), 2), "2");
        assert_eq!(decimal_literal(&BigInt::from(5), 3), "0.005");
        assert_eq!(decimal_literal(&BigInt::from(-50), 2), "-0.5");
        assert_eq!(decimal_literal(&BigInt::from(0), 4), "0");
    }
}
