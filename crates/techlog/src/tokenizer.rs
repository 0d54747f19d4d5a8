//! Tokenizer for the techlog `key=value` property list.
//!
//! After the fixed prefix, an entry is a comma separated list such as
//!
//! ```text
//! process=rphost,p:processName=erp,Usr=admin,Sql="SELECT a, b FROM t"
//! ```
//!
//! The rules are deliberately simple and must stay stable, because documents
//! already indexed were produced by them:
//!
//! - commas delimit tokens, except inside a value that opens with `"`
//!   (up to its closing quote, a doubled `""` staying inside);
//! - a token is split on its first `=` only, tokens without `=` are ignored;
//! - keys and values are whitespace-trimmed, values lose surrounding `"`;
//! - when a key repeats, the last occurrence wins.
//!
//! An unquoted value that itself contains a comma is therefore cut at that
//! comma.

use std::collections::BTreeMap;

/// Splits text into comma-delimited tokens, keeping quoted commas.
pub fn split_fields(text: &str) -> impl Iterator<Item = &str> {
    let mut rest = Some(text);
    std::iter::from_fn(move || {
        let current = rest?;
        if let Some(end) = token_end(current) {
            rest = Some(&current[end + 1..]);
            Some(&current[..end])
        } else {
            rest = None;
            Some(current)
        }
    })
}

/// Position within one `key=value` token.
#[derive(Clone, Copy)]
enum Scan {
    Key,
    ValueStart,
    Quoted,
    Value,
}

/// Byte offset of the comma that ends the first token of `text`.
///
/// A `"` opens a quoted span only as the first non-blank character after the
/// token's first `=`; a doubled `""` inside the span is literal.
fn token_end(text: &str) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut state = Scan::Key;
    let mut i = 0;
    while let Some(&b) = bytes.get(i) {
        state = match (state, b) {
            (Scan::Quoted, b'"') if bytes.get(i + 1) == Some(&b'"') => {
                i += 1;
                Scan::Quoted
            }
            (Scan::Quoted, b'"') => Scan::Value,
            (Scan::Quoted, _) => Scan::Quoted,
            (_, b',') => return Some(i),
            (Scan::Key, b'=') => Scan::ValueStart,
            (Scan::ValueStart, b'"') => Scan::Quoted,
            (Scan::ValueStart, b' ' | b'\t') => Scan::ValueStart,
            (Scan::Key, _) => Scan::Key,
            (Scan::ValueStart | Scan::Value, _) => Scan::Value,
        };
        i += 1;
    }
    None
}

/// Splits a token on its first `=` into a trimmed key and a cleaned value.
#[must_use]
pub fn split_pair(token: &str) -> Option<(&str, &str)> {
    let (key, value) = token.split_once('=')?;
    Some((key.trim(), clean_value(value)))
}

/// Trims whitespace, then surrounding double quotes.
#[must_use]
pub fn clean_value(value: &str) -> &str {
    value.trim().trim_matches('"')
}

/// Iterates over the `(key, value)` pairs of a property list in source order.
pub fn pairs(text: &str) -> impl Iterator<Item = (&str, &str)> {
    split_fields(text).filter_map(split_pair)
}

/// Collects a property list into a map; the last duplicate key wins.
#[must_use]
pub fn parse_pairs(text: &str) -> BTreeMap<String, String> {
    pairs(text)
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn fields(text: &str) -> Vec<&str> {
        split_fields(text).collect()
    }

    // ===========================================
    // Field splitting
    // ===========================================

    #[test]
    fn splits_on_commas() {
        assert_eq!(fields("a=1,b=2,c=3"), vec!["a=1", "b=2", "c=3"]);
    }

    #[test]
    fn keeps_empty_fields() {
        assert_eq!(fields("a=1,,b=2,"), vec!["a=1", "", "b=2", ""]);
        assert_eq!(fields(""), vec![""]);
    }

    #[test]
    fn quoted_commas_do_not_split() {
        assert_eq!(
            fields(r#"Sql="SELECT a, b FROM t",Rows=2"#),
            vec![r#"Sql="SELECT a, b FROM t""#, "Rows=2"]
        );
    }

    #[test]
    fn doubled_quotes_stay_inside_the_span() {
        assert_eq!(
            fields(r#"Descr="say ""hi"", then go",x=1"#),
            vec![r#"Descr="say ""hi"", then go""#, "x=1"]
        );
    }

    #[test]
    fn lone_quote_inside_single_quoted_value_does_not_swallow_fields() {
        assert_eq!(
            fields(r#"Descr='file "C:\x not found',Usr=admin,process=rphost"#),
            vec![r#"Descr='file "C:\x not found'"#, "Usr=admin", "process=rphost"]
        );
    }

    #[test]
    fn quote_opens_span_only_at_value_start() {
        assert_eq!(fields(r#"Descr=a "b,c",x=1"#), vec![r#"Descr=a "b"#, r#"c""#, "x=1"]);
        assert_eq!(fields(r#"k"ey=1,x=2"#), vec![r#"k"ey=1"#, "x=2"]);
    }

    #[test]
    fn blank_before_opening_quote_is_allowed() {
        assert_eq!(fields(r#"Sql= "a, b",x=1"#), vec![r#"Sql= "a, b""#, "x=1"]);
    }

    #[test]
    fn text_after_closing_quote_is_unquoted() {
        assert_eq!(fields(r#"a="x"y"z,w",b=1"#), vec![r#"a="x"y"z"#, r#"w""#, "b=1"]);
    }

    #[test]
    fn unquoted_commas_split() {
        assert_eq!(fields("Sql=SELECT a, b FROM t"), vec!["Sql=SELECT a", " b FROM t"]);
    }

    #[test]
    fn newlines_are_ordinary_characters() {
        assert_eq!(
            fields("Context=line1\nline2,x=1"),
            vec!["Context=line1\nline2", "x=1"]
        );
    }

    // ===========================================
    // Pair splitting
    // ===========================================

    #[test_case("level=info", Some(("level", "info")) ; "plain")]
    #[test_case(" Usr = admin ", Some(("Usr", "admin")) ; "whitespace around key and value")]
    #[test_case(r#"Sql="SELECT 1""#, Some(("Sql", "SELECT 1")) ; "quoted value")]
    #[test_case("Prm=a=b", Some(("Prm", "a=b")) ; "first equals only")]
    #[test_case("Descr=", Some(("Descr", "")) ; "empty value")]
    #[test_case(r#"x="""#, Some(("x", "")) ; "empty quoted value")]
    #[test_case("no separator", None ; "token without equals")]
    #[test_case("", None ; "empty token")]
    fn split_pair_cases(token: &str, expected: Option<(&str, &str)>) {
        assert_eq!(split_pair(token), expected);
    }

    #[test]
    fn clean_value_strips_all_surrounding_quotes() {
        assert_eq!(clean_value(r#"  ""nested""  "#), "nested");
        assert_eq!(clean_value(r#""a "inner" b""#), r#"a "inner" b"#);
    }

    #[test]
    fn single_quotes_are_preserved() {
        assert_eq!(clean_value("'SELECT 1'"), "'SELECT 1'");
    }

    // ===========================================
    // Maps
    // ===========================================

    #[test]
    fn parse_pairs_collects_map() {
        let map = parse_pairs("MName=Foo, IName=IBank,Ping");
        assert_eq!(map.len(), 2);
        assert_eq!(map.get("MName").map(String::as_str), Some("Foo"));
        assert_eq!(map.get("IName").map(String::as_str), Some("IBank"));
    }

    #[test]
    fn parse_pairs_last_duplicate_wins() {
        let map = parse_pairs("a=1,b=2,a=3");
        assert_eq!(map.get("a").map(String::as_str), Some("3"));
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn parse_pairs_of_empty_text_is_empty() {
        assert!(parse_pairs("").is_empty());
    }

    #[test]
    fn pairs_keep_source_order() {
        let collected: Vec<_> = pairs("b=2,a=1").collect();
        assert_eq!(collected, vec![("b", "2"), ("a", "1")]);
    }
}
