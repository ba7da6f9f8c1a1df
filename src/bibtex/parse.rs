//! BibTeX parsing implementation.
//!
//! Syntax (braces, quotes, `#` concatenation, `@string` macros, comments)
//! is handled by `biblatex`. This module flattens each parsed field back
//! into BibTeX value text, so that case-protecting braces and math survive
//! the trip into the database.

use biblatex::{Bibliography, Chunk, Spanned};

use crate::bibtex::structure::RawBibtexEntry;
use crate::{BibwormError, Result};

/// Fields `biblatex` keeps verbatim; their text is stored as is.
const VERBATIM_FIELDS: &[&str] = &[
    "doi", "eprint", "file", "pdf", "uri", "url", "urlraw", "verba", "verbb", "verbc",
];

/// Parse the content of a BibTeX file, returning one raw entry per
/// `@type{key, ...}` block, in source order.
pub(crate) fn bibtex_parse<S: AsRef<str>>(bibtex_text: S) -> Result<Vec<RawBibtexEntry>> {
    let text = bibtex_text.as_ref();
    let bibliography = Bibliography::parse(text).map_err(|e| BibwormError::MalformedInput {
        message: e.to_string(),
        line: line_of(text, e.span.start),
    })?;

    let entries = bibliography
        .iter()
        .map(|entry| {
            let mut raw = RawBibtexEntry::new(entry.entry_type.to_string().to_lowercase());
            raw.key = entry.key.clone();
            for (name, chunks) in &entry.fields {
                let name = name.to_lowercase();
                let value = field_text(&name, chunks);
                raw.add_field(name, value);
            }
            raw
        })
        .collect();
    Ok(entries)
}

/// Rebuilds the BibTeX text of a field value from its chunks.
fn field_text(name: &str, chunks: &[Spanned<Chunk>]) -> String {
    let verbatim_field = VERBATIM_FIELDS.contains(&name);
    let mut value = String::new();

    for chunk in chunks {
        match &chunk.v {
            Chunk::Normal(s) | Chunk::Verbatim(s) if verbatim_field => value.push_str(s),
            Chunk::Normal(s) => value.push_str(&escape_normal(s)),
            Chunk::Verbatim(s) => {
                value.push('{');
                value.push_str(s);
                value.push('}');
            }
            Chunk::Math(s) => {
                value.push('$');
                value.push_str(s);
                value.push('$');
            }
        }
    }
    value
}

/// Escapes braces and the LaTeX specials `biblatex` hands back bare,
/// leaving existing escapes alone.
fn escape_normal(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    let mut previous = None;
    for c in text.chars() {
        if matches!(c, '{' | '}' | '&' | '%' | '#') && previous != Some('\\') {
            escaped.push('\\');
        }
        escaped.push(c);
        previous = Some(c);
    }
    escaped
}

/// 1-based line of a byte offset.
fn line_of(text: &str, offset: usize) -> usize {
    let end = offset.min(text.len());
    text.as_bytes()[..end].iter().filter(|&&b| b == b'\n').count() + 1
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::*;

    fn parse_single(text: &str) -> RawBibtexEntry {
        let mut entries = bibtex_parse(text).unwrap();
        assert_eq!(entries.len(), 1);
        entries.remove(0)
    }

    #[test]
    fn test_parse_braced_and_bare_values() {
        let entry = parse_single(
            "@Article{X1,\n  Title = {A Study},\n  year = 2020,\n  journal = \"J. Stuff\"\n}",
        );
        assert_eq!(entry.entry_type, "article");
        assert_eq!(entry.key, "X1");
        assert_eq!(entry.get_first("title"), Some(&"A Study".to_string()));
        assert_eq!(entry.get_first("year"), Some(&"2020".to_string()));
        assert_eq!(entry.get_first("journal"), Some(&"J. Stuff".to_string()));
    }

    #[test]
    fn test_case_protection_is_kept() {
        let entry = parse_single("@misc{k, title = {{BERT}: Pre-training}}");
        assert_eq!(
            entry.get_first("title"),
            Some(&"{BERT}: Pre-training".to_string())
        );
    }

    #[test]
    fn test_string_macros_and_concatenation() {
        let entry = parse_single(
            "@string{conf = \"Proc. of X\"}\n@inproceedings{k, booktitle = conf # \" 2020\"}",
        );
        assert_eq!(entry.entry_type, "inproceedings");
        assert_eq!(
            entry.get_first("booktitle"),
            Some(&"Proc. of X 2020".to_string())
        );
    }

    #[test]
    fn test_comments_are_skipped() {
        let entries = bibtex_parse(
            "@comment{ignored}\n@misc{a, title = {A}}\n\n@misc{b, title = {B}}",
        )
        .unwrap();
        let keys: Vec<_> = entries.iter().map(|e| e.key.as_str()).collect();
        assert_eq!(keys, vec!["a", "b"]);
    }

    #[test]
    fn test_verbatim_fields_are_not_wrapped() {
        let entry = parse_single("@misc{k, url = {https://example.org/a_b}}");
        assert_eq!(
            entry.get_first("url"),
            Some(&"https://example.org/a_b".to_string())
        );
    }

    #[test]
    fn test_unclosed_entry_is_malformed() {
        let result = bibtex_parse("\n\n@article{X1, title = {open");
        assert!(matches!(result, Err(BibwormError::MalformedInput { .. })));
    }

    #[rstest]
    #[case("R & D", "R \\& D")]
    #[case("R \\& D", "R \\& D")]
    #[case("50% less", "50\\% less")]
    #[case("a && b", "a \\&\\& b")]
    #[case("a } b", "a \\} b")]
    #[case("a \\} b", "a \\} b")]
    #[case("plain", "plain")]
    fn test_escape_normal(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(escape_normal(input), expected);
    }

    #[rstest]
    #[case(0, 1)]
    #[case(4, 2)]
    #[case(100, 3)]
    fn test_line_of(#[case] offset: usize, #[case] expected: usize) {
        assert_eq!(line_of("abc\ndef\nghi", offset), expected);
    }
}
