//! Text Normalizer: the last step of every decoder.

use once_cell::sync::Lazy;
use regex::Regex;

/// Any whitespace except a line feed. Includes U+00A0 (non-breaking space).
static HORIZONTAL_WS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\S\n]+").unwrap());
static LINE_BREAK_WS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s*\n\s*").unwrap());

/// Collapses whitespace runs to a single space, collapses blank-line runs to a
/// single line break, and trims both ends.
///
/// Output never contains U+00A0 and is a fixed point: `normalize(normalize(s)) == normalize(s)`.
pub fn normalize(text: &str) -> String {
    let spaced = HORIZONTAL_WS.replace_all(text, " ");
    let lined = LINE_BREAK_WS.replace_all(&spaced, "\n");
    lined.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_replaces_nbsp() {
        assert_eq!(normalize("Jane\u{00A0}\u{00A0}Doe"), "Jane Doe");
    }

    #[test]
    fn test_normalize_collapses_spaces_and_tabs() {
        assert_eq!(normalize("a  \t b\t\tc"), "a b c");
    }

    #[test]
    fn test_normalize_preserves_single_line_breaks() {
        assert_eq!(normalize("  Jane Doe  \n\n\n  jane@x.io \r\n 555 "), "Jane Doe\njane@x.io\n555");
    }

    #[test]
    fn test_normalize_empty_and_blank() {
        assert_eq!(normalize(""), "");
        assert_eq!(normalize(" \n\t\u{00A0} \n "), "");
    }

    #[test]
    fn test_normalize_output_invariants_hold_for_messy_inputs() {
        let inputs = [
            "\u{00A0}lead\u{00A0}",
            "x \u{00A0} \u{00A0} y",
            "line1 \n \u{00A0}\n line2",
            "\t\tindent\n\n\n\nend\t",
            "form\x0Cfeed  and\rreturn",
        ];
        for input in inputs {
            let out = normalize(input);
            assert!(!out.contains('\u{00A0}'), "nbsp survived in {out:?}");
            assert!(!out.contains("  "), "double space survived in {out:?}");
            assert_eq!(out, out.trim(), "untrimmed output {out:?}");
            assert_eq!(normalize(&out), out, "not idempotent for {input:?}");
        }
    }
}
