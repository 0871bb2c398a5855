//! Glyph normalization of raw expression text.
//!
//! Text pasted from documents often carries typographic minus signs, multiplication dots or
//! division signs that the parser does not know. `normalize` maps them onto their ASCII
//! operators and leaves everything else untouched.
use regex::Regex;
use std::fmt;
use std::sync::LazyLock;

/// U+2212 minus, figure dash, en dash, small and full-width hyphen-minus
static MINUS_GLYPHS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("[\u{2212}\u{2012}\u{2013}\u{FE63}\u{FF0D}]").expect("valid pattern"));
/// multiplication sign, middle dot, bullet operator
static TIMES_GLYPHS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("[\u{00D7}\u{00B7}\u{2219}]").expect("valid pattern"));
static DIVISION_GLYPHS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("[\u{00F7}]").expect("valid pattern"));

/// Expression text with every known operator glyph replaced by its ASCII form.
/// Only `normalize` constructs it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NormalizedExpressionText(String);

impl NormalizedExpressionText {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for NormalizedExpressionText {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NormalizedExpressionText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

pub fn normalize(text: &str) -> NormalizedExpressionText {
    let text = MINUS_GLYPHS.replace_all(text, "-");
    let text = TIMES_GLYPHS.replace_all(&text, "*");
    let text = DIVISION_GLYPHS.replace_all(&text, "/");
    NormalizedExpressionText(text.into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minus_glyphs() {
        assert_eq!(normalize("\u{2212}x").as_str(), "-x");
        assert_eq!(normalize("x \u{2013} y \u{2012} 1").as_str(), "x - y - 1");
        assert_eq!(normalize("\u{FE63}y\u{FF0D}x").as_str(), "-y-x");
    }

    #[test]
    fn test_operator_glyphs() {
        assert_eq!(normalize("2\u{00D7}x\u{00B7}y\u{2219}3").as_str(), "2*x*y*3");
        assert_eq!(normalize("x\u{00F7}2").as_str(), "x/2");
    }

    #[test]
    fn test_plain_text_is_untouched() {
        for text in ["", "x^2 + y**2", "sin(x) - 3.5e-2*y", "  spaced  "] {
            assert_eq!(normalize(text).as_str(), text);
        }
    }

    #[test]
    fn test_idempotent() {
        let once = normalize("\u{2212}x \u{00D7} y");
        let twice = normalize(once.as_str());
        assert_eq!(once, twice);
    }
}
