/// Maps free text to a canonical form for identity comparison.
///
/// Implementations must be total, deterministic and idempotent:
/// `normalize(&normalize(x)) == normalize(x)`.
pub trait Normalizer {
    fn normalize(&self, text: &str) -> String;
}

impl<F> Normalizer for F
where
    F: Fn(&str) -> String,
{
    fn normalize(&self, text: &str) -> String {
        self(text)
    }
}

/// Default normalizer: drops non-printable characters, unifies curly quotes
/// and long dashes, collapses whitespace runs and trims. Case is preserved.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextNormalizer;

impl Normalizer for TextNormalizer {
    fn normalize(&self, text: &str) -> String {
        let unified: String = text
            .chars()
            .filter(|c| c.is_whitespace() || is_printable(*c))
            .map(unify_punctuation)
            .collect();
        collapse_whitespace(&unified)
    }
}

fn unify_punctuation(c: char) -> char {
    match c {
        '\u{2018}' | '\u{2019}' => '\'',
        '\u{2013}' | '\u{2014}' => '-',
        other => other,
    }
}

/// Control and invisible formatting characters are not printable.
fn is_printable(c: char) -> bool {
    !c.is_control()
        && !matches!(
            c,
            '\u{00AD}'
                | '\u{200B}'..='\u{200F}'
                | '\u{202A}'..='\u{202E}'
                | '\u{2060}'..='\u{2064}'
                | '\u{FEFF}'
        )
}

fn collapse_whitespace(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for segment in s.split_whitespace() {
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(segment);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collapses_and_trims() {
        let n = TextNormalizer;
        assert_eq!(n.normalize("  Jane \t  Doe\n"), "Jane Doe");
        assert_eq!(n.normalize(""), "");
    }

    #[test]
    fn unifies_quotes_and_dashes() {
        let n = TextNormalizer;
        assert_eq!(n.normalize("O\u{2019}Brien"), "O'Brien");
        assert_eq!(n.normalize("Nurse \u{2013} Registered"), "Nurse - Registered");
        assert_eq!(n.normalize("A\u{2014}B"), "A-B");
    }

    #[test]
    fn strips_invisible_characters() {
        let n = TextNormalizer;
        assert_eq!(n.normalize("\u{FEFF}Acme\u{200B} Corp"), "Acme Corp");
        // Removing a zero-width space must not leave a double space behind.
        assert_eq!(n.normalize("a \u{200B} b"), "a b");
    }

    #[test]
    fn preserves_case() {
        assert_eq!(TextNormalizer.normalize("CLERK"), "CLERK");
    }

    #[test]
    fn idempotent_on_mixed_input() {
        let n = TextNormalizer;
        for s in ["  x\u{00A0}\u{00A0}y ", "\u{2018}q\u{2019}", "\u{0007}bell", "a\r\nb"] {
            let once = n.normalize(s);
            assert_eq!(n.normalize(&once), once, "input {s:?}");
        }
    }

    #[test]
    fn closures_are_normalizers() {
        let lower = |s: &str| s.to_lowercase();
        assert_eq!(lower.normalize("ACME"), "acme");
    }
}
