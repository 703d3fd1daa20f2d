// Post-OCR text cleanup: whitespace, glyph normalisation, transliteration and
// the handful of abbreviations that show up on academic records.

use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashMap;
use unicode_normalization::UnicodeNormalization;

lazy_static! {
    // Letters that do not decompose into an ASCII base plus combining marks
    static ref SPECIAL_LETTERS: HashMap<char, &'static str> = {
        let mut m = HashMap::new();
        m.insert('ß', "ss");
        m.insert('æ', "ae");
        m.insert('Æ', "AE");
        m.insert('œ', "oe");
        m.insert('Œ', "OE");
        m.insert('ø', "o");
        m.insert('Ø', "O");
        m.insert('đ', "d");
        m.insert('Đ', "D");
        m.insert('ł', "l");
        m.insert('Ł', "L");
        m.insert('þ', "th");
        m.insert('Þ', "TH");
        m.insert('ı', "i");
        m
    };

    static ref GLYPHS: HashMap<char, &'static str> = {
        let mut m = HashMap::new();
        for c in ['‘', '’', '‚', '‛', '′', '`', '´'] {
            m.insert(c, "'");
        }
        for c in ['“', '”', '„', '‟', '″', '«', '»'] {
            m.insert(c, "\"");
        }
        for c in ['‐', '‑', '‒', '–', '—', '―', '−'] {
            m.insert(c, "-");
        }
        m.insert('…', "...");
        m.insert('\u{00A0}', " ");
        m.insert('ﬀ', "ff");
        m.insert('ﬁ', "fi");
        m.insert('ﬂ', "fl");
        m.insert('ﬃ', "ffi");
        m.insert('ﬄ', "ffl");
        m
    };

    static ref LEADING_PIPE: Regex = Regex::new(r"(^|\s)\|([a-z])").unwrap();
    static ref INNER_PIPE: Regex = Regex::new(r"([a-z])\|([a-z])").unwrap();
    static ref HORIZONTAL_SPACE: Regex = Regex::new(r"[ \t]+").unwrap();
    static ref SPACE_AROUND_NEWLINE: Regex = Regex::new(r" *\n *").unwrap();
    static ref EXCESS_NEWLINES: Regex = Regex::new(r"\n{3,}").unwrap();
    static ref SPACE_BEFORE_PUNCT: Regex = Regex::new(r" +([,.;:!?])").unwrap();
    static ref MISSING_SPACE_AFTER_PUNCT: Regex = Regex::new(r"([,;:!?])([A-Za-z])").unwrap();
    static ref GPA: Regex = Regex::new(r"(?i)\bg\s?\.\s?p\s?\.\s?a\b\.?|\bgpa\b").unwrap();
    static ref DOTTED_ID: Regex = Regex::new(r"\bI\.\s?D\.").unwrap();
    static ref PHD: Regex = Regex::new(r"(?i)\bph\.\s?d\b\.?").unwrap();
    static ref HONORIFIC: Regex = Regex::new(r"\b(Mr|Mrs|Ms|Dr|Prof)(?:\.\s*|\s+)([A-Z])").unwrap();
}

pub struct TextCleaner;

impl TextCleaner {
    /// Full cleanup pass applied to OCR output.
    pub fn clean(text: &str) -> String {
        let text = text.replace("\r\n", "\n").replace('\r', "\n");

        let text = Self::normalize_characters(&text);

        // OCR reads a capital I or lowercase l as a pipe
        let text = LEADING_PIPE.replace_all(&text, "${1}I${2}");
        let text = INNER_PIPE.replace_all(&text, "${1}l${2}");

        let text = HORIZONTAL_SPACE.replace_all(&text, " ");
        let text = SPACE_AROUND_NEWLINE.replace_all(&text, "\n");
        let text = EXCESS_NEWLINES.replace_all(&text, "\n\n");

        let text = Self::normalize_abbreviations(&text);

        let text = SPACE_BEFORE_PUNCT.replace_all(&text, "$1");
        let text = MISSING_SPACE_AFTER_PUNCT.replace_all(&text, "$1 $2");

        text.trim().to_string()
    }

    /// Per-character pass: drops control and zero-width characters, maps
    /// typographic glyphs to ASCII and strips accents from Latin letters.
    /// Non-Latin scripts are left alone.
    pub fn normalize_characters(text: &str) -> String {
        let mut out = String::with_capacity(text.len());

        for c in text.chars() {
            if c.is_ascii() {
                if !c.is_control() || c == '\n' || c == '\t' {
                    out.push(c);
                }
                continue;
            }

            if matches!(c, '\u{200B}'..='\u{200D}' | '\u{FEFF}' | '\u{00AD}') || c.is_control() {
                continue;
            }

            if let Some(replacement) = GLYPHS.get(&c).or_else(|| SPECIAL_LETTERS.get(&c)) {
                out.push_str(replacement);
                continue;
            }

            match std::iter::once(c).nfd().next() {
                Some(base) if base.is_ascii_alphabetic() => out.push(base),
                _ => out.push(c),
            }
        }

        out
    }

    fn normalize_abbreviations(text: &str) -> String {
        let text = GPA.replace_all(text, "GPA");
        let text = DOTTED_ID.replace_all(&text, "ID");
        let text = PHD.replace_all(&text, "PhD");
        let text = HONORIFIC.replace_all(&text, "$1. $2");
        text.into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_whitespace_is_collapsed() {
        let cleaned = TextCleaner::clean("Bachelor \t of   Science\r\n\r\n\r\n\r\nawarded   to");
        assert_eq!(cleaned, "Bachelor of Science\n\nawarded to");
    }

    #[test]
    fn test_typographic_glyphs() {
        assert_eq!(
            TextCleaner::clean("“Honours” – awarded… Dean’s list"),
            "\"Honours\" - awarded... Dean's list"
        );
    }

    #[test]
    fn test_accents_are_transliterated() {
        assert_eq!(TextCleaner::clean("José Müller Ærøskøbing Straße"), "Jose Muller AEroskobing Strasse");
    }

    #[test]
    fn test_non_latin_scripts_are_kept() {
        assert_eq!(TextCleaner::clean("Université 東京大学"), "Universite 東京大学");
    }

    #[test]
    fn test_control_and_zero_width_characters_removed() {
        assert_eq!(TextCleaner::clean("Tran\u{200B}script\u{0007} of\u{00AD} records"), "Transcript of records");
    }

    #[test]
    fn test_punctuation_spacing() {
        assert_eq!(TextCleaner::clean("Name :Jane Roe , GPA 3.50 ."), "Name: Jane Roe, GPA 3.50.");
        assert_eq!(TextCleaner::clean("Date:12 June"), "Date:12 June");
        assert_eq!(TextCleaner::clean("Major:Physics;Minor:Math"), "Major: Physics; Minor: Math");
    }

    #[test]
    fn test_abbreviations() {
        assert_eq!(TextCleaner::clean("Cumulative G.P.A. 3.9"), "Cumulative GPA 3.9");
        assert_eq!(TextCleaner::clean("cumulative gpa 3.9"), "cumulative GPA 3.9");
        assert_eq!(TextCleaner::clean("Student I.D. 20481"), "Student ID 20481");
        assert_eq!(TextCleaner::clean("Ph.D. in Chemistry"), "PhD in Chemistry");
        assert_eq!(TextCleaner::clean("signed Dr.Jane Roe and Prof Alan Turing"), "signed Dr. Jane Roe and Prof. Alan Turing");
    }

    #[test]
    fn test_pipe_artifacts() {
        assert_eq!(TextCleaner::clean("|nstitute of Techno|ogy"), "Institute of Technology");
    }

    #[test]
    fn test_ligatures() {
        assert_eq!(TextCleaner::clean("Certiﬁcate"), "Certificate");
    }
}
