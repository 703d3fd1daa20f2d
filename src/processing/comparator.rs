use lazy_static::lazy_static;
use regex::Regex;
use std::collections::{BTreeMap, HashMap, HashSet};

use crate::models::{NumericMismatch, SimilarityResult};

/// Points deducted per numeric mismatch entry.
pub const NUMERIC_MISMATCH_PENALTY: f64 = 7.0;
/// Ceiling on the total numeric penalty.
pub const MAX_NUMERIC_PENALTY: f64 = 50.0;
/// Character/word similarity gap (in points) that counts as localized editing.
pub const METRIC_DIVERGENCE_THRESHOLD: f64 = 5.0;
/// Unique words reported per side.
pub const MAX_UNIQUE_WORDS: usize = 50;

lazy_static! {
    static ref NUMERIC_TOKEN: Regex = Regex::new(r"\d+\.?\d*").unwrap();
}

/// Numeric-aware text similarity between a reference and a candidate document.
pub struct TextComparator;

impl TextComparator {
    pub fn compare(reference_text: &str, candidate_text: &str) -> SimilarityResult {
        let reference = Self::normalize(reference_text);
        let candidate = Self::normalize(candidate_text);

        // Step 1: character-level similarity, the primary signal
        let character_similarity = Self::character_similarity(&reference, &candidate);

        // Step 2: word-level similarity as a sanity check
        let word_similarity = Self::word_similarity(&Self::words(&reference), &Self::words(&candidate));
        let reference_words = Self::unique_words(&reference);
        let candidate_words = Self::unique_words(&candidate);

        // Step 3: numbers are compared on the original text
        let numeric_mismatches = Self::numeric_mismatches(reference_text, candidate_text);

        let penalty = (NUMERIC_MISMATCH_PENALTY * numeric_mismatches.len() as f64).min(MAX_NUMERIC_PENALTY);
        let final_similarity = (character_similarity - penalty).clamp(0.0, 100.0);

        let potential_tampering = (character_similarity - word_similarity).abs() > METRIC_DIVERGENCE_THRESHOLD
            || !numeric_mismatches.is_empty();

        let candidate_set: HashSet<&str> = candidate_words.iter().map(String::as_str).collect();
        let reference_set: HashSet<&str> = reference_words.iter().map(String::as_str).collect();

        let unique_to_reference = reference_words
            .iter()
            .filter(|w| !candidate_set.contains(w.as_str()))
            .take(MAX_UNIQUE_WORDS)
            .cloned()
            .collect();
        let unique_to_candidate = candidate_words
            .iter()
            .filter(|w| !reference_set.contains(w.as_str()))
            .take(MAX_UNIQUE_WORDS)
            .cloned()
            .collect();

        SimilarityResult {
            final_similarity,
            character_similarity,
            word_similarity,
            penalty,
            potential_tampering,
            numeric_mismatches,
            unique_to_reference,
            unique_to_candidate,
        }
    }

    /// Lowercase and collapse all whitespace runs to single spaces.
    pub fn normalize(text: &str) -> String {
        text.split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase()
    }

    /// `1 - distance / longer length`, as a percentage.
    pub fn character_similarity(a: &str, b: &str) -> f64 {
        let max_len = a.chars().count().max(b.chars().count());
        if max_len == 0 {
            return 100.0;
        }

        let distance = Self::levenshtein_distance(a, b);
        (1.0 - distance as f64 / max_len as f64) * 100.0
    }

    // Every word, stripped of edge punctuation
    fn words(normalized: &str) -> Vec<&str> {
        normalized
            .split(' ')
            .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()))
            .filter(|w| !w.is_empty())
            .collect()
    }

    // Distinct words in order of first appearance
    fn unique_words(normalized: &str) -> Vec<String> {
        let mut seen = HashSet::new();
        Self::words(normalized)
            .into_iter()
            .filter(|w| seen.insert(*w))
            .map(str::to_string)
            .collect()
    }

    /// Overlapping word count over the longer word count. Repeated words
    /// count once per occurrence on both sides.
    pub fn word_similarity(reference: &[&str], candidate: &[&str]) -> f64 {
        let longer = reference.len().max(candidate.len());
        if longer == 0 {
            return 100.0;
        }

        let mut available: HashMap<&str, usize> = HashMap::new();
        for word in candidate {
            *available.entry(*word).or_insert(0) += 1;
        }

        let mut overlap = 0;
        for word in reference {
            if let Some(count) = available.get_mut(word) {
                if *count > 0 {
                    *count -= 1;
                    overlap += 1;
                }
            }
        }

        overlap as f64 / longer as f64 * 100.0
    }

    /// Compare the numeric tokens of both texts as multisets. Every value whose
    /// occurrence count differs produces one entry.
    pub fn numeric_mismatches(reference_text: &str, candidate_text: &str) -> Vec<NumericMismatch> {
        let reference_counts = Self::numeric_counts(reference_text);
        let candidate_counts = Self::numeric_counts(candidate_text);

        let values: std::collections::BTreeSet<&String> =
            reference_counts.keys().chain(candidate_counts.keys()).collect();

        values
            .into_iter()
            .filter_map(|value| {
                let in_reference = reference_counts.get(value).copied().unwrap_or(0);
                let in_candidate = candidate_counts.get(value).copied().unwrap_or(0);
                (in_reference != in_candidate).then(|| NumericMismatch {
                    value: value.clone(),
                    count_in_reference: in_reference,
                    count_in_candidate: in_candidate,
                })
            })
            .collect()
    }

    fn numeric_counts(text: &str) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for token in NUMERIC_TOKEN.find_iter(text) {
            // "2020." at the end of a sentence is still 2020
            let value = token.as_str().trim_end_matches('.');
            *counts.entry(value.to_string()).or_insert(0) += 1;
        }
        counts
    }

    /// Classic Levenshtein distance over Unicode scalar values, two rows at a time.
    pub fn levenshtein_distance(s1: &str, s2: &str) -> usize {
        if s1 == s2 {
            return 0;
        }

        let s1_chars: Vec<char> = s1.chars().collect();
        let s2_chars: Vec<char> = s2.chars().collect();

        let len1 = s1_chars.len();
        let len2 = s2_chars.len();

        if len1 == 0 {
            return len2;
        }
        if len2 == 0 {
            return len1;
        }

        let mut previous: Vec<usize> = (0..=len2).collect();
        let mut current = vec![0; len2 + 1];

        for i in 1..=len1 {
            current[0] = i;
            for j in 1..=len2 {
                let cost = if s1_chars[i - 1] == s2_chars[j - 1] { 0 } else { 1 };
                current[j] = (previous[j] + 1)
                    .min(current[j - 1] + 1)
                    .min(previous[j - 1] + cost);
            }
            std::mem::swap(&mut previous, &mut current);
        }

        previous[len2]
    }
}
