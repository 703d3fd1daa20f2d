use serde::de::DeserializeOwned;

use crate::utils::AiServiceError;

/// Locate the first balanced `{ ... }` block in a free-text reply. Braces
/// inside JSON string literals (including escaped quotes) are ignored.
pub fn extract_json_object(reply: &str) -> Option<&str> {
    json_object_candidates(reply).next()
}

/// Every balanced `{ ... }` block, by start position. Blocks nested inside an
/// earlier one are yielded after it.
pub fn json_object_candidates(reply: &str) -> impl Iterator<Item = &str> {
    reply
        .match_indices('{')
        .filter_map(move |(start, _)| balanced_end(reply, start).map(|end| &reply[start..=end]))
}

// Index of the brace closing the one at `start`
fn balanced_end(reply: &str, start: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, &b) in reply.as_bytes().iter().enumerate().skip(start) {
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }

        match b {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }

    None
}

/// Deserialize the first balanced block in `reply` that parses as `T`.
/// Prose around the JSON may itself contain braces.
pub fn parse_structured<T: DeserializeOwned>(reply: &str) -> Result<T, AiServiceError> {
    let mut last_error = None;

    for candidate in json_object_candidates(reply) {
        match serde_json::from_str(candidate) {
            Ok(parsed) => return Ok(parsed),
            Err(e) => last_error = Some(e.to_string()),
        }
    }

    Err(AiServiceError::MalformedResponse(
        last_error.unwrap_or_else(|| "no JSON object in reply".to_string()),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AuthenticityMarkers, DocumentClassification, VisualComparison};

    #[test]
    fn test_json_wrapped_in_prose() {
        let reply = "Sure! Here is the analysis:\n```json\n{\"a\": {\"b\": 1}}\n```\nLet me know.";
        assert_eq!(extract_json_object(reply), Some("{\"a\": {\"b\": 1}}"));
    }

    #[test]
    fn test_braces_inside_strings_are_ignored() {
        let reply = r#"{"note": "closing } early and \"quoted {\" text", "ok": true} trailing }"#;
        assert_eq!(
            extract_json_object(reply),
            Some(r#"{"note": "closing } early and \"quoted {\" text", "ok": true}"#)
        );
    }

    #[test]
    fn test_no_json() {
        assert_eq!(extract_json_object("I cannot help with that."), None);
        assert_eq!(extract_json_object("{ never closed"), None);
        let err = parse_structured::<AuthenticityMarkers>("nothing here").unwrap_err();
        assert!(matches!(err, AiServiceError::MalformedResponse(_)));
    }

    #[test]
    fn test_braces_in_prose_before_the_object() {
        let reply = "Using the template {documentType} I found:\n\
            {\"documentType\": \"Transcript\", \"confidence\": \"high\", \"visualElements\": [\"crest\"]}";
        assert_eq!(extract_json_object(reply), Some("{documentType}"));

        let parsed: DocumentClassification = parse_structured(reply).unwrap();
        assert_eq!(parsed.document_type, "Transcript");
        assert_eq!(parsed.visual_elements, vec!["crest"]);
    }

    #[test]
    fn test_outer_object_is_preferred_over_nested() {
        let reply = r#"{"sealPresent": true, "extra": {"sealPresent": false}}"#;
        let candidates: Vec<&str> = json_object_candidates(reply).collect();
        assert_eq!(candidates.len(), 2);

        let parsed: AuthenticityMarkers = parse_structured(reply).unwrap();
        assert!(parsed.seal_present);
    }

    #[test]
    fn test_parse_visual_comparison() {
        let reply = r#"Comparison result:
        {"sameCredentialType": true, "exactSameDocument": true, "matchConfidence": "high",
         "tamperingSeverity": "none", "specificTampering": [], "authenticityScore": 97}"#;
        let parsed: VisualComparison = parse_structured(reply).unwrap();
        assert!(parsed.exact_same_document);
        assert_eq!(parsed.authenticity_score, 97);
    }

    #[test]
    fn test_invalid_json_is_malformed() {
        let err = parse_structured::<VisualComparison>("{\"authenticityScore\": \"ninety\"}").unwrap_err();
        assert!(matches!(err, AiServiceError::MalformedResponse(_)));
    }
}
