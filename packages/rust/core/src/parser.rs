//! Lenient decoding of model output into section payloads.
//!
//! Models often wrap JSON in markdown code fences or add prose around it.
//! [`parse_section`] strips the fences, tries to decode a JSON object, and
//! otherwise keeps the original text under `raw`. It never fails.

use deepcut_shared::SectionPayload;

/// Remove every ```` ```json ```` and ```` ``` ```` marker, then trim.
pub fn strip_fences(raw: &str) -> String {
    raw.replace("```json", "").replace("```", "").trim().to_string()
}

/// Decode one stage's raw output.
///
/// A JSON object becomes a structured payload. Anything else (invalid JSON,
/// an array, a bare string or number) becomes `{"raw": <original text>}`.
pub fn parse_section(raw: &str) -> SectionPayload {
    let cleaned = strip_fences(raw);
    // Untagged decoding accepts only objects, and maps an exact
    // `{"raw": "..."}` object back onto the fallback variant.
    serde_json::from_str::<SectionPayload>(&cleaned)
        .unwrap_or_else(|_| SectionPayload::fallback(raw))
}
