//! JSON recovery from chatty model output
//!
//! Models wrap their JSON in prose or code fences often enough that a
//! strict parse is tried first and this balanced-brace scan second.

/// Extract the first balanced `{...}` substring that itself parses as
/// valid JSON. Returns `None` when no such substring exists.
///
/// Depth counting starts at the first `{`; every time depth returns to
/// zero the candidate region is validated, so trailing garbage after a
/// valid object does not matter. Braces inside string literals can fool
/// the counter, but the validation step rejects those false candidates.
pub fn extract_json_object(text: &str) -> Option<&str> {
    let bytes = text.as_bytes();
    let mut start = None;
    let mut depth = 0i32;

    for (index, &byte) in bytes.iter().enumerate() {
        match byte {
            b'{' => {
                if start.is_none() {
                    start = Some(index);
                }
                depth += 1;
            }
            b'}' => {
                depth -= 1;
                if let Some(begin) = start {
                    if depth == 0 {
                        // Brace bytes are ASCII, so slicing here stays on
                        // UTF-8 boundaries.
                        let candidate = &text[begin..=index];
                        if serde_json::from_str::<serde_json::Value>(candidate).is_ok()
                        {
                            return Some(candidate);
                        }
                    }
                }
            }
            _ => {}
        }
    }

    None
}
