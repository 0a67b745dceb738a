// Encoding for the list-valued sample columns (query_params, cookies).
// Ordered list of strings <-> compact JSON array in a TEXT column.
// An empty list is stored as NULL, never as "[]".

/// Encode a list for storage. Empty input yields None (stored NULL).
pub fn encode(items: &[String]) -> Option<String> {
    if items.is_empty() {
        return None;
    }
    // Serializing Vec<String> cannot fail.
    serde_json::to_string(items).ok()
}

/// Decode a stored column back to the list. NULL or empty text is an empty
/// list. Text that is not a JSON array is kept as a single opaque entry
/// rather than surfacing a parse error.
pub fn decode(value: Option<&str>) -> Vec<String> {
    let Some(raw) = value else {
        return Vec::new();
    };
    if raw.is_empty() {
        return Vec::new();
    }
    match serde_json::from_str::<Vec<String>>(raw) {
        Ok(items) => items
            .into_iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect(),
        Err(e) => {
            tracing::debug!(error = %e, "list column is not a JSON array, keeping raw value");
            vec![raw.to_string()]
        }
    }
}
