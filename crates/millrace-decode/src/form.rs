//! Urlencoded body decoding.

use std::collections::HashMap;

use millrace_core::FormValue;

/// Decode an `application/x-www-form-urlencoded` body.
///
/// Percent escapes and `+` are decoded. Field names ending in `]` and
/// containing `[` follow the repeatable-field convention: their values
/// accumulate into a list in arrival order, keyed by the full name,
/// brackets included. Any other repeated name keeps its last value.
pub fn decode_urlencoded(body: &[u8]) -> HashMap<String, FormValue> {
    let mut fields: HashMap<String, FormValue> = HashMap::new();
    for (key, value) in form_urlencoded::parse(body) {
        let key = key.into_owned();
        let value = value.into_owned();
        if key.ends_with(']') && key.contains('[') {
            // Bracketed names only ever hold lists, so the entry is always
            // the Many variant.
            let entry = fields
                .entry(key)
                .or_insert_with(|| FormValue::Many(Vec::new()));
            if let FormValue::Many(values) = entry {
                values.push(value);
            }
        } else {
            fields.insert(key, FormValue::One(value));
        }
    }
    fields
}
