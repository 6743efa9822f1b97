use serde_json::Value;

use crate::error::PipelineError;

/// Yelp inlines the page state as a JSON object inside an HTML comment. The
/// opening marker pins the first key; the closing marker swallows the two
/// final braces of the object, which have to be restored before parsing.
const OPEN_SENTINEL: &str = "<!--{\"locale\"";
const CLOSE_SENTINEL: &str = "}}-->";

/// Locate and parse the embedded page-state JSON out of a raw HTML body.
///
/// Fails when either sentinel is absent or the repaired payload is not valid
/// JSON. Callers treat the failure as "this page contributes no embedded
/// data" rather than aborting the retrieval.
pub fn embedded_json(body: &str) -> Result<Value, PipelineError> {
    let start = body
        .find(OPEN_SENTINEL)
        .ok_or_else(|| PipelineError::Extraction("opening sentinel not found".into()))?;
    let end = body[start..]
        .find(CLOSE_SENTINEL)
        .ok_or_else(|| PipelineError::Extraction("closing sentinel not found".into()))?;

    // Drop the "<!--" prefix, restore the braces the closing marker trimmed.
    let mut payload = body[start + 4..start + end].to_string();
    payload.push_str("}}");

    serde_json::from_str(&payload)
        .map_err(|e| PipelineError::Extraction(format!("payload is not valid JSON: {e}")))
}

/// Walk a nested path through a JSON value, returning `None` the moment a
/// segment is missing. Numeric segments index into arrays.
pub fn json_path<'a>(root: &'a Value, path: &[&str]) -> Option<&'a Value> {
    let mut cur = root;
    for seg in path {
        cur = match seg.parse::<usize>() {
            Ok(idx) => cur.get(idx)?,
            Err(_) => cur.get(*seg)?,
        };
    }
    Some(cur)
}

pub fn path_str(root: &Value, path: &[&str]) -> Option<String> {
    json_path(root, path)?.as_str().map(str::to_string)
}

/// Locate the JSON-LD address fragment in the raw body. Yelp emits it as
/// `"streetAddress": ... }` inside a script tag; the slice starts mid-object
/// so the opening brace has to be restored. Parsing is left to the caller —
/// an unparsable fragment means the location stays unset.
pub fn location_fragment(body: &str) -> Option<String> {
    let start = body.find("\"streetAddress\"")?;
    let end = body[start..].find('}')?;
    Some(format!("{{{}", &body[start..start + end + 1]))
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = concat!(
        "<html><head></head><body>",
        "<!--{\"locale\":\"en_US\",\"legacyProps\":{\"adSyncLoggingProps\":{\"enabled\":true}}}-->",
        "<p>hi</p></body></html>",
    );

    #[test]
    fn extracts_and_repairs_payload() {
        let v = embedded_json(PAGE).unwrap();
        assert_eq!(v["locale"], "en_US");
        assert_eq!(v["legacyProps"]["adSyncLoggingProps"]["enabled"], true);
    }

    #[test]
    fn missing_open_sentinel() {
        let err = embedded_json("<html>no comment here</html>").unwrap_err();
        assert!(err.to_string().contains("opening sentinel"));
    }

    #[test]
    fn missing_close_sentinel() {
        let err = embedded_json("<!--{\"locale\":\"en_US\"").unwrap_err();
        assert!(err.to_string().contains("closing sentinel"));
    }

    #[test]
    fn garbage_between_sentinels() {
        let err = embedded_json("<!--{\"locale\" oops }}-->").unwrap_err();
        assert!(err.to_string().contains("not valid JSON"));
    }

    #[test]
    fn json_path_walks_objects_and_arrays() {
        let v: Value =
            serde_json::from_str(r#"{"a":{"b":[{"c":1},{"c":2}]}}"#).unwrap();
        assert_eq!(json_path(&v, &["a", "b", "1", "c"]), Some(&Value::from(2)));
        assert_eq!(json_path(&v, &["a", "missing"]), None);
        assert_eq!(json_path(&v, &["a", "b", "9", "c"]), None);
    }

    #[test]
    fn path_str_rejects_non_strings() {
        let v: Value = serde_json::from_str(r#"{"n":5,"s":"x"}"#).unwrap();
        assert_eq!(path_str(&v, &["s"]).as_deref(), Some("x"));
        assert_eq!(path_str(&v, &["n"]), None);
    }

    #[test]
    fn location_fragment_restores_brace() {
        let body = r#"<script>{"streetAddress":"123 Main St","addressLocality":"Elk Grove"}</script>"#;
        let frag = location_fragment(body).unwrap();
        let v: Value = serde_json::from_str(&frag).unwrap();
        assert_eq!(v["streetAddress"], "123 Main St");
        assert_eq!(v["addressLocality"], "Elk Grove");
    }

    #[test]
    fn location_fragment_absent() {
        assert_eq!(location_fragment("<html></html>"), None);
    }
}
