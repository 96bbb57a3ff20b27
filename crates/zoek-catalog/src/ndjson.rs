use std::io::{BufRead, Write};

use serde_json::Value;
use zoek_core::error::ZoekError;
use zoek_core::models::record::RepositoryRecord;

/// JSON pointer to the repository list inside a GitHub organisation page.
const NESTED_NODES: &str = "/organization/repositories/nodes";

/// Normalize one JSON document into records.
///
/// Accepts a flat repository object, an organisation page holding
/// `organization.repositories.nodes`, or an array of either.
pub fn parse_document(value: Value) -> Result<Vec<RepositoryRecord>, ZoekError> {
    match value {
        Value::Array(items) => {
            let mut records = Vec::with_capacity(items.len());
            for item in items {
                records.extend(parse_object(item)?);
            }
            Ok(records)
        }
        other => parse_object(other),
    }
}

fn parse_object(value: Value) -> Result<Vec<RepositoryRecord>, ZoekError> {
    let is_page = value
        .as_object()
        .is_some_and(|obj| obj.contains_key("organization"));
    if !is_page {
        return Ok(vec![RepositoryRecord::from_json(value)?]);
    }

    let mut value = value;
    match value.pointer_mut(NESTED_NODES).map(Value::take) {
        Some(Value::Array(nodes)) => nodes.into_iter().map(RepositoryRecord::from_json).collect(),
        Some(Value::Null) => Ok(Vec::new()),
        _ => Err(ZoekError::InvalidRecord {
            reason: "organization.repositories.nodes must be an array".into(),
        }),
    }
}

/// Parse a newline-delimited catalog.
///
/// In strict mode the first malformed line aborts with
/// [`ZoekError::CatalogParse`]; otherwise it is logged and skipped.
pub fn parse_ndjson<R: BufRead>(reader: R, strict: bool) -> Result<Vec<RepositoryRecord>, ZoekError> {
    let mut records = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line_no = idx + 1;
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let parsed = serde_json::from_str::<Value>(trimmed)
            .map_err(|e| e.to_string())
            .and_then(|value| parse_document(value).map_err(|e| e.to_string()));

        match parsed {
            Ok(batch) => records.extend(batch),
            Err(message) if strict => {
                return Err(ZoekError::CatalogParse {
                    line: line_no,
                    message,
                })
            }
            Err(message) => {
                tracing::warn!("skipping malformed catalog line {line_no}: {message}");
            }
        }
    }
    Ok(records)
}

/// Write records as one JSON object per line.
pub fn write_ndjson<W: Write>(mut writer: W, records: &[RepositoryRecord]) -> Result<(), ZoekError> {
    for record in records {
        let line =
            serde_json::to_string(record).map_err(|e| ZoekError::Serialization(e.to_string()))?;
        writeln!(writer, "{line}")?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_flat_and_nested_lines_normalize_alike() {
        let input = concat!(
            r#"{"name":"a","sshUrl":"git@x:a","diskUsage":100,"isDisabled":false}"#,
            "\n",
            r#"{"organization":{"name":"Acme","repositories":{"nodes":[{"name":"b","sshUrl":"git@x:b","diskUsage":null,"isDisabled":false,"url":"https://x/b"},{"name":"c","sshUrl":"git@x:c","diskUsage":7,"isDisabled":true}]}}}"#,
            "\n\n",
        );
        let records = parse_ndjson(input.as_bytes(), true).unwrap();
        let names: Vec<&str> = records.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
        assert_eq!(records[1].url.as_deref(), Some("https://x/b"));
        assert_eq!(records[1].disk_usage, None);
        assert!(records[2].is_disabled);
    }

    #[test]
    fn test_strict_mode_reports_line() {
        let input = "{\"name\":\"a\"}\n{not json\n{\"name\":\"b\"}\n";
        let err = parse_ndjson(input.as_bytes(), true).unwrap_err();
        match err {
            ZoekError::CatalogParse { line, .. } => assert_eq!(line, 2),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_lenient_mode_skips_bad_lines() {
        let input = "{\"name\":\"a\"}\n{not json\n{\"name\":\"b\",\"diskUsage\":\"x\"}\n{\"name\":\"c\"}\n";
        let records = parse_ndjson(input.as_bytes(), false).unwrap();
        let names: Vec<&str> = records.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["a", "c"]);
    }

    #[test]
    fn test_array_document() {
        let records = parse_document(json!([
            {"name": "a", "sshUrl": "git@x:a", "webUrl": "https://x/a", "size": 1, "isDisabled": false},
            {"name": "b", "sshUrl": null, "webUrl": "https://x/b", "size": null, "isDisabled": true}
        ]))
        .unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].url.as_deref(), Some("https://x/a"));
        assert!(records[1].is_disabled);
    }

    #[test]
    fn test_page_without_nodes_is_rejected() {
        let err = parse_document(json!({"organization": {"repositories": {}}})).unwrap_err();
        assert!(err.to_string().contains("nodes"));
    }

    #[test]
    fn test_emit_then_parse_reproduces_records() {
        let records = parse_document(json!([
            {"name": "a", "sshUrl": "git@x:a", "webUrl": "https://x/a", "size": 100, "isDisabled": false, "project": {"name": "p"}},
            {"name": "b", "sshUrl": "git@x:b", "webUrl": "https://x/b", "size": null, "isDisabled": false}
        ]))
        .unwrap();

        let mut out = Vec::new();
        write_ndjson(&mut out, &records).unwrap();
        let text = String::from_utf8(out.clone()).unwrap();
        assert_eq!(text.lines().count(), 2);
        assert!(text.lines().next().unwrap().starts_with(r#"{"name":"a","sshUrl":"git@x:a","url":"https://x/a","diskUsage":100"#));

        let reparsed = parse_ndjson(out.as_slice(), true).unwrap();
        assert_eq!(reparsed, records);
    }
}
