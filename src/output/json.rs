use anyhow::Result;
use serde::Serialize;

pub fn render_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

/// One compact JSON document per line, for log shippers.
pub fn render_json_lines<T: Serialize>(items: &[T]) -> Result<String> {
    let mut out = String::new();
    for item in items {
        out.push_str(&serde_json::to_string(item)?);
        out.push('\n');
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::render_json_lines;
    use crate::types::RunResult;

    #[test]
    fn json_lines_end_each_record_with_newline() {
        let rows = vec![RunResult::default(), RunResult::default()];
        let out = render_json_lines(&rows).unwrap();
        assert_eq!(out.lines().count(), 2);
        assert!(out.ends_with('\n'));
        assert!(out.starts_with("{\"drift_event_count\":0"));
    }
}
