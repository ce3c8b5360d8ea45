use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use crate::templates::error::TemplateError;

// {{ .field.sub }}, {{ field.sub }} or {{ . }}
static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{\s*([A-Za-z0-9_.\-]+)\s*\}\}").expect("placeholder pattern")
});

#[derive(Debug, Clone)]
enum Segment {
    Text(String),
    /// JSON pointer into the render data; empty means the whole value.
    Field { path: String, pointer: String },
}

/// A template parsed once and rendered many times.
#[derive(Debug, Clone)]
pub struct Template {
    name: String,
    segments: Vec<Segment>,
}

impl Template {
    pub fn parse(name: &str, source: &str) -> Result<Self, TemplateError> {
        let parse_error = |reason: String| TemplateError::Parse {
            template: name.to_owned(),
            reason,
        };

        let mut segments = Vec::new();
        let mut last = 0;
        for caps in PLACEHOLDER.captures_iter(source) {
            let (Some(whole), Some(path)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            push_text(&mut segments, &source[last..whole.start()]).map_err(&parse_error)?;
            let path = path.as_str();
            segments.push(Segment::Field {
                path: path.to_owned(),
                pointer: to_pointer(path).map_err(&parse_error)?,
            });
            last = whole.end();
        }
        push_text(&mut segments, &source[last..]).map_err(&parse_error)?;

        Ok(Self {
            name: name.to_owned(),
            segments,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Renders against `data`. Strings render raw, null renders empty,
    /// anything else renders as JSON.
    pub fn render(&self, data: &Value) -> Result<String, TemplateError> {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Text(text) => out.push_str(text),
                Segment::Field { path, pointer } => {
                    let value = data.pointer(pointer).ok_or_else(|| TemplateError::MissingField {
                        template: self.name.clone(),
                        field: path.clone(),
                    })?;
                    match value {
                        Value::String(s) => out.push_str(s),
                        Value::Null => {}
                        other => out.push_str(&other.to_string()),
                    }
                }
            }
        }
        Ok(out)
    }
}

fn push_text(segments: &mut Vec<Segment>, text: &str) -> Result<(), String> {
    if let Some(pos) = text.find("{{") {
        let snippet: String = text[pos..].chars().take(24).collect();
        return Err(format!("malformed action near '{}'", snippet));
    }
    if !text.is_empty() {
        segments.push(Segment::Text(text.to_owned()));
    }
    Ok(())
}

fn to_pointer(path: &str) -> Result<String, String> {
    let trimmed = path.strip_prefix('.').unwrap_or(path);
    if trimmed.is_empty() {
        return Ok(String::new());
    }
    let mut pointer = String::new();
    for part in trimmed.split('.') {
        if part.is_empty() {
            return Err(format!("invalid field path '{}'", path));
        }
        pointer.push('/');
        pointer.push_str(&part.replace('~', "~0"));
    }
    Ok(pointer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_render_template_basic() {
        let tpl = Template::parse("auth", "Bearer {{ .token }}").unwrap();
        let rendered = tpl.render(&json!({"token": "abc123"})).unwrap();
        assert_eq!(rendered, "Bearer abc123");
    }

    #[test]
    fn test_render_template_nested_and_undotted() {
        let tpl = Template::parse("form", "<input value=\"{{.form.csrf}}\">{{ user.name }}").unwrap();
        let data = json!({"form": {"csrf": "xyz789"}, "user": {"name": "ann"}});
        assert_eq!(tpl.render(&data).unwrap(), "<input value=\"xyz789\">ann");
    }

    #[test]
    fn test_render_template_whole_value_and_non_strings() {
        let tpl = Template::parse("dot", "{{ . }}").unwrap();
        assert_eq!(tpl.render(&json!("plain")).unwrap(), "plain");

        let tpl = Template::parse("mixed", "{{.n}}/{{.flag}}/{{.none}}/{{.list.1}}").unwrap();
        let data = json!({"n": 3, "flag": true, "none": null, "list": ["a", "b"]});
        assert_eq!(tpl.render(&data).unwrap(), "3/true//b");
    }

    #[test]
    fn test_render_template_missing_field() {
        let tpl = Template::parse("auth", "Bearer {{ .missing.token }}").unwrap();
        let err = tpl.render(&json!({})).unwrap_err();
        assert!(matches!(err, TemplateError::MissingField { ref field, .. } if field == ".missing.token"));
    }

    #[test]
    fn test_parse_rejects_malformed_actions() {
        assert!(matches!(
            Template::parse("bad", "hello {{ .name"),
            Err(TemplateError::Parse { .. })
        ));
        assert!(matches!(
            Template::parse("bad", "{{ .a..b }}"),
            Err(TemplateError::Parse { .. })
        ));
    }

    #[test]
    fn test_plain_text_passes_through() {
        let tpl = Template::parse("static", "no actions here }}").unwrap();
        assert_eq!(tpl.render(&Value::Null).unwrap(), "no actions here }}");
        assert_eq!(tpl.name(), "static");
    }
}
