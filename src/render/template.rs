//! Mustache-style templates.
//!
//! Templates render against the JSON form of the manifest, so the top-level
//! names are `standard` and `double`, and each record exposes `name`, `x`,
//! `y`, `width`, `height`, `sheetReference` and, for double records,
//! `sheetWidth`/`sheetHeight`.
//!
//! Supported tags:
//! - `{{name}}`, `{{a.b}}`, `{{.}}`: variables (missing ones render empty)
//! - `{{{name}}}`, `{{&name}}`: same as `{{name}}`; output is never escaped
//! - `{{#name}}...{{/name}}`: section, repeated for lists, skipped when falsy
//! - `{{^name}}...{{/name}}`: inverted section
//! - `{{! comment }}`
//!
//! Section, inverted, closing and comment tags alone on a line consume that
//! line entirely.

use super::{format_number, RenderError, Renderer};
use crate::manifest::Manifest;
use serde_json::Value;
use std::path::Path;

#[derive(Debug, Clone, PartialEq)]
enum Node {
    Text(String),
    Variable(String),
    Section { name: String, inverted: bool, children: Vec<Node> },
}

/// A parsed template.
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    nodes: Vec<Node>,
}

/// An open section while parsing
struct Frame {
    name: String,
    inverted: bool,
    nodes: Vec<Node>,
}

impl Template {
    /// Parse template source.
    pub fn parse(source: &str) -> Result<Self, RenderError> {
        let mut stack: Vec<Frame> = Vec::new();
        let mut nodes: Vec<Node> = Vec::new();
        let mut text = String::new();
        let mut pos = 0;

        while let Some(start) = source[pos..].find("{{").map(|i| i + pos) {
            text.push_str(&source[pos..start]);

            let triple = source[start..].starts_with("{{{");
            let (open_len, close) = if triple { (3, "}}}") } else { (2, "}}") };
            let inner_start = start + open_len;
            let end = source[inner_start..]
                .find(close)
                .map(|i| i + inner_start)
                .ok_or(RenderError::UnclosedTag(start))?;
            let tag = source[inner_start..end].trim();
            let mut after = end + close.len();

            let sigil = if triple { None } else { tag.chars().next() };
            let standalone_kind = matches!(sigil, Some('#' | '^' | '/' | '!'));

            if standalone_kind {
                if let Some((indent, skip)) = standalone_line(source, start, after) {
                    text.truncate(text.len() - indent);
                    after += skip;
                }
            }

            let current = stack.last_mut().map(|f| &mut f.nodes).unwrap_or(&mut nodes);
            if !text.is_empty() {
                current.push(Node::Text(std::mem::take(&mut text)));
            }

            match sigil {
                Some('#') | Some('^') => stack.push(Frame {
                    name: tag[1..].trim().to_string(),
                    inverted: sigil == Some('^'),
                    nodes: Vec::new(),
                }),
                Some('/') => {
                    let name = tag[1..].trim();
                    match stack.pop() {
                        Some(frame) if frame.name == name => {
                            let section = Node::Section {
                                name: frame.name,
                                inverted: frame.inverted,
                                children: frame.nodes,
                            };
                            let parent =
                                stack.last_mut().map(|f| &mut f.nodes).unwrap_or(&mut nodes);
                            parent.push(section);
                        }
                        other => {
                            return Err(RenderError::UnexpectedClose {
                                expected: other.map(|f| f.name),
                                found: name.to_string(),
                            })
                        }
                    }
                }
                Some('!') => {}
                Some('&') => current.push(Node::Variable(tag[1..].trim().to_string())),
                _ => current.push(Node::Variable(tag.to_string())),
            }

            pos = after;
        }

        text.push_str(&source[pos..]);
        if let Some(frame) = stack.pop() {
            return Err(RenderError::UnclosedSection(frame.name));
        }
        if !text.is_empty() {
            nodes.push(Node::Text(text));
        }

        Ok(Self { nodes })
    }

    /// Render against a JSON context.
    pub fn render_value(&self, context: &Value) -> String {
        let mut output = String::new();
        let mut stack = vec![context];
        render_nodes(&self.nodes, &mut stack, &mut output);
        output
    }
}

/// If the tag spanning `start..end` sits alone on its line, return the
/// indentation before it and how many bytes after it to skip.
fn standalone_line(source: &str, start: usize, end: usize) -> Option<(usize, usize)> {
    let line_start = source[..start].rfind('\n').map(|i| i + 1).unwrap_or(0);
    if !source[line_start..start].chars().all(|c| c == ' ' || c == '\t') {
        return None;
    }

    let after = &source[end..];
    let trailing = after.len() - after.trim_start_matches([' ', '\t']).len();
    let rest = &after[trailing..];
    let skip = if rest.starts_with("\r\n") {
        trailing + 2
    } else if rest.starts_with('\n') {
        trailing + 1
    } else if rest.is_empty() {
        trailing
    } else {
        return None;
    };

    Some((start - line_start, skip))
}

fn render_nodes<'a>(nodes: &[Node], stack: &mut Vec<&'a Value>, output: &mut String) {
    for node in nodes {
        match node {
            Node::Text(text) => output.push_str(text),
            Node::Variable(name) => {
                if let Some(value) = lookup(stack, name) {
                    output.push_str(&stringify(value));
                }
            }
            Node::Section { name, inverted, children } => {
                let value = lookup(stack, name);
                if *inverted {
                    if !value.map(is_truthy).unwrap_or(false) {
                        render_nodes(children, stack, output);
                    }
                    continue;
                }

                match value {
                    Some(Value::Array(items)) => {
                        for item in items {
                            stack.push(item);
                            render_nodes(children, stack, output);
                            stack.pop();
                        }
                    }
                    Some(v) if is_truthy(v) => {
                        stack.push(v);
                        render_nodes(children, stack, output);
                        stack.pop();
                    }
                    _ => {}
                }
            }
        }
    }
}

/// Resolve a (possibly dotted) name, searching the context stack from the top.
fn lookup<'a>(stack: &[&'a Value], name: &str) -> Option<&'a Value> {
    if name == "." {
        return stack.last().copied();
    }

    let mut parts = name.split('.');
    let first = parts.next()?;
    let mut value = stack.iter().rev().find_map(|ctx| child(*ctx, first))?;
    for part in parts {
        value = child(value, part)?;
    }
    Some(value)
}

fn child<'a>(value: &'a Value, key: &str) -> Option<&'a Value> {
    match value {
        Value::Object(map) => map.get(key),
        Value::Array(items) => key.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Array(items) => !items.is_empty(),
        Value::String(s) => !s.is_empty(),
        _ => true,
    }
}

fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => match n.as_f64() {
            Some(f) if n.is_f64() => format_number(f),
            _ => n.to_string(),
        },
        Value::Bool(b) => b.to_string(),
        Value::Null | Value::Array(_) | Value::Object(_) => String::new(),
    }
}

/// Renders the manifest through a user-supplied template.
#[derive(Debug, Clone)]
pub struct TemplateRenderer {
    template: Template,
}

impl TemplateRenderer {
    /// Create a renderer from template source.
    pub fn new(source: &str) -> Result<Self, RenderError> {
        Ok(Self { template: Template::parse(source)? })
    }

    /// Load and parse a template file.
    pub fn from_file(path: &Path) -> Result<Self, RenderError> {
        let source = std::fs::read_to_string(path)
            .map_err(|source| RenderError::Io { path: path.to_path_buf(), source })?;
        Self::new(&source)
    }
}

impl Renderer for TemplateRenderer {
    fn render(&self, manifest: &Manifest) -> Result<String, RenderError> {
        let context = serde_json::to_value(manifest)?;
        Ok(self.template.render_value(&context))
    }

    fn format_name(&self) -> &'static str {
        "template"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::SpriteRecord;
    use serde_json::json;

    fn render(source: &str, context: Value) -> String {
        Template::parse(source).unwrap().render_value(&context)
    }

    #[test]
    fn test_plain_text() {
        assert_eq!(render("hello", json!({})), "hello");
    }

    #[test]
    fn test_variables() {
        let ctx = json!({"name": "icon-a", "x": 7.5, "y": 8, "ok": true});
        assert_eq!(render("{{name}} {{ x }} {{y}} {{ok}}", ctx), "icon-a 7.5 8 true");
    }

    #[test]
    fn test_missing_variable_is_empty() {
        assert_eq!(render("[{{nope}}]", json!({})), "[]");
    }

    #[test]
    fn test_triple_and_ampersand() {
        let ctx = json!({"url": "a/b&c.png"});
        assert_eq!(render("{{{url}}} {{& url}}", ctx), "a/b&c.png a/b&c.png");
    }

    #[test]
    fn test_dotted_names() {
        let ctx = json!({"a": {"b": {"c": "deep"}}, "list": [1, 2]});
        assert_eq!(render("{{a.b.c}} {{list.1}}", ctx), "deep 2");
    }

    #[test]
    fn test_section_over_list() {
        let ctx = json!({"items": [{"n": "a"}, {"n": "b"}]});
        assert_eq!(render("{{#items}}<{{n}}>{{/items}}", ctx), "<a><b>");
    }

    #[test]
    fn test_section_reads_outer_context() {
        let ctx = json!({"prefix": "p", "items": [{"n": "a"}]});
        assert_eq!(render("{{#items}}{{prefix}}-{{n}}{{/items}}", ctx), "p-a");
    }

    #[test]
    fn test_section_falsy_values() {
        let ctx = json!({"empty": [], "no": false, "nil": null});
        assert_eq!(render("{{#empty}}x{{/empty}}{{#no}}y{{/no}}{{#nil}}z{{/nil}}", ctx), "");
    }

    #[test]
    fn test_inverted_section() {
        let ctx = json!({"empty": [], "full": [1]});
        assert_eq!(render("{{^empty}}none{{/empty}}{{^full}}never{{/full}}", ctx), "none");
        assert_eq!(render("{{^missing}}yes{{/missing}}", json!({})), "yes");
    }

    #[test]
    fn test_dot_in_list_of_scalars() {
        assert_eq!(render("{{#l}}{{.}},{{/l}}", json!({"l": ["a", "b"]})), "a,b,");
    }

    #[test]
    fn test_comment() {
        assert_eq!(render("a{{! ignored }}b", json!({})), "ab");
    }

    #[test]
    fn test_standalone_lines_removed() {
        let source = "start\n{{#items}}\n  {{n}}\n{{/items}}\nend\n";
        let ctx = json!({"items": [{"n": "a"}, {"n": "b"}]});
        assert_eq!(render(source, ctx), "start\n  a\n  b\nend\n");
    }

    #[test]
    fn test_inline_section_keeps_whitespace() {
        let ctx = json!({"items": [1]});
        assert_eq!(render("a {{#items}}x{{/items}} b\n", ctx), "a x b\n");
    }

    #[test]
    fn test_unclosed_tag() {
        assert!(matches!(Template::parse("abc {{name"), Err(RenderError::UnclosedTag(4))));
    }

    #[test]
    fn test_unclosed_section() {
        let result = Template::parse("{{#standard}}x");
        assert!(matches!(result, Err(RenderError::UnclosedSection(name)) if name == "standard"));
    }

    #[test]
    fn test_mismatched_close() {
        let result = Template::parse("{{#standard}}x{{/double}}");
        match result {
            Err(RenderError::UnexpectedClose { expected, found }) => {
                assert_eq!(expected.as_deref(), Some("standard"));
                assert_eq!(found, "double");
            }
            other => panic!("expected mismatched close, got {:?}", other),
        }
    }

    #[test]
    fn test_template_renderer_over_manifest() {
        let manifest = Manifest {
            standard: vec![],
            double: vec![SpriteRecord {
                name: "icon-a".to_string(),
                x: 0.5,
                y: 0.0,
                width: 10.0,
                height: 10.0,
                sheet_reference: "icons@2x.png".to_string(),
                sheet_width: Some(20.0),
                sheet_height: Some(10.0),
            }],
        };

        let source = "{{^standard}}no standard\n{{/standard}}\
                      {{#double}}{{name}} {{x}} {{sheetReference}} {{sheetWidth}}x{{sheetHeight}}\n{{/double}}";
        let text = TemplateRenderer::new(source).unwrap().render(&manifest).unwrap();
        assert_eq!(text, "no standard\nicon-a 0.5 icons@2x.png 20x10\n");
    }
}
