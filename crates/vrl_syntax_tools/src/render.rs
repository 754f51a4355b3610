//! Text, JSON and Graphviz renderings of languages and syntax trees.

use serde_json::{json, Value};
use std::fmt::Write;
use vrl_syntax::language::StateId;
use vrl_syntax::{Edit, Language, SyntaxElement, SyntaxNode, SyntaxTree};

/// Human readable summary of a language's tables.
#[must_use]
pub fn language_summary(language: &Language) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "language    {}", language.name());
    let _ = writeln!(out, "start       {}", language.kind_name(language.start_symbol()));
    let _ = writeln!(out, "symbols     {}", language.symbol_count());
    let _ = writeln!(out, "fields      {}", language.field_count());
    let _ = writeln!(out, "productions {}", language.production_count());
    let _ = writeln!(out, "states      {}", language.state_count());
    let _ = writeln!(out);
    for info in language.kinds() {
        let mut flags = Vec::new();
        if info.terminal {
            flags.push("terminal");
        }
        if info.named {
            flags.push("named");
        }
        if !info.visible {
            flags.push("hidden");
        }
        if info.extra {
            flags.push("extra");
        }
        if language.is_sync(info.kind) {
            flags.push("sync");
        }
        let _ = writeln!(out, "{:>4}  {:<16} {}", info.kind.0, info.name, flags.join(" "));
    }
    out
}

#[must_use]
pub fn language_json(language: &Language) -> Value {
    let symbols: Vec<Value> = language
        .kinds()
        .map(|info| {
            json!({
                "id": info.kind.0,
                "name": info.name,
                "terminal": info.terminal,
                "named": info.named,
                "visible": info.visible,
                "extra": info.extra,
                "sync": language.is_sync(info.kind),
            })
        })
        .collect();
    let fields: Vec<&str> = (0..language.field_count())
        .filter_map(|index| language.field_name(vrl_syntax::FieldId(u16::try_from(index).ok()?)))
        .collect();
    json!({
        "name": language.name(),
        "start": language.kind_name(language.start_symbol()),
        "symbols": symbols,
        "fields": fields,
        "productions": language.production_count(),
        "states": language.state_count(),
    })
}

/// Graphviz rendering of the LR automaton: one node per state, shift and
/// goto edges labelled with their symbols, reductions listed in the node.
#[must_use]
pub fn automaton_dot(language: &Language) -> String {
    let mut out = String::from("digraph automaton {\n  rankdir=LR;\n  node [shape=box, fontname=monospace];\n\n");
    for index in 0..language.state_count() {
        let Ok(state) = u32::try_from(index).map(StateId) else {
            break;
        };
        let mut reductions = Vec::new();
        let mut edges = Vec::new();
        for info in language.kinds() {
            if info.terminal {
                for action in language.actions(state, info.kind) {
                    match action {
                        vrl_syntax::language::Action::Shift(target) => edges.push((target.0, info.name)),
                        other => reductions.push(format!("{} on {}", other, escape(info.name))),
                    }
                }
            } else if let Some(target) = language.goto(state, info.kind) {
                edges.push((target.0, info.name));
            }
        }
        let label = if reductions.is_empty() {
            format!("{index}")
        } else {
            format!("{index}\\n{}", reductions.join("\\n"))
        };
        let _ = writeln!(out, "  s{index} [label=\"{label}\"];");
        for (target, symbol) in edges {
            let _ = writeln!(out, "  s{index} -> s{target} [label=\"{}\"];", escape(symbol));
        }
    }
    out.push_str("}\n");
    out
}

fn escape(text: &str) -> String {
    text.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Indented rendering with ranges, fields and token text.
#[must_use]
pub fn tree_debug(tree: &SyntaxTree) -> String {
    let mut out = String::new();
    write_debug(&tree.root(), None, 0, &mut out);
    out
}

fn write_debug(node: &SyntaxNode, field: Option<&str>, depth: usize, out: &mut String) {
    let indent = "  ".repeat(depth);
    let prefix = field.map(|field| format!("{field}: ")).unwrap_or_default();
    let _ = writeln!(out, "{indent}{prefix}{}@{}", node.kind_name(), node.range());
    for (index, child) in node.children().enumerate() {
        let field = node.field_name_of(index);
        match child {
            SyntaxElement::Node(child) => write_debug(&child, field, depth + 1, out),
            SyntaxElement::Token(token) => {
                let prefix = field.map(|field| format!("{field}: ")).unwrap_or_default();
                let _ = writeln!(
                    out,
                    "{indent}  {prefix}{}@{} {:?}",
                    token.kind_name(),
                    token.range(),
                    token.text()
                );
            }
        }
    }
}

#[must_use]
pub fn tree_json(node: &SyntaxNode) -> Value {
    let children: Vec<Value> = node
        .children()
        .enumerate()
        .map(|(index, child)| {
            let mut value = match child {
                SyntaxElement::Node(child) => tree_json(&child),
                SyntaxElement::Token(token) => json!({
                    "kind": token.kind_name(),
                    "range": [token.range().start().get(), token.range().end().get()],
                    "text": token.text(),
                }),
            };
            if let (Some(field), Value::Object(map)) = (node.field_name_of(index), &mut value) {
                map.insert("field".to_string(), Value::from(field));
            }
            value
        })
        .collect();
    json!({
        "kind": node.kind_name(),
        "range": [node.range().start().get(), node.range().end().get()],
        "error": node.is_error(),
        "children": children,
    })
}

/// Smallest single edit turning `old` into `new`: the bytes between their
/// common prefix and suffix.
#[must_use]
pub fn minimal_edit(old: &str, new: &str) -> Edit {
    let mut prefix = old
        .bytes()
        .zip(new.bytes())
        .take_while(|(a, b)| a == b)
        .count();
    while !old.is_char_boundary(prefix) || !new.is_char_boundary(prefix) {
        prefix -= 1;
    }
    let limit = old.len().min(new.len()) - prefix;
    let mut suffix = old
        .bytes()
        .rev()
        .zip(new.bytes().rev())
        .take(limit)
        .take_while(|(a, b)| a == b)
        .count();
    while !old.is_char_boundary(old.len() - suffix) || !new.is_char_boundary(new.len() - suffix) {
        suffix -= 1;
    }
    Edit::new(prefix, old.len() - suffix, new.len() - suffix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use vrl_syntax::testing::{statements_language, vrl_language};

    #[test]
    fn test_minimal_edit_spans_difference() {
        assert_eq!(minimal_edit("a; b; c;", "a; bb; c;"), Edit::new(4, 4, 5));
        assert_eq!(minimal_edit("same", "same"), Edit::new(4, 4, 4));
        assert_eq!(minimal_edit("", "new"), Edit::new(0, 0, 3));
        assert_eq!(minimal_edit("aaa", "aa"), Edit::new(2, 3, 2));
    }

    #[test]
    fn test_minimal_edit_keeps_char_boundaries() {
        let edit = minimal_edit("xé", "xè");
        assert_eq!(edit, Edit::new(1, 3, 3));
    }

    #[test]
    fn test_tree_json_carries_fields() {
        let tree = vrl_syntax::parse("a + 1;", &statements_language()).unwrap();
        let value = tree_json(&tree.root());
        assert_eq!(value["kind"], "program");
        assert_eq!(value["range"], json!([0, 6]));
        let binary = &value["children"][0]["children"][0];
        assert_eq!(binary["children"][0]["field"], "left");
        assert_eq!(binary["children"][4]["field"], "right");
    }

    #[test]
    fn test_debug_rendering_lists_tokens() {
        let tree = vrl_syntax::parse("let a;", &statements_language()).unwrap();
        let rendered = tree_debug(&tree);
        assert!(rendered.starts_with("program@0..6"));
        assert!(rendered.contains("identifier@4..5 \"a\""));
    }

    #[test]
    fn test_summary_and_dot_mention_every_state() {
        let language = statements_language();
        let summary = language_summary(&language);
        assert!(summary.contains("states      16"));
        assert!(summary.contains("_items"));
        let dot = automaton_dot(&language);
        assert!(dot.contains("s0 -> s6 [label=\"let\"]"));
        assert!(dot.contains("s15 [label="));
        assert_eq!(language_json(&language)["fields"], json!(["left", "right"]));
    }

    #[test]
    fn test_vrl_tree_json_names_operator() {
        let tree = vrl_syntax::parse("a ?? 1\n", &vrl_language()).unwrap();
        let value = tree_json(&tree.root());
        let binary = &value["children"][0];
        assert_eq!(binary["kind"], "binary_expression");
        let fields: Vec<_> = binary["children"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(|child| child["field"].as_str())
            .collect();
        assert_eq!(fields, ["left", "operator", "right"]);
        assert_eq!(language_json(&vrl_language())["fields"], json!(["left", "operator", "right"]));
    }
}
