use crate::syntax::{SyntaxElement, SyntaxNode};
use std::fmt::Write;

/// Render `node` as an S-expression of its named descendants.
///
/// Anonymous tokens and extras are omitted; children carrying a field are
/// prefixed with `name: `. Error nodes render as `(ERROR ...)`.
///
/// ```text
/// (program (statement (expression left: (expression (identifier)) right: (expression (number)))))
/// ```
#[must_use]
pub fn to_sexp(node: &SyntaxNode) -> String {
    let mut out = String::new();
    write_node(node, &mut out);
    out
}

fn write_node(node: &SyntaxNode, out: &mut String) {
    out.push('(');
    out.push_str(node.kind_name());
    for (index, child) in node.children().enumerate() {
        if !shows(&child) {
            continue;
        }
        out.push(' ');
        if let Some(field) = node.field_name_of(index) {
            let _ = write!(out, "{field}: ");
        }
        match child {
            SyntaxElement::Node(child) => write_node(&child, out),
            SyntaxElement::Token(token) => {
                let _ = write!(out, "({})", token.kind_name());
            }
        }
    }
    out.push(')');
}

fn shows(element: &SyntaxElement) -> bool {
    match element {
        SyntaxElement::Node(node) => node.is_named() || node.is_error(),
        SyntaxElement::Token(token) => !token.is_extra() && element.is_named(),
    }
}
