//! Server-side markup carrying the wire contract read by the client controller.
//!
//! ## Wire Contract
//!
//! - Controller: `data-dependency="true"`, `data-dependency-group`,
//!   `data-dependency-field`.
//! - Dependent wrapper: `data-dependend="<identifiers>"`,
//!   `data-dependend-group`, `data-dependend-field`; hidden inline style
//!   unless the server already proved it visible.
//! - Checkbox tree: `data-checkbox-tree="<treeId>"` with `li[data-tree-node]`
//!   items and `input[data-tree-checkbox]` checkboxes.
//! - Repeater: `data-repeater`, `data-repeater-row`, and a
//!   `<script type="text/template" data-repeater-prototype>` row prototype.

use std::collections::BTreeSet;

use crate::field::{FieldKind, FieldValue};
use crate::tree::{CheckboxTree, TreeNode};

pub const ATTR_CONTROLLER: &str = "data-dependency";
pub const ATTR_CONTROLLER_GROUP: &str = "data-dependency-group";
pub const ATTR_CONTROLLER_FIELD: &str = "data-dependency-field";
pub const ATTR_DEPENDENT: &str = "data-dependend";
pub const ATTR_DEPENDENT_GROUP: &str = "data-dependend-group";
pub const ATTR_DEPENDENT_FIELD: &str = "data-dependend-field";
pub const ATTR_TREE: &str = "data-checkbox-tree";
pub const ATTR_TREE_NODE: &str = "data-tree-node";
pub const ATTR_TREE_CHECKBOX: &str = "data-tree-checkbox";
pub const ATTR_REPEATER: &str = "data-repeater";
pub const ATTR_REPEATER_ROW: &str = "data-repeater-row";
pub const ATTR_REPEATER_PROTOTYPE: &str = "data-repeater-prototype";

/// Row index placeholder inside repeater prototypes.
pub const INDEX_PLACEHOLDER: &str = "__index__";

pub const HIDDEN_STYLE: &str = "display: none";

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn attr(name: &str, value: &str) -> String {
    format!(" {}=\"{}\"", name, escape_html(value))
}

/// ` name="value"` pairs in map order; valueless attributes repeat their name.
pub fn render_attrs<'a, I>(attrs: I) -> String
where
    I: IntoIterator<Item = (&'a String, &'a String)>,
{
    attrs.into_iter().map(|(k, v)| attr(k, v)).collect()
}

// ═══════════════════════════════════════════════════════════════════════════════
// DEPENDENCIES
// ═══════════════════════════════════════════════════════════════════════════════

/// Attributes marking a controller input. A controller driving several groups
/// lists them space-separated.
pub fn controller_attrs(field: &str, groups: &[&str]) -> String {
    let mut out = attr(ATTR_CONTROLLER, "true");
    out.push_str(&attr(ATTR_CONTROLLER_GROUP, &groups.join(" ")));
    out.push_str(&attr(ATTR_CONTROLLER_FIELD, field));
    out
}

pub fn dependent_attrs(field: &str, group: &str, identifiers: &BTreeSet<String>) -> String {
    let ids: Vec<&str> = identifiers.iter().map(String::as_str).collect();
    let mut out = attr(ATTR_DEPENDENT, &ids.join(" "));
    out.push_str(&attr(ATTR_DEPENDENT_GROUP, group));
    out.push_str(&attr(ATTR_DEPENDENT_FIELD, field));
    out
}

pub fn dependent_wrapper(
    field: &str,
    group: &str,
    identifiers: &BTreeSet<String>,
    visible: bool,
    inner_html: &str,
) -> String {
    let style = if visible {
        String::new()
    } else {
        attr("style", HIDDEN_STYLE)
    };
    format!(
        "<div{}{}>{}</div>",
        dependent_attrs(field, group, identifiers),
        style,
        inner_html
    )
}

// ═══════════════════════════════════════════════════════════════════════════════
// CONTROLS
// ═══════════════════════════════════════════════════════════════════════════════

/// Minimal control markup; `extra_attrs` is appended to every input rendered.
pub fn render_control(
    name: &str,
    kind: FieldKind,
    value: &FieldValue,
    choices: &[(String, String)],
    extra_attrs: &str,
) -> String {
    let is_set = |choice: &str| match value {
        FieldValue::Text(v) => v == choice,
        FieldValue::List(items) => items.iter().any(|v| v == choice),
        FieldValue::Bool(b) => *b && choice.is_empty(),
        FieldValue::Null => false,
    };
    let text_value = match value {
        FieldValue::Text(v) => v.clone(),
        FieldValue::List(items) => items.first().cloned().unwrap_or_default(),
        _ => String::new(),
    };

    match kind {
        FieldKind::Text | FieldKind::Hidden => format!(
            "<input type=\"{}\"{}{}{}>",
            if kind == FieldKind::Hidden { "hidden" } else { "text" },
            attr("name", name),
            attr("value", &text_value),
            extra_attrs
        ),
        FieldKind::Select | FieldKind::MultiSelect => {
            let multiple = if kind == FieldKind::MultiSelect {
                " multiple"
            } else {
                ""
            };
            let options: String = choices
                .iter()
                .map(|(v, label)| {
                    format!(
                        "<option{}{}>{}</option>",
                        attr("value", v),
                        if is_set(v) { " selected" } else { "" },
                        escape_html(label)
                    )
                })
                .collect();
            format!(
                "<select{}{}{}>{}</select>",
                attr("name", name),
                multiple,
                extra_attrs,
                options
            )
        }
        FieldKind::Checkbox | FieldKind::Radio => {
            let input_type = if kind == FieldKind::Radio {
                "radio"
            } else {
                "checkbox"
            };
            if choices.is_empty() {
                return format!(
                    "<input type=\"{}\"{}{}{}>",
                    input_type,
                    attr("name", name),
                    if is_set("") { " checked" } else { "" },
                    extra_attrs
                );
            }
            choices
                .iter()
                .map(|(v, label)| {
                    format!(
                        "<label><input type=\"{}\"{}{}{}{}> {}</label>",
                        input_type,
                        attr("name", name),
                        attr("value", v),
                        if is_set(v) { " checked" } else { "" },
                        extra_attrs,
                        escape_html(label)
                    )
                })
                .collect()
        }
        FieldKind::Group | FieldKind::Tree => String::new(),
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// CHECKBOX TREES
// ═══════════════════════════════════════════════════════════════════════════════

/// Render a tree; the cascade mode lives in the controller script, not here.
pub fn render_tree(tree: &CheckboxTree, input_name: &str) -> String {
    fn items(nodes: &[TreeNode], input_name: &str, out: &mut String) {
        out.push_str("<ul>");
        for node in nodes {
            out.push_str(&format!("<li{}>", attr(ATTR_TREE_NODE, &node.value)));
            out.push_str(&format!(
                "<label><input type=\"checkbox\" {}{}{}{}{}{}> {}</label>",
                ATTR_TREE_CHECKBOX,
                attr("name", input_name),
                attr("value", &node.value),
                attr("aria-checked", node.state().aria()),
                if node.checked { " checked" } else { "" },
                if node.disabled { " disabled" } else { "" },
                escape_html(&node.label)
            ));
            if node.has_children() {
                items(&node.children, input_name, out);
            }
            out.push_str("</li>");
        }
        out.push_str("</ul>");
    }

    let mut out = format!("<div{}>", attr(ATTR_TREE, tree.id()));
    items(&tree.nodes, input_name, &mut out);
    out.push_str("</div>");
    out
}

// ═══════════════════════════════════════════════════════════════════════════════
// REPEATERS
// ═══════════════════════════════════════════════════════════════════════════════

/// `name[index][field]`
pub fn indexed_name(repeater: &str, index: &str, field: &str) -> String {
    format!("{}[{}][{}]", repeater, index, field)
}

pub fn repeater_row(index: &str, inner_html: &str) -> String {
    format!("<div{}>{}</div>", attr(ATTR_REPEATER_ROW, index), inner_html)
}

pub fn repeater_prototype(name: &str, row_html: &str) -> String {
    format!(
        "<script type=\"text/template\"{}>{}</script>",
        attr(ATTR_REPEATER_PROTOTYPE, name),
        row_html.replace("</", "<\\/")
    )
}

pub fn repeater_container(name: &str, rows_html: &str, prototype_html: &str) -> String {
    format!(
        "<div{}>{}</div>{}",
        attr(ATTR_REPEATER, name),
        rows_html,
        prototype_html
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::CascadeMode;

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html(r#"<a href="x">&'"#), "&lt;a href=&quot;x&quot;&gt;&amp;&#39;");
    }

    #[test]
    fn test_wrapper_attributes() {
        let ids: BTreeSet<String> = ["account_type-business", "account_type-enterprise"]
            .into_iter()
            .map(String::from)
            .collect();
        let hidden = dependent_wrapper("company_size", "account_type", &ids, false, "x");
        assert_eq!(
            hidden,
            "<div data-dependend=\"account_type-business account_type-enterprise\" \
             data-dependend-group=\"account_type\" data-dependend-field=\"company_size\" \
             style=\"display: none\">x</div>"
        );
        let shown = dependent_wrapper("company_size", "account_type", &ids, true, "x");
        assert!(!shown.contains("style"));
    }

    #[test]
    fn test_controller_attrs() {
        assert_eq!(
            controller_attrs("account_type", &["account_type"]),
            " data-dependency=\"true\" data-dependency-group=\"account_type\" \
             data-dependency-field=\"account_type\""
        );
    }

    #[test]
    fn test_select_marks_selected_option() {
        let html = render_control(
            "country",
            FieldKind::Select,
            &FieldValue::text("de"),
            &[("".into(), "-".into()), ("de".into(), "Germany".into())],
            "",
        );
        assert!(html.contains("<option value=\"de\" selected>Germany</option>"));
        assert!(html.contains("<option value=\"\">-</option>"));
    }

    #[test]
    fn test_tree_markup() {
        let tree = CheckboxTree::new(
            "perm",
            CascadeMode::Cascade,
            vec![TreeNode::new("a", "A & B").child(TreeNode::new("a1", "A1").checked(true))],
        )
        .unwrap();
        let html = render_tree(&tree, "perm[]");
        assert!(html.starts_with("<div data-checkbox-tree=\"perm\"><ul><li data-tree-node=\"a\">"));
        assert!(html.contains("A &amp; B"));
        assert!(html.contains("value=\"a1\" aria-checked=\"true\" checked"));
    }

    #[test]
    fn test_prototype_escapes_closing_tags() {
        let html = repeater_prototype("items", "<div>__index__</div>");
        assert_eq!(
            html,
            "<script type=\"text/template\" data-repeater-prototype=\"items\"><div>__index__<\\/div></script>"
        );
    }
}
