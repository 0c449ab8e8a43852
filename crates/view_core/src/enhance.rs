//! Decoration of freshly inserted form fragments.

use tracing::{debug, warn};

use crate::dom::{Document, NodeId};

pub const FIELD_GROUP_CLASS: &str = "form-group";
pub const LABEL_CLASS: &str = "form-label";
pub const CONTROL_CLASS: &str = "form-control";
pub const CHECKBOX_CLASS: &str = "form-check-input";
pub const REQUIRED_MARKER_CLASS: &str = "required-marker";
pub const STANDIN_FIELD: &str = "is_standin";
pub const CHECKBOX_PARENT_CLASS: &str = "checkbox_parent";
pub const CHECKBOX_LABEL_CLASS: &str = "checkbox_label_div";

/// Input types that get the control class.
const CONTROL_INPUT_TYPES: &[&str] = &[
    "text", "password", "checkbox", "email", "number", "tel", "url", "date",
];
const NON_FIELD_INPUT_TYPES: &[&str] = &["hidden", "submit", "button", "reset", "image"];

/// One form control and the label it is presented with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldMeta {
    pub name: String,
    pub input: NodeId,
    pub label: Option<NodeId>,
    pub required: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relocation {
    Applied,
    AlreadyApplied,
    NotPresent,
}

/// Adds field-group, label and control classes to `container`'s children and
/// marks the labels of required fields. Returns the fields found.
pub fn decorate(doc: &mut Document, container: NodeId) -> Vec<FieldMeta> {
    for group in doc.element_children(container) {
        doc.add_class(group, FIELD_GROUP_CLASS);
        for element in doc.element_children(group) {
            match doc.tag(element) {
                Some("label") => doc.add_class(element, LABEL_CLASS),
                Some("input") => {
                    let kind = doc.input_type(element);
                    if CONTROL_INPUT_TYPES.contains(&kind.as_str()) {
                        doc.add_class(element, CONTROL_CLASS);
                    }
                    if kind == "checkbox" {
                        doc.add_class(element, CHECKBOX_CLASS);
                    }
                }
                _ => {}
            }
        }
    }

    let fields = collect_fields(doc, container);
    let marked = mark_required(doc, &fields);
    debug!(fields = fields.len(), marked, "decorated form fragment");
    fields
}

/// Field records for every named control below `container`.
///
/// A label is matched by its `for` attribute first. Without one, the first
/// element of the control's wrapper is used when it is a `<label>`.
pub fn collect_fields(doc: &Document, container: NodeId) -> Vec<FieldMeta> {
    let labels = doc.find_all_in(container, |doc, node| doc.is_tag(node, "label"));
    doc.find_all_in(container, |doc, node| {
        let is_control = match doc.tag(node) {
            Some("input") => !NON_FIELD_INPUT_TYPES.contains(&doc.input_type(node).as_str()),
            Some("select" | "textarea") => true,
            _ => false,
        };
        is_control && doc.has_attr(node, "name")
    })
    .into_iter()
    .map(|input| {
        let by_for = doc.attr(input, "id").and_then(|id| {
            labels
                .iter()
                .copied()
                .find(|label| doc.attr(*label, "for") == Some(id))
        });
        let positional = || {
            doc.parent(input)
                .and_then(|wrapper| doc.first_element_child(wrapper))
                .filter(|first| *first != input && doc.is_tag(*first, "label"))
        };
        FieldMeta {
            name: doc.attr(input, "name").unwrap_or_default().to_string(),
            input,
            label: by_for.or_else(positional),
            required: doc.has_attr(input, "required"),
        }
    })
    .collect()
}

/// Appends a red ` *` to each required field's label. Labels that already carry
/// a marker are left alone. Returns the number of markers added.
pub fn mark_required(doc: &mut Document, fields: &[FieldMeta]) -> usize {
    let mut added = 0;
    for field in fields.iter().filter(|field| field.required) {
        let Some(label) = field.label else {
            debug!(field = %field.name, "required field has no label");
            continue;
        };
        if has_required_marker(doc, label) {
            continue;
        }
        let marker = doc.create_element("span");
        doc.add_class(marker, REQUIRED_MARKER_CLASS);
        doc.set_attr(marker, "style", "color: red");
        doc.set_text(marker, " *");
        doc.append_child(label, marker);
        added += 1;
    }
    added
}

pub fn has_required_marker(doc: &Document, label: NodeId) -> bool {
    doc.find_in(label, |doc, node| doc.has_class(node, REQUIRED_MARKER_CLASS))
        .is_some()
}

/// Splits the `is_standin` wrapper so the checkbox sits apart from its label and help text.
pub fn relocate_standin_checkbox(doc: &mut Document, scope: NodeId) -> Relocation {
    let Some(input) = doc.find_in(scope, |doc, node| {
        doc.is_tag(node, "input")
            && (doc.attr(node, "name") == Some(STANDIN_FIELD)
                || doc.attr(node, "id") == Some("id_is_standin"))
    }) else {
        return Relocation::NotPresent;
    };
    let Some(wrapper) = doc.parent(input) else {
        warn!("is_standin checkbox has no wrapper");
        return Relocation::NotPresent;
    };
    if doc.has_class(wrapper, CHECKBOX_PARENT_CLASS) {
        debug!("is_standin checkbox already relocated");
        return Relocation::AlreadyApplied;
    }

    doc.add_class(wrapper, CHECKBOX_PARENT_CLASS);
    let label_div = doc.create_element("div");
    doc.add_class(label_div, CHECKBOX_LABEL_CLASS);
    let siblings: Vec<NodeId> = doc
        .children(wrapper)
        .iter()
        .copied()
        .filter(|child| *child != input)
        .collect();
    for sibling in siblings {
        doc.append_child(label_div, sibling);
    }
    doc.clear_children(wrapper);
    doc.append_child(wrapper, input);
    doc.append_child(wrapper, label_div);
    Relocation::Applied
}

#[cfg(test)]
#[path = "tests/enhance_tests.rs"]
mod tests;
