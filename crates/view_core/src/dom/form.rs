use client_core::FormData;

use super::{Document, NodeId};

const UNSUBMITTED_INPUT_TYPES: &[&str] = &["submit", "button", "reset", "image", "file"];

impl Document {
    /// Lower-cased `type` of an `<input>`, defaulting to `text`.
    pub fn input_type(&self, id: NodeId) -> String {
        self.attr(id, "type")
            .map(str::to_ascii_lowercase)
            .unwrap_or_else(|| "text".to_string())
    }

    pub fn is_checked(&self, id: NodeId) -> bool {
        self.has_attr(id, "checked")
    }

    pub fn set_checked(&mut self, id: NodeId, checked: bool) {
        if checked {
            self.set_attr(id, "checked", "");
        } else {
            self.remove_attr(id, "checked");
        }
    }

    pub fn value(&self, id: NodeId) -> String {
        match self.tag(id) {
            Some("textarea") => self.text_content(id),
            Some("select") => self
                .selected_options(id)
                .first()
                .map(|option| self.option_value(*option))
                .unwrap_or_default(),
            _ => self.attr(id, "value").unwrap_or_default().to_string(),
        }
    }

    pub fn set_value(&mut self, id: NodeId, value: &str) {
        match self.tag(id) {
            Some("textarea") => self.set_text(id, value),
            Some("select") => {
                for option in self.find_all_in(id, |doc, node| doc.is_tag(node, "option")) {
                    if self.option_value(option) == value {
                        self.set_attr(option, "selected", "");
                    } else {
                        self.remove_attr(option, "selected");
                    }
                }
            }
            _ => self.set_attr(id, "value", value),
        }
    }

    fn option_value(&self, option: NodeId) -> String {
        self.attr(option, "value")
            .map(str::to_string)
            .unwrap_or_else(|| self.text_content(option).trim().to_string())
    }

    fn selected_options(&self, select: NodeId) -> Vec<NodeId> {
        let options = self.find_all_in(select, |doc, node| doc.is_tag(node, "option"));
        let selected: Vec<NodeId> = options
            .iter()
            .copied()
            .filter(|option| self.has_attr(*option, "selected"))
            .collect();
        if !selected.is_empty() || self.has_attr(select, "multiple") {
            return selected;
        }
        options.into_iter().take(1).collect()
    }

    /// Named, enabled controls of a form in document order.
    pub fn form_controls(&self, form: NodeId) -> Vec<NodeId> {
        self.find_all_in(form, |doc, node| {
            matches!(doc.tag(node), Some("input" | "select" | "textarea"))
                && doc.attr(node, "name").is_some_and(|name| !name.is_empty())
                && !doc.has_attr(node, "disabled")
        })
    }

    /// What a browser would submit for `form`.
    pub fn form_data(&self, form: NodeId) -> FormData {
        let mut data = FormData::new();
        for control in self.form_controls(form) {
            let name = self.attr(control, "name").unwrap_or_default().to_string();
            match self.tag(control) {
                Some("input") => {
                    let kind = self.input_type(control);
                    if UNSUBMITTED_INPUT_TYPES.contains(&kind.as_str()) {
                        continue;
                    }
                    if kind == "checkbox" || kind == "radio" {
                        if self.is_checked(control) {
                            let value = self.attr(control, "value").unwrap_or("on");
                            data.append(name, value);
                        }
                        continue;
                    }
                    data.append(name, self.value(control));
                }
                Some("select") => {
                    for option in self.selected_options(control) {
                        data.append(name.clone(), self.option_value(option));
                    }
                }
                _ => data.append(name, self.value(control)),
            }
        }
        data
    }

    /// Names of required controls left empty; empty when the form is valid.
    pub fn missing_required(&self, form: NodeId) -> Vec<String> {
        let controls = self.form_controls(form);
        let mut missing: Vec<String> = Vec::new();
        for control in &controls {
            if !self.has_attr(*control, "required") {
                continue;
            }
            let name = self.attr(*control, "name").unwrap_or_default().to_string();
            let satisfied = match self.tag(*control) {
                Some("input") => match self.input_type(*control).as_str() {
                    "checkbox" => self.is_checked(*control),
                    "radio" => controls.iter().any(|other| {
                        self.attr(*other, "name") == Some(name.as_str()) && self.is_checked(*other)
                    }),
                    kind if UNSUBMITTED_INPUT_TYPES.contains(&kind) => true,
                    _ => !self.value(*control).is_empty(),
                },
                _ => !self.value(*control).is_empty(),
            };
            if !satisfied && !missing.contains(&name) {
                missing.push(name);
            }
        }
        missing
    }
}
