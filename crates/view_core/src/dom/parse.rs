//! Tolerant HTML parser for server-rendered pages and form fragments.

use super::{Document, NodeId, VOID_ELEMENTS};

/// Elements whose content is taken verbatim up to the matching end tag.
const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style", "textarea", "title"];

/// An open element of this tag is closed when a sibling of the same tag starts.
const SELF_NESTING_FORBIDDEN: &[&str] = &["p", "li", "option"];

pub(super) fn parse_into(doc: &mut Document, parent: NodeId, html: &str) {
    let mut stack = vec![parent];
    let mut rest = html;

    while !rest.is_empty() {
        if let Some(after) = rest.strip_prefix("<!--") {
            rest = after.find("-->").map_or("", |end| &after[end + 3..]);
            continue;
        }
        if rest.starts_with("<!") || rest.starts_with("<?") {
            let end = rest.find('>').map_or(rest.len(), |end| end + 1);
            rest = &rest[end..];
            continue;
        }
        if let Some(after) = rest.strip_prefix("</") {
            let end = after.find('>').unwrap_or(after.len());
            let name = after[..end].trim().to_ascii_lowercase();
            rest = after.get(end + 1..).unwrap_or("");
            close_element(doc, &mut stack, &name);
            continue;
        }
        if starts_tag(rest) {
            let (tag, consumed) = read_tag(&rest[1..]);
            rest = &rest[1 + consumed..];
            let top = *stack.last().unwrap_or(&parent);
            if SELF_NESTING_FORBIDDEN.contains(&tag.name.as_str())
                && doc.is_tag(top, &tag.name)
                && stack.len() > 1
            {
                stack.pop();
            }
            let top = *stack.last().unwrap_or(&parent);
            let node = doc.create_element(&tag.name);
            for (key, value) in tag.attrs {
                doc.set_attr(node, &key, value);
            }
            doc.append_child(top, node);

            if RAW_TEXT_ELEMENTS.contains(&tag.name.as_str()) && !tag.self_closing {
                let (content, remaining) = split_raw_text(rest, &tag.name);
                if !content.is_empty() {
                    let text = if tag.name == "script" || tag.name == "style" {
                        content.to_string()
                    } else {
                        decode_entities(content)
                    };
                    let text_node = doc.create_text(text);
                    doc.append_child(node, text_node);
                }
                rest = remaining;
            } else if !tag.self_closing && !VOID_ELEMENTS.contains(&tag.name.as_str()) {
                stack.push(node);
            }
            continue;
        }

        let end = if rest.starts_with('<') {
            rest[1..].find('<').map_or(rest.len(), |idx| idx + 1)
        } else {
            rest.find('<').unwrap_or(rest.len())
        };
        let text = decode_entities(&rest[..end]);
        rest = &rest[end..];
        let top = *stack.last().unwrap_or(&parent);
        let text_node = doc.create_text(text);
        doc.append_child(top, text_node);
    }
}

fn starts_tag(input: &str) -> bool {
    let mut chars = input.chars();
    chars.next() == Some('<') && chars.next().is_some_and(|c| c.is_ascii_alphabetic())
}

/// Pops back to the innermost open element named `name`; stray end tags are ignored.
fn close_element(doc: &Document, stack: &mut Vec<NodeId>, name: &str) {
    if let Some(pos) = stack
        .iter()
        .skip(1)
        .rposition(|node| doc.is_tag(*node, name))
    {
        stack.truncate(pos + 1);
    }
}

struct Tag {
    name: String,
    attrs: Vec<(String, String)>,
    self_closing: bool,
}

/// Reads a start tag after its `<`; returns the tag and the bytes consumed.
fn read_tag(input: &str) -> (Tag, usize) {
    let name_len = input
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '-' || c == ':'))
        .unwrap_or(input.len());
    let mut tag = Tag {
        name: input[..name_len].to_ascii_lowercase(),
        attrs: Vec::new(),
        self_closing: false,
    };
    let mut pos = name_len;

    loop {
        pos += leading_whitespace(&input[pos..]);
        let rest = &input[pos..];
        if rest.is_empty() {
            break;
        }
        if rest.starts_with("/>") {
            tag.self_closing = true;
            pos += 2;
            break;
        }
        if rest.starts_with('>') {
            pos += 1;
            break;
        }

        let key_len = rest
            .find(|c: char| c.is_whitespace() || c == '=' || c == '>' || c == '/')
            .unwrap_or(rest.len());
        if key_len == 0 {
            // lone '/' or '=' inside the tag
            pos += rest.chars().next().map_or(1, char::len_utf8);
            continue;
        }
        let key = rest[..key_len].to_ascii_lowercase();
        pos += key_len;
        pos += leading_whitespace(&input[pos..]);

        let mut value = String::new();
        if input[pos..].starts_with('=') {
            pos += 1;
            pos += leading_whitespace(&input[pos..]);
            let rest = &input[pos..];
            match rest.chars().next() {
                Some(quote @ ('"' | '\'')) => {
                    let body = &rest[1..];
                    let end = body.find(quote).unwrap_or(body.len());
                    value = decode_entities(&body[..end]);
                    pos += 1 + end + usize::from(end < body.len());
                }
                Some(_) => {
                    let end = rest
                        .find(|c: char| c.is_whitespace() || c == '>')
                        .unwrap_or(rest.len());
                    value = decode_entities(&rest[..end]);
                    pos += end;
                }
                None => {}
            }
        }
        if !tag.attrs.iter().any(|(existing, _)| *existing == key) {
            tag.attrs.push((key, value));
        }
    }

    (tag, pos)
}

fn leading_whitespace(input: &str) -> usize {
    input.len() - input.trim_start().len()
}

/// Splits raw element content at `</name`, matched case-insensitively.
fn split_raw_text<'a>(input: &'a str, name: &str) -> (&'a str, &'a str) {
    let needle = format!("</{name}");
    let lower = input.to_ascii_lowercase();
    match lower.find(&needle) {
        Some(start) => {
            let after = &input[start..];
            let end = after.find('>').map_or(after.len(), |idx| idx + 1);
            (&input[..start], &after[end..])
        }
        None => (input, ""),
    }
}

pub fn decode_entities(input: &str) -> String {
    if !input.contains('&') {
        return input.to_string();
    }
    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];
        let Some(semi) = rest[1..].find(';').map(|idx| idx + 1).filter(|idx| *idx <= 10) else {
            out.push('&');
            rest = &rest[1..];
            continue;
        };
        let entity = &rest[1..semi];
        let decoded = match entity {
            "amp" => Some('&'),
            "lt" => Some('<'),
            "gt" => Some('>'),
            "quot" => Some('"'),
            "apos" => Some('\''),
            "nbsp" => Some('\u{a0}'),
            _ => entity
                .strip_prefix("#x")
                .or_else(|| entity.strip_prefix("#X"))
                .and_then(|hex| u32::from_str_radix(hex, 16).ok())
                .or_else(|| entity.strip_prefix('#').and_then(|dec| dec.parse().ok()))
                .and_then(char::from_u32),
        };
        match decoded {
            Some(c) => {
                out.push(c);
                rest = &rest[semi + 1..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}
