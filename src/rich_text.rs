use serde::{Deserialize, Serialize};

/// Rich-text message content: a nested node tree matching the backend's
/// document format. The client never interprets formatting beyond walking
/// for text; rendering flattens to plain text.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RichTextDoc {
    #[serde(default)]
    pub content: Vec<RichTextNode>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RichTextNode {
    #[serde(rename = "type", default, skip_serializing_if = "String::is_empty")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub content: Vec<RichTextNode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl RichTextDoc {
    /// Builds a one-paragraph document from composer input.
    pub fn from_plain_text(text: &str) -> Self {
        Self {
            content: vec![RichTextNode {
                kind: "paragraph".to_string(),
                content: vec![RichTextNode {
                    kind: "text".to_string(),
                    content: Vec::new(),
                    text: Some(text.to_string()),
                }],
                text: None,
            }],
        }
    }

    /// True only if some leaf carries non-whitespace text. Documents made of
    /// empty formatting nodes alone are rejected before submit.
    pub fn has_text(&self) -> bool {
        self.content.iter().any(node_has_text)
    }

    /// Flattens the tree to plain text for display and edit prefill.
    pub fn to_plain_text(&self) -> String {
        let mut out = String::new();
        for node in &self.content {
            collect_text(node, &mut out);
        }
        out.trim_end().to_string()
    }
}

fn node_has_text(node: &RichTextNode) -> bool {
    if let Some(text) = &node.text {
        if !text.trim().is_empty() {
            return true;
        }
    }
    node.content.iter().any(node_has_text)
}

fn collect_text(node: &RichTextNode, out: &mut String) {
    if let Some(text) = &node.text {
        out.push_str(text);
    }
    for child in &node.content {
        collect_text(child, out);
    }
    if node.kind == "paragraph" && !out.ends_with('\n') && !out.is_empty() {
        out.push('\n');
    }
}
