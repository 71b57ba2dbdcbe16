//! Tips module - workout tips and their expand/collapse presentation

use serde::{Deserialize, Serialize};

/// Characters of content shown while a tip is collapsed
pub const PREVIEW_CHARS: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tip {
    #[serde(rename = "$id")]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub thumbnail: Option<String>,
}

impl Tip {
    /// Leading characters of the content followed by an ellipsis
    pub fn preview(&self) -> String {
        let head: String = self.content.chars().take(PREVIEW_CHARS).collect();
        format!("{}...", head)
    }

    pub fn body(&self, expanded: bool) -> String {
        if expanded {
            self.content.clone()
        } else {
            self.preview()
        }
    }
}

pub fn expand_label(expanded: bool) -> &'static str {
    if expanded { "Show less" } else { "Read more" }
}

/// Which tip, if any, is shown in full
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TipExpansion {
    expanded: Option<usize>,
}

impl TipExpansion {
    /// Expand `index`, or collapse it if it is already expanded
    pub fn toggle(&mut self, index: usize) {
        self.expanded = if self.expanded == Some(index) { None } else { Some(index) };
    }

    pub fn is_expanded(&self, index: usize) -> bool {
        self.expanded == Some(index)
    }

    pub fn expanded(&self) -> Option<usize> {
        self.expanded
    }
}

/// Format tip for plain-text output
pub fn format_tip(tip: &Tip, expanded: bool) -> String {
    format!("{}\n{}\n{}", tip.title, tip.body(expanded), expand_label(expanded))
}
