// Tooltip-style feedback: content from feature attributes, placement near the
// pointer and kept inside the host element.
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::FeedbackConfig;
use crate::models::Properties;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScreenPoint {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HostRect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl HostRect {
    pub fn right(&self) -> f64 {
        self.left + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }

    pub fn contains(&self, p: &ScreenPoint) -> bool {
        p.x >= self.left && p.x <= self.right() && p.y >= self.top && p.y <= self.bottom()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlockSize {
    pub width: f64,
    pub height: f64,
}

/// Tag the host styles the block by. Only parcels are hoverable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedbackCategory {
    Parcel,
}

/// What the host renders in its single feedback slot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeedbackBlock {
    pub left: f64,
    pub top: f64,
    pub html: String,
    pub category: FeedbackCategory,
}

/// Top-left corner for a block of `block` size next to `pointer`.
///
/// The block goes `offset` below-right of the pointer; it flips to the left
/// when it would cross the right edge and above when it would cross the
/// bottom edge, and is finally clamped so it stays inside `host`. A block
/// larger than the host is pinned to the host's top-left.
pub fn place_feedback(
    pointer: ScreenPoint,
    block: BlockSize,
    host: HostRect,
    offset: f64,
) -> ScreenPoint {
    let mut x = pointer.x + offset;
    let mut y = pointer.y + offset;

    if x + block.width > host.right() {
        x = pointer.x - offset - block.width;
    }
    if y + block.height > host.bottom() {
        y = pointer.y - offset - block.height;
    }

    x = x.min(host.right() - block.width).max(host.left);
    y = y.min(host.bottom() - block.height).max(host.top);

    ScreenPoint { x, y }
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => escape_html(s),
        Value::Number(n) => match n.as_f64() {
            Some(f) if f.fract() == 0.0 => format!("{}", f as i64),
            Some(f) => format!("{:.1}", f),
            None => n.to_string(),
        },
        Value::Bool(b) => b.to_string(),
        _ => "–".to_string(),
    }
}

/// HTML fragment describing a hovered parcel.
pub fn parcel_feedback_html(
    properties: &Properties,
    key_attribute: &str,
    walk_time_attribute: &str,
) -> String {
    let key = properties
        .get(key_attribute)
        .map(display_value)
        .unwrap_or_else(|| "–".to_string());
    let walk_time = properties
        .get(walk_time_attribute)
        .filter(|v| !v.is_null())
        .map(|v| format!("{} min", display_value(v)))
        .unwrap_or_else(|| "no route".to_string());

    format!(
        "<div class=\"feedback feedback-parcel\"><strong>Parcel {}</strong><br>Walking time: {}</div>",
        key, walk_time
    )
}

/// The one feedback block that may be visible. Showing replaces.
#[derive(Debug)]
pub struct FeedbackSlot {
    host: HostRect,
    block: BlockSize,
    offset: f64,
    current: Option<FeedbackBlock>,
}

impl FeedbackSlot {
    pub fn new(config: &FeedbackConfig) -> Self {
        Self {
            host: HostRect {
                left: 0.0,
                top: 0.0,
                width: config.host_width,
                height: config.host_height,
            },
            block: BlockSize {
                width: config.block_width,
                height: config.block_height,
            },
            offset: config.offset,
            current: None,
        }
    }

    pub fn resize_host(&mut self, width: f64, height: f64) {
        self.host.width = width;
        self.host.height = height;
    }

    pub fn show(
        &mut self,
        pointer: ScreenPoint,
        html: String,
        category: FeedbackCategory,
    ) -> &FeedbackBlock {
        let at = place_feedback(pointer, self.block, self.host, self.offset);
        self.current.insert(FeedbackBlock {
            left: at.x,
            top: at.y,
            html,
            category,
        })
    }

    pub fn hide(&mut self) -> bool {
        self.current.take().is_some()
    }

    pub fn current(&self) -> Option<&FeedbackBlock> {
        self.current.as_ref()
    }
}
