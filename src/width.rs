use serde::{Deserialize, Serialize};

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Justify {
    Left,
    #[default]
    Right,
}

/// Pads `text` with spaces until it is at least `width` characters wide.
/// Right-justified text gets leading padding, left-justified text trailing.
/// Never truncates.
pub fn pad(text: &str, width: usize, justify: Justify) -> String {
    let len = text.chars().count();
    if len >= width {
        return text.to_string();
    }
    let fill = " ".repeat(width - len);
    match justify {
        Justify::Left => format!("{text}{fill}"),
        Justify::Right => format!("{fill}{text}"),
    }
}

/// Width and alignment applied to every message a decorator hands back.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WidthConfig {
    /// Minimum display width; 0 disables padding.
    pub width: usize,
    pub justify: Justify,
}

impl WidthConfig {
    pub fn new(width: usize, justify: Justify) -> Self {
        Self { width, justify }
    }

    /// Normalizes the config before first use. Idempotent.
    pub fn init(&mut self) -> &mut Self {
        // zero width means no padding, alignment falls back to the default
        if self.width == 0 {
            self.justify = Justify::Right;
        }
        self
    }

    pub fn format_msg(&self, msg: &str) -> String {
        pad(msg, self.width, self.justify)
    }
}
