use std::path::PathBuf;

/// Manual navigation requested from outside the autoplay loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavCommand {
    Next { carousel: String },
    Prev { carousel: String },
    /// Raw index text; non-numeric values are ignored by the carousel.
    JumpTo { carousel: String, raw: String },
}

impl NavCommand {
    /// Parse a console line: `next [carousel]`, `prev [carousel]` or
    /// `<carousel> <index>`. A missing carousel name means `default`.
    pub fn parse_line(line: &str, default: &str) -> Option<Self> {
        let mut parts = line.split_whitespace();
        let head = parts.next()?;
        let tail = parts.next();
        let carousel = |t: Option<&str>| t.unwrap_or(default).to_string();
        match head {
            "next" | "n" => Some(Self::Next {
                carousel: carousel(tail),
            }),
            "prev" | "p" => Some(Self::Prev {
                carousel: carousel(tail),
            }),
            name => tail.map(|raw| Self::JumpTo {
                carousel: name.to_string(),
                raw: raw.to_string(),
            }),
        }
    }

    pub fn carousel(&self) -> &str {
        match self {
            Self::Next { carousel } | Self::Prev { carousel } | Self::JumpTo { carousel, .. } => {
                carousel
            }
        }
    }
}

/// Emitted whenever a carousel shows a different slide.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlideChanged {
    pub carousel: String,
    pub index: usize,
    pub path: PathBuf,
    pub caption: String,
}
