//! Plain text from course markup.

use regex::Regex;

use crate::error::{Error, Result};

const TAG_PATTERN: &str = r"<[^>]*>";
const ENTITY_PATTERN: &str = r"&(#[0-9]+|#[xX][0-9a-fA-F]+|[a-zA-Z]+);";
const SPACE_PATTERN: &str = r"\s+";

/// Strips tags and decodes entities in module names and descriptions.
#[derive(Debug, Clone)]
pub struct HtmlText {
    tags: Regex,
    entities: Regex,
    spaces: Regex,
}

impl HtmlText {
    pub fn new() -> Result<Self> {
        let compile = |pattern: &str| {
            Regex::new(pattern).map_err(|e| Error::Config(format!("Bad markup pattern: {}", e)))
        };
        Ok(Self {
            tags: compile(TAG_PATTERN)?,
            entities: compile(ENTITY_PATTERN)?,
            spaces: compile(SPACE_PATTERN)?,
        })
    }

    /// Render `markup` as a single line of plain text.
    pub fn to_plain(&self, markup: &str) -> String {
        let text = self.tags.replace_all(markup, " ");
        let text = self.entities.replace_all(&text, |caps: &regex::Captures<'_>| {
            decode_entity(&caps[1]).unwrap_or_else(|| caps[0].to_string())
        });
        self.spaces.replace_all(&text, " ").trim().to_string()
    }
}

fn decode_entity(name: &str) -> Option<String> {
    let decoded = match name {
        "amp" => '&',
        "lt" => '<',
        "gt" => '>',
        "quot" => '"',
        "apos" => '\'',
        "nbsp" => ' ',
        _ => {
            let code = if let Some(hex) = name.strip_prefix("#x").or_else(|| name.strip_prefix("#X")) {
                u32::from_str_radix(hex, 16).ok()?
            } else {
                name.strip_prefix('#')?.parse().ok()?
            };
            char::from_u32(code)?
        }
    };
    Some(decoded.to_string())
}
