/// How a text element is split into independently animated streams.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeWriting {
    /// The whole element moves as one stream.
    #[default]
    Element,
    /// One stream per character.
    Character,
    /// One stream per whitespace-separated word.
    Word,
}

/// Number of streams `text` needs under `writing`. Never zero.
pub fn token_count(text: &str, writing: TypeWriting) -> usize {
    let n = match writing {
        TypeWriting::Element => 1,
        TypeWriting::Character => text.chars().count(),
        TypeWriting::Word => text.split_whitespace().count(),
    };
    n.max(1)
}

/// Split `text` into the tokens that [`token_count`] counts.
pub fn tokens(text: &str, writing: TypeWriting) -> Vec<&str> {
    let out: Vec<&str> = match writing {
        TypeWriting::Element => vec![text],
        TypeWriting::Character => text
            .char_indices()
            .map(|(i, c)| &text[i..i + c.len_utf8()])
            .collect(),
        TypeWriting::Word => text.split_whitespace().collect(),
    };
    if out.is_empty() { vec![text] } else { out }
}

#[cfg(test)]
#[path = "../../tests/unit/element/tokens.rs"]
mod tests;
