//! Tokenization shared by keyword ranking, embeddings and profile search.

const STOPWORDS: &[&str] = &[
    "a", "an", "and", "are", "at", "by", "for", "from", "in", "is", "it", "of", "on", "or",
    "that", "the", "to", "with", "what", "which", "who", "my", "me", "i",
];

/// Lowercased alphanumeric tokens with stopwords and single characters removed.
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.len() > 1)
        .map(|t| t.to_lowercase())
        .filter(|t| !STOPWORDS.contains(&t.as_str()))
        .collect()
}
