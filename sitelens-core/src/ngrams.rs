// Word and phrase frequency over page titles, descriptions and H1s

use crate::error::{AuditError, Result};
use crate::model::{PageRecord, PageStore};
use crate::table::{Cell, Column, ReportTable, Row};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::info;

const STOPWORDS: &[&str] = &[
    "a", "about", "above", "after", "again", "against", "all", "am", "an", "and", "any", "are",
    "as", "at", "be", "because", "been", "before", "being", "below", "between", "both", "but",
    "by", "can", "could", "did", "do", "does", "doing", "down", "during", "each", "few", "for",
    "from", "further", "had", "has", "have", "having", "he", "her", "here", "hers", "herself",
    "him", "himself", "his", "how", "i", "if", "in", "into", "is", "it", "its", "itself", "just",
    "me", "more", "most", "my", "myself", "no", "nor", "not", "now", "of", "off", "on", "once",
    "only", "or", "other", "our", "ours", "ourselves", "out", "over", "own", "same", "she",
    "should", "so", "some", "such", "than", "that", "the", "their", "theirs", "them",
    "themselves", "then", "there", "these", "they", "this", "those", "through", "to", "too",
    "under", "until", "up", "very", "was", "we", "were", "what", "when", "where", "which",
    "while", "who", "whom", "why", "will", "with", "would", "you", "your", "yours", "yourself",
    "yourselves",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NgramRow {
    pub ngram: String,
    pub abs_freq: usize,
}

impl Row for NgramRow {
    const COLUMNS: &'static [Column] = &[Column::text("ngram"), Column::integer("abs_freq")];

    fn cells(&self) -> Vec<Cell> {
        vec![
            Cell::Text(self.ngram.clone()),
            Cell::Integer(self.abs_freq as i64),
        ]
    }
}

pub fn is_stopword(token: &str) -> bool {
    STOPWORDS.contains(&token)
}

/// True for tokens with no letters or digits, such as `|`, `-` or `·`.
pub fn is_symbol_token(token: &str) -> bool {
    !token.chars().any(char::is_alphanumeric)
}

/// Lowercased tokens with surrounding punctuation trimmed.
///
/// Symbol tokens survive untouched so separator noise can be measured.
pub fn tokenize(text: &str) -> Vec<String> {
    text.split_whitespace()
        .filter_map(|raw| {
            let lowered = raw.to_lowercase();
            if is_symbol_token(&lowered) {
                return Some(lowered);
            }
            let trimmed = lowered.trim_matches(|c: char| !c.is_alphanumeric());
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        })
        .collect()
}

fn page_text(page: &PageRecord) -> String {
    let mut parts: Vec<&str> = Vec::new();
    parts.extend(page.title.as_deref());
    parts.extend(page.meta_description.as_deref());
    parts.extend(page.h1.texts());
    parts.join(" ")
}

/// Phrase frequencies of length `n` across the page store.
///
/// Phrases never span two pages. Rows are ordered by descending frequency,
/// ties broken alphabetically.
pub fn report_ngrams(pages: &PageStore, n: usize) -> Result<ReportTable<NgramRow>> {
    if n == 0 {
        return Err(AuditError::InvalidInput {
            source_name: "ngrams".to_string(),
            message: "phrase length must be at least 1".to_string(),
        });
    }
    info!("Generating {}-gram analysis (phrase_len={})...", n, n);

    let mut counts: HashMap<String, usize> = HashMap::new();
    for page in pages.pages() {
        let tokens = tokenize(&page_text(page));
        if n == 1 {
            for token in tokens.into_iter().filter(|t| !is_stopword(t)) {
                *counts.entry(token).or_default() += 1;
            }
        } else {
            for window in tokens.windows(n) {
                *counts.entry(window.join(" ")).or_default() += 1;
            }
        }
    }

    let mut rows: Vec<NgramRow> = counts
        .into_iter()
        .map(|(ngram, abs_freq)| NgramRow { ngram, abs_freq })
        .collect();
    rows.sort_by(|a, b| b.abs_freq.cmp(&a.abs_freq).then_with(|| a.ngram.cmp(&b.ngram)));

    info!("{}-gram report generated with {} rows", n, rows.len());
    Ok(ReportTable::new(rows))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_trims_punctuation_keeps_symbols() {
        assert_eq!(
            tokenize("Acme | Shoes, Boots & More!"),
            vec!["acme", "|", "shoes", "boots", "&", "more"]
        );
    }

    #[test]
    fn test_symbol_tokens() {
        assert!(is_symbol_token("|"));
        assert!(is_symbol_token("-"));
        assert!(is_symbol_token("·"));
        assert!(!is_symbol_token("r&d"));
    }

    #[test]
    fn test_stopwords() {
        assert!(is_stopword("the"));
        assert!(!is_stopword("shoes"));
    }
}
