//! Entity and metric vocabulary used to recognise comparative questions and
//! to tag documents with a company.
//!
//! The table is plain data so callers can extend it; names missing from the
//! table are simply not recognised, and comparative questions about them fall
//! back to a single unexpanded search.

use serde::{Deserialize, Serialize};

/// A company known to the vocabulary.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CompanyEntry {
    /// Canonical display name, also used in metadata tags.
    pub name: String,
    /// Upper-case ticker symbols or other filename aliases.
    #[serde(default)]
    pub aliases: Vec<String>,
}

impl CompanyEntry {
    /// Create an entry with the given name and aliases.
    pub fn new(name: impl Into<String>, aliases: &[&str]) -> Self {
        Self { name: name.into(), aliases: aliases.iter().map(|a| a.to_string()).collect() }
    }
}

/// Keyword tables for query expansion and filename tagging.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct EntityVocabulary {
    /// Known companies, in matching order.
    pub companies: Vec<CompanyEntry>,
    /// Metric keywords, lower case, in matching order.
    pub metrics: Vec<String>,
    /// Lower-case words that mark a question as comparative.
    pub comparison_markers: Vec<String>,
    /// Upper-case filename tokens that never name a company.
    pub filename_skip_words: Vec<String>,
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl Default for EntityVocabulary {
    fn default() -> Self {
        Self {
            companies: vec![
                CompanyEntry::new("Tesla", &["TSLA"]),
                CompanyEntry::new("Nvidia", &["NVDA"]),
                CompanyEntry::new("Apple", &["AAPL"]),
                CompanyEntry::new("Microsoft", &["MSFT"]),
                CompanyEntry::new("Google", &["GOOGL"]),
                CompanyEntry::new("Amazon", &["AMZN"]),
                CompanyEntry::new("Meta", &["FB"]),
            ],
            metrics: strings(&["revenue", "r&d", "margin", "profit", "risk", "growth"]),
            comparison_markers: strings(&["compare", "versus", "vs"]),
            filename_skip_words: strings(&[
                "10K", "10-K", "EC", "AR", "EARNINGS", "CALL", "REPORT", "ANNUAL", "Q1", "Q2",
                "Q3", "Q4", "2023", "2024", "2025", "FY",
            ]),
        }
    }
}

impl EntityVocabulary {
    /// Whether the query contains comparison language.
    ///
    /// Matching is by substring on the lower-cased query, so `vs` also fires
    /// inside longer words.
    pub fn is_comparative(&self, query: &str) -> bool {
        let lowered = query.to_lowercase();
        self.comparison_markers.iter().any(|m| lowered.contains(m.as_str()))
    }

    /// Known companies mentioned in the query, in vocabulary order.
    pub fn mentioned_companies(&self, query: &str) -> Vec<&str> {
        let lowered = query.to_lowercase();
        self.companies
            .iter()
            .filter(|c| lowered.contains(&c.name.to_lowercase()))
            .map(|c| c.name.as_str())
            .collect()
    }

    /// The first metric keyword (in vocabulary order) found in the query.
    pub fn first_metric(&self, query: &str) -> Option<&str> {
        let lowered = query.to_lowercase();
        self.metrics.iter().find(|m| lowered.contains(m.as_str())).map(String::as_str)
    }

    /// Expand a question into the search variants issued against the index.
    ///
    /// The question itself always comes first. A comparative question that
    /// names at least two known companies and a metric gains one
    /// `"<company> <metric>"` variant per company.
    pub fn search_variants(&self, query: &str) -> Vec<String> {
        let mut variants = vec![query.to_string()];
        if !self.is_comparative(query) {
            return variants;
        }

        let companies = self.mentioned_companies(query);
        if companies.len() < 2 {
            return variants;
        }
        if let Some(metric) = self.first_metric(query) {
            variants.extend(companies.iter().map(|company| format!("{company} {metric}")));
        }
        variants
    }

    /// Guess the company a document belongs to from its file name.
    ///
    /// Known names and aliases win; otherwise the first separator-delimited
    /// token that is not boilerplate (`10-K`, `Q3`, `2024`, ...) is used,
    /// title-cased.
    pub fn company_from_filename(&self, filename: &str) -> String {
        let name = filename.replace(".pdf", "").replace(".PDF", "");
        let upper = name.to_uppercase();

        for company in &self.companies {
            let keywords = std::iter::once(company.name.to_uppercase())
                .chain(company.aliases.iter().map(|a| a.to_uppercase()));
            for keyword in keywords {
                if upper.contains(&keyword) {
                    return company.name.clone();
                }
            }
        }

        for separator in ['_', '-', ' '] {
            if !name.contains(separator) {
                continue;
            }
            for part in name.split(separator) {
                let cleaned = part.trim().to_uppercase();
                if !cleaned.is_empty() && !self.filename_skip_words.contains(&cleaned) {
                    return title_case(part.trim());
                }
            }
        }

        match name.split_whitespace().next() {
            Some(first) => title_case(first),
            None => title_case(&name),
        }
    }
}

/// Upper-case the first letter of every alphabetic run, lower-case the rest.
fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut previous_alpha = false;
    for c in text.chars() {
        if c.is_alphabetic() {
            if previous_alpha {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            previous_alpha = true;
        } else {
            out.push(c);
            previous_alpha = false;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_question_has_single_variant() {
        let vocab = EntityVocabulary::default();
        assert_eq!(
            vocab.search_variants("What drove Tesla revenue?"),
            ["What drove Tesla revenue?"]
        );
    }

    #[test]
    fn comparative_question_expands_per_company() {
        let vocab = EntityVocabulary::default();
        let variants = vocab.search_variants("Compare Nvidia and Tesla revenue growth");
        assert_eq!(
            variants,
            ["Compare Nvidia and Tesla revenue growth", "Tesla revenue", "Nvidia revenue"]
        );
    }

    #[test]
    fn comparative_question_without_metric_is_not_expanded() {
        let vocab = EntityVocabulary::default();
        assert_eq!(vocab.search_variants("Apple vs Google").len(), 1);
    }

    #[test]
    fn comparative_question_with_one_company_is_not_expanded() {
        let vocab = EntityVocabulary::default();
        assert_eq!(vocab.search_variants("compare Apple margin over time").len(), 1);
    }

    #[test]
    fn injected_vocabulary_recognises_new_entities() {
        let vocab = EntityVocabulary {
            companies: vec![CompanyEntry::new("Acme", &[]), CompanyEntry::new("Zenith", &[])],
            ..EntityVocabulary::default()
        };
        let variants = vocab.search_variants("acme versus zenith profit");
        assert_eq!(variants[1..], ["Acme profit", "Zenith profit"]);
    }

    #[test]
    fn filename_aliases_resolve_to_canonical_name() {
        let vocab = EntityVocabulary::default();
        assert_eq!(vocab.company_from_filename("10-K TESLA.pdf"), "Tesla");
        assert_eq!(vocab.company_from_filename("nvda_q3_2024.PDF"), "Nvidia");
        assert_eq!(vocab.company_from_filename("EC-AAPL.pdf"), "Apple");
    }

    #[test]
    fn filename_skips_boilerplate_tokens() {
        let vocab = EntityVocabulary::default();
        assert_eq!(vocab.company_from_filename("2024_annual_ROCKWELL_report.pdf"), "Rockwell");
        assert_eq!(vocab.company_from_filename("Q1-zenith.pdf"), "Zenith");
    }

    #[test]
    fn filename_without_separator_uses_whole_name() {
        let vocab = EntityVocabulary::default();
        assert_eq!(vocab.company_from_filename("acmecorp.pdf"), "Acmecorp");
    }

    #[test]
    fn title_case_matches_word_runs() {
        assert_eq!(title_case("hELLO wORLD"), "Hello World");
        assert_eq!(title_case("10k"), "10K");
    }
}
