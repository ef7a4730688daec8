//! Response composition.
//!
//! Merges the model's draft with the tool outcome, makes sure the reply ends
//! with a one-line summary and keeps the whole text inside the word limit.
//! A lookup that missed, timed out or failed always wins over the draft, and
//! a found result wins over any draft that does not restate it faithfully.

use supportdesk_config::ComposerConfig;
use supportdesk_core::entity::OrderStatus;
use supportdesk_core::tool::{ToolInvocation, ToolOutcome};

use crate::prompt;

/// Summary used when no tool ran and the draft has none.
pub const GENERIC_SUMMARY: &str = "Pertanyaan Anda sudah saya tanggapi.";

const NEGATIVE_MARKERS: &[&str] = &["tidak ditemukan", "not found", "tidak dapat menemukan"];

const OUT_OF_STOCK_MARKERS: &[&str] = &["habis", "kosong", "tidak tersedia", "out of stock"];

#[derive(Debug, Clone)]
pub struct ResponseComposer {
    max_words: usize,
    summary_prefix: String,
}

impl Default for ResponseComposer {
    fn default() -> Self {
        Self::new(180, "Ringkas:")
    }
}

impl ResponseComposer {
    pub fn new(max_words: usize, summary_prefix: impl Into<String>) -> Self {
        Self {
            max_words,
            summary_prefix: summary_prefix.into(),
        }
    }

    pub fn from_config(config: &ComposerConfig) -> Self {
        Self::new(config.max_words, config.summary_prefix.clone())
    }

    pub fn max_words(&self) -> usize {
        self.max_words
    }

    pub fn summary_prefix(&self) -> &str {
        &self.summary_prefix
    }

    /// Build the final reply text.
    pub fn compose(&self, draft: &str, invocation: Option<&ToolInvocation>) -> String {
        let (draft_body, draft_summary) = self.split_summary(draft);

        let (body, summary) = match invocation.map(|i| &i.outcome) {
            None if draft_body.is_empty() && draft_summary.is_none() => {
                let (body, summary) = prompt::fallback_reply();
                (body.to_string(), summary.to_string())
            }
            None => (draft_body, draft_summary.unwrap_or_else(|| GENERIC_SUMMARY.to_string())),
            Some(outcome) if !outcome.is_found() => {
                (supportdesk_tools::describe(outcome), supportdesk_tools::summarize(outcome))
            }
            // Only a draft that restates every key fact and contradicts none
            // of them is kept; anything else could carry invented details.
            Some(outcome) if covers(&draft_body, outcome) && !conflicts(&draft_body, outcome) => {
                let summary = draft_summary.unwrap_or_else(|| supportdesk_tools::summarize(outcome));
                (draft_body, summary)
            }
            Some(outcome) => (supportdesk_tools::describe(outcome), supportdesk_tools::summarize(outcome)),
        };

        self.fit(&body, &summary)
    }

    /// Split off the last summary line. Every summary line is removed from
    /// the body so the reply ends with exactly one.
    fn split_summary(&self, draft: &str) -> (String, Option<String>) {
        let prefix = self.summary_prefix.to_lowercase();
        let mut body_lines = Vec::new();
        let mut summary = None;

        for line in draft.lines() {
            let trimmed = line.trim();
            if trimmed.to_lowercase().starts_with(&prefix) {
                let text = trimmed.get(self.summary_prefix.len()..).unwrap_or_default().trim();
                if !text.is_empty() {
                    summary = Some(text.to_string());
                }
            } else {
                body_lines.push(line);
            }
        }

        (body_lines.join("\n").trim().to_string(), summary)
    }

    /// Join body and summary, truncating the body so the total stays within
    /// the word limit.
    fn fit(&self, body: &str, summary: &str) -> String {
        let summary_line = format!("{} {}", self.summary_prefix, one_line(summary));
        let summary_words = word_count(&summary_line);

        if summary_words >= self.max_words {
            let (cut, _) = truncate_words(&summary_line, self.max_words);
            return cut.to_string();
        }

        let (cut, truncated) = truncate_words(body, self.max_words - summary_words);
        let cut = cut.trim_end();
        if cut.is_empty() {
            return summary_line;
        }
        if truncated {
            format!("{cut}...\n\n{summary_line}")
        } else {
            format!("{cut}\n\n{summary_line}")
        }
    }
}

/// The draft contradicts a found outcome.
fn conflicts(draft: &str, outcome: &ToolOutcome) -> bool {
    let lowered = draft.to_lowercase();
    if NEGATIVE_MARKERS.iter().any(|m| lowered.contains(m)) {
        return true;
    }
    match outcome {
        ToolOutcome::Order(order) => OrderStatus::ALL
            .iter()
            .filter(|s| **s != order.status)
            .any(|s| lowered.contains(s.phrase())),
        ToolOutcome::Product(product) => {
            let wrong_price = product.price.is_some_and(|price| {
                let actual = price.round() as u64;
                rupiah_amounts(&lowered).iter().any(|amount| *amount != actual)
            });
            let wrong_stock = product.stock.is_some_and(|stock| stock > 0)
                && OUT_OF_STOCK_MARKERS.iter().any(|m| lowered.contains(m));
            wrong_price || wrong_stock
        }
        _ => false,
    }
}

/// Every `Rp` amount in `lowered`, as whole rupiah.
fn rupiah_amounts(lowered: &str) -> Vec<u64> {
    let mut amounts = Vec::new();
    for (at, _) in lowered.match_indices("rp") {
        let starts_word = lowered[..at].chars().next_back().is_none_or(|c| !c.is_alphanumeric());
        if !starts_word {
            continue;
        }
        let rest = lowered[at + 2..].trim_start_matches(|c: char| c == '.' || c.is_whitespace());
        let digits: String = rest
            .chars()
            .take_while(|c| c.is_ascii_digit() || *c == '.')
            .filter(char::is_ascii_digit)
            .collect();
        if let Ok(amount) = digits.parse() {
            amounts.push(amount);
        }
    }
    amounts
}

/// The draft already states the key facts of the outcome.
fn covers(draft: &str, outcome: &ToolOutcome) -> bool {
    let lowered = draft.to_lowercase();
    key_facts(outcome).iter().all(|fact| lowered.contains(&fact.to_lowercase()))
}

fn key_facts(outcome: &ToolOutcome) -> Vec<String> {
    match outcome {
        ToolOutcome::Order(order) => {
            let mut facts = vec![order.id.clone(), order.status.phrase().to_string()];
            facts.extend(order.carrier.clone());
            facts.extend(order.tracking_number.clone());
            facts
        }
        ToolOutcome::Product(product) => {
            let mut facts = vec![product.name.clone()];
            facts.extend(product.price.map(supportdesk_tools::format::rupiah));
            facts
        }
        ToolOutcome::Warranty(policy) => policy
            .content_markdown
            .lines()
            .map(str::trim)
            .find(|l| !l.is_empty())
            .map(|l| vec![l.to_string()])
            .unwrap_or_default(),
        ToolOutcome::NotFound { .. } | ToolOutcome::TimedOut { .. } | ToolOutcome::Failed { .. } => Vec::new(),
    }
}

fn one_line(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Cut `text` after its first `limit` words, keeping the original spacing.
/// Returns whether anything was cut.
fn truncate_words(text: &str, limit: usize) -> (&str, bool) {
    let mut count = 0;
    let mut in_word = false;
    for (i, c) in text.char_indices() {
        if c.is_whitespace() {
            in_word = false;
        } else if !in_word {
            in_word = true;
            count += 1;
            if count > limit {
                return (text[..i].trim_end(), true);
            }
        }
    }
    (text, false)
}
