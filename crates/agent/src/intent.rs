//! Intent extraction — free text to at most one lookup.
//!
//! Matching is deterministic and ordered: an order id beats a product name,
//! and a product name beats warranty keywords.

use regex_lite::Regex;
use supportdesk_config::IntentsConfig;
use supportdesk_core::error::Error;
use supportdesk_core::intent::Intent;

/// Words that end a plausible product name after a category noun.
const STOP_WORDS: &[&str] = &[
    "ada", "apa", "apakah", "atau", "berapa", "bisa", "dan", "dari", "di", "dong", "harga", "ini",
    "itu", "ke", "kelebihan", "masih", "nya", "saya", "spesifikasi", "stok", "tersedia", "untuk",
    "yang", "ya",
];

const PLAUSIBLE_NAME_WORDS: usize = 3;

/// Classifies a user message into an [`Intent`].
pub struct IntentExtractor {
    order_id: Regex,
    product_nouns: Vec<String>,
    warranty_keywords: Vec<String>,
}

impl IntentExtractor {
    pub fn new(
        order_id_prefix: &str,
        product_nouns: Vec<String>,
        warranty_keywords: Vec<String>,
    ) -> Result<Self, Error> {
        let pattern = format!(r"(?i)\b{}\d+\b", regex_lite::escape(order_id_prefix));
        let order_id = Regex::new(&pattern).map_err(|e| Error::Config {
            message: format!("invalid order id prefix '{order_id_prefix}': {e}"),
        })?;

        Ok(Self {
            order_id,
            product_nouns: product_nouns.into_iter().map(|n| n.to_lowercase()).collect(),
            warranty_keywords: warranty_keywords.into_iter().map(|k| k.to_lowercase()).collect(),
        })
    }

    pub fn from_config(config: &IntentsConfig) -> Result<Self, Error> {
        Self::new(
            &config.order_id_prefix,
            config.product_nouns.clone(),
            config.warranty_keywords.clone(),
        )
    }

    /// Classify `text`. `catalog` holds the known product names.
    pub fn extract(&self, text: &str, catalog: &[String]) -> Intent {
        if let Some(order_id) = self.order_id(text) {
            return Intent::OrderStatus(order_id);
        }
        if let Some(name) = known_product(text, catalog) {
            return Intent::ProductInfo(name);
        }
        if let Some(name) = self.plausible_product(text) {
            return Intent::ProductInfo(name);
        }
        if self.mentions_warranty(text) {
            return Intent::WarrantyPolicy;
        }
        Intent::None
    }

    fn order_id(&self, text: &str) -> Option<String> {
        self.order_id.find(text).map(|m| m.as_str().to_uppercase())
    }

    /// A category noun followed by one to three name words in the same clause.
    fn plausible_product(&self, text: &str) -> Option<String> {
        for clause in text.split(['.', ',', '!', '?', ';', ':', '\n']) {
            let words = words(clause);
            for (i, word) in words.iter().enumerate() {
                let lowered = word.to_lowercase();
                if !self.product_nouns.contains(&lowered) {
                    continue;
                }

                let name_words: Vec<&str> = words[i + 1..]
                    .iter()
                    .take_while(|w| !STOP_WORDS.contains(&w.to_lowercase().as_str()))
                    .take(PLAUSIBLE_NAME_WORDS)
                    .copied()
                    .collect();
                if name_words.is_empty() {
                    continue;
                }

                // "produk" is a generic noun, not part of any product name.
                let name = if lowered == "produk" {
                    name_words.join(" ")
                } else {
                    std::iter::once(*word).chain(name_words).collect::<Vec<_>>().join(" ")
                };
                return Some(name);
            }
        }
        None
    }

    fn mentions_warranty(&self, text: &str) -> bool {
        words(text).iter().any(|word| {
            let lowered = word.to_lowercase();
            self.warranty_keywords.iter().any(|k| lowered.starts_with(k.as_str()))
        })
    }
}

/// Alphanumeric runs of `text`, original casing.
fn words(text: &str) -> Vec<&str> {
    text.split(|c: char| !c.is_alphanumeric()).filter(|w| !w.is_empty()).collect()
}

/// The catalog name whose leading run of words appears longest in `text`.
///
/// A run must cover at least two words, or the whole name when the name is a
/// single word. Ties go to the shorter catalog name.
fn known_product(text: &str, catalog: &[String]) -> Option<String> {
    let haystack: Vec<String> = words(text).iter().map(|w| w.to_lowercase()).collect();
    let mut best: Option<(usize, &String)> = None;

    for name in catalog {
        let needle: Vec<String> = words(name).iter().map(|w| w.to_lowercase()).collect();
        if needle.is_empty() {
            continue;
        }
        let min_run = needle.len().min(2);

        let run = (min_run..=needle.len())
            .rev()
            .find(|&len| contains_run(&haystack, &needle[..len]));
        let Some(run) = run else { continue };

        let better = match best {
            None => true,
            Some((best_run, best_name)) => {
                run > best_run || (run == best_run && name.len() < best_name.len())
            }
        };
        if better {
            best = Some((run, name));
        }
    }

    best.map(|(_, name)| name.clone())
}

fn contains_run(haystack: &[String], needle: &[String]) -> bool {
    !needle.is_empty() && haystack.windows(needle.len()).any(|window| window == needle)
}
