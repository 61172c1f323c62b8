//! Phone-to-lead resolution cascade.
//!
//! Strategies run in order, cheapest and most precise first, stopping at
//! the first hit. The cascade is data — an ordered slice of named strategy
//! functions — so its ordering is visible and testable rather than buried
//! in nested conditionals.

use super::{Lead, LeadStore};
use crate::phone;
use crate::utils::digits_only;
use anyhow::Result;
use std::sync::Arc;
use tracing::{debug, error};

/// Candidates fetched by the fuzzy last-7-digit fallback.
const SUFFIX7_CANDIDATES: usize = 5;

/// Minimum pushed-name length for the name-assisted fallback to engage.
const MIN_NAME_LEN: usize = 2;

type Strategy = fn(&LeadStore, &str) -> Result<Option<Lead>>;

/// Ordered cascade: exact variations, then last-8 suffix, then scored
/// last-7 suffix.
const STRATEGIES: &[(&str, Strategy)] = &[
    ("exact", exact_match),
    ("suffix8", suffix8_match),
    ("suffix7", suffix7_match),
];

pub struct LeadResolver {
    store: Arc<LeadStore>,
}

impl LeadResolver {
    pub fn new(store: Arc<LeadStore>) -> Self {
        Self { store }
    }

    /// Find the lead for a raw inbound phone, or `None`.
    ///
    /// Store I/O failure is logged and collapses to `None` as well — the
    /// caller's policy is to create a new lead, and the unique constraint
    /// in the store makes that safe even when this was a transient miss.
    pub fn find_by_phone(&self, raw_phone: &str) -> Option<Lead> {
        let digits = digits_only(raw_phone);
        if digits.is_empty() {
            return None;
        }

        for (name, strategy) in STRATEGIES {
            match strategy(&self.store, &digits) {
                Ok(Some(lead)) => {
                    debug!(
                        "lead resolver: {} matched lead {} for {}",
                        name, lead.id, digits
                    );
                    return Some(lead);
                }
                Ok(None) => {}
                Err(e) => {
                    error!("lead resolver: {} strategy failed: {}", name, e);
                    return None;
                }
            }
        }
        None
    }

    /// Name-assisted fallback for when a pushed display name can
    /// disambiguate a fuzzy suffix match. Engages only with a usable name.
    pub fn find_by_phone_and_name(&self, raw_phone: &str, name: &str) -> Option<Lead> {
        let supplied = name.trim();
        if supplied.chars().count() < MIN_NAME_LEN {
            return None;
        }
        let digits = digits_only(raw_phone);
        if digits.len() < 7 {
            return None;
        }

        let suffix = &digits[digits.len() - 7..];
        let candidates = match self.store.find_by_suffix(suffix, SUFFIX7_CANDIDATES) {
            Ok(c) => c,
            Err(e) => {
                error!("lead resolver: name-assisted lookup failed: {}", e);
                return None;
            }
        };

        let matching: Vec<Lead> = candidates
            .into_iter()
            .filter(|lead| {
                name_matches(lead.name.as_deref(), supplied)
                    || name_matches(lead.whatsapp_name.as_deref(), supplied)
            })
            .collect();

        best_by_trailing_run(matching, &digits)
    }
}

fn exact_match(store: &LeadStore, digits: &str) -> Result<Option<Lead>> {
    store.find_exact(&phone_variations(digits))
}

fn suffix8_match(store: &LeadStore, digits: &str) -> Result<Option<Lead>> {
    if digits.len() < 8 {
        return Ok(None);
    }
    let suffix = &digits[digits.len() - 8..];
    Ok(store.find_by_suffix(suffix, 1)?.into_iter().next())
}

fn suffix7_match(store: &LeadStore, digits: &str) -> Result<Option<Lead>> {
    if digits.len() < 7 {
        return Ok(None);
    }
    let suffix = &digits[digits.len() - 7..];
    let candidates = store.find_by_suffix(suffix, SUFFIX7_CANDIDATES)?;
    Ok(best_by_trailing_run(candidates, digits))
}

/// Build the deduplicated set of phone variations for the exact query.
///
/// Covers the raw digit string, the parsed local and full forms, and — for
/// Brazil — both sides of the historical 9th-digit mobile ambiguity, with
/// and without the `55` prefix.
pub fn phone_variations(raw_phone: &str) -> Vec<String> {
    let digits = digits_only(raw_phone);
    let parsed = phone::parse(&digits);

    let mut variations = vec![
        digits,
        parsed.local_number.clone(),
        parsed.full_number.clone(),
    ];

    if parsed.country_code == "55" {
        let local = &parsed.local_number;
        if local.len() == 11 && local.as_bytes()[2] == b'9' {
            let without_ninth = format!("{}{}", &local[..2], &local[3..]);
            variations.push(format!("55{}", without_ninth));
            variations.push(without_ninth);
        } else if local.len() == 10 {
            let with_ninth = format!("{}9{}", &local[..2], &local[2..]);
            variations.push(format!("55{}", with_ninth));
            variations.push(with_ninth);
        }
    }

    let mut seen = std::collections::HashSet::new();
    variations
        .into_iter()
        .filter(|v| !v.is_empty() && seen.insert(v.clone()))
        .collect()
}

/// Length of the common trailing-digit run between two numbers.
pub fn trailing_match_len(a: &str, b: &str) -> usize {
    a.bytes()
        .rev()
        .zip(b.bytes().rev())
        .take_while(|(x, y)| x == y)
        .count()
}

/// Pick the candidate with the longest common trailing run against the
/// input. Ties go to the lowest id (candidates arrive ordered by id, and
/// only a strictly better score displaces the current best).
fn best_by_trailing_run(candidates: Vec<Lead>, digits: &str) -> Option<Lead> {
    let mut best: Option<(usize, Lead)> = None;
    for lead in candidates {
        let score = trailing_match_len(&lead.phone, digits);
        let better = match &best {
            Some((best_score, _)) => score > *best_score,
            None => true,
        };
        if better {
            best = Some((score, lead));
        }
    }
    best.map(|(_, lead)| lead)
}

fn name_matches(stored: Option<&str>, supplied: &str) -> bool {
    let Some(stored) = stored else {
        return false;
    };
    let stored = stored.trim().to_lowercase();
    if stored.is_empty() {
        return false;
    }
    let supplied = supplied.to_lowercase();
    stored.contains(&supplied) || supplied.contains(&stored)
}
