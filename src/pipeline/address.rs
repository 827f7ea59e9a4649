//! Address decomposition: split one free-text roster address into
//! street / city / state / zip.
//!
//! ## Why a cascade?
//!
//! The roster prints street and city on one line with no delimiter between
//! them, e.g. `1200 N 27th St Ste 100 Lincoln NE 68503`. The state/ZIP pair
//! at the end is the only structured anchor. Everything before it is split
//! by trying a fixed sequence of strategies, most specific first:
//!
//! 1. [`SplitStrategy::MailRouting`] — `ATTN` lines and `MC####` mail codes
//! 2. [`SplitStrategy::PoBox`]       — `PO Box 123` / `Box 123`
//! 3. [`SplitStrategy::SuffixScan`]  — street-suffix vocabulary (`St`, `Ave`, `Ste 5`…)
//! 4. [`SplitStrategy::LastToken`]   — last word is the city
//!
//! The first strategy that matches wins. Ordering matters: a suffix scan run
//! on `Hospital Dr ATTN Pharmacy MC 4020 Omaha` would happily cut after
//! `Dr` and report `ATTN Pharmacy MC 4020 Omaha` as the city.

use crate::config::AddressRules;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

static RE_STATE_ZIP: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+([A-Z]{2})\s+(\d{5}(?:-\d{4})?)$").unwrap());

static RE_MAIL_ROUTING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\s+(ATTN|Attn:?|MC\s*\d)").unwrap());

static RE_CAPITALIZED_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Z][a-z]+$").unwrap());

static RE_PO_BOX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(.*?)\s*((?:PO\s+)?Box\s+\d+)\s+(.+)$").unwrap());

static RE_UNIT_DESIGNATOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(#?\d+[A-Za-z]?|[A-Za-z])$").unwrap());

/// The four components of a roster address. Empty string means "not found".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedAddress {
    pub street: String,
    pub city: String,
    pub state: String,
    pub zip: String,
}

impl ParsedAddress {
    /// True when a trailing state/ZIP pair was found.
    pub fn is_anchored(&self) -> bool {
        !self.state.is_empty()
    }
}

/// One way of cutting the street+city span into street and city.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SplitStrategy {
    /// Street ends at an `ATTN` / `MC<digit>` marker; city is the last
    /// simple capitalised word.
    MailRouting,
    /// `[lead] [PO] Box N city`.
    PoBox,
    /// Street ends at the last street-suffix token (plus a unit designator).
    SuffixScan,
    /// Last token is the city. Always matches.
    LastToken,
}

impl SplitStrategy {
    /// Cascade order, most specific first.
    pub const CASCADE: [SplitStrategy; 4] = [
        SplitStrategy::MailRouting,
        SplitStrategy::PoBox,
        SplitStrategy::SuffixScan,
        SplitStrategy::LastToken,
    ];

    /// Try this strategy on `span`. Returns `(street, city)` on a match.
    pub fn apply(&self, span: &str, rules: &AddressRules) -> Option<(String, String)> {
        match self {
            SplitStrategy::MailRouting => split_mail_routing(span),
            SplitStrategy::PoBox => split_po_box(span),
            SplitStrategy::SuffixScan => split_suffix_scan(span, rules),
            SplitStrategy::LastToken => Some(split_last_token(span)),
        }
    }
}

/// Splits addresses with a fixed rule set and strategy order.
#[derive(Debug, Clone)]
pub struct AddressDecomposer {
    rules: AddressRules,
    strategies: Vec<SplitStrategy>,
}

impl Default for AddressDecomposer {
    fn default() -> Self {
        Self::new(AddressRules::default())
    }
}

impl AddressDecomposer {
    pub fn new(rules: AddressRules) -> Self {
        Self {
            rules,
            strategies: SplitStrategy::CASCADE.to_vec(),
        }
    }

    /// Decompose `address` into its parts.
    ///
    /// Without a trailing `ST 12345[-6789]` anchor the whole address becomes
    /// the street and the other fields stay empty.
    pub fn decompose(&self, address: &str) -> ParsedAddress {
        let mut parsed = ParsedAddress::default();
        if address.is_empty() {
            return parsed;
        }

        let Some(caps) = RE_STATE_ZIP.captures(address) else {
            parsed.street = address.to_string();
            return parsed;
        };
        parsed.state = caps[1].to_string();
        parsed.zip = caps[2].to_string();

        let anchor_start = caps.get(0).map_or(address.len(), |m| m.start());
        let span = address[..anchor_start].trim();

        for strategy in &self.strategies {
            if let Some((street, city)) = strategy.apply(span, &self.rules) {
                debug!("Address split by {:?}: {:?}", strategy, address);
                parsed.street = street;
                parsed.city = city;
                break;
            }
        }
        parsed
    }
}

// ── Strategy 1: mail routing (ATTN / MC) ─────────────────────────────────

fn split_mail_routing(span: &str) -> Option<(String, String)> {
    let marker = RE_MAIL_ROUTING.find(span)?;
    let street = span[..marker.start()].trim().to_string();

    let words: Vec<&str> = span.split_whitespace().collect();
    // Known limitation: an all-caps span has no capitalised word, so the
    // last token is taken verbatim even if it is not a place name.
    let city = words
        .iter()
        .rev()
        .find(|w| RE_CAPITALIZED_WORD.is_match(w))
        .or_else(|| words.last())
        .map(|w| w.to_string())
        .unwrap_or_default();

    Some((street, city))
}

// ── Strategy 2: PO Box ───────────────────────────────────────────────────

fn split_po_box(span: &str) -> Option<(String, String)> {
    let caps = RE_PO_BOX.captures(span)?;
    let lead = caps[1].trim();
    let boxed = &caps[2];
    let city = caps[3].trim().to_string();

    let street = if lead.is_empty() {
        boxed.to_string()
    } else {
        format!("{} {}", lead, boxed)
    };
    Some((street, city))
}

// ── Strategy 3: street-suffix scan ───────────────────────────────────────

/// Last-match-wins scan: every suffix hit moves the boundary right, so
/// `100 Court Dr Lincoln` splits after `Dr`, not after `Court`.
fn split_suffix_scan(span: &str, rules: &AddressRules) -> Option<(String, String)> {
    let words: Vec<&str> = span.split_whitespace().collect();
    let mut boundary: Option<usize> = None;

    for (i, word) in words.iter().enumerate() {
        let folded = word.to_lowercase();
        let folded = folded.trim_end_matches([',', '.']);

        if rules.is_street_suffix(folded) {
            boundary = Some(i);
        }
        if rules.is_unit_suffix(folded) {
            if let Some(next) = words.get(i + 1) {
                if RE_UNIT_DESIGNATOR.is_match(next) {
                    boundary = Some(i + 1);
                }
            }
        }
    }

    match boundary {
        Some(b) if b + 1 < words.len() => {
            Some((words[..=b].join(" "), words[b + 1..].join(" ")))
        }
        _ => None,
    }
}

// ── Strategy 4: last token is the city ───────────────────────────────────

fn split_last_token(span: &str) -> (String, String) {
    let words: Vec<&str> = span.split_whitespace().collect();
    match words.split_last() {
        Some((last, rest)) if !rest.is_empty() => (rest.join(" "), last.to_string()),
        _ => (String::new(), span.to_string()),
    }
}
