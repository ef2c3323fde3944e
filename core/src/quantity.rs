//! Free-text quantity parsing and same-unit combining.
//!
//! Recipe lines store amounts as typed text ("1 1/2", "2-3", "a pinch").
//! Parsing turns the text into a [`Quantity`]; combining folds quantities that
//! share a unit into one sum and lists everything else verbatim, so no line is
//! ever lost from a grocery list.

use std::collections::HashMap;
use std::fmt;

use serde::Serialize;

/// Numeric shape of a parsed amount.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Quantity {
    /// A whole, decimal, fractional or mixed number, kept as a reduced ratio.
    Exact { numerator: u64, denominator: u64 },
    /// "2-3", "2 to 3". Sums use the lower bound.
    Range { low: f64, high: f64 },
    /// Anything else ("a pinch", "to taste").
    Opaque,
}

impl Quantity {
    #[allow(clippy::cast_precision_loss)]
    #[must_use]
    pub fn value(&self) -> Option<f64> {
        match *self {
            Self::Exact {
                numerator,
                denominator,
            } => Some(numerator as f64 / denominator as f64),
            Self::Range { low, .. } => Some(low),
            Self::Opaque => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParsedQuantity {
    pub quantity: Quantity,
    pub raw_text: String,
}

impl ParsedQuantity {
    #[must_use]
    pub fn value(&self) -> Option<f64> {
        self.quantity.value()
    }
}

/// Parse a quantity expression. Unrecognized text comes back as
/// [`Quantity::Opaque`] with the raw text preserved verbatim.
#[must_use]
pub fn parse(text: &str) -> ParsedQuantity {
    let trimmed = text.trim();
    let quantity = parse_range(trimmed)
        .or_else(|| parse_number(trimmed).map(|(n, d)| exact(n, d)))
        .unwrap_or(Quantity::Opaque);
    ParsedQuantity {
        quantity,
        raw_text: text.to_string(),
    }
}

fn exact(numerator: u64, denominator: u64) -> Quantity {
    Quantity::Exact {
        numerator,
        denominator,
    }
}

fn parse_range(s: &str) -> Option<Quantity> {
    let (low, high) = [" to ", "–", "—", "-"]
        .iter()
        .find_map(|sep| s.split_once(sep))?;
    let low = parse_number(low.trim()).map(ratio)?;
    let high = parse_number(high.trim()).map(ratio)?;
    (low <= high).then_some(Quantity::Range { low, high })
}

#[allow(clippy::cast_precision_loss)]
fn ratio((n, d): (u64, u64)) -> f64 {
    n as f64 / d as f64
}

/// Parse a single non-negative number into a reduced `(numerator, denominator)`.
fn parse_number(s: &str) -> Option<(u64, u64)> {
    if s.is_empty() {
        return None;
    }

    // "1 1/2" or "1 ½"
    if let Some((whole, frac)) = s.split_once(char::is_whitespace) {
        let whole: u64 = parse_digits(whole)?;
        let (n, d) = parse_fraction(frac.trim())?;
        return reduce(whole.checked_mul(d)?.checked_add(n)?, d);
    }

    // "1½"
    if let Some(last) = s.chars().last() {
        if let Some((n, d)) = vulgar_fraction(last) {
            let head = &s[..s.len() - last.len_utf8()];
            if head.is_empty() {
                return reduce(n, d);
            }
            let whole = parse_digits(head)?;
            return reduce(whole.checked_mul(d)?.checked_add(n)?, d);
        }
    }

    if s.contains('/') {
        return parse_fraction(s);
    }

    parse_decimal(s)
}

fn parse_fraction(s: &str) -> Option<(u64, u64)> {
    if let Some((n, d)) = s.split_once('/') {
        let n = parse_digits(n.trim())?;
        let d = parse_digits(d.trim())?;
        if d == 0 {
            return None;
        }
        return reduce(n, d);
    }
    let mut chars = s.chars();
    let (Some(c), None) = (chars.next(), chars.next()) else {
        return None;
    };
    vulgar_fraction(c)
}

fn parse_decimal(s: &str) -> Option<(u64, u64)> {
    let (int_part, frac_part) = s.split_once('.').unwrap_or((s, ""));
    if int_part.is_empty() && frac_part.is_empty() {
        return None;
    }
    let int_value = if int_part.is_empty() {
        0
    } else {
        parse_digits(int_part)?
    };
    if frac_part.is_empty() {
        return if s.ends_with('.') { None } else { Some((int_value, 1)) };
    }
    let frac_value = parse_digits(frac_part)?;
    let denominator = 10u64.checked_pow(u32::try_from(frac_part.len()).ok()?)?;
    reduce(
        int_value.checked_mul(denominator)?.checked_add(frac_value)?,
        denominator,
    )
}

fn parse_digits(s: &str) -> Option<u64> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

fn vulgar_fraction(c: char) -> Option<(u64, u64)> {
    match c {
        '½' => Some((1, 2)),
        '⅓' => Some((1, 3)),
        '⅔' => Some((2, 3)),
        '¼' => Some((1, 4)),
        '¾' => Some((3, 4)),
        '⅛' => Some((1, 8)),
        _ => None,
    }
}

fn reduce(n: u64, d: u64) -> Option<(u64, u64)> {
    if d == 0 {
        return None;
    }
    let g = gcd(n, d);
    Some((n / g, d / g))
}

fn gcd(mut a: u64, mut b: u64) -> u64 {
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a.max(1)
}

// --- Combining ---

/// One contributing amount: a parsed value, its unit, and the text it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct QuantityItem {
    pub value: Option<f64>,
    pub unit: Option<String>,
    pub raw_text: String,
}

impl QuantityItem {
    #[must_use]
    pub fn new(value: Option<f64>, unit: Option<&str>, raw_text: &str) -> Self {
        Self {
            value,
            unit: unit.map(str::trim).filter(|u| !u.is_empty()).map(String::from),
            raw_text: raw_text.trim().to_string(),
        }
    }

    /// Build an item straight from a stored line's quantity text and unit.
    #[must_use]
    pub fn from_line(quantity_text: Option<&str>, unit: Option<&str>) -> Self {
        let parsed = parse(quantity_text.unwrap_or_default());
        Self::new(parsed.value(), unit, &parsed.raw_text)
    }

    fn normalized_unit(&self) -> Option<String> {
        self.unit.as_deref().map(str::to_lowercase)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum QuantityEntry {
    /// Several same-unit amounts folded into one.
    Sum { value: f64, unit: String, lines: usize },
    /// A single amount shown as written.
    Literal {
        raw_text: String,
        unit: Option<String>,
    },
}

impl QuantityEntry {
    /// Number of input items this entry accounts for.
    #[must_use]
    pub fn line_count(&self) -> usize {
        match self {
            Self::Sum { lines, .. } => *lines,
            Self::Literal { .. } => 1,
        }
    }

    fn literal(item: &QuantityItem) -> Self {
        Self::Literal {
            raw_text: item.raw_text.clone(),
            unit: item.unit.clone(),
        }
    }
}

impl fmt::Display for QuantityEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sum { value, unit, .. } => write!(f, "{} {unit}", format_amount(*value)),
            Self::Literal { raw_text, unit } => {
                let text = match unit {
                    Some(u) => format!("{raw_text} {u}"),
                    None => raw_text.clone(),
                };
                f.write_str(text.trim())
            }
        }
    }
}

/// Combined amounts for one ingredient.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct CombinedQuantity(Vec<QuantityEntry>);

impl CombinedQuantity {
    #[must_use]
    pub fn entries(&self) -> &[QuantityEntry] {
        &self.0
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn line_count(&self) -> usize {
        self.0.iter().map(QuantityEntry::line_count).sum()
    }
}

impl fmt::Display for CombinedQuantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .0
            .iter()
            .map(ToString::to_string)
            .filter(|s| !s.is_empty())
            .collect();
        f.write_str(&parts.join(" + "))
    }
}

/// Fold same-unit amounts into sums.
///
/// A unit group sums only when it has more than one item and every item has a
/// numeric value. Unitless items, lone units and groups containing any opaque
/// amount are listed individually. Groups appear in first-seen order.
#[must_use]
pub fn combine(items: &[QuantityItem]) -> CombinedQuantity {
    let mut order: Vec<Option<String>> = Vec::new();
    let mut groups: HashMap<Option<String>, Vec<&QuantityItem>> = HashMap::new();
    for item in items {
        let key = item.normalized_unit();
        groups
            .entry(key.clone())
            .or_insert_with(|| {
                order.push(key);
                Vec::new()
            })
            .push(item);
    }

    let mut entries = Vec::with_capacity(items.len());
    for key in order {
        let group = &groups[&key];
        let sum: Option<f64> = if group.len() > 1 {
            group.iter().map(|i| i.value).sum()
        } else {
            None
        };
        match (key, sum) {
            (Some(unit), Some(value)) => entries.push(QuantityEntry::Sum {
                value,
                unit,
                lines: group.len(),
            }),
            _ => entries.extend(group.iter().map(|i| QuantityEntry::literal(i))),
        }
    }
    CombinedQuantity(entries)
}

/// Render an amount without float noise: `2.5`, `3`, `0.33`.
#[must_use]
pub fn format_amount(value: f64) -> String {
    let rounded = (value * 100.0).round() / 100.0;
    if rounded.fract() == 0.0 {
        format!("{rounded:.0}")
    } else {
        let s = format!("{rounded:.2}");
        s.trim_end_matches('0').to_string()
    }
}
