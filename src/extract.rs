//! Regex-based extraction of tender metadata from inbound email text.
//!
//! Every field is scanned with an ordered list of label patterns; the first
//! match wins and later patterns are not consulted. A field with no match is
//! simply absent, never an error.

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;

#[derive(Debug, Default, Clone, PartialEq)]
pub struct ExtractedTender {
    pub tender_id: Option<String>,
    pub entity: Option<String>,
    pub description: Option<String>,
    pub value: Option<f64>,
    pub deadline: Option<NaiveDate>,
    pub url: Option<String>,
}

impl ExtractedTender {
    pub fn is_empty(&self) -> bool {
        self.tender_id.is_none()
            && self.entity.is_none()
            && self.description.is_none()
            && self.value.is_none()
            && self.deadline.is_none()
            && self.url.is_none()
    }
}

const DESCRIPTION_MIN_LEN: usize = 20;
const DESCRIPTION_MAX_LEN: usize = 500;

static TENDER_ID_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    compile(&[
        r"(?i)tender[:\s]*([A-Z0-9\-]+)",
        r"(?i)licitación[:\s]*([A-Z0-9\-]+)",
        r"(?i)convocatoria[:\s]*([A-Z0-9\-]+)",
        r"(?i)ID[:\s]*([A-Z0-9\-]+)",
        r"(?i)Reference[:\s]*([A-Z0-9\-]+)",
    ])
});

static ENTITY_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    compile(&[
        r"(?i)entidad[:\s]*([^,\n]+)",
        r"(?i)entity[:\s]*([^,\n]+)",
        r"(?i)procuring[:\s]*([^,\n]+)",
        r"(?i)organismo[:\s]*([^,\n]+)",
    ])
});

static VALUE_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    compile(&[
        r"(?i)valor[:\s]*\$?([0-9,]+\.?[0-9]*)",
        r"(?i)value[:\s]*\$?([0-9,]+\.?[0-9]*)",
        r"(?i)monto[:\s]*\$?([0-9,]+\.?[0-9]*)",
        r"(?i)amount[:\s]*\$?([0-9,]+\.?[0-9]*)",
    ])
});

static DEADLINE_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    compile(&[
        r"(?i)fecha límite[:\s]*([0-9]{1,2}[/-][0-9]{1,2}[/-][0-9]{2,4})",
        r"(?i)deadline[:\s]*([0-9]{1,2}[/-][0-9]{1,2}[/-][0-9]{2,4})",
        r"(?i)fecha de cierre[:\s]*([0-9]{1,2}[/-][0-9]{1,2}[/-][0-9]{2,4})",
        r"(?i)closing date[:\s]*([0-9]{1,2}[/-][0-9]{1,2}[/-][0-9]{2,4})",
    ])
});

static URL_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"https?://[^\s<>"]+"#).expect("invalid url pattern"));

fn compile(patterns: &[&str]) -> Vec<Regex> {
    patterns
        .iter()
        .map(|p| Regex::new(p).expect("invalid extraction pattern"))
        .collect()
}

/// Extract tender metadata from an email's subject and body.
pub fn extract(subject: &str, body: &str) -> ExtractedTender {
    let haystack = format!("{subject} {body}");

    ExtractedTender {
        tender_id: first_capture(&TENDER_ID_PATTERNS, &haystack),
        entity: first_capture(&ENTITY_PATTERNS, &haystack).map(|e| e.trim().to_string()),
        description: extract_description(body),
        value: extract_value(&haystack),
        deadline: extract_deadline(&haystack),
        url: URL_PATTERN.find(&haystack).map(|m| m.as_str().to_string()),
    }
}

fn first_capture(patterns: &[Regex], haystack: &str) -> Option<String> {
    patterns.iter().find_map(|pattern| {
        pattern
            .captures(haystack)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
    })
}

/// First body line longer than the minimum that is not a bare link,
/// truncated to the storage limit.
fn extract_description(body: &str) -> Option<String> {
    body.lines().find_map(|line| {
        let trimmed = line.trim();
        if trimmed.chars().count() > DESCRIPTION_MIN_LEN && !trimmed.starts_with("http") {
            Some(trimmed.chars().take(DESCRIPTION_MAX_LEN).collect())
        } else {
            None
        }
    })
}

/// Monetary amount after an ordered list of labels. Thousands separators are
/// stripped before parsing; a capture that still fails to parse is treated
/// as no match and scanning continues with the next label.
fn extract_value(haystack: &str) -> Option<f64> {
    for pattern in VALUE_PATTERNS.iter() {
        if let Some(caps) = pattern.captures(haystack) {
            let raw = caps.get(1)?.as_str().replace(',', "");
            if let Ok(value) = raw.parse::<f64>() {
                return Some(value);
            }
        }
    }
    None
}

/// Deadline token in day-month-year order with `/` or `-` separators.
/// Two-digit years are expanded into the 2000s; a token that does not form
/// a real calendar date is silently skipped.
fn extract_deadline(haystack: &str) -> Option<NaiveDate> {
    for pattern in DEADLINE_PATTERNS.iter() {
        if let Some(caps) = pattern.captures(haystack) {
            if let Some(date) = parse_deadline_token(caps.get(1)?.as_str()) {
                return Some(date);
            }
        }
    }
    None
}

fn parse_deadline_token(token: &str) -> Option<NaiveDate> {
    let separator = if token.contains('/') { '/' } else { '-' };
    let parts: Vec<&str> = token.split(separator).collect();
    if parts.len() != 3 {
        return None;
    }

    let day: u32 = parts[0].parse().ok()?;
    let month: u32 = parts[1].parse().ok()?;
    let year: i32 = if parts[2].len() == 2 {
        format!("20{}", parts[2]).parse().ok()?
    } else {
        parts[2].parse().ok()?
    };

    NaiveDate::from_ymd_opt(year, month, day)
}

/// Keyword buckets for auto-classification, checked in order; the first
/// bucket with a hit wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TenderKind {
    Construction,
    Service,
    Goods,
}

impl TenderKind {
    pub fn type_name(&self) -> &'static str {
        match self {
            TenderKind::Construction => "construction",
            TenderKind::Service => "service",
            TenderKind::Goods => "goods",
        }
    }
}

const CONSTRUCTION_KEYWORDS: &[&str] = &["construcción", "construction", "obra", "building"];
const SERVICE_KEYWORDS: &[&str] = &["servicio", "service", "consultoría", "consulting"];
const GOODS_KEYWORDS: &[&str] = &["bien", "goods", "equipo", "equipment", "suministro", "supply"];

pub fn classify(subject: &str, description: &str) -> Option<TenderKind> {
    let text = format!("{description} {subject}").to_lowercase();

    let buckets = [
        (TenderKind::Construction, CONSTRUCTION_KEYWORDS),
        (TenderKind::Service, SERVICE_KEYWORDS),
        (TenderKind::Goods, GOODS_KEYWORDS),
    ];

    buckets
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|kw| text.contains(kw)))
        .map(|(kind, _)| *kind)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_label_yields_tender_id() {
        let result = extract("", "Reference: ABC-123");
        assert_eq!(result.tender_id.as_deref(), Some("ABC-123"));
    }

    #[test]
    fn earlier_id_pattern_wins() {
        let result = extract("tender: FIRST-1", "Reference: SECOND-2");
        assert_eq!(result.tender_id.as_deref(), Some("FIRST-1"));
    }

    #[test]
    fn id_match_is_case_insensitive() {
        let result = extract("LICITACIÓN: lp-2024-001", "");
        assert_eq!(result.tender_id.as_deref(), Some("lp-2024-001"));
    }

    #[test]
    fn entity_captured_up_to_comma() {
        let result = extract("", "Entidad: Ministerio de Salud, Región Norte");
        assert_eq!(result.entity.as_deref(), Some("Ministerio de Salud"));
    }

    #[test]
    fn value_with_thousands_separators() {
        let result = extract("", "valor: $12,345.67");
        assert_eq!(result.value, Some(12345.67));
    }

    #[test]
    fn non_numeric_value_is_absent() {
        let result = extract("", "valor: abc");
        assert_eq!(result.value, None);
    }

    #[test]
    fn failed_parse_falls_through_to_next_label() {
        // "valor" matches nothing numeric, "monto" does.
        let result = extract("", "valor: pending\nmonto: 5,000");
        assert_eq!(result.value, Some(5000.0));
    }

    #[test]
    fn two_digit_year_expands() {
        let result = extract("", "deadline: 15/03/24");
        assert_eq!(result.deadline, NaiveDate::from_ymd_opt(2024, 3, 15));
    }

    #[test]
    fn dash_separated_full_year() {
        let result = extract("", "fecha límite: 15-03-2025");
        assert_eq!(result.deadline, NaiveDate::from_ymd_opt(2025, 3, 15));
    }

    #[test]
    fn impossible_date_is_skipped() {
        let result = extract("", "deadline: 32/13/2024");
        assert_eq!(result.deadline, None);
    }

    #[test]
    fn description_skips_short_and_link_lines() {
        let body = "hi\nhttps://example.com/tender/page-with-long-url\nSupply of hospital equipment for the northern region\nmore";
        let result = extract("", body);
        assert_eq!(
            result.description.as_deref(),
            Some("Supply of hospital equipment for the northern region")
        );
    }

    #[test]
    fn description_truncated_to_limit() {
        let long_line = "x".repeat(800);
        let result = extract("", &long_line);
        assert_eq!(result.description.map(|d| d.chars().count()), Some(500));
    }

    #[test]
    fn url_excludes_angle_brackets() {
        let result = extract("", "see <https://portal.example.gov/t/99> for details");
        assert_eq!(result.url.as_deref(), Some("https://portal.example.gov/t/99"));
    }

    #[test]
    fn empty_email_extracts_nothing() {
        assert!(extract("", "").is_empty());
    }

    #[test]
    fn classification_bucket_order() {
        assert_eq!(
            classify("obra civil y servicios", ""),
            Some(TenderKind::Construction)
        );
        assert_eq!(classify("Consulting engagement", ""), Some(TenderKind::Service));
        assert_eq!(classify("", "suministro de equipos"), Some(TenderKind::Goods));
        assert_eq!(classify("quarterly report", ""), None);
    }
}
