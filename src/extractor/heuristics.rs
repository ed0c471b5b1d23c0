//! Ordered price-location heuristics over a parsed pricing page.
//!
//! Each heuristic is a pure `(&Html, &PriceBand) -> Option<f64>` function. They
//! are tried in priority order and the first one to produce a candidate inside
//! the band wins; later heuristics are never consulted. Within a heuristic the
//! first plausible candidate in document order wins.
//!
//! `scraper::Html` is `!Send`, so everything here is synchronous. The async
//! caller runs [`extract_from_html`] on the blocking pool and the document is
//! dropped before the task returns.

use std::sync::OnceLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use crate::error::ExtractionError;

// ---------------------------------------------------------------------------
// Plausibility band
// ---------------------------------------------------------------------------

/// Accepted range for a per-gram reference price, exclusive on both ends.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceBand {
    pub min: f64,
    pub max: f64,
}

impl PriceBand {
    /// None unless both bounds are finite, `min >= 0` and `min < max`.
    pub fn new(min: f64, max: f64) -> Option<Self> {
        if min.is_finite() && max.is_finite() && min >= 0.0 && min < max {
            Some(Self { min, max })
        } else {
            None
        }
    }

    pub fn accepts(&self, price: f64) -> bool {
        price > self.min && price < self.max
    }
}

// ---------------------------------------------------------------------------
// Heuristic registry
// ---------------------------------------------------------------------------

pub struct Heuristic {
    pub name: &'static str,
    find: fn(&Html, &PriceBand) -> Option<f64>,
}

/// Priority order. Structural matches first, free-text patterns last.
pub const HEURISTICS: &[Heuristic] = &[
    Heuristic { name: "price_container", find: price_container },
    Heuristic { name: "gold_table_row", find: gold_table_row },
    Heuristic { name: "per_gram_suffix", find: per_gram_suffix },
    Heuristic { name: "keyword_prefix", find: keyword_prefix },
];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Extraction {
    pub price: f64,
    /// Name of the heuristic that produced `price`.
    pub heuristic: &'static str,
}

/// Parse `html` and run the heuristic chain against it.
pub fn extract_from_html(html: &str, band: &PriceBand) -> Result<Extraction, ExtractionError> {
    let doc = Html::parse_document(html);

    if visible_text(&doc).trim().is_empty() {
        return Err(ExtractionError::StructuralParse(
            "page has no readable text".to_string(),
        ));
    }

    HEURISTICS
        .iter()
        .find_map(|h| (h.find)(&doc, band).map(|price| Extraction { price, heuristic: h.name }))
        .ok_or(ExtractionError::NoPlausibleCandidate { heuristics: HEURISTICS.len() })
}

// ---------------------------------------------------------------------------
// Heuristics
// ---------------------------------------------------------------------------

/// Elements whose class mentions "price" or "gold".
fn price_container(doc: &Html, band: &PriceBand) -> Option<f64> {
    let selector = Selector::parse(r#"[class*="price"], [class*="gold"]"#).ok()?;
    doc.select(&selector)
        .find_map(|el| first_plausible(&element_text(el), band))
}

/// Table rows that mention gold alongside a sell/purity/per-gram marker.
/// When the table has a "sell" header column, that column is read first.
fn gold_table_row(doc: &Html, band: &PriceBand) -> Option<f64> {
    let table_sel = Selector::parse("table").ok()?;
    let row_sel = Selector::parse("tr").ok()?;
    let cell_sel = Selector::parse("th, td").ok()?;

    for table in doc.select(&table_sel) {
        let rows: Vec<ElementRef> = table.select(&row_sel).collect();

        let sell_col = rows.iter().find_map(|row| {
            row.select(&cell_sel)
                .position(|c| element_text(c).to_lowercase().contains("sell"))
        });

        for row in &rows {
            let text = element_text(*row).to_lowercase();
            let mentions_gold = text.contains("gold");
            let has_marker = ["sell", "999", "gram", "/g"].iter().any(|m| text.contains(m));
            if !mentions_gold || !has_marker {
                continue;
            }

            let cells: Vec<String> = row.select(&cell_sel).map(element_text).collect();
            let from_sell_col = sell_col
                .and_then(|idx| cells.get(idx))
                .and_then(|cell| first_plausible(cell, band));
            if let Some(price) = from_sell_col {
                return Some(price);
            }
            if let Some(price) = cells.iter().find_map(|cell| first_plausible(cell, band)) {
                return Some(price);
            }
        }
    }
    None
}

/// A number directly followed by a per-gram unit: `651.20/g`, `651.20 per gram`.
fn per_gram_suffix(doc: &Html, band: &PriceBand) -> Option<f64> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| {
        Regex::new(r"(?i)(\d{1,3}(?:,\d{3})+(?:\.\d+)?|\d+(?:\.\d+)?)\s*(?:/\s*(?:g|gm|gram)\b|per\s+gram\b)")
            .expect("valid per-gram regex")
    });
    let text = visible_text(doc);
    re.captures_iter(&text)
        .filter_map(|caps| caps.get(1))
        .filter_map(|m| parse_candidate(m.as_str()))
        .find(|p| band.accepts(*p))
}

/// A number shortly after a keyword: `Gold Sell: RM 651.20`.
fn keyword_prefix(doc: &Html, band: &PriceBand) -> Option<f64> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| {
        Regex::new(
            r"(?i)\b(?:fine\s+gold|gold|sell(?:ing)?|999(?:\.9+)?)\b[^0-9]{0,40}?(\d{1,3}(?:,\d{3})+(?:\.\d+)?|\d+(?:\.\d+)?)",
        )
        .expect("valid keyword regex")
    });
    let text = visible_text(doc);
    re.captures_iter(&text)
        .filter_map(|caps| caps.get(1))
        .filter_map(|m| parse_candidate(m.as_str()))
        .find(|p| band.accepts(*p))
}

// ---------------------------------------------------------------------------
// Text helpers
// ---------------------------------------------------------------------------

/// First number in `text` that parses, is not a fineness mark and sits inside the band.
fn first_plausible(text: &str, band: &PriceBand) -> Option<f64> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| {
        Regex::new(r"\d{1,3}(?:,\d{3})+(?:\.\d+)?|\d+(?:\.\d+)?").expect("valid number regex")
    });
    re.find_iter(text)
        .filter_map(|m| parse_candidate(m.as_str()))
        .find(|p| band.accepts(*p))
}

/// Strip thousands separators and parse. Purity marks (999, 999.9, 9999) are not prices.
fn parse_candidate(raw: &str) -> Option<f64> {
    if is_fineness_mark(raw) {
        return None;
    }
    let cleaned: String = raw.chars().filter(|c| *c != ',').collect();
    cleaned.parse::<f64>().ok().filter(|p| p.is_finite())
}

fn is_fineness_mark(raw: &str) -> bool {
    matches!(raw, "999" | "999.9" | "999.99" | "9999")
}

/// Text of `el` with inline markup concatenated as-is, so `651<sup>.20</sup>`
/// reads `651.20`. Block boundaries and `<br>` become a space; hidden elements are skipped.
fn element_text(el: ElementRef) -> String {
    let mut out = String::new();
    write_text(el, &mut out);
    out
}

fn write_text(el: ElementRef, out: &mut String) {
    for child in el.children() {
        if let Some(text) = child.value().as_text() {
            out.push_str(text);
        } else if let Some(child_el) = ElementRef::wrap(child) {
            let name = child_el.value().name();
            if is_hidden(name) {
                continue;
            }
            let block = is_block(name);
            if block {
                out.push(' ');
            }
            write_text(child_el, out);
            if block {
                out.push(' ');
            }
        }
    }
}

fn is_hidden(name: &str) -> bool {
    matches!(name, "script" | "style" | "noscript" | "template" | "head")
}

fn is_block(name: &str) -> bool {
    matches!(
        name,
        "address" | "article" | "aside" | "blockquote" | "body" | "br" | "dd" | "div" | "dl"
            | "dt" | "footer" | "form" | "h1" | "h2" | "h3" | "h4" | "h5" | "h6" | "header"
            | "hr" | "li" | "main" | "nav" | "ol" | "option" | "p" | "pre" | "section"
            | "table" | "tbody" | "td" | "tfoot" | "th" | "thead" | "tr" | "ul"
    )
}

/// Page text with hidden contents dropped and whitespace collapsed.
fn visible_text(doc: &Html) -> String {
    element_text(doc.root_element())
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    const BAND: PriceBand = PriceBand { min: 200.0, max: 1000.0 };

    fn extract(html: &str) -> Result<Extraction, ExtractionError> {
        extract_from_html(html, &BAND)
    }

    #[test]
    fn band_is_exclusive() {
        assert!(!BAND.accepts(50.0));
        assert!(BAND.accepts(650.0));
        assert!(!BAND.accepts(200.0));
        assert!(!BAND.accepts(1000.0));
    }

    #[test]
    fn band_rejects_inverted_or_non_finite_bounds() {
        assert!(PriceBand::new(800.0, 400.0).is_none());
        assert!(PriceBand::new(400.0, 400.0).is_none());
        assert!(PriceBand::new(-1.0, 400.0).is_none());
        assert!(PriceBand::new(400.0, f64::INFINITY).is_none());
        assert_eq!(PriceBand::new(400.0, 800.0), Some(PriceBand { min: 400.0, max: 800.0 }));
    }

    #[test]
    fn price_container_wins_first() {
        let html = r#"<html><body>
            <p>Call 012-345 6789</p>
            <div class="gold-price-box"><span>Gold 999.9</span> <span>RM 651.20</span></div>
            <table><tr><td>Gold 999.9 Sell</td><td>700.00</td></tr></table>
        </body></html>"#;
        let got = extract(html).unwrap();
        assert_eq!(got.price, 651.20);
        assert_eq!(got.heuristic, "price_container");
    }

    #[test]
    fn container_skips_implausible_numbers() {
        let html = r#"<body><div class="price">Weight 50 g, updated 10:45</div>
            <div class="price">RM 648.5</div></body>"#;
        let got = extract(html).unwrap();
        assert_eq!(got.price, 648.5);
    }

    #[test]
    fn table_prefers_sell_column() {
        let html = r#"<body><table>
            <tr><th>Product</th><th>We Buy</th><th>We Sell</th></tr>
            <tr><td>Silver 999</td><td>3.80</td><td>4.20</td></tr>
            <tr><td>Gold 999.9</td><td>630.10</td><td>655.40</td></tr>
        </table></body>"#;
        let got = extract(html).unwrap();
        assert_eq!(got.price, 655.40);
        assert_eq!(got.heuristic, "gold_table_row");
    }

    #[test]
    fn per_gram_suffix_in_free_text() {
        let html = "<body><p>Today 16/10/2026: bullion at RM 1,234.00 per kilo-bar lot, 652.75/g retail.</p></body>";
        let got = extract(html).unwrap();
        assert_eq!(got.price, 652.75);
        assert_eq!(got.heuristic, "per_gram_suffix");
    }

    #[test]
    fn keyword_prefix_skips_fineness_marks() {
        let html = "<body><p>Fine gold 999.9 selling at RM 659.10 today</p></body>";
        let got = extract(html).unwrap();
        assert_eq!(got.price, 659.10);
        assert_eq!(got.heuristic, "keyword_prefix");
    }

    #[test]
    fn script_text_is_ignored() {
        let html = r#"<body><script>var gold = 777.77;</script><p>Gold sold out</p></body>"#;
        assert_eq!(
            extract(html),
            Err(ExtractionError::NoPlausibleCandidate { heuristics: HEURISTICS.len() })
        );
    }

    #[test]
    fn no_candidate_in_band() {
        let html = r#"<body><div class="price">RM 50.00</div><p>Gold 12 per gram</p></body>"#;
        assert!(matches!(extract(html), Err(ExtractionError::NoPlausibleCandidate { .. })));
    }

    #[test]
    fn empty_page_is_structural_error() {
        assert!(matches!(
            extract("<html><head><style>p{}</style></head><body>  </body></html>"),
            Err(ExtractionError::StructuralParse(_))
        ));
    }

    #[test]
    fn container_reads_decimal_split_by_inline_tag() {
        let html = r#"<body><div class="gold-price">RM 651<sup>.20</sup></div></body>"#;
        let got = extract(html).unwrap();
        assert_eq!(got.price, 651.20);
        assert_eq!(got.heuristic, "price_container");
    }

    #[test]
    fn table_cell_reads_decimal_split_by_inline_tag() {
        let html = r#"<body><table>
            <tr><td>Gold 999.9 Sell</td><td>RM <b>651</b>.20</td></tr>
        </table></body>"#;
        let got = extract(html).unwrap();
        assert_eq!(got.price, 651.20);
        assert_eq!(got.heuristic, "gold_table_row");
    }

    #[test]
    fn per_gram_reads_decimal_split_by_inline_tag() {
        let got = extract("<body><p>Gold sell RM <b>651</b>.20 per gram</p></body>").unwrap();
        assert_eq!(got.price, 651.20);
        assert_eq!(got.heuristic, "per_gram_suffix");
    }

    #[test]
    fn keyword_reads_decimal_split_by_inline_tag() {
        let got = extract("<body><p>Gold sell RM <b>651</b><small>.20</small> today</p></body>").unwrap();
        assert_eq!(got.price, 651.20);
        assert_eq!(got.heuristic, "keyword_prefix");
    }

    #[test]
    fn adjacent_cells_do_not_merge_into_one_number() {
        let html = r#"<body><table><tr><td>Gold 5</td><td>651.20</td><td>/g</td></tr></table></body>"#;
        let got = extract(html).unwrap();
        assert_eq!(got.price, 651.20);
        assert_eq!(got.heuristic, "gold_table_row");
    }

    #[test]
    fn stricter_band_changes_winner() {
        let html = r#"<body><div class="price">RM 350.00</div><p>Gold sell 620.00</p></body>"#;
        let wide = extract_from_html(html, &BAND).unwrap();
        assert_eq!(wide.price, 350.0);
        let strict = PriceBand::new(400.0, 800.0).unwrap();
        let narrow = extract_from_html(html, &strict).unwrap();
        assert_eq!(narrow.price, 620.0);
        assert_eq!(narrow.heuristic, "keyword_prefix");
    }
}
