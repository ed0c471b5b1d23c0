use crate::pricing::premiums::{Premium, PremiumTable};
use crate::types::{ComputedProduct, ProductSpec};

/// Derive the full price list from a reference price. One output per catalog
/// entry, in catalog order. Pure: same inputs, same output.
///
/// The caller guarantees `reference_per_gram` is finite and positive
/// (`ReferencePrice` enforces this).
pub fn compute_prices(
    reference_per_gram: f64,
    catalog: &[ProductSpec],
    premiums: &PremiumTable,
    currency_prefix: &str,
) -> Vec<ComputedProduct> {
    catalog
        .iter()
        .map(|spec| {
            let premium = premiums.lookup(spec.product_type, spec.weight);
            let price = unit_price(reference_per_gram, spec.weight, premium);
            ComputedProduct {
                spec: *spec,
                price,
                price_formatted: format_price(currency_prefix, price),
            }
        })
        .collect()
}

/// `round(reference * weight * (1 + rate) + fixed)`, rounding half away from zero.
pub fn unit_price(reference_per_gram: f64, weight: f64, premium: Premium) -> i64 {
    (reference_per_gram * weight * (1.0 + premium.rate) + premium.fixed).round() as i64
}

/// `2650` → `"RM 2,650"`.
pub fn format_price(prefix: &str, price: i64) -> String {
    let digits = price.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    let sign = if price < 0 { "-" } else { "" };
    if prefix.is_empty() {
        format!("{sign}{grouped}")
    } else {
        format!("{prefix} {sign}{grouped}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pricing::catalog::PRODUCT_CATALOG;
    use crate::types::ProductType;

    /// Inverse of `format_price`: pulls the integer back out of a display string.
    fn parse_formatted_price(formatted: &str) -> Option<i64> {
        let start = formatted.find(|c: char| c.is_ascii_digit() || c == '-')?;
        let numeric: String = formatted[start..].chars().filter(|c| *c != ',').collect();
        numeric.trim().parse().ok()
    }

    fn spec(weight: f64, product_type: ProductType) -> ProductSpec {
        ProductSpec { id: "t", name: "t", weight, product_type, category: "Test" }
    }

    #[test]
    fn minted_5g_at_500_is_2650() {
        let out = compute_prices(500.0, &[spec(5.0, ProductType::Minted)], &PremiumTable::default(), "RM");
        assert_eq!(out[0].price, 2650);
        assert_eq!(out[0].price_formatted, "RM 2,650");
    }

    #[test]
    fn unlisted_minted_weight_uses_default_premium() {
        // 500 * 25 * 1.05
        let out = compute_prices(500.0, &[spec(25.0, ProductType::Minted)], &PremiumTable::default(), "RM");
        assert_eq!(out[0].price, 13_125);
    }

    #[test]
    fn negative_and_zero_premiums_apply() {
        let table = PremiumTable::default();
        let out = compute_prices(
            500.0,
            &[spec(50.0, ProductType::Cast), spec(100.0, ProductType::Cast)],
            &table,
            "RM",
        );
        assert_eq!(out[0].price, 25_000);
        assert_eq!(out[1].price, 49_750);
    }

    #[test]
    fn fractional_weight() {
        // 600 * 31.1035 * 1.03 = 19221.963
        let out = compute_prices(600.0, &[spec(31.1035, ProductType::LunarOz)], &PremiumTable::default(), "RM");
        assert_eq!(out[0].price, 19_222);
    }

    #[test]
    fn fixed_premium_term_is_additive() {
        assert_eq!(unit_price(500.0, 10.0, Premium { rate: 0.0, fixed: 35.0 }), 5_035);
    }

    #[test]
    fn output_follows_catalog_order() {
        let out = compute_prices(650.0, PRODUCT_CATALOG, &PremiumTable::default(), "RM");
        let ids: Vec<_> = out.iter().map(|p| p.spec.id).collect();
        let expected: Vec<_> = PRODUCT_CATALOG.iter().map(|p| p.id).collect();
        assert_eq!(ids, expected);
    }

    #[test]
    fn deterministic() {
        let table = PremiumTable::default();
        let a = compute_prices(612.37, PRODUCT_CATALOG, &table, "RM");
        let b = compute_prices(612.37, PRODUCT_CATALOG, &table, "RM");
        assert_eq!(a, b);
    }

    #[test]
    fn monotonic_in_reference_price() {
        let table = PremiumTable::default();
        let mut prev = compute_prices(200.0, PRODUCT_CATALOG, &table, "RM");
        let mut p = 200.0;
        while p < 1000.0 {
            p += 0.37;
            let next = compute_prices(p, PRODUCT_CATALOG, &table, "RM");
            for (a, b) in prev.iter().zip(&next) {
                assert!(b.price >= a.price, "{} dropped at {p}", a.spec.id);
            }
            prev = next;
        }
    }

    #[test]
    fn format_groups_thousands() {
        assert_eq!(format_price("RM", 0), "RM 0");
        assert_eq!(format_price("RM", 999), "RM 999");
        assert_eq!(format_price("RM", 1_000), "RM 1,000");
        assert_eq!(format_price("RM", 65_432_100), "RM 65,432,100");
        assert_eq!(format_price("", 12_345), "12,345");
        assert_eq!(format_price("RM", -4_500), "RM -4,500");
    }

    #[test]
    fn formatted_price_parses_back() {
        let out = compute_prices(655.55, PRODUCT_CATALOG, &PremiumTable::default(), "RM");
        for product in &out {
            assert_eq!(parse_formatted_price(&product.price_formatted), Some(product.price));
        }
        assert_eq!(parse_formatted_price("RM"), None);
    }
}
