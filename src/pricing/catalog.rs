use crate::types::{ProductSpec, ProductType};

/// Grams in one troy ounce.
pub const TROY_OUNCE_GRAMS: f64 = 31.1035;

/// Fallback premium for minted bars at a weight with no explicit entry.
pub const MINTED_DEFAULT_PREMIUM: f64 = 0.05;
/// Fallback premium for cast bars at a weight with no explicit entry.
pub const CAST_DEFAULT_PREMIUM: f64 = 0.02;

pub const MINTED_PREMIUMS: &[(f64, f64)] = &[(1.0, 0.13), (5.0, 0.06), (50.0, 0.01), (100.0, 0.005)];
pub const CAST_PREMIUMS: &[(f64, f64)] = &[(10.0, 0.045), (20.0, 0.025), (50.0, 0.0), (100.0, -0.005)];
pub const LUNAR_PREMIUM: f64 = 0.065;
pub const LUNAR_OZ_PREMIUM: f64 = 0.03;

const fn product(
    id: &'static str,
    name: &'static str,
    weight: f64,
    product_type: ProductType,
    category: &'static str,
) -> ProductSpec {
    ProductSpec { id, name, weight, product_type, category }
}

/// Display order of the price list. Fixed at compile time.
pub const PRODUCT_CATALOG: &[ProductSpec] = &[
    product("1g-minted", "1 gram", 1.0, ProductType::Minted, "Minted Bars"),
    product("5g-minted", "5 grams", 5.0, ProductType::Minted, "Minted Bars"),
    product("50g-minted", "50 grams", 50.0, ProductType::Minted, "Minted Bars"),
    product("100g-minted", "100 grams", 100.0, ProductType::Minted, "Minted Bars"),
    product("5g-lunar", "5 grams Lunar Horse", 5.0, ProductType::Lunar, "Minted Bars"),
    product("10g-cast", "10 grams", 10.0, ProductType::Cast, "Cast Bars"),
    product("20g-cast", "20 grams", 20.0, ProductType::Cast, "Cast Bars"),
    product("50g-cast", "50 grams", 50.0, ProductType::Cast, "Cast Bars"),
    product("100g-cast", "100 grams", 100.0, ProductType::Cast, "Cast Bars"),
    product("1oz-lunar", "1 Ounce Lunar Horse", TROY_OUNCE_GRAMS, ProductType::LunarOz, "Cast Bars"),
];
