use std::collections::BTreeMap;

use serde::{Deserialize, Serialize, Serializer};

use crate::error::{AppError, Result};
use crate::pricing::catalog::{
    CAST_DEFAULT_PREMIUM, CAST_PREMIUMS, LUNAR_OZ_PREMIUM, LUNAR_PREMIUM, MINTED_DEFAULT_PREMIUM,
    MINTED_PREMIUMS,
};
use crate::types::ProductType;

/// Two weights closer than this are the same catalog weight.
const WEIGHT_EPSILON: f64 = 1e-9;

// ---------------------------------------------------------------------------
// Premium
// ---------------------------------------------------------------------------

/// Markup on top of the metal value: `value * (1 + rate) + fixed`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Premium {
    pub rate: f64,
    pub fixed: f64,
}

impl Premium {
    pub const fn rate(rate: f64) -> Self {
        Self { rate, fixed: 0.0 }
    }

    fn validate(&self, label: &str) -> Result<()> {
        if !self.rate.is_finite() || self.rate <= -1.0 {
            return Err(AppError::InvalidPremiums(format!(
                "{label}: rate must be a finite number greater than -1"
            )));
        }
        if !self.fixed.is_finite() {
            return Err(AppError::InvalidPremiums(format!("{label}: fixed must be finite")));
        }
        Ok(())
    }
}

/// A bare number when there is no fixed term, `{rate, fixed}` otherwise.
impl Serialize for Premium {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        if self.fixed == 0.0 {
            serializer.serialize_f64(self.rate)
        } else {
            #[derive(Serialize)]
            struct Full {
                rate: f64,
                fixed: f64,
            }
            Full { rate: self.rate, fixed: self.fixed }.serialize(serializer)
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(untagged)]
pub enum PremiumInput {
    Rate(f64),
    Full {
        rate: f64,
        #[serde(default)]
        fixed: f64,
    },
}

impl From<PremiumInput> for Premium {
    fn from(input: PremiumInput) -> Self {
        match input {
            PremiumInput::Rate(rate) => Premium::rate(rate),
            PremiumInput::Full { rate, fixed } => Premium { rate, fixed },
        }
    }
}

// ---------------------------------------------------------------------------
// Per-weight premiums
// ---------------------------------------------------------------------------

/// Exact-match weight table with a type-level fallback.
#[derive(Debug, Clone, PartialEq)]
pub struct WeightPremiums {
    /// Sorted ascending by weight, no duplicate weights.
    entries: Vec<(f64, Premium)>,
    default: Premium,
}

impl WeightPremiums {
    pub fn new(entries: &[(f64, f64)], default: f64) -> Self {
        let mut table = Self { entries: Vec::with_capacity(entries.len()), default: Premium::rate(default) };
        for &(weight, rate) in entries {
            table.insert(weight, Premium::rate(rate));
        }
        table
    }

    pub fn get(&self, weight: f64) -> Premium {
        self.entries
            .iter()
            .find(|(w, _)| (w - weight).abs() < WEIGHT_EPSILON)
            .map(|&(_, p)| p)
            .unwrap_or(self.default)
    }

    fn insert(&mut self, weight: f64, premium: Premium) {
        match self.entries.iter_mut().find(|(w, _)| (*w - weight).abs() < WEIGHT_EPSILON) {
            Some(slot) => slot.1 = premium,
            None => {
                self.entries.push((weight, premium));
                self.entries.sort_by(|a, b| a.0.total_cmp(&b.0));
            }
        }
    }
}

impl Serialize for WeightPremiums {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_map(self.entries.iter().map(|(w, p)| (format_weight(*w), p)))
    }
}

fn format_weight(weight: f64) -> String {
    if weight.fract() == 0.0 {
        format!("{weight:.0}")
    } else {
        weight.to_string()
    }
}

fn parse_weight(label: &str, key: &str) -> Result<f64> {
    match key.trim().parse::<f64>() {
        Ok(w) if w.is_finite() && w > 0.0 => Ok(w),
        _ => Err(AppError::InvalidPremiums(format!(
            "{label}: weight key {key:?} must be a positive number of grams"
        ))),
    }
}

// ---------------------------------------------------------------------------
// PremiumTable
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PremiumTable {
    pub minted: WeightPremiums,
    pub cast: WeightPremiums,
    pub lunar: Premium,
    #[serde(rename = "lunar-oz")]
    pub lunar_oz: Premium,
}

impl Default for PremiumTable {
    fn default() -> Self {
        Self {
            minted: WeightPremiums::new(MINTED_PREMIUMS, MINTED_DEFAULT_PREMIUM),
            cast: WeightPremiums::new(CAST_PREMIUMS, CAST_DEFAULT_PREMIUM),
            lunar: Premium::rate(LUNAR_PREMIUM),
            lunar_oz: Premium::rate(LUNAR_OZ_PREMIUM),
        }
    }
}

impl PremiumTable {
    /// Premium for a product. Per-weight types fall back to their type default;
    /// lunar types have one rate regardless of weight.
    pub fn lookup(&self, product_type: ProductType, weight: f64) -> Premium {
        match product_type {
            ProductType::Minted => self.minted.get(weight),
            ProductType::Cast => self.cast.get(weight),
            ProductType::Lunar => self.lunar,
            ProductType::LunarOz => self.lunar_oz,
        }
    }

    /// Return a new table with `update` merged in. Validates the whole update
    /// before touching anything, so a rejected update leaves no partial change.
    pub fn merged(&self, update: &PremiumsUpdate) -> Result<Self> {
        let mut next = self.clone();

        if let Some(minted) = &update.minted {
            for (key, input) in minted {
                let weight = parse_weight("minted", key)?;
                let premium = Premium::from(*input);
                premium.validate(&format!("minted[{key}]"))?;
                next.minted.insert(weight, premium);
            }
        }
        if let Some(cast) = &update.cast {
            for (key, input) in cast {
                let weight = parse_weight("cast", key)?;
                let premium = Premium::from(*input);
                premium.validate(&format!("cast[{key}]"))?;
                next.cast.insert(weight, premium);
            }
        }
        if let Some(input) = update.lunar {
            let premium = Premium::from(input);
            premium.validate("lunar")?;
            next.lunar = premium;
        }
        if let Some(input) = update.lunar_oz {
            let premium = Premium::from(input);
            premium.validate("lunarOz")?;
            next.lunar_oz = premium;
        }

        Ok(next)
    }
}

/// Body of `POST /api/update-premiums`. Every field is optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PremiumsUpdate {
    pub minted: Option<BTreeMap<String, PremiumInput>>,
    pub cast: Option<BTreeMap<String, PremiumInput>>,
    pub lunar: Option<PremiumInput>,
    #[serde(rename = "lunarOz", alias = "lunar-oz")]
    pub lunar_oz: Option<PremiumInput>,
}

impl PremiumsUpdate {
    pub fn is_empty(&self) -> bool {
        self.minted.is_none() && self.cast.is_none() && self.lunar.is_none() && self.lunar_oz.is_none()
    }
}
