// Copyright (c) 2024 Spare Change Developers
// Distributed under the MIT software license

//! Coin eligibility

use core::fmt;

use serde::{Deserialize, Serialize};

use crate::constants::DUST_FLOOR;
use crate::{ChangeDef, Coin};

/// Why a coin can't be donated
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Ineligibility {
    Frozen,
    Dust,
    Amount,
    Age,
}

impl fmt::Display for Ineligibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Frozen => write!(f, "Frozen"),
            Self::Dust => write!(f, "Dust"),
            Self::Amount => write!(f, "Amount"),
            Self::Age => write!(f, "Age"),
        }
    }
}

/// Coin annotated with its eligibility
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotatedCoin {
    pub coin: Coin,
    /// Confirmations, `-1` if unconfirmed
    pub age: i64,
    pub is_eligible: bool,
    /// Empty if eligible
    pub reasons: Vec<Ineligibility>,
}

impl AnnotatedCoin {
    pub fn eligibility_text(&self) -> String {
        if self.is_eligible {
            String::from("Eligible for donation")
        } else {
            let reasons: Vec<String> = self.reasons.iter().map(|r| r.to_string()).collect();
            format!("Ineligible: {}", reasons.join(", "))
        }
    }
}

/// Age of a coin at `local_height`, `-1` if unconfirmed
pub fn coin_age(height: Option<u32>, local_height: u32) -> i64 {
    match height {
        Some(height) if height > 0 => (local_height as i64 - height as i64) + 1,
        _ => -1,
    }
}

fn annotate(coin: &Coin, criteria: &ChangeDef, local_height: u32) -> AnnotatedCoin {
    let age: i64 = coin_age(coin.height, local_height);
    let value_ok: bool = coin.value < criteria.threshold;
    let age_ok: bool = criteria.min_age == 0 || age >= criteria.min_age as i64;
    let dust_ok: bool = coin.value > DUST_FLOOR;
    let is_eligible: bool = !coin.is_frozen && value_ok && age_ok && dust_ok;

    let mut reasons: Vec<Ineligibility> = Vec::new();
    if !is_eligible {
        if coin.is_frozen {
            reasons.push(Ineligibility::Frozen);
        } else if !dust_ok {
            reasons.push(Ineligibility::Dust);
        } else {
            if !value_ok {
                reasons.push(Ineligibility::Amount);
            }
            if !age_ok {
                reasons.push(Ineligibility::Age);
            }
        }
    }

    AnnotatedCoin {
        coin: coin.clone(),
        age,
        is_eligible,
        reasons,
    }
}

/// Classify coins against `criteria`.
///
/// Output is sorted so that eligible, low value, low height coins come first
/// and frozen coins last.
pub fn classify(coins: &[Coin], criteria: &ChangeDef, local_height: u32) -> Vec<AnnotatedCoin> {
    let mut annotated: Vec<AnnotatedCoin> = coins
        .iter()
        .map(|coin| annotate(coin, criteria, local_height))
        .collect();
    annotated.sort_by_key(|c| (c.coin.is_frozen, !c.is_eligible, c.coin.value, c.coin.height));
    annotated
}

/// Eligible coins only, in classification order
pub fn eligible_coins(annotated: &[AnnotatedCoin]) -> Vec<Coin> {
    annotated
        .iter()
        .filter(|c| c.is_eligible)
        .map(|c| c.coin.clone())
        .collect()
}

pub fn count_eligible(annotated: &[AnnotatedCoin]) -> usize {
    annotated.iter().filter(|c| c.is_eligible).count()
}
