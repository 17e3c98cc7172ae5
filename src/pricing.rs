//! Credit cost of a generation, subscription plans and credit packages.
//!
//! Pricing model:
//! - Base cost: 10 credits (5s, 480p/720p, no audio)
//! - Duration add-on: +5 credits if duration > 5s
//! - Resolution add-on: +5 credits for 1080p
//! - Audio add-on: +5 credits if enabled

use crate::video::Resolution;
use serde::Serialize;

/// Credits charged for the standard generation.
pub const BASE_CREDIT_COST: u32 = 10;
/// Extra credits for videos longer than [`BASE_DURATION_SECS`].
pub const DURATION_ADDON_COST: u32 = 5;
/// Extra credits for 1080p output.
pub const RESOLUTION_ADDON_COST: u32 = 5;
/// Extra credits when audio is generated alongside the video.
pub const AUDIO_ADDON_COST: u32 = 5;
/// Duration covered by the base cost.
pub const BASE_DURATION_SECS: u32 = 5;

/// Inputs to the cost formula. Absent fields take the standard values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GenerationCostParams {
    /// Video length in seconds (defaults to 5).
    pub duration_secs: Option<u32>,
    /// Output resolution (defaults to 720p).
    pub resolution: Option<Resolution>,
    /// Whether audio is generated (defaults to false).
    pub generate_audio: Option<bool>,
}

/// Computes the credit cost of one generation.
pub fn calculate_generation_cost(params: &GenerationCostParams) -> u32 {
    let duration = params.duration_secs.unwrap_or(BASE_DURATION_SECS);
    let resolution = params.resolution.unwrap_or_default();
    let generate_audio = params.generate_audio.unwrap_or(false);

    let mut cost = BASE_CREDIT_COST;
    if duration > BASE_DURATION_SECS {
        cost += DURATION_ADDON_COST;
    }
    if resolution == Resolution::P1080 {
        cost += RESOLUTION_ADDON_COST;
    }
    if generate_audio {
        cost += AUDIO_ADDON_COST;
    }
    cost
}

/// How a price is charged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentKind {
    /// Recurring charge.
    Subscription,
    /// Single charge.
    OneTime,
}

/// Billing interval of a subscription price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanInterval {
    /// Billed monthly.
    Month,
    /// Billed yearly.
    Year,
}

/// A single price point of a plan.
#[derive(Debug, Clone, Serialize)]
pub struct Price {
    /// Recurring or one-time.
    pub kind: PaymentKind,
    /// Amount in the smallest currency unit.
    pub amount_cents: u32,
    /// ISO currency code.
    pub currency: &'static str,
    /// Billing interval, for subscriptions.
    pub interval: Option<PlanInterval>,
}

impl Price {
    /// Monthly cost of this price, for "per month" display of yearly plans.
    pub fn monthly_equivalent_cents(&self) -> u32 {
        match self.interval {
            Some(PlanInterval::Year) => self.amount_cents / 12,
            _ => self.amount_cents,
        }
    }
}

/// Credits allotted on every subscription period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PlanCredits {
    /// Credits granted per period.
    pub amount: u32,
    /// Days until the granted credits expire.
    pub expire_days: u32,
}

/// A subscription plan shown in the pricing table.
#[derive(Debug, Clone, Serialize)]
pub struct PricePlan {
    /// Plan id, e.g. `pro`.
    pub id: &'static str,
    /// Available price points.
    pub prices: Vec<Price>,
    /// The free tier.
    pub is_free: bool,
    /// Paid once, never renews.
    pub is_lifetime: bool,
    /// Highlighted in the pricing table.
    pub popular: bool,
    /// Credits granted each period, if any.
    pub credits: Option<PlanCredits>,
}

impl PricePlan {
    /// Returns the price billed at the given interval.
    pub fn price_for(&self, interval: PlanInterval) -> Option<&Price> {
        self.prices.iter().find(|p| p.interval == Some(interval))
    }
}

/// A one-off credit top-up.
#[derive(Debug, Clone, Serialize)]
pub struct CreditPackage {
    /// Package id, e.g. `standard`.
    pub id: &'static str,
    /// Credits granted.
    pub amount: u32,
    /// Price in the smallest currency unit.
    pub price_cents: u32,
    /// ISO currency code.
    pub currency: &'static str,
    /// Highlighted in the pricing table.
    pub popular: bool,
    /// Whether checkout accepts promotion codes.
    pub allow_promotion_code: bool,
}

fn subscription(monthly: u32, yearly: u32) -> Vec<Price> {
    vec![
        Price {
            kind: PaymentKind::Subscription,
            amount_cents: monthly,
            currency: "USD",
            interval: Some(PlanInterval::Month),
        },
        Price {
            kind: PaymentKind::Subscription,
            amount_cents: yearly,
            currency: "USD",
            interval: Some(PlanInterval::Year),
        },
    ]
}

/// All subscription plans, cheapest first.
pub fn price_plans() -> Vec<PricePlan> {
    vec![
        PricePlan {
            id: "basic",
            prices: subscription(1990, 11940),
            is_free: false,
            is_lifetime: false,
            popular: false,
            credits: Some(PlanCredits {
                amount: 800,
                expire_days: 30,
            }),
        },
        PricePlan {
            id: "standard",
            prices: subscription(3990, 23940),
            is_free: false,
            is_lifetime: false,
            popular: true,
            credits: Some(PlanCredits {
                amount: 2000,
                expire_days: 30,
            }),
        },
        PricePlan {
            id: "pro",
            prices: subscription(9990, 59940),
            is_free: false,
            is_lifetime: false,
            popular: false,
            credits: Some(PlanCredits {
                amount: 6000,
                expire_days: 30,
            }),
        },
    ]
}

/// All credit packages, smallest first.
pub fn credit_packages() -> Vec<CreditPackage> {
    let package = |id, amount, price_cents, popular| CreditPackage {
        id,
        amount,
        price_cents,
        currency: "USD",
        popular,
        allow_promotion_code: true,
    };
    vec![
        package("starter", 1000, 2990, false),
        package("creator", 2000, 4990, true),
        package("professional", 5000, 9990, false),
    ]
}

/// Looks up a plan by id.
pub fn find_plan(id: &str) -> Option<PricePlan> {
    price_plans().into_iter().find(|p| p.id == id)
}

/// Looks up a credit package by id.
pub fn find_package(id: &str) -> Option<CreditPackage> {
    credit_packages().into_iter().find(|p| p.id == id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_generation_costs_base() {
        assert_eq!(
            calculate_generation_cost(&GenerationCostParams::default()),
            BASE_CREDIT_COST
        );
        let explicit = GenerationCostParams {
            duration_secs: Some(5),
            resolution: Some(Resolution::P480),
            generate_audio: Some(false),
        };
        assert_eq!(calculate_generation_cost(&explicit), 10);
    }

    #[test]
    fn test_each_addon_adds_five() {
        let longer = GenerationCostParams {
            duration_secs: Some(10),
            ..Default::default()
        };
        assert_eq!(calculate_generation_cost(&longer), 15);

        let hd = GenerationCostParams {
            resolution: Some(Resolution::P1080),
            ..Default::default()
        };
        assert_eq!(calculate_generation_cost(&hd), 15);

        let audio = GenerationCostParams {
            generate_audio: Some(true),
            ..Default::default()
        };
        assert_eq!(calculate_generation_cost(&audio), 15);
    }

    #[test]
    fn test_all_addons() {
        let params = GenerationCostParams {
            duration_secs: Some(10),
            resolution: Some(Resolution::P1080),
            generate_audio: Some(true),
        };
        assert_eq!(calculate_generation_cost(&params), 25);
    }

    #[test]
    fn test_duration_boundary() {
        let six = GenerationCostParams {
            duration_secs: Some(6),
            ..Default::default()
        };
        assert_eq!(calculate_generation_cost(&six), 15);

        let one = GenerationCostParams {
            duration_secs: Some(1),
            ..Default::default()
        };
        assert_eq!(calculate_generation_cost(&one), 10);
    }

    #[test]
    fn test_plan_catalog() {
        let plans = price_plans();
        assert_eq!(plans.len(), 3);
        assert_eq!(plans.iter().filter(|p| p.popular).count(), 1);

        let standard = find_plan("standard").unwrap();
        assert!(standard.popular);
        assert_eq!(standard.credits.unwrap().amount, 2000);
        let yearly = standard.price_for(PlanInterval::Year).unwrap();
        assert_eq!(yearly.amount_cents, 23940);
        assert_eq!(yearly.monthly_equivalent_cents(), 1995);

        assert!(find_plan("enterprise").is_none());
    }

    #[test]
    fn test_package_catalog() {
        let creator = find_package("creator").unwrap();
        assert_eq!(creator.amount, 2000);
        assert_eq!(creator.price_cents, 4990);
        assert!(creator.popular);
        assert!(find_package("mega").is_none());
    }
}
