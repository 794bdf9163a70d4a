//! Credit amounts attached to each way a user can receive credits.

use crate::config::StripeConfig;
use crate::credits::ledger::CreditCost;
use crate::models::user::Plan;

/// Granted once at registration.
pub const STARTER: CreditCost = CreditCost { cv: 5, ai: 5 };

/// Paid to the referrer for each new account signed up with their code.
pub const REFERRAL_BONUS: CreditCost = CreditCost { cv: 5, ai: 5 };

/// Referrals beyond this count earn nothing.
pub const REFERRAL_CAP: i32 = 10;

/// Allowance granted per paid invoice. Plans without a Stripe price grant nothing.
pub fn credits_for_plan(plan: Plan) -> CreditCost {
    match plan {
        Plan::Monthly => CreditCost { cv: 20, ai: 30 },
        Plan::Pro => CreditCost { cv: 50, ai: 90 },
        _ => CreditCost::ZERO,
    }
}

/// Maps a Stripe price id back to the plan it sells.
pub fn plan_from_price(price_id: &str, stripe: &StripeConfig) -> Option<Plan> {
    let price_id = price_id.trim();
    if price_id.is_empty() {
        None
    } else if price_id == stripe.price_monthly {
        Some(Plan::Monthly)
    } else if price_id == stripe.price_pro {
        Some(Plan::Pro)
    } else {
        None
    }
}

/// The Stripe price for a purchasable plan.
pub fn price_for_plan(plan: Plan, stripe: &StripeConfig) -> Option<&str> {
    match plan {
        Plan::Monthly => Some(stripe.price_monthly.as_str()),
        Plan::Pro => Some(stripe.price_pro.as_str()),
        _ => None,
    }
}
