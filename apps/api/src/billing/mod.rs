// Stripe billing: subscription checkout and the invoice webhook that grants credits.

pub mod events;
pub mod handlers;
pub mod stripe;
pub mod webhook;
