//! The parts of Stripe event payloads the webhook reads.

use serde::Deserialize;
use serde_json::Value;

/// Invoice events that mean a subscription payment went through.
pub const INVOICE_PAID_EVENTS: [&str; 3] = [
    "invoice.paid",
    "invoice.payment_succeeded",
    "invoice.payment.paid",
];

#[derive(Debug, Clone, Deserialize)]
pub struct StripeEvent {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "type", default)]
    pub event_type: String,
    #[serde(default)]
    pub data: EventData,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventData {
    #[serde(default)]
    pub object: Value,
}

impl StripeEvent {
    pub fn is_invoice_paid(&self) -> bool {
        INVOICE_PAID_EVENTS.contains(&self.event_type.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvoiceDetails {
    pub invoice_id: String,
    pub customer_id: Option<String>,
    pub subscription_id: Option<String>,
    pub customer_email: Option<String>,
    pub price_id: Option<String>,
}

fn text(value: &Value, pointer: &str) -> Option<String> {
    value
        .pointer(pointer)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Every price id on the invoice lines, in order. Newer payloads carry
/// `pricing.price_details.price`; older ones a `price` object.
pub fn extract_price_ids(invoice: &Value) -> Vec<String> {
    invoice
        .pointer("/lines/data")
        .and_then(Value::as_array)
        .map(|lines| {
            lines
                .iter()
                .filter_map(|line| {
                    text(line, "/pricing/price_details/price").or_else(|| text(line, "/price/id"))
                })
                .collect()
        })
        .unwrap_or_default()
}

impl InvoiceDetails {
    pub fn from_object(invoice: &Value) -> Self {
        Self {
            invoice_id: text(invoice, "/id").unwrap_or_default(),
            customer_id: text(invoice, "/customer"),
            subscription_id: text(invoice, "/subscription")
                .or_else(|| text(invoice, "/parent/subscription_details/subscription")),
            customer_email: text(invoice, "/customer_email").map(|e| e.to_lowercase()),
            price_id: extract_price_ids(invoice).into_iter().next(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_price_from_pricing_details_then_legacy() {
        let invoice = json!({
            "lines": {"data": [
                {"pricing": {"price_details": {"price": " price_new "}}},
                {"price": {"id": "price_old"}},
                {"description": "no price"}
            ]}
        });
        assert_eq!(extract_price_ids(&invoice), vec!["price_new", "price_old"]);
        assert!(extract_price_ids(&json!({})).is_empty());
    }

    #[test]
    fn test_invoice_details() {
        let invoice = json!({
            "id": "in_1",
            "customer": "cus_1",
            "customer_email": "Jane@Example.com",
            "subscription": null,
            "parent": {"subscription_details": {"subscription": "sub_1"}},
            "lines": {"data": [{"price": {"id": "price_m"}}]}
        });
        let details = InvoiceDetails::from_object(&invoice);
        assert_eq!(details.invoice_id, "in_1");
        assert_eq!(details.customer_email.as_deref(), Some("jane@example.com"));
        assert_eq!(details.subscription_id.as_deref(), Some("sub_1"));
        assert_eq!(details.price_id.as_deref(), Some("price_m"));
    }

    #[test]
    fn test_event_type_matching() {
        let event: StripeEvent = serde_json::from_value(json!({
            "id": "evt_1",
            "type": "invoice.payment_succeeded",
            "data": {"object": {}}
        }))
        .unwrap();
        assert!(event.is_invoice_paid());

        let other: StripeEvent =
            serde_json::from_value(json!({"id": "evt_2", "type": "customer.created"})).unwrap();
        assert!(!other.is_invoice_paid());
    }
}
