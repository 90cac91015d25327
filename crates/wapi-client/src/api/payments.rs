//! Ticket payments.
//!
//! The backend talks to the payment gateways; the client only builds the
//! request and, on success, the text encoded into the ticket QR code.

use reqwest::Method;
use serde::Serialize;
use tracing::{error, info};

use wapi_shared::constants::{FALLBACK_PAYMENT_AMOUNT, MPESA_COUNTRY_PREFIX};

use super::ApiClient;
use crate::catalog::EventDetail;
use crate::error::{ApiError, ApiResult};
use crate::routes::PaymentMethod;

/// Method-specific payment fields, flattened into the request body.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PaymentDetails {
    Mpesa {
        phone: String,
    },
    Card {
        #[serde(rename = "cardNumber")]
        card_number: String,
        expiry: String,
        cvv: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequest {
    pub event_id: String,
    pub name: String,
    pub payment_method: PaymentMethod,
    pub amount: f64,
    #[serde(flatten)]
    pub details: PaymentDetails,
}

impl PaymentRequest {
    /// `price` is the event's ticket price when it could be loaded.
    pub fn mpesa(event_id: &str, name: &str, phone: &str, price: Option<f64>) -> Self {
        Self {
            event_id: event_id.to_string(),
            name: name.to_string(),
            payment_method: PaymentMethod::Mpesa,
            amount: price.unwrap_or(FALLBACK_PAYMENT_AMOUNT),
            details: PaymentDetails::Mpesa {
                phone: normalize_mpesa_phone(phone),
            },
        }
    }

    pub fn card(
        event_id: &str,
        name: &str,
        card_number: &str,
        expiry: &str,
        cvv: &str,
        price: Option<f64>,
    ) -> Self {
        Self {
            event_id: event_id.to_string(),
            name: name.to_string(),
            payment_method: PaymentMethod::Card,
            amount: price.unwrap_or(FALLBACK_PAYMENT_AMOUNT),
            details: PaymentDetails::Card {
                card_number: card_number.to_string(),
                expiry: expiry.to_string(),
                cvv: cvv.to_string(),
            },
        }
    }
}

/// Rewrite a leading `+254`, `254` or `0` to `254`.
pub fn normalize_mpesa_phone(phone: &str) -> String {
    let phone = phone.trim();
    let rest = ["+254", "254", "0"]
        .iter()
        .find_map(|prefix| phone.strip_prefix(prefix));
    match rest {
        Some(rest) => format!("{MPESA_COUNTRY_PREFIX}{rest}"),
        None => phone.to_string(),
    }
}

/// Proof of a successful payment.
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentReceipt {
    pub event: Option<EventDetail>,
    pub name: String,
}

impl PaymentReceipt {
    /// Text for the ticket QR code. Empty when the event never loaded.
    pub fn ticket_text(&self) -> String {
        let Some(event) = &self.event else {
            return String::new();
        };
        let field = |v: &Option<String>| v.clone().unwrap_or_default();
        format!(
            "Event: {}\nDate: {}\nTime: {}\nVenue: {}\nName: {}",
            event.name,
            field(&event.local_date),
            field(&event.local_time),
            field(&event.venue),
            self.name
        )
    }
}

impl ApiClient {
    pub async fn initiate_payment(
        &self,
        request: &PaymentRequest,
        event: Option<&EventDetail>,
    ) -> ApiResult<PaymentReceipt> {
        if request.name.trim().is_empty() {
            return Err(ApiError::Invalid("Name is required".into()));
        }

        let result: ApiResult<serde_json::Value> = self
            .send_json(Method::POST, "payments/initiate/", request)
            .await;
        if let Err(e) = &result {
            error!(event = %request.event_id, error = %e, "Payment failed");
        }
        result?;

        info!(
            event = %request.event_id,
            method = request.payment_method.as_str(),
            amount = request.amount,
            "Payment accepted"
        );
        Ok(PaymentReceipt {
            event: event.cloned(),
            name: request.name.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::api::tests::client;
    use crate::error::ErrorKind;

    #[test]
    fn phone_prefixes_are_normalized() {
        assert_eq!(normalize_mpesa_phone(" 0712345678 "), "254712345678");
        assert_eq!(normalize_mpesa_phone("+254712345678"), "254712345678");
        assert_eq!(normalize_mpesa_phone("254712345678"), "254712345678");
        assert_eq!(normalize_mpesa_phone("712345678"), "712345678");
    }

    #[test]
    fn card_body_uses_backend_field_names() {
        let req = PaymentRequest::card("E1", "Amina", "4242", "12/27", "123", Some(2500.0));
        assert_eq!(
            serde_json::to_value(&req).unwrap(),
            json!({
                "eventId": "E1",
                "name": "Amina",
                "paymentMethod": "card",
                "amount": 2500.0,
                "cardNumber": "4242",
                "expiry": "12/27",
                "cvv": "123"
            })
        );
    }

    #[test]
    fn receipt_text_lists_ticket_fields() {
        let receipt = PaymentReceipt {
            event: Some(EventDetail {
                id: "E1".into(),
                name: "Sauti Sol Live".into(),
                local_date: Some("2024-12-01".into()),
                local_time: Some("19:00:00".into()),
                venue: Some("KICC".into()),
                ..EventDetail::default()
            }),
            name: "Amina".into(),
        };
        assert_eq!(
            receipt.ticket_text(),
            "Event: Sauti Sol Live\nDate: 2024-12-01\nTime: 19:00:00\nVenue: KICC\nName: Amina"
        );
    }

    #[tokio::test]
    async fn mpesa_payment_without_price_uses_fallback_amount() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/payments/initiate/"))
            .and(body_json(json!({
                "eventId": "E1",
                "name": "Amina",
                "paymentMethod": "mpesa",
                "amount": 1000.0,
                "phone": "254712345678"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "status": "queued" })))
            .expect(1)
            .mount(&server)
            .await;

        let api = client(&server.uri(), true);
        let req = PaymentRequest::mpesa("E1", "Amina", "0712345678", None);
        let receipt = api.initiate_payment(&req, None).await.unwrap();
        assert_eq!(receipt.ticket_text(), "");
    }

    #[tokio::test]
    async fn gateway_message_is_surfaced() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/payments/initiate/"))
            .respond_with(
                ResponseTemplate::new(400).set_body_json(json!({ "message": "Insufficient funds" })),
            )
            .mount(&server)
            .await;

        let api = client(&server.uri(), true);
        let req = PaymentRequest::mpesa("E1", "Amina", "0712345678", Some(500.0));
        let err = api.initiate_payment(&req, None).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Rejected);
        assert_eq!(err.user_message("Payment failed."), "Insufficient funds");
    }
}
