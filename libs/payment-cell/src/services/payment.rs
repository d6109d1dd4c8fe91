use std::sync::Arc;

use chrono::Utc;
use serde_json::{json, Value};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::SupabaseClient;

use crate::models::{
    CreatePaymentIntentRequest, CreatePaymentIntentResponse, NewPayment, Payment, PaymentError,
    PaymentIntent, PaymentProof, PaymentStatus, WebhookOutcome,
};
use crate::services::stripe::StripeClient;
use crate::services::webhook::{parse_event, verify_signature};

/// Smallest amount, in PKR, a payment intent may be created for.
pub const MINIMUM_INTENT_AMOUNT: f64 = 2.0;

pub struct PaymentService {
    supabase: Arc<SupabaseClient>,
    stripe: StripeClient,
    exchange_rate: f64,
    webhook_secret: String,
}

impl PaymentService {
    pub fn new(config: &AppConfig) -> Self {
        Self::with_client(Arc::new(SupabaseClient::new(config)), config)
    }

    pub fn with_client(supabase: Arc<SupabaseClient>, config: &AppConfig) -> Self {
        Self {
            supabase,
            stripe: StripeClient::new(config),
            exchange_rate: config.payment_exchange_rate,
            webhook_secret: config.stripe_webhook_secret.clone(),
        }
    }

    pub fn amount_to_usd_cents(&self, amount_pkr: f64) -> i64 {
        (amount_pkr / self.exchange_rate * 100.0).round() as i64
    }

    pub async fn initiate_payment(
        &self,
        user_id: &str,
        request: &CreatePaymentIntentRequest,
    ) -> Result<CreatePaymentIntentResponse, PaymentError> {
        let amount = parse_amount(&request.amount)?;
        if amount < MINIMUM_INTENT_AMOUNT {
            return Err(PaymentError::InvalidAmount("Minimum payment is Rs. 2.00".to_string()));
        }

        let amount_cents = self.amount_to_usd_cents(amount);
        let metadata = [
            ("doctorId", request.doctor_id.to_string()),
            ("userId", user_id.to_string()),
            ("date", request.date.to_string()),
            ("time", request.time.clone()),
            ("doctorname", request.doctor_name.clone().unwrap_or_default()),
            ("originalAmountPKR", amount.to_string()),
            ("exchangeRate", self.exchange_rate.to_string()),
        ];

        let intent = self.stripe.create_payment_intent(amount_cents, "usd", &metadata).await?;
        info!("Created payment intent {} for user {}", intent.id, user_id);

        Ok(CreatePaymentIntentResponse {
            success: true,
            client_secret: intent.client_secret,
            payment_intent_id: intent.id,
            doctor_id: request.doctor_id,
            date: request.date,
            time: request.time.clone(),
        })
    }

    /// Confirms with the gateway that the referenced charge succeeded for the
    /// claimed amount, and that no booking has consumed it yet.
    pub async fn verify_settlement(&self, proof: &PaymentProof) -> Result<PaymentIntent, PaymentError> {
        if proof.transaction_id.trim().is_empty() {
            return Err(PaymentError::InvalidAmount("paymentIntentId is required".to_string()));
        }
        validate_intent_id(&proof.transaction_id)?;
        if !(proof.amount.is_finite() && proof.amount > 0.0) {
            return Err(PaymentError::InvalidAmount("amount must be a positive number".to_string()));
        }

        let intent = match self.stripe.retrieve_payment_intent(&proof.transaction_id).await {
            Ok(intent) => intent,
            Err(PaymentError::Gateway { status: 404, .. }) => {
                return Err(PaymentError::UnknownIntent { transaction_id: proof.transaction_id.clone() });
            }
            Err(e) => return Err(e),
        };

        if !intent.is_succeeded() {
            warn!("Payment intent {} is {}, refusing booking", intent.id, intent.status);
            return Err(PaymentError::NotSettled {
                transaction_id: intent.id,
                status: intent.status,
            });
        }

        let expected = self.amount_to_usd_cents(proof.amount);
        if intent.amount != expected {
            warn!("Payment intent {} charged {} but {} was claimed", intent.id, intent.amount, expected);
            return Err(PaymentError::AmountMismatch { expected, charged: intent.amount });
        }

        self.ensure_unused(&proof.transaction_id).await?;

        debug!("Payment intent {} verified", intent.id);
        Ok(intent)
    }

    pub async fn find_by_transaction(&self, transaction_id: &str) -> Result<Option<Payment>, PaymentError> {
        let query = format!("transaction_id=eq.{}&limit=1", urlencoding::encode(transaction_id));
        let rows: Vec<Payment> = self.supabase.select("payments", &query).await?;
        Ok(rows.into_iter().next())
    }

    pub async fn ensure_unused(&self, transaction_id: &str) -> Result<(), PaymentError> {
        match self.find_by_transaction(transaction_id).await? {
            Some(_) => Err(PaymentError::AlreadyRecorded(transaction_id.to_string())),
            None => Ok(()),
        }
    }

    pub async fn record_payment(&self, payment: NewPayment) -> Result<Payment, PaymentError> {
        let row = json!({
            "transaction_id": payment.transaction_id,
            "amount": payment.amount,
            "doctor_id": payment.doctor_id,
            "user_id": payment.user_id,
            "status": payment.status,
            "date": payment.date,
            "time": payment.time,
            "payment_method": "stripe"
        });

        let recorded: Payment = self.supabase.insert("payments", row).await.map_err(|e| {
            if e.is_conflict() {
                PaymentError::AlreadyRecorded(payment.transaction_id.clone())
            } else {
                error!("Failed to record payment {}: {}", payment.transaction_id, e);
                PaymentError::DatabaseError(e)
            }
        })?;

        info!("Recorded payment {} ({})", recorded.transaction_id, recorded.status);
        Ok(recorded)
    }

    pub async fn mark_status(
        &self,
        transaction_id: &str,
        status: PaymentStatus,
    ) -> Result<Vec<Payment>, PaymentError> {
        let filter = format!("transaction_id=eq.{}", urlencoding::encode(transaction_id));
        let patch = json!({
            "status": status,
            "updated_at": Utc::now().to_rfc3339()
        });

        Ok(self.supabase.update("payments", &filter, patch).await?)
    }

    pub async fn apply_webhook(
        &self,
        payload: &[u8],
        signature_header: &str,
    ) -> Result<WebhookOutcome, PaymentError> {
        verify_signature(payload, signature_header, &self.webhook_secret, Utc::now().timestamp())?;
        let event = parse_event(payload)?;

        let status = match event.event_type.as_str() {
            "payment_intent.succeeded" => PaymentStatus::Completed,
            "payment_intent.payment_failed" => PaymentStatus::Failed,
            other => {
                debug!("Ignoring webhook event {} ({})", event.id, other);
                return Ok(WebhookOutcome::Ignored { event_type: other.to_string() });
            }
        };

        let transaction_id = event.data.object
            .get("id")
            .and_then(Value::as_str)
            .ok_or_else(|| PaymentError::MalformedEvent("event object has no id".to_string()))?
            .to_string();

        let updated = self.mark_status(&transaction_id, status).await?;
        let matched = !updated.is_empty();

        if matched {
            info!("Payment {} marked {}", transaction_id, status);
        } else {
            warn!("Webhook for {} matched no payment record", transaction_id);
        }

        Ok(WebhookOutcome::StatusUpdated { transaction_id, status, matched })
    }

    pub async fn list_transactions(&self) -> Result<Vec<Payment>, PaymentError> {
        Ok(self.supabase.select("payments", "order=created_at.desc").await?)
    }
}

/// Gateway intent ids look like `pi_<alphanumerics>`.
pub fn validate_intent_id(transaction_id: &str) -> Result<(), PaymentError> {
    let valid = transaction_id
        .strip_prefix("pi_")
        .is_some_and(|rest| !rest.is_empty() && rest.chars().all(|c| c.is_ascii_alphanumeric() || c == '_'));

    if valid {
        Ok(())
    } else {
        Err(PaymentError::InvalidIntentId(transaction_id.to_string()))
    }
}

/// Accepts a JSON number or a numeric string; anything else, non-finite or
/// non-positive is rejected.
pub fn parse_amount(value: &Value) -> Result<f64, PaymentError> {
    let amount = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };

    match amount {
        Some(a) if a.is_finite() && a > 0.0 => Ok(a),
        _ => Err(PaymentError::InvalidAmount("amount must be a positive number".to_string())),
    }
}

/// Convenience for callers holding the raw request amount.
pub fn proof_from_request(transaction_id: &str, amount: &Value) -> Result<PaymentProof, PaymentError> {
    Ok(PaymentProof {
        transaction_id: transaction_id.trim().to_string(),
        amount: parse_amount(amount)?,
    })
}

pub fn new_completed_payment(
    proof: &PaymentProof,
    doctor_id: Uuid,
    user_id: Uuid,
    date: chrono::NaiveDate,
    time: &str,
) -> NewPayment {
    NewPayment {
        transaction_id: proof.transaction_id.clone(),
        amount: proof.amount,
        doctor_id,
        user_id,
        status: PaymentStatus::Completed,
        date,
        time: time.to_string(),
    }
}
