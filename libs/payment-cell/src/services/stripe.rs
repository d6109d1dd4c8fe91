use reqwest::Client;
use serde::de::DeserializeOwned;
use tracing::{debug, error};

use shared_config::AppConfig;

use crate::models::{PaymentError, PaymentIntent};

/// Thin client over the two gateway capabilities the booking core consumes:
/// creating a payment intent and reading one back.
pub struct StripeClient {
    client: Client,
    base_url: String,
    secret_key: String,
}

impl StripeClient {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config.stripe_api_base_url.trim_end_matches('/').to_string(),
            secret_key: config.stripe_secret_key.clone(),
        }
    }

    pub async fn create_payment_intent(
        &self,
        amount_cents: i64,
        currency: &str,
        metadata: &[(&str, String)],
    ) -> Result<PaymentIntent, PaymentError> {
        let mut form: Vec<(String, String)> = vec![
            ("amount".to_string(), amount_cents.to_string()),
            ("currency".to_string(), currency.to_string()),
        ];
        form.extend(
            metadata
                .iter()
                .map(|(key, value)| (format!("metadata[{}]", key), value.clone())),
        );

        debug!("Creating payment intent for {} {}", amount_cents, currency);

        let request = self.client
            .post(format!("{}/v1/payment_intents", self.base_url))
            .form(&form);

        self.send(request).await
    }

    pub async fn retrieve_payment_intent(&self, intent_id: &str) -> Result<PaymentIntent, PaymentError> {
        debug!("Retrieving payment intent {}", intent_id);

        let request = self.client
            .get(format!("{}/v1/payment_intents/{}", self.base_url, urlencoding::encode(intent_id)));

        self.send(request).await
    }

    async fn send<T: DeserializeOwned>(&self, request: reqwest::RequestBuilder) -> Result<T, PaymentError> {
        if self.secret_key.is_empty() {
            return Err(PaymentError::NotConfigured);
        }

        let response = request.bearer_auth(&self.secret_key).send().await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await?;
            error!("Stripe error ({}): {}", status, message);
            return Err(PaymentError::Gateway { status: status.as_u16(), message });
        }

        Ok(response.json::<T>().await?)
    }
}
