use std::env;
use std::str::FromStr;
use tracing::warn;

/// Probe window used by the slot resolver and the booking reservation loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotSearchConfig {
    pub max_attempts: u32,
    pub step_minutes: u32,
    pub reservation_attempts: u32,
}

impl Default for SlotSearchConfig {
    fn default() -> Self {
        Self {
            max_attempts: 12,
            step_minutes: 5,
            reservation_attempts: 3,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub jwt_secret: String,
    pub stripe_secret_key: String,
    pub stripe_webhook_secret: String,
    pub stripe_api_base_url: String,
    pub payment_exchange_rate: f64,
    pub slot_search: SlotSearchConfig,
    pub port: u16,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let defaults = SlotSearchConfig::default();

        let config = Self {
            supabase_url: env::var("SUPABASE_URL")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_URL not set, using empty value");
                    String::new()
                }),
            supabase_anon_key: env::var("SUPABASE_ANON_PUBLIC_KEY")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_ANON_PUBLIC_KEY not set, using empty value");
                    String::new()
                }),
            jwt_secret: env::var("JWT_SECRET")
                .unwrap_or_else(|_| {
                    warn!("JWT_SECRET not set, using empty value");
                    String::new()
                }),
            stripe_secret_key: env::var("STRIPE_SECRET_KEY")
                .unwrap_or_else(|_| {
                    warn!("STRIPE_SECRET_KEY not set, using empty value");
                    String::new()
                }),
            stripe_webhook_secret: env::var("STRIPE_WEBHOOK_SECRET")
                .unwrap_or_else(|_| {
                    warn!("STRIPE_WEBHOOK_SECRET not set, using empty value");
                    String::new()
                }),
            stripe_api_base_url: env::var("STRIPE_API_BASE_URL")
                .unwrap_or_else(|_| "https://api.stripe.com".to_string()),
            payment_exchange_rate: parse_or("PAYMENT_EXCHANGE_RATE", 278.0),
            slot_search: SlotSearchConfig {
                max_attempts: parse_or("SLOT_SEARCH_MAX_ATTEMPTS", defaults.max_attempts),
                step_minutes: parse_or("SLOT_STEP_MINUTES", defaults.step_minutes),
                reservation_attempts: parse_or(
                    "SLOT_RESERVATION_ATTEMPTS",
                    defaults.reservation_attempts,
                ),
            },
            port: parse_or("API_PORT", 3000),
        };

        if !config.is_configured() {
            warn!("Application not fully configured - missing environment variables");
        }

        if !config.is_payment_configured() {
            warn!("Stripe credentials missing - paid booking and webhooks will be rejected");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.supabase_url.is_empty()
            && !self.supabase_anon_key.is_empty()
            && !self.jwt_secret.is_empty()
    }

    pub fn is_payment_configured(&self) -> bool {
        !self.stripe_secret_key.is_empty() && !self.stripe_webhook_secret.is_empty()
    }
}

fn parse_or<T: FromStr + Copy + std::fmt::Display>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("{} has invalid value {:?}, using {}", key, raw, default);
            default
        }),
        Err(_) => default,
    }
}
