pub mod payment;
pub mod stripe;
pub mod webhook;
