pub mod password;
pub mod patient;
