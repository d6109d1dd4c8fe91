pub mod booking;
pub mod lifecycle;
pub mod messages;
pub mod slot;
