pub mod appointment;
pub mod availability;
pub mod booking;
pub mod cache;
pub mod lifecycle;
pub mod slots;
