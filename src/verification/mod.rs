pub mod controller;
pub mod index;
pub mod otp;
pub mod registration;
pub mod service;
pub mod store;
pub mod sweeper;

pub use service::VerificationService;
