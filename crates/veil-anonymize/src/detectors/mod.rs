//! Built-in pattern detectors.
//!
//! One detector per category, each owning its patterns, structural
//! validation, and normalization. All of them are zero-sized stateless
//! values; construction is free.

mod bic;
mod card;
mod custom;
mod email;
mod iban;
mod ip;
mod phone;
mod url;

pub use bic::BicDetector;
pub use card::CardDetector;
pub use custom::PatternDetector;
pub use email::EmailDetector;
pub use iban::IbanDetector;
pub use ip::IpDetector;
pub use phone::PhoneDetector;
pub use url::UrlDetector;
