//! The closed set of PII categories.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CategoryParseError;

/// Categories of personally identifiable information handled by the
/// pipeline.
///
/// The set is closed: detector registration, tag parsing, and priority
/// ordering all match exhaustively, so a new category cannot be silently
/// mishandled. The canonical string form (`as_str`) is used as the tag
/// `type` attribute and as the map-key prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PiiCategory {
    /// Personal name.
    Person,
    /// Organization or company name.
    Organization,
    /// Geographic location (city, region, country).
    Location,
    /// Postal address.
    Address,
    /// Email address.
    Email,
    /// Phone number.
    Phone,
    /// Web address.
    Url,
    /// IPv4 or IPv6 address.
    IpAddress,
    /// International bank account number.
    Iban,
    /// BIC/SWIFT bank identifier.
    Bic,
    /// Domestic bank account number.
    AccountNumber,
    /// Payment card number.
    CreditCard,
    /// Tax identification number.
    TaxId,
    /// Government-issued national ID.
    NationalId,
    /// Date of birth.
    DateOfBirth,
    /// Case or ticket reference.
    CaseId,
    /// Customer reference.
    CustomerId,
}

impl PiiCategory {
    /// Every category, in declaration order.
    pub const ALL: [Self; 17] = [
        Self::Person,
        Self::Organization,
        Self::Location,
        Self::Address,
        Self::Email,
        Self::Phone,
        Self::Url,
        Self::IpAddress,
        Self::Iban,
        Self::Bic,
        Self::AccountNumber,
        Self::CreditCard,
        Self::TaxId,
        Self::NationalId,
        Self::DateOfBirth,
        Self::CaseId,
        Self::CustomerId,
    ];

    /// Returns the canonical string name used in tags and map keys.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Person => "PERSON",
            Self::Organization => "ORGANIZATION",
            Self::Location => "LOCATION",
            Self::Address => "ADDRESS",
            Self::Email => "EMAIL",
            Self::Phone => "PHONE",
            Self::Url => "URL",
            Self::IpAddress => "IP_ADDRESS",
            Self::Iban => "IBAN",
            Self::Bic => "BIC",
            Self::AccountNumber => "ACCOUNT_NUMBER",
            Self::CreditCard => "CREDIT_CARD",
            Self::TaxId => "TAX_ID",
            Self::NationalId => "NATIONAL_ID",
            Self::DateOfBirth => "DATE_OF_BIRTH",
            Self::CaseId => "CASE_ID",
            Self::CustomerId => "CUSTOMER_ID",
        }
    }

    /// Returns the default confidence threshold for this category.
    ///
    /// Model-heavy categories (person, organization) use a higher bar than
    /// structurally validated ones.
    #[must_use]
    pub const fn default_threshold(&self) -> f64 {
        match self {
            Self::Person | Self::Organization => 0.7,
            _ => 0.5,
        }
    }
}

impl fmt::Display for PiiCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PiiCategory {
    type Err = CategoryParseError;

    /// Parses a canonical category name, case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.to_ascii_uppercase();
        Self::ALL
            .iter()
            .find(|category| category.as_str() == upper)
            .copied()
            .ok_or_else(|| CategoryParseError(s.to_string()))
    }
}
