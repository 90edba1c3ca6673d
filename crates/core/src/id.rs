//! Strongly-typed identifiers used across the domain.
//!
//! Identities are integers assigned by the storage layer on creation. A value
//! of zero or below never refers to a persisted record, so parsing rejects it
//! up front.

use core::str::FromStr;
use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Identifier of a buyer.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BuyerId(i64);

/// Identifier of a product.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(i64);

/// Identifier of a category (opaque to this core; the category entity lives elsewhere).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CategoryId(i64);

macro_rules! impl_i64_newtype {
    ($t:ty, $name:literal) => {
        impl $t {
            /// Wrap a raw identifier value.
            ///
            /// No positivity check here; storage backends and the transport
            /// validate at their boundaries via [`Self::is_positive`].
            pub fn new(value: i64) -> Self {
                Self(value)
            }

            pub fn get(&self) -> i64 {
                self.0
            }

            /// Whether the value can refer to a persisted record at all.
            pub fn is_positive(&self) -> bool {
                self.0 > 0
            }
        }

        impl core::fmt::Display for $t {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                core::fmt::Display::fmt(&self.0, f)
            }
        }

        impl From<i64> for $t {
            fn from(value: i64) -> Self {
                Self(value)
            }
        }

        impl From<$t> for i64 {
            fn from(value: $t) -> Self {
                value.0
            }
        }

        impl FromStr for $t {
            type Err = DomainError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let value: i64 = s
                    .parse()
                    .map_err(|e| DomainError::invalid_id(format!("{}: {}", $name, e)))?;
                if value <= 0 {
                    return Err(DomainError::invalid_id(format!(
                        "{}: must be positive, got {}",
                        $name, value
                    )));
                }
                Ok(Self(value))
            }
        }
    };
}

impl_i64_newtype!(BuyerId, "BuyerId");
impl_i64_newtype!(ProductId, "ProductId");
impl_i64_newtype!(CategoryId, "CategoryId");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_positive_id() {
        let id: BuyerId = "42".parse().unwrap();
        assert_eq!(id.get(), 42);
        assert!(id.is_positive());
    }

    #[test]
    fn rejects_zero_and_negative_ids() {
        assert!(matches!(
            "0".parse::<ProductId>(),
            Err(DomainError::InvalidId(_))
        ));
        assert!(matches!(
            "-7".parse::<ProductId>(),
            Err(DomainError::InvalidId(_))
        ));
    }

    #[test]
    fn rejects_non_numeric_ids() {
        assert!(matches!(
            "abc".parse::<CategoryId>(),
            Err(DomainError::InvalidId(_))
        ));
    }
}
