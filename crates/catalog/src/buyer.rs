use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use storefront_core::{BuyerId, DomainError, DomainResult, Entity};

/// Catalog entity: Buyer.
///
/// Beyond identity the core treats buyer attributes as opaque; they are
/// carried, validated structurally, and handed back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Buyer {
    pub id: BuyerId,
    pub name: String,
    pub email: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Payload for creating a buyer (identity is assigned by the storage layer).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewBuyer {
    pub name: String,
    pub email: Option<String>,
}

impl NewBuyer {
    pub fn validate(&self) -> DomainResult<()> {
        if self.name.trim().is_empty() {
            return Err(DomainError::validation("name cannot be empty"));
        }
        Ok(())
    }
}

impl Buyer {
    /// Build the stored entity from a validated payload and a fresh identity.
    pub fn from_new(id: BuyerId, new: NewBuyer, created_at: DateTime<Utc>) -> DomainResult<Self> {
        new.validate()?;
        Ok(Self {
            id,
            name: new.name,
            email: new.email,
            created_at,
        })
    }

    /// Structural validation of an existing record (update path).
    pub fn validate(&self) -> DomainResult<()> {
        if !self.id.is_positive() {
            return Err(DomainError::invalid_id(format!(
                "BuyerId: must be positive, got {}",
                self.id
            )));
        }
        if self.name.trim().is_empty() {
            return Err(DomainError::validation("name cannot be empty"));
        }
        Ok(())
    }
}

impl Entity for Buyer {
    type Id = BuyerId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_new_keeps_all_fields() {
        let created_at = Utc::now();
        let buyer = Buyer::from_new(
            BuyerId::new(7),
            NewBuyer {
                name: "Ada".to_string(),
                email: Some("ada@example.com".to_string()),
            },
            created_at,
        )
        .unwrap();

        assert_eq!(buyer.id, BuyerId::new(7));
        assert_eq!(buyer.name, "Ada");
        assert_eq!(buyer.email.as_deref(), Some("ada@example.com"));
        assert_eq!(buyer.created_at, created_at);
    }

    #[test]
    fn rejects_blank_name() {
        let payload = NewBuyer {
            name: "  ".to_string(),
            email: None,
        };

        let err = payload.validate().unwrap_err();
        match err {
            DomainError::Validation(_) => {}
            other => panic!("expected Validation error, got {other:?}"),
        }
    }

    #[test]
    fn email_is_optional() {
        let payload = NewBuyer {
            name: "Grace".to_string(),
            email: None,
        };
        assert!(payload.validate().is_ok());
    }
}
