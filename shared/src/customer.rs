use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::RwLock;
use tracing::info;
use uuid::Uuid;

use crate::error::{ShopError, ShopResult};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Customer {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub postal_code: Option<String>,
    pub country: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewCustomer {
    pub email: String,
    pub name: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub postal_code: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
}

impl NewCustomer {
    pub fn validate(&self) -> ShopResult<()> {
        validate_email(&self.email)?;
        if self.name.trim().is_empty() {
            return Err(ShopError::Validation("name is required".into()));
        }
        Ok(())
    }
}

/// Minimal shape check: something before and after a single `@`, and a dot
/// in the domain part.
pub fn validate_email(email: &str) -> ShopResult<()> {
    let valid = match email.trim().split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && !domain.contains('@') && domain.contains('.') && !domain.starts_with('.')
        }
        None => false,
    };
    if valid {
        Ok(())
    } else {
        Err(ShopError::Validation(format!("invalid email address {email:?}")))
    }
}

/// Customer records keyed by unique (case-insensitive) email.
#[derive(Debug, Default)]
pub struct CustomerDirectory {
    customers: RwLock<Vec<Customer>>,
}

impl CustomerDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, new: NewCustomer) -> ShopResult<Customer> {
        new.validate()?;
        let email = new.email.trim().to_string();

        let mut customers = self
            .customers
            .write()
            .map_err(|_| ShopError::Storage("customer directory lock poisoned".into()))?;
        if customers.iter().any(|c| c.email.eq_ignore_ascii_case(&email)) {
            return Err(ShopError::Conflict(format!("email {email} is already registered")));
        }

        let customer = Customer {
            id: Uuid::new_v4(),
            email,
            name: new.name.trim().to_string(),
            phone: new.phone,
            address: new.address,
            city: new.city,
            state: new.state,
            postal_code: new.postal_code,
            country: new.country,
            created_at: Utc::now(),
        };
        customers.push(customer.clone());
        info!("Customer {} registered", customer.id);
        Ok(customer)
    }

    pub fn find_by_email(&self, email: &str) -> ShopResult<Customer> {
        let customers = self
            .customers
            .read()
            .map_err(|_| ShopError::Storage("customer directory lock poisoned".into()))?;
        customers
            .iter()
            .find(|c| c.email.eq_ignore_ascii_case(email.trim()))
            .cloned()
            .ok_or_else(|| ShopError::NotFound(format!("customer {email}")))
    }

    pub fn all(&self) -> ShopResult<Vec<Customer>> {
        self.customers
            .read()
            .map(|customers| customers.clone())
            .map_err(|_| ShopError::Storage("customer directory lock poisoned".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ann() -> NewCustomer {
        NewCustomer {
            email: "ann@example.com".into(),
            name: "Ann".into(),
            ..Default::default()
        }
    }

    #[test]
    fn register_and_find() {
        let directory = CustomerDirectory::new();
        let created = directory.register(ann()).unwrap();
        assert_eq!(directory.find_by_email("ANN@example.com").unwrap(), created);
        assert_eq!(directory.all().unwrap().len(), 1);
    }

    #[test]
    fn duplicate_email_conflicts() {
        let directory = CustomerDirectory::new();
        directory.register(ann()).unwrap();
        let mut again = ann();
        again.email = "Ann@Example.com".into();
        assert!(matches!(directory.register(again), Err(ShopError::Conflict(_))));
    }

    #[test]
    fn rejects_malformed_input() {
        let directory = CustomerDirectory::new();
        for email in ["", "ann", "@example.com", "ann@", "ann@localhost", "a@b@c.com"] {
            let mut customer = ann();
            customer.email = email.into();
            assert!(
                matches!(directory.register(customer), Err(ShopError::Validation(_))),
                "{email:?} accepted"
            );
        }
        let mut nameless = ann();
        nameless.name = "  ".into();
        assert!(directory.register(nameless).is_err());
    }

    #[test]
    fn unknown_email_is_not_found() {
        let directory = CustomerDirectory::new();
        assert!(matches!(
            directory.find_by_email("who@example.com"),
            Err(ShopError::NotFound(_))
        ));
    }
}
