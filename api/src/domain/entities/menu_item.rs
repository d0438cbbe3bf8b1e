//! Menu item domain entity

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::DomainError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MenuItemId(pub i64);

impl std::fmt::Display for MenuItemId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Something the canteen sells, priced in tokens
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuItem {
    pub id: MenuItemId,
    pub name: String,
    pub description: String,
    pub price: i32,
    pub is_available: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewMenuItem {
    pub name: String,
    pub description: String,
    pub price: i32,
    pub is_available: bool,
}

impl NewMenuItem {
    pub fn validate(&self) -> Result<(), DomainError> {
        validate_name(&self.name)?;
        validate_price(self.price)
    }
}

#[derive(Debug, Clone, Default)]
pub struct MenuItemUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<i32>,
    pub is_available: Option<bool>,
}

impl MenuItemUpdate {
    pub fn validate(&self) -> Result<(), DomainError> {
        if let Some(name) = &self.name {
            validate_name(name)?;
        }
        if let Some(price) = self.price {
            validate_price(price)?;
        }
        Ok(())
    }

    pub fn apply(&self, item: &mut MenuItem) {
        if let Some(name) = &self.name {
            item.name = name.clone();
        }
        if let Some(description) = &self.description {
            item.description = description.clone();
        }
        if let Some(price) = self.price {
            item.price = price;
        }
        if let Some(is_available) = self.is_available {
            item.is_available = is_available;
        }
    }
}

fn validate_name(name: &str) -> Result<(), DomainError> {
    let len = name.trim().chars().count();
    if len == 0 || len > 100 {
        return Err(DomainError::Validation(
            "Name must be between 1 and 100 characters".to_string(),
        ));
    }
    Ok(())
}

fn validate_price(price: i32) -> Result<(), DomainError> {
    if price < 0 {
        return Err(DomainError::Validation(
            "Price must be zero or a positive number of tokens".to_string(),
        ));
    }
    Ok(())
}
