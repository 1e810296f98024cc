use serde::{Deserialize, Serialize};

use super::order::UserId;

// ============================================================================
// Caller Identity
// ============================================================================
//
// The authenticated caller as handed to the order engine by the identity
// provider. The engine trusts it as given.
//
// ============================================================================

/// Role of an authenticated caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Customer,
    KitchenOwner,
    Admin,
}

impl Role {
    /// Whether the role may view every order and mutate order status
    pub fn is_administrative(&self) -> bool {
        matches!(self, Role::Admin)
    }

    /// Parse a role string; unknown roles fall back to the least privileged one
    pub fn parse_lenient(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "admin" => Role::Admin,
            "kitchen_owner" => Role::KitchenOwner,
            _ => Role::Customer,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Customer => "customer",
            Role::KitchenOwner => "kitchen_owner",
            Role::Admin => "admin",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caller {
    pub id: UserId,
    pub role: Role,
}

impl Caller {
    pub fn new(id: UserId, role: Role) -> Self {
        Self { id, role }
    }

    pub fn customer(id: UserId) -> Self {
        Self::new(id, Role::Customer)
    }

    pub fn admin(id: UserId) -> Self {
        Self::new(id, Role::Admin)
    }

    pub fn is_administrative(&self) -> bool {
        self.role.is_administrative()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_admin_is_administrative() {
        assert!(Role::Admin.is_administrative());
        assert!(!Role::Customer.is_administrative());
        assert!(!Role::KitchenOwner.is_administrative());
    }

    #[test]
    fn test_unknown_role_fails_closed() {
        assert_eq!(Role::parse_lenient("ADMIN"), Role::Admin);
        assert_eq!(Role::parse_lenient(" kitchen_owner "), Role::KitchenOwner);
        assert_eq!(Role::parse_lenient("superuser"), Role::Customer);
        assert_eq!(Role::parse_lenient(""), Role::Customer);
    }

    #[test]
    fn test_role_serialization() {
        let json = serde_json::to_string(&Role::KitchenOwner).unwrap();
        assert_eq!(json, "\"kitchen_owner\"");
    }
}
