//! Role-based access checks
//!
//! The ledgers recognise three privileged identities:
//! - **Approver**: signs off requested loans (the external approval workflow)
//! - **Operator**: liquidates loans past their grace period
//! - **Admin**: changes rate parameters
//!
//! Each role is granted to exactly one account.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::account::AccountId;

/// Privileged role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Approver,
    Operator,
    Admin,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Approver => write!(f, "approver"),
            Role::Operator => write!(f, "operator"),
            Role::Admin => write!(f, "admin"),
        }
    }
}

/// Authorization failures
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AccessError {
    #[error("{caller} is not the {role}")]
    Unauthorized { role: Role, caller: AccountId },
}

/// Check that `accessed_by` is the account the permission was granted to
pub fn check(permitted_to: &AccountId, accessed_by: &AccountId, role: Role) -> Result<(), AccessError> {
    if permitted_to == accessed_by {
        Ok(())
    } else {
        Err(AccessError::Unauthorized {
            role,
            caller: accessed_by.clone(),
        })
    }
}

/// Role grants for one ledger deployment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessControl {
    pub approver: AccountId,
    pub operator: AccountId,
    pub admin: AccountId,
}

impl AccessControl {
    pub fn new(approver: AccountId, operator: AccountId, admin: AccountId) -> Self {
        Self {
            approver,
            operator,
            admin,
        }
    }

    pub fn granted_to(&self, role: Role) -> &AccountId {
        match role {
            Role::Approver => &self.approver,
            Role::Operator => &self.operator,
            Role::Admin => &self.admin,
        }
    }

    pub fn check(&self, role: Role, caller: &AccountId) -> Result<(), AccessError> {
        check(self.granted_to(role), caller, role)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn access() -> AccessControl {
        AccessControl::new("controller".into(), "owner".into(), "owner".into())
    }

    #[test]
    fn test_granted_roles_pass() {
        let access = access();
        access.check(Role::Approver, &"controller".into()).unwrap();
        access.check(Role::Operator, &"owner".into()).unwrap();
        access.check(Role::Admin, &"owner".into()).unwrap();
    }

    #[test]
    fn test_wrong_caller_fails() {
        let err = access()
            .check(Role::Approver, &"owner".into())
            .unwrap_err();
        assert_eq!(
            err,
            AccessError::Unauthorized {
                role: Role::Approver,
                caller: "owner".into()
            }
        );
        assert_eq!(err.to_string(), "owner is not the approver");
    }
}
