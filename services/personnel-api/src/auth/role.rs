use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::AuthError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    SuperAdmin,
    Admin,
    Staff,
    Reservist,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::SuperAdmin => "super_admin",
            Role::Admin => "admin",
            Role::Staff => "staff",
            Role::Reservist => "reservist",
        }
    }

    /// Battalion-wide administrators (not scoped to a company).
    pub fn is_administrator(&self) -> bool {
        matches!(self, Role::SuperAdmin | Role::Admin)
    }

    /// Whether an account holding `self` may create an account with `target`.
    pub fn can_provision(&self, target: Role) -> bool {
        match self {
            Role::SuperAdmin => true,
            Role::Admin => matches!(target, Role::Staff | Role::Reservist),
            Role::Staff => target == Role::Reservist,
            Role::Reservist => false,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "super_admin" => Ok(Role::SuperAdmin),
            "admin" => Ok(Role::Admin),
            "staff" => Ok(Role::Staff),
            "reservist" => Ok(Role::Reservist),
            other => Err(AuthError::UnknownRole(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_strings_are_exact() {
        assert_eq!("super_admin".parse::<Role>().unwrap(), Role::SuperAdmin);
        assert_eq!("reservist".parse::<Role>().unwrap(), Role::Reservist);
        assert!("Admin".parse::<Role>().is_err());
        assert!(" staff".parse::<Role>().is_err());
    }

    #[test]
    fn provisioning_follows_hierarchy() {
        assert!(Role::SuperAdmin.can_provision(Role::Admin));
        assert!(!Role::Admin.can_provision(Role::Admin));
        assert!(Role::Admin.can_provision(Role::Staff));
        assert!(Role::Staff.can_provision(Role::Reservist));
        assert!(!Role::Staff.can_provision(Role::Staff));
        assert!(!Role::Reservist.can_provision(Role::Reservist));
    }
}
