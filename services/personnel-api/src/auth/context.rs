use super::Role;

/// The authenticated caller, resolved from the token subject and the account row.
#[derive(Debug, Clone)]
pub struct AccountContext {
    pub account_id: String,
    pub email: String,
    pub role: Role,
    /// Company the caller is assigned to (staff and reservists only).
    pub company_id: Option<String>,
}

impl AccountContext {
    pub fn new(account_id: String, email: String, role: Role) -> Self {
        Self {
            account_id,
            email,
            role,
            company_id: None,
        }
    }

    pub fn with_company(mut self, company_id: Option<String>) -> Self {
        self.company_id = company_id;
        self
    }

    pub fn is_administrator(&self) -> bool {
        self.role.is_administrator()
    }

    pub fn has_any_role(&self, roles: &[Role]) -> bool {
        roles.contains(&self.role)
    }

    /// Whether the caller may see records belonging to `company_id`.
    ///
    /// Administrators see every company; staff only their own. Records with
    /// no company are visible to administrators only.
    pub fn can_access_company(&self, company_id: Option<&str>) -> bool {
        if self.is_administrator() {
            return true;
        }
        match (self.role, company_id, self.company_id.as_deref()) {
            (Role::Staff, Some(target), Some(own)) => target == own,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn staff_company_scope() {
        let staff = AccountContext::new("s1".into(), "s1@unit.mil".into(), Role::Staff)
            .with_company(Some("alpha".into()));

        assert!(staff.can_access_company(Some("alpha")));
        assert!(!staff.can_access_company(Some("bravo")));
        assert!(!staff.can_access_company(None));
    }

    #[test]
    fn unassigned_staff_sees_nothing() {
        let staff = AccountContext::new("s2".into(), "s2@unit.mil".into(), Role::Staff);
        assert!(!staff.can_access_company(Some("alpha")));
    }

    #[test]
    fn administrators_see_all_companies() {
        let admin = AccountContext::new("a1".into(), "a1@unit.mil".into(), Role::Admin);
        assert!(admin.can_access_company(Some("alpha")));
        assert!(admin.can_access_company(None));
    }
}
