use serde::{Deserialize, Serialize};

/// Role a party plays on a case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Employer,
    Broker,
    #[serde(rename = "GA", alias = "GENERAL_AGENT")]
    GeneralAgent,
    #[serde(rename = "TPA", alias = "THIRD_PARTY_ADMIN")]
    ThirdPartyAdmin,
    BrokerTpaGaAdmin,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Employer => "EMPLOYER",
            Role::Broker => "BROKER",
            Role::GeneralAgent => "GA",
            Role::ThirdPartyAdmin => "TPA",
            Role::BrokerTpaGaAdmin => "BROKER_TPA_GA_ADMIN",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "EMPLOYER" => Some(Role::Employer),
            "BROKER" => Some(Role::Broker),
            "GA" | "GENERAL_AGENT" => Some(Role::GeneralAgent),
            "TPA" | "THIRD_PARTY_ADMIN" => Some(Role::ThirdPartyAdmin),
            "BROKER_TPA_GA_ADMIN" => Some(Role::BrokerTpaGaAdmin),
            _ => None,
        }
    }
}

/// Outward-facing status of a case, as shown to everyone working on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CaseStatus {
    ApplicationNotStarted,
    ApplicationInProgress,
    Submitted,
    Active,
    Inactive,
}

impl CaseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CaseStatus::ApplicationNotStarted => "APPLICATION_NOT_STARTED",
            CaseStatus::ApplicationInProgress => "APPLICATION_IN_PROGRESS",
            CaseStatus::Submitted => "SUBMITTED",
            CaseStatus::Active => "ACTIVE",
            CaseStatus::Inactive => "INACTIVE",
        }
    }
}

/// A client case being onboarded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Case {
    pub id: String,
    pub name: String,
    pub status: CaseStatus,
}

impl Case {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            status: CaseStatus::ApplicationNotStarted,
        }
    }
}

/// A person granted access to a case in a given role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseAccess {
    pub case_id: String,
    pub role: Role,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

/// A registered user, independent of any case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserContact {
    pub id: String,
    pub role: Role,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

/// Who should be contacted, resolved from either an access grant or a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub email: String,
    pub name: String,
}

impl From<CaseAccess> for Contact {
    fn from(access: CaseAccess) -> Self {
        Contact {
            name: format!("{} {}", access.first_name, access.last_name),
            email: access.email,
        }
    }
}

impl From<UserContact> for Contact {
    fn from(user: UserContact) -> Self {
        Contact {
            name: format!("{} {}", user.first_name, user.last_name),
            email: user.email,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_uses_short_names_on_the_wire() {
        let roles: Vec<Role> = serde_json::from_str(r#"["GA", "TPA", "EMPLOYER"]"#).unwrap();
        assert_eq!(
            roles,
            vec![Role::GeneralAgent, Role::ThirdPartyAdmin, Role::Employer]
        );
        assert_eq!(
            serde_json::to_value(&roles).unwrap(),
            serde_json::json!(["GA", "TPA", "EMPLOYER"])
        );
        assert_eq!(
            serde_json::to_value(Role::BrokerTpaGaAdmin).unwrap(),
            "BROKER_TPA_GA_ADMIN"
        );
        for role in roles {
            assert_eq!(serde_json::to_value(role).unwrap(), role.as_str());
        }
    }

    #[test]
    fn role_still_reads_long_names() {
        let roles: Vec<Role> =
            serde_json::from_str(r#"["GENERAL_AGENT", "THIRD_PARTY_ADMIN"]"#).unwrap();
        assert_eq!(roles, vec![Role::GeneralAgent, Role::ThirdPartyAdmin]);
        assert_eq!(Role::from_str("TPA"), Some(Role::ThirdPartyAdmin));
        assert_eq!(Role::from_str("GENERAL_AGENT"), Some(Role::GeneralAgent));
        assert_eq!(Role::from_str("nobody"), None);
    }

    #[test]
    fn contact_from_access_joins_names() {
        let contact: Contact = CaseAccess {
            case_id: "c".to_string(),
            role: Role::Employer,
            first_name: "Jane".to_string(),
            last_name: "Smith".to_string(),
            email: "jane@example.com".to_string(),
        }
        .into();
        assert_eq!(contact.name, "Jane Smith");
        assert_eq!(contact.email, "jane@example.com");
    }
}
