//! Single capability check for every role-gated operation.
//!
//! Roles never appear in the lifecycle or award code directly; those
//! components ask the policy whether an actor holds a capability, once per
//! operation, and turn a denial into `DomainError::Forbidden`.

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use crate::domain::actor::{Actor, Role};
use crate::errors::DomainError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    Submit,
    Approve,
    Award,
}

impl Capability {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Submit => "submit",
            Self::Approve => "approve",
            Self::Award => "award",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilityGrant {
    pub role: Role,
    pub capabilities: BTreeSet<Capability>,
    /// When set, department-scoped capabilities apply to every department.
    pub global_scope: bool,
}

impl CapabilityGrant {
    pub fn new(role: Role, capabilities: impl IntoIterator<Item = Capability>) -> Self {
        Self { role, capabilities: capabilities.into_iter().collect(), global_scope: false }
    }

    pub fn with_global_scope(mut self) -> Self {
        self.global_scope = true;
        self
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AuthorizationFailure {
    UnknownRole { role: Role },
    MissingCapability { user_id: String, role: Role, capability: Capability },
    DepartmentMismatch { user_id: String, actor_department: String, required_department: String },
}

impl AuthorizationFailure {
    fn reason(&self) -> String {
        match self {
            Self::UnknownRole { role } => {
                format!("role `{}` has no capability grant", role.as_str())
            }
            Self::MissingCapability { user_id, role, capability } => format!(
                "`{user_id}` ({}) lacks the `{}` capability",
                role.as_str(),
                capability.as_str()
            ),
            Self::DepartmentMismatch { user_id, actor_department, required_department } => {
                format!(
                    "`{user_id}` belongs to `{actor_department}` and cannot act for `{required_department}`"
                )
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationResult {
    pub allowed: bool,
    pub reason: String,
    pub failure: Option<AuthorizationFailure>,
}

impl AuthorizationResult {
    fn allow(reason: impl Into<String>) -> Self {
        Self { allowed: true, reason: reason.into(), failure: None }
    }

    fn deny(failure: AuthorizationFailure) -> Self {
        Self { allowed: false, reason: failure.reason(), failure: Some(failure) }
    }
}

#[derive(Clone, Debug)]
pub struct CapabilityPolicy {
    grants: HashMap<Role, CapabilityGrant>,
}

impl CapabilityPolicy {
    pub fn new(grants: Vec<CapabilityGrant>) -> Self {
        Self { grants: grants.into_iter().map(|grant| (grant.role, grant)).collect() }
    }

    /// Checks `capability` for `actor`. `department` is the department the
    /// operation acts on; `None` means the capability is not department-scoped.
    pub fn evaluate(
        &self,
        actor: &Actor,
        capability: Capability,
        department: Option<&str>,
    ) -> AuthorizationResult {
        let Some(grant) = self.grants.get(&actor.role) else {
            return AuthorizationResult::deny(AuthorizationFailure::UnknownRole {
                role: actor.role,
            });
        };

        if !grant.capabilities.contains(&capability) {
            return AuthorizationResult::deny(AuthorizationFailure::MissingCapability {
                user_id: actor.user_id.0.clone(),
                role: actor.role,
                capability,
            });
        }

        if let Some(required) = department {
            if !grant.global_scope && normalize_key(&actor.department) != normalize_key(required)
            {
                return AuthorizationResult::deny(AuthorizationFailure::DepartmentMismatch {
                    user_id: actor.user_id.0.clone(),
                    actor_department: actor.department.clone(),
                    required_department: required.to_string(),
                });
            }
        }

        AuthorizationResult::allow(format!(
            "`{}` holds `{}`",
            actor.user_id.0,
            capability.as_str()
        ))
    }

    pub fn require(
        &self,
        actor: &Actor,
        capability: Capability,
        department: Option<&str>,
    ) -> Result<(), DomainError> {
        let result = self.evaluate(actor, capability, department);
        if result.allowed {
            Ok(())
        } else {
            Err(DomainError::Forbidden(result.reason))
        }
    }
}

impl Default for CapabilityPolicy {
    fn default() -> Self {
        use Capability::{Approve, Award, Submit};

        Self::new(vec![
            CapabilityGrant::new(Role::Requester, [Submit]),
            CapabilityGrant::new(Role::Approver, [Submit, Approve]),
            CapabilityGrant::new(Role::Administrator, [Submit, Approve, Award]).with_global_scope(),
        ])
    }
}

fn normalize_key(value: &str) -> String {
    value.trim().to_ascii_lowercase()
}
