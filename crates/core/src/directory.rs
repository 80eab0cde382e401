//! Collaborators the procurement core consumes but does not own: the
//! identity/role provider, the supplier directory and approver routing.
//! The `Static*` implementations back tests and the CLI demo.

use std::collections::HashMap;

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::actor::{Actor, ActorToken, UserId};
use crate::domain::supplier::{SupplierId, SupplierProfile};

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DirectoryError {
    #[error("directory unavailable: {0}")]
    Unavailable(String),
    #[error("directory returned malformed data: {0}")]
    Malformed(String),
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Resolves an actor token; `None` when the token is unknown.
    async fn resolve(&self, token: &ActorToken) -> Result<Option<Actor>, DirectoryError>;
}

#[async_trait]
pub trait SupplierDirectory: Send + Sync {
    async fn find_supplier(
        &self,
        id: &SupplierId,
    ) -> Result<Option<SupplierProfile>, DirectoryError>;
}

#[async_trait]
pub trait ApproverDirectory: Send + Sync {
    /// Picks the approver a newly submitted request is routed to.
    async fn route_approver(&self, department: &str) -> Result<Option<UserId>, DirectoryError>;
}

#[derive(Clone, Debug, Default)]
pub struct StaticIdentityProvider {
    actors: HashMap<String, Actor>,
}

impl StaticIdentityProvider {
    pub fn with_actor(mut self, token: impl Into<String>, actor: Actor) -> Self {
        self.actors.insert(token.into(), actor);
        self
    }
}

#[async_trait]
impl IdentityProvider for StaticIdentityProvider {
    async fn resolve(&self, token: &ActorToken) -> Result<Option<Actor>, DirectoryError> {
        Ok(self.actors.get(&token.0).cloned())
    }
}

#[derive(Clone, Debug, Default)]
pub struct StaticSupplierDirectory {
    suppliers: HashMap<SupplierId, SupplierProfile>,
}

impl StaticSupplierDirectory {
    pub fn with_supplier(mut self, supplier: SupplierProfile) -> Self {
        self.suppliers.insert(supplier.id.clone(), supplier);
        self
    }
}

#[async_trait]
impl SupplierDirectory for StaticSupplierDirectory {
    async fn find_supplier(
        &self,
        id: &SupplierId,
    ) -> Result<Option<SupplierProfile>, DirectoryError> {
        Ok(self.suppliers.get(id).cloned())
    }
}

#[derive(Clone, Debug, Default)]
pub struct StaticApproverDirectory {
    approvers: HashMap<String, UserId>,
}

impl StaticApproverDirectory {
    pub fn with_approver(mut self, department: &str, approver: impl Into<String>) -> Self {
        self.approvers.insert(normalize_key(department), UserId(approver.into()));
        self
    }
}

#[async_trait]
impl ApproverDirectory for StaticApproverDirectory {
    async fn route_approver(&self, department: &str) -> Result<Option<UserId>, DirectoryError> {
        Ok(self.approvers.get(&normalize_key(department)).cloned())
    }
}

fn normalize_key(value: &str) -> String {
    value.trim().to_ascii_lowercase()
}
