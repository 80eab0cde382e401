use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SupplierId(pub String);

impl std::fmt::Display for SupplierId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Read-only supplier record owned by the supplier directory.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SupplierProfile {
    pub id: SupplierId,
    pub company_name: String,
    /// 0-5 stars, `None` when the supplier has not been rated yet.
    pub rating: Option<f64>,
    /// 0-100.
    pub delivery_score: Option<f64>,
}
