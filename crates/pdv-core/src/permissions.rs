//! # Permissions
//!
//! Which role may do what. The API's identity layer asks
//! [`Role::can`] before running any protected operation.
//!
//! ```text
//! ┌──────────────────┬─────────┬─────────┬─────────┐
//! │ Action           │ Cashier │ Manager │  Admin  │
//! ├──────────────────┼─────────┼─────────┼─────────┤
//! │ ViewCatalog      │    ✓    │    ✓    │    ✓    │
//! │ ViewSales        │    ✓    │    ✓    │    ✓    │
//! │ RecordSale       │    ✓    │    ✓    │    ✓    │
//! │ ManageCatalog    │         │    ✓    │    ✓    │
//! │ CancelSale       │         │    ✓    │    ✓    │
//! │ ViewReports      │         │    ✓    │    ✓    │
//! │ DeleteCatalog    │         │         │    ✓    │
//! │ ManageUsers      │         │         │    ✓    │
//! └──────────────────┴─────────┴─────────┴─────────┘
//! ```

use serde::Serialize;

use crate::types::Role;

/// A protected back-office operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    ViewCatalog,
    ViewSales,
    RecordSale,
    ManageCatalog,
    CancelSale,
    ViewReports,
    /// Removing products or categories that nothing references.
    DeleteCatalog,
    ManageUsers,
}

impl Role {
    /// Returns true when this role is allowed to perform `action`.
    pub fn can(&self, action: Action) -> bool {
        match action {
            Action::ViewCatalog | Action::ViewSales | Action::RecordSale => true,
            Action::ManageCatalog | Action::CancelSale | Action::ViewReports => {
                matches!(self, Role::Manager | Role::Admin)
            }
            Action::DeleteCatalog | Action::ManageUsers => matches!(self, Role::Admin),
        }
    }
}
