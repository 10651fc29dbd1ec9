//! CRUD trait shared by the table-backed repositories.

use crate::db::errors::Result;
use std::collections::HashMap;

/// Create, read, list, update and delete over one table.
///
/// Implemented by repositories whose rows are managed as a whole (accounts, coupons). Request and
/// response types are the matching structs in [`crate::db::models`].
#[async_trait::async_trait]
pub trait Repository {
    type CreateRequest;
    type UpdateRequest;
    type Response;
    type Id: Send + Sync;
    /// Pagination or selection applied by [`Repository::list`]
    type Filter: Send + Sync;

    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response>;

    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>>;

    /// Fetch several rows at once, keyed by id. Missing ids are left out.
    async fn get_bulk(&mut self, ids: Vec<Self::Id>) -> Result<HashMap<Self::Id, Self::Response>>;

    async fn list(&mut self, filter: &Self::Filter) -> Result<Vec<Self::Response>>;

    /// Returns whether a row was deleted
    async fn delete(&mut self, id: Self::Id) -> Result<bool>;

    /// Returns [`crate::db::errors::DbError::NotFound`] when no row has the id
    async fn update(&mut self, id: Self::Id, request: &Self::UpdateRequest) -> Result<Self::Response>;
}
