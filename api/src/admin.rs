//! Admin endpoints: platform stats, users, transactions

use crate::client::HttpApiClient;
use crate::error::ApiError;
use crate::types::{
    Page, PlatformStats, Role, RoleUpdate, Transaction, TransactionQuery, UserDetails,
    UserDetailsResponse, UserQuery, UserRecord,
};
use reqwest::Method;

impl HttpApiClient {
    /// `GET /admin/stats`
    ///
    /// # Errors
    ///
    /// Returns error on transport failure or a non-2xx response
    #[tracing::instrument(skip(self))]
    pub async fn platform_stats(&self) -> Result<PlatformStats, ApiError> {
        let response = Self::send(self.request(Method::GET, "/admin/stats")).await?;
        Self::decode(response).await
    }

    /// `GET /admin/users`
    ///
    /// # Errors
    ///
    /// Returns error on transport failure or a non-2xx response
    #[tracing::instrument(skip(self))]
    pub async fn list_users(&self, query: &UserQuery) -> Result<Page<UserRecord>, ApiError> {
        let response = Self::send(
            self.request(Method::GET, "/admin/users")
                .query(&query.to_pairs()),
        )
        .await?;
        Self::decode(response).await
    }

    /// `GET /admin/users/{id}`
    ///
    /// # Errors
    ///
    /// Returns error on transport failure or a non-2xx response
    #[tracing::instrument(skip(self))]
    pub async fn user_details(&self, user_id: &str) -> Result<UserDetails, ApiError> {
        let response =
            Self::send(self.request(Method::GET, &format!("/admin/users/{user_id}"))).await?;
        let details: UserDetailsResponse = Self::decode(response).await?;
        Ok(details.into())
    }

    /// `PUT /admin/users/{id}/role`
    ///
    /// # Errors
    ///
    /// Returns error on transport failure or a non-2xx response
    #[tracing::instrument(skip(self))]
    pub async fn set_user_role(&self, user_id: &str, role: Role) -> Result<(), ApiError> {
        let response = Self::send(
            self.request(Method::PUT, &format!("/admin/users/{user_id}/role"))
                .json(&RoleUpdate { role }),
        )
        .await?;
        Self::expect_success(response).await?;
        tracing::info!(user_id, role = %role, "User role updated");
        Ok(())
    }

    /// `GET /admin/transactions`
    ///
    /// # Errors
    ///
    /// Returns error on transport failure or a non-2xx response
    #[tracing::instrument(skip(self))]
    pub async fn list_transactions(
        &self,
        query: &TransactionQuery,
    ) -> Result<Page<Transaction>, ApiError> {
        let response = Self::send(
            self.request(Method::GET, "/admin/transactions")
                .query(&query.to_pairs()),
        )
        .await?;
        Self::decode(response).await
    }
}
