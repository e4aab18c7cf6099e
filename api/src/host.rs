//! Host endpoints: event list, check-in and attendee stats

use crate::client::{HttpApiClient, error_from_body};
use crate::error::ApiError;
use crate::types::{AttendeeStats, CheckinRequest, CheckinResponse, EventAttendees, EventSummary};
use reqwest::{Method, StatusCode};
use std::future::Future;
use std::pin::Pin;

/// Result type for host API calls
pub type ApiResult<T> = Result<T, ApiError>;

/// Host-side API used by the check-in workflow
///
/// Futures are `'static` so the workflow can move them into effects.
pub trait HostApi: Send + Sync {
    /// List the events owned by the signed-in host
    ///
    /// # Errors
    ///
    /// Returns error on transport failure or a non-2xx response
    fn list_events(&self) -> Pin<Box<dyn Future<Output = ApiResult<Vec<EventSummary>>> + Send>>;

    /// Check a ticket in for an event
    ///
    /// Server-reported rejections (e.g. "Ticket already used") come back as
    /// `Ok` with `success == false`.
    ///
    /// # Errors
    ///
    /// Returns error on transport failure or an undecodable response
    fn checkin(
        &self,
        qr_code: String,
        event_id: String,
    ) -> Pin<Box<dyn Future<Output = ApiResult<CheckinResponse>> + Send>>;

    /// Load attendee counters for one event
    ///
    /// # Errors
    ///
    /// Returns error on transport failure or a non-2xx response
    fn event_stats(
        &self,
        event_id: String,
    ) -> Pin<Box<dyn Future<Output = ApiResult<AttendeeStats>> + Send>>;
}

impl HttpApiClient {
    /// `GET /hosts/me/events`
    ///
    /// # Errors
    ///
    /// Returns error on transport failure or a non-2xx response
    #[tracing::instrument(skip(self))]
    pub async fn fetch_events(&self) -> ApiResult<Vec<EventSummary>> {
        let response = Self::send(self.request(Method::GET, "/hosts/me/events")).await?;
        Self::decode(response).await
    }

    /// `POST /hosts/me/attendees/checkin`
    ///
    /// Exactly one attempt; no retry.
    ///
    /// # Errors
    ///
    /// Returns error on transport failure, or when a non-2xx body is not a
    /// check-in result
    #[tracing::instrument(skip(self, request), fields(event_id = %request.event_id))]
    pub async fn post_checkin(&self, request: CheckinRequest) -> ApiResult<CheckinResponse> {
        let response = Self::send(
            self.request(Method::POST, "/hosts/me/attendees/checkin")
                .json(&request),
        )
        .await?;

        let status = response.status();
        if status.is_success() {
            return Self::decode(response).await;
        }
        if status == StatusCode::UNAUTHORIZED {
            return Err(ApiError::Unauthorized);
        }

        let body = response.text().await.unwrap_or_default();
        match serde_json::from_str::<CheckinResponse>(&body) {
            Ok(result) => {
                tracing::debug!(status = status.as_u16(), "Check-in rejected by server");
                Ok(result)
            },
            Err(_) => Err(error_from_body(status, &body, None)),
        }
    }

    /// `GET /hosts/me/events/{id}/attendees`
    ///
    /// # Errors
    ///
    /// Returns error on transport failure or a non-2xx response
    #[tracing::instrument(skip(self))]
    pub async fn fetch_event_stats(&self, event_id: &str) -> ApiResult<AttendeeStats> {
        let response = Self::send(
            self.request(Method::GET, &format!("/hosts/me/events/{event_id}/attendees")),
        )
        .await?;
        let attendees: EventAttendees = Self::decode(response).await?;
        Ok(attendees.stats)
    }
}

impl HostApi for HttpApiClient {
    fn list_events(&self) -> Pin<Box<dyn Future<Output = ApiResult<Vec<EventSummary>>> + Send>> {
        let client = self.clone();
        Box::pin(async move { client.fetch_events().await })
    }

    fn checkin(
        &self,
        qr_code: String,
        event_id: String,
    ) -> Pin<Box<dyn Future<Output = ApiResult<CheckinResponse>> + Send>> {
        let client = self.clone();
        Box::pin(async move { client.post_checkin(CheckinRequest { qr_code, event_id }).await })
    }

    fn event_stats(
        &self,
        event_id: String,
    ) -> Pin<Box<dyn Future<Output = ApiResult<AttendeeStats>> + Send>> {
        let client = self.clone();
        Box::pin(async move { client.fetch_event_stats(&event_id).await })
    }
}
