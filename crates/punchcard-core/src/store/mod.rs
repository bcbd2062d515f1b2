//! The attendance store: the engine's single source of durable truth.
//!
//! Every transition is remote-confirmed against an [`AttendanceStore`]
//! before any local state changes, and the canonical record fetched from it
//! overrides whatever the engine believed locally.

pub mod http;
pub mod memory;
pub mod types;


use std::future::Future;

use crate::error::StoreError;

pub use http::HttpAttendanceStore;
pub use memory::InMemoryStore;
pub use types::{AttendanceRecord, ManualClockOut};

/// Commands and queries the engine issues against the store.
///
/// Methods return `impl Future + Send` so engine futures stay spawnable.
pub trait AttendanceStore: Send + Sync {
    /// Open a session for the day.
    fn clock_in(&self) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Complete the current session.
    fn clock_out(&self) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Open a break interval.
    fn take_break(&self) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Close the open break interval.
    fn resume_work(&self) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Fetch the canonical record for the current day, if any.
    fn fetch_attendance(
        &self,
    ) -> impl Future<Output = Result<Option<AttendanceRecord>, StoreError>> + Send;

    /// Submit a manual clock-out correction for a stale open session.
    fn manual_clock_out(
        &self,
        correction: &ManualClockOut,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;
}

impl<T: AttendanceStore> AttendanceStore for std::sync::Arc<T> {
    async fn clock_in(&self) -> Result<(), StoreError> {
        (**self).clock_in().await
    }

    async fn clock_out(&self) -> Result<(), StoreError> {
        (**self).clock_out().await
    }

    async fn take_break(&self) -> Result<(), StoreError> {
        (**self).take_break().await
    }

    async fn resume_work(&self) -> Result<(), StoreError> {
        (**self).resume_work().await
    }

    async fn fetch_attendance(&self) -> Result<Option<AttendanceRecord>, StoreError> {
        (**self).fetch_attendance().await
    }

    async fn manual_clock_out(&self, correction: &ManualClockOut) -> Result<(), StoreError> {
        (**self).manual_clock_out(correction).await
    }
}
