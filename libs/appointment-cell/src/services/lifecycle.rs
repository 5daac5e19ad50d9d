// libs/appointment-cell/src/services/lifecycle.rs
use crate::models::{AppointmentStatus, BookingError};

/// Guards appointment status changes. The only legal moves are
/// `Pending -> Completed` and `Pending -> Cancelled`; both end states are
/// final, so "cancelled and completed" can never be recorded.
pub struct AppointmentLifecycleService;

impl AppointmentLifecycleService {
    pub fn new() -> Self {
        Self
    }

    pub fn validate_transition(
        &self,
        from: &AppointmentStatus,
        to: &AppointmentStatus,
    ) -> Result<(), BookingError> {
        match (from, to) {
            (AppointmentStatus::Pending, AppointmentStatus::Completed)
            | (AppointmentStatus::Pending, AppointmentStatus::Cancelled) => Ok(()),
            _ => Err(BookingError::InvalidTransition { from: *from }),
        }
    }
}

impl Default for AppointmentLifecycleService {
    fn default() -> Self {
        Self::new()
    }
}
