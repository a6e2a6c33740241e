//! Guest list aggregates shown on the admin surface.
use super::guest::Guest;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, Copy, PartialEq, Eq, Default)]
pub struct GuestStats {
    pub total_guests: usize,
    pub total_plus_ones: usize,
    pub expected_attendees: u32,
    pub single_guests: usize,
}

impl GuestStats {
    pub fn from_guests(guests: &[Guest]) -> Self {
        let total_guests = guests.len();
        let total_plus_ones = guests.iter().filter(|guest| guest.plus_one).count();
        let expected_attendees = guests.iter().map(Guest::expected_party_size).sum();
        Self {
            total_guests,
            total_plus_ones,
            expected_attendees,
            single_guests: total_guests - total_plus_ones,
        }
    }
}
