//! Admin-side guest search.
use super::guest::Guest;

/// Case-insensitive substring match against name and email.
///
/// A blank or whitespace-only term matches every guest. Order is preserved.
pub fn filter_guests<'a>(guests: &'a [Guest], term: &str) -> Vec<&'a Guest> {
    let term = term.trim();
    if term.is_empty() {
        return guests.iter().collect();
    }
    let needle = term.to_lowercase();
    guests
        .iter()
        .filter(|guest| {
            guest.name.to_lowercase().contains(&needle)
                || guest
                    .email
                    .as_deref()
                    .is_some_and(|email| email.to_lowercase().contains(&needle))
        })
        .collect()
}
