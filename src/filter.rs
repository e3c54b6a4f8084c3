use crate::schema::{FilteredMovement, Movement, ReportRequest};

/// Restricts the normalized movements to the request's inclusive date
/// window and exact owner, dropping the owner and receipt columns.
///
/// The two predicates form a pure intersection, so their order is
/// irrelevant. No matching rows is a value, not an error; downstream
/// aggregation treats the empty set as vacuous.
pub fn filter_movements(movements: &[Movement], request: &ReportRequest) -> Vec<FilteredMovement> {
    movements
        .iter()
        .filter(|m| m.date >= request.start_date && m.date <= request.end_date)
        .filter(|m| m.owner == request.owner)
        .map(FilteredMovement::from)
        .collect()
}
