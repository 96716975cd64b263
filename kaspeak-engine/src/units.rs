/// Base indivisible units per whole KAS.
pub const SOMPI_PER_KAS: u64 = 100_000_000;

/// Whole-unit view of a sompi amount.
pub fn sompi_to_kas(sompi: u64) -> f64 {
    sompi as f64 / SOMPI_PER_KAS as f64
}

/// Sompi amount of a whole-unit fee, rounded to the nearest base unit.
///
/// The input must be non-negative and finite; callers validate before
/// converting.
pub fn kas_to_sompi(kas: f64) -> u64 {
    (kas * SOMPI_PER_KAS as f64).round() as u64
}
