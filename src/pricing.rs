//! Pure derivation functions for tender line pricing columns. The derived
//! values are recomputed on every write and stored alongside the inputs.

pub const COMPETITIVENESS_HIGH: &str = "high";
pub const COMPETITIVENESS_MEDIUM: &str = "medium";
pub const COMPETITIVENESS_LOW: &str = "low";

pub fn total_price(quantity: f64, unit_price: f64) -> f64 {
    quantity * unit_price
}

/// Percent deviation of the offered unit price from the external estimate.
/// Zero when no usable estimate exists.
pub fn price_variance(unit_price: f64, estimated_price: Option<f64>) -> f64 {
    match estimated_price {
        Some(estimated) if estimated > 0.0 => (unit_price - estimated) / estimated * 100.0,
        _ => 0.0,
    }
}

/// Three-bucket classification of the external competitiveness rank
/// (#tenders / #offers for the UNSPSC code). A missing rank is neutral.
pub fn competitiveness(rank: Option<f64>) -> &'static str {
    match rank {
        Some(rank) if rank < 0.3 => COMPETITIVENESS_HIGH,
        Some(rank) if rank < 0.7 => COMPETITIVENESS_MEDIUM,
        Some(_) => COMPETITIVENESS_LOW,
        None => COMPETITIVENESS_MEDIUM,
    }
}
