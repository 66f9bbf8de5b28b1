/// Multiplier applied to the sourced cost to get the selling price.
pub const MARKUP: f64 = 1.40;

/// Selling price for a sourced cost. A missing cost stays missing.
pub fn selling_price(cost: Option<f64>) -> Option<f64> {
    cost.map(|cost| cost * MARKUP)
}
