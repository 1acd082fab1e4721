//! # Movement Query & Aggregation
//!
//! Pure read-side over a point-in-time snapshot of the movement collection.
//! The whole collection is assumed to fit in memory - fine at small-business
//! scale; pushing filters into the store is a deliberate non-goal.
//!
//! The snapshot may be stale relative to in-flight writes (eventual
//! consistency on the dashboard path); strong consistency is only required
//! on the write path.

use serde::{Deserialize, Serialize};

use crate::money::Money;
use crate::types::{MovementType, StockMovement};

// =============================================================================
// Filtering
// =============================================================================

/// Derived payment status of a sale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    /// Paid: `is_paid` absent or `true`.
    Paid,
    /// Pending ("fiado"): `is_paid` explicitly `false`.
    Pending,
}

/// Predicate conjunction over the movement collection.
///
/// The payment-status filter only discriminates `out` movements; purchases
/// pass it untouched (mirrors how the movement list screen behaves).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MovementFilter {
    pub movement_type: Option<MovementType>,
    pub product_id: Option<String>,
    pub customer_id: Option<String>,
    pub payment_status: Option<PaymentStatus>,
}

impl MovementFilter {
    pub fn matches(&self, movement: &StockMovement) -> bool {
        if let Some(movement_type) = self.movement_type {
            if movement.movement_type != movement_type {
                return false;
            }
        }
        if let Some(product_id) = &self.product_id {
            if &movement.product_id != product_id {
                return false;
            }
        }
        if let Some(customer_id) = &self.customer_id {
            if movement.customer_id.as_ref() != Some(customer_id) {
                return false;
            }
        }
        if let Some(status) = self.payment_status {
            if movement.is_sale() {
                match status {
                    PaymentStatus::Paid if movement.is_pending() => return false,
                    PaymentStatus::Pending if !movement.is_pending() => return false,
                    _ => {}
                }
            }
        }
        true
    }
}

/// Applies `filter` and sorts by date descending (newest first).
pub fn filter_and_sort<'a>(
    movements: &'a [StockMovement],
    filter: &MovementFilter,
) -> Vec<&'a StockMovement> {
    let mut selected: Vec<&StockMovement> =
        movements.iter().filter(|m| filter.matches(m)).collect();
    selected.sort_by(|a, b| b.date.cmp(&a.date));
    selected
}

// =============================================================================
// Pagination
// =============================================================================

/// One page of results. Page indexes are 1-based.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: usize,
    pub total_pages: usize,
    pub total_items: usize,
}

/// Slices `items` into the requested 1-based page of `page_size` entries.
///
/// `total_pages = ceil(len / page_size)`; out-of-range pages (including
/// page 0) yield an empty item list with the totals intact.
pub fn paginate<T: Clone>(items: &[T], page: usize, page_size: usize) -> Page<T> {
    let total_items = items.len();
    let total_pages = if page_size == 0 {
        0
    } else {
        total_items.div_ceil(page_size)
    };

    let items = if page == 0 || page_size == 0 || page > total_pages {
        Vec::new()
    } else {
        let start = (page - 1) * page_size;
        let end = (start + page_size).min(total_items);
        items[start..end].to_vec()
    };

    Page {
        items,
        page,
        total_pages,
        total_items,
    }
}

// =============================================================================
// Sales Series
// =============================================================================

/// Sales total for one calendar day, split paid vs pending.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailySales {
    /// Day of month, 1-based.
    pub day: u32,
    pub paid: Money,
    pub pending: Money,
}

/// Sales total for one calendar month.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlySales {
    /// Month, 1-based (1 = January).
    pub month: u32,
    pub total: Money,
}

fn is_leap_year(year: i32) -> bool {
    year % 4 == 0 && (year % 100 != 0 || year % 400 == 0)
}

fn days_in_month(year: i32, month: u32) -> u32 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 if is_leap_year(year) => 29,
        2 => 28,
        _ => 0,
    }
}

/// Daily sales series for one calendar month: one bucket per day, every day
/// of the month present even when empty (charts want a dense x-axis).
///
/// Only `out` movements count; each day splits into paid vs pending.
pub fn daily_sales(movements: &[StockMovement], year: i32, month: u32) -> Vec<DailySales> {
    use chrono::Datelike;

    let mut series: Vec<DailySales> = (1..=days_in_month(year, month))
        .map(|day| DailySales {
            day,
            paid: Money::zero(),
            pending: Money::zero(),
        })
        .collect();

    for movement in movements.iter().filter(|m| m.is_sale()) {
        let date = movement.date.date_naive();
        if date.year() != year || date.month() != month {
            continue;
        }
        if let Some(bucket) = series.get_mut(date.day() as usize - 1) {
            if movement.is_pending() {
                bucket.pending += movement.total_value();
            } else {
                bucket.paid += movement.total_value();
            }
        }
    }

    series
}

/// Monthly sales series for one calendar year: always 12 buckets.
pub fn monthly_sales(movements: &[StockMovement], year: i32) -> Vec<MonthlySales> {
    use chrono::Datelike;

    let mut series: Vec<MonthlySales> = (1..=12)
        .map(|month| MonthlySales {
            month,
            total: Money::zero(),
        })
        .collect();

    for movement in movements.iter().filter(|m| m.is_sale()) {
        let date = movement.date.date_naive();
        if date.year() != year {
            continue;
        }
        if let Some(bucket) = series.get_mut(date.month() as usize - 1) {
            bucket.total += movement.total_value();
        }
    }

    series
}

// =============================================================================
// Outstanding Balance
// =============================================================================

/// Total value of unpaid sales for one customer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutstandingBalance {
    pub customer_id: String,
    pub total: Money,
}

/// Groups pending (`is_paid == false`) sales by customer, sums their totals,
/// sorts descending and keeps the top `top_n` (the dashboard shows 5).
pub fn outstanding_by_customer(movements: &[StockMovement], top_n: usize) -> Vec<OutstandingBalance> {
    let mut totals: Vec<OutstandingBalance> = Vec::new();

    for movement in movements.iter().filter(|m| m.is_pending()) {
        let Some(customer_id) = &movement.customer_id else {
            continue;
        };
        match totals.iter_mut().find(|b| &b.customer_id == customer_id) {
            Some(bucket) => bucket.total += movement.total_value(),
            None => totals.push(OutstandingBalance {
                customer_id: customer_id.clone(),
                total: movement.total_value(),
            }),
        }
    }

    totals.sort_by(|a, b| b.total.cmp(&a.total));
    totals.truncate(top_n);
    totals
}

// =============================================================================
// Unit Tests
// =============================================================================
