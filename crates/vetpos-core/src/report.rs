//! # Report Aggregation
//!
//! Pure folds over rows already loaded from the store. The db crate decides
//! which rows belong to a period; this module only adds them up. Sums
//! saturate at the `i64` bounds.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::money::Money;
use crate::types::{Client, Sale, SaleItem, Transaction, TransactionKind};

// =============================================================================
// Range
// =============================================================================

/// A half-open time window `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl ReportRange {
    /// The `days` calendar days ending today (inclusive), in UTC.
    pub fn last_days(days: i64, now: DateTime<Utc>) -> Self {
        let days = days.max(1);
        let tomorrow = now.date_naive() + Duration::days(1);
        let end = tomorrow.and_hms_opt(0, 0, 0).unwrap_or_default().and_utc();
        ReportRange {
            start: end - Duration::days(days),
            end,
        }
    }

    /// True when `at` falls inside the window.
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        at >= self.start && at < self.end
    }

    /// Every calendar day the window touches, oldest first.
    pub fn days(&self) -> Vec<NaiveDate> {
        let mut out = Vec::new();
        let mut day = self.start.date_naive();
        while day.and_hms_opt(0, 0, 0).unwrap_or_default().and_utc() < self.end {
            out.push(day);
            day += Duration::days(1);
        }
        out
    }
}

// =============================================================================
// Aggregates
// =============================================================================

/// Headline numbers for a set of sales.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SalesSummary {
    pub sale_count: i64,
    pub revenue: Money,
    pub collected: Money,
    pub outstanding: Money,
}

impl SalesSummary {
    /// Folds a slice of sales.
    pub fn from_sales(sales: &[Sale]) -> Self {
        sales.iter().fold(SalesSummary::default(), |mut acc, sale| {
            acc.sale_count += 1;
            acc.revenue = acc.revenue.saturating_add(sale.total());
            acc.collected = acc.collected.saturating_add(Money::from_cents(sale.amount_paid_cents));
            acc.outstanding = acc.outstanding.saturating_add(sale.unpaid());
            acc
        })
    }

    /// Revenue divided by sale count, zero when there are no sales.
    pub fn average_ticket(&self) -> Money {
        if self.sale_count == 0 {
            return Money::zero();
        }
        Money::from_cents(self.revenue.cents() / self.sale_count)
    }
}

/// Revenue for one calendar day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyTotal {
    pub day: NaiveDate,
    pub sale_count: i64,
    pub revenue: Money,
}

/// One bucket per day in `range`, zero-filled, oldest first.
/// Sales outside the range are ignored.
pub fn daily_revenue(sales: &[Sale], range: &ReportRange) -> Vec<DailyTotal> {
    let mut buckets: Vec<DailyTotal> = range
        .days()
        .into_iter()
        .map(|day| DailyTotal {
            day,
            sale_count: 0,
            revenue: Money::zero(),
        })
        .collect();

    let index: HashMap<NaiveDate, usize> = buckets
        .iter()
        .enumerate()
        .map(|(i, b)| (b.day, i))
        .collect();

    for sale in sales.iter().filter(|s| range.contains(s.date)) {
        if let Some(&i) = index.get(&sale.date.date_naive()) {
            buckets[i].sale_count += 1;
            buckets[i].revenue = buckets[i].revenue.saturating_add(sale.total());
        }
    }

    buckets
}

/// A product's contribution to sales.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductRank {
    pub product_id: String,
    pub name: String,
    pub quantity: i64,
    pub revenue: Money,
}

/// Best sellers by quantity, then revenue, then name.
///
/// `names` maps product ids to display names; ids missing from it (deleted
/// products) are shown by id.
pub fn top_products(items: &[SaleItem], names: &HashMap<String, String>, limit: usize) -> Vec<ProductRank> {
    let mut totals: HashMap<&str, (i64, Money)> = HashMap::new();
    for item in items {
        let entry = totals.entry(item.product_id.as_str()).or_insert((0, Money::zero()));
        entry.0 = entry.0.saturating_add(item.quantity);
        entry.1 = entry.1.saturating_add(item.line_total());
    }

    let mut ranks: Vec<ProductRank> = totals
        .into_iter()
        .map(|(id, (quantity, revenue))| ProductRank {
            product_id: id.to_string(),
            name: names.get(id).cloned().unwrap_or_else(|| id.to_string()),
            quantity,
            revenue,
        })
        .collect();

    ranks.sort_by(|a, b| {
        b.quantity
            .cmp(&a.quantity)
            .then(b.revenue.cmp(&a.revenue))
            .then_with(|| a.name.cmp(&b.name))
    });
    ranks.truncate(limit);
    ranks
}

/// Cash-book totals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CashFlow {
    pub income: Money,
    pub expense: Money,
}

impl CashFlow {
    pub fn from_transactions(transactions: &[Transaction]) -> Self {
        transactions.iter().fold(CashFlow::default(), |mut acc, tx| {
            match tx.kind {
                TransactionKind::Income => acc.income = acc.income.saturating_add(Money::from_cents(tx.amount_cents)),
                TransactionKind::Expense => acc.expense = acc.expense.saturating_add(Money::from_cents(tx.amount_cents)),
            }
            acc
        })
    }

    #[inline]
    pub fn net(&self) -> Money {
        self.income.saturating_sub(self.expense)
    }
}

/// Sum of what clients owe. Credit balances (negative debt) do not offset it.
pub fn outstanding_debt(clients: &[Client]) -> Money {
    clients
        .iter()
        .filter(|c| c.has_debt())
        .map(Client::debt)
        .sum()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PaymentMethod;
    use chrono::TimeZone;

    fn sale(day: u32, total: i64, paid: i64) -> Sale {
        Sale {
            id: crate::new_id(),
            client_id: None,
            date: Utc.with_ymd_and_hms(2026, 3, day, 15, 30, 0).unwrap(),
            total_cents: total,
            amount_paid_cents: paid,
            payment_method: PaymentMethod::Cash,
            notes: None,
        }
    }

    #[test]
    fn test_last_days_range() {
        let now = Utc.with_ymd_and_hms(2026, 3, 10, 18, 0, 0).unwrap();
        let range = ReportRange::last_days(7, now);
        assert_eq!(range.start, Utc.with_ymd_and_hms(2026, 3, 4, 0, 0, 0).unwrap());
        assert_eq!(range.end, Utc.with_ymd_and_hms(2026, 3, 11, 0, 0, 0).unwrap());
        assert_eq!(range.days().len(), 7);
        assert!(range.contains(now));
    }

    #[test]
    fn test_sales_summary() {
        let sales = vec![sale(1, 1000, 1000), sale(2, 3000, 1000)];
        let summary = SalesSummary::from_sales(&sales);
        assert_eq!(summary.sale_count, 2);
        assert_eq!(summary.revenue.cents(), 4000);
        assert_eq!(summary.collected.cents(), 2000);
        assert_eq!(summary.outstanding.cents(), 2000);
        assert_eq!(summary.average_ticket().cents(), 2000);
        assert!(SalesSummary::default().average_ticket().is_zero());
    }

    #[test]
    fn test_sums_saturate_instead_of_overflowing() {
        let sales = vec![sale(1, i64::MAX - 1, 0), sale(2, i64::MAX - 1, 0)];
        let summary = SalesSummary::from_sales(&sales);
        assert_eq!(summary.revenue.cents(), i64::MAX);
        assert_eq!(summary.outstanding.cents(), i64::MAX);

        let item = SaleItem {
            sale_id: "s".into(),
            product_id: "p".into(),
            quantity: i64::MAX,
            unit_price_cents: 3,
        };
        let ranks = top_products(&[item.clone(), item], &HashMap::new(), 5);
        assert_eq!(ranks[0].quantity, i64::MAX);
        assert_eq!(ranks[0].revenue.cents(), i64::MAX);
    }

    #[test]
    fn test_daily_revenue_is_zero_filled() {
        let now = Utc.with_ymd_and_hms(2026, 3, 5, 12, 0, 0).unwrap();
        let range = ReportRange::last_days(5, now);
        let sales = vec![sale(1, 500, 500), sale(3, 700, 700), sale(3, 300, 300), sale(20, 9999, 0)];

        let daily = daily_revenue(&sales, &range);
        assert_eq!(daily.len(), 5);
        assert_eq!(daily[0].revenue.cents(), 500);
        assert!(daily[1].revenue.is_zero());
        assert_eq!(daily[2].sale_count, 2);
        assert_eq!(daily[2].revenue.cents(), 1000);
    }

    #[test]
    fn test_top_products() {
        let item = |product: &str, qty: i64, price: i64| SaleItem {
            sale_id: "s".into(),
            product_id: product.into(),
            quantity: qty,
            unit_price_cents: price,
        };
        let items = vec![item("a", 2, 100), item("b", 5, 10), item("a", 1, 100), item("c", 3, 50)];
        let names: HashMap<String, String> = [("a".to_string(), "Alpha".to_string())].into();

        let top = top_products(&items, &names, 2);
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].product_id, "b");
        assert_eq!(top[1].name, "Alpha");
        assert_eq!(top[1].quantity, 3);
        assert_eq!(top[1].revenue.cents(), 300);
    }

    #[test]
    fn test_cash_flow_and_debt() {
        let now = Utc::now();
        let txs = vec![
            Transaction::new(TransactionKind::Income, Money::from_cents(900), "sale", None, now),
            Transaction::new(TransactionKind::Expense, Money::from_cents(400), "stock", None, now),
        ];
        let flow = CashFlow::from_transactions(&txs);
        assert_eq!(flow.net().cents(), 500);

        let mut owes = Client::new("Ana");
        owes.debt_cents = 1200;
        let mut credit = Client::new("Beto");
        credit.debt_cents = -300;
        assert_eq!(outstanding_debt(&[owes, credit]).cents(), 1200);
    }
}
