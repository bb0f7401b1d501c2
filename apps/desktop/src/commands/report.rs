//! # Report Commands
//!
//! Period reports and the cash book. Amounts go out in cents; the screen
//! formats them with the configured currency symbol.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use tracing::debug;

use crate::error::ApiError;
use crate::state::{AppConfig, DbState};
use vetpos_core::{report::ReportRange, Transaction, TransactionKind};
use vetpos_db::ClinicReport;

use super::product::ProductDto;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyTotalDto {
    pub day: NaiveDate,
    pub sale_count: i64,
    pub revenue_cents: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TopProductDto {
    pub product_id: String,
    pub name: String,
    pub quantity: i64,
    pub revenue_cents: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportDto {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub sale_count: i64,
    pub revenue_cents: i64,
    pub collected_cents: i64,
    pub outstanding_cents: i64,
    pub average_ticket_cents: i64,
    pub daily: Vec<DailyTotalDto>,
    pub top_products: Vec<TopProductDto>,
    pub income_cents: i64,
    pub expense_cents: i64,
    pub net_cents: i64,
    pub low_stock: Vec<ProductDto>,
    /// All clients, not just this period
    pub total_debt_cents: i64,
}

impl From<ClinicReport> for ReportDto {
    fn from(r: ClinicReport) -> Self {
        ReportDto {
            start: r.range.start,
            end: r.range.end,
            sale_count: r.summary.sale_count,
            revenue_cents: r.summary.revenue.cents(),
            collected_cents: r.summary.collected.cents(),
            outstanding_cents: r.summary.outstanding.cents(),
            average_ticket_cents: r.summary.average_ticket().cents(),
            daily: r
                .daily
                .into_iter()
                .map(|d| DailyTotalDto {
                    day: d.day,
                    sale_count: d.sale_count,
                    revenue_cents: d.revenue.cents(),
                })
                .collect(),
            top_products: r
                .top_products
                .into_iter()
                .map(|p| TopProductDto {
                    product_id: p.product_id,
                    name: p.name,
                    quantity: p.quantity,
                    revenue_cents: p.revenue.cents(),
                })
                .collect(),
            income_cents: r.cash_flow.income.cents(),
            expense_cents: r.cash_flow.expense.cents(),
            net_cents: r.cash_flow.net().cents(),
            low_stock: r.low_stock.into_iter().map(ProductDto::from).collect(),
            total_debt_cents: r.outstanding_debt.cents(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionDto {
    pub id: String,
    pub date: DateTime<Utc>,
    pub kind: TransactionKind,
    pub amount_cents: i64,
    /// Positive for income, negative for expense
    pub signed_cents: i64,
    pub description: String,
    pub reference_id: Option<String>,
}

impl From<Transaction> for TransactionDto {
    fn from(t: Transaction) -> Self {
        let signed_cents = t.signed_amount().cents();
        TransactionDto {
            id: t.id,
            date: t.date,
            kind: t.kind,
            amount_cents: t.amount_cents,
            signed_cents,
            description: t.description,
            reference_id: t.reference_id,
        }
    }
}

/// Builds the report for `range`, listing the configured number of best
/// sellers.
pub async fn get_report(db: &DbState, config: &AppConfig, range: ReportRange) -> Result<ReportDto, ApiError> {
    debug!(start = %range.start, end = %range.end, "get_report command");
    let report = db.inner().reports().build(range, config.top_products).await?;
    Ok(ReportDto::from(report))
}

/// The last `days` days, or the configured default window.
pub async fn recent_report(db: &DbState, config: &AppConfig, days: Option<i64>) -> Result<ReportDto, ApiError> {
    let days = days.unwrap_or(config.report_days);
    if days < 1 {
        return Err(ApiError::validation("Report window must be at least one day"));
    }
    get_report(db, config, ReportRange::last_days(days, vetpos_core::now())).await
}

pub async fn cash_book(db: &DbState, range: ReportRange) -> Result<Vec<TransactionDto>, ApiError> {
    debug!(start = %range.start, end = %range.end, "cash_book command");
    let entries = db.inner().transactions().between(range.start, range.end).await?;
    Ok(entries.into_iter().map(TransactionDto::from).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use vetpos_db::{Database, DbConfig};

    #[tokio::test]
    async fn test_recent_report_on_seeded_store() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        vetpos_db::seed_demo(&db, 6).await.unwrap();
        let db = DbState::new(db);
        let config = AppConfig {
            top_products: 3,
            ..AppConfig::default()
        };

        let report = recent_report(&db, &config, Some(7)).await.unwrap();
        assert_eq!(report.sale_count, 6);
        assert_eq!(report.daily.len(), 7);
        assert!(report.top_products.len() <= 3);
        assert_eq!(
            report.revenue_cents,
            report.collected_cents + report.outstanding_cents
        );

        let book = cash_book(&db, ReportRange::last_days(7, vetpos_core::now())).await.unwrap();
        let net: i64 = book.iter().map(|t| t.signed_cents).sum();
        assert_eq!(net, report.net_cents);

        let err = recent_report(&db, &config, Some(0)).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);
    }
}
