//! # Reports
//!
//! Loads the rows of a period and hands them to the pure aggregations in
//! `vetpos_core::report`.

use serde::Serialize;
use std::collections::HashMap;
use tracing::debug;

use vetpos_core::report::{
    daily_revenue, outstanding_debt, top_products, CashFlow, DailyTotal, ProductRank, ReportRange,
    SalesSummary,
};
use vetpos_core::{Money, Product};

use crate::error::DbResult;
use crate::pool::Database;

/// Everything the reports screen shows for one period.
#[derive(Debug, Clone, Serialize)]
pub struct ClinicReport {
    pub range: ReportRange,
    pub summary: SalesSummary,
    pub daily: Vec<DailyTotal>,
    pub top_products: Vec<ProductRank>,
    pub cash_flow: CashFlow,
    pub low_stock: Vec<Product>,
    /// Debt owed by all clients right now, independent of the period.
    pub outstanding_debt: Money,
}

#[derive(Debug, Clone)]
pub struct ReportService {
    db: Database,
}

impl ReportService {
    pub fn new(db: Database) -> Self {
        ReportService { db }
    }

    /// Builds the report for `range`, ranking at most `top_n` products.
    pub async fn build(&self, range: ReportRange, top_n: usize) -> DbResult<ClinicReport> {
        debug!(start = %range.start, end = %range.end, "Building report");

        let sales = self.db.sales().between(range.start, range.end).await?;
        let items = self.db.sales().items_between(range.start, range.end).await?;
        let transactions = self.db.transactions().between(range.start, range.end).await?;
        let catalog = self.db.products().list_all().await?;
        let low_stock = self.db.products().low_stock().await?;
        let clients = self.db.clients().with_debt().await?;

        let names: HashMap<String, String> = catalog
            .into_iter()
            .map(|p| (p.id, p.name))
            .collect();

        Ok(ClinicReport {
            summary: SalesSummary::from_sales(&sales),
            daily: daily_revenue(&sales, &range),
            top_products: top_products(&items, &names, top_n),
            cash_flow: CashFlow::from_transactions(&transactions),
            low_stock,
            outstanding_debt: outstanding_debt(&clients),
            range,
        })
    }
}
