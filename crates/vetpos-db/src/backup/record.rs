//! # Backup Records
//!
//! One variant per table row. Encoding, decoding, loading and upserting
//! all `match` on the variant, so a table can't be half supported.
//!
//! ```text
//!   export:  Database ──load──► BackupRecord ──to_row──► Vec<String>
//!   import:  RawTable ──parse─► BackupRecord ──upsert──► &mut tx
//! ```

use csv::StringRecord;
use sqlx::{Executor, Sqlite};
use std::fmt::Display;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use vetpos_core::{
    Appointment, Client, Payment, Pet, Product, RestockItem, RestockOrder, Sale, SaleItem,
    Supplier, Transaction, Treatment,
};

use super::archive::RawTable;
use super::codec::{
    format_bool, format_date, format_money, format_opt, format_opt_date, parse_bool, parse_date,
    parse_int, parse_money, parse_opt,
};
use super::error::{BackupError, BackupResult};
use crate::error::DbResult;
use crate::pool::Database;
use crate::repository::{
    appointment, client, payment, pet, product, restock, sale, supplier, transaction, treatment,
};
use crate::table::Table;

/// A row of any table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackupRecord {
    Client(Client),
    Pet(Pet),
    Product(Product),
    Sale(Sale),
    SaleItem(SaleItem),
    Payment(Payment),
    Treatment(Treatment),
    Appointment(Appointment),
    Supplier(Supplier),
    RestockOrder(RestockOrder),
    RestockItem(RestockItem),
    Transaction(Transaction),
}

impl BackupRecord {
    pub fn table(&self) -> Table {
        match self {
            BackupRecord::Client(_) => Table::Clients,
            BackupRecord::Pet(_) => Table::Pets,
            BackupRecord::Product(_) => Table::Products,
            BackupRecord::Sale(_) => Table::Sales,
            BackupRecord::SaleItem(_) => Table::SaleItems,
            BackupRecord::Payment(_) => Table::Payments,
            BackupRecord::Treatment(_) => Table::Treatments,
            BackupRecord::Appointment(_) => Table::Appointments,
            BackupRecord::Supplier(_) => Table::Suppliers,
            BackupRecord::RestockOrder(_) => Table::RestockOrders,
            BackupRecord::RestockItem(_) => Table::RestockItems,
            BackupRecord::Transaction(_) => Table::Transactions,
        }
    }

    /// Encodes the row in the column order of [`Table::header`].
    pub fn to_row(&self) -> Vec<String> {
        match self {
            BackupRecord::Client(c) => vec![
                c.id.clone(),
                c.name.clone(),
                format_opt(&c.phone),
                format_opt(&c.email),
                format_opt(&c.address),
                format_money(c.debt_cents),
                format_date(c.created_at),
            ],
            BackupRecord::Pet(p) => vec![
                p.id.clone(),
                p.name.clone(),
                p.species.clone(),
                format_opt(&p.breed),
                format_opt_date(p.birth_date),
                p.weight_grams.map(|w| w.to_string()).unwrap_or_default(),
                p.owner_id.clone(),
                format_opt(&p.notes),
                format_date(p.created_at),
            ],
            BackupRecord::Product(p) => vec![
                p.id.clone(),
                p.name.clone(),
                p.category.clone(),
                format_money(p.price_cents),
                format_money(p.cost_cents),
                p.stock.to_string(),
                p.min_stock.to_string(),
                format_bool(p.is_service),
                format_date(p.created_at),
            ],
            BackupRecord::Sale(s) => vec![
                s.id.clone(),
                format_opt(&s.client_id),
                format_date(s.date),
                format_money(s.total_cents),
                format_money(s.amount_paid_cents),
                s.payment_method.to_string(),
                format_opt(&s.notes),
            ],
            BackupRecord::SaleItem(i) => vec![
                i.sale_id.clone(),
                i.product_id.clone(),
                i.quantity.to_string(),
                format_money(i.unit_price_cents),
            ],
            BackupRecord::Payment(p) => vec![
                p.id.clone(),
                p.client_id.clone(),
                format_date(p.date),
                format_money(p.amount_cents),
                p.method.to_string(),
                format_opt(&p.notes),
            ],
            BackupRecord::Treatment(t) => vec![
                t.id.clone(),
                t.pet_id.clone(),
                format_opt(&t.product_id),
                format_date(t.date),
                t.description.clone(),
                format_opt(&t.diagnosis),
                format_money(t.cost_cents),
                format_opt_date(t.next_visit),
            ],
            BackupRecord::Appointment(a) => vec![
                a.id.clone(),
                a.client_id.clone(),
                a.pet_id.clone(),
                format_date(a.date),
                a.reason.clone(),
                a.status.to_string(),
            ],
            BackupRecord::Supplier(s) => vec![
                s.id.clone(),
                s.name.clone(),
                format_opt(&s.contact_name),
                format_opt(&s.phone),
                format_opt(&s.email),
                format_money(s.balance_cents),
                format_date(s.created_at),
            ],
            BackupRecord::RestockOrder(o) => vec![
                o.id.clone(),
                o.supplier_id.clone(),
                format_date(o.date),
                format_money(o.total_cents),
                format_bool(o.is_paid),
                format_opt(&o.notes),
            ],
            BackupRecord::RestockItem(i) => vec![
                i.order_id.clone(),
                i.product_id.clone(),
                i.quantity.to_string(),
                format_money(i.unit_cost_cents),
            ],
            BackupRecord::Transaction(t) => vec![
                t.id.clone(),
                format_date(t.date),
                t.kind.to_string(),
                format_money(t.amount_cents),
                t.description.clone(),
                format_opt(&t.reference_id),
            ],
        }
    }

    /// Decodes one data row of `table`.
    pub(crate) fn parse(table: Table, row: &Row<'_>) -> BackupResult<Self> {
        Ok(match table {
            Table::Clients => BackupRecord::Client(Client {
                id: row.id("id")?,
                name: row.text("name")?,
                phone: row.opt("phone")?,
                email: row.opt("email")?,
                address: row.opt("address")?,
                debt_cents: row.money("debt")?,
                created_at: row.date("created_at")?,
            }),
            Table::Pets => BackupRecord::Pet(Pet {
                id: row.id("id")?,
                name: row.text("name")?,
                species: row.text("species")?,
                breed: row.opt("breed")?,
                birth_date: row.opt_date("birth_date")?,
                weight_grams: row.opt_int("weight_grams")?,
                owner_id: row.id("owner_id")?,
                notes: row.opt("notes")?,
                created_at: row.date("created_at")?,
            }),
            Table::Products => BackupRecord::Product(Product {
                id: row.id("id")?,
                name: row.text("name")?,
                category: row.text("category")?,
                price_cents: row.money("price")?,
                cost_cents: row.money("cost")?,
                stock: row.int("stock")?,
                min_stock: row.int("min_stock")?,
                is_service: row.boolean("is_service")?,
                created_at: row.date("created_at")?,
            }),
            Table::Sales => BackupRecord::Sale(Sale {
                id: row.id("id")?,
                client_id: row.opt_id("client_id")?,
                date: row.date("date")?,
                total_cents: row.money("total")?,
                amount_paid_cents: row.money("amount_paid")?,
                payment_method: row.token("payment_method")?,
                notes: row.opt("notes")?,
            }),
            Table::SaleItems => BackupRecord::SaleItem(SaleItem {
                sale_id: row.id("sale_id")?,
                product_id: row.id("product_id")?,
                quantity: row.int("quantity")?,
                unit_price_cents: row.money("unit_price")?,
            }),
            Table::Payments => BackupRecord::Payment(Payment {
                id: row.id("id")?,
                client_id: row.id("client_id")?,
                date: row.date("date")?,
                amount_cents: row.money("amount")?,
                method: row.token("method")?,
                notes: row.opt("notes")?,
            }),
            Table::Treatments => BackupRecord::Treatment(Treatment {
                id: row.id("id")?,
                pet_id: row.id("pet_id")?,
                product_id: row.opt_id("product_id")?,
                date: row.date("date")?,
                description: row.text("description")?,
                diagnosis: row.opt("diagnosis")?,
                cost_cents: row.money("cost")?,
                next_visit: row.opt_date("next_visit")?,
            }),
            Table::Appointments => BackupRecord::Appointment(Appointment {
                id: row.id("id")?,
                client_id: row.id("client_id")?,
                pet_id: row.id("pet_id")?,
                date: row.date("date")?,
                reason: row.text("reason")?,
                status: row.token("status")?,
            }),
            Table::Suppliers => BackupRecord::Supplier(Supplier {
                id: row.id("id")?,
                name: row.text("name")?,
                contact_name: row.opt("contact_name")?,
                phone: row.opt("phone")?,
                email: row.opt("email")?,
                balance_cents: row.money("balance")?,
                created_at: row.date("created_at")?,
            }),
            Table::RestockOrders => BackupRecord::RestockOrder(RestockOrder {
                id: row.id("id")?,
                supplier_id: row.id("supplier_id")?,
                date: row.date("date")?,
                total_cents: row.money("total")?,
                is_paid: row.boolean("is_paid")?,
                notes: row.opt("notes")?,
            }),
            Table::RestockItems => BackupRecord::RestockItem(RestockItem {
                order_id: row.id("order_id")?,
                product_id: row.id("product_id")?,
                quantity: row.int("quantity")?,
                unit_cost_cents: row.money("unit_cost")?,
            }),
            Table::Transactions => BackupRecord::Transaction(Transaction {
                id: row.id("id")?,
                date: row.date("date")?,
                kind: row.token("kind")?,
                amount_cents: row.money("amount")?,
                description: row.text("description")?,
                reference_id: row.opt_id("reference_id")?,
            }),
        })
    }

    /// Inserts the row or overwrites the one with the same identity.
    pub(crate) async fn upsert<'e, E>(&self, executor: E) -> DbResult<()>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        match self {
            BackupRecord::Client(r) => client::upsert_in(executor, r).await,
            BackupRecord::Pet(r) => pet::upsert_in(executor, r).await,
            BackupRecord::Product(r) => product::upsert_in(executor, r).await,
            BackupRecord::Sale(r) => sale::upsert_in(executor, r).await,
            BackupRecord::SaleItem(r) => sale::upsert_item_in(executor, r).await,
            BackupRecord::Payment(r) => payment::upsert_in(executor, r).await,
            BackupRecord::Treatment(r) => treatment::upsert_in(executor, r).await,
            BackupRecord::Appointment(r) => appointment::upsert_in(executor, r).await,
            BackupRecord::Supplier(r) => supplier::upsert_in(executor, r).await,
            BackupRecord::RestockOrder(r) => restock::upsert_in(executor, r).await,
            BackupRecord::RestockItem(r) => restock::upsert_item_in(executor, r).await,
            BackupRecord::Transaction(r) => transaction::upsert_in(executor, r).await,
        }
    }

    /// Reads every row of `table`.
    pub(crate) async fn load(db: &Database, table: Table) -> DbResult<Vec<BackupRecord>> {
        Ok(match table {
            Table::Clients => wrap(db.clients().list_all().await?, BackupRecord::Client),
            Table::Pets => wrap(db.pets().list_all().await?, BackupRecord::Pet),
            Table::Products => wrap(db.products().list_all().await?, BackupRecord::Product),
            Table::Sales => wrap(db.sales().list_all().await?, BackupRecord::Sale),
            Table::SaleItems => wrap(db.sales().list_all_items().await?, BackupRecord::SaleItem),
            Table::Payments => wrap(db.payments().list_all().await?, BackupRecord::Payment),
            Table::Treatments => wrap(db.treatments().list_all().await?, BackupRecord::Treatment),
            Table::Appointments => {
                wrap(db.appointments().list_all().await?, BackupRecord::Appointment)
            }
            Table::Suppliers => wrap(db.suppliers().list_all().await?, BackupRecord::Supplier),
            Table::RestockOrders => {
                wrap(db.restocks().list_all().await?, BackupRecord::RestockOrder)
            }
            Table::RestockItems => {
                wrap(db.restocks().list_all_items().await?, BackupRecord::RestockItem)
            }
            Table::Transactions => {
                wrap(db.transactions().list_all().await?, BackupRecord::Transaction)
            }
        })
    }
}

fn wrap<T>(rows: Vec<T>, variant: fn(T) -> BackupRecord) -> Vec<BackupRecord> {
    rows.into_iter().map(variant).collect()
}

/// Decodes every data row of an unpacked table.
pub(crate) fn parse_table(table: Table, raw: &RawTable) -> BackupResult<Vec<BackupRecord>> {
    raw.rows
        .iter()
        .enumerate()
        .map(|(index, record)| {
            let row = Row {
                table,
                number: index + 1,
                raw,
                record,
            };
            BackupRecord::parse(table, &row)
        })
        .collect()
}

// =============================================================================
// Row access by column name
// =============================================================================

/// One data row with typed accessors. Every failure names the table, row
/// and column.
pub(crate) struct Row<'a> {
    table: Table,
    number: usize,
    raw: &'a RawTable,
    record: &'a StringRecord,
}

impl<'a> Row<'a> {
    fn error(&self, column: &str, value: &str, reason: impl Into<String>) -> BackupError {
        BackupError::Parse {
            table: self.table,
            row: self.number,
            column: column.to_string(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }

    fn field(&self, column: &str) -> BackupResult<&'a str> {
        let index = self
            .raw
            .column(column)
            .ok_or_else(|| self.error(column, "", "missing column"))?;
        self.record
            .get(index)
            .ok_or_else(|| self.error(column, "", "missing field"))
    }

    fn convert<T>(&self, column: &str, parse: impl Fn(&str) -> Result<T, String>) -> BackupResult<T> {
        let value = self.field(column)?;
        parse(value).map_err(|reason| self.error(column, value, reason))
    }

    fn text(&self, column: &str) -> BackupResult<String> {
        Ok(self.field(column)?.to_string())
    }

    /// A required identifier, trimmed.
    fn id(&self, column: &str) -> BackupResult<String> {
        let value = self.field(column)?.trim();
        if value.is_empty() {
            return Err(self.error(column, value, "empty identifier"));
        }
        Ok(value.to_string())
    }

    fn opt_id(&self, column: &str) -> BackupResult<Option<String>> {
        Ok(parse_opt(self.field(column)?).map(|id| id.trim().to_string()))
    }

    fn opt(&self, column: &str) -> BackupResult<Option<String>> {
        Ok(parse_opt(self.field(column)?))
    }

    fn money(&self, column: &str) -> BackupResult<i64> {
        self.convert(column, parse_money)
    }

    fn int(&self, column: &str) -> BackupResult<i64> {
        self.convert(column, parse_int)
    }

    fn opt_int(&self, column: &str) -> BackupResult<Option<i64>> {
        self.convert(column, |v| match parse_opt(v) {
            Some(text) => parse_int(&text).map(Some),
            None => Ok(None),
        })
    }

    fn date(&self, column: &str) -> BackupResult<DateTime<Utc>> {
        self.convert(column, parse_date)
    }

    fn opt_date(&self, column: &str) -> BackupResult<Option<DateTime<Utc>>> {
        self.convert(column, |v| match parse_opt(v) {
            Some(text) => parse_date(&text).map(Some),
            None => Ok(None),
        })
    }

    fn boolean(&self, column: &str) -> BackupResult<bool> {
        self.convert(column, parse_bool)
    }

    /// An enum stored as its lowercase token.
    fn token<T>(&self, column: &str) -> BackupResult<T>
    where
        T: FromStr,
        T::Err: Display,
    {
        self.convert(column, |v| v.parse::<T>().map_err(|e| e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vetpos_core::{PaymentMethod, TransactionKind};

    fn raw(table: Table, rows: &[&[&str]]) -> RawTable {
        RawTable {
            headers: StringRecord::from(table.header().to_vec()),
            rows: rows.iter().map(|r| StringRecord::from(r.to_vec())).collect(),
        }
    }

    #[test]
    fn test_every_variant_fills_its_header() {
        let now = vetpos_core::now();
        let owner = Client::new("Ana");
        let records = vec![
            BackupRecord::Client(owner.clone()),
            BackupRecord::Pet(Pet::new("Luna", "cat", &owner.id)),
            BackupRecord::Product(Product::new("Kibble", "food", 1500)),
            BackupRecord::Supplier(Supplier::new("PetFood SA")),
            BackupRecord::Transaction(Transaction::new(
                TransactionKind::Income,
                vetpos_core::Money::from_cents(100),
                "Sale",
                None,
                now,
            )),
        ];

        for record in records {
            let table = record.table();
            let row = record.to_row();
            assert_eq!(row.len(), table.header().len(), "{table}");

            let fields: Vec<&str> = row.iter().map(String::as_str).collect();
            let parsed = parse_table(table, &raw(table, &[fields.as_slice()])).unwrap();
            assert_eq!(parsed, vec![record]);
        }
    }

    #[test]
    fn test_sale_fields() {
        let table = raw(
            Table::Sales,
            &[&["s1", "", "2026-03-01 10:00:00.000", "12.50", "12.5", "CARD", "walk-in"]],
        );
        let parsed = parse_table(Table::Sales, &table).unwrap();

        let BackupRecord::Sale(sale) = &parsed[0] else {
            panic!("expected a sale");
        };
        assert_eq!(sale.client_id, None);
        assert_eq!(sale.total_cents, 1250);
        assert_eq!(sale.amount_paid_cents, 1250);
        assert_eq!(sale.payment_method, PaymentMethod::Card);
        assert_eq!(sale.notes.as_deref(), Some("walk-in"));
    }

    #[test]
    fn test_parse_errors_name_row_and_column() {
        let table = raw(
            Table::Products,
            &[
                &["p1", "Kibble", "food", "15.00", "9.00", "4", "2", "false", "2026-01-01"],
                &["p2", "Collar", "acc", "abc", "1.00", "1", "0", "false", "2026-01-01"],
            ],
        );
        match parse_table(Table::Products, &table).unwrap_err() {
            BackupError::Parse { row, column, value, .. } => {
                assert_eq!(row, 2);
                assert_eq!(column, "price");
                assert_eq!(value, "abc");
            }
            other => panic!("unexpected error: {other}"),
        }

        let bad_token = raw(
            Table::Appointments,
            &[&["a1", "c1", "p1", "2026-01-01", "Checkup", "maybe"]],
        );
        assert!(matches!(
            parse_table(Table::Appointments, &bad_token),
            Err(BackupError::Parse { ref column, .. }) if column == "status"
        ));
    }

    #[test]
    fn test_missing_column_is_a_parse_error() {
        let table = RawTable {
            headers: StringRecord::from(vec!["id", "name"]),
            rows: vec![StringRecord::from(vec!["c1", "Ana"])],
        };
        let err = parse_table(Table::Clients, &table).unwrap_err();
        assert!(err.to_string().contains("missing column"), "{err}");
    }
}
