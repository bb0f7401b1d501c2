//! # Store Tables
//!
//! The closed set of tables the store holds. Every table-wide concern
//! (change notifications, backup file layout, merge order, referential
//! checks) dispatches on [`Table`] with an exhaustive `match`, so adding a
//! table is a compile error until every concern handles it.
//!
//! ## Dependency Ranks
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  rank 0   clients      suppliers       products                         │
//! │             │  │  │        │              │  │                          │
//! │  rank 1   pets │ payments restock_orders  │  │      sales ◄── clients?   │
//! │             │  │              │           │  │        │                 │
//! │  rank 2   treatments  appointments  restock_items  sale_items           │
//! │                                                                         │
//! │  rank 3   transactions (reference_id is not a foreign key)              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//! Parents always have a lower rank than their children.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A foreign key: `column` in the child holds an `id` of `parent`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForeignKey {
    pub column: &'static str,
    pub parent: Table,
    /// An empty value is allowed and skipped by referential checks.
    pub optional: bool,
}

const PET_KEYS: &[ForeignKey] = &[ForeignKey {
    column: "owner_id",
    parent: Table::Clients,
    optional: false,
}];

const SALE_KEYS: &[ForeignKey] = &[ForeignKey {
    column: "client_id",
    parent: Table::Clients,
    optional: true,
}];

const SALE_ITEM_KEYS: &[ForeignKey] = &[
    ForeignKey {
        column: "sale_id",
        parent: Table::Sales,
        optional: false,
    },
    ForeignKey {
        column: "product_id",
        parent: Table::Products,
        optional: false,
    },
];

const PAYMENT_KEYS: &[ForeignKey] = &[ForeignKey {
    column: "client_id",
    parent: Table::Clients,
    optional: false,
}];

const TREATMENT_KEYS: &[ForeignKey] = &[
    ForeignKey {
        column: "pet_id",
        parent: Table::Pets,
        optional: false,
    },
    ForeignKey {
        column: "product_id",
        parent: Table::Products,
        optional: true,
    },
];

const APPOINTMENT_KEYS: &[ForeignKey] = &[
    ForeignKey {
        column: "client_id",
        parent: Table::Clients,
        optional: false,
    },
    ForeignKey {
        column: "pet_id",
        parent: Table::Pets,
        optional: false,
    },
];

const RESTOCK_ORDER_KEYS: &[ForeignKey] = &[ForeignKey {
    column: "supplier_id",
    parent: Table::Suppliers,
    optional: false,
}];

const RESTOCK_ITEM_KEYS: &[ForeignKey] = &[
    ForeignKey {
        column: "order_id",
        parent: Table::RestockOrders,
        optional: false,
    },
    ForeignKey {
        column: "product_id",
        parent: Table::Products,
        optional: false,
    },
];

/// One of the store's tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Table {
    Clients,
    Pets,
    Products,
    Sales,
    SaleItems,
    Payments,
    Treatments,
    Appointments,
    Suppliers,
    RestockOrders,
    RestockItems,
    Transactions,
}

impl Table {
    /// Every table, in declaration order.
    pub const ALL: [Table; 12] = [
        Table::Clients,
        Table::Pets,
        Table::Products,
        Table::Sales,
        Table::SaleItems,
        Table::Payments,
        Table::Treatments,
        Table::Appointments,
        Table::Suppliers,
        Table::RestockOrders,
        Table::RestockItems,
        Table::Transactions,
    ];

    /// SQL table name.
    pub const fn sql_name(&self) -> &'static str {
        match self {
            Table::Clients => "clients",
            Table::Pets => "pets",
            Table::Products => "products",
            Table::Sales => "sales",
            Table::SaleItems => "sale_items",
            Table::Payments => "payments",
            Table::Treatments => "treatments",
            Table::Appointments => "appointments",
            Table::Suppliers => "suppliers",
            Table::RestockOrders => "restock_orders",
            Table::RestockItems => "restock_items",
            Table::Transactions => "transactions",
        }
    }

    /// Archive entry name for this table's CSV file.
    pub const fn file_name(&self) -> &'static str {
        match self {
            Table::Clients => "clients.csv",
            Table::Pets => "pets.csv",
            Table::Products => "products.csv",
            Table::Sales => "sales.csv",
            Table::SaleItems => "sale_items.csv",
            Table::Payments => "payments.csv",
            Table::Treatments => "treatments.csv",
            Table::Appointments => "appointments.csv",
            Table::Suppliers => "suppliers.csv",
            Table::RestockOrders => "restock_orders.csv",
            Table::RestockItems => "restock_items.csv",
            Table::Transactions => "transactions.csv",
        }
    }

    /// Looks a table up by its archive entry name.
    pub fn from_file_name(name: &str) -> Option<Table> {
        Table::ALL.into_iter().find(|t| t.file_name() == name)
    }

    /// Fixed CSV header. Column order is part of the backup format.
    pub const fn header(&self) -> &'static [&'static str] {
        match self {
            Table::Clients => &["id", "name", "phone", "email", "address", "debt", "created_at"],
            Table::Pets => &[
                "id",
                "name",
                "species",
                "breed",
                "birth_date",
                "weight_grams",
                "owner_id",
                "notes",
                "created_at",
            ],
            Table::Products => &[
                "id",
                "name",
                "category",
                "price",
                "cost",
                "stock",
                "min_stock",
                "is_service",
                "created_at",
            ],
            Table::Sales => &[
                "id",
                "client_id",
                "date",
                "total",
                "amount_paid",
                "payment_method",
                "notes",
            ],
            Table::SaleItems => &["sale_id", "product_id", "quantity", "unit_price"],
            Table::Payments => &["id", "client_id", "date", "amount", "method", "notes"],
            Table::Treatments => &[
                "id",
                "pet_id",
                "product_id",
                "date",
                "description",
                "diagnosis",
                "cost",
                "next_visit",
            ],
            Table::Appointments => &["id", "client_id", "pet_id", "date", "reason", "status"],
            Table::Suppliers => &[
                "id",
                "name",
                "contact_name",
                "phone",
                "email",
                "balance",
                "created_at",
            ],
            Table::RestockOrders => &["id", "supplier_id", "date", "total", "is_paid", "notes"],
            Table::RestockItems => &["order_id", "product_id", "quantity", "unit_cost"],
            Table::Transactions => &["id", "date", "kind", "amount", "description", "reference_id"],
        }
    }

    /// Foreign keys this table holds, checked on import.
    pub const fn foreign_keys(&self) -> &'static [ForeignKey] {
        match self {
            Table::Clients | Table::Products | Table::Suppliers | Table::Transactions => &[],
            Table::Pets => PET_KEYS,
            Table::Sales => SALE_KEYS,
            Table::SaleItems => SALE_ITEM_KEYS,
            Table::Payments => PAYMENT_KEYS,
            Table::Treatments => TREATMENT_KEYS,
            Table::Appointments => APPOINTMENT_KEYS,
            Table::RestockOrders => RESTOCK_ORDER_KEYS,
            Table::RestockItems => RESTOCK_ITEM_KEYS,
        }
    }

    /// Position in the parent-before-child write order.
    pub const fn merge_rank(&self) -> u8 {
        match self {
            Table::Clients | Table::Suppliers | Table::Products => 0,
            Table::Pets | Table::Sales | Table::Payments | Table::RestockOrders => 1,
            Table::SaleItems | Table::Treatments | Table::Appointments | Table::RestockItems => 2,
            Table::Transactions => 3,
        }
    }

    /// Every table sorted parents first. Ties keep declaration order.
    pub fn merge_order() -> Vec<Table> {
        let mut tables = Table::ALL.to_vec();
        tables.sort_by_key(|t| t.merge_rank());
        tables
    }

    /// True when rows are identified by a single `id` column.
    pub const fn has_id_column(&self) -> bool {
        !matches!(self, Table::SaleItems | Table::RestockItems)
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.sql_name())
    }
}
