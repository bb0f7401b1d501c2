//! Multi-table store operations: checkout, debt payments, deliveries,
//! supplier payments and the report.

use vetpos_core::report::ReportRange;
use vetpos_core::{
    CheckoutLine, CheckoutRequest, Client, CoreError, Money, PaymentMethod, Product, Supplier,
    TransactionKind,
};
use vetpos_db::{Database, DbConfig, DbError, RestockLine, RestockRequest, Table};

async fn fresh_db() -> Database {
    Database::new(DbConfig::in_memory())
        .await
        .expect("in-memory database")
}

async fn product(db: &Database, name: &str, price_cents: i64, stock: i64) -> Product {
    let mut p = Product::new(name, "food", price_cents);
    p.stock = stock;
    p.min_stock = vetpos_core::DEFAULT_LOW_STOCK_THRESHOLD;
    p.cost_cents = price_cents / 2;
    db.products().insert(&p).await.unwrap();
    p
}

async fn service(db: &Database, name: &str, price_cents: i64) -> Product {
    let mut p = Product::new(name, "services", price_cents);
    p.is_service = true;
    db.products().insert(&p).await.unwrap();
    p
}

async fn client(db: &Database, name: &str) -> Client {
    let c = Client::new(name);
    db.clients().insert(&c).await.unwrap();
    c
}

fn line(product: &Product, quantity: i64) -> CheckoutLine {
    CheckoutLine {
        product_id: product.id.clone(),
        quantity,
        unit_price_cents: product.price_cents,
    }
}

async fn stock_of(db: &Database, id: &str) -> i64 {
    db.products().get_by_id(id).await.unwrap().unwrap().stock
}

async fn debt_of(db: &Database, id: &str) -> i64 {
    db.clients().get_by_id(id).await.unwrap().unwrap().debt_cents
}

#[tokio::test]
async fn test_cash_checkout_moves_stock_and_cash() {
    let db = fresh_db().await;
    let kibble = product(&db, "Kibble 2kg", 1500, 10).await;
    let consult = service(&db, "Consultation", 2500).await;

    let receipt = db
        .checkout()
        .checkout(&CheckoutRequest {
            client_id: None,
            lines: vec![line(&kibble, 2), line(&consult, 1)],
            payment_method: PaymentMethod::Cash,
            amount_paid_cents: 6000,
            notes: None,
        })
        .await
        .unwrap();

    assert_eq!(receipt.sale.total_cents, 5500);
    assert_eq!(receipt.sale.amount_paid_cents, 5500);
    assert_eq!(receipt.change, Money::from_cents(500));
    assert_eq!(receipt.items.len(), 2);
    assert_eq!(stock_of(&db, &kibble.id).await, 8);
    assert_eq!(stock_of(&db, &consult.id).await, 0);

    let income = db.transactions().by_reference(&receipt.sale.id).await.unwrap();
    assert_eq!(income.len(), 1);
    assert_eq!(income[0].kind, TransactionKind::Income);
    assert_eq!(income[0].amount_cents, 5500);
    assert_eq!(db.sales().items(&receipt.sale.id).await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_credit_checkout_adds_debt() {
    let db = fresh_db().await;
    let drops = product(&db, "Flea Drops", 1450, 5).await;
    let owner = client(&db, "Ana Gómez").await;
    let mut changes = db.subscribe();

    let receipt = db
        .checkout()
        .checkout(&CheckoutRequest {
            client_id: Some(owner.id.clone()),
            lines: vec![line(&drops, 2)],
            payment_method: PaymentMethod::Credit,
            amount_paid_cents: 0,
            notes: Some("pays Friday".to_string()),
        })
        .await
        .unwrap();

    assert_eq!(receipt.debt_increase, Money::from_cents(2900));
    assert_eq!(debt_of(&db, &owner.id).await, 2900);
    assert!(db.transactions().list_all().await.unwrap().is_empty());

    let mut seen = Vec::new();
    while let Ok(change) = changes.try_recv() {
        seen.push(change.table);
    }
    assert_eq!(
        seen,
        vec![Table::Sales, Table::SaleItems, Table::Products, Table::Clients]
    );
}

#[tokio::test]
async fn test_failed_checkout_writes_nothing() {
    let db = fresh_db().await;
    let kibble = product(&db, "Kibble 2kg", 1500, 3).await;
    let leash = product(&db, "Leash", 1200, 10).await;

    let err = db
        .checkout()
        .checkout(&CheckoutRequest {
            client_id: None,
            lines: vec![line(&leash, 1), line(&kibble, 5)],
            payment_method: PaymentMethod::Cash,
            amount_paid_cents: 10_000,
            notes: None,
        })
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        DbError::Core(CoreError::InsufficientStock { available: 3, requested: 5, .. })
    ));
    assert_eq!(stock_of(&db, &leash.id).await, 10);
    assert_eq!(db.sales().count().await.unwrap(), 0);

    // Partial payment without a client has nobody to charge.
    let err = db
        .checkout()
        .checkout(&CheckoutRequest {
            client_id: None,
            lines: vec![line(&leash, 1)],
            payment_method: PaymentMethod::Cash,
            amount_paid_cents: 500,
            notes: None,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::Core(CoreError::DebtWithoutClient { .. })));

    let err = db
        .checkout()
        .checkout(&CheckoutRequest {
            client_id: Some("nobody".to_string()),
            lines: vec![line(&leash, 1)],
            payment_method: PaymentMethod::Credit,
            amount_paid_cents: 0,
            notes: None,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::Core(CoreError::ClientNotFound(_))));
    assert_eq!(db.sales().count().await.unwrap(), 0);
    assert_eq!(stock_of(&db, &leash.id).await, 10);
}

#[tokio::test]
async fn test_amount_ceiling_guards_products_and_checkout() {
    let db = fresh_db().await;
    let owner = client(&db, "Marta").await;

    let mut overpriced = Product::new("Gold collar", "accessories", i64::MAX / 2);
    overpriced.stock = 10;
    let err = db.products().insert(&overpriced).await.unwrap_err();
    assert!(matches!(err, DbError::Core(CoreError::Validation(_))));
    assert_eq!(db.products().count().await.unwrap(), 0);

    let surgery = service(&db, "Surgery", vetpos_core::MAX_AMOUNT_CENTS).await;
    let err = db
        .checkout()
        .checkout(&CheckoutRequest {
            client_id: Some(owner.id.clone()),
            lines: vec![line(&surgery, 3)],
            payment_method: PaymentMethod::Credit,
            amount_paid_cents: 0,
            notes: None,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::Core(CoreError::AmountTooLarge { .. })));
    assert_eq!(db.sales().count().await.unwrap(), 0);
    assert_eq!(debt_of(&db, &owner.id).await, 0);
}

#[tokio::test]
async fn test_delete_sale_reverses_stock_and_debt() {
    let db = fresh_db().await;
    let kibble = product(&db, "Kibble 2kg", 1500, 10).await;
    let owner = client(&db, "Bruno Pérez").await;

    let receipt = db
        .checkout()
        .checkout(&CheckoutRequest {
            client_id: Some(owner.id.clone()),
            lines: vec![line(&kibble, 4)],
            payment_method: PaymentMethod::Cash,
            amount_paid_cents: 2000,
            notes: None,
        })
        .await
        .unwrap();
    assert_eq!(debt_of(&db, &owner.id).await, 4000);
    assert_eq!(stock_of(&db, &kibble.id).await, 6);

    db.checkout().delete_sale(&receipt.sale.id).await.unwrap();

    assert_eq!(debt_of(&db, &owner.id).await, 0);
    assert_eq!(stock_of(&db, &kibble.id).await, 10);
    assert!(db.sales().get_by_id(&receipt.sale.id).await.unwrap().is_none());
    assert!(db.sales().items(&receipt.sale.id).await.unwrap().is_empty());
    // The cash that changed hands stays in the book.
    assert_eq!(db.transactions().by_reference(&receipt.sale.id).await.unwrap().len(), 1);

    let err = db.checkout().delete_sale(&receipt.sale.id).await.unwrap_err();
    assert!(matches!(err, DbError::NotFound { .. }));
}

#[tokio::test]
async fn test_payment_reduces_debt_and_can_overpay() {
    let db = fresh_db().await;
    let mut owner = Client::new("Carla López");
    owner.debt_cents = 3000;
    db.clients().insert(&owner).await.unwrap();

    let payment = db
        .accounts()
        .record_payment(&owner.id, 2000, PaymentMethod::Card, None)
        .await
        .unwrap();
    assert_eq!(debt_of(&db, &owner.id).await, 1000);
    assert_eq!(db.payments().by_client(&owner.id).await.unwrap(), vec![payment.clone()]);

    let income = db.transactions().by_reference(&payment.id).await.unwrap();
    assert_eq!(income[0].description, "Payment from Carla López");

    db.accounts()
        .record_payment(&owner.id, 1500, PaymentMethod::Cash, None)
        .await
        .unwrap();
    assert_eq!(debt_of(&db, &owner.id).await, -500);

    let err = db
        .accounts()
        .record_payment(&owner.id, 100, PaymentMethod::Credit, None)
        .await
        .unwrap_err();
    assert!(err.is_user_error());

    let err = db
        .accounts()
        .record_payment(&owner.id, 0, PaymentMethod::Cash, None)
        .await
        .unwrap_err();
    assert!(err.is_user_error());
    assert_eq!(db.payments().count().await.unwrap(), 2);
}

#[tokio::test]
async fn test_restock_paid_and_on_account() {
    let db = fresh_db().await;
    let kibble = product(&db, "Kibble 2kg", 1500, 2).await;
    let vendor = Supplier::new("VetPharma");
    db.suppliers().insert(&vendor).await.unwrap();

    let paid = db
        .accounts()
        .receive_restock(&RestockRequest {
            supplier_id: vendor.id.clone(),
            lines: vec![
                RestockLine {
                    product_id: kibble.id.clone(),
                    quantity: 10,
                    unit_cost_cents: 800,
                },
                RestockLine {
                    product_id: kibble.id.clone(),
                    quantity: 5,
                    unit_cost_cents: 900,
                },
            ],
            is_paid: true,
            notes: None,
        })
        .await
        .unwrap();

    assert_eq!(paid.total_cents, 12_000);
    assert_eq!(stock_of(&db, &kibble.id).await, 17);
    assert_eq!(db.restocks().items(&paid.id).await.unwrap().len(), 1);
    let expense = db.transactions().by_reference(&paid.id).await.unwrap();
    assert_eq!(expense[0].kind, TransactionKind::Expense);
    assert_eq!(expense[0].amount_cents, 12_000);

    let owed = db
        .accounts()
        .receive_restock(&RestockRequest {
            supplier_id: vendor.id.clone(),
            lines: vec![RestockLine {
                product_id: kibble.id.clone(),
                quantity: 3,
                unit_cost_cents: 800,
            }],
            is_paid: false,
            notes: Some("invoice 114".to_string()),
        })
        .await
        .unwrap();
    assert!(db.transactions().by_reference(&owed.id).await.unwrap().is_empty());
    let vendor_now = db.suppliers().get_by_id(&vendor.id).await.unwrap().unwrap();
    assert_eq!(vendor_now.balance_cents, 2400);
    assert_eq!(db.restocks().by_supplier(&vendor.id).await.unwrap().len(), 2);

    let settled = db
        .accounts()
        .pay_supplier(&vendor.id, 2400, Some("invoice 114".to_string()))
        .await
        .unwrap();
    assert_eq!(settled.description, "Payment to VetPharma (invoice 114)");
    let vendor_now = db.suppliers().get_by_id(&vendor.id).await.unwrap().unwrap();
    assert_eq!(vendor_now.balance_cents, 0);
}

#[tokio::test]
async fn test_restock_rejections_write_nothing() {
    let db = fresh_db().await;
    let consult = service(&db, "Consultation", 2500).await;
    let vendor = Supplier::new("Animal Supplies Co");
    db.suppliers().insert(&vendor).await.unwrap();

    let request = |supplier_id: &str, product_id: &str| RestockRequest {
        supplier_id: supplier_id.to_string(),
        lines: vec![RestockLine {
            product_id: product_id.to_string(),
            quantity: 1,
            unit_cost_cents: 100,
        }],
        is_paid: true,
        notes: None,
    };

    let err = db
        .accounts()
        .receive_restock(&request(&vendor.id, &consult.id))
        .await
        .unwrap_err();
    assert!(err.is_user_error());

    let err = db
        .accounts()
        .receive_restock(&request("ghost", &consult.id))
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::Core(CoreError::SupplierNotFound(_))));

    let err = db
        .accounts()
        .receive_restock(&request(&vendor.id, "ghost"))
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::Core(CoreError::ProductNotFound(_))));

    let kibble = product(&db, "Kibble", 1500, 5).await;
    let mut bulk = request(&vendor.id, &kibble.id);
    bulk.lines[0].quantity = 2;
    bulk.lines[0].unit_cost_cents = vetpos_core::MAX_AMOUNT_CENTS;
    let err = db.accounts().receive_restock(&bulk).await.unwrap_err();
    assert!(matches!(err, DbError::Core(CoreError::AmountTooLarge { .. })));
    assert_eq!(stock_of(&db, &kibble.id).await, 5);

    assert_eq!(db.restocks().count().await.unwrap(), 0);
    assert_eq!(db.transactions().count().await.unwrap(), 0);
}

#[tokio::test]
async fn test_report_for_today() {
    let db = fresh_db().await;
    let kibble = product(&db, "Kibble 2kg", 1500, 6).await;
    let consult = service(&db, "Consultation", 2500).await;
    let owner = client(&db, "Diego Fernández").await;

    db.checkout()
        .checkout(&CheckoutRequest {
            client_id: None,
            lines: vec![line(&kibble, 2)],
            payment_method: PaymentMethod::Cash,
            amount_paid_cents: 3000,
            notes: None,
        })
        .await
        .unwrap();
    db.checkout()
        .checkout(&CheckoutRequest {
            client_id: Some(owner.id.clone()),
            lines: vec![line(&consult, 1), line(&kibble, 1)],
            payment_method: PaymentMethod::Credit,
            amount_paid_cents: 0,
            notes: None,
        })
        .await
        .unwrap();

    let range = ReportRange::last_days(7, vetpos_core::now());
    let report = db.reports().build(range, 5).await.unwrap();

    assert_eq!(report.summary.sale_count, 2);
    assert_eq!(report.summary.revenue, Money::from_cents(7000));
    assert_eq!(report.summary.collected, Money::from_cents(3000));
    assert_eq!(report.daily.len(), 7);
    assert_eq!(report.top_products[0].name, "Kibble 2kg");
    assert_eq!(report.top_products[0].quantity, 3);
    assert_eq!(report.cash_flow.income, Money::from_cents(3000));
    assert_eq!(report.outstanding_debt, Money::from_cents(4000));
    // Three left, at the default reorder point of five.
    assert_eq!(report.low_stock.len(), 1);
}
