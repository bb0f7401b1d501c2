//! # Screen State
//!
//! One immutable value per screen. The only way to change it is a pure
//! reducer: `state.reduce(action)` consumes the old value and returns the
//! new one, so every transition can be tested without a store or a window.
//!
//! ```text
//! ┌──────────────┐   action   ┌──────────────┐
//! │  old state   │ ─────────► │   reduce()   │ ───► new state
//! └──────────────┘            └──────────────┘
//! ```
//!
//! Row data is not held here. Screens read rows from a [`LiveQuery`] and use
//! the state's `visible` helpers to filter them.
//!
//! [`LiveQuery`]: super::LiveQuery

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, Utc};
use serde::Serialize;
use vetpos_core::{report::ReportRange, Client, Product};

fn midnight(day: NaiveDate) -> DateTime<Utc> {
    day.and_time(NaiveTime::MIN).and_utc()
}

fn matches_search(query: &str, fields: &[&str]) -> bool {
    let query = query.trim().to_lowercase();
    query.is_empty() || fields.iter().any(|f| f.to_lowercase().contains(&query))
}

// =============================================================================
// Inventory
// =============================================================================

/// Which product editor is open.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase", tag = "kind", content = "productId")]
pub enum ProductDialog {
    Closed,
    New,
    Edit(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryState {
    pub search: String,
    pub category: Option<String>,
    pub low_stock_only: bool,
    pub dialog: ProductDialog,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InventoryAction {
    Search(String),
    FilterCategory(Option<String>),
    ToggleLowStock,
    OpenNewProduct,
    EditProduct(String),
    CloseDialog,
    /// A product row disappeared from the store.
    ProductRemoved(String),
}

impl Default for InventoryState {
    fn default() -> Self {
        InventoryState {
            search: String::new(),
            category: None,
            low_stock_only: false,
            dialog: ProductDialog::Closed,
        }
    }
}

impl InventoryState {
    #[must_use]
    pub fn reduce(self, action: InventoryAction) -> Self {
        match action {
            InventoryAction::Search(search) => InventoryState { search, ..self },
            InventoryAction::FilterCategory(category) => InventoryState {
                category: category.filter(|c| !c.is_empty()),
                ..self
            },
            InventoryAction::ToggleLowStock => InventoryState {
                low_stock_only: !self.low_stock_only,
                ..self
            },
            InventoryAction::OpenNewProduct => InventoryState {
                dialog: ProductDialog::New,
                ..self
            },
            InventoryAction::EditProduct(id) => InventoryState {
                dialog: ProductDialog::Edit(id),
                ..self
            },
            InventoryAction::CloseDialog => InventoryState {
                dialog: ProductDialog::Closed,
                ..self
            },
            InventoryAction::ProductRemoved(id) => match &self.dialog {
                ProductDialog::Edit(open) if *open == id => InventoryState {
                    dialog: ProductDialog::Closed,
                    ..self
                },
                _ => self,
            },
        }
    }

    /// Products passing the search, category and low-stock filters.
    pub fn visible<'a>(&self, products: &'a [Product]) -> Vec<&'a Product> {
        products
            .iter()
            .filter(|p| matches_search(&self.search, &[&p.name, &p.category]))
            .filter(|p| self.category.as_ref().map_or(true, |c| &p.category == c))
            .filter(|p| !self.low_stock_only || p.is_low_stock())
            .collect()
    }
}

// =============================================================================
// Clients
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientsState {
    pub search: String,
    pub debt_only: bool,
    pub selected: Option<String>,
    /// Payment dialog open for the selected client
    pub payment_dialog: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientsAction {
    Search(String),
    ToggleDebtOnly,
    Select(Option<String>),
    OpenPayment,
    ClosePayment,
    ClientRemoved(String),
}

impl ClientsState {
    #[must_use]
    pub fn reduce(self, action: ClientsAction) -> Self {
        match action {
            ClientsAction::Search(search) => ClientsState { search, ..self },
            ClientsAction::ToggleDebtOnly => ClientsState {
                debt_only: !self.debt_only,
                ..self
            },
            ClientsAction::Select(selected) => ClientsState {
                selected,
                payment_dialog: false,
                ..self
            },
            // Payments always belong to someone.
            ClientsAction::OpenPayment => ClientsState {
                payment_dialog: self.selected.is_some(),
                ..self
            },
            ClientsAction::ClosePayment => ClientsState {
                payment_dialog: false,
                ..self
            },
            ClientsAction::ClientRemoved(id) => {
                if self.selected.as_deref() == Some(id.as_str()) {
                    ClientsState {
                        selected: None,
                        payment_dialog: false,
                        ..self
                    }
                } else {
                    self
                }
            }
        }
    }

    pub fn visible<'a>(&self, clients: &'a [Client]) -> Vec<&'a Client> {
        clients
            .iter()
            .filter(|c| {
                let phone = c.phone.as_deref().unwrap_or_default();
                let email = c.email.as_deref().unwrap_or_default();
                matches_search(&self.search, &[&c.name, phone, email])
            })
            .filter(|c| !self.debt_only || c.has_debt())
            .collect()
    }
}

// =============================================================================
// Calendar
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase", tag = "kind")]
pub enum AppointmentDialog {
    Closed,
    New { day: NaiveDate },
    Edit { appointment_id: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarState {
    pub selected_day: NaiveDate,
    pub dialog: AppointmentDialog,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CalendarAction {
    SelectDay(NaiveDate),
    /// Moves the selection by a number of days (negative goes back).
    Shift(i64),
    OpenNew,
    Edit(String),
    CloseDialog,
}

impl CalendarState {
    pub fn new(today: NaiveDate) -> Self {
        CalendarState {
            selected_day: today,
            dialog: AppointmentDialog::Closed,
        }
    }

    #[must_use]
    pub fn reduce(self, action: CalendarAction) -> Self {
        match action {
            CalendarAction::SelectDay(selected_day) => CalendarState {
                selected_day,
                ..self
            },
            CalendarAction::Shift(days) => CalendarState {
                selected_day: self.selected_day + Duration::days(days),
                ..self
            },
            CalendarAction::OpenNew => CalendarState {
                dialog: AppointmentDialog::New {
                    day: self.selected_day,
                },
                ..self
            },
            CalendarAction::Edit(appointment_id) => CalendarState {
                dialog: AppointmentDialog::Edit { appointment_id },
                ..self
            },
            CalendarAction::CloseDialog => CalendarState {
                dialog: AppointmentDialog::Closed,
                ..self
            },
        }
    }

    /// The selected day as a half-open UTC window.
    pub fn day_window(&self) -> (DateTime<Utc>, DateTime<Utc>) {
        let start = midnight(self.selected_day);
        (start, start + Duration::days(1))
    }
}

// =============================================================================
// Reports
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase", tag = "kind")]
pub enum RangePreset {
    Today,
    Last7Days,
    Last30Days,
    ThisMonth,
    Custom { start: NaiveDate, end: NaiveDate },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportsState {
    pub preset: RangePreset,
    pub today: NaiveDate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportsAction {
    Choose(RangePreset),
    /// The clock crossed midnight.
    DayChanged(NaiveDate),
}

impl ReportsState {
    pub fn new(today: NaiveDate) -> Self {
        ReportsState {
            preset: RangePreset::Last30Days,
            today,
        }
    }

    #[must_use]
    pub fn reduce(self, action: ReportsAction) -> Self {
        match action {
            ReportsAction::Choose(RangePreset::Custom { start, end }) if end < start => ReportsState {
                preset: RangePreset::Custom {
                    start: end,
                    end: start,
                },
                ..self
            },
            ReportsAction::Choose(preset) => ReportsState { preset, ..self },
            ReportsAction::DayChanged(today) => ReportsState { today, ..self },
        }
    }

    /// The window the chosen preset covers. Every preset ends at the end of
    /// a day, custom ranges include both end days.
    pub fn range(&self) -> ReportRange {
        let now = midnight(self.today);
        match self.preset {
            RangePreset::Today => ReportRange::last_days(1, now),
            RangePreset::Last7Days => ReportRange::last_days(7, now),
            RangePreset::Last30Days => ReportRange::last_days(30, now),
            RangePreset::ThisMonth => {
                let first = self.today - Duration::days(i64::from(self.today.day0()));
                ReportRange {
                    start: midnight(first),
                    end: midnight(self.today + Duration::days(1)),
                }
            }
            RangePreset::Custom { start, end } => ReportRange {
                start: midnight(start),
                end: midnight(end + Duration::days(1)),
            },
        }
    }
}

// =============================================================================
// Backup
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase", tag = "status", content = "message")]
pub enum BackupStatus {
    #[default]
    Idle,
    Exporting,
    Importing,
    Succeeded(String),
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackupAction {
    StartExport,
    StartImport,
    Finished { success: bool, message: String },
    Dismiss,
}

impl BackupStatus {
    pub fn is_busy(&self) -> bool {
        matches!(self, BackupStatus::Exporting | BackupStatus::Importing)
    }

    /// Starting while busy and finishing while idle are both ignored.
    #[must_use]
    pub fn reduce(self, action: BackupAction) -> Self {
        match action {
            BackupAction::StartExport if !self.is_busy() => BackupStatus::Exporting,
            BackupAction::StartImport if !self.is_busy() => BackupStatus::Importing,
            BackupAction::Finished { success, message } if self.is_busy() => {
                if success {
                    BackupStatus::Succeeded(message)
                } else {
                    BackupStatus::Failed(message)
                }
            }
            BackupAction::Dismiss if !self.is_busy() => BackupStatus::Idle,
            _ => self,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_inventory_filters() {
        let mut kibble = Product::new("Kibble Adult", "Food", 2500);
        kibble.stock = 2;
        kibble.min_stock = 5;
        let mut collar = Product::new("Collar", "Accessories", 900);
        collar.stock = 40;
        collar.min_stock = 5;
        let products = vec![kibble, collar];

        let state = InventoryState::default().reduce(InventoryAction::Search("kib".to_string()));
        assert_eq!(state.visible(&products).len(), 1);

        let state = state
            .reduce(InventoryAction::Search(String::new()))
            .reduce(InventoryAction::FilterCategory(Some("Accessories".to_string())));
        assert_eq!(state.visible(&products)[0].name, "Collar");

        let state = state
            .reduce(InventoryAction::FilterCategory(None))
            .reduce(InventoryAction::ToggleLowStock);
        let visible = state.visible(&products);
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].name, "Kibble Adult");
    }

    #[test]
    fn test_inventory_dialog() {
        let state = InventoryState::default().reduce(InventoryAction::EditProduct("p1".to_string()));
        assert_eq!(state.dialog, ProductDialog::Edit("p1".to_string()));

        let kept = state.clone().reduce(InventoryAction::ProductRemoved("p2".to_string()));
        assert_eq!(kept.dialog, ProductDialog::Edit("p1".to_string()));

        let closed = state.reduce(InventoryAction::ProductRemoved("p1".to_string()));
        assert_eq!(closed.dialog, ProductDialog::Closed);
    }

    #[test]
    fn test_reduce_leaves_input_untouched() {
        let before = InventoryState::default();
        let after = before.clone().reduce(InventoryAction::ToggleLowStock);
        assert!(!before.low_stock_only);
        assert!(after.low_stock_only);
    }

    #[test]
    fn test_clients_payment_needs_selection() {
        let state = ClientsState::default().reduce(ClientsAction::OpenPayment);
        assert!(!state.payment_dialog);

        let state = state
            .reduce(ClientsAction::Select(Some("c1".to_string())))
            .reduce(ClientsAction::OpenPayment);
        assert!(state.payment_dialog);

        let state = state.reduce(ClientsAction::ClientRemoved("c1".to_string()));
        assert_eq!(state.selected, None);
        assert!(!state.payment_dialog);
    }

    #[test]
    fn test_clients_debt_filter() {
        let mut owes = Client::new("Ana Torres");
        owes.debt_cents = 1500;
        let clear = Client::new("Luis Paredes");
        let clients = vec![owes, clear];

        let state = ClientsState::default().reduce(ClientsAction::ToggleDebtOnly);
        let visible = state.visible(&clients);
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].name, "Ana Torres");

        let state = state
            .reduce(ClientsAction::ToggleDebtOnly)
            .reduce(ClientsAction::Search("PAREDES".to_string()));
        assert_eq!(state.visible(&clients)[0].name, "Luis Paredes");
    }

    #[test]
    fn test_calendar_navigation() {
        let state = CalendarState::new(day(2026, 2, 27))
            .reduce(CalendarAction::Shift(3))
            .reduce(CalendarAction::OpenNew);

        assert_eq!(state.selected_day, day(2026, 3, 2));
        assert_eq!(state.dialog, AppointmentDialog::New { day: day(2026, 3, 2) });

        let (start, end) = state.day_window();
        assert_eq!(end - start, Duration::days(1));
        assert_eq!(start.date_naive(), day(2026, 3, 2));
    }

    #[test]
    fn test_report_presets() {
        let state = ReportsState::new(day(2026, 3, 15));
        let range = state.range();
        assert_eq!(range.days().len(), 30);
        assert_eq!(range.end, midnight(day(2026, 3, 16)));

        let month = state.reduce(ReportsAction::Choose(RangePreset::ThisMonth)).range();
        assert_eq!(month.start, midnight(day(2026, 3, 1)));
        assert_eq!(month.days().len(), 15);

        let custom = state
            .reduce(ReportsAction::Choose(RangePreset::Custom {
                start: day(2026, 1, 10),
                end: day(2026, 1, 1),
            }))
            .range();
        assert_eq!(custom.start, midnight(day(2026, 1, 1)));
        assert_eq!(custom.days().len(), 10);
    }

    #[test]
    fn test_backup_status_flow() {
        let status = BackupStatus::default().reduce(BackupAction::StartImport);
        assert_eq!(status, BackupStatus::Importing);

        let status = status.reduce(BackupAction::StartExport);
        assert_eq!(status, BackupStatus::Importing);

        let status = status.reduce(BackupAction::Finished {
            success: false,
            message: "Not a valid backup".to_string(),
        });
        assert_eq!(status, BackupStatus::Failed("Not a valid backup".to_string()));

        let status = status.reduce(BackupAction::Finished {
            success: true,
            message: "late".to_string(),
        });
        assert!(matches!(status, BackupStatus::Failed(_)));

        assert_eq!(status.reduce(BackupAction::Dismiss), BackupStatus::Idle);
    }
}
