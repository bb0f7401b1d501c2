//! # Client Commands
//!
//! Client records, their account history and debt payments.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::ApiError;
use crate::state::DbState;
use vetpos_core::{Client, Payment, PaymentMethod};

use super::sale::SaleDto;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientDto {
    pub id: String,
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    /// Negative means the client has credit with the clinic
    pub debt_cents: i64,
    pub created_at: DateTime<Utc>,
}

impl From<Client> for ClientDto {
    fn from(c: Client) -> Self {
        ClientDto {
            id: c.id,
            name: c.name,
            phone: c.phone,
            email: c.email,
            address: c.address,
            debt_cents: c.debt_cents,
            created_at: c.created_at,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientInput {
    pub name: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
}

fn blank_to_none(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl ClientInput {
    fn apply(self, client: &mut Client) {
        client.name = self.name.trim().to_string();
        client.phone = blank_to_none(self.phone);
        client.email = blank_to_none(self.email);
        client.address = blank_to_none(self.address);
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentDto {
    pub id: String,
    pub client_id: String,
    pub date: DateTime<Utc>,
    pub amount_cents: i64,
    pub method: PaymentMethod,
    pub notes: Option<String>,
}

impl From<Payment> for PaymentDto {
    fn from(p: Payment) -> Self {
        PaymentDto {
            id: p.id,
            client_id: p.client_id,
            date: p.date,
            amount_cents: p.amount_cents,
            method: p.method,
            notes: p.notes,
        }
    }
}

/// Everything the client detail panel shows.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientAccount {
    pub client: ClientDto,
    pub sales: Vec<SaleDto>,
    pub payments: Vec<PaymentDto>,
}

pub async fn search_clients(db: &DbState, query: &str) -> Result<Vec<ClientDto>, ApiError> {
    debug!(query = %query, "search_clients command");
    let clients = db.inner().clients().search(query).await?;
    Ok(clients.into_iter().map(ClientDto::from).collect())
}

pub async fn clients_with_debt(db: &DbState) -> Result<Vec<ClientDto>, ApiError> {
    debug!("clients_with_debt command");
    let clients = db.inner().clients().with_debt().await?;
    Ok(clients.into_iter().map(ClientDto::from).collect())
}

pub async fn get_client(db: &DbState, id: &str) -> Result<ClientDto, ApiError> {
    db.inner()
        .clients()
        .get_by_id(id)
        .await?
        .map(ClientDto::from)
        .ok_or_else(|| ApiError::not_found("Client", id))
}

pub async fn create_client(db: &DbState, input: ClientInput) -> Result<ClientDto, ApiError> {
    debug!(name = %input.name, "create_client command");
    let mut client = Client::new("");
    input.apply(&mut client);
    db.inner().clients().insert(&client).await?;
    info!(id = %client.id, "Client created");
    Ok(ClientDto::from(client))
}

/// Edits contact details. The debt is only changed by sales and payments.
pub async fn update_client(db: &DbState, id: &str, input: ClientInput) -> Result<ClientDto, ApiError> {
    debug!(id = %id, "update_client command");
    let clients = db.inner().clients();
    let mut client = clients
        .get_by_id(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Client", id))?;
    input.apply(&mut client);
    clients.update(&client).await?;
    Ok(ClientDto::from(client))
}

pub async fn delete_client(db: &DbState, id: &str) -> Result<(), ApiError> {
    debug!(id = %id, "delete_client command");
    db.inner().clients().delete(id).await?;
    Ok(())
}

/// Takes a debt payment from a client.
pub async fn record_client_payment(
    db: &DbState,
    client_id: &str,
    amount_cents: i64,
    method: PaymentMethod,
    notes: Option<String>,
) -> Result<PaymentDto, ApiError> {
    debug!(client_id = %client_id, amount_cents, %method, "record_client_payment command");
    let payment = db
        .inner()
        .accounts()
        .record_payment(client_id, amount_cents, method, blank_to_none(notes))
        .await?;
    Ok(PaymentDto::from(payment))
}

pub async fn client_account(db: &DbState, id: &str) -> Result<ClientAccount, ApiError> {
    debug!(id = %id, "client_account command");
    let client = get_client(db, id).await?;
    let sales = db.inner().sales().by_client(id).await?;
    let payments = db.inner().payments().by_client(id).await?;

    Ok(ClientAccount {
        client,
        sales: sales.into_iter().map(SaleDto::from).collect(),
        payments: payments.into_iter().map(PaymentDto::from).collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use vetpos_db::{Database, DbConfig};

    async fn test_db() -> DbState {
        DbState::new(Database::new(DbConfig::in_memory()).await.unwrap())
    }

    #[tokio::test]
    async fn test_create_trims_blank_fields() {
        let db = test_db().await;
        let created = create_client(
            &db,
            ClientInput {
                name: " Ana Torres ".to_string(),
                phone: Some("   ".to_string()),
                ..ClientInput::default()
            },
        )
        .await
        .unwrap();

        assert_eq!(created.name, "Ana Torres");
        assert_eq!(created.phone, None);
        assert_eq!(search_clients(&db, "torres").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_payment_creates_credit() {
        let db = test_db().await;
        let client = create_client(
            &db,
            ClientInput {
                name: "Luis Paredes".to_string(),
                ..ClientInput::default()
            },
        )
        .await
        .unwrap();

        let payment = record_client_payment(&db, &client.id, 1500, PaymentMethod::Cash, Some(String::new()))
            .await
            .unwrap();
        assert_eq!(payment.notes, None);

        let account = client_account(&db, &client.id).await.unwrap();
        assert_eq!(account.client.debt_cents, -1500);
        assert_eq!(account.payments.len(), 1);
        assert!(account.sales.is_empty());

        let err = record_client_payment(&db, &client.id, 0, PaymentMethod::Cash, None)
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);

        let err = record_client_payment(&db, "missing", 100, PaymentMethod::Card, None)
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);
    }
}
