//! # Customer Repository
//!
//! Database operations for customers.
//!
//! ## Duplicate Detection
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  create("maria silva", "123.456")                                       │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  load all customers ──► balcao_core::dedup::find_duplicate              │
//! │       │                                                                 │
//! │       ├── hit:  CoreError::DuplicateCustomer (never silently merged)   │
//! │       └── miss: INSERT                                                 │
//! │                                                                         │
//! │  The customer base of a small shop is small; loading it for the check  │
//! │  keeps the normalization rules in one place (balcao-core).             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Deleting a customer does NOT cascade to their movements: the sales
//! history keeps the stale id and displays the buyer as "removed".

use sqlx::SqlitePool;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{LedgerResult, StoreError, StoreResult};
use crate::events::{ChangeFeed, Collection};
use balcao_core::validation::validate_name;
use balcao_core::{dedup, CoreError, Customer};

/// Payload for creating a customer.
#[derive(Debug, Clone)]
pub struct NewCustomer {
    pub name: String,
    pub identification: Option<String>,
    pub phone: Option<String>,
}

impl NewCustomer {
    /// Creates a payload with just a name.
    pub fn named(name: impl Into<String>) -> Self {
        NewCustomer {
            name: name.into(),
            identification: None,
            phone: None,
        }
    }

    /// Sets the identification document number.
    pub fn identification(mut self, identification: impl Into<String>) -> Self {
        self.identification = Some(identification.into());
        self
    }

    /// Sets the contact phone.
    pub fn phone(mut self, phone: impl Into<String>) -> Self {
        self.phone = Some(phone.into());
        self
    }
}

/// Partial update for a customer. `None` leaves the field unchanged;
/// `Some(None)` on an optional field clears it.
#[derive(Debug, Clone, Default)]
pub struct CustomerUpdate {
    pub name: Option<String>,
    pub identification: Option<Option<String>>,
    pub phone: Option<Option<String>>,
}

/// Repository for customer database operations.
#[derive(Debug, Clone)]
pub struct CustomerRepository {
    pool: SqlitePool,
    feed: ChangeFeed,
}

impl CustomerRepository {
    /// Creates a new CustomerRepository.
    pub fn new(pool: SqlitePool, feed: ChangeFeed) -> Self {
        CustomerRepository { pool, feed }
    }

    /// Creates a customer, rejecting duplicates.
    ///
    /// ## Errors
    /// - `LedgerError::Core(DuplicateCustomer)` when the normalized
    ///   (name, identification) pair collides with an existing record
    /// - `LedgerError::Core(Validation)` for a blank name
    pub async fn create(&self, new: NewCustomer) -> LedgerResult<Customer> {
        let name = validate_name("name", &new.name)?;

        let existing = self.list_all().await?;
        if let Some(hit) =
            dedup::find_duplicate(&existing, &name, new.identification.as_deref(), None)
        {
            debug!(conflicting_id = %hit.id, "Rejected duplicate customer");
            return Err(CoreError::DuplicateCustomer {
                name: hit.name.clone(),
                identification: hit.identification.clone(),
            }
            .into());
        }

        let customer = Customer {
            id: Uuid::new_v4().to_string(),
            name,
            identification: new.identification,
            phone: new.phone,
        };

        sqlx::query(
            r#"
            INSERT INTO customers (id, name, identification, phone)
            VALUES (?1, ?2, ?3, ?4)
            "#,
        )
        .bind(&customer.id)
        .bind(&customer.name)
        .bind(&customer.identification)
        .bind(&customer.phone)
        .execute(&self.pool)
        .await
        .map_err(StoreError::from)?;

        info!(id = %customer.id, name = %customer.name, "Customer created");
        self.feed.publish(Collection::Customers, &customer.id);

        Ok(customer)
    }

    /// Updates a customer, re-running duplicate detection against every
    /// OTHER record (a record never collides with itself).
    pub async fn update(&self, id: &str, update: CustomerUpdate) -> LedgerResult<Customer> {
        let current = self.get_by_id(id).await?;

        let name = match update.name {
            Some(ref name) => validate_name("name", name)?,
            None => current.name.clone(),
        };
        let identification = update
            .identification
            .unwrap_or_else(|| current.identification.clone());
        let phone = update.phone.unwrap_or_else(|| current.phone.clone());

        let existing = self.list_all().await?;
        if let Some(hit) =
            dedup::find_duplicate(&existing, &name, identification.as_deref(), Some(id))
        {
            debug!(conflicting_id = %hit.id, "Rejected duplicate customer on update");
            return Err(CoreError::DuplicateCustomer {
                name: hit.name.clone(),
                identification: hit.identification.clone(),
            }
            .into());
        }

        sqlx::query(
            r#"
            UPDATE customers SET name = ?2, identification = ?3, phone = ?4
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(&name)
        .bind(&identification)
        .bind(&phone)
        .execute(&self.pool)
        .await
        .map_err(StoreError::from)?;

        self.feed.publish(Collection::Customers, id);

        Ok(Customer {
            id: id.to_string(),
            name,
            identification,
            phone,
        })
    }

    /// Deletes a customer. Their movements are untouched and keep the
    /// stale customer id.
    pub async fn delete(&self, id: &str) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM customers WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("Customer", id));
        }

        info!(id = %id, "Customer deleted");
        self.feed.publish(Collection::Customers, id);
        Ok(())
    }

    /// Gets a customer by ID.
    pub async fn get_by_id(&self, id: &str) -> StoreResult<Customer> {
        sqlx::query_as::<_, Customer>(
            "SELECT id, name, identification, phone FROM customers WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| StoreError::not_found("Customer", id))
    }

    /// Lists all customers, ordered by name.
    pub async fn list_all(&self) -> StoreResult<Vec<Customer>> {
        let customers = sqlx::query_as::<_, Customer>(
            "SELECT id, name, identification, phone FROM customers ORDER BY name COLLATE NOCASE",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(customers)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LedgerError;
    use crate::pool::{Database, DbConfig};

    async fn test_db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let db = test_db().await;
        let repo = db.customers();

        let created = repo
            .create(NewCustomer::named("Maria Silva").phone("11 99999-0000"))
            .await
            .unwrap();

        let fetched = repo.get_by_id(&created.id).await.unwrap();
        assert_eq!(fetched.name, "Maria Silva");
        assert_eq!(fetched.phone.as_deref(), Some("11 99999-0000"));
    }

    #[tokio::test]
    async fn test_duplicate_rejected_case_insensitively() {
        let db = test_db().await;
        let repo = db.customers();

        repo.create(NewCustomer::named("Maria Silva")).await.unwrap();
        let err = repo
            .create(NewCustomer::named("  MARIA SILVA "))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            LedgerError::Core(CoreError::DuplicateCustomer { .. })
        ));
    }

    #[tokio::test]
    async fn test_same_name_different_identification_accepted() {
        let db = test_db().await;
        let repo = db.customers();

        repo.create(NewCustomer::named("Maria Silva").identification("123"))
            .await
            .unwrap();
        // distinct identification means a distinct person
        repo.create(NewCustomer::named("Maria Silva").identification("456"))
            .await
            .unwrap();

        assert_eq!(repo.list_all().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_update_does_not_collide_with_self() {
        let db = test_db().await;
        let repo = db.customers();

        let maria = repo.create(NewCustomer::named("Maria Silva")).await.unwrap();
        let updated = repo
            .update(
                &maria.id,
                CustomerUpdate {
                    phone: Some(Some("11 98888-0000".to_string())),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.name, "Maria Silva");
        assert_eq!(updated.phone.as_deref(), Some("11 98888-0000"));
    }

    #[tokio::test]
    async fn test_update_collides_with_other_record() {
        let db = test_db().await;
        let repo = db.customers();

        repo.create(NewCustomer::named("Maria Silva")).await.unwrap();
        let joana = repo.create(NewCustomer::named("Joana Souza")).await.unwrap();

        let err = repo
            .update(
                &joana.id,
                CustomerUpdate {
                    name: Some("maria silva".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            LedgerError::Core(CoreError::DuplicateCustomer { .. })
        ));
    }

    #[tokio::test]
    async fn test_delete_missing_is_not_found() {
        let db = test_db().await;
        let err = db.customers().delete("no-such-id").await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }
}
