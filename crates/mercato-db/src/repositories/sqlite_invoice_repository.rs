//! `SQLite` implementation of the `InvoiceRepository` trait.
//!
//! Items are stored with their computed line amount; invoice totals are
//! derived from the items on every read.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::{Sqlite, SqlitePool, Transaction};

use mercato_core::{
    Invoice, InvoiceInput, InvoiceItem, InvoiceRepository, InvoiceStatus, InvoiceTotals,
    RepositoryError, line_amount,
};

use super::row_mappers::{
    INVOICE_ITEM_SELECT_COLUMNS, INVOICE_SELECT_COLUMNS, col, date, date_col, enum_col, now,
    opt_date_col, row_to_invoice_item, storage, ts_col, write_error,
};
use super::sqlite_crm_repository::not_found;

fn row_to_invoice(row: &SqliteRow, items: Vec<InvoiceItem>) -> Result<Invoice, RepositoryError> {
    let tax_rate_bps: i64 = col(row, "tax_rate_bps")?;
    Ok(Invoice {
        id: col(row, "id")?,
        owner_id: col(row, "owner_id")?,
        client_id: col(row, "client_id")?,
        project_id: col(row, "project_id")?,
        number: col(row, "number")?,
        status: enum_col(row, "status", InvoiceStatus::parse)?,
        issue_date: date_col(row, "issue_date")?,
        due_date: opt_date_col(row, "due_date")?,
        tax_rate_bps,
        notes: col(row, "notes")?,
        totals: InvoiceTotals::compute(&items, tax_rate_bps),
        items,
        created_at: ts_col(row, "created_at")?,
        updated_at: ts_col(row, "updated_at")?,
    })
}

async fn insert_items(
    tx: &mut Transaction<'_, Sqlite>,
    invoice_id: i64,
    input: &InvoiceInput,
) -> Result<(), RepositoryError> {
    for (position, item) in (0_i64..).zip(&input.items) {
        sqlx::query(
            r"INSERT INTO invoice_items
              (invoice_id, position, description, quantity, unit_price_cents, amount_cents)
              VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(invoice_id)
        .bind(position)
        .bind(&item.description)
        .bind(item.quantity)
        .bind(item.unit_price_cents)
        .bind(line_amount(item.quantity, item.unit_price_cents))
        .execute(&mut **tx)
        .await
        .map_err(|e| write_error(e, "invoice item"))?;
    }
    Ok(())
}

pub struct SqliteInvoiceRepository {
    pool: SqlitePool,
}

impl SqliteInvoiceRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn items_for(&self, invoice_id: i64) -> Result<Vec<InvoiceItem>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {INVOICE_ITEM_SELECT_COLUMNS} FROM invoice_items WHERE invoice_id = ? ORDER BY position, id"
        ))
        .bind(invoice_id)
        .fetch_all(&self.pool)
        .await
        .map_err(storage)?;

        rows.iter().map(row_to_invoice_item).collect()
    }
}

#[async_trait]
impl InvoiceRepository for SqliteInvoiceRepository {
    async fn list(&self, owner_id: i64) -> Result<Vec<Invoice>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {INVOICE_SELECT_COLUMNS} FROM invoices WHERE owner_id = ? ORDER BY issue_date DESC, id DESC"
        ))
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await
        .map_err(storage)?;

        let item_rows = sqlx::query(
            r"SELECT ii.id, ii.invoice_id, ii.description, ii.quantity, ii.unit_price_cents, ii.amount_cents
              FROM invoice_items ii JOIN invoices i ON i.id = ii.invoice_id
              WHERE i.owner_id = ?
              ORDER BY ii.invoice_id, ii.position, ii.id",
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await
        .map_err(storage)?;

        let mut items: HashMap<i64, Vec<InvoiceItem>> = HashMap::new();
        for row in &item_rows {
            let item = row_to_invoice_item(row)?;
            items.entry(item.invoice_id).or_default().push(item);
        }

        rows.iter()
            .map(|row| {
                let id: i64 = col(row, "id")?;
                row_to_invoice(row, items.remove(&id).unwrap_or_default())
            })
            .collect()
    }

    async fn get(&self, owner_id: i64, id: i64) -> Result<Invoice, RepositoryError> {
        let row = sqlx::query(&format!(
            "SELECT {INVOICE_SELECT_COLUMNS} FROM invoices WHERE owner_id = ? AND id = ?"
        ))
        .bind(owner_id)
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(storage)?
        .ok_or_else(|| not_found("invoice", id))?;

        let items = self.items_for(id).await?;
        row_to_invoice(&row, items)
    }

    async fn insert(
        &self,
        owner_id: i64,
        number: &str,
        input: &InvoiceInput,
    ) -> Result<Invoice, RepositoryError> {
        let stamp = now();
        let issue_date = input.issue_date.unwrap_or_else(|| Utc::now().date_naive());
        let mut tx = self.pool.begin().await.map_err(storage)?;

        let result = sqlx::query(
            r"INSERT INTO invoices
              (owner_id, client_id, project_id, number, status, issue_date, due_date,
               tax_rate_bps, notes, created_at, updated_at)
              VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(owner_id)
        .bind(input.client_id)
        .bind(input.project_id)
        .bind(number)
        .bind(input.status.unwrap_or(InvoiceStatus::Draft).as_str())
        .bind(date(issue_date))
        .bind(input.due_date.map(date))
        .bind(input.tax_rate_bps)
        .bind(&input.notes)
        .bind(&stamp)
        .bind(&stamp)
        .execute(&mut *tx)
        .await
        .map_err(|e| write_error(e, &format!("invoice {number}")))?;

        let id = result.last_insert_rowid();
        insert_items(&mut tx, id, input).await?;
        tx.commit().await.map_err(storage)?;

        self.get(owner_id, id).await
    }

    async fn update(
        &self,
        owner_id: i64,
        id: i64,
        number: &str,
        input: &InvoiceInput,
    ) -> Result<Invoice, RepositoryError> {
        let mut tx = self.pool.begin().await.map_err(storage)?;

        let result = sqlx::query(
            r"UPDATE invoices SET
              client_id = ?, project_id = ?, number = ?, status = COALESCE(?, status),
              issue_date = COALESCE(?, issue_date), due_date = ?, tax_rate_bps = ?, notes = ?,
              updated_at = ?
              WHERE owner_id = ? AND id = ?",
        )
        .bind(input.client_id)
        .bind(input.project_id)
        .bind(number)
        .bind(input.status.map(|s| s.as_str()))
        .bind(input.issue_date.map(date))
        .bind(input.due_date.map(date))
        .bind(input.tax_rate_bps)
        .bind(&input.notes)
        .bind(now())
        .bind(owner_id)
        .bind(id)
        .execute(&mut *tx)
        .await
        .map_err(|e| write_error(e, &format!("invoice {number}")))?;

        if result.rows_affected() == 0 {
            return Err(not_found("invoice", id));
        }

        sqlx::query("DELETE FROM invoice_items WHERE invoice_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(storage)?;
        insert_items(&mut tx, id, input).await?;
        tx.commit().await.map_err(storage)?;

        self.get(owner_id, id).await
    }

    async fn set_status(
        &self,
        owner_id: i64,
        id: i64,
        status: InvoiceStatus,
    ) -> Result<Invoice, RepositoryError> {
        let result =
            sqlx::query("UPDATE invoices SET status = ?, updated_at = ? WHERE owner_id = ? AND id = ?")
                .bind(status.as_str())
                .bind(now())
                .bind(owner_id)
                .bind(id)
                .execute(&self.pool)
                .await
                .map_err(storage)?;

        if result.rows_affected() == 0 {
            return Err(not_found("invoice", id));
        }
        self.get(owner_id, id).await
    }

    async fn delete(&self, owner_id: i64, id: i64) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM invoices WHERE owner_id = ? AND id = ?")
            .bind(owner_id)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(storage)?;

        if result.rows_affected() == 0 {
            return Err(not_found("invoice", id));
        }
        Ok(())
    }

    async fn count_for_year(&self, owner_id: i64, year: i32) -> Result<i64, RepositoryError> {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM invoices WHERE owner_id = ? AND substr(issue_date, 1, 4) = ?",
        )
        .bind(owner_id)
        .bind(format!("{year:04}"))
        .fetch_one(&self.pool)
        .await
        .map_err(storage)?;
        Ok(count)
    }
}
