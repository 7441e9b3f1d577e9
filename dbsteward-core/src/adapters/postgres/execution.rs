//! Statement execution against PostgreSQL: reads, units of work, ad-hoc queries.

use super::values::{bind_params, decode_cell, decode_row};
use crate::Result;
use crate::adapters::helpers::{classify_sqlx_error, connection_error};
use crate::adapters::{Expectation, PlannedStatement, StepOutcome, UnitOfWork};
use crate::error::AdminError;
use crate::models::{TabularResult, Value};
use crate::sql::Statement;
use sqlx::{Column as _, Executor, PgConnection, PgPool, Statement as _};

/// Runs a parameterized `SELECT` and decodes every row.
pub(crate) async fn fetch_rows(pool: &PgPool, statement: &Statement) -> Result<Vec<Vec<Value>>> {
    tracing::debug!("Fetching rows: {}", statement.sql);

    let rows = bind_params(sqlx::query(&statement.sql), &statement.params)
        .fetch_all(pool)
        .await
        .map_err(|e| classify_sqlx_error("", "Failed to read rows", e))?;

    rows.iter().map(decode_row).collect()
}

/// Executes a unit of work in one transaction.
pub(crate) async fn run_unit(pool: &PgPool, unit: &UnitOfWork) -> Result<Vec<StepOutcome>> {
    let mut tx = pool.begin().await.map_err(connection_error)?;
    let mut outcomes = Vec::with_capacity(unit.steps.len());

    for step in &unit.steps {
        match run_step(&mut *tx, step).await {
            Ok(outcome) => outcomes.push(outcome),
            Err(e) => {
                tracing::error!("{} failed at '{}', rolling back: {}", unit.label, step.table, e);
                if let Err(rollback_error) = tx.rollback().await {
                    tracing::error!("Rollback of {} failed: {}", unit.label, rollback_error);
                }
                return Err(e);
            }
        }
    }

    tx.commit()
        .await
        .map_err(|e| classify_sqlx_error("", format!("Failed to commit {}", unit.label), e))?;

    Ok(outcomes)
}

async fn run_step(conn: &mut PgConnection, step: &PlannedStatement) -> Result<StepOutcome> {
    tracing::debug!("{}: {}", step.table, step.statement.sql);
    let query = bind_params(sqlx::query(&step.statement.sql), &step.statement.params);
    let context = || format!("Statement on '{}' failed", step.table);

    match &step.expect {
        Expectation::ReturningValue { .. } => {
            let row = query
                .fetch_optional(&mut *conn)
                .await
                .map_err(|e| classify_sqlx_error(&step.table, context(), e))?
                .ok_or_else(|| {
                    AdminError::validation(format!("no row returned by insert into '{}'", step.table))
                })?;
            Ok(StepOutcome {
                table: step.table.clone(),
                rows_affected: 1,
                returned: Some(decode_cell(&row, 0)?),
            })
        }
        Expectation::Any | Expectation::AtLeastOneRow { .. } => {
            let rows_affected = query
                .execute(&mut *conn)
                .await
                .map_err(|e| classify_sqlx_error(&step.table, context(), e))?
                .rows_affected();

            if let Expectation::AtLeastOneRow { column, value } = &step.expect
                && rows_affected == 0
            {
                return Err(AdminError::not_found(&step.table, column, value));
            }

            Ok(StepOutcome {
                table: step.table.clone(),
                rows_affected,
                returned: None,
            })
        }
    }
}

/// Runs caller-supplied SQL in a transaction that is always rolled back.
pub(crate) async fn run_query(pool: &PgPool, sql: &str) -> Result<TabularResult> {
    let mut tx = pool.begin().await.map_err(connection_error)?;

    let columns: Vec<String> = {
        let prepared = (&mut *tx)
            .prepare(sql)
            .await
            .map_err(|e| classify_sqlx_error("", "Failed to prepare query", e))?;
        prepared
            .columns()
            .iter()
            .map(|c| c.name().to_string())
            .collect()
    };

    let rows = sqlx::query(sql)
        .fetch_all(&mut *tx)
        .await
        .map_err(|e| classify_sqlx_error("", "Query failed", e))?;

    let rows = rows.iter().map(decode_row).collect::<Result<Vec<_>>>()?;

    if let Err(e) = tx.rollback().await {
        tracing::warn!("Rollback after ad-hoc query failed: {}", e);
    }

    Ok(TabularResult::new(columns, rows))
}

/// Executes DDL statements in one transaction.
pub(crate) async fn execute_script(pool: &PgPool, statements: &[&str]) -> Result<()> {
    let mut tx = pool.begin().await.map_err(connection_error)?;
    for statement in statements {
        tracing::debug!("Executing: {}", statement.trim());
        (&mut *tx)
            .execute(*statement)
            .await
            .map_err(|e| classify_sqlx_error("", "Failed to execute script", e))?;
    }
    tx.commit()
        .await
        .map_err(|e| classify_sqlx_error("", "Failed to commit script", e))
}
