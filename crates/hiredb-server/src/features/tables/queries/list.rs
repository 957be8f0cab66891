use chrono::{DateTime, Utc};
use hiredb_common::types::{Department, HiredEmployee, Job, TableName};
use hiredb_common::HiredbError;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::features::shared::pagination::{Paginated, PaginationParams};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListRowsQuery {
    pub table_name: String,
    #[serde(flatten)]
    pub pagination: PaginationParams,
}

/// One row of any of the three tables
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum TableRow {
    Department(Department),
    Job(Job),
    HiredEmployee(HiredEmployee),
}

pub type ListRowsResponse = Paginated<TableRow>;

#[derive(Debug, thiserror::Error)]
pub enum ListRowsError {
    #[error(transparent)]
    UnknownTable(#[from] HiredbError),
    #[error("{0}")]
    InvalidPagination(&'static str),
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, sqlx::FromRow)]
struct NamedRow {
    id: i32,
    name: String,
}

#[derive(Debug, sqlx::FromRow)]
struct HiredEmployeeRow {
    id: i32,
    name: String,
    hire_timestamp: DateTime<Utc>,
    department_id: i32,
    job_id: i32,
}

impl ListRowsQuery {
    pub fn validate(&self) -> Result<TableName, ListRowsError> {
        let table = self.table_name.parse::<TableName>()?;
        self.pagination
            .validate()
            .map_err(ListRowsError::InvalidPagination)?;
        Ok(table)
    }
}

#[tracing::instrument(skip(pool))]
pub async fn handle(pool: PgPool, query: ListRowsQuery) -> Result<ListRowsResponse, ListRowsError> {
    let table = query.validate()?;
    let limit = query.pagination.per_page();
    let offset = query.pagination.offset();

    // Table names come from the closed TableName set, never from user text
    let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", table.as_str()))
        .fetch_one(&pool)
        .await?;

    let items = match table {
        TableName::Departments | TableName::Jobs => {
            let sql = format!(
                "SELECT id, name FROM {} ORDER BY id LIMIT $1 OFFSET $2",
                table.as_str()
            );
            let rows: Vec<NamedRow> = sqlx::query_as(&sql)
                .bind(limit)
                .bind(offset)
                .fetch_all(&pool)
                .await?;

            rows.into_iter()
                .map(|r| match table {
                    TableName::Jobs => TableRow::Job(Job { id: r.id, name: r.name }),
                    _ => TableRow::Department(Department { id: r.id, name: r.name }),
                })
                .collect()
        },
        TableName::HiredEmployees => {
            let rows: Vec<HiredEmployeeRow> = sqlx::query_as(
                r#"
                SELECT id, name, hire_timestamp, department_id, job_id
                FROM hired_employees
                ORDER BY id
                LIMIT $1 OFFSET $2
                "#,
            )
            .bind(limit)
            .bind(offset)
            .fetch_all(&pool)
            .await?;

            rows.into_iter()
                .map(|r| {
                    TableRow::HiredEmployee(HiredEmployee {
                        id: r.id,
                        name: r.name,
                        hire_timestamp: r.hire_timestamp,
                        department_id: r.department_id,
                        job_id: r.job_id,
                    })
                })
                .collect()
        },
    };

    Ok(Paginated::from_items(items, &query.pagination, total))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::shared::pagination::MAX_PER_PAGE;

    fn query(table: &str, page: Option<i64>, per_page: Option<i64>) -> ListRowsQuery {
        ListRowsQuery {
            table_name: table.to_string(),
            pagination: PaginationParams::new(page, per_page),
        }
    }

    #[test]
    fn test_validation_success() {
        assert_eq!(query("jobs", Some(1), Some(20)).validate().unwrap(), TableName::Jobs);
    }

    #[test]
    fn test_validation_unknown_table() {
        assert!(matches!(
            query("widgets", None, None).validate(),
            Err(ListRowsError::UnknownTable(HiredbError::UnknownTable(_)))
        ));
    }

    #[test]
    fn test_validation_invalid_per_page() {
        assert!(matches!(
            query("jobs", Some(1), Some(MAX_PER_PAGE + 1)).validate(),
            Err(ListRowsError::InvalidPagination(_))
        ));
        assert!(query("jobs", Some(1), Some(MAX_PER_PAGE)).validate().is_ok());
    }

    #[test]
    fn test_validation_page_overflowing_offset() {
        assert!(matches!(
            query("jobs", Some(i64::MAX), Some(50)).validate(),
            Err(ListRowsError::InvalidPagination("Page is out of range"))
        ));
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn test_handle_pages_through_departments(pool: PgPool) -> sqlx::Result<()> {
        sqlx::query(
            "INSERT INTO departments (id, name) VALUES (1, 'Sales'), (2, 'Eng'), (3, 'Ops')",
        )
        .execute(&pool)
        .await?;

        let page = handle(pool.clone(), query("departments", Some(2), Some(2))).await.unwrap();

        assert_eq!(page.pagination.total, 3);
        assert_eq!(page.pagination.pages, 2);
        assert_eq!(
            page.items,
            vec![TableRow::Department(Department { id: 3, name: "Ops".into() })]
        );
        Ok(())
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn test_handle_lists_hired_employees(pool: PgPool) -> sqlx::Result<()> {
        sqlx::query("INSERT INTO departments (id, name) VALUES (1, 'Sales')")
            .execute(&pool)
            .await?;
        sqlx::query("INSERT INTO jobs (id, name) VALUES (1, 'Analyst')")
            .execute(&pool)
            .await?;
        sqlx::query(
            "INSERT INTO hired_employees (id, name, hire_timestamp, department_id, job_id) \
             VALUES (10, 'Ana', '2021-07-27T16:02:08Z', 1, 1)",
        )
        .execute(&pool)
        .await?;

        let page = handle(pool, query("hired_employees", None, None)).await.unwrap();

        match &page.items[..] {
            [TableRow::HiredEmployee(e)] => {
                assert_eq!(e.id, 10);
                assert_eq!(e.hire_timestamp.to_rfc3339(), "2021-07-27T16:02:08+00:00");
            },
            other => panic!("unexpected rows: {other:?}"),
        }
        Ok(())
    }
}
