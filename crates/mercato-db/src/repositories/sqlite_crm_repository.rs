//! `SQLite` implementations of the workspace client, project and task
//! repositories. Every statement filters on `owner_id`.

use async_trait::async_trait;
use sqlx::SqlitePool;

use mercato_core::{
    Client, ClientInput, ClientRepository, Project, ProjectInput, ProjectRepository,
    ProjectStatus, RepositoryError, Task, TaskInput, TaskPriority, TaskRepository, TaskStatus,
};

use super::row_mappers::{
    CLIENT_SELECT_COLUMNS, PROJECT_SELECT_COLUMNS, TASK_SELECT_COLUMNS, date, now, row_to_client,
    row_to_project, row_to_task, storage, write_error,
};

pub(crate) fn not_found(what: &str, id: i64) -> RepositoryError {
    RepositoryError::NotFound(format!("{what} {id}"))
}

pub struct SqliteClientRepository {
    pool: SqlitePool,
}

impl SqliteClientRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ClientRepository for SqliteClientRepository {
    async fn list(&self, owner_id: i64) -> Result<Vec<Client>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {CLIENT_SELECT_COLUMNS} FROM clients WHERE owner_id = ? ORDER BY name COLLATE NOCASE, id"
        ))
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await
        .map_err(storage)?;

        rows.iter().map(row_to_client).collect()
    }

    async fn get(&self, owner_id: i64, id: i64) -> Result<Client, RepositoryError> {
        let row = sqlx::query(&format!(
            "SELECT {CLIENT_SELECT_COLUMNS} FROM clients WHERE owner_id = ? AND id = ?"
        ))
        .bind(owner_id)
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(storage)?
        .ok_or_else(|| not_found("client", id))?;

        row_to_client(&row)
    }

    async fn insert(&self, owner_id: i64, input: &ClientInput) -> Result<Client, RepositoryError> {
        let stamp = now();
        let result = sqlx::query(
            "INSERT INTO clients (owner_id, name, email, company, phone, notes, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(owner_id)
        .bind(&input.name)
        .bind(&input.email)
        .bind(&input.company)
        .bind(&input.phone)
        .bind(&input.notes)
        .bind(&stamp)
        .bind(&stamp)
        .execute(&self.pool)
        .await
        .map_err(|e| write_error(e, "client"))?;

        self.get(owner_id, result.last_insert_rowid()).await
    }

    async fn update(
        &self,
        owner_id: i64,
        id: i64,
        input: &ClientInput,
    ) -> Result<Client, RepositoryError> {
        let result = sqlx::query(
            "UPDATE clients SET name = ?, email = ?, company = ?, phone = ?, notes = ?, updated_at = ? WHERE owner_id = ? AND id = ?",
        )
        .bind(&input.name)
        .bind(&input.email)
        .bind(&input.company)
        .bind(&input.phone)
        .bind(&input.notes)
        .bind(now())
        .bind(owner_id)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| write_error(e, "client"))?;

        if result.rows_affected() == 0 {
            return Err(not_found("client", id));
        }
        self.get(owner_id, id).await
    }

    async fn delete(&self, owner_id: i64, id: i64) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM clients WHERE owner_id = ? AND id = ?")
            .bind(owner_id)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| write_error(e, "client still has invoices"))?;

        if result.rows_affected() == 0 {
            return Err(not_found("client", id));
        }
        Ok(())
    }

    async fn count(&self, owner_id: i64) -> Result<i64, RepositoryError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM clients WHERE owner_id = ?")
            .bind(owner_id)
            .fetch_one(&self.pool)
            .await
            .map_err(storage)?;
        Ok(count)
    }
}

pub struct SqliteProjectRepository {
    pool: SqlitePool,
}

impl SqliteProjectRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProjectRepository for SqliteProjectRepository {
    async fn list(&self, owner_id: i64) -> Result<Vec<Project>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {PROJECT_SELECT_COLUMNS} FROM projects WHERE owner_id = ? ORDER BY created_at DESC, id DESC"
        ))
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await
        .map_err(storage)?;

        rows.iter().map(row_to_project).collect()
    }

    async fn get(&self, owner_id: i64, id: i64) -> Result<Project, RepositoryError> {
        let row = sqlx::query(&format!(
            "SELECT {PROJECT_SELECT_COLUMNS} FROM projects WHERE owner_id = ? AND id = ?"
        ))
        .bind(owner_id)
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(storage)?
        .ok_or_else(|| not_found("project", id))?;

        row_to_project(&row)
    }

    async fn insert(
        &self,
        owner_id: i64,
        input: &ProjectInput,
    ) -> Result<Project, RepositoryError> {
        let stamp = now();
        let result = sqlx::query(
            r"INSERT INTO projects
              (owner_id, client_id, name, description, status, budget_cents, hourly_rate_cents,
               due_date, created_at, updated_at)
              VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(owner_id)
        .bind(input.client_id)
        .bind(&input.name)
        .bind(&input.description)
        .bind(input.status.unwrap_or(ProjectStatus::Active).as_str())
        .bind(input.budget_cents)
        .bind(input.hourly_rate_cents)
        .bind(input.due_date.map(date))
        .bind(&stamp)
        .bind(&stamp)
        .execute(&self.pool)
        .await
        .map_err(|e| write_error(e, "project"))?;

        self.get(owner_id, result.last_insert_rowid()).await
    }

    async fn update(
        &self,
        owner_id: i64,
        id: i64,
        input: &ProjectInput,
    ) -> Result<Project, RepositoryError> {
        let result = sqlx::query(
            r"UPDATE projects SET
              client_id = ?, name = ?, description = ?, status = COALESCE(?, status),
              budget_cents = ?, hourly_rate_cents = ?, due_date = ?, updated_at = ?
              WHERE owner_id = ? AND id = ?",
        )
        .bind(input.client_id)
        .bind(&input.name)
        .bind(&input.description)
        .bind(input.status.map(|s| s.as_str()))
        .bind(input.budget_cents)
        .bind(input.hourly_rate_cents)
        .bind(input.due_date.map(date))
        .bind(now())
        .bind(owner_id)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| write_error(e, "project"))?;

        if result.rows_affected() == 0 {
            return Err(not_found("project", id));
        }
        self.get(owner_id, id).await
    }

    async fn delete(&self, owner_id: i64, id: i64) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM projects WHERE owner_id = ? AND id = ?")
            .bind(owner_id)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| write_error(e, "project"))?;

        if result.rows_affected() == 0 {
            return Err(not_found("project", id));
        }
        Ok(())
    }

    async fn count_with_status(
        &self,
        owner_id: i64,
        status: ProjectStatus,
    ) -> Result<i64, RepositoryError> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM projects WHERE owner_id = ? AND status = ?")
                .bind(owner_id)
                .bind(status.as_str())
                .fetch_one(&self.pool)
                .await
                .map_err(storage)?;
        Ok(count)
    }
}

pub struct SqliteTaskRepository {
    pool: SqlitePool,
}

impl SqliteTaskRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TaskRepository for SqliteTaskRepository {
    async fn list(
        &self,
        owner_id: i64,
        project_id: Option<i64>,
    ) -> Result<Vec<Task>, RepositoryError> {
        let rows = sqlx::query(&format!(
            r"SELECT {TASK_SELECT_COLUMNS} FROM tasks
              WHERE owner_id = ? AND (? IS NULL OR project_id = ?)
              ORDER BY CASE status WHEN 'DONE' THEN 1 ELSE 0 END,
                       CASE priority WHEN 'HIGH' THEN 0 WHEN 'MEDIUM' THEN 1 ELSE 2 END,
                       due_date IS NULL, due_date, id"
        ))
        .bind(owner_id)
        .bind(project_id)
        .bind(project_id)
        .fetch_all(&self.pool)
        .await
        .map_err(storage)?;

        rows.iter().map(row_to_task).collect()
    }

    async fn get(&self, owner_id: i64, id: i64) -> Result<Task, RepositoryError> {
        let row = sqlx::query(&format!(
            "SELECT {TASK_SELECT_COLUMNS} FROM tasks WHERE owner_id = ? AND id = ?"
        ))
        .bind(owner_id)
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(storage)?
        .ok_or_else(|| not_found("task", id))?;

        row_to_task(&row)
    }

    async fn insert(&self, owner_id: i64, input: &TaskInput) -> Result<Task, RepositoryError> {
        let stamp = now();
        let result = sqlx::query(
            r"INSERT INTO tasks
              (owner_id, project_id, title, description, status, priority, due_date, created_at, updated_at)
              VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(owner_id)
        .bind(input.project_id)
        .bind(&input.title)
        .bind(&input.description)
        .bind(input.status.unwrap_or(TaskStatus::Todo).as_str())
        .bind(input.priority.unwrap_or(TaskPriority::Medium).as_str())
        .bind(input.due_date.map(date))
        .bind(&stamp)
        .bind(&stamp)
        .execute(&self.pool)
        .await
        .map_err(|e| write_error(e, "task"))?;

        self.get(owner_id, result.last_insert_rowid()).await
    }

    async fn update(
        &self,
        owner_id: i64,
        id: i64,
        input: &TaskInput,
    ) -> Result<Task, RepositoryError> {
        let result = sqlx::query(
            r"UPDATE tasks SET
              project_id = ?, title = ?, description = ?, status = COALESCE(?, status),
              priority = COALESCE(?, priority), due_date = ?, updated_at = ?
              WHERE owner_id = ? AND id = ?",
        )
        .bind(input.project_id)
        .bind(&input.title)
        .bind(&input.description)
        .bind(input.status.map(|s| s.as_str()))
        .bind(input.priority.map(|p| p.as_str()))
        .bind(input.due_date.map(date))
        .bind(now())
        .bind(owner_id)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| write_error(e, "task"))?;

        if result.rows_affected() == 0 {
            return Err(not_found("task", id));
        }
        self.get(owner_id, id).await
    }

    async fn delete(&self, owner_id: i64, id: i64) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM tasks WHERE owner_id = ? AND id = ?")
            .bind(owner_id)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(storage)?;

        if result.rows_affected() == 0 {
            return Err(not_found("task", id));
        }
        Ok(())
    }

    async fn count_open(&self, owner_id: i64) -> Result<i64, RepositoryError> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM tasks WHERE owner_id = ? AND status != 'DONE'")
                .bind(owner_id)
                .fetch_one(&self.pool)
                .await
                .map_err(storage)?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::factory::TestDb;
    use mercato_core::{NewUser, UserRepository, UserRole};

    async fn two_owners(db: &TestDb) -> (i64, i64) {
        let users = db.user_repository();
        let mut ids = Vec::new();
        for email in ["one@x.co", "two@x.co"] {
            let user = users
                .insert(&NewUser {
                    email: email.into(),
                    password_hash: "h".into(),
                    name: email.into(),
                    role: UserRole::Freelancer,
                })
                .await
                .unwrap();
            ids.push(user.id);
        }
        (ids[0], ids[1])
    }

    #[tokio::test]
    async fn test_foreign_task_is_not_found() {
        let db = TestDb::new().await.unwrap();
        let (owner, stranger) = two_owners(&db).await;
        let tasks = db.task_repository();
        let task = tasks
            .insert(
                owner,
                &TaskInput {
                    title: "Draft".into(),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(task.status, TaskStatus::Todo);
        assert_eq!(task.priority, TaskPriority::Medium);

        assert!(matches!(
            tasks.get(stranger, task.id).await.unwrap_err(),
            RepositoryError::NotFound(_)
        ));
        assert!(matches!(
            tasks.delete(stranger, task.id).await.unwrap_err(),
            RepositoryError::NotFound(_)
        ));
        tasks.delete(owner, task.id).await.unwrap();
    }

    #[tokio::test]
    async fn test_update_keeps_status_when_omitted() {
        let db = TestDb::new().await.unwrap();
        let (owner, _) = two_owners(&db).await;
        let projects = db.project_repository();
        let project = projects
            .insert(
                owner,
                &ProjectInput {
                    name: "Site".into(),
                    status: Some(ProjectStatus::OnHold),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let updated = projects
            .update(
                owner,
                project.id,
                &ProjectInput {
                    name: "Site v2".into(),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.name, "Site v2");
        assert_eq!(updated.status, ProjectStatus::OnHold);
        assert_eq!(
            projects
                .count_with_status(owner, ProjectStatus::OnHold)
                .await
                .unwrap(),
            1
        );
    }

    #[tokio::test]
    async fn test_counts_are_owner_scoped() {
        let db = TestDb::new().await.unwrap();
        let (owner, stranger) = two_owners(&db).await;
        let clients = db.client_repository();
        clients
            .insert(
                owner,
                &ClientInput {
                    name: "Acme".into(),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(clients.count(owner).await.unwrap(), 1);
        assert_eq!(clients.count(stranger).await.unwrap(), 0);
        assert!(clients.list(stranger).await.unwrap().is_empty());
    }
}
