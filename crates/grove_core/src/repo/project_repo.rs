//! Project repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Provide create/read/update/delete plus hierarchy queries over the
//!   `projects` table.
//! - Keep SQL details inside the persistence boundary.
//!
//! # Invariants
//! - `name` uniqueness is enforced by the store; violations surface as
//!   `AlreadyExists`.
//! - `ecosystem_id` is written once at creation and never updated.
//! - Deleting a project cascades to all descendant projects.

use crate::error::{RegistryError, RegistryResult};
use crate::model::ecosystem::EcosystemId;
use crate::model::project::{Project, ProjectId};
use crate::model::EntityKind;
use crate::repo::translate_write_error;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};

const PROJECT_SELECT_SQL: &str = "SELECT
    id,
    name,
    title,
    ecosystem_id,
    parent_id,
    last_modified
FROM projects";

/// Filter options for listing projects.
#[derive(Debug, Clone, Default)]
pub struct ProjectQuery {
    pub id: Option<ProjectId>,
    pub name: Option<String>,
    pub title: Option<String>,
    pub ecosystem: Option<EcosystemId>,
    pub has_parent: Option<bool>,
    /// Case-insensitive substring match over name and title.
    pub term: Option<String>,
}

/// Storage contract for project records.
pub trait ProjectRepository {
    fn create(
        &self,
        name: &str,
        title: Option<&str>,
        ecosystem: EcosystemId,
        parent: Option<ProjectId>,
    ) -> RegistryResult<Project>;
    fn get(&self, id: ProjectId) -> RegistryResult<Option<Project>>;
    fn update(&self, project: &Project) -> RegistryResult<Project>;
    fn set_parent(&self, id: ProjectId, parent: Option<ProjectId>) -> RegistryResult<Project>;
    fn delete(&self, id: ProjectId) -> RegistryResult<()>;
    fn children_of(&self, id: ProjectId) -> RegistryResult<Vec<ProjectId>>;
    fn list(&self, query: &ProjectQuery) -> RegistryResult<Vec<Project>>;
}

/// SQLite-backed project repository.
pub struct SqliteProjectRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteProjectRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    fn load_required(&self, id: ProjectId) -> RegistryResult<Project> {
        self.get(id)?.ok_or(RegistryError::NotFound {
            kind: EntityKind::Project,
            id,
        })
    }
}

impl ProjectRepository for SqliteProjectRepository<'_> {
    fn create(
        &self,
        name: &str,
        title: Option<&str>,
        ecosystem: EcosystemId,
        parent: Option<ProjectId>,
    ) -> RegistryResult<Project> {
        self.conn
            .execute(
                "INSERT INTO projects (name, title, ecosystem_id, parent_id)
                 VALUES (?1, ?2, ?3, ?4);",
                params![name, title, ecosystem, parent],
            )
            .map_err(|err| translate_write_error(err, EntityKind::Project, name))?;

        self.load_required(self.conn.last_insert_rowid())
    }

    fn get(&self, id: ProjectId) -> RegistryResult<Option<Project>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{PROJECT_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query(params![id])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_project_row(row)?));
        }
        Ok(None)
    }

    fn update(&self, project: &Project) -> RegistryResult<Project> {
        let changed = self
            .conn
            .execute(
                "UPDATE projects
                 SET
                    name = ?1,
                    title = ?2,
                    last_modified = (strftime('%s', 'now') * 1000)
                 WHERE id = ?3;",
                params![project.name, project.title, project.id],
            )
            .map_err(|err| translate_write_error(err, EntityKind::Project, &project.name))?;

        if changed == 0 {
            return Err(RegistryError::NotFound {
                kind: EntityKind::Project,
                id: project.id,
            });
        }

        self.load_required(project.id)
    }

    fn set_parent(&self, id: ProjectId, parent: Option<ProjectId>) -> RegistryResult<Project> {
        let changed = self.conn.execute(
            "UPDATE projects
             SET
                parent_id = ?1,
                last_modified = (strftime('%s', 'now') * 1000)
             WHERE id = ?2;",
            params![parent, id],
        )?;

        if changed == 0 {
            return Err(RegistryError::NotFound {
                kind: EntityKind::Project,
                id,
            });
        }

        self.load_required(id)
    }

    fn delete(&self, id: ProjectId) -> RegistryResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM projects WHERE id = ?1;", params![id])?;
        if changed == 0 {
            return Err(RegistryError::NotFound {
                kind: EntityKind::Project,
                id,
            });
        }
        Ok(())
    }

    fn children_of(&self, id: ProjectId) -> RegistryResult<Vec<ProjectId>> {
        let mut stmt = self.conn.prepare(
            "SELECT id
             FROM projects
             WHERE parent_id = ?1
             ORDER BY id ASC;",
        )?;
        let mut rows = stmt.query(params![id])?;
        let mut ids = Vec::new();
        while let Some(row) = rows.next()? {
            ids.push(row.get(0)?);
        }
        Ok(ids)
    }

    fn list(&self, query: &ProjectQuery) -> RegistryResult<Vec<Project>> {
        let mut sql = format!("{PROJECT_SELECT_SQL} WHERE 1 = 1");
        let mut bind_values: Vec<Value> = Vec::new();

        if let Some(id) = query.id {
            sql.push_str(" AND id = ?");
            bind_values.push(Value::Integer(id));
        }
        if let Some(name) = &query.name {
            sql.push_str(" AND name = ?");
            bind_values.push(Value::Text(name.clone()));
        }
        if let Some(title) = &query.title {
            sql.push_str(" AND title = ?");
            bind_values.push(Value::Text(title.clone()));
        }
        if let Some(ecosystem) = query.ecosystem {
            sql.push_str(" AND ecosystem_id = ?");
            bind_values.push(Value::Integer(ecosystem));
        }
        if let Some(has_parent) = query.has_parent {
            if has_parent {
                sql.push_str(" AND parent_id IS NOT NULL");
            } else {
                sql.push_str(" AND parent_id IS NULL");
            }
        }
        if let Some(term) = &query.term {
            sql.push_str(" AND (name LIKE '%' || ? || '%' OR title LIKE '%' || ? || '%')");
            bind_values.push(Value::Text(term.clone()));
            bind_values.push(Value::Text(term.clone()));
        }

        sql.push_str(" ORDER BY name ASC");

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut projects = Vec::new();
        while let Some(row) = rows.next()? {
            projects.push(parse_project_row(row)?);
        }
        Ok(projects)
    }
}

fn parse_project_row(row: &Row<'_>) -> RegistryResult<Project> {
    Ok(Project {
        id: row.get("id")?,
        name: row.get("name")?,
        title: row.get("title")?,
        ecosystem_id: row.get("ecosystem_id")?,
        parent_id: row.get("parent_id")?,
        last_modified: row.get("last_modified")?,
    })
}
