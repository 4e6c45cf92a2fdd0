//! Ecosystem repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Provide create/read/update/delete over the `ecosystems` table.
//! - Keep SQL details inside the persistence boundary.
//!
//! # Invariants
//! - `name` uniqueness is enforced by the store; violations surface as
//!   `AlreadyExists`.
//! - Deleting an ecosystem cascades to all of its projects.

use crate::error::{RegistryError, RegistryResult};
use crate::model::ecosystem::{Ecosystem, EcosystemId};
use crate::model::EntityKind;
use crate::repo::translate_write_error;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};

const ECOSYSTEM_SELECT_SQL: &str = "SELECT
    id,
    name,
    title,
    description,
    last_modified
FROM ecosystems";

/// Filter options for listing ecosystems.
#[derive(Debug, Clone, Default)]
pub struct EcosystemQuery {
    pub id: Option<EcosystemId>,
    pub name: Option<String>,
}

/// Storage contract for ecosystem records.
pub trait EcosystemRepository {
    fn create(
        &self,
        name: &str,
        title: Option<&str>,
        description: Option<&str>,
    ) -> RegistryResult<Ecosystem>;
    fn get(&self, id: EcosystemId) -> RegistryResult<Option<Ecosystem>>;
    fn update(&self, ecosystem: &Ecosystem) -> RegistryResult<Ecosystem>;
    fn delete(&self, id: EcosystemId) -> RegistryResult<()>;
    fn list(&self, query: &EcosystemQuery) -> RegistryResult<Vec<Ecosystem>>;
}

/// SQLite-backed ecosystem repository.
pub struct SqliteEcosystemRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteEcosystemRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    fn load_required(&self, id: EcosystemId) -> RegistryResult<Ecosystem> {
        self.get(id)?.ok_or(RegistryError::NotFound {
            kind: EntityKind::Ecosystem,
            id,
        })
    }
}

impl EcosystemRepository for SqliteEcosystemRepository<'_> {
    fn create(
        &self,
        name: &str,
        title: Option<&str>,
        description: Option<&str>,
    ) -> RegistryResult<Ecosystem> {
        self.conn
            .execute(
                "INSERT INTO ecosystems (name, title, description)
                 VALUES (?1, ?2, ?3);",
                params![name, title, description],
            )
            .map_err(|err| translate_write_error(err, EntityKind::Ecosystem, name))?;

        self.load_required(self.conn.last_insert_rowid())
    }

    fn get(&self, id: EcosystemId) -> RegistryResult<Option<Ecosystem>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{ECOSYSTEM_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query(params![id])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_ecosystem_row(row)?));
        }
        Ok(None)
    }

    fn update(&self, ecosystem: &Ecosystem) -> RegistryResult<Ecosystem> {
        let changed = self
            .conn
            .execute(
                "UPDATE ecosystems
                 SET
                    name = ?1,
                    title = ?2,
                    description = ?3,
                    last_modified = (strftime('%s', 'now') * 1000)
                 WHERE id = ?4;",
                params![
                    ecosystem.name,
                    ecosystem.title,
                    ecosystem.description,
                    ecosystem.id,
                ],
            )
            .map_err(|err| translate_write_error(err, EntityKind::Ecosystem, &ecosystem.name))?;

        if changed == 0 {
            return Err(RegistryError::NotFound {
                kind: EntityKind::Ecosystem,
                id: ecosystem.id,
            });
        }

        self.load_required(ecosystem.id)
    }

    fn delete(&self, id: EcosystemId) -> RegistryResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM ecosystems WHERE id = ?1;", params![id])?;
        if changed == 0 {
            return Err(RegistryError::NotFound {
                kind: EntityKind::Ecosystem,
                id,
            });
        }
        Ok(())
    }

    fn list(&self, query: &EcosystemQuery) -> RegistryResult<Vec<Ecosystem>> {
        let mut sql = format!("{ECOSYSTEM_SELECT_SQL} WHERE 1 = 1");
        let mut bind_values: Vec<Value> = Vec::new();

        if let Some(id) = query.id {
            sql.push_str(" AND id = ?");
            bind_values.push(Value::Integer(id));
        }
        if let Some(name) = &query.name {
            sql.push_str(" AND name = ?");
            bind_values.push(Value::Text(name.clone()));
        }

        sql.push_str(" ORDER BY name ASC");

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut ecosystems = Vec::new();
        while let Some(row) = rows.next()? {
            ecosystems.push(parse_ecosystem_row(row)?);
        }
        Ok(ecosystems)
    }
}

fn parse_ecosystem_row(row: &Row<'_>) -> RegistryResult<Ecosystem> {
    Ok(Ecosystem {
        id: row.get("id")?,
        name: row.get("name")?,
        title: row.get("title")?,
        description: row.get("description")?,
        last_modified: row.get("last_modified")?,
    })
}
