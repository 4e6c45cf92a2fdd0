//! Registry engine operations.
//!
//! # Responsibility
//! - Validate inputs, enforce hierarchy invariants, mutate the entity
//!   store and append exactly one operation per mutation to the open
//!   transaction log.
//!
//! # Invariants
//! - The audit payload snapshots arguments before validation touches
//!   them.
//! - Validation and hierarchy checks run before any storage write, so a
//!   rejected mutation leaves no trace.
//! - Every operation joins the storage transaction owned by the log
//!   handle; nothing here commits.

use crate::audit::TransactionsLog;
use crate::error::{RegistryError, RegistryResult};
use crate::model::audit::OpType;
use crate::model::ecosystem::{Ecosystem, EcosystemId};
use crate::model::project::{Project, ProjectId};
use crate::model::EntityKind;
use crate::repo::ecosystem_repo::{EcosystemRepository, SqliteEcosystemRepository};
use crate::repo::project_repo::{ProjectRepository, SqliteProjectRepository};
use crate::validate::{validate_field, validate_name};
use log::info;
use rusqlite::Connection;
use serde_json::{json, Map, Value};
use std::collections::{HashSet, VecDeque};

/// One replace-or-clear slot of a partial update.
///
/// `Keep` leaves the stored value untouched; `Clear` and `Set("")` both
/// store NULL. The raw form (not the normalized one) is what the audit
/// payload records.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum FieldUpdate {
    #[default]
    Keep,
    Clear,
    Set(String),
}

impl FieldUpdate {
    fn is_keep(&self) -> bool {
        matches!(self, Self::Keep)
    }

    fn normalized(&self) -> Option<&str> {
        match self {
            Self::Keep | Self::Clear => None,
            Self::Set(value) if value.is_empty() => None,
            Self::Set(value) => Some(value),
        }
    }

    fn raw(&self) -> Option<Value> {
        match self {
            Self::Keep => None,
            Self::Clear => Some(Value::Null),
            Self::Set(value) => Some(Value::String(value.clone())),
        }
    }
}

/// Recognized fields of an ecosystem update.
///
/// Unrecognized fields cannot be expressed; that is a caller-side type
/// error rather than a silently ignored runtime key.
#[derive(Debug, Clone, Default)]
pub struct EcosystemUpdate {
    /// Rename; validated with the strict name rules.
    pub name: Option<String>,
    pub title: FieldUpdate,
    pub description: FieldUpdate,
}

/// Recognized fields of a project update.
#[derive(Debug, Clone, Default)]
pub struct ProjectUpdate {
    /// Rename; validated with the strict name rules.
    pub name: Option<String>,
    pub title: FieldUpdate,
}

/// Finds an ecosystem by id, failing with `NotFound` when missing.
pub fn find_ecosystem(store: &Connection, id: EcosystemId) -> RegistryResult<Ecosystem> {
    SqliteEcosystemRepository::new(store)
        .get(id)?
        .ok_or(RegistryError::NotFound {
            kind: EntityKind::Ecosystem,
            id,
        })
}

/// Finds a project by id, failing with `NotFound` when missing.
pub fn find_project(store: &Connection, id: ProjectId) -> RegistryResult<Project> {
    SqliteProjectRepository::new(store)
        .get(id)?
        .ok_or(RegistryError::NotFound {
            kind: EntityKind::Project,
            id,
        })
}

/// Adds an ecosystem to the registry.
///
/// `name` must satisfy the strict name rules; `title` and `description`
/// are optional but may not be empty when given. On success one ADD
/// operation targeting the name is appended to `trxl`.
pub fn add_ecosystem(
    trxl: &TransactionsLog<'_>,
    name: &str,
    title: Option<&str>,
    description: Option<&str>,
) -> RegistryResult<Ecosystem> {
    let op_args = json!({
        "name": name,
        "title": title,
        "description": description,
    });

    validate_name(name)?;
    validate_field("title", title, true)?;
    validate_field("description", description, true)?;

    let ecosystem = SqliteEcosystemRepository::new(trxl.store()).create(name, title, description)?;

    trxl.log_operation(OpType::Add, EntityKind::Ecosystem, name, op_args)?;
    info!(
        "event=add_ecosystem module=registry status=ok id={} name={name}",
        ecosystem.id
    );

    Ok(ecosystem)
}

/// Adds a project to an ecosystem, optionally under a parent project.
///
/// The parent, when given, must belong to the same ecosystem; that check
/// runs before anything touches storage. On success one ADD operation
/// targeting the name is appended to `trxl`.
pub fn add_project(
    trxl: &TransactionsLog<'_>,
    ecosystem: &Ecosystem,
    name: &str,
    title: Option<&str>,
    parent: Option<&Project>,
) -> RegistryResult<Project> {
    let op_args = json!({
        "name": name,
        "title": title,
        "ecosystem": ecosystem.id,
        "parent": parent.map(|parent| parent.id),
    });

    validate_name(name)?;
    validate_field("title", title, true)?;

    if parent.is_some_and(|parent| parent.ecosystem_id != ecosystem.id) {
        return Err(RegistryError::InvalidValue(
            "Parent cannot belong to a different ecosystem".to_string(),
        ));
    }

    let project = SqliteProjectRepository::new(trxl.store()).create(
        name,
        title,
        ecosystem.id,
        parent.map(|parent| parent.id),
    )?;

    trxl.log_operation(OpType::Add, EntityKind::Project, name, op_args)?;
    info!(
        "event=add_project module=registry status=ok id={} name={name} ecosystem={}",
        project.id, ecosystem.id
    );

    Ok(project)
}

/// Applies a partial update to an ecosystem.
///
/// Provided fields are validated and applied; `Keep` slots stay
/// untouched. The UPDATE operation targets the id and records the raw
/// input values, not the normalized ones.
pub fn update_ecosystem(
    trxl: &TransactionsLog<'_>,
    ecosystem: &Ecosystem,
    update: &EcosystemUpdate,
) -> RegistryResult<Ecosystem> {
    let mut op_args = Map::new();
    if let Some(name) = &update.name {
        op_args.insert("name".to_string(), Value::String(name.clone()));
    }
    if let Some(raw) = update.title.raw() {
        op_args.insert("title".to_string(), raw);
    }
    if let Some(raw) = update.description.raw() {
        op_args.insert("description".to_string(), raw);
    }
    op_args.insert("id".to_string(), json!(ecosystem.id));

    let mut ecosystem = ecosystem.clone();
    if let Some(name) = &update.name {
        validate_name(name)?;
        ecosystem.name = name.clone();
    }
    if !update.title.is_keep() {
        let title = update.title.normalized();
        validate_field("title", title, true)?;
        ecosystem.title = title.map(str::to_string);
    }
    if !update.description.is_keep() {
        let description = update.description.normalized();
        validate_field("description", description, true)?;
        ecosystem.description = description.map(str::to_string);
    }

    let ecosystem = SqliteEcosystemRepository::new(trxl.store()).update(&ecosystem)?;

    trxl.log_operation(
        OpType::Update,
        EntityKind::Ecosystem,
        &ecosystem.id.to_string(),
        Value::Object(op_args),
    )?;
    info!(
        "event=update_ecosystem module=registry status=ok id={}",
        ecosystem.id
    );

    Ok(ecosystem)
}

/// Applies a partial update to a project.
pub fn update_project(
    trxl: &TransactionsLog<'_>,
    project: &Project,
    update: &ProjectUpdate,
) -> RegistryResult<Project> {
    let mut op_args = Map::new();
    if let Some(name) = &update.name {
        op_args.insert("name".to_string(), Value::String(name.clone()));
    }
    if let Some(raw) = update.title.raw() {
        op_args.insert("title".to_string(), raw);
    }
    op_args.insert("id".to_string(), json!(project.id));

    let mut project = project.clone();
    if let Some(name) = &update.name {
        validate_name(name)?;
        project.name = name.clone();
    }
    if !update.title.is_keep() {
        let title = update.title.normalized();
        validate_field("title", title, true)?;
        project.title = title.map(str::to_string);
    }

    let project = SqliteProjectRepository::new(trxl.store()).update(&project)?;

    trxl.log_operation(
        OpType::Update,
        EntityKind::Project,
        &project.id.to_string(),
        Value::Object(op_args),
    )?;
    info!(
        "event=update_project module=registry status=ok id={}",
        project.id
    );

    Ok(project)
}

/// Removes an ecosystem and, through the store's cascade, all of its
/// projects. Logs a single DELETE operation targeting the id.
pub fn delete_ecosystem(trxl: &TransactionsLog<'_>, ecosystem: &Ecosystem) -> RegistryResult<()> {
    let op_args = json!({ "id": ecosystem.id });

    SqliteEcosystemRepository::new(trxl.store()).delete(ecosystem.id)?;

    trxl.log_operation(
        OpType::Delete,
        EntityKind::Ecosystem,
        &ecosystem.id.to_string(),
        op_args,
    )?;
    info!(
        "event=delete_ecosystem module=registry status=ok id={}",
        ecosystem.id
    );

    Ok(())
}

/// Removes a project and, through the store's cascade, all descendant
/// projects. Logs a single DELETE operation targeting the id.
pub fn delete_project(trxl: &TransactionsLog<'_>, project: &Project) -> RegistryResult<()> {
    let op_args = json!({ "id": project.id });

    SqliteProjectRepository::new(trxl.store()).delete(project.id)?;

    trxl.log_operation(
        OpType::Delete,
        EntityKind::Project,
        &project.id.to_string(),
        op_args,
    )?;
    info!(
        "event=delete_project module=registry status=ok id={}",
        project.id
    );

    Ok(())
}

/// Moves a project under a new parent, or detaches it when `parent` is
/// `None`.
///
/// The new parent must not be the current parent, the project itself, a
/// project of another ecosystem, or a descendant of the project. A
/// detach always passes the ecosystem and descendant checks. Logs one
/// LINK operation targeting the project id.
pub fn link_parent_project(
    trxl: &TransactionsLog<'_>,
    project: &Project,
    parent: Option<&Project>,
) -> RegistryResult<Project> {
    let op_args = json!({
        "id": project.id,
        "parent_id": parent.map(|parent| parent.id),
    });

    if project.parent_id == parent.map(|parent| parent.id) {
        return Err(RegistryError::InvalidValue(
            "Parent is already set to the project".to_string(),
        ));
    }
    if parent.is_some_and(|parent| parent.id == project.id) {
        return Err(RegistryError::InvalidValue(
            "Project cannot be its own parent".to_string(),
        ));
    }
    if parent.is_some_and(|parent| parent.ecosystem_id != project.ecosystem_id) {
        return Err(RegistryError::InvalidValue(
            "Parent cannot belong to a different ecosystem".to_string(),
        ));
    }

    let repo = SqliteProjectRepository::new(trxl.store());
    if let Some(parent) = parent {
        if is_descendant(&repo, parent.id, project.id)? {
            return Err(RegistryError::InvalidValue(
                "Parent cannot be a descendant".to_string(),
            ));
        }
    }

    let project = repo.set_parent(project.id, parent.map(|parent| parent.id))?;

    trxl.log_operation(
        OpType::Link,
        EntityKind::Project,
        &project.id.to_string(),
        op_args,
    )?;
    info!(
        "event=link_parent_project module=registry status=ok id={} parent={:?}",
        project.id, project.parent_id
    );

    Ok(project)
}

/// Breadth-first search for `target` among the descendants of `from`.
///
/// The tree is acyclic by construction; the visited set is a safety net
/// against malformed persisted state, not a core requirement.
fn is_descendant(
    repo: &impl ProjectRepository,
    target: ProjectId,
    from: ProjectId,
) -> RegistryResult<bool> {
    let mut queue = VecDeque::from([from]);
    let mut visited: HashSet<ProjectId> = HashSet::new();

    while let Some(current) = queue.pop_front() {
        for child in repo.children_of(current)? {
            if child == target {
                return Ok(true);
            }
            if visited.insert(child) {
                queue.push_back(child);
            }
        }
    }

    Ok(false)
}
