//! Editing session over one schema document.
//!
//! # Responsibility
//! - Own the baseline, the working copy and the derived delta and index.
//! - Apply validated mutations and reverts to the working copy.
//! - Resynchronize derived state after every successful mutation.
//!
//! # Invariants
//! - Delta and index are recomputed in full from (baseline, working) on every
//!   synchronization; they are never patched.
//! - A rejected request leaves every document untouched.
//! - Baseline only changes at open/save boundaries.

use super::unit_input::{UnitDraft, UnitInputError};
use crate::diff::engine::compute_delta;
use crate::model::delta::{ChangeOp, Delta};
use crate::model::document::Document;
use crate::model::unit::{is_primitive_type, Category, RpcKind, RpcPart, Unit, UnitBody, PRIMITIVE_TYPES};
use crate::repo::{DocumentRepository, RepoError};
use crate::search::name_index::SearchIndex;
use log::{error, info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;

pub type SessionResult<T> = Result<T, SessionError>;

/// Errors from session operations.
#[derive(Debug)]
pub enum SessionError {
    /// No document is open.
    NotInitialized,
    CategoryNotFound(Category),
    UnitNotFound { category: Category, name: String },
    /// Caller-supplied rows were rejected before mutation.
    Validation(UnitInputError),
    Repo(RepoError),
}

impl Display for SessionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotInitialized => write!(f, "no schema document is open"),
            Self::CategoryNotFound(category) => write!(f, "category `{category}` not found"),
            Self::UnitNotFound { category, name } => {
                write!(f, "unit `{name}` not found in category `{category}`")
            }
            Self::Validation(err) => write!(f, "invalid unit definition: {err}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for SessionError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<UnitInputError> for SessionError {
    fn from(value: UnitInputError) -> Self {
        Self::Validation(value)
    }
}

impl From<RepoError> for SessionError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

#[derive(Debug)]
struct SessionState {
    baseline: Document,
    working: Document,
    delta: Delta,
    index: SearchIndex,
    changed: Vec<String>,
}

impl SessionState {
    fn from_baseline(baseline: Document) -> Self {
        let working = baseline.clone();
        let mut state = Self {
            baseline,
            working,
            delta: Delta::new(),
            index: SearchIndex::default(),
            changed: Vec::new(),
        };
        state.resync();
        state
    }

    fn resync(&mut self) {
        let started_at = Instant::now();
        self.delta = compute_delta(&self.baseline, &self.working);
        self.index = SearchIndex::build(&self.working);
        self.changed = self.delta.changed_units();
        info!(
            "event=session_sync module=service status=ok duration_ms={} units={} changes={} keys={}",
            started_at.elapsed().as_millis(),
            self.working.unit_count(),
            self.delta.len(),
            self.index.len()
        );
    }
}

/// Session manager facade.
///
/// Generic over the repository so file-backed and in-memory documents go
/// through the same lifecycle.
pub struct SchemaSession<R: DocumentRepository> {
    repo: R,
    state: Option<SessionState>,
}

impl<R: DocumentRepository> SchemaSession<R> {
    /// Creates a session with no open document.
    pub fn new(repo: R) -> Self {
        Self { repo, state: None }
    }

    pub fn repository(&self) -> &R {
        &self.repo
    }

    pub fn is_open(&self) -> bool {
        self.state.is_some()
    }

    /// Loads the baseline from the repository and clones the working copy.
    pub fn open(&mut self) -> SessionResult<()> {
        match self.repo.load() {
            Ok(baseline) => {
                info!(
                    "event=session_open module=service status=ok source={}",
                    self.repo.location()
                );
                self.state = Some(SessionState::from_baseline(baseline));
                Ok(())
            }
            Err(err) => {
                error!(
                    "event=session_open module=service status=error source={} error={}",
                    self.repo.location(),
                    err
                );
                Err(err.into())
            }
        }
    }

    /// Starts from an empty document and persists it immediately.
    pub fn create_new(&mut self) -> SessionResult<()> {
        let document = Document::new();
        if let Err(err) = self.repo.save(&document) {
            error!(
                "event=session_create module=service status=error target={} error={}",
                self.repo.location(),
                err
            );
            return Err(err.into());
        }
        info!(
            "event=session_create module=service status=ok target={}",
            self.repo.location()
        );
        self.state = Some(SessionState::from_baseline(document));
        Ok(())
    }

    /// Opens a document obtained elsewhere (e.g. fetched from a remote host).
    ///
    /// Nothing is persisted until [`SchemaSession::save`].
    pub fn open_document(&mut self, baseline: Document) {
        info!(
            "event=session_open module=service status=ok source=document units={}",
            baseline.unit_count()
        );
        self.state = Some(SessionState::from_baseline(baseline));
    }

    /// Commits the working copy: persists it, then promotes it to baseline.
    ///
    /// On a write failure the baseline stays as it was.
    pub fn save(&mut self) -> SessionResult<()> {
        let state = self.state.as_mut().ok_or_else(|| not_initialized("session_save"))?;
        if let Err(err) = self.repo.save(&state.working) {
            error!(
                "event=session_save module=service status=error target={} error={}",
                self.repo.location(),
                err
            );
            return Err(err.into());
        }
        state.baseline = state.working.clone();
        state.resync();
        info!(
            "event=session_save module=service status=ok target={}",
            self.repo.location()
        );
        Ok(())
    }

    /// Drops all documents. Later calls fail with `NotInitialized`.
    pub fn close(&mut self) {
        if self.state.take().is_some() {
            info!("event=session_close module=service status=ok");
        }
    }

    /// Recomputes delta, index and the changed-units listing.
    pub fn synchronize(&mut self) -> SessionResult<()> {
        self.state_mut("session_sync")?.resync();
        Ok(())
    }

    /// Validates `draft` and writes it into the working copy.
    ///
    /// For rpc units that already exist, only the parts named by the draft
    /// are replaced, matched by kind.
    pub fn add_or_update_unit(&mut self, draft: &UnitDraft) -> SessionResult<()> {
        let state = self.state_mut("unit_upsert")?;
        let unit = draft.build().map_err(|err| {
            warn!(
                "event=unit_upsert module=service status=rejected category={} error={}",
                draft.category, err
            );
            SessionError::from(err)
        })?;

        let category = draft.category;
        let Unit {
            name,
            comment,
            body,
        } = unit;
        let exists = state.working.contains_unit(category, &name);
        match body {
            UnitBody::Rpc(parts) if exists => {
                if let Some(current) = state.working.unit_mut(category, &name) {
                    current.comment = comment;
                    for part in parts {
                        current.upsert_part(part);
                    }
                }
            }
            body => {
                state.working.remove_unit(category, &name);
                state.working.push_unit(
                    category,
                    Unit {
                        name: name.clone(),
                        comment,
                        body,
                    },
                );
            }
        }

        info!(
            "event=unit_upsert module=service status=ok category={} unit={}",
            category, name
        );
        state.resync();
        Ok(())
    }

    /// Removes one unit from the working copy and returns it.
    pub fn delete_unit(&mut self, category: Category, name: &str) -> SessionResult<Unit> {
        let state = self.state_mut("unit_delete")?;
        if state.working.category(category).is_none() {
            return Err(log_failure("unit_delete", SessionError::CategoryNotFound(category)));
        }
        let removed = state.working.remove_unit(category, name).ok_or_else(|| {
            log_failure(
                "unit_delete",
                SessionError::UnitNotFound {
                    category,
                    name: name.to_string(),
                },
            )
        })?;

        info!(
            "event=unit_delete module=service status=ok category={} unit={}",
            category, name
        );
        state.resync();
        Ok(removed)
    }

    /// Restores a unit to its baseline version using the delta record.
    ///
    /// `delete` and `update` records put the baseline copy back at the end of
    /// the category; an `add` record changes nothing. Returns the record's
    /// operation.
    pub fn revert_unit(&mut self, category: Category, name: &str) -> SessionResult<ChangeOp> {
        let state = self.state_mut("unit_revert")?;
        let block = state
            .delta
            .category(category)
            .ok_or_else(|| log_failure("unit_revert", SessionError::CategoryNotFound(category)))?;
        let entry = block.find(name).cloned().ok_or_else(|| {
            log_failure(
                "unit_revert",
                SessionError::UnitNotFound {
                    category,
                    name: name.to_string(),
                },
            )
        })?;

        match entry.op {
            ChangeOp::Delete | ChangeOp::Update => {
                state.working.remove_unit(category, name);
                state.working.push_unit(category, entry.unit);
            }
            ChangeOp::Add => {}
        }

        info!(
            "event=unit_revert module=service status=ok category={} unit={} op={}",
            category, name, entry.op
        );
        state.resync();
        Ok(entry.op)
    }

    pub fn baseline(&self) -> SessionResult<&Document> {
        Ok(&self.state_ref()?.baseline)
    }

    pub fn working(&self) -> SessionResult<&Document> {
        Ok(&self.state_ref()?.working)
    }

    pub fn delta(&self) -> SessionResult<&Delta> {
        Ok(&self.state_ref()?.delta)
    }

    pub fn index(&self) -> SessionResult<&SearchIndex> {
        Ok(&self.state_ref()?.index)
    }

    /// Overview rows `[op]UnitName` as of the last synchronization.
    pub fn changed_units(&self) -> SessionResult<&[String]> {
        Ok(&self.state_ref()?.changed)
    }

    /// Working-copy unit by category and name.
    pub fn unit(&self, category: Category, name: &str) -> SessionResult<&Unit> {
        self.state_ref()?
            .working
            .unit(category, name)
            .ok_or_else(|| SessionError::UnitNotFound {
                category,
                name: name.to_string(),
            })
    }

    /// One half of a working-copy rpc unit.
    pub fn rpc_part(&self, name: &str, kind: RpcKind) -> SessionResult<&RpcPart> {
        self.unit(Category::Rpc, name)?
            .part(kind)
            .ok_or_else(|| SessionError::UnitNotFound {
                category: Category::Rpc,
                name: format!("{name}:{kind}"),
            })
    }

    /// Category holding `name`, searching the working copy first and then
    /// the delta (so deleted units stay locatable).
    pub fn locate_unit(&self, name: &str) -> SessionResult<Option<Category>> {
        let state = self.state_ref()?;
        if name.is_empty() {
            return Ok(None);
        }
        Ok(Category::ALL.into_iter().find(|category| {
            state.working.contains_unit(*category, name) || state.delta.contains(*category, name)
        }))
    }

    /// Whether any working-copy category already holds `name`.
    pub fn name_exists(&self, name: &str) -> SessionResult<bool> {
        let state = self.state_ref()?;
        Ok(Category::ALL
            .into_iter()
            .any(|category| state.working.contains_unit(category, name)))
    }

    /// Names usable as a field type: enum, data and protocol units in
    /// document order, optionally followed by the primitive scalar types.
    pub fn usable_entry_types(&self, include_primitives: bool) -> SessionResult<Vec<String>> {
        let state = self.state_ref()?;
        let mut types = [Category::Enum, Category::Data, Category::Protocol]
            .into_iter()
            .flat_map(|category| state.working.units(category))
            .map(|unit| unit.name.clone())
            .collect::<Vec<_>>();
        if include_primitives {
            types.extend(PRIMITIVE_TYPES.iter().map(|name| name.to_string()));
        }
        Ok(types)
    }

    /// Value names of one enum unit, skipping blank names.
    pub fn enum_values(&self, enum_name: &str) -> SessionResult<Vec<String>> {
        Ok(self
            .unit(Category::Enum, enum_name)?
            .fields()
            .iter()
            .filter(|field| !field.name.is_empty())
            .map(|field| field.name.clone())
            .collect())
    }

    /// Whether `type_name` is usable as a field type in the working copy.
    pub fn is_known_type(&self, type_name: &str) -> SessionResult<bool> {
        if is_primitive_type(type_name) {
            return Ok(true);
        }
        let state = self.state_ref()?;
        Ok([Category::Enum, Category::Data, Category::Protocol]
            .into_iter()
            .any(|category| state.working.contains_unit(category, type_name)))
    }

    fn state_ref(&self) -> SessionResult<&SessionState> {
        self.state.as_ref().ok_or(SessionError::NotInitialized)
    }

    fn state_mut(&mut self, event: &str) -> SessionResult<&mut SessionState> {
        self.state.as_mut().ok_or_else(|| not_initialized(event))
    }
}

fn not_initialized(event: &str) -> SessionError {
    log_failure(event, SessionError::NotInitialized)
}

fn log_failure(event: &str, err: SessionError) -> SessionError {
    error!("event={event} module=service status=error error={err}");
    err
}
