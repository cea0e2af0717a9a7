//! Core engine for editing protocol schema documents.
//! This crate owns the document model, change tracking and search index.

pub mod config;
pub mod diff;
pub mod logging;
pub mod model;
pub mod naming;
pub mod repo;
pub mod search;
pub mod service;

pub use config::{ConfigError, EditorConfig, OutputDirs, ServerAlias};
pub use diff::engine::{compute_delta, diff_category};
pub use diff::equality::units_equal;
pub use logging::{default_log_level, init_logging, init_logging_from_config, logging_status};
pub use model::delta::{ChangeOp, Delta, DeltaCategory, DeltaEntry};
pub use model::document::{CategoryBlock, Document};
pub use model::unit::{
    is_primitive_type, is_storable_comment, Category, Field, RpcKind, RpcPart, Unit, UnitBody, PRIMITIVE_TYPES,
};
pub use naming::{detect_servers, normalize_proto_name, proto_prefix, NamingError};
pub use repo::{
    parse_delta, parse_document, render_delta, render_document, DocumentRepository,
    MemoryDocumentRepository, RepoError, RepoResult, XmlFileRepository,
};
pub use search::name_index::{SearchHit, SearchIndex};
pub use service::session::{SchemaSession, SessionError, SessionResult};
pub use service::unit_input::{FieldRow, RpcPartDraft, UnitDraft, UnitInputError};

/// Minimal health-check API for the CLI probe.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
