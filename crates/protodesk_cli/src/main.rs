//! CLI probe for `protodesk_core`.
//!
//! # Responsibility
//! - Verify core crate linkage with deterministic output.
//! - Given a document path, print units per category and pending changes.

use protodesk_core::{Category, SchemaSession, XmlFileRepository};
use std::process::ExitCode;

fn main() -> ExitCode {
    println!("protodesk_core ping={}", protodesk_core::ping());
    println!("protodesk_core version={}", protodesk_core::core_version());

    let Some(path) = std::env::args().nth(1) else {
        return ExitCode::SUCCESS;
    };

    let mut session = SchemaSession::new(XmlFileRepository::new(&path));
    if let Err(err) = session.open() {
        eprintln!("failed to open `{path}`: {err}");
        return ExitCode::FAILURE;
    }

    match summarize(&session) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("failed to summarize `{path}`: {err}");
            ExitCode::FAILURE
        }
    }
}

fn summarize(session: &SchemaSession<XmlFileRepository>) -> protodesk_core::SessionResult<()> {
    let index = session.index()?;
    for category in Category::ALL {
        let members = index.members(category);
        println!("{category} units={} [{}]", members.len(), members.join(", "));
    }
    println!("search keys={}", index.len());

    let changed = session.changed_units()?;
    println!("pending changes={}", changed.len());
    for row in changed {
        println!("  {row}");
    }
    Ok(())
}
