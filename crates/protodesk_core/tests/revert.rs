use protodesk_core::{
    render_document, Category, ChangeOp, Document, Field, FieldRow, MemoryDocumentRepository,
    SchemaSession, SessionError, Unit, UnitDraft,
};

fn session_with(baseline: Document) -> SchemaSession<MemoryDocumentRepository> {
    let markup = render_document(&baseline).unwrap();
    let mut session = SchemaSession::new(MemoryDocumentRepository::with_content(markup));
    session.open().unwrap();
    session
}

fn color_baseline() -> Document {
    let mut doc = Document::new();
    doc.push_unit(
        Category::Enum,
        Unit::enumeration(
            "Enum_Color",
            vec![
                Field::new("Red", 0).with_comment(""),
                Field::new("Green", 1).with_comment(""),
            ],
        ),
    );
    doc
}

fn three_colors() -> UnitDraft {
    UnitDraft::new(Category::Enum, "Enum_Color")
        .with_row(FieldRow::new("Red", "0"))
        .with_row(FieldRow::new("Green", "1"))
        .with_row(FieldRow::new("Blue", "2"))
}

#[test]
fn revert_update_restores_baseline_version() {
    let mut session = session_with(color_baseline());
    session.add_or_update_unit(&three_colors()).unwrap();
    assert_eq!(session.changed_units().unwrap(), ["[update]Enum_Color"]);

    let op = session.revert_unit(Category::Enum, "Enum_Color").unwrap();

    assert_eq!(op, ChangeOp::Update);
    let restored = session.unit(Category::Enum, "Enum_Color").unwrap();
    assert_eq!(restored.fields().len(), 2);
    assert!(session.delta().unwrap().is_empty());
    assert!(session.changed_units().unwrap().is_empty());
}

#[test]
fn revert_add_keeps_unit_in_working() {
    let mut session = session_with(color_baseline());
    session
        .add_or_update_unit(&UnitDraft::new(Category::Data, "Data_Session"))
        .unwrap();

    let op = session.revert_unit(Category::Data, "Data_Session").unwrap();

    assert_eq!(op, ChangeOp::Add);
    assert!(session.unit(Category::Data, "Data_Session").is_ok());
    assert_eq!(session.changed_units().unwrap(), ["[add]Data_Session"]);
}

#[test]
fn revert_delete_reinserts_baseline_subtree() {
    let mut baseline = color_baseline();
    let login = Unit::message(
        "Ptc_Login",
        vec![Field::new("account", 1)
            .with_option("optional")
            .with_type("string")
            .with_comment("user account")],
    )
    .with_comment("login request");
    baseline.push_unit(Category::Protocol, login.clone());
    let mut session = session_with(baseline);

    let removed = session.delete_unit(Category::Protocol, "Ptc_Login").unwrap();
    assert_eq!(removed, login);
    assert_eq!(session.changed_units().unwrap(), ["[delete]Ptc_Login"]);

    let op = session.revert_unit(Category::Protocol, "Ptc_Login").unwrap();

    assert_eq!(op, ChangeOp::Delete);
    assert_eq!(session.unit(Category::Protocol, "Ptc_Login").unwrap(), &login);
    assert!(session.delta().unwrap().is_empty());
}

#[test]
fn second_revert_leaves_tree_content_unchanged() {
    let mut session = session_with(color_baseline());
    session.add_or_update_unit(&three_colors()).unwrap();

    session.revert_unit(Category::Enum, "Enum_Color").unwrap();
    let after_first = session.working().unwrap().clone();

    // The unit no longer differs from baseline, so there is nothing to revert.
    let second = session.revert_unit(Category::Enum, "Enum_Color");
    assert!(matches!(
        second,
        Err(SessionError::CategoryNotFound(Category::Enum))
    ));
    assert_eq!(session.working().unwrap(), &after_first);
}

#[test]
fn failed_revert_mutates_nothing() {
    let mut session = session_with(color_baseline());
    session
        .add_or_update_unit(&UnitDraft::new(Category::Data, "Data_Session"))
        .unwrap();
    let working_before = session.working().unwrap().clone();
    let delta_before = session.delta().unwrap().clone();

    assert!(matches!(
        session.revert_unit(Category::Data, "Data_Missing"),
        Err(SessionError::UnitNotFound { .. })
    ));
    assert!(matches!(
        session.revert_unit(Category::Rpc, "Rpc_Missing"),
        Err(SessionError::CategoryNotFound(Category::Rpc))
    ));

    assert_eq!(session.working().unwrap(), &working_before);
    assert_eq!(session.delta().unwrap(), &delta_before);
}

#[test]
fn revert_before_open_is_not_initialized() {
    let mut session = SchemaSession::new(MemoryDocumentRepository::new());
    assert!(matches!(
        session.revert_unit(Category::Enum, "Enum_Color"),
        Err(SessionError::NotInitialized)
    ));
}
