//! XML encoding of schema documents and deltas.
//!
//! # Responsibility
//! - Translate between the generic attributed markup tree and the typed
//!   document model.
//! - Emit indented output with the declaration and stylesheet header.
//!
//! # Invariants
//! - Unit elements are tagged with the unit name; field elements are tagged
//!   with their owner's name.
//! - Field attributes are written in wire order
//!   `EntryOption, EntryType, EntryName, EntryIndex, EntryDefault, EntryComment`.
//! - Only the first comment child of a unit is kept as its comment.

use super::{RepoError, RepoResult};
use crate::model::delta::{ChangeOp, Delta};
use crate::model::document::Document;
use crate::model::unit::{is_storable_comment, Category, Field, RpcKind, RpcPart, Unit, UnitBody};
use quick_xml::events::{BytesDecl, BytesEnd, BytesPI, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

pub const ATTR_ENTRY_OPTION: &str = "EntryOption";
pub const ATTR_ENTRY_TYPE: &str = "EntryType";
pub const ATTR_ENTRY_NAME: &str = "EntryName";
pub const ATTR_ENTRY_INDEX: &str = "EntryIndex";
pub const ATTR_ENTRY_DEFAULT: &str = "EntryDefault";
pub const ATTR_ENTRY_COMMENT: &str = "EntryComment";
pub const ATTR_OPER_TYPE: &str = "opertype";
pub const ATTR_RPC_TYPE: &str = "RpcType";

const STYLESHEET_PI: &str = r#"xml-stylesheet type="text/xsl" href="style.xsl""#;
const INDENT_WIDTH: usize = 4;

#[derive(Debug)]
enum XmlChild {
    Element(XmlElement),
    Comment(String),
}

#[derive(Debug)]
struct XmlElement {
    tag: String,
    attributes: Vec<(String, String)>,
    children: Vec<XmlChild>,
}

impl XmlElement {
    fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    fn push_attribute(&mut self, name: &str, value: impl Into<String>) {
        self.attributes.push((name.to_string(), value.into()));
    }

    fn elements(&self) -> impl Iterator<Item = &XmlElement> {
        self.children.iter().filter_map(|child| match child {
            XmlChild::Element(element) => Some(element),
            XmlChild::Comment(_) => None,
        })
    }

    fn first_comment(&self) -> Option<&str> {
        self.children.iter().find_map(|child| match child {
            XmlChild::Comment(text) => Some(text.as_str()),
            XmlChild::Element(_) => None,
        })
    }
}

/// Decodes a persisted schema document.
pub fn parse_document(input: &str) -> RepoResult<Document> {
    let mut document = Document::new();
    for root in read_forest(input)? {
        let category = category_of(&root)?;
        document.ensure_category(category);
        for element in root.elements() {
            document.push_unit(category, unit_from_element(category, element)?);
        }
    }
    Ok(document)
}

/// Encodes a schema document with the standard header.
pub fn render_document(document: &Document) -> RepoResult<String> {
    let forest = document
        .categories()
        .iter()
        .map(|block| {
            let mut root = XmlElement::new(block.category.as_tag());
            for unit in &block.units {
                root.children
                    .push(XmlChild::Element(unit_to_element(unit, None)));
            }
            root
        })
        .collect::<Vec<_>>();
    write_forest(&forest)
}

/// Encodes a delta; every unit element carries `opertype`.
pub fn render_delta(delta: &Delta) -> RepoResult<String> {
    let forest = delta
        .categories()
        .iter()
        .map(|block| {
            let mut root = XmlElement::new(block.category.as_tag());
            for entry in &block.entries {
                root.children
                    .push(XmlChild::Element(unit_to_element(&entry.unit, Some(entry.op))));
            }
            root
        })
        .collect::<Vec<_>>();
    write_forest(&forest)
}

/// Decodes a delta previously written by [`render_delta`].
pub fn parse_delta(input: &str) -> RepoResult<Delta> {
    let mut delta = Delta::new();
    for root in read_forest(input)? {
        let category = category_of(&root)?;
        for element in root.elements() {
            let op = match element.attribute(ATTR_OPER_TYPE) {
                None => {
                    return Err(RepoError::InvalidChangeTag {
                        element: element.tag.clone(),
                        value: None,
                    })
                }
                Some(value) => ChangeOp::parse(value).ok_or_else(|| RepoError::InvalidChangeTag {
                    element: element.tag.clone(),
                    value: Some(value.to_string()),
                })?,
            };
            delta.record(category, op, unit_from_element(category, element)?);
        }
    }
    Ok(delta)
}

fn category_of(root: &XmlElement) -> RepoResult<Category> {
    Category::from_tag(&root.tag).ok_or_else(|| RepoError::UnknownCategory(root.tag.clone()))
}

fn unit_from_element(category: Category, element: &XmlElement) -> RepoResult<Unit> {
    let body = match category {
        Category::Enum => UnitBody::Enum(fields_from_children(element)?),
        Category::Data | Category::Protocol => UnitBody::Message(fields_from_children(element)?),
        Category::Rpc => UnitBody::Rpc(
            element
                .elements()
                .map(part_from_element)
                .collect::<RepoResult<Vec<_>>>()?,
        ),
    };
    Ok(Unit {
        name: element.tag.clone(),
        comment: element.first_comment().map(str::to_string),
        body,
    })
}

fn part_from_element(element: &XmlElement) -> RepoResult<RpcPart> {
    let raw_kind = element
        .attribute(ATTR_RPC_TYPE)
        .ok_or_else(|| RepoError::MissingAttribute {
            element: element.tag.clone(),
            attribute: ATTR_RPC_TYPE,
        })?;
    let kind = RpcKind::parse(raw_kind).ok_or_else(|| RepoError::InvalidRpcType {
        element: element.tag.clone(),
        value: raw_kind.to_string(),
    })?;
    Ok(RpcPart {
        name: element.tag.clone(),
        kind,
        comment: element.first_comment().map(str::to_string),
        fields: fields_from_children(element)?,
    })
}

fn fields_from_children(element: &XmlElement) -> RepoResult<Vec<Field>> {
    element.elements().map(field_from_element).collect()
}

fn field_from_element(element: &XmlElement) -> RepoResult<Field> {
    let required = |attribute: &'static str| {
        element
            .attribute(attribute)
            .ok_or_else(|| RepoError::MissingAttribute {
                element: element.tag.clone(),
                attribute,
            })
    };
    let name = required(ATTR_ENTRY_NAME)?;
    let raw_index = required(ATTR_ENTRY_INDEX)?;
    let index = raw_index
        .trim()
        .parse::<i32>()
        .map_err(|_| RepoError::InvalidIndex {
            element: element.tag.clone(),
            value: raw_index.to_string(),
        })?;
    let optional = |attribute: &str| element.attribute(attribute).map(str::to_string);

    Ok(Field {
        option: optional(ATTR_ENTRY_OPTION),
        field_type: optional(ATTR_ENTRY_TYPE),
        name: name.to_string(),
        index,
        default: optional(ATTR_ENTRY_DEFAULT),
        comment: optional(ATTR_ENTRY_COMMENT),
    })
}

fn unit_to_element(unit: &Unit, op: Option<ChangeOp>) -> XmlElement {
    let mut element = XmlElement::new(unit.name.as_str());
    if let Some(op) = op {
        element.push_attribute(ATTR_OPER_TYPE, op.as_str());
    }
    if let Some(comment) = &unit.comment {
        element.children.push(XmlChild::Comment(comment.clone()));
    }
    match &unit.body {
        UnitBody::Enum(fields) | UnitBody::Message(fields) => {
            for field in fields {
                element
                    .children
                    .push(XmlChild::Element(field_to_element(&unit.name, field)));
            }
        }
        UnitBody::Rpc(parts) => {
            for part in parts {
                element
                    .children
                    .push(XmlChild::Element(part_to_element(part)));
            }
        }
    }
    element
}

fn part_to_element(part: &RpcPart) -> XmlElement {
    let mut element = XmlElement::new(part.name.as_str());
    element.push_attribute(ATTR_RPC_TYPE, part.kind.as_str());
    if let Some(comment) = &part.comment {
        element.children.push(XmlChild::Comment(comment.clone()));
    }
    for field in &part.fields {
        element
            .children
            .push(XmlChild::Element(field_to_element(&part.name, field)));
    }
    element
}

fn field_to_element(owner: &str, field: &Field) -> XmlElement {
    let mut element = XmlElement::new(owner);
    if let Some(option) = &field.option {
        element.push_attribute(ATTR_ENTRY_OPTION, option.as_str());
    }
    if let Some(field_type) = &field.field_type {
        element.push_attribute(ATTR_ENTRY_TYPE, field_type.as_str());
    }
    element.push_attribute(ATTR_ENTRY_NAME, field.name.as_str());
    element.push_attribute(ATTR_ENTRY_INDEX, field.index.to_string());
    if let Some(default) = &field.default {
        element.push_attribute(ATTR_ENTRY_DEFAULT, default.as_str());
    }
    if let Some(comment) = &field.comment {
        element.push_attribute(ATTR_ENTRY_COMMENT, comment.as_str());
    }
    element
}

fn read_forest(input: &str) -> RepoResult<Vec<XmlElement>> {
    let mut reader = Reader::from_str(input);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<XmlElement> = Vec::new();
    let mut roots = Vec::new();
    loop {
        let event = reader.read_event().map_err(|err| {
            RepoError::Malformed(format!("{err} at byte {}", reader.buffer_position()))
        })?;
        match event {
            Event::Start(start) => stack.push(element_from_start(&start)?),
            Event::Empty(start) => {
                let element = element_from_start(&start)?;
                attach(&mut stack, &mut roots, element);
            }
            Event::End(_) => {
                let element = stack
                    .pop()
                    .ok_or_else(|| RepoError::Malformed("unbalanced end tag".to_string()))?;
                attach(&mut stack, &mut roots, element);
            }
            Event::Comment(text) => {
                let comment = String::from_utf8(text.into_inner().into_owned())
                    .map_err(|_| RepoError::Malformed("comment is not utf-8".to_string()))?;
                if let Some(parent) = stack.last_mut() {
                    parent.children.push(XmlChild::Comment(comment));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if let Some(open) = stack.last() {
        return Err(RepoError::Malformed(format!(
            "element `{}` is never closed",
            open.tag
        )));
    }
    Ok(roots)
}

fn attach(stack: &mut [XmlElement], roots: &mut Vec<XmlElement>, element: XmlElement) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(XmlChild::Element(element)),
        None => roots.push(element),
    }
}

fn element_from_start(start: &BytesStart<'_>) -> RepoResult<XmlElement> {
    let tag = String::from_utf8(start.name().as_ref().to_vec())
        .map_err(|_| RepoError::Malformed("element name is not utf-8".to_string()))?;
    let mut element = XmlElement::new(tag);
    for attribute in start.attributes() {
        let attribute = attribute.map_err(|err| RepoError::Malformed(err.to_string()))?;
        let key = String::from_utf8(attribute.key.as_ref().to_vec())
            .map_err(|_| RepoError::Malformed("attribute name is not utf-8".to_string()))?;
        let value = attribute
            .unescape_value()
            .map_err(|err| RepoError::Malformed(err.to_string()))?;
        element.attributes.push((key, value.into_owned()));
    }
    Ok(element)
}

fn write_forest(forest: &[XmlElement]) -> RepoResult<String> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', INDENT_WIDTH);
    write_event(
        &mut writer,
        Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)),
    )?;
    write_event(&mut writer, Event::PI(BytesPI::new(STYLESHEET_PI)))?;
    for element in forest {
        write_element(&mut writer, element)?;
    }

    let mut output = String::from_utf8(writer.into_inner())
        .map_err(|err| RepoError::Malformed(format!("rendered output is not utf-8: {err}")))?;
    output.push('\n');
    Ok(output)
}

fn write_element(writer: &mut Writer<Vec<u8>>, element: &XmlElement) -> RepoResult<()> {
    let mut start = BytesStart::new(element.tag.as_str());
    for (key, value) in &element.attributes {
        start.push_attribute((key.as_str(), value.as_str()));
    }
    if element.children.is_empty() {
        return write_event(writer, Event::Empty(start));
    }

    write_event(writer, Event::Start(start))?;
    for child in &element.children {
        match child {
            XmlChild::Element(child) => write_element(writer, child)?,
            XmlChild::Comment(text) => {
                if !is_storable_comment(text) {
                    return Err(RepoError::InvalidComment {
                        element: element.tag.clone(),
                        comment: text.clone(),
                    });
                }
                write_event(writer, Event::Comment(BytesText::from_escaped(text.as_str())))?
            }
        }
    }
    write_event(writer, Event::End(BytesEnd::new(element.tag.as_str())))
}

fn write_event(writer: &mut Writer<Vec<u8>>, event: Event<'_>) -> RepoResult<()> {
    writer
        .write_event(event)
        .map_err(|err| RepoError::Malformed(format!("failed to write markup: {err}")))
}

#[cfg(test)]
mod tests {
    use super::{parse_delta, parse_document, render_delta, render_document};
    use crate::model::delta::{ChangeOp, Delta};
    use crate::model::document::Document;
    use crate::model::unit::{Category, Field, RpcKind, RpcPart, Unit};
    use crate::repo::RepoError;

    const SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<?xml-stylesheet type="text/xsl" href="style.xsl"?>
<enum>
    <Enum_Color>
        <!--Palette colors-->
        <Enum_Color EntryName="Red" EntryIndex="0" EntryComment="warm"/>
        <Enum_Color EntryName="Green" EntryIndex="1" EntryComment=""/>
    </Enum_Color>
</enum>
<data>
    <Data_Role>
        <Data_Role EntryOption="optional" EntryType="Enum_Color" EntryName="color" EntryIndex="1" EntryDefault="Red" EntryComment="team color"/>
    </Data_Role>
</data>
<rpc>
    <Rpc_Login>
        <Rpc_LoginReq RpcType="Req">
            <Rpc_LoginReq EntryOption="optional" EntryType="string" EntryName="account" EntryIndex="1" EntryComment=""/>
        </Rpc_LoginReq>
        <Rpc_LoginAck RpcType="Ack"/>
    </Rpc_Login>
</rpc>
"#;

    #[test]
    fn parses_all_categories() {
        let doc = parse_document(SAMPLE).expect("sample should parse");

        let color = doc.unit(Category::Enum, "Enum_Color").expect("enum unit");
        assert_eq!(color.comment.as_deref(), Some("Palette colors"));
        assert_eq!(color.fields().len(), 2);
        assert_eq!(color.fields()[0].comment.as_deref(), Some("warm"));
        assert_eq!(color.fields()[0].field_type, None);

        let role = doc.unit(Category::Data, "Data_Role").expect("data unit");
        let field = &role.fields()[0];
        assert_eq!(field.option.as_deref(), Some("optional"));
        assert_eq!(field.field_type.as_deref(), Some("Enum_Color"));
        assert_eq!(field.default.as_deref(), Some("Red"));

        let login = doc.unit(Category::Rpc, "Rpc_Login").expect("rpc unit");
        assert_eq!(login.parts().len(), 2);
        assert_eq!(login.parts()[0].kind, RpcKind::Req);
        assert_eq!(login.parts()[0].fields[0].name, "account");
        assert!(login.parts()[1].fields.is_empty());
        assert!(doc.category(Category::Protocol).is_none());
    }

    #[test]
    fn render_then_parse_preserves_document() {
        let doc = parse_document(SAMPLE).expect("sample should parse");
        let rendered = render_document(&doc).expect("render should succeed");

        assert!(rendered.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
        assert!(rendered.contains(r#"<?xml-stylesheet type="text/xsl" href="style.xsl"?>"#));
        assert!(rendered.contains("<!--Palette colors-->"));
        assert_eq!(parse_document(&rendered).expect("re-parse"), doc);
    }

    #[test]
    fn field_attributes_are_written_in_wire_order() {
        let mut doc = Document::new();
        doc.push_unit(
            Category::Data,
            Unit::message(
                "Data_A",
                vec![Field::new("b", 2)
                    .with_comment("c")
                    .with_default("d")
                    .with_type("int32")
                    .with_option("repeated")],
            ),
        );
        let rendered = render_document(&doc).expect("render should succeed");
        assert!(rendered.contains(
            r#"<Data_A EntryOption="repeated" EntryType="int32" EntryName="b" EntryIndex="2" EntryDefault="d" EntryComment="c"/>"#
        ));
    }

    #[test]
    fn unstorable_comment_fails_to_render() {
        let mut doc = Document::new();
        doc.push_unit(
            Category::Enum,
            Unit::enumeration("Enum_A", vec![]).with_comment("ends with --> here"),
        );
        let err = render_document(&doc).unwrap_err();
        assert!(matches!(err, RepoError::InvalidComment { element, .. } if element == "Enum_A"));

        let mut trailing = Document::new();
        trailing.push_unit(
            Category::Rpc,
            Unit::rpc(
                "Rpc_A",
                vec![RpcPart::new("AReq", RpcKind::Req, vec![]).with_comment("dash-")],
            ),
        );
        assert!(matches!(
            render_document(&trailing),
            Err(RepoError::InvalidComment { element, .. }) if element == "AReq"
        ));
    }

    #[test]
    fn unknown_category_is_rejected() {
        let err = parse_document("<message><A/></message>").unwrap_err();
        assert!(matches!(err, RepoError::UnknownCategory(tag) if tag == "message"));
    }

    #[test]
    fn invalid_index_is_rejected() {
        let err = parse_document(r#"<enum><E><E EntryName="A" EntryIndex="x"/></E></enum>"#)
            .unwrap_err();
        assert!(matches!(err, RepoError::InvalidIndex { value, .. } if value == "x"));
    }

    #[test]
    fn rpc_part_requires_rpc_type() {
        let err = parse_document("<rpc><R><RReq/></R></rpc>").unwrap_err();
        assert!(matches!(
            err,
            RepoError::MissingAttribute { attribute: "RpcType", .. }
        ));
    }

    #[test]
    fn unclosed_element_is_malformed() {
        let err = parse_document("<enum><E>").unwrap_err();
        assert!(matches!(err, RepoError::Malformed(_)));
    }

    #[test]
    fn delta_round_trips_with_opertype() {
        let mut delta = Delta::new();
        delta.record(
            Category::Rpc,
            ChangeOp::Delete,
            Unit::rpc("Rpc_Ping", vec![RpcPart::new("PingReq", RpcKind::Req, vec![])]),
        );
        delta.record(Category::Enum, ChangeOp::Update, Unit::enumeration("Enum_A", vec![]));

        let rendered = render_delta(&delta).expect("render should succeed");
        assert!(rendered.contains(r#"<Rpc_Ping opertype="delete">"#));
        assert!(rendered.contains(r#"<Enum_A opertype="update"/>"#));
        assert_eq!(parse_delta(&rendered).expect("re-parse"), delta);
    }

    #[test]
    fn delta_rejects_missing_or_unknown_opertype() {
        let missing = parse_delta("<enum><Enum_A/></enum>").unwrap_err();
        assert!(matches!(missing, RepoError::InvalidChangeTag { value: None, .. }));

        let unknown = parse_delta(r#"<enum><Enum_A opertype="modify"/></enum>"#).unwrap_err();
        assert!(matches!(
            unknown,
            RepoError::InvalidChangeTag { value: Some(value), .. } if value == "modify"
        ));
    }
}
