//! osmChange XML serialization.
//!
//! The writer emits exactly what the element store's upload endpoint
//! accepts; the reader exists for round-tripping documents in tests and
//! tooling.  Authorship attributes are never written — rewritten
//! documents carry only id, version, and the changeset placeholder.

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, Event};
use quick_xml::{Reader, Writer};

use rf_core::ElementKind;
use rf_fetch::{changeset_placeholder, MemberDoc, RelationDoc, WayDoc};

use crate::change::OsmChange;
use crate::{ChangeError, ChangeResult};

/// Generator attribute on emitted documents.
pub const CREATED_BY: &str = concat!("routeforge ", env!("CARGO_PKG_VERSION"));

// ── Writing ───────────────────────────────────────────────────────────────────

/// Serialize the change document.
///
/// With `include_changeset` every element carries the per-process
/// changeset placeholder, to be string-replaced at upload time; without
/// it the document is a plain download (and pretty-printed for humans).
pub fn to_xml(change: &OsmChange, include_changeset: bool) -> ChangeResult<String> {
    let mut writer = if include_changeset {
        Writer::new(Vec::new())
    } else {
        Writer::new_with_indent(Vec::new(), b' ', 2)
    };

    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

    let mut root = BytesStart::new("osmChange");
    root.push_attribute(("version", "0.6"));
    root.push_attribute(("generator", CREATED_BY));
    writer.write_event(Event::Start(root))?;

    writer.write_event(Event::Start(BytesStart::new("create")))?;
    for way in &change.create_ways {
        write_way(&mut writer, way, include_changeset)?;
    }
    writer.write_event(Event::End(BytesEnd::new("create")))?;

    writer.write_event(Event::Start(BytesStart::new("modify")))?;
    for way in &change.modify_ways {
        write_way(&mut writer, way, include_changeset)?;
    }
    for relation in &change.modify_relations {
        write_relation(&mut writer, relation, include_changeset)?;
    }
    writer.write_event(Event::End(BytesEnd::new("modify")))?;

    writer.write_event(Event::End(BytesEnd::new("osmChange")))?;

    String::from_utf8(writer.into_inner())
        .map_err(|e| ChangeError::Parse(format!("emitted document is not UTF-8: {e}")))
}

fn element_start(
    name: &'static str,
    id: i64,
    version: Option<u64>,
    include_changeset: bool,
) -> BytesStart<'static> {
    let mut start = BytesStart::new(name);
    start.push_attribute(("id", id.to_string().as_str()));
    if let Some(version) = version {
        start.push_attribute(("version", version.to_string().as_str()));
    }
    if include_changeset {
        start.push_attribute(("changeset", changeset_placeholder()));
    }
    start
}

fn write_way(writer: &mut Writer<Vec<u8>>, way: &WayDoc, include_changeset: bool) -> ChangeResult<()> {
    writer.write_event(Event::Start(element_start("way", way.id, way.version, include_changeset)))?;

    for node in &way.nodes {
        let mut nd = BytesStart::new("nd");
        nd.push_attribute(("ref", node.to_string().as_str()));
        writer.write_event(Event::Empty(nd))?;
    }
    write_tags(writer, &way.tags)?;

    writer.write_event(Event::End(BytesEnd::new("way")))?;
    Ok(())
}

fn write_relation(
    writer: &mut Writer<Vec<u8>>,
    relation: &RelationDoc,
    include_changeset: bool,
) -> ChangeResult<()> {
    writer.write_event(Event::Start(element_start(
        "relation",
        relation.id,
        relation.version,
        include_changeset,
    )))?;

    for member in &relation.members {
        let mut m = BytesStart::new("member");
        m.push_attribute(("type", member.kind.as_str()));
        m.push_attribute(("ref", member.r#ref.to_string().as_str()));
        m.push_attribute(("role", member.role.as_str()));
        writer.write_event(Event::Empty(m))?;
    }
    write_tags(writer, &relation.tags)?;

    writer.write_event(Event::End(BytesEnd::new("relation")))?;
    Ok(())
}

fn write_tags(writer: &mut Writer<Vec<u8>>, tags: &rf_core::TagMap) -> ChangeResult<()> {
    for (key, value) in tags {
        let mut tag = BytesStart::new("tag");
        tag.push_attribute(("k", key.as_str()));
        tag.push_attribute(("v", value.as_str()));
        writer.write_event(Event::Empty(tag))?;
    }
    Ok(())
}

// ── Reading ───────────────────────────────────────────────────────────────────

#[derive(Copy, Clone, PartialEq)]
enum Section {
    Create,
    Modify,
}

enum Pending {
    Way(WayDoc),
    Relation(RelationDoc),
}

/// Parse an osmChange document back into the model.
///
/// Whitespace and the changeset placeholder are not preserved — a
/// parse → serialize → parse round trip is identity on the model.
pub fn from_xml(xml: &str) -> ChangeResult<OsmChange> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut change = OsmChange::default();
    let mut section: Option<Section> = None;
    let mut pending: Option<Pending> = None;

    loop {
        let event = reader.read_event()?;
        match event {
            Event::Start(ref e) | Event::Empty(ref e) => {
                let self_closing = matches!(event, Event::Empty(_));

                match e.name().as_ref() {
                    b"osmChange" => {}
                    b"create" => section = Some(Section::Create),
                    b"modify" => section = Some(Section::Modify),

                    b"way" => {
                        let way = WayDoc {
                            id: attr_parse(e, "id")?,
                            version: attr_opt(e, "version")?,
                            tags: rf_core::TagMap::new(),
                            nodes: Vec::new(),
                        };
                        if self_closing {
                            push_way(&mut change, section, way)?;
                        } else {
                            pending = Some(Pending::Way(way));
                        }
                    }

                    b"relation" => {
                        let relation = RelationDoc {
                            id: attr_parse(e, "id")?,
                            version: attr_opt(e, "version")?,
                            tags: rf_core::TagMap::new(),
                            members: Vec::new(),
                        };
                        if self_closing {
                            push_relation(&mut change, section, relation)?;
                        } else {
                            pending = Some(Pending::Relation(relation));
                        }
                    }

                    b"nd" => {
                        if let Some(Pending::Way(way)) = pending.as_mut() {
                            way.nodes.push(attr_parse(e, "ref")?);
                        }
                    }

                    b"member" => {
                        if let Some(Pending::Relation(relation)) = pending.as_mut() {
                            let kind_raw: String = attr_string(e, "type")?;
                            let kind = ElementKind::parse(&kind_raw).ok_or_else(|| {
                                ChangeError::Parse(format!("unknown member type {kind_raw:?}"))
                            })?;
                            relation.members.push(MemberDoc {
                                kind,
                                r#ref: attr_parse(e, "ref")?,
                                role: attr_string(e, "role").unwrap_or_default(),
                            });
                        }
                    }

                    b"tag" => {
                        let key = attr_string(e, "k")?;
                        let value = attr_string(e, "v")?;
                        match pending.as_mut() {
                            Some(Pending::Way(way)) => {
                                way.tags.insert(key, value);
                            }
                            Some(Pending::Relation(relation)) => {
                                relation.tags.insert(key, value);
                            }
                            None => {}
                        }
                    }

                    other => {
                        return Err(ChangeError::Parse(format!(
                            "unexpected element {:?}",
                            String::from_utf8_lossy(other),
                        )));
                    }
                }
            }

            Event::End(ref e) => match e.name().as_ref() {
                b"way" => {
                    if let Some(Pending::Way(way)) = pending.take() {
                        push_way(&mut change, section, way)?;
                    }
                }
                b"relation" => {
                    if let Some(Pending::Relation(relation)) = pending.take() {
                        push_relation(&mut change, section, relation)?;
                    }
                }
                b"create" | b"modify" => section = None,
                _ => {}
            },

            Event::Eof => break,
            _ => {}
        }
    }

    Ok(change)
}

fn push_way(change: &mut OsmChange, section: Option<Section>, way: WayDoc) -> ChangeResult<()> {
    match section {
        Some(Section::Create) => change.create_ways.push(way),
        Some(Section::Modify) => change.modify_ways.push(way),
        None => return Err(ChangeError::Parse("way outside create/modify".to_owned())),
    }
    Ok(())
}

fn push_relation(
    change: &mut OsmChange,
    section: Option<Section>,
    relation: RelationDoc,
) -> ChangeResult<()> {
    match section {
        Some(Section::Modify) => change.modify_relations.push(relation),
        Some(Section::Create) => {
            return Err(ChangeError::Parse("relation creation is not supported".to_owned()));
        }
        None => return Err(ChangeError::Parse("relation outside create/modify".to_owned())),
    }
    Ok(())
}

// ── Attribute helpers ─────────────────────────────────────────────────────────

fn attr_string(e: &BytesStart, name: &str) -> ChangeResult<String> {
    let attr = e
        .try_get_attribute(name)
        .map_err(|err| ChangeError::Parse(err.to_string()))?
        .ok_or_else(|| ChangeError::Parse(format!("missing attribute {name:?}")))?;
    let value = attr
        .unescape_value()
        .map_err(|err| ChangeError::Parse(err.to_string()))?;
    Ok(value.into_owned())
}

fn attr_parse<T: std::str::FromStr>(e: &BytesStart, name: &str) -> ChangeResult<T> {
    let raw = attr_string(e, name)?;
    raw.parse()
        .map_err(|_| ChangeError::Parse(format!("malformed {name:?} attribute: {raw:?}")))
}

fn attr_opt<T: std::str::FromStr>(e: &BytesStart, name: &str) -> ChangeResult<Option<T>> {
    match e
        .try_get_attribute(name)
        .map_err(|err| ChangeError::Parse(err.to_string()))?
    {
        None => Ok(None),
        Some(attr) => {
            let raw = attr
                .unescape_value()
                .map_err(|err| ChangeError::Parse(err.to_string()))?;
            raw.parse()
                .map(Some)
                .map_err(|_| ChangeError::Parse(format!("malformed {name:?} attribute: {raw:?}")))
        }
    }
}
