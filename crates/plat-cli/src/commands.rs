//! One function per subcommand, each running against a local store.

use std::fs;

use anyhow::{Context, Result};
use plat_model::{AttrMap, FixedEndpoint, ObjectId, Quadrant, Segment, SegmentKind};
use plat_store::{
    GeometryStore, LocalSessions, NewPoint, NewSegment, ObjectKind, PointUpdate, Recalculation,
    SegmentUpdate, SessionId, SitePayload,
};

use crate::cli::{
    AddPointArgs, AddSegmentArgs, DeleteArgs, FixedArg, FormArg, ImportArgs, KindArg,
    ObjectKindArg, OutputArg, QuadrantArg, RecalculateArgs, SessionArgs, ShowArgs,
    UpdatePointArgs, UpdateSegmentArgs,
};
use crate::render::print_site;

type Store = GeometryStore<LocalSessions>;

pub fn run_show(store: &Store, args: &ShowArgs) -> Result<()> {
    let session = session_id(&args.session)?;
    match args.output {
        OutputArg::Table => {
            let site = store.load(&session)?;
            print_site(&site);
        }
        OutputArg::Storage => {
            let site = store.load(&session)?;
            println!("{}", serde_json::to_string_pretty(&site.to_storage())?);
        }
        OutputArg::Frontend => {
            let view = store.frontend(&session)?;
            println!("{}", serde_json::to_string_pretty(&view)?);
        }
    }
    Ok(())
}

pub fn run_add_point(store: &Store, args: AddPointArgs) -> Result<()> {
    let session = session_id(&args.session)?;
    let (site, id) = store.add_point(
        &session,
        NewPoint {
            x: args.x,
            y: args.y,
            attributes: attr_map(args.attrs, args.layer),
        },
    )?;
    println!("added point {id} (version {})", site.version);
    Ok(())
}

pub fn run_update_point(store: &Store, args: UpdatePointArgs) -> Result<()> {
    let session = session_id(&args.session)?;
    let id = ObjectId::from(args.id);
    let site = store.update_point(
        &session,
        &id,
        PointUpdate {
            x: args.x,
            y: args.y,
            layer: args.layer,
            attributes: attr_map(args.attrs, None),
        },
    )?;
    println!("updated point {id} (version {})", site.version);
    Ok(())
}

pub fn run_add_segment(store: &Store, args: AddSegmentArgs) -> Result<()> {
    let session = session_id(&args.session)?;
    let (site, id) = store.add_segment(
        &session,
        NewSegment {
            start: args.start,
            end: args.end,
            kind: segment_kind(args.kind),
            attributes: attr_map(args.attrs, None),
        },
    )?;
    println!("added segment {id} (version {})", site.version);
    Ok(())
}

pub fn run_update_segment(store: &Store, args: UpdateSegmentArgs) -> Result<()> {
    let session = session_id(&args.session)?;
    let id = ObjectId::from(args.id);
    let site = store.update_segment(
        &session,
        &id,
        SegmentUpdate {
            start: args.start,
            end: args.end,
            layer: args.layer,
            attributes: attr_map(args.attrs, None),
        },
    )?;
    println!("updated segment {id} (version {})", site.version);
    Ok(())
}

pub fn run_recalculate(store: &Store, args: RecalculateArgs) -> Result<()> {
    let session = session_id(&args.session)?;
    let id = ObjectId::from(args.id);
    let site = store.recalculate_segment(
        &session,
        &id,
        Recalculation {
            quadrant: quadrant(args.quadrant),
            bearing: args.bearing,
            distance: args.distance,
            fixed: fixed_endpoint(args.fixed),
        },
    )?;
    let segment = site.segment(&id);
    if let Some(line) = segment.and_then(|s| match s {
        Segment::Line(line) => Some(line),
        Segment::Arc(_) => None,
    }) {
        println!(
            "recalculated segment {id}: end ({:.4}, {:.4}), azimuth {:.4} (version {})",
            line.end.x,
            line.end.y,
            line.azimuth(),
            site.version
        );
    } else {
        println!("recalculated segment {id} (version {})", site.version);
    }
    Ok(())
}

pub fn run_delete(store: &Store, args: DeleteArgs) -> Result<()> {
    let session = session_id(&args.session)?;
    let kind = object_kind(args.kind);
    let id = ObjectId::from(args.id);
    let site = store.delete_object(&session, kind, &id)?;
    println!("deleted {kind} {id} (version {})", site.version);
    Ok(())
}

pub fn run_import(store: &Store, args: ImportArgs) -> Result<()> {
    let session = session_id(&args.session)?;
    let bytes = fs::read(&args.file)
        .with_context(|| format!("read {}", args.file.display()))?;
    let value: serde_json::Value = serde_json::from_slice(&bytes)
        .with_context(|| format!("parse {}", args.file.display()))?;
    let payload = match args.form {
        FormArg::Auto => SitePayload::detect(value),
        FormArg::Storage => SitePayload::Storage(value),
        FormArg::Frontend => SitePayload::Frontend(value),
    };
    let site = store.replace(&session, payload, "replace_site")?;
    println!("imported site (version {})", site.version);
    Ok(())
}

pub fn run_undo(store: &Store, args: &SessionArgs) -> Result<()> {
    let session = session_id(&args.session)?;
    let site = store.undo(&session)?;
    println!("restored version {}", site.version);
    Ok(())
}

pub fn run_clear(store: &Store, args: &SessionArgs) -> Result<()> {
    let session = session_id(&args.session)?;
    let site = store.clear(&session)?;
    println!("cleared site (version {})", site.version);
    Ok(())
}

fn session_id(value: &str) -> Result<SessionId> {
    SessionId::new(value).with_context(|| format!("invalid session id '{value}'"))
}

/// Fold `--attr` pairs and the `--layer` shorthand into one attribute map.
fn attr_map(attrs: Vec<(String, serde_json::Value)>, layer: Option<String>) -> Option<AttrMap> {
    let mut map: AttrMap = attrs.into_iter().collect();
    if let Some(layer) = layer {
        map.insert("layer".to_string(), serde_json::Value::String(layer));
    }
    (!map.is_empty()).then_some(map)
}

fn segment_kind(kind: KindArg) -> SegmentKind {
    match kind {
        KindArg::Line => SegmentKind::Line,
        KindArg::Arc => SegmentKind::Arc,
    }
}

fn quadrant(arg: QuadrantArg) -> Quadrant {
    match arg {
        QuadrantArg::Ne => Quadrant::Ne,
        QuadrantArg::Se => Quadrant::Se,
        QuadrantArg::Sw => Quadrant::Sw,
        QuadrantArg::Nw => Quadrant::Nw,
    }
}

fn fixed_endpoint(arg: FixedArg) -> FixedEndpoint {
    match arg {
        FixedArg::Start => FixedEndpoint::Start,
        FixedArg::End => FixedEndpoint::End,
    }
}

fn object_kind(arg: ObjectKindArg) -> ObjectKind {
    match arg {
        ObjectKindArg::Point => ObjectKind::Point,
        ObjectKindArg::Segment => ObjectKind::Segment,
        ObjectKindArg::Parcel => ObjectKind::Parcel,
        ObjectKindArg::Layer => ObjectKind::Layer,
        ObjectKindArg::Geometry => ObjectKind::Geometry,
    }
}

#[cfg(test)]
mod tests {
    use plat_store::{GeometryStore, LocalSessions};
    use serde_json::json;

    use super::{attr_map, run_add_point, run_clear, run_undo};
    use crate::cli::{AddPointArgs, SessionArgs};

    #[test]
    fn attr_map_folds_layer_into_attributes() {
        let map = attr_map(
            vec![("note".to_string(), json!("staked"))],
            Some("Road".to_string()),
        )
        .unwrap();
        assert_eq!(map.get("layer"), Some(&json!("Road")));
        assert_eq!(map.get("note"), Some(&json!("staked")));
        assert!(attr_map(Vec::new(), None).is_none());
    }

    #[test]
    fn add_then_undo_round_trips_through_the_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = GeometryStore::new(LocalSessions::new(dir.path()));
        run_add_point(
            &store,
            AddPointArgs {
                session: "11".to_string(),
                x: 1.0,
                y: 2.0,
                layer: None,
                attrs: Vec::new(),
            },
        )
        .unwrap();
        let session = SessionArgs {
            session: "11".to_string(),
        };
        run_undo(&store, &session).unwrap();
        assert!(run_undo(&store, &session).is_err());
        run_clear(&store, &session).unwrap();
    }
}
