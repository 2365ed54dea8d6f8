//! Versioning engine and operation tests over a temporary sessions root.

use std::sync::Arc;

use serde_json::json;
use tempfile::TempDir;

use plat_model::{Coord, FixedEndpoint, ObjectId, Quadrant, Segment, SegmentKind};
use plat_store::{
    GeometryStore, LocalSessions, NewPoint, NewSegment, ObjectKind, PointUpdate, Recalculation,
    SegmentUpdate, SessionId, SitePayload, StoreError,
};

fn store(dir: &TempDir) -> GeometryStore<LocalSessions> {
    GeometryStore::new(LocalSessions::new(dir.path()))
}

fn session(id: &str) -> SessionId {
    SessionId::new(id).unwrap()
}

fn retained_files(dir: &TempDir, session: &SessionId) -> Vec<String> {
    let root = dir.path().join(session.as_str());
    let mut names: Vec<String> = std::fs::read_dir(root)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .filter(|name| name.starts_with("version_"))
        .collect();
    names.sort();
    names
}

#[test]
fn fresh_session_loads_an_empty_version_zero_site() {
    let dir = TempDir::new().unwrap();
    let store = store(&dir);
    let id = session("s1");

    let site = store.load(&id).unwrap();
    assert_eq!(site.version, 0);
    assert!(site.history.is_none());
    assert!(site.layers.is_empty());
    assert!(site.points.is_empty());
    assert_eq!(site.session_id.as_deref(), Some("s1"));
    assert_eq!(site.name, "Session s1");
}

#[test]
fn commits_increment_the_version_by_exactly_one() {
    let dir = TempDir::new().unwrap();
    let store = store(&dir);
    let id = session("s1");

    for n in 1..=5u64 {
        let (site, _) = store
            .add_point(&id, NewPoint { x: n as f64, y: 0.0, attributes: None })
            .unwrap();
        assert_eq!(site.version, n);
        assert_eq!(
            site.history.as_ref().unwrap().current_version,
            n
        );
    }
    let site = store.load(&id).unwrap();
    assert_eq!(site.version, 5);
    assert_eq!(site.points.len(), 5);
    // The first commit had no predecessor to retain, so versions 1..=4
    // are on disk.
    assert_eq!(
        retained_files(&dir, &id),
        vec![
            "version_1.json",
            "version_2.json",
            "version_3.json",
            "version_4.json"
        ]
    );
}

#[test]
fn retention_keeps_only_the_newest_snapshots() {
    let dir = TempDir::new().unwrap();
    let store = store(&dir).with_retain_limit(3);
    let id = session("s1");

    for n in 0..6 {
        store
            .add_point(&id, NewPoint { x: n as f64, y: 0.0, attributes: None })
            .unwrap();
    }
    assert_eq!(
        retained_files(&dir, &id),
        vec!["version_3.json", "version_4.json", "version_5.json"]
    );
}

#[test]
fn history_links_to_the_retained_predecessor() {
    let dir = TempDir::new().unwrap();
    let store = store(&dir);
    let id = session("s1");

    let (first, _) = store
        .add_point(&id, NewPoint { x: 1.0, y: 1.0, attributes: None })
        .unwrap();
    assert_eq!(first.history.as_ref().unwrap().previous_version_file, None);

    let (second, _) = store
        .add_point(&id, NewPoint { x: 2.0, y: 2.0, attributes: None })
        .unwrap();
    assert_eq!(
        second.history.as_ref().unwrap().previous_version_file.as_deref(),
        Some("version_1.json")
    );
}

#[test]
fn undo_after_one_commit_restores_the_empty_site() {
    let dir = TempDir::new().unwrap();
    let store = store(&dir);
    let id = session("s1");

    store
        .add_point(&id, NewPoint { x: 1.0, y: 2.0, attributes: None })
        .unwrap();
    let site = store.undo(&id).unwrap();
    assert_eq!(site.version, 0);
    assert!(site.points.is_empty());
    assert!(site.layers.is_empty());

    let reloaded = store.load(&id).unwrap();
    assert_eq!(reloaded.version, 0);
    assert!(reloaded.points.is_empty());
}

#[test]
fn undo_restores_the_previous_content() {
    let dir = TempDir::new().unwrap();
    let store = store(&dir);
    let id = session("s1");

    let (_, kept) = store
        .add_point(&id, NewPoint { x: 1.0, y: 1.0, attributes: None })
        .unwrap();
    store
        .add_point(&id, NewPoint { x: 2.0, y: 2.0, attributes: None })
        .unwrap();

    let site = store.undo(&id).unwrap();
    assert_eq!(site.version, 1);
    assert_eq!(site.points.len(), 1);
    assert_eq!(site.points[0].id, kept);
}

#[test]
fn undo_with_nothing_to_undo_fails() {
    let dir = TempDir::new().unwrap();
    let store = store(&dir);
    let id = session("s1");

    assert!(matches!(store.undo(&id), Err(StoreError::NothingToUndo)));

    store
        .add_point(&id, NewPoint { x: 1.0, y: 1.0, attributes: None })
        .unwrap();
    store.undo(&id).unwrap();
    assert!(matches!(store.undo(&id), Err(StoreError::NothingToUndo)));
}

#[test]
fn undo_against_a_pruned_snapshot_fails_as_nothing_to_undo() {
    let dir = TempDir::new().unwrap();
    let store = store(&dir);
    let id = session("s1");

    store
        .add_point(&id, NewPoint { x: 1.0, y: 1.0, attributes: None })
        .unwrap();
    store
        .add_point(&id, NewPoint { x: 2.0, y: 2.0, attributes: None })
        .unwrap();
    std::fs::remove_file(dir.path().join("s1").join("version_1.json")).unwrap();
    assert!(matches!(store.undo(&id), Err(StoreError::NothingToUndo)));
}

#[test]
fn corrupted_current_snapshot_is_fatal() {
    let dir = TempDir::new().unwrap();
    let store = store(&dir);
    let id = session("s1");

    store
        .add_point(&id, NewPoint { x: 1.0, y: 1.0, attributes: None })
        .unwrap();
    std::fs::write(dir.path().join("s1").join("current.json"), b"{not json").unwrap();
    assert!(matches!(store.load(&id), Err(StoreError::Corrupted { .. })));
    assert!(matches!(store.undo(&id), Err(StoreError::Corrupted { .. })));
}

#[test]
fn update_point_merges_attributes_and_keeps_unsupplied_fields() {
    let dir = TempDir::new().unwrap();
    let store = store(&dir);
    let id = session("s1");

    let mut attributes = plat_model::AttrMap::new();
    attributes.insert("marker".to_string(), json!("iron pin"));
    attributes.insert("layer".to_string(), json!("control"));
    let (_, point_id) = store
        .add_point(&id, NewPoint { x: 1.0, y: 2.0, attributes: Some(attributes) })
        .unwrap();

    let mut update_attrs = plat_model::AttrMap::new();
    update_attrs.insert("marker".to_string(), json!("rebar"));
    update_attrs.insert("checked".to_string(), json!(true));
    let site = store
        .update_point(
            &id,
            &point_id,
            PointUpdate { x: Some(5.0), attributes: Some(update_attrs), ..Default::default() },
        )
        .unwrap();

    let point = site.point(&point_id).unwrap();
    assert_eq!(point.x, 5.0);
    assert_eq!(point.y, 2.0);
    assert_eq!(point.layer, "control");
    assert_eq!(point.attributes.get("marker"), Some(&json!("rebar")));
    assert_eq!(point.attributes.get("checked"), Some(&json!(true)));
    assert_eq!(point.attributes.get("layer"), Some(&json!("control")));
}

#[test]
fn update_missing_point_is_not_found() {
    let dir = TempDir::new().unwrap();
    let store = store(&dir);
    let id = session("s1");

    let missing = ObjectId::new("nope");
    assert!(matches!(
        store.update_point(&id, &missing, PointUpdate::default()),
        Err(StoreError::NotFound { kind: "point", .. })
    ));
}

#[test]
fn add_point_rejects_non_finite_coordinates() {
    let dir = TempDir::new().unwrap();
    let store = store(&dir);
    let id = session("s1");

    let result = store.add_point(&id, NewPoint { x: f64::NAN, y: 0.0, attributes: None });
    assert!(matches!(result, Err(StoreError::Geometry(_))));
    // Nothing was committed.
    assert_eq!(store.load(&id).unwrap().version, 0);
}

#[test]
fn add_segment_materializes_the_default_chain() {
    let dir = TempDir::new().unwrap();
    let store = store(&dir);
    let id = session("s1");

    let (site, segment_id) = store
        .add_segment(
            &id,
            NewSegment {
                start: Coord::new(0.0, 0.0),
                end: Coord::new(0.0, 10.0),
                kind: SegmentKind::Line,
                attributes: None,
            },
        )
        .unwrap();

    assert_eq!(site.layers.len(), 1);
    assert_eq!(site.layers[0].name, "Default Layer");
    assert_eq!(site.layers[0].parcels[0].name, "Default Parcel");
    match site.segment(&segment_id).unwrap() {
        Segment::Line(line) => {
            assert!((line.azimuth() - 0.0).abs() < 1e-9);
            assert!((line.length - 10.0).abs() < 1e-9);
        }
        Segment::Arc(_) => panic!("expected a line"),
    }
}

#[test]
fn add_arc_segment_takes_parameters_from_attributes() {
    let dir = TempDir::new().unwrap();
    let store = store(&dir);
    let id = session("s1");

    let mut attributes = plat_model::AttrMap::new();
    attributes.insert("center".to_string(), json!({"x": 5.0, "y": 0.0}));
    attributes.insert("radius".to_string(), json!(5.0));
    attributes.insert("rotation".to_string(), json!("ccw"));
    let (site, segment_id) = store
        .add_segment(
            &id,
            NewSegment {
                start: Coord::new(0.0, 0.0),
                end: Coord::new(10.0, 0.0),
                kind: SegmentKind::Arc,
                attributes: Some(attributes),
            },
        )
        .unwrap();

    match site.segment(&segment_id).unwrap() {
        Segment::Arc(arc) => {
            assert_eq!(arc.center, Coord::new(5.0, 0.0));
            assert_eq!(arc.radius, 5.0);
            assert_eq!(arc.rotation, plat_model::Rotation::Ccw);
        }
        Segment::Line(_) => panic!("expected an arc"),
    }
}

#[test]
fn update_segment_recomputes_length_and_azimuth() {
    let dir = TempDir::new().unwrap();
    let store = store(&dir);
    let id = session("s1");

    let (_, segment_id) = store
        .add_segment(
            &id,
            NewSegment {
                start: Coord::new(0.0, 0.0),
                end: Coord::new(0.0, 10.0),
                kind: SegmentKind::Line,
                attributes: None,
            },
        )
        .unwrap();
    let site = store
        .update_segment(
            &id,
            &segment_id,
            SegmentUpdate {
                start: Coord::new(0.0, 0.0),
                end: Coord::new(5.0, 0.0),
                layer: Some("roads".to_string()),
                attributes: None,
            },
        )
        .unwrap();

    match site.segment(&segment_id).unwrap() {
        Segment::Line(line) => {
            assert!((line.azimuth() - 90.0).abs() < 1e-9);
            assert!((line.length - 5.0).abs() < 1e-9);
            assert_eq!(line.layer, "roads");
        }
        Segment::Arc(_) => panic!("expected a line"),
    }
}

#[test]
fn recalculate_segment_matches_the_survey_fixture() {
    let dir = TempDir::new().unwrap();
    let store = store(&dir);
    let id = session("s1");

    // Due-north line of length 10, recalculated SE 45° for 10 units from
    // the fixed start.
    let (_, segment_id) = store
        .add_segment(
            &id,
            NewSegment {
                start: Coord::new(0.0, 0.0),
                end: Coord::new(0.0, 10.0),
                kind: SegmentKind::Line,
                attributes: None,
            },
        )
        .unwrap();
    let site = store
        .recalculate_segment(
            &id,
            &segment_id,
            Recalculation {
                quadrant: Quadrant::Se,
                bearing: 45.0,
                distance: 10.0,
                fixed: FixedEndpoint::Start,
            },
        )
        .unwrap();

    match site.segment(&segment_id).unwrap() {
        Segment::Line(line) => {
            assert!((line.end.x - 7.0711).abs() < 1e-3);
            assert!((line.end.y + 7.0711).abs() < 1e-3);
            assert!((line.azimuth() - 135.0).abs() < 1e-9);
            assert!((line.length - 10.0).abs() < 1e-9);
        }
        Segment::Arc(_) => panic!("expected a line"),
    }
}

#[test]
fn recalculate_rejects_arcs() {
    let dir = TempDir::new().unwrap();
    let store = store(&dir);
    let id = session("s1");

    let (_, segment_id) = store
        .add_segment(
            &id,
            NewSegment {
                start: Coord::new(0.0, 0.0),
                end: Coord::new(10.0, 0.0),
                kind: SegmentKind::Arc,
                attributes: None,
            },
        )
        .unwrap();
    assert!(matches!(
        store.recalculate_segment(
            &id,
            &segment_id,
            Recalculation {
                quadrant: Quadrant::Ne,
                bearing: 45.0,
                distance: 1.0,
                fixed: FixedEndpoint::Start,
            },
        ),
        Err(StoreError::NotALine { .. })
    ));
}

#[test]
fn delete_object_covers_every_kind() {
    let dir = TempDir::new().unwrap();
    let store = store(&dir);
    let id = session("s1");

    let (_, point_id) = store
        .add_point(&id, NewPoint { x: 1.0, y: 1.0, attributes: None })
        .unwrap();
    let (site, segment_id) = store
        .add_segment(
            &id,
            NewSegment {
                start: Coord::new(0.0, 0.0),
                end: Coord::new(1.0, 1.0),
                kind: SegmentKind::Line,
                attributes: None,
            },
        )
        .unwrap();
    let layer_id = site.layers[0].id.clone();
    let parcel_id = site.layers[0].parcels[0].id.clone();
    let geometry_id = site.layers[0].parcels[0].geometry.as_ref().unwrap().id.clone();

    let site = store.delete_object(&id, ObjectKind::Segment, &segment_id).unwrap();
    assert!(site.segment(&segment_id).is_none());

    let site = store.delete_object(&id, ObjectKind::Geometry, &geometry_id).unwrap();
    assert!(site.parcel(&parcel_id).unwrap().geometry.is_none());

    let site = store.delete_object(&id, ObjectKind::Parcel, &parcel_id).unwrap();
    assert!(site.parcel(&parcel_id).is_none());

    let site = store.delete_object(&id, ObjectKind::Layer, &layer_id).unwrap();
    assert!(site.layers.is_empty());

    let site = store.delete_object(&id, ObjectKind::Point, &point_id).unwrap();
    assert!(site.points.is_empty());

    assert!(matches!(
        store.delete_object(&id, ObjectKind::Point, &point_id),
        Err(StoreError::NotFound { kind: "point", .. })
    ));
}

#[test]
fn replace_accepts_both_payload_forms() {
    let dir = TempDir::new().unwrap();
    let store = store(&dir);
    let id = session("s1");

    let storage_payload = json!({
        "projectId": "p1",
        "name": "Imported",
        "geometryLayers": []
    });
    let site = store
        .replace(&id, SitePayload::detect(storage_payload), "save")
        .unwrap();
    assert_eq!(site.name, "Imported");
    assert_eq!(site.version, 1);
    assert_eq!(site.session_id.as_deref(), Some("s1"));

    let frontend_payload = json!({
        "metadata": {"project": "Replacement"},
        "collections": [{
            "id": "l1",
            "title": "Boundary",
            "features": []
        }]
    });
    let site = store
        .replace(&id, SitePayload::detect(frontend_payload), "save")
        .unwrap();
    assert_eq!(site.name, "Replacement");
    assert_eq!(site.version, 2);
    assert_eq!(site.layers.len(), 1);
}

#[test]
fn clear_empties_the_site_as_a_committed_mutation() {
    let dir = TempDir::new().unwrap();
    let store = store(&dir);
    let id = session("s1");

    store
        .add_point(&id, NewPoint { x: 1.0, y: 1.0, attributes: None })
        .unwrap();
    let site = store.clear(&id).unwrap();
    assert_eq!(site.version, 2);
    assert!(site.points.is_empty());

    // Undo brings the point back.
    let site = store.undo(&id).unwrap();
    assert_eq!(site.points.len(), 1);
}

#[test]
fn frontend_view_reflects_the_current_site() {
    let dir = TempDir::new().unwrap();
    let store = store(&dir);
    let id = session("s1");

    store
        .add_segment(
            &id,
            NewSegment {
                start: Coord::new(0.0, 0.0),
                end: Coord::new(3.0, 4.0),
                kind: SegmentKind::Line,
                attributes: None,
            },
        )
        .unwrap();
    let view = store.frontend(&id).unwrap();
    assert_eq!(view["collections"].as_array().unwrap().len(), 1);
    assert_eq!(view["segments"].as_array().unwrap().len(), 1);
    assert_eq!(view["segments"][0]["length"], json!(5.0));
}

#[test]
fn concurrent_commits_serialize_per_session() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(store(&dir));
    let id = session("shared");

    let mut handles = Vec::new();
    for t in 0..8 {
        let store = Arc::clone(&store);
        let id = id.clone();
        handles.push(std::thread::spawn(move || {
            for n in 0..5 {
                store
                    .add_point(
                        &id,
                        NewPoint { x: t as f64, y: n as f64, attributes: None },
                    )
                    .unwrap();
            }
        }));
    }
    for handle in handles {
        handle.join().unwrap();
    }

    let site = store.load(&id).unwrap();
    assert_eq!(site.version, 40);
    assert_eq!(site.points.len(), 40);
}
