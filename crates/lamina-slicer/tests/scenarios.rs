//! End-to-end slicing of analytic models.

mod common;

use lamina_slicer::{
    slice_layers, LayerToolpaths, NoTrace, RecordingTrace, RingState, SlicerConfig, TraceKind,
    WallKind,
};

fn skin_layers(layers: &[LayerToolpaths]) -> Vec<usize> {
    layers
        .iter()
        .filter(|l| l.has_skin())
        .map(|l| l.index)
        .collect()
}

#[test]
fn uniform_cylinder_has_shell_skin_only() {
    let config = SlicerConfig::default();
    let layers = slice_layers(&common::cylinder(10.0, 10.0, 0.2), &config, &NoTrace).unwrap();
    assert_eq!(layers.len(), 50);

    let expected: Vec<usize> = (0..4).chain(46..50).collect();
    assert_eq!(skin_layers(&layers), expected);
    for layer in &layers {
        assert_eq!(layer.count(WallKind::Outer), 1);
        assert_eq!(layer.count(WallKind::Inner), 2);
    }
}

#[test]
fn wedding_cake_skins_each_transition() {
    let config = SlicerConfig::default();
    let segments = common::wedding_cake(&[30.0, 20.0, 10.0], 10, 0.2);
    let layers = slice_layers(&segments, &config, &NoTrace).unwrap();
    let skinned = skin_layers(&layers);

    // Fixed shells.
    for i in (0..4).chain(26..30) {
        assert!(skinned.contains(&i), "shell layer {i} has no skin");
    }
    // Top layer of each lower tier carries the exposed shoulder.
    assert!(skinned.contains(&9));
    assert!(skinned.contains(&19));
    assert!(layers[9].rings[0].exposed_regions > 0);
    // Mid-tier layers are fully backed.
    assert!(!skinned.contains(&5));
    assert!(!skinned.contains(&14));
    assert!(!skinned.contains(&10));
}

#[test]
fn wedding_cake_without_exposure_detection() {
    let config = SlicerConfig {
        exposure_detection_enabled: false,
        ..Default::default()
    };
    let segments = common::wedding_cake(&[30.0, 20.0, 10.0], 10, 0.2);
    let layers = slice_layers(&segments, &config, &NoTrace).unwrap();
    let expected: Vec<usize> = (0..4).chain(26..30).collect();
    assert_eq!(skin_layers(&layers), expected);
}

#[test]
fn matryoshka_alternates_nesting() {
    let config = SlicerConfig::default();
    let segments = common::matryoshka(&[30.0, 20.0, 10.0], 2.0, 0.2);
    let layers = slice_layers(&segments, &config, &NoTrace).unwrap();
    let layer = &layers[1];

    assert_eq!(layer.count(WallKind::Outer), 3);
    let mut by_level: Vec<(usize, bool)> = layer
        .rings
        .iter()
        .map(|r| (r.nesting.level, r.nesting.is_hole))
        .collect();
    by_level.sort();
    assert_eq!(by_level, vec![(0, false), (1, true), (2, false)]);
}

#[test]
fn thin_torus_keeps_outer_walls_only() {
    let config = SlicerConfig::default();
    let recorder = RecordingTrace::new();
    let layers = slice_layers(&common::torus(10.0, 0.4, 0.2), &config, &recorder).unwrap();
    assert_eq!(layers.len(), 4);

    let layer = &layers[1];
    assert_eq!(layer.count(WallKind::Inner), 0);
    assert_eq!(layer.count(WallKind::Skin), 0);
    assert!(layer.count(WallKind::Outer) >= 1);
    assert!(layer
        .rings
        .iter()
        .all(|r| r.state == RingState::SkinSkipped));
    assert!(recorder.count(|k| matches!(k, TraceKind::WallDropped { .. })) > 0);
    assert!(recorder.count(|k| matches!(k, TraceKind::SkinSkipped { .. })) > 0);
}

#[test]
fn dome_cavity_needs_more_skin_than_solid_box() {
    let config = SlicerConfig::default();
    let solid = slice_layers(&common::solid_box(30.0, 10.0, 0.2), &config, &NoTrace).unwrap();
    let domed = slice_layers(
        &common::box_with_dome(30.0, 10.0, 6.0, 0.2),
        &config,
        &NoTrace,
    )
    .unwrap();

    let solid_count = skin_layers(&solid).len();
    let domed_count = skin_layers(&domed).len();
    assert_eq!(solid_count, 8);
    assert!(domed_count > solid_count, "{domed_count} vs {solid_count}");

    // The dome closes just under z = 6: the layers above it are backed
    // on both sides but not by every symmetric pair.
    let closing: Vec<usize> = domed
        .iter()
        .filter(|l| l.rings.iter().any(|r| r.fully_covered_regions > 0))
        .map(|l| l.index)
        .collect();
    assert!(!closing.is_empty());
    assert!(closing.iter().all(|i| skin_layers(&domed).contains(i)));
}

#[test]
fn output_serializes_with_polyline_types() {
    let config = SlicerConfig::default();
    let layers = slice_layers(&common::cylinder(5.0, 1.0, 0.2), &config, &NoTrace).unwrap();
    let json = serde_json::to_value(&layers[0].polylines).unwrap();
    let types: Vec<&str> = json
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["type"].as_str().unwrap())
        .collect();
    assert_eq!(types, vec!["WALL-OUTER", "WALL-INNER", "WALL-INNER", "SKIN"]);
}
