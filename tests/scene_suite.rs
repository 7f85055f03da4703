use zonetag::config::Config;
use zonetag::layout::{
    CanvasSize, LabelBlock, LabelLine, Rect, Slot, SlotFits, candidates, choose_slot, measure_tags,
    slot_rect, solve,
};
use zonetag::{Bgr, Canvas, Polygon, Region, Scene, StyleOverride, SurroundingBox};

const HD: CanvasSize = CanvasSize {
    width: 1280,
    height: 720,
};

fn fast_config() -> Config {
    let mut config = Config::default();
    config.font.fast_metrics = true;
    config
}

fn footprint(width: i32, height: i32) -> LabelBlock {
    LabelBlock {
        lines: vec![LabelLine {
            text: "tag".to_string(),
            continuation: false,
        }],
        text_width: width - 15,
        line_height: 10,
        width,
        height,
    }
}

fn strictly_overlaps(a: &Rect, b: &Rect) -> bool {
    a.x1 < b.x2 && b.x1 < a.x2 && a.y1 < b.y2 && b.y1 < a.y2
}

fn brute_force_best(zones: &[Rect], blocks: &[LabelBlock], canvas: CanvasSize, margin: i32) -> u32 {
    let options: Vec<_> = (0..zones.len())
        .map(|i| candidates(zones, blocks, i, canvas, margin))
        .filter(|opts| !opts.is_empty())
        .collect();
    let total: usize = options.iter().map(Vec::len).product();
    let mut best = 0;
    for mut code in 0..total {
        let picked: Vec<_> = options
            .iter()
            .map(|opts| {
                let choice = opts[code % opts.len()];
                code /= opts.len();
                choice
            })
            .collect();
        let valid = picked
            .iter()
            .enumerate()
            .all(|(i, a)| picked[i + 1..].iter().all(|b| !a.rect.collides(&b.rect)));
        if valid {
            best = best.max(picked.iter().map(|c| c.slot.score()).sum());
        }
    }
    best
}

#[test]
fn face_zone_heuristic_follows_the_configured_priority() {
    let config = fast_config();
    let margin = config.style.margin;
    let zone = Rect::new(100, 100, 200, 300);
    let block = measure_tags(&["Face 0"], &config.font, margin);

    // One-line labels go above the zone by default.
    let slot = choose_slot(&zone, &block, HD, margin, &config.placement);
    assert_eq!(slot, Slot::Top);

    // With corner-first priority the bottom-right corner is taken because it
    // fits horizontally and vertically.
    let mut corner_first = config.placement.clone();
    corner_first.single_line_priority = corner_first.multi_line_priority;
    assert!(200 + block.width <= 1280);
    assert!(SlotFits::evaluate(&zone, &block, HD, margin).bottom_right);
    let slot = choose_slot(&zone, &block, HD, margin, &corner_first);
    assert_eq!(slot, Slot::BottomRight);

    let mut canvas = Canvas::new(1280, 720).expect("canvas");
    let mut scene = Scene::new();
    scene.add_zone(Region::new((100.0, 100.0, 200.0, 300.0)).with_tag("Face 0"));
    let mut config = config;
    config.placement = corner_first;
    let report = scene.draw(&mut canvas, &config);
    let label = report.regions[0].label.as_ref().expect("label placed");
    assert_eq!(label.slot, Slot::BottomRight);
    for row in &label.rows {
        assert!(!strictly_overlaps(&row.background, &zone), "{row:?} covers the zone");
    }
}

#[test]
fn face_zone_alone_in_the_solver_gets_bottom_right() {
    let config = fast_config();
    let margin = config.style.margin;
    let zones = [Rect::new(100, 100, 200, 300)];
    let blocks = [measure_tags(&["Face 0"], &config.font, margin)];
    let assignment = solve(&zones, &blocks, HD, margin).expect("solvable");
    assert_eq!(assignment.slots, vec![Some(Slot::BottomRight)]);
    assert_eq!(assignment.score, 4);
}

#[test]
fn two_neighbours_score_the_brute_force_maximum() {
    let zones = [Rect::new(100, 100, 200, 300), Rect::new(220, 100, 400, 300)];
    let blocks = [footprint(70, 80), footprint(70, 80)];
    let assignment = solve(&zones, &blocks, HD, 5).expect("solvable");
    assert_eq!(assignment.slots.iter().filter(|s| s.is_some()).count(), 2);
    assert_eq!(assignment.score, brute_force_best(&zones, &blocks, HD, 5));
}

#[test]
fn tied_assignments_favour_the_lower_zone_index() {
    // Both bottom-right labels collide and both bottom-left labels collide,
    // so (BR, BL) and (BL, BR) tie at seven points.
    let zones = [Rect::new(310, 100, 390, 200), Rect::new(300, 230, 400, 330)];
    let blocks = [footprint(60, 140), footprint(60, 140)];
    let assignment = solve(&zones, &blocks, HD, 5).expect("solvable");
    assert_eq!(assignment.score, 7);
    assert_eq!(assignment.score, brute_force_best(&zones, &blocks, HD, 5));
    assert_eq!(
        assignment.slots,
        vec![Some(Slot::BottomRight), Some(Slot::BottomLeft)]
    );
}

#[test]
fn conflict_zone_still_gets_a_deterministic_heuristic_slot() {
    let canvas = CanvasSize::new(60, 60);
    let zones = [Rect::new(5, 5, 55, 55)];
    let blocks = [footprint(120, 90)];
    assert!(candidates(&zones, &blocks, 0, canvas, 5).is_empty());
    assert!(solve(&zones, &blocks, canvas, 5).is_none());

    let placement = Config::default().placement;
    let first = choose_slot(&zones[0], &blocks[0], canvas, 5, &placement);
    let again = choose_slot(&zones[0], &blocks[0], canvas, 5, &placement);
    assert_eq!(first, placement.single_line_priority[0]);
    assert_eq!(first, again);
}

#[test]
fn crowded_scene_draws_without_label_collisions() {
    let mut canvas = Canvas::new(1280, 720).expect("canvas");
    let mut scene = Scene::new();
    scene.add_zone(Region::new((100.0, 100.0, 200.0, 300.0)).with_tags(["Face 0", "Person\nAdult"]));
    scene.add_zone(Region::new((220.0, 100.0, 400.0, 300.0)).with_tags(["Face 1"]));
    scene.add_zone(Region::new((420.0, 120.0, 600.0, 260.0)).with_tags(["Car", "Plate\nAB-123"]));
    scene.add_zone(Region::new((150.0, 400.0, 300.0, 600.0)));
    let report = scene.draw(&mut canvas, &fast_config());

    assert!(report.assignment.is_some());
    let areas: Vec<Rect> = report
        .regions
        .iter()
        .filter_map(|r| r.label.as_ref().map(|l| l.area))
        .collect();
    assert_eq!(areas.len(), 3);
    for (i, a) in areas.iter().enumerate() {
        for b in &areas[i + 1..] {
            assert!(!a.collides(b), "{a:?} collides with {b:?}");
        }
    }
}

#[test]
fn hidden_polygon_box_carries_tags_without_an_outline() {
    let mut canvas = Canvas::new(640, 480).expect("canvas");
    let mut scene = Scene::new();
    let mut polygon = Polygon::new(vec![(200.0, 300.0), (300.0, 150.0), (400.0, 300.0)]).closed(true);
    polygon.color = Some(Bgr(0, 0, 200));
    scene.add_polygon(polygon, SurroundingBox::Hidden, ["roof"]);
    let mut config = fast_config();
    config.tag.alpha = 1.0;
    let report = scene.draw(&mut canvas, &config);

    let region = &report.regions[0];
    assert_eq!(region.style.thickness, 0);
    // Top-left corner of the bounding box lies off the triangle.
    assert_eq!(canvas.pixel(200, 150), Some(Bgr::BLACK));
    let label = region.label.as_ref().expect("tag placed");
    let row = label.rows[0].background;
    assert_eq!(
        canvas.pixel(row.x1 as u32 + 1, row.y1 as u32 + 1),
        Some(config.tag.background)
    );
}

#[test]
fn rendered_label_stays_within_its_measured_footprint() {
    let mut config = fast_config();
    config.tag.alpha = 1.0;
    let tags = ["Face 0", "MIT\nLicense"];
    let margin = config.style.margin;

    let mut canvas = Canvas::new(640, 480).expect("canvas");
    let mut scene = Scene::new();
    scene.add_zone(
        Region::new((200.0, 150.0, 360.0, 400.0))
            .with_tags(tags)
            .with_style(StyleOverride {
                thickness: Some(0),
                ..StyleOverride::default()
            }),
    );
    let report = scene.draw(&mut canvas, &config);

    let zone = report.regions[0].zone;
    let block = measure_tags(&tags, &config.font, margin);
    let label = report.regions[0].label.as_ref().expect("tag placed");
    assert_eq!(label.area, slot_rect(label.slot, &zone, &block, margin));
    for row in &label.rows {
        assert!(label.area.contains_rect(&row.background));
    }

    // Every painted pixel lies inside the footprint, give or take the
    // anti-aliased glyph edges.
    const EPSILON: i32 = 2;
    let area = label.area;
    for y in 0..480u32 {
        for x in 0..640u32 {
            if canvas.pixel(x, y) == Some(Bgr::BLACK) {
                continue;
            }
            let (x, y) = (x as i32, y as i32);
            assert!(
                x >= area.x1 - EPSILON
                    && x <= area.x2 + EPSILON
                    && y >= area.y1 - EPSILON
                    && y <= area.y2 + EPSILON,
                "pixel ({x},{y}) painted outside {area:?}"
            );
        }
    }
}

#[test]
fn normalized_coordinates_resolve_against_the_canvas() {
    let mut canvas = Canvas::new(800, 600).expect("canvas");
    let mut scene = Scene::new();
    scene.add_zone(Region::new((0.25, 0.25, 0.5, 0.75)).with_tag("half"));
    let mut config = fast_config();
    config.style.normalized = true;
    let report = scene.draw(&mut canvas, &config);
    assert_eq!(report.regions[0].zone, Rect::new(200, 150, 400, 450));
}

#[test]
fn class_color_comes_from_the_first_tag() {
    let mut canvas = Canvas::new(400, 400).expect("canvas");
    let mut scene = Scene::new();
    scene.add_zone(
        Region::new((50.0, 50.0, 350.0, 350.0))
            .with_tags(["car", "red"])
            .with_style(StyleOverride {
                alpha: Some(1.0),
                peephole: Some(false),
                ..StyleOverride::default()
            }),
    );
    let mut config = fast_config();
    config.style.color_by_tag.insert("car".to_string(), Bgr(0, 0, 255));
    let report = scene.draw(&mut canvas, &config);
    assert_eq!(report.regions[0].style.color, Bgr(0, 0, 255));
    assert_eq!(canvas.pixel(50, 200), Some(Bgr(0, 0, 255)));
}
