use image::{Rgb, RgbImage};
use imageproc::drawing::draw_filled_rect_mut;
use imageproc::rect::Rect;
use qtraffic::bbox::BBox;
use qtraffic::{
    AssignmentMode, CongestionTrend, Detection, Error, PipelineConfig, TrafficPipeline,
    VehicleKind, ViolationKind,
};

const FRAMES: u32 = 20;

/// Three bright blocks: one drifting right slowly, one racing right, one
/// rolling down across the queue line.
fn street(i: u32) -> RgbImage {
    let mut frame = RgbImage::new(640, 480);
    let paint = Rgb([220, 220, 220]);

    draw_filled_rect_mut(&mut frame, Rect::at(60 + 6 * i as i32, 130).of_size(80, 50), paint);
    draw_filled_rect_mut(&mut frame, Rect::at(50 + 20 * i as i32, 250).of_size(80, 50), paint);
    draw_filled_rect_mut(&mut frame, Rect::at(540, 280 + 8 * i as i32).of_size(60, 50), paint);

    frame
}

fn config(seed: u64) -> PipelineConfig {
    let mut config = PipelineConfig::default().with_seed(seed);
    config.violations.soft_violation_probability = 0.0;
    config
}

fn run(config: PipelineConfig) -> (TrafficPipeline, Vec<qtraffic::FrameReport>) {
    let mut pipeline = TrafficPipeline::new(config).unwrap();
    let frames: Vec<_> = (0..FRAMES).map(street).collect();
    let reports = pipeline.run(&frames).unwrap();

    (pipeline, reports)
}

fn track_near_y(report: &qtraffic::FrameReport, y: f32) -> &qtraffic::Track {
    report
        .iter()
        .find(|t| (t.position().y - y).abs() < 5.0)
        .unwrap()
}

#[test]
fn follows_three_vehicles() {
    let (pipeline, reports) = run(config(5));

    assert_eq!(reports.len(), FRAMES as usize);
    assert_eq!(pipeline.frames_processed(), FRAMES as u64);

    for report in &reports {
        assert_eq!(report.detections.len(), 3);
        assert_eq!(report.len(), 3);
    }

    // same three identities from the first to the last frame
    assert_eq!(pipeline.total_tracks(), 3);

    let last = reports.last().unwrap();
    let slow = track_near_y(last, 155.0);
    let fast = track_near_y(last, 275.0);

    assert!((slow.speed - 6.0).abs() < 0.5, "slow speed {}", slow.speed);
    assert!((fast.speed - 20.0).abs() < 0.5, "fast speed {}", fast.speed);
    assert_eq!(slow.first_seen, 0);
    assert_eq!(slow.last_seen, FRAMES as u64 - 1);
    assert_ne!(slow.kind, VehicleKind::Unknown);
}

#[test]
fn flags_only_the_racer() {
    let (_, reports) = run(config(5));
    let racer = track_near_y(&reports[0], 275.0).track_id;

    assert!(reports[0].violations.is_empty());

    for report in &reports[1..] {
        assert_eq!(report.violations.len(), 1);

        let v = &report.violations[0];
        assert_eq!(v.kind, ViolationKind::Speeding);
        assert_eq!(v.track_id, racer);
        assert_eq!(v.frame_id, report.frame_id);

        let attached = &report.track(racer).unwrap().violations;
        assert_eq!(attached, &report.violations);
    }
}

#[test]
fn queue_fills_as_vehicle_crosses_line() {
    let (pipeline, reports) = run(config(5));

    assert_eq!(reports[0].queue.count, 0);

    let last = reports.last().unwrap();
    assert_eq!(last.queue.count, 1);
    assert!((last.queue.density - 1.0 / 3.0).abs() < 1e-6);
    assert_eq!(pipeline.queue_metrics(), last.queue);

    for report in &reports {
        assert!((0.0..=1.0).contains(&report.queue.density));
        assert!(report.queue.count <= report.len());
    }
}

#[test]
fn same_seed_same_output() {
    let (_, a) = run(PipelineConfig::default().with_seed(99));
    let (_, b) = run(PipelineConfig::default().with_seed(99));

    assert_eq!(
        serde_json::to_string(&a).unwrap(),
        serde_json::to_string(&b).unwrap()
    );
}

#[test]
fn flow_history_and_prediction() {
    let mut pipeline = TrafficPipeline::new(config(1)).unwrap();

    for i in 0..9 {
        pipeline.process(&street(i)).unwrap();
    }
    assert_eq!(
        pipeline.congestion_prediction().trend,
        CongestionTrend::InsufficientData
    );

    pipeline.process(&street(9)).unwrap();
    assert_eq!(pipeline.flow_history().count(), 10);

    // constant vehicle count and speeds
    let p = pipeline.congestion_prediction();
    assert_eq!(p.trend, CongestionTrend::StableFlow);
    assert!((p.confidence - 0.6).abs() < 1e-6);
}

#[test]
fn reports_detection_stats_and_insights() {
    let (pipeline, _) = run(config(5));

    let stats = pipeline.detection_stats();
    assert_eq!(stats.frames_processed, FRAMES as usize);
    assert_eq!(stats.total_detections, 3 * FRAMES as usize);
    assert!((0.75..=0.98).contains(&stats.avg_confidence));
    assert_eq!(
        stats.vehicle_distribution.values().sum::<usize>(),
        3 * FRAMES as usize
    );

    let insights = pipeline.traffic_insights().unwrap();
    assert_eq!(insights.total_tracks, 3);
    assert_eq!(insights.active_tracks, 3);
    assert!((insights.flow_efficiency - 100.0).abs() < 1e-4);
}

#[test]
fn blank_frames_keep_tracks_until_timeout() {
    let mut pipeline = TrafficPipeline::new(config(2)).unwrap();
    pipeline.process(&street(0)).unwrap();

    let blank = RgbImage::new(640, 480);
    for _ in 0..29 {
        let report = pipeline.process(&blank).unwrap();
        assert!(report.detections.is_empty());
        assert_eq!(report.len(), 3);
    }

    let report = pipeline.process(&blank).unwrap();
    assert_eq!(report.frame_id, 30);
    assert!(report.is_empty());
    assert!(pipeline.traffic_insights().is_none());
}

#[test]
fn undersized_frame_fails_fast() {
    let mut pipeline = TrafficPipeline::new(config(2)).unwrap();
    let err = pipeline.process(&RgbImage::new(20, 20)).unwrap_err();

    assert!(matches!(err, Error::FrameTooSmall { .. }));
    assert_eq!(pipeline.frames_processed(), 0);
}

#[test]
fn external_detections_without_labels() {
    let mut pipeline = TrafficPipeline::new(config(3)).unwrap();
    let det = Detection::new(BBox::ltrb(100.0, 100.0, 150.0, 130.0));

    let report = pipeline.process_detections(vec![det]).unwrap();
    assert_eq!(report.frame_id, 0);

    let track = report.track(0).unwrap();
    assert_eq!(track.kind, VehicleKind::Unknown);
    assert!((track.confidence - 0.8).abs() < 1e-6);

    let shifted = Detection::new(BBox::ltrb(105.0, 100.0, 155.0, 130.0));
    let report = pipeline.process_detections(vec![shifted]).unwrap();

    let track = report.track(0).unwrap();
    assert!((track.speed - 5.0).abs() < 1e-6);
    assert_eq!(track.history_len(), 2);
    assert_eq!(report.matched_speeds.get(&0), Some(&5.0));
}

#[test]
fn every_assignment_mode_tracks_separated_vehicles() {
    for mode in [
        AssignmentMode::Greedy,
        AssignmentMode::GreedyExclusive,
        AssignmentMode::Optimal,
    ] {
        let mut config = config(4);
        config.association.mode = mode;

        let (pipeline, reports) = run(config);
        assert_eq!(pipeline.total_tracks(), 3, "{:?}", mode);
        assert_eq!(reports.last().unwrap().len(), 3, "{:?}", mode);
    }
}

#[test]
fn custom_classifier_labels_everything() {
    let mut pipeline = TrafficPipeline::with_classifier(config(0), |_: &Detection| {
        Some(qtraffic::Classification::new(VehicleKind::Bus, 0.99))
    })
    .unwrap();

    let report = pipeline.process(&street(0)).unwrap();
    assert!(report.iter().all(|t| t.kind == VehicleKind::Bus));
}
