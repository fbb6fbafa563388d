use image::{Rgb, RgbImage};
use imageproc::drawing::draw_filled_rect_mut;
use imageproc::rect::Rect;
use qtraffic::{PipelineConfig, TrafficPipeline};

const WIDTH: u32 = 640;
const HEIGHT: u32 = 480;

/// Vehicles as (x, y, width, height, dx, dy) at frame zero.
const VEHICLES: [(i32, i32, u32, u32, i32, i32); 4] = [
    (20, 120, 90, 50, 5, 0),
    (10, 230, 80, 45, 18, 0),
    (520, 60, 60, 60, 0, 9),
    (300, 330, 120, 60, -3, 1),
];

fn frame(i: i32) -> RgbImage {
    let mut img = RgbImage::new(WIDTH, HEIGHT);

    for &(x, y, w, h, dx, dy) in &VEHICLES {
        let (x, y) = (x + dx * i, y + dy * i);
        if x >= WIDTH as i32 || y >= HEIGHT as i32 || x + (w as i32) < 0 || y + (h as i32) < 0 {
            continue;
        }

        draw_filled_rect_mut(&mut img, Rect::at(x, y).of_size(w, h), Rgb([210, 210, 210]));
    }

    img
}

fn main() -> Result<(), qtraffic::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "qtraffic=info".into()),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let config = match args.next() {
        Some(path) => PipelineConfig::from_path(path)?,
        None => PipelineConfig::default().with_seed(7),
    };
    let frames: i32 = args.next().and_then(|n| n.parse().ok()).unwrap_or(40);

    let mut pipeline = TrafficPipeline::new(config)?;

    for i in 0..frames {
        let report = pipeline.process(&frame(i))?;

        println!(
            "frame {:>3}: {} detections, {} tracks, queue {} ({:.2}), {} violations",
            report.frame_id,
            report.detections.len(),
            report.len(),
            report.queue.count,
            report.queue.density,
            report.violations.len()
        );

        for v in &report.violations {
            println!(
                "    track {} {} {:.2}{}",
                v.track_id,
                v.kind,
                v.confidence,
                v.detail.as_deref().map(|d| format!(" ({})", d)).unwrap_or_default()
            );
        }
    }

    let prediction = pipeline.congestion_prediction();
    println!("congestion: {} ({:.2})", prediction.trend, prediction.confidence);
    println!("{}", serde_json::to_string_pretty(&pipeline.detection_stats())?);

    if let Some(insights) = pipeline.traffic_insights() {
        println!("{}", serde_json::to_string_pretty(&insights)?);
    }

    Ok(())
}
