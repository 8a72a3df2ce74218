use std::error::Error;
use std::path::Path;

use objdet::app::{init_tracing, DetectorConfig};
use objdet::Detector;

fn usage() -> ! {
    eprintln!("usage: objdet <config.yaml> <image>...");
    std::process::exit(2);
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn Error>> {
    init_tracing();

    let mut args = std::env::args().skip(1);
    let config_path = args.next().unwrap_or_else(|| usage());
    let images: Vec<String> = args.collect();
    if images.is_empty() {
        usage();
    }

    let config = DetectorConfig::from_file(Path::new(&config_path))?;
    tracing::info!(%config, "starting detector");

    let detector = Detector::new(&config);
    detector.load_all().await?;

    for path in images {
        let image = image::open(&path)?;
        let detections = detector.detect(&image).await?;
        tracing::info!(path = %path, count = detections.len(), "detected");
        for det in &detections {
            tracing::trace!(path = %path, %det, "detection");
        }
        println!("{}", serde_json::json!({ "image": path, "detections": detections }));
    }

    Ok(())
}
