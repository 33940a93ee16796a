//! Record a vocal take from the default input device.
//!
//! Captures for 5 seconds while printing the input meter, then persists the
//! take as `vocal_take_<timestamp>_omotiv.wav` in the current directory.
//!
//! Run with: cargo run --example record_take

use std::time::Duration;

use omotiv_audio::CaptureSession;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing for debug output
    tracing_subscriber::fmt::init();

    println!("Recording from the default input for 5 seconds...");

    let session = CaptureSession::builder()
        .output_dir(".")
        .on_event(|event| tracing::warn!(?event, "capture event"))
        .start()
        .await?;

    // Poll the meter the way the booth UI does
    for _ in 0..50 {
        tokio::time::sleep(Duration::from_millis(100)).await;
        let meter = "#".repeat((session.input_level() * 40.0) as usize);
        println!("[{:5.1}s] {}", session.elapsed().as_secs_f32(), meter);
    }

    let stats = session.stats();
    match session.stop(true).await? {
        Some(path) => println!("Take saved to {}", path.display()),
        None => println!("Nothing recorded."),
    }
    println!("Stats: {stats:?}");

    Ok(())
}
