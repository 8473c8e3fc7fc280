use log::{debug, error, info, warn};
use std::collections::HashMap;
use std::fs;
use std::future::Future;
use time::OffsetDateTime;
use tokio::sync::oneshot;

use tiltplate::bluetooth::scanner::scan_advertisements;
use tiltplate::bluetooth::{BeaconFormat, TiltDecoder};
use tiltplate::config::WakeConfig;
use tiltplate::display::{pack, read_png, FrameBuffer, Quantizer};
use tiltplate::models::{SensorReading, TiltColor};
use tiltplate::utils::{format_datetime, ink_counts, reading_labels};

/// Scan for hydrometers; any radio failure degrades to "no sensor data"
async fn collect_readings(config: &WakeConfig) -> HashMap<TiltColor, SensorReading> {
    let records = match scan_advertisements(config.scan_duration).await {
        Ok(records) => records,
        Err(e) => {
            error!("Scan failed: {}", e);
            return HashMap::new();
        }
    };

    let format = BeaconFormat::TILT.with_temperature_scale(config.temperature_scale);
    let mut decoder = TiltDecoder::with_format(format);
    decoder.decode_batch(&records)
}

/// Dither the beer image and write both planes for the display driver
fn render_frame(config: &WakeConfig) -> Result<FrameBuffer, Box<dyn std::error::Error>> {
    let image = read_png(&config.image_path)?;
    info!(
        "Rendering {} ({}x{})",
        config.image_path.display(),
        image.width,
        image.height
    );

    let report = Quantizer::default().dither(&image.pixels, image.width, image.height);
    let [r, g, b] = report.dropped_error();
    debug!("Dither error dropped at edges: r={:.1} g={:.1} b={:.1}", r, g, b);
    let frame = pack(report.grid());

    fs::create_dir_all(&config.output_dir)?;
    fs::write(config.output_dir.join("black.bin"), &frame.black)?;
    fs::write(config.output_dir.join("red.bin"), &frame.red)?;

    Ok(frame)
}

async fn wake_cycle(config: WakeConfig) -> Result<(), Box<dyn std::error::Error>> {
    let start_time = OffsetDateTime::now_utc();
    info!("Wake cycle started at: {}", format_datetime(&start_time));

    let frame = render_frame(&config)?;
    let (white, black, red) = ink_counts(&frame);
    info!(
        "Frame written to {}: {} white, {} black, {} red pixels",
        config.output_dir.display(),
        white,
        black,
        red
    );

    let readings = collect_readings(&config).await;

    let mut colors: Vec<_> = readings.keys().copied().collect();
    colors.sort();
    for color in colors {
        let reading = &readings[&color];
        let (plato, celsius) = reading_labels(reading);
        info!("Summary for {} Tilt:", color);
        info!("  Temperature: {:.1}F ({})", reading.temperature_f, celsius);
        info!(
            "  Specific gravity: {:.3} ({})",
            reading.specific_gravity, plato
        );
        info!("  Based on {} samples", reading.samples);
    }

    if readings.is_empty() {
        warn!("No hydrometer data collected during this wake cycle!");
    }

    Ok(())
}

/// Fire `tx` once `signal` resolves
///
/// If the signal listener itself fails the sender is held forever, so the
/// wake cycle runs to completion instead of looking interrupted.
async fn forward_interrupt<F>(signal: F, tx: oneshot::Sender<()>)
where
    F: Future<Output = std::io::Result<()>>,
{
    match signal.await {
        Ok(()) => {
            let _ = tx.send(());
        }
        Err(e) => {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
            drop(tx);
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .format_timestamp_secs()
        .init();

    // Load configuration
    let config = match WakeConfig::new() {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            return Err(e);
        }
    };

    // Handle Ctrl+C gracefully
    let (tx, mut rx) = oneshot::channel();
    tokio::spawn(forward_interrupt(tokio::signal::ctrl_c(), tx));

    tokio::select! {
        result = wake_cycle(config) => {
            match result {
                Ok(_) => info!("Wake cycle completed successfully"),
                Err(e) => {
                    error!("Fatal error: {}", e);
                    return Err(e);
                }
            }
        }
        _ = &mut rx => {
            info!("Wake cycle interrupted by user. Exiting gracefully.");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn signal_interrupts_the_cycle() {
        let (tx, rx) = oneshot::channel();
        tokio::spawn(forward_interrupt(async { Ok::<(), std::io::Error>(()) }, tx));
        let outcome = tokio::time::timeout(Duration::from_secs(1), rx).await;
        assert!(matches!(outcome, Ok(Ok(()))));
    }

    #[tokio::test]
    async fn failed_listener_does_not_interrupt() {
        let (tx, rx) = oneshot::channel();
        tokio::spawn(forward_interrupt(
            async { Err::<(), _>(std::io::Error::other("no signal handler")) },
            tx,
        ));
        // A dropped sender would resolve `rx` with an error right away
        let outcome = tokio::time::timeout(Duration::from_millis(100), rx).await;
        assert!(outcome.is_err());
    }
}
