use anyhow::{bail, Context, Result};
use herald::{
    announcement_for, scan_frame, Announcer, AnnouncerConfig, Detection, EspeakSynthesizer,
    NullSynthesizer, SineTone, SpeechConfig, SpeechSynthesizer, ToneConfig,
};
use image::GrayImage;
use opencv::{
    core::{Mat, Point, Scalar},
    highgui, imgproc,
    prelude::*,
    videoio::{self, VideoCapture},
};
use tracing::{info, trace, warn};

/// Camera device index to open. The counter camera is the second device on
/// the host.
const CAMERA_INDEX: i32 = 1;

/// Title of the live preview window.
const WINDOW_TITLE: &str = "QR Scanner (Press q to quit)";

/// Key that stops the scan loop.
const QUIT_KEY: i32 = 'q' as i32;

fn main() -> Result<()> {
    // --- 1. Logging & Announcer Setup ---
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let speech: Box<dyn SpeechSynthesizer> = match EspeakSynthesizer::new(SpeechConfig::default()) {
        Ok(engine) => Box::new(engine),
        Err(e) => {
            warn!("speech disabled: {e}");
            Box::new(NullSynthesizer)
        }
    };
    let tone = Box::new(SineTone::new(ToneConfig::default()));
    let announcer = Announcer::spawn(AnnouncerConfig::default(), tone, speech);

    // --- 2. Camera & Window Initialization ---
    let mut cap = VideoCapture::new(CAMERA_INDEX, videoio::CAP_ANY)
        .with_context(|| format!("opening camera {CAMERA_INDEX}"))?;
    if !cap.is_opened()? {
        bail!("camera {CAMERA_INDEX} could not be opened");
    }

    let frame_width = cap.get(videoio::CAP_PROP_FRAME_WIDTH)?;
    let frame_height = cap.get(videoio::CAP_PROP_FRAME_HEIGHT)?;
    let fps = cap.get(videoio::CAP_PROP_FPS)?;
    info!("camera {CAMERA_INDEX} open: {frame_width}x{frame_height} @ {fps} fps");

    highgui::named_window(WINDOW_TITLE, highgui::WINDOW_AUTOSIZE)?;
    println!("Scanning for QR codes... Press 'q' to quit.");

    // --- 3. Main Scan Loop ---
    let mut frame = Mat::default();
    loop {
        let read_ok = cap.read(&mut frame).context("reading camera frame")?;
        if !frame_usable(read_ok, frame.empty()) {
            // A missed frame is routine; retry immediately.
            trace!("camera returned no frame");
            continue;
        }

        // --- 4. Frame Conversion & QR Decoding ---
        let detections = scan_frame(grayscale(&frame)?);

        // --- 5. Overlay & Announcement Hand-Off ---
        for detection in &detections {
            let label = announcement_for(&detection.text);
            draw_detection(&mut frame, detection, &label)?;
            announcer.announce(label);
        }

        // --- 6. Display & Quit Poll ---
        highgui::imshow(WINDOW_TITLE, &frame)?;
        let key = highgui::wait_key(1)?;
        if should_quit(key) {
            break;
        }
    }

    // --- 7. Teardown ---
    info!(
        "stopping; {} announcements dropped",
        announcer.dropped_announcements()
    );
    announcer.shutdown();
    cap.release()?;
    highgui::destroy_all_windows()?;
    Ok(())
}

/// A capture attempt reaches the scan step only when the read reported
/// success and produced a non-empty frame.
fn frame_usable(read_ok: bool, empty: bool) -> bool {
    read_ok && !empty
}

/// Converts a BGR camera frame into the grayscale buffer the decoder wants.
fn grayscale(frame: &Mat) -> Result<GrayImage> {
    let mut gray = Mat::default();
    imgproc::cvt_color(frame, &mut gray, imgproc::COLOR_BGR2GRAY, 0)?;
    let width = gray.cols() as u32;
    let height = gray.rows() as u32;
    let data = gray.data_bytes()?.to_vec();
    GrayImage::from_raw(width, height, data)
        .context("grayscale buffer does not match frame dimensions")
}

/// Draws the closed bounding polygon and the announcement label for one
/// detected code.
fn draw_detection(frame: &mut Mat, detection: &Detection, label: &str) -> opencv::Result<()> {
    let green = Scalar::new(0.0, 255.0, 0.0, 0.0); // BGR

    for (from, to) in detection.outline() {
        imgproc::line(
            frame,
            Point::new(from.x, from.y),
            Point::new(to.x, to.y),
            green,
            2,
            imgproc::LINE_8,
            0,
        )?;
    }

    if let Some(anchor) = detection.label_anchor() {
        imgproc::put_text(
            frame,
            label,
            Point::new(anchor.x, anchor.y),
            imgproc::FONT_HERSHEY_SIMPLEX,
            0.6,
            green,
            2,
            imgproc::LINE_8,
            false,
        )?;
    }

    Ok(())
}

/// The quit key is compared against the low byte of `wait_key`'s result,
/// which is -1 when no key was pressed within the poll window.
fn should_quit(key: i32) -> bool {
    key & 0xff == QUIT_KEY
}

#[cfg(test)]
mod tests {
    use super::{frame_usable, should_quit};

    #[test]
    fn quit_key_stops_the_loop() {
        assert!(should_quit('q' as i32));
    }

    #[test]
    fn other_keys_keep_running() {
        assert!(!should_quit('a' as i32));
        assert!(!should_quit('Q' as i32));
        assert!(!should_quit(27));
    }

    #[test]
    fn no_key_keeps_running() {
        assert!(!should_quit(-1));
    }

    #[test]
    fn quit_key_matches_through_high_bits() {
        // Some backends set modifier bits above the low byte.
        assert!(should_quit(0x10000 | ('q' as i32)));
    }

    #[test]
    fn missed_reads_never_reach_the_scan_step() {
        assert!(!frame_usable(false, true));
        // A failed read can leave stale pixels behind; still a miss.
        assert!(!frame_usable(false, false));
        assert!(!frame_usable(true, true));
        assert!(frame_usable(true, false));
    }

    #[test]
    fn a_miss_streak_skips_scans_until_a_good_frame() {
        let mut attempts = vec![(false, true); 100];
        attempts.push((true, false));

        let scans: Vec<bool> = attempts
            .into_iter()
            .map(|(read_ok, empty)| frame_usable(read_ok, empty))
            .collect();

        assert!(scans[..100].iter().all(|&scanned| !scanned));
        assert!(scans[100]);
    }
}
