// THEORY:
// This file is the main entry point for the `herald` library crate. It follows
// the standard Rust convention of using `lib.rs` to define the public API that
// will be exposed to external consumers (like the `herald_scanner` binary).
//
// The primary goal is to export the QR detection step (`scan_frame`), the
// announcement worker (`Announcer`), and the audio seams (`ToneEmitter`,
// `SpeechSynthesizer`) as the clean, high-level interface for the engine.
// Everything camera-related is deliberately kept out of this crate: the
// library works on plain grayscale buffers and strings, so it builds and
// tests without an OpenCV installation or any audio hardware present.

pub mod announce;
pub mod detect;
pub mod error;
pub mod speech;
pub mod tone;

pub use announce::{announcement_for, Announcer, AnnouncerConfig};
pub use detect::{scan_frame, Detection, Point};
pub use error::{HeraldError, Result};
pub use speech::{EspeakSynthesizer, NullSynthesizer, SpeechConfig, SpeechSynthesizer};
pub use tone::{SineTone, ToneConfig, ToneEmitter};
