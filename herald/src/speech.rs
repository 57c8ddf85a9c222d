// THEORY:
// The `speech` module turns announcement text into audible speech. The
// `SpeechSynthesizer` trait decouples the announcer worker from any concrete
// engine; the production implementation drives a local espeak-family CLI
// program, and `NullSynthesizer` stands in on machines without one so the
// tone and console output keep working.
//
// Key architectural principles:
// 1.  **One Engine Per Process**: probing for a binary, listing voices, and
//     picking the announcement voice all happen once, at construction. Each
//     `speak` call only runs the already-configured program.
// 2.  **Blocking By Contract**: `speak` returns when the engine process
//     exits, which is when playback ends. The worker relies on this to keep
//     utterances strictly sequential.
// 3.  **Voice Selection By Name**: the engine's language and variant voice
//     tables are scanned for the first name containing a feminine-voice
//     marker, case-insensitively. No match keeps the engine's default voice.

use std::process::{Command, Stdio};

use tracing::{debug, info, warn};

use crate::error::{HeraldError, Result};

/// Voice-name markers for the announcement voice, checked as
/// case-insensitive substrings in listing order.
const FEMININE_VOICE_MARKERS: [&str; 2] = ["zira", "female"];

/// Engine binaries probed at construction, in preference order.
const ENGINE_CANDIDATES: [&str; 2] = ["espeak-ng", "espeak"];

/// Contract for speech backends.
pub trait SpeechSynthesizer: Send {
    /// Speaks `text`, blocking until playback has finished.
    fn speak(&mut self, text: &str) -> Result<()>;
}

/// Configuration for `EspeakSynthesizer`.
#[derive(Debug, Clone)]
pub struct SpeechConfig {
    /// Speaking rate in words per minute.
    pub rate_wpm: u32,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self { rate_wpm: 150 }
    }
}

/// One voice reported by the engine's voice listings.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Voice {
    /// Human-readable voice name, as listed by the engine.
    name: String,
    /// Identifier passed back to the engine via `-v` to select the voice.
    identifier: String,
}

/// Speech engine backed by a local espeak-family CLI program.
pub struct EspeakSynthesizer {
    program: String,
    voice: Option<String>,
    rate_wpm: u32,
}

impl EspeakSynthesizer {
    /// Probes for an engine binary, lists its voices, and picks the
    /// announcement voice. The selection is fixed for the process lifetime.
    ///
    /// # Errors
    /// Returns `HeraldError::SpeechUnavailable` when no engine binary runs.
    pub fn new(config: SpeechConfig) -> Result<Self> {
        let (program, listing) = probe_engine()?;
        let mut voices = parse_voice_table(&listing);
        voices.extend(parse_voice_table(&list_variant_voices(&program)));
        let voice = pick_feminine_voice(&voices).map(|v| v.identifier.clone());
        match &voice {
            Some(id) => info!("speech engine {program}, voice {id}"),
            None => info!("speech engine {program}, default voice"),
        }
        Ok(Self {
            program,
            voice,
            rate_wpm: config.rate_wpm,
        })
    }
}

impl SpeechSynthesizer for EspeakSynthesizer {
    fn speak(&mut self, text: &str) -> Result<()> {
        let mut cmd = Command::new(&self.program);
        cmd.arg("-s").arg(self.rate_wpm.to_string());
        if let Some(voice) = &self.voice {
            cmd.arg("-v").arg(voice);
        }
        // Engine chatter is discarded; stdout carries announcement lines only.
        let status = cmd
            .arg(text)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()?;
        if !status.success() {
            return Err(HeraldError::Speech(format!(
                "{} exited with {status}",
                self.program
            )));
        }
        Ok(())
    }
}

/// Stand-in used when no engine binary is installed. Logs each utterance and
/// reports success so the rest of the announcement still happens.
#[derive(Debug, Default)]
pub struct NullSynthesizer;

impl SpeechSynthesizer for NullSynthesizer {
    fn speak(&mut self, text: &str) -> Result<()> {
        debug!("no speech engine, skipping utterance: {text}");
        Ok(())
    }
}

/// Finds the first working engine binary and returns its `--voices` listing.
fn probe_engine() -> Result<(String, String)> {
    for candidate in ENGINE_CANDIDATES {
        match Command::new(candidate).arg("--voices").output() {
            Ok(output) if output.status.success() => {
                let listing = String::from_utf8_lossy(&output.stdout).into_owned();
                return Ok((candidate.to_string(), listing));
            }
            Ok(output) => {
                warn!("{candidate} --voices exited with {}", output.status);
            }
            Err(e) => {
                debug!("{candidate} not available: {e}");
            }
        }
    }
    Err(HeraldError::SpeechUnavailable)
}

/// Lists the engine's variant voices. Plain `--voices` reports only language
/// voices, whose names never carry a feminine marker; the `female1`-`female5`
/// variants live in the `--voices=variant` table.
fn list_variant_voices(program: &str) -> String {
    match Command::new(program).arg("--voices=variant").output() {
        Ok(output) if output.status.success() => {
            String::from_utf8_lossy(&output.stdout).into_owned()
        }
        Ok(output) => {
            debug!("{program} --voices=variant exited with {}", output.status);
            String::new()
        }
        Err(e) => {
            debug!("{program} --voices=variant failed to run: {e}");
            String::new()
        }
    }
}

/// Parses one engine voice table (`--voices` or `--voices=variant`).
///
/// Rows are whitespace-separated: priority, language, age/gender, name,
/// identifier. The header and any row without all five columns are skipped.
fn parse_voice_table(listing: &str) -> Vec<Voice> {
    listing
        .lines()
        .skip(1)
        .filter_map(|line| {
            let mut cols = line.split_whitespace();
            let _priority = cols.next()?;
            let _language = cols.next()?;
            let _gender = cols.next()?;
            let name = cols.next()?;
            let identifier = cols.next()?;
            Some(Voice {
                name: name.to_string(),
                identifier: identifier.to_string(),
            })
        })
        .collect()
}

/// Selects the first listed voice whose name contains one of the markers,
/// case-insensitively. `None` keeps the engine's default voice.
fn pick_feminine_voice(voices: &[Voice]) -> Option<&Voice> {
    voices.iter().find(|v| {
        let name = v.name.to_lowercase();
        FEMININE_VOICE_MARKERS.iter().any(|m| name.contains(m))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const LANGUAGE_LISTING: &str = "\
Pty Language       Age/Gender VoiceName          File                 Other Languages
 5  af              --/M      Afrikaans          gmw/af
 5  en-gb           --/M      English            gmw/en-GB            (en 2)
";

    const VARIANT_LISTING: &str = "\
Pty Language       Age/Gender VoiceName          File                 Other Languages
 5  variant         --/M      male1              !v/m1
 5  variant         --/F      female1            !v/f1
 5  variant         --/F      female2            !v/f2
";

    #[test]
    fn voice_rows_parse_name_and_identifier() {
        let voices = parse_voice_table(LANGUAGE_LISTING);
        assert_eq!(voices.len(), 2);
        assert_eq!(voices[0].name, "Afrikaans");
        assert_eq!(voices[0].identifier, "gmw/af");

        let variants = parse_voice_table(VARIANT_LISTING);
        assert_eq!(variants.len(), 3);
        assert_eq!(variants[1].name, "female1");
        assert_eq!(variants[1].identifier, "!v/f1");
    }

    #[test]
    fn header_and_short_rows_are_skipped() {
        let listing = "\
Pty Language       Age/Gender VoiceName          File
 5  af              --/M      Afrikaans          gmw/af
garbage line
 5  incomplete
";
        let voices = parse_voice_table(listing);
        assert_eq!(voices.len(), 1);
        assert_eq!(voices[0].name, "Afrikaans");
    }

    #[test]
    fn first_matching_voice_wins() {
        let mut voices = parse_voice_table(LANGUAGE_LISTING);
        voices.extend(parse_voice_table(VARIANT_LISTING));
        let picked = pick_feminine_voice(&voices).unwrap();
        assert_eq!(picked.name, "female1");
        assert_eq!(picked.identifier, "!v/f1");
    }

    #[test]
    fn language_voices_alone_leave_the_default_voice() {
        let voices = parse_voice_table(LANGUAGE_LISTING);
        assert!(pick_feminine_voice(&voices).is_none());
    }

    #[test]
    fn markers_match_case_insensitively() {
        let voices = vec![Voice {
            name: "ZIRA Desktop".into(),
            identifier: "zira-1".into(),
        }];
        let picked = pick_feminine_voice(&voices).unwrap();
        assert_eq!(picked.identifier, "zira-1");
    }

    #[test]
    fn empty_listing_yields_no_voices() {
        assert!(parse_voice_table("").is_empty());
    }
}
