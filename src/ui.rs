//! Terminal status indicators and result rendering
//!
//! The recognition cycle is always in exactly one [`Phase`]; [`StatusUi`]
//! owns at most one spinner at a time and swaps it on every transition, so
//! two phase indicators can never be visible together.

use crate::recognition::{RecognitionError, TrackMatch};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Where the recognition cycle currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    RequestingMicrophone,
    Listening,
    Processing,
    ShowingResult,
}

impl Phase {
    /// Legal transitions of the recognition cycle
    pub fn can_transition_to(self, next: Phase) -> bool {
        use Phase::*;
        matches!(
            (self, next),
            (Idle, RequestingMicrophone)
                | (RequestingMicrophone, Listening)
                | (RequestingMicrophone, Idle)
                | (Listening, Processing)
                | (Processing, ShowingResult)
                | (ShowingResult, RequestingMicrophone)
                | (ShowingResult, Idle)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Idle => "Ready",
            Phase::RequestingMicrophone => "Requesting microphone",
            Phase::Listening => "Listening",
            Phase::Processing => "Identifying",
            Phase::ShowingResult => "Result",
        }
    }
}

/// Spinner-backed status display for the transient phases
pub struct StatusUi {
    phase: Phase,
    spinner: Option<ProgressBar>,
}

impl StatusUi {
    pub fn new() -> Self {
        Self {
            phase: Phase::Idle,
            spinner: None,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Move to the next phase, clearing the previous indicator and showing
    /// the next one in a single step
    pub fn set_phase(&mut self, next: Phase) {
        debug_assert!(
            self.phase.can_transition_to(next),
            "invalid phase transition {} -> {}",
            self.phase.as_str(),
            next.as_str()
        );

        if let Some(pb) = self.spinner.take() {
            pb.finish_and_clear();
        }

        self.spinner = match next {
            Phase::RequestingMicrophone => Some(spinner("Requesting microphone access...")),
            Phase::Listening => Some(spinner("Listening... press Enter to stop early")),
            Phase::Processing => Some(spinner("Identifying...")),
            Phase::Idle | Phase::ShowingResult => None,
        };
        self.phase = next;
    }

    /// Abort the cycle: clear any indicator and return to Idle regardless of
    /// the current phase, so an error never leaves a spinner on screen
    pub fn reset(&mut self) {
        if let Some(pb) = self.spinner.take() {
            pb.finish_and_clear();
        }
        self.phase = Phase::Idle;
    }
}

impl Default for StatusUi {
    fn default() -> Self {
        Self::new()
    }
}

/// Build a ticking spinner with the given message
pub fn spinner(message: &'static str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.enable_steady_tick(Duration::from_millis(100));
    pb.set_message(message);
    pb
}

/// Truncate to at most `max` characters, keeping whole characters so
/// multibyte device names never split mid-sequence
pub fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

const LYRICS_PLACEHOLDER: &str = "Lyrics not available";

/// Render the track panel: metadata lines, art URL, then lyrics
pub fn render_track(track: &TrackMatch) -> String {
    let mut out = String::new();

    out.push_str(&format!("{:<14} {}\n", "Title:", track.title));
    out.push_str(&format!("{:<14} {}\n", "Artist:", track.artist));
    out.push_str(&format!("{:<14} {}\n", "Album:", track.album));
    out.push_str(&format!("{:<14} {}\n", "Genre:", track.genre));
    out.push_str(&format!("{:<14} {}\n", "Release Date:", track.release_date));

    if let Some(art) = track.images.best() {
        out.push_str(&format!("{:<14} {}\n", "Cover Art:", art));
    }
    if let Some(url) = &track.url {
        out.push_str(&format!("{:<14} {}\n", "Link:", url));
    }

    out.push_str("\nLyrics:\n");
    out.push_str(&render_lyrics(&track.lyrics));
    out
}

/// One line per lyric in received order, or the placeholder
pub fn render_lyrics(lyrics: &[String]) -> String {
    if lyrics.is_empty() {
        LYRICS_PLACEHOLDER.to_string()
    } else {
        lyrics.join("\n")
    }
}

/// Render a failed cycle for the error panel
pub fn render_failure(err: &RecognitionError) -> String {
    err.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recognition::ArtLinks;

    fn sample_track() -> TrackMatch {
        TrackMatch {
            title: "Title".to_string(),
            artist: "Artist".to_string(),
            album: "Album".to_string(),
            genre: "Genre".to_string(),
            release_date: "2020-01-01".to_string(),
            images: ArtLinks {
                coverart: Some("A".to_string()),
                coverarthq: Some("B".to_string()),
                background: Some("C".to_string()),
            },
            lyrics: vec!["line1".to_string(), "line2".to_string()],
            url: None,
        }
    }

    #[test]
    fn test_transition_table() {
        use Phase::*;
        let legal = [
            (Idle, RequestingMicrophone),
            (RequestingMicrophone, Listening),
            (RequestingMicrophone, Idle),
            (Listening, Processing),
            (Processing, ShowingResult),
            (ShowingResult, RequestingMicrophone),
            (ShowingResult, Idle),
        ];
        for (from, to) in legal {
            assert!(from.can_transition_to(to), "{:?} -> {:?}", from, to);
        }

        // A cycle can never skip the processing step or run backwards
        assert!(!Idle.can_transition_to(Listening));
        assert!(!Listening.can_transition_to(Idle));
        assert!(!Listening.can_transition_to(ShowingResult));
        assert!(!Processing.can_transition_to(Listening));
        assert!(!Idle.can_transition_to(Idle));
    }

    #[test]
    fn test_status_ui_walks_a_full_cycle() {
        let mut ui = StatusUi::new();
        assert_eq!(ui.phase(), Phase::Idle);
        for next in [
            Phase::RequestingMicrophone,
            Phase::Listening,
            Phase::Processing,
            Phase::ShowingResult,
            Phase::Idle,
        ] {
            ui.set_phase(next);
            assert_eq!(ui.phase(), next);
        }
    }

    #[test]
    fn test_status_ui_reset_aborts_any_phase() {
        let mut ui = StatusUi::new();
        ui.set_phase(Phase::RequestingMicrophone);
        ui.set_phase(Phase::Listening);
        ui.set_phase(Phase::Processing);

        ui.reset();
        assert_eq!(ui.phase(), Phase::Idle);

        // A fresh cycle can start after the abort
        ui.set_phase(Phase::RequestingMicrophone);
        assert_eq!(ui.phase(), Phase::RequestingMicrophone);

        // Reset is also fine when nothing is in flight
        ui.reset();
        ui.reset();
        assert_eq!(ui.phase(), Phase::Idle);
    }

    #[test]
    fn test_truncate_chars_multibyte_names() {
        let name = "Микрофонное устройство ввода USB";
        let truncated = truncate_chars(name, 30);
        assert_eq!(truncated.chars().count(), 30);
        assert!(name.starts_with(truncated));

        assert_eq!(truncate_chars("short", 30), "short");
        assert_eq!(truncate_chars("", 30), "");
        assert_eq!(truncate_chars("abcdef", 3), "abc");
    }

    #[test]
    fn test_render_lyrics_in_order() {
        let rendered = render_lyrics(&["line1".to_string(), "line2".to_string()]);
        assert_eq!(rendered, "line1\nline2");
    }

    #[test]
    fn test_render_lyrics_placeholder() {
        assert_eq!(render_lyrics(&[]), LYRICS_PLACEHOLDER);
    }

    #[test]
    fn test_render_track_uses_preferred_art() {
        let rendered = render_track(&sample_track());
        assert!(rendered.contains("Cover Art:     A"));
        assert!(!rendered.contains('B'));
        assert!(rendered.contains("line1\nline2"));
    }

    #[test]
    fn test_render_track_without_art_or_lyrics() {
        let mut track = sample_track();
        track.images = ArtLinks::default();
        track.lyrics.clear();
        let rendered = render_track(&track);
        assert!(!rendered.contains("Cover Art:"));
        assert!(rendered.contains(LYRICS_PLACEHOLDER));
    }

    #[test]
    fn test_render_failure_verbatim_service_error() {
        let err = RecognitionError::Service("No match found".to_string());
        assert_eq!(render_failure(&err), "No match found");
    }
}
