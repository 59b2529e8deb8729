//! Energy based voice activity detection.
//!
//! The signal is cut into centred RMS frames; a frame is voiced when its RMS
//! exceeds the threshold. Runs of voiced frames become intervals, short runs are
//! discarded and intervals separated by less than the merge gap are joined.

use std::fmt::Write as _;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::decode::{AudioDecoder, DecodedAudio};
use crate::error::{MvError, Result, require_file};
use crate::support::time::{format_seconds, round2};

pub const DEFAULT_THRESHOLD: f64 = 0.02;
pub const DEFAULT_MIN_DURATION: f64 = 0.3;
pub const DEFAULT_MERGE_GAP: f64 = 0.2;

const FRAME_LENGTH: usize = 2048;
const HOP_LENGTH: usize = 512;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VoicedInterval {
    pub start: f64,
    pub end: f64,
}

impl VoicedInterval {
    pub fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }

    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DetectionReport {
    pub intervals: Vec<VoicedInterval>,
    pub threshold: f64,
    pub min_duration: f64,
    /// Length of the analysed audio in seconds.
    pub audio_duration: f64,
}

impl DetectionReport {
    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }

    pub fn len(&self) -> usize {
        self.intervals.len()
    }

    pub fn summary(&self) -> String {
        if self.intervals.is_empty() {
            return format!(
                "No voice detected at threshold {}; try a lower threshold.",
                self.threshold
            );
        }

        let mut text = format!(
            "Detected {} voice segment(s) in {:.2}s of audio:\n",
            self.intervals.len(),
            self.audio_duration
        );
        for (idx, interval) in self.intervals.iter().enumerate() {
            let _ = writeln!(
                text,
                "{}. {}s → {}s (duration {:.2}s)",
                idx + 1,
                format_seconds(interval.start),
                format_seconds(interval.end),
                interval.duration()
            );
        }
        text.push_str("\nWrite one subtitle line per segment.");
        text
    }
}

#[derive(Debug, Clone)]
pub struct VoiceActivityDetector {
    threshold: f64,
    min_duration: f64,
    merge_gap: f64,
}

impl VoiceActivityDetector {
    pub fn new(threshold: f64, min_duration: f64) -> Result<Self> {
        if !(threshold > 0.0 && threshold < 1.0) {
            return Err(MvError::InvalidParameter(format!(
                "threshold must be between 0 and 1 (exclusive), got {threshold}"
            )));
        }
        if !(min_duration.is_finite() && min_duration > 0.0) {
            return Err(MvError::InvalidParameter(format!(
                "minimum duration must be positive, got {min_duration}"
            )));
        }

        Ok(Self {
            threshold,
            min_duration,
            merge_gap: DEFAULT_MERGE_GAP,
        })
    }

    pub fn with_merge_gap(mut self, merge_gap: f64) -> Result<Self> {
        if !(merge_gap.is_finite() && merge_gap >= 0.0) {
            return Err(MvError::InvalidParameter(format!(
                "merge gap must not be negative, got {merge_gap}"
            )));
        }
        self.merge_gap = merge_gap;
        Ok(self)
    }

    pub fn detect(&self, audio: &Path, decoder: &dyn AudioDecoder) -> Result<DetectionReport> {
        require_file("Audio file", audio)?;
        let decoded = decoder.decode(audio).map_err(MvError::Decode)?;
        Ok(DetectionReport {
            intervals: self.detect_samples(&decoded),
            threshold: self.threshold,
            min_duration: self.min_duration,
            audio_duration: round2(decoded.duration()),
        })
    }

    pub fn detect_samples(&self, audio: &DecodedAudio) -> Vec<VoicedInterval> {
        if audio.samples.is_empty() || audio.sample_rate == 0 {
            return Vec::new();
        }

        let energy = rms_frames(&audio.samples, FRAME_LENGTH, HOP_LENGTH);
        let sample_rate = f64::from(audio.sample_rate);
        let time_of = |frame: usize| (frame * HOP_LENGTH) as f64 / sample_rate;

        let mut segments = Vec::new();
        let mut open: Option<f64> = None;

        for (idx, rms) in energy.iter().enumerate() {
            let voiced = f64::from(*rms) > self.threshold;
            match (voiced, open) {
                (true, None) => open = Some(time_of(idx)),
                (false, Some(start)) => {
                    self.push_if_long_enough(&mut segments, start, time_of(idx));
                    open = None;
                }
                _ => {}
            }
        }

        if let Some(start) = open {
            self.push_if_long_enough(&mut segments, start, time_of(energy.len() - 1));
        }

        merge_close(segments, self.merge_gap)
    }

    fn push_if_long_enough(&self, segments: &mut Vec<VoicedInterval>, start: f64, end: f64) {
        if end - start >= self.min_duration {
            segments.push(VoicedInterval::new(round2(start), round2(end)));
        }
    }
}

/// Root-mean-square energy of centred, zero-padded frames.
///
/// Frame `i` is centred on sample `i * hop`, giving `1 + len / hop` frames.
fn rms_frames(samples: &[f32], frame_length: usize, hop_length: usize) -> Vec<f32> {
    let mut prefix = Vec::with_capacity(samples.len() + 1);
    prefix.push(0.0f64);
    let mut acc = 0.0f64;
    for sample in samples {
        acc += f64::from(*sample) * f64::from(*sample);
        prefix.push(acc);
    }

    let half = frame_length / 2;
    let frames = 1 + samples.len() / hop_length;
    (0..frames)
        .map(|idx| {
            let center = idx * hop_length;
            let lo = center.saturating_sub(half).min(samples.len());
            let hi = (center + frame_length - half).min(samples.len());
            let energy = prefix[hi] - prefix[lo];
            (energy / frame_length as f64).sqrt() as f32
        })
        .collect()
}

fn merge_close(segments: Vec<VoicedInterval>, merge_gap: f64) -> Vec<VoicedInterval> {
    let mut merged: Vec<VoicedInterval> = Vec::with_capacity(segments.len());
    for segment in segments {
        match merged.last_mut() {
            Some(last) if segment.start - last.end < merge_gap => last.end = segment.end,
            _ => merged.push(segment),
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use tempfile::NamedTempFile;

    const RATE: u32 = 16_000;

    /// Alternating ±0.5 inside the voiced ranges, silence elsewhere.
    fn synth(total_seconds: f64, voiced: &[(f64, f64)]) -> DecodedAudio {
        let len = (total_seconds * f64::from(RATE)) as usize;
        let mut samples = vec![0.0f32; len];
        for (start, end) in voiced {
            let lo = (start * f64::from(RATE)) as usize;
            let hi = ((end * f64::from(RATE)) as usize).min(len);
            for (offset, sample) in samples[lo..hi].iter_mut().enumerate() {
                *sample = if offset % 2 == 0 { 0.5 } else { -0.5 };
            }
        }
        DecodedAudio {
            samples,
            sample_rate: RATE,
        }
    }

    fn detector() -> VoiceActivityDetector {
        VoiceActivityDetector::new(DEFAULT_THRESHOLD, DEFAULT_MIN_DURATION).unwrap()
    }

    struct StubDecoder(DecodedAudio);

    impl AudioDecoder for StubDecoder {
        fn decode(&self, _path: &Path) -> anyhow::Result<DecodedAudio> {
            Ok(self.0.clone())
        }
    }

    struct FailingDecoder;

    impl AudioDecoder for FailingDecoder {
        fn decode(&self, _path: &Path) -> anyhow::Result<DecodedAudio> {
            Err(anyhow!("no audio stream"))
        }
    }

    #[test]
    fn single_burst_is_found() {
        let intervals = detector().detect_samples(&synth(3.0, &[(1.0, 2.0)]));
        assert_eq!(intervals.len(), 1);
        // frames spread the edges by up to half a frame
        assert!((0.9..=1.0).contains(&intervals[0].start), "{intervals:?}");
        assert!((2.0..=2.1).contains(&intervals[0].end), "{intervals:?}");
    }

    #[test]
    fn output_is_sorted_and_disjoint() {
        let audio = synth(8.0, &[(0.5, 1.5), (3.0, 4.0), (5.5, 7.0)]);
        let intervals = detector().detect_samples(&audio);
        assert_eq!(intervals.len(), 3);
        for pair in intervals.windows(2) {
            assert!(pair[0].end <= pair[1].start);
            assert!(pair[1].start - pair[0].end >= DEFAULT_MERGE_GAP);
        }
        for interval in &intervals {
            assert!(interval.duration() >= DEFAULT_MIN_DURATION);
        }
    }

    #[test]
    fn short_bursts_are_dropped() {
        let audio = synth(3.0, &[(1.0, 1.1)]);
        assert!(detector().detect_samples(&audio).is_empty());

        let permissive = VoiceActivityDetector::new(DEFAULT_THRESHOLD, 0.1).unwrap();
        assert_eq!(permissive.detect_samples(&audio).len(), 1);
    }

    #[test]
    fn voice_running_to_the_end_is_flushed() {
        let intervals = detector().detect_samples(&synth(3.0, &[(1.0, 3.0)]));
        assert_eq!(intervals.len(), 1);
        // last frame sits at 93 * 512 / 16000 s
        assert_eq!(intervals[0].end, 2.98);
    }

    #[test]
    fn close_neighbours_are_merged() {
        let merged = merge_close(
            vec![
                VoicedInterval::new(0.5, 1.0),
                VoicedInterval::new(1.1, 1.6),
                VoicedInterval::new(2.0, 2.5),
            ],
            0.2,
        );
        assert_eq!(
            merged,
            vec![VoicedInterval::new(0.5, 1.6), VoicedInterval::new(2.0, 2.5)]
        );
    }

    #[test]
    fn silence_is_an_empty_report() {
        let file = NamedTempFile::new().unwrap();
        let decoder = StubDecoder(synth(2.0, &[]));
        let report = detector().detect(file.path(), &decoder).unwrap();
        assert!(report.is_empty());
        assert!(report.summary().contains("No voice detected"));
    }

    #[test]
    fn summary_lists_each_interval() {
        let file = NamedTempFile::new().unwrap();
        let decoder = StubDecoder(synth(6.0, &[(1.0, 2.0), (3.5, 5.0)]));
        let report = detector().detect(file.path(), &decoder).unwrap();
        assert_eq!(report.len(), 2);
        let summary = report.summary();
        assert!(summary.starts_with("Detected 2 voice segment(s) in 6.00s of audio"));
        assert_eq!(report.audio_duration, 6.0);
        assert!(summary.contains("\n1. "));
        assert!(summary.contains("\n2. "));
    }

    #[test]
    fn missing_audio_is_reported() {
        let decoder = StubDecoder(synth(1.0, &[]));
        let err = detector()
            .detect(Path::new("/nonexistent/track.wav"), &decoder)
            .unwrap_err();
        assert!(matches!(err, MvError::MissingInput { .. }));
    }

    #[test]
    fn decoder_failure_is_surfaced() {
        let file = NamedTempFile::new().unwrap();
        let err = detector().detect(file.path(), &FailingDecoder).unwrap_err();
        assert!(matches!(err, MvError::Decode(_)));
        assert!(err.to_string().contains("no audio stream"));
    }

    #[test]
    fn parameters_are_validated() {
        assert!(matches!(
            VoiceActivityDetector::new(0.0, 0.3),
            Err(MvError::InvalidParameter(_))
        ));
        assert!(VoiceActivityDetector::new(1.0, 0.3).is_err());
        assert!(VoiceActivityDetector::new(0.02, 0.0).is_err());
        assert!(VoiceActivityDetector::new(f64::NAN, 0.3).is_err());
        assert!(detector().with_merge_gap(-1.0).is_err());
    }

    #[test]
    fn rms_frame_count_and_padding() {
        let samples = vec![1.0f32; 4096];
        let energy = rms_frames(&samples, 2048, 512);
        assert_eq!(energy.len(), 9);
        // first frame is half padding
        assert!((energy[0] - 0.5f32.sqrt()).abs() < 1e-6);
        assert!((energy[4] - 1.0).abs() < 1e-6);
    }
}
