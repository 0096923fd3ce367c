//! OCR progress reporting.
//!
//! Decoders push percentages through a [`ProgressTracker`], which enforces the
//! event contract: percentages never go backwards, stay at or below 99 while
//! work is pending, and end with exactly one 100 "complete" event.

use serde::Serialize;

/// Highest percentage reported before the final completion event.
pub const MAX_PENDING_PERCENT: u8 = 99;

/// One progress notification delivered to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OcrProgress {
    pub percent: u8,
    pub label: String,
}

type Sink<'a> = Box<dyn FnMut(OcrProgress) + Send + 'a>;

/// Wraps an optional caller-supplied sink. Notifications are synchronous and
/// best-effort; with no sink every report is dropped.
pub struct ProgressTracker<'a> {
    sink: Option<Sink<'a>>,
    last_percent: u8,
    completed: bool,
}

impl<'a> ProgressTracker<'a> {
    pub fn new(sink: impl FnMut(OcrProgress) + Send + 'a) -> Self {
        Self {
            sink: Some(Box::new(sink)),
            last_percent: 0,
            completed: false,
        }
    }

    /// A tracker that discards every event.
    pub fn silent() -> Self {
        Self {
            sink: None,
            last_percent: 0,
            completed: false,
        }
    }

    /// Reports a raw percentage. Floored, capped at 99 and clamped so it never
    /// drops below the previous report. Ignored after [`complete`](Self::complete).
    pub fn report(&mut self, raw_percent: f64, label: &str) {
        if self.completed {
            return;
        }
        let floored = if raw_percent.is_finite() {
            raw_percent.floor().clamp(0.0, f64::from(MAX_PENDING_PERCENT)) as u8
        } else {
            self.last_percent
        };
        let percent = floored.max(self.last_percent);
        self.last_percent = percent;
        self.emit(percent, label);
    }

    /// Emits the final 100 event. Subsequent calls are no-ops.
    pub fn complete(&mut self, label: &str) {
        if self.completed {
            return;
        }
        self.completed = true;
        self.last_percent = 100;
        self.emit(100, label);
    }

    fn emit(&mut self, percent: u8, label: &str) {
        if let Some(sink) = self.sink.as_mut() {
            sink(OcrProgress {
                percent,
                label: label.to_string(),
            });
        }
    }
}

impl Default for ProgressTracker<'_> {
    fn default() -> Self {
        Self::silent()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn percents(events: &[OcrProgress]) -> Vec<u8> {
        events.iter().map(|e| e.percent).collect()
    }

    #[test]
    fn test_report_floors_and_caps_at_99() {
        let mut events = Vec::new();
        {
            let mut tracker = ProgressTracker::new(|e| events.push(e));
            tracker.report(12.9, "OCR image");
            tracker.report(99.99, "OCR image");
            tracker.report(250.0, "OCR image");
        }
        assert_eq!(percents(&events), vec![12, 99, 99]);
    }

    #[test]
    fn test_report_never_decreases() {
        let mut events = Vec::new();
        {
            let mut tracker = ProgressTracker::new(|e| events.push(e));
            tracker.report(40.0, "a");
            tracker.report(10.0, "b");
            tracker.report(f64::NAN, "c");
        }
        assert_eq!(percents(&events), vec![40, 40, 40]);
        assert_eq!(events[1].label, "b");
    }

    #[test]
    fn test_complete_emits_100_once_and_silences_later_reports() {
        let mut events = Vec::new();
        {
            let mut tracker = ProgressTracker::new(|e| events.push(e));
            tracker.report(50.0, "OCR page 1/2");
            tracker.complete("OCR complete");
            tracker.complete("OCR complete");
            tracker.report(60.0, "late");
        }
        assert_eq!(percents(&events), vec![50, 100]);
        assert_eq!(events[1].label, "OCR complete");
    }

    #[test]
    fn test_silent_tracker_accepts_reports() {
        let mut tracker = ProgressTracker::silent();
        tracker.report(10.0, "x");
        tracker.complete("done");
        tracker.report(20.0, "late");
        assert!(tracker.completed);
        assert_eq!(tracker.last_percent, 100);
    }
}
