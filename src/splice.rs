//! Interval arithmetic for ad removal.
//!
//! Ad intervals arrive from the classifier unsorted and possibly overlapping.
//! [`keep_segments`] computes their complement inside `[0, total_duration)`,
//! and [`extraction_segments`] orders them for the ads-only debug render.

use crate::error::{Result, TrimError};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use tracing::{debug, warn};

/// Classifier end times may overshoot the probed duration by this much
/// before they are treated as bad data.
pub const DURATION_TOLERANCE: f64 = 0.5;

/// Resolution of the timestamps handed to the render backend (milliseconds).
/// Spans that round to zero at this resolution cannot be rendered.
pub const TIME_RESOLUTION: f64 = 0.001;

/// Half-open time range `[start, end)` in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Interval {
    pub start: f64,
    pub end: f64,
}

impl Interval {
    /// Build an interval, rejecting negative starts and zero/negative lengths.
    pub fn new(start: f64, end: f64) -> Result<Self> {
        let interval = Self { start, end };
        interval.check()?;
        Ok(interval)
    }

    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    pub fn is_degenerate(&self) -> bool {
        self.end.partial_cmp(&self.start) != Some(Ordering::Greater)
    }

    /// Whether start and end land on the same millisecond tick once rounded.
    pub fn is_below_resolution(&self) -> bool {
        self.is_degenerate() || ticks(self.end) <= ticks(self.start)
    }

    fn check(&self) -> Result<()> {
        if !self.start.is_finite() || !self.end.is_finite() {
            return Err(self.invalid("timestamps must be finite"));
        }
        if self.start < 0.0 {
            return Err(self.invalid("start is negative"));
        }
        if self.is_degenerate() {
            return Err(self.invalid("end must be greater than start"));
        }
        Ok(())
    }

    fn invalid(&self, reason: &str) -> TrimError {
        TrimError::InvalidInterval {
            start: self.start,
            end: self.end,
            reason: reason.to_string(),
        }
    }
}

fn ticks(seconds: f64) -> f64 {
    (seconds / TIME_RESOLUTION).round()
}

/// How ad intervals are laid out for the ads-only render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExtractMode {
    /// Every classifier interval verbatim, overlaps included.
    #[default]
    Raw,
    /// Overlapping and touching intervals merged first.
    Merged,
}

/// Check classifier output against the real track length.
///
/// Degenerate and sub-millisecond intervals are dropped with a warning. Ends slightly past the
/// duration are clamped; anything further out, or a negative start, is an
/// error.
pub fn sanitize_ads(ads: &[Interval], total_duration: f64) -> Result<Vec<Interval>> {
    let mut clean = Vec::with_capacity(ads.len());

    for ad in ads {
        if !ad.start.is_finite() || !ad.end.is_finite() || ad.start < 0.0 {
            return Err(ad.invalid("timestamp outside the track"));
        }
        if ad.end > total_duration + DURATION_TOLERANCE || ad.start >= total_duration {
            return Err(ad.invalid(&format!(
                "exceeds track duration {:.2}s",
                total_duration
            )));
        }

        let clamped = Interval {
            start: ad.start,
            end: ad.end.min(total_duration),
        };
        if clamped.is_below_resolution() {
            warn!(
                "Skipping zero-length ad interval [{:.2}, {:.2})",
                ad.start, ad.end
            );
            continue;
        }
        clean.push(clamped);
    }

    Ok(clean)
}

fn sorted_by_start(ads: &[Interval]) -> Vec<Interval> {
    let mut sorted = ads.to_vec();
    sorted.sort_by(|a, b| a.start.total_cmp(&b.start));
    sorted
}

/// Complement of the ad set within `[0, total_duration)`.
///
/// A single sweep over the start-sorted ads; `cursor` only moves forward,
/// which merges overlapping and adjacent ads without a separate pass.
/// Gaps shorter than [`TIME_RESOLUTION`] are not kept.
pub fn keep_segments(total_duration: f64, ads: &[Interval]) -> Vec<Interval> {
    let mut keep = Vec::new();
    let mut cursor = 0.0_f64;

    let mut push_gap = |start: f64, end: f64| {
        let gap = Interval { start, end };
        if gap.is_below_resolution() {
            if !gap.is_degenerate() {
                debug!("Dropping sub-millisecond gap [{:.6}, {:.6})", start, end);
            }
            return;
        }
        keep.push(gap);
    };

    for ad in sorted_by_start(ads) {
        push_gap(cursor, ad.start);
        cursor = cursor.max(ad.end);
    }
    push_gap(cursor, total_duration);

    debug!(
        "Computed {} keep segments from {} ads over {:.2}s",
        keep.len(),
        ads.len(),
        total_duration
    );
    keep
}

/// Union of the ad set, sorted and non-overlapping.
pub fn merge_intervals(ads: &[Interval]) -> Vec<Interval> {
    let mut merged: Vec<Interval> = Vec::new();

    for ad in sorted_by_start(ads) {
        match merged.last_mut() {
            Some(last) if ad.start <= last.end => last.end = last.end.max(ad.end),
            _ => merged.push(ad),
        }
    }

    merged
}

/// Ad intervals in chronological order for extraction.
pub fn extraction_segments(ads: &[Interval], mode: ExtractMode) -> Vec<Interval> {
    match mode {
        ExtractMode::Raw => sorted_by_start(ads),
        ExtractMode::Merged => merge_intervals(ads),
    }
}

pub fn total_duration(segments: &[Interval]) -> f64 {
    segments.iter().map(Interval::duration).sum()
}
