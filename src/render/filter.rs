use std::fmt::Write;

use crate::error::{Result, TrimError};
use crate::splice::Interval;

/// Label of the concatenated output stream.
pub const OUTPUT_LABEL: &str = "out";

/// Filter graph that trims each interval out of the first input's audio,
/// rebases it to zero, and concatenates the pieces in list order.
///
/// For two intervals the expression is:
///
/// ```text
/// [0:a]atrim=start=0.000:end=10.000,asetpts=PTS-STARTPTS[a0];
/// [0:a]atrim=start=30.000:end=40.000,asetpts=PTS-STARTPTS[a1];
/// [a0][a1]concat=n=2:v=0:a=1[out]
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct FilterGraph {
    expression: String,
    segments: Vec<Interval>,
}

impl FilterGraph {
    pub fn expression(&self) -> &str {
        &self.expression
    }

    pub fn segments(&self) -> &[Interval] {
        &self.segments
    }

    /// `-map` target for the concatenated stream.
    pub fn output_map(&self) -> String {
        format!("[{}]", OUTPUT_LABEL)
    }

    /// Sum of segment lengths, i.e. the expected output duration.
    pub fn duration(&self) -> f64 {
        crate::splice::total_duration(&self.segments)
    }
}

fn format_seconds(seconds: f64) -> String {
    format!("{:.3}", seconds)
}

/// Build the trim+concat graph. Empty lists, degenerate intervals and
/// intervals that round to zero length are rejected here so the render
/// backend never sees a malformed graph.
pub fn build_filter_graph(segments: &[Interval]) -> Result<FilterGraph> {
    if segments.is_empty() {
        return Err(TrimError::NothingToRender);
    }

    let mut expression = String::new();
    let mut labels = String::new();

    for (i, segment) in segments.iter().enumerate() {
        Interval::new(segment.start, segment.end)?;
        if segment.is_below_resolution() {
            return Err(TrimError::InvalidInterval {
                start: segment.start,
                end: segment.end,
                reason: "shorter than one millisecond".to_string(),
            });
        }

        // Writing to a String cannot fail
        let _ = write!(
            expression,
            "[0:a]atrim=start={}:end={},asetpts=PTS-STARTPTS[a{}];",
            format_seconds(segment.start),
            format_seconds(segment.end),
            i
        );
        let _ = write!(labels, "[a{}]", i);
    }

    let _ = write!(
        expression,
        "{}concat=n={}:v=0:a=1[{}]",
        labels,
        segments.len(),
        OUTPUT_LABEL
    );

    Ok(FilterGraph {
        expression,
        segments: segments.to_vec(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn iv(start: f64, end: f64) -> Interval {
        Interval { start, end }
    }

    #[test]
    fn test_single_segment() {
        let graph = build_filter_graph(&[iv(0.0, 40.0)]).unwrap();
        assert_eq!(
            graph.expression(),
            "[0:a]atrim=start=0.000:end=40.000,asetpts=PTS-STARTPTS[a0];[a0]concat=n=1:v=0:a=1[out]"
        );
        assert_eq!(graph.output_map(), "[out]");
        assert!((graph.duration() - 40.0).abs() < 1e-9);
    }

    #[test]
    fn test_two_segments_in_order() {
        let graph = build_filter_graph(&[iv(0.0, 10.0), iv(30.0, 40.0)]).unwrap();
        assert_eq!(
            graph.expression(),
            "[0:a]atrim=start=0.000:end=10.000,asetpts=PTS-STARTPTS[a0];\
             [0:a]atrim=start=30.000:end=40.000,asetpts=PTS-STARTPTS[a1];\
             [a0][a1]concat=n=2:v=0:a=1[out]"
        );
    }

    #[test]
    fn test_list_order_is_preserved() {
        // Concatenation follows the given order, even if it is not chronological
        let graph = build_filter_graph(&[iv(30.0, 40.0), iv(0.0, 10.0)]).unwrap();
        let first = graph.expression().find("start=30.000").unwrap();
        let second = graph.expression().find("start=0.000").unwrap();
        assert!(first < second);
        assert_eq!(graph.segments()[0], iv(30.0, 40.0));
    }

    #[test]
    fn test_overlapping_segments_are_kept_verbatim() {
        let graph = build_filter_graph(&[iv(5.0, 15.0), iv(10.0, 20.0)]).unwrap();
        assert!(graph.expression().contains("concat=n=2"));
        assert!((graph.duration() - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_list_rejected() {
        assert!(matches!(
            build_filter_graph(&[]),
            Err(TrimError::NothingToRender)
        ));
    }

    #[test]
    fn test_degenerate_segment_rejected() {
        assert!(matches!(
            build_filter_graph(&[iv(0.0, 5.0), iv(7.0, 7.0)]),
            Err(TrimError::InvalidInterval { .. })
        ));
    }

    #[test]
    fn test_segment_rounding_to_zero_length_rejected() {
        let result = build_filter_graph(&[iv(0.0, 30.0), iv(40.0, 40.000363)]);
        assert!(matches!(result, Err(TrimError::InvalidInterval { .. })));
    }

    #[test]
    fn test_fractional_seconds() {
        let graph = build_filter_graph(&[iv(1.23456, 7.5)]).unwrap();
        assert!(graph.expression().contains("atrim=start=1.235:end=7.500"));
    }
}
