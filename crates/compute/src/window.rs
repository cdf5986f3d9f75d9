use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::loader::MetricLoader;

/// Time bounds of one detection request.
///
/// Computed once from the look-back and threaded through fetching, scoring,
/// root-cause search and trend enrichment so they all see the same window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WindowContext {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    /// Minutes covered by `[start, end)`.
    pub look_back: u32,
    /// Samples a complete series over the window should hold.
    pub expected_point_length: usize,
}

impl WindowContext {
    /// Window of `look_back` minutes ending at `end`.
    pub fn ending_at(end: DateTime<Utc>, look_back: u32, loader: &dyn MetricLoader) -> Self {
        let start = end - Duration::minutes(i64::from(look_back));
        Self {
            start,
            end,
            look_back,
            expected_point_length: loader.expected_point_length(start, end),
        }
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::StaticMetricLoader;

    #[test]
    fn window_spans_look_back() {
        let loader = StaticMetricLoader::new(Vec::new(), 60);
        let end = Utc::now();
        let window = WindowContext::ending_at(end, 30, &loader);
        assert_eq!(window.end, end);
        assert_eq!(window.duration(), Duration::minutes(30));
        assert_eq!(window.expected_point_length, 30);
    }
}
