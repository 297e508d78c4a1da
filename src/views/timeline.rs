//! Rolodex timeline data

use chrono::{Duration, NaiveDateTime};
use serde::Serialize;

use crate::content::PostMeta;
use crate::helpers::{format_date, DateStyle};

const MIN_TICKS: i64 = 10;
const MAX_TICKS: i64 = 40;
/// A tick counts as "has post" when a post lies within this many days
const TICK_WINDOW_DAYS: i64 = 4;

/// Timeline scrubber for the rolodex view.
///
/// Built from the full listing; undated posts get no point on the track.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Timeline {
    pub oldest: Option<NaiveDateTime>,
    pub newest: Option<NaiveDateTime>,
    /// Label at the top of the track
    pub start_label: Option<String>,
    pub ticks: Vec<Tick>,
    pub points: Vec<Point>,
    /// Card shown first
    pub initial_index: usize,
}

/// Weekly background tick
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Tick {
    /// 0.0 (oldest) to 1.0 (newest)
    pub position: f64,
    pub has_post: bool,
    /// First post in listing order near this tick
    pub post_index: Option<usize>,
}

/// A dated post on the track
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Point {
    /// Index into the listing
    pub index: usize,
    pub slug: String,
    pub position: f64,
    /// Floating label shown while the post is active
    pub label: String,
}

impl Timeline {
    /// Build the timeline for a listing (newest first, as listed)
    pub fn build(posts: &[PostMeta]) -> Self {
        let initial_index = 4.min(posts.len() / 3);

        let dated: Vec<(usize, &PostMeta, NaiveDateTime)> = posts
            .iter()
            .enumerate()
            .filter_map(|(i, p)| p.parsed_date().map(|d| (i, p, d)))
            .collect();

        let (Some(oldest), Some(newest)) = (
            dated.iter().map(|(_, _, d)| *d).min(),
            dated.iter().map(|(_, _, d)| *d).max(),
        ) else {
            return Self {
                oldest: None,
                newest: None,
                start_label: None,
                ticks: Vec::new(),
                points: Vec::new(),
                initial_index,
            };
        };

        let span = newest - oldest;
        let total_days = (span.num_seconds() as f64 / 86_400.0).ceil() as i64;
        let tick_count = ((total_days + 6) / 7).clamp(MIN_TICKS, MAX_TICKS);
        let window = Duration::days(TICK_WINDOW_DAYS);

        let ticks = (0..=tick_count)
            .map(|i| {
                let position = i as f64 / tick_count as f64;
                let at = oldest + scale(span, position);
                let post_index = dated
                    .iter()
                    .find(|(_, _, d)| (*d - at).abs() < window)
                    .map(|(i, _, _)| *i);
                Tick {
                    position,
                    has_post: post_index.is_some(),
                    post_index,
                }
            })
            .collect();

        let points = dated
            .iter()
            .map(|(index, post, date)| Point {
                index: *index,
                slug: post.slug.clone(),
                position: fraction(*date - oldest, span),
                label: format_date(date, DateStyle::Compact),
            })
            .collect();

        Self {
            oldest: Some(oldest),
            newest: Some(newest),
            start_label: Some(format_date(&oldest, DateStyle::Month)),
            ticks,
            points,
            initial_index,
        }
    }

    /// No dated posts; the track is not shown
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

fn scale(span: Duration, factor: f64) -> Duration {
    Duration::milliseconds((span.num_milliseconds() as f64 * factor).round() as i64)
}

/// `part / whole`, or 0 when the range is degenerate
fn fraction(part: Duration, whole: Duration) -> f64 {
    let whole = whole.num_milliseconds();
    if whole == 0 {
        0.0
    } else {
        part.num_milliseconds() as f64 / whole as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn post(slug: &str, date: Option<&str>) -> PostMeta {
        PostMeta {
            slug: slug.to_string(),
            title: slug.to_string(),
            subtitle: None,
            date: date.map(str::to_string),
            description: None,
            image: None,
            source: PathBuf::new(),
        }
    }

    #[test]
    fn test_empty_listing() {
        let timeline = Timeline::build(&[]);
        assert!(timeline.is_empty());
        assert!(timeline.ticks.is_empty());
        assert_eq!(timeline.initial_index, 0);
    }

    #[test]
    fn test_no_dates_degrades() {
        let posts = vec![post("a", None), post("b", Some("whenever"))];
        let timeline = Timeline::build(&posts);
        assert!(timeline.oldest.is_none());
        assert!(timeline.is_empty());
        assert!(timeline.ticks.is_empty());
    }

    #[test]
    fn test_single_date_is_degenerate_range() {
        let posts = vec![post("a", Some("2024-06-01")), post("b", None)];
        let timeline = Timeline::build(&posts);
        assert_eq!(timeline.points.len(), 1);
        assert_eq!(timeline.points[0].position, 0.0);
        assert_eq!(timeline.ticks.len(), 11);
        assert!(timeline.ticks.iter().all(|t| t.has_post && t.post_index == Some(0)));
    }

    #[test]
    fn test_positions_and_ticks() {
        let posts = vec![
            post("new", Some("2024-12-31")),
            post("undated", None),
            post("mid", Some("2024-07-01")),
            post("old", Some("2024-01-01")),
        ];
        let timeline = Timeline::build(&posts);

        // 365 days -> 53 weeks, capped
        assert_eq!(timeline.ticks.len(), 41);
        assert!(timeline.ticks[0].has_post);
        assert_eq!(timeline.ticks[0].post_index, Some(3));
        assert!(timeline.ticks[40].has_post);

        let positions: Vec<_> = timeline.points.iter().map(|p| (p.index, p.position)).collect();
        assert_eq!(positions[0], (0, 1.0));
        assert_eq!(positions[2], (3, 0.0));
        assert!(positions[1].1 > 0.49 && positions[1].1 < 0.51);

        assert_eq!(timeline.start_label.as_deref(), Some("24年1月"));
        assert_eq!(timeline.points[0].label, "24年12月31日");
    }

    #[test]
    fn test_short_range_uses_minimum_ticks() {
        let posts = vec![post("b", Some("2024-01-15")), post("a", Some("2024-01-01"))];
        let timeline = Timeline::build(&posts);
        assert_eq!(timeline.ticks.len(), 11);
        assert!(!timeline.ticks[5].has_post);
    }

    #[test]
    fn test_initial_index() {
        let many: Vec<_> = (0..30).map(|i| post(&i.to_string(), None)).collect();
        assert_eq!(Timeline::build(&many).initial_index, 4);
        assert_eq!(Timeline::build(&many[..7]).initial_index, 2);
    }
}
