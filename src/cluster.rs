//! The clustering kernel: a pure function that partitions a timestamped
//! sequence of photos into meetings by a gap threshold.
//!
//! Deliberately free of any database or queue dependency so it can be
//! property-tested in isolation.

use chrono::{DateTime, NaiveDate, Utc};
use std::time::Duration;

/// Anything the kernel needs to know about a photo: its identity and an
/// optional capture timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dated<Id> {
    pub id: Id,
    pub shot_at: Option<DateTime<Utc>>,
}

/// A group of photo ids that belong in the same meeting, plus the date the
/// meeting should be keyed by (`None` for the undated bucket).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cluster<Id> {
    pub meeting_date: Option<NaiveDate>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub ids: Vec<Id>,
}

/// Partition `photos` into clusters separated by gaps larger than `gap`.
///
/// Undated photos are returned as a single trailing cluster with
/// `meeting_date: None`. Dated photos are sorted ascending by timestamp
/// (stable, so equal timestamps preserve input order) and split wherever
/// the gap between consecutive timestamps exceeds `gap`; a gap exactly
/// equal to `gap` does not split.
pub fn cluster<Id: Clone>(photos: &[Dated<Id>], gap: Duration) -> Vec<Cluster<Id>> {
    let mut dated: Vec<&Dated<Id>> = photos.iter().filter(|p| p.shot_at.is_some()).collect();
    let undated: Vec<&Dated<Id>> = photos.iter().filter(|p| p.shot_at.is_none()).collect();

    dated.sort_by_key(|p| p.shot_at.unwrap());

    let mut clusters = Vec::new();
    let mut current: Vec<&Dated<Id>> = Vec::new();

    for photo in dated {
        if let Some(last) = current.last() {
            let prev_ts = last.shot_at.unwrap();
            let next_ts = photo.shot_at.unwrap();
            let delta = (next_ts - prev_ts)
                .to_std()
                .unwrap_or(Duration::from_secs(0));
            if delta > gap {
                clusters.push(close_cluster(std::mem::take(&mut current)));
            }
        }
        current.push(photo);
    }
    if !current.is_empty() {
        clusters.push(close_cluster(current));
    }

    if !undated.is_empty() {
        clusters.push(Cluster {
            meeting_date: None,
            start_time: None,
            end_time: None,
            ids: undated.into_iter().map(|p| p.id.clone()).collect(),
        });
    }

    clusters
}

fn close_cluster<Id: Clone>(group: Vec<&Dated<Id>>) -> Cluster<Id> {
    let start_time = group.first().and_then(|p| p.shot_at);
    let end_time = group.last().and_then(|p| p.shot_at);
    let meeting_date = start_time.map(|t| t.date_naive());
    Cluster {
        meeting_date,
        start_time,
        end_time,
        ids: group.into_iter().map(|p| p.id.clone()).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 10, h, 0, 0).unwrap()
    }

    fn ts_day(day: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, day, h, 0, 0).unwrap()
    }

    #[test]
    fn empty_input_yields_empty_output() {
        let photos: Vec<Dated<i64>> = vec![];
        assert!(cluster(&photos, Duration::from_secs(3600 * 18)).is_empty());
    }

    #[test]
    fn simple_cluster_stays_together() {
        let photos = vec![
            Dated { id: 1, shot_at: Some(ts(9)) },
            Dated { id: 2, shot_at: Some(ts(10)) },
            Dated { id: 3, shot_at: Some(ts(15)) },
        ];
        let result = cluster(&photos, Duration::from_secs(3600 * 18));
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].ids, vec![1, 2, 3]);
        assert_eq!(result[0].start_time, Some(ts(9)));
        assert_eq!(result[0].end_time, Some(ts(15)));
    }

    #[test]
    fn gap_beyond_threshold_splits() {
        let photos = vec![
            Dated { id: 1, shot_at: Some(ts_day(10, 9)) },
            Dated { id: 2, shot_at: Some(ts_day(10, 10)) },
            Dated { id: 3, shot_at: Some(ts_day(11, 6)) },
            Dated { id: 4, shot_at: Some(ts_day(11, 7)) },
        ];
        let result = cluster(&photos, Duration::from_secs(3600 * 18));
        assert_eq!(result.len(), 2);
        assert_eq!(result[0].ids, vec![1, 2]);
        assert_eq!(result[1].ids, vec![3, 4]);
    }

    #[test]
    fn gap_exactly_at_threshold_does_not_split() {
        let photos = vec![
            Dated { id: 1, shot_at: Some(ts(0)) },
            Dated { id: 2, shot_at: Some(ts(18)) },
        ];
        let result = cluster(&photos, Duration::from_secs(3600 * 18));
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].ids, vec![1, 2]);
    }

    #[test]
    fn undated_photos_form_their_own_bucket() {
        let photos = vec![
            Dated { id: 1, shot_at: Some(ts(9)) },
            Dated { id: 2, shot_at: None },
        ];
        let result = cluster(&photos, Duration::from_secs(3600 * 18));
        assert_eq!(result.len(), 2);
        assert_eq!(result[1].meeting_date, None);
        assert_eq!(result[1].ids, vec![2]);
    }

    #[test]
    fn result_is_stable_under_input_permutation() {
        let a = vec![
            Dated { id: 1, shot_at: Some(ts(9)) },
            Dated { id: 2, shot_at: Some(ts(10)) },
            Dated { id: 3, shot_at: Some(ts(15)) },
        ];
        let mut b = a.clone();
        b.reverse();

        let gap = Duration::from_secs(3600 * 18);
        let ra = cluster(&a, gap);
        let mut rb = cluster(&b, gap);
        for c in &mut rb {
            c.ids.sort();
        }
        assert_eq!(ra, rb);
    }
}
