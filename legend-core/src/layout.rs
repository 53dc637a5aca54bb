//! Side-by-side layout of overlapping events within one day.
//!
//! Events are sorted by start time and greedily packed into the lowest free
//! column. Every event then reports the column count of its whole overlap
//! cluster (events linked directly or through a shared neighbour), so one
//! cluster always renders with one consistent width.

use chrono::NaiveTime;

use crate::event::Event;

/// Anything with a half-open `[start, end)` time span.
pub trait TimeSpan {
    fn start(&self) -> NaiveTime;
    fn end(&self) -> NaiveTime;
}

impl TimeSpan for Event {
    fn start(&self) -> NaiveTime {
        self.start_time
    }

    fn end(&self) -> NaiveTime {
        self.end_time
    }
}

impl<T: TimeSpan> TimeSpan for &T {
    fn start(&self) -> NaiveTime {
        (*self).start()
    }

    fn end(&self) -> NaiveTime {
        (*self).end()
    }
}

/// Where one event sits in its day column grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    /// 0-based column index.
    pub column: usize,
    /// Number of columns in the event's overlap cluster.
    pub column_count: usize,
}

/// Lay out `items`; the result is index-aligned with the input.
pub fn layout<T: TimeSpan>(items: &[T]) -> Vec<Placement> {
    let mut placements = vec![
        Placement {
            column: 0,
            column_count: 1
        };
        items.len()
    ];
    if items.is_empty() {
        return placements;
    }

    // Stable sort keeps input order for equal start times
    let mut order: Vec<usize> = (0..items.len()).collect();
    order.sort_by_key(|&i| items[i].start());

    // End time of the last event placed in each column
    let mut column_ends: Vec<NaiveTime> = Vec::new();

    let mut cluster: Vec<usize> = Vec::new();
    let mut cluster_end: Option<NaiveTime> = None;
    let mut cluster_width = 0;

    for &i in &order {
        let item = &items[i];

        // Sorted by start, so nothing later can reach back into a closed cluster
        if cluster_end.is_some_and(|end| item.start() >= end) {
            close_cluster(&mut placements, &mut cluster, cluster_width);
            column_ends.clear();
            cluster_width = 0;
            cluster_end = None;
        }

        let column = match column_ends.iter().position(|&end| end <= item.start()) {
            Some(free) => {
                column_ends[free] = item.end();
                free
            }
            None => {
                column_ends.push(item.end());
                column_ends.len() - 1
            }
        };

        placements[i].column = column;
        cluster_width = cluster_width.max(column + 1);
        cluster_end = Some(cluster_end.map_or(item.end(), |end| end.max(item.end())));
        cluster.push(i);
    }
    close_cluster(&mut placements, &mut cluster, cluster_width);

    placements
}

fn close_cluster(placements: &mut [Placement], cluster: &mut Vec<usize>, width: usize) {
    for i in cluster.drain(..) {
        placements[i].column_count = width;
    }
}

/// Pair each item with its placement.
pub fn layout_pairs<T: TimeSpan>(items: Vec<T>) -> Vec<(T, Placement)> {
    let placements = layout(&items);
    items.into_iter().zip(placements).collect()
}
