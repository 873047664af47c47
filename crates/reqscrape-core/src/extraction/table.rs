use std::collections::{BTreeMap, HashMap};

use crate::extraction::{BBox, Edge, EdgeSource, Orientation};
use crate::presets::schema::{Strategy, TableSettings};

/// Find ruled tables inside `region` from the page's ruling edges.
///
/// Edges are clipped to the region, snapped and joined, then crossed into
/// intersections. Cells are the smallest rectangles whose four corners are
/// intersections connected by edges, and tables are groups of cells that
/// share corners. Each table is returned as the bounding box of its cells,
/// sorted top to bottom, then left to right. Single-cell groups are not
/// tables.
pub fn find_tables(edges: &[Edge], region: &BBox, settings: &TableSettings) -> Vec<BBox> {
    let mut vertical: Vec<Edge> = edges
        .iter()
        .filter(|e| e.orientation == Orientation::Vertical)
        .filter(|e| strategy_accepts(settings.vertical_strategy, e))
        .filter_map(|e| clip(e, region))
        .collect();
    let mut horizontal: Vec<Edge> = edges
        .iter()
        .filter(|e| e.orientation == Orientation::Horizontal)
        .filter(|e| strategy_accepts(settings.horizontal_strategy, e))
        .filter_map(|e| clip(e, region))
        .collect();

    snap(&mut vertical, settings.snap_x_tolerance);
    snap(&mut horizontal, settings.snap_y_tolerance);
    let vertical: Vec<Edge> = join(vertical, settings.join_y_tolerance)
        .into_iter()
        .filter(|e| e.length() >= settings.edge_min_length)
        .collect();
    let horizontal: Vec<Edge> = join(horizontal, settings.join_x_tolerance)
        .into_iter()
        .filter(|e| e.length() >= settings.edge_min_length)
        .collect();

    let points = intersections(
        &vertical,
        &horizontal,
        settings.intersection_x_tolerance,
        settings.intersection_y_tolerance,
    );
    let cells = cells(&points);
    let mut tables = group_cells(&cells);
    tables.sort_by(|a, b| {
        a.top
            .total_cmp(&b.top)
            .then_with(|| a.x0.total_cmp(&b.x0))
    });
    tables
}

fn strategy_accepts(strategy: Strategy, edge: &Edge) -> bool {
    match strategy {
        Strategy::Lines => true,
        Strategy::LinesStrict => edge.source == EdgeSource::Line,
    }
}

fn clip(edge: &Edge, region: &BBox) -> Option<Edge> {
    let mut e = *edge;
    match e.orientation {
        Orientation::Vertical => {
            if e.x0 < region.x0 || e.x0 > region.x1 {
                return None;
            }
            e.top = e.top.max(region.top);
            e.bottom = e.bottom.min(region.bottom);
            (e.top < e.bottom).then_some(e)
        }
        Orientation::Horizontal => {
            if e.top < region.top || e.top > region.bottom {
                return None;
            }
            e.x0 = e.x0.max(region.x0);
            e.x1 = e.x1.min(region.x1);
            (e.x0 < e.x1).then_some(e)
        }
    }
}

/// Position across the edge's direction: x for vertical, y for horizontal.
fn position(e: &Edge) -> f64 {
    match e.orientation {
        Orientation::Vertical => e.x0,
        Orientation::Horizontal => e.top,
    }
}

fn set_position(e: &mut Edge, value: f64) {
    match e.orientation {
        Orientation::Vertical => {
            e.x0 = value;
            e.x1 = value;
        }
        Orientation::Horizontal => {
            e.top = value;
            e.bottom = value;
        }
    }
}

/// Cluster parallel edges whose positions chain within `tolerance` and move
/// each cluster to its mean position.
fn snap(edges: &mut [Edge], tolerance: f64) {
    edges.sort_by(|a, b| position(a).total_cmp(&position(b)));

    let mut start = 0;
    while start < edges.len() {
        let mut end = start + 1;
        while end < edges.len() && position(&edges[end]) - position(&edges[end - 1]) <= tolerance {
            end += 1;
        }
        let cluster = &mut edges[start..end];
        let mean = cluster.iter().map(position).sum::<f64>() / cluster.len() as f64;
        for e in cluster.iter_mut() {
            set_position(e, mean);
        }
        start = end;
    }
}

/// Merge collinear edges that overlap or are separated by at most `tolerance`.
fn join(edges: Vec<Edge>, tolerance: f64) -> Vec<Edge> {
    let mut by_line: BTreeMap<i64, Vec<Edge>> = BTreeMap::new();
    for e in edges {
        by_line.entry(key(position(&e))).or_default().push(e);
    }

    let mut joined = Vec::new();
    for (_, mut line) in by_line {
        line.sort_by(|a, b| extent(a).0.total_cmp(&extent(b).0));
        let mut iter = line.into_iter();
        let Some(mut current) = iter.next() else {
            continue;
        };
        for next in iter {
            let (next_start, next_end) = extent(&next);
            if next_start <= extent(&current).1 + tolerance {
                if next_end > extent(&current).1 {
                    set_end(&mut current, next_end);
                }
            } else {
                joined.push(current);
                current = next;
            }
        }
        joined.push(current);
    }
    joined
}

/// Start and end along the edge's direction.
fn extent(e: &Edge) -> (f64, f64) {
    match e.orientation {
        Orientation::Vertical => (e.top, e.bottom),
        Orientation::Horizontal => (e.x0, e.x1),
    }
}

fn set_end(e: &mut Edge, value: f64) {
    match e.orientation {
        Orientation::Vertical => e.bottom = value,
        Orientation::Horizontal => e.x1 = value,
    }
}

/// Coordinates are bucketed to thousandths of a point for exact lookups.
fn key(v: f64) -> i64 {
    (v * 1000.0).round() as i64
}

#[derive(Debug, Clone, Default)]
struct Intersection {
    x: f64,
    y: f64,
    vertical: Vec<usize>,
    horizontal: Vec<usize>,
}

type PointKey = (i64, i64);

fn intersections(
    vertical: &[Edge],
    horizontal: &[Edge],
    x_tolerance: f64,
    y_tolerance: f64,
) -> BTreeMap<PointKey, Intersection> {
    let mut points: BTreeMap<PointKey, Intersection> = BTreeMap::new();
    for (vi, v) in vertical.iter().enumerate() {
        for (hi, h) in horizontal.iter().enumerate() {
            let crosses = v.top <= h.top + y_tolerance
                && v.bottom >= h.top - y_tolerance
                && v.x0 >= h.x0 - x_tolerance
                && v.x0 <= h.x1 + x_tolerance;
            if !crosses {
                continue;
            }
            let point = points.entry((key(h.top), key(v.x0))).or_insert_with(|| Intersection {
                x: v.x0,
                y: h.top,
                ..Default::default()
            });
            point.vertical.push(vi);
            point.horizontal.push(hi);
        }
    }
    points
}

fn shares(a: &[usize], b: &[usize]) -> bool {
    a.iter().any(|i| b.contains(i))
}

/// For each intersection, the smallest rectangle to an intersection right of
/// and below it whose corners all exist and whose sides are ruled.
fn cells(points: &BTreeMap<PointKey, Intersection>) -> Vec<BBox> {
    let mut cells = Vec::new();
    // Keys sort by (y, x), so iteration runs top to bottom, left to right.
    for (&(py, px), p) in points {
        let right: Vec<(&PointKey, &Intersection)> = points
            .range((py, px + 1)..(py + 1, i64::MIN))
            .collect();
        let below: Vec<(&PointKey, &Intersection)> = points
            .range((py + 1, i64::MIN)..)
            .filter(|(k, _)| k.1 == px)
            .collect();

        'search: for &(&(by, _), b) in &below {
            if !shares(&p.vertical, &b.vertical) {
                continue;
            }
            for &(&(_, rx), r) in &right {
                if !shares(&p.horizontal, &r.horizontal) {
                    continue;
                }
                let Some(corner) = points.get(&(by, rx)) else {
                    continue;
                };
                if shares(&corner.vertical, &r.vertical) && shares(&corner.horizontal, &b.horizontal)
                {
                    cells.push(BBox::new(p.x, p.y, r.x, b.y));
                    break 'search;
                }
            }
        }
    }
    cells
}

/// Group cells that share at least one corner; each group becomes one table.
fn group_cells(cells: &[BBox]) -> Vec<BBox> {
    let mut parent: Vec<usize> = (0..cells.len()).collect();

    fn find(parent: &mut [usize], i: usize) -> usize {
        let mut root = i;
        while parent[root] != root {
            root = parent[root];
        }
        let mut node = i;
        while parent[node] != root {
            let next = parent[node];
            parent[node] = root;
            node = next;
        }
        root
    }

    let mut corner_owner: HashMap<PointKey, usize> = HashMap::new();
    for (i, cell) in cells.iter().enumerate() {
        let corners = [
            (key(cell.top), key(cell.x0)),
            (key(cell.top), key(cell.x1)),
            (key(cell.bottom), key(cell.x0)),
            (key(cell.bottom), key(cell.x1)),
        ];
        for corner in corners {
            match corner_owner.get(&corner) {
                Some(&other) => {
                    let a = find(&mut parent, i);
                    let b = find(&mut parent, other);
                    if a != b {
                        parent[a] = b;
                    }
                }
                None => {
                    corner_owner.insert(corner, i);
                }
            }
        }
    }

    let mut groups: BTreeMap<usize, (BBox, usize)> = BTreeMap::new();
    for (i, cell) in cells.iter().enumerate() {
        let root = find(&mut parent, i);
        groups
            .entry(root)
            .and_modify(|(bbox, count)| {
                *bbox = bbox.union(cell);
                *count += 1;
            })
            .or_insert((*cell, 1));
    }

    groups
        .into_values()
        .filter(|(_, count)| *count > 1)
        .map(|(bbox, _)| bbox)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hline(x0: f64, y: f64, x1: f64) -> Edge {
        Edge::horizontal(x0, x1, y, EdgeSource::Line)
    }

    fn vline(x: f64, top: f64, bottom: f64) -> Edge {
        Edge::vertical(x, top, bottom, EdgeSource::Line)
    }

    fn page_region() -> BBox {
        BBox::new(0.0, 0.0, 600.0, 800.0)
    }

    /// A 2x2 grid spanning (100, 100) to (300, 200).
    fn grid() -> Vec<Edge> {
        vec![
            hline(100.0, 100.0, 300.0),
            hline(100.0, 150.0, 300.0),
            hline(100.0, 200.0, 300.0),
            vline(100.0, 100.0, 200.0),
            vline(200.0, 100.0, 200.0),
            vline(300.0, 100.0, 200.0),
        ]
    }

    #[test]
    fn test_simple_grid() {
        let tables = find_tables(&grid(), &page_region(), &TableSettings::default());
        assert_eq!(tables, vec![BBox::new(100.0, 100.0, 300.0, 200.0)]);
    }

    #[test]
    fn test_no_edges_no_tables() {
        assert!(find_tables(&[], &page_region(), &TableSettings::default()).is_empty());
    }

    #[test]
    fn test_single_box_is_not_a_table() {
        let edges = vec![
            hline(100.0, 100.0, 300.0),
            hline(100.0, 200.0, 300.0),
            vline(100.0, 100.0, 200.0),
            vline(300.0, 100.0, 200.0),
        ];
        assert!(find_tables(&edges, &page_region(), &TableSettings::default()).is_empty());
    }

    #[test]
    fn test_snap_aligns_slightly_offset_rules() {
        let mut edges = grid();
        // Middle vertical rule drawn 2pt off in its lower half.
        edges[4] = vline(200.0, 100.0, 150.0);
        edges.push(vline(202.0, 150.0, 200.0));
        let tables = find_tables(&edges, &page_region(), &TableSettings::default());
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].x0, 100.0);
        assert_eq!(tables[0].x1, 300.0);
    }

    #[test]
    fn test_join_bridges_small_gaps() {
        let mut edges = grid();
        // Top rule broken into two pieces with a 2pt gap.
        edges[0] = hline(100.0, 100.0, 199.0);
        edges.push(hline(201.0, 100.0, 300.0));
        let tables = find_tables(&edges, &page_region(), &TableSettings::default());
        assert_eq!(tables, vec![BBox::new(100.0, 100.0, 300.0, 200.0)]);
    }

    #[test]
    fn test_region_excludes_tables_outside_crop() {
        let region = BBox::new(0.0, 250.0, 600.0, 800.0);
        assert!(find_tables(&grid(), &region, &TableSettings::default()).is_empty());
    }

    #[test]
    fn test_two_tables_sorted_top_down() {
        let mut edges: Vec<Edge> = grid()
            .into_iter()
            .map(|mut e| {
                e.top += 400.0;
                e.bottom += 400.0;
                e
            })
            .collect();
        edges.extend(grid());
        let tables = find_tables(&edges, &page_region(), &TableSettings::default());
        assert_eq!(tables.len(), 2);
        assert_eq!(tables[0].top, 100.0);
        assert_eq!(tables[1].top, 500.0);
    }

    #[test]
    fn test_lines_strict_ignores_rect_sides() {
        let edges: Vec<Edge> = grid()
            .into_iter()
            .map(|mut e| {
                e.source = EdgeSource::RectSide;
                e
            })
            .collect();
        let strict = TableSettings {
            vertical_strategy: Strategy::LinesStrict,
            horizontal_strategy: Strategy::LinesStrict,
            ..TableSettings::default()
        };
        assert!(find_tables(&edges, &page_region(), &strict).is_empty());
        assert_eq!(find_tables(&edges, &page_region(), &TableSettings::default()).len(), 1);
    }

    #[test]
    fn test_short_edges_filtered() {
        let mut edges = grid();
        edges.push(hline(400.0, 400.0, 401.0));
        let settings = TableSettings {
            edge_min_length: 3.0,
            ..TableSettings::default()
        };
        assert_eq!(find_tables(&edges, &page_region(), &settings).len(), 1);
    }
}
