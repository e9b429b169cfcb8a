use std::collections::BTreeMap;

use serde::Serialize;

/// Cartesian point in metres.
pub type Point3 = [f64; 3];

/// Coordinates closer than this are the same wire junction.
pub const STITCH_TOLERANCE: f64 = 1e-3;

pub fn distance(a: Point3, b: Point3) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f64>()
        .sqrt()
}

/// Start and end of a segment given by midpoint, length and orientation.
///
/// `alpha` is the elevation of the segment axis above the xy plane and
/// `beta` its azimuth, both in degrees.
pub fn segment_endpoints(mid: Point3, length: f64, alpha: f64, beta: f64) -> (Point3, Point3) {
    let (alpha, beta) = (alpha.to_radians(), beta.to_radians());
    let unit = [alpha.cos() * beta.cos(), alpha.cos() * beta.sin(), alpha.sin()];
    let half = length / 2.0;
    let start = [
        mid[0] - unit[0] * half,
        mid[1] - unit[1] * half,
        mid[2] - unit[2] * half,
    ];
    let end = [
        mid[0] + unit[0] * half,
        mid[1] + unit[1] * half,
        mid[2] + unit[2] * half,
    ];
    (start, end)
}

/// Wire structure described by a simulator listing.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Geometry {
    /// Electrically continuous wire runs.
    pub polylines: Vec<Vec<Point3>>,
    /// Excited or loaded segment positions by load kind.
    pub loaded: BTreeMap<String, Vec<Point3>>,
    pub has_ground: bool,
}

impl Geometry {
    pub fn is_empty(&self) -> bool {
        self.polylines.iter().all(Vec::is_empty) && self.loaded.is_empty()
    }

    pub fn add_loaded(&mut self, name: &str, point: Point3) {
        self.loaded.entry(name.to_string()).or_default().push(point);
    }

    /// Adds wire end points missing from the matching polylines.
    ///
    /// Segment listings start and end at the first and last pulse, so the
    /// real wire ends come from the separate wire table.
    pub fn attach_wire_ends(&mut self, wires: &[Vec<Point3>]) {
        for (wire, polyline) in wires.iter().zip(self.polylines.iter_mut()) {
            let (Some(&first), Some(&last)) = (wire.first(), wire.last()) else {
                continue;
            };
            match polyline.first() {
                Some(&p) if distance(p, first) <= STITCH_TOLERANCE => {}
                _ => polyline.insert(0, first),
            }
            match polyline.last() {
                Some(&p) if distance(p, last) <= STITCH_TOLERANCE => {}
                _ => polyline.push(last),
            }
        }
    }

    /// Polylines grouped into physically connected structures.
    ///
    /// Two runs belong together when an end point of one lies on a point
    /// of the other.
    pub fn structures(&self) -> Vec<Vec<Vec<Point3>>> {
        let lines: Vec<&Vec<Point3>> = self.polylines.iter().filter(|l| !l.is_empty()).collect();
        let mut parent: Vec<usize> = (0..lines.len()).collect();

        fn root(parent: &mut [usize], mut i: usize) -> usize {
            while parent[i] != i {
                parent[i] = parent[parent[i]];
                i = parent[i];
            }
            i
        }

        for i in 0..lines.len() {
            for j in (i + 1)..lines.len() {
                if touches(lines[i], lines[j]) || touches(lines[j], lines[i]) {
                    let (a, b) = (root(&mut parent, i), root(&mut parent, j));
                    if a != b {
                        parent[b.max(a)] = a.min(b);
                    }
                }
            }
        }

        let mut groups: BTreeMap<usize, Vec<Vec<Point3>>> = BTreeMap::new();
        for (i, line) in lines.iter().enumerate() {
            let r = root(&mut parent, i);
            groups.entry(r).or_default().push((*line).clone());
        }
        groups.into_values().collect()
    }
}

fn touches(ends_of: &[Point3], points_of: &[Point3]) -> bool {
    let ends = [ends_of.first(), ends_of.last()];
    ends.iter().flatten().any(|&&end| {
        points_of
            .iter()
            .any(|&p| distance(end, p) <= STITCH_TOLERANCE)
    })
}

/// How a listed segment joins the wire runs read so far.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SegmentLink {
    /// Starts a new run.
    Fresh,
    /// Extends the current run from its last point.
    Continue,
    /// Branches off an earlier segment; `gap` is the distance between the
    /// copied junction and the listed start point.
    Shared { gap: f64 },
}

/// One row of a segment-level geometry listing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SegmentRecord {
    pub number: usize,
    /// Number of the segment joined at the start; negative when that
    /// segment is joined at its own start, zero for a free end.
    pub prev: i64,
    pub start: Point3,
    pub end: Point3,
}

/// Joins consecutive segment records into polylines.
#[derive(Debug, Clone, Default)]
pub struct SegmentStitcher {
    /// Segment number -> (polyline, start index, end index).
    placed: BTreeMap<usize, (usize, usize, usize)>,
}

impl SegmentStitcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stitch(
        &mut self,
        polylines: &mut Vec<Vec<Point3>>,
        segment: &SegmentRecord,
    ) -> Result<SegmentLink, String> {
        let linked = usize::try_from(segment.prev.unsigned_abs()).unwrap_or(usize::MAX);
        let junction = if segment.prev == 0 || linked >= segment.number {
            None
        } else {
            self.placed.get(&linked).copied()
        };

        let link = match junction {
            None => {
                polylines.push(vec![segment.start]);
                SegmentLink::Fresh
            }
            Some((line, _, end))
                if segment.prev > 0
                    && linked + 1 == segment.number
                    && line + 1 == polylines.len() =>
            {
                let last = polylines[line][end];
                let gap = distance(last, segment.start);
                if gap > STITCH_TOLERANCE {
                    return Err(format!(
                        "segment {} starts {:.4} m away from segment {}",
                        segment.number, gap, linked
                    ));
                }
                SegmentLink::Continue
            }
            Some((line, start, end)) => {
                let shared = if segment.prev > 0 {
                    polylines[line][end]
                } else {
                    polylines[line][start]
                };
                polylines.push(vec![shared]);
                SegmentLink::Shared {
                    gap: distance(shared, segment.start),
                }
            }
        };

        let line = polylines.len() - 1;
        let start = polylines[line].len() - 1;
        polylines[line].push(segment.end);
        self.placed.insert(segment.number, (line, start, start + 1));
        Ok(link)
    }
}
