//! Grouping of overlapping raw hits into final detections.

use log::debug;

use crate::scorer::Window;

/// A final square detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Detection {
    /// Left edge, in pixels.
    pub x: u32,
    /// Top edge, in pixels.
    pub y: u32,
    /// Edge length, in pixels.
    pub size: u32,
    /// Number of raw hits merged into this box.
    pub(crate) support: u32,
}

impl Detection {
    /// A detection backed by a single raw hit.
    pub fn new(x: u32, y: u32, size: u32) -> Self {
        Self {
            x,
            y,
            size,
            support: 1,
        }
    }

    fn area(&self) -> u64 {
        self.size as u64 * self.size as u64
    }

    /// Intersection area divided by the smaller box's area.
    pub fn overlap(&self, other: &Detection) -> f64 {
        let left = self.x.max(other.x) as u64;
        let top = self.y.max(other.y) as u64;
        let right = (self.x as u64 + self.size as u64).min(other.x as u64 + other.size as u64);
        let bottom = (self.y as u64 + self.size as u64).min(other.y as u64 + other.size as u64);
        if right <= left || bottom <= top {
            return 0.0;
        }
        let smaller = self.area().min(other.area());
        if smaller == 0 {
            return 0.0;
        }
        ((right - left) * (bottom - top)) as f64 / smaller as f64
    }
}

impl From<Window> for Detection {
    fn from(w: Window) -> Self {
        Detection::new(w.x, w.y, w.size)
    }
}

/// Disjoint-set forest over hit indices.
struct UnionFind {
    parent: Vec<usize>,
    rank: Vec<u8>,
}

impl UnionFind {
    fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
            rank: vec![0; n],
        }
    }

    fn find(&mut self, mut i: usize) -> usize {
        while self.parent[i] != i {
            self.parent[i] = self.parent[self.parent[i]];
            i = self.parent[i];
        }
        i
    }

    fn union(&mut self, a: usize, b: usize) -> bool {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra == rb {
            return false;
        }
        match self.rank[ra].cmp(&self.rank[rb]) {
            std::cmp::Ordering::Less => self.parent[ra] = rb,
            std::cmp::Ordering::Greater => self.parent[rb] = ra,
            std::cmp::Ordering::Equal => {
                self.parent[rb] = ra;
                self.rank[ra] += 1;
            }
        }
        true
    }
}

/// Post-processing that merges overlapping hits.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectionMerger {
    /// When false, [`DetectionMerger::merge`] returns its input unchanged.
    pub enabled: bool,
    /// Minimum intersection / smaller-area ratio for two boxes to be grouped.
    pub overlap_threshold: f64,
    /// Groups supported by fewer raw hits than this are dropped.
    pub neighbor_threshold: u32,
}

impl DetectionMerger {
    /// Group `hits` transitively by overlap and replace each surviving group by
    /// its support-weighted mean box.
    ///
    /// Grouping repeats on the merged boxes until no pair overlaps, so the
    /// output is a fixed point: merging it again returns it unchanged. Output
    /// order follows the earliest input index contributing to each group.
    pub fn merge(&self, hits: &[Detection]) -> Vec<Detection> {
        if !self.enabled {
            return hits.to_vec();
        }

        let mut clusters: Vec<Cluster> = hits
            .iter()
            .enumerate()
            .map(|(index, &hit)| Cluster::new(index, hit))
            .collect();
        let mut rounds = 0;
        loop {
            rounds += 1;
            let merged = group_once(&clusters, self.overlap_threshold);
            let settled = merged.len() == clusters.len();
            clusters = merged;
            if settled {
                break;
            }
        }

        let result: Vec<Detection> = clusters
            .into_iter()
            .map(|c| c.bbox)
            .filter(|d| d.support >= self.neighbor_threshold)
            .collect();
        debug!(
            "merged {} hits into {} detections in {rounds} rounds",
            hits.len(),
            result.len()
        );
        result
    }
}

/// A group of raw hits between merge rounds.
///
/// The coordinate sums are exact, so a group's box is always the rounded mean
/// of its raw members no matter how many rounds it took to assemble.
#[derive(Debug, Clone, Copy)]
struct Cluster {
    /// Earliest input index among the members.
    first: usize,
    support: u64,
    sum_x: u64,
    sum_y: u64,
    sum_size: u64,
    /// Rounded mean box, used for overlap tests and as the output.
    bbox: Detection,
}

impl Cluster {
    fn new(index: usize, hit: Detection) -> Self {
        let support = hit.support as u64;
        Self {
            first: index,
            support,
            sum_x: support * hit.x as u64,
            sum_y: support * hit.y as u64,
            sum_size: support * hit.size as u64,
            bbox: hit,
        }
    }

    fn absorb(&mut self, other: &Cluster) {
        self.first = self.first.min(other.first);
        self.support += other.support;
        self.sum_x += other.sum_x;
        self.sum_y += other.sum_y;
        self.sum_size += other.sum_size;
    }

    fn finish(mut self) -> Self {
        let total = self.support.max(1) as f64;
        self.bbox = Detection {
            x: (self.sum_x as f64 / total).round() as u32,
            y: (self.sum_y as f64 / total).round() as u32,
            size: (self.sum_size as f64 / total).round() as u32,
            support: self.support.min(u32::MAX as u64) as u32,
        };
        self
    }
}

/// One round of union-find grouping over the clusters' current boxes. The
/// result is sorted by each group's earliest input index.
fn group_once(clusters: &[Cluster], threshold: f64) -> Vec<Cluster> {
    let n = clusters.len();
    let mut sets = UnionFind::new(n);

    // Sweep in x order: only boxes whose x-extents intersect can overlap.
    let mut by_x: Vec<usize> = (0..n).collect();
    by_x.sort_by_key(|&i| (clusters[i].bbox.x, i));
    for (pos, &i) in by_x.iter().enumerate() {
        let a = &clusters[i].bbox;
        let right = a.x as u64 + a.size as u64;
        for &j in &by_x[pos + 1..] {
            let b = &clusters[j].bbox;
            if b.x as u64 >= right {
                break;
            }
            if a.overlap(b) >= threshold {
                sets.union(i, j);
            }
        }
    }

    // (merged cluster, member count) per root, in order of first appearance.
    let mut groups: Vec<(Cluster, usize)> = Vec::new();
    let mut slot = vec![usize::MAX; n];
    for (i, cluster) in clusters.iter().enumerate() {
        let root = sets.find(i);
        if slot[root] == usize::MAX {
            slot[root] = groups.len();
            groups.push((*cluster, 1));
        } else {
            let (group, members) = &mut groups[slot[root]];
            group.absorb(cluster);
            *members += 1;
        }
    }

    let mut merged: Vec<Cluster> = groups
        .into_iter()
        .map(|(group, members)| if members == 1 { group } else { group.finish() })
        .collect();
    merged.sort_by_key(|c| c.first);
    merged
}
