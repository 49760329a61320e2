//! Grouping of differing pixels into contiguous regions
//!
//! Segmentation is a 4-neighbour flood fill over a coordinate-keyed map of
//! differing pixels, so cost scales with the number of diff pixels rather
//! than the full raster.

use crate::pixel::DiffPixel;
use std::collections::{HashMap, HashSet, VecDeque};

/// A connected cluster of differing pixels, before classification
#[derive(Debug, Clone)]
pub struct RawRegion {
    pub min_x: u32,
    pub min_y: u32,
    pub max_x: u32,
    pub max_y: u32,
    /// Differing pixel count (not the bounding-box area)
    pub pixel_count: usize,
    /// Mean color distance across the region's pixels
    pub avg_distance: f64,
}

impl RawRegion {
    pub fn width(&self) -> u32 {
        self.max_x - self.min_x + 1
    }

    pub fn height(&self) -> u32 {
        self.max_y - self.min_y + 1
    }

    pub fn area(&self) -> u64 {
        u64::from(self.width()) * u64::from(self.height())
    }

    /// Share of the bounding box actually covered by diff pixels
    pub fn pixel_density(&self) -> f64 {
        self.pixel_count as f64 / self.area() as f64
    }

    pub fn aspect_ratio(&self) -> f64 {
        f64::from(self.width()) / f64::from(self.height())
    }
}

/// Group `pixels` into connected regions, dropping clusters smaller than
/// `min_region_size` pixels and capping the result at `max_regions`,
/// largest first.
pub fn segment(pixels: &[DiffPixel], min_region_size: usize, max_regions: usize) -> Vec<RawRegion> {
    let mut by_coord: HashMap<(u32, u32), f64> = HashMap::with_capacity(pixels.len());
    for p in pixels {
        by_coord.insert((p.x, p.y), p.distance);
    }

    let mut visited: HashSet<(u32, u32)> = HashSet::with_capacity(pixels.len());
    let mut regions = Vec::new();

    for p in pixels {
        let start = (p.x, p.y);
        if visited.contains(&start) {
            continue;
        }
        let region = flood_fill(start, &by_coord, &mut visited);
        if region.pixel_count >= min_region_size {
            regions.push(region);
        }
    }

    // Largest regions carry the most signal; stable sort keeps discovery
    // order among equals.
    regions.sort_by(|a, b| b.pixel_count.cmp(&a.pixel_count));
    regions.truncate(max_regions);
    regions
}

fn flood_fill(
    start: (u32, u32),
    by_coord: &HashMap<(u32, u32), f64>,
    visited: &mut HashSet<(u32, u32)>,
) -> RawRegion {
    let mut queue = VecDeque::new();
    queue.push_back(start);
    visited.insert(start);

    let (mut min_x, mut min_y) = start;
    let (mut max_x, mut max_y) = start;
    let mut pixel_count = 0usize;
    let mut distance_sum = 0.0;

    while let Some((x, y)) = queue.pop_front() {
        let distance = match by_coord.get(&(x, y)) {
            Some(d) => *d,
            None => continue,
        };
        pixel_count += 1;
        distance_sum += distance;
        min_x = min_x.min(x);
        min_y = min_y.min(y);
        max_x = max_x.max(x);
        max_y = max_y.max(y);

        let mut neighbours = vec![(x + 1, y), (x, y + 1)];
        if x > 0 {
            neighbours.push((x - 1, y));
        }
        if y > 0 {
            neighbours.push((x, y - 1));
        }
        for next in neighbours {
            if by_coord.contains_key(&next) && visited.insert(next) {
                queue.push_back(next);
            }
        }
    }

    RawRegion {
        min_x,
        min_y,
        max_x,
        max_y,
        pixel_count,
        avg_distance: if pixel_count > 0 {
            distance_sum / pixel_count as f64
        } else {
            0.0
        },
    }
}
