use glam::Vec2;

use crate::math::Aabb;

/// Uniform 2-D spatial hash over axis-aligned boxes.
///
/// Each entry is registered in every cell its box covers. Construction uses a
/// counting sort: count entries per cell -> prefix sum -> scatter.
pub struct SpatialHashGrid {
    inv_cell_size: f32,
    table_size: usize,
    /// Scratch counts, reused as scatter offsets during build.
    cell_count: Vec<u32>,
    /// cell_start[hash] = index where this cell's entries begin in `sorted_entries`
    cell_start: Vec<u32>,
    /// Entry indices grouped by cell hash
    sorted_entries: Vec<u32>,
}

impl SpatialHashGrid {
    /// `cell_size` should be on the order of a typical obstacle extent.
    pub fn new(cell_size: f32, table_size: usize) -> Self {
        let table_size = table_size.max(1);
        Self {
            inv_cell_size: 1.0 / cell_size.max(1.0e-3),
            table_size,
            cell_count: vec![0u32; table_size],
            cell_start: vec![0u32; table_size + 1],
            sorted_entries: Vec::new(),
        }
    }

    /// Rebuild from the boxes of all entries. `None` marks a vacant slot.
    pub fn build(&mut self, boxes: &[Option<Aabb>]) {
        let mut counts = std::mem::take(&mut self.cell_count);
        counts.iter_mut().for_each(|c| *c = 0);
        for aabb in boxes.iter().flatten() {
            self.for_each_cell(aabb, |h| counts[h] += 1);
        }
        self.cell_count = counts;

        self.cell_start[0] = 0;
        for k in 0..self.table_size {
            self.cell_start[k + 1] = self.cell_start[k] + self.cell_count[k];
        }
        self.sorted_entries.clear();
        self.sorted_entries
            .resize(self.cell_start[self.table_size] as usize, 0);

        self.cell_count.iter_mut().for_each(|c| *c = 0);
        let mut counts = std::mem::take(&mut self.cell_count);
        let mut sorted = std::mem::take(&mut self.sorted_entries);
        for (index, aabb) in boxes.iter().enumerate() {
            let Some(aabb) = aabb else { continue };
            self.for_each_cell(aabb, |h| {
                let slot = self.cell_start[h] + counts[h];
                sorted[slot as usize] = index as u32;
                counts[h] += 1;
            });
        }
        self.cell_count = counts;
        self.sorted_entries = sorted;
    }

    /// Collect candidate entries whose cells intersect `area` into `out`,
    /// sorted and without duplicates. Candidates still need an exact test.
    pub fn query(&self, area: &Aabb, out: &mut Vec<u32>) {
        let start_len = out.len();
        self.for_each_cell(area, |h| {
            let start = self.cell_start[h] as usize;
            let end = self.cell_start[h + 1] as usize;
            out.extend_from_slice(&self.sorted_entries[start..end]);
        });
        out[start_len..].sort_unstable();
        let mut tail = out.split_off(start_len);
        tail.dedup();
        out.extend(tail);
    }

    #[inline]
    fn hash_cell(&self, cx: i32, cy: i32) -> usize {
        let h = (cx as u32).wrapping_mul(73856093) ^ (cy as u32).wrapping_mul(19349663);
        (h as usize) % self.table_size
    }

    #[inline]
    fn cell_coords(&self, p: Vec2) -> (i32, i32) {
        (
            (p.x * self.inv_cell_size).floor() as i32,
            (p.y * self.inv_cell_size).floor() as i32,
        )
    }

    /// Visit the hash of every cell covered by `aabb`. Boxes spanning more
    /// cells than the table holds visit each table slot once instead.
    fn for_each_cell<F: FnMut(usize)>(&self, aabb: &Aabb, mut f: F) {
        let (lo_x, lo_y) = self.cell_coords(aabb.min);
        let (hi_x, hi_y) = self.cell_coords(aabb.max);
        let span = (hi_x as i64 - lo_x as i64 + 1) * (hi_y as i64 - lo_y as i64 + 1);
        if span > self.table_size as i64 {
            (0..self.table_size).for_each(f);
            return;
        }
        for cy in lo_y..=hi_y {
            for cx in lo_x..=hi_x {
                f(self.hash_cell(cx, cy));
            }
        }
    }
}
