/// A dense 2D raster grid in row-major order.
///
/// Unlike a planetary map this is a bounded authoring canvas: neighbor
/// lookups clamp at the borders instead of wrapping, so edge cells repeat
/// themselves.
#[derive(Clone, PartialEq)]
pub struct Grid<T> {
    pub width: usize,
    pub height: usize,
    data: Vec<T>,
}

/// Offsets for 8-neighbor scans.
/// 7 0 1
/// 6 X 2
/// 5 4 3
pub const DX: [i32; 8] = [0, 1, 1, 1, 0, -1, -1, -1];
pub const DY: [i32; 8] = [-1, -1, 0, 1, 1, 1, 0, -1];

impl<T: Clone + Default> Grid<T> {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            data: vec![T::default(); width * height],
        }
    }
}

impl<T: Clone> Grid<T> {
    pub fn new_with(width: usize, height: usize, value: T) -> Self {
        Self {
            width,
            height,
            data: vec![value; width * height],
        }
    }

    #[inline]
    pub fn index(&self, x: usize, y: usize) -> usize {
        y * self.width + x
    }

    #[inline]
    pub fn coords(&self, index: usize) -> (usize, usize) {
        (index % self.width, index / self.width)
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> &T {
        &self.data[y * self.width + x]
    }

    /// Edge-clamped lookup: out-of-range coordinates repeat the border cell.
    #[inline]
    pub fn get_clamped(&self, x: i32, y: i32) -> &T {
        let cx = x.clamp(0, self.width as i32 - 1) as usize;
        let cy = y.clamp(0, self.height as i32 - 1) as usize;
        &self.data[cy * self.width + cx]
    }

    pub fn set(&mut self, x: usize, y: usize, value: T) {
        let idx = y * self.width + x;
        self.data[idx] = value;
    }

    pub fn fill(&mut self, value: T) {
        self.data.fill(value);
    }

    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    /// In-bounds 8-connected neighbors.
    pub fn neighbors_8(&self, x: usize, y: usize) -> Vec<(usize, usize)> {
        let mut result = Vec::with_capacity(8);
        for dir in 0..8 {
            let nx = x as i32 + DX[dir];
            let ny = y as i32 + DY[dir];
            if nx >= 0 && nx < self.width as i32 && ny >= 0 && ny < self.height as i32 {
                result.push((nx as usize, ny as usize));
            }
        }
        result
    }

    /// Iterate over all cells with their coordinates.
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize, &T)> {
        self.data.iter().enumerate().map(move |(idx, val)| {
            let x = idx % self.width;
            let y = idx / self.width;
            (x, y, val)
        })
    }
}

impl Grid<f32> {
    /// Minimum and maximum cell values.
    pub fn min_max(&self) -> (f32, f32) {
        let mut min_val = f32::MAX;
        let mut max_val = f32::MIN;
        for &v in &self.data {
            if v < min_val {
                min_val = v;
            }
            if v > max_val {
                max_val = v;
            }
        }
        (min_val, max_val)
    }

    /// Sample at fractional coordinates with bilinear interpolation and
    /// edge clamping.
    pub fn sample_bilinear(&self, x: f32, y: f32) -> f32 {
        let x0 = x.floor() as i32;
        let y0 = y.floor() as i32;

        let fx = x - x.floor();
        let fy = y - y.floor();

        let v00 = *self.get_clamped(x0, y0);
        let v10 = *self.get_clamped(x0 + 1, y0);
        let v01 = *self.get_clamped(x0, y0 + 1);
        let v11 = *self.get_clamped(x0 + 1, y0 + 1);

        let v0 = v00 * (1.0 - fx) + v10 * fx;
        let v1 = v01 * (1.0 - fx) + v11 * fx;
        v0 * (1.0 - fy) + v1 * fy
    }

    /// One radius-1 box-blur pass with edge-clamped taps.
    pub fn box_blur(&self) -> Grid<f32> {
        let mut result = Grid::new_with(self.width, self.height, 0.0f32);
        for y in 0..self.height {
            for x in 0..self.width {
                let mut sum = 0.0f32;
                for dy in -1i32..=1 {
                    for dx in -1i32..=1 {
                        sum += *self.get_clamped(x as i32 + dx, y as i32 + dy);
                    }
                }
                result.set(x, y, sum / 9.0);
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_round_trip() {
        let grid = Grid::new_with(7, 5, 0u32);
        for y in 0..5 {
            for x in 0..7 {
                assert_eq!(grid.coords(grid.index(x, y)), (x, y));
            }
        }
    }

    #[test]
    fn test_clamped_lookup_repeats_border() {
        let mut grid = Grid::new_with(4, 4, 0.0f32);
        grid.set(0, 0, 7.0);
        grid.set(3, 3, 9.0);

        assert_eq!(*grid.get_clamped(-2, -5), 7.0);
        assert_eq!(*grid.get_clamped(10, 10), 9.0);
    }

    #[test]
    fn test_neighbors_8_at_corner() {
        let grid = Grid::new_with(4, 4, 0u8);
        assert_eq!(grid.neighbors_8(0, 0).len(), 3);
        assert_eq!(grid.neighbors_8(1, 1).len(), 8);
    }

    #[test]
    fn test_box_blur_preserves_uniform_field() {
        let grid = Grid::new_with(8, 8, 0.4f32);
        let blurred = grid.box_blur();
        for (_, _, &v) in blurred.iter() {
            assert!((v - 0.4).abs() < 1e-6);
        }
    }
}
