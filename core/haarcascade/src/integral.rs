//! Integral image tables.

use crate::error::DetectError;

/// Mean and normalization factor of one square window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowStats {
    /// Mean intensity over the window.
    pub mean: f64,
    /// Intensity variance over the window.
    pub variance: f64,
    /// `area × standard deviation`, the divisor applied to feature responses.
    pub norm: f64,
}

/// Prefix-sum tables over a grayscale image.
///
/// Both tables are `(width + 1) × (height + 1)`, row-major, with row 0 and
/// column 0 all zero, so any rectangle sum is four lookups without bounds
/// special-casing.
#[derive(Debug, Clone)]
pub struct IntegralTables {
    width: u32,
    height: u32,
    stride: usize,
    sum: Vec<u64>,
    squared: Vec<u64>,
}

impl IntegralTables {
    /// Build the tables from a row-major grayscale buffer of `width × height` bytes.
    pub fn new(gray: &[u8], width: u32, height: u32) -> Result<Self, DetectError> {
        if width == 0 || height == 0 {
            return Err(DetectError::InvalidImage(format!(
                "image dimensions are zero: {width}x{height}"
            )));
        }
        let (w, h) = (width as usize, height as usize);
        let expected = w.checked_mul(h).ok_or_else(|| {
            DetectError::InvalidImage(format!("image too large: {width}x{height}"))
        })?;
        if gray.len() != expected {
            return Err(DetectError::InvalidImage(format!(
                "buffer holds {} bytes, expected {expected} for {width}x{height}",
                gray.len()
            )));
        }

        let stride = w + 1;
        let mut sum = vec![0u64; stride * (h + 1)];
        let mut squared = vec![0u64; stride * (h + 1)];

        for (y, row) in gray.chunks_exact(w).enumerate() {
            let mut row_sum = 0u64;
            let mut row_squared = 0u64;
            for (x, &pixel) in row.iter().enumerate() {
                let value = pixel as u64;
                row_sum += value;
                row_squared += value * value;
                let idx = (y + 1) * stride + (x + 1);
                sum[idx] = sum[idx - stride] + row_sum;
                squared[idx] = squared[idx - stride] + row_squared;
            }
        }

        Ok(Self {
            width,
            height,
            stride,
            sum,
            squared,
        })
    }

    /// Build the tables from an `image` crate grayscale buffer.
    pub fn from_image(image: &image::GrayImage) -> Result<Self, DetectError> {
        Self::new(image.as_raw(), image.width(), image.height())
    }

    /// Width of the source image.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height of the source image.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Sum of intensities over the rectangle. The rectangle must lie inside the image.
    #[inline]
    pub fn rect_sum(&self, x: u32, y: u32, width: u32, height: u32) -> u64 {
        self.lookup(&self.sum, x, y, width, height)
    }

    /// Sum of squared intensities over the rectangle.
    #[inline]
    pub fn rect_squared_sum(&self, x: u32, y: u32, width: u32, height: u32) -> u64 {
        self.lookup(&self.squared, x, y, width, height)
    }

    #[inline]
    fn lookup(&self, table: &[u64], x: u32, y: u32, width: u32, height: u32) -> u64 {
        debug_assert!(x + width <= self.width && y + height <= self.height);
        let (x0, y0) = (x as usize, y as usize);
        let (x1, y1) = (x0 + width as usize, y0 + height as usize);
        let s = self.stride;
        // Reordered so the unsigned arithmetic never underflows.
        table[y1 * s + x1] + table[y0 * s + x0] - table[y0 * s + x1] - table[y1 * s + x0]
    }

    /// Mean, variance and normalization factor of the square window at `(x, y)`.
    pub fn window_stats(&self, x: u32, y: u32, size: u32) -> WindowStats {
        let area = size as u128 * size as u128;
        let sum = self.rect_sum(x, y, size, size) as u128;
        let squared = self.rect_squared_sum(x, y, size, size) as u128;

        // area·Σv² − (Σv)² is exact in integers and never negative.
        let spread = (area * squared).saturating_sub(sum * sum) as f64;
        let area = area as f64;
        WindowStats {
            mean: sum as f64 / area,
            variance: spread / (area * area),
            norm: spread.sqrt(),
        }
    }
}
