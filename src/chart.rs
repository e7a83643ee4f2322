//! Score history chart.
//!
//! Draws screening totals over time as a PNG line chart: severity bands in
//! the background, a grid, the score polyline and a marker per entry. There
//! is no text on the image; the accompanying message carries the numbers.

use std::io::Cursor;

use image::{ImageFormat, Rgb, RgbImage};

use crate::error::ChartError;
use crate::history::DiagnosisEntry;
use crate::survey::MAX_SCORE;

/// Produces an image from a user's score history.
pub trait ChartRenderer: Send + Sync {
    /// Encoded PNG bytes.
    fn render(&self, history: &[DiagnosisEntry]) -> Result<Vec<u8>, ChartError>;
}

const BACKGROUND: Rgb<u8> = Rgb([255, 255, 255]);
const GRID: Rgb<u8> = Rgb([225, 225, 225]);
const AXIS: Rgb<u8> = Rgb([40, 40, 40]);
const LINE: Rgb<u8> = Rgb([31, 94, 214]);

/// Background tint per severity band, lowest first, with each band's
/// inclusive upper score.
const BANDS: [(u32, Rgb<u8>); 4] = [
    (5, Rgb([236, 248, 236])),
    (10, Rgb([252, 249, 230])),
    (15, Rgb([253, 240, 228])),
    (MAX_SCORE, Rgb([252, 232, 232])),
];

/// Line chart drawn directly into an RGB buffer.
#[derive(Debug, Clone)]
pub struct PngChartRenderer {
    width: u32,
    height: u32,
    margin: u32,
}

impl Default for PngChartRenderer {
    fn default() -> Self {
        Self {
            width: 800,
            height: 600,
            margin: 48,
        }
    }
}

impl PngChartRenderer {
    pub fn new(width: u32, height: u32) -> Self {
        let margin = (width.min(height) / 12).max(8);
        Self {
            width,
            height,
            margin,
        }
    }

    fn plot_width(&self) -> u32 {
        self.width.saturating_sub(2 * self.margin).max(1)
    }

    fn plot_height(&self) -> u32 {
        self.height.saturating_sub(2 * self.margin).max(1)
    }

    /// Pixel y for a score; 0 sits on the x axis, `MAX_SCORE` on the top edge.
    fn y_for(&self, score: u32) -> i64 {
        let score = score.min(MAX_SCORE) as i64;
        let bottom = (self.height - self.margin) as i64;
        bottom - score * self.plot_height() as i64 / MAX_SCORE as i64
    }

    /// Pixel x for the i-th of n entries, spread evenly across the plot.
    fn x_for(&self, i: usize, n: usize) -> i64 {
        let left = self.margin as i64;
        if n <= 1 {
            return left + self.plot_width() as i64 / 2;
        }
        left + i as i64 * self.plot_width() as i64 / (n as i64 - 1)
    }
}

impl ChartRenderer for PngChartRenderer {
    fn render(&self, history: &[DiagnosisEntry]) -> Result<Vec<u8>, ChartError> {
        if history.is_empty() {
            return Err(ChartError::EmptyHistory);
        }

        let mut img = RgbImage::from_pixel(self.width, self.height, BACKGROUND);
        let left = self.margin as i64;
        let right = (self.width - self.margin) as i64;

        let mut lower = 0;
        for (upper, color) in BANDS {
            fill_rect(&mut img, left, self.y_for(upper), right, self.y_for(lower), color);
            lower = upper;
        }

        for score in (0..=MAX_SCORE).step_by(3) {
            let y = self.y_for(score);
            draw_line(&mut img, (left, y), (right, y), GRID);
        }
        for i in 0..history.len() {
            let x = self.x_for(i, history.len());
            draw_line(&mut img, (x, self.y_for(0)), (x, self.y_for(MAX_SCORE)), GRID);
        }

        draw_line(&mut img, (left, self.y_for(0)), (right, self.y_for(0)), AXIS);
        draw_line(&mut img, (left, self.y_for(0)), (left, self.y_for(MAX_SCORE)), AXIS);

        let points: Vec<(i64, i64)> = history
            .iter()
            .enumerate()
            .map(|(i, e)| (self.x_for(i, history.len()), self.y_for(e.score)))
            .collect();
        for pair in points.windows(2) {
            draw_thick_line(&mut img, pair[0], pair[1], LINE);
        }
        for &p in &points {
            fill_circle(&mut img, p, 5, LINE);
        }

        let mut buf = Cursor::new(Vec::new());
        img.write_to(&mut buf, ImageFormat::Png)?;
        Ok(buf.into_inner())
    }
}

fn put(img: &mut RgbImage, x: i64, y: i64, color: Rgb<u8>) {
    if x >= 0 && y >= 0 && (x as u32) < img.width() && (y as u32) < img.height() {
        img.put_pixel(x as u32, y as u32, color);
    }
}

fn fill_rect(img: &mut RgbImage, x0: i64, y0: i64, x1: i64, y1: i64, color: Rgb<u8>) {
    for y in y0.min(y1)..=y0.max(y1) {
        for x in x0.min(x1)..=x0.max(x1) {
            put(img, x, y, color);
        }
    }
}

/// Bresenham.
fn draw_line(img: &mut RgbImage, from: (i64, i64), to: (i64, i64), color: Rgb<u8>) {
    let (mut x, mut y) = from;
    let dx = (to.0 - x).abs();
    let dy = -(to.1 - y).abs();
    let sx = if x < to.0 { 1 } else { -1 };
    let sy = if y < to.1 { 1 } else { -1 };
    let mut err = dx + dy;

    loop {
        put(img, x, y, color);
        if x == to.0 && y == to.1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x += sx;
        }
        if e2 <= dx {
            err += dx;
            y += sy;
        }
    }
}

fn draw_thick_line(img: &mut RgbImage, from: (i64, i64), to: (i64, i64), color: Rgb<u8>) {
    for offset in -1..=1 {
        draw_line(img, (from.0, from.1 + offset), (to.0, to.1 + offset), color);
        draw_line(img, (from.0 + offset, from.1), (to.0 + offset, to.1), color);
    }
}

fn fill_circle(img: &mut RgbImage, center: (i64, i64), radius: i64, color: Rgb<u8>) {
    for dy in -radius..=radius {
        for dx in -radius..=radius {
            if dx * dx + dy * dy <= radius * radius {
                put(img, center.0 + dx, center.1 + dy, color);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::Timestamp;
    use chrono::NaiveDate;

    fn entry(day: u32, score: u32) -> DiagnosisEntry {
        DiagnosisEntry {
            date: Timestamp::from_naive(
                NaiveDate::from_ymd_opt(2024, 5, day)
                    .unwrap()
                    .and_hms_opt(12, 0, 0)
                    .unwrap(),
            ),
            score,
        }
    }

    fn decode(png: &[u8]) -> RgbImage {
        image::load_from_memory_with_format(png, ImageFormat::Png)
            .unwrap()
            .to_rgb8()
    }

    #[test]
    fn empty_history_is_an_error() {
        let err = PngChartRenderer::default().render(&[]).unwrap_err();
        assert!(matches!(err, ChartError::EmptyHistory));
    }

    #[test]
    fn renders_png_of_requested_size() {
        let renderer = PngChartRenderer::new(320, 240);
        let png = renderer.render(&[entry(1, 4), entry(2, 12)]).unwrap();
        assert_eq!(&png[..8], b"\x89PNG\r\n\x1a\n");

        let img = decode(&png);
        assert_eq!(img.dimensions(), (320, 240));
    }

    #[test]
    fn markers_sit_at_score_heights() {
        let renderer = PngChartRenderer::default();
        let history = [entry(1, 0), entry(2, 9), entry(3, 18)];
        let img = decode(&renderer.render(&history).unwrap());

        for (i, e) in history.iter().enumerate() {
            let x = renderer.x_for(i, history.len()) as u32;
            let y = renderer.y_for(e.score) as u32;
            assert_eq!(*img.get_pixel(x, y), LINE, "no marker for entry {i}");
        }
    }

    #[test]
    fn single_entry_is_centred() {
        let renderer = PngChartRenderer::default();
        let img = decode(&renderer.render(&[entry(1, 7)]).unwrap());
        let x = renderer.x_for(0, 1) as u32;
        assert_eq!(x, 400);
        assert_eq!(*img.get_pixel(x, renderer.y_for(7) as u32), LINE);
    }

    #[test]
    fn out_of_range_scores_are_clamped() {
        let renderer = PngChartRenderer::default();
        assert_eq!(renderer.y_for(99), renderer.y_for(MAX_SCORE));
        assert!(renderer.render(&[entry(1, 99)]).is_ok());
    }
}
