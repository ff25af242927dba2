//! ASCII plotting for terminal output.
//!
//! This is intentionally "dumb" (fixed-size grid), optimized for:
//! - quick visual sanity checks in a terminal
//! - deterministic output (helpful for golden tests)
//!
//! Line series are drawn first so that point series overlay them.

/// How a series is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeriesStyle {
    /// Consecutive samples joined by line segments.
    Line,
    /// One marker per sample.
    Points,
}

/// A labelled `(x, y)` series.
#[derive(Debug, Clone)]
pub struct Series {
    pub label: String,
    pub marker: char,
    pub style: SeriesStyle,
    pub points: Vec<(f64, f64)>,
}

impl Series {
    pub fn line(label: impl Into<String>, marker: char, x: &[f64], y: &[f64]) -> Self {
        Self::new(label, marker, SeriesStyle::Line, x, y)
    }

    pub fn points(label: impl Into<String>, marker: char, x: &[f64], y: &[f64]) -> Self {
        Self::new(label, marker, SeriesStyle::Points, x, y)
    }

    fn new(label: impl Into<String>, marker: char, style: SeriesStyle, x: &[f64], y: &[f64]) -> Self {
        Self {
            label: label.into(),
            marker,
            style,
            points: x.iter().copied().zip(y.iter().copied()).collect(),
        }
    }
}

/// Anything that can draw a set of series.
pub trait Renderer {
    fn plot(&self, series: &[Series]) -> String;
}

/// Fixed-size character grid renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AsciiRenderer {
    pub width: usize,
    pub height: usize,
}

impl Default for AsciiRenderer {
    fn default() -> Self {
        Self { width: 80, height: 20 }
    }
}

impl Renderer for AsciiRenderer {
    fn plot(&self, series: &[Series]) -> String {
        let width = self.width.max(10);
        let height = self.height.max(5);

        let (x_min, x_max) = range(series.iter().flat_map(|s| s.points.iter().map(|p| p.0))).unwrap_or((0.0, 1.0));
        let (y_min, y_max) = range(series.iter().flat_map(|s| s.points.iter().map(|p| p.1))).unwrap_or((0.0, 1.0));
        let (y_min, y_max) = pad_range(y_min, y_max, 0.05);

        let mut grid = vec![vec![' '; width]; height];
        let map = |(x, y): (f64, f64)| {
            (
                map_x(x, x_min, x_max, width),
                map_y(y, y_min, y_max, height),
            )
        };

        for s in series.iter().filter(|s| s.style == SeriesStyle::Line) {
            let mut prev = None;
            for &p in &s.points {
                let (x, y) = map(p);
                match prev {
                    Some((x0, y0)) => draw_line(&mut grid, x0, y0, x, y, s.marker),
                    None => {
                        if grid[y][x] == ' ' {
                            grid[y][x] = s.marker;
                        }
                    }
                }
                prev = Some((x, y));
            }
        }
        for s in series.iter().filter(|s| s.style == SeriesStyle::Points) {
            for &p in &s.points {
                let (x, y) = map(p);
                grid[y][x] = s.marker;
            }
        }

        let mut out = String::new();
        out.push_str(&format!(
            "Plot: t=[{x_min:.3}, {x_max:.3}] s | y=[{y_min:.2}, {y_max:.2}]\n"
        ));
        for row in grid {
            out.push_str(&row.into_iter().collect::<String>());
            out.push('\n');
        }
        let legend: Vec<String> = series.iter().map(|s| format!("{} {}", s.marker, s.label)).collect();
        out.push_str(&format!("Legend: {}\n", legend.join(", ")));
        out
    }
}

/// Finite `(min, max)` of `values`, or `None` if empty or degenerate.
fn range(values: impl Iterator<Item = f64>) -> Option<(f64, f64)> {
    let (lo, hi) = values
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));
    if lo.is_finite() && hi.is_finite() && hi > lo {
        Some((lo, hi))
    } else if lo.is_finite() {
        // Flat series: center it in a unit band.
        Some((lo - 0.5, lo + 0.5))
    } else {
        None
    }
}

fn pad_range(min: f64, max: f64, frac: f64) -> (f64, f64) {
    let span = (max - min).abs();
    let pad = (span * frac).max(1e-12);
    (min - pad, max + pad)
}

fn map_x(x: f64, x_min: f64, x_max: f64, width: usize) -> usize {
    let width = width.max(2);
    let u = ((x - x_min) / (x_max - x_min)).clamp(0.0, 1.0);
    (u * (width as f64 - 1.0)).round() as usize
}

fn map_y(y: f64, y_min: f64, y_max: f64, height: usize) -> usize {
    let height = height.max(2);
    let u = ((y - y_min) / (y_max - y_min)).clamp(0.0, 1.0);
    // y max is the top row.
    (height as f64 - 1.0 - (u * (height as f64 - 1.0))).round() as usize
}

/// Integer line drawing (Bresenham). Only blank cells are painted.
fn draw_line(grid: &mut [Vec<char>], x0: usize, y0: usize, x1: usize, y1: usize, ch: char) {
    let mut x0 = x0 as isize;
    let mut y0 = y0 as isize;
    let x1 = x1 as isize;
    let y1 = y1 as isize;

    let dx = (x1 - x0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let dy = -(y1 - y0).abs();
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    loop {
        if y0 >= 0
            && (y0 as usize) < grid.len()
            && x0 >= 0
            && (x0 as usize) < grid[0].len()
            && grid[y0 as usize][x0 as usize] == ' '
        {
            grid[y0 as usize][x0 as usize] = ch;
        }

        if x0 == x1 && y0 == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x0 += sx;
        }
        if e2 <= dx {
            err += dx;
            y0 += sy;
        }
    }
}
