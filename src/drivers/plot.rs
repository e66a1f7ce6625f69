use std::io::Cursor;
use std::path::Path;
use image::{DynamicImage, ImageBuffer, ImageFormat, Rgb};
use plotters::prelude::*;
use crate::drivers::error::DaqError;
use crate::plotter::{format_time, tick_format, tick_step};
#[derive(Clone, Debug)]
pub struct PlotStyle {
    pub width: u32,
    pub height: u32,
    pub background: RGBColor,
    pub line: RGBColor,
}
impl Default for PlotStyle {
    fn default() -> Self {
        Self {
            width: 900,
            height: 400,
            background: RGBColor(10, 10, 10),
            line: BLUE,
        }
    }
}
/// Renders (epoch seconds, volts) points as a line with markers and returns PNG bytes.
pub fn render_series_png(
    points: &[[f64; 2]],
    title: &str,
    style: &PlotStyle,
) -> Result<Vec<u8>, DaqError> {
    if points.is_empty() {
        return Err(DaqError::Plot("series has no points".into()));
    }
    let (x0, x1) = x_bounds(points);
    let (y0, y1) = y_bounds(points);
    let x_format = tick_format(tick_step(x1 - x0));
    let mut buffer = vec![0u8; (style.width * style.height * 3) as usize];
    {
        let root = BitMapBackend::with_buffer(&mut buffer, (style.width, style.height))
            .into_drawing_area();
        root.fill(&style.background)?;
        let mut chart = ChartBuilder::on(&root)
            .margin(10)
            .caption(title, ("sans-serif", 20).into_font().color(&WHITE))
            .set_label_area_size(LabelAreaPosition::Left, 50)
            .set_label_area_size(LabelAreaPosition::Bottom, 40)
            .build_cartesian_2d(x0..x1, y0..y1)?;
        chart
            .configure_mesh()
            .light_line_style(&WHITE.mix(0.1))
            .axis_desc_style(("sans-serif", 14).into_font().color(&WHITE))
            .label_style(("sans-serif", 12).into_font().color(&WHITE))
            .x_labels(6)
            .x_label_formatter(&|x| format_time(*x, x_format))
            .y_desc("Volts")
            .draw()?;
        let color = style.line;
        chart.draw_series(LineSeries::new(points.iter().map(|p| (p[0], p[1])), &color))?;
        chart.draw_series(
            points
                .iter()
                .map(|p| Circle::new((p[0], p[1]), 2, color.filled())),
        )?;
        root.present()?;
    }
    encode_png(&buffer, style.width, style.height)
}
pub fn save_series_png(
    path: &Path,
    points: &[[f64; 2]],
    title: &str,
    style: &PlotStyle,
) -> Result<(), DaqError> {
    let png = render_series_png(points, title, style)?;
    std::fs::write(path, png)?;
    log::info!("plot saved to {}", path.display());
    Ok(())
}
fn x_bounds(points: &[[f64; 2]]) -> (f64, f64) {
    let first = points[0][0];
    let last = points[points.len() - 1][0];
    if last - first < 1.0 {
        (first - 1.0, last + 1.0)
    } else {
        (first, last)
    }
}
fn y_bounds(points: &[[f64; 2]]) -> (f64, f64) {
    let lo = points.iter().map(|p| p[1]).fold(f64::INFINITY, f64::min);
    let hi = points.iter().map(|p| p[1]).fold(f64::NEG_INFINITY, f64::max);
    if (hi - lo).abs() < f64::EPSILON {
        (lo - 0.5, hi + 0.5)
    } else {
        let pad = (hi - lo) * 0.05;
        (lo - pad, hi + pad)
    }
}
fn encode_png(buffer: &[u8], width: u32, height: u32) -> Result<Vec<u8>, DaqError> {
    let image = ImageBuffer::<Rgb<u8>, _>::from_raw(width, height, buffer.to_vec())
        .ok_or_else(|| DaqError::Plot("failed to allocate image buffer".into()))?;
    let mut output = Vec::new();
    let dynamic = DynamicImage::ImageRgb8(image);
    dynamic.write_to(&mut Cursor::new(&mut output), ImageFormat::Png)?;
    Ok(output)
}
