use std::io::Cursor;
use std::ops::Range;
use image::{DynamicImage, ImageBuffer, ImageFormat, Rgb};
use plotters::coord::Shift;
use plotters::prelude::*;
use crate::analysis::error::AnalysisError;
use crate::analysis::microdialysis::FoldChange;
use crate::analysis::pipeline::AlignedMatrix;
#[derive(Clone, Debug)]
pub struct PlotStyle {
    pub width: u32,
    pub height: u32,
    pub background: RGBColor,
    pub vehicle_color: RGBColor,
    pub treatment_color: RGBColor,
    pub point_color: RGBColor,
    /// Vertical spacing between stacked subject traces, in z units.
    pub trace_offset: f64,
    pub trace_x_range: Range<f64>,
    pub trace_y_range: Range<f64>,
    pub fold_x_range: Range<f64>,
    pub fold_y_range: Range<f64>,
}
impl Default for PlotStyle {
    fn default() -> Self {
        Self {
            width: 1200,
            height: 800,
            background: WHITE,
            vehicle_color: RGBColor(105, 105, 105),
            treatment_color: RGBColor(100, 149, 237),
            point_color: RGBColor(128, 128, 128),
            trace_offset: 30.0,
            trace_x_range: -50.0..100.0,
            trace_y_range: -10.0..200.0,
            fold_x_range: -60.0..120.0,
            fold_y_range: -2.0..30.0,
        }
    }
}
type Panel<'a> = DrawingArea<BitMapBackend<'a>, Shift>;
/// Right label area reserved for the scale bar, in pixels.
const SCALE_BAR_MARGIN: u32 = 70;
const SCALE_BAR_GAP: i32 = 25;
/// Stacked z-scored traces, vehicle on the left and treatment on the right.
pub fn render_trace_overlay_png(
    vehicle: &AlignedMatrix,
    treatment: &AlignedMatrix,
    style: &PlotStyle,
) -> Result<Vec<u8>, AnalysisError> {
    for matrix in [vehicle, treatment] {
        if matrix.num_subjects() == 0 || matrix.window_len() == 0 {
            return Err(AnalysisError::Plot("aligned matrix has no traces".into()));
        }
    }
    let mut buffer = vec![0u8; (style.width * style.height * 3) as usize];
    {
        let root = BitMapBackend::with_buffer(&mut buffer, (style.width, style.height))
            .into_drawing_area();
        root.fill(&style.background)?;
        let panels = root.split_evenly((1, 2));
        draw_trace_panel(
            &panels[0],
            vehicle,
            "Vehicle traces",
            "Minutes from vehicle injection",
            style.vehicle_color,
            style,
            true,
        )?;
        draw_trace_panel(
            &panels[1],
            treatment,
            "Amphetamine traces",
            "Minutes from amph. injection",
            style.treatment_color,
            style,
            false,
        )?;
        root.present()?;
    }
    encode_png(&buffer, style.width, style.height)
}
fn draw_trace_panel(
    area: &Panel<'_>,
    matrix: &AlignedMatrix,
    title: &str,
    x_desc: &str,
    color: RGBColor,
    style: &PlotStyle,
    scale_bar: bool,
) -> Result<(), AnalysisError> {
    let mut chart = ChartBuilder::on(area)
        .margin(10)
        .caption(title, ("sans-serif", 20).into_font().color(&BLACK))
        .set_label_area_size(LabelAreaPosition::Left, 20)
        .set_label_area_size(LabelAreaPosition::Bottom, 40)
        .set_label_area_size(
            LabelAreaPosition::Right,
            if scale_bar { SCALE_BAR_MARGIN } else { 0 },
        )
        .build_cartesian_2d(style.trace_x_range.clone(), style.trace_y_range.clone())?;
    chart
        .configure_mesh()
        .disable_mesh()
        .y_labels(0)
        .x_desc(x_desc)
        .draw()?;
    for (idx, row) in matrix.traces.outer_iter().enumerate() {
        let offset = idx as f64 * style.trace_offset;
        let series = matrix
            .time_minutes
            .iter()
            .zip(row.iter())
            .filter(|(_, v)| v.is_finite())
            .map(|(&t, &v)| (t, v + offset));
        chart.draw_series(LineSeries::new(series, &color))?;
    }
    if scale_bar {
        // 20 z units tall, drawn in the right margin so it never covers a trace.
        let (plot_x, _) = chart.plotting_area().get_pixel_range();
        let x0 = style.trace_x_range.start;
        let (_, top) = chart.backend_coord(&(x0, 100.0));
        let (_, bottom) = chart.backend_coord(&(x0, 80.0));
        let [upper, lower] = scale_bar_segment(plot_x.end, top, bottom, area.get_base_pixel());
        area.draw(&PathElement::new(vec![upper, lower], BLACK))?;
        area.draw(&Text::new(
            "20 zF",
            (upper.0 + 6, (upper.1 + lower.1) / 2 - 7),
            ("sans-serif", 14).into_font(),
        ))?;
    }
    Ok(())
}
/// Scale bar endpoints in panel pixels, `SCALE_BAR_GAP` right of the plotting area.
/// `plot_right`, `top` and `bottom` are backend pixels; `base` is the panel origin.
fn scale_bar_segment(plot_right: i32, top: i32, bottom: i32, base: (i32, i32)) -> [(i32, i32); 2] {
    let x = plot_right - base.0 + SCALE_BAR_GAP;
    [(x, top - base.1), (x, bottom - base.1)]
}
/// Fold change from baseline: mean line plus each subject as a point.
pub fn render_fold_change_png(
    vehicle: &FoldChange,
    treatment: &FoldChange,
    style: &PlotStyle,
) -> Result<Vec<u8>, AnalysisError> {
    for fc in [vehicle, treatment] {
        if fc.num_bins() == 0 {
            return Err(AnalysisError::Plot(format!("'{}' has no time bins", fc.name)));
        }
    }
    let height = style.height / 2;
    let mut buffer = vec![0u8; (style.width * height * 3) as usize];
    {
        let root = BitMapBackend::with_buffer(&mut buffer, (style.width, height)).into_drawing_area();
        root.fill(&style.background)?;
        let panels = root.split_evenly((1, 2));
        draw_fold_panel(
            &panels[0],
            vehicle,
            "Vehicle trace",
            "Minutes from vehicle injection",
            Some("Fold change from baseline"),
            style.vehicle_color,
            style,
        )?;
        draw_fold_panel(
            &panels[1],
            treatment,
            "Amphetamine trace",
            "Minutes from amph. injection",
            None,
            style.treatment_color,
            style,
        )?;
        root.present()?;
    }
    encode_png(&buffer, style.width, height)
}
fn draw_fold_panel(
    area: &Panel<'_>,
    fc: &FoldChange,
    title: &str,
    x_desc: &str,
    y_desc: Option<&str>,
    color: RGBColor,
    style: &PlotStyle,
) -> Result<(), AnalysisError> {
    let mut chart = ChartBuilder::on(area)
        .margin(10)
        .caption(title, ("sans-serif", 20).into_font().color(&BLACK))
        .set_label_area_size(LabelAreaPosition::Left, 45)
        .set_label_area_size(LabelAreaPosition::Bottom, 40)
        .build_cartesian_2d(style.fold_x_range.clone(), style.fold_y_range.clone())?;
    let mut mesh = chart.configure_mesh();
    mesh.disable_mesh().x_labels(4).x_desc(x_desc);
    if let Some(desc) = y_desc {
        mesh.y_desc(desc);
    }
    mesh.draw()?;
    let point_color = style.point_color;
    for (bin, row) in fc.normalized.outer_iter().enumerate() {
        let t = fc.time_minutes[bin];
        chart.draw_series(
            row.iter()
                .filter(|v| v.is_finite())
                .map(|&v| Circle::new((t, v), 3, point_color.filled())),
        )?;
    }
    let mean = fc
        .time_minutes
        .iter()
        .zip(fc.mean.iter())
        .filter(|(_, v)| v.is_finite())
        .map(|(&t, &v)| (t, v));
    chart.draw_series(LineSeries::new(mean, color.stroke_width(2)))?;
    Ok(())
}
fn encode_png(buffer: &[u8], width: u32, height: u32) -> Result<Vec<u8>, AnalysisError> {
    let image = ImageBuffer::<Rgb<u8>, _>::from_raw(width, height, buffer.to_vec())
        .ok_or_else(|| AnalysisError::Plot("failed to allocate image buffer".into()))?;
    let mut output = Vec::new();
    let dynamic = DynamicImage::ImageRgb8(image);
    dynamic.write_to(&mut Cursor::new(&mut output), ImageFormat::Png)?;
    Ok(output)
}
