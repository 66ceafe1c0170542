//! Bland-Altman plots rendered with `plotters`.
//!
//! The chart shows the mean of every complete pair against its difference,
//! with dashed reference lines at the bias and at both limits of agreement.
//! Each line is annotated with its value just right of the largest pair mean.
//!
//! Drawing works on any `plotters` backend; [`render_svg`] renders into an
//! in-memory SVG document.

use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::ops::Range;

use num_traits::Float;
use ordered_float::OrderedFloat;
use plotters::{
    coord::Shift,
    prelude::*,
    series::DashedLineSeries,
    style::text_anchor::{HPos, Pos, VPos},
};

use crate::{Agreement, BlandAltman, Error, Measurement};

/// Appearance of a Bland-Altman chart
#[derive(Debug, Clone)]
pub struct PlotStyle {
    /// Chart caption, none by default
    pub caption: Option<String>,
    /// Description of the x axis
    pub x_desc: String,
    /// Description of the y axis
    pub y_desc: String,
    /// Radius of the scatter points in pixels
    pub point_radius: u32,
    /// Horizontal offset of the annotations, as a fraction of the largest pair mean
    pub annotation_offset: f64,
    /// Vertical offset of the limit annotations away from their line, in data units
    pub label_offset: f64,
    /// Decimal places of the annotated values
    pub precision: usize,
    /// Font size of the annotations
    pub font_size: f64,
    /// Colour of the scatter points
    pub point_color: RGBColor,
    /// Colour of the mean difference line
    pub mean_color: RGBColor,
    /// Colour of the limit of agreement lines
    pub limit_color: RGBColor,
}

impl Default for PlotStyle {
    fn default() -> Self {
        Self {
            caption: None,
            x_desc: "Mean of Data1 and Data2".to_string(),
            y_desc: "Difference between Data1 and Data2".to_string(),
            point_radius: 3,
            annotation_offset: 0.02,
            label_offset: 1.0,
            precision: 2,
            font_size: 14.0,
            point_color: RGBColor(31, 119, 180),
            mean_color: RGBColor(128, 128, 128),
            limit_color: RED,
        }
    }
}

impl PlotStyle {
    /// Sets the chart caption
    ///
    /// # Arguments
    ///
    /// * `caption` - The caption drawn above the chart
    ///
    /// # Returns
    ///
    /// * `&mut Self` - The style object
    pub fn set_caption(&mut self, caption: impl Into<String>) -> &mut Self {
        self.caption = Some(caption.into());
        self
    }

    /// Sets the axis descriptions
    ///
    /// # Arguments
    ///
    /// * `x_desc` - Description of the pair means axis
    /// * `y_desc` - Description of the differences axis
    ///
    /// # Returns
    ///
    /// * `&mut Self` - The style object
    pub fn set_axis_desc(&mut self, x_desc: impl Into<String>, y_desc: impl Into<String>) -> &mut Self {
        self.x_desc = x_desc.into();
        self.y_desc = y_desc.into();
        self
    }
}

/// A horizontal reference line with its annotation
struct ReferenceLine {
    label: &'static str,
    value: f64,
    shift: f64,
    color: RGBColor,
}

/// Everything the chart needs, in plotting coordinates
struct Layout {
    points: Vec<(f64, f64)>,
    lines: Vec<ReferenceLine>,
    text_x: f64,
    x: Range<f64>,
    y: Range<f64>,
}

impl Layout {
    fn new<T>(stats: &BlandAltman<T>, agreement: &Agreement<T>, style: &PlotStyle) -> Result<Self, Error>
    where
        T: Default + Clone + Float,
    {
        let points: Vec<(f64, f64)> = stats
            .points()
            .filter_map(|(m, d)| m.to_f64().zip(d.to_f64()))
            .filter(|(m, d)| m.is_finite() && d.is_finite())
            .collect();
        if points.is_empty() {
            return Err(Error::NoCompletePairs);
        }

        let max_mean = stats
            .max_mean()
            .and_then(|m| m.to_f64())
            .ok_or(Error::NoCompletePairs)?;
        let scale = if max_mean.abs() > f64::EPSILON {
            max_mean.abs()
        } else {
            // no magnitude to scale by, fall back to the spread of the means
            extent(points.iter().map(|p| p.0).chain([max_mean]))
                .map(|r| r.end - r.start)
                .filter(|span| *span > f64::EPSILON)
                .unwrap_or(1.0)
        };
        let text_x = max_mean + style.annotation_offset * scale;

        let lines: Vec<ReferenceLine> = [
            ("Mean Difference", agreement.mean_diff, 0.0, style.mean_color),
            ("Mean + 1.96 SD", agreement.upper_limit, style.label_offset, style.limit_color),
            ("Mean - 1.96 SD", agreement.lower_limit, -style.label_offset, style.limit_color),
        ]
        .into_iter()
        .filter_map(|(label, value, shift, color)| {
            let value = value.to_f64().filter(|v| v.is_finite())?;
            Some(ReferenceLine {
                label,
                value,
                shift,
                color,
            })
        })
        .collect();

        let x = extent(points.iter().map(|p| p.0).chain([text_x])).ok_or(Error::NoCompletePairs)?;
        let y = extent(
            points
                .iter()
                .map(|p| p.1)
                .chain(lines.iter().map(|l| l.value + l.shift)),
        )
        .ok_or(Error::NoCompletePairs)?;

        // room right of the annotations for the label text
        let x = pad(x, 0.05, 0.15);
        let y = pad(y, 0.1, 0.1);
        log::trace!("bland-altman chart ranges x={x:?} y={y:?}");

        Ok(Self {
            points,
            lines,
            text_x,
            x,
            y,
        })
    }
}

/// Returns the range spanned by the finite values
fn extent(values: impl Iterator<Item = f64>) -> Option<Range<f64>> {
    let (min, max) = values
        .filter(|v| v.is_finite())
        .map(OrderedFloat)
        .fold(None, |acc, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })?;
    Some(min.0..max.0)
}

/// Widens a range by fractions of its span, a degenerate range by one unit
fn pad(range: Range<f64>, low: f64, high: f64) -> Range<f64> {
    let span = range.end - range.start;
    if span <= f64::EPSILON * range.end.abs().max(1.0) {
        return (range.start - 1.0)..(range.end + 1.0);
    }
    (range.start - low * span)..(range.end + high * span)
}

fn drawing<E: ToString>(err: E) -> Error {
    Error::Drawing(err.to_string())
}

/// Draws the Bland-Altman chart of the statistics and presents it on the drawing area
///
/// # Arguments
///
/// * `stats` - The accumulated measurement pairs
/// * `area` - The drawing area to draw on
/// * `style` - The chart appearance
///
/// # Returns
///
/// * `Result<Agreement<T>, Error>` - The agreement summary the chart was drawn
///   from, [`Error::NoCompletePairs`] if there is no point to draw,
///   [`Error::Drawing`] if the backend fails
pub fn draw<T, DB>(
    stats: &BlandAltman<T>,
    area: &DrawingArea<DB, Shift>,
    style: &PlotStyle,
) -> Result<Agreement<T>, Error>
where
    T: Default + Clone + Float,
    DB: DrawingBackend,
{
    let agreement = stats.agreement();
    render(stats, &agreement, area, style)?;
    Ok(agreement)
}

fn render<T, DB>(
    stats: &BlandAltman<T>,
    agreement: &Agreement<T>,
    area: &DrawingArea<DB, Shift>,
    style: &PlotStyle,
) -> Result<(), Error>
where
    T: Default + Clone + Float,
    DB: DrawingBackend,
{
    let layout = Layout::new(stats, agreement, style)?;

    area.fill(&WHITE).map_err(drawing)?;

    let mut builder = ChartBuilder::on(area);
    if let Some(caption) = &style.caption {
        builder.caption(caption, ("sans-serif", 20));
    }
    let mut chart = builder
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(layout.x.clone(), layout.y.clone())
        .map_err(drawing)?;

    chart
        .configure_mesh()
        .x_desc(style.x_desc.as_str())
        .y_desc(style.y_desc.as_str())
        .draw()
        .map_err(drawing)?;

    let point_style = style.point_color.filled();
    chart
        .draw_series(
            layout
                .points
                .iter()
                .map(|&p| Circle::new(p, style.point_radius, point_style)),
        )
        .map_err(drawing)?;

    for line in &layout.lines {
        let color = line.color;
        chart
            .draw_series(DashedLineSeries::new(
                vec![(layout.x.start, line.value), (layout.x.end, line.value)],
                6,
                4,
                color.stroke_width(1),
            ))
            .map_err(drawing)?
            .label(line.label)
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color));

        let text_style = ("sans-serif", style.font_size)
            .into_font()
            .color(&color)
            .pos(Pos::new(HPos::Left, VPos::Center));
        chart
            .draw_series(core::iter::once(Text::new(
                format!("{:.*}", style.precision, line.value),
                (layout.text_x, line.value + line.shift),
                text_style,
            )))
            .map_err(drawing)?;
    }

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()
        .map_err(drawing)?;

    area.present().map_err(drawing)
}

/// Renders the Bland-Altman chart of the statistics into an SVG document
///
/// # Arguments
///
/// * `stats` - The accumulated measurement pairs
/// * `style` - The chart appearance
/// * `size` - Width and height of the chart in pixels
///
/// # Returns
///
/// * `Result<String, Error>` - The SVG document
pub fn render_svg<T>(stats: &BlandAltman<T>, style: &PlotStyle, size: (u32, u32)) -> Result<String, Error>
where
    T: Default + Clone + Float,
{
    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, size).into_drawing_area();
        draw(stats, &root, style)?;
    }
    Ok(svg)
}

/// Computes the Bland-Altman statistics of two paired series and plots them
///
/// The scatter of pair means against differences is drawn with the default
/// [`PlotStyle`], annotated with the bias and limits of agreement, and
/// presented on `area`.
///
/// When no pair is complete there is nothing to draw: the area is left
/// untouched and the statistics come back as `NaN`.
///
/// # Arguments
///
/// * `data1` - The measurements of the first method
/// * `data2` - The measurements of the second method, paired by position
/// * `area` - The drawing area to present the chart on
///
/// # Returns
///
/// * `Result<Agreement<T>, Error>` - The agreement summary
///
/// # Examples
///
/// ```
/// use bland_altman::bland_altman_plot;
/// use assert_approx_eq::assert_approx_eq;
/// use plotters::prelude::*;
///
/// let mut svg = String::new();
/// let agreement = {
///     let root = SVGBackend::with_string(&mut svg, (640, 480)).into_drawing_area();
///     bland_altman_plot(&[10.0_f64, 12.0, 14.0], &[9.0, 13.0, 13.0], &root).unwrap()
/// };
///
/// assert_approx_eq!(agreement.upper_limit, 2.181239, 1e-6);
/// assert!(svg.contains("2.18"));
/// ```
pub fn bland_altman_plot<T, A, B, DB>(
    data1: &[A],
    data2: &[B],
    area: &DrawingArea<DB, Shift>,
) -> Result<Agreement<T>, Error>
where
    T: Default + Clone + Float,
    A: Measurement<Value = T>,
    B: Measurement<Value = T>,
    DB: DrawingBackend,
{
    let mut stats = BlandAltman::new();
    stats.extend_from_slices(data1, data2)?;

    let agreement = stats.agreement();
    match render(&stats, &agreement, area, &PlotStyle::default()) {
        Ok(()) | Err(Error::NoCompletePairs) => Ok(agreement),
        Err(err) => Err(err),
    }
}
