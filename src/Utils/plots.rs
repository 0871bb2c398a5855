use crate::potential::evaluator::FieldValues;
use plotters::prelude::*;
use std::error::Error;
use std::path::Path;

/// viridis anchors at t = 0, 0.25, 0.5, 0.75, 1
const VIRIDIS: [(f64, f64, f64); 5] = [
    (0.267004, 0.004874, 0.329415),
    (0.229739, 0.322361, 0.545706),
    (0.127568, 0.566949, 0.550556),
    (0.369214, 0.788888, 0.382914),
    (0.993248, 0.906157, 0.143936),
];

/// Piecewise-linear viridis colour for `t` in [0, 1].
pub fn viridis(t: f64) -> RGBColor {
    let t = if t.is_finite() { t.clamp(0.0, 1.0) } else { 0.0 };
    let scaled = t * (VIRIDIS.len() - 1) as f64;
    let lower = (scaled.floor() as usize).min(VIRIDIS.len() - 2);
    let frac = scaled - lower as f64;
    let (r0, g0, b0) = VIRIDIS[lower];
    let (r1, g1, b1) = VIRIDIS[lower + 1];
    let channel = |a: f64, b: f64| ((a + (b - a) * frac) * 255.0).round() as u8;
    RGBColor(channel(r0, r1), channel(g0, g1), channel(b0, b1))
}

/// Heat map of the sampled potential, one filled cell per sample.
pub fn plot_heatmap(field: &FieldValues, title: &str, filename: &Path) -> Result<(), Box<dyn Error>> {
    let (x_axis, y_axis) = (field.x_axis(), field.y_axis());
    let (Some(&x_min), Some(&x_max), Some(&y_min), Some(&y_max)) =
        (x_axis.first(), x_axis.last(), y_axis.first(), y_axis.last())
    else {
        return Err("empty field".into());
    };
    let (u_min, u_max) = (field.min(), field.max());
    let span = if u_max > u_min { u_max - u_min } else { 1.0 };
    let dx = (x_max - x_min) / (x_axis.len().max(2) - 1) as f64;
    let dy = (y_max - y_min) / (y_axis.len().max(2) - 1) as f64;

    let root_area = BitMapBackend::new(filename, (800, 800)).into_drawing_area();
    root_area.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root_area)
        .caption(title, ("sans-serif", 30))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(40)
        .build_cartesian_2d(
            (x_min - dx / 2.0)..(x_max + dx / 2.0),
            (y_min - dy / 2.0)..(y_max + dy / 2.0),
        )?;

    chart
        .configure_mesh()
        .disable_mesh()
        .x_desc("x")
        .y_desc("y")
        .draw()?;

    chart.draw_series(field.values().indexed_iter().map(|((i, j), &u)| {
        let (x, y) = (x_axis[j], y_axis[i]);
        Rectangle::new(
            [
                (x - dx / 2.0, y - dy / 2.0),
                (x + dx / 2.0, y + dy / 2.0),
            ],
            viridis((u - u_min) / span).filled(),
        )
    }))?;

    root_area.present()?;
    Ok(())
}
