use erlang_loss::experiment::{run_sweep, MetricKind, SweepParameters, SweepResults};
use env_logger::Env;
use erlang_loss::report;
use log::info;
use plotters::prelude::*;
use std::path::Path;

/// Renders theoretical (blue) and empirical (red) curves of one metric
/// against the arrival rate.
fn plot_metric(
    results: &SweepResults,
    kind: MetricKind,
    max_arrival_rate: f64,
    output: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let (theoretical, empirical) = results.series(kind);

    let max_y = theoretical
        .iter()
        .chain(empirical.iter())
        .map(|p| p.1)
        .fold(f64::NAN, f64::max);
    let max_y = if max_y.is_finite() && max_y > 0.0 {
        (max_y * 1.1).ceil()
    } else {
        1.0
    };

    let root = BitMapBackend::new(output, (800, 600)).into_drawing_area();
    root.fill(&WHITE)?;
    let mut chart = ChartBuilder::on(&root)
        .caption(kind.title(), ("sans-serif", 24).into_font())
        .margin(20)
        .set_all_label_area_size(60)
        .build_cartesian_2d(0f64..max_arrival_rate.ceil(), 0f64..max_y)?;

    chart
        .configure_mesh()
        .x_desc("Arrival rate (λ)")
        .y_desc(kind.label())
        .label_style(("sans-serif", 14, &BLACK))
        .draw()?;

    chart
        .draw_series(LineSeries::new(theoretical, BLUE.stroke_width(2)))?
        .label("Theoretical")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], BLUE.stroke_width(2)));
    chart
        .draw_series(LineSeries::new(empirical, RED.stroke_width(2)))?
        .label("Empirical")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], RED.stroke_width(2)));

    chart
        .configure_series_labels()
        .background_style(&WHITE.mix(0.8))
        .border_style(&BLACK)
        .label_font(("sans-serif", 14))
        .draw()?;

    root.present()?;
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let parameters = SweepParameters::default();
    let results_path = Path::new("results.txt");

    let results = run_sweep(&parameters, |outcome| {
        info!("{}", report::summarize_outcome(outcome, parameters.service_rate));
    })?;
    report::append_outcomes(results_path, parameters.service_rate, &results.outcomes)?;

    let result_dir = Path::new("result");
    std::fs::create_dir_all(result_dir)?;
    for kind in MetricKind::ALL {
        plot_metric(
            &results,
            kind,
            parameters.max_arrival_rate,
            &result_dir.join(kind.file_name()),
        )?;
    }

    info!("Charts saved to {}", result_dir.display());
    Ok(())
}
