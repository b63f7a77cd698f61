use std::{env, fs, io};

use devlink::Link;
use devlink::fit::FitSession;
use fitter::{Assimilator, Point, RunConfig};
use log::info;

const DEFAULT_DEVICE: &str = "/dev/ttyACM0";
const DEFAULT_BAUD: u32 = 115200;

#[tokio::main]
async fn main() -> io::Result<()> {
    env_logger::init();

    let device = env::var("DEVICE").unwrap_or_else(|_| DEFAULT_DEVICE.to_string());
    let baud = match env::var("BAUD") {
        Ok(raw) => raw.parse().map_err(io::Error::other)?,
        Err(_) => DEFAULT_BAUD,
    };

    let config: RunConfig = match env::var("CONFIG") {
        Ok(path) => serde_json::from_str(&fs::read_to_string(path)?)?,
        Err(_) => RunConfig::default(),
    };

    let dataset_path =
        env::var("DATASET").map_err(|_| io::Error::other("DATASET env var is required"))?;
    let dataset = load_points(&dataset_path)?;
    info!(points = dataset.len(), device = device.as_str(); "loaded dataset");

    let assimilator = Assimilator::new(config.clone(), dataset).map_err(io::Error::from)?;

    let link = Link::open_serial(&device, baud).await.map_err(io::Error::from)?;
    let mut session = FitSession::new(link, config.shape(), config.genetic_params());

    let outcome = assimilator.run(&mut session).await.map_err(io::Error::from)?;
    session.close();

    println!("final equation: {}", equation(&outcome.coeffs));
    println!(
        "kept {} points, excluded {} anomalies in {} steps ({:?} on the wire)",
        outcome.active.len(),
        outcome.anomalies.len(),
        outcome.metrics.steps,
        outcome.metrics.exchange_time,
    );
    for point in &outcome.anomalies {
        println!("  anomaly at ({}, {})", point.x, point.y);
    }

    Ok(())
}

/// Parses `x,y` lines. Blank lines and an optional alphabetic header are
/// skipped.
fn load_points(path: &str) -> io::Result<Vec<Point>> {
    let mut points = Vec::new();

    for (lineno, line) in fs::read_to_string(path)?.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || (lineno == 0 && line.starts_with(|c: char| c.is_alphabetic())) {
            continue;
        }

        let Some((x, y)) = line.split_once(',') else {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("line {}: expected `x,y`", lineno + 1),
            ));
        };
        let parse = |raw: &str| {
            raw.trim().parse::<f64>().map_err(|e| {
                io::Error::new(io::ErrorKind::InvalidData, format!("line {}: {e}", lineno + 1))
            })
        };

        points.push(Point::new(parse(x)?, parse(y)?));
    }

    Ok(points)
}

fn equation(coeffs: &[f32]) -> String {
    coeffs
        .iter()
        .enumerate()
        .map(|(i, c)| match i {
            0 => format!("{c}"),
            1 => format!("{c}*x"),
            _ => format!("{c}*x^{i}"),
        })
        .collect::<Vec<_>>()
        .join(" + ")
}
