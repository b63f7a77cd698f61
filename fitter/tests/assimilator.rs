//! End-to-end runs against a scripted device on the far end of an in-memory
//! duplex channel. The mock device answers every fit request with a real
//! polynomial least-squares fit, so the loop sees the same kind of answers
//! the board would produce.

use devlink::fit::{FitSession, SessionShape, predict};
use devlink::{Link, LinkError, recv_array, recv_scalar, send_array, send_scalar};
use fitter::{Assimilator, FitterErr, Point, RunConfig, ShapeConfig};
use tokio::io::{self, DuplexStream};
use tokio::task::JoinHandle;

/// Least-squares polynomial fit via the normal equations, solved with
/// Gaussian elimination with partial pivoting.
fn least_squares(xs: &[f32], ys: &[f32], degree: usize) -> Vec<f64> {
    let n = degree + 1;
    let mut ata = vec![vec![0.0f64; n]; n];
    let mut aty = vec![0.0f64; n];

    for (&x, &y) in xs.iter().zip(ys) {
        let (x, y) = (f64::from(x), f64::from(y));
        let mut powers = vec![1.0f64; 2 * n - 1];
        for i in 1..powers.len() {
            powers[i] = powers[i - 1] * x;
        }
        for i in 0..n {
            for j in 0..n {
                ata[i][j] += powers[i + j];
            }
            aty[i] += powers[i] * y;
        }
    }

    for col in 0..n {
        let pivot = (col..n)
            .max_by(|&a, &b| ata[a][col].abs().total_cmp(&ata[b][col].abs()))
            .unwrap();
        ata.swap(col, pivot);
        aty.swap(col, pivot);

        for row in col + 1..n {
            let factor = ata[row][col] / ata[col][col];
            for k in col..n {
                ata[row][k] -= factor * ata[col][k];
            }
            aty[row] -= factor * aty[col];
        }
    }

    let mut coeffs = vec![0.0f64; n];
    for row in (0..n).rev() {
        let tail: f64 = (row + 1..n).map(|k| ata[row][k] * coeffs[k]).sum();
        coeffs[row] = (aty[row] - tail) / ata[row][row];
    }
    coeffs
}

fn is_hangup(err: &LinkError) -> bool {
    matches!(err, LinkError::Io(e) if e.kind() == io::ErrorKind::UnexpectedEof)
}

/// Serves genetic-shape requests until the host hangs up. Coefficients go
/// back as normalized alleles, the way the firmware reports them.
async fn serve_genetic(mut link: Link<DuplexStream>) -> devlink::Result<()> {
    loop {
        let _epsilon: f32 = match recv_scalar(&mut link).await {
            Ok(value) => value,
            Err(e) if is_hangup(&e) => return Ok(()),
            Err(e) => return Err(e),
        };
        let _mutation_rate: f32 = recv_scalar(&mut link).await?;
        let _population: u16 = recv_scalar(&mut link).await?;
        let _tourney: u16 = recv_scalar(&mut link).await?;
        let _max_iterations: u16 = recv_scalar(&mut link).await?;
        let degree: u16 = recv_scalar(&mut link).await?;
        let _elite: u16 = recv_scalar(&mut link).await?;
        let count: u16 = recv_scalar(&mut link).await?;
        let xs: Vec<f32> = recv_array(&mut link, count as usize).await?;
        let ys: Vec<f32> = recv_array(&mut link, count as usize).await?;
        let limits: Vec<f32> = recv_array(&mut link, degree as usize + 1).await?;

        let coeffs = least_squares(&xs, &ys, degree as usize);
        let alleles: Vec<f32> = coeffs
            .iter()
            .zip(&limits)
            .map(|(c, limit)| (c / (2.0 * f64::from(*limit)) + 0.5) as f32)
            .collect();

        send_scalar(&mut link, 0.0f32).await?;
        send_array(&mut link, &alleles).await?;
    }
}

/// Serves direct-shape requests: raw coefficients, no fitness.
async fn serve_direct(mut link: Link<DuplexStream>) -> devlink::Result<()> {
    loop {
        let count: i32 = match recv_scalar(&mut link).await {
            Ok(value) => value,
            Err(e) if is_hangup(&e) => return Ok(()),
            Err(e) => return Err(e),
        };
        let xs: Vec<f32> = recv_array(&mut link, count as usize).await?;
        let ys: Vec<f32> = recv_array(&mut link, count as usize).await?;
        let degree: i32 = recv_scalar(&mut link).await?;

        let coeffs: Vec<f32> = least_squares(&xs, &ys, degree as usize)
            .iter()
            .map(|c| *c as f32)
            .collect();
        send_array(&mut link, &coeffs).await?;
    }
}

fn spawn_device(
    shape: SessionShape,
) -> (Link<DuplexStream>, JoinHandle<devlink::Result<()>>) {
    let (host, device) = io::duplex(4096);
    let device_link = Link::new(device);
    let handle = tokio::spawn(async move {
        match shape {
            SessionShape::Genetic => serve_genetic(device_link).await,
            SessionShape::Direct => serve_direct(device_link).await,
        }
    });
    (Link::new(host), handle)
}

fn quadratic_dataset() -> Vec<Point> {
    vec![
        Point::new(0.0, 0.0),
        Point::new(1.0, 1.0),
        Point::new(2.0, 4.0),
        Point::new(3.0, 9.0),
        Point::new(4.0, 100.0),
    ]
}

#[tokio::test]
async fn far_off_point_lands_in_the_anomaly_set() {
    let config = RunConfig::default(); // degree 2, seed 3, cutoff 10
    let dataset = quadratic_dataset();

    let (link, device) = spawn_device(SessionShape::Genetic);
    let mut session = FitSession::new(link, config.shape(), config.genetic_params());

    let assimilator = Assimilator::new(config, dataset.clone()).unwrap();
    let outcome = assimilator.run(&mut session).await.unwrap();
    drop(session);
    device.await.unwrap().unwrap();

    assert_eq!(outcome.anomalies, vec![Point::new(4.0, 100.0)]);
    assert_eq!(outcome.active.len(), 4);
    assert_eq!(outcome.active, dataset[..4]);

    // Partition invariant: every original point is active or anomalous.
    assert_eq!(outcome.active.len() + outcome.anomalies.len(), dataset.len());

    // One decision per point past the seed window.
    assert_eq!(outcome.metrics.steps, 2);
    assert_eq!(outcome.metrics.accepted, 1);
    assert_eq!(outcome.metrics.excluded, 1);
    // Loop exchanges plus the final refit.
    assert_eq!(outcome.metrics.exchanges, 3);

    // The cleaned fit is y = x^2; the outlier would have been at ~16.
    let at_four = predict(&outcome.coeffs, 4.0);
    assert!((at_four - 16.0).abs() < 0.1, "predicted {at_four}");
}

#[tokio::test]
async fn generous_cutoff_excludes_nothing() {
    let config = RunConfig {
        cutoff: 1000.0,
        ..Default::default()
    };
    let dataset = quadratic_dataset();

    let (link, device) = spawn_device(SessionShape::Genetic);
    let mut session = FitSession::new(link, config.shape(), config.genetic_params());

    let assimilator = Assimilator::new(config, dataset.clone()).unwrap();
    let outcome = assimilator.run(&mut session).await.unwrap();
    drop(session);
    device.await.unwrap().unwrap();

    assert!(outcome.anomalies.is_empty());
    assert_eq!(outcome.active, dataset);
    assert_eq!(outcome.metrics.steps, 2);
    assert_eq!(outcome.metrics.accepted, 2);
}

#[tokio::test]
async fn direct_shape_runs_the_same_loop_on_raw_coefficients() {
    let config = RunConfig {
        shape: ShapeConfig::Direct,
        degree: 1,
        limits: vec![8.0, 8.0],
        seed_window: 2,
        cutoff: 5.0,
        ..Default::default()
    };
    let dataset = vec![
        Point::new(0.0, 1.0),
        Point::new(1.0, 2.0),
        Point::new(2.0, 3.0),
        Point::new(3.0, 4.0),
        Point::new(4.0, 50.0),
    ];

    let (link, device) = spawn_device(SessionShape::Direct);
    let mut session = FitSession::new(link, config.shape(), config.genetic_params());

    let assimilator = Assimilator::new(config, dataset.clone()).unwrap();
    let outcome = assimilator.run(&mut session).await.unwrap();
    drop(session);
    device.await.unwrap().unwrap();

    assert_eq!(outcome.anomalies, vec![Point::new(4.0, 50.0)]);
    assert_eq!(outcome.active.len(), 4);
    assert_eq!(outcome.fitness, None);

    // y = x + 1 over the cleaned set.
    let at_four = predict(&outcome.coeffs, 4.0);
    assert!((at_four - 5.0).abs() < 0.01, "predicted {at_four}");
}

#[tokio::test]
async fn bad_seed_window_never_reaches_the_device() {
    let config = RunConfig {
        seed_window: 10,
        ..Default::default()
    };

    let err = Assimilator::new(config, quadratic_dataset())
        .err()
        .expect("oversized seed window must be rejected");
    match err {
        FitterErr::InvalidConfig(msg) => assert!(msg.contains("seed window")),
        other => panic!("expected invalid config, got {other:?}"),
    }

    let err = Assimilator::new(RunConfig::default(), Vec::new())
        .err()
        .expect("empty dataset must be rejected");
    match err {
        FitterErr::EmptyDataset => {}
        other => panic!("expected empty dataset error, got {other:?}"),
    }
}
