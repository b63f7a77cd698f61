//! The incremental robust assimilation loop.

use std::time::Instant;

use devlink::fit::{self, FitResult, FitSession};
use log::{debug, info};
use tokio::io::{AsyncRead, AsyncWrite};

use crate::{
    AnomalySet, FitterErr, Point, Result, RunConfig, RunMetrics, WorkingSet,
    residual::{self, Decision},
};

/// Everything a run produces for its consumer (printing, plotting, ...).
#[derive(Debug)]
pub struct FitOutcome {
    /// Coefficients of the final fit, in real units, constant term first.
    pub coeffs: Vec<f32>,
    /// Fitness of the final fit; absent under the direct shape.
    pub fitness: Option<f32>,
    /// Points that survived the residual test.
    pub active: Vec<Point>,
    /// Points excluded as anomalies, in exclusion order.
    pub anomalies: Vec<Point>,
    pub metrics: RunMetrics,
}

/// Drives the working set forward against the device as a fitting oracle.
///
/// Per step: fit the trusted prefix remotely, predict the next point from
/// the returned coefficients, then either trust it (cursor advances) or
/// exclude it (backing shrinks, cursor stays). Both transitions shrink the
/// number of unvisited points by one, so the loop always terminates.
pub struct Assimilator {
    config: RunConfig,
    working: WorkingSet,
    anomalies: AnomalySet,
    metrics: RunMetrics,
}

impl Assimilator {
    /// Validates the configuration against the dataset and seeds the trusted
    /// prefix. Nothing here touches the device.
    ///
    /// # Errors
    /// `FitterErr::EmptyDataset` for an empty dataset and
    /// `FitterErr::InvalidConfig` for constraint violations, including a
    /// seed window larger than the dataset.
    pub fn new(config: RunConfig, dataset: Vec<Point>) -> Result<Self> {
        config.validate()?;

        if dataset.is_empty() {
            return Err(FitterErr::EmptyDataset);
        }
        if dataset.len() < config.seed_window {
            return Err(FitterErr::InvalidConfig(format!(
                "seed window {} exceeds the dataset size {}",
                config.seed_window,
                dataset.len()
            )));
        }

        let seed = config.seed_window;
        Ok(Self {
            working: WorkingSet::new(dataset, seed),
            anomalies: AnomalySet::default(),
            metrics: RunMetrics::default(),
            config,
        })
    }

    /// Runs the loop to completion, then refits once over the cleaned set so
    /// the returned coefficients describe exactly the surviving points.
    ///
    /// The session is borrowed exclusively for the whole run; there is never
    /// more than one outstanding exchange.
    ///
    /// # Errors
    /// Any `LinkError` ends the run; the wire format cannot resynchronize,
    /// so continuing after a fault would read garbage.
    pub async fn run<P>(mut self, session: &mut FitSession<P>) -> Result<FitOutcome>
    where
        P: AsyncRead + AsyncWrite + Unpin,
    {
        session
            .link_mut()
            .set_read_deadline(self.config.read_deadline());

        // Request buffers reused across steps; points are narrowed to f32
        // only here, at the protocol boundary.
        let mut xs: Vec<f32> = Vec::with_capacity(self.working.len());
        let mut ys: Vec<f32> = Vec::with_capacity(self.working.len());

        while let Some(probe) = self.working.probe() {
            fill_request(&mut xs, &mut ys, self.working.trusted());
            let result = self.timed_exchange(session, &xs, &ys).await?;
            let predicted = fit::predict(&result.coeffs, probe.x);

            match residual::classify(predicted, probe.y, self.config.cutoff) {
                Decision::Accept => {
                    self.working.accept();
                    self.metrics.bump_accepted();
                    debug!(cursor = self.working.cursor(), x = probe.x, y = probe.y, predicted = predicted; "trusted point");
                }
                Decision::Exclude => {
                    let point = self.working.exclude();
                    self.anomalies.push(point);
                    self.metrics.bump_excluded();
                    info!(x = point.x, y = point.y, predicted = predicted; "excluded anomaly");
                }
            }
        }

        fill_request(&mut xs, &mut ys, self.working.trusted());
        let last = self.timed_exchange(session, &xs, &ys).await?;

        info!(
            active = self.working.len(),
            anomalies = self.anomalies.len(),
            steps = self.metrics.steps;
            "assimilation done"
        );

        Ok(FitOutcome {
            coeffs: last.coeffs,
            fitness: last.fitness,
            active: self.working.into_points(),
            anomalies: self.anomalies.into_points(),
            metrics: self.metrics,
        })
    }

    async fn timed_exchange<P>(
        &mut self,
        session: &mut FitSession<P>,
        xs: &[f32],
        ys: &[f32],
    ) -> Result<FitResult>
    where
        P: AsyncRead + AsyncWrite + Unpin,
    {
        let started = Instant::now();
        let result = session.exchange(xs, ys).await?;
        self.metrics.add_exchange(started.elapsed());
        Ok(result)
    }
}

fn fill_request(xs: &mut Vec<f32>, ys: &mut Vec<f32>, trusted: &[Point]) {
    xs.clear();
    ys.clear();
    xs.extend(trusted.iter().map(|p| p.x as f32));
    ys.extend(trusted.iter().map(|p| p.y as f32));
}
