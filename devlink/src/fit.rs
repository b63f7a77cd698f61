//! The fit request/response exchange.
//!
//! Two wire shapes exist. The genetic shape sends the full hyperparameter
//! block and gets back a fitness value plus normalized alleles; the direct
//! shape sends only the points and the degree and gets back raw coefficients.
//! A session speaks exactly one shape for its whole lifetime.

use std::io;

use tokio::io::{AsyncRead, AsyncWrite};

use crate::{Link, LinkError, Result, codec};

/// Genetic-search hyperparameters. Constant across a run; the device keeps no
/// session memory, so the full block is re-sent with every request.
#[derive(Debug, Clone)]
pub struct GeneticParams {
    pub epsilon: f32,
    pub mutation_rate: f32,
    pub population_size: u16,
    pub tourney_size: u16,
    pub max_iterations: u16,
    pub degree: u16,
    pub elite_count: u16,
    /// Absolute limit of each coefficient; length is `degree + 1`.
    pub limits: Vec<f32>,
}

/// Which request/response shape the device speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionShape {
    /// Full hyperparameter block; the response carries a fitness value and
    /// alleles normalized into `[0, 1]`.
    Genetic,
    /// Count, points and degree only; the response carries raw coefficients
    /// and no fitness.
    Direct,
}

/// One decoded fit response.
///
/// Coefficients are always in real units: the genetic normalization is
/// undone here, at decode time, so nothing above this module ever sees a raw
/// allele and prediction is shape-independent.
#[derive(Debug, Clone)]
pub struct FitResult {
    pub fitness: Option<f32>,
    pub coeffs: Vec<f32>,
}

/// Undoes the genetic normalization of one allele.
pub fn denorm(allele: f32, limit: f32) -> f32 {
    (allele - 0.5) * 2.0 * limit
}

/// Evaluates the fitted polynomial at `x`.
pub fn predict(coeffs: &[f32], x: f64) -> f64 {
    coeffs
        .iter()
        .enumerate()
        .map(|(i, c)| f64::from(*c) * x.powi(i as i32))
        .sum()
}

/// Owns the link for one fitting session and speaks one wire shape over it.
pub struct FitSession<P>
where
    P: AsyncRead + AsyncWrite + Unpin,
{
    link: Link<P>,
    shape: SessionShape,
    params: GeneticParams,
}

impl<P: AsyncRead + AsyncWrite + Unpin> FitSession<P> {
    /// Creates a session over `link`. The shape and hyperparameters are fixed
    /// for the session's lifetime.
    pub fn new(link: Link<P>, shape: SessionShape, params: GeneticParams) -> Self {
        debug_assert_eq!(params.limits.len(), params.degree as usize + 1);
        Self {
            link,
            shape,
            params,
        }
    }

    pub fn shape(&self) -> SessionShape {
        self.shape
    }

    pub fn params(&self) -> &GeneticParams {
        &self.params
    }

    /// Access to the underlying link, e.g. to configure the read deadline.
    pub fn link_mut(&mut self) -> &mut Link<P> {
        &mut self.link
    }

    /// Closes the underlying link. Idempotent.
    pub fn close(&mut self) {
        self.link.close();
    }

    /// Runs one full request/response exchange for the points `(xs, ys)`.
    ///
    /// # Errors
    /// `LinkError::Protocol` if the point count does not fit the shape's
    /// count field or the response ends short; `LinkError::Io` /
    /// `LinkError::Timeout` on channel faults.
    pub async fn exchange(&mut self, xs: &[f32], ys: &[f32]) -> Result<FitResult> {
        if xs.len() != ys.len() {
            return Err(LinkError::Protocol(format!(
                "x/y length mismatch: {} vs {}",
                xs.len(),
                ys.len()
            )));
        }

        match self.shape {
            SessionShape::Genetic => self.exchange_genetic(xs, ys).await,
            SessionShape::Direct => self.exchange_direct(xs, ys).await,
        }
    }

    async fn exchange_genetic(&mut self, xs: &[f32], ys: &[f32]) -> Result<FitResult> {
        let Self { link, params, .. } = self;
        let count = u16::try_from(xs.len()).map_err(|_| count_overflow(xs.len(), "u16"))?;

        codec::send_scalar(link, params.epsilon).await?;
        codec::send_scalar(link, params.mutation_rate).await?;
        codec::send_scalar(link, params.population_size).await?;
        codec::send_scalar(link, params.tourney_size).await?;
        codec::send_scalar(link, params.max_iterations).await?;
        codec::send_scalar(link, params.degree).await?;
        codec::send_scalar(link, params.elite_count).await?;
        codec::send_scalar(link, count).await?;
        codec::send_array(link, xs).await?;
        codec::send_array(link, ys).await?;
        codec::send_array(link, &params.limits).await?;

        let fitness: f32 = codec::recv_scalar(link)
            .await
            .map_err(short_response("fitness"))?;
        let alleles: Vec<f32> = codec::recv_array(link, params.degree as usize + 1)
            .await
            .map_err(short_response("coefficients"))?;

        let coeffs = alleles
            .iter()
            .zip(&params.limits)
            .map(|(allele, limit)| denorm(*allele, *limit))
            .collect();

        Ok(FitResult {
            fitness: Some(fitness),
            coeffs,
        })
    }

    async fn exchange_direct(&mut self, xs: &[f32], ys: &[f32]) -> Result<FitResult> {
        let Self { link, params, .. } = self;
        let count = i32::try_from(xs.len()).map_err(|_| count_overflow(xs.len(), "i32"))?;

        codec::send_scalar(link, count).await?;
        codec::send_array(link, xs).await?;
        codec::send_array(link, ys).await?;
        codec::send_scalar(link, i32::from(params.degree)).await?;

        let coeffs = codec::recv_array(link, params.degree as usize + 1)
            .await
            .map_err(short_response("coefficients"))?;

        Ok(FitResult {
            fitness: None,
            coeffs,
        })
    }
}

fn count_overflow(len: usize, field: &str) -> LinkError {
    LinkError::Protocol(format!("{len} points do not fit the {field} count field"))
}

/// A short read inside a response is a shape violation, not a plain I/O
/// fault: the device announced fewer bytes than the protocol requires.
fn short_response(field: &'static str) -> impl FnOnce(LinkError) -> LinkError {
    move |e| match e {
        LinkError::Io(io) if io.kind() == io::ErrorKind::UnexpectedEof => {
            LinkError::Protocol(format!("response ended while reading {field}"))
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::{denorm, predict};

    #[test]
    fn denorm_maps_the_unit_interval_onto_the_limit_range() {
        assert_eq!(denorm(0.5, 8.0), 0.0);
        assert_eq!(denorm(1.0, 8.0), 8.0);
        assert_eq!(denorm(0.0, 8.0), -8.0);
    }

    #[test]
    fn predict_sums_powers_in_coefficient_order() {
        // 1 + 2x + 3x^2 at x = 2.
        assert_eq!(predict(&[1.0, 2.0, 3.0], 2.0), 17.0);
        assert_eq!(predict(&[], 5.0), 0.0);
    }
}
