//! Seeded synthetic data for trying the models out.

use mf_common::{Error, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;

/// One Gaussian source: relative weight, mean and precision.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Source {
    pub weight: f64,
    pub mean: f64,
    pub precision: f64,
}

impl Source {
    pub fn new(weight: f64, mean: f64, precision: f64) -> Result<Self> {
        if !weight.is_finite() || weight <= 0.0 {
            return Err(Error::Config(format!("source weight must be positive, got {}", weight)));
        }
        if !mean.is_finite() {
            return Err(Error::Config(format!("source mean must be finite, got {}", mean)));
        }
        if !precision.is_finite() || precision <= 0.0 {
            return Err(Error::Config(format!(
                "source precision must be positive, got {}",
                precision
            )));
        }
        Ok(Source {
            weight,
            mean,
            precision,
        })
    }
}

/// Parse `"w:m:t,w:m:t,..."` into sources.
pub fn parse_sources(text: &str) -> Result<Vec<Source>> {
    let mut sources = Vec::new();
    for part in text.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let fields: Vec<&str> = part.split(':').map(str::trim).collect();
        let [w, m, t] = fields.as_slice() else {
            return Err(Error::Config(format!(
                "source '{}' is not weight:mean:precision",
                part
            )));
        };
        let num = |s: &str| {
            s.parse::<f64>()
                .map_err(|_| Error::Config(format!("'{}' in source '{}' is not a number", s, part)))
        };
        sources.push(Source::new(num(*w)?, num(*m)?, num(*t)?)?);
    }
    if sources.is_empty() {
        return Err(Error::Config("no sources given".to_string()));
    }
    Ok(sources)
}

/// Draw `n` points. Each point picks a source with probability
/// proportional to its weight, then samples from it.
///
/// Returns the values and the index of the source behind each one.
pub fn generate(sources: &[Source], n: usize, seed: u64) -> Result<(Vec<f64>, Vec<usize>)> {
    if sources.is_empty() {
        return Err(Error::Config("no sources given".to_string()));
    }
    let total: f64 = sources.iter().map(|s| s.weight).sum();
    let mut rng = StdRng::seed_from_u64(seed);
    let mut values = Vec::with_capacity(n);
    let mut labels = Vec::with_capacity(n);
    for _ in 0..n {
        let pick = rng.random::<f64>() * total;
        let mut acc = 0.0;
        let mut index = sources.len() - 1;
        for (j, s) in sources.iter().enumerate() {
            acc += s.weight;
            if pick < acc {
                index = j;
                break;
            }
        }
        let source = &sources[index];
        values.push(source.mean + standard_normal(&mut rng) / source.precision.sqrt());
        labels.push(index);
    }
    Ok((values, labels))
}

/// Box-Muller draw from N(0, 1).
fn standard_normal<R: Rng>(rng: &mut R) -> f64 {
    // u1 in (0, 1] keeps the log finite
    let u1: f64 = 1.0 - rng.random::<f64>();
    let u2: f64 = rng.random::<f64>();
    (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
}
