//! Automatic contrast curve built from an image histogram.
//!
//! The smoothed histogram is split into modes at its valleys. Each mode with
//! enough mass gets an S-shaped curve pinned at the mode's boundaries and
//! pivoting on its centroid, which spreads the tones inside the mode while
//! leaving the boundaries (and therefore the order between modes) fixed.
//! The result is blended with the identity by `strength`.

use super::smoothing::savitzky_golay;
use super::{LUT_SIZE, Lut1D};
use crate::config::AutoCurveConfig;
use crate::error::{Error, Result};

/// Slope of the per-mode S-curve at its pivot.
const S_CURVE_STEEPNESS: f64 = 2.0;

/// Pivot positions are kept away from the mode boundaries.
const PIVOT_MARGIN: f64 = 0.05;

/// Upper bound on the number of modes the histogram is split into.
const MAX_MODES: usize = 8;

#[derive(Debug, Clone, Copy)]
struct Mode {
    lo: usize,
    hi: usize,
    mass: f64,
}

/// Builds a monotone contrast curve from a 256-bin histogram.
///
/// `strength` in `[0, 1]` blends between the identity (0) and the full
/// per-mode S-curves (1). An empty histogram yields the identity.
pub fn build_auto_contrast_curve(
    histogram: &[u32],
    strength: f64,
    cfg: &AutoCurveConfig,
) -> Result<Lut1D> {
    if histogram.len() != LUT_SIZE {
        return Err(Error::conversion(format!(
            "histogram needs {LUT_SIZE} bins, got {}",
            histogram.len()
        )));
    }
    Error::check_range("contrast strength", strength, 0.0, 1.0)?;

    let total: f64 = histogram.iter().map(|&c| c as f64).sum();
    if total == 0.0 || strength == 0.0 {
        return Ok(Lut1D::identity());
    }

    let density: Vec<f64> = histogram.iter().map(|&c| c as f64 / total).collect();
    let smoothed = savitzky_golay(&density, cfg.window, cfg.order)?;
    let modes = split_modes(&density, &smoothed, cfg.min_mode_mass);
    tracing::debug!(
        "Auto contrast: {} mode(s), strength {strength:.2}",
        modes.len()
    );

    let mut curve: Vec<f64> = (0..LUT_SIZE).map(|i| i as f64).collect();
    for mode in &modes {
        if mode.mass < cfg.min_mode_mass || mode.hi - mode.lo < 2 {
            continue;
        }
        let span = (mode.hi - mode.lo) as f64;
        let weight: f64 = density[mode.lo..=mode.hi].iter().sum();
        let centroid = density[mode.lo..=mode.hi]
            .iter()
            .enumerate()
            .map(|(i, &p)| (mode.lo + i) as f64 * p)
            .sum::<f64>()
            / weight;
        let pivot = ((centroid - mode.lo as f64) / span).clamp(PIVOT_MARGIN, 1.0 - PIVOT_MARGIN);

        for x in mode.lo..=mode.hi {
            let t = (x - mode.lo) as f64 / span;
            let shaped = mode.lo as f64 + span * pivoted_s_curve(t, pivot);
            curve[x] = (1.0 - strength) * x as f64 + strength * shaped;
        }
    }

    Ok(Lut1D::from_samples(curve.into_iter()))
}

/// Splits `[0, 255]` at local minima of `smoothed`, then merges modes
/// lighter than `min_mass` into their lighter neighbor.
fn split_modes(density: &[f64], smoothed: &[f64], min_mass: f64) -> Vec<Mode> {
    let mut cuts: Vec<usize> = (1..LUT_SIZE - 1)
        .filter(|&i| smoothed[i] < smoothed[i - 1] && smoothed[i] <= smoothed[i + 1])
        .collect();
    cuts.insert(0, 0);
    cuts.push(LUT_SIZE - 1);

    let mass = |lo: usize, hi: usize| density[lo..=hi].iter().sum::<f64>();
    let mut modes: Vec<Mode> = cuts
        .windows(2)
        .map(|w| Mode {
            lo: w[0],
            hi: w[1],
            mass: mass(w[0], w[1]),
        })
        .collect();

    while modes.len() > 1 {
        let Some((idx, lightest)) = modes
            .iter()
            .copied()
            .enumerate()
            .min_by(|a, b| a.1.mass.total_cmp(&b.1.mass))
        else {
            break;
        };
        if lightest.mass >= min_mass && modes.len() <= MAX_MODES {
            break;
        }
        let neighbor = match (idx.checked_sub(1), modes.get(idx + 1)) {
            (Some(left), Some(right)) if modes[left].mass <= right.mass => left,
            (Some(_), Some(_)) => idx + 1,
            (Some(left), None) => left,
            (None, _) => idx + 1,
        };
        let (a, b) = (idx.min(neighbor), idx.max(neighbor));
        modes[a] = Mode {
            lo: modes[a].lo,
            hi: modes[b].hi,
            mass: mass(modes[a].lo, modes[b].hi),
        };
        modes.remove(b);
    }
    modes
}

/// Monotone S-curve on `[0, 1]` fixing 0, `pivot` and 1.
///
/// A power map sends `pivot` to 0.5, the symmetric logistic-like curve
/// `u^k / (u^k + (1 - u)^k)` steepens the middle, and the inverse power map
/// brings 0.5 back to `pivot`.
fn pivoted_s_curve(t: f64, pivot: f64) -> f64 {
    if t <= 0.0 {
        return 0.0;
    }
    if t >= 1.0 {
        return 1.0;
    }
    let g = 0.5f64.ln() / pivot.ln();
    let u = t.powf(g);
    let a = u.powf(S_CURVE_STEEPNESS);
    let b = (1.0 - u).powf(S_CURVE_STEEPNESS);
    (a / (a + b)).powf(1.0 / g)
}
