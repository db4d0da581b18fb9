//! Analytic collision probability model.
//!
//! For two vectors at `L_p` distance `c`, a single projection puts them in the
//! same bucket with probability
//!
//! ```text
//! p(c) = 2 * integral_0^r f(t / c) * (1 - t / r) / c dt
//! ```
//!
//! where `f` is the density of the metric's p-stable distribution (standard
//! Cauchy for L1, standard Gaussian for L2). The factor 2 folds the density of
//! `|X|` into the density of `X`. The integral is evaluated with adaptive
//! Simpson quadrature under a fixed depth and evaluation budget.

use std::f64::consts::PI;

use crate::config::{HasherConfig, IntegrationConfig, Metric, PStableError};

/// Largest bracket expansion tried when inverting the model.
const MAX_BRACKET_STEPS: usize = 64;
/// Bisection steps used when inverting the model.
const MAX_BISECTION_STEPS: usize = 200;
/// Levels of bisection applied before a segment may be accepted.
const MIN_DEPTH: u32 = 4;

impl Metric {
    /// Density of the metric's p-stable distribution at `x`.
    pub fn density(self, x: f64) -> f64 {
        match self {
            Metric::L1 => 1.0 / (PI * (1.0 + x * x)),
            Metric::L2 => (-x * x / 2.0).exp() / (2.0 * PI).sqrt(),
        }
    }
}

/// Theoretical collision probability of one projection at distance `distance`
/// for the metric and bucket width of `config`, using the default
/// [`IntegrationConfig`].
pub fn collision_probability(config: &HasherConfig, distance: f64) -> Result<f64, PStableError> {
    CollisionModel::from_config(config)?.probability(distance)
}

/// Like [`collision_probability`] with an explicit integration budget.
pub fn collision_probability_with(
    config: &HasherConfig,
    distance: f64,
    integration: &IntegrationConfig,
) -> Result<f64, PStableError> {
    CollisionModel::from_config(config)?
        .with_integration(integration.clone())?
        .probability(distance)
}

/// Collision probability curve for a fixed metric and bucket width.
///
/// The model holds no hasher state; it is a pure function of
/// `(metric, r, distance)`.
#[derive(Debug, Clone, PartialEq)]
pub struct CollisionModel {
    metric: Metric,
    r: f64,
    integration: IntegrationConfig,
}

impl CollisionModel {
    pub fn new(metric: Metric, r: f64) -> Result<Self, PStableError> {
        if !(r.is_finite() && r > 0.0) {
            return Err(PStableError::InvalidBucketWidth { r });
        }
        Ok(Self {
            metric,
            r,
            integration: IntegrationConfig::default(),
        })
    }

    /// Model for the metric and bucket width of a hasher config.
    pub fn from_config(config: &HasherConfig) -> Result<Self, PStableError> {
        Self::new(config.metric()?, config.r)
    }

    /// Replace the integration budget.
    pub fn with_integration(mut self, integration: IntegrationConfig) -> Result<Self, PStableError> {
        integration.validate()?;
        self.integration = integration;
        Ok(self)
    }

    pub fn metric(&self) -> Metric {
        self.metric
    }

    pub fn r(&self) -> f64 {
        self.r
    }

    pub fn integration(&self) -> &IntegrationConfig {
        &self.integration
    }

    /// Collision probability at distance `distance`, clamped into `[0, 1]`.
    ///
    /// `distance` must be positive and finite; the limit at 0 is 1 and callers
    /// handle it themselves.
    pub fn probability(&self, distance: f64) -> Result<f64, PStableError> {
        if !(distance.is_finite() && distance > 0.0) {
            return Err(PStableError::InvalidDistance { distance });
        }
        let (metric, r, c) = (self.metric, self.r, distance);
        let integrand = |t: f64| metric.density(t / c) * (1.0 - t / r) / c;

        let value = adaptive_simpson(integrand, 0.0, r, &self.integration).map_err(
            |evaluations| PStableError::IntegrationFailed {
                distance,
                evaluations,
            },
        )?;
        Ok((2.0 * value).clamp(0.0, 1.0))
    }

    /// Probabilities for each of `distances`, in order.
    pub fn curve(&self, distances: &[f64]) -> Result<Vec<f64>, PStableError> {
        distances.iter().map(|&c| self.probability(c)).collect()
    }

    /// Distance at which the model's collision probability equals `similarity`.
    ///
    /// A similarity of 1 or more maps to 0 and a similarity of 0 or less maps
    /// to infinity. In between, the distance is bracketed by doubling and
    /// halving from `r`, then located by bisection.
    pub fn distance_for_similarity(&self, similarity: f64) -> Result<f64, PStableError> {
        if similarity.is_nan() {
            return Err(PStableError::InvalidSimilarity { similarity });
        }
        if similarity >= 1.0 {
            return Ok(0.0);
        }
        if similarity <= 0.0 {
            return Ok(f64::INFINITY);
        }

        let mut lo = self.r;
        let mut hi = self.r;
        let mut steps = 0;
        while self.probability(hi)? > similarity {
            hi *= 2.0;
            steps += 1;
            if steps > MAX_BRACKET_STEPS {
                return Err(PStableError::InversionFailed { similarity });
            }
        }
        steps = 0;
        while self.probability(lo)? < similarity {
            lo /= 2.0;
            steps += 1;
            if steps > MAX_BRACKET_STEPS {
                return Err(PStableError::InversionFailed { similarity });
            }
        }

        // p is decreasing: p(lo) >= similarity >= p(hi).
        for _ in 0..MAX_BISECTION_STEPS {
            let mid = 0.5 * (lo + hi);
            if mid <= lo || mid >= hi {
                break;
            }
            if self.probability(mid)? > similarity {
                lo = mid;
            } else {
                hi = mid;
            }
            if hi - lo <= 1e-12 * hi {
                break;
            }
        }
        Ok(0.5 * (lo + hi))
    }
}

/// Simpson's rule over `[a, b]` with midpoint value `fm`.
#[inline]
fn simpson(a: f64, b: f64, fa: f64, fm: f64, fb: f64) -> f64 {
    (b - a) / 6.0 * (fa + 4.0 * fm + fb)
}

struct Segment {
    a: f64,
    b: f64,
    fa: f64,
    fm: f64,
    fb: f64,
    whole: f64,
    tolerance: f64,
    depth: u32,
}

/// Adaptive Simpson quadrature of `f` over `[a, b]`.
///
/// A segment is accepted when its two halves agree with the whole to within
/// `15 * tolerance` (Richardson-corrected); otherwise it is bisected and each
/// half gets half the tolerance. No segment shallower than [`MIN_DEPTH`] (or
/// `max_depth`, if lower) is accepted, since coarse Simpson estimates of a
/// peaked integrand can agree by accident. The acceptance threshold never
/// drops below the rounding error of the segment's own value.
///
/// Returns the number of evaluations spent as the error when a segment still
/// fails at `max_depth`, the evaluation budget runs out, or the integrand
/// produces a non-finite value.
fn adaptive_simpson<F>(f: F, a: f64, b: f64, cfg: &IntegrationConfig) -> Result<f64, usize>
where
    F: Fn(f64) -> f64,
{
    let m = 0.5 * (a + b);
    let (fa, fm, fb) = (f(a), f(m), f(b));
    let mut evaluations = 3;
    if !(fa.is_finite() && fm.is_finite() && fb.is_finite()) {
        return Err(evaluations);
    }

    let mut stack = vec![Segment {
        a,
        b,
        fa,
        fm,
        fb,
        whole: simpson(a, b, fa, fm, fb),
        tolerance: cfg.tolerance,
        depth: 0,
    }];
    let mut total = 0.0;
    let min_depth = MIN_DEPTH.min(cfg.max_depth);

    while let Some(seg) = stack.pop() {
        if evaluations + 2 > cfg.max_evaluations {
            return Err(evaluations);
        }
        let m = 0.5 * (seg.a + seg.b);
        let lm = 0.5 * (seg.a + m);
        let rm = 0.5 * (m + seg.b);
        let (flm, frm) = (f(lm), f(rm));
        evaluations += 2;
        if !(flm.is_finite() && frm.is_finite()) {
            return Err(evaluations);
        }

        let left = simpson(seg.a, m, seg.fa, flm, seg.fm);
        let right = simpson(m, seg.b, seg.fm, frm, seg.fb);
        let delta = left + right - seg.whole;
        let threshold = (15.0 * seg.tolerance).max(64.0 * f64::EPSILON * (left + right).abs());

        if seg.depth >= min_depth && delta.abs() <= threshold {
            total += left + right + delta / 15.0;
        } else if seg.depth >= cfg.max_depth {
            return Err(evaluations);
        } else {
            let tolerance = seg.tolerance / 2.0;
            let depth = seg.depth + 1;
            stack.push(Segment {
                a: m,
                b: seg.b,
                fa: seg.fm,
                fm: frm,
                fb: seg.fb,
                whole: right,
                tolerance,
                depth,
            });
            stack.push(Segment {
                a: seg.a,
                b: m,
                fa: seg.fa,
                fm: flm,
                fb: seg.fm,
                whole: left,
                tolerance,
                depth,
            });
        }
    }
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Closed form of the L2 model with `k = r / c`.
    fn gaussian_closed_form(r: f64, c: f64) -> f64 {
        let k = r / c;
        let phi = |x: f64| 0.5 * (1.0 + erf(x / 2f64.sqrt()));
        (2.0 * phi(k) - 1.0) - 2.0 / (k * (2.0 * PI).sqrt()) * (1.0 - (-k * k / 2.0).exp())
    }

    /// Closed form of the L1 model with `k = r / c`.
    fn cauchy_closed_form(r: f64, c: f64) -> f64 {
        let k = r / c;
        2.0 / PI * k.atan() - (1.0 + k * k).ln() / (PI * k)
    }

    // erf by quadrature of its definition, tight enough for 1e-6 comparisons.
    fn erf(x: f64) -> f64 {
        let value = adaptive_simpson(
            |t| 2.0 / PI.sqrt() * (-t * t).exp(),
            0.0,
            x,
            &IntegrationConfig::new().with_tolerance(1e-13),
        );
        value.unwrap()
    }

    fn l2(r: f64) -> CollisionModel {
        CollisionModel::new(Metric::L2, r).unwrap()
    }

    fn l1(r: f64) -> CollisionModel {
        CollisionModel::new(Metric::L1, r).unwrap()
    }

    #[test]
    fn densities_match_definitions() {
        assert!((Metric::L2.density(0.0) - 0.398_942_280_401_432_7).abs() < 1e-15);
        assert!((Metric::L1.density(0.0) - 1.0 / PI).abs() < 1e-15);
        assert!((Metric::L1.density(1.0) - 1.0 / (2.0 * PI)).abs() < 1e-15);
        assert_eq!(Metric::L2.density(3.0), Metric::L2.density(-3.0));
    }

    #[test]
    fn simpson_integrates_cubics_exactly() {
        let value = adaptive_simpson(|x| x * x * x, 0.0, 2.0, &IntegrationConfig::default());
        assert!((value.unwrap() - 4.0).abs() < 1e-12);
    }

    #[test]
    fn models_match_closed_forms_on_dense_grid() {
        for r in [1.0, 2.0, 3.0, 4.0, 8.0] {
            let (gaussian, cauchy) = (l2(r), l1(r));
            for i in 1..=400 {
                let c = i as f64 * 0.05;
                let p = gaussian.probability(c).unwrap();
                let expected = gaussian_closed_form(r, c);
                assert!((p - expected).abs() < 1e-6, "L2 r={r} c={c}: {p} vs {expected}");

                let p = cauchy.probability(c).unwrap();
                let expected = cauchy_closed_form(r, c);
                assert!((p - expected).abs() < 1e-6, "L1 r={r} c={c}: {p} vs {expected}");
            }
        }
    }

    #[test]
    fn cauchy_model_is_accurate_at_ratio_four() {
        // Coarse Simpson estimates of this integrand agree by accident.
        for (r, c) in [(4.0, 1.0), (3.0, 0.75), (8.0, 2.0)] {
            let p = l1(r).probability(c).unwrap();
            let expected = cauchy_closed_form(r, c);
            assert!((p - expected).abs() < 1e-6, "r={r} c={c}: {p} vs {expected}");
        }
    }

    #[test]
    fn probability_is_strictly_decreasing() {
        for model in [l1(4.0), l2(4.0)] {
            let distances: Vec<f64> = (1..=60).map(|i| i as f64 * 0.25).collect();
            let curve = model.curve(&distances).unwrap();
            for pair in curve.windows(2) {
                assert!(pair[0] > pair[1], "{:?}: {pair:?}", model.metric());
            }
        }
    }

    #[test]
    fn probability_is_strictly_decreasing_on_fine_steps() {
        for model in [l1(3.0), l1(4.0), l2(3.0), l2(4.0)] {
            let distances: Vec<f64> = (1..=4000).map(|i| i as f64 * 0.005).collect();
            let curve = model.curve(&distances).unwrap();
            for (i, pair) in curve.windows(2).enumerate() {
                assert!(
                    pair[0] > pair[1],
                    "{:?} r={} at c={}: {pair:?}",
                    model.metric(),
                    model.r(),
                    distances[i + 1]
                );
            }
        }
    }

    #[test]
    fn tiny_distances_converge_within_default_budget() {
        let p = l2(4.0).probability(1e-9).unwrap();
        assert!(1.0 - p < 1.49e-8, "{p}");

        for model in [l1(1000.0), l2(1000.0)] {
            let p = model.probability(1e-8).unwrap();
            assert!(p > 1.0 - 1e-8 && p <= 1.0, "{:?}: {p}", model.metric());
        }
    }

    #[test]
    fn probability_approaches_one_near_zero() {
        for model in [l1(4.0), l2(4.0)] {
            let p = model.probability(1e-3).unwrap();
            assert!(p > 0.99 && p <= 1.0, "{:?}: {p}", model.metric());
        }
    }

    #[test]
    fn probability_stays_in_unit_interval() {
        for model in [l1(1.0), l2(1.0)] {
            for c in [1e-2, 0.1, 1.0, 10.0, 1e3, 1e6] {
                let p = model.probability(c).unwrap();
                assert!((0.0..=1.0).contains(&p));
            }
        }
    }

    #[test]
    fn wider_buckets_collide_more() {
        let narrow = l2(1.0).probability(2.0).unwrap();
        let wide = l2(8.0).probability(2.0).unwrap();
        assert!(wide > narrow);
    }

    #[test]
    fn invalid_distance_is_rejected() {
        let model = l2(4.0);
        for c in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            assert!(matches!(
                model.probability(c),
                Err(PStableError::InvalidDistance { .. })
            ));
        }
    }

    #[test]
    fn invalid_bucket_width_is_rejected() {
        assert!(matches!(
            CollisionModel::new(Metric::L2, 0.0),
            Err(PStableError::InvalidBucketWidth { .. })
        ));
    }

    #[test]
    fn shallow_depth_reports_integration_failure() {
        let model = l2(4.0)
            .with_integration(IntegrationConfig::new().with_max_depth(3))
            .unwrap();
        assert!(matches!(
            model.probability(1e-4),
            Err(PStableError::IntegrationFailed { .. })
        ));
    }

    #[test]
    fn evaluation_budget_reports_integration_failure() {
        let model = l1(4.0)
            .with_integration(IntegrationConfig::new().with_max_evaluations(10))
            .unwrap();
        match model.probability(1e-3) {
            Err(PStableError::IntegrationFailed { evaluations, .. }) => {
                assert!(evaluations <= 10)
            }
            other => panic!("expected IntegrationFailed, got {other:?}"),
        }
    }

    #[test]
    fn with_integration_validates_tolerance() {
        assert!(matches!(
            l2(4.0).with_integration(IntegrationConfig::new().with_tolerance(0.0)),
            Err(PStableError::InvalidTolerance { .. })
        ));
    }

    #[test]
    fn collision_probability_uses_config() {
        let cfg = HasherConfig::new(4.0, 10);
        let p = collision_probability(&cfg, 2.0).unwrap();
        assert_eq!(p, l2(4.0).probability(2.0).unwrap());

        let cfg = cfg.with_metric_dim(1);
        let p = collision_probability(&cfg, 2.0).unwrap();
        assert_eq!(p, l1(4.0).probability(2.0).unwrap());
    }

    #[test]
    fn collision_probability_rejects_unsupported_metric() {
        let cfg = HasherConfig::new(4.0, 10).with_metric_dim(3);
        assert!(matches!(
            collision_probability(&cfg, 1.0),
            Err(PStableError::UnsupportedMetric { metric_dim: 3 })
        ));
    }

    #[test]
    fn collision_probability_with_custom_budget() {
        let cfg = HasherConfig::new(4.0, 10);
        let loose = IntegrationConfig::new().with_tolerance(1e-4);
        let p = collision_probability_with(&cfg, 3.0, &loose).unwrap();
        assert!((p - gaussian_closed_form(4.0, 3.0)).abs() < 1e-3);
    }

    #[test]
    fn distance_for_similarity_inverts_probability() {
        for model in [l1(4.0), l2(4.0)] {
            for c in [0.5, 2.0, 7.0, 30.0] {
                let p = model.probability(c).unwrap();
                let back = model.distance_for_similarity(p).unwrap();
                assert!((back - c).abs() / c < 1e-4, "c={c} back={back}");
            }
        }
    }

    #[test]
    fn distance_for_similarity_edges() {
        let model = l2(4.0);
        assert_eq!(model.distance_for_similarity(1.0).unwrap(), 0.0);
        assert_eq!(model.distance_for_similarity(1.5).unwrap(), 0.0);
        assert_eq!(model.distance_for_similarity(0.0).unwrap(), f64::INFINITY);
        assert!(matches!(
            model.distance_for_similarity(f64::NAN),
            Err(PStableError::InvalidSimilarity { .. })
        ));
    }
}
