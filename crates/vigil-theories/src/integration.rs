// ─────────────────────────────────────────────────────────────────────
// Vigil Kernel — Integration Proxy (IIT)
// ─────────────────────────────────────────────────────────────────────
//! Integrated-information proxy.
//!
//! With enough state history, channels are correlated pairwise over the
//! window and every contiguous bipartition (channels in key order) is
//! scored by the mean absolute correlation crossing the cut. The
//! weakest cut bounds how much joint information is lost when the
//! system is split, so its value is the score.
//!
//! Without enough history the scorer falls back to sensor dispersion:
//! `1 - coefficient of variation` of the current readings, at half
//! confidence.

use std::iter::once;

use vigil_types::{HistoryWindow, SensorPayload, Snapshot, SourceId, TheoryId, TheoryScore};

use crate::scorer::{input_confidence, ScoringFailure, TheoryScorer};

pub struct IntegrationProxy {
    min_samples: usize,
}

impl IntegrationProxy {
    pub fn new(min_samples: usize) -> Self {
        Self {
            min_samples: min_samples.max(3),
        }
    }
}

impl Default for IntegrationProxy {
    fn default() -> Self {
        Self::new(4)
    }
}

/// Pearson correlation; zero when either series is constant.
pub fn pearson(x: &[f64], y: &[f64]) -> f64 {
    let n = x.len().min(y.len());
    if n < 2 {
        return 0.0;
    }
    let mx = x[..n].iter().sum::<f64>() / n as f64;
    let my = y[..n].iter().sum::<f64>() / n as f64;
    let mut sxy = 0.0;
    let mut sxx = 0.0;
    let mut syy = 0.0;
    for i in 0..n {
        let dx = x[i] - mx;
        let dy = y[i] - my;
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }
    if sxx < 1e-15 || syy < 1e-15 {
        return 0.0;
    }
    sxy / (sxx.sqrt() * syy.sqrt())
}

/// Minimum over contiguous bipartitions of the mean |corr| across the cut.
pub fn weakest_cut(series: &[Vec<f64>]) -> f64 {
    let n = series.len();
    if n < 2 {
        return 0.0;
    }
    let mut corr = vec![vec![0.0; n]; n];
    for i in 0..n {
        for j in (i + 1)..n {
            let c = pearson(&series[i], &series[j]).abs();
            corr[i][j] = c;
            corr[j][i] = c;
        }
    }
    let mut best = f64::INFINITY;
    for k in 1..n {
        let mut sum = 0.0;
        for row in corr.iter().take(k) {
            sum += row[k..].iter().sum::<f64>();
        }
        let pairs = (k * (n - k)) as f64;
        best = best.min(sum / pairs);
    }
    best
}

/// Dispersion fallback: `1 - cv` of the sensor readings.
pub fn dispersion_proxy(sensor: &SensorPayload) -> f64 {
    let values: Vec<f64> = sensor.readings.values().copied().collect();
    if values.is_empty() {
        return 0.0;
    }
    if values.len() < 2 {
        return 0.3;
    }
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    if mean == 0.0 {
        return 0.0;
    }
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
    let cv = variance.sqrt() / mean.abs();
    (1.0 - cv).clamp(0.0, 1.0)
}

impl TheoryScorer for IntegrationProxy {
    fn theory(&self) -> TheoryId {
        TheoryId::Iit
    }

    fn score(
        &self,
        snapshot: &Snapshot,
        history: &HistoryWindow,
    ) -> Result<TheoryScore, ScoringFailure> {
        if let Some(state) = snapshot.state() {
            let keys: Vec<&String> = state.channels.keys().collect();
            if keys.len() >= 2 {
                let mut series: Vec<Vec<f64>> = vec![Vec::new(); keys.len()];
                for snap in history.iter().chain(once(snapshot)) {
                    let Some(s) = snap.state() else { continue };
                    if !keys.iter().all(|k| s.channels.contains_key(*k)) {
                        continue;
                    }
                    for (i, k) in keys.iter().enumerate() {
                        series[i].push(s.channels[*k]);
                    }
                }
                if series[0].len() >= self.min_samples {
                    let phi = weakest_cut(&series);
                    if !phi.is_finite() {
                        return Err(ScoringFailure::Numerical(format!(
                            "weakest cut evaluated to {phi}"
                        )));
                    }
                    let confidence = input_confidence(snapshot, &[SourceId::State]);
                    return Ok(TheoryScore::new(
                        TheoryId::Iit,
                        phi,
                        confidence,
                        vec![SourceId::State],
                    )
                    .with_detail(format!(
                        "weakest cut over {} channels x {} samples",
                        keys.len(),
                        series[0].len()
                    )));
                }
            }
        }

        let sensor = snapshot
            .sensor()
            .ok_or(ScoringFailure::MissingInput(SourceId::Sensor))?;
        if sensor.readings.is_empty() {
            return Err(ScoringFailure::InsufficientData(
                "no state history and no sensor readings".into(),
            ));
        }
        log::debug!(
            "IIT tick {}: no state history, using sensor dispersion",
            snapshot.tick_index
        );
        let confidence = 0.5 * input_confidence(snapshot, &[SourceId::Sensor]);
        Ok(TheoryScore::new(
            TheoryId::Iit,
            dispersion_proxy(sensor),
            confidence,
            vec![SourceId::Sensor],
        )
        .with_detail("sensor dispersion fallback"))
    }
}
