//! Display trend of a specialty, derived from history on every read.

use crate::progress::{Trend, UserProgress};
use crate::types::Interaction;

/// Compare the most recent `window` outcomes with the `window` before them.
///
/// `outcomes` must be ordered newest first. `attempts` is the authoritative
/// attempt count, which may exceed the history handed in.
pub fn derive_trend(attempts: u32, outcomes: &[bool], window: usize, threshold: f64) -> Trend {
    if window == 0 || (attempts as usize) < window {
        return Trend::New;
    }
    if outcomes.len() < window {
        return Trend::Stable;
    }

    let (recent, rest) = outcomes.split_at(window);
    let prior = &rest[..rest.len().min(window)];
    if prior.is_empty() {
        return Trend::Stable;
    }

    let delta = rate(recent) - rate(prior);
    if delta > threshold {
        Trend::Improving
    } else if delta < -threshold {
        Trend::Declining
    } else {
        Trend::Stable
    }
}

fn rate(outcomes: &[bool]) -> f64 {
    outcomes.iter().filter(|&&c| c).count() as f64 / outcomes.len() as f64
}

/// Outcomes of one specialty's attempts in `history`, newest first.
pub fn outcomes_for(history: &[Interaction], specialty: &str) -> Vec<bool> {
    let mut attempts: Vec<&Interaction> =
        history.iter().filter(|i| i.specialty == specialty).collect();
    attempts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    attempts.iter().map(|i| i.is_correct).collect()
}

/// Overwrite every specialty's trend from `history`.
pub fn refresh_trends(
    progress: &mut UserProgress,
    history: &[Interaction],
    window: usize,
    threshold: f64,
) {
    for (name, stats) in progress.specialties.iter_mut() {
        let outcomes = outcomes_for(history, name);
        stats.trend = derive_trend(stats.attempts, &outcomes, window, threshold);
    }
}
