// src/plotter.rs
use chrono::{DateTime, Local};

/// Tick spacings for the time axis, smallest first.
const TICK_STEPS_SECS: [f64; 18] = [
    1.0, 2.0, 5.0, 10.0, 15.0, 30.0, 60.0, 120.0, 300.0, 600.0, 900.0, 1800.0, 3600.0, 7200.0,
    10800.0, 21600.0, 43200.0, 86400.0,
];
const TARGET_TICKS: f64 = 6.0;

/// Append-only (epoch seconds, volts) series behind the live chart.
#[derive(Default, Clone, Debug)]
pub struct Series {
    points: Vec<[f64; 2]>,
}

impl Series {
    pub fn add_point(&mut self, t: f64, value: f64) {
        self.points.push([t, value]);
    }

    pub fn clear(&mut self) {
        self.points.clear();
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    #[cfg(test)]
    pub fn points(&self) -> &[[f64; 2]] {
        &self.points
    }

    /// Points inside the trailing `window_secs` (0 = everything), decimated to
    /// at most `max_points`.
    pub fn visible(&self, window_secs: f64, max_points: usize) -> Vec<[f64; 2]> {
        let start = match self.points.last() {
            Some(last) if window_secs > 0.0 => {
                let cutoff = last[0] - window_secs;
                self.points.partition_point(|p| p[0] < cutoff)
            }
            _ => 0,
        };
        decimate(&self.points[start..], max_points)
    }
}

/// Min/max bucketing: each bucket contributes its lowest and highest point in
/// time order, so spikes survive.
pub fn decimate(points: &[[f64; 2]], max_points: usize) -> Vec<[f64; 2]> {
    if points.len() <= max_points || max_points < 2 {
        return points.to_vec();
    }
    let buckets = max_points / 2;
    let bucket_len = points.len().div_ceil(buckets);
    let mut out = Vec::with_capacity(max_points);
    for chunk in points.chunks(bucket_len) {
        let (mut lo, mut hi) = (0, 0);
        for (i, p) in chunk.iter().enumerate() {
            if p[1] < chunk[lo][1] {
                lo = i;
            }
            if p[1] > chunk[hi][1] {
                hi = i;
            }
        }
        match lo.cmp(&hi) {
            std::cmp::Ordering::Less => out.extend([chunk[lo], chunk[hi]]),
            std::cmp::Ordering::Greater => out.extend([chunk[hi], chunk[lo]]),
            std::cmp::Ordering::Equal => out.push(chunk[lo]),
        }
    }
    out
}

const DAY_SECS: f64 = 86400.0;
// Anything denser than this is not worth drawing.
const MAX_TICKS: usize = 2 * TARGET_TICKS as usize;

/// Picks a tick spacing so that roughly six ticks cover `span` seconds.
/// Past the ladder the step grows by powers of ten days.
pub fn tick_step(span: f64) -> f64 {
    if let Some(step) = TICK_STEPS_SECS
        .iter()
        .copied()
        .find(|step| span / step <= TARGET_TICKS)
    {
        return step;
    }
    let days = span / DAY_SECS / TARGET_TICKS;
    DAY_SECS * 10f64.powf(days.log10().ceil().max(0.0))
}

/// Label format for ticks spaced `step` seconds apart.
pub fn tick_format(step: f64) -> &'static str {
    if step >= DAY_SECS {
        "%Y-%m-%d"
    } else if step >= 3600.0 {
        "%m-%d %H:%M"
    } else {
        "%H:%M:%S"
    }
}

/// Tick positions inside `[min, max]` aligned to round local-clock times.
pub fn time_ticks(min: f64, max: f64) -> (f64, Vec<f64>) {
    let offset = Local::now().offset().local_minus_utc() as f64;
    ticks_with_offset(min, max, offset)
}

/// `offset` is the local zone's distance from UTC in seconds.
fn ticks_with_offset(min: f64, max: f64, offset: f64) -> (f64, Vec<f64>) {
    let (min, max) = if min <= max { (min, max) } else { (max, min) };
    let step = tick_step(max - min);
    if !min.is_finite() || !max.is_finite() || !step.is_finite() || step <= 0.0 {
        return (step, Vec::new());
    }
    let first = ((min + offset) / step).ceil() * step - offset;
    if (max - first) / step >= MAX_TICKS as f64 {
        return (step, Vec::new());
    }
    let ticks = (0..=MAX_TICKS)
        .map(|i| first + i as f64 * step)
        .take_while(|t| *t <= max)
        .collect();
    (step, ticks)
}

pub fn to_local(secs: f64) -> Option<DateTime<Local>> {
    let whole = secs.floor();
    let nanos = ((secs - whole) * 1e9) as u32;
    DateTime::from_timestamp(whole as i64, nanos).map(|t| t.with_timezone(&Local))
}

/// Axis label for an epoch-seconds coordinate.
pub fn format_time(secs: f64, fmt: &str) -> String {
    to_local(secs)
        .map(|t| t.format(fmt).to_string())
        .unwrap_or_default()
}
