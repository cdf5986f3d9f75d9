use crate::algorithms::stats;

/// Relative change of the observation-window mean against the history before it.
///
/// `values[..L - obs_size]` is the baseline and `values[L - obs_size..]` the
/// checked window. Returns `0.0` when there is no baseline (`L <= obs_size`)
/// or its mean is not positive. Rounded to 3 decimals.
pub fn relative_change(values: &[f64], obs_size: usize) -> f64 {
    if obs_size == 0 || values.len() <= obs_size {
        return 0.0;
    }
    let split = values.len() - obs_size;
    let (pre, check) = values.split_at(split);

    let baseline = stats::mean(pre);
    if baseline <= 0.0 {
        return 0.0;
    }
    stats::round_to((stats::mean(check) - baseline) / baseline, 3)
}
