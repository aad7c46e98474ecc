/// Hours on the clock face used for time-zone distance
const HOURS_PER_DAY: i32 = 24;

/// Circular distance between two UTC offsets in hours
///
/// Offsets wrap around a 24 hour clock, so UTC+2 and UTC+22 are 4 hours
/// apart, not 20.
#[inline]
pub fn circular_time_distance(a: i32, b: i32) -> u32 {
    let forward = (a - b).rem_euclid(HOURS_PER_DAY);
    let backward = (b - a).rem_euclid(HOURS_PER_DAY);
    forward.min(backward) as u32
}

/// Cosine similarity between two embedding vectors
///
/// Returns 0.0 when either vector has zero norm (e.g. an empty answer)
/// so no NaN ever reaches a score. Vectors of different length yield
/// `None`.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Option<f64> {
    if a.len() != b.len() {
        return None;
    }

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (&x, &y) in a.iter().zip(b.iter()) {
        let x64 = f64::from(x);
        let y64 = f64::from(y);
        dot += x64 * y64;
        norm_a += x64 * x64;
        norm_b += y64 * y64;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom == 0.0 || !denom.is_finite() {
        return Some(0.0);
    }
    Some((dot / denom).clamp(-1.0, 1.0))
}
