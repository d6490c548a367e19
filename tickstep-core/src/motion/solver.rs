//! Step-time solver
//!
//! Finds the tick at which the motion `a·t² + v·t` reaches a target
//! displacement inside one period. Everything is integer arithmetic in
//! 64 bits: scaled accelerations times squared tick counts overflow 32.

/// Displacement reached after `t` ticks
#[inline]
fn displacement(a: i64, v: i64, t: u32) -> i64 {
    let t = t as i64;
    (a * t + v) * t
}

/// Solve `s = a·t² + v·t` for `t` in `[t_low, t_high)`
///
/// When `s` lies between the displacements at the window ends the curve
/// is bisected until the window is at most 2 ticks wide. Otherwise the
/// target is not bracketed (the axis reverses or overshoots inside the
/// window) and a bisection with the comparison reversed narrows the
/// window to 1 tick. Both return the midpoint of the final window.
///
/// The result always lies in `[t_low, t_high]`, and strictly below
/// `t_high` when `t_low < t_high`. The loop runs at most
/// `log2(t_high - t_low)` times.
pub fn solve_dist(s: i64, a: i64, v: i64, t_low: u32, t_high: u32) -> u32 {
    let mut t_low = t_low;
    let mut t_high = t_high;
    let s_low = displacement(a, v, t_low);
    let s_high = displacement(a, v, t_high);

    if s >= s_low && s <= s_high {
        while t_low.saturating_add(2) < t_high {
            let t = midpoint(t_low, t_high);
            if s < displacement(a, v, t) {
                t_high = t;
            } else {
                t_low = t;
            }
        }
    } else {
        while t_low.saturating_add(1) < t_high {
            let t = midpoint(t_low, t_high);
            if s > displacement(a, v, t) {
                t_high = t;
            } else {
                t_low = t;
            }
        }
    }

    midpoint(t_low, t_high)
}

#[inline]
fn midpoint(t_low: u32, t_high: u32) -> u32 {
    ((t_low as u64 + t_high as u64) / 2) as u32
}
