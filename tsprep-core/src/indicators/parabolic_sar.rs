//! Parabolic SAR: Wilder's acceleration factor system.
//!
//! Inherently sequential: maintains direction, extreme point (EP) and
//! acceleration factor (AF). AF starts at and steps by `acceleration`, capped
//! at `maximum`. Initial direction comes from the first two bar midpoints.
//! Lookback: 1.

pub fn parabolic_sar(high: &[f64], low: &[f64], acceleration: f64, maximum: f64) -> Vec<f64> {
    let n = high.len().min(low.len());
    let mut result = vec![f64::NAN; n];

    if n < 2 || [high[0], low[0], high[1], low[1]].iter().any(|v| v.is_nan()) {
        return result;
    }

    let mut is_long = high[1] + low[1] >= high[0] + low[0];
    let mut af = acceleration;
    let (mut sar, mut ep) = if is_long {
        (low[0], high[1])
    } else {
        (high[0], low[1])
    };

    result[1] = sar;

    for i in 2..n {
        if high[i].is_nan() || low[i].is_nan() {
            continue;
        }

        let mut next = sar + af * (ep - sar);

        if is_long {
            // SAR may not sit above the two previous lows
            next = next.min(low[i - 1]).min(low[i - 2]);
            if low[i] < next {
                is_long = false;
                next = ep;
                ep = low[i];
                af = acceleration;
            } else if high[i] > ep {
                ep = high[i];
                af = (af + acceleration).min(maximum);
            }
        } else {
            next = next.max(high[i - 1]).max(high[i - 2]);
            if high[i] > next {
                is_long = true;
                next = ep;
                ep = high[i];
                af = acceleration;
            } else if low[i] < ep {
                ep = low[i];
                af = (af + acceleration).min(maximum);
            }
        }

        sar = next;
        result[i] = sar;
    }

    result
}
