//! On-Balance Volume: cumulative volume signed by the close-to-close direction.

pub fn obv(close: &[f64], volume: &[f64]) -> Vec<f64> {
    let n = close.len().min(volume.len());
    let mut result = vec![f64::NAN; n];

    if n == 0 {
        return result;
    }

    let mut running = volume[0];
    result[0] = running;
    for i in 1..n {
        if close[i] > close[i - 1] {
            running += volume[i];
        } else if close[i] < close[i - 1] {
            running -= volume[i];
        }
        result[i] = running;
    }

    result
}
