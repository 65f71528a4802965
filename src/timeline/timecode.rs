//! Conversion between seconds and the compact `MM:SS` display form.

use anyhow::{Context, Result, bail};

/// Formats seconds as zero-padded `MM:SS`, truncating the fractional part.
///
/// Minutes are not wrapped into hours, so 3725s renders as `62:05`.
pub fn format_mmss(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 {
        seconds.floor() as u64
    } else {
        0
    };
    format!("{:02}:{:02}", total / 60, total % 60)
}

/// Parses `MM:SS` or `HH:MM:SS` into seconds.
pub fn parse_mmss(value: &str) -> Result<f64> {
    let parts: Vec<&str> = value.trim().split(':').collect();
    let (hours, minutes, seconds) = match parts.as_slice() {
        [m, s] => ("0", *m, *s),
        [h, m, s] => (*h, *m, *s),
        _ => bail!("Timestamp '{value}' must look like MM:SS or HH:MM:SS"),
    };

    let hours = hours
        .trim()
        .parse::<u64>()
        .with_context(|| format!("Invalid hours in timestamp '{value}'"))?;
    let minutes = minutes
        .trim()
        .parse::<u64>()
        .with_context(|| format!("Invalid minutes in timestamp '{value}'"))?;
    let seconds = seconds
        .trim()
        .parse::<f64>()
        .with_context(|| format!("Invalid seconds in timestamp '{value}'"))?;

    if !seconds.is_finite() || seconds < 0.0 {
        bail!("Invalid seconds in timestamp '{value}'");
    }

    Ok((hours * 3600 + minutes * 60) as f64 + seconds)
}

/// Accepts either a timestamp (`MM:SS`, `HH:MM:SS`) or plain seconds (`12.5`).
pub fn parse_instant(value: &str) -> Result<f64> {
    if value.contains(':') {
        return parse_mmss(value);
    }
    let seconds = value
        .trim()
        .parse::<f64>()
        .with_context(|| format!("'{value}' is neither seconds nor MM:SS"))?;
    if !seconds.is_finite() || seconds < 0.0 {
        bail!("Playback instant must be a non-negative number of seconds, got '{value}'");
    }
    Ok(seconds)
}
