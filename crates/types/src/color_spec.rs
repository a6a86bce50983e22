//! Per-LED color specifications and their string grammar
//!
//! Palettes in the runtime config are arrays of strings, one per LED:
//!
//! - `ffe000`: literal color
//! - `random`: new random color every tick
//! - `ff0000-0000ff`: ping-pong gradient over the color cycle
//! - `ff0000-0000ff-seconds`: gradient driven by the wall clock
//! - `00ff00-ff0000-cpu_temp`: gradient driven by a metric between its bounds
//! - `cpu_temp;00ff00:40;ffff00:60;ff0000:80`: threshold bands
//! - `cpu_temp;smooth;00ff00:40;ff0000:80`: interpolated bands

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::color::{ColorStop, Rgb};
use crate::ParseError;

/// Wall-clock unit driving a time gradient
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeUnit {
    Seconds,
    Minutes,
    Hours,
}

impl TimeUnit {
    /// Largest value the unit takes on a 24h clock
    pub fn max_value(self) -> u32 {
        match self {
            TimeUnit::Seconds => 59,
            TimeUnit::Minutes => 59,
            TimeUnit::Hours => 23,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TimeUnit::Seconds => "seconds",
            TimeUnit::Minutes => "minutes",
            TimeUnit::Hours => "hours",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s {
            "seconds" => Some(TimeUnit::Seconds),
            "minutes" => Some(TimeUnit::Minutes),
            "hours" => Some(TimeUnit::Hours),
            _ => None,
        }
    }
}

/// How a multi-stop band picks its color between thresholds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BandPolicy {
    /// Color of the first stop whose threshold exceeds the value
    Banding,
    /// Linear interpolation between the bracketing stops
    Smooth,
}

/// Declarative color rule for one LED
#[derive(Debug, Clone, PartialEq)]
pub enum ColorSpec {
    Literal(Rgb),
    Random,
    Gradient {
        start: Rgb,
        end: Rgb,
    },
    MetricGradient {
        start: Rgb,
        end: Rgb,
        metric: String,
    },
    TimeGradient {
        start: Rgb,
        end: Rgb,
        unit: TimeUnit,
    },
    MultiStopBand {
        metric: String,
        /// Sorted ascending by threshold
        stops: Vec<ColorStop>,
        policy: BandPolicy,
    },
}

impl ColorSpec {
    /// Color used when the spec cannot be evaluated (missing metric, degenerate bounds)
    pub fn fallback_color(&self) -> Rgb {
        match self {
            ColorSpec::Literal(color) => *color,
            ColorSpec::Random => Rgb::BLACK,
            ColorSpec::Gradient { start, .. }
            | ColorSpec::MetricGradient { start, .. }
            | ColorSpec::TimeGradient { start, .. } => *start,
            ColorSpec::MultiStopBand { stops, .. } => {
                stops.first().map(|stop| stop.color).unwrap_or(Rgb::BLACK)
            }
        }
    }

    fn parse_band(s: &str) -> Result<Self, ParseError> {
        let mut parts = s.split(';').map(str::trim);
        let metric = parts.next().unwrap_or_default();
        if metric.is_empty() {
            return Err(ParseError::InvalidColorSpec(s.to_string()));
        }

        let mut policy = BandPolicy::Banding;
        let mut stops = Vec::new();
        for part in parts.filter(|p| !p.is_empty()) {
            if part.eq_ignore_ascii_case("smooth") {
                policy = BandPolicy::Smooth;
                continue;
            }
            let (hex, threshold) = part
                .split_once(':')
                .ok_or_else(|| ParseError::InvalidColorSpec(s.to_string()))?;
            let threshold = threshold
                .trim()
                .parse::<f64>()
                .map_err(|_| ParseError::InvalidColorSpec(s.to_string()))?;
            stops.push(ColorStop::new(threshold, Rgb::from_hex(hex)?));
        }

        if stops.is_empty() {
            return Err(ParseError::InvalidColorSpec(s.to_string()));
        }
        stops.sort_by(|a, b| a.threshold.total_cmp(&b.threshold));

        Ok(ColorSpec::MultiStopBand {
            metric: metric.to_string(),
            stops,
            policy,
        })
    }
}

impl FromStr for ColorSpec {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();

        if s.eq_ignore_ascii_case("random") {
            return Ok(ColorSpec::Random);
        }
        if s.contains(';') {
            return Self::parse_band(s);
        }

        let parts: Vec<&str> = s.split('-').map(str::trim).collect();
        match parts.as_slice() {
            [hex] => Ok(ColorSpec::Literal(Rgb::from_hex(hex)?)),
            [start, end] => Ok(ColorSpec::Gradient {
                start: Rgb::from_hex(start)?,
                end: Rgb::from_hex(end)?,
            }),
            [start, end, key] if !key.is_empty() => {
                let start = Rgb::from_hex(start)?;
                let end = Rgb::from_hex(end)?;
                Ok(match TimeUnit::parse(key) {
                    Some(unit) => ColorSpec::TimeGradient { start, end, unit },
                    None => ColorSpec::MetricGradient {
                        start,
                        end,
                        metric: key.to_string(),
                    },
                })
            }
            _ => Err(ParseError::InvalidColorSpec(s.to_string())),
        }
    }
}

impl fmt::Display for ColorSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColorSpec::Literal(color) => write!(f, "{}", color),
            ColorSpec::Random => f.write_str("random"),
            ColorSpec::Gradient { start, end } => write!(f, "{}-{}", start, end),
            ColorSpec::MetricGradient { start, end, metric } => {
                write!(f, "{}-{}-{}", start, end, metric)
            }
            ColorSpec::TimeGradient { start, end, unit } => {
                write!(f, "{}-{}-{}", start, end, unit.as_str())
            }
            ColorSpec::MultiStopBand {
                metric,
                stops,
                policy,
            } => {
                f.write_str(metric)?;
                if *policy == BandPolicy::Smooth {
                    f.write_str(";smooth")?;
                }
                for stop in stops {
                    write!(f, ";{}:{}", stop.color, stop.threshold)?;
                }
                Ok(())
            }
        }
    }
}

impl Serialize for ColorSpec {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ColorSpec {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_literal_and_random() {
        assert_eq!(
            "ffe000".parse::<ColorSpec>().unwrap(),
            ColorSpec::Literal(Rgb::new(255, 224, 0))
        );
        assert_eq!("RANDOM".parse::<ColorSpec>().unwrap(), ColorSpec::Random);
    }

    #[test]
    fn test_parse_dash_variants() {
        let red = Rgb::new(255, 0, 0);
        let blue = Rgb::new(0, 0, 255);
        assert_eq!(
            "ff0000-0000ff".parse::<ColorSpec>().unwrap(),
            ColorSpec::Gradient { start: red, end: blue }
        );
        assert_eq!(
            "ff0000-0000ff-minutes".parse::<ColorSpec>().unwrap(),
            ColorSpec::TimeGradient {
                start: red,
                end: blue,
                unit: TimeUnit::Minutes
            }
        );
        assert_eq!(
            "ff0000-0000ff-gpu_usage".parse::<ColorSpec>().unwrap(),
            ColorSpec::MetricGradient {
                start: red,
                end: blue,
                metric: "gpu_usage".to_string()
            }
        );
        assert!("ff0000-0000ff-".parse::<ColorSpec>().is_err());
        assert!("ff0000-00ff-cpu_temp".parse::<ColorSpec>().is_err());
    }

    #[test]
    fn test_parse_bands_sorted_with_policy() {
        let spec: ColorSpec = "cpu_temp;ff0000:80;00ff00:40".parse().unwrap();
        match spec {
            ColorSpec::MultiStopBand { metric, stops, policy } => {
                assert_eq!(metric, "cpu_temp");
                assert_eq!(policy, BandPolicy::Banding);
                assert_eq!(stops[0].threshold, 40.0);
                assert_eq!(stops[1].color, Rgb::new(255, 0, 0));
            }
            other => panic!("unexpected spec {:?}", other),
        }

        let smooth: ColorSpec = "cpu_temp;smooth;00ff00:40;ff0000:80".parse().unwrap();
        assert!(matches!(
            smooth,
            ColorSpec::MultiStopBand { policy: BandPolicy::Smooth, .. }
        ));
        assert!("cpu_temp;".parse::<ColorSpec>().is_err());
        assert!("cpu_temp;00ff00".parse::<ColorSpec>().is_err());
    }

    #[test]
    fn test_display_reparses() {
        for text in [
            "ffe000",
            "random",
            "ff0000-0000ff",
            "ff0000-0000ff-hours",
            "cpu_temp;smooth;00ff00:40;ff0000:80.5",
        ] {
            let spec: ColorSpec = text.parse().unwrap();
            let again: ColorSpec = spec.to_string().parse().unwrap();
            assert_eq!(spec, again);
        }
    }
}
