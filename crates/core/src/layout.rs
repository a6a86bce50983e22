//! Validated device layout: groups, display modes and protocol of one device
//!
//! A [`DeviceLayout`] is built once from a [`LayoutConfig`] whenever the
//! configuration changes and is immutable afterwards. Mode references are
//! checked here; reference cycles are reported when a frame selects them.

use log::{debug, warn};

use led_sens_types::{DataSource, LayoutConfig, ModeEntry, ModeSpec, OrderedMap, ProtocolConfig};

use crate::error::{RenderError, Result};
use crate::groups::{derived_led_count, LedGroupRegistry};

/// Deepest chain of alternating references followed for one frame
pub const MAX_MODE_DEPTH: usize = 8;

/// Mode names preferred, in order, when no explicit default is declared
const PREFERRED_DEFAULTS: [&str; 2] = ["metrics", "alternate_metrics"];

/// Display mode with its timing resolved to ticks
#[derive(Debug, Clone, PartialEq)]
pub enum DisplayMode {
    Static {
        mappings: OrderedMap<DataSource>,
    },
    Alternating {
        entries: Vec<ModeRef>,
        interval_ticks: u64,
    },
}

/// Entry of an alternating mode
#[derive(Debug, Clone, PartialEq)]
pub enum ModeRef {
    Named(String),
    Inline(Box<DisplayMode>),
}

/// `max(1, round(interval / update_interval))`
pub fn interval_ticks(interval_secs: f64, update_interval: f64) -> u64 {
    if !(update_interval > 0.0) || !interval_secs.is_finite() {
        return 1;
    }
    let ticks = (interval_secs / update_interval).round();
    if ticks < 1.0 {
        1
    } else {
        ticks as u64
    }
}

fn gcd(mut a: u64, mut b: u64) -> u64 {
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a
}

/// Least common multiple, `None` on overflow
pub fn lcm(a: u64, b: u64) -> Option<u64> {
    if a == 0 || b == 0 {
        return Some(a.max(b));
    }
    (a / gcd(a, b)).checked_mul(b)
}

impl DisplayMode {
    /// Ticks after which this mode shows its first entry again; 1 for static modes
    pub fn period(&self) -> Option<u64> {
        match self {
            DisplayMode::Static { .. } => Some(1),
            DisplayMode::Alternating {
                entries,
                interval_ticks,
            } => {
                let own = (*interval_ticks).max(1).checked_mul(entries.len().max(1) as u64)?;
                entries.iter().try_fold(own, |acc, entry| match entry {
                    ModeRef::Named(_) => Some(acc),
                    ModeRef::Inline(inner) => lcm(acc, inner.period()?),
                })
            }
        }
    }

    fn from_spec(spec: ModeSpec, update_interval: f64) -> Self {
        match spec {
            ModeSpec::Static { mappings } => DisplayMode::Static { mappings },
            ModeSpec::Alternating { interval, displays } => DisplayMode::Alternating {
                interval_ticks: interval_ticks(interval, update_interval),
                entries: displays
                    .into_iter()
                    .map(|entry| match entry {
                        ModeEntry::Reference(name) => ModeRef::Named(name),
                        ModeEntry::Inline(spec) => {
                            ModeRef::Inline(Box::new(DisplayMode::from_spec(spec, update_interval)))
                        }
                    })
                    .collect(),
            },
        }
    }

    /// Named modes this mode refers to, including through inline entries
    fn references(&self) -> Vec<&str> {
        match self {
            DisplayMode::Static { .. } => Vec::new(),
            DisplayMode::Alternating { entries, .. } => entries
                .iter()
                .flat_map(|entry| match entry {
                    ModeRef::Named(name) => vec![name.as_str()],
                    ModeRef::Inline(mode) => mode.references(),
                })
                .collect(),
        }
    }

    /// Mapping tables declared inline in this mode
    fn static_mappings(&self) -> Vec<&OrderedMap<DataSource>> {
        match self {
            DisplayMode::Static { mappings } => vec![mappings],
            DisplayMode::Alternating { entries, .. } => entries
                .iter()
                .flat_map(|entry| match entry {
                    ModeRef::Named(_) => Vec::new(),
                    ModeRef::Inline(mode) => mode.static_mappings(),
                })
                .collect(),
        }
    }
}

/// Immutable, validated layout of one device
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceLayout {
    name: String,
    led_count: usize,
    groups: LedGroupRegistry,
    modes: OrderedMap<DisplayMode>,
    default_mode: String,
    protocol: ProtocolConfig,
}

impl DeviceLayout {
    /// Validate a layout file.
    ///
    /// Zero LEDs or no display modes are hard errors. Out-of-range groups,
    /// dangling mode references and unknown mapping groups are warnings.
    pub fn from_config(config: LayoutConfig, update_interval: f64) -> Result<Self> {
        let led_count = config
            .led_count
            .unwrap_or_else(|| derived_led_count(&config.groups));
        if led_count == 0 {
            return Err(RenderError::config(format!(
                "layout '{}' has no LEDs",
                config.name
            )));
        }
        if config.display_modes.is_empty() {
            return Err(RenderError::config(format!(
                "layout '{}' declares no display modes",
                config.name
            )));
        }
        if config.protocol.chunk_size == 0 {
            return Err(RenderError::config(format!(
                "layout '{}' declares a zero chunk size",
                config.name
            )));
        }

        let groups = LedGroupRegistry::build(led_count, &config.groups, &config.group_fallbacks);

        let modes: OrderedMap<DisplayMode> = config
            .display_modes
            .into_iter()
            .map(|(name, spec)| (name, DisplayMode::from_spec(spec, update_interval)))
            .collect();

        for (name, mode) in modes.iter() {
            for reference in mode.references() {
                if !modes.contains_key(reference) {
                    warn!("Mode '{}' refers to unknown mode '{}'", name, reference);
                }
            }
            for mappings in mode.static_mappings() {
                for group in mappings.keys().filter(|g| !groups.contains(g)) {
                    debug!("Mode '{}' maps undefined group '{}'", name, group);
                }
            }
        }

        let default_mode = match config.default_mode {
            Some(name) if modes.contains_key(&name) => name,
            explicit => {
                if let Some(name) = explicit {
                    warn!("Default mode '{}' is not declared, choosing another", name);
                }
                PREFERRED_DEFAULTS
                    .iter()
                    .find(|name| modes.contains_key(name))
                    .map(|name| name.to_string())
                    .or_else(|| modes.keys().next().map(str::to_string))
                    .unwrap_or_default()
            }
        };

        Ok(Self {
            name: config.name,
            led_count,
            groups,
            modes,
            default_mode,
            protocol: config.protocol,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn led_count(&self) -> usize {
        self.led_count
    }

    pub fn groups(&self) -> &LedGroupRegistry {
        &self.groups
    }

    pub fn protocol(&self) -> &ProtocolConfig {
        &self.protocol
    }

    pub fn default_mode(&self) -> &str {
        &self.default_mode
    }

    /// Mode names in declaration order
    pub fn mode_names(&self) -> impl Iterator<Item = &str> {
        self.modes.keys()
    }

    pub fn mode(&self, name: &str) -> Option<&DisplayMode> {
        self.modes.get(name)
    }

    /// Common period of every mode's alternation, `None` on overflow
    pub fn alternation_period(&self) -> Option<u64> {
        self.modes
            .iter()
            .try_fold(1, |acc, (_, mode)| lcm(acc, mode.period()?))
    }

    /// The requested mode, or the default one with a warning
    pub fn resolve_mode_name<'a>(&'a self, requested: &'a str) -> &'a str {
        if self.modes.contains_key(requested) {
            requested
        } else {
            warn!(
                "Display mode '{}' is not available on layout '{}', using '{}'",
                requested, self.name, self.default_mode
            );
            &self.default_mode
        }
    }

    /// Mapping table active for `mode_name` at `tick`.
    ///
    /// Alternating modes pick `entries[(tick / interval_ticks) % len]` and
    /// follow named entries up to [`MAX_MODE_DEPTH`] levels.
    pub fn select_mappings(&self, mode_name: &str, tick: u64) -> Result<&OrderedMap<DataSource>> {
        let name = self.resolve_mode_name(mode_name);
        let mode = self
            .modes
            .get(name)
            .ok_or_else(|| RenderError::config(format!("layout '{}' has no display modes", self.name)))?;
        let mut trail = vec![name];
        self.select_in(mode, tick, &mut trail)
    }

    fn select_in<'a: 'n, 'n>(
        &'a self,
        mode: &'a DisplayMode,
        tick: u64,
        trail: &mut Vec<&'n str>,
    ) -> Result<&'a OrderedMap<DataSource>> {
        if trail.len() > MAX_MODE_DEPTH {
            return Err(RenderError::config(format!(
                "display mode nesting deeper than {} ({})",
                MAX_MODE_DEPTH,
                trail.join(" -> ")
            )));
        }

        match mode {
            DisplayMode::Static { mappings } => Ok(mappings),
            DisplayMode::Alternating {
                entries,
                interval_ticks,
            } => {
                if entries.is_empty() {
                    return Err(RenderError::config(format!(
                        "alternating mode '{}' has no entries",
                        trail.last().copied().unwrap_or_default()
                    )));
                }
                let index = ((tick / (*interval_ticks).max(1)) % entries.len() as u64) as usize;
                match &entries[index] {
                    ModeRef::Inline(inner) => {
                        trail.push("<inline>");
                        self.select_in(inner, tick, trail)
                    }
                    ModeRef::Named(next) => {
                        if trail.contains(&next.as_str()) {
                            return Err(RenderError::config(format!(
                                "display mode reference cycle: {} -> {}",
                                trail.join(" -> "),
                                next
                            )));
                        }
                        let inner = self.modes.get(next).ok_or_else(|| {
                            RenderError::config(format!("unknown display mode '{}'", next))
                        })?;
                        trail.push(next);
                        self.select_in(inner, tick, trail)
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn layout(value: serde_json::Value) -> Result<DeviceLayout> {
        let config: LayoutConfig = serde_json::from_value(value).unwrap();
        DeviceLayout::from_config(config, 0.1)
    }

    fn group_names(mappings: &OrderedMap<DataSource>) -> Vec<&str> {
        mappings.keys().collect()
    }

    #[test]
    fn test_interval_ticks() {
        assert_eq!(interval_ticks(0.5, 0.1), 5);
        assert_eq!(interval_ticks(2.5, 1.0), 3);
        assert_eq!(interval_ticks(0.01, 0.1), 1);
        assert_eq!(interval_ticks(1.0, 0.0), 1);
    }

    #[test]
    fn test_led_count_derived_or_declared() {
        let derived = layout(json!({
            "groups": {"a": [0, 1], "b": 7},
            "display_modes": {"m": {"type": "static", "mappings": {}}}
        }))
        .unwrap();
        assert_eq!(derived.led_count(), 8);

        let declared = layout(json!({
            "led_count": 31,
            "groups": {"a": [0, 1]},
            "display_modes": {"m": {"type": "static"}}
        }))
        .unwrap();
        assert_eq!(declared.led_count(), 31);
    }

    #[test]
    fn test_structural_errors() {
        let empty = layout(json!({
            "groups": {},
            "display_modes": {"m": {"type": "static"}}
        }));
        assert!(matches!(empty, Err(RenderError::Config(_))));

        let no_modes = layout(json!({"groups": {"a": 0}}));
        assert!(matches!(no_modes, Err(RenderError::Config(_))));
    }

    #[test]
    fn test_default_mode_preference() {
        // raw text keeps declaration order, json! objects would sort their keys
        let parse = |text: &str| {
            DeviceLayout::from_config(LayoutConfig::from_json(text).unwrap(), 0.1).unwrap()
        };

        let first = parse(
            r#"{"groups": {"a": 0}, "display_modes": {"zeta": {"type": "static"}, "alpha": {"type": "static"}}}"#,
        );
        assert_eq!(first.default_mode(), "zeta");
        assert_eq!(first.mode_names().collect::<Vec<_>>(), vec!["zeta", "alpha"]);

        let alt = parse(
            r#"{"groups": {"a": 0}, "display_modes": {"cpu_temp": {"type": "static"}, "alternate_metrics": {"type": "static"}}}"#,
        );
        assert_eq!(alt.default_mode(), "alternate_metrics");

        let explicit = parse(
            r#"{"groups": {"a": 0}, "default_mode": "time", "display_modes": {"metrics": {"type": "static"}, "time": {"type": "static"}}}"#,
        );
        assert_eq!(explicit.default_mode(), "time");
        assert_eq!(explicit.resolve_mode_name("missing"), "time");
        assert_eq!(explicit.resolve_mode_name("metrics"), "metrics");
    }

    #[test]
    fn test_alternating_selection() {
        let layout = layout(json!({
            "groups": {"a": 0, "b": 1},
            "display_modes": {
                "A": {"type": "static", "mappings": {"a": true}},
                "B": {"type": "static", "mappings": {"b": true}},
                "alt": {"type": "alternating", "interval": 0.5, "displays": ["A", "B"]}
            }
        }))
        .unwrap();

        for tick in 0..15 {
            let expected = if (5..10).contains(&tick) { "b" } else { "a" };
            let mappings = layout.select_mappings("alt", tick).unwrap();
            assert_eq!(group_names(mappings), vec![expected], "tick {}", tick);
        }
    }

    #[test]
    fn test_nested_and_inline_entries() {
        let layout = layout(json!({
            "groups": {"a": 0, "b": 1, "c": 2},
            "display_modes": {
                "A": {"type": "static", "mappings": {"a": true}},
                "inner": {"type": "alternating", "interval": 0.1, "displays": [
                    "A",
                    {"type": "static", "mappings": {"c": true}}
                ]},
                "outer": {"type": "alternating", "interval": 1.0, "displays": ["inner"]}
            }
        }))
        .unwrap();

        assert_eq!(group_names(layout.select_mappings("outer", 0).unwrap()), vec!["a"]);
        assert_eq!(group_names(layout.select_mappings("outer", 1).unwrap()), vec!["c"]);
    }

    #[test]
    fn test_reference_cycle_is_config_error() {
        let layout = layout(json!({
            "groups": {"a": 0},
            "display_modes": {
                "x": {"type": "alternating", "interval": 1.0, "displays": ["y"]},
                "y": {"type": "alternating", "interval": 1.0, "displays": ["x"]}
            }
        }))
        .unwrap();
        assert!(matches!(
            layout.select_mappings("x", 0),
            Err(RenderError::Config(_))
        ));
    }

    #[test]
    fn test_alternation_period() {
        let layout = layout(json!({
            "groups": {"a": 0},
            "display_modes": {
                "A": {"type": "static", "mappings": {"a": true}},
                "pair": {"type": "alternating", "interval": 0.4, "displays": ["A", "A"]},
                "triple": {"type": "alternating", "interval": 0.2, "displays": ["A", "A",
                    {"type": "alternating", "interval": 0.3, "displays": ["A", "A"]}
                ]}
            }
        }))
        .unwrap();

        assert_eq!(layout.mode("A").unwrap().period(), Some(1));
        assert_eq!(layout.mode("pair").unwrap().period(), Some(8));
        assert_eq!(layout.mode("triple").unwrap().period(), Some(6));
        assert_eq!(layout.alternation_period(), Some(24));
        assert_eq!(lcm(4, 6), Some(12));
        assert_eq!(lcm(u64::MAX, 2), None);
    }
}
