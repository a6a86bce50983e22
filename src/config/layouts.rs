//! Built-in device layouts and layout selection

use anyhow::{Context, Result};
use log::{info, warn};

use led_sens_types::LayoutConfig;

use super::AppConfig;

/// Layout shipped with the binary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuiltinLayout {
    /// Short id accepted in `layout_mode`
    pub id: &'static str,
    /// Device name as shown to users and written in configs
    pub name: &'static str,
    json: &'static str,
}

impl BuiltinLayout {
    pub fn config(&self) -> Result<LayoutConfig> {
        LayoutConfig::from_json(self.json)
            .with_context(|| format!("Built-in layout '{}' is malformed", self.name))
    }

    fn matches(&self, name: &str) -> bool {
        let name = name.trim();
        self.id.eq_ignore_ascii_case(name) || self.name.eq_ignore_ascii_case(name)
    }
}

pub const BUILTIN_LAYOUTS: [BuiltinLayout; 3] = [
    BuiltinLayout {
        id: "pa120",
        name: "Pearless Assasin 120",
        json: include_str!("../../layouts/pa120.json"),
    },
    BuiltinLayout {
        id: "pa140",
        name: "Pearless Assasin 140",
        json: include_str!("../../layouts/pa140.json"),
    },
    BuiltinLayout {
        id: "ax120r",
        name: "TR Assassin X 120R",
        json: include_str!("../../layouts/ax120r.json"),
    },
];

/// Built-in layout by name or id
pub fn find_builtin(name: &str) -> Option<&'static BuiltinLayout> {
    BUILTIN_LAYOUTS.iter().find(|layout| layout.matches(name))
}

/// Built-in layout by name or id; unknown names fall back to the PA120
pub fn builtin_or_default(name: &str) -> &'static BuiltinLayout {
    find_builtin(name).unwrap_or_else(|| {
        warn!(
            "Unknown layout '{}', defaulting to {}",
            name, BUILTIN_LAYOUTS[0].name
        );
        &BUILTIN_LAYOUTS[0]
    })
}

/// Layout selected by the config: `layout_file` when set, else `layout_mode`
pub fn load_layout(config: &AppConfig) -> Result<LayoutConfig> {
    if let Some(path) = &config.layout_file {
        info!("Loading layout from {}", path.display());
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read layout {}", path.display()))?;
        return LayoutConfig::from_json(&content)
            .with_context(|| format!("Failed to parse layout {}", path.display()));
    }
    builtin_or_default(&config.layout_mode).config()
}
