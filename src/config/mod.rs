//! Configuration management

mod layouts;
mod settings;

pub use layouts::{builtin_or_default, find_builtin, load_layout, BuiltinLayout, BUILTIN_LAYOUTS};
pub use settings::{parse_usb_id, AppConfig, PaletteConfig, CONFIG_ENV_VAR, MIN_TICK_SECONDS};
