//! Component naming for the desktop stack.
//!
//! Known members of the stack get dedicated variants; anything else is kept
//! verbatim in [`ComponentName::Other`] so newer component catalogs keep
//! round-tripping through persistence without a code change.

use std::fmt;

/// Name of an installable desktop-stack component.
///
/// `hyprland` is the sole core member; the three `*_driver` variants are the
/// GPU driver package groups.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ComponentName {
    /// The Hyprland compositor (core component).
    Hyprland,
    /// Wallpaper daemon.
    Hyprpaper,
    /// Screen locker.
    Hyprlock,
    /// Status bar.
    Waybar,
    /// Application launcher (rofi flavour).
    Rofi,
    /// Application launcher (fuzzel flavour).
    Fuzzel,
    /// Terminal emulator.
    Kitty,
    /// Curated default configuration set.
    DefaultConfig,
    /// AMD GPU driver group.
    AmdDriver,
    /// NVIDIA GPU driver group.
    NvidiaDriver,
    /// Intel GPU driver group.
    IntelDriver,
    /// Free-form component name not (yet) known to this release.
    Other(String),
}

impl ComponentName {
    /// What: Canonical lower-case string form of the component name.
    ///
    /// Input: None.
    /// Output: `&str` such as `"hyprland"` or `"nvidia_driver"`.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            ComponentName::Hyprland => "hyprland",
            ComponentName::Hyprpaper => "hyprpaper",
            ComponentName::Hyprlock => "hyprlock",
            ComponentName::Waybar => "waybar",
            ComponentName::Rofi => "rofi",
            ComponentName::Fuzzel => "fuzzel",
            ComponentName::Kitty => "kitty",
            ComponentName::DefaultConfig => "default_config",
            ComponentName::AmdDriver => "amd_driver",
            ComponentName::NvidiaDriver => "nvidia_driver",
            ComponentName::IntelDriver => "intel_driver",
            ComponentName::Other(name) => name,
        }
    }

    /// True only for the compositor, whose presence every configuration
    /// requires.
    #[must_use]
    pub fn is_core(&self) -> bool {
        matches!(self, ComponentName::Hyprland)
    }

    /// True for the three GPU driver package groups.
    #[must_use]
    pub fn is_driver(&self) -> bool {
        matches!(
            self,
            ComponentName::AmdDriver | ComponentName::NvidiaDriver | ComponentName::IntelDriver
        )
    }
}

impl fmt::Display for ComponentName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for ComponentName {
    fn from(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "hyprland" => ComponentName::Hyprland,
            "hyprpaper" => ComponentName::Hyprpaper,
            "hyprlock" => ComponentName::Hyprlock,
            "waybar" => ComponentName::Waybar,
            "rofi" => ComponentName::Rofi,
            "fuzzel" => ComponentName::Fuzzel,
            "kitty" => ComponentName::Kitty,
            "default_config" => ComponentName::DefaultConfig,
            "amd_driver" => ComponentName::AmdDriver,
            "nvidia_driver" => ComponentName::NvidiaDriver,
            "intel_driver" => ComponentName::IntelDriver,
            other => ComponentName::Other(other.to_string()),
        }
    }
}

impl From<String> for ComponentName {
    fn from(value: String) -> Self {
        ComponentName::from(value.as_str())
    }
}

impl From<ComponentName> for String {
    fn from(value: ComponentName) -> Self {
        value.as_str().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    /// What: Only the compositor is a core component.
    ///
    /// - Input: Every named variant.
    /// - Output: `is_core` true exactly for `Hyprland`.
    fn core_predicate_holds_only_for_hyprland() {
        assert!(ComponentName::Hyprland.is_core());
        for name in [
            ComponentName::Hyprpaper,
            ComponentName::Hyprlock,
            ComponentName::Waybar,
            ComponentName::Rofi,
            ComponentName::Fuzzel,
            ComponentName::Kitty,
            ComponentName::DefaultConfig,
            ComponentName::AmdDriver,
            ComponentName::NvidiaDriver,
            ComponentName::IntelDriver,
            ComponentName::Other("mako".into()),
        ] {
            assert!(!name.is_core(), "{name} must not be core");
        }
    }

    #[test]
    /// What: Driver predicate covers exactly the three GPU driver groups.
    ///
    /// - Input: Driver and non-driver variants.
    /// - Output: `is_driver` true for amd/nvidia/intel drivers only.
    fn driver_predicate_matches_gpu_groups() {
        assert!(ComponentName::AmdDriver.is_driver());
        assert!(ComponentName::NvidiaDriver.is_driver());
        assert!(ComponentName::IntelDriver.is_driver());
        assert!(!ComponentName::Hyprland.is_driver());
        assert!(!ComponentName::Other("amd_driver2".into()).is_driver());
    }

    #[test]
    /// What: Parsing is case/whitespace tolerant and keeps unknown names.
    ///
    /// - Input: Mixed-case padded known name and an unknown one.
    /// - Output: Known variant resolved; unknown preserved as `Other`.
    fn parse_normalizes_and_preserves_unknown() {
        assert_eq!(ComponentName::from("  Hyprland "), ComponentName::Hyprland);
        assert_eq!(ComponentName::from("WAYBAR"), ComponentName::Waybar);
        assert_eq!(
            ComponentName::from("mako"),
            ComponentName::Other("mako".into())
        );
    }

    #[test]
    /// What: Serde round-trips component names through their string form.
    ///
    /// - Input: Known and unknown component names.
    /// - Output: JSON string encoding, identical value after decode.
    fn serde_round_trip_is_stringly() {
        let json = serde_json::to_string(&ComponentName::NvidiaDriver).expect("encode");
        assert_eq!(json, "\"nvidia_driver\"");
        let back: ComponentName = serde_json::from_str(&json).expect("decode");
        assert_eq!(back, ComponentName::NvidiaDriver);
        let other: ComponentName = serde_json::from_str("\"mako\"").expect("decode");
        assert_eq!(other, ComponentName::Other("mako".into()));
    }
}
