//! Component-to-package translation for Debian-family hosts.

use crate::domain::component::ComponentName;

/// What: Translate a component name into the Debian package that provides
/// it.
///
/// Input:
/// - `component`: The component to translate.
///
/// Output:
/// - Package name to hand to the package manager. Unknown (`Other`)
///   components pass through unchanged.
///
/// Details:
/// - Both launcher flavours (`rofi`, `fuzzel`) install the `rofi` package;
///   the fuzzel build ships as a rofi alternative on these hosts.
#[must_use]
pub fn package_for(component: &ComponentName) -> String {
    match component {
        ComponentName::Hyprland => "hyprland",
        ComponentName::Hyprpaper => "hyprpaper",
        ComponentName::Hyprlock => "hyprlock",
        ComponentName::Waybar => "waybar",
        ComponentName::Rofi | ComponentName::Fuzzel => "rofi",
        ComponentName::Kitty => "kitty",
        ComponentName::DefaultConfig => "gohan-default-config",
        ComponentName::AmdDriver => "xserver-xorg-video-amdgpu",
        ComponentName::NvidiaDriver => "nvidia-driver",
        ComponentName::IntelDriver => "xserver-xorg-video-intel",
        ComponentName::Other(name) => name,
    }
    .to_string()
}
