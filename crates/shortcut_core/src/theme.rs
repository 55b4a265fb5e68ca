//! crates/shortcut_core/src/theme.rs
//!
//! Light/dark preference. Follows the system color scheme until the user picks one.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorScheme {
    Light,
    Dark,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThemePreference {
    pub is_dark: bool,
    pub follows_system: bool,
}

impl ThemePreference {
    pub fn from_system(scheme: ColorScheme) -> Self {
        Self {
            is_dark: scheme == ColorScheme::Dark,
            follows_system: true,
        }
    }

    /// Manual toggle; stops following the system.
    pub fn toggle(&mut self) {
        self.follows_system = false;
        self.is_dark = !self.is_dark;
    }

    pub fn reset_to_system(&mut self, scheme: ColorScheme) {
        *self = Self::from_system(scheme);
    }

    /// Applies a system appearance change, unless the user has overridden it.
    pub fn on_system_change(&mut self, scheme: ColorScheme) {
        if self.follows_system {
            self.is_dark = scheme == ColorScheme::Dark;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_choice_survives_system_changes() {
        let mut theme = ThemePreference::from_system(ColorScheme::Light);
        theme.on_system_change(ColorScheme::Dark);
        assert!(theme.is_dark);

        theme.toggle();
        assert!(!theme.is_dark);
        assert!(!theme.follows_system);
        theme.on_system_change(ColorScheme::Dark);
        assert!(!theme.is_dark);

        theme.reset_to_system(ColorScheme::Dark);
        assert_eq!(
            theme,
            ThemePreference {
                is_dark: true,
                follows_system: true
            }
        );
    }
}
