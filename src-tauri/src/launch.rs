use anyhow::{Context, Result};

use crate::settings::SettingsStore;

/// OS login-item registration.
pub trait LaunchAtLogin: Send + Sync {
    fn is_enabled(&self) -> Result<bool>;
    fn enable(&self) -> Result<()>;
    fn disable(&self) -> Result<()>;
}

/// Bring the registration in line with the stored preference, touching the
/// OS only when the two disagree.
pub fn reconcile(launcher: &dyn LaunchAtLogin, wanted: bool) -> Result<()> {
    let registered = launcher.is_enabled()?;
    match (wanted, registered) {
        (true, false) => {
            log::info!("Registering launch at login");
            launcher.enable()
        }
        (false, true) => {
            log::info!("Removing launch at login");
            launcher.disable()
        }
        _ => Ok(()),
    }
}

/// Persist the auto-launch preference, then apply it.
pub fn set_preference(
    settings: &SettingsStore,
    launcher: &dyn LaunchAtLogin,
    enabled: bool,
) -> Result<()> {
    settings.set_auto_launch_enabled(enabled)?;
    reconcile(launcher, enabled).context("failed to update launch at login")
}
