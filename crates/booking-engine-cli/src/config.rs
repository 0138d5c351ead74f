//! Configuration loading.

use std::path::Path;

use booking_engine::EngineConfig;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;

use crate::cli::PolicyOverrides;

/// Environment variable prefix; nested keys are separated by `__`.
pub const ENV_PREFIX: &str = "BOOKING_";

/// Loads the engine policy: defaults, then the TOML file, then `BOOKING_*`.
#[expect(
    clippy::result_large_err,
    reason = "figment::Error is large but only returned at startup"
)]
pub fn load_from(config_path: Option<&Path>) -> Result<EngineConfig, figment::Error> {
    let mut figment = Figment::from(Serialized::defaults(EngineConfig::default()));

    if let Some(path) = config_path {
        figment = figment.merge(Toml::file(path));
    }

    figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));

    figment.extract()
}

/// Applies command-line overrides on top of a loaded policy.
pub fn apply_overrides(mut config: EngineConfig, overrides: &PolicyOverrides) -> EngineConfig {
    if let Some(buffer) = overrides.buffer {
        config.slots.buffer_minutes = buffer;
    }
    if let Some(granularity) = overrides.granularity {
        config.slots.granularity_minutes = Some(granularity);
    }
    if let Some(notice) = overrides.notice {
        config.advance_notice_minutes = notice;
    }
    config
}

#[cfg(test)]
mod tests {
    use super::*;

    use figment::Jail;

    #[test]
    fn defaults_without_sources() {
        Jail::expect_with(|_jail| {
            let config = load_from(None)?;
            assert_eq!(config, EngineConfig::default());
            Ok(())
        });
    }

    #[test]
    fn toml_file_overrides_defaults() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "policy.toml",
                r"
                advance_notice_minutes = 60

                [slots]
                buffer_minutes = 15
                ",
            )?;
            let config = load_from(Some(Path::new("policy.toml")))?;
            assert_eq!(config.slots.buffer_minutes, 15);
            assert_eq!(config.advance_notice_minutes, 60);
            assert_eq!(config.expansion.max_iterations, 1000);
            Ok(())
        });
    }

    #[test]
    fn environment_overrides_file() {
        Jail::expect_with(|jail| {
            jail.create_file("policy.toml", "[slots]\nbuffer_minutes = 15\n")?;
            jail.set_env("BOOKING_SLOTS__BUFFER_MINUTES", "5");
            jail.set_env("BOOKING_EXPANSION__MAX_ITERATIONS", "50");
            let config = load_from(Some(Path::new("policy.toml")))?;
            assert_eq!(config.slots.buffer_minutes, 5);
            assert_eq!(config.expansion.max_iterations, 50);
            Ok(())
        });
    }

    #[test]
    fn flags_override_loaded_config() {
        let overrides = PolicyOverrides {
            buffer: Some(10),
            granularity: Some(15),
            notice: None,
        };
        let mut loaded = EngineConfig::default();
        loaded.advance_notice_minutes = 30;

        let config = apply_overrides(loaded, &overrides);
        assert_eq!(config.slots.buffer_minutes, 10);
        assert_eq!(config.slots.granularity_minutes, Some(15));
        assert_eq!(config.advance_notice_minutes, 30);
    }
}
