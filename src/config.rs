use std::path::Path;

use anyhow::{Result, Context};
use serde::{Deserialize, Serialize};

use crate::util::getenv_bool;


/// Compile and render options. Environment and config files only
/// provide defaults; the CLI overrides both.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Use `data-htmlizer` instead of `data-bind`, and leave `ko`
    /// comment directives alone (they are rendered as comments).
    pub no_conflict: bool,
    /// Report expressions that fail to evaluate via `warn!`.
    pub warn_eval_errors: bool,
}

impl Config {
    pub fn from_env() -> Result<Config> {
        let mut config = Config::default();
        if let Some(b) = getenv_bool("HTMLIZER_NO_CONFLICT")? {
            config.no_conflict = b;
        }
        if let Some(b) = getenv_bool("HTMLIZER_WARN_EVAL")? {
            config.warn_eval_errors = b;
        }
        Ok(config)
    }

    /// Read a JSON object with any of the field names; missing fields
    /// are false.
    pub fn from_json_file(path: &Path) -> Result<Config> {
        let s = std::fs::read_to_string(path).with_context(
            || format!("reading config file {path:?}"))?;
        serde_json::from_str(&s).with_context(
            || format!("parsing config file {path:?}"))
    }

    pub fn binding_attribute(&self) -> &'static str {
        if self.no_conflict { "data-htmlizer" } else { "data-bind" }
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn t_binding_attribute() {
        assert_eq!(Config::default().binding_attribute(), "data-bind");
        let c = Config { no_conflict: true, ..Default::default() };
        assert_eq!(c.binding_attribute(), "data-htmlizer");
    }

    #[test]
    fn t_deserialize() -> Result<()> {
        let c: Config = serde_json::from_str(r#"{"no_conflict": true}"#)?;
        assert_eq!(c, Config { no_conflict: true, warn_eval_errors: false });
        assert!(serde_json::from_str::<Config>(r#"{"noconflict": true}"#).is_err());
        Ok(())
    }
}
