use std::env::VarError;

use anyhow::{Result, bail, anyhow};


/// Get an env var as a String; decoding failures are reported as
/// errors, a missing variable as None.
pub fn getenv(name: &str) -> Result<Option<String>> {
    match std::env::var(name) {
        Ok(s) => Ok(Some(s)),
        Err(e) => match e {
            VarError::NotPresent => Ok(None),
            VarError::NotUnicode(_) => bail!("{name:?} env var is not unicode"),
        }
    }
}

/// Accepts `1`/`0` besides `true`/`false`; an empty value means
/// false.
pub fn parse_bool(s: &str) -> Result<bool> {
    match s.trim() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => bail!("not a boolean: {s:?}")
    }
}

pub fn getenv_bool(name: &str) -> Result<Option<bool>> {
    match getenv(name)? {
        Some(s) => Ok(Some(parse_bool(&s).map_err(
            |e| anyhow!("{name:?} env var: {e}"))?)),
        None => Ok(None)
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn t_parse_bool() -> Result<()> {
        assert!(parse_bool("1")?);
        assert!(parse_bool(" true ")?);
        assert!(! parse_bool("0")?);
        assert!(! parse_bool("")?);
        assert!(parse_bool("maybe").is_err());
        Ok(())
    }
}
