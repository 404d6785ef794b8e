use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

/// How a dispatch policy reacts when its event kind is published.
///
/// - `Every`: launch a new root instance for every matching event.
/// - `Latest`: cancel the instance launched by the previous match (if it or
///   any of its forked descendants is still live), then launch a new one.
/// - `First`: launch on the first matching event only; later matches are
///   ignored for the lifetime of the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LaunchMode {
    Every,
    Latest,
    First,
}

impl Default for LaunchMode {
    fn default() -> Self {
        LaunchMode::Every
    }
}

impl fmt::Display for LaunchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LaunchMode::Every => "every",
            LaunchMode::Latest => "latest",
            LaunchMode::First => "first",
        };
        f.write_str(s)
    }
}

impl FromStr for LaunchMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "every" => Ok(LaunchMode::Every),
            "latest" => Ok(LaunchMode::Latest),
            "first" => Ok(LaunchMode::First),
            other => Err(format!(
                "invalid launch mode: {other} (expected \"every\", \"latest\" or \"first\")"
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_launch_modes_case_insensitively() {
        assert_eq!(" Latest ".parse::<LaunchMode>(), Ok(LaunchMode::Latest));
        assert_eq!("every".parse::<LaunchMode>(), Ok(LaunchMode::Every));
        assert_eq!("FIRST".parse::<LaunchMode>(), Ok(LaunchMode::First));
    }

    #[test]
    fn rejects_unknown_launch_mode() {
        let err = "sometimes".parse::<LaunchMode>().unwrap_err();
        assert!(err.contains("sometimes"));
    }
}
