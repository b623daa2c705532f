use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Backend-side execution target, chosen per submission and sent as a hint.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum Executor {
    #[default]
    MiniBash,
    SystemTerminal,
}

impl Executor {
    pub fn as_str(self) -> &'static str {
        match self {
            Executor::MiniBash => "mini-bash",
            Executor::SystemTerminal => "system-terminal",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Executor::MiniBash => "Mini-Bash",
            Executor::SystemTerminal => "System Terminal",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Executor::MiniBash => Executor::SystemTerminal,
            Executor::SystemTerminal => Executor::MiniBash,
        }
    }
}

impl fmt::Display for Executor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Executor {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mini-bash" | "mini_bash" | "minibash" => Ok(Executor::MiniBash),
            "system-terminal" | "system_terminal" | "system" | "terminal" => {
                Ok(Executor::SystemTerminal)
            }
            other => Err(format!(
                "unknown executor '{other}' (expected mini-bash or system-terminal)"
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_as_kebab_case() {
        assert_eq!(
            serde_json::to_string(&Executor::SystemTerminal).unwrap(),
            "\"system-terminal\""
        );
        assert_eq!(Executor::default(), Executor::MiniBash);
    }

    #[test]
    fn parses_aliases() {
        assert_eq!("Mini_Bash".parse::<Executor>(), Ok(Executor::MiniBash));
        assert_eq!("system".parse::<Executor>(), Ok(Executor::SystemTerminal));
        assert!("zsh".parse::<Executor>().is_err());
    }

    #[test]
    fn toggle_flips_between_variants() {
        assert_eq!(Executor::MiniBash.toggled(), Executor::SystemTerminal);
        assert_eq!(Executor::SystemTerminal.toggled(), Executor::MiniBash);
    }
}
