//! Evaluation modes.

/// How a program is run.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum EvalMode {
    /// Evaluate the program. Only explicit outputs (`console.log`,
    /// `showTime`, `showVersion`) produce records.
    #[default]
    Run,
    /// Run the line recorder first, so the most representative expression
    /// on every line records its value too.
    Annotate,
}

impl EvalMode {
    /// Whether the tree is instrumented before evaluation.
    #[inline]
    pub fn records_every_line(self) -> bool {
        matches!(self, Self::Annotate)
    }

    /// Driver command name for this mode.
    pub fn command(self) -> &'static str {
        match self {
            Self::Run => "run",
            Self::Annotate => "annotate",
        }
    }

    pub fn from_command(command: &str) -> Option<Self> {
        match command {
            "run" => Some(Self::Run),
            "annotate" => Some(Self::Annotate),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commands_round_trip() {
        for mode in [EvalMode::Run, EvalMode::Annotate] {
            assert_eq!(EvalMode::from_command(mode.command()), Some(mode));
        }
        assert_eq!(EvalMode::from_command("check"), None);
        assert!(!EvalMode::default().records_every_line());
    }
}
