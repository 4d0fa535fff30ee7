use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Operational mode reported by the controller in `status`.
///
/// Controllers speak one of two control vocabularies on top of
/// `stopped`/`running`: `paused`/`unpaused` or `armed`/`disarmed`. Anything
/// else is kept verbatim so it can still be shown.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ClusterStatus {
    Stopped,
    Running,
    Paused,
    Unpaused,
    Armed,
    Disarmed,
    Other(String),
}

impl ClusterStatus {
    pub fn as_str(&self) -> &str {
        match self {
            ClusterStatus::Stopped => "stopped",
            ClusterStatus::Running => "running",
            ClusterStatus::Paused => "paused",
            ClusterStatus::Unpaused => "unpaused",
            ClusterStatus::Armed => "armed",
            ClusterStatus::Disarmed => "disarmed",
            ClusterStatus::Other(raw) => raw,
        }
    }
}

impl From<&str> for ClusterStatus {
    fn from(input: &str) -> Self {
        match input {
            "stopped" => ClusterStatus::Stopped,
            "running" => ClusterStatus::Running,
            "paused" => ClusterStatus::Paused,
            "unpaused" => ClusterStatus::Unpaused,
            "armed" => ClusterStatus::Armed,
            "disarmed" => ClusterStatus::Disarmed,
            other => ClusterStatus::Other(other.to_string()),
        }
    }
}

impl From<String> for ClusterStatus {
    fn from(input: String) -> Self {
        ClusterStatus::from(input.as_str())
    }
}

impl From<ClusterStatus> for String {
    fn from(status: ClusterStatus) -> Self {
        match status {
            ClusterStatus::Other(raw) => raw,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for ClusterStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Operator commands recognised by the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Command {
    Run,
    Stop,
    Pause,
    Unpause,
    Disarm,
    Arm,
    Reset,
}

impl Command {
    pub const ALL: [Command; 7] = [
        Command::Run,
        Command::Stop,
        Command::Pause,
        Command::Unpause,
        Command::Disarm,
        Command::Arm,
        Command::Reset,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Command::Run => "run",
            Command::Stop => "stop",
            Command::Pause => "pause",
            Command::Unpause => "unpause",
            Command::Disarm => "disarm",
            Command::Arm => "arm",
            Command::Reset => "reset",
        }
    }

    /// Only `reset` ships the staged solver text; the controller picks up a new
    /// solver at reset time and `run` resumes whatever was last reset.
    pub fn carries_solver(&self) -> bool {
        matches!(self, Command::Reset)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Command {
    type Err = String;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let normalized = input.trim().to_lowercase();
        Command::ALL
            .into_iter()
            .find(|command| command.as_str() == normalized)
            .ok_or_else(|| format!("Unknown command: {normalized}"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ControlVocabulary {
    #[default]
    PauseResume,
    ArmDisarm,
}

impl ControlVocabulary {
    /// Command that suspends a running or stopped cluster.
    pub fn hold_command(self) -> Command {
        match self {
            ControlVocabulary::PauseResume => Command::Pause,
            ControlVocabulary::ArmDisarm => Command::Disarm,
        }
    }

    /// Command that lifts a hold placed with [`Self::hold_command`].
    pub fn release_command(self) -> Command {
        match self {
            ControlVocabulary::PauseResume => Command::Unpause,
            ControlVocabulary::ArmDisarm => Command::Arm,
        }
    }

    /// Vocabulary implied by a status, if the status belongs to only one.
    pub fn observed(status: &ClusterStatus) -> Option<Self> {
        match status {
            ClusterStatus::Paused | ClusterStatus::Unpaused => {
                Some(ControlVocabulary::PauseResume)
            }
            ClusterStatus::Armed | ClusterStatus::Disarmed => Some(ControlVocabulary::ArmDisarm),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ControlVocabulary::PauseResume => "pause",
            ControlVocabulary::ArmDisarm => "arm",
        }
    }
}

/// Configured vocabulary: pinned, or negotiated from the statuses observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VocabularyPreference {
    #[default]
    Auto,
    Fixed(ControlVocabulary),
}

impl VocabularyPreference {
    pub fn initial(self) -> ControlVocabulary {
        match self {
            VocabularyPreference::Auto => ControlVocabulary::default(),
            VocabularyPreference::Fixed(vocabulary) => vocabulary,
        }
    }

    /// Vocabulary to use after seeing `status`, given the one currently in use.
    pub fn negotiate(self, current: ControlVocabulary, status: &ClusterStatus) -> ControlVocabulary {
        match self {
            VocabularyPreference::Fixed(vocabulary) => vocabulary,
            VocabularyPreference::Auto => ControlVocabulary::observed(status).unwrap_or(current),
        }
    }
}

impl FromStr for VocabularyPreference {
    type Err = String;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        match input.trim().to_ascii_lowercase().as_str() {
            "" | "auto" => Ok(VocabularyPreference::Auto),
            "pause" | "pause-resume" | "pause_resume" => {
                Ok(VocabularyPreference::Fixed(ControlVocabulary::PauseResume))
            }
            "arm" | "arm-disarm" | "arm_disarm" => {
                Ok(VocabularyPreference::Fixed(ControlVocabulary::ArmDisarm))
            }
            other => Err(format!("Unknown control vocabulary: {other}")),
        }
    }
}

/// Commands the console offers for a given status. The console never moves
/// state itself; it only decides which requests to put in front of the
/// operator.
pub fn offered_commands(status: &ClusterStatus, vocabulary: ControlVocabulary) -> Vec<Command> {
    match status {
        ClusterStatus::Running | ClusterStatus::Unpaused | ClusterStatus::Armed => {
            vec![Command::Stop, vocabulary.hold_command(), Command::Reset]
        }
        ClusterStatus::Stopped => vec![Command::Run, vocabulary.hold_command(), Command::Reset],
        ClusterStatus::Paused | ClusterStatus::Disarmed => {
            // A held status names its own vocabulary.
            let held = ControlVocabulary::observed(status).unwrap_or(vocabulary);
            vec![held.release_command(), Command::Reset]
        }
        ClusterStatus::Other(_) => vec![Command::Reset],
    }
}
