use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// The two long-running processes the supervisor is responsible for.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum ProcessRole {
    SyncServer,
    UiServer,
}

impl ProcessRole {
    pub const ALL: [ProcessRole; 2] = [ProcessRole::SyncServer, ProcessRole::UiServer];

    pub fn as_str(self) -> &'static str {
        match self {
            ProcessRole::SyncServer => "sync_server",
            ProcessRole::UiServer => "ui_server",
        }
    }
}

impl Display for ProcessRole {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProcessRole {
    type Err = ();

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|role| role.as_str() == value)
            .ok_or(())
    }
}
