use std::error::Error;
use std::fmt::{Display, Formatter};

use crate::models::ProcessRole;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum CoreErrorKind {
    NotInstalled,
    PermissionDenied,
    InvalidInput,
    ProcessFailure,
    Timeout,
    StorageFailure,
    Internal,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CoreError {
    pub role: Option<ProcessRole>,
    pub kind: CoreErrorKind,
    pub message: String,
}

impl CoreError {
    pub fn new(kind: CoreErrorKind, message: impl Into<String>) -> Self {
        Self {
            role: None,
            kind,
            message: message.into(),
        }
    }

    pub fn for_role(role: ProcessRole, kind: CoreErrorKind, message: impl Into<String>) -> Self {
        Self {
            role: Some(role),
            kind,
            message: message.into(),
        }
    }
}

impl Display for CoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.role {
            Some(role) => write!(f, "{:?} ({}): {}", self.kind, role.as_str(), self.message),
            None => write!(f, "{:?}: {}", self.kind, self.message),
        }
    }
}

impl Error for CoreError {}
