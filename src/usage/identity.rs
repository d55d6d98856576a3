//! User/group identity of the notebook owner
//!
//! JupyterHub exposes the owner as `JUPYTERHUB_USER`, which on this platform
//! is a dot-joined `user.group` string.

use serde::Serialize;

use super::env::EnvSource;

/// Environment variable holding `user.group`
pub const USER_VAR: &str = "JUPYTERHUB_USER";

/// Used when the variable is unset
pub const DEFAULT_IDENTITY: &str = "user.group";

/// Identity reported by `get-env`
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user: String,
    pub group: String,
}

impl Identity {
    /// Split on the first `.` only; the group keeps any remaining dots.
    /// A value without a dot is all user, with an empty group.
    pub fn parse(value: &str) -> Self {
        let (user, group) = value.split_once('.').unwrap_or((value, ""));
        Self {
            user: user.to_string(),
            group: group.to_string(),
        }
    }

    /// Resolve from the environment, falling back to [`DEFAULT_IDENTITY`]
    pub fn resolve(env: &dyn EnvSource) -> Self {
        match env.var(USER_VAR) {
            Some(value) => Self::parse(&value),
            None => Self::parse(DEFAULT_IDENTITY),
        }
    }
}
