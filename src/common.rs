use nix::errno::Errno;
use thiserror::Error;

use crate::jobs::JobId;

pub type CliResult = Result<String, ShellError>;

pub fn ok<T: ToString>(s: T) -> CliResult {
    Ok(s.to_string())
}

#[derive(Debug, Error, PartialEq)]
pub enum ShellError {
    #[error("smash error: {0}: invalid arguments")]
    InvalidArguments(&'static str),

    #[error("smash error: {0}: too many arguments")]
    TooManyArguments(&'static str),

    #[error("smash error: {0}: not enough arguments")]
    NotEnoughArguments(&'static str),

    #[error("smash error: {0}: invalid format")]
    InvalidFormat(&'static str),

    #[error("smash error: {0}: jobs list is empty")]
    JobsListEmpty(&'static str),

    #[error("smash error: {cmd}: job-id {id} does not exist")]
    NoSuchJob { cmd: &'static str, id: JobId },

    #[error("smash error: kill: invalid signal number")]
    InvalidSignal,

    #[error("smash error: cd: OLDPWD not set")]
    OldPwdNotSet,

    #[error("smash error: alias: invalid alias format")]
    InvalidAliasFormat,

    #[error("smash error: alias: {0} already exists or is a reserved command")]
    AliasTaken(String),

    #[error("smash error: unalias: {0} alias does not exist")]
    NoSuchAlias(String),

    #[error("smash error: unsetenv: {0} does not exist")]
    NoSuchVariable(String),

    #[error("smash error: du: directory {0} does not exist")]
    NoSuchDirectory(String),

    #[error("smash error: watchproc: pid {0} does not exist")]
    NoSuchProcess(i32),

    #[error("smash error: {call} failed: {}", .errno.desc())]
    Sys { call: &'static str, errno: Errno },
}

impl ShellError {
    pub fn sys(call: &'static str) -> impl FnOnce(Errno) -> ShellError {
        move |errno| ShellError::Sys { call, errno }
    }
}
