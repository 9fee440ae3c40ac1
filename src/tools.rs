use std::fmt;
use std::process::Command;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::FlowError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ExtraOption {
    flag: String,
    value: Option<String>,
}

impl ExtraOption {
    /// An empty `value` makes a bare flag.
    pub fn new(flag: impl Into<String>, value: impl Into<String>) -> Result<Self, FlowError> {
        let flag = flag.into();
        let value = value.into();
        if !flag.starts_with('-') || flag.trim_start_matches('-').is_empty() {
            return Err(FlowError::InvalidExtraOption(flag));
        }
        if flag.chars().any(char::is_whitespace) {
            return Err(FlowError::InvalidExtraOption(flag));
        }
        Ok(Self {
            flag,
            value: (!value.is_empty()).then_some(value),
        })
    }

    pub fn flag(&self) -> &str {
        &self.flag
    }

    pub fn value(&self) -> Option<&str> {
        self.value.as_deref()
    }

    fn push_args(&self, args: &mut Vec<String>) {
        args.push(self.flag.clone());
        if let Some(value) = &self.value {
            args.push(value.clone());
        }
    }
}

impl FromStr for ExtraOption {
    type Err = FlowError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        match trimmed.split_once('=') {
            Some((flag, rest)) => Self::new(flag, rest),
            None => Self::new(trimmed, ""),
        }
    }
}

impl TryFrom<String> for ExtraOption {
    type Error = FlowError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ExtraOption> for String {
    fn from(option: ExtraOption) -> Self {
        option.to_string()
    }
}

impl fmt::Display for ExtraOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            Some(value) => write!(f, "{}={}", self.flag, value),
            None => write!(f, "{}", self.flag),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExtraOptions(Vec<ExtraOption>);

impl ExtraOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, option: ExtraOption) {
        self.0.push(option);
    }

    pub fn extend(&mut self, other: ExtraOptions) {
        self.0.extend(other.0);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ExtraOption> {
        self.0.iter()
    }

    pub fn to_args(&self) -> Vec<String> {
        let mut args = Vec::with_capacity(self.0.len() * 2);
        for option in &self.0 {
            option.push_args(&mut args);
        }
        args
    }
}

impl FromIterator<ExtraOption> for ExtraOptions {
    fn from_iter<I: IntoIterator<Item = ExtraOption>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl ToolCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn extra(mut self, options: &ExtraOptions) -> Self {
        self.args.extend(options.to_args());
        self
    }
}

impl fmt::Display for ToolCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            if arg.is_empty() || arg.chars().any(|ch| ch.is_whitespace() || ch == '\'') {
                write!(f, " '{}'", arg.replace('\'', "'\\''"))?;
            } else {
                write!(f, " {arg}")?;
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ToolExit {
    pub code: Option<i32>,
}

impl ToolExit {
    pub fn success() -> Self {
        Self { code: Some(0) }
    }

    pub fn is_success(&self) -> bool {
        self.code == Some(0)
    }
}

pub trait ToolRunner {
    fn run(&self, command: &ToolCommand) -> Result<ToolExit, FlowError>;
}

impl<R: ToolRunner + ?Sized> ToolRunner for &R {
    fn run(&self, command: &ToolCommand) -> Result<ToolExit, FlowError> {
        (**self).run(command)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemToolRunner;

impl ToolRunner for SystemToolRunner {
    fn run(&self, command: &ToolCommand) -> Result<ToolExit, FlowError> {
        let status = Command::new(&command.program)
            .args(&command.args)
            .status()
            .map_err(|err| FlowError::ToolSpawn {
                program: command.program.clone(),
                message: err.to_string(),
            })?;
        Ok(ToolExit {
            code: status.code(),
        })
    }
}
