// src/test_support.rs

//! Small action type shared by unit tests.

use std::fmt;
use std::str::FromStr;

use crate::bus::Action;

#[derive(Debug, Clone, PartialEq)]
pub enum Ping {
    Tick(u32),
    Stop,
    Note(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PingKind {
    Tick,
    Stop,
    Note,
}

impl Action for Ping {
    type Kind = PingKind;

    fn kind(&self) -> PingKind {
        match self {
            Ping::Tick(_) => PingKind::Tick,
            Ping::Stop => PingKind::Stop,
            Ping::Note(_) => PingKind::Note,
        }
    }
}

impl fmt::Display for PingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PingKind::Tick => "tick",
            PingKind::Stop => "stop",
            PingKind::Note => "note",
        };
        f.write_str(s)
    }
}

impl FromStr for PingKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "tick" => Ok(PingKind::Tick),
            "stop" => Ok(PingKind::Stop),
            "note" => Ok(PingKind::Note),
            other => Err(format!("unknown ping kind '{other}'")),
        }
    }
}
