//! Line-oriented operator console.
//!
//! The console is the Local intent producer: each line typed by the
//! operator parses into a [`ConsoleCommand`].  Engine-facing commands wrap
//! an [`AppCommand`]; the rest act on the channel or the config document.
//!
//! ```text
//!   on 1 | off 1 | toggle 1          zone control
//!   policy open-master off           cascade policies
//!   add-zone | remove-zone | master 2 on | depends 3 0
//!   enable 3 | disable 3 | rename 3 Back lawn
//!   open other.json | save | save-as copy.json
//!   connect | disconnect | status | help | quit | quit!
//! ```

use core::fmt;
use std::path::PathBuf;

use crate::app::commands::AppCommand;
use crate::config::Policy;
use crate::zones::ZoneId;

/// One parsed console line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    Engine(AppCommand),
    Status,
    Connect,
    Disconnect,
    AddZone,
    RemoveZone,
    SetMaster { zone: ZoneId, is_master: bool },
    /// `None` detaches the zone from its master.
    SetMasterZone { zone: ZoneId, master: Option<ZoneId> },
    SetEnabled { zone: ZoneId, enabled: bool },
    Rename { zone: ZoneId, name: String },
    Open(PathBuf),
    Save,
    SaveAs(PathBuf),
    Help,
    /// `force` discards unsaved edits.
    Quit { force: bool },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    Empty,
    UnknownCommand(String),
    MissingArgument(&'static str),
    BadZone(String),
    BadSwitch(String),
    UnknownPolicy(String),
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "empty command"),
            Self::UnknownCommand(c) => write!(f, "unknown command '{c}' (try 'help')"),
            Self::MissingArgument(what) => write!(f, "missing {what}"),
            Self::BadZone(raw) => write!(f, "'{raw}' is not a zone id"),
            Self::BadSwitch(raw) => write!(f, "expected on/off, got '{raw}'"),
            Self::UnknownPolicy(raw) => write!(
                f,
                "unknown policy '{raw}' (open-master, close-master, close-dependents)"
            ),
        }
    }
}

impl std::error::Error for ParseError {}

pub const HELP: &str = "\
commands:
  on <zone>                 open a zone
  off <zone>                close a zone
  toggle <zone>             flip a zone
  policy <name> <on|off>    open-master, close-master, close-dependents
  add-zone                  append a zone to the document
  remove-zone               drop the last zone
  master <zone> <on|off>    flag or unflag a master zone
  depends <zone> <id|none>  pick the master a zone depends on
  enable / disable <zone>   include or exclude a zone
  rename <zone> <name>      rename a zone
  open <path>               load another document (all zones reset)
  save                      write the document to disk
  save-as <path>            write the document to a new file
  connect / disconnect      MQTT session control
  status                    show zones and connection
  quit                      exit (refused with unsaved changes)
  quit!                     exit, discarding unsaved changes";

/// Parse one console line.
pub fn parse(line: &str) -> Result<ConsoleCommand, ParseError> {
    let line = line.trim();
    let (verb, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
    if verb.is_empty() {
        return Err(ParseError::Empty);
    }
    let verb = verb.to_ascii_lowercase();
    let mut words = rest.split_whitespace();

    let cmd = match verb.as_str() {
        "on" => ConsoleCommand::Engine(AppCommand::SetZone {
            zone: zone_arg(words.next())?,
            active: true,
        }),
        "off" | "close" => ConsoleCommand::Engine(AppCommand::SetZone {
            zone: zone_arg(words.next())?,
            active: false,
        }),
        "toggle" => ConsoleCommand::Engine(AppCommand::Toggle(zone_arg(words.next())?)),
        "policy" => {
            let policy = policy_arg(words.next())?;
            let on = switch_arg(words.next())?;
            ConsoleCommand::Engine(AppCommand::SetPolicy { policy, on })
        }
        "master" => ConsoleCommand::SetMaster {
            zone: zone_arg(words.next())?,
            is_master: switch_arg(words.next())?,
        },
        "depends" => {
            let zone = zone_arg(words.next())?;
            let master = match words.next() {
                Some(w) if w.eq_ignore_ascii_case("none") => None,
                other => Some(zone_arg(other)?),
            };
            ConsoleCommand::SetMasterZone { zone, master }
        }
        "enable" => ConsoleCommand::SetEnabled {
            zone: zone_arg(words.next())?,
            enabled: true,
        },
        "disable" => ConsoleCommand::SetEnabled {
            zone: zone_arg(words.next())?,
            enabled: false,
        },
        "rename" => {
            let (raw_zone, name) = rest.trim().split_once(char::is_whitespace).unwrap_or((rest.trim(), ""));
            let zone = zone_arg(Some(raw_zone).filter(|z| !z.is_empty()))?;
            ConsoleCommand::Rename {
                zone,
                name: text_arg(name, "zone name")?,
            }
        }
        "add-zone" => ConsoleCommand::AddZone,
        "remove-zone" => ConsoleCommand::RemoveZone,
        "open" => ConsoleCommand::Open(text_arg(rest, "path")?.into()),
        "save" => ConsoleCommand::Save,
        "save-as" => ConsoleCommand::SaveAs(text_arg(rest, "path")?.into()),
        "status" | "ls" => ConsoleCommand::Status,
        "connect" => ConsoleCommand::Connect,
        "disconnect" => ConsoleCommand::Disconnect,
        "help" | "?" => ConsoleCommand::Help,
        "quit" | "exit" => ConsoleCommand::Quit { force: false },
        "quit!" | "exit!" => ConsoleCommand::Quit { force: true },
        _ => return Err(ParseError::UnknownCommand(verb)),
    };
    Ok(cmd)
}

/// The rest of the line as one argument, spaces included.
fn text_arg(rest: &str, what: &'static str) -> Result<String, ParseError> {
    let text = rest.trim();
    if text.is_empty() {
        return Err(ParseError::MissingArgument(what));
    }
    Ok(text.to_string())
}

fn zone_arg(word: Option<&str>) -> Result<ZoneId, ParseError> {
    let raw = word.ok_or(ParseError::MissingArgument("zone id"))?;
    raw.parse().map_err(|_| ParseError::BadZone(raw.to_string()))
}

fn switch_arg(word: Option<&str>) -> Result<bool, ParseError> {
    let raw = word.ok_or(ParseError::MissingArgument("on/off"))?;
    match raw.to_ascii_lowercase().as_str() {
        "on" | "true" | "1" => Ok(true),
        "off" | "false" | "0" => Ok(false),
        _ => Err(ParseError::BadSwitch(raw.to_string())),
    }
}

fn policy_arg(word: Option<&str>) -> Result<Policy, ParseError> {
    let raw = word.ok_or(ParseError::MissingArgument("policy name"))?;
    match raw.to_ascii_lowercase().as_str() {
        "open-master" => Ok(Policy::AutoOpenMaster),
        "close-master" => Ok(Policy::AutoCloseMaster),
        "close-dependents" => Ok(Policy::AutoCloseDependents),
        _ => Err(ParseError::UnknownPolicy(raw.to_string())),
    }
}
