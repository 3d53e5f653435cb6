//! Command dispatcher: one request line in, one response line out.
//!
//! Every line goes through the same pipeline:
//!
//! 1. **Decode**: the line must be a JSON value; otherwise the decoder's
//!    message is returned with no command echo.
//! 2. **Route**: the `command` string is matched by prefix against
//!    [`Command::ALL`] in registration order; first match wins.
//! 3. **Execute**: the handler validates its arguments before mutating
//!    anything, so a rejected request leaves no trace.
//! 4. **Render**: the result is wrapped in an [`Envelope`]; a response that
//!    would exceed [`MAX_RESPONSE_LEN`] becomes a `response too long` error.
//!
//! The same [`run_command`] entry point serves the controller's own
//! bootstrap announcements, which skip the decode step.

use core::fmt;

use log::{debug, warn};
use serde_json::Value;

use crate::app::ports::{ConfigPort, RtcDevice};
use crate::config::{ConfigUpdate, PowerConfig};
use crate::error::Error;
use crate::fsm::context::ControllerState;
use crate::rtc::AlarmScheduler;
use crate::sensors::SampleStats;
use crate::timing::MAX_RESPONSE_LEN;

use super::messages::{Body, Envelope, FIRMWARE_VERSION, SensorsBody, UNKNOWN_COMMAND};

// ---------------------------------------------------------------------------
// Command table
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    Sensors,
    GetTime,
    SetTime,
    Snooze,
    GetConfig,
    SetConfig,
    DefaultConfig,
    GetLastSnooze,
}

impl Command {
    /// Registration order; routing tries these front to back.
    pub const ALL: [Self; 8] = [
        Self::Sensors,
        Self::GetTime,
        Self::SetTime,
        Self::Snooze,
        Self::GetConfig,
        Self::SetConfig,
        Self::DefaultConfig,
        Self::GetLastSnooze,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::Sensors => "sensors",
            Self::GetTime => "gettime",
            Self::SetTime => "settime",
            Self::Snooze => "snooze",
            Self::GetConfig => "getconfig",
            Self::SetConfig => "setconfig",
            Self::DefaultConfig => "defaultconfig",
            Self::GetLastSnooze => "getlastsnooze",
        }
    }

    /// Case-sensitive: `token` must start with the command name.
    pub fn match_prefix(token: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| token.starts_with(c.name()))
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// Request decoding
// ---------------------------------------------------------------------------

#[derive(Debug, PartialEq)]
pub enum Request {
    /// Not JSON. Carries the decoder's description.
    Malformed(String),
    MissingCommand,
    Unknown,
    Known(Command, Value),
}

pub fn parse_request(line: &[u8]) -> Request {
    let value: Value = match serde_json::from_slice(line) {
        Ok(v) => v,
        Err(e) => return Request::Malformed(e.to_string()),
    };
    let Some(command) = value.get("command") else {
        return Request::MissingCommand;
    };
    match command.as_str().and_then(Command::match_prefix) {
        Some(cmd) => Request::Known(cmd, value),
        None => Request::Unknown,
    }
}

// ---------------------------------------------------------------------------
// Execution
// ---------------------------------------------------------------------------

/// Everything a handler may touch, borrowed disjointly from the controller.
pub struct CommandContext<'c, 'a, R, C> {
    pub state: &'c mut ControllerState,
    pub stats: &'c SampleStats,
    pub config: &'c mut PowerConfig,
    pub store: &'c mut C,
    pub scheduler: &'c mut AlarmScheduler<'a, R>,
    pub now_ms: u32,
}

/// Handler failure: a controller error, or an argument the JSON decoder
/// could not map onto the expected type.
#[derive(Debug, Clone, PartialEq)]
pub enum CommandError {
    Controller(Error),
    Decode(String),
}

impl From<Error> for CommandError {
    fn from(e: Error) -> Self {
        Self::Controller(e)
    }
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Controller(e) => e.fmt(f),
            Self::Decode(msg) => f.write_str(msg),
        }
    }
}

fn execute<R: RtcDevice, C: ConfigPort>(
    cmd: Command,
    args: &Value,
    ctx: &mut CommandContext<'_, '_, R, C>,
) -> Result<Body, CommandError> {
    let body = match cmd {
        Command::Sensors => Body::Sensors(SensorsBody::new(ctx.stats, &ctx.state.power)),

        Command::GetTime => Body::Time(ctx.scheduler.get_time()?.into()),

        Command::SetTime => {
            let unixtime = args
                .get("unixtime")
                .and_then(Value::as_u64)
                .and_then(|v| u32::try_from(v).ok())
                .ok_or(Error::InvalidUnixtime)?;
            ctx.scheduler.set_time(unixtime)?;
            Body::Time(ctx.scheduler.get_time()?.into())
        }

        Command::Snooze => {
            let minutes = args
                .get("duration")
                .and_then(Value::as_u64)
                .and_then(|v| u32::try_from(v).ok())
                .ok_or(Error::InvalidSnoozeDuration)?;
            let info = ctx.scheduler.snooze(minutes, ctx.state, ctx.now_ms)?;
            Body::Snooze(info.into())
        }

        Command::GetConfig => Body::Config(*ctx.config),

        Command::SetConfig => {
            let update = ConfigUpdate::from_json(args).map_err(CommandError::Decode)?;
            let merged = ctx.config.merged(&update)?;
            ctx.store.save(&merged).map_err(Error::from)?;
            *ctx.config = merged;
            debug!("rpc: configuration updated: {merged:?}");
            Body::Config(merged)
        }

        Command::DefaultConfig => {
            *ctx.config = ctx.store.reset().map_err(Error::from)?;
            debug!("rpc: configuration reset to defaults");
            Body::Config(*ctx.config)
        }

        Command::GetLastSnooze => Body::LastSnooze((&ctx.state.alarm).into()),
    };
    Ok(body)
}

/// Run `cmd` and render its response line (without terminator).
pub fn run_command<R: RtcDevice, C: ConfigPort>(
    cmd: Command,
    args: &Value,
    ctx: &mut CommandContext<'_, '_, R, C>,
) -> String {
    match execute(cmd, args, ctx) {
        Ok(body) => render(Some(cmd.name()), "", Some(body), ctx.now_ms),
        Err(e) => {
            warn!("rpc: {cmd} failed: {e}");
            render(Some(cmd.name()), &e.to_string(), None, ctx.now_ms)
        }
    }
}

/// Decode, route and run one inbound line.
pub fn handle_line<R: RtcDevice, C: ConfigPort>(
    line: &[u8],
    ctx: &mut CommandContext<'_, '_, R, C>,
) -> String {
    match parse_request(line) {
        Request::Known(cmd, args) => {
            debug!("rpc: <- {cmd}");
            run_command(cmd, &args, ctx)
        }
        Request::Malformed(msg) => {
            warn!("rpc: malformed request: {msg}");
            render(None, &msg, None, ctx.now_ms)
        }
        Request::MissingCommand => render(
            Some(UNKNOWN_COMMAND),
            &Error::MissingCommand.to_string(),
            None,
            ctx.now_ms,
        ),
        Request::Unknown => render(
            Some(UNKNOWN_COMMAND),
            &Error::UnknownCommand.to_string(),
            None,
            ctx.now_ms,
        ),
    }
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

fn render(command: Option<&str>, error: &str, body: Option<Body>, uptimems: u32) -> String {
    let envelope = Envelope {
        command,
        error,
        body,
        uptimems,
        version: FIRMWARE_VERSION,
    };
    match serde_json::to_string(&envelope) {
        Ok(line) if line.len() <= MAX_RESPONSE_LEN => line,
        Ok(_) => {
            warn!("rpc: response over {MAX_RESPONSE_LEN} bytes dropped");
            render_bare(command, &Error::ResponseTooLong.to_string(), uptimems)
        }
        Err(e) => render_bare(command, &e.to_string(), uptimems),
    }
}

/// Body-less error envelope, truncating the error text so the line fits.
fn render_bare(command: Option<&str>, error: &str, uptimems: u32) -> String {
    let mut error = error;
    if error.len() > MAX_RESPONSE_LEN / 2 {
        let mut cut = MAX_RESPONSE_LEN / 2;
        while !error.is_char_boundary(cut) {
            cut -= 1;
        }
        error = &error[..cut];
    }
    serde_json::to_string(&Envelope {
        command,
        error,
        body: None,
        uptimems,
        version: FIRMWARE_VERSION,
    })
    .unwrap_or_default()
}
