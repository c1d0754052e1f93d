//! Interactive chat shell.
//!
//! Lines starting with `/` are commands; anything else is sent as a chat
//! message. Failures are shown as localized notices and logged in full.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::Local;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{debug, warn};
use uuid::Uuid;

use tonal_chat::state::lock;
use tonal_chat::{
    default_chat_name, ChatError, Locale, Notice, SessionManager, SpeechOutcome,
    TurnOrchestrator, TurnReport, VoiceRecorder,
};
use tonal_core::personality::{PersonalityTrait, Preset};

use crate::audio::FileAudioSource;
use crate::render;

pub const HELP: &str = "\
Type a message to chat, or use a command:
  /voice <file>        send a recorded audio file
  /replay [n]          speak message n again (default: last reply)
  /history             show the conversation
  /personality         show the current personality
  /presets             list presets
  /preset <name>       apply a preset
  /set <trait> <0-100> change one trait
  /save [name]         save the conversation
  /chats               list saved chats
  /load <n|id>         load a saved chat
  /delete <n|id>       delete a saved chat
  /new                 start a new chat
  /help                show this help
  /quit                leave";

/// A saved chat picked by list position or by id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatRef {
    /// 1-based position in the saved chat listing.
    Index(usize),
    Id(Uuid),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellCommand {
    Empty,
    Text(String),
    Voice(PathBuf),
    Replay(Option<usize>),
    History,
    Personality,
    Presets,
    Preset(Preset),
    Set(PersonalityTrait, i32),
    Save(Option<String>),
    Chats,
    Load(ChatRef),
    Delete(ChatRef),
    New,
    Help,
    Quit,
}

/// Parse one input line. Usage errors come back as a message for the user.
pub fn parse_line(line: &str) -> Result<ShellCommand, String> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(ShellCommand::Empty);
    }
    let Some(rest) = line.strip_prefix('/') else {
        return Ok(ShellCommand::Text(line.to_string()));
    };

    let (name, arg) = match rest.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, arg.trim()),
        None => (rest, ""),
    };
    let cmd = match name.to_lowercase().as_str() {
        "voice" | "v" => {
            if arg.is_empty() {
                return Err("usage: /voice <file>".to_string());
            }
            ShellCommand::Voice(PathBuf::from(arg))
        }
        "replay" | "r" => {
            if arg.is_empty() {
                ShellCommand::Replay(None)
            } else {
                ShellCommand::Replay(Some(position(arg)?))
            }
        }
        "history" | "h" => ShellCommand::History,
        "personality" | "p" => ShellCommand::Personality,
        "presets" => ShellCommand::Presets,
        "preset" => ShellCommand::Preset(arg.parse::<Preset>().map_err(|e| e.to_string())?),
        "set" => {
            let mut parts = arg.split_whitespace();
            let (Some(t), Some(v), None) = (parts.next(), parts.next(), parts.next()) else {
                return Err("usage: /set <trait> <0-100>".to_string());
            };
            let trait_name = t
                .parse::<PersonalityTrait>()
                .map_err(|e| e.to_string())?;
            let value = v
                .parse::<i32>()
                .map_err(|_| format!("not a number: {}", v))?;
            ShellCommand::Set(trait_name, value)
        }
        "save" | "s" => ShellCommand::Save((!arg.is_empty()).then(|| arg.to_string())),
        "chats" | "list" => ShellCommand::Chats,
        "load" => ShellCommand::Load(chat_ref(arg)?),
        "delete" | "del" => ShellCommand::Delete(chat_ref(arg)?),
        "new" => ShellCommand::New,
        "help" | "?" => ShellCommand::Help,
        "quit" | "exit" | "q" => ShellCommand::Quit,
        other => return Err(format!("unknown command: /{} (try /help)", other)),
    };
    Ok(cmd)
}

fn position(arg: &str) -> Result<usize, String> {
    match arg.parse::<usize>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(format!("not a valid position: {}", arg)),
    }
}

fn chat_ref(arg: &str) -> Result<ChatRef, String> {
    if arg.is_empty() {
        return Err("expected a chat number or id".to_string());
    }
    if let Ok(id) = Uuid::parse_str(arg) {
        return Ok(ChatRef::Id(id));
    }
    position(arg).map(ChatRef::Index)
}

/// What the shell should do after a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Output(String),
    Quit,
}

impl Reply {
    fn text(s: impl Into<String>) -> Self {
        Reply::Output(s.into())
    }
}

pub struct Shell {
    orchestrator: TurnOrchestrator,
    sessions: SessionManager,
    recorder: VoiceRecorder,
    source: Arc<FileAudioSource>,
    locale: Locale,
}

impl Shell {
    pub fn new(
        orchestrator: TurnOrchestrator,
        sessions: SessionManager,
        recorder: VoiceRecorder,
        source: Arc<FileAudioSource>,
        locale: Locale,
    ) -> Self {
        Self {
            orchestrator,
            sessions,
            recorder,
            source,
            locale,
        }
    }

    /// Read commands from stdin until `/quit` or end of input.
    pub async fn run(&self) -> std::io::Result<()> {
        let mut stdout = tokio::io::stdout();
        let mut lines = BufReader::new(tokio::io::stdin()).lines();

        stdout.write_all(b"Type /help for commands.\n").await?;
        loop {
            stdout.write_all(b"> ").await?;
            stdout.flush().await?;
            let Some(line) = lines.next_line().await? else {
                break;
            };
            let output = match parse_line(&line) {
                Ok(cmd) => match self.handle(cmd).await {
                    Reply::Output(s) => s,
                    Reply::Quit => break,
                },
                Err(usage) => usage,
            };
            if !output.is_empty() {
                stdout.write_all(output.as_bytes()).await?;
                stdout.write_all(b"\n").await?;
            }
        }
        Ok(())
    }

    /// Run one command, turning failures into notices.
    pub async fn handle(&self, cmd: ShellCommand) -> Reply {
        match self.execute(cmd).await {
            Ok(reply) => reply,
            Err(e) => {
                warn!(error = %e, "Command failed");
                Reply::Output(render::notice(&Notice::for_error(self.locale, &e)))
            }
        }
    }

    async fn execute(&self, cmd: ShellCommand) -> Result<Reply, ChatError> {
        let state = self.orchestrator.state();
        let reply = match cmd {
            ShellCommand::Empty => Reply::text(""),
            ShellCommand::Text(text) => {
                let report = self.orchestrator.submit_text(&text).await?;
                Reply::Output(self.turn_output(&report))
            }
            ShellCommand::Voice(path) => {
                self.source.select(path);
                let clip = self.recorder.record(std::future::ready(())).await?;
                let report = self.orchestrator.submit_audio(&clip).await?;
                Reply::Output(self.turn_output(&report))
            }
            ShellCommand::Replay(position) => {
                let id = {
                    let state = lock(state);
                    let messages = state.messages();
                    let found = match position {
                        Some(n) => n.checked_sub(1).and_then(|i| messages.get(i)),
                        None => messages.iter().rev().find(|m| m.speech_text().is_some()),
                    };
                    match found {
                        Some(m) => m.id,
                        None => return Ok(Reply::text("nothing to replay")),
                    }
                };
                self.orchestrator.replay_speech(id).await?;
                Reply::text("")
            }
            ShellCommand::History => Reply::Output(render::messages(lock(state).messages())),
            ShellCommand::Personality => {
                let state = lock(state);
                Reply::Output(render::personality(
                    &state.personality(),
                    state.active_preset(),
                ))
            }
            ShellCommand::Presets => Reply::Output(render::presets(lock(state).active_preset())),
            ShellCommand::Preset(preset) => {
                let mut state = lock(state);
                state.apply_preset(preset);
                Reply::Output(render::personality(&state.personality(), Some(preset)))
            }
            ShellCommand::Set(trait_name, value) => {
                let mut state = lock(state);
                state.edit_trait(trait_name, value)?;
                Reply::Output(render::personality(
                    &state.personality(),
                    state.active_preset(),
                ))
            }
            ShellCommand::Save(name) => {
                let name = name.unwrap_or_else(|| default_chat_name(self.locale, Local::now()));
                let saved = self.sessions.save(&name)?;
                Reply::Output(render::notice(&Notice::saved(self.locale, &saved.name)))
            }
            ShellCommand::Chats => Reply::Output(render::saved_chats(&self.sessions.list())),
            ShellCommand::Load(target) => {
                let Some(id) = self.resolve(&target) else {
                    return Ok(Reply::text("no such saved chat"));
                };
                let saved = self.sessions.load(id)?;
                let state = lock(state);
                Reply::Output(format!(
                    "Loaded \"{}\"\n{}\n{}",
                    saved.name,
                    render::personality(&state.personality(), state.active_preset()),
                    render::messages(state.messages())
                ))
            }
            ShellCommand::Delete(target) => {
                let Some(id) = self.resolve(&target) else {
                    return Ok(Reply::text("no such saved chat"));
                };
                let name = self
                    .sessions
                    .list()
                    .into_iter()
                    .find(|c| c.id == id)
                    .map(|c| c.name)
                    .unwrap_or_else(|| id.to_string());
                let reset = self.sessions.delete(id)?;
                let mut out = render::notice(&Notice::deleted(self.locale, &name));
                if reset {
                    out.push_str("\nStarted a new chat.");
                }
                Reply::Output(out)
            }
            ShellCommand::New => {
                self.sessions.new_chat()?;
                Reply::text("Started a new chat.")
            }
            ShellCommand::Help => Reply::text(HELP),
            ShellCommand::Quit => Reply::Quit,
        };
        Ok(reply)
    }

    fn resolve(&self, target: &ChatRef) -> Option<Uuid> {
        match target {
            ChatRef::Id(id) => Some(*id),
            ChatRef::Index(n) => n
                .checked_sub(1)
                .and_then(|i| self.sessions.list().get(i).map(|c| c.id)),
        }
    }

    /// The user and assistant lines of a finished turn.
    fn turn_output(&self, report: &TurnReport) -> String {
        let state = lock(self.orchestrator.state());
        let mut lines: Vec<String> = state
            .messages()
            .iter()
            .enumerate()
            .filter(|(_, m)| {
                m.id == report.assistant_message_id
                    || (m.id == report.user_message_id && m.transcription.is_some())
            })
            .map(|(i, m)| render::message(i, m))
            .collect();
        match &report.speech {
            SpeechOutcome::Failed(details) => {
                debug!(details = %details, "Reply was not spoken");
                lines.push(render::notice(&Notice::playback_failed(self.locale)));
            }
            SpeechOutcome::Played | SpeechOutcome::Skipped => {}
        }
        lines.join("\n")
    }
}
