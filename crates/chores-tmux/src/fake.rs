//! In-memory stand-in for tmux.
//!
//! Understands the subset of commands this crate issues, keeps sessions,
//! windows and panes in memory, and records every invocation so tests can
//! assert on what was sent.

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use crate::command::{Multiplexer, TmuxOutput};
use crate::error::TmuxError;

const NO_SERVER: &str = "no server running on /tmp/tmux-1000/default";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FakePane {
    pub id: String,
    pub title: String,
    /// Text typed into the pane; `Enter` key presses appear as `"<Enter>"`.
    pub typed: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FakeWindow {
    pub id: String,
    pub name: String,
    pub panes: Vec<FakePane>,
    pub options: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FakeSession {
    pub name: String,
    pub windows: Vec<FakeWindow>,
}

#[derive(Debug, Default)]
struct State {
    sessions: Vec<FakeSession>,
    next_window: u32,
    next_pane: u32,
    calls: Vec<Vec<String>>,
    ambient: Option<String>,
    failing: HashSet<String>,
    ignore_new_session: bool,
    phantom_windows: bool,
}

impl State {
    fn new_pane(&mut self) -> FakePane {
        self.next_pane += 1;
        FakePane {
            id: format!("%{}", self.next_pane),
            title: String::new(),
            typed: Vec::new(),
        }
    }

    fn new_window(&mut self, name: &str) -> FakeWindow {
        self.next_window += 1;
        let pane = self.new_pane();
        FakeWindow {
            id: format!("@{}", self.next_window),
            name: name.to_string(),
            panes: vec![pane],
            options: BTreeMap::new(),
        }
    }

    fn session_mut(&mut self, target: &str) -> Option<&mut FakeSession> {
        let name = session_target(target);
        self.sessions.iter_mut().find(|s| s.name == name)
    }

    fn window_mut(&mut self, id: &str) -> Option<&mut FakeWindow> {
        self.sessions
            .iter_mut()
            .flat_map(|s| s.windows.iter_mut())
            .find(|w| w.id == id)
    }

    fn pane_mut(&mut self, id: &str) -> Option<&mut FakePane> {
        self.sessions
            .iter_mut()
            .flat_map(|s| s.windows.iter_mut())
            .flat_map(|w| w.panes.iter_mut())
            .find(|p| p.id == id)
    }
}

#[derive(Debug)]
pub struct FakeTmux {
    binary: PathBuf,
    state: Mutex<State>,
}

impl Default for FakeTmux {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeTmux {
    #[must_use]
    pub fn new() -> Self {
        Self {
            binary: PathBuf::from("tmux"),
            state: Mutex::new(State::default()),
        }
    }

    /// Start with an existing session holding one shell window.
    #[must_use]
    pub fn with_session(self, name: &str) -> Self {
        {
            let mut state = self.lock();
            let window = state.new_window("shell");
            state.sessions.push(FakeSession {
                name: name.to_string(),
                windows: vec![window],
            });
        }
        self
    }

    /// Session reported by `display-message`; `None` makes the query fail.
    pub fn set_ambient(&self, session: Option<&str>) {
        self.lock().ambient = session.map(str::to_string);
    }

    /// Make every invocation of `subcommand` exit non-zero.
    pub fn fail_on(&self, subcommand: &str) {
        self.lock().failing.insert(subcommand.to_string());
    }

    pub fn clear_failures(&self) {
        self.lock().failing.clear();
    }

    /// `new-session` succeeds but creates nothing.
    pub fn ignore_session_creation(&self) {
        self.lock().ignore_new_session = true;
    }

    /// `new-window` prints an id but the window never shows up.
    pub fn phantom_windows(&self) {
        self.lock().phantom_windows = true;
    }

    /// Close a window behind the orchestrator's back.
    pub fn drop_window(&self, name: &str) {
        for session in &mut self.lock().sessions {
            session.windows.retain(|w| w.name != name);
        }
    }

    #[must_use]
    pub fn calls(&self) -> Vec<Vec<String>> {
        self.lock().calls.clone()
    }

    /// Number of invocations of `subcommand`.
    #[must_use]
    pub fn count(&self, subcommand: &str) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|call| call.first().is_some_and(|c| c == subcommand))
            .count()
    }

    #[must_use]
    pub fn has_session(&self, name: &str) -> bool {
        self.lock().sessions.iter().any(|s| s.name == name)
    }

    #[must_use]
    pub fn sessions(&self) -> Vec<FakeSession> {
        self.lock().sessions.clone()
    }

    /// Window names across all sessions.
    #[must_use]
    pub fn window_names(&self) -> Vec<String> {
        self.lock()
            .sessions
            .iter()
            .flat_map(|s| s.windows.iter().map(|w| w.name.clone()))
            .collect()
    }

    #[must_use]
    pub fn window(&self, name: &str) -> Option<FakeWindow> {
        self.lock()
            .sessions
            .iter()
            .flat_map(|s| s.windows.iter())
            .find(|w| w.name == name)
            .cloned()
    }

    /// The window whose name starts with `chore-<id>-`.
    #[must_use]
    pub fn chore_window(&self, id: u64) -> Option<FakeWindow> {
        let prefix = format!("chore-{id}-");
        self.lock()
            .sessions
            .iter()
            .flat_map(|s| s.windows.iter())
            .find(|w| w.name.starts_with(&prefix) || w.name == prefix.trim_end_matches('-'))
            .cloned()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl Multiplexer for FakeTmux {
    fn run(&self, args: &[&str]) -> Result<TmuxOutput, TmuxError> {
        let mut state = self.lock();
        state.calls.push(args.iter().map(|a| (*a).to_string()).collect());

        let Some((subcommand, rest)) = args.split_first() else {
            return Ok(fail("no command given"));
        };
        if state.failing.contains(*subcommand) {
            return Ok(fail("forced failure"));
        }
        let parsed = Parsed::new(rest);

        Ok(match *subcommand {
            "has-session" => {
                let target = parsed.value('t').unwrap_or_default();
                if state.session_mut(target).is_some() {
                    ok("")
                } else {
                    fail(&format!("can't find session: {}", session_target(target)))
                }
            }
            "new-session" => {
                let name = parsed.value('s').unwrap_or_default().to_string();
                if state.ignore_new_session {
                    ok("")
                } else if state.sessions.iter().any(|s| s.name == name) {
                    fail(&format!("duplicate session: {name}"))
                } else {
                    let window = state.new_window("shell");
                    state.sessions.push(FakeSession {
                        name,
                        windows: vec![window],
                    });
                    ok("")
                }
            }
            "display-message" => match &state.ambient {
                Some(name) => ok(&format!("{name}\n")),
                None => fail("no current client"),
            },
            "list-windows" => list_windows(&state, &parsed),
            "new-window" => {
                let name = parsed.value('n').unwrap_or_default().to_string();
                let target = parsed.value('t').unwrap_or_default().to_string();
                let phantom = state.phantom_windows;
                let window = state.new_window(&name);
                let id = window.id.clone();
                match state.session_mut(&target) {
                    Some(session) => {
                        if !phantom {
                            session.windows.push(window);
                        }
                        print_if(&parsed, &[("window_id", id.as_str())])
                    }
                    None => fail(&format!("can't find session: {}", session_target(&target))),
                }
            }
            "list-panes" => {
                let target = parsed.value('t').unwrap_or_default().to_string();
                let format = parsed.value('F').unwrap_or("#{pane_id}").to_string();
                match state.window_mut(&target) {
                    Some(window) => {
                        let lines: Vec<String> = window
                            .panes
                            .iter()
                            .enumerate()
                            .map(|(index, pane)| {
                                expand(
                                    &format,
                                    &[
                                        ("pane_id", pane.id.as_str()),
                                        ("pane_index", index.to_string().as_str()),
                                        ("pane_title", pane.title.as_str()),
                                    ],
                                )
                            })
                            .collect();
                        ok(&lines_out(&lines))
                    }
                    None => fail(&format!("can't find window: {target}")),
                }
            }
            "split-window" => {
                let target = parsed.value('t').unwrap_or_default().to_string();
                let pane = state.new_pane();
                let id = pane.id.clone();
                match state.window_mut(&target) {
                    Some(window) => {
                        window.panes.push(pane);
                        print_if(&parsed, &[("pane_id", id.as_str())])
                    }
                    None => fail(&format!("can't find window: {target}")),
                }
            }
            "select-pane" => {
                let target = parsed.value('t').unwrap_or_default().to_string();
                let title = parsed.value('T').map(str::to_string);
                match state.pane_mut(&target) {
                    Some(pane) => {
                        if let Some(title) = title {
                            pane.title = title;
                        }
                        ok("")
                    }
                    None => fail(&format!("can't find pane: {target}")),
                }
            }
            "send-keys" => {
                let target = parsed.value('t').unwrap_or_default().to_string();
                let literal = parsed.flag('l');
                let keys: Vec<String> = parsed
                    .positional
                    .iter()
                    .map(|k| {
                        if !literal && *k == "Enter" {
                            "<Enter>".to_string()
                        } else {
                            (*k).to_string()
                        }
                    })
                    .collect();
                match state.pane_mut(&target) {
                    Some(pane) => {
                        pane.typed.extend(keys);
                        ok("")
                    }
                    None => fail(&format!("can't find pane: {target}")),
                }
            }
            "kill-window" => {
                let target = parsed.value('t').unwrap_or_default().to_string();
                let mut found = false;
                for session in &mut state.sessions {
                    let before = session.windows.len();
                    session.windows.retain(|w| w.id != target);
                    found |= session.windows.len() != before;
                }
                if found {
                    ok("")
                } else {
                    fail(&format!("can't find window: {target}"))
                }
            }
            "kill-pane" => {
                let target = parsed.value('t').unwrap_or_default().to_string();
                let mut found = false;
                for session in &mut state.sessions {
                    for window in &mut session.windows {
                        let before = window.panes.len();
                        window.panes.retain(|p| p.id != target);
                        found |= window.panes.len() != before;
                    }
                    session.windows.retain(|w| !w.panes.is_empty());
                }
                if found {
                    ok("")
                } else {
                    fail(&format!("can't find pane: {target}"))
                }
            }
            "rename-window" => {
                let target = parsed.value('t').unwrap_or_default().to_string();
                let name = parsed.positional.first().map(|n| (*n).to_string());
                match (state.window_mut(&target), name) {
                    (Some(window), Some(name)) => {
                        window.name = name;
                        ok("")
                    }
                    (None, _) => fail(&format!("can't find window: {target}")),
                    (_, None) => fail("usage: rename-window [-t target-window] new-name"),
                }
            }
            "set-option" => {
                let target = parsed.value('t').unwrap_or_default().to_string();
                let (key, value) = match parsed.positional.as_slice() {
                    [key, value, ..] => ((*key).to_string(), (*value).to_string()),
                    _ => return Ok(fail("usage: set-option option value")),
                };
                match state.window_mut(&target) {
                    Some(window) => {
                        window.options.insert(key, value);
                        ok("")
                    }
                    None => fail(&format!("can't find window: {target}")),
                }
            }
            other => fail(&format!("unknown command: {other}")),
        })
    }

    fn binary(&self) -> &Path {
        &self.binary
    }
}

fn list_windows(state: &State, parsed: &Parsed<'_>) -> TmuxOutput {
    let format = parsed.value('F').unwrap_or("#{window_name}");
    let sessions: Vec<&FakeSession> = if parsed.flag('a') {
        if state.sessions.is_empty() {
            return fail(NO_SERVER);
        }
        state.sessions.iter().collect()
    } else {
        let target = parsed.value('t').unwrap_or_default();
        let name = session_target(target);
        match state.sessions.iter().find(|s| s.name == name) {
            Some(session) => vec![session],
            None => return fail(&format!("can't find session: {name}")),
        }
    };

    let lines: Vec<String> = sessions
        .iter()
        .flat_map(|session| {
            let last = session.windows.len().saturating_sub(1);
            session.windows.iter().enumerate().map(move |(index, window)| {
                let active = if index == last { "1" } else { "0" };
                expand(
                    format,
                    &[
                        ("session_name", session.name.as_str()),
                        ("window_id", window.id.as_str()),
                        ("window_active", active),
                        ("window_name", window.name.as_str()),
                    ],
                )
            })
        })
        .collect();
    ok(&lines_out(&lines))
}

fn session_target(target: &str) -> &str {
    let target = target.strip_prefix('=').unwrap_or(target);
    target.split(':').next().unwrap_or(target)
}

fn expand(format: &str, vars: &[(&str, &str)]) -> String {
    vars.iter().fold(format.to_string(), |acc, (key, value)| {
        acc.replace(&format!("#{{{key}}}"), value)
    })
}

fn lines_out(lines: &[String]) -> String {
    lines.iter().map(|l| format!("{l}\n")).collect()
}

fn print_if(parsed: &Parsed<'_>, vars: &[(&str, &str)]) -> TmuxOutput {
    if parsed.flag('P') {
        let format = parsed.value('F').unwrap_or("#{window_id}");
        ok(&format!("{}\n", expand(format, vars)))
    } else {
        ok("")
    }
}

fn ok(stdout: &str) -> TmuxOutput {
    TmuxOutput {
        status: Some(0),
        stdout: stdout.to_string(),
        stderr: String::new(),
    }
}

fn fail(stderr: &str) -> TmuxOutput {
    TmuxOutput {
        status: Some(1),
        stdout: String::new(),
        stderr: format!("{stderr}\n"),
    }
}

/// Flags that consume the following argument.
const VALUE_FLAGS: &[char] = &['t', 's', 'n', 'F', 'c', 'T'];

struct Parsed<'a> {
    values: Vec<(char, &'a str)>,
    flags: Vec<char>,
    positional: Vec<&'a str>,
}

impl<'a> Parsed<'a> {
    fn new(args: &[&'a str]) -> Self {
        let mut parsed = Self {
            values: Vec::new(),
            flags: Vec::new(),
            positional: Vec::new(),
        };
        let mut iter = args.iter().copied();
        while let Some(arg) = iter.next() {
            let flag = arg
                .strip_prefix('-')
                .filter(|f| f.chars().count() == 1)
                .and_then(|f| f.chars().next());
            match flag {
                Some(c) if VALUE_FLAGS.contains(&c) => {
                    parsed.values.push((c, iter.next().unwrap_or_default()));
                }
                Some(c) => parsed.flags.push(c),
                None => parsed.positional.push(arg),
            }
        }
        parsed
    }

    fn value(&self, flag: char) -> Option<&'a str> {
        self.values.iter().find(|(c, _)| *c == flag).map(|(_, v)| *v)
    }

    fn flag(&self, flag: char) -> bool {
        self.flags.contains(&flag)
    }
}
