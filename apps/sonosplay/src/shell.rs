//! Interactive shell.
//!
//! The loop in [`run`] is the single coordinating context. It owns the UI
//! state (chosen file, pending work) and never awaits device I/O itself:
//! discovery, play, stop and volume commands run as spawned tasks that report
//! back over an mpsc channel. Stdin is read by its own task too.

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use sonosplay_core::{
    Group, PlayOutcome, PlaybackController, SonosPlayResult, StopOutcome, VolumeReport,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

use crate::shutdown_signal;

const HELP: &str = "\
Commands:
  refresh             discover speakers again
  groups              list groups
  select <n|label>    choose a group by number or label
  file <path>         choose the file to play
  play [path]         play the chosen file on the chosen group
  stop                stop playback and the media server
  volume [0-100]      show or set the chosen group's volume
  status              show selection and playback state
  quit                stop playback and exit";

/// A parsed shell line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Refresh,
    Groups,
    Select(String),
    File(PathBuf),
    Play(Option<PathBuf>),
    Stop,
    Volume(Option<u8>),
    Status,
    Help,
    Quit,
}

/// Parses one input line. Blank lines yield `Ok(None)`.
pub fn parse_command(line: &str) -> Result<Option<Command>, String> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };

    let command = match word.to_ascii_lowercase().as_str() {
        "refresh" | "r" => Command::Refresh,
        "groups" | "g" | "ls" => Command::Groups,
        "select" | "s" if rest.is_empty() => return Err("usage: select <n|label>".into()),
        "select" | "s" => Command::Select(rest.to_string()),
        "file" | "f" if rest.is_empty() => return Err("usage: file <path>".into()),
        "file" | "f" => Command::File(PathBuf::from(rest)),
        "play" | "p" => Command::Play((!rest.is_empty()).then(|| PathBuf::from(rest))),
        "stop" => Command::Stop,
        "volume" | "vol" | "v" if rest.is_empty() => Command::Volume(None),
        "volume" | "vol" | "v" => match rest.parse::<u8>() {
            Ok(level) if level <= 100 => Command::Volume(Some(level)),
            _ => return Err(format!("volume must be 0-100, got {}", rest)),
        },
        "status" => Command::Status,
        "help" | "?" => Command::Help,
        "quit" | "exit" | "q" => Command::Quit,
        other => return Err(format!("unknown command: {} (try help)", other)),
    };
    Ok(Some(command))
}

/// Results handed back from background tasks.
enum Outcome {
    Refreshed(Vec<Group>),
    Played(SonosPlayResult<PlayOutcome>),
    Stopped(SonosPlayResult<StopOutcome>),
    VolumeSet {
        label: String,
        level: u8,
        result: SonosPlayResult<VolumeReport>,
    },
    VolumeRead {
        label: String,
        result: SonosPlayResult<u8>,
    },
}

enum Event {
    Line(String),
    InputClosed,
    Done(Outcome),
}

struct Shell {
    controller: Arc<PlaybackController>,
    tx: mpsc::UnboundedSender<Event>,
    file: Option<PathBuf>,
    pending: usize,
}

impl Shell {
    fn spawn<F>(&mut self, work: F)
    where
        F: std::future::Future<Output = Outcome> + Send + 'static,
    {
        self.pending += 1;
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let outcome = work.await;
            let _ = tx.send(Event::Done(outcome));
        });
    }

    /// Handles one command. Returns `false` when the shell should exit.
    fn dispatch(&mut self, command: Command) -> bool {
        let controller = Arc::clone(&self.controller);
        match command {
            Command::Refresh => {
                println!("Discovering Sonos speakers...");
                self.spawn(async move { Outcome::Refreshed(controller.refresh_groups().await) });
            }
            Command::Groups => print_groups(&self.controller.groups()),
            Command::Select(choice) => self.select(&choice),
            Command::File(path) => self.choose_file(path),
            Command::Play(path) => {
                if let Some(path) = path {
                    self.choose_file(path);
                }
                let file = self.file.clone().unwrap_or_default();
                println!("Starting playback...");
                self.spawn(async move { Outcome::Played(controller.play_selected(&file).await) });
            }
            Command::Stop => {
                self.spawn(async move { Outcome::Stopped(controller.stop_active().await) });
            }
            Command::Volume(level) => {
                let Some(label) = self.controller.selected() else {
                    println!("Select a group first.");
                    return true;
                };
                match level {
                    Some(level) => self.spawn(async move {
                        let result = controller.set_volume(&label, level).await;
                        Outcome::VolumeSet {
                            label,
                            level,
                            result,
                        }
                    }),
                    None => self.spawn(async move {
                        let result = controller.get_display_volume(&label).await;
                        Outcome::VolumeRead { label, result }
                    }),
                }
            }
            Command::Status => self.print_status(),
            Command::Help => println!("{}", HELP),
            Command::Quit => return false,
        }
        true
    }

    fn select(&mut self, choice: &str) {
        let groups = self.controller.groups();
        let label = match choice.parse::<usize>() {
            Ok(n) if (1..=groups.len()).contains(&n) => groups[n - 1].label.clone(),
            _ => choice.to_string(),
        };
        match self.controller.select_group(&label) {
            Ok(()) => println!("Selected {}", label),
            Err(e) => println!("{}", e),
        }
    }

    fn choose_file(&mut self, path: PathBuf) {
        if path.is_file() {
            println!("File: {}", path.display());
        } else {
            println!("Warning: {} is not a readable file", path.display());
        }
        self.file = Some(path);
    }

    fn print_status(&self) {
        let show = |value: Option<String>| value.unwrap_or_else(|| "-".into());
        println!("Group:   {}", show(self.controller.selected()));
        println!(
            "File:    {}",
            show(self.file.as_ref().map(|f| f.display().to_string()))
        );
        println!("Playing: {}", show(self.controller.active()));
        if self.pending > 0 {
            println!("Busy:    {} command(s) in flight", self.pending);
        }
    }

    fn complete(&mut self, outcome: Outcome) {
        self.pending = self.pending.saturating_sub(1);
        match outcome {
            Outcome::Refreshed(groups) => {
                let speakers: usize = groups.iter().map(|g| g.members.len()).sum();
                println!(
                    "Found {} speaker{} in {} group{}",
                    speakers,
                    plural(speakers),
                    groups.len(),
                    plural(groups.len())
                );
                print_groups(&groups);
            }
            Outcome::Played(Ok(outcome)) => {
                println!("Playing on {}", outcome.label);
                log::info!("Serving {}", outcome.url);
            }
            Outcome::Played(Err(e)) => println!("Playback failed: {}", e),
            Outcome::Stopped(Ok(StopOutcome::Stopped(label))) => println!("Stopped {}", label),
            Outcome::Stopped(Ok(StopOutcome::NothingPlaying)) => println!("Nothing playing"),
            Outcome::Stopped(Err(e)) => println!("Stop failed: {}", e),
            Outcome::VolumeSet {
                label,
                level,
                result,
            } => match result {
                Ok(report) if report.is_complete() => println!("{}: volume {}", label, level),
                Ok(report) => {
                    println!(
                        "{}: volume {} on {} of {} speakers",
                        label, level, report.success, report.total
                    );
                    for (device, error) in report.failures {
                        log::debug!("Volume failed on {}: {}", device, error);
                    }
                }
                Err(e) => println!("{}", e),
            },
            Outcome::VolumeRead { label, result } => match result {
                Ok(level) => println!("{}: volume {}", label, level),
                Err(e) => println!("Could not read volume: {}", e),
            },
        }
    }
}

fn plural(n: usize) -> &'static str {
    if n == 1 {
        ""
    } else {
        "s"
    }
}

fn print_groups(groups: &[Group]) {
    if groups.is_empty() {
        println!("No speakers found.");
        return;
    }
    for (i, group) in groups.iter().enumerate() {
        println!("  {}. {}", i + 1, group.label);
    }
}

fn prompt() {
    print!("> ");
    let _ = std::io::stdout().flush();
}

/// Runs the shell until `quit`, end of input, or a shutdown signal.
pub async fn run(controller: Arc<PlaybackController>) {
    let (tx, mut rx) = mpsc::unbounded_channel();

    let input_tx = tx.clone();
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    if input_tx.send(Event::Line(line)).is_err() {
                        break;
                    }
                }
                Ok(None) | Err(_) => {
                    let _ = input_tx.send(Event::InputClosed);
                    break;
                }
            }
        }
    });

    let mut shell = Shell {
        controller,
        tx,
        file: None,
        pending: 0,
    };

    println!("SonosPlay - type 'help' for commands");
    shell.dispatch(Command::Refresh);

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        prompt();
        let event = tokio::select! {
            _ = &mut shutdown => break,
            event = rx.recv() => match event {
                Some(event) => event,
                None => break,
            },
        };

        match event {
            Event::Line(line) => match parse_command(&line) {
                Ok(Some(command)) => {
                    if !shell.dispatch(command) {
                        break;
                    }
                }
                Ok(None) => {}
                Err(message) => println!("{}", message),
            },
            Event::InputClosed => break,
            Event::Done(outcome) => shell.complete(outcome),
        }
    }
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_commands_and_arguments() {
        assert_eq!(parse_command("refresh"), Ok(Some(Command::Refresh)));
        assert_eq!(
            parse_command("  select  Kitchen + Office "),
            Ok(Some(Command::Select("Kitchen + Office".into())))
        );
        assert_eq!(
            parse_command("play /music/My Song.mp3"),
            Ok(Some(Command::Play(Some(PathBuf::from("/music/My Song.mp3")))))
        );
        assert_eq!(parse_command("PLAY"), Ok(Some(Command::Play(None))));
        assert_eq!(parse_command("volume 35"), Ok(Some(Command::Volume(Some(35)))));
        assert_eq!(parse_command("v"), Ok(Some(Command::Volume(None))));
        assert_eq!(parse_command("q"), Ok(Some(Command::Quit)));
    }

    #[test]
    fn blank_lines_are_ignored() {
        assert_eq!(parse_command("   "), Ok(None));
    }

    #[test]
    fn rejects_bad_input() {
        assert!(parse_command("volume 101").is_err());
        assert!(parse_command("volume loud").is_err());
        assert!(parse_command("select").is_err());
        assert!(parse_command("file").is_err());
        assert!(parse_command("dance").is_err());
    }
}
