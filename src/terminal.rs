use std::str::FromStr;
use std::sync::Mutex;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};

use crate::controller::SyncController;
use crate::error::SyncError;
use crate::frontend::Frontend;
use crate::types::{Document, SaveStatus, SyncState};

const HELP: &str = "\
commands (notes are numbered from 1):
  add                  append a blank note
  text <n> <words...>  replace the text of note n
  del <n>              delete note n
  bs <n>               delete note n if it is blank
  color <n>            cycle the colour of note n
  move <from> <to>     move a note to another position
  show                 list the notes
  status               show the save status
  new                  start a new document
  quit                 leave (asks again while a save is pending)";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Add,
    Text(usize, String),
    Delete(usize),
    DeleteIfBlank(usize),
    Color(usize),
    Move(usize, usize),
    Show,
    Status,
    New,
    Help,
    Quit,
}

/// Parse a 1-based note number into an index.
fn note_index(arg: Option<&str>) -> Result<usize, String> {
    let arg = arg.ok_or("missing note number")?;
    match arg.parse::<usize>() {
        Ok(n) if n > 0 => Ok(n - 1),
        _ => Err(format!("not a note number: {arg}")),
    }
}

impl FromStr for Command {
    type Err = String;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim();
        let (word, rest) = line.split_once(' ').unwrap_or((line, ""));
        let mut args = rest.split_whitespace();
        let command = match word {
            "add" | "a" => Command::Add,
            "text" | "t" => {
                let index = note_index(args.next())?;
                let text = rest.trim_start().split_once(' ').map_or("", |(_, t)| t);
                Command::Text(index, text.to_string())
            }
            "del" | "d" => Command::Delete(note_index(args.next())?),
            "bs" => Command::DeleteIfBlank(note_index(args.next())?),
            "color" | "c" => Command::Color(note_index(args.next())?),
            "move" | "m" => {
                let from = note_index(args.next())?;
                let to = note_index(args.next())?;
                Command::Move(from, to)
            }
            "show" | "s" | "ls" => Command::Show,
            "status" => Command::Status,
            "new" => Command::New,
            "help" | "?" => Command::Help,
            "quit" | "q" | "exit" => Command::Quit,
            other => return Err(format!("unknown command: {other} (try `help`)")),
        };
        Ok(command)
    }
}

/// Prints save status transitions and location changes to stdout.
#[derive(Debug, Default)]
pub struct TerminalFrontend {
    last_status: Mutex<Option<SaveStatus>>,
}

impl Frontend for TerminalFrontend {
    fn sync_state_changed(&self, state: &SyncState) {
        let mut last = self.last_status.lock().unwrap_or_else(|e| e.into_inner());
        if *last != Some(state.status) {
            *last = Some(state.status);
            println!("[{}]", status_label(state.status));
        }
    }

    fn location_changed(&self, path: &str) {
        println!("location: {path}");
    }
}

fn status_label(status: SaveStatus) -> &'static str {
    match status {
        SaveStatus::Saving => "saving",
        SaveStatus::Saved => "saved",
        SaveStatus::Error => "error",
    }
}

fn print_document(doc: &Document) {
    match &doc.remote_id {
        Some(id) => println!("document /{id}"),
        None => println!("document (not saved yet)"),
    }
    for (i, note) in doc.notes.iter().enumerate() {
        println!("{:>3}. {} {}", i + 1, note.color, note.text);
    }
}

fn print_state(state: &SyncState) {
    let saved_at = state
        .last_saved_at
        .map(|t| t.format("%H:%M:%S").to_string())
        .unwrap_or_else(|| "never".to_string());
    println!(
        "status: {}, last saved: {saved_at}, unsaved changes: {}",
        status_label(state.status),
        state.has_unsaved_changes
    );
}

/// Run one command. Returns false when the session should end.
async fn execute(controller: &SyncController, command: Command) -> Result<bool, SyncError> {
    match command {
        Command::Add => {
            let index = controller.add_note().await;
            println!("added note {}", index + 1);
        }
        Command::Text(index, text) => controller.set_text(index, text).await?,
        Command::Delete(index) => {
            controller.delete_note(index).await?;
        }
        Command::DeleteIfBlank(index) => {
            if !controller.delete_if_blank(index).await? {
                println!("note {} is not blank", index + 1);
            }
        }
        Command::Color(index) => controller.cycle_color(index).await?,
        Command::Move(from, to) => controller.move_note(from, to).await?,
        Command::Show => print_document(&controller.document().await),
        Command::Status => print_state(&controller.sync_state().await),
        Command::New => controller.reset().await,
        Command::Help => println!("{HELP}"),
        Command::Quit => return Ok(false),
    }
    Ok(true)
}

/// Open `path` and edit the document from stdin until `quit` or end of input.
pub async fn run(controller: SyncController, path: &str) -> anyhow::Result<()> {
    run_with(controller, path, BufReader::new(tokio::io::stdin())).await
}

async fn run_with<R>(controller: SyncController, path: &str, input: R) -> anyhow::Result<()>
where
    R: AsyncBufRead + Unpin,
{
    controller.open(path).await;
    print_document(&controller.document().await);

    let mut lines = input.lines();
    let mut warned = false;
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let command = match line.parse::<Command>() {
            Ok(c) => c,
            Err(e) => {
                eprintln!("{e}");
                continue;
            }
        };
        if command == Command::Quit && !warned && controller.should_warn_on_unload().await {
            println!("You have unsaved changes. Type quit again to leave anyway.");
            warned = true;
            continue;
        }
        match execute(&controller, command).await {
            Ok(true) => {}
            Ok(false) => {
                // Leaving drops unsaved edits, but never cuts off a request.
                controller.wait_idle().await;
                return Ok(());
            }
            Err(e) => eprintln!("{e}"),
        }
    }

    // End of input: let the call in flight finish, then push out whatever is
    // still waiting on the debounce.
    controller.settle().await;
    if controller.sync_state().await.status == SaveStatus::Error {
        eprintln!("last save failed; recent edits were not stored");
    }
    Ok(())
}
