//! Line-driven terminal front end. It stands in for the app's screens: each
//! line is a button press, and `bg` / `inactive` / `fg` play the role of the
//! operating system moving the app in and out of the foreground.

use std::str::FromStr;

use anyhow::{anyhow, bail, Error, Result};
use tokio::{
    io::{self, AsyncBufReadExt, BufReader},
    sync::mpsc,
};

use crate::{
    lifecycle::AppLifecycle,
    report::ReportSummary,
    timer::{
        format_clock, Notifier, Prompt, PromptKind, Prompter, ResetChoice, ResetOutcome,
        SessionEnd, TimerSnapshot,
    },
    AppState,
};

const HELP: &str = "\
commands:
  start | pause | resume | t        control the countdown
  reset, then save | discard        end the session early
  yes | no                          answer the welcome-back question
  +N | -N                           change the target by N minutes
  cat NAME | cats                   select or list categories
  addcat NAME | rmcat NAME          edit the category list
  bg | inactive | fg                simulate leaving / returning to the app
  status | report | history | quit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Command {
    Start,
    Pause,
    Resume,
    Toggle,
    Reset,
    Resolve(ResetChoice),
    AnswerResume(bool),
    Adjust(i32),
    Select(String),
    Categories,
    AddCategory(String),
    RemoveCategory(String),
    Lifecycle(AppLifecycle),
    Status,
    Report,
    History,
    Help,
    Quit,
}

impl FromStr for Command {
    type Err = Error;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim();
        let (word, rest) = match line.split_once(' ') {
            Some((word, rest)) => (word, rest.trim()),
            None => (line, ""),
        };

        let command = match word {
            "start" => Command::Start,
            "pause" => Command::Pause,
            "resume" => Command::Resume,
            "t" | "toggle" => Command::Toggle,
            "reset" => Command::Reset,
            "save" => Command::Resolve(ResetChoice::Save),
            "discard" => Command::Resolve(ResetChoice::Discard),
            "yes" | "y" => Command::AnswerResume(true),
            "no" | "n" => Command::AnswerResume(false),
            "cats" => Command::Categories,
            "cat" | "addcat" | "rmcat" if rest.is_empty() => {
                bail!("'{word}' needs a category name")
            }
            "cat" => Command::Select(rest.to_string()),
            "addcat" => Command::AddCategory(rest.to_string()),
            "rmcat" => Command::RemoveCategory(rest.to_string()),
            "bg" => Command::Lifecycle(AppLifecycle::Background),
            "inactive" => Command::Lifecycle(AppLifecycle::Inactive),
            "fg" => Command::Lifecycle(AppLifecycle::Active),
            "status" | "s" => Command::Status,
            "report" => Command::Report,
            "history" => Command::History,
            "help" | "?" => Command::Help,
            "quit" | "exit" | "q" => Command::Quit,
            other if other.starts_with('+') || other.starts_with('-') => {
                let delta = other
                    .parse::<i32>()
                    .map_err(|_| anyhow!("'{other}' is not a number of minutes"))?;
                Command::Adjust(delta)
            }
            other => bail!("unknown command '{other}' (try 'help')"),
        };
        Ok(command)
    }
}

/// Prints prompts and notices straight to the terminal.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleHost;

impl Prompter for ConsoleHost {
    fn present(&self, prompt: Prompt) {
        let answers = match prompt.kind {
            PromptKind::ResumeAfterReturn => "yes / no",
            PromptKind::SaveOrDiscard => "save / discard",
        };
        println!("\n== {} ==\n{}\n[{}]", prompt.title, prompt.message, answers);
    }
}

impl Notifier for ConsoleHost {
    fn notify(&self, title: &str, body: &str) {
        println!("\n** {title} **\n{body}");
    }
}

pub(crate) async fn run(app: AppState) -> Result<()> {
    let (lifecycle_tx, lifecycle_rx) = mpsc::channel(16);
    app.timer
        .attach_lifecycle(lifecycle_rx, AppLifecycle::Active)
        .await;

    println!("{HELP}\n");
    print_status(&app.timer.get_snapshot().await);

    let mut lines = BufReader::new(io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let command = match line.parse::<Command>() {
            Ok(command) => command,
            Err(err) => {
                println!("{err}");
                continue;
            }
        };
        if command == Command::Quit {
            break;
        }
        if let Command::Lifecycle(signal) = command {
            lifecycle_tx.send(signal).await?;
            continue;
        }
        execute(&app, command).await;
    }

    app.timer.shutdown().await;
    Ok(())
}

async fn execute(app: &AppState, command: Command) {
    let timer = &app.timer;
    let accepted = match command {
        Command::Start => timer.start().await,
        Command::Pause => timer.pause().await,
        Command::Resume => timer.resume().await,
        Command::Toggle => timer.toggle().await,
        Command::Reset => timer.reset().await != ResetOutcome::Ignored,
        Command::Resolve(choice) => match timer.resolve_reset(choice).await {
            Some(SessionEnd::Discarded) => {
                println!("Session discarded.");
                true
            }
            Some(_) => true,
            None => false,
        },
        Command::AnswerResume(accept) => timer.answer_resume_prompt(accept).await,
        Command::Adjust(delta) => app.adjust_target(delta).await,
        Command::Select(name) => app.select_category(&name).await,
        Command::Categories => {
            let selected = timer.get_snapshot().await.state.selected_category;
            for name in app.settings.categories() {
                let marker = if name == selected { '*' } else { ' ' };
                println!(" {marker} {name}");
            }
            return;
        }
        Command::AddCategory(name) => report_result(app.settings.add_category(&name)),
        Command::RemoveCategory(name) => report_result(app.remove_category(&name).await),
        Command::Status => {
            print_status(&timer.get_snapshot().await);
            return;
        }
        Command::Report => {
            print_report(&app.report().await);
            return;
        }
        Command::History => {
            for record in app.store.list_all().await.iter().take(10) {
                let when = record
                    .created_at
                    .map(|at| at.with_timezone(&chrono::Local).format("%d %b %H:%M").to_string())
                    .unwrap_or_else(|| "-".into());
                println!(
                    "{when}  {:<12} {} / {}  {:>3}%  {} distractions  {}",
                    record.category,
                    format_clock(record.actual_duration_secs),
                    format_clock(record.target_duration_secs),
                    record.success_rate,
                    record.distraction_count,
                    record.status.as_str()
                );
            }
            return;
        }
        Command::Help => {
            println!("{HELP}");
            return;
        }
        Command::Lifecycle(_) | Command::Quit => return,
    };

    if accepted {
        print_status(&timer.get_snapshot().await);
    } else {
        println!("not possible right now");
    }
}

fn report_result(result: Result<()>) -> bool {
    match result {
        Ok(()) => true,
        Err(err) => {
            println!("{err}");
            false
        }
    }
}

fn print_status(snapshot: &TimerSnapshot) {
    let state = &snapshot.state;
    let activity = if snapshot.is_running {
        format!("{} in progress...", state.selected_category)
    } else if snapshot.is_session_active {
        "Paused".to_string()
    } else {
        "Ready?".to_string()
    };
    println!(
        "[{}] {} | {} | target {} min",
        state.selected_category, snapshot.clock, activity, state.target_minutes
    );
    if snapshot.is_session_active {
        println!("Distractions: {}", state.distraction_count);
    }
}

fn print_report(summary: &ReportSummary) {
    println!(
        "today {} min | all time {} min | {} distractions | {} sessions ({} completed)",
        summary.today_minutes,
        summary.total_minutes,
        summary.total_distractions,
        summary.session_count,
        summary.completed_count
    );
    if let Some(rate) = summary.average_success_rate {
        println!("average success {rate:.0}%");
    }
    println!("last 7 days:");
    for day in &summary.daily {
        println!("  {} {:>4} min", day.label, day.minutes);
    }
    if !summary.categories.is_empty() {
        println!("by category:");
        for total in &summary.categories {
            println!("  {:<12} {:>4} min", total.category, total.minutes);
        }
    }
}
