//! services/app/src/driver.rs
//!
//! A line-oriented front end for the app: parses commands typed on stdin,
//! applies them to the `ShortcutApp` and renders the mounted screen as text.

use crate::app::{ActiveScreen, ShortcutApp};
use crate::context::NoticeLevel;
use crate::error::AppError;
use crate::screens::{DetailMode, FormField, LoadState};
use shortcut_core::domain::Article;
use shortcut_core::navigation::{BackOutcome, Screen};
use std::fmt::Write as _;
use std::str::FromStr;
use std::time::Instant;
use tracing::debug;

pub const HELP: &str = "\
commands:
  login <email> <password>          sign in (from the login screen)
  signup <name> <email> <password> <confirm>
  show-login | show-signup | welcome
  home | saved | profile            switch tab
  open <n>                          open the n-th listed article
  full                              read the full article
  like [n] | save [n] | share [n]   act on the n-th article, or the open one
  unsave <n> | clear-all            on the saved screen
  scroll <offset> <content> <viewport>
  refresh | notifications | theme | sign-out
  back | show | help | quit";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("unknown command '{0}' (try 'help')")]
    Unknown(String),
    #[error("usage: {0}")]
    Usage(&'static str),
    #[error("'{0}' is not available on the {1} screen")]
    WrongScreen(&'static str, &'static str),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Help,
    Show,
    Quit,
    ShowLogin,
    ShowSignup,
    Welcome,
    Login { email: String, password: String },
    Signup { name: String, email: String, password: String, confirm: String },
    Go(Screen),
    Open(usize),
    Full,
    Like(Option<usize>),
    Save(Option<usize>),
    Share(Option<usize>),
    Unsave(usize),
    ClearAll,
    Scroll { offset: f64, content: f64, viewport: f64 },
    Refresh,
    Notifications,
    Theme,
    SignOut,
    Back,
}

/// Whether the driver loop should keep going.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

fn index(arg: Option<&str>, usage: &'static str) -> Result<Option<usize>, CommandError> {
    arg.map(|raw| {
        raw.parse::<usize>()
            .map_err(|_| CommandError::Usage(usage))
    })
    .transpose()
}

fn number(arg: Option<&str>, usage: &'static str) -> Result<f64, CommandError> {
    arg.and_then(|raw| raw.parse::<f64>().ok())
        .ok_or(CommandError::Usage(usage))
}

impl FromStr for Command {
    type Err = CommandError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let Some(head) = words.next() else {
            return Ok(Command::Show);
        };
        let args: Vec<&str> = words.collect();
        let arg = |i: usize| args.get(i).copied();

        let command = match head.to_lowercase().as_str() {
            "help" | "?" => Command::Help,
            "show" | "ls" => Command::Show,
            "quit" | "exit" => Command::Quit,
            "show-login" => Command::ShowLogin,
            "show-signup" => Command::ShowSignup,
            "welcome" => Command::Welcome,
            "login" => match args.as_slice() {
                [email, password] => Command::Login {
                    email: email.to_string(),
                    password: password.to_string(),
                },
                _ => return Err(CommandError::Usage("login <email> <password>")),
            },
            "signup" => match args.as_slice() {
                [name, email, password, confirm] => Command::Signup {
                    name: name.to_string(),
                    email: email.to_string(),
                    password: password.to_string(),
                    confirm: confirm.to_string(),
                },
                _ => return Err(CommandError::Usage("signup <name> <email> <password> <confirm>")),
            },
            "home" => Command::Go(Screen::Home),
            "saved" => Command::Go(Screen::Saved),
            "profile" => Command::Go(Screen::Profile),
            "open" => Command::Open(
                index(arg(0), "open <n>")?.ok_or(CommandError::Usage("open <n>"))?,
            ),
            "full" => Command::Full,
            "like" => Command::Like(index(arg(0), "like [n]")?),
            "save" => Command::Save(index(arg(0), "save [n]")?),
            "share" => Command::Share(index(arg(0), "share [n]")?),
            "unsave" => Command::Unsave(
                index(arg(0), "unsave <n>")?.ok_or(CommandError::Usage("unsave <n>"))?,
            ),
            "clear-all" => Command::ClearAll,
            "scroll" => {
                const USAGE: &str = "scroll <offset> <content> <viewport>";
                Command::Scroll {
                    offset: number(arg(0), USAGE)?,
                    content: number(arg(1), USAGE)?,
                    viewport: number(arg(2), USAGE)?,
                }
            }
            "refresh" => Command::Refresh,
            "notifications" => Command::Notifications,
            "theme" => Command::Theme,
            "sign-out" | "logout" => Command::SignOut,
            "back" => Command::Back,
            other => return Err(CommandError::Unknown(other.to_string())),
        };
        Ok(command)
    }
}

//=========================================================================================
// Execution
//=========================================================================================

/// Applies one command. Toggles are spawned so the optimistic flip shows at once.
pub async fn execute(app: &mut ShortcutApp, command: Command) -> Result<Flow, AppError> {
    debug!(?command, "Executing command.");
    let ctx = app.context().clone();
    let screen = app.active().name();

    match command {
        Command::Help => println!("{}", HELP),
        Command::Show => {}
        Command::Quit => return Ok(Flow::Exit),
        Command::ShowLogin => app.show_login().await?,
        Command::ShowSignup => app.show_signup().await?,
        Command::Welcome => app.back_to_welcome().await?,
        Command::Login { email, password } => match app.active_mut() {
            ActiveScreen::Login(form) => {
                form.set(FormField::Email, &email);
                form.set(FormField::Password, &password);
                form.submit(&ctx).await;
                report_form_errors(form.errors().values());
            }
            _ => return Err(CommandError::WrongScreen("login", screen).into()),
        },
        Command::Signup {
            name,
            email,
            password,
            confirm,
        } => match app.active_mut() {
            ActiveScreen::Signup(form) => {
                form.set(FormField::Name, &name);
                form.set(FormField::Email, &email);
                form.set(FormField::Password, &password);
                form.set(FormField::ConfirmPassword, &confirm);
                form.submit(&ctx).await;
                report_form_errors(form.errors().values());
            }
            _ => return Err(CommandError::WrongScreen("signup", screen).into()),
        },
        Command::Go(target) => app.navigate(target).await?,
        Command::Open(n) => app.open_article(n).await?,
        Command::Full => app.open_full_article().await?,
        Command::Like(n) => toggle(app, n, Toggle::Like)?,
        Command::Save(n) => toggle(app, n, Toggle::Save)?,
        Command::Share(n) => match (app.active(), n) {
            (ActiveScreen::Feed(feed), Some(n)) => {
                let id = listed(feed.article(n), n)?.id.clone();
                feed.share(&id);
            }
            (ActiveScreen::Saved(saved), Some(n)) => {
                let id = listed(saved.article(n), n)?.id.clone();
                saved.share(&id);
            }
            (ActiveScreen::Detail(detail), None) => detail.share(),
            _ => return Err(CommandError::Usage("share <n> on a list, share on an article").into()),
        },
        Command::Unsave(n) => match app.active() {
            ActiveScreen::Saved(saved) => {
                let id = listed(saved.article(n), n)?.id.clone();
                if let Some(pending) = saved.unsave(&id) {
                    tokio::spawn(pending);
                }
            }
            _ => return Err(CommandError::WrongScreen("unsave", screen).into()),
        },
        Command::ClearAll => match app.active() {
            ActiveScreen::Saved(saved) => {
                tokio::spawn(saved.clear_all());
            }
            _ => return Err(CommandError::WrongScreen("clear-all", screen).into()),
        },
        Command::Scroll {
            offset,
            content,
            viewport,
        } => match app.active_mut() {
            ActiveScreen::Detail(detail) => {
                let fraction = detail.on_scroll(offset, content, viewport);
                println!("progress: {:.0}%", fraction * 100.0);
            }
            _ => return Err(CommandError::WrongScreen("scroll", screen).into()),
        },
        Command::Refresh => match app.active_mut() {
            ActiveScreen::Feed(feed) => feed.refresh().await,
            ActiveScreen::Saved(saved) => saved.refresh().await,
            ActiveScreen::Profile(profile) => profile.refresh().await,
            _ => return Err(CommandError::WrongScreen("refresh", screen).into()),
        },
        Command::Notifications => match app.active() {
            ActiveScreen::Profile(profile) => {
                profile.toggle_notifications();
            }
            _ => return Err(CommandError::WrongScreen("notifications", screen).into()),
        },
        Command::Theme => {
            let theme = ctx.toggle_theme();
            println!("theme: {}", if theme.is_dark { "dark" } else { "light" });
        }
        Command::SignOut => match app.active() {
            ActiveScreen::Profile(profile) => {
                // Failure is reported as a notice; the session stays as it was.
                let _ = profile.sign_out().await;
            }
            _ => return Err(CommandError::WrongScreen("sign-out", screen).into()),
        },
        Command::Back => match app.back(Instant::now()).await {
            BackOutcome::Exit => return Ok(Flow::Exit),
            BackOutcome::Popped | BackOutcome::ExitHint | BackOutcome::Ignored => {}
        },
    }
    Ok(Flow::Continue)
}

#[derive(Debug, Clone, Copy)]
enum Toggle {
    Like,
    Save,
}

fn toggle(app: &ShortcutApp, n: Option<usize>, which: Toggle) -> Result<(), AppError> {
    let screen = app.active().name();
    match (app.active(), n, which) {
        (ActiveScreen::Feed(feed), Some(n), _) => {
            let id = listed(feed.article(n), n)?.id.clone();
            match which {
                Toggle::Like => tokio::spawn(feed.toggle_like(&id)),
                Toggle::Save => tokio::spawn(feed.toggle_save(&id)),
            };
        }
        (ActiveScreen::Saved(saved), Some(n), Toggle::Like) => {
            let id = listed(saved.article(n), n)?.id.clone();
            tokio::spawn(saved.toggle_like(&id));
        }
        (ActiveScreen::Saved(saved), Some(n), Toggle::Save) => {
            let id = listed(saved.article(n), n)?.id.clone();
            if let Some(pending) = saved.unsave(&id) {
                tokio::spawn(pending);
            }
        }
        (ActiveScreen::Detail(detail), None, Toggle::Like) => {
            tokio::spawn(detail.toggle_like());
        }
        (ActiveScreen::Detail(detail), None, Toggle::Save) => {
            tokio::spawn(detail.toggle_save());
        }
        _ => {
            let name = match which {
                Toggle::Like => "like",
                Toggle::Save => "save",
            };
            return Err(CommandError::WrongScreen(name, screen).into());
        }
    }
    Ok(())
}

fn listed(article: Option<&Article>, n: usize) -> Result<&Article, AppError> {
    article.ok_or_else(|| AppError::Internal(format!("no article at position {}", n)))
}

fn report_form_errors<'a>(errors: impl Iterator<Item = &'a &'static str>) {
    for message in errors {
        println!("  ! {}", message);
    }
}

//=========================================================================================
// Rendering
//=========================================================================================

pub fn render(app: &ShortcutApp) -> String {
    let mut out = String::new();
    let theme = app.context().theme();
    let _ = writeln!(
        out,
        "== {} [{}] ==",
        app.active().name(),
        if theme.is_dark { "dark" } else { "light" }
    );

    match app.active() {
        ActiveScreen::Restoring => out.push_str("Loading...\n"),
        ActiveScreen::Welcome => {
            out.push_str("Welcome to AI ShortCut. Your daily AI news companion.\n");
            out.push_str("show-login | show-signup\n");
        }
        ActiveScreen::Login(_) => out.push_str("login <email> <password> | show-signup | welcome\n"),
        ActiveScreen::Signup(_) => {
            out.push_str("signup <name> <email> <password> <confirm> | show-login | welcome\n")
        }
        ActiveScreen::Feed(feed) => {
            render_state(&mut out, feed.state());
            for (i, article) in feed.articles().iter().enumerate() {
                render_row(&mut out, i, article, feed.is_liked(&article.id), feed.is_saved(&article.id));
            }
        }
        ActiveScreen::Saved(saved) => {
            render_state(&mut out, saved.state());
            let visible = saved.visible();
            let _ = writeln!(out, "{} Saved Articles", visible.len());
            for (i, article) in visible.into_iter().enumerate() {
                render_row(&mut out, i, article, saved.is_liked(&article.id), true);
            }
        }
        ActiveScreen::Profile(profile) => {
            render_state(&mut out, profile.state());
            let stats = profile.stats();
            let _ = writeln!(out, "{}", profile.display_name());
            if let Some(email) = profile.email() {
                let _ = writeln!(out, "{}", email);
            }
            let _ = writeln!(
                out,
                "Articles Read: {}  Saved: {}  Liked: {}",
                stats.articles_read, stats.saved, stats.liked
            );
            let _ = writeln!(
                out,
                "Notifications: {}",
                if app.context().notifications_enabled() { "on" } else { "off" }
            );
            for article in profile.reading_history() {
                let _ = writeln!(out, "  read: {}", article.headline);
            }
        }
        ActiveScreen::Detail(detail) => {
            let article = detail.article();
            let _ = writeln!(out, "{}", article.headline);
            let _ = writeln!(
                out,
                "{} | {} | {} | {}",
                article.author,
                article.publish_date,
                article.read_time,
                article.topics.join(", ")
            );
            let _ = writeln!(
                out,
                "liked: {}  saved: {}  progress: {:.0}%",
                detail.is_liked(),
                detail.is_saved(),
                detail.progress() * 100.0
            );
            match detail.mode() {
                DetailMode::Summary => {
                    let _ = writeln!(out, "\n{}\n\n(full) to read more", article.summary);
                }
                DetailMode::Full => {
                    let _ = writeln!(out, "\n{}", article.content);
                }
            }
        }
    }
    out
}

fn render_state(out: &mut String, state: &LoadState) {
    match state {
        LoadState::Loading => out.push_str("Loading...\n"),
        LoadState::Ready => {}
        LoadState::Failed(reason) => {
            let _ = writeln!(out, "Failed to load ({}). Use 'refresh' to retry.", reason);
        }
    }
}

fn render_row(out: &mut String, i: usize, article: &Article, liked: bool, saved: bool) {
    let _ = writeln!(
        out,
        "[{}] {}{} {} ({}, {})",
        i,
        if liked { "♥" } else { "♡" },
        if saved { "★" } else { "☆" },
        article.headline,
        article.publish_date,
        article.read_time
    );
}

/// Formats a notice for the terminal.
pub fn render_notice(level: NoticeLevel, title: &str, message: &str) -> String {
    match level {
        NoticeLevel::Info => format!("[{}] {}", title, message),
        NoticeLevel::Error => format!("[!! {}] {}", title, message),
    }
}
