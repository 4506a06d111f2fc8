use crossterm::{
    cursor::MoveToColumn,
    queue,
    style::{PrintStyledContent, Stylize},
    terminal::{Clear, ClearType},
};
use std::io::{IsTerminal, Write};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

pub const QUEUE_CAPACITY: usize = 100;
const SPINNER: [&str; 10] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];
const MAX_LINE_WIDTH: usize = 70;
const MAX_REPO_WIDTH: usize = 20;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    Action { repo: String, action: &'static str },
    Finished { repo: String },
}

/// Action events never block and are dropped when the queue is full. The
/// completion count is kept outside the queue so it is never lost.
#[derive(Clone, Debug, Default)]
pub struct Progress {
    tx: Option<mpsc::Sender<ProgressEvent>>,
    completed: Arc<AtomicUsize>,
}

impl Progress {
    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<ProgressEvent>) {
        let (tx, rx) = mpsc::channel(capacity);
        let progress = Self {
            tx: Some(tx),
            completed: Arc::default(),
        };
        (progress, rx)
    }

    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::Relaxed)
    }

    pub fn counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.completed)
    }

    pub fn action(&self, repo: &str, action: &'static str) {
        self.emit(ProgressEvent::Action {
            repo: repo.to_string(),
            action,
        });
    }

    pub fn finished(&self, repo: &str) {
        self.completed.fetch_add(1, Ordering::Relaxed);
        self.emit(ProgressEvent::Finished {
            repo: repo.to_string(),
        });
    }

    fn emit(&self, event: ProgressEvent) {
        let Some(tx) = &self.tx else { return };
        match tx.try_send(event) {
            Ok(()) | Err(TrySendError::Closed(_)) => {}
            Err(TrySendError::Full(event)) => {
                tracing::trace!(?event, "progress queue full, dropped");
            }
        }
    }
}

#[derive(Debug)]
pub struct StatusLine {
    total: usize,
    completed: Arc<AtomicUsize>,
    last: Option<(String, &'static str)>,
}

impl StatusLine {
    pub fn new(total: usize, completed: Arc<AtomicUsize>) -> Self {
        Self {
            total,
            completed,
            last: None,
        }
    }

    pub fn apply(&mut self, event: ProgressEvent) {
        match event {
            ProgressEvent::Action { repo, action } => self.last = Some((repo, action)),
            ProgressEvent::Finished { repo } => {
                if self.last.as_ref().is_some_and(|(r, _)| *r == repo) {
                    self.last = Some((repo, "done"));
                }
            }
        }
    }

    pub fn render(&self, tick: usize) -> String {
        let spin = SPINNER[tick % SPINNER.len()];
        let done = self.completed.load(Ordering::Relaxed).min(self.total);
        let line = match &self.last {
            Some((repo, action)) => format!(
                "{spin} Analyzing [{done}/{}] {} · {action}",
                self.total,
                truncate_width(repo, MAX_REPO_WIDTH)
            ),
            None => format!("{spin} Analyzing [{done}/{}]", self.total),
        };
        truncate_width(&line, MAX_LINE_WIDTH)
    }
}

pub fn truncate_width(s: &str, max: usize) -> String {
    if s.width() <= max {
        return s.to_string();
    }
    let budget = max.saturating_sub(3);
    let mut out = String::new();
    let mut used = 0;
    for c in s.chars() {
        let w = c.width().unwrap_or(0);
        if used + w > budget {
            break;
        }
        used += w;
        out.push(c);
    }
    out.push_str("...");
    out
}

// The task ends, clearing the line, once every [`Progress`] sender is gone.
pub fn spawn_reporter(
    total: usize,
    mut rx: mpsc::Receiver<ProgressEvent>,
    completed: Arc<AtomicUsize>,
    tick: Duration,
) -> JoinHandle<()> {
    let draw = std::io::stderr().is_terminal();
    tokio::spawn(async move {
        let mut status = StatusLine::new(total, completed);
        let mut interval = tokio::time::interval(tick.max(Duration::from_millis(10)));
        let mut frame = 0usize;

        loop {
            tokio::select! {
                event = rx.recv() => match event {
                    Some(event) => status.apply(event),
                    None => break,
                },
                _ = interval.tick() => {
                    frame += 1;
                    if draw {
                        let _ = redraw(Some(&status.render(frame)));
                    }
                }
            }
        }

        if draw {
            let _ = redraw(None);
        }
    })
}

pub fn redraw(line: Option<&str>) -> std::io::Result<()> {
    let mut err = std::io::stderr().lock();
    queue!(err, MoveToColumn(0), Clear(ClearType::CurrentLine))?;
    if let Some(line) = line {
        queue!(err, PrintStyledContent(line.cyan()))?;
    }
    err.flush()
}
