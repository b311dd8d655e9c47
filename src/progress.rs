use std::sync::Mutex;

use indicatif::{ProgressBar, ProgressStyle};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressUnit {
    Bytes,
    Files,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    Started {
        label: String,
        total: Option<u64>,
        unit: ProgressUnit,
    },
    Advanced(u64),
    Finished {
        message: String,
    },
}

pub trait ProgressSink {
    fn event(&self, event: ProgressEvent);
}

#[derive(Default)]
pub struct ConsoleProgress {
    bar: Mutex<Option<ProgressBar>>,
}

impl ConsoleProgress {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProgressSink for ConsoleProgress {
    fn event(&self, event: ProgressEvent) {
        let Ok(mut slot) = self.bar.lock() else {
            return;
        };
        match event {
            ProgressEvent::Started { label, total, unit } => {
                if let Some(previous) = slot.take() {
                    previous.finish_and_clear();
                }
                let bar = match total {
                    Some(total) => ProgressBar::new(total),
                    None => ProgressBar::new_spinner(),
                };
                bar.set_style(style_for(unit, total.is_some()));
                bar.set_message(label);
                *slot = Some(bar);
            }
            ProgressEvent::Advanced(delta) => {
                if let Some(bar) = slot.as_ref() {
                    bar.inc(delta);
                }
            }
            ProgressEvent::Finished { message } => match slot.take() {
                Some(bar) => bar.finish_with_message(message),
                None => eprintln!("{message}"),
            },
        }
    }
}

fn style_for(unit: ProgressUnit, bounded: bool) -> ProgressStyle {
    let template = match (unit, bounded) {
        (ProgressUnit::Bytes, true) => {
            "{msg} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec})"
        }
        (ProgressUnit::Bytes, false) => "{spinner:.green} {msg} {bytes} ({bytes_per_sec})",
        (ProgressUnit::Files, true) => "{msg} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files",
        (ProgressUnit::Files, false) => "{spinner:.green} {msg} {pos} files",
    };
    ProgressStyle::default_bar()
        .template(template)
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("#>-")
}
