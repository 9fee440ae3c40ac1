use std::io::{self, Write};
use std::sync::Mutex;

use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;

use crate::app::{AnalysisReport, IntegrationReport, ProgressEvent, ProgressSink};
use crate::download::DownloadAction;

#[derive(Debug, Clone, Copy)]
pub enum OutputMode {
    Human,
    Json,
}

pub struct JsonOutput;

impl JsonOutput {
    pub fn print_integration(report: &IntegrationReport) -> io::Result<()> {
        Self::print_json(report)
    }

    pub fn print_analysis(report: &AnalysisReport) -> io::Result<()> {
        Self::print_json(report)
    }

    fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        let mut stdout = io::stdout();
        stdout.write_all(json.as_bytes())?;
        stdout.write_all(b"\n")?;
        Ok(())
    }
}

// stdout carries only the report; messages go to the log on stderr
impl ProgressSink for JsonOutput {
    fn event(&self, event: ProgressEvent) {
        if let ProgressEvent::Message(message) = event {
            tracing::info!("{message}");
        }
    }
}

#[derive(Default)]
pub struct ConsoleProgress {
    bar: Mutex<Option<(String, ProgressBar)>>,
}

impl ConsoleProgress {
    pub fn new() -> Self {
        Self::default()
    }

    fn bar_style() -> ProgressStyle {
        ProgressStyle::with_template(
            "{prefix:<14.dim} {bar:30.green/dim} {binary_bytes:>9}/{binary_total_bytes:9} {percent:>3}%",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("━━─")
    }

    fn spinner_style() -> ProgressStyle {
        ProgressStyle::with_template("{spinner:.green} {prefix:<14.dim} {binary_bytes:>9}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
    }

    fn update(&self, accession: &str, downloaded: u64, total: Option<u64>) {
        let Ok(mut slot) = self.bar.lock() else {
            return;
        };
        let stale = slot
            .as_ref()
            .map(|(current, _)| current != accession)
            .unwrap_or(true);
        if stale {
            if let Some((_, old)) = slot.take() {
                old.finish_and_clear();
            }
            let bar = match total {
                Some(total) => ProgressBar::new(total).with_style(Self::bar_style()),
                None => ProgressBar::new_spinner().with_style(Self::spinner_style()),
            };
            bar.set_prefix(accession.to_string());
            *slot = Some((accession.to_string(), bar));
        }
        if let Some((_, bar)) = slot.as_ref() {
            bar.set_position(downloaded);
        }
    }

    fn finish(&self, accession: &str) {
        let Ok(mut slot) = self.bar.lock() else {
            return;
        };
        if slot
            .as_ref()
            .map(|(current, _)| current == accession)
            .unwrap_or(false)
        {
            if let Some((_, bar)) = slot.take() {
                bar.finish_and_clear();
            }
        }
    }

    fn log(&self, message: &str) {
        match self.bar.lock() {
            Ok(slot) => match slot.as_ref() {
                Some((_, bar)) => bar.suspend(|| tracing::info!("{message}")),
                None => tracing::info!("{message}"),
            },
            Err(_) => tracing::info!("{message}"),
        }
    }
}

impl ProgressSink for ConsoleProgress {
    fn event(&self, event: ProgressEvent) {
        match event {
            ProgressEvent::Message(message) => self.log(&message),
            ProgressEvent::Transfer {
                accession,
                downloaded,
                total,
            } => self.update(&accession, downloaded, total),
            ProgressEvent::TransferDone { accession } => self.finish(&accession),
        }
    }
}

pub fn print_integration_summary(report: &IntegrationReport) {
    let green = "\x1b[32m";
    let cyan = "\x1b[36m";
    let yellow = "\x1b[33m";
    let reset = "\x1b[0m";

    println!("{cyan}ENCODE integration summary{reset}");
    println!("  sample sheet: {}", report.sample_sheet);
    println!("  records: {}", report.records);
    println!("{green}  downloaded: {}{reset}", report.downloaded);
    println!("{yellow}  skipped (already present): {}{reset}", report.skipped);
    for file in &report.files {
        let (mark, color) = match file.action {
            DownloadAction::Downloaded => ("+", green),
            DownloadAction::Skipped => ("=", yellow),
        };
        println!("{color}  {mark} {} -> {}{reset}", file.accession, file.path);
    }
}

pub fn print_analysis_summary(report: &AnalysisReport) {
    let green = "\x1b[32m";
    let cyan = "\x1b[36m";
    let red = "\x1b[31m";
    let reset = "\x1b[0m";

    println!("{cyan}Analysis summary{reset}");
    println!("  output: {}", report.output);
    println!("  tracks: {}, region files: {}", report.tracks, report.regions);
    for step in &report.steps {
        let color = if step.success { green } else { red };
        let code = step
            .exit_code
            .map(|code| code.to_string())
            .unwrap_or_else(|| "signal".to_string());
        println!("{color}  {} (exit {code}){reset}", step.step);
    }
}
