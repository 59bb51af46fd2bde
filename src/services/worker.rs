//! Fixed-size worker pool for converting many PDFs.

use crossbeam_channel::{Receiver, Sender, bounded};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;

use crate::error::PipelineError;
use crate::models::Classification;
use crate::services::pipeline::{ConvertedRecord, Converter};

/// Result of one file, tagged with its name.
#[derive(Debug)]
pub struct TaskOutcome {
    pub file_name: String,
    pub result: Result<ConvertedRecord, PipelineError>,
}

/// Tally of a batch run.
#[derive(Debug, Default, Clone)]
pub struct BatchReport {
    pub succeeded: usize,
    pub total: usize,
    /// `(file_name, error)` for every failed file.
    pub failures: Vec<(String, String)>,
}

impl BatchReport {
    pub fn failed(&self) -> usize {
        self.failures.len()
    }
}

/// Convert `files` on `workers` threads.
///
/// Every outcome is handed to `observe` in completion order. A failing file
/// never stops the others; the report is returned once every worker is done.
pub fn run_batch<F>(
    converter: Arc<Converter>,
    files: Vec<PathBuf>,
    classification: Classification,
    workers: usize,
    mut observe: F,
) -> BatchReport
where
    F: FnMut(&TaskOutcome),
{
    let workers = workers.max(1);
    let total = files.len();
    let (task_tx, task_rx) = bounded::<PathBuf>(workers * 2);
    let (result_tx, result_rx) = bounded::<TaskOutcome>(workers * 2);

    let mut handles = Vec::with_capacity(workers);
    for worker_id in 0..workers {
        let worker_rx = task_rx.clone();
        let worker_tx = result_tx.clone();
        let worker_converter = Arc::clone(&converter);
        let worker_classification = classification.clone();
        handles.push(thread::spawn(move || {
            worker_loop(
                worker_id,
                worker_rx,
                worker_tx,
                &worker_converter,
                &worker_classification,
            )
        }));
    }
    drop(task_rx);
    drop(result_tx);

    // feed from a separate thread so a full result channel cannot stall the queue
    let feeder = thread::spawn(move || {
        for file in files {
            if task_tx.send(file).is_err() {
                break;
            }
        }
    });

    let mut report = BatchReport {
        total,
        ..Default::default()
    };
    for outcome in result_rx.iter() {
        observe(&outcome);
        match &outcome.result {
            Ok(_) => report.succeeded += 1,
            Err(e) => report.failures.push((outcome.file_name.clone(), e.to_string())),
        }
    }

    if feeder.join().is_err() {
        tracing::error!("task feeder panicked");
    }
    for handle in handles {
        if handle.join().is_err() {
            tracing::error!("conversion worker panicked");
        }
    }

    report
}

fn worker_loop(
    worker_id: usize,
    receiver: Receiver<PathBuf>,
    sender: Sender<TaskOutcome>,
    converter: &Converter,
    classification: &Classification,
) {
    for path in receiver.iter() {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        tracing::debug!(worker = worker_id, file = %file_name, "converting");

        let result = convert_guarded(converter, &path, classification);
        if let Err(e) = &result {
            tracing::warn!(worker = worker_id, file = %file_name, error = %e, "conversion failed");
        }

        if sender.send(TaskOutcome { file_name, result }).is_err() {
            break;
        }
    }
}

/// Run one conversion, turning a panic (lopdf can panic on malformed input)
/// into an ordinary failure for that file.
fn convert_guarded(
    converter: &Converter,
    path: &Path,
    classification: &Classification,
) -> Result<ConvertedRecord, PipelineError> {
    panic::catch_unwind(AssertUnwindSafe(|| {
        converter.convert(path, classification.clone())
    }))
    .unwrap_or_else(|payload| Err(PipelineError::Panicked(panic_message(payload.as_ref()))))
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ExtractionError;
    use crate::models::RawPage;
    use crate::services::extractor::PageExtractor;
    use std::path::Path;
    use tempfile::TempDir;

    /// Fails on any file whose name contains "broken".
    struct NameExtractor;

    impl PageExtractor for NameExtractor {
        fn extract_pages(&self, path: &Path) -> Result<Vec<RawPage>, ExtractionError> {
            let name = path.display().to_string();
            if name.contains("malformed") {
                panic!("unexpected end of xref table in {name}");
            }
            if name.contains("broken") {
                return Err(ExtractionError::OpenError {
                    path: name,
                    message: "not a PDF".to_string(),
                });
            }
            Ok(vec![RawPage {
                page_number: 1,
                text: format!("Text of {name}"),
                ..Default::default()
            }])
        }
    }

    fn classification() -> Classification {
        Classification {
            board: "CBSE".to_string(),
            subject: "Science".to_string(),
            grade: 4,
            book: "Book".to_string(),
            language: "en".to_string(),
        }
    }

    #[test]
    fn test_failures_do_not_stop_siblings() {
        let dir = TempDir::new().unwrap();
        let converter = Arc::new(Converter::new(Box::new(NameExtractor), dir.path()));
        let files: Vec<PathBuf> = [
            "Chapter_01_A.pdf",
            "broken.pdf",
            "Chapter_02_B.pdf",
            "Chapter_03_C.pdf",
            "broken_too.pdf",
        ]
        .iter()
        .map(PathBuf::from)
        .collect();

        let mut seen = Vec::new();
        let report = run_batch(converter, files, classification(), 3, |outcome| {
            seen.push(outcome.file_name.clone());
        });

        assert_eq!(report.total, 5);
        assert_eq!(report.succeeded, 3);
        assert_eq!(report.failed(), 2);
        assert_eq!(seen.len(), 5);

        let mut failed: Vec<&str> = report.failures.iter().map(|(f, _)| f.as_str()).collect();
        failed.sort();
        assert_eq!(failed, vec!["broken.pdf", "broken_too.pdf"]);

        let saved = crate::services::pipeline::load_records(dir.path()).unwrap();
        assert_eq!(saved.len(), 3);
    }

    #[test]
    fn test_empty_batch_and_zero_workers() {
        let dir = TempDir::new().unwrap();
        let converter = Arc::new(Converter::new(Box::new(NameExtractor), dir.path()));
        let report = run_batch(converter, Vec::new(), classification(), 0, |_| {});
        assert_eq!(report.total, 0);
        assert_eq!(report.succeeded, 0);
        assert!(report.failures.is_empty());
    }

    #[test]
    fn test_panicking_file_is_reported_and_siblings_continue() {
        let dir = TempDir::new().unwrap();
        let converter = Arc::new(Converter::new(Box::new(NameExtractor), dir.path()));
        let files: Vec<PathBuf> = ["a.pdf", "malformed.pdf", "b.pdf", "c.pdf"]
            .iter()
            .map(PathBuf::from)
            .collect();

        let mut seen = Vec::new();
        let report = run_batch(converter, files, classification(), 1, |outcome| {
            seen.push(outcome.file_name.clone());
        });

        assert_eq!(seen, vec!["a.pdf", "malformed.pdf", "b.pdf", "c.pdf"]);
        assert_eq!(report.total, 4);
        assert_eq!(report.succeeded, 3);
        assert_eq!(report.failures.len(), 1);
        let (file, error) = &report.failures[0];
        assert_eq!(file, "malformed.pdf");
        assert!(error.contains("panicked"));
        assert!(error.contains("unexpected end of xref table"));
    }
}
