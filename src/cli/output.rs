use std::fmt::Write as FmtWrite;

use crate::models::{OutputFormat, QueryResults};
use crate::services::{BatchReport, ConvertedRecord, TaskOutcome};
use crate::utils::{char_count, preview};

pub trait Formatter: Send + Sync {
    fn format_record(&self, converted: &ConvertedRecord) -> String;
    fn format_batch_outcome(&self, outcome: &TaskOutcome) -> String;
    fn format_batch_report(&self, report: &BatchReport) -> String;
    fn format_index_stats(&self, stats: &IndexStats) -> String;
    fn format_query_results(&self, results: &QueryResults, preview_chars: usize) -> String;
    fn format_status(&self, status: &StatusInfo) -> String;
    fn format_message(&self, message: &str) -> String;
    fn format_error(&self, error: &str) -> String;
}

#[derive(Debug, Clone)]
pub struct StatusInfo {
    pub embedding_provider: String,
    pub embedding_url: String,
    pub embedding_model: String,
    pub embedding_healthy: bool,
    pub vector_store_driver: String,
    pub vector_store_url: String,
    pub vector_store_connected: bool,
    pub collection: String,
    pub ocr_enabled: bool,
    pub ocr_available: bool,
}

#[derive(Debug, Clone, Default)]
pub struct IndexStats {
    pub records_found: u64,
    pub records_indexed: u64,
    pub records_skipped: u64,
    pub records_failed: u64,
    pub chunks_created: u64,
    pub batches_upserted: u64,
    pub duration_ms: u64,
}

fn file_name(converted: &ConvertedRecord) -> String {
    converted
        .path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

pub struct TextFormatter;

impl Formatter for TextFormatter {
    fn format_record(&self, converted: &ConvertedRecord) -> String {
        let record = &converted.record;
        let mut output = String::new();
        writeln!(output, "Converted chapter").unwrap();
        writeln!(output, "-----------------").unwrap();
        writeln!(output, "Lesson ID:   {}", record.lesson_id).unwrap();
        writeln!(output, "Chapter:     {} - {}", record.chapter_no, record.title).unwrap();
        writeln!(
            output,
            "Class:       {} / {} / grade {} / {}",
            record.board, record.subject, record.grade, record.book
        )
        .unwrap();
        writeln!(output, "Pages:       {}", converted.pages).unwrap();
        writeln!(output, "OCR pages:   {}", converted.recovered_pages).unwrap();
        writeln!(output, "Confidence:  {:.2}", record.confidence).unwrap();
        writeln!(output, "Images:      {}", record.image_count).unwrap();
        writeln!(output, "Characters:  {}", char_count(&record.content)).unwrap();
        writeln!(output, "Saved to:    {}", converted.path.display()).unwrap();
        output
    }

    fn format_batch_outcome(&self, outcome: &TaskOutcome) -> String {
        match &outcome.result {
            Ok(converted) => format!(
                "[OK] {} -> lesson_id={}\n",
                outcome.file_name, converted.record.lesson_id
            ),
            Err(e) => format!("[ERROR] {}: {}\n", outcome.file_name, e),
        }
    }

    fn format_batch_report(&self, report: &BatchReport) -> String {
        format!(
            "\nTotal processed: {} / {}\n",
            report.succeeded, report.total
        )
    }

    fn format_index_stats(&self, stats: &IndexStats) -> String {
        let mut output = String::new();
        writeln!(output, "Indexing Complete").unwrap();
        writeln!(output, "-----------------").unwrap();
        writeln!(output, "Records found: {}", stats.records_found).unwrap();
        writeln!(output, "Records indexed: {}", stats.records_indexed).unwrap();
        writeln!(output, "Records skipped: {}", stats.records_skipped).unwrap();
        writeln!(output, "Records failed: {}", stats.records_failed).unwrap();
        writeln!(output, "Chunks created: {}", stats.chunks_created).unwrap();
        writeln!(output, "Batches upserted: {}", stats.batches_upserted).unwrap();
        writeln!(output, "Duration: {}ms", stats.duration_ms).unwrap();
        output
    }

    fn format_query_results(&self, results: &QueryResults, preview_chars: usize) -> String {
        if results.is_empty() {
            return format!("No results found for: {}\n", results.query);
        }

        let mut output = String::new();
        writeln!(
            output,
            "\nTop {} results for query: {}\n",
            results.len(),
            results.query
        )
        .unwrap();

        for m in &results.matches {
            writeln!(
                output,
                "------------------------------------------------------------"
            )
            .unwrap();
            writeln!(output, "Score: {:.4}", m.score).unwrap();
            match &m.metadata {
                Some(meta) => {
                    writeln!(output, "Lesson: {}", meta.lesson_id).unwrap();
                    writeln!(output, "Chapter: {} - {}", meta.chapter_no, meta.title).unwrap();
                    writeln!(output, "Text: {}", preview(&meta.chunk_text, preview_chars))
                        .unwrap();
                }
                None => writeln!(output, "Id: {}", m.id).unwrap(),
            }
        }

        output
    }

    fn format_status(&self, status: &StatusInfo) -> String {
        let mut output = String::new();
        writeln!(output, "Status").unwrap();
        writeln!(output, "------").unwrap();

        let embedding_status = if status.embedding_healthy {
            "[CONNECTED]"
        } else {
            "[DISCONNECTED]"
        };
        writeln!(
            output,
            "Embedding:     {} ({})",
            status.embedding_provider, embedding_status
        )
        .unwrap();
        writeln!(output, "  URL:         {}", status.embedding_url).unwrap();
        writeln!(output, "  Model:       {}", status.embedding_model).unwrap();
        writeln!(output).unwrap();

        let vector_status = if status.vector_store_connected {
            "[CONNECTED]"
        } else {
            "[DISCONNECTED]"
        };
        writeln!(
            output,
            "Vector Store:  {} ({})",
            status.vector_store_driver, vector_status
        )
        .unwrap();
        writeln!(output, "  URL:         {}", status.vector_store_url).unwrap();
        writeln!(output, "  Collection:  {}", status.collection).unwrap();
        writeln!(output).unwrap();

        let ocr_status = match (status.ocr_enabled, status.ocr_available) {
            (false, _) => "[DISABLED]",
            (true, true) => "[AVAILABLE]",
            (true, false) => "[MISSING]",
        };
        writeln!(output, "OCR fallback:  pdftoppm + tesseract {}", ocr_status).unwrap();

        output
    }

    fn format_message(&self, message: &str) -> String {
        format!("{}\n", message)
    }

    fn format_error(&self, error: &str) -> String {
        format!("Error: {}\n", error)
    }
}

pub struct JsonFormatter {
    pub pretty: bool,
}

impl JsonFormatter {
    pub fn new(pretty: bool) -> Self {
        Self { pretty }
    }

    fn render(&self, json: &serde_json::Value) -> String {
        let rendered = if self.pretty {
            serde_json::to_string_pretty(json)
        } else {
            serde_json::to_string(json)
        };
        rendered.unwrap_or_else(|e| format!("{{\"error\": \"{}\"}}", e)) + "\n"
    }
}

impl Formatter for JsonFormatter {
    fn format_record(&self, converted: &ConvertedRecord) -> String {
        let json = serde_json::json!({
            "path": converted.path,
            "pages": converted.pages,
            "recovered_pages": converted.recovered_pages,
            "record": converted.record,
        });
        self.render(&json)
    }

    /// One compact line per file so a batch run reads as JSON lines.
    fn format_batch_outcome(&self, outcome: &TaskOutcome) -> String {
        let json = match &outcome.result {
            Ok(converted) => serde_json::json!({
                "file": outcome.file_name,
                "status": "ok",
                "lesson_id": converted.record.lesson_id,
                "output": file_name(converted),
            }),
            Err(e) => serde_json::json!({
                "file": outcome.file_name,
                "status": "error",
                "error": e.to_string(),
            }),
        };
        format!("{json}\n")
    }

    fn format_batch_report(&self, report: &BatchReport) -> String {
        let failures: Vec<serde_json::Value> = report
            .failures
            .iter()
            .map(|(file, error)| serde_json::json!({"file": file, "error": error}))
            .collect();
        let json = serde_json::json!({
            "succeeded": report.succeeded,
            "failed": report.failed(),
            "total": report.total,
            "failures": failures,
        });
        format!("{json}\n")
    }

    fn format_index_stats(&self, stats: &IndexStats) -> String {
        let json = serde_json::json!({
            "records_found": stats.records_found,
            "records_indexed": stats.records_indexed,
            "records_skipped": stats.records_skipped,
            "records_failed": stats.records_failed,
            "chunks_created": stats.chunks_created,
            "batches_upserted": stats.batches_upserted,
            "duration_ms": stats.duration_ms,
        });
        self.render(&json)
    }

    fn format_query_results(&self, results: &QueryResults, _preview_chars: usize) -> String {
        match serde_json::to_value(results) {
            Ok(json) => self.render(&json),
            Err(e) => self.format_error(&e.to_string()),
        }
    }

    fn format_status(&self, status: &StatusInfo) -> String {
        let json = serde_json::json!({
            "embedding": {
                "provider": status.embedding_provider,
                "url": status.embedding_url,
                "model": status.embedding_model,
                "healthy": status.embedding_healthy,
            },
            "vector_store": {
                "driver": status.vector_store_driver,
                "url": status.vector_store_url,
                "connected": status.vector_store_connected,
                "collection": status.collection,
            },
            "ocr": {
                "enabled": status.ocr_enabled,
                "available": status.ocr_available,
            }
        });
        self.render(&json)
    }

    fn format_message(&self, message: &str) -> String {
        format!("{}\n", serde_json::json!({"message": message}))
    }

    fn format_error(&self, error: &str) -> String {
        format!("{}\n", serde_json::json!({"error": error}))
    }
}

pub struct MarkdownFormatter;

impl Formatter for MarkdownFormatter {
    fn format_record(&self, converted: &ConvertedRecord) -> String {
        let record = &converted.record;
        let mut output = String::new();
        writeln!(output, "## {} - {}\n", record.chapter_no, record.title).unwrap();
        writeln!(output, "| Field | Value |").unwrap();
        writeln!(output, "|-------|-------|").unwrap();
        writeln!(output, "| Lesson ID | `{}` |", record.lesson_id).unwrap();
        writeln!(output, "| Board | {} |", record.board).unwrap();
        writeln!(output, "| Subject | {} |", record.subject).unwrap();
        writeln!(output, "| Grade | {} |", record.grade).unwrap();
        writeln!(output, "| Book | {} |", record.book).unwrap();
        writeln!(output, "| Pages | {} |", converted.pages).unwrap();
        writeln!(output, "| OCR pages | {} |", converted.recovered_pages).unwrap();
        writeln!(output, "| Confidence | {:.2} |", record.confidence).unwrap();
        writeln!(output, "| Images | {} |", record.image_count).unwrap();
        writeln!(output, "| File | `{}` |", file_name(converted)).unwrap();
        output
    }

    fn format_batch_outcome(&self, outcome: &TaskOutcome) -> String {
        match &outcome.result {
            Ok(converted) => format!(
                "- ✅ `{}` → `{}`\n",
                outcome.file_name, converted.record.lesson_id
            ),
            Err(e) => format!("- ❌ `{}`: {}\n", outcome.file_name, e),
        }
    }

    fn format_batch_report(&self, report: &BatchReport) -> String {
        format!(
            "\n**Total processed:** {} / {}\n",
            report.succeeded, report.total
        )
    }

    fn format_index_stats(&self, stats: &IndexStats) -> String {
        let mut output = String::new();
        writeln!(output, "## Indexing Complete\n").unwrap();
        writeln!(output, "| Metric | Value |").unwrap();
        writeln!(output, "|--------|-------|").unwrap();
        writeln!(output, "| Records found | {} |", stats.records_found).unwrap();
        writeln!(output, "| Records indexed | {} |", stats.records_indexed).unwrap();
        writeln!(output, "| Records skipped | {} |", stats.records_skipped).unwrap();
        writeln!(output, "| Records failed | {} |", stats.records_failed).unwrap();
        writeln!(output, "| Chunks created | {} |", stats.chunks_created).unwrap();
        writeln!(output, "| Batches upserted | {} |", stats.batches_upserted).unwrap();
        writeln!(output, "| Duration | {}ms |", stats.duration_ms).unwrap();
        output
    }

    fn format_query_results(&self, results: &QueryResults, preview_chars: usize) -> String {
        if results.is_empty() {
            return format!("## No results found\n\nQuery: `{}`\n", results.query);
        }

        let mut output = String::new();
        writeln!(output, "## Query Results\n").unwrap();
        writeln!(output, "**Query:** `{}`\n", results.query).unwrap();

        for (i, m) in results.matches.iter().enumerate() {
            writeln!(output, "### {}. Score: {:.4}\n", i + 1, m.score).unwrap();
            match &m.metadata {
                Some(meta) => {
                    writeln!(output, "**Lesson:** `{}`\n", meta.lesson_id).unwrap();
                    writeln!(output, "**Chapter:** {} - {}\n", meta.chapter_no, meta.title)
                        .unwrap();
                    writeln!(output, "```").unwrap();
                    writeln!(output, "{}", preview(&meta.chunk_text, preview_chars)).unwrap();
                    writeln!(output, "```\n").unwrap();
                }
                None => writeln!(output, "**Id:** `{}`\n", m.id).unwrap(),
            }
        }

        output
    }

    fn format_status(&self, status: &StatusInfo) -> String {
        let icon = |ok: bool| if ok { "✅" } else { "❌" };
        let mut output = String::new();
        writeln!(output, "## Status\n").unwrap();

        writeln!(
            output,
            "### Embedding ({}) {}\n",
            status.embedding_provider,
            icon(status.embedding_healthy)
        )
        .unwrap();
        writeln!(output, "- **URL:** `{}`", status.embedding_url).unwrap();
        writeln!(output, "- **Model:** {}\n", status.embedding_model).unwrap();

        writeln!(
            output,
            "### Vector Store ({}) {}\n",
            status.vector_store_driver,
            icon(status.vector_store_connected)
        )
        .unwrap();
        writeln!(output, "- **URL:** `{}`", status.vector_store_url).unwrap();
        writeln!(output, "- **Collection:** {}\n", status.collection).unwrap();

        let ocr = if status.ocr_enabled {
            icon(status.ocr_available)
        } else {
            "disabled"
        };
        writeln!(output, "### OCR fallback {}", ocr).unwrap();

        output
    }

    fn format_message(&self, message: &str) -> String {
        format!("> {}\n", message)
    }

    fn format_error(&self, error: &str) -> String {
        format!("> ⚠️ **Error:** {}\n", error)
    }
}

pub fn get_formatter(format: OutputFormat) -> Box<dyn Formatter> {
    match format {
        OutputFormat::Text => Box::new(TextFormatter),
        OutputFormat::Json => Box::new(JsonFormatter::new(true)),
        OutputFormat::Markdown => Box::new(MarkdownFormatter),
    }
}
