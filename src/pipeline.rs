use std::path::Path;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use pgvector::Vector;
use walkdir::WalkDir;

use crate::chunker::split_by_chars;
use crate::openai::OpenAiClient;
use crate::store::{ChunkStore, ScoredChunk};

/// Fixed chunk length in characters.
pub const CHUNK_SIZE: usize = 2048;
/// How many nearest chunks go into the prompt.
pub const TOP_K: i64 = 5;

const SYSTEM_INSTRUCTION: &str = "You are a helpful assistant.";

#[derive(Debug, Default)]
pub struct IngestReport {
    pub files: usize,
    pub chunks: usize,
    pub elapsed: Duration,
}

/// Re-ingests every file at the top level of `data_dir`: the `items` table
/// is truncated, each file is read as UTF-8, split into `chunk_size`-char
/// chunks, and each chunk is embedded and inserted. The whole reload runs
/// in a single transaction, so a failure anywhere leaves the previous index
/// untouched.
///
/// Embedding calls are sequential. Latency grows linearly with corpus size,
/// which is acceptable at demo scale.
pub async fn reload(
    store: &ChunkStore,
    client: &OpenAiClient,
    data_dir: &Path,
    chunk_size: usize,
) -> Result<IngestReport> {
    let started = Instant::now();

    let mut files = Vec::new();
    for entry in WalkDir::new(data_dir).max_depth(1).sort_by_file_name() {
        let entry =
            entry.with_context(|| format!("failed to list directory: {}", data_dir.display()))?;
        if entry.file_type().is_file() {
            files.push(entry.into_path());
        }
    }

    tracing::info!("found {} files under {}", files.len(), data_dir.display());

    let mut reload = store.begin().await?;
    reload.truncate().await?;

    let pb = ProgressBar::new(files.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("#>-"),
    );

    let mut report = IngestReport::default();

    for path in &files {
        pb.set_message(format!(
            "{}",
            path.file_name().unwrap_or_default().to_string_lossy()
        ));

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read text file: {}", path.display()))?;

        for chunk in split_by_chars(&content, chunk_size) {
            tracing::debug!(chars = chunk.chars().count(), "creating embedding");
            let embedding = Vector::from(client.embed(chunk).await?);
            reload.insert(&embedding, chunk).await?;
            report.chunks += 1;
        }

        report.files += 1;
        pb.inc(1);
    }

    pb.finish_with_message("done");

    reload.commit().await?;
    report.elapsed = started.elapsed();

    Ok(report)
}

/// The nearest chunks for one question, best first.
#[derive(Debug)]
pub struct Retrieved {
    pub chunks: Vec<ScoredChunk>,
}

impl Retrieved {
    pub fn scores(&self) -> Vec<f64> {
        self.chunks.iter().map(|chunk| chunk.score).collect()
    }

    /// Context block for the prompt: chunk texts joined by blank lines.
    pub fn context(&self) -> String {
        self.chunks
            .iter()
            .map(|chunk| chunk.chunk.as_str())
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

/// Embeds the question and pulls the `top_k` nearest chunks. Fewer rows
/// than `top_k` come back when the table is smaller than that; an empty
/// table yields an empty context.
pub async fn retrieve(
    store: &ChunkStore,
    client: &OpenAiClient,
    question: &str,
    top_k: i64,
) -> Result<Retrieved> {
    let embedding = Vector::from(
        client
            .embed(question)
            .await
            .context("failed to embed question")?,
    );
    let chunks = store
        .search(&embedding, top_k)
        .await
        .context("similarity search failed")?;

    Ok(Retrieved { chunks })
}

#[derive(Debug)]
pub struct Answer {
    pub text: String,
    /// The exact user prompt sent to the chat model, kept for the reveal.
    pub prompt: String,
}

/// Builds the context-stuffed prompt and asks the chat model.
pub async fn complete(
    client: &OpenAiClient,
    retrieved: &Retrieved,
    question: &str,
) -> Result<Answer> {
    let prompt = build_prompt(&retrieved.context(), question);
    let text = client
        .chat(SYSTEM_INSTRUCTION, &prompt)
        .await
        .context("chat completion failed")?;

    Ok(Answer { text, prompt })
}

/// Fixed prompt template. The context block sits between the instruction
/// line and the question.
pub fn build_prompt(context: &str, question: &str) -> String {
    format!(
        "\nAnswer the question using only the following context:\n\n{context}\n\nQuestion: {question}\n"
    )
}
