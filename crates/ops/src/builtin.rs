//! Built-in operations and the default registry.
//!
//! These cover the patterns the visual editor ships with: widget-only
//! sources, text transforms, a fan-in join, a file sink, and a wrapped
//! external process that streams its stdout as progress.

use std::process::Stdio;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::debug;

use crate::schema::{InputSpec, ValueKind, WidgetSpec};
use crate::{NodeRegistry, OpContext, OpError, Operation, RegistryEntry};

/// Emits its `text` widget. The canonical "no incoming edges" node: it runs
/// from widget values alone.
pub struct TextSource;

#[async_trait]
impl Operation for TextSource {
    async fn run(&self, ctx: OpContext) -> Result<Vec<Value>, OpError> {
        let text = ctx.widget("text").cloned().unwrap_or_else(|| json!(""));
        Ok(vec![text])
    }
}

/// Substitutes `{name}` placeholders in the `template` widget from the
/// optional `values` input object, then from the remaining widgets.
pub struct Template;

#[async_trait]
impl Operation for Template {
    async fn run(&self, ctx: OpContext) -> Result<Vec<Value>, OpError> {
        let mut text = ctx
            .widget_str("template")
            .ok_or_else(|| OpError::Failure("widget 'template' is required".into()))?
            .to_string();

        let substitute = |text: &mut String, key: &str, value: &Value| {
            let rendered = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            *text = text.replace(&format!("{{{key}}}"), &rendered);
        };

        if let Some(values) = ctx.input("values").and_then(Value::as_object) {
            for (key, value) in values {
                substitute(&mut text, key, value);
            }
        }
        for (key, value) in &ctx.widgets {
            if key != "template" {
                substitute(&mut text, key, value);
            }
        }

        Ok(vec![json!(text)])
    }
}

/// Joins all values arriving on its accepts-multiple `items` port with the
/// `separator` widget.
pub struct Concat;

#[async_trait]
impl Operation for Concat {
    async fn run(&self, ctx: OpContext) -> Result<Vec<Value>, OpError> {
        let items = match ctx.input("items") {
            Some(Value::Array(items)) => items.clone(),
            Some(other) => vec![other.clone()],
            None => Vec::new(),
        };
        let separator = ctx.widget_str("separator").unwrap_or("\n");

        let joined = items
            .iter()
            .map(|v| match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect::<Vec<_>>()
            .join(separator);

        Ok(vec![json!(joined)])
    }
}

/// Writes its `text` input into `directory`/`filename` and returns the
/// written path. Partial side effects are not rolled back on later
/// failures elsewhere in the graph.
pub struct SaveText;

#[async_trait]
impl Operation for SaveText {
    async fn run(&self, ctx: OpContext) -> Result<Vec<Value>, OpError> {
        let text = ctx
            .require_input("text")?
            .as_str()
            .ok_or_else(|| OpError::Failure("input 'text' must be text".into()))?
            .to_string();
        let directory = ctx.widget_str("directory").unwrap_or("output").to_string();
        let filename = ctx.widget_str("filename").unwrap_or("output.txt").to_string();

        let dir = std::path::PathBuf::from(directory);
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| OpError::Failure(format!("cannot create '{}': {e}", dir.display())))?;
        let path = dir.join(filename);
        tokio::fs::write(&path, text)
            .await
            .map_err(|e| OpError::Failure(format!("cannot write '{}': {e}", path.display())))?;

        debug!(path = %path.display(), "saved text");
        Ok(vec![json!(path.to_string_lossy())])
    }
}

/// Spawns an external process and streams each stdout line as a progress
/// event before returning the captured output. This is the long-running,
/// progress-emitting operation shape: training runs, encoders, and similar
/// wrapped tools.
pub struct Command;

#[async_trait]
impl Operation for Command {
    async fn run(&self, ctx: OpContext) -> Result<Vec<Value>, OpError> {
        let program = ctx
            .widget_str("program")
            .ok_or_else(|| OpError::Failure("widget 'program' is required".into()))?;
        let args: Vec<String> = ctx
            .widget("args")
            .and_then(Value::as_array)
            .map(|a| {
                a.iter()
                    .map(|v| match v {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    })
                    .collect()
            })
            .unwrap_or_default();

        let mut child = tokio::process::Command::new(program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| OpError::Failure(format!("cannot spawn '{program}': {e}")))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| OpError::Failure("child stdout unavailable".into()))?;
        let mut lines = BufReader::new(stdout).lines();
        let mut captured = String::new();

        loop {
            tokio::select! {
                _ = ctx.cancel.cancelled() => {
                    // Best effort: the process may already be past its point
                    // of no return.
                    let _ = child.start_kill();
                    return Err(OpError::Cancelled);
                }
                line = lines.next_line() => match line {
                    Ok(Some(line)) => {
                        ctx.progress.send(json!({ "line": line }));
                        captured.push_str(&line);
                        captured.push('\n');
                    }
                    Ok(None) => break,
                    Err(e) => return Err(OpError::Failure(format!("read error: {e}"))),
                }
            }
        }

        let status = child
            .wait()
            .await
            .map_err(|e| OpError::Failure(format!("wait failed: {e}")))?;
        if !status.success() {
            return Err(OpError::Failure(format!("'{program}' exited with {status}")));
        }

        Ok(vec![json!(captured)])
    }
}

/// The registry the server and CLI start from.
pub fn builtin_registry() -> NodeRegistry {
    NodeRegistry::builder()
        .register(
            RegistryEntry::new("text_source", "source", Arc::new(TextSource))
                .with_widget(WidgetSpec::new("text", ValueKind::Text).with_default(json!("")))
                .with_output("text", ValueKind::Text),
        )
        .register(
            RegistryEntry::new("template", "transform", Arc::new(Template))
                .with_input(InputSpec::new("values", ValueKind::Object))
                .with_widget(WidgetSpec::new("template", ValueKind::Text))
                .with_output("text", ValueKind::Text),
        )
        .register(
            RegistryEntry::new("concat", "transform", Arc::new(Concat))
                .with_input(InputSpec::new("items", ValueKind::Text).multiple())
                .with_widget(WidgetSpec::new("separator", ValueKind::Text).with_default(json!("\n")))
                .with_output("text", ValueKind::Text),
        )
        .register(
            RegistryEntry::new("save_text", "sink", Arc::new(SaveText))
                .with_input(InputSpec::new("text", ValueKind::Text))
                .with_widget(WidgetSpec::new("directory", ValueKind::Text).with_default(json!("output")))
                .with_widget(WidgetSpec::new("filename", ValueKind::Text).with_default(json!("output.txt")))
                .with_output("path", ValueKind::Text),
        )
        .register(
            RegistryEntry::new("command", "process", Arc::new(Command))
                .with_widget(WidgetSpec::new("program", ValueKind::Text))
                .with_widget(WidgetSpec::new("args", ValueKind::List).with_default(json!([])))
                .with_output("output", ValueKind::Text),
        )
        .build()
}
