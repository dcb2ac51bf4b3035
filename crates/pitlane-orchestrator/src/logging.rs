//! C8 (part) — per-unit debug logs. `tracing` dispatches globally rather
//! than through per-call logger objects, so the Python original's "one
//! `logging.Logger` instance per unit, with its own file handler" becomes a
//! second `tracing_subscriber::Layer` here: events emitted under a span
//! tagged `unit = "<name>"` are additionally appended to that unit's own
//! `debug.log` via `tracing-appender::non_blocking`.

use std::collections::HashMap;
use std::fs::File;
use std::io::Write as _;
use std::path::Path;
use std::sync::Mutex;

use pitlane_core::{PitlaneError, Result};
use tracing::field::{Field, Visit};
use tracing::span::{Attributes, Id};
use tracing::{Event, Subscriber};
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::layer::{Context, Layer};
use tracing_subscriber::registry::LookupSpan;

const UNIT_FIELD: &str = "unit";

struct UnitSpanTag(String);

/// `tracing_subscriber::Layer` that tees events under a unit-tagged span
/// into that unit's registered `debug.log`. Safe to clone and install once
/// for the whole run; units register themselves as their spans open.
#[derive(Clone)]
pub struct UnitLogLayer {
    writers: std::sync::Arc<Mutex<HashMap<String, Mutex<NonBlocking>>>>,
    guards: std::sync::Arc<Mutex<Vec<WorkerGuard>>>,
}

impl UnitLogLayer {
    pub fn new() -> Self {
        UnitLogLayer {
            writers: std::sync::Arc::new(Mutex::new(HashMap::new())),
            guards: std::sync::Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Open `path` as the `debug.log` for unit `name`. A name already
    /// registered in this run is a programmer error: two units would
    /// otherwise mix into one log.
    pub fn register(&self, name: &str, path: &Path) -> Result<()> {
        let mut writers = self.writers.lock().unwrap();
        if writers.contains_key(name) {
            return Err(PitlaneError::DuplicateUnitLogger(name.to_string()));
        }
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = File::create(path)?;
        let (non_blocking, guard) = tracing_appender::non_blocking(file);
        writers.insert(name.to_string(), Mutex::new(non_blocking));
        self.guards.lock().unwrap().push(guard);
        Ok(())
    }
}

impl Default for UnitLogLayer {
    fn default() -> Self {
        Self::new()
    }
}

struct UnitFieldVisitor(Option<String>);

impl Visit for UnitFieldVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == UNIT_FIELD {
            self.0 = Some(format!("{value:?}").trim_matches('"').to_string());
        }
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == UNIT_FIELD {
            self.0 = Some(value.to_string());
        }
    }
}

struct MessageVisitor(String);

impl Visit for MessageVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.0 = format!("{value:?}");
        } else {
            let _ = write!(self.0, " {}={:?}", field.name(), value);
        }
    }
}

impl<S> Layer<S> for UnitLogLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_new_span(&self, attrs: &Attributes<'_>, id: &Id, ctx: Context<'_, S>) {
        let mut visitor = UnitFieldVisitor(None);
        attrs.record(&mut visitor);
        if let Some(unit) = visitor.0 {
            if let Some(span) = ctx.span(id) {
                span.extensions_mut().insert(UnitSpanTag(unit));
            }
        }
    }

    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
        let Some(scope) = ctx.event_scope(event) else { return };
        let unit = scope
            .from_root()
            .find_map(|span| span.extensions().get::<UnitSpanTag>().map(|tag| tag.0.clone()));
        let Some(unit) = unit else { return };

        let writers = self.writers.lock().unwrap();
        let Some(writer) = writers.get(&unit) else { return };

        let mut message = MessageVisitor(String::new());
        event.record(&mut message);
        let mut writer = writer.lock().unwrap();
        let _ = writeln!(writer, "{} {}", event.metadata().level(), message.0);
    }
}

/// `tracing_subscriber::Layer` that tees every event in the whole run
/// (unit-tagged or not) into the run's top-level `debug.log`. Separate from
/// `UnitLogLayer` because a unit's own log should hold only that unit's
/// events, while the run log is the union of all of them plus orchestrator-
/// level events (filter probing, dispatch, aggregation) that belong to no
/// unit span at all.
#[derive(Clone)]
pub struct RunLogLayer {
    writer: std::sync::Arc<Mutex<Option<Mutex<NonBlocking>>>>,
    guard: std::sync::Arc<Mutex<Option<WorkerGuard>>>,
}

impl RunLogLayer {
    pub fn new() -> Self {
        RunLogLayer { writer: std::sync::Arc::new(Mutex::new(None)), guard: std::sync::Arc::new(Mutex::new(None)) }
    }

    /// Open `path` as this run's `debug.log`. Must be called once, before
    /// any other unit of work in the run emits a tracing event.
    pub fn register(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = File::create(path)?;
        let (non_blocking, guard) = tracing_appender::non_blocking(file);
        *self.writer.lock().unwrap() = Some(Mutex::new(non_blocking));
        *self.guard.lock().unwrap() = Some(guard);
        Ok(())
    }
}

impl Default for RunLogLayer {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> Layer<S> for RunLogLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let writer = self.writer.lock().unwrap();
        let Some(writer) = writer.as_ref() else { return };

        let mut message = MessageVisitor(String::new());
        event.record(&mut message);
        let mut writer = writer.lock().unwrap();
        let _ = writeln!(writer, "{} {}", event.metadata().level(), message.0);
    }
}
