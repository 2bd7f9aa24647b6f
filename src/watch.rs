//! Content input watcher for the serve pipeline.
//!
//! The upstream fetch stage rewrites the content objects file; this
//! module notices, debounces the event burst, and re-runs the transform
//! so the cache and connected live-update clients stay current.
//!
//! ```text
//! ┌──────────┐    ┌──────────┐    ┌──────────────────────────┐
//! │ notify   │───▶│ Debouncer│───▶│ load_objects + transform │
//! │ events   │    │ (300ms)  │    │  (publishes change event)│
//! └──────────┘    └──────────┘    └──────────────────────────┘
//! ```

use crate::log;
use crate::transform::{Transformer, load_objects};
use anyhow::{Context, Result};
use notify::{Event, EventKind, RecursiveMode, Watcher};
use rustc_hash::FxHashSet;
use std::{
    path::{Path, PathBuf},
    sync::{
        Arc, mpsc,
        atomic::{AtomicBool, Ordering},
    },
    time::{Duration, Instant},
};

/// Upper bound on idle waits so the shutdown flag stays responsive.
const IDLE_TIMEOUT: Duration = Duration::from_secs(1);

// =============================================================================
// Path Utilities
// =============================================================================

/// Check if path is a temp/backup file (editor artifacts).
fn is_temp_file(path: &Path) -> bool {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");

    matches!(ext, "bck" | "bak" | "backup" | "swp" | "swo" | "tmp")
        || name.ends_with('~')
        || name.starts_with('.')
}

const fn is_relevant(event: &Event) -> bool {
    matches!(event.kind, EventKind::Modify(_) | EventKind::Create(_))
}

// =============================================================================
// Debounce State
// =============================================================================

/// Batches rapid file events behind a quiet-time threshold.
struct Debouncer {
    pending: FxHashSet<PathBuf>,
    last_event: Option<Instant>,
    quiet_time: Duration,
}

impl Debouncer {
    fn new(quiet_time: Duration) -> Self {
        Self {
            pending: FxHashSet::default(),
            last_event: None,
            quiet_time,
        }
    }

    fn add(&mut self, event: Event) {
        for path in event.paths {
            if !is_temp_file(&path) {
                self.pending.insert(path);
            }
        }
        self.last_event = Some(Instant::now());
    }

    fn ready(&self) -> bool {
        !self.pending.is_empty()
            && self
                .last_event
                .is_some_and(|t| t.elapsed() >= self.quiet_time)
    }

    fn take(&mut self) -> Vec<PathBuf> {
        self.last_event = None;
        self.pending.drain().collect()
    }

    fn timeout(&self) -> Duration {
        if self.pending.is_empty() {
            IDLE_TIMEOUT
        } else {
            self.quiet_time
        }
    }
}

// =============================================================================
// Serve Loop
// =============================================================================

/// Bootstrap, run an initial transform, then watch the content input
/// file and re-transform on change. Blocks until Ctrl+C.
pub fn serve_blocking(transformer: &mut Transformer) -> Result<()> {
    transformer.bootstrap()?;

    let input = transformer.config().serve.input.clone();
    let quiet_time = Duration::from_millis(transformer.config().serve.debounce_ms);

    // Initial run so clients have data before the first change arrives.
    run_transform(transformer, &input);

    let (tx, rx) = mpsc::channel();
    let mut watcher =
        notify::recommended_watcher(tx).context("failed to create file watcher")?;

    // Watch the parent directory: fetch stages typically replace the
    // input file via rename, which a file-level watch would lose.
    let watch_root = input
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    watcher
        .watch(watch_root, RecursiveMode::NonRecursive)
        .with_context(|| format!("failed to watch '{}'", watch_root.display()))?;
    log!("watch"; "watching '{}' for content changes", input.display());

    let running = Arc::new(AtomicBool::new(true));
    {
        let running = Arc::clone(&running);
        ctrlc::set_handler(move || {
            log!("serve"; "shutting down...");
            running.store(false, Ordering::SeqCst);
        })
        .context("failed to set Ctrl+C handler")?;
    }

    let mut debouncer = Debouncer::new(quiet_time);
    while running.load(Ordering::SeqCst) {
        match rx.recv_timeout(debouncer.timeout()) {
            Ok(Ok(event)) if is_relevant(&event) => debouncer.add(event),
            Ok(Ok(_)) => {}
            Ok(Err(err)) => log!("watch"; "error: {err}"),
            Err(mpsc::RecvTimeoutError::Timeout) if debouncer.ready() => {
                let changed = debouncer.take();
                if changed
                    .iter()
                    .any(|path| path.file_name() == input.file_name())
                {
                    run_transform(transformer, &input);
                }
            }
            Err(mpsc::RecvTimeoutError::Timeout) => {}
            Err(mpsc::RecvTimeoutError::Disconnected) => break,
        }
    }

    Ok(())
}

/// One watch-triggered pipeline run. Failures are logged, never fatal to
/// the loop: the next input rewrite gets another chance.
fn run_transform(transformer: &Transformer, input: &Path) {
    match load_objects(input).and_then(|objects| transformer.transform(objects)) {
        Ok(data) => {
            log!(
                "watch";
                "transformed {} objects into {} pages",
                data.objects.len(),
                data.pages.len()
            );
        }
        Err(err) => log!("watch"; "transform failed ({}): {err:#}", input.display()),
    }
}
