use chrono::Local;
use std::collections::VecDeque;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock};
use tracing::Level;
use tracing_subscriber::fmt::MakeWriter;

/// Maximum number of log entries to keep in memory
const MAX_LOG_ENTRIES: usize = 1000;

/// A log entry with timestamp and message
#[derive(Debug, Clone)]
pub struct LogEntry {
    pub timestamp: String,
    pub level: String,
    pub target: String,
    pub message: String,
}

impl LogEntry {
    pub fn new(level: Level, target: &str, message: String) -> Self {
        Self {
            timestamp: Local::now().format("%H:%M:%S.%3f").to_string(),
            level: level.to_string().to_uppercase(),
            target: target.to_string(),
            message,
        }
    }

    /// Parse one line of the compact fmt output: "LEVEL target: message"
    pub fn parse_compact(line: &str) -> Self {
        let levels = [
            ("TRACE ", Level::TRACE),
            ("DEBUG ", Level::DEBUG),
            ("INFO ", Level::INFO),
            ("WARN ", Level::WARN),
            ("ERROR ", Level::ERROR),
        ];

        let Some((level, rest)) = levels.iter().find_map(|(prefix, level)| {
            line.strip_prefix(prefix).map(|rest| (*level, rest.trim_start()))
        }) else {
            return Self::new(Level::INFO, "general", line.to_string());
        };

        // Targets are module paths, so split on ": " rather than ':'
        match rest.split_once(": ") {
            Some((target, msg)) if !target.contains(' ') => {
                Self::new(level, target, msg.trim().to_string())
            }
            _ => Self::new(level, "general", rest.to_string()),
        }
    }

    pub fn format_for_display(&self) -> String {
        format!(
            "[{}] {} [{}] {}",
            self.timestamp, self.level, self.target, self.message
        )
    }
}

/// Thread-safe ring buffer for log entries
#[derive(Clone, Default)]
pub struct LogRingBuffer {
    entries: Arc<Mutex<VecDeque<LogEntry>>>,
}

impl LogRingBuffer {
    pub fn new() -> Self {
        Self {
            entries: Arc::new(Mutex::new(VecDeque::with_capacity(MAX_LOG_ENTRIES))),
        }
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<LogEntry>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn push(&self, entry: LogEntry) {
        let mut entries = self.lock();
        if entries.len() >= MAX_LOG_ENTRIES {
            entries.pop_front();
        }
        entries.push_back(entry);
    }

    pub fn get_recent(&self, count: usize) -> Vec<LogEntry> {
        let entries = self.lock();
        entries.iter().rev().take(count).rev().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

/// Writer that copies every formatted line into the ring buffer and, when
/// present, the log file
#[derive(Clone)]
pub struct TeeWriter {
    buffer: LogRingBuffer,
    file: Option<Arc<Mutex<File>>>,
}

impl TeeWriter {
    pub fn new(buffer: LogRingBuffer, file: Option<File>) -> Self {
        Self {
            buffer,
            file: file.map(|f| Arc::new(Mutex::new(f))),
        }
    }
}

impl Write for TeeWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        if let Ok(text) = std::str::from_utf8(buf) {
            for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
                self.buffer.push(LogEntry::parse_compact(line));
            }
        }

        if let Some(file) = &self.file {
            let mut file = file.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            write!(file, "{} ", Local::now().format("%Y-%m-%d %H:%M:%S%.3f"))?;
            file.write_all(buf)?;
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        if let Some(file) = &self.file {
            file.lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner())
                .flush()?;
        }
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for TeeWriter {
    type Writer = Self;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// Global log buffer accessible throughout the application
static LOG_BUFFER: OnceLock<LogRingBuffer> = OnceLock::new();

/// Get the global log buffer
pub fn get_log_buffer() -> Option<LogRingBuffer> {
    LOG_BUFFER.get().cloned()
}

/// Create a timestamped log file in `log_dir` and point `latest.log` at it
fn open_log_file(log_dir: &Path) -> std::io::Result<(File, PathBuf)> {
    std::fs::create_dir_all(log_dir)?;
    let timestamp = Local::now().format("%Y%m%d_%H%M%S");
    let log_path = log_dir.join(format!("roster-console_{}.log", timestamp));
    let file = File::create(&log_path)?;

    let latest_path = log_dir.join("latest.log");
    #[cfg(unix)]
    {
        let _ = std::fs::remove_file(&latest_path);
        let _ = std::os::unix::fs::symlink(&log_path, &latest_path);
    }
    #[cfg(not(unix))]
    {
        let _ = std::fs::write(&latest_path, format!("Current log file: {}\n", log_path.display()));
    }

    Ok((file, log_path))
}

/// Initialize tracing with the ring buffer and, if `log_dir` is usable, a log file.
///
/// Returns the log file path when one was opened.
pub fn init_tracing(log_dir: Option<&Path>) -> Option<PathBuf> {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let (file, log_path) = match log_dir.map(open_log_file) {
        Some(Ok((file, path))) => (Some(file), Some(path)),
        Some(Err(e)) => {
            eprintln!("Could not open log file: {}", e);
            (None, None)
        }
        None => (None, None),
    };

    let buffer = LOG_BUFFER.get_or_init(LogRingBuffer::new).clone();
    let writer = TeeWriter::new(buffer, file);

    let fmt_layer = fmt::layer()
        .with_writer(writer)
        .with_target(true)
        .with_level(true)
        .with_ansi(false)
        .without_time() // timestamps are added per sink
        .compact();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    if tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init()
        .is_err()
    {
        eprintln!("Tracing was already initialized");
    }

    log_path
}
