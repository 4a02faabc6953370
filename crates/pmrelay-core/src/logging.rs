//! File logging with size-triggered rotation.

use std::{
    fs::{self, File, OpenOptions},
    io::{self, Write},
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
    time::{Duration, SystemTime},
};

use tracing_appender::non_blocking::WorkerGuard;

use crate::Result;

pub const LOG_FILE: &str = "bot.log";
pub const MAX_LOG_SIZE: u64 = 10 * 1024 * 1024;
pub const MAX_LOG_BACKUPS: usize = 5;
pub const MAX_BACKUP_AGE: Duration = Duration::from_secs(30 * 24 * 60 * 60);

/// Log file that rolls over to `<name>.1 .. <name>.N` once it grows past a limit.
///
/// Cloning shares the same underlying file; one clone goes to the tracing
/// writer, the other stays with the lifecycle code for `reopen()`.
#[derive(Clone)]
pub struct RotatingFile {
    inner: Arc<Mutex<Inner>>,
}

struct Inner {
    path: PathBuf,
    max_size: u64,
    max_backups: usize,
    file: File,
    size: u64,
}

impl RotatingFile {
    pub fn open(path: impl Into<PathBuf>, max_size: u64, max_backups: usize) -> io::Result<Self> {
        let path = path.into();
        let (file, size) = open_checked(&path, max_size, max_backups)?;
        Ok(Self {
            inner: Arc::new(Mutex::new(Inner {
                path,
                max_size,
                max_backups,
                file,
                size,
            })),
        })
    }

    /// Re-check the size limit and reopen the file (reload signal).
    pub fn reopen(&self) -> io::Result<()> {
        let mut inner = self.lock()?;
        inner.file.flush()?;
        let (file, size) = open_checked(&inner.path, inner.max_size, inner.max_backups)?;
        inner.file = file;
        inner.size = size;
        Ok(())
    }

    pub fn path(&self) -> PathBuf {
        self.lock()
            .map(|inner| inner.path.clone())
            .unwrap_or_default()
    }

    fn lock(&self) -> io::Result<std::sync::MutexGuard<'_, Inner>> {
        self.inner
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "log file lock poisoned"))
    }
}

impl Write for RotatingFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut inner = self.lock()?;
        let n = inner.file.write(buf)?;
        inner.size += n as u64;
        if inner.size > inner.max_size {
            inner.file.flush()?;
            rotate(&inner.path, inner.max_backups)?;
            inner.file = append_open(&inner.path)?;
            inner.size = 0;
        }
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.lock()?.file.flush()
    }
}

fn append_open(path: &Path) -> io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path)
}

fn open_checked(path: &Path, max_size: u64, max_backups: usize) -> io::Result<(File, u64)> {
    if let Ok(md) = fs::metadata(path) {
        if md.len() > max_size {
            rotate(path, max_backups)?;
        }
    }
    let file = append_open(path)?;
    let size = file.metadata()?.len();
    Ok((file, size))
}

fn backup_path(path: &Path, index: usize) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(format!(".{index}"));
    PathBuf::from(name)
}

fn rotate(path: &Path, max_backups: usize) -> io::Result<()> {
    if max_backups == 0 {
        return fs::remove_file(path);
    }
    for i in (1..max_backups).rev() {
        let from = backup_path(path, i);
        if from.exists() {
            fs::rename(&from, backup_path(path, i + 1))?;
        }
    }
    fs::rename(path, backup_path(path, 1))
}

/// Delete rotated backups of `path` last modified more than `max_age` ago.
pub fn prune_backups(path: &Path, max_age: Duration) -> io::Result<usize> {
    let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
        return Ok(0);
    };
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let prefix = format!("{file_name}.");
    let now = SystemTime::now();

    let mut removed = 0;
    for ent in fs::read_dir(dir)?.flatten() {
        let name = ent.file_name().to_string_lossy().to_string();
        let is_backup = name
            .strip_prefix(&prefix)
            .is_some_and(|n| n.parse::<usize>().is_ok());
        if !is_backup {
            continue;
        }
        let modified = ent.metadata().and_then(|m| m.modified())?;
        if now.duration_since(modified).unwrap_or_default() > max_age {
            fs::remove_file(ent.path())?;
            removed += 1;
        }
    }
    Ok(removed)
}

/// Keeps the non-blocking writer alive and gives access to the log file.
pub struct LogHandle {
    file: RotatingFile,
    _guard: WorkerGuard,
}

impl LogHandle {
    pub fn reopen(&self) -> io::Result<()> {
        self.file.reopen()
    }

    pub fn prune_backups(&self) -> io::Result<usize> {
        prune_backups(&self.file.path(), MAX_BACKUP_AGE)
    }
}

/// Route panics through tracing, with a captured backtrace.
pub fn install_panic_hook() {
    std::panic::set_hook(Box::new(|info| {
        let backtrace = std::backtrace::Backtrace::force_capture();
        tracing::error!("panic: {info}\n{backtrace}");
    }));
}

/// Initialize logging for the bot.
///
/// Default: info for everything. Can be overridden with `RUST_LOG`.
pub fn init(service_name: &str, path: &Path) -> Result<LogHandle> {
    use tracing_subscriber::{fmt, EnvFilter};

    let file = RotatingFile::open(path, MAX_LOG_SIZE, MAX_LOG_BACKUPS)?;
    let (writer, guard) = tracing_appender::non_blocking(file.clone());

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("info,{service_name}=info")));

    fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .with_target(false)
        .with_file(true)
        .with_line_number(true)
        .init();

    Ok(LogHandle {
        file,
        _guard: guard,
    })
}
