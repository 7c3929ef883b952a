use crate::core::error::StorageError;
use crate::stores::key_value::{lock, KeyValueStore};
use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// The log is rewritten once it holds more than this many lines and more
/// than twice as many lines as live entries.
const COMPACT_MIN_LINES: usize = 64;

/// Store log operation types
#[derive(Debug, Clone, PartialEq)]
enum LogOperation {
    Set { key: String, value: String },
    Remove { keys: Vec<String> },
}

impl LogOperation {
    // Keys and values are hex-encoded so separators and newlines in JSON
    // payloads never break the line format.
    fn to_line(&self) -> String {
        match self {
            LogOperation::Set { key, value } => {
                format!("SET|{}|{}", hex::encode(key), hex::encode(value))
            }
            LogOperation::Remove { keys } => {
                let keys: Vec<String> = keys.iter().map(hex::encode).collect();
                format!("REMOVE|{}", keys.join("|"))
            }
        }
    }

    fn from_line(line: &str) -> Result<Self, String> {
        let parts: Vec<&str> = line.split('|').collect();

        match parts.first() {
            Some(&"SET") => {
                if parts.len() != 3 {
                    return Err("Invalid SET format".to_string());
                }
                Ok(LogOperation::Set {
                    key: decode_field(parts[1])?,
                    value: decode_field(parts[2])?,
                })
            }
            Some(&"REMOVE") => {
                if parts.len() < 2 {
                    return Err("Invalid REMOVE format".to_string());
                }
                let keys = parts[1..]
                    .iter()
                    .map(|part| decode_field(part))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(LogOperation::Remove { keys })
            }
            _ => Err("Unknown operation type".to_string()),
        }
    }

    fn apply(self, entries: &mut HashMap<String, String>) {
        match self {
            LogOperation::Set { key, value } => {
                entries.insert(key, value);
            }
            LogOperation::Remove { keys } => {
                for key in keys {
                    entries.remove(&key);
                }
            }
        }
    }
}

fn decode_field(field: &str) -> Result<String, String> {
    let bytes = hex::decode(field).map_err(|e| format!("Invalid hex field: {e}"))?;
    String::from_utf8(bytes).map_err(|e| format!("Field is not UTF-8: {e}"))
}

struct Inner {
    file: File,
    entries: HashMap<String, String>,
    /// Operation lines currently in the log file
    lines: usize,
}

impl Inner {
    fn needs_compaction(&self) -> bool {
        self.lines > COMPACT_MIN_LINES && self.lines > 2 * self.entries.len()
    }
}

/// File-backed store that survives restarts.
///
/// Every mutation is appended to the log as a single line and flushed before
/// the in-memory mirror changes, so reads never run ahead of the disk.
/// Superseded lines are dropped on open and whenever they come to dominate
/// the log, so the file stays proportional to the live entries.
pub struct FileStore {
    inner: Mutex<Inner>,
    path: PathBuf,
}

impl FileStore {
    /// Open (or create) the log at `path`, replay it and drop superseded
    /// lines.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let path = path.into();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        let (entries, lines) = replay(&path)?;

        tracing::debug!(
            path = %path.display(),
            entries = entries.len(),
            lines,
            "Session storage opened"
        );

        let mut inner = Inner {
            file,
            entries,
            lines,
        };
        if inner.lines > inner.entries.len() {
            rewrite(&path, &mut inner)?;
        }

        Ok(FileStore {
            inner: Mutex::new(inner),
            path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Rewrite the log as a snapshot of the current entries.
    pub fn compact(&self) -> Result<(), StorageError> {
        let mut inner = lock(&self.inner);
        rewrite(&self.path, &mut inner)
    }

    fn log_operation(&self, op: LogOperation) -> Result<(), StorageError> {
        let mut inner = lock(&self.inner);
        writeln!(inner.file, "{}", op.to_line())?;
        inner.file.flush()?;
        inner.lines += 1;
        op.apply(&mut inner.entries);

        if inner.needs_compaction() {
            // The operation is already durable; a failed rewrite only
            // leaves the log longer than it needs to be.
            if let Err(e) = rewrite(&self.path, &mut inner) {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %e,
                    "Failed to compact session storage"
                );
            }
        }
        Ok(())
    }
}

fn rewrite(path: &Path, inner: &mut Inner) -> Result<(), StorageError> {
    let tmp_path = path.with_extension("compact");
    {
        let mut tmp = File::create(&tmp_path)?;
        let mut keys: Vec<&String> = inner.entries.keys().collect();
        keys.sort();
        for key in keys {
            let op = LogOperation::Set {
                key: key.clone(),
                value: inner.entries[key].clone(),
            };
            writeln!(tmp, "{}", op.to_line())?;
        }
        tmp.sync_all()?;
    }
    fs::rename(&tmp_path, path)?;

    inner.file = OpenOptions::new().append(true).open(path)?;
    let dropped = inner.lines.saturating_sub(inner.entries.len());
    inner.lines = inner.entries.len();

    tracing::debug!(
        path = %path.display(),
        entries = inner.entries.len(),
        dropped,
        "Session storage compacted"
    );

    Ok(())
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(lock(&self.inner).entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.log_operation(LogOperation::Set {
            key: key.to_string(),
            value: value.to_string(),
        })
    }

    fn remove(&self, keys: &[&str]) -> Result<(), StorageError> {
        if keys.is_empty() {
            return Ok(());
        }
        self.log_operation(LogOperation::Remove {
            keys: keys.iter().map(|k| k.to_string()).collect(),
        })
    }
}

/// Rebuild the entries from the log, returning them with the number of
/// non-empty lines read.
fn replay(path: &Path) -> io::Result<(HashMap<String, String>, usize)> {
    let reader = BufReader::new(File::open(path)?);
    let mut entries = HashMap::new();
    let mut lines = 0;

    for (line_num, line_result) in reader.lines().enumerate() {
        let line = line_result?;
        let line = line.trim();

        // Skip empty lines
        if line.is_empty() {
            continue;
        }
        lines += 1;

        match LogOperation::from_line(line) {
            Ok(op) => op.apply(&mut entries),
            Err(e) => {
                tracing::warn!(
                    line_num = line_num + 1,
                    error = %e,
                    "Failed to parse storage log line, skipping"
                );
            }
        }
    }

    Ok((entries, lines))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_log_line_format() {
        let op = LogOperation::Set {
            key: "user".to_string(),
            value: "{\"a\":\"x|y\"}\n".to_string(),
        };
        let line = op.to_line();
        assert!(!line.contains('\n'));
        assert_eq!(line.matches('|').count(), 2);
        assert_eq!(LogOperation::from_line(&line).unwrap(), op);

        let op = LogOperation::Remove {
            keys: vec!["loggedIn".to_string(), "user".to_string()],
        };
        assert_eq!(LogOperation::from_line(&op.to_line()).unwrap(), op);
    }

    #[test]
    fn test_log_line_rejects_garbage() {
        assert!(LogOperation::from_line("SET|zz|00").is_err());
        assert!(LogOperation::from_line("SET|6b").is_err());
        assert!(LogOperation::from_line("REMOVE").is_err());
        assert!(LogOperation::from_line("DROP|6b").is_err());
    }

    #[test]
    fn test_values_survive_reopen() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("session.log");

        {
            let store = FileStore::open(&path).unwrap();
            store.set("loggedIn", "true").unwrap();
            store.set("user", "{\"name\":\"Ana\"}").unwrap();
            store.set("user", "{\"name\":\"Luis\"}").unwrap();
        }

        let store = FileStore::open(&path).unwrap();
        assert_eq!(store.get("loggedIn").unwrap().as_deref(), Some("true"));
        assert_eq!(
            store.get("user").unwrap().as_deref(),
            Some("{\"name\":\"Luis\"}")
        );
    }

    #[test]
    fn test_batch_remove_survives_reopen() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("session.log");

        {
            let store = FileStore::open(&path).unwrap();
            store.set("loggedIn", "true").unwrap();
            store.set("user", "{}").unwrap();
            store.remove(&["loggedIn", "user"]).unwrap();
        }

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().filter(|l| l.starts_with("REMOVE")).count(), 1);

        let store = FileStore::open(&path).unwrap();
        assert!(store.get("loggedIn").unwrap().is_none());
        assert!(store.get("user").unwrap().is_none());
    }

    #[test]
    fn test_replay_skips_malformed_lines() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("session.log");

        let good = LogOperation::Set {
            key: "loggedIn".to_string(),
            value: "true".to_string(),
        };
        fs::write(&path, format!("garbage\n\n{}\nSET|nothex|00\n", good.to_line())).unwrap();

        let store = FileStore::open(&path).unwrap();
        assert_eq!(store.get("loggedIn").unwrap().as_deref(), Some("true"));

        // The bad lines are gone after the open-time rewrite
        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().collect::<Vec<_>>(), vec![good.to_line()]);
    }

    #[test]
    fn test_compact_keeps_entries() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("session.log");

        let store = FileStore::open(&path).unwrap();
        for i in 0..10 {
            store.set("user", &format!("{{\"visits\":{i}}}")).unwrap();
        }
        store.set("loggedIn", "true").unwrap();

        store.compact().unwrap();
        assert_eq!(fs::read_to_string(store.path()).unwrap().lines().count(), 2);

        // Appends after compaction land in the new file
        store.remove(&["loggedIn"]).unwrap();
        drop(store);

        let store = FileStore::open(&path).unwrap();
        assert!(store.get("loggedIn").unwrap().is_none());
        assert_eq!(
            store.get("user").unwrap().as_deref(),
            Some("{\"visits\":9}")
        );
    }

    #[test]
    fn test_log_stays_bounded_under_repeated_writes() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("session.log");

        let store = FileStore::open(&path).unwrap();
        for i in 0..1000 {
            store.set("loggedIn", "true").unwrap();
            store.set("user", &format!("{{\"visits\":{i}}}")).unwrap();
            if i % 10 == 0 {
                store.remove(&["loggedIn", "user"]).unwrap();
            }
        }

        let lines = fs::read_to_string(&path).unwrap().lines().count();
        assert!(lines <= COMPACT_MIN_LINES + 1, "log grew to {lines} lines");
        assert_eq!(
            store.get("user").unwrap().as_deref(),
            Some("{\"visits\":999}")
        );
        drop(store);

        let store = FileStore::open(&path).unwrap();
        assert_eq!(store.get("loggedIn").unwrap().as_deref(), Some("true"));
        assert_eq!(
            store.get("user").unwrap().as_deref(),
            Some("{\"visits\":999}")
        );
        assert_eq!(fs::read_to_string(&path).unwrap().lines().count(), 2);
    }

    #[test]
    fn test_open_drops_superseded_lines() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("session.log");

        {
            let store = FileStore::open(&path).unwrap();
            for i in 0..20 {
                store.set("user", &format!("{i}")).unwrap();
            }
        }
        assert_eq!(fs::read_to_string(&path).unwrap().lines().count(), 20);

        let store = FileStore::open(&path).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap().lines().count(), 1);
        assert_eq!(store.get("user").unwrap().as_deref(), Some("19"));
    }
}
