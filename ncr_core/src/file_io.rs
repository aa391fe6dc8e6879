//! # File I/O
//!
//! Plumbing for the JSON files the crate owns: the config file and the
//! file-backed store.
//!
//! - [`write_atomic`] never leaves a half-written target: bytes go to a
//!   sibling `.tmp` file, which is synced and renamed over the target.
//! - [`FileLock`] serializes writers. The OS lock (fs2) decides who wins;
//!   the JSON body of the `<file>.<ext>.lock` sidecar only tells the loser
//!   who is holding it.
//! - [`validate_version`] rejects files written by an incompatible schema.
//!
//! ```rust,no_run
//! use ncr_core::file_io::{write_json_atomic, FileLock};
//! use std::path::Path;
//!
//! let path = Path::new("ncr_store.json");
//! let lock = FileLock::acquire(path, "qa@company.com").unwrap();
//! write_json_atomic(&serde_json::json!({"version": "0.1.0"}), path).unwrap();
//! drop(lock); // sidecar removed
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::errors::{NcrError, NcrResult};

/// Age after which a sidecar is ignored even if its process looks alive
const LOCK_MAX_AGE_HOURS: i64 = 24;

/// Who holds a store lock; the body of the `.lock` sidecar
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LockInfo {
    pub user_id: String,
    pub machine: String,
    pub pid: u32,
    pub locked_at: DateTime<Utc>,
}

impl LockInfo {
    /// Holder record for this process
    pub fn new(user_id: impl Into<String>) -> Self {
        LockInfo {
            user_id: user_id.into(),
            machine: machine_name().unwrap_or_else(|| "unknown".to_string()),
            pid: std::process::id(),
            locked_at: Utc::now(),
        }
    }

    /// `user (machine)`, as shown in `FILE_LOCKED` errors
    pub fn holder(&self) -> String {
        format!("{} ({})", self.user_id, self.machine)
    }

    /// A sidecar is stale when its process is gone from this machine or it
    /// has outlived [`LOCK_MAX_AGE_HOURS`].
    pub fn is_stale(&self) -> bool {
        let same_machine = machine_name().is_some_and(|m| m == self.machine);
        if same_machine && !process_alive(self.pid) {
            return true;
        }
        Utc::now() - self.locked_at > Duration::hours(LOCK_MAX_AGE_HOURS)
    }
}

fn machine_name() -> Option<String> {
    let vars: &[&str] = if cfg!(windows) {
        &["COMPUTERNAME"]
    } else {
        &["HOSTNAME", "HOST"]
    };
    vars.iter().find_map(|v| std::env::var(v).ok())
}

/// Best effort: unknown platforms report every process as alive.
fn process_alive(pid: u32) -> bool {
    #[cfg(unix)]
    {
        Path::new(&format!("/proc/{pid}")).exists() || !Path::new("/proc/self").exists()
    }
    #[cfg(windows)]
    {
        std::process::Command::new("tasklist")
            .args(["/FI", &format!("PID eq {pid}"), "/NH"])
            .output()
            .map(|out| String::from_utf8_lossy(&out.stdout).contains(&pid.to_string()))
            .unwrap_or(true)
    }
    #[cfg(not(any(unix, windows)))]
    {
        let _ = pid;
        true
    }
}

/// `store.json` -> `store.json.lock`
#[cfg_attr(target_arch = "wasm32", allow(dead_code))]
fn sidecar_path(path: &Path) -> PathBuf {
    let mut sidecar = path.as_os_str().to_owned();
    sidecar.push(".lock");
    PathBuf::from(sidecar)
}

#[cfg(not(target_arch = "wasm32"))]
pub use native_lock::FileLock;

#[cfg(not(target_arch = "wasm32"))]
mod native_lock {
    use std::fs::{self, File, OpenOptions};
    use std::io::{Read, Seek, SeekFrom, Write};
    use std::path::{Path, PathBuf};

    use fs2::FileExt;

    use super::{sidecar_path, LockInfo};
    use crate::errors::{NcrError, NcrResult};

    /// Exclusive writer lock on one file; released on drop.
    #[derive(Debug)]
    pub struct FileLock {
        target: PathBuf,
        sidecar: PathBuf,
        // holds the OS lock for as long as the guard lives
        _handle: File,
        pub info: LockInfo,
    }

    impl FileLock {
        /// Take the lock for `user_id`.
        ///
        /// Fails with `FILE_LOCKED` when another process holds the OS lock,
        /// or when the sidecar names a live holder that does not use OS
        /// locks (another machine on a share). The sidecar body is only
        /// rewritten once the OS lock is ours.
        pub fn acquire(path: &Path, user_id: impl Into<String>) -> NcrResult<Self> {
            let sidecar = sidecar_path(path);
            let io_err = |op: &str, e: std::io::Error| NcrError::file_error(op, sidecar.display().to_string(), e.to_string());

            let mut handle = OpenOptions::new()
                .read(true)
                .write(true)
                .create(true)
                .truncate(false)
                .open(&sidecar)
                .map_err(|e| io_err("open lock", e))?;

            if handle.try_lock_exclusive().is_err() {
                let (holder, since) = match read_holder(&mut handle) {
                    Some(info) => (info.holder(), info.locked_at.to_rfc3339()),
                    None => ("another process".to_string(), "unknown".to_string()),
                };
                return Err(NcrError::file_locked(path.display().to_string(), holder, since));
            }

            if let Some(previous) = read_holder(&mut handle) {
                if !previous.is_stale() && previous.pid != std::process::id() {
                    let _ = handle.unlock();
                    return Err(NcrError::file_locked(
                        path.display().to_string(),
                        previous.holder(),
                        previous.locked_at.to_rfc3339(),
                    ));
                }
                tracing::debug!(holder = %previous.holder(), "replacing stale lock record");
            }

            let info = LockInfo::new(user_id);
            let body = serde_json::to_vec_pretty(&info)?;
            handle.set_len(0).map_err(|e| io_err("truncate lock", e))?;
            handle.seek(SeekFrom::Start(0)).map_err(|e| io_err("seek lock", e))?;
            handle.write_all(&body).map_err(|e| io_err("write lock", e))?;
            handle.sync_all().map_err(|e| io_err("sync lock", e))?;

            Ok(FileLock {
                target: path.to_path_buf(),
                sidecar,
                _handle: handle,
                info,
            })
        }

        /// Current live holder of `path`, if any, without taking the lock.
        pub fn check(path: &Path) -> Option<LockInfo> {
            let mut file = File::open(sidecar_path(path)).ok()?;
            read_holder(&mut file).filter(|info| !info.is_stale())
        }

        pub fn target_path(&self) -> &Path {
            &self.target
        }
    }

    impl Drop for FileLock {
        fn drop(&mut self) {
            if let Err(e) = fs::remove_file(&self.sidecar) {
                tracing::debug!(path = %self.sidecar.display(), error = %e, "lock sidecar not removed");
            }
        }
    }

    fn read_holder(file: &mut File) -> Option<LockInfo> {
        let mut body = String::new();
        file.seek(SeekFrom::Start(0)).ok()?;
        file.read_to_string(&mut body).ok()?;
        serde_json::from_str(&body).ok()
    }
}

/// Replace `path` with `bytes` so readers see either the old or the new
/// content, never a mix.
pub fn write_atomic(bytes: &[u8], path: &Path) -> NcrResult<()> {
    let mut staging = path.as_os_str().to_owned();
    staging.push(".tmp");
    let staging = PathBuf::from(staging);
    let fail = |op: &str, at: &Path, e: std::io::Error| NcrError::file_error(op, at.display().to_string(), e.to_string());

    {
        use std::io::Write;
        let mut file = fs::File::create(&staging).map_err(|e| fail("create temp file", &staging, e))?;
        file.write_all(bytes).map_err(|e| fail("write temp file", &staging, e))?;
        file.sync_all().map_err(|e| fail("sync temp file", &staging, e))?;
    }

    fs::rename(&staging, path).map_err(|e| {
        let _ = fs::remove_file(&staging);
        fail("rename to final", path, e)
    })
}

/// Pretty JSON through [`write_atomic`]
pub fn write_json_atomic<T: Serialize + ?Sized>(value: &T, path: &Path) -> NcrResult<()> {
    write_atomic(&serde_json::to_vec_pretty(value)?, path)
}

pub fn read_json<T: DeserializeOwned>(path: &Path) -> NcrResult<T> {
    let text = fs::read_to_string(path)
        .map_err(|e| NcrError::file_error("read", path.display().to_string(), e.to_string()))?;
    serde_json::from_str(&text).map_err(|e| NcrError::SerializationError {
        reason: format!("Invalid JSON in {}: {}", path.display(), e),
    })
}

/// Accept `file_version` when its major matches `current`; while the major
/// is 0, a newer minor is also refused.
pub fn validate_version(file_version: &str, current: &str) -> NcrResult<()> {
    fn major_minor(v: &str) -> Option<(u32, Option<u32>)> {
        let mut parts = v.split('.').map(str::parse::<u32>);
        let major = parts.next()?.ok()?;
        let minor = parts.next().and_then(Result::ok);
        Some((major, minor))
    }

    let compatible = match (major_minor(file_version), major_minor(current)) {
        (Some((file_major, file_minor)), Some((cur_major, cur_minor))) => {
            file_major == cur_major
                && !(cur_major == 0 && matches!((file_minor, cur_minor), (Some(f), Some(c)) if f > c))
        }
        _ => false,
    };

    if compatible {
        Ok(())
    } else {
        Err(NcrError::VersionMismatch {
            file_version: file_version.to_string(),
            expected_version: current.to_string(),
        })
    }
}
