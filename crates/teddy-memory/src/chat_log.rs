//! Per-session chat log.
//!
//! Every session gets its own file `<dir>/<n>.txt`, where `n` is one more
//! than the largest numeric file stem already present (non-numeric names are
//! ignored).  Turns are appended as they complete:
//!
//! ```text
//! Craziness Level: 3
//! User: I can't sleep
//! Robot: Have you tried counting sheep?
//! ------------------------------------------------------------
//!
//! ```

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Utc;
use thiserror::Error;
use tracing::info;

const SEPARATOR_WIDTH: usize = 60;

/// Errors that can arise while writing the chat log.
#[derive(Error, Debug)]
pub enum ChatLogError {
    #[error("chat log I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// One completed turn as written to the log.
#[derive(Debug, Clone, Copy)]
pub struct TurnRecord<'a> {
    pub intensity: u8,
    pub user_input: &'a str,
    pub robot_response: &'a str,
}

/// An open, append-only session log.
#[derive(Debug)]
pub struct ChatLog {
    path: PathBuf,
    number: u32,
}

impl ChatLog {
    /// Create `dir` if needed, pick the next free number and write the
    /// session header.
    ///
    /// # Errors
    ///
    /// Returns [`ChatLogError::Io`] if the directory cannot be created or
    /// listed, or the file cannot be written.
    pub fn create(dir: impl AsRef<Path>, session_id: &str) -> Result<Self, ChatLogError> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir).map_err(|e| io_err(dir, e))?;
        let number = next_chat_number(dir)?;
        let log = Self {
            path: dir.join(format!("{number}.txt")),
            number,
        };
        log.write(&format!(
            "Session {session_id} started at {}\n\n",
            Utc::now().to_rfc3339()
        ))?;
        info!(path = %log.path.display(), "logging conversation");
        Ok(log)
    }

    /// Append one turn and flush it to disk.
    pub fn append(&self, record: &TurnRecord<'_>) -> Result<(), ChatLogError> {
        self.write(&format!(
            "Craziness Level: {}\nUser: {}\nRobot: {}\n{}\n\n",
            record.intensity,
            record.user_input,
            record.robot_response,
            "-".repeat(SEPARATOR_WIDTH),
        ))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The sequence number this session was assigned.
    pub fn number(&self) -> u32 {
        self.number
    }

    fn write(&self, text: &str) -> Result<(), ChatLogError> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| io_err(&self.path, e))?;
        file.write_all(text.as_bytes())
            .and_then(|_| file.flush())
            .map_err(|e| io_err(&self.path, e))
    }
}

/// One more than the largest numeric `.txt` stem in `dir`, or 1 if none.
pub fn next_chat_number(dir: &Path) -> Result<u32, ChatLogError> {
    let mut highest = 0;
    for entry in fs::read_dir(dir).map_err(|e| io_err(dir, e))? {
        let path = entry.map_err(|e| io_err(dir, e))?.path();
        if path.extension().and_then(|e| e.to_str()) != Some("txt") {
            continue;
        }
        if let Some(n) = path
            .file_stem()
            .and_then(|s| s.to_str())
            .and_then(|s| s.parse::<u32>().ok())
        {
            highest = highest.max(n);
        }
    }
    Ok(highest + 1)
}

fn io_err(path: &Path, source: std::io::Error) -> ChatLogError {
    ChatLogError::Io {
        path: path.to_path_buf(),
        source,
    }
}
