//! Checkpoint system for saving and resuming training runs.

use crate::config::Config;
use crate::evolution::BestGenome;
use crate::genetics::GeneticPool;
use crate::stats::StatsHistory;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

const MAGIC: &[u8; 4] = b"GMND";
const FILE_PREFIX: &str = "checkpoint_";

/// Complete training state for checkpointing
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    /// Version for compatibility checking
    pub version: u32,
    /// Epochs completed
    pub epoch: usize,
    pub config: Config,
    pub pool: GeneticPool,
    pub best: Option<BestGenome>,
    pub history: StatsHistory,
    /// Random seed; epoch streams are derived from it
    pub seed: u64,
}

impl Checkpoint {
    /// Current checkpoint version
    pub const VERSION: u32 = 1;

    pub fn new(
        epoch: usize,
        config: Config,
        pool: GeneticPool,
        best: Option<BestGenome>,
        history: StatsHistory,
        seed: u64,
    ) -> Self {
        Self {
            version: Self::VERSION,
            epoch,
            config,
            pool,
            best,
            history,
            seed,
        }
    }

    /// Save checkpoint to binary file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), CheckpointError> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);

        writer.write_all(MAGIC)?;
        let encoded = bincode::serialize(self)?;
        writer.write_all(&encoded)?;
        writer.flush()?;

        Ok(())
    }

    /// Load checkpoint from binary file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, CheckpointError> {
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);

        let mut magic = [0u8; 4];
        reader.read_exact(&mut magic)?;
        if &magic != MAGIC {
            return Err(CheckpointError::InvalidFormat("Invalid magic bytes".to_string()));
        }

        let mut buffer = Vec::new();
        reader.read_to_end(&mut buffer)?;
        let checkpoint: Checkpoint = bincode::deserialize(&buffer)?;

        if checkpoint.version != Self::VERSION {
            return Err(CheckpointError::VersionMismatch {
                expected: Self::VERSION,
                found: checkpoint.version,
            });
        }

        Ok(checkpoint)
    }

    /// Get approximate size in bytes
    pub fn size_bytes(&self) -> usize {
        bincode::serialized_size(self).unwrap_or(0) as usize
    }
}

/// Errors that can occur during checkpoint operations
#[derive(Debug)]
pub enum CheckpointError {
    Io(std::io::Error),
    Serialization(bincode::Error),
    InvalidFormat(String),
    VersionMismatch { expected: u32, found: u32 },
}

impl std::fmt::Display for CheckpointError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "IO error: {}", e),
            Self::Serialization(e) => write!(f, "Serialization error: {}", e),
            Self::InvalidFormat(msg) => write!(f, "Invalid format: {}", msg),
            Self::VersionMismatch { expected, found } => {
                write!(f, "Version mismatch: expected {}, found {}", expected, found)
            }
        }
    }
}

impl std::error::Error for CheckpointError {}

impl From<std::io::Error> for CheckpointError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<bincode::Error> for CheckpointError {
    fn from(e: bincode::Error) -> Self {
        Self::Serialization(e)
    }
}

/// Writes a checkpoint every `interval` epochs and keeps the newest ones
#[derive(Clone, Debug)]
pub struct CheckpointManager {
    pub base_dir: PathBuf,
    /// Epochs between checkpoints (0 = never)
    pub interval: usize,
    /// Maximum checkpoints to keep
    pub max_checkpoints: usize,
    last_checkpoint: Option<usize>,
}

impl CheckpointManager {
    /// Create the manager and its directory
    pub fn new<P: Into<PathBuf>>(
        base_dir: P,
        interval: usize,
        max_checkpoints: usize,
    ) -> Result<Self, CheckpointError> {
        let base_dir = base_dir.into();
        std::fs::create_dir_all(&base_dir)?;

        Ok(Self {
            base_dir,
            interval,
            max_checkpoints: max_checkpoints.max(1),
            last_checkpoint: None,
        })
    }

    /// True when `epoch` completed epochs is due for a checkpoint
    pub fn should_save(&self, epoch: usize) -> bool {
        self.interval > 0
            && epoch > 0
            && epoch % self.interval == 0
            && self.last_checkpoint != Some(epoch)
    }

    pub fn checkpoint_path(&self, epoch: usize) -> PathBuf {
        self.base_dir.join(format!("{}{:08}.bin", FILE_PREFIX, epoch))
    }

    /// Save checkpoint and drop the oldest beyond the limit
    pub fn save(&mut self, checkpoint: &Checkpoint) -> Result<PathBuf, CheckpointError> {
        let path = self.checkpoint_path(checkpoint.epoch);
        checkpoint.save(&path)?;
        self.last_checkpoint = Some(checkpoint.epoch);

        self.cleanup()?;

        Ok(path)
    }

    fn checkpoint_files(&self) -> Result<Vec<PathBuf>, CheckpointError> {
        let mut files: Vec<PathBuf> = std::fs::read_dir(&self.base_dir)?
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_name().to_string_lossy().starts_with(FILE_PREFIX))
            .map(|entry| entry.path())
            .collect();
        // zero-padded epoch, so name order is epoch order
        files.sort();
        Ok(files)
    }

    /// Remove old checkpoints beyond max limit
    fn cleanup(&self) -> Result<(), CheckpointError> {
        let files = self.checkpoint_files()?;
        if files.len() > self.max_checkpoints {
            let to_remove = files.len() - self.max_checkpoints;
            for path in files.into_iter().take(to_remove) {
                std::fs::remove_file(path)?;
            }
        }
        Ok(())
    }

    /// Find latest checkpoint in directory
    pub fn find_latest(&self) -> Option<PathBuf> {
        self.checkpoint_files().ok()?.pop()
    }
}
