//! Checkpoints of evaluated generations, and the
//! places they are kept in between runs.

use crate::genomics::Genome;
use crate::populations::{Individual, Population, Stats};

use parking_lot::Mutex;
use ron::ser::PrettyConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("checkpoint holds {genomes} genomes but {fitness} fitness values")]
    LengthMismatch { genomes: usize, fitness: usize },
    #[error("storage I/O failed")]
    Io(#[from] io::Error),
    #[error("could not serialize checkpoint")]
    Serialize(#[source] ron::Error),
    #[error("could not deserialize checkpoint")]
    Deserialize(#[source] ron::Error),
}

/// The genomes of an evaluated generation, in population
/// order, alongside their fitness.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "CheckpointRecord")]
pub struct Checkpoint {
    generation: usize,
    genomes: Vec<Genome>,
    fitness: Vec<f64>,
}

#[derive(Deserialize)]
struct CheckpointRecord {
    generation: usize,
    genomes: Vec<Genome>,
    fitness: Vec<f64>,
}

impl TryFrom<CheckpointRecord> for Checkpoint {
    type Error = StorageError;

    fn try_from(record: CheckpointRecord) -> Result<Checkpoint, StorageError> {
        Checkpoint::new(record.generation, record.genomes, record.fitness)
    }
}

impl Checkpoint {
    /// Returns a new checkpoint.
    ///
    /// # Errors
    /// Returns an error if there isn't exactly
    /// one fitness value per genome.
    ///
    /// # Examples
    /// ```
    /// use evomlp::{Checkpoint, Genome};
    ///
    /// let genomes = vec![Genome::new(vec![1.0, 1.0, 3.0, 0.5, 0.5])];
    /// assert!(Checkpoint::new(2, genomes.clone(), vec![0.9]).is_ok());
    /// assert!(Checkpoint::new(2, genomes, vec![0.9, 0.1]).is_err());
    /// ```
    pub fn new(
        generation: usize,
        genomes: Vec<Genome>,
        fitness: Vec<f64>,
    ) -> Result<Checkpoint, StorageError> {
        if genomes.len() != fitness.len() {
            return Err(StorageError::LengthMismatch {
                genomes: genomes.len(),
                fitness: fitness.len(),
            });
        }
        Ok(Checkpoint {
            generation,
            genomes,
            fitness,
        })
    }

    /// Captures a population's genomes and fitness.
    pub fn from_population(population: &Population) -> Checkpoint {
        let (genomes, fitness) = population
            .iter()
            .map(|individual| (individual.genome().clone(), individual.fitness()))
            .unzip();
        Checkpoint {
            generation: population.generation(),
            genomes,
            fitness,
        }
    }

    pub fn generation(&self) -> usize {
        self.generation
    }

    pub fn genomes(&self) -> &[Genome] {
        &self.genomes
    }

    pub fn fitness(&self) -> &[f64] {
        &self.fitness
    }

    pub fn len(&self) -> usize {
        self.genomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.genomes.is_empty()
    }

    /// Statistics on the checkpointed fitness.
    pub fn fitness_stats(&self) -> Option<Stats> {
        Stats::from(self.fitness.iter().copied())
    }

    /// Individuals carrying the checkpointed
    /// genomes and fitness, in order.
    pub fn into_individuals(self) -> Vec<Individual> {
        self.genomes
            .into_iter()
            .zip(self.fitness)
            .map(|(genome, fitness)| Individual::with_fitness(genome, fitness))
            .collect()
    }
}

/// A place where checkpoints are kept.
pub trait Storage: Send + Sync {
    /// Returns the latest saved checkpoint, if any.
    fn load(&self) -> Result<Option<Checkpoint>, StorageError>;

    /// Saves `checkpoint` as the latest one.
    fn save(&self, checkpoint: &Checkpoint) -> Result<(), StorageError>;
}

impl<T: Storage + ?Sized> Storage for Arc<T> {
    fn load(&self) -> Result<Option<Checkpoint>, StorageError> {
        (**self).load()
    }

    fn save(&self, checkpoint: &Checkpoint) -> Result<(), StorageError> {
        (**self).save(checkpoint)
    }
}

/// Keeps the latest checkpoint in memory.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    latest: Mutex<Option<Checkpoint>>,
    saves: AtomicUsize,
}

impl MemoryStorage {
    pub fn new() -> MemoryStorage {
        MemoryStorage::default()
    }

    /// Returns a storage already holding `checkpoint`.
    pub fn with_checkpoint(checkpoint: Checkpoint) -> MemoryStorage {
        MemoryStorage {
            latest: Mutex::new(Some(checkpoint)),
            saves: AtomicUsize::new(0),
        }
    }

    /// Number of checkpoints saved so far.
    pub fn saves(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    pub fn latest(&self) -> Option<Checkpoint> {
        self.latest.lock().clone()
    }
}

impl Storage for MemoryStorage {
    fn load(&self) -> Result<Option<Checkpoint>, StorageError> {
        Ok(self.latest())
    }

    fn save(&self, checkpoint: &Checkpoint) -> Result<(), StorageError> {
        *self.latest.lock() = Some(checkpoint.clone());
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Keeps the latest checkpoint in a directory, as
/// `generation.ron`, and appends a line per save to
/// `evolution.csv` with the generation followed by its
/// best, average and worst fitness.
#[derive(Clone, Debug)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    const CHECKPOINT: &'static str = "generation.ron";
    const REPORT: &'static str = "evolution.csv";

    /// Returns a storage in `dir`, creating it if needed.
    ///
    /// # Errors
    /// Returns an error if the directory can't be created.
    pub fn new(dir: impl AsRef<Path>) -> Result<FileStorage, StorageError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(FileStorage { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn checkpoint_path(&self) -> PathBuf {
        self.dir.join(Self::CHECKPOINT)
    }

    pub fn report_path(&self) -> PathBuf {
        self.dir.join(Self::REPORT)
    }
}

impl Storage for FileStorage {
    fn load(&self) -> Result<Option<Checkpoint>, StorageError> {
        let text = match fs::read_to_string(self.checkpoint_path()) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let checkpoint: Checkpoint = ron::from_str(&text).map_err(StorageError::Deserialize)?;
        debug!(generation = checkpoint.generation, path = ?self.checkpoint_path(), "loaded checkpoint");
        Ok(Some(checkpoint))
    }

    fn save(&self, checkpoint: &Checkpoint) -> Result<(), StorageError> {
        let text = ron::ser::to_string_pretty(checkpoint, PrettyConfig::new())
            .map_err(StorageError::Serialize)?;
        let staged = self.dir.join(format!("{}.tmp", Self::CHECKPOINT));
        fs::write(&staged, text)?;
        fs::rename(&staged, self.checkpoint_path())?;

        let stats = checkpoint.fitness_stats();
        let (best, average, worst) =
            stats.map_or((f64::NAN, f64::NAN, f64::NAN), |s| (s.maximum, s.mean, s.minimum));
        let mut report = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.report_path())?;
        writeln!(
            report,
            "{}, {}, {}, {}",
            checkpoint.generation, best, average, worst
        )?;
        debug!(generation = checkpoint.generation, dir = ?self.dir, "saved checkpoint");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genomics::uniform_genome;

    fn checkpoint(generation: usize) -> Checkpoint {
        Checkpoint::new(
            generation,
            vec![uniform_genome(1.0, 2, &[3], 1), uniform_genome(0.5, 2, &[], 1)],
            vec![0.25, 0.75],
        )
        .unwrap()
    }

    #[test]
    fn length_mismatch_is_rejected() {
        let genomes = vec![uniform_genome(1.0, 1, &[], 1)];
        assert!(matches!(
            Checkpoint::new(0, genomes, vec![]),
            Err(StorageError::LengthMismatch {
                genomes: 1,
                fitness: 0
            })
        ));
        let text = "(generation: 1, genomes: [[1.0, 1.0, 3.0, 1.0, 1.0]], fitness: [])";
        assert!(ron::from_str::<Checkpoint>(text).is_err());
    }

    #[test]
    fn memory_storage_counts_saves() {
        let storage = MemoryStorage::new();
        assert_eq!(storage.load().unwrap(), None);
        storage.save(&checkpoint(1)).unwrap();
        storage.save(&checkpoint(2)).unwrap();
        assert_eq!(storage.saves(), 2);
        assert_eq!(storage.load().unwrap().unwrap().generation(), 2);
    }

    #[test]
    fn file_storage_keeps_latest_and_reports_all() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path().join("run")).unwrap();
        assert_eq!(storage.load().unwrap(), None);

        storage.save(&checkpoint(1)).unwrap();
        storage.save(&checkpoint(2)).unwrap();
        assert_eq!(storage.load().unwrap(), Some(checkpoint(2)));

        let report = fs::read_to_string(storage.report_path()).unwrap();
        assert_eq!(report, "1, 0.75, 0.5, 0.25\n2, 0.75, 0.5, 0.25\n");
    }

    #[test]
    fn checkpoints_become_individuals() {
        let individuals = checkpoint(3).into_individuals();
        assert_eq!(individuals.len(), 2);
        assert_eq!(individuals[1].fitness(), 0.75);
        assert_eq!(individuals[0].genome(), &uniform_genome(1.0, 2, &[3], 1));
    }
}
