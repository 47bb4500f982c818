use crate::model::Ledger;
use anyhow::Context;
use fd_lock::RwLock;
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tempfile::NamedTempFile;

pub trait Storage {
    /// Charge le ledger ; un support vide donne un ledger vide.
    fn load(&self) -> anyhow::Result<Ledger>;
    /// Sauvegarde de manière atomique : tout ou rien.
    fn save(&self, ledger: &Ledger) -> anyhow::Result<()>;

    /// Exécute `f` en détenant l'accès exclusif au support, y compris vis-à-vis
    /// d'autres processus. Sans support partagé, aucun verrou n'est nécessaire.
    fn exclusive<T, F: FnOnce() -> T>(&self, f: F) -> anyhow::Result<T> {
        Ok(f())
    }
}

pub struct JsonStorage {
    path: PathBuf,
}

impl JsonStorage {
    pub fn open<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        Ok(Self { path: path.as_ref().to_path_buf() })
    }

    /// Fichier voisin `<store>.lock` : le fichier principal est remplacé à
    /// chaque sauvegarde, il ne peut donc pas porter le verrou.
    fn lock_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_owned();
        name.push(".lock");
        PathBuf::from(name)
    }
}

impl Storage for JsonStorage {
    fn load(&self) -> anyhow::Result<Ledger> {
        let data = match fs::read(&self.path) {
            Ok(data) => data,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Ledger::default()),
            Err(err) => {
                return Err(err).with_context(|| format!("reading {}", self.path.display()))
            }
        };
        let ledger: Ledger = serde_json::from_slice(&data)
            .with_context(|| format!("parsing {}", self.path.display()))?;
        Ok(ledger)
    }

    fn save(&self, ledger: &Ledger) -> anyhow::Result<()> {
        let json = serde_json::to_vec_pretty(ledger)?;
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut tmp = NamedTempFile::new_in(dir).with_context(|| "creating temp file")?;
        tmp.write_all(&json)?;
        tmp.flush()?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).with_context(|| "atomic rename")?;
        Ok(())
    }

    fn exclusive<T, F: FnOnce() -> T>(&self, f: F) -> anyhow::Result<T> {
        let lock_path = self.lock_path();
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .read(true)
            .write(true)
            .open(&lock_path)
            .with_context(|| format!("opening {}", lock_path.display()))?;
        let mut lock = RwLock::new(file);
        let _guard = lock
            .write()
            .with_context(|| format!("locking {}", lock_path.display()))?;
        Ok(f())
    }
}

/// Stockage en mémoire, utile pour les tests et l'intégration dans un autre processus.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    ledger: Mutex<Ledger>,
}

impl MemoryStorage {
    pub fn new(ledger: Ledger) -> Self {
        Self { ledger: Mutex::new(ledger) }
    }
}

impl Storage for MemoryStorage {
    fn load(&self) -> anyhow::Result<Ledger> {
        let guard = self
            .ledger
            .lock()
            .map_err(|_| anyhow::anyhow!("memory storage poisoned"))?;
        Ok(guard.clone())
    }

    fn save(&self, ledger: &Ledger) -> anyhow::Result<()> {
        let mut guard = self
            .ledger
            .lock()
            .map_err(|_| anyhow::anyhow!("memory storage poisoned"))?;
        *guard = ledger.clone();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Share;
    use tempfile::tempdir;

    #[test]
    fn missing_file_loads_empty_ledger() {
        let dir = tempdir().unwrap();
        let storage = JsonStorage::open(dir.path().join("absent.json")).unwrap();
        assert_eq!(storage.load().unwrap(), Ledger::default());
    }

    #[test]
    fn save_then_load_keeps_shares() {
        let dir = tempdir().unwrap();
        let storage = JsonStorage::open(dir.path().join("store.json")).unwrap();
        let mut ledger = Ledger::default();
        ledger.shares.push(Share::new("Andel FK", "FK").with_color("bg-red-500"));
        storage.save(&ledger).unwrap();
        assert_eq!(storage.load().unwrap(), ledger);
    }

    #[test]
    fn exclusive_leaves_a_lock_file_next_to_the_store() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.json");
        let storage = JsonStorage::open(&path).unwrap();
        let value = storage.exclusive(|| 7).unwrap();
        assert_eq!(value, 7);
        assert!(dir.path().join("store.json.lock").exists());
        assert!(!path.exists());
        // le verrou est relâché à la sortie
        assert_eq!(storage.exclusive(|| 8).unwrap(), 8);
    }

    #[test]
    fn corrupt_file_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.json");
        fs::write(&path, b"{ not json").unwrap();
        let storage = JsonStorage::open(&path).unwrap();
        assert!(storage.load().is_err());
    }
}
