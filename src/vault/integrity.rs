//! Concurrent ciphertext integrity scan.
//!
//! Every entry is checked independently: its ciphertext is re-hashed and
//! compared with the stored tag.  Checks run on a fixed-size rayon pool, so
//! at most `concurrency` files are open at once.  Workers never touch the
//! report; they send `(name, Outcome)` over a channel and the calling
//! thread is the only writer.

use std::fs::File;
use std::io::{self, BufReader, Read};
use std::num::NonZeroUsize;
use std::path::Path;
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;

use tracing::{debug, info, warn};

use super::entry::VaultEntry;
use crate::crypto::{TagAccumulator, VaultKey, BLOCK_SIZE};

/// Default bound on simultaneously running checks.
pub const DEFAULT_CONCURRENCY: usize = 50;

/// Result of checking one entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The ciphertext matches its tag.
    Passed,
    /// The ciphertext is malformed or its tag does not match.
    Failed,
    /// The check could not complete (missing or unreadable file).
    Inconclusive,
}

/// Original names partitioned by outcome.  Each list is unordered.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IntegrityReport {
    pub passed: Vec<String>,
    pub failed: Vec<String>,
    pub inconclusive: Vec<String>,
}

impl IntegrityReport {
    fn record(&mut self, name: String, outcome: Outcome) {
        match outcome {
            Outcome::Passed => self.passed.push(name),
            Outcome::Failed => self.failed.push(name),
            Outcome::Inconclusive => self.inconclusive.push(name),
        }
    }

    /// Number of entries covered by the report.
    pub fn total(&self) -> usize {
        self.passed.len() + self.failed.len() + self.inconclusive.len()
    }

    /// True when no entry failed.  Inconclusive entries do not count as failures.
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Observer for scan progress.  Both callbacks run on worker threads.
pub trait ScanHook: Send + Sync {
    fn task_started(&self, _name: &str) {}
    fn task_finished(&self, _name: &str, _outcome: Outcome) {}
}

/// Bounded-concurrency integrity checker.
#[derive(Clone)]
pub struct IntegrityScanner {
    concurrency: NonZeroUsize,
    hook: Option<Arc<dyn ScanHook>>,
}

impl Default for IntegrityScanner {
    fn default() -> Self {
        Self::new(NonZeroUsize::new(DEFAULT_CONCURRENCY).unwrap_or(NonZeroUsize::MIN))
    }
}

impl IntegrityScanner {
    pub fn new(concurrency: NonZeroUsize) -> Self {
        Self {
            concurrency,
            hook: None,
        }
    }

    /// Attach a hook notified as each check starts and finishes.
    pub fn with_hook(mut self, hook: Arc<dyn ScanHook>) -> Self {
        self.hook = Some(hook);
        self
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency.get()
    }

    /// Check every entry in `entries` against the ciphertexts in `dir`.
    ///
    /// Never fails: per-entry errors become `Inconclusive`.  If the worker
    /// pool cannot be created the scan runs on the calling thread instead.
    pub fn scan(&self, dir: &Path, key: &VaultKey, entries: &[VaultEntry]) -> IntegrityReport {
        let mut report = IntegrityReport::default();
        if entries.is_empty() {
            return report;
        }

        let pool = match rayon::ThreadPoolBuilder::new()
            .num_threads(self.concurrency.get())
            .thread_name(|i| format!("integrity-{i}"))
            .build()
        {
            Ok(pool) => pool,
            Err(e) => {
                warn!("integrity pool unavailable, scanning sequentially: {e}");
                for entry in entries {
                    let outcome = self.run_check(dir, key, entry);
                    report.record(entry.original_name.clone(), outcome);
                }
                return report;
            }
        };

        let (tx, rx) = mpsc::channel::<(String, Outcome)>();
        thread::scope(|s| {
            let pool = &pool;
            s.spawn(move || {
                pool.scope(|scope| {
                    for entry in entries {
                        let tx = tx.clone();
                        scope.spawn(move |_| {
                            let outcome = self.run_check(dir, key, entry);
                            // The receiver outlives every sender.
                            let _ = tx.send((entry.original_name.clone(), outcome));
                        });
                    }
                });
            });

            for (name, outcome) in rx {
                report.record(name, outcome);
            }
        });

        info!(
            passed = report.passed.len(),
            failed = report.failed.len(),
            inconclusive = report.inconclusive.len(),
            "integrity scan finished"
        );
        report
    }

    fn run_check(&self, dir: &Path, key: &VaultKey, entry: &VaultEntry) -> Outcome {
        if let Some(hook) = &self.hook {
            hook.task_started(&entry.original_name);
        }
        let outcome = check_entry(dir, key, entry);
        if let Some(hook) = &self.hook {
            hook.task_finished(&entry.original_name, outcome);
        }
        outcome
    }
}

/// Verify one entry's ciphertext against its stored tag.
pub fn check_entry(dir: &Path, key: &VaultKey, entry: &VaultEntry) -> Outcome {
    match verify_ciphertext(dir, key, entry) {
        Ok(true) => Outcome::Passed,
        Ok(false) => Outcome::Failed,
        Err(e) => {
            debug!(entry = %entry.original_name, "integrity check inconclusive: {e}");
            Outcome::Inconclusive
        }
    }
}

/// `Ok(true)` if the tag matches, `Ok(false)` if it does not or the file is
/// not block-aligned, `Err` if the file could not be read.
fn verify_ciphertext(dir: &Path, key: &VaultKey, entry: &VaultEntry) -> io::Result<bool> {
    let file = File::open(dir.join(&entry.ciphertext_path))?;
    let len = file.metadata()?.len();
    if len % BLOCK_SIZE as u64 != 0 {
        return Ok(false);
    }

    let mut tag = TagAccumulator::new(key)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e.to_string()))?;
    let mut reader = BufReader::new(file);
    let mut block = [0u8; BLOCK_SIZE];
    for _ in 0..len / BLOCK_SIZE as u64 {
        reader.read_exact(&mut block)?;
        tag.update(&block);
    }

    Ok(tag.verify(&entry.auth_tag))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::{CipherStrength, FileCryptoCodec};
    use crate::vault::entry::ciphertext_name;
    use std::fs;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tempfile::TempDir;

    fn seal_file(dir: &Path, key: &VaultKey, name: &str, contents: &[u8]) -> VaultEntry {
        let plain = dir.join(format!("{name}.plain"));
        fs::write(&plain, contents).unwrap();
        let ct_name = ciphertext_name(name);
        let codec = FileCryptoCodec::new(key).unwrap();
        let seal = codec.encrypt_file(&plain, &dir.join(&ct_name)).unwrap();
        fs::remove_file(plain).unwrap();
        VaultEntry::from_seal(name, &ct_name, seal)
    }

    #[derive(Default)]
    struct InFlightCounter {
        current: AtomicUsize,
        peak: AtomicUsize,
        finished: AtomicUsize,
    }

    impl ScanHook for InFlightCounter {
        fn task_started(&self, _name: &str) {
            let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            // Hold the slot long enough for other workers to overlap.
            thread::sleep(Duration::from_millis(5));
        }

        fn task_finished(&self, _name: &str, _outcome: Outcome) {
            self.current.fetch_sub(1, Ordering::SeqCst);
            self.finished.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn classifies_passed_failed_and_inconclusive() {
        let dir = TempDir::new().unwrap();
        let key = VaultKey::derive(b"scan", CipherStrength::Strong);

        let good = seal_file(dir.path(), &key, "good", b"all is well here");
        let tampered = seal_file(dir.path(), &key, "tampered", &[3u8; 40]);
        let truncated = seal_file(dir.path(), &key, "truncated", &[4u8; 40]);
        let missing = seal_file(dir.path(), &key, "missing", b"soon gone");

        let ct = dir.path().join(&tampered.ciphertext_path);
        let mut bytes = fs::read(&ct).unwrap();
        bytes[20] ^= 0x80;
        fs::write(&ct, bytes).unwrap();

        let ct = dir.path().join(&truncated.ciphertext_path);
        let bytes = fs::read(&ct).unwrap();
        fs::write(&ct, &bytes[..bytes.len() - 1]).unwrap();

        fs::remove_file(dir.path().join(&missing.ciphertext_path)).unwrap();

        let entries = vec![good, tampered, truncated, missing];
        let report = IntegrityScanner::default().scan(dir.path(), &key, &entries);

        assert_eq!(report.passed, ["good"]);
        let mut failed = report.failed.clone();
        failed.sort();
        assert_eq!(failed, ["tampered", "truncated"]);
        assert_eq!(report.inconclusive, ["missing"]);
        assert!(!report.is_clean());
    }

    #[test]
    fn never_exceeds_the_concurrency_bound() {
        let dir = TempDir::new().unwrap();
        let key = VaultKey::derive(b"scan", CipherStrength::Weak);
        let entries: Vec<VaultEntry> = (0..24)
            .map(|i| seal_file(dir.path(), &key, &format!("f{i}"), &[i as u8; 33]))
            .collect();

        let counter = Arc::new(InFlightCounter::default());
        let scanner = IntegrityScanner::new(NonZeroUsize::new(3).unwrap())
            .with_hook(counter.clone());
        let report = scanner.scan(dir.path(), &key, &entries);

        assert_eq!(report.passed.len(), 24);
        assert_eq!(counter.finished.load(Ordering::SeqCst), 24);
        let peak = counter.peak.load(Ordering::SeqCst);
        assert!((1..=3).contains(&peak), "peak in-flight was {peak}");
    }

    #[test]
    fn empty_vault_gives_empty_report() {
        let dir = TempDir::new().unwrap();
        let key = VaultKey::derive(b"scan", CipherStrength::Strong);
        let report = IntegrityScanner::default().scan(dir.path(), &key, &[]);
        assert_eq!(report.total(), 0);
        assert!(report.is_clean());
    }
}
