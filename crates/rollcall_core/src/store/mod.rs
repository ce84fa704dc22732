//! Attendance store: authoritative document state plus persistence bridges.
//!
//! # Responsibility
//! - Own the single in-memory document and be its sole writer.
//! - Persist to the local cache synchronously after every mutation.
//! - Reconcile with the optional remote service on startup and push changes
//!   after a debounce window.
//!
//! # Invariants
//! - The local cache write is never debounced and never skipped.
//! - Reconciliation is last-writer-wins on the `updatedAt` stamp.
//! - At most one debounce timer is pending; rescheduling replaces it.

use crate::model::document::{
    from_json_bytes, to_json_bytes, Document, ExportResult,
};
use crate::model::normalize::normalize;
use crate::ops::{self, OpError};
use log::{info, warn};
use serde_json::Value;
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

mod cache;
mod remote;

pub use cache::{FileCache, LocalCache};
pub use remote::{HttpRemote, PushAck, RemoteDocumentService, RemoteError, RemoteResult};

/// Quiet period between the last mutation and the remote push.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(800);

/// Synchronization status surfaced to the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStatus {
    /// No remote configured; local persistence only. Permanent.
    Local,
    /// Remote configured but not in sync (startup, or a failed attempt).
    Idle,
    /// A reconciliation or push is underway.
    Syncing,
    /// Last reconciliation or push succeeded.
    Synced,
}

/// Owns the authoritative document; every read and write goes through here.
pub struct AttendanceStore {
    document: Document,
    cache: Arc<dyn LocalCache>,
    status: Arc<Mutex<SyncStatus>>,
    last_push_at: Arc<Mutex<Option<String>>>,
    pusher: Option<Pusher>,
}

impl AttendanceStore {
    /// Loads the local cache, reconciles with the remote when one is
    /// configured, and starts the push worker.
    ///
    /// Reconciliation failures are not fatal: the local document stays
    /// authoritative and status drops to `Idle`.
    pub fn open(
        cache: Arc<dyn LocalCache>,
        remote: Option<Arc<dyn RemoteDocumentService>>,
        debounce: Duration,
    ) -> Self {
        let local = normalize(cache.load().unwrap_or(Value::Null));

        let Some(remote) = remote else {
            info!("event=store_open module=store status=ok mode=local");
            return Self {
                document: local,
                cache,
                status: Arc::new(Mutex::new(SyncStatus::Local)),
                last_push_at: Arc::new(Mutex::new(None)),
                pusher: None,
            };
        };

        let status = Arc::new(Mutex::new(SyncStatus::Syncing));
        let document = reconcile(&*cache, &*remote, local, &status);
        let last_push_at = Arc::new(Mutex::new(None));
        let pusher = Pusher::spawn(
            remote,
            Arc::clone(&status),
            Arc::clone(&last_push_at),
            document.clone(),
            debounce,
        );

        Self {
            document,
            cache,
            status,
            last_push_at,
            pusher: Some(pusher),
        }
    }

    /// Returns the active document.
    pub fn document(&self) -> &Document {
        &self.document
    }

    /// Returns an independent copy of the active document.
    pub fn snapshot(&self) -> Document {
        self.document.clone()
    }

    /// Returns the current synchronization status.
    pub fn status(&self) -> SyncStatus {
        *lock(&self.status)
    }

    /// Returns the stamp of the last acknowledged push, if any.
    pub fn last_push_at(&self) -> Option<String> {
        lock(&self.last_push_at).clone()
    }

    /// Sets the teacher name for a class.
    pub fn set_teacher(&mut self, class_id: &str, name: &str) {
        let next = ops::set_teacher(&self.document, class_id, name);
        self.commit(next);
    }

    /// Adds a person and returns the generated person id.
    ///
    /// # Errors
    /// - `OpError::EmptyPersonName` when the trimmed name is empty.
    pub fn add_person(
        &mut self,
        class_id: &str,
        name: &str,
        phone: Option<String>,
    ) -> Result<String, OpError> {
        let person = crate::model::document::Person::new(name, phone);
        let person_id = person.id.clone();
        let next = ops::add_person(&self.document, class_id, person)?;
        self.commit(next);
        Ok(person_id)
    }

    /// Renames a person.
    pub fn rename_person(
        &mut self,
        class_id: &str,
        person_id: &str,
        name: &str,
    ) -> Result<(), OpError> {
        let next = ops::rename_person(&self.document, class_id, person_id, name)?;
        self.commit(next);
        Ok(())
    }

    /// Removes a person and all of their attendance records.
    pub fn remove_person(&mut self, class_id: &str, person_id: &str) {
        let next = ops::remove_person(&self.document, class_id, person_id);
        self.commit(next);
    }

    /// Updates a person's phone.
    pub fn set_person_phone(&mut self, class_id: &str, person_id: &str, phone: Option<String>) {
        let next = ops::set_person_phone(&self.document, class_id, person_id, phone);
        self.commit(next);
    }

    /// Records presence for one person on one date.
    pub fn set_presence(&mut self, date: &str, class_id: &str, person_id: &str, present: bool) {
        let next = ops::set_presence(&self.document, date, class_id, person_id, present);
        self.commit(next);
    }

    /// Records a note for one person on one date.
    pub fn set_note(&mut self, date: &str, class_id: &str, person_id: &str, note: &str) {
        let next = ops::set_note(&self.document, date, class_id, person_id, note);
        self.commit(next);
    }

    /// Replaces the document with the five-class default state.
    pub fn reset(&mut self) {
        info!("event=store_reset module=store status=ok");
        self.commit(Document::default_document());
    }

    /// Serializes the active document for export.
    pub fn export(&self) -> ExportResult<Vec<u8>> {
        to_json_bytes(&self.document)
    }

    /// Replaces the active document with imported, normalized bytes.
    ///
    /// # Errors
    /// - `ExportError::Parse` for invalid JSON; the active document is kept.
    pub fn import(&mut self, bytes: &[u8]) -> ExportResult<()> {
        let document = from_json_bytes(bytes)?;
        self.commit(document);
        Ok(())
    }

    fn commit(&mut self, next: Document) {
        self.document = next;
        self.cache.save(&self.document);
        if let Some(pusher) = &self.pusher {
            pusher.schedule(&self.document);
        }
    }
}

/// Startup last-writer-wins merge between cached and remote state.
fn reconcile(
    cache: &dyn LocalCache,
    remote: &dyn RemoteDocumentService,
    local: Document,
    status: &Mutex<SyncStatus>,
) -> Document {
    let started_at = Instant::now();
    info!("event=reconcile module=store status=start");

    match remote.fetch() {
        Ok(value) => {
            let remote_doc = normalize(value);
            // String comparison is chronological: both stamps are RFC 3339
            // with fixed precision.
            let (winner, source) = if remote_doc.updated_at > local.updated_at {
                (remote_doc, "remote")
            } else {
                (local, "local")
            };
            cache.save(&winner);
            *lock(status) = SyncStatus::Synced;
            info!(
                "event=reconcile module=store status=ok winner={source} duration_ms={}",
                started_at.elapsed().as_millis()
            );
            winner
        }
        Err(err) => {
            *lock(status) = SyncStatus::Idle;
            warn!(
                "event=reconcile module=store status=error error_code=remote_fetch_failed duration_ms={} error={err}",
                started_at.elapsed().as_millis()
            );
            local
        }
    }
}

enum PusherSignal {
    Schedule,
    Shutdown,
}

/// Debounced remote push worker.
///
/// A single background thread waits out the quiet period with
/// `recv_timeout`; schedules arriving inside the window collapse into one
/// push of the latest snapshot.
struct Pusher {
    tx: Sender<PusherSignal>,
    latest: Arc<Mutex<Document>>,
    handle: Option<JoinHandle<()>>,
}

impl Pusher {
    fn spawn(
        remote: Arc<dyn RemoteDocumentService>,
        status: Arc<Mutex<SyncStatus>>,
        last_push_at: Arc<Mutex<Option<String>>>,
        seed: Document,
        debounce: Duration,
    ) -> Self {
        let latest = Arc::new(Mutex::new(seed));
        let (tx, rx) = mpsc::channel();
        let worker_latest = Arc::clone(&latest);

        let handle = thread::spawn(move || loop {
            match rx.recv() {
                Ok(PusherSignal::Shutdown) | Err(_) => return,
                Ok(PusherSignal::Schedule) => loop {
                    match rx.recv_timeout(debounce) {
                        Ok(PusherSignal::Schedule) => continue,
                        Ok(PusherSignal::Shutdown) | Err(RecvTimeoutError::Disconnected) => return,
                        Err(RecvTimeoutError::Timeout) => {
                            push_latest(&*remote, &worker_latest, &status, &last_push_at);
                            break;
                        }
                    }
                },
            }
        });

        Self {
            tx,
            latest,
            handle: Some(handle),
        }
    }

    fn schedule(&self, document: &Document) {
        *lock(&self.latest) = document.clone();
        // A send error means the worker is gone; nothing left to push to.
        let _ = self.tx.send(PusherSignal::Schedule);
    }
}

impl Drop for Pusher {
    fn drop(&mut self) {
        let _ = self.tx.send(PusherSignal::Shutdown);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn push_latest(
    remote: &dyn RemoteDocumentService,
    latest: &Mutex<Document>,
    status: &Mutex<SyncStatus>,
    last_push_at: &Mutex<Option<String>>,
) {
    let started_at = Instant::now();
    *lock(status) = SyncStatus::Syncing;
    let snapshot = lock(latest).clone();

    match remote.push(&snapshot) {
        Ok(ack) => {
            *lock(last_push_at) = Some(ack.updated_at);
            *lock(status) = SyncStatus::Synced;
            info!(
                "event=remote_push module=store status=ok duration_ms={}",
                started_at.elapsed().as_millis()
            );
        }
        Err(err) => {
            *lock(status) = SyncStatus::Idle;
            warn!(
                "event=remote_push module=store status=error error_code=remote_push_failed duration_ms={} error={err}",
                started_at.elapsed().as_millis()
            );
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
