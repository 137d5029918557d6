//! Handler registry.
//!
//! Turns a batch of [`HandlerClass`] candidates into an immutable table from
//! [`RoutingKey`] to [`HandlerDescriptor`]. Registration happens once per
//! registry: the first caller performs discovery, any later or concurrent
//! caller waits for it to finish and observes no effect of its own.
//!
//! Discovery fans out over scoped threads, one chunk of candidates each.
//! Insertion into the shared table is serialized under a single mutex, which
//! is where duplicate keys are detected. Once everything is in, the table is
//! moved into a `OnceLock` and read without locking from then on.
//!
//! Handler classes can be listed explicitly or submitted from anywhere in the
//! program with [`submit_handler!`](crate::submit_handler) and collected with
//! [`HandlerRegistry::register_manifest`].

use crate::RegistrationError;
use crate::handler::{HandlerClass, HandlerDescriptor};
use crate::routing::RoutingKey;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{Arc, OnceLock};

type Table = HashMap<RoutingKey, Arc<HandlerDescriptor>>;

/// Lifecycle of a registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryState {
    /// Not registered yet, or registration in progress.
    Open,
    /// Registration succeeded; routes are served.
    Sealed,
    /// Registration failed; nothing is ever served.
    Failed,
}

impl RegistryState {
    fn from_u8(raw: u8) -> Self {
        match raw {
            1 => RegistryState::Sealed,
            2 => RegistryState::Failed,
            _ => RegistryState::Open,
        }
    }
}

/// Result of a successful [`HandlerRegistry::register`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
    /// This call performed registration and sealed the registry.
    Sealed { handlers: usize },
    /// Registration had already been performed by an earlier call.
    AlreadyRegistered,
}

/// One-time, thread-safe registry of handler descriptors.
#[derive(Debug)]
pub struct HandlerRegistry {
    registered: AtomicBool,
    state: AtomicU8,
    table: OnceLock<Table>,
    workers: Option<NonZeroUsize>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self {
            registered: AtomicBool::new(false),
            state: AtomicU8::new(RegistryState::Open as u8),
            table: OnceLock::new(),
            workers: None,
        }
    }

    /// Cap the number of discovery threads. Defaults to the available parallelism.
    pub fn with_workers(mut self, workers: NonZeroUsize) -> Self {
        self.workers = Some(workers);
        self
    }

    /// Register a batch of handler classes.
    ///
    /// Only the first call has an effect. A class without a constructor or
    /// two methods mapping to the same key abort the whole batch, leaving the
    /// registry [`RegistryState::Failed`].
    pub fn register<I>(&self, candidates: I) -> Result<Registration, RegistrationError>
    where
        I: IntoIterator<Item = HandlerClass>,
    {
        if self
            .registered
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            // Another caller owns registration; wait until it has finished.
            self.table.wait();
            tracing::debug!("handler registration already performed, ignoring");
            return Ok(Registration::AlreadyRegistered);
        }

        let guard = PoisonGuard { registry: self };
        let candidates: Vec<HandlerClass> = candidates.into_iter().collect();
        let discovered = self.discover_all(&candidates);
        std::mem::forget(guard);

        match discovered {
            Ok(table) => {
                let handlers = table.len();
                let _ = self.table.set(table);
                self.state
                    .store(RegistryState::Sealed as u8, Ordering::Release);
                tracing::info!(
                    classes = candidates.len(),
                    handlers,
                    "handler registry sealed"
                );
                Ok(Registration::Sealed { handlers })
            }
            Err(err) => {
                let _ = self.table.set(Table::new());
                self.state
                    .store(RegistryState::Failed as u8, Ordering::Release);
                tracing::error!(error = %err, "handler registration failed");
                Err(err)
            }
        }
    }

    /// Register every class submitted with [`submit_handler!`](crate::submit_handler).
    pub fn register_manifest(&self) -> Result<Registration, RegistrationError> {
        self.register(inventory::iter::<HandlerManifest>.into_iter().map(|m| (m.build)()))
    }

    /// Descriptor registered under `key`. Always `None` unless sealed.
    pub fn lookup(&self, key: &RoutingKey) -> Option<Arc<HandlerDescriptor>> {
        self.table.get()?.get(key).cloned()
    }

    pub fn state(&self) -> RegistryState {
        RegistryState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub fn is_sealed(&self) -> bool {
        self.state() == RegistryState::Sealed
    }

    pub fn len(&self) -> usize {
        self.table.get().map(HashMap::len).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Registered keys, sorted.
    pub fn keys(&self) -> Vec<RoutingKey> {
        let mut keys: Vec<RoutingKey> = self
            .table
            .get()
            .map(|t| t.keys().cloned().collect())
            .unwrap_or_default();
        keys.sort();
        keys
    }

    fn worker_count(&self, candidates: usize) -> usize {
        let available = self
            .workers
            .or_else(|| std::thread::available_parallelism().ok())
            .map(NonZeroUsize::get)
            .unwrap_or(1);
        available.clamp(1, candidates.max(1))
    }

    fn discover_all(&self, candidates: &[HandlerClass]) -> Result<Table, RegistrationError> {
        if candidates.is_empty() {
            return Ok(Table::new());
        }

        let chunk_size = candidates.len().div_ceil(self.worker_count(candidates.len()));
        let shared = Mutex::new(Insertion::default());

        std::thread::scope(|scope| {
            for (chunk_index, chunk) in candidates.chunks(chunk_size).enumerate() {
                let shared = &shared;
                let offset = chunk_index * chunk_size;
                scope.spawn(move || {
                    for (i, class) in chunk.iter().enumerate() {
                        let index = offset + i;
                        let discovered = catch_unwind(AssertUnwindSafe(|| discover(class)))
                            .unwrap_or_else(|_| {
                                Err(RegistrationError::DiscoveryPanicked {
                                    class: class.name.clone(),
                                })
                            });

                        let mut insertion = shared.lock();
                        match discovered {
                            Ok(descriptors) => insertion.insert(index, descriptors),
                            Err(err) => insertion.fail(index, err),
                        }
                    }
                });
            }
        });

        shared.into_inner().finish()
    }
}

/// Marks the registry failed if registration unwinds, so waiting callers wake up.
struct PoisonGuard<'r> {
    registry: &'r HandlerRegistry,
}

impl Drop for PoisonGuard<'_> {
    fn drop(&mut self) {
        let _ = self.registry.table.set(Table::new());
        self.registry
            .state
            .store(RegistryState::Failed as u8, Ordering::Release);
        tracing::error!("handler registration panicked");
    }
}

impl Default for HandlerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Shared fan-in state of one registration pass.
#[derive(Default)]
struct Insertion {
    table: Table,
    error: Option<(usize, RegistrationError)>,
}

impl Insertion {
    fn insert(&mut self, index: usize, descriptors: Vec<HandlerDescriptor>) {
        for descriptor in descriptors {
            let key = descriptor.key().clone();
            if let Some(existing) = self.table.get(&key) {
                let err = RegistrationError::DuplicateRoute {
                    key,
                    first: existing.type_name().to_string(),
                    second: descriptor.type_name().to_string(),
                };
                self.fail(index, err);
                return;
            }
            self.table.insert(key, Arc::new(descriptor));
        }
    }

    // Keeps the failure of the lowest candidate index so the reported error
    // does not depend on thread scheduling.
    fn fail(&mut self, index: usize, err: RegistrationError) {
        match &self.error {
            Some((first, _)) if *first <= index => {}
            _ => self.error = Some((index, err)),
        }
    }

    fn finish(self) -> Result<Table, RegistrationError> {
        match self.error {
            Some((_, err)) => Err(err),
            None => Ok(self.table),
        }
    }
}

/// Build the descriptors of one class.
fn discover(class: &HandlerClass) -> Result<Vec<HandlerDescriptor>, RegistrationError> {
    let constructor = class
        .constructor
        .clone()
        .ok_or_else(|| RegistrationError::MissingConstructor {
            class: class.name.clone(),
        })?;

    let descriptors: Vec<HandlerDescriptor> = class
        .methods
        .iter()
        .filter(|m| m.is_routable())
        .map(|m| HandlerDescriptor::new(class, constructor.clone(), m.clone()))
        .collect();

    tracing::info!(
        class = %class.name,
        type_name = class.type_name,
        handlers = descriptors.len(),
        "discovered handler class"
    );
    Ok(descriptors)
}

/// Link-time registration entry, collected by [`HandlerRegistry::register_manifest`].
pub struct HandlerManifest {
    pub build: fn() -> HandlerClass,
}

impl HandlerManifest {
    pub const fn new(build: fn() -> HandlerClass) -> Self {
        Self { build }
    }
}

inventory::collect!(HandlerManifest);

/// Submit a handler class to the process-wide manifest.
///
/// Takes the path of a `fn() -> HandlerClass`.
///
/// ```ignore
/// fn calculator() -> HandlerClass {
///     HandlerClass::of::<Calculator>("Calculator")
///         .method(Method::new("Add", add))
///         .build()
/// }
///
/// switchboard_core::submit_handler!(calculator);
/// ```
#[macro_export]
macro_rules! submit_handler {
    ($build:path) => {
        $crate::inventory::submit! {
            $crate::route_registry::HandlerManifest::new($build)
        }
    };
}
