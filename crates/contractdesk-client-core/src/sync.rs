use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::cache::LookupCache;
use crate::dropdown::{DropdownSet, EntityKind};
use crate::envelope::{FetchEnvelope, FetchError};
use crate::records::{AgentRecord, PropertyRecord, TemplateRecord};

/// Delay before the first population pass. Gives the backing service time to
/// become reachable; if it is not ready by then, the transport retry loop is
/// the recovery mechanism (known race, accepted).
pub const POPULATE_INITIAL_DELAY: Duration = Duration::from_millis(1000);

/// Fixed interval between transport-failure retries of a population fetch.
pub const POPULATE_RETRY_DELAY: Duration = Duration::from_millis(2000);

/// The backing-store proxy reads the synchronizer consumes. Implementations
/// return the `{success, data?, message?}` envelope; `Err` is reserved for
/// transport-class failures of the read itself.
#[async_trait]
pub trait ProxyApi: Send + Sync {
    async fn list_agents(&self) -> Result<FetchEnvelope<Vec<AgentRecord>>, FetchError>;
    async fn list_templates(&self) -> Result<FetchEnvelope<Vec<TemplateRecord>>, FetchError>;
    async fn list_properties(&self) -> Result<FetchEnvelope<Vec<PropertyRecord>>, FetchError>;
}

/// Timer seam so the retry loop runs without real timers in tests.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// How transport failures are retried. Production uses an indefinite policy
/// at the fixed interval; tests bound the attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub delay: Duration,
    pub max_attempts: Option<u32>,
}

impl RetryPolicy {
    #[must_use]
    pub fn indefinite(delay: Duration) -> Self {
        Self {
            delay,
            max_attempts: None,
        }
    }

    #[must_use]
    pub fn bounded(delay: Duration, max_attempts: u32) -> Self {
        Self {
            delay,
            max_attempts: Some(max_attempts),
        }
    }

    fn allows_retry(&self, attempts_so_far: u32) -> bool {
        self.max_attempts
            .is_none_or(|limit| attempts_so_far < limit)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::indefinite(POPULATE_RETRY_DELAY)
    }
}

/// The lookup cache and the three dropdowns, advanced together so a control
/// never shows options its cache cannot resolve.
#[derive(Debug, Clone, Default)]
pub struct FormEngine {
    pub cache: LookupCache,
    pub dropdowns: DropdownSet,
}

/// One kind's records, ready to apply to the engine in a single assignment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KindRecords {
    Agents(Vec<AgentRecord>),
    Templates(Vec<TemplateRecord>),
    Properties(Vec<PropertyRecord>),
}

impl KindRecords {
    #[must_use]
    pub fn kind(&self) -> EntityKind {
        match self {
            Self::Agents(_) => EntityKind::Agents,
            Self::Templates(_) => EntityKind::Templates,
            Self::Properties(_) => EntityKind::Properties,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Agents(records) => records.len(),
            Self::Templates(records) => records.len(),
            Self::Properties(records) => records.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl FormEngine {
    /// Wholesale replacement of one kind's cache slot and option list.
    pub fn apply(&mut self, records: KindRecords) -> usize {
        let count = records.len();
        match records {
            KindRecords::Agents(records) => {
                self.dropdowns.agents.rebuild_from_agents(&records);
                self.cache.replace_agents(records);
            }
            KindRecords::Templates(records) => {
                self.dropdowns.templates.rebuild_from_templates(&records);
                self.cache.replace_templates(records);
            }
            KindRecords::Properties(records) => {
                self.dropdowns.properties.rebuild_from_properties(&records);
                self.cache.replace_properties(records);
            }
        }
        count
    }

    #[must_use]
    pub fn kind_populated(&self, kind: EntityKind) -> bool {
        match kind {
            EntityKind::Agents => self.cache.agents_populated(),
            EntityKind::Templates => self.cache.templates_populated(),
            EntityKind::Properties => self.cache.properties_populated(),
        }
    }

    /// True once every kind has populated successfully at least once.
    #[must_use]
    pub fn ready(&self) -> bool {
        EntityKind::ALL
            .iter()
            .all(|kind| self.kind_populated(*kind))
    }
}

/// Result of a population fetch, before it is applied to an engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    Fetched(KindRecords),
    /// Application-level failure: the existing cache and options stand.
    Rejected { message: String },
    /// A bounded retry policy ran out of transport attempts.
    GaveUp { attempts: u32 },
}

/// Result of a full populate pass against an engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PopulateOutcome {
    Replaced { count: usize },
    Rejected { message: String },
    GaveUp { attempts: u32 },
}

enum Resolution<T> {
    Envelope(FetchEnvelope<Vec<T>>),
    GaveUp { attempts: u32 },
}

/// Per-kind fetch-and-render flow. Transport failures retry on the policy's
/// fixed interval; envelope failures are terminal until the next pass.
pub struct DropdownSynchronizer<P, S> {
    proxy: P,
    sleeper: S,
    policy: RetryPolicy,
}

impl<P: ProxyApi, S: Sleeper> DropdownSynchronizer<P, S> {
    pub fn new(proxy: P, sleeper: S, policy: RetryPolicy) -> Self {
        Self {
            proxy,
            sleeper,
            policy,
        }
    }

    /// Fetches one kind's records without touching any engine, so callers can
    /// scope their engine lock to the application step alone.
    pub async fn fetch(&self, kind: EntityKind) -> FetchOutcome {
        match kind {
            EntityKind::Agents => {
                match self.fetch_kind(kind, || self.proxy.list_agents()).await {
                    Resolution::GaveUp { attempts } => FetchOutcome::GaveUp { attempts },
                    Resolution::Envelope(envelope) => {
                        Self::resolve(kind, envelope, KindRecords::Agents)
                    }
                }
            }
            EntityKind::Templates => {
                match self.fetch_kind(kind, || self.proxy.list_templates()).await {
                    Resolution::GaveUp { attempts } => FetchOutcome::GaveUp { attempts },
                    Resolution::Envelope(envelope) => {
                        Self::resolve(kind, envelope, KindRecords::Templates)
                    }
                }
            }
            EntityKind::Properties => {
                match self.fetch_kind(kind, || self.proxy.list_properties()).await {
                    Resolution::GaveUp { attempts } => FetchOutcome::GaveUp { attempts },
                    Resolution::Envelope(envelope) => {
                        Self::resolve(kind, envelope, KindRecords::Properties)
                    }
                }
            }
        }
    }

    /// Fetch one kind and apply it. Convenience for callers that own their
    /// engine exclusively; concurrent callers should use [`fetch`] and apply
    /// under their own lock.
    ///
    /// [`fetch`]: Self::fetch
    pub async fn populate(&self, kind: EntityKind, engine: &mut FormEngine) -> PopulateOutcome {
        match self.fetch(kind).await {
            FetchOutcome::Fetched(records) => {
                let count = engine.apply(records);
                debug!(kind = kind.as_str(), count, "dropdown populated");
                PopulateOutcome::Replaced { count }
            }
            FetchOutcome::Rejected { message } => PopulateOutcome::Rejected { message },
            FetchOutcome::GaveUp { attempts } => PopulateOutcome::GaveUp { attempts },
        }
    }

    async fn fetch_kind<T, F, Fut>(&self, kind: EntityKind, fetch: F) -> Resolution<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<FetchEnvelope<Vec<T>>, FetchError>> + Send,
    {
        let mut attempts: u32 = 0;
        loop {
            attempts += 1;
            match fetch().await {
                Ok(envelope) => return Resolution::Envelope(envelope),
                Err(error) if error.is_transport() => {
                    warn!(
                        kind = kind.as_str(),
                        attempt = attempts,
                        %error,
                        "dropdown fetch transport failure"
                    );
                    if !self.policy.allows_retry(attempts) {
                        return Resolution::GaveUp { attempts };
                    }
                    self.sleeper.sleep(self.policy.delay).await;
                }
                Err(error) => {
                    return Resolution::Envelope(FetchEnvelope::failed(error.to_string()));
                }
            }
        }
    }

    fn resolve<T>(
        kind: EntityKind,
        envelope: FetchEnvelope<Vec<T>>,
        wrap: impl FnOnce(Vec<T>) -> KindRecords,
    ) -> FetchOutcome {
        match (envelope.success, envelope.data) {
            (true, Some(records)) => FetchOutcome::Fetched(wrap(records)),
            (true, None) => {
                let message = "envelope missing data".to_string();
                warn!(kind = kind.as_str(), %message, "dropdown population rejected");
                FetchOutcome::Rejected { message }
            }
            (false, _) => {
                let message = envelope
                    .message
                    .unwrap_or_else(|| "unspecified failure".to_string());
                warn!(kind = kind.as_str(), %message, "dropdown population rejected");
                FetchOutcome::Rejected { message }
            }
        }
    }
}
