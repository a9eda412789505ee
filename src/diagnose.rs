//! The diagnosis coordinator: one query, two engines, one dual report.
//!
//! The coordinator owns the graph store handle and the active snapshot.
//! Rebuilds follow the copy-on-rebuild discipline: the replacement
//! snapshot is constructed completely, then published with a short
//! write-locked swap while in-flight queries keep reading the old `Arc`.
//! The two engines fail independently: an unreachable store degrades the
//! graph side of the report, a probabilistic query error fills only the
//! probabilistic side, and neither suppresses the other.

use std::fmt;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::entity::Entity;
use crate::error::{DiagnosisError, DiagnosisResult, QueryError};
use crate::extract::{ExtractionReport, FactExtractor};
use crate::graph::matcher::match_diseases;
use crate::graph::store::{GraphStore, InMemoryGraphStore, StoreError};
use crate::knowledge::KnowledgeBase;
use crate::model::builder::ModelConfig;
use crate::model::elimination::ranked_posteriors;
use crate::model::network::State;
use crate::snapshot::Snapshot;

/// Which engine produced a score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineSource {
    /// Structural overlap over the graph store.
    Graph,
    /// Posterior probability from the probabilistic network.
    Probabilistic,
}

/// One ranked disease hypothesis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiseaseScore {
    /// The hypothesized disease.
    pub disease: Entity,
    /// Overlap fraction or posterior probability, in `[0, 1]`.
    pub score: f64,
    /// The engine that produced this score.
    pub source: EngineSource,
}

impl fmt::Display for DiseaseScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {:.2}%", self.disease.name, self.score * 100.0)
    }
}

/// Dual diagnosis output for one query.
///
/// Both engines are surfaced independently, by design: the caller compares
/// graph-pattern evidence against probabilistic evidence, and a failure on
/// one side leaves the other intact.
#[derive(Debug)]
pub struct DiagnosisReport {
    /// Unique id for this query, for tracing.
    pub query_id: Uuid,
    /// When the query ran.
    pub issued_at: DateTime<Utc>,
    /// Generation of the snapshot that answered.
    pub generation: u64,
    /// Graph engine outcome.
    pub graph: Result<Vec<DiseaseScore>, StoreError>,
    /// Probabilistic engine outcome.
    pub probabilistic: Result<Vec<DiseaseScore>, QueryError>,
}

/// Summary of one knowledge-base load.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadSummary {
    /// Per-line extraction outcomes.
    pub extraction: ExtractionReport,
    /// Generation assigned to the published snapshot.
    pub generation: u64,
    /// Content fingerprint of the published snapshot.
    pub fingerprint: String,
}

/// The coordinator holding the store handle and the active snapshot.
pub struct DiagnosisEngine {
    store: Arc<dyn GraphStore>,
    active: RwLock<Option<Arc<Snapshot>>>,
    generation: AtomicU64,
    extractor: FactExtractor,
    model_config: ModelConfig,
}

impl fmt::Debug for DiagnosisEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DiagnosisEngine")
            .field("generation", &self.generation.load(Ordering::SeqCst))
            .field("model_config", &self.model_config)
            .finish_non_exhaustive()
    }
}

impl Default for DiagnosisEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl DiagnosisEngine {
    /// Creates a coordinator backed by an in-memory graph store.
    #[must_use]
    pub fn new() -> Self {
        Self::with_store(Arc::new(InMemoryGraphStore::new()))
    }

    /// Creates a coordinator over an external graph store.
    #[must_use]
    pub fn with_store(store: Arc<dyn GraphStore>) -> Self {
        Self {
            store,
            active: RwLock::new(None),
            generation: AtomicU64::new(0),
            extractor: FactExtractor::new(),
            model_config: ModelConfig::default(),
        }
    }

    /// Replaces the fact extractor.
    #[must_use]
    pub fn with_extractor(mut self, extractor: FactExtractor) -> Self {
        self.extractor = extractor;
        self
    }

    /// Replaces the model configuration.
    #[must_use]
    pub fn with_model_config(mut self, config: ModelConfig) -> Self {
        self.model_config = config;
        self
    }

    /// Loads a knowledge corpus from lines, builds a snapshot, publishes
    /// the graph into the store and swaps the snapshot in.
    ///
    /// Malformed lines are recovered and reported in the summary; an empty
    /// or all-malformed corpus fails the build. Store failures during
    /// publication are logged and degrade the graph engine rather than
    /// failing the load.
    ///
    /// # Errors
    /// Returns a [`DiagnosisError`] when the model cannot be built.
    pub fn load_lines<I, S>(&self, lines: I) -> DiagnosisResult<LoadSummary>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let extraction = self.extractor.extract_lines(lines);
        self.install(KnowledgeBase::from_facts(extraction.facts.clone()), extraction)
    }

    /// Loads a knowledge corpus from a newline-delimited UTF-8 file.
    ///
    /// # Errors
    /// I/O failures and build failures are returned as [`DiagnosisError`].
    pub fn load_file(&self, path: impl AsRef<Path>) -> DiagnosisResult<LoadSummary> {
        let extraction = self.extractor.extract_file(path)?;
        self.install(KnowledgeBase::from_facts(extraction.facts.clone()), extraction)
    }

    /// Rebuilds and swaps from an explicit knowledge base (after authoring
    /// mutations).
    ///
    /// # Errors
    /// Returns a [`DiagnosisError`] when the model cannot be built.
    pub fn load_knowledge(&self, knowledge: KnowledgeBase) -> DiagnosisResult<LoadSummary> {
        let extraction = ExtractionReport {
            facts: knowledge.facts().to_vec(),
            failures: Vec::new(),
            lines_seen: knowledge.len(),
        };
        self.install(knowledge, extraction)
    }

    fn install(
        &self,
        knowledge: KnowledgeBase,
        extraction: ExtractionReport,
    ) -> DiagnosisResult<LoadSummary> {
        let snapshot = Snapshot::build(knowledge, &self.model_config)?;

        let published = self
            .store
            .clear()
            .and_then(|()| snapshot.graph().publish(self.store.as_ref()));
        if let Err(err) = published {
            warn!(%err, "graph store publication failed; graph engine will degrade");
        }

        let fingerprint = snapshot.fingerprint.clone();
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        {
            let mut active = self
                .active
                .write()
                .unwrap_or_else(PoisonError::into_inner);
            *active = Some(Arc::new(snapshot));
        }
        info!(generation, %fingerprint, "published knowledge snapshot");

        Ok(LoadSummary {
            extraction,
            generation,
            fingerprint,
        })
    }

    /// The currently active snapshot, if any.
    #[must_use]
    pub fn snapshot(&self) -> Option<Arc<Snapshot>> {
        self.active
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Current snapshot generation (0 before the first load).
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Runs both engines for a set of present symptoms.
    ///
    /// # Errors
    /// Returns [`DiagnosisError::NotLoaded`] when no snapshot is active.
    /// Engine-level failures are carried inside the report.
    pub fn diagnose<I, S>(&self, symptoms: I) -> DiagnosisResult<DiagnosisReport>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let names: Vec<String> = symptoms
            .into_iter()
            .map(|s| s.as_ref().to_string())
            .collect();
        self.diagnose_with_states(names.into_iter().map(|n| (n, State::Present)))
    }

    /// Runs both engines for explicit symptom observations.
    ///
    /// Absent observations participate in the probabilistic evidence; the
    /// graph engine only matches on symptoms observed present.
    ///
    /// # Errors
    /// Returns [`DiagnosisError::NotLoaded`] when no snapshot is active.
    /// Engine-level failures are carried inside the report.
    pub fn diagnose_with_states<I, S>(&self, observations: I) -> DiagnosisResult<DiagnosisReport>
    where
        I: IntoIterator<Item = (S, State)>,
        S: AsRef<str>,
    {
        let snapshot = self.snapshot().ok_or(DiagnosisError::NotLoaded)?;
        let observations: Vec<(String, State)> = observations
            .into_iter()
            .map(|(n, s)| (n.as_ref().to_string(), s))
            .collect();

        let present: Vec<&str> = observations
            .iter()
            .filter(|(_, s)| *s == State::Present)
            .map(|(n, _)| n.as_str())
            .collect();

        let graph = match_diseases(self.store.as_ref(), present.iter().copied()).map(|matches| {
            matches
                .into_iter()
                .map(|m| DiseaseScore {
                    disease: m.disease,
                    score: m.score,
                    source: EngineSource::Graph,
                })
                .collect()
        });

        let probabilistic = snapshot
            .network()
            .evidence_from_names(observations.iter().map(|(n, s)| (n.as_str(), *s)))
            .and_then(|evidence| ranked_posteriors(snapshot.network(), &evidence, None))
            .map(|ranking| {
                ranking
                    .into_iter()
                    .map(|p| DiseaseScore {
                        disease: p.disease,
                        score: p.probability,
                        source: EngineSource::Probabilistic,
                    })
                    .collect()
            });

        Ok(DiagnosisReport {
            query_id: Uuid::new_v4(),
            issued_at: Utc::now(),
            generation: self.generation(),
            graph,
            probabilistic,
        })
    }

    /// All diseases in the active snapshot, first-seen order.
    ///
    /// # Errors
    /// Returns [`DiagnosisError::NotLoaded`] when no snapshot is active.
    pub fn diseases(&self) -> DiagnosisResult<Vec<Entity>> {
        Ok(self
            .snapshot()
            .ok_or(DiagnosisError::NotLoaded)?
            .diseases())
    }

    /// All symptoms in the active snapshot, first-seen order.
    ///
    /// # Errors
    /// Returns [`DiagnosisError::NotLoaded`] when no snapshot is active.
    pub fn symptoms(&self) -> DiagnosisResult<Vec<Entity>> {
        Ok(self
            .snapshot()
            .ok_or(DiagnosisError::NotLoaded)?
            .symptoms())
    }
}
