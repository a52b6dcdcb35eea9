use crate::cluster::{Settlement, VariableCluster};
use crate::error::JoinError;
use crate::options::JoinOptions;
use crate::stream::{PatternStream, StreamDelta, StreamId};
use futures::future::{join_all, try_join_all};
use std::collections::BTreeMap;
use std::sync::Arc;
use tpf_join_common::error::SourceError;
use tpf_join_common::{FragmentMetadata, FragmentSource, ResultSink};
use tpf_join_model::{InvalidVariableError, Triple, TriplePattern, Variable};
use tracing::{debug, info, warn};

/// The result of a single round of a [JoinScheduler].
#[derive(Clone, Debug, PartialEq)]
pub enum RoundOutcome {
    /// At least one stream was read.
    Progress(RoundReport),
    /// No stream is left to read. This is the regular end of a run.
    Exhausted,
}

/// Describes what happened in a round that made progress.
#[derive(Clone, Debug, PartialEq)]
pub struct RoundReport {
    /// The cost that was charged to every stream.
    pub cost: f64,
    /// The streams that were read, in ascending order of their ids.
    pub reads: Vec<StreamRead>,
    /// The clusters whose state changed in this round.
    pub settlements: Vec<Settlement>,
}

/// A single read within a round.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StreamRead {
    pub stream: StreamId,
    pub delta: StreamDelta,
    /// Whether the stream ended with this read.
    pub ended: bool,
}

/// Summarizes a run of a [JoinScheduler].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// The number of rounds that made progress.
    pub rounds: usize,
    /// The number of reads over all rounds.
    pub reads: usize,
    /// Whether the run ended because all streams are exhausted.
    pub exhausted: bool,
}

/// Drives the streams of a join over triple patterns.
///
/// The scheduler owns one [PatternStream] per pattern and one [VariableCluster] per variable.
/// Every stream is a member of exactly the clusters of its variables, and this structure does not
/// change after [JoinScheduler::create].
///
/// # Strategies
///
/// [JoinScheduler::run] advances the streams one at a time. Each round it reads the cheapest
/// stream, charges its cost to all streams, reconciles the bindings of the read into the clusters
/// and settles every cluster before the next round starts. As all streams pay the same amount,
/// a stream whose reads are cheap is read proportionally more often than an expensive one.
///
/// [JoinScheduler::run_broadcast] is an experimental strategy that reads every stream that is due
/// in the same round. It only adds bindings of the variables a stream supplies, never records
/// complete domains, and does not settle the clusters. It gives weaker guarantees than
/// [JoinScheduler::run] and should only be used for comparisons.
#[derive(Debug)]
pub struct JoinScheduler {
    streams: Vec<PatternStream>,
    clusters: BTreeMap<Variable, VariableCluster>,
    sink: Option<Arc<dyn ResultSink>>,
    max_rounds: Option<usize>,
    rounds: usize,
    backlog: SinkBacklog,
}

/// Triples that the sink has not accepted yet.
#[derive(Debug, Default)]
struct SinkBacklog {
    added: Vec<Triple>,
    removed: Vec<Triple>,
}

impl SinkBacklog {
    fn push(&mut self, added: &[Triple], removed: &[Triple]) {
        for triple in removed {
            self.added.retain(|t| t != triple);
            self.removed.push(triple.clone());
        }
        for triple in added {
            self.removed.retain(|t| t != triple);
            self.added.push(triple.clone());
        }
    }

    fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }

    fn clear(&mut self) {
        self.added.clear();
        self.removed.clear();
    }
}

impl JoinScheduler {
    /// Creates a new [JoinScheduler] for `patterns`.
    ///
    /// The metadata of all patterns is fetched concurrently. If the source fails to provide the
    /// metadata of any pattern, the whole setup fails.
    pub async fn create(
        patterns: Vec<TriplePattern>,
        options: JoinOptions,
    ) -> Result<Self, JoinError> {
        let JoinOptions {
            source,
            sink,
            max_rounds,
            apply_bound_filters,
        } = options;

        let metadata = try_join_all(patterns.iter().map(|pattern| {
            let source = Arc::clone(&source);
            async move {
                fetch_metadata(source.as_ref(), pattern)
                    .await
                    .map_err(|error| JoinError::MetadataFetch {
                        pattern: pattern.clone(),
                        source: error,
                    })
            }
        }))
        .await?;

        let mut streams = Vec::with_capacity(patterns.len());
        let mut clusters = BTreeMap::new();
        for (index, (pattern, metadata)) in patterns.into_iter().zip(metadata).enumerate() {
            let mut stream = PatternStream::new(
                StreamId::new(index),
                pattern,
                metadata,
                Arc::clone(&source),
                apply_bound_filters,
            );
            for variable in stream.variables().to_vec() {
                let cluster = clusters
                    .entry(variable.clone())
                    .or_insert_with(|| VariableCluster::new(variable.clone()));
                cluster.add_member(stream.id());
                stream.add_bound_filter(variable, cluster.subscribe());
            }
            streams.push(stream);
        }

        // The cheapest member of a cluster supplies its variable. Ties go to the first pattern.
        for cluster in clusters.values() {
            let supplier = cluster
                .members()
                .iter()
                .copied()
                .min_by(|a, b| streams[a.index()].cost().total_cmp(&streams[b.index()].cost()));
            if let Some(supplier) = supplier {
                streams[supplier.index()].add_supplied(cluster.variable().clone());
            }
        }

        info!(
            patterns = streams.len(),
            clusters = clusters.len(),
            "created join scheduler"
        );
        Ok(Self {
            streams,
            clusters,
            sink,
            max_rounds,
            rounds: 0,
            backlog: SinkBacklog::default(),
        })
    }

    pub fn streams(&self) -> &[PatternStream] {
        &self.streams
    }

    pub fn stream(&self, id: StreamId) -> Option<&PatternStream> {
        self.streams.get(id.index())
    }

    /// Returns the clusters ordered by their variable.
    pub fn clusters(&self) -> impl Iterator<Item = &VariableCluster> {
        self.clusters.values()
    }

    pub fn cluster(&self, variable: &Variable) -> Option<&VariableCluster> {
        self.clusters.get(variable)
    }

    /// Returns the number of rounds that made progress so far.
    pub fn rounds(&self) -> usize {
        self.rounds
    }

    /// Runs rounds until all streams are exhausted or the configured round limit is reached.
    ///
    /// The scheduler yields to the runtime between two rounds. Dropping the returned future
    /// cancels the read of the current round.
    pub async fn run(&mut self) -> Result<RunSummary, JoinError> {
        let mut summary = RunSummary::default();
        loop {
            if self.max_rounds.is_some_and(|max| summary.rounds >= max) {
                info!(rounds = summary.rounds, "stopped join after round limit");
                return Ok(summary);
            }

            match self.round().await? {
                RoundOutcome::Exhausted => {
                    summary.exhausted = true;
                    info!(
                        rounds = summary.rounds,
                        reads = summary.reads,
                        "all pattern streams are exhausted"
                    );
                    return Ok(summary);
                }
                RoundOutcome::Progress(report) => {
                    summary.rounds += 1;
                    summary.reads += report.reads.len();
                }
            }

            tokio::task::yield_now().await;
        }
    }

    /// Executes a single round of the cost-greedy strategy.
    ///
    /// Reads the non-ended stream with the lowest cost, charges this cost to every stream,
    /// reconciles the read into the clusters of the stream's variables, settles all clusters, and
    /// hands the triples to the sink. Returns [RoundOutcome::Exhausted] if no stream is left.
    ///
    /// The round is complete before the sink is called. If the sink fails, the triples of the
    /// round are handed to it again together with those of the next round.
    pub async fn round(&mut self) -> Result<RoundOutcome, JoinError> {
        let Some((selected, cost)) = self.cheapest() else {
            self.deliver(&[], &[]).await?;
            return Ok(RoundOutcome::Exhausted);
        };

        if cost > 0.0 {
            for stream in &mut self.streams {
                stream.spend(cost);
            }
        }

        let delta = self.streams[selected.index()].read().await?;
        let stream = &self.streams[selected.index()];
        let ended = stream.ended();

        for variable in stream.variables() {
            let cluster = cluster_mut(&mut self.clusters, stream, variable)?;
            cluster.remove_bindings(
                delta
                    .removed
                    .iter()
                    .filter_map(|triple| stream.project(triple, variable)),
            );
            cluster.add_bindings(
                delta
                    .added
                    .iter()
                    .filter_map(|triple| stream.project(triple, variable)),
            );
            if ended && cluster.add_bounds(stream.domain(variable)?) {
                debug!(
                    stream = %selected,
                    variable = %variable,
                    "recorded complete domain"
                );
            }
        }

        let settlements = self.settle();
        self.rounds += 1;
        self.deliver(&delta.added, &delta.removed).await?;

        debug!(
            round = self.rounds,
            stream = %selected,
            cost,
            added = delta.added.len(),
            removed = delta.removed.len(),
            ended,
            "finished round"
        );
        Ok(RoundOutcome::Progress(RoundReport {
            cost,
            reads: vec![StreamRead {
                stream: selected,
                delta,
                ended,
            }],
            settlements,
        }))
    }

    /// Runs at most `max_rounds` rounds of the broadcast strategy.
    ///
    /// Stops early if no stream is left to read. The strategy makes no other termination
    /// guarantee, so the number of rounds must be bounded by the caller. A smaller
    /// [JoinOptions::max_rounds] takes precedence over `max_rounds`.
    pub async fn run_broadcast(&mut self, max_rounds: usize) -> Result<RunSummary, JoinError> {
        let max_rounds = self.max_rounds.map_or(max_rounds, |limit| limit.min(max_rounds));
        let mut summary = RunSummary::default();
        while summary.rounds < max_rounds {
            match self.broadcast_round().await? {
                RoundOutcome::Exhausted => {
                    summary.exhausted = true;
                    break;
                }
                RoundOutcome::Progress(report) => {
                    summary.rounds += 1;
                    summary.reads += report.reads.len();
                }
            }
            tokio::task::yield_now().await;
        }
        info!(
            rounds = summary.rounds,
            reads = summary.reads,
            exhausted = summary.exhausted,
            "finished broadcast join"
        );
        Ok(summary)
    }

    /// Executes a single round of the broadcast strategy.
    ///
    /// Charges the lowest cost among the non-ended streams to every stream and concurrently reads
    /// all streams that are due afterward. Removals are reconciled for every variable, additions
    /// only for the variables a stream supplies. Complete domains are neither recorded nor
    /// published and the clusters are not settled.
    ///
    /// If some of the reads fail, the successful ones are still reconciled and handed to the sink
    /// before the first read error is returned.
    pub async fn broadcast_round(&mut self) -> Result<RoundOutcome, JoinError> {
        let Some((_, cost)) = self.cheapest() else {
            self.deliver(&[], &[]).await?;
            return Ok(RoundOutcome::Exhausted);
        };

        for stream in &mut self.streams {
            stream.spend(cost);
        }

        let results = join_all(
            self.streams
                .iter_mut()
                .filter(|stream| stream.is_due())
                .map(|stream| async move { (stream.id(), stream.read().await) }),
        )
        .await;

        let mut reads = Vec::with_capacity(results.len());
        let mut added = Vec::new();
        let mut removed = Vec::new();
        let mut read_error = None;
        for (id, result) in results {
            let delta = match result {
                Ok(delta) => delta,
                Err(error) => {
                    read_error.get_or_insert(error);
                    continue;
                }
            };
            let stream = &self.streams[id.index()];
            for variable in stream.variables() {
                let cluster = cluster_mut(&mut self.clusters, stream, variable)?;
                cluster.remove_bindings(
                    delta
                        .removed
                        .iter()
                        .filter_map(|triple| stream.project(triple, variable)),
                );
                if stream.supplies(variable) {
                    cluster.add_bindings(
                        delta
                            .added
                            .iter()
                            .filter_map(|triple| stream.project(triple, variable)),
                    );
                }
            }
            added.extend(delta.added.iter().cloned());
            removed.extend(delta.removed.iter().cloned());
            reads.push(StreamRead {
                stream: id,
                ended: stream.ended(),
                delta,
            });
        }

        self.rounds += 1;
        debug!(
            round = self.rounds,
            cost,
            reads = reads.len(),
            failed = read_error.is_some(),
            "finished broadcast round"
        );

        let delivered = self.deliver(&added, &removed).await;
        if let Some(error) = read_error {
            return Err(error);
        }
        delivered?;
        Ok(RoundOutcome::Progress(RoundReport {
            cost,
            reads,
            settlements: Vec::new(),
        }))
    }

    /// Returns the non-ended stream with the lowest cost. Ties go to the stream with the lowest id.
    fn cheapest(&self) -> Option<(StreamId, f64)> {
        self.streams
            .iter()
            .filter(|stream| !stream.ended())
            .map(|stream| (stream.id(), stream.cost()))
            .min_by(|(_, a), (_, b)| a.total_cmp(b))
    }

    /// Settles every cluster and returns the settlements of the clusters that changed.
    fn settle(&mut self) -> Vec<Settlement> {
        self.clusters
            .values_mut()
            .map(VariableCluster::update)
            .filter(|settlement| settlement.changed || settlement.published_bounds)
            .collect()
    }

    /// Hands `added` and `removed` to the sink together with everything it rejected before.
    async fn deliver(&mut self, added: &[Triple], removed: &[Triple]) -> Result<(), JoinError> {
        let Some(sink) = &self.sink else {
            return Ok(());
        };
        self.backlog.push(added, removed);
        if self.backlog.is_empty() {
            return Ok(());
        }
        sink.apply(&self.backlog.added, &self.backlog.removed)
            .await
            .map_err(|error| {
                warn!(
                    added = self.backlog.added.len(),
                    removed = self.backlog.removed.len(),
                    "result sink rejected triples, keeping them for the next round"
                );
                JoinError::from(error)
            })?;
        self.backlog.clear();
        Ok(())
    }
}

async fn fetch_metadata(
    source: &dyn FragmentSource,
    pattern: &TriplePattern,
) -> Result<FragmentMetadata, SourceError> {
    let mut fragment = source.fragment(pattern, 1).await?;
    let metadata = fragment.metadata().await;
    fragment.close();
    metadata
}

fn cluster_mut<'a>(
    clusters: &'a mut BTreeMap<Variable, VariableCluster>,
    stream: &PatternStream,
    variable: &Variable,
) -> Result<&'a mut VariableCluster, InvalidVariableError> {
    clusters
        .get_mut(variable)
        .ok_or_else(|| InvalidVariableError {
            variable: variable.clone(),
            pattern: stream.pattern().clone(),
        })
}
