use coderisk_agent::{assemble, reducer, state::AgentState, BlockMode};
use coderisk_ai::LLMProvider;
use coderisk_core::{AgentConfig, CoreRiskConfig, MetricRegistry, Phase0Result, Phase1Result};
use coderisk_git::{FileResolver, GitRepository};
use coderisk_store::{HybridQueries, KgClient, RsClient};
use coderisk_tools::{schemas, ToolExecutor};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::warn;

/// Everything a single file's evaluation needs, shared read-only across the
/// worker pool. Built once per `coderisk check` invocation.
pub struct Pipeline {
    pub repo_id: String,
    pub resolver: FileResolver<KgClient>,
    pub queries: HybridQueries,
    pub registry: MetricRegistry,
    pub provider: Box<dyn LLMProvider>,
    pub config: CoreRiskConfig,
    pub block_mode: BlockMode,
    max_concurrency: usize,
}

impl Pipeline {
    pub async fn connect(
        repo_root: &std::path::Path,
        repo_id: String,
        config: CoreRiskConfig,
        provider: Box<dyn LLMProvider>,
        block_mode: BlockMode,
    ) -> anyhow::Result<Self> {
        let kg_config = coderisk_store::KgConfig {
            connection: config.kg_uri.clone(),
            namespace: "coderisk".to_string(),
            database: "coderisk".to_string(),
            username: Some("root".to_string()),
            password: config
                .kg_password
                .as_ref()
                .map(|s| secrecy::ExposeSecret::expose_secret(s).to_string()),
        };
        let kg = KgClient::connect(kg_config).await?;
        let rs = RsClient::connect(&config.rs_dsn).await?;
        let queries = HybridQueries::new(kg.clone(), rs);

        let repo = GitRepository::open(repo_root)?;
        let resolver = FileResolver::new(repo, Arc::new(kg));

        Ok(Self {
            repo_id,
            resolver,
            queries,
            registry: MetricRegistry::default(),
            provider,
            config,
            block_mode,
            max_concurrency: 4,
        })
    }

    /// Evaluates every path in `paths`, bounded to `min(paths.len(), 4)`
    /// concurrent evaluations in flight at once (spec.md §5's worker-pool
    /// sizing), each inside its own deadline and cancellation scope so a
    /// hung file can never stall the batch past its own budget.
    ///
    /// Uses `buffer_unordered` rather than `tokio::spawn`/`JoinSet`: the
    /// per-file future closes over a borrowed `git2::Repository`, which is
    /// `!Send`, so it can make concurrent progress on one task but cannot be
    /// handed to another OS thread. This matches the I/O-bound nature of
    /// the work (graph/DB round-trips, LLM calls) rather than needing
    /// CPU parallelism.
    pub async fn evaluate_all(
        &self,
        repo: &GitRepository,
        paths: &[String],
    ) -> Vec<coderisk_core::RiskAssessment> {
        use futures::stream::{self, StreamExt};

        let max_concurrency = self.max_concurrency.min(paths.len().max(1));
        stream::iter(paths)
            .map(|path| self.evaluate_file(repo, path))
            .buffer_unordered(max_concurrency)
            .collect()
            .await
    }

    /// Runs the full per-file pipeline from spec.md §2: resolve identity,
    /// classify with Phase 0, fetch Phase 1 baseline metrics unless Phase 0
    /// already decided the outcome, then escalate to the Phase 2 agent when
    /// either phase calls for it. Wrapped in the configured full-pipeline
    /// deadline; a timeout here becomes an emergency assessment rather than
    /// a dropped file.
    pub async fn evaluate_file(&self, repo: &GitRepository, path: &str) -> coderisk_core::RiskAssessment {
        let started = Instant::now();
        let cancel = CancellationToken::new();
        let full_deadline = Duration::from_secs(self.config.agent.full_pipeline_deadline_secs);

        match tokio::time::timeout(full_deadline, self.run_file(repo, path, &cancel)).await {
            Ok(assessment) => assessment,
            Err(_) => {
                cancel.cancel();
                timeout_assessment(path, started.elapsed(), self.block_mode)
            }
        }
    }

    async fn run_file(
        &self,
        repo: &GitRepository,
        path: &str,
        cancel: &CancellationToken,
    ) -> coderisk_core::RiskAssessment {
        let started = Instant::now();
        let diff = repo.unified_diff_for(path).unwrap_or_default();
        let phase0 = coderisk_phase0::classify(path, &diff);

        if phase0.skip_all {
            return assemble(
                path,
                &phase0,
                &Phase1Result::empty(),
                coderisk_core::InvestigationTrace::empty(),
                None,
                started.elapsed(),
                self.block_mode,
            );
        }

        let resolved = self.resolve(path).await;

        if phase0.force_escalate {
            let (outcome, trace) = self
                .run_agent(path, &resolved, &phase0, &Phase1Result::empty(), &diff, cancel)
                .await;
            return assemble(
                path,
                &phase0,
                &Phase1Result::empty(),
                trace,
                Some(&outcome),
                started.elapsed(),
                self.block_mode,
            );
        }

        let phase1_deadline = Duration::from_millis(self.config.agent.phase1_only_deadline_millis);
        let phase1 = coderisk_phase1::run(
            &self.queries,
            &self.registry,
            &resolved,
            &self.config.phase1,
            phase1_deadline,
        )
        .await;

        if phase1.risk <= coderisk_core::RiskLevel::Low && !phase1.should_escalate {
            return assemble(
                path,
                &phase0,
                &phase1,
                coderisk_core::InvestigationTrace::empty(),
                None,
                started.elapsed(),
                self.block_mode,
            );
        }

        let (outcome, trace) = self.run_agent(path, &resolved, &phase0, &phase1, &diff, cancel).await;
        assemble(path, &phase0, &phase1, trace, Some(&outcome), started.elapsed(), self.block_mode)
    }

    /// Resolves `path` to every historical name the graph has observed it
    /// under. A resolver failure (KG unreachable, transient store error) is
    /// swallowed to an empty resolved set rather than failing the file —
    /// the downstream phases already treat an empty set as "no KG history".
    async fn resolve(&self, path: &str) -> Vec<String> {
        match self.resolver.resolve(&self.repo_id, path).await {
            Ok(matches) => matches.into_iter().map(|m| m.historical_path).collect(),
            Err(e) => {
                warn!(error = %e, path, "file resolution failed, proceeding with no resolved history");
                Vec::new()
            }
        }
    }

    async fn run_agent(
        &self,
        path: &str,
        resolved_paths: &[String],
        phase0: &Phase0Result,
        phase1: &Phase1Result,
        diff: &str,
        cancel: &CancellationToken,
    ) -> (coderisk_agent::Outcome, coderisk_core::InvestigationTrace) {
        let tools = schemas::all();
        let agent_config: &AgentConfig = &self.config.agent;
        let system_prompt = coderisk_agent::prompt::build_system_prompt(
            path,
            resolved_paths,
            phase0,
            phase1,
            diff,
            &tools,
            agent_config.max_hops,
        );
        let state = AgentState::new(
            path.to_string(),
            resolved_paths.to_vec(),
            phase0.clone(),
            phase1.clone(),
            system_prompt,
        );

        let per_call_deadline = Duration::from_secs(self.config.agent.full_pipeline_deadline_secs)
            .checked_div(agent_config.max_hops.max(1))
            .unwrap_or(Duration::from_secs(1));
        let executor = ToolExecutor::new(&self.queries, per_call_deadline);

        let (state, trace) = reducer::run(
            state,
            self.provider.as_ref(),
            &executor,
            &tools,
            agent_config,
            cancel,
        )
        .await;

        (state.outcome.expect("reducer always sets an outcome"), trace)
    }
}

fn timeout_assessment(
    path: &str,
    duration: Duration,
    block_mode: BlockMode,
) -> coderisk_core::RiskAssessment {
    assemble(
        path,
        &Phase0Result::unknown(),
        &Phase1Result::empty(),
        coderisk_core::InvestigationTrace::empty(),
        Some(&coderisk_agent::Outcome::Emergency(
            coderisk_agent::EmergencyReason::Cancelled,
        )),
        duration,
        block_mode,
    )
}
