use std::collections::{BTreeMap, HashSet};
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::{SecondsFormat, Utc};
use clap::Parser;
use maze_chase_engine::audio::{CueLog, CueThrottle};
use maze_chase_engine::autopilot::Autopilot;
use maze_chase_engine::constants::{CELL_SIZE, TICK_MS, TICK_RATE};
use maze_chase_engine::engine::audit::{audit_level, LevelAudit};
use maze_chase_engine::engine::{EngineConfig, GameEngine};
use maze_chase_engine::error::LevelError;
use maze_chase_engine::level::{builtin_level, load_level, LevelConfig};
use maze_chase_engine::types::{EngineStatus, GhostMode, RuntimeEvent, Snapshot};
use serde::Serialize;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Ticks without any score change, while running, before a scenario is flagged as stalled.
const STALL_TICKS: u64 = 60 * TICK_RATE;

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    #[arg(long)]
    seed: Option<u64>,
    #[arg(long)]
    ticks: Option<u64>,
    #[arg(long)]
    level: Option<PathBuf>,
    /// Pin the base mode: scatter, chase or scared.
    #[arg(long)]
    mode: Option<String>,
    #[arg(long)]
    audit: bool,
    #[arg(long)]
    match_id: Option<String>,
    #[arg(long)]
    summary_out: Option<PathBuf>,
}

#[derive(Clone, Debug, Serialize)]
struct Scenario {
    name: String,
    seed: u64,
    ticks: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum FinishReason {
    LevelComplete,
    TickLimit,
    Halted,
}

impl FinishReason {
    fn key(self) -> &'static str {
        match self {
            Self::LevelComplete => "level_complete",
            Self::TickLimit => "tick_limit",
            Self::Halted => "halted",
        }
    }
}

#[derive(Clone, Debug, Default, Serialize)]
struct EventTally {
    #[serde(rename = "dotsEaten")]
    dots_eaten: u32,
    #[serde(rename = "powerUps")]
    power_ups: u32,
    #[serde(rename = "ghostsEaten")]
    ghosts_eaten: u32,
    deaths: u32,
    #[serde(rename = "levelCompletions")]
    level_completions: u32,
    #[serde(rename = "modeChanges")]
    mode_changes: u32,
    releases: u32,
}

impl EventTally {
    fn record(&mut self, event: &RuntimeEvent) {
        match event {
            RuntimeEvent::DotEaten { .. } => self.dots_eaten += 1,
            RuntimeEvent::PowerEaten { .. } => self.power_ups += 1,
            RuntimeEvent::GhostEaten { .. } => self.ghosts_eaten += 1,
            RuntimeEvent::PlayerDeath { .. } => self.deaths += 1,
            RuntimeEvent::LevelComplete => self.level_completions += 1,
            RuntimeEvent::ModeChanged { .. } => self.mode_changes += 1,
            RuntimeEvent::GhostReleased { .. } => self.releases += 1,
            _ => {}
        }
    }
}

#[derive(Clone, Debug, Serialize)]
struct ScenarioResultLine {
    scenario: String,
    seed: u64,
    level: String,
    reason: FinishReason,
    ticks: u64,
    #[serde(rename = "durationMs")]
    duration_ms: u64,
    score: i32,
    #[serde(rename = "collectiblesLeft")]
    collectibles_left: usize,
    #[serde(flatten)]
    tally: EventTally,
    #[serde(rename = "cuesPlayed")]
    cues_played: usize,
    #[serde(rename = "cuesDropped")]
    cues_dropped: u64,
    anomalies: Vec<String>,
}

#[derive(Clone, Debug, Serialize)]
struct AnomalyRecord {
    tick: u64,
    message: String,
}

#[derive(Clone, Debug)]
struct ScenarioRunResult {
    result: ScenarioResultLine,
    anomaly_records: Vec<AnomalyRecord>,
}

#[derive(Clone, Debug, Serialize)]
struct RunSummary {
    #[serde(rename = "matchId")]
    match_id: String,
    #[serde(rename = "startedAt")]
    started_at: String,
    #[serde(rename = "finishedAt")]
    finished_at: String,
    #[serde(rename = "scenarioCount")]
    scenario_count: usize,
    #[serde(rename = "anomalyCount")]
    anomaly_count: usize,
    #[serde(rename = "averageScore")]
    average_score: i32,
    #[serde(rename = "reasonCounts")]
    reason_counts: BTreeMap<String, usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    audit: Option<LevelAudit>,
    scenarios: Vec<ScenarioResultLine>,
}

fn main() {
    init_tracing();
    let cli = Cli::parse();

    let level = match resolve_level(cli.level.as_deref()) {
        Ok(level) => level,
        Err(err) => {
            error!(error = %err, "level_load_failed");
            std::process::exit(2);
        }
    };
    let pinned_mode = match cli.mode.as_deref().map(GhostMode::from_str).transpose() {
        Ok(mode) => mode,
        Err(err) => {
            error!(error = %err, "invalid_mode");
            std::process::exit(2);
        }
    };

    let started_at = timestamp();
    let scenarios = resolve_scenarios(&cli);
    let seed_hint = scenarios.first().map(|scenario| scenario.seed).unwrap_or(0);
    let match_id = cli
        .match_id
        .clone()
        .unwrap_or_else(|| default_match_id(seed_hint, Utc::now().timestamp_millis()));
    let mut has_anomaly = false;
    let mut total_anomalies = 0usize;

    let audit = if cli.audit {
        match audit_level(&level) {
            Ok(audit) => {
                if !audit.is_clean() {
                    warn!(
                        level = %audit.level,
                        dead_ends = audit.dead_ends.len(),
                        player_start_reachable = audit.player_start_reachable,
                        "level_audit_failed"
                    );
                    has_anomaly = true;
                    total_anomalies += 1;
                }
                print_json_line(&audit);
                Some(audit)
            }
            Err(err) => {
                error!(error = %err, "level_audit_error");
                std::process::exit(2);
            }
        }
    } else {
        None
    };

    let mut scenario_results = Vec::new();
    let mut reason_counts: BTreeMap<String, usize> = BTreeMap::new();
    for scenario in scenarios {
        info!(
            match_id = %match_id,
            scenario = %scenario.name,
            seed = scenario.seed,
            ticks = scenario.ticks,
            "scenario_started"
        );
        let scenario_run = match run_scenario(&scenario, &level, pinned_mode) {
            Ok(run) => run,
            Err(err) => {
                error!(scenario = %scenario.name, error = %err, "scenario_setup_failed");
                std::process::exit(2);
            }
        };

        for anomaly in &scenario_run.anomaly_records {
            warn!(
                scenario = %scenario.name,
                tick = anomaly.tick,
                detail = %anomaly.message,
                "anomaly_detected"
            );
        }
        if !scenario_run.result.anomalies.is_empty() {
            has_anomaly = true;
        }
        total_anomalies += scenario_run.anomaly_records.len();
        *reason_counts
            .entry(scenario_run.result.reason.key().to_string())
            .or_insert(0) += 1;

        info!(
            scenario = %scenario.name,
            reason = scenario_run.result.reason.key(),
            score = scenario_run.result.score,
            ticks = scenario_run.result.ticks,
            deaths = scenario_run.result.tally.deaths,
            "scenario_finished"
        );
        print_json_line(&scenario_run.result);
        scenario_results.push(scenario_run.result);
    }

    let summary = build_run_summary(
        match_id.clone(),
        started_at,
        timestamp(),
        scenario_results,
        reason_counts,
        total_anomalies,
        audit,
    );

    if let Some(path) = cli.summary_out.as_ref() {
        if let Err(err) = write_summary(path, &summary) {
            error!(path = %path.display(), error = %err, "summary_write_failed");
            std::process::exit(2);
        }
        info!(path = %path.display(), "summary_written");
    }

    info!(
        match_id = %match_id,
        scenarios = summary.scenario_count,
        anomalies = summary.anomaly_count,
        average_score = summary.average_score,
        "run_finished"
    );

    if has_anomaly {
        std::process::exit(1);
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .compact()
        .init();
}

fn resolve_level(path: Option<&Path>) -> Result<LevelConfig, LevelError> {
    match path {
        Some(path) => load_level(path),
        None => builtin_level(),
    }
}

fn run_scenario(
    scenario: &Scenario,
    level: &LevelConfig,
    pinned_mode: Option<GhostMode>,
) -> Result<ScenarioRunResult, LevelError> {
    let config = EngineConfig {
        seed: scenario.seed,
        ..EngineConfig::default()
    };
    let mut engine = GameEngine::new(level.clone(), config)?;
    if let Some(mode) = pinned_mode {
        engine.force_mode(mode);
    }
    let mut pilot = Autopilot::new(engine.grid(), level.player_start);
    let mut audio = CueThrottle::new(CueLog::default());

    let mut tally = EventTally::default();
    let mut anomalies = Vec::new();
    let mut anomaly_records = Vec::new();
    let mut anomaly_seen = HashSet::new();
    let mut reason = FinishReason::TickLimit;
    let mut last_score_tick = 0u64;
    let mut last_score = 0i32;
    let mut ticks = 0u64;

    while ticks < scenario.ticks {
        let input = if engine.is_paused() {
            pilot.input(engine.grid())
        } else {
            pilot.tick(engine.grid())
        };
        let step = engine.step(TICK_MS, &input, &mut audio);
        ticks += 1;

        let report = match step {
            Ok(report) => report,
            Err(err) => {
                push_anomaly(
                    &mut anomalies,
                    &mut anomaly_records,
                    &mut anomaly_seen,
                    ticks,
                    format!("engine halted: {err}"),
                );
                reason = FinishReason::Halted;
                break;
            }
        };
        if report.player_died {
            pilot.reset(engine.grid());
        }

        let snapshot = engine.build_snapshot(true);
        for event in &snapshot.events {
            tally.record(event);
        }
        for message in collect_snapshot_anomalies(&snapshot, &engine) {
            push_anomaly(
                &mut anomalies,
                &mut anomaly_records,
                &mut anomaly_seen,
                ticks,
                message,
            );
        }

        if snapshot.score != last_score || snapshot.status != EngineStatus::Running {
            last_score = snapshot.score;
            last_score_tick = ticks;
        } else if ticks - last_score_tick >= STALL_TICKS {
            push_anomaly(
                &mut anomalies,
                &mut anomaly_records,
                &mut anomaly_seen,
                ticks,
                format!(
                    "stalled: no score for {STALL_TICKS} ticks with {} collectibles left",
                    snapshot.collectibles_left
                ),
            );
            last_score_tick = ticks;
        }

        if engine.status() == EngineStatus::LevelComplete {
            reason = FinishReason::LevelComplete;
            break;
        }
    }

    Ok(ScenarioRunResult {
        result: ScenarioResultLine {
            scenario: scenario.name.clone(),
            seed: scenario.seed,
            level: level.name.clone(),
            reason,
            ticks,
            duration_ms: engine.now_ms(),
            score: engine.score(),
            collectibles_left: engine.grid().collectibles_left(),
            tally,
            cues_played: audio.inner().cues.len(),
            cues_dropped: audio.dropped(),
            anomalies,
        },
        anomaly_records,
    })
}

fn collect_snapshot_anomalies(snapshot: &Snapshot, engine: &GameEngine) -> Vec<String> {
    let grid = engine.grid();
    let mut anomalies = Vec::new();
    // one cell of slack for the off-grid lerp through the tunnel
    let min = -CELL_SIZE;
    let max_x = (grid.cols() + 1) as f32 * CELL_SIZE;
    let max_y = (grid.rows() + 1) as f32 * CELL_SIZE;
    for ghost in &snapshot.ghosts {
        if !grid.in_bounds(ghost.tile) {
            anomalies.push(format!("ghost tile outside grid: {} {}", ghost.kind.name(), ghost.tile));
        }
        if !ghost.x.is_finite()
            || !ghost.y.is_finite()
            || ghost.x < min
            || ghost.y < min
            || ghost.x > max_x
            || ghost.y > max_y
        {
            anomalies.push(format!(
                "ghost pixel outside grid: {} ({:.1}, {:.1})",
                ghost.kind.name(),
                ghost.x,
                ghost.y
            ));
        }
    }
    if snapshot.score < 0 {
        anomalies.push(format!("negative score: {}", snapshot.score));
    }
    anomalies
}

fn resolve_scenarios(cli: &Cli) -> Vec<Scenario> {
    let seed = cli
        .seed
        .unwrap_or_else(|| Utc::now().timestamp_millis().unsigned_abs());

    if let Some(ticks) = cli.ticks {
        return vec![Scenario {
            name: format!("custom-{}", ticks.max(1)),
            seed,
            ticks: ticks.max(1),
        }];
    }

    vec![
        Scenario {
            name: "quick-check".to_string(),
            seed,
            ticks: 60 * TICK_RATE,
        },
        Scenario {
            name: "full-clear".to_string(),
            seed: seed.wrapping_add(1),
            ticks: 15 * 60 * TICK_RATE,
        },
    ]
}

fn push_anomaly(
    anomalies: &mut Vec<String>,
    anomaly_records: &mut Vec<AnomalyRecord>,
    anomaly_seen: &mut HashSet<String>,
    tick: u64,
    message: String,
) {
    anomaly_records.push(AnomalyRecord {
        tick,
        message: message.clone(),
    });
    if anomaly_seen.insert(message.clone()) {
        anomalies.push(message);
    }
}

fn default_match_id(seed: u64, timestamp_ms: i64) -> String {
    format!("sim-{seed}-{timestamp_ms}")
}

fn timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn build_run_summary(
    match_id: String,
    started_at: String,
    finished_at: String,
    scenarios: Vec<ScenarioResultLine>,
    reason_counts: BTreeMap<String, usize>,
    anomaly_count: usize,
    audit: Option<LevelAudit>,
) -> RunSummary {
    let scenario_count = scenarios.len();
    let total_score: i64 = scenarios.iter().map(|scenario| scenario.score as i64).sum();
    let average_score = if scenario_count == 0 {
        0
    } else {
        (total_score / scenario_count as i64) as i32
    };
    RunSummary {
        match_id,
        started_at,
        finished_at,
        scenario_count,
        anomaly_count,
        average_score,
        reason_counts,
        audit,
        scenarios,
    }
}

fn print_json_line<T: Serialize>(value: &T) {
    match serde_json::to_string(value) {
        Ok(line) => println!("{line}"),
        Err(err) => error!(error = %err, "result_serialize_failed"),
    }
}

fn write_summary(path: &Path, summary: &RunSummary) -> io::Result<()> {
    let summary_text = serde_json::to_string_pretty(summary).map_err(io::Error::other)?;
    std::fs::write(path, summary_text)
}
