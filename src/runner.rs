//! # Runner モジュール
//!
//! シナリオファイルに記述されたセッションを、表示層なしで再生します。
//!
//! 1フレームごとに「照準サンプルの入力」または「ティック」をエンジンタスクへ
//! 送ります。実時間モードでは `tick_hz` に合わせてフレームを刻み、
//! それ以外はフレームを連続で処理します。

use std::time::Duration;

use serde::Serialize;
use thiserror::Error;
use tokio::time::{Interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::controller::{EngineCommand, EngineGone, EngineHandle, spawn_engine};
use crate::models::scoring::{self, Feedback};
use crate::models::*;
use crate::scenario::ScenarioConfig;
use crate::simulation::{SimulationEngine, SimulationEvent};

/// セッション再生のエラー
#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    EngineGone(#[from] EngineGone),

    #[error("エンジンタスクが異常終了しました: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("セッションが完了せずに終了しました")]
    Incomplete,

    #[error("フレームレート {0}Hz ではフレーム間隔を表現できません")]
    InvalidTickRate(f64),
}

/// 1セッションの実行結果
#[derive(Debug, Clone, Serialize)]
pub struct SessionReport {
    pub scenario: String,
    pub results: ResultsSnapshot,
    pub feedback: Feedback,
    /// 照準に使ったフレーム数
    pub aim_frames: u64,
    /// ドリルに使ったフレーム数
    pub drill_frames: u64,
    /// 最大フレーム数に達して強制完了したかどうか
    pub forced: bool,
    pub events: Vec<SimulationEvent>,
}

/// フレーム間隔の制御
struct FramePacer {
    interval: Option<Interval>,
}

impl FramePacer {
    fn new(realtime: bool, tick_hz: f64) -> Result<Self, RunError> {
        if !realtime {
            return Ok(Self { interval: None });
        }

        let period = Duration::try_from_secs_f64(1.0 / tick_hz)
            .ok()
            .filter(|period| !period.is_zero())
            .ok_or(RunError::InvalidTickRate(tick_hz))?;
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        Ok(Self {
            interval: Some(interval),
        })
    }

    async fn next_frame(&mut self) {
        if let Some(interval) = self.interval.as_mut() {
            interval.tick().await;
        }
    }
}

/// シナリオ設定からエンジンを構築
pub fn build_engine(config: &ScenarioConfig) -> SimulationEngine {
    let rng: Box<dyn IRandomSource + Send> = Box::new(RngSource::from_seed_option(config.sim.seed));
    let clock: Box<dyn IClock + Send> = match config.sim.fixed_clock_ms {
        Some(ms) => Box::new(FixedClock::new(ms as f64)),
        None => Box::new(SystemClock),
    };
    SimulationEngine::new(rng, clock)
}

/// シナリオのセッションを1回再生
pub async fn run_session(config: &ScenarioConfig) -> Result<SessionReport, RunError> {
    let (handle, task) = spawn_engine(build_engine(config));
    let outcome = drive_session(&handle, config).await;
    let events = handle.drain_events().await;

    drop(handle);
    task.await?;

    let (aim_frames, drill_frames, forced) = outcome?;
    let events = events?;
    let results = events
        .iter()
        .rev()
        .find_map(|event| match event {
            SimulationEvent::DrillingCompleted { results, .. } => Some(*results),
            _ => None,
        })
        .ok_or(RunError::Incomplete)?;

    Ok(SessionReport {
        scenario: config.meta.name.clone(),
        results,
        feedback: scoring::select_feedback(&results),
        aim_frames,
        drill_frames,
        forced,
        events,
    })
}

async fn drive_session(
    handle: &EngineHandle,
    config: &ScenarioConfig,
) -> Result<(u64, u64, bool), RunError> {
    let session = &config.session;
    let max_ticks = config.sim.max_ticks;
    let mut pacer = FramePacer::new(config.sim.realtime, config.sim.tick_hz)?;
    let mut frames = 0u64;

    handle.start_simulation(session.method).await?;

    // 照準フェーズ
    let mut aim_frames = 0u64;
    for sample in &session.aim_path {
        if frames >= max_ticks {
            break;
        }
        pacer.next_frame().await;
        let metrics = handle.pointer(*sample).await?;
        frames += 1;
        aim_frames += 1;
        debug!(
            "照準フレーム {}: {:.2}° ({:?})",
            aim_frames,
            metrics.angle,
            MeterReadings::from_live(metrics.angle, metrics.depth).crosshair
        );
    }

    if frames < max_ticks {
        handle.send(EngineCommand::StartDrilling).await?;
    }

    // ドリルフェーズ
    let mut drill_frames = 0u64;
    while handle.results().await?.is_none() && frames < max_ticks {
        pacer.next_frame().await;
        let metrics = handle.tick().await?;
        frames += 1;
        drill_frames += 1;

        if let Some(threshold) = session.complete_at_depth {
            if metrics.phase == Phase::Drilling && metrics.depth >= threshold {
                info!("手動完了: 深度 {:.2}mm ≥ {:.2}mm", metrics.depth, threshold);
                handle.send(EngineCommand::CompleteDrilling).await?;
            }
        }
    }

    let mut forced = false;
    if handle.results().await?.is_none() {
        warn!("最大フレーム数 {} に達したため強制完了します", max_ticks);
        handle.send(EngineCommand::CompleteDrilling).await?;
        forced = true;
    }

    Ok((aim_frames, drill_frames, forced))
}

/// 全手法を同じシードで再生して比較
pub async fn run_comparison(config: &ScenarioConfig) -> Result<Vec<SessionReport>, RunError> {
    let mut reports = Vec::with_capacity(Method::ALL.len());
    for method in Method::ALL {
        let mut variant = config.clone();
        variant.session.method = method;
        reports.push(run_session(&variant).await?);
    }
    Ok(reports)
}

/// セッション結果をテキストで表示
pub fn print_report(report: &SessionReport) {
    let results = &report.results;
    let profile = results.method.profile();

    println!("=== 結果: {} ===", report.scenario);
    println!("{}", scoring::format_results_line(results));
    println!("{} ({:?})", scoring::format_score_line(results.score), report.feedback.grade);
    println!(
        "参照偏差 ({}): {:.2}° / {:.2}mm",
        results.method.display_name(),
        profile.angle_deviation_reference,
        profile.depth_deviation_reference
    );
    println!(
        "フレーム: 照準 {} / ドリル {}{}",
        report.aim_frames,
        report.drill_frames,
        if report.forced { " (強制完了)" } else { "" }
    );
    println!();
    if report.feedback.yomi_slayer {
        println!("🏆 YOMI SLAYER 🏆");
    }
    println!("{}", report.feedback.message);
    if let Some(reference) = report.feedback.study_reference {
        println!("{}", reference);
    }
}

/// 手法比較の表を表示
pub fn print_comparison(reports: &[SessionReport]) {
    println!("=== 手法比較 ===");
    println!(
        "{:<24} {:>8} {:>8} {:>8} {:>10}",
        "手法", "角度(°)", "深度(mm)", "スコア", "参照角度"
    );
    for report in reports {
        let results = &report.results;
        println!(
            "{:<24} {:>8.2} {:>8.2} {:>8.1} {:>10.2}",
            results.method.display_name(),
            results.angle,
            results.depth,
            results.score,
            results.method.profile().angle_deviation_reference
        );
    }
}
