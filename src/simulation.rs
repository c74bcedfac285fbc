//! # Simulation モジュール
//!
//! インプラント埋入シミュレーションの中核となるエンジンを提供します。
//!
//! エンジンは1つのラン（[`SimulationRun`]）を排他的に所有し、ポインタ入力と
//! 離散コマンドを受け取って状態を遷移させ、ライブ指標と最終結果を返します。
//! 描画・DOM・認証などの表示層は外部の協調者であり、エンジンの状態を直接
//! 書き換えることはできません。状態の変化はイベントとして取り出せます。
//!
//! ## 状態遷移
//!
//! ```text
//! Idle --start_simulation--> Aiming --start_drilling--> Drilling
//!                              |                           |
//!                              +---complete_drilling---+   +--(深度 >= 1.0 / complete_drilling)
//!                                                      v   v
//!                                                    Complete
//! ```
//!
//! `start_simulation` はどのフェーズからでも新しいランを開始します。
//! 不正なフェーズでのコマンドはエラーにせず、無視して記録だけ残します。
//!
//! ## ティック内の処理順序
//!
//! 1. **深度更新**: 手法ごとの増分だけ深度を進める
//! 2. **角度ノイズ**: ドリリングモデルで角度を揺らす
//! 3. **完了判定**: 深度が目標に達していれば同じティック内で完了させる
//!
//! ## 使用例
//!
//! ```rust
//! use yomisim::simulation::SimulationEngine;
//! use yomisim::models::{Method, PointerSample};
//!
//! let mut engine = SimulationEngine::with_seed(42);
//! engine.start_simulation(Method::Freehand);
//! engine.submit_pointer_sample(PointerSample::new(0.1, -0.05));
//! engine.toggle_drill();
//! while engine.results().is_none() {
//!     engine.tick();
//! }
//! ```

use std::collections::VecDeque;

use serde::Serialize;
use tracing::{debug, info, trace};

use crate::models::*;

/// 1回分のシミュレーション状態
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationRun {
    pub method: Method,
    pub phase: Phase,
    pub current_angle: f64,
    pub current_depth: f64,
    /// 完了時に一度だけ設定される
    pub final_angle: Option<f64>,
    /// 完了時に一度だけ設定される
    pub final_depth: Option<f64>,
    pub results: Option<ResultsSnapshot>,
    /// ドリル中に進んだティック数
    pub drill_ticks: u64,
}

impl SimulationRun {
    fn new(method: Method) -> Self {
        Self {
            method,
            phase: Phase::Aiming,
            current_angle: 0.0,
            current_depth: 0.0,
            final_angle: None,
            final_depth: None,
            results: None,
            drill_ticks: 0,
        }
    }
}

/// エンジンが受け付ける離散コマンド（無視イベントの記録用）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DrillCommand {
    StartDrilling,
    CompleteDrilling,
}

/// 完了の契機
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionTrigger {
    /// ユーザーの明示的な完了操作
    Manual,
    /// 目標深度への到達
    DepthReached,
}

/// 表示層が購読するエンジンイベント
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SimulationEvent {
    SimulationStarted {
        method: Method,
    },
    DrillingStarted {
        method: Method,
        angle: f64,
    },
    DrillingCompleted {
        results: ResultsSnapshot,
        trigger: CompletionTrigger,
    },
    CommandIgnored {
        command: DrillCommand,
        phase: Phase,
    },
}

/// 取り出されていないイベントの保持上限（超えた分は古いものから捨てる）
pub const MAX_PENDING_EVENTS: usize = 256;

/// シミュレーションエンジン
///
/// アプリケーションのコントローラが1つだけ所有します。
/// 乱数源と時計は注入可能で、テストやリプレイでは決定的に動作させられます。
pub struct SimulationEngine {
    run: Option<SimulationRun>,
    rng: Box<dyn IRandomSource + Send>,
    clock: Box<dyn IClock + Send>,
    events: VecDeque<SimulationEvent>,
}

impl SimulationEngine {
    pub fn new(rng: Box<dyn IRandomSource + Send>, clock: Box<dyn IClock + Send>) -> Self {
        Self {
            run: None,
            rng,
            clock,
            events: VecDeque::new(),
        }
    }

    /// エントロピー乱数とシステム時計を使う本番用エンジン
    pub fn with_defaults() -> Self {
        Self::new(Box::new(RngSource::from_entropy()), Box::new(SystemClock))
    }

    /// 乱数のみ再現可能なエンジン（振動項はシステム時計）
    pub fn with_seed(seed: u64) -> Self {
        Self::new(Box::new(RngSource::seeded(seed)), Box::new(SystemClock))
    }

    /// 新しいランを開始（既存のランは破棄）
    pub fn start_simulation(&mut self, method: Method) {
        if let Some(previous) = &self.run {
            debug!(
                "既存のランを破棄: {} ({})",
                previous.method.id(),
                previous.phase.as_str()
            );
        }

        self.run = Some(SimulationRun::new(method));
        info!(method = method.id(), "シミュレーション開始: {}", method.display_name());
        self.record(SimulationEvent::SimulationStarted { method });
    }

    /// ドリル開始（照準フェーズ中のみ有効）
    ///
    /// 適用された場合はtrue、無視された場合はfalseを返します。
    pub fn start_drilling(&mut self) -> bool {
        let Some(run) = self.run.as_mut().filter(|r| r.phase == Phase::Aiming) else {
            self.ignore(DrillCommand::StartDrilling);
            return false;
        };

        let aimed = run.current_angle;
        run.current_angle = drilling::entry_angle(run.method, aimed, self.rng.as_mut());
        run.phase = Phase::Drilling;

        info!(
            method = run.method.id(),
            "ドリル開始: 照準角度 {:.2}° → 開始角度 {:.2}°",
            aimed,
            run.current_angle
        );
        let event = SimulationEvent::DrillingStarted {
            method: run.method,
            angle: run.current_angle,
        };
        self.record(event);
        true
    }

    /// ドリル完了（照準またはドリル中のみ有効）
    ///
    /// 手動で目標深度前に完了させることも正当な操作として扱います。
    pub fn complete_drilling(&mut self) -> bool {
        let completable = self
            .run
            .as_ref()
            .is_some_and(|r| matches!(r.phase, Phase::Aiming | Phase::Drilling));
        if !completable {
            self.ignore(DrillCommand::CompleteDrilling);
            return false;
        }

        self.finish(CompletionTrigger::Manual);
        true
    }

    /// ドリルボタン/スペースキーの動作: ドリル中でなければ開始、ドリル中なら完了
    pub fn toggle_drill(&mut self) -> bool {
        if self.phase() == Phase::Drilling {
            self.complete_drilling()
        } else {
            self.start_drilling()
        }
    }

    /// ポインタサンプルを入力（照準フェーズ以外では無視）
    pub fn submit_pointer_sample(&mut self, sample: PointerSample) -> LiveMetrics {
        if let Some(run) = self.run.as_mut().filter(|r| r.phase == Phase::Aiming) {
            let now_ms = self.clock.now_ms();
            run.current_angle = aiming::aim_angle(run.method, sample, self.rng.as_mut(), now_ms);
            trace!(
                "照準: ({:.3}, {:.3}) → {:.2}°",
                sample.x,
                sample.y,
                run.current_angle
            );
        }

        self.live_metrics()
    }

    /// 1フレーム分進める（ドリル中のみ状態が変化）
    pub fn tick(&mut self) -> LiveMetrics {
        let reached = match self.run.as_mut().filter(|r| r.phase == Phase::Drilling) {
            Some(run) => {
                run.current_depth += run.method.depth_increment();

                let now_ms = self.clock.now_ms();
                run.current_angle =
                    drilling::drilling_angle(run.method, run.current_angle, self.rng.as_mut(), now_ms);
                run.drill_ticks += 1;

                trace!(
                    "ティック {}: 角度 {:.2}°, 深度 {:.2}mm",
                    run.drill_ticks,
                    run.current_angle,
                    run.current_depth
                );

                run.current_depth >= TARGET_DEPTH_MM
            }
            None => false,
        };

        if reached {
            self.finish(CompletionTrigger::DepthReached);
        }

        self.live_metrics()
    }

    pub fn live_metrics(&self) -> LiveMetrics {
        match &self.run {
            Some(run) => LiveMetrics {
                phase: run.phase,
                method: Some(run.method),
                angle: run.current_angle,
                depth: run.current_depth,
            },
            None => LiveMetrics {
                phase: Phase::Idle,
                method: None,
                angle: 0.0,
                depth: 0.0,
            },
        }
    }

    /// 完了後のみ結果を返す
    pub fn results(&self) -> Option<ResultsSnapshot> {
        self.run.as_ref().and_then(|r| r.results)
    }

    pub fn phase(&self) -> Phase {
        self.run.as_ref().map_or(Phase::Idle, |r| r.phase)
    }

    /// 現在のランの読み取り専用ビュー
    pub fn run(&self) -> Option<&SimulationRun> {
        self.run.as_ref()
    }

    /// 蓄積されたイベントを取り出す
    ///
    /// 保持されるのは直近 [`MAX_PENDING_EVENTS`] 件までです。
    pub fn drain_events(&mut self) -> Vec<SimulationEvent> {
        self.events.drain(..).collect()
    }

    fn record(&mut self, event: SimulationEvent) {
        if self.events.len() >= MAX_PENDING_EVENTS {
            self.events.pop_front();
        }
        self.events.push_back(event);
    }

    fn finish(&mut self, trigger: CompletionTrigger) {
        let Some(run) = self.run.as_mut() else {
            return;
        };

        run.phase = Phase::Complete;
        run.final_angle = Some(run.current_angle);
        run.final_depth = Some(run.current_depth);

        let score = scoring::calculate_score(run.current_angle, run.current_depth);
        let results = ResultsSnapshot {
            method: run.method,
            angle: run.current_angle,
            depth: run.current_depth,
            score,
        };
        run.results = Some(results);

        info!(
            method = run.method.id(),
            ?trigger,
            "ドリル完了: 100 - ({:.2} × 10) - ({:.2} × 50) = {:.1}",
            results.angle,
            (results.depth - TARGET_DEPTH_MM).abs(),
            score
        );
        self.record(SimulationEvent::DrillingCompleted { results, trigger });
    }

    fn ignore(&mut self, command: DrillCommand) {
        let phase = self.phase();
        debug!(?command, phase = phase.as_str(), "コマンドを無視");
        self.record(SimulationEvent::CommandIgnored { command, phase });
    }
}
