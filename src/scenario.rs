use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::models::{Method, PointerSample};

/// シナリオメタデータ
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScenarioMeta {
    pub version: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
}

/// シミュレーション設定
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SimulationConfig {
    /// 乱数シード（省略時はエントロピーから初期化）
    #[serde(default)]
    pub seed: Option<u64>,
    /// フレームレート（Hz）
    #[serde(default = "default_tick_hz")]
    pub tick_hz: f64,
    /// 1ランあたりの最大フレーム数
    #[serde(default = "default_max_ticks")]
    pub max_ticks: u64,
    /// trueの場合、実時間でフレームを刻む
    #[serde(default)]
    pub realtime: bool,
    /// 振動項に使う固定時刻（ミリ秒）。省略時はシステム時計
    #[serde(default)]
    pub fixed_clock_ms: Option<u64>,
}

fn default_tick_hz() -> f64 {
    60.0
}

fn default_max_ticks() -> u64 {
    10_000
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            seed: None,
            tick_hz: default_tick_hz(),
            max_ticks: default_max_ticks(),
            realtime: false,
            fixed_clock_ms: None,
        }
    }
}

/// スクリプト化されたセッション設定
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SessionConfig {
    pub method: Method,
    /// 照準フェーズで1フレームに1つずつ入力するポインタ位置
    pub aim_path: Vec<PointerSample>,
    /// この深度に達したら手動で完了させる（省略時は自動完了まで掘る）
    #[serde(default)]
    pub complete_at_depth: Option<f64>,
}

/// 完全なシナリオ設定
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScenarioConfig {
    pub meta: ScenarioMeta,
    #[serde(default)]
    pub sim: SimulationConfig,
    pub session: SessionConfig,
}

impl ScenarioConfig {
    /// YAMLファイルからシナリオ設定を読み込み
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ScenarioError> {
        let path = path.as_ref();

        // ファイル存在チェック
        if !path.exists() {
            return Err(ScenarioError::FileNotFound(path.to_path_buf()));
        }

        let contents =
            fs::read_to_string(path).map_err(|e| ScenarioError::Io(path.to_path_buf(), e))?;

        let config: ScenarioConfig = serde_yaml::from_str(&contents)
            .map_err(|e| ScenarioError::Parse(path.to_path_buf(), e))?;

        config.validate()?;

        Ok(config)
    }

    /// シナリオファイルを指定しない場合の既定シナリオ
    ///
    /// 中心付近からわずかにずれた位置を狙い、自動完了まで掘り進めます。
    pub fn builtin(method: Method) -> Self {
        let aim_path = (0..30)
            .map(|i| {
                let t = i as f64 / 30.0;
                PointerSample::new(0.15 * (1.0 - t) + 0.02, -0.1 * (1.0 - t))
            })
            .collect();

        Self {
            meta: ScenarioMeta {
                version: "1.0".to_string(),
                name: "builtin".to_string(),
                description: "既定の照準パスで目標深度まで掘るシナリオ".to_string(),
            },
            sim: SimulationConfig::default(),
            session: SessionConfig {
                method,
                aim_path,
                complete_at_depth: None,
            },
        }
    }

    /// 設定の基本的な検証
    pub fn validate(&self) -> Result<(), ScenarioError> {
        if !(self.sim.tick_hz > 0.0 && self.sim.tick_hz.is_finite()) {
            return Err(ScenarioError::Validation("tick_hz must be a positive finite number".to_string()));
        }
        // 実時間モードのフレーム間隔が Duration に収まること
        if !Duration::try_from_secs_f64(1.0 / self.sim.tick_hz).is_ok_and(|period| !period.is_zero()) {
            return Err(ScenarioError::Validation(format!(
                "tick_hz {} cannot be expressed as a frame interval",
                self.sim.tick_hz
            )));
        }
        if self.sim.max_ticks == 0 {
            return Err(ScenarioError::Validation("max_ticks must be positive".to_string()));
        }

        if self.session.aim_path.is_empty() {
            return Err(ScenarioError::Validation("aim_path must not be empty".to_string()));
        }
        // デシリアライズ時はクランプを経由しないため、ここで範囲を確認する
        for (i, sample) in self.session.aim_path.iter().enumerate() {
            if !sample.is_normalized() {
                return Err(ScenarioError::Validation(format!(
                    "aim_path[{}] = ({}, {}) is outside [-1, 1]",
                    i, sample.x, sample.y
                )));
            }
        }

        if let Some(depth) = self.session.complete_at_depth {
            if !(depth > 0.0 && depth <= 1.0) {
                return Err(ScenarioError::Validation(format!(
                    "complete_at_depth {} must be in (0, 1]",
                    depth
                )));
            }
        }

        Ok(())
    }

    /// シナリオの概要を表示
    pub fn print_summary(&self) {
        println!("=== シナリオ情報 ===");
        println!("名前: {}", self.meta.name);
        println!("説明: {}", self.meta.description);
        println!("バージョン: {}", self.meta.version);
        println!();

        println!("=== シミュレーション設定 ===");
        println!("フレームレート: {:.1}Hz", self.sim.tick_hz);
        println!("最大フレーム数: {}", self.sim.max_ticks);
        match self.sim.seed {
            Some(seed) => println!("シード値: {}", seed),
            None => println!("シード値: (エントロピー)"),
        }
        println!("実時間実行: {}", if self.sim.realtime { "有効" } else { "無効" });
        println!();

        let profile = self.session.method.profile();
        println!("=== セッション ===");
        println!("手法: {}", self.session.method.display_name());
        println!(
            "  手ぶれ: {}  参照偏差: {:.2}° / {:.2}mm  難易度: {}",
            profile.tremor,
            profile.angle_deviation_reference,
            profile.depth_deviation_reference,
            profile.difficulty.as_str()
        );
        println!("照準サンプル数: {}", self.session.aim_path.len());
        match self.session.complete_at_depth {
            Some(depth) => println!("手動完了深度: {:.2}mm", depth),
            None => println!("手動完了深度: (自動完了)"),
        }
    }
}

/// シナリオ読み込みエラー
#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error("シナリオファイルが見つかりません: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("ファイル読み込みエラー {}: {}", .0.display(), .1)]
    Io(PathBuf, #[source] std::io::Error),

    #[error("YAML解析エラー {}: {}", .0.display(), .1)]
    Parse(PathBuf, #[source] serde_yaml::Error),

    #[error("設定検証エラー: {0}")]
    Validation(String),
}
