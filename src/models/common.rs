use serde::{Deserialize, Serialize};

use crate::models::method::Method;

/// 角度の絶対上限（度）
pub const MAX_ANGLE_DEG: f64 = 10.0;

/// 理想の埋入深度（mm）。深度偏差の基準値であり、自動完了の閾値でもある
pub const TARGET_DEPTH_MM: f64 = 1.0;

/// シミュレーションの進行フェーズ
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    /// 初期状態（手法未選択）
    Idle,
    /// ポインタで角度を狙っている段階
    Aiming,
    /// ドリル進行中
    Drilling,
    /// 完了（結果確定済み）
    Complete,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Idle => "idle",
            Phase::Aiming => "aiming",
            Phase::Drilling => "drilling",
            Phase::Complete => "complete",
        }
    }
}

/// 正規化済みポインタ位置
///
/// 各成分は必ず [-1, 1] に収まります。範囲外の値は生成時にクランプされます。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointerSample {
    pub x: f64,
    pub y: f64,
}

impl PointerSample {
    pub fn new(x: f64, y: f64) -> Self {
        Self {
            x: math_utils::clamp_unit(x),
            y: math_utils::clamp_unit(y),
        }
    }

    /// キャンバス上のピクセル座標から正規化座標を作成
    ///
    /// 画面座標系はY軸が下向きなので、Yは反転させます。
    /// 幅または高さが0以下の場合は中心（0, 0）を返します。
    pub fn from_canvas(x: f64, y: f64, width: f64, height: f64) -> Self {
        if width <= 0.0 || height <= 0.0 {
            return Self::new(0.0, 0.0);
        }
        let nx = (x / width) * 2.0 - 1.0;
        let ny = -((y / height) * 2.0 - 1.0);
        Self::new(nx, ny)
    }

    /// 中心からの距離（0〜√2）
    pub fn magnitude(&self) -> f64 {
        (self.x.powi(2) + self.y.powi(2)).sqrt()
    }

    pub fn is_normalized(&self) -> bool {
        (-1.0..=1.0).contains(&self.x) && (-1.0..=1.0).contains(&self.y)
    }
}

/// 毎フレーム表示用のライブ指標
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LiveMetrics {
    pub phase: Phase,
    pub method: Option<Method>,
    /// 現在の角度偏差（度）
    pub angle: f64,
    /// 現在の深度（mm）
    pub depth: f64,
}

/// 完了したランの結果
///
/// 完了時に一度だけ生成され、以後変更されません。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResultsSnapshot {
    pub method: Method,
    /// 最終角度偏差（度）
    pub angle: f64,
    /// 最終深度（mm）
    pub depth: f64,
    /// スコア（0〜100）
    pub score: f64,
}

/// 数学ユーティリティ関数
pub mod math_utils {
    /// [-1, 1] にクランプ。NaNは0として扱う
    pub fn clamp_unit(value: f64) -> f64 {
        if value.is_nan() {
            0.0
        } else {
            value.clamp(-1.0, 1.0)
        }
    }

    /// 壁時計ミリ秒に基づく振動項 sin(t / period)
    pub fn oscillation(now_ms: f64, period_ms: f64) -> f64 {
        (now_ms / period_ms).sin()
    }

    /// 比率を [0, 1] に収める（メーター表示用）
    pub fn fraction(value: f64, reference: f64) -> f64 {
        if reference <= 0.0 {
            return 0.0;
        }
        (value / reference).clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pointer_sample_clamps_out_of_range() {
        let sample = PointerSample::new(1.7, -3.0);
        assert_eq!(sample.x, 1.0);
        assert_eq!(sample.y, -1.0);
        assert!(sample.is_normalized());
    }

    #[test]
    fn test_pointer_from_canvas() {
        let center = PointerSample::from_canvas(400.0, 300.0, 800.0, 600.0);
        assert!(center.x.abs() < 1e-12);
        assert!(center.y.abs() < 1e-12);

        // 左上はX=-1, Y=+1
        let top_left = PointerSample::from_canvas(0.0, 0.0, 800.0, 600.0);
        assert_eq!(top_left, PointerSample::new(-1.0, 1.0));

        // キャンバス外はクランプ
        let outside = PointerSample::from_canvas(1600.0, 900.0, 800.0, 600.0);
        assert_eq!(outside, PointerSample::new(1.0, -1.0));

        let degenerate = PointerSample::from_canvas(10.0, 10.0, 0.0, 600.0);
        assert_eq!(degenerate, PointerSample::new(0.0, 0.0));
    }

    #[test]
    fn test_fraction() {
        assert_eq!(math_utils::fraction(5.0, 10.0), 0.5);
        assert_eq!(math_utils::fraction(20.0, 10.0), 1.0);
        assert_eq!(math_utils::fraction(1.0, 0.0), 0.0);
    }
}
