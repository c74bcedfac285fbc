//! # スコアリングモジュール
//!
//! 最終角度・深度の偏差から0〜100のスコアを算出し、結果画面向けの
//! フィードバック（メッセージ、バッジ、メーター比率）を決定します。
//! ここにある関数はすべて純粋関数で、乱数や時刻には依存しません。

use serde::Serialize;

use crate::models::common::{MAX_ANGLE_DEG, ResultsSnapshot, TARGET_DEPTH_MM, math_utils};
use crate::models::method::{FREEHAND_PROFILE, Method, YOMI_PROFILE};

/// 角度偏差1度あたりの減点
const ANGLE_PENALTY_PER_DEG: f64 = 10.0;
/// 深度偏差1mmあたりの減点
const DEPTH_PENALTY_PER_MM: f64 = 50.0;

/// スコアを計算
///
/// `max(0, 100 - angle*10 - |depth - 1.0|*50)`
pub fn calculate_score(final_angle: f64, final_depth: f64) -> f64 {
    let angle_penalty = final_angle * ANGLE_PENALTY_PER_DEG;
    let depth_penalty = (final_depth - TARGET_DEPTH_MM).abs() * DEPTH_PENALTY_PER_MM;
    (100.0 - angle_penalty - depth_penalty).max(0.0)
}

/// スコアの評価段階（表示色に対応）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoreGrade {
    Good,
    Medium,
    Poor,
}

impl ScoreGrade {
    pub fn from_score(score: f64) -> Self {
        if score >= 80.0 {
            ScoreGrade::Good
        } else if score >= 50.0 {
            ScoreGrade::Medium
        } else {
            ScoreGrade::Poor
        }
    }
}

/// 照準クロスヘアの状態
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CrosshairState {
    Good,
    Medium,
    Poor,
}

impl CrosshairState {
    pub fn from_angle(angle: f64) -> Self {
        if angle > 4.0 {
            CrosshairState::Poor
        } else if angle > 1.5 {
            CrosshairState::Medium
        } else {
            CrosshairState::Good
        }
    }
}

/// ライブメーターの表示比率
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MeterReadings {
    pub angle_fraction: f64,
    pub depth_fraction: f64,
    pub crosshair: CrosshairState,
}

impl MeterReadings {
    pub fn from_live(angle: f64, depth: f64) -> Self {
        Self {
            angle_fraction: math_utils::fraction(angle, MAX_ANGLE_DEG),
            depth_fraction: math_utils::fraction(depth, TARGET_DEPTH_MM),
            crosshair: CrosshairState::from_angle(angle),
        }
    }
}

const YOMI_MESSAGE: &str = "That's Yomi's magic. Told ya.";
const YOMI_STUDY_REFERENCE: &str =
    "Neugarten's study: Yomi slashes freehand error by 80%. Facts don't lie.";
const STATIC_LOW_MESSAGE: &str = "Guides can only help so much. See if Yomi saves you.";
const STATIC_HIGH_MESSAGE: &str = "Not bad with the guide, but Yomi could take you further.";
const FREEHAND_LOW_MESSAGE: &str = "Rough day? See if Yomi saves you.";
const FREEHAND_MID_MESSAGE: &str = "Decent hand skills, but precision matters. Try Yomi.";
const FREEHAND_HIGH_MESSAGE: &str =
    "Impressive hand skills! Still, compare with Yomi's consistency.";
const YOMI_SLAYER_MESSAGE: &str =
    "INCREDIBLE! Somehow you beat the robot. Dr. Neugarten would like a word.";

/// 結果画面のフィードバック
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Feedback {
    /// 次の行動を促すメッセージ
    pub message: &'static str,
    /// 臨床研究への言及（Yomiのみ）
    pub study_reference: Option<&'static str>,
    /// Yomi Slayerバッジ獲得
    pub yomi_slayer: bool,
    pub grade: ScoreGrade,
    /// 角度バーの比率（フリーハンド参照値 7.03度 基準）
    pub angle_bar: f64,
    /// 深度バーの比率（1.1mm 基準）
    pub depth_bar: f64,
}

/// フリーハンドでYomiの参照偏差以内に収めたかどうか
pub fn is_yomi_slayer(results: &ResultsSnapshot) -> bool {
    results.method == Method::Freehand
        && results.angle <= YOMI_PROFILE.angle_deviation_reference
        && results.depth <= YOMI_PROFILE.depth_deviation_reference
}

/// 結果からフィードバックを選択
pub fn select_feedback(results: &ResultsSnapshot) -> Feedback {
    let yomi_slayer = is_yomi_slayer(results);

    let message = if yomi_slayer {
        YOMI_SLAYER_MESSAGE
    } else {
        match results.method {
            Method::YomiRobotic => YOMI_MESSAGE,
            Method::StaticGuided => {
                if results.score < 50.0 {
                    STATIC_LOW_MESSAGE
                } else {
                    STATIC_HIGH_MESSAGE
                }
            }
            Method::Freehand => {
                if results.score < 30.0 {
                    FREEHAND_LOW_MESSAGE
                } else if results.score < 70.0 {
                    FREEHAND_MID_MESSAGE
                } else {
                    FREEHAND_HIGH_MESSAGE
                }
            }
        }
    };

    let study_reference = match results.method {
        Method::YomiRobotic => Some(YOMI_STUDY_REFERENCE),
        _ => None,
    };

    Feedback {
        message,
        study_reference,
        yomi_slayer,
        grade: ScoreGrade::from_score(results.score),
        angle_bar: math_utils::fraction(results.angle, FREEHAND_PROFILE.angle_deviation_reference),
        depth_bar: math_utils::fraction(results.depth, FREEHAND_PROFILE.depth_deviation_reference),
    }
}

/// 結果行 `"<手法>: 1.23° | 0.98mm"`
pub fn format_results_line(results: &ResultsSnapshot) -> String {
    format!(
        "{}: {:.2}° | {:.2}mm",
        results.method.display_name(),
        results.angle,
        results.depth
    )
}

/// スコア行 `"Your Score: 87.5/100"`
pub fn format_score_line(score: f64) -> String {
    format!("Your Score: {:.1}/100", score)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(method: Method, angle: f64, depth: f64) -> ResultsSnapshot {
        ResultsSnapshot {
            method,
            angle,
            depth,
            score: calculate_score(angle, depth),
        }
    }

    #[test]
    fn test_score_formula() {
        assert_eq!(calculate_score(0.0, 1.0), 100.0);
        assert_eq!(calculate_score(5.0, 1.0), 50.0);
        assert_eq!(calculate_score(0.0, 0.0), 50.0);
        assert_eq!(calculate_score(11.0, 1.0), 0.0);
        assert!((calculate_score(3.0, 1.2) - 60.0).abs() < 1e-9);
    }

    #[test]
    fn test_score_never_negative() {
        for angle in [0.0, 2.5, 7.0, 10.0, 25.0] {
            for depth in [0.0, 0.5, 1.0, 1.5, 4.0] {
                let score = calculate_score(angle, depth);
                assert!((0.0..=100.0).contains(&score));
            }
        }
    }

    #[test]
    fn test_overshoot_depth_penalised_symmetrically() {
        let under = calculate_score(1.0, 0.9);
        let over = calculate_score(1.0, 1.1);
        assert!((under - over).abs() < 1e-9);
    }

    #[test]
    fn test_yomi_feedback_is_fixed() {
        for (angle, depth) in [(0.1, 1.02), (1.5, 0.3)] {
            let feedback = select_feedback(&snapshot(Method::YomiRobotic, angle, depth));
            assert_eq!(feedback.message, YOMI_MESSAGE);
            assert_eq!(feedback.study_reference, Some(YOMI_STUDY_REFERENCE));
            assert!(!feedback.yomi_slayer);
        }
    }

    #[test]
    fn test_static_feedback_tiers() {
        let low = select_feedback(&snapshot(Method::StaticGuided, 5.0, 0.5));
        assert_eq!(low.message, STATIC_LOW_MESSAGE);
        let high = select_feedback(&snapshot(Method::StaticGuided, 2.0, 1.0));
        assert_eq!(high.message, STATIC_HIGH_MESSAGE);
        // 境界: スコア50ちょうどは高評価側
        let boundary = select_feedback(&snapshot(Method::StaticGuided, 5.0, 1.0));
        assert_eq!(boundary.message, STATIC_HIGH_MESSAGE);
    }

    #[test]
    fn test_freehand_feedback_tiers() {
        let low = select_feedback(&snapshot(Method::Freehand, 8.0, 1.0));
        assert_eq!(low.message, FREEHAND_LOW_MESSAGE);
        let boundary_low = select_feedback(&snapshot(Method::Freehand, 7.0, 1.0));
        assert_eq!(boundary_low.message, FREEHAND_MID_MESSAGE);
        let boundary_high = select_feedback(&snapshot(Method::Freehand, 3.0, 1.0));
        assert_eq!(boundary_high.message, FREEHAND_HIGH_MESSAGE);
        let mid = select_feedback(&snapshot(Method::Freehand, 5.0, 1.0));
        assert_eq!(mid.message, FREEHAND_MID_MESSAGE);
        assert!(mid.study_reference.is_none());
    }

    #[test]
    fn test_yomi_slayer_badge() {
        let slayer = snapshot(Method::Freehand, 1.0, 0.1);
        assert!(is_yomi_slayer(&slayer));
        let feedback = select_feedback(&slayer);
        assert!(feedback.yomi_slayer);
        assert_eq!(feedback.message, YOMI_SLAYER_MESSAGE);

        assert!(!is_yomi_slayer(&snapshot(Method::Freehand, 1.0, 0.2)));
        assert!(is_yomi_slayer(&snapshot(Method::Freehand, 1.42, 0.14)));
        // 他の手法では発動しない
        assert!(!is_yomi_slayer(&snapshot(Method::StaticGuided, 1.0, 0.1)));
        assert!(!is_yomi_slayer(&snapshot(Method::YomiRobotic, 0.1, 0.1)));
    }

    #[test]
    fn test_grades_and_bars() {
        assert_eq!(ScoreGrade::from_score(80.0), ScoreGrade::Good);
        assert_eq!(ScoreGrade::from_score(79.9), ScoreGrade::Medium);
        assert_eq!(ScoreGrade::from_score(50.0), ScoreGrade::Medium);
        assert_eq!(ScoreGrade::from_score(49.9), ScoreGrade::Poor);

        let feedback = select_feedback(&snapshot(Method::Freehand, 9.0, 2.2));
        assert_eq!(feedback.angle_bar, 1.0);
        assert_eq!(feedback.depth_bar, 1.0);
        let feedback = select_feedback(&snapshot(Method::Freehand, 0.0, 0.55));
        assert_eq!(feedback.angle_bar, 0.0);
        assert!((feedback.depth_bar - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_meter_readings() {
        let readings = MeterReadings::from_live(5.0, 0.25);
        assert_eq!(readings.angle_fraction, 0.5);
        assert_eq!(readings.depth_fraction, 0.25);
        assert_eq!(readings.crosshair, CrosshairState::Poor);
        assert_eq!(CrosshairState::from_angle(4.0), CrosshairState::Medium);
        assert_eq!(CrosshairState::from_angle(1.5), CrosshairState::Good);
    }

    #[test]
    fn test_format_lines() {
        let results = ResultsSnapshot {
            method: Method::StaticGuided,
            angle: 2.346,
            depth: 1.0,
            score: 76.55,
        };
        assert_eq!(format_results_line(&results), "Static Guided: 2.35° | 1.00mm");
        assert_eq!(format_score_line(87.46), "Your Score: 87.5/100");
    }
}
