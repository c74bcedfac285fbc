//! # ドリリングモデル
//!
//! ドリル開始時の手法固有の補正と、ドリル中に毎ティック加わる角度ノイズを扱います。

use crate::models::common::{MAX_ANGLE_DEG, math_utils};
use crate::models::method::Method;
use crate::models::traits::IRandomSource;

/// 静的ガイドがドリル開始時に許容する最大角度（度）
const GUIDE_ENTRY_LIMIT: f64 = 4.5;

/// 静的ガイドがドリル中に手ぶれを抑える上限（度）
const GUIDE_DRILL_LIMIT: f64 = 5.0;

/// Yomiがドリル開始時に再設定する角度の下限と幅（度）
const YOMI_ENTRY_BASE: f64 = 0.2;
const YOMI_ENTRY_SPREAD: f64 = 1.0;

/// Yomiのドリル中の減衰率と下限
const YOMI_DECAY: f64 = 0.95;
const YOMI_FLOOR: f64 = 0.1;

/// ドリル開始時の角度補正
///
/// フリーハンドは照準角度をそのまま引き継ぎ、静的ガイドは4.5度で頭打ち、
/// Yomiは手動照準を無視してロボットが角度を設定し直します。
pub fn entry_angle(method: Method, current_angle: f64, rng: &mut dyn IRandomSource) -> f64 {
    match method {
        Method::Freehand => current_angle,
        Method::StaticGuided => current_angle.min(GUIDE_ENTRY_LIMIT),
        Method::YomiRobotic => YOMI_ENTRY_BASE + rng.next_unit() * YOMI_ENTRY_SPREAD,
    }
}

/// ドリル中の1ティック分の角度更新
///
/// 手ぶれ項は手法ごとの上限でクランプし、その後に振動項を加えます。
/// 振動項の後は [0, 10] で再度クランプするため、静的ガイドはガイド上限を
/// 振動分（最大0.1度）だけ超えることがあります。
pub fn drilling_angle(
    method: Method,
    current_angle: f64,
    rng: &mut dyn IRandomSource,
    now_ms: f64,
) -> f64 {
    let tremor = method.profile().tremor;

    match method {
        Method::Freehand => {
            let angle = (current_angle + rng.next_signed() * tremor * 5.0).clamp(0.0, MAX_ANGLE_DEG);
            let angle = angle + math_utils::oscillation(now_ms, 100.0) * tremor * 2.0;
            angle.clamp(0.0, MAX_ANGLE_DEG)
        }
        Method::StaticGuided => {
            let angle = (current_angle + rng.next_signed() * tremor * 2.0).clamp(0.0, GUIDE_DRILL_LIMIT);
            let angle = angle + math_utils::oscillation(now_ms, 200.0) * tremor;
            angle.clamp(0.0, MAX_ANGLE_DEG)
        }
        Method::YomiRobotic => (current_angle * YOMI_DECAY).max(YOMI_FLOOR),
    }
}
