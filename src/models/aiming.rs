//! # 照準モデル
//!
//! 照準フェーズ中、ポインタ位置から現在角度を求めます。
//! 中心からの距離を基本角度とし、手法ごとの手ぶれ・ガイド抵抗・ロボット誘導を加えます。

use crate::models::common::{MAX_ANGLE_DEG, PointerSample, math_utils};
use crate::models::method::Method;
use crate::models::traits::IRandomSource;

/// フリーハンドで大きな跳ねが起きる確率
const FREEHAND_JUMP_PROBABILITY: f64 = 0.05;
/// フリーハンドの跳ねの振幅（度）
const FREEHAND_JUMP_AMPLITUDE: f64 = 3.0;

/// 静的ガイドの抵抗が働き始める角度（度）
const GUIDE_RESISTANCE_THRESHOLD: f64 = 2.0;
const GUIDE_RESISTANCE_FACTOR: f64 = 0.7;

/// ポインタ中心からの距離を角度に変換する係数
const POINTER_TO_ANGLE: f64 = 10.0;

/// ポインタサンプルから照準角度を計算
///
/// 戻り値は常に [0, 10] に収まります。
///
/// # 引数
///
/// * `method` - 埋入手法
/// * `sample` - 正規化済みポインタ位置
/// * `rng` - 乱数源
/// * `now_ms` - 壁時計（ミリ秒）
pub fn aim_angle(
    method: Method,
    sample: PointerSample,
    rng: &mut dyn IRandomSource,
    now_ms: f64,
) -> f64 {
    let tremor = method.profile().tremor;
    let mut angle = sample.magnitude() * POINTER_TO_ANGLE;

    match method {
        Method::Freehand => {
            angle += rng.next_signed() * tremor * 8.0;
            angle += math_utils::oscillation(now_ms, 100.0) * tremor * 3.0;

            if rng.next_unit() < FREEHAND_JUMP_PROBABILITY {
                angle += rng.next_signed() * FREEHAND_JUMP_AMPLITUDE;
            }
        }
        Method::StaticGuided => {
            angle = angle.min(5.0);
            angle += rng.next_signed() * tremor * 3.0;
            angle += math_utils::oscillation(now_ms, 200.0) * tremor;

            // ガイドによる中心方向への抵抗
            if angle > GUIDE_RESISTANCE_THRESHOLD {
                angle = GUIDE_RESISTANCE_THRESHOLD
                    + (angle - GUIDE_RESISTANCE_THRESHOLD) * GUIDE_RESISTANCE_FACTOR;
            }
        }
        Method::YomiRobotic => {
            angle = angle.min(2.0);
            angle += rng.next_signed() * tremor;
            // ロボットの強いセンタリング
            angle *= 0.3;
            angle = angle.clamp(0.1, 1.5);
        }
    }

    angle.clamp(0.0, MAX_ANGLE_DEG)
}
