// 基本的なデータ型と数学ユーティリティ
pub mod common;

// 乱数源・時計のインターフェース（trait）定義
pub mod traits;

// 手法と手法ごとの定数
pub mod method;

// 各モデルの実装
pub mod aiming;
pub mod drilling;
pub mod scoring;

// 便利な re-export
pub use common::*;
pub use traits::*;
pub use method::{Difficulty, Method, MethodProfile};
pub use scoring::{CrosshairState, Feedback, MeterReadings, ScoreGrade};
