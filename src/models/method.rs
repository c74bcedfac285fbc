use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// インプラント埋入手法
///
/// ラン開始時に一度だけ選択され、ラン中は変更されません。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Method {
    /// フリーハンド（手動）
    #[serde(rename = "freehand")]
    Freehand,
    /// 静的ガイド（サージカルテンプレート）
    #[serde(rename = "static", alias = "static_guided")]
    StaticGuided,
    /// Yomiロボット支援
    #[serde(rename = "yomi", alias = "yomi_robotic")]
    YomiRobotic,
}

impl Method {
    pub const ALL: [Method; 3] = [Method::Freehand, Method::StaticGuided, Method::YomiRobotic];

    /// 識別子（シナリオファイルやCLIで使用）
    pub fn id(&self) -> &'static str {
        match self {
            Method::Freehand => "freehand",
            Method::StaticGuided => "static",
            Method::YomiRobotic => "yomi",
        }
    }

    /// 表示名
    pub fn display_name(&self) -> &'static str {
        match self {
            Method::Freehand => "Freehand",
            Method::StaticGuided => "Static Guided",
            Method::YomiRobotic => "Yomi Robotic-Assisted",
        }
    }

    /// 手法ごとの定数プロファイル
    pub fn profile(&self) -> &'static MethodProfile {
        match self {
            Method::Freehand => &FREEHAND_PROFILE,
            Method::StaticGuided => &STATIC_GUIDED_PROFILE,
            Method::YomiRobotic => &YOMI_PROFILE,
        }
    }

    /// ドリル中の1ティックあたりの深度増分（mm）
    pub fn depth_increment(&self) -> f64 {
        match self {
            Method::Freehand | Method::StaticGuided => 0.02,
            Method::YomiRobotic => 0.03,
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for Method {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "freehand" => Ok(Method::Freehand),
            "static" | "static_guided" | "guided" => Ok(Method::StaticGuided),
            "yomi" | "yomi_robotic" | "robotic" => Ok(Method::YomiRobotic),
            _ => Err(format!("無効な手法: {}. 利用可能: freehand, static, yomi", s)),
        }
    }
}

/// 難易度ラベル
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Low,
    Medium,
    High,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Low => "low",
            Difficulty::Medium => "medium",
            Difficulty::High => "high",
        }
    }
}

/// 手法ごとの定数パラメータ
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MethodProfile {
    /// 手ぶれ（ノイズ振幅、無次元）
    pub tremor: f64,
    /// 臨床報告に基づく角度偏差の参照値（度）
    pub angle_deviation_reference: f64,
    /// 臨床報告に基づく深度偏差の参照値（mm）
    pub depth_deviation_reference: f64,
    pub difficulty: Difficulty,
}

pub const FREEHAND_PROFILE: MethodProfile = MethodProfile {
    tremor: 0.3,
    angle_deviation_reference: 7.03,
    depth_deviation_reference: 1.1,
    difficulty: Difficulty::High,
};

pub const STATIC_GUIDED_PROFILE: MethodProfile = MethodProfile {
    tremor: 0.1,
    angle_deviation_reference: 3.9,
    depth_deviation_reference: 1.1,
    difficulty: Difficulty::Medium,
};

pub const YOMI_PROFILE: MethodProfile = MethodProfile {
    tremor: 0.01,
    angle_deviation_reference: 1.42,
    depth_deviation_reference: 0.14,
    difficulty: Difficulty::Low,
};
