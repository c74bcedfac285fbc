//! # yomisim
//!
//! インプラント埋入手法（フリーハンド・静的ガイド・Yomiロボット支援）の
//! 精度を比較する教育用シミュレータのコアです。
//!
//! - [`simulation`]: 状態遷移とスコアリングを担うエンジン
//! - [`models`]: 手法プロファイル、照準・ドリリングのノイズモデル、スコア計算
//! - [`controller`]: エンジンを単一タスクに閉じ込めるハンドルとキー操作
//! - [`runner`]: シナリオの再生と結果表示
//! - [`scenario`]: YAMLシナリオ設定
//! - [`logging`]: ログ出力の初期化

pub mod controller;
pub mod logging;
pub mod models;
pub mod runner;
pub mod scenario;
pub mod simulation;
