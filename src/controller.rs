//! # Controller モジュール
//!
//! シミュレーションエンジンを単一のtokioタスクに閉じ込め、すべての操作を
//! チャネル経由で直列化します。表示層・入力層は [`EngineHandle`] を通じて
//! コマンドを送り、ライブ指標や結果のコピーを受け取ります。
//!
//! キーボードショートカット（視点切り替えとドリルトグル）の対応表もここで扱います。

use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::debug;

use crate::models::{LiveMetrics, Method, PointerSample, ResultsSnapshot};
use crate::simulation::{SimulationEngine, SimulationEvent};

/// コマンドチャネルの容量
const COMMAND_CHANNEL_CAPACITY: usize = 64;

/// エンジンタスクが停止している
#[derive(Debug, Error)]
#[error("シミュレーションエンジンのタスクが停止しています")]
pub struct EngineGone;

/// エンジンへの離散コマンド
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EngineCommand {
    StartSimulation(Method),
    StartDrilling,
    CompleteDrilling,
    ToggleDrill,
}

enum Request {
    Command(EngineCommand, oneshot::Sender<bool>),
    Pointer(PointerSample, oneshot::Sender<LiveMetrics>),
    Tick(oneshot::Sender<LiveMetrics>),
    LiveMetrics(oneshot::Sender<LiveMetrics>),
    Results(oneshot::Sender<Option<ResultsSnapshot>>),
    DrainEvents(oneshot::Sender<Vec<SimulationEvent>>),
}

/// エンジンタスクへのハンドル
///
/// クローンして複数の入力源から共有できます。全ハンドルが破棄されると
/// タスクは終了し、エンジンを返します。
#[derive(Clone)]
pub struct EngineHandle {
    tx: mpsc::Sender<Request>,
}

/// エンジンを所有するタスクを起動
pub fn spawn_engine(engine: SimulationEngine) -> (EngineHandle, JoinHandle<SimulationEngine>) {
    let (tx, rx) = mpsc::channel(COMMAND_CHANNEL_CAPACITY);
    let task = tokio::spawn(run_engine(engine, rx));
    (EngineHandle { tx }, task)
}

async fn run_engine(
    mut engine: SimulationEngine,
    mut rx: mpsc::Receiver<Request>,
) -> SimulationEngine {
    while let Some(request) = rx.recv().await {
        // 応答先が既に破棄されていても処理自体は行う
        match request {
            Request::Command(command, reply) => {
                let applied = match command {
                    EngineCommand::StartSimulation(method) => {
                        engine.start_simulation(method);
                        true
                    }
                    EngineCommand::StartDrilling => engine.start_drilling(),
                    EngineCommand::CompleteDrilling => engine.complete_drilling(),
                    EngineCommand::ToggleDrill => engine.toggle_drill(),
                };
                let _ = reply.send(applied);
            }
            Request::Pointer(sample, reply) => {
                let _ = reply.send(engine.submit_pointer_sample(sample));
            }
            Request::Tick(reply) => {
                let _ = reply.send(engine.tick());
            }
            Request::LiveMetrics(reply) => {
                let _ = reply.send(engine.live_metrics());
            }
            Request::Results(reply) => {
                let _ = reply.send(engine.results());
            }
            Request::DrainEvents(reply) => {
                let _ = reply.send(engine.drain_events());
            }
        }
    }

    debug!("エンジンタスク終了");
    engine
}

impl EngineHandle {
    async fn request<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<T>) -> Request,
    ) -> Result<T, EngineGone> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx.send(make(reply_tx)).await.map_err(|_| EngineGone)?;
        reply_rx.await.map_err(|_| EngineGone)
    }

    /// コマンドを送信。適用されたかどうかを返す
    pub async fn send(&self, command: EngineCommand) -> Result<bool, EngineGone> {
        self.request(|reply| Request::Command(command, reply)).await
    }

    pub async fn start_simulation(&self, method: Method) -> Result<bool, EngineGone> {
        self.send(EngineCommand::StartSimulation(method)).await
    }

    pub async fn toggle_drill(&self) -> Result<bool, EngineGone> {
        self.send(EngineCommand::ToggleDrill).await
    }

    pub async fn pointer(&self, sample: PointerSample) -> Result<LiveMetrics, EngineGone> {
        self.request(|reply| Request::Pointer(sample, reply)).await
    }

    pub async fn tick(&self) -> Result<LiveMetrics, EngineGone> {
        self.request(Request::Tick).await
    }

    pub async fn live_metrics(&self) -> Result<LiveMetrics, EngineGone> {
        self.request(Request::LiveMetrics).await
    }

    pub async fn results(&self) -> Result<Option<ResultsSnapshot>, EngineGone> {
        self.request(Request::Results).await
    }

    pub async fn drain_events(&self) -> Result<Vec<SimulationEvent>, EngineGone> {
        self.request(Request::DrainEvents).await
    }

    /// キー入力を処理
    ///
    /// ドリルトグルはエンジンへ転送し、視点切り替えは表示層向けに返します。
    pub async fn handle_key(&self, key: &str) -> Result<Option<View>, EngineGone> {
        match key_action(key) {
            Some(KeyAction::ToggleDrill) => {
                self.toggle_drill().await?;
                Ok(None)
            }
            Some(KeyAction::SetView(view)) => Ok(Some(view)),
            None => Ok(None),
        }
    }
}

/// カメラ視点
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    /// 頬側
    Buccal,
    /// 舌側
    Lingual,
    /// 咬合面
    Occlusal,
    /// 自由視点
    Free,
}

/// キー入力に対応する操作
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    SetView(View),
    ToggleDrill,
}

/// キー名から操作を決定（大文字小文字は区別しない）
pub fn key_action(key: &str) -> Option<KeyAction> {
    match key.to_lowercase().as_str() {
        "w" => Some(KeyAction::SetView(View::Occlusal)),
        "a" => Some(KeyAction::SetView(View::Lingual)),
        "s" => Some(KeyAction::SetView(View::Free)),
        "d" => Some(KeyAction::SetView(View::Buccal)),
        " " | "space" => Some(KeyAction::ToggleDrill),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FixedClock, Phase, RngSource};

    fn engine() -> SimulationEngine {
        SimulationEngine::new(Box::new(RngSource::seeded(9)), Box::new(FixedClock::new(0.0)))
    }

    #[test]
    fn test_key_bindings() {
        assert_eq!(key_action("w"), Some(KeyAction::SetView(View::Occlusal)));
        assert_eq!(key_action("A"), Some(KeyAction::SetView(View::Lingual)));
        assert_eq!(key_action("s"), Some(KeyAction::SetView(View::Free)));
        assert_eq!(key_action("d"), Some(KeyAction::SetView(View::Buccal)));
        assert_eq!(key_action(" "), Some(KeyAction::ToggleDrill));
        assert_eq!(key_action("x"), None);
    }

    #[tokio::test]
    async fn test_handle_serialises_session() {
        let (handle, task) = spawn_engine(engine());

        assert!(handle.start_simulation(Method::YomiRobotic).await.unwrap());
        let metrics = handle.pointer(PointerSample::new(0.5, 0.5)).await.unwrap();
        assert_eq!(metrics.phase, Phase::Aiming);

        // スペースキーでドリル開始
        assert_eq!(handle.handle_key(" ").await.unwrap(), None);
        assert_eq!(handle.live_metrics().await.unwrap().phase, Phase::Drilling);

        while handle.results().await.unwrap().is_none() {
            handle.tick().await.unwrap();
        }
        let results = handle.results().await.unwrap().unwrap();
        assert!(results.depth >= 1.0);

        let events = handle.drain_events().await.unwrap();
        assert_eq!(events.len(), 3);

        drop(handle);
        let engine = task.await.unwrap();
        assert_eq!(engine.phase(), Phase::Complete);
    }

    #[tokio::test]
    async fn test_view_keys_do_not_touch_engine() {
        let (handle, _task) = spawn_engine(engine());
        handle.start_simulation(Method::Freehand).await.unwrap();
        assert_eq!(handle.handle_key("w").await.unwrap(), Some(View::Occlusal));
        assert_eq!(handle.live_metrics().await.unwrap().phase, Phase::Aiming);
        assert!(handle.drain_events().await.unwrap().len() == 1);
    }

    #[tokio::test]
    async fn test_illegal_command_reports_not_applied() {
        let (handle, _task) = spawn_engine(engine());
        assert!(!handle.send(EngineCommand::StartDrilling).await.unwrap());
        assert!(!handle.send(EngineCommand::CompleteDrilling).await.unwrap());
    }
}
