//! End-to-end tests: log files on disk through to a recording message sink.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use gamelog_relay::category::LogCategory;
use gamelog_relay::config::{RelayConfig, WatchConfig, WebhookUrls};
use gamelog_relay::state::{DedupStore, OffsetStore};
use gamelog_relay::supervisor::{CategoryPipeline, SupervisorOptions, WatcherSupervisor};
use gamelog_relay::webhook::{DeliveryError, MessageSink};
use tempfile::TempDir;

const HOOK: &str = "https://discord.com/api/webhooks/1/relay";

const CHAT_LINE: &str = "2025.07.05-03.23.13: '76561198140545020:mariocs10(12)' 'Global: oi'";
const CHAT_LINE_2: &str =
    "2025.07.05-03.24.00: '76561198140545020:mariocs10(12)' 'Global: tudo bem?'";
const LOGIN_LINE: &str = "2025.07.05-00.30.39: '192.168.100.3 76561198040636105:Pedreiro(1)' logged in at: X=-559335.000 Y=-197738.000 Z=17276.000";
const DESTRUCTION_LINE: &str = "2025.07.03-23.09.02: [Disappeared] Laika_ES. VehicleId: 804481. Owner: 76561198398160339 (15, BlueArcher_BR). Location: X=-375570.938 Y=-7998.395 Z=34911.961";

#[derive(Default)]
struct RecordingSink {
    sent: Mutex<Vec<(String, String)>>,
}

impl RecordingSink {
    fn messages(&self) -> Vec<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .map(|(_, text)| text.clone())
            .collect()
    }

    fn count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

#[async_trait]
impl MessageSink for RecordingSink {
    async fn send(&self, url: &str, text: &str) -> Result<(), DeliveryError> {
        self.sent
            .lock()
            .unwrap()
            .push((url.to_string(), text.to_string()));
        Ok(())
    }
}

fn utf16le(text: &str, bom: bool) -> Vec<u8> {
    let mut bytes = if bom { vec![0xFF, 0xFE] } else { Vec::new() };
    for unit in text.encode_utf16() {
        bytes.extend_from_slice(&unit.to_le_bytes());
    }
    bytes
}

fn append(path: &Path, bytes: &[u8]) {
    let mut file = std::fs::OpenOptions::new()
        .append(true)
        .create(true)
        .open(path)
        .unwrap();
    file.write_all(bytes).unwrap();
}

fn relay_config(logs: Option<PathBuf>) -> RelayConfig {
    RelayConfig {
        logs_path: logs,
        webhooks: WebhookUrls {
            logs_adm: Some(HOOK.to_string()),
            chat_global: Some(HOOK.to_string()),
            log_destruicao_veiculos: Some(HOOK.to_string()),
            painel_players_on: Some(HOOK.to_string()),
        },
        ..RelayConfig::default()
    }
}

struct Env {
    dir: TempDir,
    logs: PathBuf,
    sink: Arc<RecordingSink>,
}

impl Env {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let logs = dir.path().join("logs");
        std::fs::create_dir(&logs).unwrap();
        Self {
            dir,
            logs,
            sink: Arc::new(RecordingSink::default()),
        }
    }

    fn state_dir(&self) -> PathBuf {
        self.dir.path().join("state")
    }

    /// A pipeline backed by fresh store instances over the same state dir.
    fn pipeline(&self, category: LogCategory) -> CategoryPipeline {
        CategoryPipeline::new(
            category,
            Arc::new(OffsetStore::new(self.state_dir())),
            Arc::new(DedupStore::new(self.state_dir())),
            self.sink.clone(),
            Arc::new(relay_config(Some(self.logs.clone()))),
        )
    }
}

async fn wait_for(sink: &RecordingSink, count: usize) -> bool {
    for _ in 0..100 {
        if sink.count() >= count {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    false
}

#[tokio::test]
async fn test_same_line_twice_is_delivered_once() {
    let env = Env::new();
    let path = env.logs.join("admin_20250705000000.log");
    let line = "2025.07.05-03.23.13: Admin 'Foo' used command #SetTime 12";
    std::fs::write(&path, format!("{line}\n{line}\n")).unwrap();

    let summary = env.pipeline(LogCategory::Admin).process_file(&path).await.unwrap();

    assert_eq!(summary.delivered, 1);
    assert_eq!(summary.duplicates, 1);
    assert_eq!(env.sink.count(), 1);
}

#[tokio::test]
async fn test_utf16_chat_file_is_decoded() {
    let env = Env::new();
    let path = env.logs.join("chat_20250705000000.log");
    let bytes = utf16le(&format!("{CHAT_LINE}\r\n{CHAT_LINE_2}\r\n"), true);
    std::fs::write(&path, &bytes).unwrap();

    let summary = env.pipeline(LogCategory::Chat).process_file(&path).await.unwrap();

    assert_eq!(summary.delivered, 2);
    assert_eq!(summary.offset, bytes.len() as u64);
    let messages = env.sink.messages();
    assert!(messages[0].contains("mariocs10"));
    assert!(messages[0].ends_with("oi"));
    assert!(messages[1].contains("tudo bem?"));
}

#[tokio::test]
async fn test_state_survives_restart() {
    let env = Env::new();
    let path = env.logs.join("login_20250705000000.log");
    std::fs::write(&path, utf16le(&format!("{LOGIN_LINE}\n"), true)).unwrap();

    env.pipeline(LogCategory::Login).process_file(&path).await.unwrap();
    assert_eq!(env.sink.count(), 1);

    // New stores read the persisted offset; nothing is re-sent.
    let summary = env.pipeline(LogCategory::Login).process_file(&path).await.unwrap();
    assert_eq!(summary.lines, 0);

    let logout = LOGIN_LINE
        .replace("00.30.39", "01.00.00")
        .replace("logged in", "logged out");
    append(&path, &utf16le(&format!("{logout}\n"), false));
    let summary = env.pipeline(LogCategory::Login).process_file(&path).await.unwrap();
    assert_eq!(summary.delivered, 1);
    assert!(env.sink.messages()[1].contains("logged out"));
}

#[tokio::test]
async fn test_truncated_file_is_reread() {
    let env = Env::new();
    let path = env.logs.join("vehicle_destruction_20250703000000.log");
    let pipeline = env.pipeline(LogCategory::Destruction);
    std::fs::write(&path, format!("{DESTRUCTION_LINE}\n{DESTRUCTION_LINE}\n")).unwrap();
    pipeline.process_file(&path).await.unwrap();
    assert_eq!(env.sink.count(), 1);

    let replaced = DESTRUCTION_LINE.replace("804481", "900001");
    std::fs::write(&path, format!("{replaced}\n")).unwrap();
    let summary = pipeline.process_file(&path).await.unwrap();

    assert_eq!(summary.delivered, 1);
    assert!(env.sink.messages()[1].contains("900001"));
}

#[tokio::test]
async fn test_partial_line_waits_for_its_newline() {
    let env = Env::new();
    let path = env.logs.join("admin_20250705000000.log");
    let pipeline = env.pipeline(LogCategory::Admin);
    std::fs::write(&path, "complete\nhalf a li").unwrap();

    let summary = pipeline.process_file(&path).await.unwrap();
    assert_eq!(summary.offset, 9);

    append(&path, b"ne\n");
    pipeline.process_file(&path).await.unwrap();
    let messages = env.sink.messages();
    assert_eq!(messages.len(), 2);
    assert!(messages[1].contains("half a line"));
}

#[tokio::test]
async fn test_supervisor_catches_up_then_relays_new_lines() {
    let env = Env::new();
    let chat = env.logs.join("chat_20250705000000.log");
    std::fs::write(&chat, utf16le(&format!("{CHAT_LINE}\n"), true)).unwrap();
    let destruction = env.logs.join("vehicle_destruction_20250703000000.log");
    std::fs::write(&destruction, format!("{DESTRUCTION_LINE}\n")).unwrap();

    let options = SupervisorOptions {
        categories: vec![LogCategory::Chat, LogCategory::Destruction],
        watch: WatchConfig {
            poll_interval_ms: Some(100),
            native_events: false,
            ..WatchConfig::default()
        },
        restart_delay: Duration::from_millis(100),
        ..SupervisorOptions::default()
    };
    let mut supervisor = WatcherSupervisor::new(
        env.state_dir(),
        env.sink.clone(),
        Arc::new(relay_config(Some(env.logs.clone()))),
        options,
    );
    supervisor.start();

    // Destruction events are replayed at startup, chat backlog is not.
    assert!(wait_for(&env.sink, 1).await);
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(env.sink.count(), 1);
    assert!(env.sink.messages()[0].contains("804481"));

    append(&chat, &utf16le(&format!("{CHAT_LINE_2}\n"), false));
    assert!(wait_for(&env.sink, 2).await);
    assert!(env.sink.messages()[1].contains("tudo bem?"));

    supervisor.shutdown().await;
}

#[tokio::test]
async fn test_supervisor_without_logs_path_stays_idle() {
    let env = Env::new();
    std::fs::write(env.logs.join("vehicle_destruction_20250703000000.log"), format!("{DESTRUCTION_LINE}\n")).unwrap();

    let mut supervisor = WatcherSupervisor::new(
        env.state_dir(),
        env.sink.clone(),
        Arc::new(relay_config(None)),
        SupervisorOptions::default(),
    );
    supervisor.start();
    assert_eq!(supervisor.running(), 4);

    tokio::time::sleep(Duration::from_millis(200)).await;
    supervisor.shutdown().await;
    assert_eq!(env.sink.count(), 0);
}
