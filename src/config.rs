use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub audio: AudioConfig,
    #[serde(default)]
    pub transcribe: TranscribeConfig,
    pub whisper: Option<WhisperConfig>,
    #[serde(default)]
    pub sidecar: SidecarConfig,
}

/// データベース設定
///
/// 接続先は起動時に一度だけ解決する（[`DatabaseConfig::resolve_url`]）。
///
/// # デフォルト値
///
/// - `url`: なし（環境変数 `POSTGRES_URL` / `DATABASE_URL` を使用）
/// - `max_connections`: 1
/// - `acquire_timeout_secs`: 30 秒
/// - `idle_timeout_secs`: 5 秒
/// - `require_ssl`: false
#[derive(Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    pub url: Option<String>,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_acquire_timeout_secs")]
    pub acquire_timeout_secs: u64,
    #[serde(default = "default_idle_timeout_secs")]
    pub idle_timeout_secs: u64,
    #[serde(default)]
    pub require_ssl: bool,
}

/// 音声ファイル設定
///
/// # デフォルト値
///
/// - `public_root`: "./public" (`/` 始まりの音声参照の基準ディレクトリ)
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AudioConfig {
    #[serde(default = "default_public_root")]
    pub public_root: String,
}

/// 単語アライメントの取得元
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AlignerBackendType {
    /// OpenAI Whisper API（単語タイムスタンプ付き）
    Whisper,
    /// 音声ファイル横に置かれた単語区間 JSON
    Sidecar,
}

/// 文字起こし設定
///
/// # デフォルト値
///
/// - `backend`: "sidecar"
/// - `language`: "pt" (アイテムに言語が無い場合のヒント)
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TranscribeConfig {
    #[serde(default = "default_backend")]
    pub backend: AlignerBackendType,
    #[serde(default = "default_language")]
    pub language: String,
}

/// OpenAI Whisper API 設定
#[derive(Clone, Deserialize, Serialize)]
pub struct WhisperConfig {
    /// OpenAI API Key
    pub api_key: String,
    /// Whisper モデル名（通常 "whisper-1"）
    #[serde(default = "default_whisper_model")]
    pub model: String,
    /// 互換 API を使う場合のエンドポイント
    #[serde(default = "default_whisper_endpoint")]
    pub endpoint: String,
    /// 1リクエストのタイムアウト（秒）
    #[serde(default = "default_whisper_timeout_seconds")]
    pub timeout_seconds: u64,
}

/// 単語区間ファイル設定
///
/// # デフォルト値
///
/// - `suffix`: ".words.json" (`audio.mp3` → `audio.mp3.words.json`)
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SidecarConfig {
    #[serde(default = "default_sidecar_suffix")]
    pub suffix: String,
}

// Default functions
fn default_max_connections() -> u32 {
    1 // 長時間のセッションを持たない
}

fn default_acquire_timeout_secs() -> u64 {
    30
}

fn default_idle_timeout_secs() -> u64 {
    5
}

fn default_public_root() -> String {
    "./public".to_string()
}

fn default_backend() -> AlignerBackendType {
    AlignerBackendType::Sidecar
}

fn default_language() -> String {
    "pt".to_string()
}

fn default_whisper_model() -> String {
    "whisper-1".to_string()
}

fn default_whisper_endpoint() -> String {
    "https://api.openai.com/v1/audio/transcriptions".to_string()
}

fn default_whisper_timeout_seconds() -> u64 {
    600 // 長い音声でも1回で返す
}

fn default_sidecar_suffix() -> String {
    ".words.json".to_string()
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: default_max_connections(),
            acquire_timeout_secs: default_acquire_timeout_secs(),
            idle_timeout_secs: default_idle_timeout_secs(),
            require_ssl: false,
        }
    }
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            public_root: default_public_root(),
        }
    }
}

impl Default for TranscribeConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            language: default_language(),
        }
    }
}

impl Default for SidecarConfig {
    fn default() -> Self {
        Self {
            suffix: default_sidecar_suffix(),
        }
    }
}

// 接続文字列・API Key をログに出さない
impl std::fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("url", &self.url.as_ref().map(|_| "***"))
            .field("max_connections", &self.max_connections)
            .field("acquire_timeout_secs", &self.acquire_timeout_secs)
            .field("idle_timeout_secs", &self.idle_timeout_secs)
            .field("require_ssl", &self.require_ssl)
            .finish()
    }
}

impl std::fmt::Debug for WhisperConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WhisperConfig")
            .field("api_key", &"***")
            .field("model", &self.model)
            .field("endpoint", &self.endpoint)
            .field("timeout_seconds", &self.timeout_seconds)
            .finish()
    }
}

impl DatabaseConfig {
    /// 接続文字列を解決
    ///
    /// 設定ファイルの `url`、環境変数 `POSTGRES_URL`、`DATABASE_URL` の順に探す。
    /// `lookup` は環境変数の取得関数（テストで差し替えるため）。
    ///
    /// # Errors
    ///
    /// どこにも見つからない場合にエラーを返す。
    pub fn resolve_url<F>(&self, lookup: F) -> Result<String>
    where
        F: Fn(&str) -> Option<String>,
    {
        self.url
            .clone()
            .filter(|u| !u.trim().is_empty())
            .or_else(|| lookup("POSTGRES_URL").filter(|u| !u.trim().is_empty()))
            .or_else(|| lookup("DATABASE_URL").filter(|u| !u.trim().is_empty()))
            .context("POSTGRES_URL が設定されていません（[database] url / POSTGRES_URL / DATABASE_URL）")
    }
}

impl Config {
    /// 設定ファイルから読み込み
    ///
    /// TOML形式の設定ファイルをパースしてConfig構造体を生成する。
    ///
    /// # Errors
    ///
    /// ファイルの読み込みまたはパースに失敗した場合にエラーを返す。
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # use word_sync::config::Config;
    /// let config = Config::from_file("word-sync.toml").unwrap();
    /// ```
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .with_context(|| format!("設定ファイルの読み込みに失敗: {:?}", path.as_ref()))?;
        let config: Config =
            toml::from_str(&content).with_context(|| "設定ファイルのパースに失敗")?;
        Ok(config)
    }

    /// デフォルト設定をファイルに書き出し
    ///
    /// 既存のファイルは上書きされる。
    pub fn write_default<P: AsRef<Path>>(path: P) -> Result<()> {
        let config = Config::default();
        let content =
            toml::to_string_pretty(&config).with_context(|| "設定のシリアライズに失敗")?;
        fs::write(path.as_ref(), content)
            .with_context(|| format!("設定ファイルの書き込みに失敗: {:?}", path.as_ref()))?;
        Ok(())
    }

    /// 設定ファイルがあれば読み込み、なければデフォルトを使用
    ///
    /// # Errors
    ///
    /// ファイルが存在するがパースに失敗した場合にエラーを返す。
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        if path.as_ref().exists() {
            Self::from_file(path)
        } else {
            log::warn!(
                "設定ファイルが見つかりません。デフォルト設定を使用します: {:?}",
                path.as_ref()
            );
            Ok(Config::default())
        }
    }
}
