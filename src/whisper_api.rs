use crate::aligner::{AlignRequest, WordAligner};
use crate::audio::{mime_for, AudioSource};
use crate::config::WhisperConfig;
use crate::types::WordSegment;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::multipart;
use serde::Deserialize;

/// OpenAI Whisper API レスポンス（verbose_json）
#[derive(Debug, Deserialize)]
struct WhisperVerboseResponse {
    #[serde(default)]
    text: String,
    #[serde(default)]
    words: Vec<WordSegment>,
}

/// OpenAI Whisper API バックエンド
///
/// `timestamp_granularities[]=word` を指定して単語単位の開始時刻を取得する。
/// 外部 URL の音声はここでダウンロードしてからアップロードする。
pub struct WhisperAligner {
    config: WhisperConfig,
    client: reqwest::Client,
}

impl WhisperAligner {
    pub fn new(config: WhisperConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_seconds))
            .build()
            .context("Whisper API HTTPクライアント作成失敗")?;

        Ok(Self { config, client })
    }

    /// 音声データを取得
    async fn load_audio(&self, audio: &AudioSource) -> Result<Vec<u8>> {
        match audio {
            AudioSource::Local(path) => tokio::fs::read(path)
                .await
                .with_context(|| format!("音声ファイルの読み込みに失敗: {}", path.display())),
            AudioSource::Remote(url) => {
                let response = self
                    .client
                    .get(url)
                    .send()
                    .await
                    .with_context(|| format!("音声のダウンロードに失敗: {}", url))?;

                if !response.status().is_success() {
                    anyhow::bail!("音声のダウンロードに失敗: {} - {}", url, response.status());
                }

                let bytes = response
                    .bytes()
                    .await
                    .with_context(|| format!("音声のダウンロードに失敗: {}", url))?;
                Ok(bytes.to_vec())
            }
        }
    }

    /// Whisper APIを呼び出して単語区間を取得
    async fn transcribe_words(
        &self,
        audio_data: Vec<u8>,
        file_name: String,
        language: &str,
    ) -> Result<WhisperVerboseResponse> {
        let mime = mime_for(&file_name);
        let part = multipart::Part::bytes(audio_data)
            .file_name(file_name)
            .mime_str(mime)?;

        let form = multipart::Form::new()
            .part("file", part)
            .text("model", self.config.model.clone())
            .text("language", language.to_string())
            .text("response_format", "verbose_json")
            .text("timestamp_granularities[]", "word");

        let response = self
            .client
            .post(&self.config.endpoint)
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .multipart(form)
            .send()
            .await
            .context("Whisper API リクエスト失敗")?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            anyhow::bail!("Whisper API エラー: {} - {}", status, error_text);
        }

        response
            .json::<WhisperVerboseResponse>()
            .await
            .context("Whisper API レスポンスパース失敗")
    }
}

#[async_trait]
impl WordAligner for WhisperAligner {
    async fn align_words(&self, request: &AlignRequest) -> Result<Vec<WordSegment>> {
        let audio_data = self.load_audio(&request.audio).await?;
        log::debug!(
            "Whisper API: {} ({} バイト) を文字起こし中",
            request.audio,
            audio_data.len()
        );

        let response = self
            .transcribe_words(audio_data, request.audio.file_name(), &request.language)
            .await?;

        log::debug!(
            "Whisper API: {} 語 / {} 文字",
            response.words.len(),
            response.text.chars().count()
        );
        Ok(response.words)
    }

    fn name(&self) -> &'static str {
        "whisper"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_verbose_response() {
        let json = r#"{
            "task": "transcribe",
            "language": "portuguese",
            "duration": 3.2,
            "text": "Olá mundo",
            "words": [
                {"word": "Olá", "start": 0.0, "end": 0.4},
                {"word": "mundo", "start": 0.5, "end": 1.1}
            ]
        }"#;
        let response: WhisperVerboseResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.text, "Olá mundo");
        assert_eq!(response.words.len(), 2);
        assert_eq!(response.words[1].start, Some(0.5));
    }

    #[test]
    fn test_parse_response_without_words() {
        let response: WhisperVerboseResponse = serde_json::from_str(r#"{"text": ""}"#).unwrap();
        assert!(response.words.is_empty());
    }

    #[tokio::test]
    async fn test_missing_local_file_is_error() {
        let aligner = WhisperAligner::new(WhisperConfig {
            api_key: "sk-test".to_string(),
            model: "whisper-1".to_string(),
            endpoint: "http://127.0.0.1:9/v1/audio/transcriptions".to_string(),
            timeout_seconds: 1,
        })
        .unwrap();

        let request = AlignRequest {
            audio: AudioSource::Local("/nonexistent/word-sync/a.mp3".into()),
            language: "pt".to_string(),
        };
        let err = aligner.align_words(&request).await.unwrap_err();
        assert!(format!("{:#}", err).contains("音声ファイルの読み込みに失敗"));
    }
}
