use crate::aligner::{AlignRequest, WordAligner};
use crate::audio::AudioSource;
use crate::config::SidecarConfig;
use crate::types::WordSegment;
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// 単語区間ファイルの中身
///
/// 外部のアライメントエンジンの出力をそのまま置けるよう、複数の形を受け付ける。
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SidecarDocument {
    /// 単語区間の配列
    Bare(Vec<WordSegment>),
    /// WhisperX の出力 (`word_segments`)
    WhisperX { word_segments: Vec<WordSegment> },
    /// Whisper API の verbose_json 出力 (`words`)
    Verbose { words: Vec<WordSegment> },
}

impl SidecarDocument {
    fn into_words(self) -> Vec<WordSegment> {
        match self {
            SidecarDocument::Bare(words) => words,
            SidecarDocument::WhisperX { word_segments } => word_segments,
            SidecarDocument::Verbose { words } => words,
        }
    }
}

/// 事前に計算された単語区間ファイルを読むアライナ
///
/// `audio.mp3` に対して `audio.mp3<suffix>` を読む。ファイルが無ければ
/// 単語なし（空の列）として扱う。
pub struct SidecarAligner {
    suffix: String,
}

impl SidecarAligner {
    pub fn new(config: &SidecarConfig) -> Self {
        Self {
            suffix: config.suffix.clone(),
        }
    }

    /// 音声ファイルに対応する単語区間ファイルのパス
    pub fn sidecar_path(&self, audio_path: &Path) -> PathBuf {
        let mut name = audio_path.as_os_str().to_os_string();
        name.push(&self.suffix);
        PathBuf::from(name)
    }

    /// 単語区間ファイルをパース
    pub fn parse(content: &str) -> Result<Vec<WordSegment>> {
        let doc: SidecarDocument =
            serde_json::from_str(content).context("単語区間ファイルのパースに失敗")?;
        Ok(doc.into_words())
    }
}

#[async_trait]
impl WordAligner for SidecarAligner {
    async fn align_words(&self, request: &AlignRequest) -> Result<Vec<WordSegment>> {
        let audio_path = match &request.audio {
            AudioSource::Local(path) => path,
            AudioSource::Remote(url) => {
                bail!("単語区間ファイルはローカル音声のみ対応: {}", url)
            }
        };

        let path = self.sidecar_path(audio_path);
        if !path.is_file() {
            log::debug!("単語区間ファイルがありません: {}", path.display());
            return Ok(Vec::new());
        }

        let content = tokio::fs::read_to_string(&path)
            .await
            .with_context(|| format!("単語区間ファイルの読み込みに失敗: {}", path.display()))?;
        let words = Self::parse(&content)
            .with_context(|| format!("単語区間ファイル: {}", path.display()))?;

        log::debug!(
            "単語区間ファイル {} から {} 語を読み込みました",
            path.display(),
            words.len()
        );
        Ok(words)
    }

    fn name(&self) -> &'static str {
        "sidecar"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn aligner() -> SidecarAligner {
        SidecarAligner::new(&SidecarConfig::default())
    }

    #[test]
    fn test_sidecar_path() {
        let path = aligner().sidecar_path(Path::new("/data/a.mp3"));
        assert_eq!(path, PathBuf::from("/data/a.mp3.words.json"));
    }

    #[test]
    fn test_parse_shapes() {
        let bare = SidecarAligner::parse(r#"[{"word": "a", "start": 0.5}]"#).unwrap();
        assert_eq!(bare, vec![WordSegment::new("a", Some(0.5))]);

        let whisperx = SidecarAligner::parse(
            r#"{"segments": [], "word_segments": [{"word": "b", "start": 1.0, "end": 1.2, "score": 0.8}, {"word": "c"}]}"#,
        )
        .unwrap();
        assert_eq!(whisperx.len(), 2);
        assert_eq!(whisperx[0].end, Some(1.2));
        assert_eq!(whisperx[1].start, None);

        let verbose =
            SidecarAligner::parse(r#"{"text": "d", "words": [{"word": "d", "start": 2.0, "end": 2.1}]}"#)
                .unwrap();
        assert_eq!(verbose[0].word, "d");
    }

    #[test]
    fn test_parse_malformed() {
        assert!(SidecarAligner::parse("{not json").is_err());
        assert!(SidecarAligner::parse(r#"{"foo": 1}"#).is_err());
    }

    #[tokio::test]
    async fn test_align_reads_file() {
        let dir = tempdir().unwrap();
        let audio = dir.path().join("item.mp3");
        std::fs::write(&audio, b"ID3").unwrap();
        std::fs::write(
            dir.path().join("item.mp3.words.json"),
            r#"{"word_segments": [{"word": "olá", "start": 0.1}, {"word": "mundo", "start": 0.4}]}"#,
        )
        .unwrap();

        let request = AlignRequest {
            audio: AudioSource::Local(audio),
            language: "pt".to_string(),
        };
        let words = aligner().align_words(&request).await.unwrap();
        assert_eq!(words.len(), 2);
        assert_eq!(words[1].word, "mundo");
    }

    #[tokio::test]
    async fn test_missing_file_is_empty() {
        let dir = tempdir().unwrap();
        let request = AlignRequest {
            audio: AudioSource::Local(dir.path().join("none.mp3")),
            language: "pt".to_string(),
        };
        assert!(aligner().align_words(&request).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_remote_is_error() {
        let request = AlignRequest {
            audio: AudioSource::Remote("https://example.com/a.mp3".to_string()),
            language: "pt".to_string(),
        };
        assert!(aligner().align_words(&request).await.is_err());
    }
}
