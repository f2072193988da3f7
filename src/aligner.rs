use crate::audio::AudioSource;
use crate::types::WordSegment;
use anyhow::Result;
use async_trait::async_trait;

/// アライメント要求
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AlignRequest {
    /// 解決済みの音声
    pub audio: AudioSource,

    /// 言語ヒント（"pt", "en" など）
    pub language: String,
}

/// 単語アライメントの共通トレイト
///
/// 文字起こしと強制アライメントをまとめて1回の呼び出しとして扱う。
/// 返す単語列は音声上の順序どおりに並んでいること。
#[async_trait]
pub trait WordAligner: Send + Sync {
    /// 音声から単語区間の列を取得
    ///
    /// 単語が1つも得られなかった場合は空の列を返す（エラーではない）。
    async fn align_words(&self, request: &AlignRequest) -> Result<Vec<WordSegment>>;

    /// ログ用の名前
    fn name(&self) -> &'static str;
}

#[async_trait]
impl WordAligner for Box<dyn WordAligner> {
    async fn align_words(&self, request: &AlignRequest) -> Result<Vec<WordSegment>> {
        (**self).align_words(request).await
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }
}

/// 言語コードを ASR 向けのヒントに変換（"pt-BR" → "pt"）
pub fn language_hint(language: Option<&str>, default: &str) -> String {
    language
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .and_then(|l| l.split(['-', '_']).next())
        .map(|l| l.to_ascii_lowercase())
        .unwrap_or_else(|| default.to_string())
}
