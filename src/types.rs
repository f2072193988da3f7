use serde::{Deserialize, Serialize};

/// 処理対象のアイテム
///
/// `item` テーブルの1行に対応する。`language` は ASR に渡す言語ヒントの
/// 元になる（例: "pt-BR"）。
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Item {
    /// アイテムID
    pub id: String,

    /// 外部から指定可能な識別子
    pub slug: String,

    /// 本文の言語（未設定の場合は設定ファイルのデフォルトを使用）
    pub language: Option<String>,
}

/// アイテムに紐づく音声トラック
///
/// 1アイテムに複数行ある場合は最初の1行のみ使用する。
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AudioTrack {
    /// 保存されている音声の参照（`/` 始まりなら公開ディレクトリ相対）
    pub audio_url: String,

    /// 音声の長さ（ミリ秒）。未設定は 0
    pub duration_ms: i64,
}

/// 本文セクション
///
/// `order_index` 昇順で並べたものが1回の処理の入力になる。
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Section {
    /// 並び順
    pub order_index: i32,

    /// HTML 本文
    pub content_html: Option<String>,
}

/// 外部の ASR/アライメントエンジンが返す単語区間
///
/// WhisperX の `word_segments` と Whisper API の `words` のどちらの形でも
/// デシリアライズできる。未知のフィールドは無視される。
///
/// # Examples
///
/// ```
/// # use word_sync::types::WordSegment;
/// let seg: WordSegment =
///     serde_json::from_str(r#"{"word": "olá", "start": 0.42, "score": 0.9}"#).unwrap();
/// assert_eq!(seg.word, "olá");
/// assert_eq!(seg.start, Some(0.42));
/// ```
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct WordSegment {
    /// 認識された単語
    #[serde(default)]
    pub word: String,

    /// 開始時刻（秒）。アライメントに失敗した単語では欠落する
    #[serde(default)]
    pub start: Option<f64>,

    /// 終了時刻（秒）
    #[serde(default)]
    pub end: Option<f64>,
}

impl WordSegment {
    pub fn new(word: impl Into<String>, start: Option<f64>) -> Self {
        Self {
            word: word.into(),
            start,
            end: None,
        }
    }
}

/// 単語単位の同期エントリ
///
/// 再生UIがハイライト位置を決めるための1単語分の情報。
/// フィールド名は保存形式（JSON配列の各要素）そのもの。
///
/// # JSON出力例
///
/// ```json
/// { "t": 1250, "i": 2, "w": 14, "text": "palavra" }
/// ```
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct SyncEntry {
    /// 開始時刻（ミリ秒）
    pub t: i64,

    /// セクション番号
    pub i: usize,

    /// セクション内の単語番号
    pub w: usize,

    /// 認識された単語そのもの
    pub text: String,
}

/// セクション単位の推定同期ポイント
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct LinePoint {
    /// 開始時刻（ミリ秒）
    pub t: i64,

    /// セクション番号
    pub i: usize,
}

/// 同期マップの粒度
///
/// アイテムごと・粒度ごとに同期マップは最大1つ。
///
/// # Examples
///
/// ```
/// # use word_sync::types::Granularity;
/// assert_eq!(Granularity::Word.as_str(), "word");
/// assert_eq!(serde_json::to_string(&Granularity::Line).unwrap(), r#""line""#);
/// ```
#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    /// 単語単位（ASR + アライメント由来）
    Word,

    /// セクション単位（音声長と文字数からの推定）
    Line,
}

impl Granularity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Granularity::Word => "word",
            Granularity::Line => "line",
        }
    }
}

impl std::fmt::Display for Granularity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 保存済み同期マップの概要（`--check` 用）
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct SyncMapSummary {
    pub slug: String,
    pub granularity: String,
    pub points: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_word_segment_missing_start() {
        let seg: WordSegment = serde_json::from_str(r#"{"word": "e"}"#).unwrap();
        assert_eq!(seg.word, "e");
        assert_eq!(seg.start, None);
        assert_eq!(seg.end, None);
    }

    #[test]
    fn test_word_segment_null_start() {
        let seg: WordSegment =
            serde_json::from_str(r#"{"word": "e", "start": null, "end": 1.5}"#).unwrap();
        assert_eq!(seg.start, None);
        assert_eq!(seg.end, Some(1.5));
    }

    #[test]
    fn test_sync_entry_json_shape() {
        let entry = SyncEntry {
            t: 100,
            i: 1,
            w: 3,
            text: "olá".to_string(),
        };
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["t"], 100);
        assert_eq!(json["i"], 1);
        assert_eq!(json["w"], 3);
        assert_eq!(json["text"], "olá");
        assert_eq!(json.as_object().unwrap().len(), 4);
    }

    #[test]
    fn test_granularity_serialization() {
        let json = serde_json::to_string(&Granularity::Word).unwrap();
        assert_eq!(json, r#""word""#);

        let deserialized: Granularity = serde_json::from_str(r#""line""#).unwrap();
        assert_eq!(deserialized, Granularity::Line);
        assert_eq!(Granularity::Line.to_string(), "line");
    }
}
