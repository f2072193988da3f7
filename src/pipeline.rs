use crate::aligner::{language_hint, AlignRequest, WordAligner};
use crate::audio::resolve_audio;
use crate::mapper::{estimate_line_points, map_words_to_sections};
use crate::normalize::strip_html;
use crate::store::SyncStore;
use crate::sync_map::SyncMapRecord;
use crate::types::{Item, Section};
use anyhow::{Context, Result};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};

/// アイテムをスキップした理由
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
#[serde(tag = "reason", content = "detail", rename_all = "snake_case")]
pub enum SkipReason {
    /// 音声トラックが無い、または参照が空
    NoAudioTrack,
    /// 音声ファイルが見つからない
    AudioNotFound(String),
    /// アライメント結果が0語
    NoWordSegments,
    /// セクションが無い（推定マップのみ）
    NoSections,
    /// 音声長が不明（推定マップのみ）
    NoDuration,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::NoAudioTrack => f.write_str("音声トラックなし"),
            SkipReason::AudioNotFound(path) => write!(f, "音声ファイルが見つかりません: {}", path),
            SkipReason::NoWordSegments => f.write_str("単語区間なし"),
            SkipReason::NoSections => f.write_str("セクションなし"),
            SkipReason::NoDuration => f.write_str("音声長が不明"),
        }
    }
}

/// 1アイテムの処理結果
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ItemOutcome {
    /// 同期マップを保存した（エントリ数）
    Succeeded { entries: usize },
    /// 入力が揃わずスキップした
    Skipped(SkipReason),
    /// ストアまたはプロバイダのエラー
    Failed { error: String },
}

#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct ItemReport {
    pub slug: String,
    #[serde(flatten)]
    pub outcome: ItemOutcome,
}

/// バッチ全体の処理結果
///
/// # JSON出力例
///
/// ```json
/// {
///   "started_at": "2025-01-02T14:30:15+00:00",
///   "finished_at": "2025-01-02T14:41:02+00:00",
///   "interrupted": false,
///   "items": [
///     { "slug": "dom-casmurro", "status": "succeeded", "entries": 5321 },
///     { "slug": "o-alienista", "status": "skipped", "reason": "no_audio_track" }
///   ]
/// }
/// ```
#[derive(Clone, Debug, Serialize)]
pub struct BatchReport {
    pub started_at: String,
    pub finished_at: String,
    /// 停止シグナルにより途中で打ち切ったか
    pub interrupted: bool,
    pub items: Vec<ItemReport>,
}

impl BatchReport {
    fn start() -> Self {
        Self {
            started_at: chrono::Utc::now().to_rfc3339(),
            finished_at: String::new(),
            interrupted: false,
            items: Vec::new(),
        }
    }

    fn finish(mut self) -> Self {
        self.finished_at = chrono::Utc::now().to_rfc3339();
        self
    }

    pub fn succeeded(&self) -> usize {
        self.count(|o| matches!(o, ItemOutcome::Succeeded { .. }))
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, ItemOutcome::Skipped(_)))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, ItemOutcome::Failed { .. }))
    }

    fn count(&self, pred: impl Fn(&ItemOutcome) -> bool) -> usize {
        self.items.iter().filter(|r| pred(&r.outcome)).count()
    }
}

/// パイプライン設定
#[derive(Clone, Debug)]
pub struct PipelineOptions {
    /// `/` 始まりの音声参照の基準ディレクトリ
    pub public_root: PathBuf,
    /// アイテムに言語が無い場合の言語ヒント
    pub default_language: String,
}

/// アイテム単位の同期マップ生成パイプライン
///
/// アイテムは1件ずつ順に処理する。1件の失敗はバッチを止めない。
/// アイテム一覧の取得失敗だけはバッチ全体のエラーになる。
pub struct SyncPipeline<S, A> {
    store: S,
    aligner: A,
    options: PipelineOptions,
}

impl<S: SyncStore, A: WordAligner> SyncPipeline<S, A> {
    pub fn new(store: S, aligner: A, options: PipelineOptions) -> Self {
        Self {
            store,
            aligner,
            options,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// 単語単位の同期マップを生成
    ///
    /// `stop` が立った時点で次のアイテムに進まずに終了する。
    pub async fn run_words(&self, only_slug: Option<&str>, stop: &AtomicBool) -> Result<BatchReport> {
        let items = self
            .store
            .list_items(only_slug)
            .await
            .context("処理対象アイテムの取得に失敗")?;
        log::info!("{} 件のアイテムを処理します (aligner={})", items.len(), self.aligner.name());

        let mut report = BatchReport::start();
        for item in items {
            if stop.load(Ordering::SeqCst) {
                log::warn!("停止要求により残りのアイテムをスキップします");
                report.interrupted = true;
                break;
            }

            let outcome = match self.process_words(&item).await {
                Ok(outcome) => outcome,
                Err(e) => ItemOutcome::Failed {
                    error: format!("{:#}", e),
                },
            };
            log_outcome(&item.slug, &outcome);
            report.items.push(ItemReport {
                slug: item.slug,
                outcome,
            });
        }

        Ok(report.finish())
    }

    async fn process_words(&self, item: &Item) -> Result<ItemOutcome> {
        let Some(track) = self.store.audio_track(&item.id).await? else {
            return Ok(ItemOutcome::Skipped(SkipReason::NoAudioTrack));
        };
        let Some(audio) = resolve_audio(&self.options.public_root, &track.audio_url) else {
            return Ok(ItemOutcome::Skipped(SkipReason::NoAudioTrack));
        };
        if !audio.is_available() {
            return Ok(ItemOutcome::Skipped(SkipReason::AudioNotFound(audio.to_string())));
        }

        let mut section_texts = plain_texts(&self.store.sections(&item.id).await?);
        if section_texts.is_empty() {
            section_texts.push(String::new());
        }

        let request = AlignRequest {
            audio,
            language: language_hint(item.language.as_deref(), &self.options.default_language),
        };
        let words = self
            .aligner
            .align_words(&request)
            .await
            .with_context(|| format!("単語アライメントに失敗: {}", request.audio))?;
        if words.is_empty() {
            return Ok(ItemOutcome::Skipped(SkipReason::NoWordSegments));
        }

        let entries = map_words_to_sections(&words, &section_texts);
        let record = SyncMapRecord::words(&item.id, &entries)?;
        self.store.replace_sync_map(&record).await?;

        Ok(ItemOutcome::Succeeded {
            entries: entries.len(),
        })
    }

    /// セクション単位の推定同期マップを生成
    ///
    /// アライナは使わず、音声長とセクションの文字数だけから求める。
    pub async fn run_lines(&self, only_slug: Option<&str>, stop: &AtomicBool) -> Result<BatchReport> {
        let items = self
            .store
            .list_items(only_slug)
            .await
            .context("処理対象アイテムの取得に失敗")?;
        log::info!("{} 件のアイテムの推定同期マップを作成します", items.len());

        let mut report = BatchReport::start();
        for item in items {
            if stop.load(Ordering::SeqCst) {
                log::warn!("停止要求により残りのアイテムをスキップします");
                report.interrupted = true;
                break;
            }

            let outcome = match self.process_lines(&item).await {
                Ok(outcome) => outcome,
                Err(e) => ItemOutcome::Failed {
                    error: format!("{:#}", e),
                },
            };
            log_outcome(&item.slug, &outcome);
            report.items.push(ItemReport {
                slug: item.slug,
                outcome,
            });
        }

        Ok(report.finish())
    }

    async fn process_lines(&self, item: &Item) -> Result<ItemOutcome> {
        let section_texts = plain_texts(&self.store.sections(&item.id).await?);
        if section_texts.is_empty() {
            return Ok(ItemOutcome::Skipped(SkipReason::NoSections));
        }
        let Some(track) = self.store.audio_track(&item.id).await? else {
            return Ok(ItemOutcome::Skipped(SkipReason::NoAudioTrack));
        };
        if track.duration_ms <= 0 {
            return Ok(ItemOutcome::Skipped(SkipReason::NoDuration));
        }

        let points = estimate_line_points(&section_texts, track.duration_ms);
        let record = SyncMapRecord::lines(&item.id, &points)?;
        self.store.replace_sync_map(&record).await?;

        Ok(ItemOutcome::Succeeded {
            entries: points.len(),
        })
    }
}

fn plain_texts(sections: &[Section]) -> Vec<String> {
    sections
        .iter()
        .map(|s| strip_html(s.content_html.as_deref()))
        .collect()
}

fn log_outcome(slug: &str, outcome: &ItemOutcome) {
    match outcome {
        ItemOutcome::Succeeded { entries } => log::info!("同期マップを保存しました: {} ({} 件)", slug, entries),
        ItemOutcome::Skipped(SkipReason::NoAudioTrack) => log::debug!("{}: {}", slug, SkipReason::NoAudioTrack),
        ItemOutcome::Skipped(reason) => log::warn!("{}: {}", slug, reason),
        ItemOutcome::Failed { error } => log::error!("{}: 処理失敗: {}", slug, error),
    }
}
