//! word-sync - 朗読音声と本文セクションの単語同期マップ生成
//!
//! このクレートは、記事の朗読音声から得た単語区間（単語と開始時刻）を
//! 本文のセクション列に割り当て、再生UIの単語ハイライト用の同期マップを
//! 作成・保存するバッチ処理を提供します。
//!
//! # 主な機能
//!
//! - **本文の正規化**: セクションの HTML からタグを除去し、文字数を求める
//! - **単語→セクション割り当て**: 文字数に比例して単語列をセクションに配分
//! - **同期マップの置き換え保存**: アイテム・粒度ごとに1つのマップを保持
//! - **セクション単位の推定マップ**: 音声長と文字数だけから各セクションの開始時刻を推定
//! - **単語アライメント**: OpenAI Whisper API または事前計算済みの単語区間ファイル
//!
//! # アーキテクチャ
//!
//! ```text
//! [SyncStore] → [SyncPipeline] → [WordAligner] → [単語区間]
//!                     │                              │
//!                     ↓                              ↓
//!              [strip_html] ──────────→ [map_words_to_sections]
//!                                                    │
//!                                                    ↓
//!                                            [SyncMapRecord]
//!                                                    │
//!                                                    ↓
//!                                     [SyncStore::replace_sync_map]
//! ```
//!
//! # 使用例
//!
//! ```
//! use word_sync::mapper::map_words_to_sections;
//! use word_sync::normalize::strip_html;
//! use word_sync::types::WordSegment;
//!
//! let sections = vec![strip_html(Some("<p>Olá</p>")), strip_html(Some("<p>mundo</p>"))];
//! let words = vec![
//!     WordSegment::new("Olá", Some(0.0)),
//!     WordSegment::new("mundo", Some(0.6)),
//! ];
//! let entries = map_words_to_sections(&words, &sections);
//! assert_eq!(entries[1].i, 1);
//! assert_eq!(entries[1].t, 600);
//! ```

pub mod aligner;
pub mod audio;
pub mod config;
pub mod mapper;
pub mod normalize;
pub mod pipeline;
pub mod postgres;
pub mod sidecar;
pub mod store;
pub mod sync_map;
pub mod types;
pub mod whisper_api;
