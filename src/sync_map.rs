use crate::types::{Granularity, LinePoint, SyncEntry};
use anyhow::{Context, Result};
use serde::Serialize;

/// 保存用の同期マップ
///
/// `sync_map` テーブルの1行に対応する。`data` はエントリの JSON 配列。
/// 保存時は同じ `(item_id, granularity)` の既存マップを置き換える。
#[derive(Clone, Debug, PartialEq)]
pub struct SyncMapRecord {
    pub id: String,
    pub item_id: String,
    pub granularity: Granularity,
    pub data: serde_json::Value,
}

impl SyncMapRecord {
    /// 単語単位の同期マップを作成
    pub fn words(item_id: &str, entries: &[SyncEntry]) -> Result<Self> {
        Self::build(item_id, Granularity::Word, entries)
    }

    /// セクション単位の推定同期マップを作成
    pub fn lines(item_id: &str, points: &[LinePoint]) -> Result<Self> {
        Self::build(item_id, Granularity::Line, points)
    }

    fn build<T: Serialize>(item_id: &str, granularity: Granularity, data: &[T]) -> Result<Self> {
        let data = serde_json::to_value(data)
            .with_context(|| format!("同期マップ ({}) のシリアライズに失敗", granularity))?;
        Ok(Self {
            id: uuid::Uuid::new_v4().to_string(),
            item_id: item_id.to_string(),
            granularity,
            data,
        })
    }

    /// 保存されるエントリ数
    pub fn len(&self) -> usize {
        self.data.as_array().map(|a| a.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
