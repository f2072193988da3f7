use crate::sync_map::SyncMapRecord;
use crate::types::{AudioTrack, Granularity, Item, Section, SyncMapSummary};
use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

/// アイテム・音声・本文・同期マップを保持するストアの共通トレイト
#[async_trait]
pub trait SyncStore: Send + Sync {
    /// 処理対象のアイテム一覧
    ///
    /// `only_slug` を指定した場合はそのアイテムのみ（存在しなければ空）。
    async fn list_items(&self, only_slug: Option<&str>) -> Result<Vec<Item>>;

    /// アイテムの音声トラック（複数ある場合は最初の1件）
    async fn audio_track(&self, item_id: &str) -> Result<Option<AudioTrack>>;

    /// アイテムのセクション（`order_index` 昇順）
    async fn sections(&self, item_id: &str) -> Result<Vec<Section>>;

    /// 同じ `(item_id, granularity)` の既存マップを新しいマップで置き換える
    ///
    /// 削除と挿入は1つの単位として扱い、途中状態（マップが0件）を
    /// 他の読み手に見せてはならない。
    async fn replace_sync_map(&self, record: &SyncMapRecord) -> Result<()>;

    /// 保存済み同期マップの概要
    ///
    /// `slugs` が空の場合は新しいものから10件。
    async fn sync_map_summaries(&self, slugs: &[String]) -> Result<Vec<SyncMapSummary>>;

    /// 保存済み同期マップの総数（全アイテム・全粒度）
    async fn sync_map_count(&self) -> Result<i64>;
}

/// メモリ上のストア
///
/// Postgres を使わずにライブラリを組み込む場合やテストで使う。
/// 置き換えは1つのロック内で行うので途中状態は見えない。
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<MemoryState>,
}

#[derive(Default)]
struct MemoryState {
    items: Vec<Item>,
    tracks: HashMap<String, Vec<AudioTrack>>,
    sections: HashMap<String, Vec<Section>>,
    sync_maps: Vec<SyncMapRecord>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_item(&self, item: Item) {
        self.lock().items.push(item);
    }

    pub fn add_audio_track(&self, item_id: &str, track: AudioTrack) {
        self.lock()
            .tracks
            .entry(item_id.to_string())
            .or_default()
            .push(track);
    }

    pub fn add_section(&self, item_id: &str, section: Section) {
        self.lock()
            .sections
            .entry(item_id.to_string())
            .or_default()
            .push(section);
    }

    /// 保存済みの同期マップ（指定アイテム・粒度）
    pub fn sync_maps(&self, item_id: &str, granularity: Granularity) -> Vec<SyncMapRecord> {
        self.lock()
            .sync_maps
            .iter()
            .filter(|r| r.item_id == item_id && r.granularity == granularity)
            .cloned()
            .collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryState> {
        // 他スレッドのパニックで汚染されてもデータ自体は整合している
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl SyncStore for MemoryStore {
    async fn list_items(&self, only_slug: Option<&str>) -> Result<Vec<Item>> {
        Ok(self
            .lock()
            .items
            .iter()
            .filter(|item| only_slug.map_or(true, |slug| item.slug == slug))
            .cloned()
            .collect())
    }

    async fn audio_track(&self, item_id: &str) -> Result<Option<AudioTrack>> {
        Ok(self
            .lock()
            .tracks
            .get(item_id)
            .and_then(|tracks| tracks.first().cloned()))
    }

    async fn sections(&self, item_id: &str) -> Result<Vec<Section>> {
        let mut sections = self
            .lock()
            .sections
            .get(item_id)
            .cloned()
            .unwrap_or_default();
        sections.sort_by_key(|s| s.order_index);
        Ok(sections)
    }

    async fn replace_sync_map(&self, record: &SyncMapRecord) -> Result<()> {
        let mut state = self.lock();
        state
            .sync_maps
            .retain(|r| !(r.item_id == record.item_id && r.granularity == record.granularity));
        state.sync_maps.push(record.clone());
        Ok(())
    }

    async fn sync_map_summaries(&self, slugs: &[String]) -> Result<Vec<SyncMapSummary>> {
        let state = self.lock();
        let slug_of: HashMap<&str, &str> = state
            .items
            .iter()
            .map(|i| (i.id.as_str(), i.slug.as_str()))
            .collect();

        let summaries = state
            .sync_maps
            .iter()
            .rev()
            .filter_map(|r| {
                let slug = slug_of.get(r.item_id.as_str())?;
                Some(SyncMapSummary {
                    slug: slug.to_string(),
                    granularity: r.granularity.to_string(),
                    points: r.len() as i64,
                })
            })
            .filter(|s| slugs.is_empty() || slugs.contains(&s.slug));

        Ok(if slugs.is_empty() {
            summaries.take(10).collect()
        } else {
            summaries.collect()
        })
    }

    async fn sync_map_count(&self) -> Result<i64> {
        Ok(self.lock().sync_maps.len() as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SyncEntry;

    fn item(id: &str, slug: &str) -> Item {
        Item {
            id: id.to_string(),
            slug: slug.to_string(),
            language: None,
        }
    }

    fn entry(text: &str) -> SyncEntry {
        SyncEntry {
            t: 0,
            i: 0,
            w: 0,
            text: text.to_string(),
        }
    }

    #[tokio::test]
    async fn test_list_items_with_slug_filter() {
        let store = MemoryStore::new();
        store.add_item(item("1", "primeiro"));
        store.add_item(item("2", "segundo"));

        assert_eq!(store.list_items(None).await.unwrap().len(), 2);
        let only = store.list_items(Some("segundo")).await.unwrap();
        assert_eq!(only, vec![item("2", "segundo")]);
        assert!(store.list_items(Some("nenhum")).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_first_audio_track_wins() {
        let store = MemoryStore::new();
        store.add_audio_track(
            "1",
            AudioTrack {
                audio_url: "/a.mp3".to_string(),
                duration_ms: 10,
            },
        );
        store.add_audio_track(
            "1",
            AudioTrack {
                audio_url: "/b.mp3".to_string(),
                duration_ms: 20,
            },
        );

        let track = store.audio_track("1").await.unwrap().unwrap();
        assert_eq!(track.audio_url, "/a.mp3");
        assert!(store.audio_track("2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_sections_are_ordered() {
        let store = MemoryStore::new();
        for idx in [2, 0, 1] {
            store.add_section(
                "1",
                Section {
                    order_index: idx,
                    content_html: Some(format!("<p>{}</p>", idx)),
                },
            );
        }
        let order: Vec<i32> = store
            .sections("1")
            .await
            .unwrap()
            .iter()
            .map(|s| s.order_index)
            .collect();
        assert_eq!(order, vec![0, 1, 2]);
    }

    #[tokio::test]
    async fn test_replace_keeps_one_map_per_granularity() {
        let store = MemoryStore::new();
        store.add_item(item("1", "primeiro"));

        let first = SyncMapRecord::words("1", &[entry("a")]).unwrap();
        let second = SyncMapRecord::words("1", &[entry("b"), entry("c")]).unwrap();
        let lines = SyncMapRecord::lines("1", &[]).unwrap();

        store.replace_sync_map(&first).await.unwrap();
        store.replace_sync_map(&lines).await.unwrap();
        store.replace_sync_map(&second).await.unwrap();

        let words = store.sync_maps("1", Granularity::Word);
        assert_eq!(words.len(), 1);
        assert_eq!(words[0].id, second.id);
        // 他の粒度は残る
        assert_eq!(store.sync_maps("1", Granularity::Line).len(), 1);
    }

    #[tokio::test]
    async fn test_sync_map_summaries() {
        let store = MemoryStore::new();
        store.add_item(item("1", "primeiro"));
        store.add_item(item("2", "segundo"));
        store
            .replace_sync_map(&SyncMapRecord::words("1", &[entry("a"), entry("b")]).unwrap())
            .await
            .unwrap();
        store
            .replace_sync_map(&SyncMapRecord::words("2", &[entry("c")]).unwrap())
            .await
            .unwrap();

        let all = store.sync_map_summaries(&[]).await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].slug, "segundo");

        let one = store
            .sync_map_summaries(&["primeiro".to_string()])
            .await
            .unwrap();
        assert_eq!(
            one,
            vec![SyncMapSummary {
                slug: "primeiro".to_string(),
                granularity: "word".to_string(),
                points: 2,
            }]
        );
    }

    #[tokio::test]
    async fn test_sync_map_count() {
        let store = MemoryStore::new();
        store.add_item(item("1", "primeiro"));
        assert_eq!(store.sync_map_count().await.unwrap(), 0);

        store
            .replace_sync_map(&SyncMapRecord::words("1", &[entry("a")]).unwrap())
            .await
            .unwrap();
        store
            .replace_sync_map(&SyncMapRecord::lines("1", &[]).unwrap())
            .await
            .unwrap();
        // 置き換えでは増えない
        store
            .replace_sync_map(&SyncMapRecord::words("1", &[entry("b")]).unwrap())
            .await
            .unwrap();
        assert_eq!(store.sync_map_count().await.unwrap(), 2);
    }
}
