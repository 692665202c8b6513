use async_trait::async_trait;
use roster_sync::{
    DataStore, FallbackCache, MemoryCache, RenderedView, SyncError, SyncResult, ViewRenderer,
    escape_html,
};
use roster_types::{Record, RecordId};
use std::sync::Arc;

const SLOT: &str = "employeeData";

fn renderer() -> (ViewRenderer, Arc<MemoryCache>) {
    let cache = Arc::new(MemoryCache::new());
    (ViewRenderer::new(cache.clone(), SLOT), cache)
}

/// A cache whose writes always fail.
struct BrokenCache;

#[async_trait]
impl FallbackCache for BrokenCache {
    async fn load(&self, _slot: &str) -> SyncResult<Option<String>> {
        Err(SyncError::Cache("disk on fire".into()))
    }

    async fn store(&self, _slot: &str, _text: &str) -> SyncResult<()> {
        Err(SyncError::Cache("disk on fire".into()))
    }
}

// ── Escaping ────────────────────────────────────────────────────

#[test]
fn escape_html_covers_markup_characters() {
    assert_eq!(
        escape_html(r#"<a href="x">Tom & 'Jerry'</a>"#),
        "&lt;a href=&quot;x&quot;&gt;Tom &amp; &#039;Jerry&#039;&lt;/a&gt;"
    );
    assert_eq!(escape_html("plain"), "plain");
    assert_eq!(escape_html(""), "");
}

// ── Projection ──────────────────────────────────────────────────

#[test]
fn rows_follow_store_order_with_blanks_for_absent() {
    let view = RenderedView::project(&[
        Record::new(2, "Bo", "E2").with_age(41).with_gender("M"),
        Record::new(1, "Ann", "E1").with_salary(52000),
    ]);
    assert_eq!(view.len(), 2);

    let bo = &view.rows()[0];
    assert_eq!(bo.name, "Bo");
    assert_eq!(bo.age, "41");
    assert_eq!(bo.salary, "");
    assert_eq!(bo.gender, "M");
    assert_eq!(bo.custom_id, "E2");
    assert_eq!(bo.delete.id, RecordId::Int(2));

    let ann = &view.rows()[1];
    assert_eq!(ann.age, "");
    assert_eq!(ann.salary, "52000");
    assert_eq!(ann.gender, "");
}

#[test]
fn html_escapes_every_text_field() {
    let view = RenderedView::project(&[Record::new("x\"y", "<b>Ann</b>", "E&1").with_gender("'f'")]);
    let html = view.html();
    assert!(html.contains("<td>&lt;b&gt;Ann&lt;/b&gt;</td>"));
    assert!(html.contains("<td>E&amp;1</td>"));
    assert!(html.contains("<td>&#039;f&#039;</td>"));
    assert!(html.contains("data-id=\"x&quot;y\""));
    assert!(!html.contains("<b>"));
}

#[test]
fn html_has_one_row_per_record() {
    let view = RenderedView::project(&[Record::new(1, "Ann", "E1"), Record::new(2, "Bo", "E2")]);
    assert_eq!(view.html().matches("<tr>").count(), 2);
    assert_eq!(view.html().matches("data-action=\"delete\"").count(), 2);
    assert!(view.html().contains("data-id=\"1\""));
    assert!(view.html().contains("data-id=\"2\""));
}

#[test]
fn empty_store_renders_nothing() {
    let view = RenderedView::project(&[]);
    assert!(view.is_empty());
    assert_eq!(view.html(), "");
}

// ── Delete delegation ───────────────────────────────────────────

#[test]
fn delete_target_by_row() {
    let view = RenderedView::project(&[Record::new(1, "Ann", "E1"), Record::new(2, "Bo", "E2")]);
    assert_eq!(view.delete_target(1), Some(&RecordId::Int(2)));
    assert_eq!(view.delete_target(2), None);
}

#[test]
fn resolve_delete_by_data_id() {
    let view = RenderedView::project(&[
        Record::new(7, "Ann", "E1"),
        Record::new("abc-1", "Bo", "E2"),
    ]);
    assert_eq!(view.resolve_delete("7"), Some(&RecordId::Int(7)));
    assert_eq!(view.resolve_delete("abc-1"), Some(&RecordId::Text("abc-1".into())));
    assert_eq!(view.resolve_delete("8"), None);
}

// ── Text table ──────────────────────────────────────────────────

#[test]
fn text_table_has_header_and_aligned_rows() {
    let view = RenderedView::project(&[
        Record::new(1, "Ann", "E1").with_age(34),
        Record::new(22, "Bartholomew", "E22"),
    ]);
    let text = view.to_text();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[0].starts_with("Name"));
    assert!(lines[0].contains("Custom ID"));
    assert_eq!(
        lines[1].split_whitespace().collect::<Vec<_>>(),
        ["Ann", "34", "E1", "1"]
    );
    // Columns line up under the widest name.
    assert_eq!(lines[1].find("34"), lines[0].find("Age"));
    assert!(lines[2].starts_with("Bartholomew"));
    assert!(lines[2].ends_with("22"));
}

#[test]
fn text_table_is_not_markup_escaped() {
    let view = RenderedView::project(&[Record::new(1, "Tom & Jerry", "E1")]);
    assert!(view.to_text().contains("Tom & Jerry"));
}

// ── Render + persistence ────────────────────────────────────────

#[tokio::test]
async fn render_persists_snapshot() {
    let (mut renderer, cache) = renderer();
    let store = DataStore::from(vec![Record::new(1, "Ann", "E1")]);

    let view = renderer.render(&store).await.clone();
    assert_eq!(view.len(), 1);

    let persisted = cache.get(SLOT).unwrap();
    assert_eq!(persisted, store.encode().unwrap());
    assert_eq!(DataStore::decode(&persisted).unwrap(), store);
}

#[tokio::test]
async fn render_is_idempotent() {
    let (mut renderer, cache) = renderer();
    let store = DataStore::from(vec![
        Record::new(1, "Ann", "E1").with_age(3),
        Record::new(2, "Bo", "E2"),
    ]);

    let first = renderer.render(&store).await.clone();
    let first_cache = cache.get(SLOT).unwrap();
    let second = renderer.render(&store).await.clone();
    let second_cache = cache.get(SLOT).unwrap();

    assert_eq!(first, second);
    assert_eq!(first.html(), second.html());
    assert_eq!(first_cache, second_cache);
}

#[tokio::test]
async fn render_replaces_previous_view() {
    let (mut renderer, _cache) = renderer();
    renderer
        .render(&DataStore::from(vec![Record::new(1, "Ann", "E1")]))
        .await;
    renderer.render(&DataStore::new()).await;
    assert!(renderer.view().is_empty());
}

#[tokio::test]
async fn render_survives_cache_failure() {
    let mut renderer = ViewRenderer::new(Arc::new(BrokenCache), SLOT);
    let store = DataStore::from(vec![Record::new(1, "Ann", "E1")]);
    let view = renderer.render(&store).await;
    assert_eq!(view.len(), 1);
    assert_eq!(renderer.slot(), SLOT);
}
