//! Filter & sort stages run after aggregation.
use cms_core::{ContentItem, RenderContext, Stage, StageError};
use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

pub type PredicateFn = Arc<dyn Fn(&ContentItem) -> bool + Send + Sync>;

/// Which items survive
#[derive(Clone, Default)]
pub enum Predicate {
    #[default]
    KeepAll,
    /// Every listed field must resolve to a non-empty value
    RequireNonEmpty(Vec<String>),
    Custom(PredicateFn),
}

impl Predicate {
    pub fn custom<F>(f: F) -> Self
    where
        F: Fn(&ContentItem) -> bool + Send + Sync + 'static,
    {
        Predicate::Custom(Arc::new(f))
    }

    pub fn keep(&self, item: &ContentItem) -> bool {
        match self {
            Predicate::KeepAll => true,
            Predicate::RequireNonEmpty(fields) => fields
                .iter()
                .all(|f| item.get(f).is_some_and(|v| !v.is_empty())),
            Predicate::Custom(f) => f(item),
        }
    }
}

impl fmt::Debug for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::KeepAll => write!(f, "KeepAll"),
            Predicate::RequireNonEmpty(fields) => write!(f, "RequireNonEmpty({:?})", fields),
            Predicate::Custom(_) => write!(f, "Custom(<fn>)"),
        }
    }
}

/// Ascending numeric sort key
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SortKey {
    #[default]
    Order,
    /// A field parsed as a number; items where it does not parse go last
    Field(String),
}

impl SortKey {
    pub fn parse(s: &str) -> Self {
        match s {
            "" | "order" => SortKey::Order,
            other => SortKey::Field(other.to_string()),
        }
    }

    fn value(&self, item: &ContentItem) -> f64 {
        match self {
            SortKey::Order => item.order as f64,
            SortKey::Field(name) => item
                .get(name)
                .and_then(|v| v.as_number())
                .filter(|n| !n.is_nan())
                .unwrap_or(f64::INFINITY),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct FilterStage {
    pub predicate: Predicate,
}

impl FilterStage {
    pub fn new(predicate: Predicate) -> Self {
        Self { predicate }
    }
}

impl Stage for FilterStage {
    fn id(&self) -> &'static str {
        "filter.predicate.v1"
    }

    fn run(&self, items: Vec<ContentItem>, _ctx: &RenderContext) -> Result<Vec<ContentItem>, StageError> {
        Ok(items.into_iter().filter(|i| self.predicate.keep(i)).collect())
    }
}

#[derive(Debug, Clone, Default)]
pub struct SortStage {
    pub key: SortKey,
}

impl SortStage {
    pub fn new(key: SortKey) -> Self {
        Self { key }
    }
}

impl Stage for SortStage {
    fn id(&self) -> &'static str {
        "sort.numeric.v1"
    }

    fn run(&self, mut items: Vec<ContentItem>, _ctx: &RenderContext) -> Result<Vec<ContentItem>, StageError> {
        sort_items(&mut items, &self.key);
        Ok(items)
    }
}

/// Stable ascending sort; ties keep aggregation order
pub fn sort_items(items: &mut [ContentItem], key: &SortKey) {
    items.sort_by(|a, b| key.value(a).partial_cmp(&key.value(b)).unwrap_or(Ordering::Equal));
}

/// Filter then sort, without the pipeline bookkeeping
pub fn apply(items: Vec<ContentItem>, predicate: Option<&Predicate>, key: &SortKey) -> Vec<ContentItem> {
    let mut kept: Vec<ContentItem> = match predicate {
        Some(p) => items.into_iter().filter(|i| p.keep(i)).collect(),
        None => items,
    };
    sort_items(&mut kept, key);
    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use cms_core::FieldValue;

    fn item(id: &str, order: i64, title: &str) -> ContentItem {
        let mut item = ContentItem::new(id, order);
        item.fields.insert("title".into(), FieldValue::Text(title.into()));
        item
    }

    #[test]
    fn test_stable_sort_on_order() {
        let items = vec![item("c", 2, "c"), item("a", 1, "a1"), item("b", 1, "a2"), item("d", 0, "d")];
        let sorted = apply(items, None, &SortKey::Order);
        let ids: Vec<&str> = sorted.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["d", "a", "b", "c"]);
    }

    #[test]
    fn test_require_non_empty() {
        let items = vec![item("a", 0, "A"), item("b", 1, " "), ContentItem::new("c", 2)];
        let p = Predicate::RequireNonEmpty(vec!["title".into()]);
        let kept = apply(items, Some(&p), &SortKey::Order);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].id, "a");
    }

    #[test]
    fn test_filter_is_idempotent() {
        let items = vec![item("a", 0, "keep"), item("b", 1, "drop"), item("c", 2, "keep")];
        let p = Predicate::custom(|i| i.text("title") == "keep");
        let once = apply(items, Some(&p), &SortKey::Order);
        let twice = apply(once.clone(), Some(&p), &SortKey::Order);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_sort_by_field() {
        let mut a = item("a", 0, "a");
        a.fields.insert("rank".into(), "10".into());
        let mut b = item("b", 1, "b");
        b.fields.insert("rank".into(), "2".into());
        let c = item("c", 2, "c");

        let sorted = apply(vec![a, c, b], None, &SortKey::parse("rank"));
        let ids: Vec<&str> = sorted.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a", "c"]);
        assert_eq!(SortKey::parse("order"), SortKey::Order);
    }

    #[test]
    fn test_stages_run_through_trait() {
        let ctx = RenderContext::unresolved();
        let filtered = FilterStage::new(Predicate::RequireNonEmpty(vec!["title".into()]))
            .run(vec![item("a", 1, ""), item("b", 0, "B")], &ctx)
            .unwrap();
        let sorted = SortStage::default().run(filtered, &ctx).unwrap();
        assert_eq!(sorted.len(), 1);
        assert_eq!(sorted[0].id, "b");
    }
}
