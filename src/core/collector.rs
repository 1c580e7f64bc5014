use crate::core::condition::matching_value;
use crate::core::format::display_value;
use crate::core::resolver::{FieldResolver, RecordView};
use crate::domain::model::{AlwaysIncludeItem, Condition, DynamicBlock, Record, RenderedItem};

/// Conditional items first, then always-include items, each in authoring order.
pub fn collect_in(
    resolver: &FieldResolver,
    view: &RecordView<'_>,
    conditions: &[Condition],
    always_include: &[AlwaysIncludeItem],
) -> Vec<RenderedItem> {
    let mut items = Vec::new();

    for condition in conditions {
        if condition.is_inert() {
            continue;
        }
        if let Some(resolved) = matching_value(resolver, view, condition) {
            items.push(RenderedItem {
                label: condition.label.clone(),
                value: display_value(&resolved.value),
            });
        }
    }

    for item in always_include {
        if item.label.is_empty() || item.value_field.is_empty() {
            continue;
        }
        if let Some(resolved) = resolver.resolve_in(view, &item.value_field) {
            items.push(RenderedItem {
                label: item.label.clone(),
                value: display_value(&resolved.value),
            });
        }
    }

    items
}

pub fn collect_block(
    resolver: &FieldResolver,
    view: &RecordView<'_>,
    block: &DynamicBlock,
) -> Vec<RenderedItem> {
    collect_in(resolver, view, &block.conditions, &block.always_include)
}

/// Collects with the default resolver.
pub fn collect(
    conditions: &[Condition],
    always_include: &[AlwaysIncludeItem],
    record: &Record,
) -> Vec<RenderedItem> {
    let resolver = FieldResolver::new();
    collect_in(&resolver, &resolver.view(record), conditions, always_include)
}
